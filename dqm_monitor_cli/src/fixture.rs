use libdqm_monitor::constants::MESSAGE_TYPE_HIST;
use libdqm_monitor::error::DecodeError;
use libdqm_monitor::histogram::{Axis, BinContent, HistogramKind, HistogramSnapshot};
use libdqm_monitor::transport::wrap_envelope;
use libdqm_monitor::wire::encode_histogram;

use super::replay::ReplayRpc;

/// A peak sitting on a flat background, sampled at the center of each cell
fn peak(x: f64, center: f64, width: f64) -> f64 {
    10.0 + 200.0 * (-0.5 * ((x - center) / width).powi(2)).exp()
}

fn hitmap(entries: u64) -> Result<HistogramSnapshot, DecodeError> {
    let axis = Axis::new(64, 0.0, 64.0);
    let content = (0..axis.cells())
        .map(|cell| peak(cell as f64 - 0.5, 32.0, 6.0) as u32)
        .collect();
    HistogramSnapshot::new(
        HistogramKind::Histogram1DI,
        vec![axis],
        entries,
        BinContent::U32(content),
    )
}

fn energy(entries: u64) -> Result<HistogramSnapshot, DecodeError> {
    let axis = Axis::new(200, 0.0, 10.0);
    let width = axis.bin_width();
    let content = (0..axis.cells())
        .map(|cell| peak(axis.low_edge + (cell as f64 - 0.5) * width, 6.13, 0.2))
        .collect();
    HistogramSnapshot::new(
        HistogramKind::Histogram1DD,
        vec![axis],
        entries,
        BinContent::F64(content),
    )
}

fn pad_plane(entries: u64) -> Result<HistogramSnapshot, DecodeError> {
    let x = Axis::new(32, -16.0, 16.0);
    let y = Axis::new(32, -16.0, 16.0);
    let mut content = Vec::with_capacity(x.cells() * y.cells());
    for row in 0..y.cells() {
        for col in 0..x.cells() {
            let r = ((col as f64 - 16.5).powi(2) + (row as f64 - 16.5).powi(2)).sqrt();
            content.push(peak(r, 0.0, 5.0) as f32);
        }
    }
    HistogramSnapshot::new(
        HistogramKind::Histogram2DF,
        vec![x, y],
        entries,
        BinContent::F32(content),
    )
}

/// Record a small set of demo histograms. Returns the names that were written.
pub fn write_demo_replies(replay: &ReplayRpc) -> Result<Vec<String>, DecodeError> {
    let demos = [
        ("demo/hitmap", hitmap(6400)?),
        ("demo/energy", energy(12000)?),
        ("demo/pad_plane", pad_plane(90000)?),
    ];
    let mut names = vec![];
    for (name, histogram) in demos.iter() {
        let reply = wrap_envelope(MESSAGE_TYPE_HIST, &encode_histogram(histogram)?);
        replay.record(name, &reply)?;
        names.push(name.to_string());
    }
    Ok(names)
}

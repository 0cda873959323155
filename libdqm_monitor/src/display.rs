use super::histogram::HistogramSnapshot;
use super::source::PlotId;

/// The render side of the updater. Drawing itself happens elsewhere; the scheduler only
/// hands over snapshots and asks for stale plots to be wiped.
pub trait PlotDisplay {
    /// Draw `histogram` as series number `series` of `plot`
    fn display(&mut self, plot: PlotId, series: usize, histogram: &HistogramSnapshot);

    /// Remove whatever `plot` currently shows. Called when a retrieval fails so that old
    /// data is never mistaken for the histogram that was asked for.
    fn clear(&mut self, plot: PlotId);
}

/// Axis ranges a plot needs to show a snapshot including its under and overflow bins.
///
/// The declared edges don't include under/overflow, so each edge is pushed out by one
/// bin width to make room for them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlotLayout {
    Series {
        bins: usize,
        x_min: f64,
        x_max: f64,
    },
    Colormap {
        nx: usize,
        ny: usize,
        x_min: f64,
        x_max: f64,
        y_min: f64,
        y_max: f64,
    },
}

impl PlotLayout {
    pub fn of(histogram: &HistogramSnapshot) -> Self {
        let axes = histogram.axes();
        let x = &axes[0];
        let x_width = x.bin_width();
        match axes.get(1) {
            None => Self::Series {
                bins: x.cells(),
                x_min: x.low_edge - x_width,
                x_max: x.high_edge + x_width,
            },
            Some(y) => {
                let y_width = y.bin_width();
                Self::Colormap {
                    nx: x.cells(),
                    ny: y.cells(),
                    x_min: x.low_edge - x_width,
                    x_max: x.high_edge + x_width,
                    y_min: y.low_edge - y_width,
                    y_max: y.high_edge + y_width,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::histogram::{Axis, BinContent, HistogramKind};

    #[test]
    fn test_series_layout() {
        let hist = HistogramSnapshot::new(
            HistogramKind::Histogram1DI,
            vec![Axis::new(10, 0.0, 100.0)],
            0,
            BinContent::U32(vec![0; 12]),
        )
        .unwrap();
        assert_eq!(
            PlotLayout::of(&hist),
            PlotLayout::Series {
                bins: 12,
                x_min: -10.0,
                x_max: 110.0
            }
        );
    }

    #[test]
    fn test_colormap_layout() {
        let hist = HistogramSnapshot::new(
            HistogramKind::Histogram2DD,
            vec![Axis::new(4, 0.0, 2.0), Axis::new(2, -1.0, 1.0)],
            0,
            BinContent::F64(vec![0.0; 24]),
        )
        .unwrap();
        assert_eq!(
            PlotLayout::of(&hist),
            PlotLayout::Colormap {
                nx: 6,
                ny: 4,
                x_min: -0.5,
                x_max: 2.5,
                y_min: -2.0,
                y_max: 2.0
            }
        );
    }
}

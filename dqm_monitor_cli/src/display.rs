use libdqm_monitor::display::{PlotDisplay, PlotLayout};
use libdqm_monitor::histogram::HistogramSnapshot;
use libdqm_monitor::source::PlotId;

/// One line summary of a snapshot, as the terminal shows it
pub fn describe(histogram: &HistogramSnapshot) -> String {
    let content = histogram.content();
    let shape = match PlotLayout::of(histogram) {
        PlotLayout::Series { bins, x_min, x_max } => {
            format!("{bins} bins over [{x_min}, {x_max}]")
        }
        PlotLayout::Colormap {
            nx,
            ny,
            x_min,
            x_max,
            y_min,
            y_max,
        } => format!("{nx}x{ny} cells over [{x_min}, {x_max}] x [{y_min}, {y_max}]"),
    };
    let peak = match histogram.grid() {
        Some(grid) => grid.iter().cloned().fold(f64::MIN, f64::max),
        None => content.to_f64().into_iter().fold(f64::MIN, f64::max),
    };
    format!(
        "{} with {} entries, {}, sum {:.1}, max {:.1}",
        histogram.kind().name(),
        histogram.entries(),
        shape,
        content.sum(),
        peak
    )
}

/// Shows plots as log lines, for running the monitor in a terminal
#[derive(Debug, Default)]
pub struct LogDisplay {
    titles: Vec<String>,
}

impl LogDisplay {
    pub fn new(titles: Vec<String>) -> Self {
        Self { titles }
    }

    fn title(&self, plot: PlotId) -> String {
        match self.titles.get(plot.index()) {
            Some(title) => title.clone(),
            None => plot.to_string(),
        }
    }
}

impl PlotDisplay for LogDisplay {
    fn display(&mut self, plot: PlotId, series: usize, histogram: &HistogramSnapshot) {
        log::info!("{} [{}]: {}", self.title(plot), series, describe(histogram));
    }

    fn clear(&mut self, plot: PlotId) {
        log::warn!("{} cleared, its data could not be retrieved", self.title(plot));
    }
}

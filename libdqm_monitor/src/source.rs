use serde::{Deserialize, Serialize};
use std::fmt;

/// Handle of a registered plot. Plots are never removed, so ids stay valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlotId(pub usize);

impl PlotId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for PlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "plot {}", self.0)
    }
}

/// Where one series of a plot comes from.
///
/// Runs and program are optional; when absent the scheduler's defaults are used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievalSource {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runs: Option<Vec<u32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub program: Option<String>,
}

impl RetrievalSource {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            runs: None,
            program: None,
        }
    }

    pub fn with_runs(mut self, runs: Vec<u32>) -> Self {
        self.runs = Some(runs);
        self
    }

    pub fn with_program(mut self, program: &str) -> Self {
        self.program = Some(program.to_string());
        self
    }
}

impl From<&str> for RetrievalSource {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// All of the series drawn on one plot, in drawing order.
/// 2-D histograms only make sense as a single series.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PlotSource {
    series: Vec<RetrievalSource>,
}

impl PlotSource {
    pub fn new(series: Vec<RetrievalSource>) -> Self {
        Self { series }
    }

    pub fn series(&self) -> &[RetrievalSource] {
        &self.series
    }
}

impl From<RetrievalSource> for PlotSource {
    fn from(source: RetrievalSource) -> Self {
        Self {
            series: vec![source],
        }
    }
}

impl From<&str> for PlotSource {
    fn from(name: &str) -> Self {
        RetrievalSource::new(name).into()
    }
}

impl From<Vec<RetrievalSource>> for PlotSource {
    fn from(series: Vec<RetrievalSource>) -> Self {
        Self { series }
    }
}

pub type Callback = Box<dyn FnMut() + Send>;

/// A plot registered with the scheduler: its current source plus optional notifications
/// around each refresh of it.
#[derive(Default)]
pub struct PlotBinding {
    source: Option<PlotSource>,
    on_update_start: Option<Callback>,
    on_update_complete: Option<Callback>,
}

impl PlotBinding {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called right before the first series of this plot is requested
    pub fn on_update_start(mut self, callback: impl FnMut() + Send + 'static) -> Self {
        self.on_update_start = Some(Box::new(callback));
        self
    }

    /// Called after the last series of this plot was drawn, or after the plot was cleared
    pub fn on_update_complete(mut self, callback: impl FnMut() + Send + 'static) -> Self {
        self.on_update_complete = Some(Box::new(callback));
        self
    }

    pub fn source(&self) -> Option<&PlotSource> {
        self.source.as_ref()
    }

    pub(crate) fn set_source(&mut self, source: Option<PlotSource>) {
        self.source = source;
    }

    pub(crate) fn notify_start(&mut self) {
        if let Some(callback) = self.on_update_start.as_mut() {
            callback();
        }
    }

    pub(crate) fn notify_complete(&mut self) {
        if let Some(callback) = self.on_update_complete.as_mut() {
            callback();
        }
    }
}

impl fmt::Debug for PlotBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlotBinding")
            .field("source", &self.source)
            .field("on_update_start", &self.on_update_start.is_some())
            .field("on_update_complete", &self.on_update_complete.is_some())
            .finish()
    }
}

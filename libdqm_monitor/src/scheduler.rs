use std::sync::mpsc::Sender;
use std::time::{Duration, Instant};

use super::constants::{CURRENT_RUN, DEFAULT_PROGRAM};
use super::cycle_status::CycleStatus;
use super::display::PlotDisplay;
use super::error::SchedulerError;
use super::rpc::RpcClient;
use super::source::{Callback, PlotBinding, PlotId, PlotSource};
use super::transport::TransportClient;

/// Coarse state of the scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Nothing running, no timer pending
    Idle,
    /// Waiting for the timer to start the next cycle
    Scheduled,
    /// Working through the plots; `cursor` is the next plot to refresh
    Cycling { cursor: usize },
}

/// Keeps a set of plots refreshed from the analyzer, one request at a time.
///
/// A refresh cycle visits every registered plot in registration order and refreshes its
/// series in order, so the backend never sees more than one of our requests at once. The
/// cycle is stepped one plot at a time ([`UpdateScheduler::step`]) so that whoever drives it
/// can apply other requests between plots. When a cycle ends a single timer is armed for the
/// next one, unless updates are paused or the interval is zero.
///
/// The timer is only a deadline here; [`UpdateScheduler::fire_timer`] must be called once it
/// passes. [`crate::updater::PlotAutoUpdater`] does this from a worker thread.
pub struct UpdateScheduler<C, D> {
    client: TransportClient<C>,
    display: D,
    plots: Vec<PlotBinding>,
    interval: Duration,
    timer: Option<Instant>,
    cursor: Option<usize>,
    rerun_requested: bool,
    visible: bool,
    default_runs: Vec<u32>,
    default_program: String,
    on_cycle_start: Option<Callback>,
    on_cycle_complete: Option<Callback>,
    status_tx: Option<Sender<CycleStatus>>,
    cycle_count: u64,
    cycle_failures: usize,
}

impl<C: RpcClient, D: PlotDisplay> UpdateScheduler<C, D> {
    pub fn new(rpc: C, display: D) -> Self {
        Self {
            client: TransportClient::new(rpc),
            display,
            plots: vec![],
            interval: Duration::ZERO,
            timer: None,
            cursor: None,
            rerun_requested: false,
            visible: true,
            default_runs: vec![CURRENT_RUN],
            default_program: String::from(DEFAULT_PROGRAM),
            on_cycle_start: None,
            on_cycle_complete: None,
            status_tx: None,
            cycle_count: 0,
            cycle_failures: 0,
        }
    }

    /// Called when a cycle over at least one plot begins
    pub fn on_cycle_start(mut self, callback: impl FnMut() + Send + 'static) -> Self {
        self.on_cycle_start = Some(Box::new(callback));
        self
    }

    /// Called when a cycle over at least one plot has visited its last plot
    pub fn on_cycle_complete(mut self, callback: impl FnMut() + Send + 'static) -> Self {
        self.on_cycle_complete = Some(Box::new(callback));
        self
    }

    /// Report cycle progress on this channel
    pub fn with_status_sender(mut self, tx: Sender<CycleStatus>) -> Self {
        self.status_tx = Some(tx);
        self
    }

    /// Register a plot. It is first refreshed by the next cycle.
    pub fn add_plot(&mut self, binding: PlotBinding, source: Option<PlotSource>) -> PlotId {
        let mut binding = binding;
        binding.set_source(source);
        self.plots.push(binding);
        PlotId(self.plots.len() - 1)
    }

    /// Point a plot at a new source, optionally refreshing just that plot right away
    pub fn change_source(
        &mut self,
        plot: PlotId,
        source: Option<PlotSource>,
        refresh_now: bool,
    ) -> Result<(), SchedulerError> {
        let binding = self
            .plots
            .get_mut(plot.index())
            .ok_or(SchedulerError::UnknownPlot(plot.index()))?;
        binding.set_source(source);
        if refresh_now {
            self.refresh_plot(plot.index());
        }
        Ok(())
    }

    /// Runs used by sources that don't name their own. Zero is the current run.
    pub fn set_default_run_numbers(&mut self, runs: Vec<u32>) {
        self.default_runs = runs;
    }

    /// Backend program used by sources that don't name their own
    pub fn set_default_program(&mut self, program: &str) {
        self.default_program = program.to_string();
    }

    /// Set the update interval and refresh everything now. The timer for the next cycle is
    /// armed when this one finishes.
    pub fn start(&mut self, interval: Duration) {
        self.interval = interval;
        self.cancel_timer();
        self.begin_cycle();
    }

    /// Refresh everything now. A pending timer is left alone until the cycle finishes.
    pub fn refresh_all(&mut self) {
        self.begin_cycle();
    }

    /// Change the update interval. Zero stops periodic updates.
    pub fn set_interval(&mut self, interval: Duration) {
        self.cancel_timer();
        self.interval = interval;
        if !self.interval.is_zero() && self.visible {
            self.arm_timer();
        }
    }

    /// Pause updates while nobody is looking, resume immediately when they are again
    pub fn set_visible(&mut self, visible: bool) {
        if visible == self.visible {
            return;
        }
        self.visible = visible;
        if !visible {
            spdlog::debug!("Plots hidden, pausing updates");
            self.cancel_timer();
        } else if !self.interval.is_zero() {
            spdlog::debug!("Plots visible again, resuming updates");
            self.begin_cycle();
        }
    }

    /// Start a cycle if the timer deadline has passed by `now`.
    ///
    /// Returns true if the timer fired.
    pub fn fire_timer(&mut self, now: Instant) -> bool {
        match self.timer {
            Some(deadline) if deadline <= now => {
                self.timer = None;
                self.begin_cycle();
                true
            }
            _ => false,
        }
    }

    /// Refresh the next plot of the running cycle, finishing the cycle after the last one.
    ///
    /// Returns true while the cycle has plots left.
    pub fn step(&mut self) -> bool {
        let Some(cursor) = self.cursor else {
            return false;
        };
        if cursor < self.plots.len() {
            if !self.refresh_plot(cursor) {
                self.cycle_failures += 1;
            }
            self.cursor = Some(cursor + 1);
            self.report_progress(cursor + 1);
        }
        if self.cursor.is_some_and(|next| next >= self.plots.len()) {
            self.finish_cycle();
        }
        self.cursor.is_some()
    }

    /// Refresh everything and block until done
    pub fn run_cycle(&mut self) {
        self.begin_cycle();
        while self.step() {}
    }

    pub fn state(&self) -> SchedulerState {
        match (self.cursor, self.timer) {
            (Some(cursor), _) => SchedulerState::Cycling { cursor },
            (None, Some(_)) => SchedulerState::Scheduled,
            (None, None) => SchedulerState::Idle,
        }
    }

    pub fn is_cycling(&self) -> bool {
        self.cursor.is_some()
    }

    /// Deadline of the pending timer, if any
    pub fn pending_timer(&self) -> Option<Instant> {
        self.timer
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn plot_count(&self) -> usize {
        self.plots.len()
    }

    pub fn source(&self, plot: PlotId) -> Option<&PlotSource> {
        self.plots.get(plot.index()).and_then(|binding| binding.source())
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn client(&self) -> &TransportClient<C> {
        &self.client
    }

    fn begin_cycle(&mut self) {
        if self.cursor.is_some() {
            // Never run two cycles at once; go again once this one is done
            self.rerun_requested = true;
            return;
        }
        self.cycle_count += 1;
        self.cycle_failures = 0;
        self.cursor = Some(0);
        if !self.plots.is_empty() {
            if let Some(callback) = self.on_cycle_start.as_mut() {
                callback();
            }
        }
        self.report_progress(0);
        if self.plots.is_empty() {
            self.finish_cycle();
        }
    }

    fn finish_cycle(&mut self) {
        self.cursor = None;
        if !self.plots.is_empty() {
            if let Some(callback) = self.on_cycle_complete.as_mut() {
                callback();
            }
        }
        if self.cycle_failures > 0 {
            spdlog::warn!(
                "Update cycle {} finished with {} of {} plots failing",
                self.cycle_count,
                self.cycle_failures,
                self.plots.len()
            );
        }
        if self.rerun_requested {
            self.rerun_requested = false;
            // A hidden monitor resumes with a fresh cycle once it is shown again
            if self.visible {
                self.begin_cycle();
                return;
            }
        }
        // Make sure we only ever have one timer at a time
        self.cancel_timer();
        if !self.interval.is_zero() && self.visible {
            self.arm_timer();
        }
    }

    /// Refresh every series of one plot. Returns false if any of them failed.
    fn refresh_plot(&mut self, index: usize) -> bool {
        let plot = PlotId(index);
        // Read the source now, it may have been changed since the cycle started
        let Some(source) = self.plots[index].source().cloned() else {
            return true;
        };

        self.plots[index].notify_start();
        let mut success = true;
        for (series, item) in source.series().iter().enumerate() {
            let runs = item.runs.as_deref().unwrap_or(self.default_runs.as_slice());
            let program = item.program.as_deref().unwrap_or(self.default_program.as_str());
            match self.client.retrieve_histogram(&item.name, runs, program) {
                Ok(histogram) => self.display.display(plot, series, &histogram),
                Err(e) => {
                    // Leaving the old drawing up would pass it off as the requested histogram
                    spdlog::error!("Could not update {} from {}: {}", plot, item.name, e);
                    self.display.clear(plot);
                    success = false;
                    break;
                }
            }
        }
        self.plots[index].notify_complete();
        success
    }

    fn arm_timer(&mut self) {
        self.timer = Some(Instant::now() + self.interval);
    }

    fn cancel_timer(&mut self) {
        self.timer = None;
    }

    fn report_progress(&mut self, plots_done: usize) {
        if let Some(tx) = self.status_tx.as_ref() {
            let status = CycleStatus::new(
                self.cycle_count,
                plots_done,
                self.plots.len(),
                self.cycle_failures,
            );
            if tx.send(status).is_err() {
                spdlog::debug!("Cycle status receiver is gone, no longer reporting progress");
                self.status_tx = None;
            }
        }
    }
}

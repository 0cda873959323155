use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use super::display::PlotDisplay;
use super::error::UpdaterError;
use super::rpc::RpcClient;
use super::scheduler::UpdateScheduler;
use super::source::{PlotBinding, PlotId, PlotSource};

/// Requests sent from a PlotAutoUpdater handle to its worker
#[derive(Debug)]
pub enum Command {
    AddPlot(PlotBinding, Option<PlotSource>),
    ChangeSource {
        plot: PlotId,
        source: Option<PlotSource>,
        refresh_now: bool,
    },
    SetDefaultRunNumbers(Vec<u32>),
    SetDefaultProgram(String),
    Start(Duration),
    RefreshAll,
    SetInterval(Duration),
    SetVisible(bool),
    Shutdown,
}

fn apply<C: RpcClient, D: PlotDisplay>(scheduler: &mut UpdateScheduler<C, D>, command: Command) {
    match command {
        Command::AddPlot(binding, source) => {
            scheduler.add_plot(binding, source);
        }
        Command::ChangeSource {
            plot,
            source,
            refresh_now,
        } => {
            if let Err(e) = scheduler.change_source(plot, source, refresh_now) {
                spdlog::error!("Could not change plot source: {e}");
            }
        }
        Command::SetDefaultRunNumbers(runs) => scheduler.set_default_run_numbers(runs),
        Command::SetDefaultProgram(program) => scheduler.set_default_program(&program),
        Command::Start(interval) => scheduler.start(interval),
        Command::RefreshAll => scheduler.refresh_all(),
        Command::SetInterval(interval) => scheduler.set_interval(interval),
        Command::SetVisible(visible) => scheduler.set_visible(visible),
        Command::Shutdown => (),
    }
}

/// The worker loop. Between plots of a cycle it picks up whatever requests queued up while
/// the last retrieval was in flight; when idle it sleeps on the channel, using the pending
/// timer deadline as the receive timeout.
fn run_worker<C: RpcClient, D: PlotDisplay>(
    mut scheduler: UpdateScheduler<C, D>,
    rx: Receiver<Command>,
) {
    loop {
        if scheduler.is_cycling() {
            loop {
                match rx.try_recv() {
                    Ok(Command::Shutdown) | Err(TryRecvError::Disconnected) => return,
                    Ok(command) => apply(&mut scheduler, command),
                    Err(TryRecvError::Empty) => break,
                }
            }
            scheduler.step();
            continue;
        }

        let received = match scheduler.pending_timer() {
            Some(deadline) => rx.recv_timeout(deadline.saturating_duration_since(Instant::now())),
            None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };
        match received {
            Ok(Command::Shutdown) | Err(RecvTimeoutError::Disconnected) => return,
            Ok(command) => apply(&mut scheduler, command),
            Err(RecvTimeoutError::Timeout) => {
                scheduler.fire_timer(Instant::now());
            }
        }
    }
}

/// Keeps a set of plots updated at a fixed interval from a background thread.
///
/// This is not as trivial as it first looks, because every retrieval is a blocking round
/// trip and we never want two of them in flight at once. All the real work happens on one
/// worker thread that owns an [`UpdateScheduler`]; this handle only sends it requests. The
/// worker stops and is joined when the handle is dropped, after any retrieval in flight
/// has completed.
#[derive(Debug)]
pub struct PlotAutoUpdater {
    tx: Sender<Command>,
    worker: Option<JoinHandle<()>>,
    plot_count: usize,
}

impl PlotAutoUpdater {
    /// Move a scheduler onto a new worker thread
    pub fn spawn<C, D>(scheduler: UpdateScheduler<C, D>) -> Result<Self, UpdaterError>
    where
        C: RpcClient + Send + 'static,
        D: PlotDisplay + Send + 'static,
    {
        let plot_count = scheduler.plot_count();
        let (tx, rx) = mpsc::channel::<Command>();
        let worker = std::thread::Builder::new()
            .name(String::from("dqm_updater"))
            .spawn(move || run_worker(scheduler, rx))?;
        Ok(Self {
            tx,
            worker: Some(worker),
            plot_count,
        })
    }

    /// Add a plot to the update loop. It is first refreshed by the next cycle.
    pub fn add_plot(
        &mut self,
        binding: PlotBinding,
        source: Option<PlotSource>,
    ) -> Result<PlotId, UpdaterError> {
        self.tx.send(Command::AddPlot(binding, source))?;
        // The registry is append only, so ids are handed out in send order
        let id = PlotId(self.plot_count);
        self.plot_count += 1;
        Ok(id)
    }

    /// Change the source of a plot. With `refresh_now` that plot is refreshed as soon as the
    /// worker gets to it, even in the middle of a cycle.
    pub fn change_source(
        &self,
        plot: PlotId,
        source: Option<PlotSource>,
        refresh_now: bool,
    ) -> Result<(), UpdaterError> {
        self.send(Command::ChangeSource {
            plot,
            source,
            refresh_now,
        })
    }

    pub fn set_default_run_numbers(&self, runs: Vec<u32>) -> Result<(), UpdaterError> {
        self.send(Command::SetDefaultRunNumbers(runs))
    }

    pub fn set_default_program(&self, program: &str) -> Result<(), UpdaterError> {
        self.send(Command::SetDefaultProgram(program.to_string()))
    }

    pub fn start(&self, interval: Duration) -> Result<(), UpdaterError> {
        self.send(Command::Start(interval))
    }

    pub fn refresh_all(&self) -> Result<(), UpdaterError> {
        self.send(Command::RefreshAll)
    }

    pub fn set_interval(&self, interval: Duration) -> Result<(), UpdaterError> {
        self.send(Command::SetInterval(interval))
    }

    pub fn set_visible(&self, visible: bool) -> Result<(), UpdaterError> {
        self.send(Command::SetVisible(visible))
    }

    pub fn plot_count(&self) -> usize {
        self.plot_count
    }

    fn send(&self, command: Command) -> Result<(), UpdaterError> {
        Ok(self.tx.send(command)?)
    }
}

impl Drop for PlotAutoUpdater {
    fn drop(&mut self) {
        // The worker may already be gone, in which case there is nobody to tell
        let _ = self.tx.send(Command::Shutdown);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                spdlog::error!("An error occured joining the updater worker!");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;
    use std::sync::{Arc, Mutex};

    const WAIT: Duration = Duration::from_secs(5);

    fn setup(names: &[&str], delay: Duration) -> (UpdateScheduler<FakeBackend, RecordingDisplay>, FakeBackend, EventLog) {
        let log: EventLog = Arc::new(Mutex::new(vec![]));
        let backend = FakeBackend::new(log.clone()).with_delay(delay);
        for (idx, name) in names.iter().enumerate() {
            backend.insert(name, &sample_histogram(idx as u64 + 1));
        }
        let scheduler = UpdateScheduler::new(backend.clone(), RecordingDisplay::new(log.clone()));
        (scheduler, backend, log)
    }

    fn fetch_count(backend: &FakeBackend, name: &str) -> usize {
        backend
            .calls()
            .iter()
            .filter(|call| call.args.contains(&format!("\"{name}\"")))
            .count()
    }

    #[test]
    fn test_single_cycle_in_order() {
        let (scheduler, backend, log) = setup(&["A", "B", "C"], Duration::ZERO);
        let mut updater = PlotAutoUpdater::spawn(scheduler).unwrap();
        let a = updater.add_plot(PlotBinding::new(), Some("A".into())).unwrap();
        let b = updater.add_plot(PlotBinding::new(), Some("B".into())).unwrap();
        let c = updater.add_plot(PlotBinding::new(), Some("C".into())).unwrap();
        updater.start(Duration::ZERO).unwrap();

        assert!(wait_for(WAIT, || events(&log).len() == 6));
        assert_eq!(
            events(&log),
            vec![
                Event::Fetch(String::from("A")),
                Event::Display(a, 0, 1),
                Event::Fetch(String::from("B")),
                Event::Display(b, 0, 2),
                Event::Fetch(String::from("C")),
                Event::Display(c, 0, 3),
            ]
        );
        drop(updater);
        assert_eq!(backend.calls().len(), 3);
    }

    #[test]
    fn test_timer_repeats_until_interval_is_zero() {
        let (scheduler, backend, _) = setup(&["A"], Duration::ZERO);
        let mut updater = PlotAutoUpdater::spawn(scheduler).unwrap();
        updater.add_plot(PlotBinding::new(), Some("A".into())).unwrap();
        updater.start(Duration::from_millis(10)).unwrap();
        assert!(wait_for(WAIT, || backend.calls().len() >= 3));

        updater.set_interval(Duration::ZERO).unwrap();
        std::thread::sleep(Duration::from_millis(50));
        let settled = backend.calls().len();
        std::thread::sleep(Duration::from_millis(100));
        assert_eq!(backend.calls().len(), settled);
    }

    #[test]
    fn test_source_change_lands_before_next_visit() {
        let (scheduler, backend, log) = setup(&["A", "B", "B2"], Duration::from_millis(50));
        let mut updater = PlotAutoUpdater::spawn(scheduler).unwrap();
        updater.add_plot(PlotBinding::new(), Some("A".into())).unwrap();
        let b = updater.add_plot(PlotBinding::new(), Some("B".into())).unwrap();
        updater.start(Duration::ZERO).unwrap();
        updater.change_source(b, Some("B2".into()), false).unwrap();

        assert!(wait_for(WAIT, || events(&log).contains(&Event::Display(b, 0, 3))));
        assert_eq!(fetch_count(&backend, "B"), 0);
    }

    #[test]
    fn test_never_more_than_one_request_in_flight() {
        let (scheduler, backend, _) = setup(&["A", "B", "C"], Duration::from_millis(5));
        let mut updater = PlotAutoUpdater::spawn(scheduler).unwrap();
        let a = updater.add_plot(PlotBinding::new(), Some("A".into())).unwrap();
        updater.add_plot(PlotBinding::new(), Some("B".into())).unwrap();
        updater.add_plot(PlotBinding::new(), Some("C".into())).unwrap();
        updater.start(Duration::from_millis(1)).unwrap();
        for _ in 0..5 {
            updater.refresh_all().unwrap();
            updater.change_source(a, Some("A".into()), true).unwrap();
        }
        assert!(wait_for(WAIT, || backend.calls().len() >= 20));
        drop(updater);
        assert_eq!(backend.max_in_flight(), 1);
    }

    #[test]
    fn test_hidden_pauses_until_visible() {
        let (scheduler, backend, _) = setup(&["A"], Duration::ZERO);
        let mut updater = PlotAutoUpdater::spawn(scheduler).unwrap();
        updater.add_plot(PlotBinding::new(), Some("A".into())).unwrap();
        updater.start(Duration::from_millis(10)).unwrap();
        assert!(wait_for(WAIT, || !backend.calls().is_empty()));

        updater.set_visible(false).unwrap();
        std::thread::sleep(Duration::from_millis(50));
        let paused = backend.calls().len();
        std::thread::sleep(Duration::from_millis(100));
        assert_eq!(backend.calls().len(), paused);

        updater.set_visible(true).unwrap();
        assert!(wait_for(WAIT, || backend.calls().len() > paused));
    }

    #[test]
    fn test_plot_ids_continue_from_scheduler() {
        let (mut scheduler, _, _) = setup(&[], Duration::ZERO);
        scheduler.add_plot(PlotBinding::new(), None);
        let mut updater = PlotAutoUpdater::spawn(scheduler).unwrap();
        assert_eq!(updater.add_plot(PlotBinding::new(), None).unwrap(), PlotId(1));
        assert_eq!(updater.plot_count(), 2);
    }
}

/// Progress of a refresh cycle, sent from the scheduler to whoever watches it.
///
/// One status goes out when a cycle starts and one after every plot it visits.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleStatus {
    pub cycle: u64,
    pub plots_done: usize,
    pub plots_total: usize,
    pub failures: usize,
}

impl CycleStatus {
    pub fn new(cycle: u64, plots_done: usize, plots_total: usize, failures: usize) -> Self {
        Self {
            cycle,
            plots_done,
            plots_total,
            failures,
        }
    }

    pub fn progress(&self) -> f32 {
        if self.plots_total == 0 {
            1.0
        } else {
            self.plots_done as f32 / self.plots_total as f32
        }
    }

    pub fn is_finished(&self) -> bool {
        self.plots_done >= self.plots_total
    }
}

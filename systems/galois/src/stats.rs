//! Run statistics.
//!
//! Two tiers: [`RunStats`] belongs to a single simulation and is written by
//! its processes, [`CumulativeStats`] collects finished runs of one parameter
//! setting and is shared between driver workers behind a mutex.

use std::sync::{Arc, Mutex};

use dsim::VirtualTime;

/// Running moments of a series of observations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tally {
    count: u64,
    total: f64,
    sum_of_squares: f64,
    min: Option<f64>,
    max: Option<f64>,
}

impl Tally {
    pub fn observe(&mut self, x: f64) {
        self.count += 1;
        self.total += x;
        self.sum_of_squares += x * x;
        self.min = Some(self.min.map_or(x, |min| min.min(x)));
        self.max = Some(self.max.map_or(x, |max| max.max(x)));
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn total(&self) -> f64 {
        self.total
    }

    /// `None` until something was observed.
    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.total / self.count as f64)
    }

    /// Population variance.
    pub fn variance(&self) -> Option<f64> {
        let n = self.count as f64;
        (self.count > 0).then(|| (self.sum_of_squares - self.total * self.total / n) / n)
    }

    pub fn min(&self) -> Option<f64> {
        self.min
    }

    pub fn max(&self) -> Option<f64> {
        self.max
    }

    /// Folds `other` in as if its observations were made on `self`.
    pub fn merge(&mut self, other: &Tally) {
        self.count += other.count;
        self.total += other.total;
        self.sum_of_squares += other.sum_of_squares;
        self.min = match (self.min, other.min) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        self.max = match (self.max, other.max) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
    }

    pub fn reset(&mut self) {
        *self = Tally::default();
    }
}

/// Statistics of one simulation run.
#[derive(Debug, Clone, Default)]
pub struct RunStats {
    client_requests: Tally,
    client_time_waited: Tally,
    session_fragments: Tally,
    used_memory: Tally,
    reconstructed_files: u64,
    lost_switch_messages: u64,
}

impl RunStats {
    pub fn add_client_requests(&mut self, requests: usize) {
        self.client_requests.observe(requests as f64);
    }

    pub fn add_client_time_waited(&mut self, waited: VirtualTime) {
        self.client_time_waited.observe(waited.as_micros());
    }

    /// Distinct fragments a finished session held when it stopped asking.
    pub fn add_session_fragments(&mut self, fragments: usize) {
        self.session_fragments.observe(fragments as f64);
    }

    /// `megabytes` of memory in use at a sampling point.
    pub fn add_used_memory(&mut self, megabytes: f64) {
        self.used_memory.observe(megabytes);
    }

    pub fn file_reconstructed(&mut self) {
        self.reconstructed_files += 1;
    }

    pub fn message_lost(&mut self) {
        self.lost_switch_messages += 1;
    }

    pub fn client_requests(&self) -> &Tally {
        &self.client_requests
    }

    /// In microseconds.
    pub fn client_time_waited(&self) -> &Tally {
        &self.client_time_waited
    }

    pub fn session_fragments(&self) -> &Tally {
        &self.session_fragments
    }

    pub fn used_memory(&self) -> &Tally {
        &self.used_memory
    }

    pub fn reconstructed_files(&self) -> u64 {
        self.reconstructed_files
    }

    pub fn lost_switch_messages(&self) -> u64 {
        self.lost_switch_messages
    }

    pub fn snapshot(&self) -> RunSnapshot {
        RunSnapshot {
            client_requests_avg: self.client_requests.mean(),
            client_time_waited_avg: self.client_time_waited.mean(),
            reconstructed_files: self.reconstructed_files,
            lost_switch_messages: self.lost_switch_messages,
            used_memory_avg: self.used_memory.mean(),
        }
    }
}

/// Read-only view of a finished run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSnapshot {
    pub client_requests_avg: Option<f64>,
    /// In microseconds.
    pub client_time_waited_avg: Option<f64>,
    pub reconstructed_files: u64,
    pub lost_switch_messages: u64,
    pub used_memory_avg: Option<f64>,
}

/// Averages over the runs of one parameter setting.
#[derive(Debug, Clone, PartialEq)]
pub struct TotalsSnapshot {
    pub runs: u64,
    pub client_requests_avg: Option<f64>,
    /// In microseconds.
    pub client_time_waited_avg: Option<f64>,
    pub reconstructed_files_avg: Option<f64>,
    pub lost_switch_messages_avg: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct CumulativeStats {
    client_requests: Tally,
    client_time_waited: Tally,
    used_memory: Tally,
    reconstructed_files: Tally,
    lost_switch_messages: Tally,
}

pub type SharedStats = Arc<Mutex<CumulativeStats>>;

impl CumulativeStats {
    pub fn shared() -> SharedStats {
        Arc::new(Mutex::new(CumulativeStats::default()))
    }

    pub fn record_run(&mut self, run: &RunStats) {
        self.client_requests.merge(&run.client_requests);
        self.client_time_waited.merge(&run.client_time_waited);
        self.used_memory.merge(&run.used_memory);
        self.reconstructed_files
            .observe(run.reconstructed_files as f64);
        self.lost_switch_messages
            .observe(run.lost_switch_messages as f64);
    }

    pub fn totals(&self) -> TotalsSnapshot {
        TotalsSnapshot {
            runs: self.reconstructed_files.count(),
            client_requests_avg: self.client_requests.mean(),
            client_time_waited_avg: self.client_time_waited.mean(),
            reconstructed_files_avg: self.reconstructed_files.mean(),
            lost_switch_messages_avg: self.lost_switch_messages.mean(),
        }
    }

    /// Starts a new parameter setting. Memory observations are kept.
    pub fn reset_experiment(&mut self) {
        self.client_requests.reset();
        self.client_time_waited.reset();
        self.reconstructed_files.reset();
        self.lost_switch_messages.reset();
    }

    /// Mean memory over every run since the last call, then forgets it.
    pub fn take_used_memory_avg(&mut self) -> Option<f64> {
        let mean = self.used_memory.mean();
        self.used_memory.reset();
        mean
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tally_moments() {
        let mut tally = Tally::default();
        assert_eq!(tally.mean(), None);
        for x in [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0] {
            tally.observe(x);
        }
        assert_eq!(tally.count(), 8);
        assert_eq!(tally.mean(), Some(5.0));
        assert_eq!(tally.variance(), Some(4.0));
        assert_eq!(tally.min(), Some(2.0));
        assert_eq!(tally.max(), Some(9.0));
    }

    #[test]
    fn merge_equals_observing_everything() {
        let mut left = Tally::default();
        let mut right = Tally::default();
        let mut all = Tally::default();
        for (i, x) in [1.0, 8.0, 3.0, 6.0, 2.0].into_iter().enumerate() {
            if i % 2 == 0 {
                left.observe(x)
            } else {
                right.observe(x)
            }
            all.observe(x);
        }
        left.merge(&right);
        assert_eq!(left, all);

        let mut empty = Tally::default();
        empty.merge(&all);
        assert_eq!(empty, all);
    }

    #[test]
    fn cumulative_lifecycle() {
        let mut first = RunStats::default();
        first.add_client_requests(2);
        first.add_client_time_waited(VirtualTime(100.0));
        first.file_reconstructed();
        first.message_lost();
        first.message_lost();
        first.add_used_memory(10.0);

        let mut second = RunStats::default();
        second.add_client_requests(4);
        second.add_client_time_waited(VirtualTime(300.0));
        second.file_reconstructed();
        second.file_reconstructed();
        second.file_reconstructed();
        second.add_used_memory(20.0);

        let mut cumulative = CumulativeStats::default();
        cumulative.record_run(&first);
        cumulative.record_run(&second);

        let totals = cumulative.totals();
        assert_eq!(totals.runs, 2);
        assert_eq!(totals.client_requests_avg, Some(3.0));
        assert_eq!(totals.client_time_waited_avg, Some(200.0));
        assert_eq!(totals.reconstructed_files_avg, Some(2.0));
        assert_eq!(totals.lost_switch_messages_avg, Some(1.0));

        cumulative.reset_experiment();
        assert_eq!(cumulative.totals().runs, 0);
        assert_eq!(cumulative.totals().client_requests_avg, None);

        assert_eq!(cumulative.take_used_memory_avg(), Some(15.0));
        assert_eq!(cumulative.take_used_memory_avg(), None);
    }

    #[test]
    fn run_snapshot_reads_means() {
        let mut run = RunStats::default();
        assert_eq!(run.snapshot().client_requests_avg, None);
        run.add_client_requests(3);
        run.add_client_requests(5);
        let snapshot = run.snapshot();
        assert_eq!(snapshot.client_requests_avg, Some(4.0));
        assert_eq!(snapshot.reconstructed_files, 0);
    }
}

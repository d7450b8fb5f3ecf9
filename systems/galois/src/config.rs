use dsim::VirtualTime;

use crate::GaloisError;

/// Parameters of one Galois experiment.
///
/// Sizes are in bytes, times in virtual microseconds. `Default` reproduces
/// the reference benchmark setting.
#[derive(Debug, Clone, PartialEq)]
pub struct GaloisConfig {
    pub machine_count: usize,
    /// Distinct fragments needed to rebuild a file.
    pub request_count: usize,
    /// Switch buffer size in frames. `None` means unbounded.
    pub frame_count: Option<usize>,
    /// Requests sent on top of `request_count`, between 0 and
    /// `machine_count - request_count - 1`.
    pub extra_request_count: usize,

    pub file_size: usize,
    pub mtu: usize,
    pub request_size: usize,

    pub client_sleep_prob: f64,
    pub server_down_prob: f64,

    pub max_sim_time: VirtualTime,
    pub memory_recording_frequency: VirtualTime,
    /// Exponential mean.
    pub client_stop_mean: VirtualTime,
    /// Exponential mean.
    pub server_stop_mean: VirtualTime,
    pub timeout: VirtualTime,
    pub cache_access_time: VirtualTime,
    pub max_access_time: VirtualTime,
    pub latency: VirtualTime,
    /// Bytes per microsecond.
    pub bandwidth: f64,

    /// Runs per parameter setting in a sweep.
    pub sim_count: usize,
}

impl Default for GaloisConfig {
    fn default() -> Self {
        let max_sim_time = VirtualTime::from_secs(10.0);
        Self {
            machine_count: 16,
            request_count: 8,
            frame_count: Some(128),
            extra_request_count: 0,
            file_size: 64 * 1024,
            mtu: 1024,
            request_size: 64,
            client_sleep_prob: 0.3,
            server_down_prob: 0.6,
            max_sim_time,
            memory_recording_frequency: max_sim_time * 0.1,
            client_stop_mean: VirtualTime::from_millis(25.0),
            server_stop_mean: VirtualTime::from_millis(15.0),
            timeout: VirtualTime::from_millis(1.5),
            cache_access_time: VirtualTime::from_micros(100.0),
            max_access_time: VirtualTime::from_micros(1.0),
            latency: VirtualTime::from_nanos(100.0),
            bandwidth: 11.0 * 1024.0 * 1024.0 / VirtualTime::from_secs(1.0).as_micros(),
            sim_count: 20,
        }
    }
}

impl GaloisConfig {
    /// Benchmark setting for `machine_count` machines: half of them make a
    /// quorum.
    pub fn for_machines(machine_count: usize, frame_count: Option<usize>) -> Self {
        Self {
            machine_count,
            request_count: machine_count / 2,
            frame_count,
            ..Default::default()
        }
    }

    pub fn with_machines(mut self, machine_count: usize, request_count: usize) -> Self {
        self.machine_count = machine_count;
        self.request_count = request_count;
        self
    }

    pub fn with_frame_count(mut self, frame_count: Option<usize>) -> Self {
        self.frame_count = frame_count;
        self
    }

    pub fn with_extra_requests(mut self, extra_request_count: usize) -> Self {
        self.extra_request_count = extra_request_count;
        self
    }

    pub fn with_probabilities(mut self, client_sleep_prob: f64, server_down_prob: f64) -> Self {
        self.client_sleep_prob = client_sleep_prob;
        self.server_down_prob = server_down_prob;
        self
    }

    pub fn with_file_size(mut self, file_size: usize) -> Self {
        self.file_size = file_size;
        self
    }

    pub fn with_max_sim_time(mut self, max_sim_time: VirtualTime) -> Self {
        self.max_sim_time = max_sim_time;
        self.memory_recording_frequency = max_sim_time * 0.1;
        self
    }

    /// Time to push `len` bytes through a link.
    pub fn wait_for_send(&self, len: usize) -> VirtualTime {
        self.latency + VirtualTime(len as f64 / self.bandwidth)
    }

    /// Size of each stored fragment.
    pub fn fragment_len(&self) -> usize {
        self.file_size / self.request_count
    }

    pub fn validate(&self) -> Result<(), GaloisError> {
        let invalid = |reason: String| Err(GaloisError::InvalidConfig(reason));

        if self.machine_count < 2 {
            return invalid(format!(
                "need at least 2 machines, got {}",
                self.machine_count
            ));
        }
        if self.request_count == 0 {
            return invalid("request count must be positive".to_string());
        }
        if self.request_count + self.extra_request_count > self.machine_count - 1 {
            return invalid(format!(
                "{} requests plus {} extra exceed the {} peers of a machine",
                self.request_count,
                self.extra_request_count,
                self.machine_count - 1
            ));
        }
        if self.mtu == 0 {
            return invalid("MTU must be positive".to_string());
        }
        if self.fragment_len() == 0 {
            return invalid(format!(
                "file of {} bytes cannot be split in {} fragments",
                self.file_size, self.request_count
            ));
        }
        for (name, p) in [
            ("client sleep", self.client_sleep_prob),
            ("server down", self.server_down_prob),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return invalid(format!("{name} probability {p} is outside [0, 1]"));
            }
        }
        if !(self.bandwidth.is_finite() && self.bandwidth > 0.0) {
            return invalid(format!("bandwidth must be positive, got {}", self.bandwidth));
        }
        if !(self.memory_recording_frequency.is_finite()
            && self.memory_recording_frequency > VirtualTime::ZERO)
        {
            return invalid("memory recording frequency must be positive".to_string());
        }
        // A zero timeout lets an unanswered client retry forever at one instant.
        if !(self.timeout.is_finite() && self.timeout > VirtualTime::ZERO) {
            return invalid(format!("timeout must be positive, got {}", self.timeout));
        }
        for (name, t) in [
            ("max simulation time", self.max_sim_time),
            ("client stop mean", self.client_stop_mean),
            ("server stop mean", self.server_stop_mean),
            ("cache access time", self.cache_access_time),
            ("max access time", self.max_access_time),
            ("latency", self.latency),
        ] {
            if !(t.is_finite() && t >= VirtualTime::ZERO) {
                return invalid(format!("{name} must be finite and non-negative, got {t}"));
            }
        }
        Ok(())
    }
}

use indicatif::{ProgressBar, ProgressStyle};
use log::log_enabled;

use crate::time::VirtualTime;

const K_PROGRESS_TIMES: f64 = 20.0;

pub(crate) struct Bar {
    bar: ProgressBar,
    prev_log: u64,
    delta: f64,
}

impl Bar {
    pub(crate) fn new(total: VirtualTime) -> Self {
        let bar = if log_enabled!(log::Level::Info) {
            let bar = ProgressBar::new(total.as_micros() as u64);
            if let Ok(style) = ProgressStyle::default_bar().template("[{bar:60.green}] {pos}/{len} us") {
                bar.set_style(style);
            }
            bar.set_position(0);
            bar
        } else {
            ProgressBar::hidden()
        };

        Self {
            bar,
            prev_log: 0,
            delta: (total.as_micros() / K_PROGRESS_TIMES).max(1.0),
        }
    }

    pub(crate) fn make_progress(&mut self, time: VirtualTime) {
        let d = (time.as_micros() / self.delta) as u64;
        if d > self.prev_log {
            self.prev_log = d;
            self.bar.set_position(time.as_micros() as u64)
        }
    }

    pub(crate) fn finish(&mut self) {
        self.bar.finish();
    }
}

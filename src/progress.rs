//! Work progress reporting.
//!
//! Interactive runs draw one indicatif bar per phase. In log-only mode the bar
//! is hidden and a `tracing` line is emitted every `interval` items and on
//! the last one, which keeps output readable under `tail -f`.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

static LOG_ONLY: AtomicBool = AtomicBool::new(false);

/// Default spacing of log-only progress lines, in items
pub const LOG_INTERVAL: u64 = 50;

const BAR_TEMPLATE: &str =
    "{msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec}, ETA: {eta})";

pub fn set_log_only(value: bool) {
    LOG_ONLY.store(value, Ordering::Relaxed);
}

fn log_only() -> bool {
    LOG_ONLY.load(Ordering::Relaxed)
}

/// Whether the `done`-th of `total` items gets a log-only progress line.
pub fn should_log(done: u64, total: u64, interval: u64) -> bool {
    total > 0 && done > 0 && (done == total || done % interval.max(1) == 0)
}

pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    match secs {
        s if s < 60.0 => format!("{:.1}s", s),
        s if s < 3600.0 => format!("{:.1}m", s / 60.0),
        s => format!("{:.1}h", s / 3600.0),
    }
}

/// Item counter for one phase of a run. Shareable across worker threads.
pub struct WorkProgress {
    phase: String,
    total: u64,
    interval: u64,
    done: AtomicU64,
    bar: ProgressBar,
}

impl WorkProgress {
    pub fn new(phase: &str, total: u64) -> Self {
        Self::with_interval(phase, total, LOG_INTERVAL)
    }

    pub fn with_interval(phase: &str, total: u64, interval: u64) -> Self {
        let bar = ProgressBar::new(total);
        if log_only() {
            bar.set_draw_target(ProgressDrawTarget::hidden());
        } else {
            match ProgressStyle::with_template(BAR_TEMPLATE) {
                Ok(style) => bar.set_style(style.progress_chars("=> ")),
                Err(e) => tracing::debug!("default progress style: {}", e),
            }
        }
        bar.set_message(phase.to_string());
        Self {
            phase: phase.to_string(),
            total,
            interval,
            done: AtomicU64::new(0),
            bar,
        }
    }

    /// Count one finished item and return the running count.
    pub fn inc(&self) -> u64 {
        let done = self.done.fetch_add(1, Ordering::Relaxed) + 1;
        self.bar.inc(1);
        if log_only() && should_log(done, self.total, self.interval) {
            let pct = 100.0 * done as f64 / self.total as f64;
            tracing::info!("[{}] {}/{} ({:.1}%)", self.phase, done, self.total, pct);
        }
        done
    }

    pub fn done(&self) -> u64 {
        self.done.load(Ordering::Relaxed)
    }

    pub fn finish(&self) {
        self.bar
            .finish_with_message(format!("{}: {}/{}", self.phase, self.done(), self.total));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rayon::prelude::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.5s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1.5m");
        assert_eq!(format_duration(Duration::from_secs(5400)), "1.5h");
    }

    #[test]
    fn test_should_log_on_interval_and_last_item() {
        let logged: Vec<u64> = (1..=120).filter(|&n| should_log(n, 120, 50)).collect();
        assert_eq!(logged, vec![50, 100, 120]);
        assert!(!should_log(0, 0, 50));
        assert!(should_log(3, 7, 0));
    }

    #[test]
    fn test_counts_across_threads() {
        let progress = WorkProgress::with_interval("count", 200, 10);
        (0..200).into_par_iter().for_each(|_| {
            progress.inc();
        });
        progress.finish();
        assert_eq!(progress.done(), 200);
    }
}

//! Progress reporting for long analyses.
//!
//! Workers publish [`ProgressInfo`] snapshots on a small bounded channel
//! with `try_send`, so a slow display never stalls the analysis. A display
//! thread renders the latest snapshot with `indicatif`.

use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, bounded};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgressInfo {
    pub total_tasks: usize,
    pub total_tasks_known: bool,
    pub completed_tasks: usize,
    pub elapsed: Duration,
    pub message: String,
}

impl ProgressInfo {
    /// Completed fraction in `[0, 1]`, once the total is known.
    pub fn ratio(&self) -> Option<f64> {
        if !self.total_tasks_known || self.total_tasks == 0 {
            return None;
        }
        Some((self.completed_tasks as f64 / self.total_tasks as f64).min(1.0))
    }

    /// Rough time left, extrapolated from the average task duration.
    pub fn eta(&self) -> Option<Duration> {
        let ratio = self.ratio()?;
        if ratio == 0.0 {
            return None;
        }
        let total = self.elapsed.as_secs_f64() / ratio;
        Some(Duration::from_secs_f64((total - self.elapsed.as_secs_f64()).max(0.0)))
    }
}

/// Channel pair for progress updates; the sender side is lossy.
pub fn channel() -> (Sender<ProgressInfo>, Receiver<ProgressInfo>) {
    bounded(1)
}

/// Render progress updates until every sender is dropped.
pub fn spawn_display(updates: Receiver<ProgressInfo>, visible: bool) -> JoinHandle<()> {
    thread::spawn(move || {
        let bar = ProgressBar::with_draw_target(
            None,
            if visible {
                ProgressDrawTarget::stderr()
            } else {
                ProgressDrawTarget::hidden()
            },
        );
        if let Ok(style) =
            ProgressStyle::default_bar().template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {wide_msg}")
        {
            bar.set_style(style.progress_chars("█▓▒░  "));
        }

        for info in updates.iter() {
            if info.total_tasks_known {
                bar.set_length(info.total_tasks as u64);
            }
            bar.set_position(info.completed_tasks as u64);
            bar.set_message(info.message);
        }
        bar.finish_and_clear();
    })
}

/// Run `f` with a progress sender wired to a display thread, then wait for
/// the display to clear before returning.
pub fn with_display<T>(visible: bool, f: impl FnOnce(Sender<ProgressInfo>) -> T) -> T {
    let (tx, rx) = channel();
    let display = spawn_display(rx, visible);
    let result = f(tx);
    let _ = display.join();
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratio_requires_known_total() {
        let mut info = ProgressInfo {
            total_tasks: 10,
            completed_tasks: 5,
            ..Default::default()
        };
        assert_eq!(info.ratio(), None);
        info.total_tasks_known = true;
        assert_eq!(info.ratio(), Some(0.5));
    }

    #[test]
    fn eta_extrapolates() {
        let info = ProgressInfo {
            total_tasks: 4,
            total_tasks_known: true,
            completed_tasks: 1,
            elapsed: Duration::from_secs(10),
            message: String::new(),
        };
        assert_eq!(info.eta(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn display_stops_when_senders_drop() {
        let (tx, rx) = channel();
        let handle = spawn_display(rx, false);
        let _ = tx.try_send(ProgressInfo {
            total_tasks: 1,
            total_tasks_known: true,
            completed_tasks: 1,
            ..Default::default()
        });
        drop(tx);
        handle.join().unwrap();
    }

    #[test]
    fn with_display_returns_result() {
        let value = with_display(false, |tx| {
            let _ = tx.try_send(ProgressInfo::default());
            42
        });
        assert_eq!(value, 42);
    }
}

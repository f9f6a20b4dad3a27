//! Live view of a running engine.
//!
//! [`ProgressMonitor`] is the observer handed to the engine. Workers publish
//! into it; the display task reads from it on its own schedule. Neither side
//! waits for the other.

use arc_swap::ArcSwap;
use chrono::{DateTime, Local};
use engine::{ItemFailure, Progress, ProgressObserver, RunSummary};
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// One failed operation, as kept for display.
#[derive(Debug, Clone, PartialEq)]
pub struct FailureEntry {
    pub at: DateTime<Local>,
    pub position: usize,
    pub batch_index: usize,
    pub message: Option<String>,
}

impl FailureEntry {
    fn describe(&self) -> String {
        format!(
            "[{}] #{} (batch {}): {}",
            self.at.format("%H:%M:%S"),
            self.position,
            self.batch_index,
            self.message.as_deref().unwrap_or("no diagnostic")
        )
    }
}

pub struct ProgressMonitor {
    latest: ArcSwap<Progress>,
    failures: Mutex<VecDeque<FailureEntry>>,
    window: usize,
    failures_seen: AtomicUsize,
}

impl ProgressMonitor {
    /// `window` bounds how many recent failures are kept; older ones are
    /// only counted.
    pub fn new(total: usize, window: usize) -> Self {
        Self {
            latest: ArcSwap::from_pointee(Progress::new(total)),
            failures: Mutex::new(VecDeque::with_capacity(window)),
            window,
            failures_seen: AtomicUsize::new(0),
        }
    }

    pub fn progress(&self) -> Progress {
        **self.latest.load()
    }

    pub fn failures_seen(&self) -> usize {
        self.failures_seen.load(Ordering::Relaxed)
    }

    /// Most recent failures, oldest first.
    pub fn recent_failures(&self) -> Vec<FailureEntry> {
        match self.failures.lock() {
            Ok(guard) => guard.iter().cloned().collect(),
            Err(_) => Vec::new(),
        }
    }
}

impl ProgressObserver for ProgressMonitor {
    fn on_progress(&self, progress: Progress) {
        // Workers may deliver snapshots out of order; keep the furthest one.
        self.latest.rcu(|current| {
            if progress.processed() > current.processed() {
                Arc::new(progress)
            } else {
                Arc::clone(current)
            }
        });
    }

    fn on_item_failed(&self, failure: &ItemFailure) {
        self.failures_seen.fetch_add(1, Ordering::Relaxed);
        if self.window == 0 {
            return;
        }
        if let Ok(mut guard) = self.failures.lock() {
            if guard.len() == self.window {
                guard.pop_front();
            }
            guard.push_back(FailureEntry {
                at: Local::now(),
                position: failure.position,
                batch_index: failure.batch_index,
                message: failure.message.clone(),
            });
        }
    }
}

/// Single-line progress rendering, e.g.
/// `Total: 23, Success: 20, Error: 1 | 91.3% | 1.2s`.
pub fn status_line(progress: &Progress, elapsed: Duration) -> String {
    format!(
        "{progress} | {:.1}% | {:.1}s",
        progress.percent(),
        elapsed.as_secs_f64()
    )
}

/// One frame of the live view: the status line followed by the trailing
/// window of recent failures, oldest first.
pub fn live_frame(progress: &Progress, failures: &[FailureEntry], elapsed: Duration) -> String {
    let mut lines = vec![status_line(progress, elapsed)];
    if !failures.is_empty() {
        lines.push("Recent failures:".to_string());
        lines.extend(failures.iter().map(|f| format!("  {}", f.describe())));
    }
    lines.join("\n")
}

/// Multi-line report printed once a run has ended.
pub fn summary_report(summary: &RunSummary, failures: &[FailureEntry], failures_seen: usize) -> String {
    let mut lines = Vec::new();
    let headline = if summary.cancelled {
        "Run cancelled"
    } else if summary.is_complete_success() {
        "Run completed"
    } else {
        "Run completed with failures"
    };
    lines.push(headline.to_string());
    lines.push(format!("  {}", summary.progress));
    lines.push(format!(
        "  Batches: {}, Sessions: {}, Elapsed: {:.2}s",
        summary.batches,
        summary.sessions_created,
        summary.elapsed.as_secs_f64()
    ));
    if summary.cancelled {
        lines.push(format!(
            "  Not dispatched: {}",
            summary.progress.remaining()
        ));
    }

    if !failures.is_empty() {
        if failures_seen > failures.len() {
            lines.push(format!(
                "Last {} of {failures_seen} failures:",
                failures.len()
            ));
        } else {
            lines.push("Failures:".to_string());
        }
        lines.extend(failures.iter().map(|f| format!("  {}", f.describe())));
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(position: usize, message: Option<&str>) -> ItemFailure {
        ItemFailure {
            position,
            batch_index: position / 10,
            message: message.map(str::to_string),
        }
    }

    #[test]
    fn test_keeps_furthest_snapshot() {
        let monitor = ProgressMonitor::new(10, 5);
        monitor.on_progress(Progress {
            total: 10,
            success_count: 3,
            fail_count: 1,
        });
        monitor.on_progress(Progress {
            total: 10,
            success_count: 2,
            fail_count: 1,
        });

        assert_eq!(monitor.progress().processed(), 4);
        assert_eq!(monitor.progress().success_count, 3);
    }

    #[test]
    fn test_failure_window_is_bounded() {
        let monitor = ProgressMonitor::new(10, 2);
        monitor.on_item_failed(&failure(1, Some("first")));
        monitor.on_item_failed(&failure(2, None));
        monitor.on_item_failed(&failure(3, Some("third")));

        let recent = monitor.recent_failures();
        assert_eq!(monitor.failures_seen(), 3);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].position, 2);
        assert_eq!(recent[1].message.as_deref(), Some("third"));
    }

    #[test]
    fn test_zero_window_only_counts() {
        let monitor = ProgressMonitor::new(1, 0);
        monitor.on_item_failed(&failure(0, Some("boom")));
        assert_eq!(monitor.failures_seen(), 1);
        assert!(monitor.recent_failures().is_empty());
    }

    #[test]
    fn test_status_line() {
        let progress = Progress {
            total: 4,
            success_count: 2,
            fail_count: 1,
        };
        assert_eq!(
            status_line(&progress, Duration::from_millis(1500)),
            "Total: 4, Success: 2, Error: 1 | 75.0% | 1.5s"
        );
    }

    #[test]
    fn test_live_frame_lists_recent_failures() {
        let monitor = ProgressMonitor::new(4, 2);
        assert_eq!(
            live_frame(&monitor.progress(), &monitor.recent_failures(), Duration::ZERO).lines().count(),
            1
        );

        monitor.on_item_failed(&failure(1, Some("Record does not exist")));
        monitor.on_item_failed(&failure(3, None));
        let frame = live_frame(&monitor.progress(), &monitor.recent_failures(), Duration::ZERO);
        let lines: Vec<&str> = frame.lines().collect();

        assert_eq!(lines.len(), 4);
        assert_eq!(lines[1], "Recent failures:");
        assert!(lines[2].ends_with("#1 (batch 0): Record does not exist"));
        assert!(lines[3].ends_with("#3 (batch 0): no diagnostic"));
    }

    #[test]
    fn test_summary_report_mentions_truncated_failures() {
        let summary = RunSummary {
            progress: Progress {
                total: 3,
                success_count: 1,
                fail_count: 2,
            },
            batches: 1,
            sessions_created: 1,
            cancelled: false,
            elapsed: Duration::from_millis(10),
        };
        let monitor = ProgressMonitor::new(3, 1);
        monitor.on_item_failed(&failure(1, None));
        monitor.on_item_failed(&failure(2, Some("duplicate key")));

        let report = summary_report(&summary, &monitor.recent_failures(), monitor.failures_seen());
        assert!(report.starts_with("Run completed with failures"));
        assert!(report.contains("Last 1 of 2 failures:"));
        assert!(report.contains("duplicate key"));
    }
}

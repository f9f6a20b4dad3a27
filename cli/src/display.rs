use crate::monitor::{ProgressMonitor, live_frame};
use std::io::Write;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Redraws the live view every `interval` until `cancel` fires, then
/// renders one final frame and hands the writer back.
///
/// Each frame overwrites the previous one in place, so the failure window
/// below the status line scrolls without leaving stale lines behind.
pub async fn render_until_cancelled<W: Write>(
    monitor: Arc<ProgressMonitor>,
    interval: Duration,
    cancel: CancellationToken,
    mut out: W,
) -> std::io::Result<W> {
    let started = Instant::now();
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let mut drawn = 0;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                drawn = draw(&mut out, &monitor, started.elapsed(), drawn)?;
            }
        }
    }

    draw(&mut out, &monitor, started.elapsed(), drawn)?;
    Ok(out)
}

/// Replaces the `previous` lines on screen with a fresh frame and returns
/// how many lines it took.
fn draw<W: Write>(
    out: &mut W,
    monitor: &ProgressMonitor,
    elapsed: Duration,
    previous: usize,
) -> std::io::Result<usize> {
    let frame = live_frame(&monitor.progress(), &monitor.recent_failures(), elapsed);
    if previous > 0 {
        // cursor up, then clear to end of screen
        write!(out, "\x1b[{previous}A")?;
    }
    writeln!(out, "\r\x1b[J{frame}")?;
    out.flush()?;
    Ok(frame.lines().count())
}

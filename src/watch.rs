//! Periodic refresh for read-only views

use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::common::errors::Result;

/// Minimum refresh interval accepted from the command line
pub const MIN_REFRESH: Duration = Duration::from_secs(1);

/// Run `pass` every `interval` and hand each result to `render`
///
/// Stops when `shutdown` flips to `true` or its sender is dropped, including
/// while a sleep is pending. An error from `pass` ends the loop and is
/// returned. Returns the number of completed passes.
pub async fn run_watch<T, P, Fut, R>(
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
    mut pass: P,
    mut render: R,
) -> Result<usize>
where
    P: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
    R: FnMut(&T),
{
    let interval = interval.max(MIN_REFRESH);
    let mut passes = 0usize;

    loop {
        if *shutdown.borrow() {
            break;
        }

        let value = pass().await?;
        render(&value);
        passes += 1;
        debug!(passes, "Watch pass rendered");

        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            _ = tokio::time::sleep(interval) => {}
        }
    }

    info!(passes, "Watch stopped");
    Ok(passes)
}

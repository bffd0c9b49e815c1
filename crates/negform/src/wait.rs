//! Bounded condition polling

use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, Instant};

use crate::error::HarnessResult;

/// Poll `probe` every `interval` until it yields `Some` or `timeout` elapses.
///
/// The probe always runs at least once. `Ok(None)` is returned only once the
/// full `timeout` has passed, so callers can tell "timed out" from "found".
pub async fn poll_until<T, F, Fut>(
    timeout: Duration,
    interval: Duration,
    mut probe: F,
) -> HarnessResult<Option<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = HarnessResult<Option<T>>>,
{
    let deadline = Instant::now() + timeout;

    loop {
        if let Some(value) = probe().await? {
            return Ok(Some(value));
        }

        let now = Instant::now();
        if now >= deadline {
            return Ok(None);
        }
        sleep(interval.min(deadline - now)).await;
    }
}

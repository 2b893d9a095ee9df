//! Fixed-attempt retry wrapper for one outbound call.

use anyhow::Result;
use std::future::Future;
use tracing::warn;

/// Run `op` up to `max_attempts` times with no delay between attempts.
///
/// The first success returns immediately. A non-final failure is logged
/// and the identical call is retried; the final failure is returned to
/// the caller untouched. `max_attempts` of 0 is treated as 1.
pub async fn call_with_retry<T, F, Fut>(max_attempts: u32, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempts = max_attempts.max(1);

    for attempt in 1..=attempts {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < attempts => {
                warn!("Attempt {}/{} failed, retrying: {}", attempt, attempts, err);
            }
            Err(err) => return Err(err),
        }
    }

    unreachable!("retry loop returns on the final attempt")
}

//! Poll-with-timeout primitive shared by every waiting loop.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

/// Why a poll gave up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PollError {
    #[error("condition not met after {0} attempts")]
    Exhausted(u32),
    #[error("condition not met within {0:?}")]
    Deadline(Duration),
}

/// Run `probe` until it yields `Some`.
///
/// The first probe runs immediately; later ones are spaced by `interval`.
/// Gives up after `max_attempts` probes or once `timeout` has elapsed,
/// whichever comes first.
pub async fn poll_until<T, F, Fut>(
    mut probe: F,
    interval: Duration,
    max_attempts: u32,
    timeout: Duration,
) -> Result<T, PollError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    let attempts = async {
        for attempt in 1..=max_attempts {
            if let Some(value) = probe().await {
                return Ok(value);
            }
            if attempt < max_attempts {
                tokio::time::sleep(interval).await;
            }
        }
        Err(PollError::Exhausted(max_attempts))
    };

    tokio::time::timeout(timeout, attempts)
        .await
        .unwrap_or(Err(PollError::Deadline(timeout)))
}

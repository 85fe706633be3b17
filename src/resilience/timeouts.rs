//! Timeout enforcement.

use std::future::Future;
use std::time::Duration;

/// The wrapped operation did not finish within its deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("deadline of {deadline:?} exceeded")]
pub struct DeadlineExceeded {
    pub deadline: Duration,
}

/// Run `operation` under `deadline`.
///
/// On expiry the operation's future is dropped and `E::from(DeadlineExceeded)`
/// is returned; errors from the operation itself pass through unchanged.
pub async fn with_deadline<T, E, Fut>(deadline: Duration, operation: Fut) -> Result<T, E>
where
    Fut: Future<Output = Result<T, E>>,
    E: From<DeadlineExceeded>,
{
    match tokio::time::timeout(deadline, operation).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(deadline = ?deadline, "Operation exceeded its deadline");
            Err(DeadlineExceeded { deadline }.into())
        }
    }
}

//! Timeout enforcement for upstream calls.
//!
//! A request that outlives its deadline is abandoned and reported as a
//! distinct error so the dispatcher can answer 504 and count the attempt as
//! a backend failure.

use std::future::Future;
use std::time::Duration;

/// Error from a call bounded by a deadline.
#[derive(Debug, thiserror::Error)]
pub enum DeadlineError<E> {
    #[error("deadline of {0:?} elapsed")]
    Elapsed(Duration),
    #[error(transparent)]
    Inner(E),
}

/// Run `call`, giving up after `deadline`.
pub async fn call_with_deadline<F, T, E>(deadline: Duration, call: F) -> Result<T, DeadlineError<E>>
where
    F: Future<Output = Result<T, E>>,
{
    match tokio::time::timeout(deadline, call).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(DeadlineError::Inner(e)),
        Err(_) => Err(DeadlineError::Elapsed(deadline)),
    }
}

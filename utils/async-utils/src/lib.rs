//! Small async helpers shared by the shellkit crates.

use std::future::Future;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Returned when a future loses the race against its cancellation token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelErr {
    Cancelled,
}

/// Races a future against a [`CancellationToken`].
#[async_trait]
pub trait OrCancelExt: Sized {
    type Output;

    async fn or_cancel(self, token: &CancellationToken) -> Result<Self::Output, CancelErr>;
}

#[async_trait]
impl<F> OrCancelExt for F
where
    F: Future + Send,
    F::Output: Send,
{
    type Output = F::Output;

    async fn or_cancel(self, token: &CancellationToken) -> Result<Self::Output, CancelErr> {
        tokio::select! {
            biased;
            _ = token.cancelled() => Err(CancelErr::Cancelled),
            res = self => Ok(res),
        }
    }
}

/// Sleeps for `duration` unless `token` fires first.
///
/// A `None` token sleeps unconditionally.
pub async fn sleep_or_cancel(
    duration: std::time::Duration,
    token: Option<&CancellationToken>,
) -> Result<(), CancelErr> {
    match token {
        Some(token) => tokio::time::sleep(duration).or_cancel(token).await,
        None => {
            tokio::time::sleep(duration).await;
            Ok(())
        }
    }
}

#[cfg(test)]
#[path = "lib.test.rs"]
mod tests;

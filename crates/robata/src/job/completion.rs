use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::oneshot;
use crate::error::BatchError;
use super::state::BatchJob;

/// # WatchCompletion
///
/// Resolves with the final result of a watch loop.
///
/// `None` means the loop was stopped before it produced a result; the remote
/// job may still be running.
pub struct WatchCompletion {
    receiver: oneshot::Receiver<Result<BatchJob, BatchError>>,
}

impl WatchCompletion {
    pub(crate) fn new(receiver: oneshot::Receiver<Result<BatchJob, BatchError>>) -> Self {
        Self { receiver }
    }
}

impl Future for WatchCompletion {
    type Output = Option<Result<BatchJob, BatchError>>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.get_mut().receiver).poll(cx).map(Result::ok)
    }
}

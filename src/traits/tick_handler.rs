//! Asynchronous tick callback invoked by the dispatcher.
use core::future::Future;

use async_trait::async_trait;

use crate::error::TickError;

/// Zero-argument asynchronous callback run on every dispatched fire.
///
/// Invocations on one timer never overlap. The returned `Result` only marks
/// completion: an `Err` is logged, never retried, and the timer keeps working.
/// A handler may re-arm its own timer through a
/// [`TimerHandle`](crate::timer::TimerHandle) while it runs.
#[async_trait]
pub trait TickHandler: Send + Sync + 'static {
    async fn on_tick(&self) -> Result<(), TickError>;
}

/// Closures returning a future are handlers, e.g.
/// `|| async { flush().await }`.
#[async_trait]
impl<F, Fut, E> TickHandler for F
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), E>> + Send + 'static,
    E: Into<TickError> + 'static,
{
    async fn on_tick(&self) -> Result<(), TickError> {
        (self)().await.map_err(Into::into)
    }
}

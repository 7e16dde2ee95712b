//! Timekeeper backed by the tokio timer.

use std::time::Duration;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

use super::{Timekeeper, TimerError, TimerHandle};
use crate::service::BoxFuture;

/// Spawns one task per timer that races `tokio::time::sleep` against the
/// handle's cancellation token.
///
/// Without an explicit runtime handle the runtime is resolved when the timer
/// is scheduled, so a single instance can serve several runtimes.
#[derive(Debug, Clone, Default)]
pub struct TokioTimekeeper {
    runtime: Option<Handle>,
}

impl TokioTimekeeper {
    pub fn new() -> Self {
        Self { runtime: None }
    }

    /// Pin every timer to `runtime`.
    pub fn with_handle(runtime: Handle) -> Self {
        Self {
            runtime: Some(runtime),
        }
    }
}

impl Timekeeper for TokioTimekeeper {
    fn schedule_once(
        &self,
        delay: Duration,
        task: BoxFuture<()>,
    ) -> Result<TimerHandle, TimerError> {
        let runtime = match &self.runtime {
            Some(handle) => handle.clone(),
            None => Handle::try_current().map_err(|_| TimerError::NoRuntime)?,
        };

        let token = CancellationToken::new();
        let cancelled = token.clone();
        runtime.spawn(async move {
            tokio::select! {
                biased;
                _ = cancelled.cancelled() => {
                    tracing::trace!(
                        delay_ms = delay.as_millis() as u64,
                        "Timer cancelled before elapsing"
                    );
                }
                _ = tokio::time::sleep(delay) => {
                    task.await;
                }
            }
        });

        Ok(TimerHandle::new(token))
    }
}

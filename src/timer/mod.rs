//! One-shot timer scheduling.
//!
//! # Data Flow
//! ```text
//! Expiring decorator
//!     → slot.rs (Disarmed/Armed/Firing/Cancelled bookkeeping)
//!     → Timekeeper::schedule_once(delay, task)
//!         - runtime.rs (tokio sleep raced against a cancellation token)
//!         - manual.rs (virtual clock, driven by tests)
//!     → task polled only after an uncancelled elapse
//! ```
//!
//! # Design Decisions
//! - Tasks are lazy futures; scheduling never runs them inline
//! - Cancellation is a token flip: idempotent, infallible, non-blocking
//! - A cancelled-but-already-running task is filtered by the slot generation check
//! - The process-wide default lives in default.rs and can be overridden for tests

pub mod default;
pub mod manual;
pub mod runtime;
pub mod slot;

use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::service::BoxFuture;

pub use default::{default_timekeeper, install_default_timekeeper, reset_default_timekeeper};
pub use manual::ManualTimekeeper;
pub use runtime::TokioTimekeeper;
pub use slot::{TimerSlot, TimerState};

/// Errors raised while scheduling a timer.
#[derive(Debug, Error)]
pub enum TimerError {
    #[error("no tokio runtime available to drive timers")]
    NoRuntime,

    #[error("timekeeper rejected the timer: {0}")]
    Rejected(String),
}

/// A facility able to run a task once after a delay.
pub trait Timekeeper: Send + Sync + 'static {
    /// Schedule `task` to be polled once `delay` has elapsed, unless the
    /// returned handle is cancelled first.
    ///
    /// Must not block and must not poll `task` before returning.
    fn schedule_once(
        &self,
        delay: Duration,
        task: BoxFuture<()>,
    ) -> Result<TimerHandle, TimerError>;
}

/// Cancellation handle for a scheduled task.
///
/// Dropping the handle does not cancel the timer.
#[derive(Debug, Clone)]
pub struct TimerHandle {
    token: CancellationToken,
}

impl TimerHandle {
    pub fn new(token: CancellationToken) -> Self {
        Self { token }
    }

    /// Cancel the timer. Calling this on a fired or already-cancelled timer
    /// does nothing.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

//! Lifecycle expiry for request-processing capabilities.
//!
//! # Data Flow
//! ```text
//! call(req):
//!     → cancel idle timer (if armed)
//!     → outstanding += 1
//!     → wrapped.call(req)
//!     → on completion (success, failure or dropped future):
//!         outstanding -= 1
//!         outstanding == 0 → re-arm idle timer with the full timeout
//!
//! idle timer / max-lifetime timer elapses:
//!     → mark closed
//!     → wrapped.close()
//! ```
//!
//! # Design Decisions
//! - One lock guards the counter and both timer slots
//! - Timer tasks hold a `Weak` reference and re-check the slot before acting
//! - Requests after expiry are forwarded; the wrapped capability rejects them
//! - The max-lifetime timer is armed once and only cancelled by dropping the decorator

pub mod filter;
pub mod layer;

use std::fmt;

pub use filter::Expiring;
pub use layer::ExpiringLayer;

/// Which timer expired a capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    Idle,
    MaxLifetime,
}

impl TimerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimerKind::Idle => "idle",
            TimerKind::MaxLifetime => "max_lifetime",
        }
    }
}

impl fmt::Display for TimerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

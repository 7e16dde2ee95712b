//! Idle and max-lifetime expiry for asynchronous request-processing services.
//!
//! An [`Expiring`] decorator closes the service it wraps after a period with
//! no outstanding requests, or after an absolute lifetime, whichever comes
//! first. It never closes while a call is in flight because of inactivity.

// Core
pub mod expiring;
pub mod service;
pub mod timer;

// Cross-cutting concerns
pub mod config;
pub mod error;
pub mod observability;

pub use config::ExpiryConfig;
pub use error::ExpiryError;
pub use expiring::{Expiring, ExpiringLayer, TimerKind};
pub use service::{BoxFuture, Closeable, Service, TowerAdapter};
pub use timer::{ManualTimekeeper, Timekeeper, TimerHandle, TimerState, TokioTimekeeper};

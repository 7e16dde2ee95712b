//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Expiring decorators produce:
//!     → tracing events (arm, cancel, expiry, scheduling faults)
//!     → metrics.rs (counters, gauges)
//!
//! Consumers:
//!     → logging.rs subscriber (stdout)
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - The library only emits; installing subscribers/recorders is the binary's job
//! - Every event carries the service label
//! - Metric updates are no-ops until a recorder is installed

pub mod logging;
pub mod metrics;

//! Process-wide default timekeeper.
//!
//! Decorators built without an explicit timekeeper use whatever is installed
//! here at construction time. The slot starts out as a [`TokioTimekeeper`] and
//! can be swapped atomically, e.g. for a [`super::ManualTimekeeper`] in tests.

use arc_swap::ArcSwap;
use once_cell::sync::Lazy;
use std::sync::Arc;

use super::{Timekeeper, TokioTimekeeper};

struct Installed(Arc<dyn Timekeeper>);

static DEFAULT_TIMEKEEPER: Lazy<ArcSwap<Installed>> =
    Lazy::new(|| ArcSwap::from_pointee(Installed(Arc::new(TokioTimekeeper::new()))));

/// The currently installed default timekeeper.
pub fn default_timekeeper() -> Arc<dyn Timekeeper> {
    DEFAULT_TIMEKEEPER.load().0.clone()
}

/// Replace the default timekeeper, returning the previous one.
///
/// Decorators already constructed keep the timekeeper they started with.
pub fn install_default_timekeeper(timekeeper: Arc<dyn Timekeeper>) -> Arc<dyn Timekeeper> {
    let previous = DEFAULT_TIMEKEEPER.swap(Arc::new(Installed(timekeeper)));
    tracing::debug!("Default timekeeper replaced");
    previous.0.clone()
}

/// Restore the tokio-backed default.
pub fn reset_default_timekeeper() {
    DEFAULT_TIMEKEEPER.store(Arc::new(Installed(Arc::new(TokioTimekeeper::new()))));
}

//! The expiring decorator.

use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use std::time::Duration;

use super::TimerKind;
use crate::config::ExpiryConfig;
use crate::error::ExpiryError;
use crate::observability::metrics;
use crate::service::{BoxFuture, Closeable, Service};
use crate::timer::{default_timekeeper, Timekeeper, TimerError, TimerSlot, TimerState};

/// Closes the wrapped capability after an idle period or an absolute
/// lifetime, whichever comes first, without closing under in-flight calls.
///
/// A zero duration disables the corresponding timer. Dropping the decorator
/// cancels both timers; calls already in flight still complete.
pub struct Expiring<S> {
    shared: Arc<Shared<S>>,
}

struct Shared<S> {
    inner: Arc<S>,
    name: String,
    idle_timeout: Duration,
    max_lifetime: Duration,
    timekeeper: Arc<dyn Timekeeper>,
    lifecycle: Mutex<Lifecycle>,
}

#[derive(Debug, Default)]
struct Lifecycle {
    outstanding: usize,
    closed: bool,
    released: bool,
    expired_by: Option<TimerKind>,
    idle: TimerSlot,
    max: TimerSlot,
}

impl Lifecycle {
    fn slot_mut(&mut self, kind: TimerKind) -> &mut TimerSlot {
        match kind {
            TimerKind::Idle => &mut self.idle,
            TimerKind::MaxLifetime => &mut self.max,
        }
    }
}

impl<S: Closeable> Expiring<S> {
    /// Wrap `inner` using the process-wide default timekeeper.
    pub fn new(inner: S, config: ExpiryConfig) -> Result<Self, ExpiryError> {
        Self::with_timekeeper(inner, config, default_timekeeper())
    }

    /// Wrap `inner`, scheduling timers on `timekeeper`.
    pub fn with_timekeeper(
        inner: S,
        config: ExpiryConfig,
        timekeeper: Arc<dyn Timekeeper>,
    ) -> Result<Self, ExpiryError> {
        let expiring = Self {
            shared: Arc::new(Shared {
                inner: Arc::new(inner),
                idle_timeout: config.idle_timeout(),
                max_lifetime: config.max_lifetime(),
                name: config.name,
                timekeeper,
                lifecycle: Mutex::new(Lifecycle::default()),
            }),
        };

        // On error `expiring` is dropped here, which cancels anything armed.
        expiring.shared.arm_initial()?;

        tracing::debug!(
            service = %expiring.shared.name,
            idle_timeout_ms = expiring.shared.idle_timeout.as_millis() as u64,
            max_lifetime_ms = expiring.shared.max_lifetime.as_millis() as u64,
            "Expiring service created"
        );
        Ok(expiring)
    }
}

impl<S> Expiring<S> {
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn idle_timeout(&self) -> Duration {
        self.shared.idle_timeout
    }

    pub fn max_lifetime(&self) -> Duration {
        self.shared.max_lifetime
    }

    /// The wrapped capability.
    pub fn get_ref(&self) -> &S {
        &self.shared.inner
    }

    /// Number of calls started and not yet completed.
    pub fn outstanding(&self) -> usize {
        self.shared.lifecycle.lock().outstanding
    }

    pub fn idle_timer_state(&self) -> TimerState {
        self.shared.lifecycle.lock().idle.state()
    }

    pub fn max_timer_state(&self) -> TimerState {
        self.shared.lifecycle.lock().max.state()
    }

    /// Whether a timer fired or `close` was called on the decorator.
    pub fn is_closed(&self) -> bool {
        self.shared.lifecycle.lock().closed
    }

    /// The timer that first expired the capability, if any.
    pub fn expired_by(&self) -> Option<TimerKind> {
        self.shared.lifecycle.lock().expired_by
    }
}

impl<S: Closeable> Shared<S> {
    fn arm_initial(self: &Arc<Self>) -> Result<(), ExpiryError> {
        let mut lifecycle = self.lifecycle.lock();
        if !self.max_lifetime.is_zero() {
            self.schedule(&mut lifecycle, TimerKind::MaxLifetime)
                .map_err(|source| ExpiryError::Schedule {
                    kind: TimerKind::MaxLifetime,
                    source,
                })?;
        }
        self.arm_idle(&mut lifecycle)
            .map_err(|source| ExpiryError::Schedule {
                kind: TimerKind::Idle,
                source,
            })
    }

    /// Arm the idle timer if nothing is in flight and it is not already pending.
    fn arm_idle(self: &Arc<Self>, lifecycle: &mut Lifecycle) -> Result<(), TimerError> {
        if self.idle_timeout.is_zero()
            || lifecycle.outstanding != 0
            || lifecycle.closed
            || lifecycle.released
            || lifecycle.idle.is_armed()
        {
            return Ok(());
        }
        self.schedule(lifecycle, TimerKind::Idle)
    }

    fn schedule(
        self: &Arc<Self>,
        lifecycle: &mut Lifecycle,
        kind: TimerKind,
    ) -> Result<(), TimerError> {
        let delay = match kind {
            TimerKind::Idle => self.idle_timeout,
            TimerKind::MaxLifetime => self.max_lifetime,
        };
        let slot = lifecycle.slot_mut(kind);
        let generation = slot.next_generation();
        let task = Box::pin(expire(Arc::downgrade(self), kind, generation));
        let handle = self.timekeeper.schedule_once(delay, task)?;
        slot.arm(generation, handle);

        tracing::debug!(
            service = %self.name,
            timer = %kind,
            delay_ms = delay.as_millis() as u64,
            "Expiry timer armed"
        );
        Ok(())
    }

    fn begin_request(self: &Arc<Self>) -> OutstandingGuard<S> {
        let mut lifecycle = self.lifecycle.lock();
        if lifecycle.idle.cancel() {
            tracing::debug!(service = %self.name, "Idle timer cancelled by new request");
            metrics::record_timer_cancelled(&self.name, TimerKind::Idle.as_str());
        }
        lifecycle.outstanding += 1;
        metrics::set_outstanding(&self.name, lifecycle.outstanding);

        OutstandingGuard {
            shared: self.clone(),
        }
    }

    fn finish_request(self: &Arc<Self>) {
        let mut lifecycle = self.lifecycle.lock();
        debug_assert!(lifecycle.outstanding > 0, "outstanding request count underflow");
        lifecycle.outstanding = lifecycle.outstanding.saturating_sub(1);
        metrics::set_outstanding(&self.name, lifecycle.outstanding);

        if let Err(e) = self.arm_idle(&mut lifecycle) {
            tracing::error!(
                service = %self.name,
                error = %e,
                "Failed to re-arm idle timer; idle expiry disabled for this service"
            );
            metrics::record_schedule_failure(&self.name, TimerKind::Idle.as_str());
        }
    }

    /// Claim the right to close for a timer that elapsed.
    fn begin_expiry(&self, kind: TimerKind, generation: u64) -> bool {
        let mut lifecycle = self.lifecycle.lock();
        if lifecycle.released || !lifecycle.slot_mut(kind).try_fire(generation) {
            return false;
        }
        lifecycle.closed = true;
        lifecycle.expired_by.get_or_insert(kind);
        if kind == TimerKind::MaxLifetime && lifecycle.idle.cancel() {
            metrics::record_timer_cancelled(&self.name, TimerKind::Idle.as_str());
        }
        true
    }

    fn finish_expiry(&self, kind: TimerKind, generation: u64) {
        self.lifecycle.lock().slot_mut(kind).finish_fire(generation);
    }
}

async fn expire<S: Closeable>(shared: Weak<Shared<S>>, kind: TimerKind, generation: u64) {
    let Some(shared) = shared.upgrade() else {
        return;
    };
    if !shared.begin_expiry(kind, generation) {
        return;
    }

    tracing::info!(service = %shared.name, timer = %kind, "Service expired, closing");
    metrics::record_close(&shared.name, kind.as_str());
    shared.inner.close().await;
    shared.finish_expiry(kind, generation);
}

/// Completes one call when dropped, whether the response future finished
/// or was abandoned.
struct OutstandingGuard<S: Closeable> {
    shared: Arc<Shared<S>>,
}

impl<S: Closeable> Drop for OutstandingGuard<S> {
    fn drop(&mut self) {
        self.shared.finish_request();
    }
}

impl<S: Closeable> Closeable for Expiring<S> {
    fn close(&self) -> BoxFuture<()> {
        {
            let mut lifecycle = self.shared.lifecycle.lock();
            lifecycle.closed = true;
            if lifecycle.idle.cancel() {
                metrics::record_timer_cancelled(&self.shared.name, TimerKind::Idle.as_str());
            }
        }
        tracing::info!(service = %self.shared.name, "Service closed explicitly");
        metrics::record_close(&self.shared.name, "explicit");
        self.shared.inner.close()
    }

    fn is_available(&self) -> bool {
        self.shared.inner.is_available()
    }
}

impl<S, Req> Service<Req> for Expiring<S>
where
    S: Service<Req>,
{
    type Response = S::Response;
    type Error = S::Error;

    fn call(&self, req: Req) -> BoxFuture<Result<Self::Response, Self::Error>> {
        let guard = self.shared.begin_request();
        let response = self.shared.inner.call(req);
        Box::pin(async move {
            let result = response.await;
            drop(guard);
            result
        })
    }
}

impl<S> Drop for Expiring<S> {
    fn drop(&mut self) {
        let mut lifecycle = self.shared.lifecycle.lock();
        lifecycle.released = true;
        let idle = lifecycle.idle.cancel();
        let max = lifecycle.max.cancel();
        tracing::trace!(
            service = %self.shared.name,
            idle_cancelled = idle,
            max_cancelled = max,
            "Expiring service released"
        );
    }
}

impl<S> std::fmt::Debug for Expiring<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let lifecycle = self.shared.lifecycle.lock();
        f.debug_struct("Expiring")
            .field("name", &self.shared.name)
            .field("idle_timeout", &self.shared.idle_timeout)
            .field("max_lifetime", &self.shared.max_lifetime)
            .field("outstanding", &lifecycle.outstanding)
            .field("idle", &lifecycle.idle.state())
            .field("max", &lifecycle.max.state())
            .field("closed", &lifecycle.closed)
            .finish()
    }
}

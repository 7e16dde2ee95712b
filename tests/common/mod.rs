//! Shared utilities for expiry integration tests.

#![allow(dead_code)]

use expiring_service::{BoxFuture, Closeable, Service, Timekeeper, TimerHandle};
use expiring_service::timer::TimerError;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// A request to the mock: echo `id` after `latency`, or fail.
#[derive(Debug, Clone, Copy)]
pub struct Req {
    pub id: u32,
    pub latency: Duration,
    pub fail: bool,
}

impl Req {
    pub fn ok(id: u32, latency_ms: u64) -> Self {
        Self {
            id,
            latency: Duration::from_millis(latency_ms),
            fail: false,
        }
    }

    pub fn fail(id: u32, latency_ms: u64) -> Self {
        Self {
            fail: true,
            ..Self::ok(id, latency_ms)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockError {
    Closed,
    Failed(u32),
}

#[derive(Default)]
struct MockState {
    closed: AtomicBool,
    close_times: Mutex<Vec<Instant>>,
    closes_completed: AtomicUsize,
    calls: AtomicUsize,
    close_gate: Option<Arc<Notify>>,
}

/// Programmable capability that records every close and rejects calls
/// once closed.
#[derive(Clone, Default)]
pub struct MockService {
    state: Arc<MockState>,
}

impl MockService {
    pub fn new() -> Self {
        Self::default()
    }

    /// `close()` resolves only after `gate` is notified.
    pub fn with_close_gate(gate: Arc<Notify>) -> Self {
        Self {
            state: Arc::new(MockState {
                close_gate: Some(gate),
                ..MockState::default()
            }),
        }
    }

    pub fn close_count(&self) -> usize {
        self.state.close_times.lock().len()
    }

    pub fn close_times(&self) -> Vec<Instant> {
        self.state.close_times.lock().clone()
    }

    pub fn closes_completed(&self) -> usize {
        self.state.closes_completed.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.state.calls.load(Ordering::SeqCst)
    }
}

impl Closeable for MockService {
    fn close(&self) -> BoxFuture<()> {
        self.state.closed.store(true, Ordering::SeqCst);
        self.state.close_times.lock().push(Instant::now());
        let state = self.state.clone();
        Box::pin(async move {
            if let Some(gate) = &state.close_gate {
                gate.notified().await;
            }
            state.closes_completed.fetch_add(1, Ordering::SeqCst);
        })
    }

    fn is_available(&self) -> bool {
        !self.state.closed.load(Ordering::SeqCst)
    }
}

impl Service<Req> for MockService {
    type Response = u32;
    type Error = MockError;

    fn call(&self, req: Req) -> BoxFuture<Result<u32, MockError>> {
        self.state.calls.fetch_add(1, Ordering::SeqCst);
        if self.state.closed.load(Ordering::SeqCst) {
            return Box::pin(async { Err(MockError::Closed) });
        }
        Box::pin(async move {
            if !req.latency.is_zero() {
                tokio::time::sleep(req.latency).await;
            }
            if req.fail {
                Err(MockError::Failed(req.id))
            } else {
                Ok(req.id)
            }
        })
    }
}

/// Timekeeper whose cancellation always loses the race: tasks are kept and
/// run on demand even after their handle was cancelled.
#[derive(Default)]
pub struct LeakyTimekeeper {
    tasks: Mutex<Vec<BoxFuture<()>>>,
}

impl LeakyTimekeeper {
    pub fn scheduled(&self) -> usize {
        self.tasks.lock().len()
    }

    /// Run every task scheduled so far, cancelled or not, oldest first.
    pub async fn run_all(&self) {
        let tasks = std::mem::take(&mut *self.tasks.lock());
        for task in tasks {
            task.await;
        }
    }
}

impl Timekeeper for LeakyTimekeeper {
    fn schedule_once(
        &self,
        _delay: Duration,
        task: BoxFuture<()>,
    ) -> Result<TimerHandle, TimerError> {
        self.tasks.lock().push(task);
        Ok(TimerHandle::new(CancellationToken::new()))
    }
}

/// Timekeeper that refuses every timer.
pub struct BrokenTimekeeper;

impl Timekeeper for BrokenTimekeeper {
    fn schedule_once(
        &self,
        _delay: Duration,
        _task: BoxFuture<()>,
    ) -> Result<TimerHandle, TimerError> {
        Err(TimerError::Rejected("out of timers".to_string()))
    }
}

/// Assert `actual` lands on `expected_ms`, allowing for timer-wheel rounding.
pub fn assert_elapsed(actual: Duration, expected_ms: u64) {
    let expected = Duration::from_millis(expected_ms);
    assert!(
        actual >= expected && actual < expected + Duration::from_millis(3),
        "expected ~{:?}, got {:?}",
        expected,
        actual
    );
}

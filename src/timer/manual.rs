//! Virtual-clock timekeeper for deterministic tests.

use parking_lot::Mutex;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::{Timekeeper, TimerError, TimerHandle};
use crate::service::BoxFuture;

struct Entry {
    deadline: Duration,
    seq: u64,
    token: CancellationToken,
    task: BoxFuture<()>,
}

#[derive(Default)]
struct Clock {
    now: Duration,
    seq: u64,
    entries: Vec<Entry>,
}

/// Timekeeper whose clock only moves when [`ManualTimekeeper::advance`] is called.
#[derive(Default)]
pub struct ManualTimekeeper {
    clock: Mutex<Clock>,
}

impl ManualTimekeeper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Virtual time elapsed since creation.
    pub fn now(&self) -> Duration {
        self.clock.lock().now
    }

    /// Number of timers that are scheduled and not cancelled.
    pub fn pending(&self) -> usize {
        self.clock
            .lock()
            .entries
            .iter()
            .filter(|e| !e.token.is_cancelled())
            .count()
    }

    /// Move the clock forward and run every due, uncancelled task in
    /// deadline order.
    pub async fn advance(&self, by: Duration) {
        let mut due = {
            let mut clock = self.clock.lock();
            clock.now += by;
            let now = clock.now;
            let (due, rest): (Vec<Entry>, Vec<Entry>) = std::mem::take(&mut clock.entries)
                .into_iter()
                .filter(|e| !e.token.is_cancelled())
                .partition(|e| e.deadline <= now);
            clock.entries = rest;
            due
        };
        due.sort_by_key(|e| (e.deadline, e.seq));

        for entry in due {
            // A task earlier in this batch may have cancelled a later one.
            if entry.token.is_cancelled() {
                continue;
            }
            entry.task.await;
        }
    }
}

impl Timekeeper for ManualTimekeeper {
    fn schedule_once(
        &self,
        delay: Duration,
        task: BoxFuture<()>,
    ) -> Result<TimerHandle, TimerError> {
        let token = CancellationToken::new();
        let mut clock = self.clock.lock();
        clock.entries.retain(|e| !e.token.is_cancelled());
        clock.seq += 1;
        let entry = Entry {
            deadline: clock.now + delay,
            seq: clock.seq,
            token: token.clone(),
            task,
        };
        clock.entries.push(entry);
        Ok(TimerHandle::new(token))
    }
}

impl std::fmt::Debug for ManualTimekeeper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let clock = self.clock.lock();
        f.debug_struct("ManualTimekeeper")
            .field("now", &clock.now)
            .field("scheduled", &clock.entries.len())
            .finish()
    }
}

//! Per-timer state machine.
//!
//! # States
//! - Disarmed: nothing scheduled
//! - Armed: a task is scheduled and may still fire
//! - Firing: the task won the race and is running its action
//! - Cancelled: the pending task was cancelled before it fired
//!
//! Cancelled is a resting state: the slot reports it until the next `arm`,
//! and `arm` treats it exactly like Disarmed.
//!
//! # State Transitions
//! ```text
//! Disarmed/Cancelled → Armed: arm(generation, handle)
//! Armed → Cancelled: cancel()
//! Armed → Firing: try_fire(generation) with a matching generation
//! Firing → Disarmed: finish_fire(generation)
//! ```
//!
//! A slot is not synchronised on its own; callers keep it behind their lock.

use super::TimerHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    Disarmed,
    Armed,
    Firing,
    Cancelled,
}

#[derive(Debug)]
pub struct TimerSlot {
    state: TimerState,
    generation: u64,
    handle: Option<TimerHandle>,
}

impl TimerSlot {
    pub fn new() -> Self {
        Self {
            state: TimerState::Disarmed,
            generation: 0,
            handle: None,
        }
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn is_armed(&self) -> bool {
        self.state == TimerState::Armed
    }

    /// Reserve the generation the next scheduled task must present when it fires.
    pub fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    /// Record a scheduled task. A stale generation cancels the handle instead.
    pub fn arm(&mut self, generation: u64, handle: TimerHandle) {
        if generation != self.generation || self.state == TimerState::Armed {
            handle.cancel();
            return;
        }
        self.state = TimerState::Armed;
        self.handle = Some(handle);
    }

    /// Cancel a pending task. Returns `false` if nothing was armed.
    pub fn cancel(&mut self) -> bool {
        if self.state != TimerState::Armed {
            return false;
        }
        if let Some(handle) = self.handle.take() {
            handle.cancel();
        }
        self.state = TimerState::Cancelled;
        true
    }

    /// Claim the right to act for a task that just elapsed.
    pub fn try_fire(&mut self, generation: u64) -> bool {
        if self.state != TimerState::Armed || generation != self.generation {
            return false;
        }
        self.handle = None;
        self.state = TimerState::Firing;
        true
    }

    pub fn finish_fire(&mut self, generation: u64) {
        if self.state == TimerState::Firing && generation == self.generation {
            self.state = TimerState::Disarmed;
        }
    }
}

impl Default for TimerSlot {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_util::sync::CancellationToken;

    fn handle() -> (TimerHandle, CancellationToken) {
        let token = CancellationToken::new();
        (TimerHandle::new(token.clone()), token)
    }

    #[test]
    fn test_arm_then_fire() {
        let mut slot = TimerSlot::new();
        let generation = slot.next_generation();
        let (h, token) = handle();
        slot.arm(generation, h);
        assert!(slot.is_armed());

        assert!(slot.try_fire(generation));
        assert_eq!(slot.state(), TimerState::Firing);
        assert!(!token.is_cancelled());

        // Cancelling while the action runs is a no-op.
        assert!(!slot.cancel());
        assert_eq!(slot.state(), TimerState::Firing);

        slot.finish_fire(generation);
        assert_eq!(slot.state(), TimerState::Disarmed);
    }

    #[test]
    fn test_cancel_blocks_late_fire() {
        let mut slot = TimerSlot::new();
        let generation = slot.next_generation();
        let (h, token) = handle();
        slot.arm(generation, h);

        assert!(slot.cancel());
        assert!(token.is_cancelled());
        assert_eq!(slot.state(), TimerState::Cancelled);

        // Idempotent.
        assert!(!slot.cancel());
        assert!(!slot.try_fire(generation));
    }

    #[test]
    fn test_cancelled_rests_until_rearmed() {
        let mut slot = TimerSlot::new();
        let first = slot.next_generation();
        slot.arm(first, handle().0);
        slot.cancel();
        assert_eq!(slot.state(), TimerState::Cancelled);
        assert!(!slot.is_armed());

        // Finishing a fire that never started leaves it alone.
        slot.finish_fire(first);
        assert_eq!(slot.state(), TimerState::Cancelled);

        let second = slot.next_generation();
        let (h, token) = handle();
        slot.arm(second, h);
        assert_eq!(slot.state(), TimerState::Armed);
        assert!(!token.is_cancelled());
    }

    #[test]
    fn test_stale_generation_ignored_after_rearm() {
        let mut slot = TimerSlot::new();
        let first = slot.next_generation();
        slot.arm(first, handle().0);
        slot.cancel();

        let second = slot.next_generation();
        slot.arm(second, handle().0);

        assert!(!slot.try_fire(first));
        assert!(slot.is_armed());
        assert!(slot.try_fire(second));
    }

    #[test]
    fn test_arm_with_stale_generation_cancels_handle() {
        let mut slot = TimerSlot::new();
        let stale = slot.next_generation();
        let current = slot.next_generation();
        let (h, token) = handle();

        slot.arm(stale, h);
        assert!(token.is_cancelled());
        assert_eq!(slot.state(), TimerState::Disarmed);

        slot.arm(current, handle().0);
        assert!(slot.is_armed());
    }
}

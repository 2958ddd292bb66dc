use std::cell::{Cell, RefCell};
use std::collections::BinaryHeap;
use std::fmt;

use tracing::trace;

use crate::constants::FRAME_MILLIS;
use crate::time::{FrameClock, ScheduledTime};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScheduleToken(u64);

impl ScheduleToken {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

pub type FrameCallback = Box<dyn FnOnce()>;

/// Host frame scheduler. `after_millis == 0` means the next display frame;
/// a positive delay waits that long and then for the next frame.
pub trait Scheduler {
    fn schedule(&self, after_millis: u64, callback: FrameCallback) -> ScheduleToken;

    /// Returns false when the token already fired or was cancelled.
    fn cancel(&self, token: ScheduleToken) -> bool;

    fn now_millis(&self) -> u64;
}

struct PendingTask {
    at: ScheduledTime,
    token: ScheduleToken,
    callback: FrameCallback,
}

impl PartialEq for PendingTask {
    fn eq(&self, other: &Self) -> bool {
        self.at == other.at
    }
}

impl Eq for PendingTask {}

impl Ord for PendingTask {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.at.cmp(&other.at)
    }
}

impl PartialOrd for PendingTask {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Deterministic scheduler driven by explicit `advance` calls.
pub struct ManualScheduler {
    clock: Cell<FrameClock>,
    queue: RefCell<BinaryHeap<PendingTask>>,
    next_token: Cell<u64>,
    frame_millis: u64,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::with_frame_millis(FRAME_MILLIS)
    }

    pub fn with_frame_millis(frame_millis: u64) -> Self {
        Self {
            clock: Cell::new(FrameClock::new()),
            queue: RefCell::new(BinaryHeap::new()),
            next_token: Cell::new(0),
            frame_millis: frame_millis.max(1),
        }
    }

    pub fn frame_millis(&self) -> u64 {
        self.frame_millis
    }

    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }

    /// Moves the clock forward by `millis`, firing every callback that
    /// becomes due on the way. Returns how many fired.
    pub fn advance(&self, millis: u64) -> usize {
        let target = self.now_millis().saturating_add(millis);
        let mut fired = 0;
        loop {
            let task = {
                let mut queue = self.queue.borrow_mut();
                match queue.peek() {
                    Some(task) if task.at.millis <= target => queue.pop(),
                    _ => None,
                }
            };
            let Some(task) = task else { break };
            self.set_now(task.at.millis);
            trace!(token = task.token.raw(), at = task.at.millis, "scheduled callback fired");
            (task.callback)();
            fired += 1;
        }
        self.set_now(target);
        fired
    }

    pub fn run_next_frame(&self) -> usize {
        self.advance(self.frame_millis)
    }

    pub fn run_frames(&self, frames: usize) -> usize {
        (0..frames).map(|_| self.run_next_frame()).sum()
    }

    fn set_now(&self, millis: u64) {
        let mut clock = self.clock.get();
        clock.advance_to(millis);
        self.clock.set(clock);
    }
}

impl Default for ManualScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualScheduler")
            .field("now_millis", &self.now_millis())
            .field("pending", &self.pending())
            .field("frame_millis", &self.frame_millis)
            .finish()
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, after_millis: u64, callback: FrameCallback) -> ScheduleToken {
        let sequence = self.next_token.get();
        self.next_token.set(sequence + 1);
        let token = ScheduleToken::new(sequence);
        let due = self
            .now_millis()
            .saturating_add(after_millis)
            .saturating_add(self.frame_millis);
        self.queue.borrow_mut().push(PendingTask {
            at: ScheduledTime::new(due, sequence),
            token,
            callback,
        });
        token
    }

    fn cancel(&self, token: ScheduleToken) -> bool {
        let mut queue = self.queue.borrow_mut();
        let before = queue.len();
        queue.retain(|task| task.token != token);
        queue.len() != before
    }

    fn now_millis(&self) -> u64 {
        self.clock.get().now_millis()
    }
}

/// Pending callback of a loop, so stopping can cancel it.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FrameSlot {
    token: Option<ScheduleToken>,
}

impl FrameSlot {
    pub fn arm(&mut self, token: ScheduleToken) {
        self.token = Some(token);
    }

    pub fn is_armed(&self) -> bool {
        self.token.is_some()
    }

    pub fn take(&mut self) -> Option<ScheduleToken> {
        self.token.take()
    }

    pub fn cancel(&mut self, scheduler: &dyn Scheduler) -> bool {
        match self.token.take() {
            Some(token) => scheduler.cancel(token),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    fn recorder() -> (Rc<RefCell<Vec<&'static str>>>, impl Fn(&'static str) -> FrameCallback) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let handle = Rc::clone(&log);
        let make = move |name: &'static str| -> FrameCallback {
            let log = Rc::clone(&handle);
            Box::new(move || log.borrow_mut().push(name))
        };
        (log, make)
    }

    #[test]
    fn callbacks_fire_in_due_order() {
        let scheduler = ManualScheduler::new();
        let (log, make) = recorder();
        scheduler.schedule(100, make("late"));
        scheduler.schedule(0, make("first"));
        scheduler.schedule(0, make("second"));

        assert_eq!(scheduler.run_next_frame(), 2);
        assert_eq!(*log.borrow(), vec!["first", "second"]);
        assert_eq!(scheduler.advance(100), 1);
        assert_eq!(*log.borrow(), vec!["first", "second", "late"]);
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn cancelled_callbacks_never_fire() {
        let scheduler = ManualScheduler::new();
        let (log, make) = recorder();
        let token = scheduler.schedule(0, make("ghost"));
        assert!(scheduler.cancel(token));
        assert!(!scheduler.cancel(token));
        scheduler.run_frames(3);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn rescheduling_inside_a_callback_waits_for_the_next_frame() {
        let scheduler = Rc::new(ManualScheduler::new());
        let hits = Rc::new(Cell::new(0));
        fn chain(scheduler: Rc<ManualScheduler>, hits: Rc<Cell<u32>>) {
            let next = Rc::clone(&scheduler);
            scheduler.schedule(
                0,
                Box::new(move || {
                    hits.set(hits.get() + 1);
                    chain(next, hits);
                }),
            );
        }
        chain(Rc::clone(&scheduler), Rc::clone(&hits));

        assert_eq!(scheduler.run_next_frame(), 1);
        assert_eq!(scheduler.run_frames(4), 4);
        assert_eq!(hits.get(), 5);
        assert_eq!(scheduler.now_millis(), 5 * FRAME_MILLIS);
    }

    #[test]
    fn frame_slot_cancels_only_the_armed_token() {
        let scheduler = ManualScheduler::new();
        let mut slot = FrameSlot::default();
        let _old = scheduler.schedule(0, Box::new(|| {}));
        let new = scheduler.schedule(0, Box::new(|| {}));
        slot.arm(new);
        assert!(slot.is_armed());
        assert!(slot.cancel(&scheduler));
        assert!(!slot.is_armed());
        assert_eq!(scheduler.pending(), 1);
    }
}

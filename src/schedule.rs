//! Time: timeouts, intervals, animation frames.
//!
//! Components schedule work through the [`Scheduler`] trait and never read a
//! wall clock directly. [`VirtualClock`] is the in-tree implementation: time
//! only moves when [`VirtualClock::advance`] is called, which makes every
//! animation, debounce and auto-advance deterministic under test.
//!
//! Three helpers cover the scheduling patterns the widgets share:
//!
//! - [`animate`] drives a step function once per frame until it reports
//!   [`Step::Done`].
//! - [`FrameGate`] coalesces bursts of events into one update per frame.
//! - [`Debouncer`] runs only the last call of a burst after a quiet period.

use crate::events::Subscription;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

/// Milliseconds since the scheduler started.
pub type Millis = u64;

/// Length of one rendered frame (~60 Hz).
pub const FRAME_MS: Millis = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

pub trait Scheduler {
    fn now(&self) -> Millis;
    fn set_timeout(&self, delay: Millis, callback: Box<dyn FnOnce()>) -> TimerId;
    fn set_interval(&self, period: Millis, callback: Rc<dyn Fn()>) -> TimerId;
    /// Run `callback` at the next frame boundary with the frame timestamp.
    fn request_frame(&self, callback: Box<dyn FnOnce(Millis)>) -> TimerId;
    /// Cancel a pending timeout, interval or frame. Unknown ids are ignored.
    fn cancel(&self, id: TimerId);
}

/// A subscription that cancels `id` when dropped.
pub fn cancel_on_drop(scheduler: &Rc<dyn Scheduler>, id: TimerId) -> Subscription {
    let scheduler = Rc::clone(scheduler);
    Subscription::new(move || scheduler.cancel(id))
}

enum Task {
    Once(Box<dyn FnOnce()>),
    Frame(Box<dyn FnOnce(Millis)>),
    Repeat { period: Millis, callback: Rc<dyn Fn()> },
}

struct Pending {
    id: TimerId,
    due: Millis,
    seq: u64,
    task: Task,
}

/// Manually driven clock.
#[derive(Default)]
pub struct VirtualClock {
    now: Cell<Millis>,
    next_seq: Cell<u64>,
    frames_requested: Cell<u64>,
    pending: RefCell<Vec<Pending>>,
}

impl fmt::Debug for VirtualClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VirtualClock")
            .field("now", &self.now.get())
            .field("pending", &self.pending.borrow().len())
            .finish()
    }
}

impl VirtualClock {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    fn next_seq(&self) -> u64 {
        let seq = self.next_seq.get();
        self.next_seq.set(seq + 1);
        seq
    }

    fn push(&self, id: TimerId, due: Millis, task: Task) {
        let seq = self.next_seq();
        self.pending.borrow_mut().push(Pending { id, due, seq, task });
    }

    fn schedule(&self, due: Millis, task: Task) -> TimerId {
        let id = TimerId(self.next_seq());
        self.push(id, due, task);
        id
    }

    /// Move time forward by `ms`, running everything that falls due in order.
    pub fn advance(&self, ms: Millis) {
        let end = self.now.get().saturating_add(ms);
        loop {
            let next = {
                let mut pending = self.pending.borrow_mut();
                let index = pending
                    .iter()
                    .enumerate()
                    .filter(|(_, p)| p.due <= end)
                    .min_by_key(|(_, p)| (p.due, p.seq))
                    .map(|(i, _)| i);
                index.map(|i| pending.swap_remove(i))
            };
            let Some(task) = next else {
                break;
            };
            self.now.set(task.due.max(self.now.get()));
            match task.task {
                Task::Once(callback) => callback(),
                Task::Frame(callback) => callback(task.due),
                Task::Repeat { period, callback } => {
                    // Re-armed before running so the callback may cancel itself.
                    self.push(
                        task.id,
                        task.due + period,
                        Task::Repeat {
                            period,
                            callback: Rc::clone(&callback),
                        },
                    );
                    callback();
                }
            }
        }
        self.now.set(end);
    }

    /// Advance frame by frame until no frame callbacks remain, up to `limit`.
    pub fn run_frames(&self, limit: Millis) {
        let mut spent = 0;
        while spent < limit && self.pending_frames() > 0 {
            self.advance(FRAME_MS);
            spent += FRAME_MS;
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending.borrow().len()
    }

    pub fn pending_frames(&self) -> usize {
        self.pending
            .borrow()
            .iter()
            .filter(|p| matches!(p.task, Task::Frame(_)))
            .count()
    }

    pub fn live_intervals(&self) -> usize {
        self.pending
            .borrow()
            .iter()
            .filter(|p| matches!(p.task, Task::Repeat { .. }))
            .count()
    }

    /// Total number of `request_frame` calls so far.
    pub fn frames_requested(&self) -> u64 {
        self.frames_requested.get()
    }
}

impl Scheduler for VirtualClock {
    fn now(&self) -> Millis {
        self.now.get()
    }

    fn set_timeout(&self, delay: Millis, callback: Box<dyn FnOnce()>) -> TimerId {
        self.schedule(self.now.get() + delay, Task::Once(callback))
    }

    fn set_interval(&self, period: Millis, callback: Rc<dyn Fn()>) -> TimerId {
        let period = period.max(1);
        self.schedule(self.now.get() + period, Task::Repeat { period, callback })
    }

    fn request_frame(&self, callback: Box<dyn FnOnce(Millis)>) -> TimerId {
        self.frames_requested.set(self.frames_requested.get() + 1);
        let boundary = (self.now.get() / FRAME_MS + 1) * FRAME_MS;
        self.schedule(boundary, Task::Frame(callback))
    }

    fn cancel(&self, id: TimerId) {
        self.pending.borrow_mut().retain(|p| p.id != id);
    }
}

// =============================================================================
// Animation driver
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Continue,
    Done,
}

struct Animation {
    start: Option<Millis>,
    step: Box<dyn FnMut(Millis) -> Step>,
}

/// Handle to a running [`animate`] loop.
#[derive(Clone)]
pub struct AnimationHandle {
    scheduler: Rc<dyn Scheduler>,
    frame: Rc<Cell<Option<TimerId>>>,
}

impl fmt::Debug for AnimationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnimationHandle")
            .field("frame", &self.frame.get())
            .finish()
    }
}

impl AnimationHandle {
    pub fn is_running(&self) -> bool {
        self.frame.get().is_some()
    }

    /// Stop before the next frame. No-op once the animation is done.
    pub fn cancel(&self) {
        if let Some(id) = self.frame.take() {
            self.scheduler.cancel(id);
        }
    }
}

/// Call `step` once per frame with the elapsed time since the first frame,
/// until it returns [`Step::Done`].
pub fn animate<F>(scheduler: &Rc<dyn Scheduler>, step: F) -> AnimationHandle
where
    F: FnMut(Millis) -> Step + 'static,
{
    let state = Rc::new(RefCell::new(Animation {
        start: None,
        step: Box::new(step),
    }));
    let frame = Rc::new(Cell::new(None));
    next_frame(Rc::clone(scheduler), state, Rc::clone(&frame));
    AnimationHandle {
        scheduler: Rc::clone(scheduler),
        frame,
    }
}

fn next_frame(
    scheduler: Rc<dyn Scheduler>,
    state: Rc<RefCell<Animation>>,
    frame: Rc<Cell<Option<TimerId>>>,
) {
    let driver = Rc::clone(&scheduler);
    let slot = Rc::clone(&frame);
    let id = scheduler.request_frame(Box::new(move |timestamp| {
        slot.set(None);
        let outcome = {
            let mut animation = state.borrow_mut();
            let start = *animation.start.get_or_insert(timestamp);
            (animation.step)(timestamp.saturating_sub(start))
        };
        if outcome == Step::Continue {
            next_frame(driver, state, slot);
        }
    }));
    frame.set(Some(id));
}

// =============================================================================
// Coalescing and debouncing
// =============================================================================

/// At most one pending frame update at a time.
pub struct FrameGate {
    scheduler: Rc<dyn Scheduler>,
    pending: Cell<Option<TimerId>>,
}

impl fmt::Debug for FrameGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameGate")
            .field("pending", &self.pending.get())
            .finish()
    }
}

impl FrameGate {
    pub fn new(scheduler: Rc<dyn Scheduler>) -> Rc<Self> {
        Rc::new(Self {
            scheduler,
            pending: Cell::new(None),
        })
    }

    /// Schedule `update` for the next frame unless one is already pending.
    /// Returns whether a frame was requested.
    pub fn schedule<F>(self: &Rc<Self>, update: F) -> bool
    where
        F: FnOnce() + 'static,
    {
        if self.is_pending() {
            return false;
        }
        let this: Weak<Self> = Rc::downgrade(self);
        let id = self.scheduler.request_frame(Box::new(move |_| {
            if let Some(this) = this.upgrade() {
                this.pending.set(None);
            }
            update();
        }));
        self.pending.set(Some(id));
        true
    }

    pub fn is_pending(&self) -> bool {
        self.pending.get().is_some()
    }

    /// Drop the pending frame, if any.
    pub fn cancel(&self) {
        if let Some(id) = self.pending.take() {
            self.scheduler.cancel(id);
        }
    }

    /// A subscription that cancels the pending frame when dropped.
    pub fn cancel_on_drop(self: &Rc<Self>) -> Subscription {
        let gate = Rc::clone(self);
        Subscription::new(move || gate.cancel())
    }
}

/// Runs only the last call in a burst, `delay` after the burst ends.
pub struct Debouncer {
    scheduler: Rc<dyn Scheduler>,
    delay: Millis,
    pending: Cell<Option<TimerId>>,
}

impl fmt::Debug for Debouncer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Debouncer")
            .field("delay", &self.delay)
            .field("pending", &self.pending.get())
            .finish()
    }
}

impl Debouncer {
    pub fn new(scheduler: Rc<dyn Scheduler>, delay: Millis) -> Rc<Self> {
        Rc::new(Self {
            scheduler,
            delay,
            pending: Cell::new(None),
        })
    }

    pub fn call<F>(self: &Rc<Self>, f: F)
    where
        F: FnOnce() + 'static,
    {
        self.cancel();
        let this: Weak<Self> = Rc::downgrade(self);
        let id = self.scheduler.set_timeout(
            self.delay,
            Box::new(move || {
                if let Some(this) = this.upgrade() {
                    this.pending.set(None);
                }
                f();
            }),
        );
        self.pending.set(Some(id));
    }

    pub fn cancel(&self) {
        if let Some(id) = self.pending.take() {
            self.scheduler.cancel(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clock() -> (Rc<VirtualClock>, Rc<dyn Scheduler>) {
        let clock = VirtualClock::new();
        let scheduler: Rc<dyn Scheduler> = clock.clone();
        (clock, scheduler)
    }

    #[test]
    fn timeouts_fire_in_due_order() {
        let (clock, scheduler) = clock();
        let log = Rc::new(RefCell::new(Vec::new()));
        for (delay, tag) in [(300, "c"), (100, "a"), (200, "b")] {
            let log = Rc::clone(&log);
            scheduler.set_timeout(delay, Box::new(move || log.borrow_mut().push(tag)));
        }
        clock.advance(250);
        assert_eq!(*log.borrow(), vec!["a", "b"]);
        clock.advance(100);
        assert_eq!(*log.borrow(), vec!["a", "b", "c"]);
        assert_eq!(clock.now(), 350);
    }

    #[test]
    fn interval_repeats_until_cancelled() {
        let (clock, scheduler) = clock();
        let count = Rc::new(Cell::new(0));
        let counter = Rc::clone(&count);
        let id = scheduler.set_interval(100, Rc::new(move || counter.set(counter.get() + 1)));
        clock.advance(350);
        assert_eq!(count.get(), 3);
        scheduler.cancel(id);
        clock.advance(1000);
        assert_eq!(count.get(), 3);
        assert_eq!(clock.live_intervals(), 0);
    }

    #[test]
    fn frames_align_to_boundaries() {
        let (clock, scheduler) = clock();
        clock.advance(5);
        let stamp = Rc::new(Cell::new(0));
        let seen = Rc::clone(&stamp);
        scheduler.request_frame(Box::new(move |t| seen.set(t)));
        clock.advance(FRAME_MS);
        assert_eq!(stamp.get(), FRAME_MS);
    }

    #[test]
    fn animate_reports_elapsed_until_done() {
        let (clock, scheduler) = clock();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&seen);
        animate(&scheduler, move |elapsed| {
            log.borrow_mut().push(elapsed);
            if elapsed >= 48 { Step::Done } else { Step::Continue }
        });
        clock.run_frames(1000);
        assert_eq!(*seen.borrow(), vec![0, 16, 32, 48]);
        assert_eq!(clock.pending_frames(), 0);
    }

    #[test]
    fn cancelled_animation_stops_stepping() {
        let (clock, scheduler) = clock();
        let steps = Rc::new(Cell::new(0));
        let counter = Rc::clone(&steps);
        let handle = animate(&scheduler, move |_| {
            counter.set(counter.get() + 1);
            Step::Continue
        });
        clock.advance(FRAME_MS * 3);
        assert!(handle.is_running());
        let seen = steps.get();
        handle.cancel();
        assert!(!handle.is_running());
        assert_eq!(clock.pending_frames(), 0);
        clock.advance(FRAME_MS * 10);
        assert_eq!(steps.get(), seen);
    }

    #[test]
    fn frame_gate_coalesces_bursts() {
        let (clock, scheduler) = clock();
        let gate = FrameGate::new(Rc::clone(&scheduler));
        let runs = Rc::new(Cell::new(0));
        for _ in 0..10 {
            let runs = Rc::clone(&runs);
            gate.schedule(move || runs.set(runs.get() + 1));
        }
        assert_eq!(clock.frames_requested(), 1);
        clock.advance(FRAME_MS);
        assert_eq!(runs.get(), 1);
        assert!(!gate.is_pending());
    }

    #[test]
    fn dropping_frame_gate_guard_cancels_pending_frame() {
        let (clock, scheduler) = clock();
        let gate = FrameGate::new(Rc::clone(&scheduler));
        let guard = gate.cancel_on_drop();
        let runs = Rc::new(Cell::new(0));
        let counter = Rc::clone(&runs);
        assert!(gate.schedule(move || counter.set(counter.get() + 1)));
        assert_eq!(clock.pending_frames(), 1);
        drop(guard);
        assert_eq!(clock.pending_frames(), 0);
        assert!(!gate.is_pending());
        clock.advance(FRAME_MS * 4);
        assert_eq!(runs.get(), 0);
    }

    #[test]
    fn debouncer_runs_only_last_call() {
        let (clock, scheduler) = clock();
        let debouncer = Debouncer::new(scheduler, 250);
        let last = Rc::new(Cell::new(0));
        for i in 1..=5 {
            let last = Rc::clone(&last);
            debouncer.call(move || last.set(i));
            clock.advance(100);
        }
        assert_eq!(last.get(), 0);
        clock.advance(150);
        assert_eq!(last.get(), 5);
        assert_eq!(clock.pending_count(), 0);
    }
}

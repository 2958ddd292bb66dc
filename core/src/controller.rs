use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::{debug, trace};

use crate::scheduler::{FrameSlot, Scheduler};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopControl {
    Continue,
    Stop,
}

/// Domain logic plugged into the run/stop/step state machine.
pub trait ControllerHooks {
    fn on_step(&mut self) -> LoopControl;

    fn on_start(&mut self) {}

    fn on_stop(&mut self) {}

    fn on_reset(&mut self) {}
}

#[derive(Debug, Default)]
struct ControlState {
    running: bool,
    speed_millis: u64,
    slot: FrameSlot,
    steps: u64,
}

type StateListener = Rc<dyn Fn(bool)>;

struct Shared {
    state: RefCell<ControlState>,
    hooks: RefCell<Box<dyn ControllerHooks>>,
    listener: RefCell<Option<StateListener>>,
    scheduler: Rc<dyn Scheduler>,
}

/// Play/pause/step semantics shared by every visualisation.
#[derive(Clone)]
pub struct SimulationController {
    shared: Rc<Shared>,
}

impl SimulationController {
    pub fn new(
        hooks: Box<dyn ControllerHooks>,
        scheduler: Rc<dyn Scheduler>,
        speed_millis: u64,
    ) -> Self {
        Self {
            shared: Rc::new(Shared {
                state: RefCell::new(ControlState {
                    speed_millis,
                    ..ControlState::default()
                }),
                hooks: RefCell::new(hooks),
                listener: RefCell::new(None),
                scheduler,
            }),
        }
    }

    pub fn is_running(&self) -> bool {
        self.shared.state.borrow().running
    }

    /// Caption of the single Run/Stop control.
    pub fn run_label(&self) -> &'static str {
        if self.is_running() { "Stop" } else { "Run" }
    }

    pub fn step_count(&self) -> u64 {
        self.shared.state.borrow().steps
    }

    pub fn speed_millis(&self) -> u64 {
        self.shared.state.borrow().speed_millis
    }

    pub fn set_speed_millis(&self, speed_millis: u64) {
        self.shared.state.borrow_mut().speed_millis = speed_millis;
    }

    /// Called with the new running flag after every start and stop.
    pub fn set_state_listener(&self, listener: impl Fn(bool) + 'static) {
        *self.shared.listener.borrow_mut() = Some(Rc::new(listener));
    }

    pub fn start(&self) {
        {
            let mut state = self.shared.state.borrow_mut();
            if state.running {
                return;
            }
            state.running = true;
        }
        debug!("コントローラーを開始");
        self.notify(true);
        self.shared.hooks.borrow_mut().on_start();
        self.tick();
    }

    pub fn stop(&self) {
        {
            let mut state = self.shared.state.borrow_mut();
            if !state.running {
                return;
            }
            state.running = false;
            state.slot.cancel(self.shared.scheduler.as_ref());
        }
        debug!(steps = self.step_count(), "コントローラーを停止");
        self.notify(false);
        self.shared.hooks.borrow_mut().on_stop();
    }

    /// Step control: ends any run, then advances exactly once.
    pub fn step_once(&self) -> LoopControl {
        self.stop();
        self.step()
    }

    pub fn toggle_run(&self) {
        if self.is_running() {
            self.stop();
        } else {
            self.start();
        }
    }

    pub fn reset(&self) {
        self.stop();
        self.shared.hooks.borrow_mut().on_reset();
    }

    fn step(&self) -> LoopControl {
        self.shared.state.borrow_mut().steps += 1;
        self.shared.hooks.borrow_mut().on_step()
    }

    fn tick(&self) {
        if self.step() == LoopControl::Stop {
            self.stop();
            return;
        }
        let speed_millis = {
            let state = self.shared.state.borrow();
            if !state.running {
                return;
            }
            state.speed_millis
        };
        let weak: Weak<Shared> = Rc::downgrade(&self.shared);
        let token = self.shared.scheduler.schedule(
            speed_millis,
            Box::new(move || {
                let Some(shared) = weak.upgrade() else {
                    return;
                };
                {
                    let mut state = shared.state.borrow_mut();
                    if state.slot.take().is_none() || !state.running {
                        return;
                    }
                }
                trace!("コントローラーのループ");
                SimulationController { shared }.tick();
            }),
        );
        self.shared.state.borrow_mut().slot.arm(token);
    }

    fn notify(&self, running: bool) {
        let listener = self.shared.listener.borrow().clone();
        if let Some(listener) = listener {
            listener(running);
        }
    }
}

impl fmt::Debug for SimulationController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.borrow();
        f.debug_struct("SimulationController")
            .field("running", &state.running)
            .field("speed_millis", &state.speed_millis)
            .field("steps", &state.steps)
            .field("pending", &state.slot.is_armed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    use crate::scheduler::ManualScheduler;

    #[derive(Default)]
    struct Calls {
        steps: Cell<u32>,
        starts: Cell<u32>,
        stops: Cell<u32>,
        resets: Cell<u32>,
        stop_after: Cell<Option<u32>>,
    }

    struct CountingHooks(Rc<Calls>);

    impl ControllerHooks for CountingHooks {
        fn on_step(&mut self) -> LoopControl {
            let steps = self.0.steps.get() + 1;
            self.0.steps.set(steps);
            match self.0.stop_after.get() {
                Some(limit) if steps >= limit => LoopControl::Stop,
                _ => LoopControl::Continue,
            }
        }

        fn on_start(&mut self) {
            self.0.starts.set(self.0.starts.get() + 1);
        }

        fn on_stop(&mut self) {
            self.0.stops.set(self.0.stops.get() + 1);
        }

        fn on_reset(&mut self) {
            self.0.resets.set(self.0.resets.get() + 1);
        }
    }

    fn controller(speed_millis: u64) -> (SimulationController, Rc<Calls>, Rc<ManualScheduler>) {
        let calls = Rc::new(Calls::default());
        let scheduler = Rc::new(ManualScheduler::new());
        let controller = SimulationController::new(
            Box::new(CountingHooks(calls.clone())),
            scheduler.clone(),
            speed_millis,
        );
        (controller, calls, scheduler)
    }

    #[test]
    fn start_steps_immediately_and_every_frame() {
        let (controller, calls, scheduler) = controller(0);
        controller.start();
        assert_eq!(calls.steps.get(), 1);
        assert_eq!(controller.run_label(), "Stop");
        scheduler.run_frames(4);
        assert_eq!(calls.steps.get(), 5);

        controller.start();
        assert_eq!(calls.starts.get(), 1);
        assert_eq!(calls.steps.get(), 5);
    }

    #[test]
    fn stop_is_idempotent_and_leaves_no_ghost_steps() {
        let (controller, calls, scheduler) = controller(0);
        controller.start();
        scheduler.run_frames(2);
        controller.stop();
        controller.stop();
        assert_eq!(calls.stops.get(), 1);

        let steps = calls.steps.get();
        scheduler.run_frames(10);
        assert_eq!(calls.steps.get(), steps);
        assert_eq!(scheduler.pending(), 0);
        assert_eq!(controller.run_label(), "Run");
    }

    #[test]
    fn delay_waits_the_configured_speed() {
        let (controller, calls, scheduler) = controller(100);
        controller.start();
        scheduler.run_frames(3);
        assert_eq!(calls.steps.get(), 1);
        scheduler.advance(100);
        assert_eq!(calls.steps.get(), 2);
    }

    #[test]
    fn step_once_stops_a_run_first() {
        let (controller, calls, scheduler) = controller(0);
        controller.start();
        controller.step_once();
        assert!(!controller.is_running());
        assert_eq!(calls.stops.get(), 1);
        assert_eq!(calls.steps.get(), 2);
        scheduler.run_frames(3);
        assert_eq!(calls.steps.get(), 2);

        controller.step_once();
        assert_eq!(calls.stops.get(), 1);
        assert_eq!(calls.steps.get(), 3);
    }

    #[test]
    fn hook_can_end_the_run() {
        let (controller, calls, scheduler) = controller(0);
        calls.stop_after.set(Some(3));
        controller.start();
        scheduler.run_frames(10);
        assert_eq!(calls.steps.get(), 3);
        assert!(!controller.is_running());
        assert_eq!(calls.stops.get(), 1);
    }

    #[test]
    fn reset_stops_then_resets_from_either_state() {
        let (controller, calls, scheduler) = controller(0);
        controller.reset();
        assert_eq!(calls.resets.get(), 1);
        assert_eq!(calls.stops.get(), 0);

        controller.toggle_run();
        controller.reset();
        assert_eq!(calls.stops.get(), 1);
        assert_eq!(calls.resets.get(), 2);
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn listener_sees_state_changes() {
        let (controller, _calls, _scheduler) = controller(0);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        controller.set_state_listener(move |running| sink.borrow_mut().push(running));
        controller.toggle_run();
        controller.toggle_run();
        controller.stop();
        assert_eq!(*seen.borrow(), vec![true, false]);
    }
}

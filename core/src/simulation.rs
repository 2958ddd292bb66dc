mod builder;
mod context;

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tracing::{debug, warn};

pub use builder::SimulationBuilder;
pub use context::{RangeFn, SampleContext, SampleHook, SampleObserver, SimulationParams};

use crate::binning::BinRange;
use crate::config::SimulationConfig;
use crate::controller::{ControllerHooks, LoopControl, SimulationController};
use crate::layout::LayoutStrategy;
use crate::render::{SubscriptionId, ThemeProvider};
use crate::runner::{RunnerSnapshot, RunnerState, SimulationRunner};
use crate::scheduler::Scheduler;
use builder::SimulationBootstrap;
use context::Sampler;

struct SimulationCore {
    config: SimulationConfig,
    sampler: Sampler,
    range_fn: RangeFn,
    layout: Box<dyn LayoutStrategy>,
    on_start: SampleHook,
    on_step: Option<SampleObserver>,
    on_recompute: Option<SampleObserver>,
    run_started_at: Option<u64>,
}

impl SimulationCore {
    /// Re-derives range, bin count and layout, then clears the histogram.
    fn recompute(&mut self, runner: &SimulationRunner) {
        let next = (self.range_fn)(&self.sampler.params);
        match next.validate() {
            Ok(()) => self.sampler.range = next,
            Err(error) => warn!(%error, "範囲関数の結果を無視し、直前の範囲を使います"),
        }
        let bins = self.sampler.range.bins.unwrap_or(self.config.bins);
        self.sampler.bins = bins;
        self.sampler.samples.clear();

        let width = runner.with_state(|state| state.plot_width());
        let layout = self.layout.layout(width, bins, self.sampler.params.log_x);
        runner.reset(bins, layout);
        debug!(
            min = self.sampler.range.min,
            max = self.sampler.range.max,
            bins,
            "再計算"
        );

        let SimulationCore {
            sampler,
            layout,
            on_recompute,
            ..
        } = self;
        if let Some(hook) = on_recompute.as_mut() {
            runner.with_state_mut(|state| {
                hook(&mut SampleContext::new(sampler, state, &**layout));
            });
        }
    }

    fn update_layout(&mut self, runner: &SimulationRunner) {
        let SimulationCore {
            sampler, layout, ..
        } = self;
        runner.with_state_mut(|state| {
            SampleContext::new(sampler, state, &**layout).update_layout();
        });
    }

    /// One controller step: a frame of samples followed by a redraw.
    fn advance_frame(&mut self, runner: &SimulationRunner, now_millis: u64) -> LoopControl {
        if let (Some(limit), Some(started)) = (self.config.max_run_millis, self.run_started_at) {
            if now_millis.saturating_sub(started) > limit {
                debug!(limit, "実行時間の上限に到達");
                return LoopControl::Stop;
            }
        }

        let samples = self.config.samples_per_frame;
        let SimulationCore {
            sampler,
            layout,
            on_start,
            on_step,
            ..
        } = self;
        let external = sampler.binner.counts_externally();
        let completed = runner.with_state_mut(|state| {
            for _ in 0..samples {
                if !state.begin_sample() {
                    break;
                }
                let idx = on_start(&mut SampleContext::new(sampler, state, &**layout));
                if idx.is_none() && external {
                    state.record_external();
                } else {
                    state.record(idx);
                }
                if let Some(hook) = on_step.as_mut() {
                    hook(&mut SampleContext::new(sampler, state, &**layout));
                }
                state.apply_sample_transform();
            }
            state.apply_frame_transform();
            state.is_complete()
        });
        runner.draw();

        if completed {
            runner.mark_completed();
            LoopControl::Stop
        } else {
            LoopControl::Continue
        }
    }
}

struct SimulationDriver {
    core: Rc<RefCell<SimulationCore>>,
    runner: SimulationRunner,
    scheduler: Rc<dyn Scheduler>,
}

impl ControllerHooks for SimulationDriver {
    fn on_step(&mut self) -> LoopControl {
        let now = self.scheduler.now_millis();
        self.core.borrow_mut().advance_frame(&self.runner, now)
    }

    fn on_start(&mut self) {
        self.core.borrow_mut().run_started_at = Some(self.scheduler.now_millis());
        self.runner.mark_running();
    }

    fn on_stop(&mut self) {
        self.core.borrow_mut().run_started_at = None;
        self.runner.mark_stopped();
    }

    fn on_reset(&mut self) {
        self.core.borrow_mut().recompute(&self.runner);
        self.runner.draw();
    }
}

/// Composition root of one visualisation: owns the runner, the controller
/// and the sampling hooks.
pub struct StandardSimulation {
    core: Rc<RefCell<SimulationCore>>,
    runner: SimulationRunner,
    controller: SimulationController,
    theme: Rc<ThemeProvider>,
    subscription: SubscriptionId,
}

impl StandardSimulation {
    pub fn builder(config: SimulationConfig) -> SimulationBuilder {
        SimulationBuilder::new(config)
    }

    pub(crate) fn new(bootstrap: SimulationBootstrap) -> Self {
        let SimulationBootstrap {
            config,
            sampler,
            range_fn,
            layout,
            on_start,
            on_step,
            on_recompute,
            scheduler,
            surface,
            theme,
        } = bootstrap;

        let state = RunnerState::new(
            config.clone(),
            sampler.params.width,
            sampler.params.height,
        );
        let runner = SimulationRunner::new(state, surface, Rc::clone(&theme), Rc::clone(&scheduler));
        let speed_millis = config.speed_millis;
        let core = Rc::new(RefCell::new(SimulationCore {
            config,
            sampler,
            range_fn,
            layout,
            on_start,
            on_step,
            on_recompute,
            run_started_at: None,
        }));
        core.borrow_mut().recompute(&runner);

        let controller = SimulationController::new(
            Box::new(SimulationDriver {
                core: Rc::clone(&core),
                runner: runner.clone(),
                scheduler: Rc::clone(&scheduler),
            }),
            scheduler,
            speed_millis,
        );

        let weak = runner.downgrade();
        let subscription = theme.subscribe(move |_| {
            if let Some(runner) = weak.upgrade() {
                runner.draw();
            }
        });
        runner.draw();

        Self {
            core,
            runner,
            controller,
            theme,
            subscription,
        }
    }

    /// Step control: stops a run and advances one frame.
    pub fn step(&self) -> LoopControl {
        self.controller.step_once()
    }

    pub fn run(&self) {
        self.controller.start();
    }

    pub fn stop(&self) {
        self.controller.stop();
    }

    pub fn toggle_run(&self) {
        self.controller.toggle_run();
    }

    pub fn reset(&self) {
        self.controller.reset();
    }

    pub fn is_running(&self) -> bool {
        self.controller.is_running()
    }

    pub fn run_label(&self) -> &'static str {
        self.controller.run_label()
    }

    pub fn recompute(&self) {
        self.core.borrow_mut().recompute(&self.runner);
        self.runner.draw();
    }

    pub fn update_layout(&self) {
        self.core.borrow_mut().update_layout(&self.runner);
        self.runner.draw();
    }

    pub fn set_count(&self, count: u32) {
        let count = count.max(1);
        self.core.borrow_mut().sampler.params.count = count;
        self.controller.reset();
    }

    pub fn set_sides(&self, sides: Option<u32>) {
        self.core.borrow_mut().sampler.params.sides = sides.filter(|&sides| sides > 0);
        self.controller.reset();
    }

    /// Bin boundaries depend on the x scale only for visualisations that
    /// recompute on log-x; the others just re-lay the same bins.
    pub fn set_log_x(&self, log_x: bool) {
        let recompute = {
            let mut core = self.core.borrow_mut();
            core.sampler.params.log_x = log_x;
            core.config.recompute_on_log_x
        };
        if recompute {
            self.controller.stop();
            self.recompute();
        } else {
            self.update_layout();
        }
    }

    pub fn set_log_y(&self, log_y: bool) {
        self.core.borrow_mut().sampler.params.log_y = log_y;
        self.runner.set_log_y(log_y);
        self.runner.draw();
    }

    /// New logical canvas size. Counts survive; only the layout changes.
    pub fn resize(&self, width: f64, height: f64) {
        {
            let mut core = self.core.borrow_mut();
            core.sampler.params.width = width;
            core.sampler.params.height = height;
        }
        self.runner.resize(width, height);
        self.update_layout();
    }

    pub fn draw(&self) {
        self.runner.draw();
    }

    pub fn params(&self) -> SimulationParams {
        self.core.borrow().sampler.params
    }

    pub fn range(&self) -> BinRange {
        self.core.borrow().sampler.range
    }

    pub fn bins(&self) -> usize {
        self.core.borrow().sampler.bins
    }

    pub fn snapshot(&self) -> RunnerSnapshot {
        self.runner.snapshot()
    }

    /// Raw values passed to `record_sample` since the last recompute.
    pub fn samples(&self) -> Vec<f64> {
        self.core.borrow().sampler.samples.iter().copied().collect()
    }

    pub fn info_text(&self) -> String {
        let params = self.params();
        match params.sides {
            Some(sides) => format!("d{sides} × {}", params.count),
            None => format!("U(0,1) × {}", params.count),
        }
    }

    pub fn config(&self) -> SimulationConfig {
        self.core.borrow().config.clone()
    }

    pub fn controller(&self) -> &SimulationController {
        &self.controller
    }

    pub fn runner(&self) -> &SimulationRunner {
        &self.runner
    }

    pub fn on_run_state_change(&self, listener: impl Fn(bool) + 'static) {
        self.controller.set_state_listener(listener);
    }
}

impl Drop for StandardSimulation {
    fn drop(&mut self) {
        self.theme.unsubscribe(self.subscription);
        self.controller.stop();
    }
}

impl fmt::Debug for StandardSimulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StandardSimulation")
            .field("params", &self.params())
            .field("range", &self.range())
            .field("controller", &self.controller)
            .field("runner", &self.runner)
            .finish()
    }
}

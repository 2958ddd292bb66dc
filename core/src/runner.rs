use std::cell::{Ref, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use serde::Serialize;
use tracing::{debug, trace, warn};

use crate::bins::BinBuffer;
use crate::config::SimulationConfig;
use crate::constants::LEFT_PADDING;
use crate::layout::BinLayout;
use crate::render::{
    DrawingSurface, Hsl, StackLineStyle, ThemeColors, ThemeProvider, draw_stack_line,
    draw_y_axis_grid, dynamic_y_scale, max_stack,
};
use crate::scheduler::{FrameSlot, Scheduler};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunnerPhase {
    Idle,
    Running,
    Stopped,
    Completed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameReport {
    pub generated: usize,
    pub accepted: usize,
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunnerSnapshot {
    pub counts: Vec<u64>,
    pub stacks: Vec<f64>,
    pub total: u64,
    pub rejected: u64,
    pub phase: RunnerPhase,
}

impl RunnerSnapshot {
    pub fn accepted(&self) -> u64 {
        self.counts.iter().sum()
    }
}

/// Produces one bin index per call; `None` drops the sample.
pub trait SampleGenerator {
    fn next_bin(&mut self) -> Option<usize>;
}

impl<F> SampleGenerator for F
where
    F: FnMut() -> Option<usize>,
{
    fn next_bin(&mut self) -> Option<usize> {
        self()
    }
}

/// Histogram and run bookkeeping owned by one runner.
#[derive(Debug, Clone)]
pub struct RunnerState {
    config: SimulationConfig,
    width: f64,
    height: f64,
    counts: BinBuffer<u64>,
    stacks: BinBuffer<f64>,
    layout: BinLayout,
    total: u64,
    rejected: u64,
    stop_spawning: bool,
    phase: RunnerPhase,
}

impl RunnerState {
    pub fn new(config: SimulationConfig, width: f64, height: f64) -> Self {
        Self {
            config,
            width,
            height,
            counts: BinBuffer::default(),
            stacks: BinBuffer::default(),
            layout: BinLayout::empty(),
            total: 0,
            rejected: 0,
            stop_spawning: false,
            phase: RunnerPhase::Idle,
        }
    }

    pub fn reset(&mut self, bins: usize, layout: BinLayout) {
        self.counts.reset(bins);
        self.stacks.reset(bins);
        self.layout = layout;
        self.total = 0;
        self.rejected = 0;
        self.stop_spawning = false;
        self.phase = RunnerPhase::Idle;
        debug!(bins, "ランナーをリセット");
    }

    pub fn bins(&self) -> usize {
        self.counts.len()
    }

    /// Grows the histogram for data-dependent bin counts.
    pub fn ensure_bins(&mut self, bins: usize) -> bool {
        let grown = self.counts.ensure_len(bins);
        self.stacks.ensure_len(bins);
        if grown {
            trace!(bins, "ビン数を拡張");
        }
        grown
    }

    pub fn set_layout(&mut self, layout: BinLayout) {
        self.layout = layout;
    }

    pub fn layout(&self) -> &BinLayout {
        &self.layout
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn counts(&self) -> &[u64] {
        self.counts.as_slice()
    }

    pub fn stacks(&self) -> &[f64] {
        self.stacks.as_slice()
    }

    pub fn counts_mut(&mut self) -> &mut BinBuffer<u64> {
        &mut self.counts
    }

    pub fn stacks_mut(&mut self) -> &mut BinBuffer<f64> {
        &mut self.stacks
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn rejected(&self) -> u64 {
        self.rejected
    }

    pub fn phase(&self) -> RunnerPhase {
        self.phase
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    /// Drawable width left of the padding; layouts are computed for this.
    pub fn plot_width(&self) -> f64 {
        (self.width - LEFT_PADDING).max(0.0)
    }

    pub fn is_complete(&self) -> bool {
        self.stop_spawning
    }

    /// Whether another sample may be generated under the sample budget.
    pub fn begin_sample(&mut self) -> bool {
        if self.stop_spawning {
            return false;
        }
        if self.budget_reached() {
            self.stop_spawning = true;
            return false;
        }
        true
    }

    /// Counts one generated sample. Returns true when it landed in a bin.
    pub fn record(&mut self, idx: Option<usize>) -> bool {
        self.total += 1;
        let accepted = match idx {
            Some(idx) if idx < self.counts.len() => {
                self.counts.increment(idx);
                if self.config.stack_transform.tracks_counts() {
                    self.stacks.add(idx, 1.0);
                }
                true
            }
            _ => {
                self.rejected += 1;
                if self.rejected == 1 {
                    warn!(?idx, bins = self.counts.len(), "範囲外のサンプルを破棄しました");
                }
                false
            }
        };
        self.check_budget();
        accepted
    }

    /// Counts a sample whose bin was filled by the visualisation itself.
    pub fn record_external(&mut self) {
        self.total += 1;
        self.check_budget();
    }

    pub fn generate_frame<G>(&mut self, generator: &mut G) -> FrameReport
    where
        G: SampleGenerator + ?Sized,
    {
        let mut report = FrameReport::default();
        for _ in 0..self.config.samples_per_frame {
            if !self.begin_sample() {
                break;
            }
            let idx = generator.next_bin();
            if self.record(idx) {
                report.accepted += 1;
            }
            report.generated += 1;
            self.apply_sample_transform();
        }
        self.apply_frame_transform();
        report.completed = self.stop_spawning;
        trace!(
            generated = report.generated,
            accepted = report.accepted,
            total = self.total,
            "フレーム生成"
        );
        report
    }

    pub fn apply_stack_transform(&mut self) {
        let transform = self.config.stack_transform;
        transform.apply(self.counts.as_slice(), self.stacks.as_mut_slice());
    }

    /// Runs the transform when it has to follow every sample.
    pub fn apply_sample_transform(&mut self) {
        if self.config.stack_transform.per_sample() {
            self.apply_stack_transform();
        }
    }

    /// Runs the transform when once per frame is enough.
    pub fn apply_frame_transform(&mut self) {
        if !self.config.stack_transform.per_sample() {
            self.apply_stack_transform();
        }
    }

    pub fn max_stack_height(&self) -> f64 {
        max_stack(self.stacks.as_slice())
    }

    pub fn y_scale(&self) -> f64 {
        dynamic_y_scale(self.height, self.max_stack_height(), self.config.block_px)
    }

    pub fn draw(&self, surface: &mut dyn DrawingSurface, colors: &ThemeColors) {
        surface.clear_rect(0.0, 0.0, self.width, self.height);
        let y_scale = if self.config.dynamic_y_scale {
            self.y_scale()
        } else {
            1.0
        };
        let style = StackLineStyle {
            block_px: self.config.block_px * y_scale,
            width: self.width,
            height: self.height,
            color: Hsl::base(self.config.base_hue),
            log_y: self.config.log_y,
        };
        draw_stack_line(surface, self.stacks.as_slice(), &self.layout, &style);
        if self.config.dynamic_y_scale && !self.config.log_y {
            draw_y_axis_grid(surface, self.height, self.config.block_px, y_scale, colors);
        }
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        self.width = width.max(0.0);
        self.height = height.max(0.0);
    }

    pub fn set_log_y(&mut self, log_y: bool) {
        self.config.log_y = log_y;
    }

    pub fn snapshot(&self) -> RunnerSnapshot {
        RunnerSnapshot {
            counts: self.counts.to_vec(),
            stacks: self.stacks.to_vec(),
            total: self.total,
            rejected: self.rejected,
            phase: self.phase,
        }
    }

    pub(crate) fn set_phase(&mut self, phase: RunnerPhase) {
        self.phase = phase;
    }

    fn budget_reached(&self) -> bool {
        self.config
            .max_samples
            .is_some_and(|max_samples| self.total >= max_samples)
    }

    fn check_budget(&mut self) {
        if self.budget_reached() {
            self.stop_spawning = true;
        }
    }
}

type DrawHook = Box<dyn FnMut(&mut dyn DrawingSurface, &RunnerState)>;

struct RunnerInner {
    state: RunnerState,
    generator: Option<Box<dyn SampleGenerator>>,
    surface: Box<dyn DrawingSurface>,
    theme: Rc<ThemeProvider>,
    slot: FrameSlot,
    on_stop: Option<Rc<dyn Fn()>>,
    on_draw: Option<DrawHook>,
}

/// Per-frame sampling loop over a drawing surface.
#[derive(Clone)]
pub struct SimulationRunner {
    inner: Rc<RefCell<RunnerInner>>,
    scheduler: Rc<dyn Scheduler>,
}

#[derive(Clone)]
pub struct WeakRunner {
    inner: Weak<RefCell<RunnerInner>>,
    scheduler: Weak<dyn Scheduler>,
}

impl WeakRunner {
    pub fn upgrade(&self) -> Option<SimulationRunner> {
        Some(SimulationRunner {
            inner: self.inner.upgrade()?,
            scheduler: self.scheduler.upgrade()?,
        })
    }
}

impl SimulationRunner {
    pub fn new(
        state: RunnerState,
        surface: Box<dyn DrawingSurface>,
        theme: Rc<ThemeProvider>,
        scheduler: Rc<dyn Scheduler>,
    ) -> Self {
        Self {
            inner: Rc::new(RefCell::new(RunnerInner {
                state,
                generator: None,
                surface,
                theme,
                slot: FrameSlot::default(),
                on_stop: None,
                on_draw: None,
            })),
            scheduler,
        }
    }

    pub fn downgrade(&self) -> WeakRunner {
        WeakRunner {
            inner: Rc::downgrade(&self.inner),
            scheduler: Rc::downgrade(&self.scheduler),
        }
    }

    /// Reallocates the histogram and returns to `Idle`, dropping any pending
    /// frame.
    pub fn reset(&self, bins: usize, layout: BinLayout) {
        let mut inner = self.inner.borrow_mut();
        inner.slot.cancel(self.scheduler.as_ref());
        inner.generator = None;
        inner.state.reset(bins, layout);
    }

    /// Begins the frame loop. Ignored while running or after completion.
    pub fn start(&self, generator: impl SampleGenerator + 'static) {
        {
            let mut inner = self.inner.borrow_mut();
            match inner.state.phase {
                RunnerPhase::Running => return,
                RunnerPhase::Completed => {
                    debug!("完了済みのためリセットまで開始しません");
                    return;
                }
                RunnerPhase::Idle | RunnerPhase::Stopped => {}
            }
            inner.generator = Some(Box::new(generator));
            inner.state.set_phase(RunnerPhase::Running);
            debug!(total = inner.state.total, "ランナーを開始");
        }
        self.frame();
    }

    pub fn stop(&self) {
        let on_stop = {
            let mut inner = self.inner.borrow_mut();
            if inner.state.phase != RunnerPhase::Running {
                return;
            }
            inner.slot.cancel(self.scheduler.as_ref());
            inner.state.set_phase(RunnerPhase::Stopped);
            debug!(total = inner.state.total, "ランナーを停止");
            inner.on_stop.clone()
        };
        if let Some(on_stop) = on_stop {
            on_stop();
        }
    }

    pub fn draw(&self) {
        let mut guard = self.inner.borrow_mut();
        let RunnerInner {
            state,
            surface,
            theme,
            on_draw,
            ..
        } = &mut *guard;
        let colors = theme.colors();
        state.draw(surface.as_mut(), &colors);
        if let Some(hook) = on_draw.as_mut() {
            hook(surface.as_mut(), state);
        }
    }

    pub fn phase(&self) -> RunnerPhase {
        self.inner.borrow().state.phase
    }

    pub fn is_running(&self) -> bool {
        self.phase() == RunnerPhase::Running
    }

    pub fn state(&self) -> Ref<'_, RunnerState> {
        Ref::map(self.inner.borrow(), |inner| &inner.state)
    }

    pub fn with_state<R>(&self, f: impl FnOnce(&RunnerState) -> R) -> R {
        f(&self.inner.borrow().state)
    }

    pub fn with_state_mut<R>(&self, f: impl FnOnce(&mut RunnerState) -> R) -> R {
        f(&mut self.inner.borrow_mut().state)
    }

    pub fn with_surface<R>(&self, f: impl FnOnce(&mut dyn DrawingSurface) -> R) -> R {
        f(self.inner.borrow_mut().surface.as_mut())
    }

    pub fn resize(&self, width: f64, height: f64) {
        self.inner.borrow_mut().state.resize(width, height);
    }

    pub fn set_log_y(&self, log_y: bool) {
        self.inner.borrow_mut().state.set_log_y(log_y);
    }

    pub fn set_on_stop(&self, on_stop: impl Fn() + 'static) {
        self.inner.borrow_mut().on_stop = Some(Rc::new(on_stop));
    }

    pub fn set_on_draw(&self, on_draw: impl FnMut(&mut dyn DrawingSurface, &RunnerState) + 'static) {
        self.inner.borrow_mut().on_draw = Some(Box::new(on_draw));
    }

    pub fn snapshot(&self) -> RunnerSnapshot {
        self.inner.borrow().state.snapshot()
    }

    pub fn theme(&self) -> Rc<ThemeProvider> {
        Rc::clone(&self.inner.borrow().theme)
    }

    /// Phase changes for runs driven from outside (`SimulationController`).
    pub(crate) fn mark_running(&self) {
        let mut inner = self.inner.borrow_mut();
        if matches!(inner.state.phase, RunnerPhase::Idle | RunnerPhase::Stopped) {
            inner.state.set_phase(RunnerPhase::Running);
        }
    }

    pub(crate) fn mark_stopped(&self) {
        let mut inner = self.inner.borrow_mut();
        if inner.state.phase == RunnerPhase::Running {
            inner.state.set_phase(RunnerPhase::Stopped);
        }
    }

    pub(crate) fn mark_completed(&self) {
        self.inner
            .borrow_mut()
            .state
            .set_phase(RunnerPhase::Completed);
    }

    fn frame(&self) {
        let completed = {
            let mut guard = self.inner.borrow_mut();
            let inner = &mut *guard;
            if inner.state.phase != RunnerPhase::Running {
                return;
            }
            let Some(generator) = inner.generator.as_mut() else {
                return;
            };
            inner.state.generate_frame(generator.as_mut()).completed
        };
        self.draw();
        if completed {
            self.complete();
        } else {
            self.schedule_next();
        }
    }

    fn schedule_next(&self) {
        let weak = self.downgrade();
        let token = self.scheduler.schedule(
            0,
            Box::new(move || {
                let Some(runner) = weak.upgrade() else {
                    return;
                };
                if runner.inner.borrow_mut().slot.take().is_none() {
                    return;
                }
                runner.frame();
            }),
        );
        self.inner.borrow_mut().slot.arm(token);
    }

    fn complete(&self) {
        let on_stop = {
            let mut inner = self.inner.borrow_mut();
            inner.slot.cancel(self.scheduler.as_ref());
            inner.state.set_phase(RunnerPhase::Completed);
            debug!(total = inner.state.total, "最大サンプル数に到達");
            inner.on_stop.clone()
        };
        if let Some(on_stop) = on_stop {
            on_stop();
        }
    }
}

impl fmt::Debug for SimulationRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("SimulationRunner")
            .field("phase", &inner.state.phase)
            .field("bins", &inner.state.bins())
            .field("total", &inner.state.total)
            .field("pending_frame", &inner.slot.is_armed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    use crate::layout::make_layout;
    use crate::render::RecordingSurface;
    use crate::scheduler::ManualScheduler;
    use crate::stacks::StackTransform;

    fn config(samples_per_frame: usize, max_samples: Option<u64>) -> SimulationConfig {
        SimulationConfig {
            samples_per_frame,
            max_samples,
            ..SimulationConfig::default()
        }
    }

    fn runner(config: SimulationConfig, bins: usize) -> (SimulationRunner, Rc<ManualScheduler>) {
        let scheduler = Rc::new(ManualScheduler::new());
        let state = RunnerState::new(config, 415.0, 166.0);
        let runner = SimulationRunner::new(
            state,
            Box::new(RecordingSurface::new()),
            Rc::new(ThemeProvider::default()),
            scheduler.clone(),
        );
        runner.reset(bins, make_layout(400, bins, false));
        (runner, scheduler)
    }

    fn cycling(bins: usize) -> impl FnMut() -> Option<usize> {
        let mut next = 0;
        move || {
            next += 1;
            Some(next % bins)
        }
    }

    #[test]
    fn frames_generate_up_to_budget_per_frame() {
        let (runner, scheduler) = runner(config(25, None), 10);
        runner.start(cycling(10));
        assert_eq!(runner.state().total(), 25);
        assert!(runner.is_running());

        scheduler.run_frames(3);
        let snapshot = runner.snapshot();
        assert_eq!(snapshot.total, 100);
        assert_eq!(snapshot.accepted(), 100);
        assert_eq!(snapshot.counts, vec![10; 10]);
    }

    #[test]
    fn histogram_conserves_valid_samples() {
        let (runner, scheduler) = runner(config(97, None), 7);
        runner.start(cycling(7));
        scheduler.run_frames(20);
        runner.stop();
        let state = runner.state();
        assert_eq!(state.counts().iter().sum::<u64>(), state.total());
        assert_eq!(state.rejected(), 0);
    }

    #[test]
    fn max_samples_completes_and_stops_once() {
        let (runner, scheduler) = runner(config(40, Some(100)), 5);
        let stops = Rc::new(Cell::new(0));
        let counter = stops.clone();
        runner.set_on_stop(move || counter.set(counter.get() + 1));

        runner.start(cycling(5));
        scheduler.run_frames(10);
        assert_eq!(runner.phase(), RunnerPhase::Completed);
        assert_eq!(runner.state().total(), 100);
        assert_eq!(stops.get(), 1);
        assert_eq!(scheduler.pending(), 0);

        runner.stop();
        runner.start(cycling(5));
        assert_eq!(stops.get(), 1);
        assert_eq!(runner.state().total(), 100);
    }

    #[test]
    fn stop_cancels_pending_frame_and_is_idempotent() {
        let (runner, scheduler) = runner(config(10, None), 4);
        let stops = Rc::new(Cell::new(0));
        let counter = stops.clone();
        runner.set_on_stop(move || counter.set(counter.get() + 1));

        runner.start(cycling(4));
        runner.stop();
        runner.stop();
        assert_eq!(stops.get(), 1);
        assert_eq!(scheduler.pending(), 0);

        let before = runner.state().total();
        scheduler.run_frames(5);
        assert_eq!(runner.state().total(), before);
        assert_eq!(runner.phase(), RunnerPhase::Stopped);
    }

    #[test]
    fn restart_after_stop_keeps_counts() {
        let (runner, scheduler) = runner(config(10, None), 4);
        runner.start(cycling(4));
        runner.stop();
        runner.start(cycling(4));
        scheduler.run_next_frame();
        assert_eq!(runner.state().total(), 30);
    }

    #[test]
    fn reset_twice_gives_identical_zeroed_state() {
        let (runner, scheduler) = runner(config(10, None), 6);
        runner.start(cycling(6));
        scheduler.run_frames(2);

        runner.reset(6, make_layout(400, 6, false));
        let first = runner.snapshot();
        runner.reset(6, make_layout(400, 6, false));
        let second = runner.snapshot();
        assert_eq!(first, second);
        assert_eq!(first.counts, vec![0; 6]);
        assert_eq!(first.total, 0);
        assert_eq!(first.phase, RunnerPhase::Idle);
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn out_of_range_indices_are_dropped_and_counted() {
        let mut state = RunnerState::new(config(10, None), 415.0, 166.0);
        state.reset(3, make_layout(400, 3, false));
        assert!(state.record(Some(2)));
        assert!(!state.record(Some(3)));
        assert!(!state.record(None));
        assert_eq!(state.counts(), &[0, 0, 1]);
        assert_eq!(state.total(), 3);
        assert_eq!(state.rejected(), 2);
    }

    #[test]
    fn generator_panics_propagate() {
        let (runner, _scheduler) = runner(config(10, None), 3);
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            runner.start(|| -> Option<usize> { panic!("broken generator") });
        }));
        assert!(result.is_err());
    }

    #[test]
    fn cumulative_transform_rewrites_stacks_after_each_frame() {
        let mut config = config(3, None);
        config.stack_transform = StackTransform::Cumulative;
        let mut state = RunnerState::new(config, 415.0, 166.0);
        state.reset(3, make_layout(400, 3, false));
        let mut generator = cycling(3);
        state.generate_frame(&mut generator);
        assert_eq!(state.counts(), &[1, 1, 1]);
        assert_eq!(state.stacks(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn smoothing_follows_every_sample_of_a_frame() {
        let mut config = config(3, None);
        config.stack_transform = StackTransform::Smoothed {
            smoothing: 0.5,
            block_value: 1.0,
        };
        let mut state = RunnerState::new(config, 415.0, 166.0);
        state.reset(2, make_layout(400, 2, false));
        let mut generator = || -> Option<usize> { Some(0) };
        state.generate_frame(&mut generator);
        // counts 1, 2, 3: 0 -> 0.5 -> 1.25 -> 2.125
        assert_eq!(state.counts(), &[3, 0]);
        assert_eq!(state.stacks(), &[2.125, 0.0]);
    }

    #[test]
    fn draw_hook_runs_after_stack_line() {
        let (runner, _scheduler) = runner(config(10, None), 3);
        let seen = Rc::new(Cell::new(0u64));
        let sink = seen.clone();
        runner.set_on_draw(move |surface, state| {
            surface.fill_text("overlay", 0.0, 0.0);
            sink.set(state.total());
        });
        runner.start(cycling(3));
        runner.stop();
        assert_eq!(seen.get(), 10);
    }
}

use std::collections::VecDeque;
use std::rc::Rc;

use anyhow::{Context, Result, anyhow, ensure};
use rand::{SeedableRng, rngs::StdRng};

use super::context::{RangeFn, SampleContext, SampleHook, SampleObserver, Sampler, SimulationParams};
use super::StandardSimulation;
use crate::binning::{BinRange, Binner, LinearBinner};
use crate::config::{ConfigOverrides, SimulationConfig};
use crate::layout::{LayoutStrategy, StandardLayout};
use crate::render::{DrawingSurface, RecordingSurface, ThemeProvider};
use crate::scheduler::Scheduler;

/// Assembles a `StandardSimulation` from configuration plus the behaviour
/// that cannot be serialised (range function, binner, hooks).
pub struct SimulationBuilder {
    config: SimulationConfig,
    params: SimulationParams,
    range_fn: Option<RangeFn>,
    binner: Box<dyn Binner>,
    layout: Box<dyn LayoutStrategy>,
    on_start: Option<SampleHook>,
    on_step: Option<SampleObserver>,
    on_recompute: Option<SampleObserver>,
    rng: StdRng,
    scheduler: Option<Rc<dyn Scheduler>>,
    surface: Option<Box<dyn DrawingSurface>>,
    theme: Option<Rc<ThemeProvider>>,
}

impl SimulationBuilder {
    pub fn new(config: SimulationConfig) -> Self {
        Self {
            config,
            params: SimulationParams::default(),
            range_fn: None,
            binner: Box::new(LinearBinner),
            layout: Box::new(StandardLayout),
            on_start: None,
            on_step: None,
            on_recompute: None,
            rng: StdRng::from_entropy(),
            scheduler: None,
            surface: None,
            theme: None,
        }
    }

    pub fn config_mut(&mut self) -> &mut SimulationConfig {
        &mut self.config
    }

    pub fn apply_overrides(mut self, overrides: &ConfigOverrides) -> Self {
        overrides.apply(&mut self.config);
        self
    }

    pub fn count(mut self, count: u32) -> Self {
        self.params.count = count;
        self
    }

    pub fn sides(mut self, sides: Option<u32>) -> Self {
        self.params.sides = sides;
        self
    }

    pub fn canvas_size(mut self, width: f64, height: f64) -> Self {
        self.params.width = width;
        self.params.height = height;
        self
    }

    pub fn range(mut self, range_fn: impl Fn(&SimulationParams) -> BinRange + 'static) -> Self {
        self.range_fn = Some(Box::new(range_fn));
        self
    }

    pub fn binner(mut self, binner: impl Binner + 'static) -> Self {
        self.binner = Box::new(binner);
        self
    }

    pub fn layout_strategy(mut self, layout: impl LayoutStrategy + 'static) -> Self {
        self.layout = Box::new(layout);
        self
    }

    /// Required: generates one sample and returns its bin.
    pub fn on_start(
        mut self,
        hook: impl FnMut(&mut SampleContext<'_>) -> Option<usize> + 'static,
    ) -> Self {
        self.on_start = Some(Box::new(hook));
        self
    }

    /// Runs after every recorded sample.
    pub fn on_step(mut self, hook: impl FnMut(&mut SampleContext<'_>) + 'static) -> Self {
        self.on_step = Some(Box::new(hook));
        self
    }

    /// Runs after every recompute, once the histogram has been reset.
    pub fn on_recompute(mut self, hook: impl FnMut(&mut SampleContext<'_>) + 'static) -> Self {
        self.on_recompute = Some(Box::new(hook));
        self
    }

    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    pub fn with_seed(self, seed: u64) -> Self {
        self.with_rng(StdRng::seed_from_u64(seed))
    }

    pub fn scheduler(mut self, scheduler: Rc<dyn Scheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    pub fn surface(mut self, surface: Box<dyn DrawingSurface>) -> Self {
        self.surface = Some(surface);
        self
    }

    pub fn theme(mut self, theme: Rc<ThemeProvider>) -> Self {
        self.theme = Some(theme);
        self
    }

    pub fn build(self) -> Result<StandardSimulation> {
        let bootstrap = self.into_bootstrap()?;
        Ok(StandardSimulation::new(bootstrap))
    }

    pub(crate) fn into_bootstrap(self) -> Result<SimulationBootstrap> {
        self.validate()?;
        let SimulationBuilder {
            config,
            mut params,
            range_fn,
            binner,
            layout,
            on_start,
            on_step,
            on_recompute,
            rng,
            scheduler,
            surface,
            theme,
        } = self;

        let on_start =
            on_start.ok_or_else(|| anyhow!("サンプル生成フック(on_start)が設定されていません。"))?;
        let scheduler =
            scheduler.ok_or_else(|| anyhow!("スケジューラーが設定されていません。"))?;
        let range_fn: RangeFn = match range_fn {
            Some(range_fn) => range_fn,
            None => Box::new(|_: &SimulationParams| BinRange::default()),
        };
        let surface: Box<dyn DrawingSurface> = match surface {
            Some(surface) => surface,
            None => Box::new(RecordingSurface::new()),
        };

        params.log_x = config.log_x;
        params.log_y = config.log_y;
        let range = range_fn(&params);
        range
            .validate()
            .context("初期パラメータで範囲関数が不正な範囲を返しました")?;

        Ok(SimulationBootstrap {
            sampler: Sampler {
                rng,
                range,
                bins: range.bins.unwrap_or(config.bins),
                params,
                binner,
                samples: VecDeque::new(),
            },
            config,
            range_fn,
            layout,
            on_start,
            on_step,
            on_recompute,
            scheduler,
            surface,
            theme: theme.unwrap_or_default(),
        })
    }

    fn validate(&self) -> Result<()> {
        self.config.validate()?;
        ensure!(
            self.params.count > 0,
            "サンプル数(count)は1以上を指定してください。"
        );
        ensure!(
            self.params.sides != Some(0),
            "サイコロの面数は1以上を指定してください。"
        );
        ensure!(
            self.params.width.is_finite() && self.params.height.is_finite(),
            "キャンバスの大きさが不正です: {}x{}",
            self.params.width,
            self.params.height
        );
        Ok(())
    }
}

pub(crate) struct SimulationBootstrap {
    pub(crate) config: SimulationConfig,
    pub(crate) sampler: Sampler,
    pub(crate) range_fn: RangeFn,
    pub(crate) layout: Box<dyn LayoutStrategy>,
    pub(crate) on_start: SampleHook,
    pub(crate) on_step: Option<SampleObserver>,
    pub(crate) on_recompute: Option<SampleObserver>,
    pub(crate) scheduler: Rc<dyn Scheduler>,
    pub(crate) surface: Box<dyn DrawingSurface>,
    pub(crate) theme: Rc<ThemeProvider>,
}

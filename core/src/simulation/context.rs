use std::collections::VecDeque;

use rand::Rng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::binning::{BinContext, BinRange, Binner};
use crate::constants::{DEFAULT_CANVAS_HEIGHT, DEFAULT_CANVAS_WIDTH, RECORDED_SAMPLES_MAX};
use crate::layout::LayoutStrategy;
use crate::runner::RunnerState;

/// User-facing parameters read by range functions and sample hooks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulationParams {
    pub count: u32,
    pub sides: Option<u32>,
    pub log_x: bool,
    pub log_y: bool,
    pub width: f64,
    pub height: f64,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            count: 1,
            sides: None,
            log_x: false,
            log_y: false,
            width: DEFAULT_CANVAS_WIDTH,
            height: DEFAULT_CANVAS_HEIGHT,
        }
    }
}

pub type RangeFn = Box<dyn Fn(&SimulationParams) -> BinRange>;
pub type SampleHook = Box<dyn FnMut(&mut SampleContext<'_>) -> Option<usize>>;
pub type SampleObserver = Box<dyn FnMut(&mut SampleContext<'_>)>;

pub(crate) struct Sampler {
    pub(crate) rng: StdRng,
    pub(crate) range: BinRange,
    pub(crate) bins: usize,
    pub(crate) params: SimulationParams,
    pub(crate) binner: Box<dyn Binner>,
    pub(crate) samples: VecDeque<f64>,
}

impl Sampler {
    pub(crate) fn bin_context(&self) -> BinContext {
        BinContext {
            range: self.range,
            bins: self.bins,
            log_x: self.params.log_x,
        }
    }

    fn push_sample(&mut self, value: f64) {
        if self.samples.len() == RECORDED_SAMPLES_MAX {
            self.samples.pop_front();
        }
        self.samples.push_back(value);
    }
}

/// Everything a sample hook may touch while one sample is generated.
pub struct SampleContext<'a> {
    sampler: &'a mut Sampler,
    runner: &'a mut RunnerState,
    layout: &'a dyn LayoutStrategy,
}

impl<'a> SampleContext<'a> {
    pub(crate) fn new(
        sampler: &'a mut Sampler,
        runner: &'a mut RunnerState,
        layout: &'a dyn LayoutStrategy,
    ) -> Self {
        Self {
            sampler,
            runner,
            layout,
        }
    }

    /// One draw of the underlying die: `1..=sides` when sides are set,
    /// otherwise uniform in `[0, 1)`.
    pub fn roll_sample(&mut self) -> f64 {
        match self.sampler.params.sides {
            Some(sides) if sides > 0 => self.sampler.rng.gen_range(1..=sides) as f64,
            _ => self.uniform(),
        }
    }

    pub fn uniform(&mut self) -> f64 {
        self.sampler.rng.gen_range(0.0..1.0)
    }

    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.sampler.rng
    }

    pub fn record_sample(&mut self, value: f64) {
        self.sampler.push_sample(value);
    }

    pub fn value_to_bin(&self, value: f64) -> Option<usize> {
        self.sampler
            .binner
            .bin_of(value, &self.sampler.bin_context())
    }

    pub fn params(&self) -> &SimulationParams {
        &self.sampler.params
    }

    pub fn count(&self) -> u32 {
        self.sampler.params.count
    }

    pub fn range(&self) -> BinRange {
        self.sampler.range
    }

    pub fn bins(&self) -> usize {
        self.sampler.bins
    }

    pub fn state(&self) -> &RunnerState {
        &*self.runner
    }

    pub fn runner(&mut self) -> &mut RunnerState {
        &mut *self.runner
    }

    /// Grows the histogram (and the bin count used for layouts) to `bins`.
    pub fn ensure_bins(&mut self, bins: usize) -> bool {
        self.sampler.bins = self.sampler.bins.max(bins);
        self.runner.ensure_bins(bins)
    }

    pub fn update_layout(&mut self) {
        let layout = self.layout.layout(
            self.runner.plot_width(),
            self.sampler.bins,
            self.sampler.params.log_x,
        );
        self.runner.set_layout(layout);
    }
}

//! Yule-Simon style preferential attachment. Each step either founds a new
//! cluster or grows an existing one picked in proportion to its size; the
//! histogram shows how many clusters have each size. The process starts
//! from a single cluster of size one.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use rand::Rng;

use crate::binning::ExternalBinner;
use crate::config::SimulationConfig;
use crate::constants::hues;
use crate::layout::{BinLayout, LayoutFn, bin_positions};
use crate::simulation::SimulationBuilder;
use crate::stacks::StackTransform;

pub const P_NEW: f64 = 0.02;
pub const MIN_BINS: usize = 70;
pub const SAMPLES_PER_FRAME: usize = 1_500;
pub const SMOOTHING: f64 = 0.18;
pub const BLOCK_VALUE: f64 = 4.0;

#[derive(Debug, Clone, PartialEq)]
pub struct PreferentialAttachment {
    sizes: Vec<u64>,
    size_counts: BTreeMap<u64, u64>,
    total_mass: u64,
    max_size: u64,
    p_new: f64,
}

impl PreferentialAttachment {
    pub fn new(p_new: f64) -> Self {
        let mut process = Self {
            sizes: Vec::new(),
            size_counts: BTreeMap::new(),
            total_mass: 0,
            max_size: 0,
            p_new: p_new.clamp(0.0, 1.0),
        };
        process.reset();
        process
    }

    pub fn reset(&mut self) {
        self.sizes.clear();
        self.sizes.push(1);
        self.size_counts.clear();
        self.size_counts.insert(1, 1);
        self.total_mass = 1;
        self.max_size = 1;
    }

    pub fn step<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        if rng.gen_bool(self.p_new) {
            self.sizes.push(1);
            self.bump(0, 1);
        } else {
            let idx = self.pick_weighted(rng);
            let from = self.sizes[idx];
            self.sizes[idx] = from + 1;
            self.bump(from, from + 1);
        }
        self.total_mass += 1;
    }

    pub fn run<R: Rng + ?Sized>(&mut self, steps: usize, rng: &mut R) {
        for _ in 0..steps {
            self.step(rng);
        }
    }

    fn pick_weighted<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        let target = rng.gen_range(0..self.total_mass);
        let mut acc = 0;
        for (idx, size) in self.sizes.iter().enumerate() {
            acc += size;
            if acc > target {
                return idx;
            }
        }
        self.sizes.len() - 1
    }

    fn bump(&mut self, from: u64, to: u64) {
        if from > 0 {
            if let Some(count) = self.size_counts.get_mut(&from) {
                *count -= 1;
                if *count == 0 {
                    self.size_counts.remove(&from);
                }
            }
        }
        *self.size_counts.entry(to).or_insert(0) += 1;
        self.max_size = self.max_size.max(to);
    }

    pub fn sizes(&self) -> &[u64] {
        &self.sizes
    }

    /// Cluster size to number of clusters of that size.
    pub fn size_counts(&self) -> &BTreeMap<u64, u64> {
        &self.size_counts
    }

    pub fn total_mass(&self) -> u64 {
        self.total_mass
    }

    pub fn max_size(&self) -> u64 {
        self.max_size
    }

    pub fn cluster_count(&self) -> usize {
        self.sizes.len()
    }

    /// Writes `size_counts` into histogram bins, size `s` at index `s - 1`.
    pub fn fill_counts(&self, counts: &mut [u64]) {
        counts.fill(0);
        for (&size, &count) in &self.size_counts {
            if let Some(slot) = counts.get_mut(size as usize - 1) {
                *slot = count;
            }
        }
    }
}

impl Default for PreferentialAttachment {
    fn default() -> Self {
        Self::new(P_NEW)
    }
}

pub fn config() -> SimulationConfig {
    SimulationConfig {
        bins: MIN_BINS,
        samples_per_frame: SAMPLES_PER_FRAME,
        block_value: BLOCK_VALUE,
        base_hue: hues::PREF_ATTACH,
        stack_transform: StackTransform::Smoothed {
            smoothing: SMOOTHING,
            block_value: BLOCK_VALUE,
        },
        ..SimulationConfig::default()
    }
}

pub fn builder(config: SimulationConfig) -> SimulationBuilder {
    builder_with_process(config, Rc::new(RefCell::new(PreferentialAttachment::default())))
}

/// Same as `builder`, sharing the process so callers can inspect it.
pub fn builder_with_process(
    config: SimulationConfig,
    process: Rc<RefCell<PreferentialAttachment>>,
) -> SimulationBuilder {
    let on_start_process = Rc::clone(&process);
    let on_step_process = Rc::clone(&process);
    SimulationBuilder::new(config)
        .binner(ExternalBinner)
        .layout_strategy(LayoutFn(|width: f64, bins: usize, log_x: bool| {
            BinLayout::from_boundaries(&bin_positions(width, bins.max(MIN_BINS), log_x))
        }))
        .on_start(move |ctx| {
            on_start_process.borrow_mut().step(ctx.rng());
            None
        })
        .on_step(move |ctx| {
            let process = on_step_process.borrow();
            let needed = MIN_BINS.max(process.max_size() as usize);
            if ctx.ensure_bins(needed) {
                ctx.update_layout();
            }
            process.fill_counts(ctx.runner().counts_mut().as_mut_slice());
        })
        .on_recompute(move |_| process.borrow_mut().reset())
}

#[cfg(test)]
mod tests {
    use super::*;

    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use crate::scheduler::ManualScheduler;
    use crate::stats::linear_regression;

    #[test]
    fn size_counts_account_for_every_cluster_and_unit() {
        let mut rng = StdRng::seed_from_u64(8);
        let mut process = PreferentialAttachment::default();
        process.run(5_000, &mut rng);

        assert_eq!(process.total_mass(), 5_001);
        assert_eq!(process.sizes().iter().sum::<u64>(), 5_001);
        let clusters: u64 = process.size_counts().values().sum();
        assert_eq!(clusters as usize, process.cluster_count());
        let mass: u64 = process.size_counts().iter().map(|(size, count)| size * count).sum();
        assert_eq!(mass, 5_001);
        assert_eq!(process.size_counts().keys().last().copied(), Some(process.max_size()));
    }

    #[test]
    fn cluster_sizes_follow_a_power_law() {
        let mut rng = StdRng::seed_from_u64(2_024);
        let mut process = PreferentialAttachment::default();
        process.run(50_000, &mut rng);

        let (xs, ys): (Vec<f64>, Vec<f64>) = (2..=10u64)
            .filter_map(|size| {
                let count = *process.size_counts().get(&size)?;
                Some(((size as f64).ln(), (count as f64).ln()))
            })
            .unzip();
        assert!(xs.len() >= 5);
        let fit = linear_regression(&xs, &ys);
        assert!(fit.slope > -4.0 && fit.slope < -1.5, "slope = {}", fit.slope);
    }

    #[test]
    fn histogram_grows_with_the_largest_cluster() {
        let scheduler = Rc::new(ManualScheduler::new());
        let process = Rc::new(RefCell::new(PreferentialAttachment::default()));
        let sim = builder_with_process(config(), Rc::clone(&process))
            .with_seed(31)
            .scheduler(scheduler)
            .build()
            .unwrap();
        assert_eq!(sim.bins(), MIN_BINS);

        for _ in 0..10 {
            sim.step();
        }
        let snapshot = sim.snapshot();
        assert_eq!(snapshot.total, 15_000);
        assert_eq!(snapshot.rejected, 0);

        let max_size = process.borrow().max_size() as usize;
        assert!(snapshot.counts.len() >= max_size.max(MIN_BINS));
        let clusters: u64 = snapshot.counts.iter().sum();
        assert_eq!(clusters as usize, process.borrow().cluster_count());
        let layout_len = sim.runner().with_state(|state| state.layout().len());
        assert_eq!(layout_len, sim.bins());

        sim.reset();
        assert_eq!(process.borrow().total_mass(), 1);
        assert!(sim.snapshot().counts.iter().all(|&count| count == 0));
    }

    #[test]
    fn reset_leaves_a_single_unit_cluster() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut process = PreferentialAttachment::default();
        assert_eq!(process.sizes(), &[1]);
        process.run(500, &mut rng);
        assert!(process.max_size() > 1);

        process.reset();
        assert_eq!(process.sizes(), &[1]);
        assert_eq!(process.total_mass(), 1);
        assert_eq!(process.max_size(), 1);
        assert_eq!(process.cluster_count(), 1);
        assert_eq!(process.size_counts().iter().collect::<Vec<_>>(), vec![(&1, &1)]);
    }

    #[test]
    fn stacks_are_smoothed_after_every_step() {
        let steps = 40;
        let scheduler = Rc::new(ManualScheduler::new());
        let mut config = config();
        config.samples_per_frame = steps;
        let sim = builder(config.clone())
            .with_seed(5)
            .scheduler(scheduler)
            .build()
            .unwrap();
        sim.step();

        let mut rng = StdRng::seed_from_u64(5);
        let mut process = PreferentialAttachment::default();
        let mut counts = vec![0u64; MIN_BINS];
        let mut stacks = vec![0.0f64; MIN_BINS];
        for _ in 0..steps {
            process.step(&mut rng);
            process.fill_counts(&mut counts);
            config.stack_transform.apply(&counts, &mut stacks);
        }
        let snapshot = sim.snapshot();
        assert_eq!(snapshot.counts, counts);
        assert_eq!(snapshot.stacks, stacks);

        let mut once = vec![0.0f64; MIN_BINS];
        config.stack_transform.apply(&counts, &mut once);
        assert_ne!(snapshot.stacks, once);
    }
}

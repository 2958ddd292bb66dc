//! Cumulative view of a sum of uniforms; the stack line traces the CDF.

use crate::binning::BinRange;
use crate::config::SimulationConfig;
use crate::constants::hues;
use crate::simulation::{SimulationBuilder, SimulationParams};
use crate::stacks::StackTransform;

pub const SAMPLES_PER_FRAME: usize = 300;
pub const BLOCK_VALUE: f64 = 100.0;

pub fn config() -> SimulationConfig {
    SimulationConfig {
        samples_per_frame: SAMPLES_PER_FRAME,
        block_value: BLOCK_VALUE,
        base_hue: hues::SIGMOID,
        stack_transform: StackTransform::Cumulative,
        ..SimulationConfig::default()
    }
}

pub fn sum_range(params: &SimulationParams) -> BinRange {
    BinRange::between(0.0, f64::from(params.count))
}

pub fn builder(config: SimulationConfig) -> SimulationBuilder {
    SimulationBuilder::new(config)
        .range(sum_range)
        .on_start(|ctx| {
            let mut sum = 0.0;
            for _ in 0..ctx.count() {
                sum += ctx.roll_sample();
            }
            ctx.record_sample(sum);
            ctx.value_to_bin(sum)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    use crate::scheduler::ManualScheduler;

    #[test]
    fn stacks_form_a_non_decreasing_cdf() {
        let scheduler = Rc::new(ManualScheduler::new());
        let sim = builder(config())
            .with_seed(340)
            .count(4)
            .scheduler(scheduler.clone())
            .build()
            .unwrap();
        assert_eq!(sim.range(), BinRange::between(0.0, 4.0));

        sim.run();
        scheduler.run_frames(10);
        sim.stop();
        let snapshot = sim.snapshot();
        assert_eq!(snapshot.total, 3_300);
        assert_eq!(snapshot.rejected, 0);
        assert!(snapshot.stacks.windows(2).all(|pair| pair[0] <= pair[1]));
        assert_eq!(snapshot.stacks.last().copied(), Some(snapshot.total as f64));

        // the middle of a symmetric sum sits near half the mass
        let middle = snapshot.stacks[snapshot.stacks.len() / 2 - 1];
        let share = middle / snapshot.total as f64;
        assert!((share - 0.5).abs() < 0.05, "share = {share}");
    }
}

//! Sums of `count` draws: the central limit theorem made visible.

use rand::Rng;

use crate::binning::BinRange;
use crate::config::SimulationConfig;
use crate::constants::hues;
use crate::simulation::{SimulationBuilder, SimulationParams};

pub const SAMPLES_PER_FRAME: usize = 2_000;

pub fn config() -> SimulationConfig {
    SimulationConfig {
        samples_per_frame: SAMPLES_PER_FRAME,
        base_hue: hues::CLT,
        ..SimulationConfig::default()
    }
}

/// With dice every attainable sum gets its own unit-wide bin.
pub fn sum_range(params: &SimulationParams) -> BinRange {
    let count = f64::from(params.count);
    match params.sides {
        Some(sides) if sides > 0 => {
            let bins = params.count as usize * (sides as usize - 1) + 1;
            BinRange::between(count - 0.5, count * f64::from(sides) + 0.5).with_bins(bins)
        }
        _ => BinRange::between(0.0, count),
    }
}

pub fn dice_sum<R: Rng + ?Sized>(rng: &mut R, count: u32, sides: u32) -> u32 {
    (0..count).map(|_| rng.gen_range(1..=sides)).sum()
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

    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use crate::scheduler::ManualScheduler;
    use crate::stats::mean_and_std;

    #[test]
    fn dice_range_gives_one_bin_per_sum() {
        let params = SimulationParams {
            count: 5,
            sides: Some(6),
            ..SimulationParams::default()
        };
        let range = sum_range(&params);
        assert_eq!(range.min, 4.5);
        assert_eq!(range.max, 30.5);
        assert_eq!(range.bins, Some(26));

        let uniform = sum_range(&SimulationParams {
            count: 3,
            ..SimulationParams::default()
        });
        assert_eq!((uniform.min, uniform.max, uniform.bins), (0.0, 3.0, None));
    }

    #[test]
    fn dice_sum_stays_within_bounds() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..1_000 {
            let sum = dice_sum(&mut rng, 4, 6);
            assert!((4..=24).contains(&sum));
        }
    }

    #[test]
    fn five_d6_matches_theoretical_moments() {
        let scheduler = Rc::new(ManualScheduler::new());
        let mut config = config();
        config.samples_per_frame = 5_000;
        config.max_samples = Some(100_000);
        config.max_run_millis = None;
        let sim = builder(config)
            .count(5)
            .sides(Some(6))
            .with_seed(77)
            .scheduler(scheduler.clone())
            .build()
            .unwrap();
        assert_eq!(sim.bins(), 26);

        sim.run();
        scheduler.run_frames(25);
        let snapshot = sim.snapshot();
        assert_eq!(snapshot.total, 100_000);
        assert_eq!(snapshot.rejected, 0);

        let (mean, std) = mean_and_std(&sim.samples());
        assert!((mean - 17.5).abs() < 0.1, "mean = {mean}");
        let expected_std = (5.0f64 * 35.0 / 12.0).sqrt();
        assert!((std - expected_std).abs() < 0.1, "std = {std}");

        // the mode sits in the middle of the histogram
        let peak = snapshot
            .counts
            .iter()
            .enumerate()
            .max_by_key(|(_, count)| **count)
            .map(|(idx, _)| idx)
            .unwrap();
        assert!((11..=15).contains(&peak), "peak = {peak}");
    }

    #[test]
    fn changing_dice_rebuilds_the_bins() {
        let scheduler = Rc::new(ManualScheduler::new());
        let sim = builder(config())
            .count(2)
            .sides(Some(6))
            .with_seed(5)
            .scheduler(scheduler)
            .build()
            .unwrap();
        assert_eq!(sim.bins(), 11);
        sim.step();
        sim.set_sides(Some(4));
        assert_eq!(sim.bins(), 7);
        assert_eq!(sim.snapshot().total, 0);
        sim.set_sides(None);
        assert_eq!(sim.bins(), config().bins);
        assert_eq!(sim.info_text(), "U(0,1) × 2");
    }
}

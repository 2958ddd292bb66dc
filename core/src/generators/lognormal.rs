//! Products of `count` uniform draws. On a log x axis the histogram shows
//! `ln(product)`, a sum of i.i.d. terms, so the shape turns normal.

use crate::binning::{BinRange, ScaleAwareBinner};
use crate::config::SimulationConfig;
use crate::constants::hues;
use crate::layout::{LayoutFn, LayoutStrategy, StandardLayout};
use crate::simulation::{SimulationBuilder, SimulationParams};

pub const SAMPLES_PER_FRAME: usize = 900;
pub const BLOCK_VALUE: f64 = 150.0;

pub fn config() -> SimulationConfig {
    SimulationConfig {
        samples_per_frame: SAMPLES_PER_FRAME,
        block_value: BLOCK_VALUE,
        base_hue: hues::LOGNORMAL,
        recompute_on_log_x: true,
        ..SimulationConfig::default()
    }
}

/// `ln U` has mean -1 and variance 1, so the log of the product is
/// centred on `-count` with spread `sqrt(count)`.
pub fn product_range(params: &SimulationParams) -> BinRange {
    if params.log_x {
        let count = f64::from(params.count);
        BinRange::between(-count - 4.0 * count.sqrt(), 0.0)
    } else {
        BinRange::between(0.0, 1.0)
    }
}

pub fn builder(config: SimulationConfig) -> SimulationBuilder {
    SimulationBuilder::new(config)
        .range(product_range)
        .binner(ScaleAwareBinner)
        // bins already live in log space
        .layout_strategy(LayoutFn(|width: f64, bins: usize, _log_x: bool| {
            StandardLayout.layout(width, bins, false)
        }))
        .on_start(|ctx| {
            let mut product = 1.0;
            for _ in 0..ctx.count() {
                product *= ctx.uniform();
            }
            ctx.record_sample(product);
            ctx.value_to_bin(product)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    use crate::scheduler::ManualScheduler;
    use crate::stats::mean_and_std;

    #[test]
    fn log_toggle_switches_to_log_space_range() {
        let scheduler = Rc::new(ManualScheduler::new());
        let sim = builder(config())
            .count(9)
            .with_seed(4)
            .scheduler(scheduler)
            .build()
            .unwrap();
        assert_eq!(sim.range(), BinRange::between(0.0, 1.0));

        sim.step();
        assert!(sim.snapshot().total > 0);
        sim.set_log_x(true);
        assert_eq!(sim.range(), BinRange::between(-21.0, 0.0));
        assert_eq!(sim.snapshot().total, 0);

        // layout stays evenly spaced in log mode
        let widths = sim.runner().with_state(|state| state.layout().widths().to_vec());
        let spread = widths.iter().cloned().fold(f64::MIN, f64::max)
            - widths.iter().cloned().fold(f64::MAX, f64::min);
        assert!(spread <= 1.0);
    }

    #[test]
    fn log_of_products_is_centred_on_minus_count() {
        let scheduler = Rc::new(ManualScheduler::new());
        let mut config = config();
        config.log_x = true;
        config.max_samples = Some(9_000);
        let sim = builder(config)
            .count(16)
            .with_seed(99)
            .scheduler(scheduler.clone())
            .build()
            .unwrap();
        sim.run();
        scheduler.run_frames(15);

        let snapshot = sim.snapshot();
        assert_eq!(snapshot.total, 9_000);
        let logs: Vec<f64> = sim.samples().iter().map(|value| value.ln()).collect();
        let (mean, std) = mean_and_std(&logs);
        assert!((mean + 16.0).abs() < 0.3, "mean = {mean}");
        assert!((std - 4.0).abs() < 0.3, "std = {std}");
        // four standard deviations leave almost nothing outside the range
        assert!(snapshot.rejected < 50, "rejected = {}", snapshot.rejected);
    }
}

use crate::binning::BinRange;
use crate::config::SimulationConfig;
use crate::constants::hues;
use crate::simulation::SimulationBuilder;

pub const SAMPLES_PER_FRAME: usize = 5_000;

pub fn config() -> SimulationConfig {
    SimulationConfig {
        samples_per_frame: SAMPLES_PER_FRAME,
        base_hue: hues::UNIFORM,
        ..SimulationConfig::default()
    }
}

/// One draw per sample over `[0, 1]`.
pub fn builder(config: SimulationConfig) -> SimulationBuilder {
    SimulationBuilder::new(config)
        .range(|_| BinRange::between(0.0, 1.0))
        .on_start(|ctx| {
            let value = ctx.roll_sample();
            ctx.record_sample(value);
            ctx.value_to_bin(value)
        })
}

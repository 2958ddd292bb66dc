//! Concrete visualisations built on `StandardSimulation`.

pub mod clt;
pub mod lognormal;
pub mod pref_attach;
pub mod sigmoid;
pub mod uniform;

use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

use crate::config::{ConfigOverrides, SimulationConfig};
use crate::render::{DrawingSurface, ThemeProvider};
use crate::scheduler::Scheduler;
use crate::simulation::{SimulationBuilder, StandardSimulation};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VisualKind {
    #[serde(rename = "uniform")]
    Uniform,
    #[serde(rename = "normal")]
    Normal,
    #[serde(rename = "lognormal")]
    LogNormal,
    #[serde(rename = "sigmoid")]
    Sigmoid,
    #[serde(rename = "preferential-attachment")]
    PreferentialAttachment,
}

impl VisualKind {
    pub const ALL: [VisualKind; 5] = [
        VisualKind::Uniform,
        VisualKind::Normal,
        VisualKind::LogNormal,
        VisualKind::Sigmoid,
        VisualKind::PreferentialAttachment,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            VisualKind::Uniform => "uniform",
            VisualKind::Normal => "normal",
            VisualKind::LogNormal => "lognormal",
            VisualKind::Sigmoid => "sigmoid",
            VisualKind::PreferentialAttachment => "preferential-attachment",
        }
    }

    pub fn from_key(key: &str) -> Result<Self> {
        match key.trim() {
            "uniform" => Ok(VisualKind::Uniform),
            "normal" => Ok(VisualKind::Normal),
            "lognormal" => Ok(VisualKind::LogNormal),
            "sigmoid" => Ok(VisualKind::Sigmoid),
            "preferential-attachment" => Ok(VisualKind::PreferentialAttachment),
            other => bail!("未知の可視化種別です: {other}"),
        }
    }

    pub fn default_config(&self) -> SimulationConfig {
        match self {
            VisualKind::Uniform => uniform::config(),
            VisualKind::Normal => clt::config(),
            VisualKind::LogNormal => lognormal::config(),
            VisualKind::Sigmoid => sigmoid::config(),
            VisualKind::PreferentialAttachment => pref_attach::config(),
        }
    }

    fn builder(&self, config: SimulationConfig) -> SimulationBuilder {
        match self {
            VisualKind::Uniform => uniform::builder(config),
            VisualKind::Normal => clt::builder(config),
            VisualKind::LogNormal => lognormal::builder(config),
            VisualKind::Sigmoid => sigmoid::builder(config),
            VisualKind::PreferentialAttachment => pref_attach::builder(config),
        }
    }
}

impl fmt::Display for VisualKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for VisualKind {
    type Err = anyhow::Error;

    fn from_str(key: &str) -> Result<Self> {
        Self::from_key(key)
    }
}

/// A visualisation kind plus its user parameters, as stored in preset files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preset {
    pub kind: VisualKind,
    #[serde(default = "default_count")]
    pub count: u32,
    #[serde(default)]
    pub sides: Option<u32>,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub config: ConfigOverrides,
}

fn default_count() -> u32 {
    1
}

impl Preset {
    pub fn new(kind: VisualKind) -> Self {
        let (count, sides) = match kind {
            VisualKind::Uniform => (1, None),
            VisualKind::Normal => (5, Some(6)),
            VisualKind::LogNormal => (10, None),
            VisualKind::Sigmoid => (4, None),
            VisualKind::PreferentialAttachment => (1, None),
        };
        Self {
            kind,
            count,
            sides,
            seed: None,
            config: ConfigOverrides::default(),
        }
    }

    pub fn with_count(mut self, count: u32) -> Self {
        self.count = count;
        self
    }

    pub fn with_sides(mut self, sides: Option<u32>) -> Self {
        self.sides = sides;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        self.config = overrides;
        self
    }

    pub fn config(&self) -> SimulationConfig {
        self.kind.default_config().with_overrides(&self.config)
    }

    /// Kind-specific builder; the caller still supplies the scheduler.
    pub fn builder(&self) -> SimulationBuilder {
        let builder = self
            .kind
            .builder(self.config())
            .count(self.count)
            .sides(self.sides);
        match self.seed {
            Some(seed) => builder.with_seed(seed),
            None => builder,
        }
    }

    pub fn build(
        &self,
        scheduler: Rc<dyn Scheduler>,
        surface: Option<Box<dyn DrawingSurface>>,
        theme: Option<Rc<ThemeProvider>>,
    ) -> Result<StandardSimulation> {
        let mut builder = self.builder().scheduler(scheduler);
        if let Some(surface) = surface {
            builder = builder.surface(surface);
        }
        if let Some(theme) = theme {
            builder = builder.theme(theme);
        }
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::ManualScheduler;

    #[test]
    fn keys_round_trip_and_unknown_keys_fail() {
        for kind in VisualKind::ALL {
            assert_eq!(VisualKind::from_key(kind.key()).unwrap(), kind);
        }
        assert_eq!(VisualKind::from_key("sigmoid").unwrap(), VisualKind::Sigmoid);
        assert!(VisualKind::from_key("boids").is_err());
        assert_eq!(
            "preferential-attachment".parse::<VisualKind>().unwrap(),
            VisualKind::PreferentialAttachment
        );
    }

    #[test]
    fn preset_deserializes_with_sparse_overrides() {
        let preset: Preset = serde_json::from_str(
            r#"{ "kind": "normal", "count": 3, "sides": 4, "config": { "samples_per_frame": 10 } }"#,
        )
        .unwrap();
        assert_eq!(preset.kind, VisualKind::Normal);
        let config = preset.config();
        assert_eq!(config.samples_per_frame, 10);
        assert_eq!(config.base_hue, crate::constants::hues::CLT);
    }

    #[test]
    fn every_kind_builds_and_steps() {
        for kind in VisualKind::ALL {
            let scheduler = Rc::new(ManualScheduler::new());
            let sim = Preset::new(kind)
                .with_seed(11)
                .build(scheduler, None, None)
                .unwrap();
            sim.step();
            assert!(sim.snapshot().total > 0, "{kind}");
        }
    }
}

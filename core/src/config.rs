use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_ASPECT_RATIO, DEFAULT_BASE_HUE, DEFAULT_BINS, DEFAULT_BLOCK_PX, DEFAULT_BLOCK_VALUE,
    DEFAULT_MAX_RUN_MILLIS, DEFAULT_SAMPLES_PER_FRAME,
};
use crate::stacks::StackTransform;

/// Declarative options of one visualisation. Missing fields fall back to
/// the defaults, so partial documents merge over them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub bins: usize,
    pub samples_per_frame: usize,
    pub block_px: f64,
    pub block_value: f64,
    pub base_hue: u16,
    pub dynamic_y_scale: bool,
    pub max_samples: Option<u64>,
    pub log_x: bool,
    pub log_y: bool,
    pub recompute_on_log_x: bool,
    pub speed_millis: u64,
    pub max_run_millis: Option<u64>,
    pub aspect_ratio: f64,
    pub stack_transform: StackTransform,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            bins: DEFAULT_BINS,
            samples_per_frame: DEFAULT_SAMPLES_PER_FRAME,
            block_px: DEFAULT_BLOCK_PX,
            block_value: DEFAULT_BLOCK_VALUE,
            base_hue: DEFAULT_BASE_HUE,
            dynamic_y_scale: true,
            max_samples: None,
            log_x: false,
            log_y: false,
            recompute_on_log_x: false,
            speed_millis: 0,
            max_run_millis: Some(DEFAULT_MAX_RUN_MILLIS),
            aspect_ratio: DEFAULT_ASPECT_RATIO,
            stack_transform: StackTransform::Counts,
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(self.bins > 0, "ビン数は1以上を指定してください。");
        ensure!(
            self.samples_per_frame > 0,
            "1フレームあたりのサンプル数は1以上を指定してください。"
        );
        ensure!(
            self.block_px.is_finite() && self.block_px > 0.0,
            "ブロックの高さは正の数でなければなりません: {}",
            self.block_px
        );
        ensure!(
            self.block_value.is_finite() && self.block_value > 0.0,
            "ブロックの値は正の数でなければなりません: {}",
            self.block_value
        );
        ensure!(
            self.aspect_ratio.is_finite() && self.aspect_ratio > 0.0,
            "アスペクト比は正の数でなければなりません: {}",
            self.aspect_ratio
        );
        ensure!(
            self.max_samples != Some(0),
            "最大サンプル数は1以上を指定してください。"
        );
        if let StackTransform::Smoothed {
            smoothing,
            block_value,
        } = self.stack_transform
        {
            ensure!(
                (0.0..=1.0).contains(&smoothing),
                "平滑化係数は0から1の範囲で指定してください: {smoothing}"
            );
            ensure!(
                block_value > 0.0,
                "平滑化のブロック値は正の数でなければなりません: {block_value}"
            );
        }
        Ok(())
    }

    pub fn from_json_str(source: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(source).context("シミュレーション設定の解析に失敗しました")?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_overrides(mut self, overrides: &ConfigOverrides) -> Self {
        overrides.apply(&mut self);
        self
    }
}

/// Sparse per-preset adjustments layered over a base configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigOverrides {
    pub bins: Option<usize>,
    pub samples_per_frame: Option<usize>,
    pub block_px: Option<f64>,
    pub block_value: Option<f64>,
    pub base_hue: Option<u16>,
    pub dynamic_y_scale: Option<bool>,
    pub max_samples: Option<u64>,
    pub log_x: Option<bool>,
    pub log_y: Option<bool>,
    pub recompute_on_log_x: Option<bool>,
    pub speed_millis: Option<u64>,
    pub max_run_millis: Option<u64>,
    pub aspect_ratio: Option<f64>,
    pub stack_transform: Option<StackTransform>,
}

impl ConfigOverrides {
    pub fn apply(&self, config: &mut SimulationConfig) {
        macro_rules! merge {
            ($($field:ident),* $(,)?) => {
                $(if let Some(value) = self.$field {
                    config.$field = value;
                })*
            };
        }
        merge!(
            bins,
            samples_per_frame,
            block_px,
            block_value,
            base_hue,
            dynamic_y_scale,
            log_x,
            log_y,
            recompute_on_log_x,
            speed_millis,
            aspect_ratio,
            stack_transform,
        );
        if let Some(max_samples) = self.max_samples {
            config.max_samples = Some(max_samples);
        }
        if let Some(max_run_millis) = self.max_run_millis {
            config.max_run_millis = Some(max_run_millis);
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

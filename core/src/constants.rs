//! Shared drawing and sampling defaults.

pub const LEFT_PADDING: f64 = 15.0;
pub const BOTTOM_PADDING: f64 = 15.0;
pub const DEFAULT_ASPECT_RATIO: f64 = 2.5;
pub const DEFAULT_CANVAS_WIDTH: f64 = 900.0;
pub const DEFAULT_CANVAS_HEIGHT: f64 = 360.0;

pub const DEFAULT_BLOCK_PX: f64 = 6.0;
pub const DEFAULT_BLOCK_VALUE: f64 = 200.0;
pub const DEFAULT_SAMPLES_PER_FRAME: usize = 100;
pub const DEFAULT_BINS: usize = 100;
pub const DEFAULT_BASE_HUE: u16 = 200;
pub const DEFAULT_MAX_RUN_MILLIS: u64 = 5_000;

/// 約 60fps の 1 フレーム。
pub const FRAME_MILLIS: u64 = 16;
pub const RESIZE_DEBOUNCE_MILLIS: u32 = 100;
pub const THEME_SETTLE_MILLIS: u32 = 50;
pub const RECORDED_SAMPLES_MAX: usize = 100_000;

pub const LINE_WIDTH: f64 = 5.0;
pub const SHADOW_BLUR: f64 = 3.0;
pub const FILL_ALPHA: f64 = 0.3;
pub const AXIS_FONT: &str = "11px system-ui, -apple-system, sans-serif";
pub const MAX_AXIS_TICKS: f64 = 8.0;
pub const Y_HEADROOM: f64 = 1.25;

pub mod hues {
    pub const UNIFORM: u16 = 210;
    pub const CLT: u16 = 140;
    pub const LOGNORMAL: u16 = 28;
    pub const SIGMOID: u16 = 340;
    pub const PREF_ATTACH: u16 = 338;
}

use anyhow::{Result, ensure};
use serde::{Deserialize, Serialize};

/// Value range covered by the histogram. A range function may also
/// override the configured bin count through `bins`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BinRange {
    pub min: f64,
    pub max: f64,
    #[serde(default)]
    pub bins: Option<usize>,
}

impl BinRange {
    pub fn new(min: f64, max: f64) -> Result<Self> {
        let range = Self::between(min, max);
        range.validate()?;
        Ok(range)
    }

    pub const fn between(min: f64, max: f64) -> Self {
        Self {
            min,
            max,
            bins: None,
        }
    }

    pub fn with_bins(mut self, bins: usize) -> Self {
        self.bins = Some(bins);
        self
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.min.is_finite() && self.max.is_finite(),
            "範囲に有限でない値が含まれています: [{}, {}]",
            self.min,
            self.max
        );
        ensure!(
            self.max > self.min,
            "範囲の上限は下限より大きくなければなりません: [{}, {}]",
            self.min,
            self.max
        );
        ensure!(self.bins != Some(0), "ビン数は1以上を指定してください。");
        Ok(())
    }

    pub fn span(&self) -> f64 {
        self.max - self.min
    }
}

impl Default for BinRange {
    fn default() -> Self {
        Self::between(0.0, 1.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BinContext {
    pub range: BinRange,
    pub bins: usize,
    pub log_x: bool,
}

/// Maps a raw sample onto a bin index; `None` drops the sample.
pub trait Binner {
    fn bin_of(&self, value: f64, ctx: &BinContext) -> Option<usize>;

    /// True when counts are filled by the visualisation itself and a `None`
    /// from the sample hook is not a rejection.
    fn counts_externally(&self) -> bool {
        false
    }
}

pub fn linear_bin(value: f64, range: &BinRange, bins: usize) -> Option<usize> {
    if bins == 0 || !value.is_finite() || value < range.min || value > range.max {
        return None;
    }
    let t = (value - range.min) / range.span();
    let idx = (t * bins as f64).floor() as usize;
    Some(idx.min(bins - 1))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LinearBinner;

impl Binner for LinearBinner {
    fn bin_of(&self, value: f64, ctx: &BinContext) -> Option<usize> {
        linear_bin(value, &ctx.range, ctx.bins)
    }
}

/// Bins `ln(value)` against a range expressed in log space.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogBinner;

impl Binner for LogBinner {
    fn bin_of(&self, value: f64, ctx: &BinContext) -> Option<usize> {
        if value <= 0.0 {
            return None;
        }
        linear_bin(value.ln(), &ctx.range, ctx.bins)
    }
}

/// Log binning while the log-x toggle is on, linear otherwise.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScaleAwareBinner;

impl Binner for ScaleAwareBinner {
    fn bin_of(&self, value: f64, ctx: &BinContext) -> Option<usize> {
        if ctx.log_x {
            LogBinner.bin_of(value, ctx)
        } else {
            LinearBinner.bin_of(value, ctx)
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ExternalBinner;

impl Binner for ExternalBinner {
    fn bin_of(&self, _value: f64, _ctx: &BinContext) -> Option<usize> {
        None
    }

    fn counts_externally(&self) -> bool {
        true
    }
}

pub struct BinnerFn<F>(pub F);

impl<F> Binner for BinnerFn<F>
where
    F: Fn(f64, &BinContext) -> Option<usize>,
{
    fn bin_of(&self, value: f64, ctx: &BinContext) -> Option<usize> {
        (self.0)(value, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(min: f64, max: f64, bins: usize, log_x: bool) -> BinContext {
        BinContext {
            range: BinRange::between(min, max),
            bins,
            log_x,
        }
    }

    #[test]
    fn in_range_values_stay_in_bounds() {
        let ctx = ctx(0.0, 1.0, 100, false);
        for step in 0..=1000 {
            let value = step as f64 / 1000.0;
            let idx = LinearBinner.bin_of(value, &ctx).unwrap();
            assert!(idx < 100);
        }
    }

    #[test]
    fn upper_edge_maps_to_last_bin() {
        assert_eq!(linear_bin(1.0, &BinRange::between(0.0, 1.0), 100), Some(99));
        assert_eq!(linear_bin(5.0, &BinRange::between(0.0, 5.0), 5), Some(4));
        assert_eq!(linear_bin(0.0, &BinRange::between(0.0, 5.0), 5), Some(0));
    }

    #[test]
    fn out_of_range_and_nan_are_dropped() {
        let range = BinRange::between(0.0, 1.0);
        assert_eq!(linear_bin(-0.01, &range, 10), None);
        assert_eq!(linear_bin(1.01, &range, 10), None);
        assert_eq!(linear_bin(f64::NAN, &range, 10), None);
        assert_eq!(linear_bin(0.5, &range, 0), None);
    }

    #[test]
    fn log_binner_rejects_non_positive_values() {
        let ctx = ctx(-10.0, 0.0, 100, true);
        assert_eq!(LogBinner.bin_of(0.0, &ctx), None);
        assert_eq!(LogBinner.bin_of(-1.0, &ctx), None);
        assert_eq!(LogBinner.bin_of(1.0, &ctx), Some(99));
        let idx = LogBinner.bin_of((-4.95f64).exp(), &ctx).unwrap();
        assert_eq!(idx, 50);
    }

    #[test]
    fn scale_aware_binner_follows_toggle() {
        let linear = ctx(0.0, 1.0, 10, false);
        assert_eq!(ScaleAwareBinner.bin_of(0.55, &linear), Some(5));
        let log = ctx(-4.0, 0.0, 4, true);
        assert_eq!(ScaleAwareBinner.bin_of((-0.5f64).exp(), &log), Some(3));
    }

    #[test]
    fn external_binner_always_defers() {
        let ctx = ctx(0.0, 1.0, 10, false);
        assert_eq!(ExternalBinner.bin_of(0.5, &ctx), None);
        assert!(ExternalBinner.counts_externally());
        assert!(!LinearBinner.counts_externally());
    }

    #[test]
    fn range_validation_rejects_empty_spans() {
        assert!(BinRange::new(1.0, 1.0).is_err());
        assert!(BinRange::new(0.0, f64::INFINITY).is_err());
        assert!(BinRange::between(0.0, 1.0).with_bins(0).validate().is_err());
        assert!(BinRange::new(-3.0, 0.0).is_ok());
    }

    #[test]
    fn closure_binner_is_used_verbatim() {
        let binner = BinnerFn(|value: f64, ctx: &BinContext| {
            (value >= 0.0).then(|| (value as usize).min(ctx.bins - 1))
        });
        let ctx = ctx(0.0, 10.0, 4, false);
        assert_eq!(binner.bin_of(9.0, &ctx), Some(3));
        assert_eq!(binner.bin_of(-1.0, &ctx), None);
    }
}

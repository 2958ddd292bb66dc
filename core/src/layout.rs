/// Horizontal placement of every bin: `offsets[i]` is the left edge and
/// `widths[i]` the extent of bin `i`, both in logical pixels.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BinLayout {
    offsets: Vec<f64>,
    widths: Vec<f64>,
}

impl BinLayout {
    pub fn new(offsets: Vec<f64>, widths: Vec<f64>) -> Self {
        debug_assert_eq!(offsets.len(), widths.len());
        Self { offsets, widths }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a contiguous layout from `n + 1` boundary positions.
    pub fn from_boundaries(boundaries: &[f64]) -> Self {
        let bins = boundaries.len().saturating_sub(1);
        let mut offsets = Vec::with_capacity(bins);
        let mut widths = Vec::with_capacity(bins);
        for pair in boundaries.windows(2) {
            offsets.push(pair[0]);
            widths.push(pair[1] - pair[0]);
        }
        Self { offsets, widths }
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    pub fn offsets(&self) -> &[f64] {
        &self.offsets
    }

    pub fn widths(&self) -> &[f64] {
        &self.widths
    }

    pub fn center(&self, idx: usize) -> Option<f64> {
        Some(self.offsets.get(idx)? + self.widths.get(idx)? * 0.5)
    }

    pub fn total_width(&self) -> f64 {
        match (self.offsets.last(), self.widths.last()) {
            (Some(offset), Some(width)) => offset + width,
            _ => 0.0,
        }
    }
}

pub fn make_layout(width: u32, bins: usize, log_x: bool) -> BinLayout {
    if bins == 0 {
        return BinLayout::empty();
    }
    if log_x {
        BinLayout::from_boundaries(&log_boundaries(width as f64, bins))
    } else {
        linear_layout(width, bins)
    }
}

fn linear_layout(width: u32, bins: usize) -> BinLayout {
    let width = width as usize;
    let base = width / bins;
    let extra = width % bins;

    let mut offsets = Vec::with_capacity(bins);
    let mut widths = Vec::with_capacity(bins);
    let mut acc = 0usize;
    for idx in 0..bins {
        let bin_width = base + usize::from(idx < extra);
        offsets.push(acc as f64);
        widths.push(bin_width as f64);
        acc += bin_width;
    }
    BinLayout { offsets, widths }
}

fn log_boundaries(width: f64, bins: usize) -> Vec<f64> {
    let denominator = (bins as f64).ln_1p();
    (0..=bins)
        .map(|idx| (idx as f64).ln_1p() / denominator * width)
        .collect()
}

/// Fractional boundary positions over `0..=bins`, linear or logarithmic.
pub fn bin_positions(width: f64, bins: usize, log_x: bool) -> Vec<f64> {
    if bins == 0 {
        return Vec::new();
    }
    if log_x {
        return log_boundaries(width, bins);
    }
    (0..=bins)
        .map(|idx| idx as f64 / bins as f64 * width)
        .collect()
}

pub trait LayoutStrategy {
    fn layout(&self, width: f64, bins: usize, log_x: bool) -> BinLayout;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StandardLayout;

impl LayoutStrategy for StandardLayout {
    fn layout(&self, width: f64, bins: usize, log_x: bool) -> BinLayout {
        let width = if width.is_finite() { width.max(0.0).floor() } else { 0.0 };
        make_layout(width as u32, bins, log_x)
    }
}

pub struct LayoutFn<F>(pub F);

impl<F> LayoutStrategy for LayoutFn<F>
where
    F: Fn(f64, usize, bool) -> BinLayout,
{
    fn layout(&self, width: f64, bins: usize, log_x: bool) -> BinLayout {
        (self.0)(width, bins, log_x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_layout_covers_width_exactly() {
        for width in [1u32, 7, 100, 885, 1000, 1917] {
            for bins in [1usize, 3, 7, 70, 100, 333] {
                let layout = make_layout(width, bins, false);
                assert_eq!(layout.len(), bins);
                assert_eq!(layout.offsets()[0], 0.0);
                assert_eq!(layout.total_width(), width as f64, "width={width} bins={bins}");
                for idx in 1..bins {
                    assert_eq!(
                        layout.offsets()[idx - 1] + layout.widths()[idx - 1],
                        layout.offsets()[idx]
                    );
                }
            }
        }
    }

    #[test]
    fn linear_layout_gives_remainder_to_leading_bins() {
        let layout = make_layout(10, 4, false);
        assert_eq!(layout.widths(), &[3.0, 3.0, 2.0, 2.0]);
        assert_eq!(layout.offsets(), &[0.0, 3.0, 6.0, 8.0]);
    }

    #[test]
    fn log_layout_is_strictly_increasing_and_ends_at_width() {
        let layout = make_layout(885, 100, true);
        assert_eq!(layout.len(), 100);
        assert_eq!(layout.offsets()[0], 0.0);
        assert!((layout.total_width() - 885.0).abs() < 1e-9);
        for idx in 1..layout.len() {
            assert!(layout.offsets()[idx] > layout.offsets()[idx - 1]);
            let end = layout.offsets()[idx - 1] + layout.widths()[idx - 1];
            assert!((end - layout.offsets()[idx]).abs() < 1e-9);
        }
        // low bins are wider than high bins
        assert!(layout.widths()[0] > layout.widths()[99]);
    }

    #[test]
    fn layout_is_deterministic() {
        assert_eq!(make_layout(640, 37, true), make_layout(640, 37, true));
        assert_eq!(make_layout(640, 37, false), make_layout(640, 37, false));
    }

    #[test]
    fn zero_bins_produce_empty_layout() {
        let layout = make_layout(500, 0, false);
        assert!(layout.is_empty());
        assert_eq!(layout.total_width(), 0.0);
        assert!(bin_positions(500.0, 0, true).is_empty());
    }

    #[test]
    fn positions_match_boundary_layout() {
        let positions = bin_positions(700.0, 70, false);
        assert_eq!(positions.len(), 71);
        let layout = BinLayout::from_boundaries(&positions);
        assert_eq!(layout.len(), 70);
        assert!((layout.widths()[0] - 10.0).abs() < 1e-12);
        assert_eq!(layout.center(0), Some(5.0));
        assert_eq!(layout.center(70), None);
    }

    #[test]
    fn standard_strategy_floors_fractional_width() {
        let layout = StandardLayout.layout(100.7, 10, false);
        assert_eq!(layout.total_width(), 100.0);
        let custom = LayoutFn(|width: f64, bins: usize, _log: bool| {
            BinLayout::from_boundaries(&bin_positions(width, bins, false))
        });
        assert!((custom.layout(100.7, 10, true).total_width() - 100.7).abs() < 1e-9);
    }
}

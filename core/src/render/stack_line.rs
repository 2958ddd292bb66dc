use tracing::trace;

use super::color::Hsl;
use super::surface::DrawingSurface;
use crate::constants::{BOTTOM_PADDING, FILL_ALPHA, LEFT_PADDING, LINE_WIDTH, SHADOW_BLUR};
use crate::layout::BinLayout;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StackLineStyle {
    /// Pixels per stack unit, already multiplied by any dynamic y-scale.
    pub block_px: f64,
    pub width: f64,
    pub height: f64,
    pub color: Hsl,
    pub log_y: bool,
}

/// Largest finite stack, never below 1.
pub fn max_stack(stacks: &[f64]) -> f64 {
    stacks
        .iter()
        .copied()
        .filter(|value| value.is_finite())
        .fold(1.0, f64::max)
}

pub fn stack_height(value: f64, max_stack: f64, block_px: f64, draw_height: f64, log_y: bool) -> f64 {
    if !value.is_finite() || value <= 0.0 || draw_height <= 0.0 {
        return 0.0;
    }
    if log_y {
        (value.ln_1p() / max_stack.ln_1p() * draw_height).min(draw_height)
    } else {
        (value * block_px).min(draw_height)
    }
}

pub fn draw_stack_line(
    surface: &mut dyn DrawingSurface,
    stacks: &[f64],
    layout: &BinLayout,
    style: &StackLineStyle,
) {
    let draw_height = (style.height - BOTTOM_PADDING).max(0.0);
    let baseline = style.height - BOTTOM_PADDING;
    let line_color = style.color.css();
    let bins = stacks.len().min(layout.len());

    surface.set_stroke_style(&line_color);
    surface.set_line_width(LINE_WIDTH);
    surface.set_line_cap("round");
    surface.set_line_join("round");

    if bins == 0 {
        surface.begin_path();
        surface.move_to(LEFT_PADDING, baseline);
        surface.line_to(style.width.max(LEFT_PADDING), baseline);
        surface.stroke();
        return;
    }

    let peak = max_stack(&stacks[..bins]);
    let points: Vec<(f64, f64)> = (0..bins)
        .map(|idx| {
            let x = LEFT_PADDING + layout.center(idx).unwrap_or_default();
            let h = stack_height(stacks[idx], peak, style.block_px, draw_height, style.log_y);
            (x, baseline - h)
        })
        .collect();
    trace!(bins, peak, "stack line");

    let (first_x, _) = points[0];
    let (last_x, _) = points[bins - 1];
    surface.begin_path();
    surface.move_to(first_x, style.height);
    for &(x, y) in &points {
        surface.line_to(x, y);
    }
    surface.line_to(last_x, style.height);
    surface.close_path();
    surface.set_fill_style(&style.color.fill_variant().css());
    surface.set_global_alpha(FILL_ALPHA);
    surface.fill();
    surface.set_global_alpha(1.0);

    surface.begin_path();
    for (idx, &(x, y)) in points.iter().enumerate() {
        if idx == 0 {
            surface.move_to(x, y);
        } else {
            surface.line_to(x, y);
        }
    }
    surface.set_shadow(SHADOW_BLUR, &line_color);
    surface.stroke();
    surface.set_shadow(0.0, &line_color);
}

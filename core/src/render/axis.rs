use super::surface::DrawingSurface;
use super::theme::ThemeColors;
use crate::constants::{AXIS_FONT, MAX_AXIS_TICKS, Y_HEADROOM};

/// Scale that puts the tallest stack at 80% of the canvas height.
pub fn dynamic_y_scale(height: f64, max_stack: f64, block_px: f64) -> f64 {
    let capacity = max_stack * block_px * Y_HEADROOM;
    if capacity <= 0.0 || !capacity.is_finite() {
        return 1.0;
    }
    height / capacity
}

/// Power-of-two label step keeping at most eight ticks.
pub fn tick_interval(capacity_in_blocks: f64) -> u64 {
    let mut interval = 1u64;
    while capacity_in_blocks / interval as f64 > MAX_AXIS_TICKS {
        interval *= 2;
    }
    interval
}

pub fn draw_y_axis_grid(
    surface: &mut dyn DrawingSurface,
    height: f64,
    block_px: f64,
    y_scale: f64,
    colors: &ThemeColors,
) {
    if y_scale <= 0.0 || block_px <= 0.0 || !y_scale.is_finite() {
        return;
    }
    let capacity_in_blocks = height / y_scale / block_px;

    surface.set_stroke_style(&colors.grid);
    surface.set_line_width(2.0);
    surface.begin_path();
    surface.move_to(0.0, 0.0);
    surface.line_to(0.0, height);
    surface.stroke();

    let interval = tick_interval(capacity_in_blocks);
    surface.set_line_width(1.0);
    surface.set_fill_style(&colors.fg);
    surface.set_font(AXIS_FONT);
    surface.set_text_align("left");
    surface.set_text_baseline("middle");

    let mut tick = 0u64;
    while tick as f64 <= capacity_in_blocks {
        let y = height - tick as f64 * block_px * y_scale;
        if (0.0..=height).contains(&y) {
            surface.begin_path();
            surface.move_to(0.0, y);
            surface.line_to(8.0, y);
            surface.stroke();
            if tick > 0 {
                surface.fill_text(&tick.to_string(), 12.0, y);
            }
        }
        tick += interval;
    }
}

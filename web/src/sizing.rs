use sampleviz_core::constants::{DEFAULT_ASPECT_RATIO, DEFAULT_CANVAS_WIDTH};

/// Logical (CSS) and backing-store dimensions of a responsive canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasSize {
    pub css_width: f64,
    pub css_height: f64,
    pub backing_width: u32,
    pub backing_height: u32,
    pub device_pixel_ratio: f64,
}

/// `aspect_ratio` is width over height. A hidden container reports zero
/// width, in which case the default canvas width is used.
pub fn canvas_size(container_width: f64, aspect_ratio: f64, device_pixel_ratio: f64) -> CanvasSize {
    let css_width = if container_width.is_finite() && container_width > 0.0 {
        container_width
    } else {
        DEFAULT_CANVAS_WIDTH
    };
    let aspect_ratio = if aspect_ratio.is_finite() && aspect_ratio > 0.0 {
        aspect_ratio
    } else {
        DEFAULT_ASPECT_RATIO
    };
    let dpr = if device_pixel_ratio.is_finite() && device_pixel_ratio > 0.0 {
        device_pixel_ratio
    } else {
        1.0
    };
    let css_height = css_width / aspect_ratio;
    CanvasSize {
        css_width,
        css_height,
        backing_width: (css_width * dpr).floor() as u32,
        backing_height: (css_height * dpr).floor() as u32,
        device_pixel_ratio: dpr,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backing_store_scales_with_pixel_ratio() {
        let size = canvas_size(900.0, 2.5, 2.0);
        assert_eq!(size.css_height, 360.0);
        assert_eq!((size.backing_width, size.backing_height), (1800, 720));

        let odd = canvas_size(333.0, 2.5, 1.5);
        assert_eq!(odd.backing_width, 499);
        assert_eq!(odd.backing_height, 199);
    }

    #[test]
    fn degenerate_inputs_fall_back() {
        let size = canvas_size(0.0, f64::NAN, 0.0);
        assert_eq!(size.css_width, DEFAULT_CANVAS_WIDTH);
        assert_eq!(size.device_pixel_ratio, 1.0);
        assert_eq!(size.css_height, DEFAULT_CANVAS_WIDTH / DEFAULT_ASPECT_RATIO);
    }
}

use sampleviz_core::render::DrawingSurface;
use tracing::warn;
use wasm_bindgen::JsValue;
use web_sys::CanvasRenderingContext2d;

/// `DrawingSurface` over a browser 2-D context.
pub struct CanvasSurface {
    context: CanvasRenderingContext2d,
}

impl CanvasSurface {
    pub fn new(context: CanvasRenderingContext2d) -> Self {
        Self { context }
    }
}

fn report(operation: &str, result: Result<(), JsValue>) {
    if let Err(error) = result {
        warn!(operation, error = ?error, "キャンバス操作に失敗しました");
    }
}

impl DrawingSurface for CanvasSurface {
    fn clear_rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        self.context.clear_rect(x, y, width, height);
    }

    fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        self.context.fill_rect(x, y, width, height);
    }

    fn begin_path(&mut self) {
        self.context.begin_path();
    }

    fn move_to(&mut self, x: f64, y: f64) {
        self.context.move_to(x, y);
    }

    fn line_to(&mut self, x: f64, y: f64) {
        self.context.line_to(x, y);
    }

    fn close_path(&mut self) {
        self.context.close_path();
    }

    fn stroke(&mut self) {
        self.context.stroke();
    }

    fn fill(&mut self) {
        self.context.fill();
    }

    fn arc(&mut self, x: f64, y: f64, radius: f64, start_angle: f64, end_angle: f64) {
        report("arc", self.context.arc(x, y, radius, start_angle, end_angle));
    }

    fn fill_text(&mut self, text: &str, x: f64, y: f64) {
        report("fill_text", self.context.fill_text(text, x, y));
    }

    fn set_fill_style(&mut self, style: &str) {
        self.context.set_fill_style_str(style);
    }

    fn set_stroke_style(&mut self, style: &str) {
        self.context.set_stroke_style_str(style);
    }

    fn set_line_width(&mut self, width: f64) {
        self.context.set_line_width(width);
    }

    fn set_line_cap(&mut self, cap: &str) {
        self.context.set_line_cap(cap);
    }

    fn set_line_join(&mut self, join: &str) {
        self.context.set_line_join(join);
    }

    fn set_global_alpha(&mut self, alpha: f64) {
        self.context.set_global_alpha(alpha);
    }

    fn set_shadow(&mut self, blur: f64, color: &str) {
        self.context.set_shadow_blur(blur);
        self.context.set_shadow_color(color);
    }

    fn set_font(&mut self, font: &str) {
        self.context.set_font(font);
    }

    fn set_text_align(&mut self, align: &str) {
        self.context.set_text_align(align);
    }

    fn set_text_baseline(&mut self, baseline: &str) {
        self.context.set_text_baseline(baseline);
    }

    fn reset_transform(&mut self) {
        report("reset_transform", self.context.reset_transform());
    }

    fn scale(&mut self, x: f64, y: f64) {
        report("scale", self.context.scale(x, y));
    }
}

/// 2-D drawing backend. Mirrors the subset of the canvas API the renderer
/// needs, so a browser context, a recorder or a terminal can stand behind it.
pub trait DrawingSurface {
    fn clear_rect(&mut self, x: f64, y: f64, width: f64, height: f64);
    fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64);

    fn begin_path(&mut self);
    fn move_to(&mut self, x: f64, y: f64);
    fn line_to(&mut self, x: f64, y: f64);
    fn close_path(&mut self);
    fn stroke(&mut self);
    fn fill(&mut self);
    fn arc(&mut self, x: f64, y: f64, radius: f64, start_angle: f64, end_angle: f64);

    fn fill_text(&mut self, text: &str, x: f64, y: f64);

    fn set_fill_style(&mut self, style: &str);
    fn set_stroke_style(&mut self, style: &str);
    fn set_line_width(&mut self, width: f64);
    fn set_line_cap(&mut self, cap: &str);
    fn set_line_join(&mut self, join: &str);
    fn set_global_alpha(&mut self, alpha: f64);
    fn set_shadow(&mut self, blur: f64, color: &str);
    fn set_font(&mut self, font: &str);
    fn set_text_align(&mut self, align: &str);
    fn set_text_baseline(&mut self, baseline: &str);

    fn reset_transform(&mut self);
    fn scale(&mut self, x: f64, y: f64);
}

use super::surface::DrawingSurface;

#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    ClearRect { x: f64, y: f64, width: f64, height: f64 },
    FillRect { x: f64, y: f64, width: f64, height: f64 },
    BeginPath,
    MoveTo { x: f64, y: f64 },
    LineTo { x: f64, y: f64 },
    ClosePath,
    Stroke,
    Fill,
    Arc { x: f64, y: f64, radius: f64 },
    FillText { text: String, x: f64, y: f64 },
    FillStyle(String),
    StrokeStyle(String),
    LineWidth(f64),
    LineCap(String),
    LineJoin(String),
    GlobalAlpha(f64),
    Shadow { blur: f64, color: String },
    Font(String),
    TextAlign(String),
    TextBaseline(String),
    ResetTransform,
    Scale { x: f64, y: f64 },
}

/// Keeps the commands of the latest frame. A full clear starting at the
/// origin begins a new frame.
#[derive(Debug, Clone, Default)]
pub struct RecordingSurface {
    commands: Vec<DrawCommand>,
    frames: u64,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn count(&self, predicate: impl Fn(&DrawCommand) -> bool) -> usize {
        self.commands.iter().filter(|command| predicate(command)).count()
    }

    pub fn texts(&self) -> Vec<&str> {
        self.commands
            .iter()
            .filter_map(|command| match command {
                DrawCommand::FillText { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Vertices of the path that was stroked last.
    pub fn last_stroked_polyline(&self) -> Vec<(f64, f64)> {
        let Some(stroke_at) = self
            .commands
            .iter()
            .rposition(|command| *command == DrawCommand::Stroke)
        else {
            return Vec::new();
        };
        let begin_at = self.commands[..stroke_at]
            .iter()
            .rposition(|command| *command == DrawCommand::BeginPath)
            .map_or(0, |idx| idx + 1);
        self.commands[begin_at..stroke_at]
            .iter()
            .filter_map(|command| match *command {
                DrawCommand::MoveTo { x, y } | DrawCommand::LineTo { x, y } => Some((x, y)),
                _ => None,
            })
            .collect()
    }

    fn push(&mut self, command: DrawCommand) {
        self.commands.push(command);
    }
}

impl DrawingSurface for RecordingSurface {
    fn clear_rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        if x == 0.0 && y == 0.0 {
            self.commands.clear();
            self.frames += 1;
        }
        self.push(DrawCommand::ClearRect {
            x,
            y,
            width,
            height,
        });
    }

    fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        self.push(DrawCommand::FillRect {
            x,
            y,
            width,
            height,
        });
    }

    fn begin_path(&mut self) {
        self.push(DrawCommand::BeginPath);
    }

    fn move_to(&mut self, x: f64, y: f64) {
        self.push(DrawCommand::MoveTo { x, y });
    }

    fn line_to(&mut self, x: f64, y: f64) {
        self.push(DrawCommand::LineTo { x, y });
    }

    fn close_path(&mut self) {
        self.push(DrawCommand::ClosePath);
    }

    fn stroke(&mut self) {
        self.push(DrawCommand::Stroke);
    }

    fn fill(&mut self) {
        self.push(DrawCommand::Fill);
    }

    fn arc(&mut self, x: f64, y: f64, radius: f64, _start_angle: f64, _end_angle: f64) {
        self.push(DrawCommand::Arc { x, y, radius });
    }

    fn fill_text(&mut self, text: &str, x: f64, y: f64) {
        self.push(DrawCommand::FillText {
            text: text.to_string(),
            x,
            y,
        });
    }

    fn set_fill_style(&mut self, style: &str) {
        self.push(DrawCommand::FillStyle(style.to_string()));
    }

    fn set_stroke_style(&mut self, style: &str) {
        self.push(DrawCommand::StrokeStyle(style.to_string()));
    }

    fn set_line_width(&mut self, width: f64) {
        self.push(DrawCommand::LineWidth(width));
    }

    fn set_line_cap(&mut self, cap: &str) {
        self.push(DrawCommand::LineCap(cap.to_string()));
    }

    fn set_line_join(&mut self, join: &str) {
        self.push(DrawCommand::LineJoin(join.to_string()));
    }

    fn set_global_alpha(&mut self, alpha: f64) {
        self.push(DrawCommand::GlobalAlpha(alpha));
    }

    fn set_shadow(&mut self, blur: f64, color: &str) {
        self.push(DrawCommand::Shadow {
            blur,
            color: color.to_string(),
        });
    }

    fn set_font(&mut self, font: &str) {
        self.push(DrawCommand::Font(font.to_string()));
    }

    fn set_text_align(&mut self, align: &str) {
        self.push(DrawCommand::TextAlign(align.to_string()));
    }

    fn set_text_baseline(&mut self, baseline: &str) {
        self.push(DrawCommand::TextBaseline(baseline.to_string()));
    }

    fn reset_transform(&mut self) {
        self.push(DrawCommand::ResetTransform);
    }

    fn scale(&mut self, x: f64, y: f64) {
        self.push(DrawCommand::Scale { x, y });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_clear_starts_a_new_frame() {
        let mut surface = RecordingSurface::new();
        surface.clear_rect(0.0, 0.0, 10.0, 10.0);
        surface.fill_rect(1.0, 1.0, 2.0, 2.0);
        surface.clear_rect(0.0, 0.0, 10.0, 10.0);
        assert_eq!(surface.frames(), 2);
        assert_eq!(surface.commands().len(), 1);
    }

    #[test]
    fn polyline_is_taken_from_the_last_stroked_path() {
        let mut surface = RecordingSurface::new();
        surface.begin_path();
        surface.move_to(0.0, 0.0);
        surface.line_to(1.0, 1.0);
        surface.stroke();
        surface.begin_path();
        surface.move_to(5.0, 5.0);
        surface.line_to(6.0, 4.0);
        surface.line_to(7.0, 3.0);
        surface.stroke();
        assert_eq!(
            surface.last_stroked_polyline(),
            vec![(5.0, 5.0), (6.0, 4.0), (7.0, 3.0)]
        );
    }
}

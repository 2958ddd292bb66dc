mod axis;
mod color;
mod recording;
mod stack_line;
mod surface;
mod theme;

pub use axis::{draw_y_axis_grid, dynamic_y_scale, tick_interval};
pub use color::Hsl;
pub use recording::{DrawCommand, RecordingSurface};
pub use stack_line::{StackLineStyle, draw_stack_line, max_stack, stack_height};
pub use surface::DrawingSurface;
pub use theme::{SubscriptionId, ThemeColors, ThemeProvider};

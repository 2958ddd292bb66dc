#![cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]

mod controls;
mod palette;
mod sizing;

#[cfg(target_arch = "wasm32")]
mod canvas;
#[cfg(target_arch = "wasm32")]
mod dom;
#[cfg(target_arch = "wasm32")]
mod scheduler;

pub use controls::{ElementIds, parse_count, parse_sides};
pub use palette::{detect_dark, palette_from_vars};
pub use sizing::{CanvasSize, canvas_size};

#[cfg(target_arch = "wasm32")]
pub use canvas::CanvasSurface;
#[cfg(target_arch = "wasm32")]
pub use dom::init_visual;
#[cfg(target_arch = "wasm32")]
pub use scheduler::BrowserScheduler;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn start() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

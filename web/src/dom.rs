use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use gloo_timers::callback::Timeout;
use sampleviz_core::constants::{RESIZE_DEBOUNCE_MILLIS, THEME_SETTLE_MILLIS};
use sampleviz_core::render::{ThemeColors, ThemeProvider};
use sampleviz_core::{Preset, Scheduler, StandardSimulation, VisualKind};
use tracing::{debug, warn};
use wasm_bindgen::JsCast;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;
use web_sys::{
    CanvasRenderingContext2d, Document, Element, Event, EventTarget, HtmlCanvasElement,
    HtmlElement, HtmlInputElement, HtmlSelectElement, MutationObserver, MutationObserverInit,
    MutationRecord, Window,
};

use crate::canvas::CanvasSurface;
use crate::controls::{ElementIds, parse_count, parse_sides};
use crate::palette::palette_from_vars;
use crate::scheduler::BrowserScheduler;
use crate::sizing::{CanvasSize, canvas_size};

const DARK_SCHEME_QUERY: &str = "(prefers-color-scheme: dark)";

thread_local! {
    static VISUALS: RefCell<HashMap<String, Rc<StandardSimulation>>> = RefCell::new(HashMap::new());
    static THEME: RefCell<Option<Rc<ThemeProvider>>> = const { RefCell::new(None) };
}

/// Wires the visual whose elements share `base_id`. Pages without the
/// canvas or step button are skipped without an error.
#[wasm_bindgen]
pub fn init_visual(base_id: &str, kind: &str) -> Result<(), JsValue> {
    let kind = match VisualKind::from_key(kind) {
        Ok(kind) => kind,
        Err(error) => {
            warn!(base_id, %error, "可視化を初期化しません");
            return Ok(());
        }
    };
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("window unavailable"))?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("document unavailable"))?;

    let ids = ElementIds::for_base(base_id);
    let Some(canvas) = element::<HtmlCanvasElement>(&document, &ids.canvas) else {
        warn!(id = %ids.canvas, "キャンバスが見つかりません");
        return Ok(());
    };
    let Some(step) = element::<HtmlElement>(&document, &ids.step) else {
        warn!(id = %ids.step, "ステップボタンが見つかりません");
        return Ok(());
    };
    let context = canvas_2d_context(&canvas)?;
    let theme = shared_theme(&window, &document)?;

    let count_input = element::<HtmlInputElement>(&document, &ids.count);
    let sides_select = element::<HtmlSelectElement>(&document, &ids.sides);
    let log_x_toggle = element::<HtmlInputElement>(&document, &ids.log_x);
    let log_y_toggle = element::<HtmlInputElement>(&document, &ids.log_y);
    let info = document.get_element_by_id(&ids.info);

    let mut preset = Preset::new(kind);
    if let Some(count) = count_input.as_ref().and_then(|input| parse_count(&input.value())) {
        preset.count = count;
    }
    if let Some(sides) = sides_select.as_ref().and_then(|select| parse_sides(&select.value())) {
        preset.sides = sides;
    }
    if let Some(toggle) = &log_x_toggle {
        preset.config.log_x = Some(toggle.checked());
    }
    if let Some(toggle) = &log_y_toggle {
        preset.config.log_y = Some(toggle.checked());
    }

    let aspect_ratio = preset.config().aspect_ratio;
    let size = measure(&window, &canvas, aspect_ratio);
    apply_canvas_size(&canvas, &context, &size)?;

    let scheduler: Rc<dyn Scheduler> = Rc::new(BrowserScheduler::new(window.clone()));
    let simulation = preset
        .builder()
        .canvas_size(size.css_width, size.css_height)
        .scheduler(scheduler)
        .surface(Box::new(CanvasSurface::new(context.clone())))
        .theme(theme)
        .build()
        .map_err(|error| JsValue::from_str(&format!("{error:#}")))?;
    let simulation = Rc::new(simulation);
    let weak = Rc::downgrade(&simulation);
    update_info(info.as_ref(), &simulation);

    {
        let weak = weak.clone();
        listen(&step, "click", move |_| {
            if let Some(simulation) = weak.upgrade() {
                simulation.step();
            }
        })?;
    }

    if let Some(run) = element::<HtmlElement>(&document, &ids.run) {
        run.set_text_content(Some(simulation.run_label()));
        let label = run.clone();
        simulation.on_run_state_change(move |running| {
            label.set_text_content(Some(if running { "Stop" } else { "Run" }));
        });
        let weak = weak.clone();
        listen(&run, "click", move |_| {
            if let Some(simulation) = weak.upgrade() {
                simulation.toggle_run();
            }
        })?;
    }

    if let Some(reset) = element::<HtmlElement>(&document, &ids.reset) {
        let weak = weak.clone();
        listen(&reset, "click", move |_| {
            if let Some(simulation) = weak.upgrade() {
                simulation.reset();
            }
        })?;
    }

    if let Some(input) = count_input {
        let weak = weak.clone();
        let info = info.clone();
        let source = input.clone();
        listen(&input, "change", move |_| {
            let Some(simulation) = weak.upgrade() else { return };
            match parse_count(&source.value()) {
                Some(count) => simulation.set_count(count),
                None => warn!(value = %source.value(), "試行回数の入力を無視します"),
            }
            update_info(info.as_ref(), &simulation);
        })?;
    }

    if let Some(select) = sides_select {
        let weak = weak.clone();
        let info = info.clone();
        let source = select.clone();
        listen(&select, "change", move |_| {
            let Some(simulation) = weak.upgrade() else { return };
            if let Some(sides) = parse_sides(&source.value()) {
                simulation.set_sides(sides);
            }
            update_info(info.as_ref(), &simulation);
        })?;
    }

    if let Some(toggle) = log_x_toggle {
        let weak = weak.clone();
        let source = toggle.clone();
        listen(&toggle, "change", move |_| {
            if let Some(simulation) = weak.upgrade() {
                simulation.set_log_x(source.checked());
            }
        })?;
    }

    if let Some(toggle) = log_y_toggle {
        let weak = weak.clone();
        let source = toggle.clone();
        listen(&toggle, "change", move |_| {
            if let Some(simulation) = weak.upgrade() {
                simulation.set_log_y(source.checked());
            }
        })?;
    }

    let debounce: Rc<RefCell<Option<Timeout>>> = Rc::new(RefCell::new(None));
    {
        let resize_window = window.clone();
        listen(&window, "resize", move |_| {
            let window = resize_window.clone();
            let canvas = canvas.clone();
            let context = context.clone();
            let weak = weak.clone();
            // replacing the pending timeout clears it
            *debounce.borrow_mut() = Some(Timeout::new(RESIZE_DEBOUNCE_MILLIS, move || {
                let Some(simulation) = weak.upgrade() else { return };
                let size = measure(&window, &canvas, aspect_ratio);
                if let Err(error) = apply_canvas_size(&canvas, &context, &size) {
                    warn!(error = ?error, "キャンバスの大きさを変更できません");
                    return;
                }
                simulation.resize(size.css_width, size.css_height);
            }));
        })?;
    }

    VISUALS.with(|visuals| {
        visuals.borrow_mut().insert(base_id.to_owned(), simulation);
    });
    debug!(base_id, kind = %kind, width = size.css_width, "可視化を初期化");
    Ok(())
}

fn element<T: JsCast>(document: &Document, id: &str) -> Option<T> {
    document.get_element_by_id(id)?.dyn_into::<T>().ok()
}

fn canvas_2d_context(canvas: &HtmlCanvasElement) -> Result<CanvasRenderingContext2d, JsValue> {
    Ok(canvas
        .get_context("2d")?
        .ok_or_else(|| JsValue::from_str("could not acquire 2d context"))?
        .dyn_into::<CanvasRenderingContext2d>()?)
}

fn listen(
    target: &EventTarget,
    event: &str,
    handler: impl FnMut(Event) + 'static,
) -> Result<(), JsValue> {
    let closure = Closure::wrap(Box::new(handler) as Box<dyn FnMut(Event)>);
    target.add_event_listener_with_callback(event, closure.as_ref().unchecked_ref())?;
    closure.forget();
    Ok(())
}

fn update_info(info: Option<&Element>, simulation: &StandardSimulation) {
    if let Some(info) = info {
        info.set_text_content(Some(&simulation.info_text()));
    }
}

fn measure(window: &Window, canvas: &HtmlCanvasElement, aspect_ratio: f64) -> CanvasSize {
    let container_width = canvas
        .parent_element()
        .map(|parent| f64::from(parent.client_width()))
        .unwrap_or(0.0);
    canvas_size(container_width, aspect_ratio, window.device_pixel_ratio())
}

/// CSS size in logical pixels, backing store in device pixels, and a
/// context scaled so drawing stays in logical pixels.
fn apply_canvas_size(
    canvas: &HtmlCanvasElement,
    context: &CanvasRenderingContext2d,
    size: &CanvasSize,
) -> Result<(), JsValue> {
    let style = canvas.style();
    style.set_property("width", &format!("{}px", size.css_width))?;
    style.set_property("height", &format!("{}px", size.css_height))?;
    canvas.set_width(size.backing_width);
    canvas.set_height(size.backing_height);
    context.reset_transform()?;
    context.scale(size.device_pixel_ratio, size.device_pixel_ratio)?;
    Ok(())
}

fn shared_theme(window: &Window, document: &Document) -> Result<Rc<ThemeProvider>, JsValue> {
    if let Some(theme) = THEME.with(|slot| slot.borrow().clone()) {
        return Ok(theme);
    }
    let theme = Rc::new(ThemeProvider::new(read_theme(window, document)));
    observe_theme(window, document, &theme)?;
    THEME.with(|slot| *slot.borrow_mut() = Some(Rc::clone(&theme)));
    Ok(theme)
}

fn has_dark_class(element: Option<&Element>) -> bool {
    element.is_some_and(|element| element.class_list().contains("darkmode"))
}

fn read_theme(window: &Window, document: &Document) -> ThemeColors {
    let root = document.document_element();
    let body = document.body();
    let class_dark = has_dark_class(root.as_ref()) || has_dark_class(body.as_deref());
    let style = body
        .as_ref()
        .and_then(|body| window.get_computed_style(body).ok().flatten());
    palette_from_vars(
        |name| style.as_ref().and_then(|style| style.get_property_value(name).ok()),
        class_dark,
    )
}

/// Re-reads the palette once computed styles have settled.
fn refresh_theme_later(window: &Window, document: &Document, theme: &Weak<ThemeProvider>) {
    let weak = theme.clone();
    let window = window.clone();
    let document = document.clone();
    let _ = Timeout::new(THEME_SETTLE_MILLIS, move || {
        if let Some(theme) = weak.upgrade() {
            theme.set_palette(read_theme(&window, &document));
        }
    })
    .forget();
}

/// Follows the page's `darkmode` class and the OS colour scheme.
fn observe_theme(
    window: &Window,
    document: &Document,
    theme: &Rc<ThemeProvider>,
) -> Result<(), JsValue> {
    let weak = Rc::downgrade(theme);

    if let Some(query) = window.match_media(DARK_SCHEME_QUERY)? {
        let window = window.clone();
        let document = document.clone();
        let weak = weak.clone();
        listen(&query, "change", move |_| {
            refresh_theme_later(&window, &document, &weak);
        })?;
    }

    let window = window.clone();
    let source = document.clone();
    let callback = Closure::wrap(Box::new(move |records: js_sys::Array, _observer: MutationObserver| {
        let class_changed = records.iter().any(|record| {
            record
                .dyn_into::<MutationRecord>()
                .ok()
                .and_then(|record| record.attribute_name())
                .is_some_and(|name| name == "class")
        });
        if class_changed {
            refresh_theme_later(&window, &source, &weak);
        }
    }) as Box<dyn FnMut(js_sys::Array, MutationObserver)>);

    let observer = MutationObserver::new(callback.as_ref().unchecked_ref())?;
    let init = MutationObserverInit::new();
    init.set_attributes(true);
    init.set_attribute_filter(&js_sys::Array::of1(&JsValue::from_str("class")));
    if let Some(root) = document.document_element() {
        observer.observe_with_options(&root, &init)?;
    }
    if let Some(body) = document.body() {
        observer.observe_with_options(&body, &init)?;
    }
    callback.forget();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    use gloo_timers::future::TimeoutFuture;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    async fn color_scheme_change_rereads_the_palette() {
        let window = web_sys::window().unwrap();
        let document = window.document().unwrap();
        let theme = Rc::new(ThemeProvider::new(ThemeColors::light()));
        let refreshes = Rc::new(Cell::new(0));
        let counter = Rc::clone(&refreshes);
        theme.subscribe(move |_| counter.set(counter.get() + 1));
        observe_theme(&window, &document, &theme).unwrap();

        let query = window.match_media(DARK_SCHEME_QUERY).unwrap().unwrap();
        query.dispatch_event(&Event::new("change").unwrap()).unwrap();
        assert_eq!(refreshes.get(), 0);
        TimeoutFuture::new(THEME_SETTLE_MILLIS * 3).await;
        assert_eq!(refreshes.get(), 1);
    }
}

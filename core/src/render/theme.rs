use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeColors {
    pub bg: String,
    pub bg_h: String,
    pub fg: String,
    pub fg2: String,
    pub fg3: String,
    pub grid: String,
    pub threshold: String,
    pub trend_line: String,
    pub chart_fill: String,
    pub is_dark: bool,
}

impl ThemeColors {
    pub fn light() -> Self {
        Self {
            bg: "#fbf1c7".into(),
            bg_h: "#f9f5d7".into(),
            fg: "#282828".into(),
            fg2: "#7c6f64".into(),
            fg3: "#665c54".into(),
            grid: "rgba(0, 0, 0, 0.1)".into(),
            threshold: "#d65d0e".into(),
            trend_line: "#9d0006".into(),
            chart_fill: "rgba(66, 123, 88, 0.18)".into(),
            is_dark: false,
        }
    }

    pub fn dark() -> Self {
        Self {
            bg: "#282828".into(),
            bg_h: "#1d2021".into(),
            fg: "#fbf1c7".into(),
            fg2: "#a89984".into(),
            fg3: "#bdae93".into(),
            grid: "rgba(255, 255, 255, 0.1)".into(),
            threshold: "#d79921".into(),
            trend_line: "#cc241d".into(),
            chart_fill: "rgba(131, 165, 152, 0.25)".into(),
            is_dark: true,
        }
    }

    pub fn fallback(is_dark: bool) -> Self {
        if is_dark { Self::dark() } else { Self::light() }
    }
}

impl Default for ThemeColors {
    fn default() -> Self {
        Self::light()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Rc<dyn Fn(&ThemeColors)>;

/// Owned palette service. Renderers read the palette on every draw; hosts
/// push changes through `set_palette`, which notifies subscribers.
pub struct ThemeProvider {
    palette: RefCell<ThemeColors>,
    listeners: RefCell<Vec<(SubscriptionId, Listener)>>,
    next_id: Cell<u64>,
    closed: Cell<bool>,
}

impl ThemeProvider {
    pub fn new(palette: ThemeColors) -> Self {
        Self {
            palette: RefCell::new(palette),
            listeners: RefCell::new(Vec::new()),
            next_id: Cell::new(0),
            closed: Cell::new(false),
        }
    }

    pub fn colors(&self) -> ThemeColors {
        self.palette.borrow().clone()
    }

    pub fn set_palette(&self, palette: ThemeColors) {
        *self.palette.borrow_mut() = palette.clone();
        // listeners may subscribe or unsubscribe while being notified
        let listeners: Vec<Listener> = self
            .listeners
            .borrow()
            .iter()
            .map(|(_, listener)| Rc::clone(listener))
            .collect();
        debug!(listeners = listeners.len(), dark = palette.is_dark, "テーマを更新");
        for listener in listeners {
            listener(&palette);
        }
    }

    pub fn subscribe(&self, listener: impl Fn(&ThemeColors) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        if !self.closed.get() {
            self.listeners.borrow_mut().push((id, Rc::new(listener)));
        }
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    /// Drops every subscriber; later subscriptions are ignored.
    pub fn shutdown(&self) {
        self.closed.set(true);
        self.listeners.borrow_mut().clear();
    }

    pub fn subscriber_count(&self) -> usize {
        self.listeners.borrow().len()
    }
}

impl Default for ThemeProvider {
    fn default() -> Self {
        Self::new(ThemeColors::light())
    }
}

impl fmt::Debug for ThemeProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThemeProvider")
            .field("palette", &*self.palette.borrow())
            .field("subscribers", &self.subscriber_count())
            .field("closed", &self.closed.get())
            .finish()
    }
}

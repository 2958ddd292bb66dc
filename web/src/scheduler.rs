use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use gloo_timers::callback::Timeout;
use sampleviz_core::{FrameCallback, ScheduleToken, Scheduler};
use tracing::warn;
use wasm_bindgen::JsCast;
use wasm_bindgen::closure::Closure;
use web_sys::Window;

enum Pending {
    Frame {
        handle: i32,
        _closure: Closure<dyn FnMut(f64)>,
    },
    Delay(Timeout),
}

struct Inner {
    window: Window,
    next_token: Cell<u64>,
    pending: RefCell<HashMap<u64, Pending>>,
}

impl Inner {
    fn request_frame(self: &Rc<Self>, token: u64, callback: FrameCallback) {
        let weak: Weak<Inner> = Rc::downgrade(self);
        let closure = Closure::once(move |_timestamp: f64| {
            let Some(inner) = weak.upgrade() else { return };
            // wasm-bindgen defers freeing the closure until this call returns
            let removed = inner.pending.borrow_mut().remove(&token);
            if removed.is_some() {
                callback();
            }
        });
        match self
            .window
            .request_animation_frame(closure.as_ref().unchecked_ref())
        {
            Ok(handle) => {
                self.pending.borrow_mut().insert(
                    token,
                    Pending::Frame {
                        handle,
                        _closure: closure,
                    },
                );
            }
            Err(error) => warn!(error = ?error, "requestAnimationFrame に失敗しました"),
        }
    }
}

/// `Scheduler` over `requestAnimationFrame`; non-zero delays wait on a
/// timer first and then for the next frame.
#[derive(Clone)]
pub struct BrowserScheduler {
    inner: Rc<Inner>,
}

impl BrowserScheduler {
    pub fn new(window: Window) -> Self {
        Self {
            inner: Rc::new(Inner {
                window,
                next_token: Cell::new(0),
                pending: RefCell::new(HashMap::new()),
            }),
        }
    }

    pub fn pending(&self) -> usize {
        self.inner.pending.borrow().len()
    }
}

impl Scheduler for BrowserScheduler {
    fn schedule(&self, after_millis: u64, callback: FrameCallback) -> ScheduleToken {
        let raw = self.inner.next_token.get();
        self.inner.next_token.set(raw + 1);

        if after_millis == 0 {
            self.inner.request_frame(raw, callback);
        } else {
            let weak = Rc::downgrade(&self.inner);
            let delay = u32::try_from(after_millis).unwrap_or(u32::MAX);
            let timeout = Timeout::new(delay, move || {
                if let Some(inner) = weak.upgrade() {
                    let removed = inner.pending.borrow_mut().remove(&raw);
                    if let Some(Pending::Delay(_)) = removed {
                        inner.request_frame(raw, callback);
                    }
                }
            });
            self.inner
                .pending
                .borrow_mut()
                .insert(raw, Pending::Delay(timeout));
        }
        ScheduleToken::new(raw)
    }

    fn cancel(&self, token: ScheduleToken) -> bool {
        let removed = self.inner.pending.borrow_mut().remove(&token.raw());
        match removed {
            Some(Pending::Frame { handle, .. }) => {
                if let Err(error) = self.inner.window.cancel_animation_frame(handle) {
                    warn!(error = ?error, "cancelAnimationFrame に失敗しました");
                }
                true
            }
            // dropping a gloo Timeout clears it
            Some(Pending::Delay(_)) => true,
            None => false,
        }
    }

    fn now_millis(&self) -> u64 {
        self.inner
            .window
            .performance()
            .map(|performance| performance.now().max(0.0) as u64)
            .unwrap_or(0)
    }
}

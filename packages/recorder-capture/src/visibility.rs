//! Tab-visibility auto-pause (spec §4.3): "when the hosting tab becomes
//! hidden, the recorder must auto-pause; when it becomes visible, it must
//! not auto-resume."

use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Document, VisibilityState};

/// Listens for the document's `visibilitychange` event and invokes
/// `on_hidden` exactly when the tab transitions to hidden. Visible
/// transitions are deliberately not wired to a callback: resume after
/// auto-pause always requires explicit user action (spec §4.3, §6
/// "Tab-visibility auto-pause is always on").
pub struct VisibilityWatcher {
    document: Document,
    _closure: Closure<dyn FnMut(JsValue)>,
}

impl VisibilityWatcher {
    /// Registers the listener. `on_hidden` is called once per transition
    /// into the hidden state; it is the caller's responsibility to map
    /// that into `ChunkedRecorder::pause(PauseCause::Visibility, ..)`.
    ///
    /// # Errors
    /// Returns `Err` if there is no `window`/`document` (non-browser
    /// target) or the listener could not be attached.
    pub fn install(on_hidden: impl Fn() + 'static) -> Result<Self, JsValue> {
        let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
        let document = window.document().ok_or_else(|| JsValue::from_str("no document"))?;

        let doc_for_closure = document.clone();
        let hidden_flag = Rc::new(RefCell::new(false));
        let closure = Closure::wrap(Box::new(move |_event: JsValue| {
            let is_hidden = doc_for_closure.visibility_state() == VisibilityState::Hidden;
            let mut was_hidden = hidden_flag.borrow_mut();
            if is_hidden && !*was_hidden {
                *was_hidden = true;
                on_hidden();
            } else if !is_hidden {
                *was_hidden = false;
            }
        }) as Box<dyn FnMut(JsValue)>);

        document.set_onvisibilitychange(Some(closure.as_ref().unchecked_ref()));

        Ok(Self {
            document,
            _closure: closure,
        })
    }
}

impl Drop for VisibilityWatcher {
    fn drop(&mut self) {
        self.document.set_onvisibilitychange(None);
    }
}

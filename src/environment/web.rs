//! Web bridge - `document.hidden` and `window.matchMedia` via web-sys.
//!
//! Only built for `wasm32` with the `web` feature. Every registered listener
//! owns a JS closure; the closure is dropped when the listener is removed.

use std::cell::RefCell;
use std::rc::Rc;

use js_sys::Function;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use web_sys::{Document, EventTarget, MediaQueryListEvent, Window};

use super::registry::same_handler;
use super::{MediaEnvironment, MediaQueryList, VisibilitySource};
use crate::types::{ChangeListener, MediaChangeListener};

const VISIBILITY_EVENT: &str = "visibilitychange";
const MEDIA_EVENT: &str = "change";

fn listen(target: &EventTarget, event: &str, closure: &Function) -> bool {
    match target.add_event_listener_with_callback(event, closure) {
        Ok(()) => true,
        Err(error) => {
            tracing::warn!(event, ?error, "addEventListener failed");
            false
        }
    }
}

fn unlisten(target: &EventTarget, event: &str, closure: &Function) {
    if let Err(error) = target.remove_event_listener_with_callback(event, closure) {
        tracing::warn!(event, ?error, "removeEventListener failed");
    }
}

// =============================================================================
// Document
// =============================================================================

/// Visibility source backed by the browser document.
pub struct WebDocument {
    document: Document,
    listeners: RefCell<Vec<(ChangeListener, Closure<dyn Fn()>)>>,
}

impl WebDocument {
    pub fn new(document: Document) -> Self {
        Self {
            document,
            listeners: RefCell::new(Vec::new()),
        }
    }

    /// The current window's document, if there is one.
    pub fn detect() -> Option<Self> {
        let document = web_sys::window()?.document()?;
        Some(Self::new(document))
    }
}

impl VisibilitySource for WebDocument {
    fn is_hidden(&self) -> bool {
        self.document.hidden()
    }

    fn add_change_listener(&self, listener: &ChangeListener) {
        if self.listeners.borrow().iter().any(|(l, _)| same_handler(l, listener)) {
            return;
        }
        let callback = listener.clone();
        let closure = Closure::<dyn Fn()>::new(move || callback());
        if listen(&self.document, VISIBILITY_EVENT, closure.as_ref().unchecked_ref()) {
            self.listeners.borrow_mut().push((listener.clone(), closure));
        }
    }

    fn remove_change_listener(&self, listener: &ChangeListener) {
        let mut listeners = self.listeners.borrow_mut();
        if let Some(pos) = listeners.iter().position(|(l, _)| same_handler(l, listener)) {
            let (_, closure) = listeners.remove(pos);
            unlisten(&self.document, VISIBILITY_EVENT, closure.as_ref().unchecked_ref());
        }
    }
}

impl Drop for WebDocument {
    fn drop(&mut self) {
        for (_, closure) in self.listeners.borrow_mut().drain(..) {
            unlisten(&self.document, VISIBILITY_EVENT, closure.as_ref().unchecked_ref());
        }
    }
}

// =============================================================================
// Media
// =============================================================================

/// Media environment backed by `window.matchMedia`.
pub struct WebMediaEnvironment {
    window: Window,
}

impl WebMediaEnvironment {
    pub fn new(window: Window) -> Self {
        Self { window }
    }

    /// The current window, or `None` outside a browser.
    pub fn detect() -> Option<Rc<dyn MediaEnvironment>> {
        let window = web_sys::window()?;
        Some(Rc::new(Self::new(window)))
    }
}

impl MediaEnvironment for WebMediaEnvironment {
    fn match_media(&self, query: &str) -> Rc<dyn MediaQueryList> {
        let list = match self.window.match_media(query) {
            Ok(list) => list,
            Err(error) => {
                tracing::debug!(media = query, ?error, "matchMedia rejected query");
                None
            }
        };
        Rc::new(WebQueryList {
            media: query.to_string(),
            list,
            listeners: RefCell::new(Vec::new()),
        })
    }
}

/// One `MediaQueryList`. A rejected query has no list and never matches.
pub struct WebQueryList {
    media: String,
    list: Option<web_sys::MediaQueryList>,
    listeners: RefCell<Vec<(MediaChangeListener, Closure<dyn Fn(MediaQueryListEvent)>)>>,
}

impl MediaQueryList for WebQueryList {
    fn media(&self) -> &str {
        &self.media
    }

    fn matches(&self) -> bool {
        self.list.as_ref().is_some_and(web_sys::MediaQueryList::matches)
    }

    fn add_change_listener(&self, listener: &MediaChangeListener) {
        let Some(list) = &self.list else {
            return;
        };
        if self.listeners.borrow().iter().any(|(l, _)| same_handler(l, listener)) {
            return;
        }
        let callback = listener.clone();
        let closure = Closure::<dyn Fn(MediaQueryListEvent)>::new(move |event: MediaQueryListEvent| {
            callback(event.matches())
        });
        if listen(list, MEDIA_EVENT, closure.as_ref().unchecked_ref()) {
            self.listeners.borrow_mut().push((listener.clone(), closure));
        }
    }

    fn remove_change_listener(&self, listener: &MediaChangeListener) {
        let Some(list) = &self.list else {
            return;
        };
        let mut listeners = self.listeners.borrow_mut();
        if let Some(pos) = listeners.iter().position(|(l, _)| same_handler(l, listener)) {
            let (_, closure) = listeners.remove(pos);
            unlisten(list, MEDIA_EVENT, closure.as_ref().unchecked_ref());
        }
    }
}

impl Drop for WebQueryList {
    fn drop(&mut self) {
        if let Some(list) = &self.list {
            for (_, closure) in self.listeners.borrow_mut().drain(..) {
                unlisten(list, MEDIA_EVENT, closure.as_ref().unchecked_ref());
            }
        }
    }
}

//! Headless Document - in-process visibility source.
//!
//! Stands in for the browser's `document.hidden` + `visibilitychange` pair
//! when there is no browser: tests, terminal apps, server rendering.
//! The owner flips the flag with [`HeadlessDocument::set_hidden`] and every
//! registered listener is notified synchronously.
//!
//! # Example
//!
//! ```ignore
//! use std::rc::Rc;
//! use spark_observers::environment::HeadlessDocument;
//! use spark_observers::VisibilityTracker;
//!
//! let document = Rc::new(HeadlessDocument::new(false));
//! let tracker = VisibilityTracker::new(document.clone());
//!
//! document.set_hidden(true);
//! assert!(!tracker.visible());
//! assert_eq!(tracker.count(), 1);
//! ```

use std::cell::{Cell, RefCell};

use super::registry::HandlerRegistry;
use super::VisibilitySource;
use crate::types::ChangeListener;

/// Visibility source owned and driven by the caller.
pub struct HeadlessDocument {
    hidden: Cell<bool>,
    listeners: RefCell<HandlerRegistry<dyn Fn()>>,
    added: Cell<usize>,
    removed: Cell<usize>,
}

impl Default for HeadlessDocument {
    fn default() -> Self {
        Self::new(false)
    }
}

impl HeadlessDocument {
    /// Create a document with the given initial hidden flag.
    pub fn new(hidden: bool) -> Self {
        Self {
            hidden: Cell::new(hidden),
            listeners: RefCell::new(HandlerRegistry::new()),
            added: Cell::new(0),
            removed: Cell::new(0),
        }
    }

    /// Set the hidden flag. Fires a change event only if the flag changed.
    pub fn set_hidden(&self, hidden: bool) {
        if self.hidden.replace(hidden) == hidden {
            return;
        }
        self.dispatch_change();
    }

    /// Hide the document (move to background).
    pub fn hide(&self) {
        self.set_hidden(true);
    }

    /// Show the document (bring to foreground).
    pub fn show(&self) {
        self.set_hidden(false);
    }

    /// Fire a change event without touching the flag.
    pub fn dispatch_change(&self) {
        // Release the borrow before calling out; listeners may unregister.
        let listeners = self.listeners.borrow().snapshot();
        tracing::trace!(
            hidden = self.hidden.get(),
            listeners = listeners.len(),
            "visibilitychange"
        );
        for listener in listeners {
            listener();
        }
    }

    /// Number of listeners currently registered.
    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    /// Number of successful `add_change_listener` calls.
    pub fn added(&self) -> usize {
        self.added.get()
    }

    /// Number of successful `remove_change_listener` calls.
    pub fn removed(&self) -> usize {
        self.removed.get()
    }

    /// Check whether this exact listener is registered.
    pub fn has_listener(&self, listener: &ChangeListener) -> bool {
        self.listeners.borrow().id_of(listener).is_some()
    }
}

impl VisibilitySource for HeadlessDocument {
    fn is_hidden(&self) -> bool {
        self.hidden.get()
    }

    fn add_change_listener(&self, listener: &ChangeListener) {
        let mut listeners = self.listeners.borrow_mut();
        if listeners.id_of(listener).is_none() {
            listeners.insert(listener.clone());
            self.added.set(self.added.get() + 1);
        }
    }

    fn remove_change_listener(&self, listener: &ChangeListener) {
        if self.listeners.borrow_mut().remove(listener) {
            self.removed.set(self.removed.get() + 1);
        }
    }
}

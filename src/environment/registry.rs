//! Handler Registry - identity-keyed listener set.
//!
//! Every observer in this crate fans out to a dynamic set of `Rc` callbacks.
//! Membership is by allocation identity: inserting the same `Rc` twice keeps
//! one entry, and removal only ever drops the entry that matches.
//!
//! Each entry carries a monotonically increasing id so that a stale
//! unsubscribe handle can be told apart from a later re-registration of the
//! same callback.

use std::rc::Rc;

/// Identity set of `Rc` handlers with stable registration ids.
pub struct HandlerRegistry<F: ?Sized> {
    handlers: Vec<(usize, Rc<F>)>,
    next_id: usize,
}

impl<F: ?Sized> Default for HandlerRegistry<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: ?Sized> HandlerRegistry<F> {
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
            next_id: 0,
        }
    }

    fn next_id(&mut self) -> usize {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Insert a handler. Returns its registration id.
    ///
    /// If the same `Rc` is already registered, the existing id is returned
    /// and nothing is added.
    pub fn insert(&mut self, handler: Rc<F>) -> usize {
        if let Some(id) = self.id_of(&handler) {
            return id;
        }
        let id = self.next_id();
        self.handlers.push((id, handler));
        id
    }

    /// Registration id of a handler, if present.
    pub fn id_of(&self, handler: &Rc<F>) -> Option<usize> {
        self.handlers
            .iter()
            .find(|(_, h)| same_handler(h, handler))
            .map(|(id, _)| *id)
    }

    /// Remove a handler by identity. Returns true if it was present.
    pub fn remove(&mut self, handler: &Rc<F>) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|(_, h)| !same_handler(h, handler));
        self.handlers.len() != before
    }

    /// Remove the entry with the given registration id.
    pub fn remove_id(&mut self, id: usize) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|(handler_id, _)| *handler_id != id);
        self.handlers.len() != before
    }

    /// Check whether a registration id is still live.
    pub fn contains_id(&self, id: usize) -> bool {
        self.handlers.iter().any(|(handler_id, _)| *handler_id == id)
    }

    /// Clone the current handlers for dispatch.
    ///
    /// Dispatch iterates the snapshot, not the registry, so handlers may
    /// subscribe or unsubscribe while being notified.
    pub fn snapshot(&self) -> Vec<Rc<F>> {
        self.handlers.iter().map(|(_, h)| h.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn clear(&mut self) {
        self.handlers.clear();
    }
}

/// Compare two handlers by allocation address (vtable ignored).
pub fn same_handler<F: ?Sized>(a: &Rc<F>, b: &Rc<F>) -> bool {
    std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
}

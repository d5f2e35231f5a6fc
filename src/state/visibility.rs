//! Visibility Tracker - foreground state, leave count, transition listeners
//!
//! Binds to a [`VisibilitySource`] and keeps a local copy of its state:
//! - `visible` signal (true while the page is in the foreground)
//! - `count` signal (how many times the page went to the background)
//! - a listener set notified on every visibility change
//!
//! # API
//!
//! - `visible()` / `count()` - current values (reactive reads)
//! - `on_visibility_change()` - the tracker's subscriber; same handle for
//!   the tracker's whole lifetime
//! - `subscriber.subscribe(handler)` - returns an [`Unsubscribe`] handle
//!
//! # Example
//!
//! ```ignore
//! use std::rc::Rc;
//! use spark_observers::environment::HeadlessDocument;
//! use spark_observers::state::visibility::VisibilityTracker;
//!
//! let document = Rc::new(HeadlessDocument::new(false));
//! let tracker = VisibilityTracker::new(document.clone());
//!
//! let unsubscribe = tracker.on_visibility_change().subscribe_fn(|visible| {
//!     println!("visible: {visible}");
//! });
//!
//! document.hide();            // prints "visible: false"
//! assert_eq!(tracker.count(), 1);
//!
//! unsubscribe.unsubscribe();
//! ```

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use spark_signals::{signal, Signal};

use crate::environment::{HandlerRegistry, VisibilitySource};
use crate::types::{ChangeListener, Cleanup, VisibilityHandler};

type Listeners = RefCell<HandlerRegistry<dyn Fn(bool)>>;

// =============================================================================
// Unsubscribe
// =============================================================================

/// Handle that removes one listener registration.
///
/// Cloneable; only the first `unsubscribe()` across all clones has an
/// effect. A handle from an earlier registration never removes a later
/// re-registration of the same callback.
#[derive(Clone)]
pub struct Unsubscribe {
    state: Rc<UnsubscribeState>,
}

struct UnsubscribeState {
    listeners: Weak<Listeners>,
    id: Cell<Option<usize>>,
}

impl Unsubscribe {
    fn new(listeners: Weak<Listeners>, id: Option<usize>) -> Self {
        Self {
            state: Rc::new(UnsubscribeState {
                listeners,
                id: Cell::new(id),
            }),
        }
    }

    /// Remove the registration. Safe to call any number of times.
    pub fn unsubscribe(&self) {
        let Some(id) = self.state.id.take() else {
            return;
        };
        if let Some(listeners) = self.state.listeners.upgrade() {
            listeners.borrow_mut().remove_id(id);
        }
    }

    /// Check whether the registration is still live.
    pub fn is_active(&self) -> bool {
        match (self.state.id.get(), self.state.listeners.upgrade()) {
            (Some(id), Some(listeners)) => listeners.borrow().contains_id(id),
            _ => false,
        }
    }
}

impl From<Unsubscribe> for Cleanup {
    fn from(unsubscribe: Unsubscribe) -> Self {
        Box::new(move || unsubscribe.unsubscribe())
    }
}

// =============================================================================
// Subscriber
// =============================================================================

/// The tracker's subscribe function.
///
/// Created once per tracker; every call to
/// [`VisibilityTracker::on_visibility_change`] hands out the same handle,
/// so it can be used as a stable dependency.
#[derive(Clone)]
pub struct VisibilitySubscriber {
    inner: Rc<SubscriberInner>,
}

struct SubscriberInner {
    listeners: Weak<Listeners>,
}

impl VisibilitySubscriber {
    /// Register a handler for visibility changes.
    ///
    /// Registering an `Rc` that is already registered is a no-op; the
    /// returned handle then refers to the existing registration.
    pub fn subscribe(&self, handler: VisibilityHandler) -> Unsubscribe {
        match self.inner.listeners.upgrade() {
            Some(listeners) => {
                let id = listeners.borrow_mut().insert(handler);
                Unsubscribe::new(Rc::downgrade(&listeners), Some(id))
            }
            // Tracker already torn down
            None => Unsubscribe::new(Weak::new(), None),
        }
    }

    /// Register a closure. Each call is a distinct registration.
    pub fn subscribe_fn<F>(&self, handler: F) -> Unsubscribe
    where
        F: Fn(bool) + 'static,
    {
        self.subscribe(Rc::new(handler))
    }

    /// Check whether two handles are the same subscriber.
    pub fn same_as(&self, other: &VisibilitySubscriber) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

// =============================================================================
// Tracker
// =============================================================================

/// Tracks foreground state and background transitions of a visibility source.
pub struct VisibilityTracker {
    source: Rc<dyn VisibilitySource>,
    visible: Signal<bool>,
    count: Signal<u32>,
    listeners: Rc<Listeners>,
    subscriber: VisibilitySubscriber,
    /// The handler registered with the source; `None` after teardown.
    registration: Option<ChangeListener>,
}

impl VisibilityTracker {
    /// Create a tracker and register with the source.
    ///
    /// `visible` is seeded from the source; `count` starts at 0 even if the
    /// source is already hidden.
    pub fn new(source: Rc<dyn VisibilitySource>) -> Self {
        let initially_visible = !source.is_hidden();
        let visible = signal(initially_visible);
        let count = signal(0u32);
        let listeners: Rc<Listeners> = Rc::new(RefCell::new(HandlerRegistry::new()));

        let handler = transition_handler(
            Rc::downgrade(&source),
            initially_visible,
            visible.clone(),
            count.clone(),
            listeners.clone(),
        );
        source.add_change_listener(&handler);
        tracing::debug!(visible = initially_visible, "visibility tracker registered");

        let subscriber = VisibilitySubscriber {
            inner: Rc::new(SubscriberInner {
                listeners: Rc::downgrade(&listeners),
            }),
        };

        Self {
            source,
            visible,
            count,
            listeners,
            subscriber,
            registration: Some(handler),
        }
    }

    /// True while the page is in the foreground.
    pub fn visible(&self) -> bool {
        self.visible.get()
    }

    /// Number of foreground -> background transitions since creation.
    pub fn count(&self) -> u32 {
        self.count.get()
    }

    /// The `visible` signal, for deriveds and effects.
    pub fn visible_signal(&self) -> Signal<bool> {
        self.visible.clone()
    }

    /// The `count` signal, for deriveds and effects.
    pub fn count_signal(&self) -> Signal<u32> {
        self.count.clone()
    }

    /// The tracker's subscriber (same handle on every call).
    pub fn on_visibility_change(&self) -> VisibilitySubscriber {
        self.subscriber.clone()
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    /// Check whether the tracker is still registered with its source.
    pub fn is_active(&self) -> bool {
        self.registration.is_some()
    }

    /// Tear down: unregister from the source and drop all listeners.
    pub fn dispose(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        let Some(handler) = self.registration.take() else {
            return;
        };
        self.source.remove_change_listener(&handler);
        self.listeners.borrow_mut().clear();
        tracing::debug!("visibility tracker unregistered");
    }
}

impl Drop for VisibilityTracker {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Build the handler the source invokes on every visibility change.
fn transition_handler(
    source: Weak<dyn VisibilitySource>,
    initially_visible: bool,
    visible: Signal<bool>,
    count: Signal<u32>,
    listeners: Rc<Listeners>,
) -> ChangeListener {
    let last_visible = Cell::new(initially_visible);

    Rc::new(move || {
        let Some(source) = source.upgrade() else {
            return;
        };
        let is_visible = !source.is_hidden();
        let was_visible = last_visible.replace(is_visible);

        // State first, so listeners observe the new values.
        visible.set(is_visible);
        if was_visible && !is_visible {
            count.set(count.get() + 1);
        }

        let handlers = listeners.borrow().snapshot();
        tracing::trace!(visible = is_visible, listeners = handlers.len(), "visibility transition");
        for handler in handlers {
            handler(is_visible);
        }
    })
}

/// Create a visibility tracker for `source`.
pub fn use_document_visibility(source: Rc<dyn VisibilitySource>) -> VisibilityTracker {
    VisibilityTracker::new(source)
}

// =============================================================================
// Tests
// =============================================================================

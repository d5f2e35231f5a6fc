//! Media Query Tracker - reactive match state for one media condition
//!
//! Holds a `matches` signal for a query that may itself be reactive. An
//! effect reads the query; every time it changes, the subscription for the
//! old text is removed, `matches` is re-seeded from the new text, and a
//! fresh change listener is installed.
//!
//! With no media environment (server-side evaluation) or an empty query,
//! `matches` is `false` and nothing is subscribed.
//!
//! # Example
//!
//! ```ignore
//! use std::rc::Rc;
//! use spark_signals::signal;
//! use spark_observers::environment::Viewport;
//! use spark_observers::state::media_query::MediaMatchTracker;
//!
//! let viewport = Rc::new(Viewport::default()); // 1024x768
//! let query = signal(Some("(min-width: 768px)".to_string()));
//! let tracker = MediaMatchTracker::new(Some(viewport.clone()), query.clone());
//! assert!(tracker.matches());
//!
//! viewport.resize(500, 768);
//! assert!(!tracker.matches());
//!
//! query.set(Some("(max-width: 600px)".to_string()));
//! assert!(tracker.matches());
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use spark_signals::{effect, signal, Signal};

use crate::environment::{MediaEnvironment, MediaQueryList};
use crate::types::{MediaChangeListener, PropValue};

/// The listener installed for the current query, and the list it is on.
struct ActiveSubscription {
    list: Rc<dyn MediaQueryList>,
    listener: MediaChangeListener,
}

impl ActiveSubscription {
    fn cancel(self) {
        self.list.remove_change_listener(&self.listener);
        tracing::debug!(media = self.list.media(), "media query unsubscribed");
    }
}

/// Tracks whether a media condition currently matches.
pub struct MediaMatchTracker {
    matches: Signal<bool>,
    /// Present when the query was given as a static value.
    query_input: Option<Signal<Option<String>>>,
    current_query: Rc<RefCell<Option<String>>>,
    active: Rc<RefCell<Option<ActiveSubscription>>>,
    stop_effect: Option<Box<dyn FnOnce()>>,
}

impl MediaMatchTracker {
    /// Start tracking `query` in `environment`.
    ///
    /// `query` may be static, a signal, or a getter; signal and getter
    /// inputs are followed reactively. A static query can later be changed
    /// with [`set_query`](Self::set_query).
    pub fn new(
        environment: Option<Rc<dyn MediaEnvironment>>,
        query: impl Into<PropValue<Option<String>>>,
    ) -> Self {
        let query = query.into();
        let (query, query_input) = match query {
            PropValue::Static(value) => {
                let input = signal(value);
                (PropValue::Signal(input.clone()), Some(input))
            }
            other => (other, None),
        };

        let matches = signal(false);
        let current_query: Rc<RefCell<Option<String>>> = Rc::new(RefCell::new(None));
        let active: Rc<RefCell<Option<ActiveSubscription>>> = Rc::new(RefCell::new(None));

        let matches_for_effect = matches.clone();
        let current_for_effect = current_query.clone();
        let active_for_effect = active.clone();

        let stop = effect(move || {
            let next = normalize(query.get());

            // Old subscription goes first so a stale list can never write.
            if let Some(previous) = active_for_effect.borrow_mut().take() {
                previous.cancel();
            }
            *current_for_effect.borrow_mut() = next.clone();

            let (Some(env), Some(text)) = (environment.as_ref(), next) else {
                matches_for_effect.set(false);
                return;
            };

            let list = env.match_media(&text);
            matches_for_effect.set(list.matches());

            let matches = matches_for_effect.clone();
            let listener: MediaChangeListener = Rc::new(move |now| {
                matches.set(now);
            });
            list.add_change_listener(&listener);
            tracing::debug!(media = %text, matches = list.matches(), "media query subscribed");

            *active_for_effect.borrow_mut() = Some(ActiveSubscription { list, listener });
        });

        Self {
            matches,
            query_input,
            current_query,
            active,
            stop_effect: Some(Box::new(stop)),
        }
    }

    /// Current match flag (reactive read).
    pub fn matches(&self) -> bool {
        self.matches.get()
    }

    /// The `matches` signal, for deriveds and effects.
    pub fn matches_signal(&self) -> Signal<bool> {
        self.matches.clone()
    }

    /// The query currently being tracked (`None` when empty).
    pub fn query(&self) -> Option<String> {
        self.current_query.borrow().clone()
    }

    /// Check whether a change listener is installed.
    pub fn is_subscribed(&self) -> bool {
        self.active.borrow().is_some()
    }

    /// Replace a static query. Returns false (and changes nothing) when the
    /// query is driven by a signal or getter owned by the caller.
    pub fn set_query(&self, query: Option<String>) -> bool {
        match &self.query_input {
            Some(input) => {
                input.set(query);
                true
            }
            None => false,
        }
    }

    /// Stop tracking and remove the active subscription.
    pub fn dispose(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        if let Some(stop) = self.stop_effect.take() {
            stop();
        }
        if let Some(active) = self.active.borrow_mut().take() {
            active.cancel();
        }
    }
}

impl Drop for MediaMatchTracker {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Empty or whitespace-only text counts as no query.
fn normalize(query: Option<String>) -> Option<String> {
    query.filter(|q| !q.trim().is_empty())
}

/// Track `query` in `environment`.
pub fn use_media_query(
    environment: Option<Rc<dyn MediaEnvironment>>,
    query: impl Into<PropValue<Option<String>>>,
) -> MediaMatchTracker {
    MediaMatchTracker::new(environment, query)
}

// =============================================================================
// Tests
// =============================================================================

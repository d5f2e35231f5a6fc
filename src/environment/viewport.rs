//! Viewport - in-process media environment.
//!
//! Holds the display state (width, height, pixel ratio) and hands out
//! [`ViewportQueryList`]s that re-evaluate when that state changes. This is
//! the non-browser counterpart of `window.matchMedia`: terminal apps feed it
//! resize events, tests drive it directly.
//!
//! # Example
//!
//! ```ignore
//! use std::rc::Rc;
//! use spark_observers::environment::{MediaEnvironment, Viewport, ViewportConfig};
//!
//! let viewport = Rc::new(Viewport::new(ViewportConfig::default()));
//! let list = viewport.match_media("(min-width: 768px)");
//! assert!(list.matches());
//!
//! viewport.resize(500, 768);
//! assert!(!list.matches());
//! ```
//!
//! Only lists whose condition reads a changed dimension are re-evaluated,
//! and listeners fire only when a list's match flag actually flips.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use super::media_condition::{DisplayMetrics, MediaCondition, MediaFeatures};
use super::registry::HandlerRegistry;
use super::{MediaEnvironment, MediaQueryList};
use crate::types::MediaChangeListener;

// =============================================================================
// Config
// =============================================================================

/// Initial display state for a [`Viewport`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportConfig {
    pub width: u32,
    pub height: u32,
    /// Device pixel ratio (dppx).
    pub resolution: f32,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        let metrics = DisplayMetrics::default();
        Self {
            width: metrics.width,
            height: metrics.height,
            resolution: metrics.resolution,
        }
    }
}

impl ViewportConfig {
    /// Config with the given size at 1dppx.
    pub fn sized(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }
}

impl From<ViewportConfig> for DisplayMetrics {
    fn from(config: ViewportConfig) -> Self {
        DisplayMetrics {
            width: config.width,
            height: config.height,
            resolution: config.resolution,
        }
    }
}

// =============================================================================
// Query List
// =============================================================================

/// Live result of one condition against a [`Viewport`].
pub struct ViewportQueryList {
    media: String,
    /// `None` when the text failed to parse; such a list never matches.
    condition: Option<MediaCondition>,
    matches: Cell<bool>,
    listeners: RefCell<HandlerRegistry<dyn Fn(bool)>>,
}

impl ViewportQueryList {
    fn new(media: &str, metrics: &DisplayMetrics) -> Self {
        let condition = match MediaCondition::parse(media) {
            Ok(condition) => Some(condition),
            Err(error) => {
                tracing::debug!(media, %error, "media condition never matches");
                None
            }
        };
        let matches = condition.as_ref().is_some_and(|c| c.matches(metrics));
        Self {
            media: media.to_string(),
            condition,
            matches: Cell::new(matches),
            listeners: RefCell::new(HandlerRegistry::new()),
        }
    }

    fn features(&self) -> MediaFeatures {
        self.condition
            .as_ref()
            .map(MediaCondition::features)
            .unwrap_or_default()
    }

    /// Re-evaluate; notify listeners if the flag flipped.
    fn update(&self, metrics: &DisplayMetrics) {
        let Some(condition) = &self.condition else {
            return;
        };
        let now = condition.matches(metrics);
        if self.matches.replace(now) == now {
            return;
        }

        let listeners = self.listeners.borrow().snapshot();
        tracing::trace!(media = %self.media, matches = now, listeners = listeners.len(), "media change");
        for listener in listeners {
            listener(now);
        }
    }

    /// Number of listeners currently registered.
    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }
}

impl MediaQueryList for ViewportQueryList {
    fn media(&self) -> &str {
        &self.media
    }

    fn matches(&self) -> bool {
        self.matches.get()
    }

    fn add_change_listener(&self, listener: &MediaChangeListener) {
        self.listeners.borrow_mut().insert(listener.clone());
    }

    fn remove_change_listener(&self, listener: &MediaChangeListener) {
        self.listeners.borrow_mut().remove(listener);
    }
}

// =============================================================================
// Viewport
// =============================================================================

/// Display state plus the query lists evaluated against it.
pub struct Viewport {
    metrics: Cell<DisplayMetrics>,
    lists: RefCell<Vec<Weak<ViewportQueryList>>>,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(ViewportConfig::default())
    }
}

impl Viewport {
    pub fn new(config: ViewportConfig) -> Self {
        Self {
            metrics: Cell::new(config.into()),
            lists: RefCell::new(Vec::new()),
        }
    }

    pub fn width(&self) -> u32 {
        self.metrics.get().width
    }

    pub fn height(&self) -> u32 {
        self.metrics.get().height
    }

    pub fn resolution(&self) -> f32 {
        self.metrics.get().resolution
    }

    pub fn metrics(&self) -> DisplayMetrics {
        self.metrics.get()
    }

    /// Change the viewport size.
    pub fn resize(&self, width: u32, height: u32) {
        self.set_metrics(DisplayMetrics {
            width,
            height,
            ..self.metrics.get()
        });
    }

    /// Change the device pixel ratio.
    pub fn set_resolution(&self, resolution: f32) {
        self.set_metrics(DisplayMetrics {
            resolution,
            ..self.metrics.get()
        });
    }

    /// Replace the whole display state and notify affected lists.
    pub fn set_metrics(&self, metrics: DisplayMetrics) {
        let changed = self.metrics.get().diff(&metrics);
        self.metrics.set(metrics);
        if changed.is_empty() {
            return;
        }

        tracing::debug!(
            width = metrics.width,
            height = metrics.height,
            resolution = metrics.resolution,
            ?changed,
            "viewport changed"
        );

        // Snapshot live lists and drop the ones nobody holds any more.
        let lists: Vec<Rc<ViewportQueryList>> = {
            let mut lists = self.lists.borrow_mut();
            lists.retain(|weak| weak.strong_count() > 0);
            lists.iter().filter_map(Weak::upgrade).collect()
        };

        for list in lists {
            if list.features().intersects(changed) {
                list.update(&metrics);
            }
        }
    }

    /// Number of query lists still alive.
    pub fn live_lists(&self) -> usize {
        self.lists
            .borrow()
            .iter()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }

    /// Typed variant of [`MediaEnvironment::match_media`].
    pub fn query_list(&self, query: &str) -> Rc<ViewportQueryList> {
        let list = Rc::new(ViewportQueryList::new(query, &self.metrics.get()));
        self.lists.borrow_mut().push(Rc::downgrade(&list));
        list
    }
}

impl MediaEnvironment for Viewport {
    fn match_media(&self, query: &str) -> Rc<dyn MediaQueryList> {
        self.query_list(query)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn recording_listener() -> (Rc<RefCell<Vec<bool>>>, MediaChangeListener) {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let calls_clone = calls.clone();
        let listener: MediaChangeListener = Rc::new(move |m| calls_clone.borrow_mut().push(m));
        (calls, listener)
    }

    #[test]
    fn test_default_config() {
        let viewport = Viewport::default();
        assert_eq!(viewport.width(), 1024);
        assert_eq!(viewport.height(), 768);
        assert_eq!(viewport.resolution(), 1.0);
    }

    #[test]
    fn test_initial_match() {
        let viewport = Viewport::default();
        assert!(viewport.match_media("(min-width: 768px)").matches());
        assert!(!viewport.match_media("(min-width: 2000px)").matches());
        assert!(!viewport.match_media("garbage(").matches());
    }

    #[test]
    fn test_resize_notifies_on_flip() {
        let viewport = Viewport::default();
        let list = viewport.match_media("(min-width: 768px)");
        let (calls, listener) = recording_listener();
        list.add_change_listener(&listener);

        viewport.resize(500, 768);
        viewport.resize(400, 768); // still false, no event
        viewport.resize(1024, 768);

        assert_eq!(*calls.borrow(), vec![false, true]);
        assert!(list.matches());
    }

    #[test]
    fn test_unrelated_dimension_skipped() {
        let viewport = Viewport::default();
        let list = viewport.query_list("(min-width: 768px)");
        let (calls, listener) = recording_listener();
        list.add_change_listener(&listener);

        viewport.resize(1024, 100);
        viewport.set_resolution(3.0);

        assert!(calls.borrow().is_empty());
    }

    #[test]
    fn test_resolution_change() {
        let viewport = Viewport::default();
        let list = viewport.match_media("(min-resolution: 2dppx)");
        let (calls, listener) = recording_listener();
        list.add_change_listener(&listener);

        viewport.set_resolution(2.0);
        assert_eq!(*calls.borrow(), vec![true]);
    }

    #[test]
    fn test_removed_listener_silent() {
        let viewport = Viewport::default();
        let list = viewport.match_media("(min-width: 768px)");
        let (calls, listener) = recording_listener();
        list.add_change_listener(&listener);
        list.remove_change_listener(&listener);

        viewport.resize(500, 768);
        assert!(calls.borrow().is_empty());
        assert!(!list.matches());
    }

    #[test]
    fn test_dropped_lists_pruned() {
        let viewport = Viewport::default();
        {
            let _list = viewport.match_media("(min-width: 768px)");
            assert_eq!(viewport.live_lists(), 1);
        }
        assert_eq!(viewport.live_lists(), 0);
        viewport.resize(10, 10);
        assert_eq!(viewport.live_lists(), 0);
    }
}

//! Environment - The external signals the observers bind to.
//!
//! Trackers never read global state directly. They go through two small
//! interfaces:
//!
//! - [`VisibilitySource`] - "is the page hidden" flag plus a change event
//! - [`MediaEnvironment`] - evaluates a media condition and hands back a
//!   [`MediaQueryList`] with its own change event
//!
//! Implementations:
//!
//! - [`HeadlessDocument`] / [`Viewport`] - in-process, driven by the caller
//! - [`terminal`] - crossterm focus and resize events
//! - `web` (feature `web`, wasm32) - `document.hidden` and `window.matchMedia`
//!
//! A missing display environment (server-side evaluation, no window) is
//! modelled as `Option<Rc<dyn MediaEnvironment>>::None`.

mod document;
pub mod media_condition;
mod registry;
pub mod terminal;
mod viewport;
#[cfg(all(feature = "web", target_arch = "wasm32"))]
pub mod web;

use std::rc::Rc;

use crate::types::{ChangeListener, MediaChangeListener};

pub use document::HeadlessDocument;
pub use media_condition::{DisplayMetrics, MediaCondition, MediaFeatures, ParseError};
pub use registry::{same_handler, HandlerRegistry};
pub use viewport::{Viewport, ViewportConfig, ViewportQueryList};

// =============================================================================
// Visibility
// =============================================================================

/// Source of the page-visibility flag.
pub trait VisibilitySource {
    /// True when the page is not in the foreground.
    fn is_hidden(&self) -> bool;

    /// Register a listener for visibility changes.
    fn add_change_listener(&self, listener: &ChangeListener);

    /// Remove a listener previously added with the same `Rc`.
    fn remove_change_listener(&self, listener: &ChangeListener);
}

// =============================================================================
// Media
// =============================================================================

/// Evaluates media conditions against the current display.
pub trait MediaEnvironment {
    /// Evaluate `query` and return a list that reports future changes.
    fn match_media(&self, query: &str) -> Rc<dyn MediaQueryList>;
}

/// Live result of one media condition.
pub trait MediaQueryList {
    /// The condition text this list evaluates.
    fn media(&self) -> &str;

    /// Current match flag.
    fn matches(&self) -> bool;

    /// Register a listener that receives the new match flag on change.
    fn add_change_listener(&self, listener: &MediaChangeListener);

    /// Remove a listener previously added with the same `Rc`.
    fn remove_change_listener(&self, listener: &MediaChangeListener);
}

//! # spark-observers
//!
//! Reactive environment observers for Rust.
//!
//! Built on [spark-signals](https://github.com/RLabs-Inc/spark-signals) for fine-grained reactivity.
//!
//! ## Architecture
//!
//! Observers read an environment through small traits and expose the result
//! as signals:
//!
//! ```text
//! VisibilitySource ─► VisibilityTracker  (visible, count, listeners)
//! MediaEnvironment ─► MediaMatchTracker  (matches) ─► media_query (content)
//! ```
//!
//! Environments:
//! - [`environment::HeadlessDocument`] / [`environment::Viewport`] - in-process, test friendly
//! - [`environment::terminal`] - crossterm focus and resize events
//! - `environment::web` - browser document and `matchMedia` (feature `web`, wasm32 only)
//!
//! ## Modules
//!
//! - [`types`] - Shared types (PropValue, Orientation, Resolution, listener aliases)
//! - [`environment`] - Environment traits and implementations
//! - [`state`] - Visibility and media query trackers
//! - [`primitives`] - Conditional media query output

pub mod environment;
pub mod primitives;
pub mod state;
pub mod types;

// Re-export commonly used items
pub use types::*;

pub use environment::{
    HeadlessDocument, MediaCondition, MediaEnvironment, MediaQueryList, Viewport, ViewportConfig,
    VisibilitySource,
};

pub use state::{
    use_document_visibility, use_media_query, MediaMatchTracker, Unsubscribe, VisibilitySubscriber,
    VisibilityTracker,
};

pub use primitives::{
    build_query, media_query, media_query_effect, MediaContent, MediaQueryError, MediaQueryProps,
    MediaQueryView,
};

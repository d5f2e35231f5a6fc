//! State Module - Reactive observers
//!
//! - **Visibility** - visible flag, leave count, visibility listeners
//! - **Media query** - `matches` flag for a (possibly reactive) query

pub mod media_query;
pub mod visibility;

pub use media_query::{use_media_query, MediaMatchTracker};
pub use visibility::{use_document_visibility, Unsubscribe, VisibilitySubscriber, VisibilityTracker};

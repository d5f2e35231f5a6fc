//! Primitives - Conditional output driven by observers.
//!
//! - [`media_query`] - output content depending on one viewport condition
//!
//! # Reactivity
//!
//! Props can be:
//! - Static values: `MediaQueryProps::MinWidth(768.0)`
//! - Signals: `props_signal` (stays connected!)
//! - Getters: `PropValue::getter(|| Some(compute_props()))`
//!
//! Pass the signal itself, not its current value:
//!
//! ```ignore
//! // CORRECT - signal stays connected
//! media_query(env, props_signal.clone(), content);
//!
//! // WRONG - extracts value, breaks reactivity
//! media_query(env, PropValue::Static(props_signal.get()), content);
//! ```

pub mod media_query;

pub use media_query::{
    build_query, media_query, media_query_effect, MediaContent, MediaQueryError, MediaQueryProps,
    MediaQueryView, QUERY_FIELDS,
};

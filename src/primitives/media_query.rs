//! MediaQuery primitive - conditional output from one viewport condition.
//!
//! Takes exactly one media feature ([`MediaQueryProps`]), turns it into a
//! query string, tracks it with a [`MediaMatchTracker`], and decides what to
//! output:
//!
//! - [`MediaContent::Static`] - produced only while the query matches
//! - [`MediaContent::Render`] - always called with the current match flag
//!
//! # Query templates
//!
//! | prop | query |
//! |---|---|
//! | `Orientation(o)` | `(orientation: o)` |
//! | `MinResolution(r)` / `MaxResolution(r)` | `(min-resolution: r)` / `(max-resolution: r)` |
//! | `MinWidth(n)` / `MaxWidth(n)` | `(min-width: npx)` / `(max-width: npx)` |
//! | `MinHeight(n)` / `MaxHeight(n)` | `(min-height: npx)` / `(max-height: npx)` |
//!
//! # Example
//!
//! ```ignore
//! use std::rc::Rc;
//! use spark_observers::environment::Viewport;
//! use spark_observers::primitives::{media_query, MediaContent, MediaQueryProps};
//!
//! let viewport = Rc::new(Viewport::default());
//! let view = media_query(
//!     Some(viewport.clone()),
//!     MediaQueryProps::MinWidth(768.0),
//!     MediaContent::render(|desktop| if desktop { "Desktop" } else { "Mobile" }),
//! );
//! assert_eq!(view.output(), Some("Desktop"));
//!
//! viewport.resize(500, 768);
//! assert_eq!(view.output(), Some("Mobile"));
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use spark_signals::{derived, effect};
use thiserror::Error;

use crate::environment::MediaEnvironment;
use crate::state::media_query::MediaMatchTracker;
use crate::types::{Cleanup, Orientation, PropValue, Resolution};

/// Field names accepted by [`build_query`] and [`MediaQueryProps::from_fields`].
pub const QUERY_FIELDS: [&str; 7] = [
    "orientation",
    "minResolution",
    "maxResolution",
    "minWidth",
    "maxWidth",
    "minHeight",
    "maxHeight",
];

// =============================================================================
// Errors
// =============================================================================

/// Why a set of fields does not describe exactly one media feature.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MediaQueryError {
    #[error("no media feature given")]
    NoField,
    #[error("expected exactly one media feature, got {}", .0.join(", "))]
    MultipleFields(Vec<String>),
    #[error("unknown media feature `{0}`")]
    UnknownField(String),
    #[error("invalid value `{value}` for `{field}`")]
    InvalidValue { field: String, value: String },
}

// =============================================================================
// Props
// =============================================================================

/// Exactly one media feature to test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MediaQueryProps {
    Orientation(Orientation),
    MinResolution(Resolution),
    MaxResolution(Resolution),
    /// Width in px. Fractional values are allowed (`767.98`).
    MinWidth(f32),
    MaxWidth(f32),
    /// Height in px.
    MinHeight(f32),
    MaxHeight(f32),
}

impl MediaQueryProps {
    /// The field name this prop corresponds to.
    pub fn field(&self) -> &'static str {
        match self {
            MediaQueryProps::Orientation(_) => "orientation",
            MediaQueryProps::MinResolution(_) => "minResolution",
            MediaQueryProps::MaxResolution(_) => "maxResolution",
            MediaQueryProps::MinWidth(_) => "minWidth",
            MediaQueryProps::MaxWidth(_) => "maxWidth",
            MediaQueryProps::MinHeight(_) => "minHeight",
            MediaQueryProps::MaxHeight(_) => "maxHeight",
        }
    }

    /// Render the media query text.
    pub fn to_query(&self) -> String {
        let value = match self {
            MediaQueryProps::Orientation(o) => o.to_string(),
            MediaQueryProps::MinResolution(r) | MediaQueryProps::MaxResolution(r) => r.to_string(),
            MediaQueryProps::MinWidth(n)
            | MediaQueryProps::MaxWidth(n)
            | MediaQueryProps::MinHeight(n)
            | MediaQueryProps::MaxHeight(n) => n.to_string(),
        };
        // Every field has a template, so this cannot miss.
        render_template(self.field(), &value).unwrap_or_default()
    }

    /// Build props from loosely-typed `(field, value)` pairs, rejecting
    /// anything other than exactly one known, populated field.
    pub fn from_fields(fields: &[(&str, Option<&str>)]) -> Result<Self, MediaQueryError> {
        let mut populated = Vec::new();
        for (field, value) in fields {
            if !QUERY_FIELDS.contains(field) {
                return Err(MediaQueryError::UnknownField(field.to_string()));
            }
            if let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) {
                populated.push((*field, value));
            }
        }

        let (field, value) = match populated.as_slice() {
            [] => return Err(MediaQueryError::NoField),
            [single] => *single,
            many => {
                return Err(MediaQueryError::MultipleFields(
                    many.iter().map(|(f, _)| f.to_string()).collect(),
                ));
            }
        };

        let invalid = || MediaQueryError::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
        };
        let px = || {
            value
                .parse::<f32>()
                .ok()
                .filter(|n| n.is_finite() && *n >= 0.0)
                .ok_or_else(invalid)
        };

        match field {
            "orientation" => match value {
                "landscape" => Ok(MediaQueryProps::Orientation(Orientation::Landscape)),
                "portrait" => Ok(MediaQueryProps::Orientation(Orientation::Portrait)),
                _ => Err(invalid()),
            },
            "minResolution" => parse_resolution(value).map(MediaQueryProps::MinResolution).ok_or_else(invalid),
            "maxResolution" => parse_resolution(value).map(MediaQueryProps::MaxResolution).ok_or_else(invalid),
            "minWidth" => px().map(MediaQueryProps::MinWidth),
            "maxWidth" => px().map(MediaQueryProps::MaxWidth),
            "minHeight" => px().map(MediaQueryProps::MinHeight),
            "maxHeight" => px().map(MediaQueryProps::MaxHeight),
            _ => Err(MediaQueryError::UnknownField(field.to_string())),
        }
    }
}

impl From<MediaQueryProps> for PropValue<Option<MediaQueryProps>> {
    fn from(props: MediaQueryProps) -> Self {
        PropValue::Static(Some(props))
    }
}

fn parse_resolution(value: &str) -> Option<Resolution> {
    match value.strip_suffix("dppx") {
        Some(number) => number.trim().parse().ok().map(Resolution::Dppx),
        None => value.parse().ok().map(Resolution::Number),
    }
}

fn render_template(field: &str, value: &str) -> Option<String> {
    let query = match field {
        "orientation" => format!("(orientation: {value})"),
        "minResolution" => format!("(min-resolution: {value})"),
        "maxResolution" => format!("(max-resolution: {value})"),
        "minWidth" => format!("(min-width: {value}px)"),
        "maxWidth" => format!("(max-width: {value}px)"),
        "minHeight" => format!("(min-height: {value}px)"),
        "maxHeight" => format!("(max-height: {value}px)"),
        _ => return None,
    };
    Some(query)
}

/// Build a query from loosely-typed `(field, value)` pairs.
///
/// Only the first pair is considered. An unknown field, a missing value or
/// an empty value produces no query, which never matches.
pub fn build_query(fields: &[(&str, Option<&str>)]) -> Option<String> {
    let (field, value) = fields.first()?;
    let value = value.map(str::trim).filter(|v| !v.is_empty())?;
    render_template(field, value)
}

// =============================================================================
// Content
// =============================================================================

/// What a media query outputs.
#[derive(Clone)]
pub enum MediaContent<R> {
    /// Output only while the query matches.
    Static(R),
    /// Always called with the current match flag.
    Render(Rc<dyn Fn(bool) -> R>),
}

impl<R: Clone> MediaContent<R> {
    pub fn render(f: impl Fn(bool) -> R + 'static) -> Self {
        MediaContent::Render(Rc::new(f))
    }

    /// Produce output for a match flag.
    pub fn resolve(&self, matches: bool) -> Option<R> {
        match self {
            MediaContent::Static(value) => matches.then(|| value.clone()),
            MediaContent::Render(f) => Some(f(matches)),
        }
    }
}

// =============================================================================
// View
// =============================================================================

/// A live media query with its content.
pub struct MediaQueryView<R> {
    tracker: MediaMatchTracker,
    content: MediaContent<R>,
}

impl<R: Clone> MediaQueryView<R> {
    /// Current output (reactive read of the match flag).
    pub fn output(&self) -> Option<R> {
        self.content.resolve(self.tracker.matches())
    }

    pub fn matches(&self) -> bool {
        self.tracker.matches()
    }

    /// The query built from the current props.
    pub fn query(&self) -> Option<String> {
        self.tracker.query()
    }

    /// Stop tracking.
    pub fn dispose(self) {
        self.tracker.dispose();
    }
}

/// Create a media query view.
///
/// `props` may be static, a signal, or a getter; the query is rebuilt
/// whenever they change. `None` props never match.
pub fn media_query<R: Clone>(
    environment: Option<Rc<dyn MediaEnvironment>>,
    props: impl Into<PropValue<Option<MediaQueryProps>>>,
    content: MediaContent<R>,
) -> MediaQueryView<R> {
    let props = props.into();
    let query = derived(move || props.get().map(|p| p.to_query()));
    let tracker = MediaMatchTracker::new(environment, PropValue::getter(move || query.get()));

    MediaQueryView { tracker, content }
}

/// Create a media query view and push every output change to `sink`.
///
/// `sink` runs once immediately and again whenever the output may have
/// changed. Returns a cleanup that stops the effect and the tracker.
pub fn media_query_effect<R, S>(
    environment: Option<Rc<dyn MediaEnvironment>>,
    props: impl Into<PropValue<Option<MediaQueryProps>>>,
    content: MediaContent<R>,
    sink: S,
) -> Cleanup
where
    R: Clone + 'static,
    S: Fn(Option<R>) + 'static,
{
    let view = Rc::new(RefCell::new(Some(media_query(environment, props, content))));

    let view_for_effect = view.clone();
    let stop = effect(move || {
        let output = view_for_effect.borrow().as_ref().and_then(MediaQueryView::output);
        sink(output);
    });

    Box::new(move || {
        stop();
        if let Some(view) = view.borrow_mut().take() {
            view.dispose();
        }
    })
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::{Viewport, ViewportConfig};
    use spark_signals::signal;

    fn viewport(width: u32, height: u32) -> Rc<Viewport> {
        Rc::new(Viewport::new(ViewportConfig::sized(width, height)))
    }

    #[test]
    fn test_templates() {
        assert_eq!(MediaQueryProps::MinWidth(768.0).to_query(), "(min-width: 768px)");
        assert_eq!(MediaQueryProps::MaxWidth(768.0).to_query(), "(max-width: 768px)");
        assert_eq!(MediaQueryProps::MinHeight(500.0).to_query(), "(min-height: 500px)");
        assert_eq!(MediaQueryProps::MaxHeight(600.0).to_query(), "(max-height: 600px)");
        assert_eq!(
            MediaQueryProps::Orientation(Orientation::Landscape).to_query(),
            "(orientation: landscape)"
        );
        assert_eq!(
            MediaQueryProps::MinResolution(Resolution::Dppx(1.0)).to_query(),
            "(min-resolution: 1dppx)"
        );
        assert_eq!(
            MediaQueryProps::MaxResolution(Resolution::Number(2.0)).to_query(),
            "(max-resolution: 2)"
        );
    }

    #[test]
    fn test_build_query() {
        assert_eq!(build_query(&[("minWidth", Some("768"))]).as_deref(), Some("(min-width: 768px)"));
        assert_eq!(build_query(&[("minResolution", Some("2dppx"))]).as_deref(), Some("(min-resolution: 2dppx)"));
        assert_eq!(build_query(&[]), None);
        assert_eq!(build_query(&[("minWidth", None)]), None);
        assert_eq!(build_query(&[("minWidth", Some(""))]), None);
        assert_eq!(build_query(&[("unknownProp", Some("123"))]), None);
    }

    #[test]
    fn test_from_fields() {
        assert_eq!(
            MediaQueryProps::from_fields(&[("minWidth", Some("768"))]),
            Ok(MediaQueryProps::MinWidth(768.0))
        );
        assert_eq!(
            MediaQueryProps::from_fields(&[("maxResolution", Some("10dppx"))]),
            Ok(MediaQueryProps::MaxResolution(Resolution::Dppx(10.0)))
        );
        assert_eq!(
            MediaQueryProps::from_fields(&[("orientation", Some("portrait")), ("minWidth", None)]),
            Ok(MediaQueryProps::Orientation(Orientation::Portrait))
        );
        assert_eq!(MediaQueryProps::from_fields(&[]), Err(MediaQueryError::NoField));
        assert_eq!(
            MediaQueryProps::from_fields(&[("minWidth", None)]),
            Err(MediaQueryError::NoField)
        );
        assert_eq!(
            MediaQueryProps::from_fields(&[("minWidth", Some("1")), ("maxWidth", Some("2"))]),
            Err(MediaQueryError::MultipleFields(vec!["minWidth".into(), "maxWidth".into()]))
        );
        assert_eq!(
            MediaQueryProps::from_fields(&[("unknownProp", Some("123"))]),
            Err(MediaQueryError::UnknownField("unknownProp".into()))
        );
        assert!(matches!(
            MediaQueryProps::from_fields(&[("minWidth", Some("wide"))]),
            Err(MediaQueryError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_fractional_px() {
        let props = MediaQueryProps::from_fields(&[("maxWidth", Some("767.98"))]);
        assert_eq!(props, Ok(MediaQueryProps::MaxWidth(767.98)));
        assert_eq!(MediaQueryProps::MaxWidth(767.98).to_query(), "(max-width: 767.98px)");
        assert_eq!(
            build_query(&[("maxWidth", Some("767.98"))]),
            Some(MediaQueryProps::MaxWidth(767.98).to_query())
        );
        assert!(matches!(
            MediaQueryProps::from_fields(&[("minHeight", Some("-1"))]),
            Err(MediaQueryError::InvalidValue { .. })
        ));

        let env = viewport(767, 1024);
        let view = media_query(Some(env.clone()), MediaQueryProps::MaxWidth(767.98), MediaContent::Static("mobile"));
        assert_eq!(view.output(), Some("mobile"));

        env.resize(768, 1024);
        assert_eq!(view.output(), None);
    }

    #[test]
    fn test_static_content_when_matching() {
        let view = media_query(Some(viewport(1024, 768)), MediaQueryProps::MinWidth(768.0), MediaContent::Static("content"));
        assert_eq!(view.query().as_deref(), Some("(min-width: 768px)"));
        assert_eq!(view.output(), Some("content"));
    }

    #[test]
    fn test_static_content_hidden_when_not_matching() {
        let view = media_query(Some(viewport(1024, 768)), MediaQueryProps::MinWidth(2000.0), MediaContent::Static("content"));
        assert_eq!(view.output(), None);
    }

    #[test]
    fn test_no_props_renders_nothing() {
        let view = media_query(Some(viewport(1024, 768)), PropValue::Static(None), MediaContent::Static("content"));
        assert_eq!(view.output(), None);
        assert_eq!(view.query(), None);

        let view = media_query(
            Some(viewport(1024, 768)),
            PropValue::Static(None),
            MediaContent::render(|m| if m { "yes" } else { "no" }),
        );
        assert_eq!(view.output(), Some("no"));
    }

    #[test]
    fn test_render_content_follows_viewport() {
        let env = viewport(1024, 768);
        let view = media_query(
            Some(env.clone()),
            MediaQueryProps::MinWidth(768.0),
            MediaContent::render(|m| if m { "Desktop" } else { "Mobile" }),
        );
        assert_eq!(view.output(), Some("Desktop"));

        env.resize(500, 768);
        assert_eq!(view.output(), Some("Mobile"));
    }

    #[test]
    fn test_orientation_and_resolution() {
        let portrait = media_query(
            Some(viewport(768, 1024)),
            MediaQueryProps::Orientation(Orientation::Portrait),
            MediaContent::Static(1),
        );
        assert_eq!(portrait.output(), Some(1));

        let hi_dpi = media_query(
            Some(viewport(1024, 768)),
            MediaQueryProps::MinResolution(Resolution::Dppx(1.0)),
            MediaContent::Static(2),
        );
        assert_eq!(hi_dpi.output(), Some(2));

        let capped = media_query(
            Some(viewport(1024, 768)),
            MediaQueryProps::MaxResolution(Resolution::Dppx(10.0)),
            MediaContent::Static(3),
        );
        assert_eq!(capped.output(), Some(3));
    }

    #[test]
    fn test_reactive_props() {
        let props = signal(Some(MediaQueryProps::MinWidth(768.0)));
        let view = media_query(Some(viewport(1024, 768)), props.clone(), MediaContent::Static(()));
        assert!(view.matches());

        props.set(Some(MediaQueryProps::MinWidth(2000.0)));
        assert!(!view.matches());
        assert_eq!(view.query().as_deref(), Some("(min-width: 2000px)"));

        props.set(None);
        assert!(!view.matches());
        assert_eq!(view.query(), None);
    }

    #[test]
    fn test_no_environment() {
        let view = media_query(None, MediaQueryProps::MinWidth(1.0), MediaContent::Static("x"));
        assert_eq!(view.output(), None);
    }

    #[test]
    fn test_effect_pushes_outputs() {
        let env = viewport(1024, 768);
        let outputs = Rc::new(RefCell::new(Vec::new()));
        let outputs_clone = outputs.clone();

        let cleanup = media_query_effect(
            Some(env.clone()),
            MediaQueryProps::MinWidth(768.0),
            MediaContent::Static("wide"),
            move |out| outputs_clone.borrow_mut().push(out),
        );
        env.resize(500, 768);
        env.resize(1024, 768);

        cleanup();
        env.resize(500, 768);

        assert_eq!(*outputs.borrow(), vec![Some("wide"), None, Some("wide")]);
    }
}

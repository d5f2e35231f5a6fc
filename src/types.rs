//! Core types for spark-observers.
//!
//! Shared vocabulary for the trackers and their environments:
//! - [`Cleanup`] - teardown closure returned by effect-style APIs
//! - [`PropValue`] - static value, signal, or getter (reactive inputs)
//! - Listener aliases used by the environment traits and trackers
//! - [`Orientation`] and [`Resolution`] for media-query props

use std::fmt;
use std::rc::Rc;

use spark_signals::Signal;

// =============================================================================
// Cleanup Function
// =============================================================================

/// Cleanup function returned by effect-style APIs.
///
/// Call this to tear down the subscription and release resources.
pub type Cleanup = Box<dyn FnOnce()>;

// =============================================================================
// Callback Types
// =============================================================================

/// Raw change listener registered with a [`VisibilitySource`](crate::environment::VisibilitySource).
///
/// The source only announces that the flag changed; listeners re-read it.
pub type ChangeListener = Rc<dyn Fn()>;

/// Change listener registered with a [`MediaQueryList`](crate::environment::MediaQueryList).
///
/// Receives the new match flag.
pub type MediaChangeListener = Rc<dyn Fn(bool)>;

/// Consumer callback for visibility transitions. Receives the new visible flag.
///
/// Identity is the `Rc` allocation: registering the same `Rc` twice is one
/// registration.
pub type VisibilityHandler = Rc<dyn Fn(bool)>;

// =============================================================================
// Prop Value - Reactive input wrapper
// =============================================================================

/// An input value that can be static, a signal, or a getter.
///
/// Reading a `Signal` or `Getter` inside an effect creates a reactive
/// dependency, so trackers re-run when the input changes.
#[derive(Clone)]
pub enum PropValue<T: Clone + PartialEq + 'static> {
    /// Static value (not reactive).
    Static(T),
    /// Reactive signal (changes propagate automatically).
    Signal(Signal<T>),
    /// Getter function (called each time value is needed).
    Getter(Rc<dyn Fn() -> T>),
}

impl<T: Clone + PartialEq + 'static> PropValue<T> {
    /// Get the current value (for immediate reads).
    pub fn get(&self) -> T {
        match self {
            PropValue::Static(v) => v.clone(),
            PropValue::Signal(s) => s.get(),
            PropValue::Getter(f) => f(),
        }
    }

    /// Create a getter-backed prop.
    pub fn getter(f: impl Fn() -> T + 'static) -> Self {
        PropValue::Getter(Rc::new(f))
    }
}

impl<T: Clone + PartialEq + Default + 'static> Default for PropValue<T> {
    fn default() -> Self {
        PropValue::Static(T::default())
    }
}

impl<T: Clone + PartialEq + 'static> From<T> for PropValue<T> {
    fn from(value: T) -> Self {
        PropValue::Static(value)
    }
}

impl<T: Clone + PartialEq + 'static> From<Signal<T>> for PropValue<T> {
    fn from(signal: Signal<T>) -> Self {
        PropValue::Signal(signal)
    }
}

impl From<&str> for PropValue<Option<String>> {
    fn from(value: &str) -> Self {
        PropValue::Static(Some(value.to_string()))
    }
}

impl From<String> for PropValue<Option<String>> {
    fn from(value: String) -> Self {
        PropValue::Static(Some(value))
    }
}

// =============================================================================
// Orientation
// =============================================================================

/// Viewport orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Orientation {
    Landscape,
    Portrait,
}

impl Orientation {
    /// Keyword used in media conditions.
    pub fn as_str(self) -> &'static str {
        match self {
            Orientation::Landscape => "landscape",
            Orientation::Portrait => "portrait",
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Resolution
// =============================================================================

/// Pixel density for resolution props.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolution {
    /// Dimensionless number, inserted as-is (`2` -> `2`).
    Number(f32),
    /// Dots per CSS pixel, inserted with its suffix (`2` -> `2dppx`).
    Dppx(f32),
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolution::Number(n) => write!(f, "{n}"),
            Resolution::Dppx(n) => write!(f, "{n}dppx"),
        }
    }
}

impl From<f32> for Resolution {
    fn from(value: f32) -> Self {
        Resolution::Number(value)
    }
}

impl From<u32> for Resolution {
    fn from(value: u32) -> Self {
        Resolution::Number(value as f32)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use spark_signals::signal;

    #[test]
    fn test_prop_value_static() {
        let prop: PropValue<Option<String>> = "(min-width: 10px)".into();
        assert_eq!(prop.get().as_deref(), Some("(min-width: 10px)"));
    }

    #[test]
    fn test_prop_value_signal_reads_latest() {
        let query = signal(Some("a".to_string()));
        let prop: PropValue<Option<String>> = query.clone().into();
        assert_eq!(prop.get().as_deref(), Some("a"));

        query.set(Some("b".to_string()));
        assert_eq!(prop.get().as_deref(), Some("b"));
    }

    #[test]
    fn test_resolution_display() {
        assert_eq!(Resolution::Number(2.0).to_string(), "2");
        assert_eq!(Resolution::Dppx(1.5).to_string(), "1.5dppx");
        assert_eq!(Orientation::Portrait.to_string(), "portrait");
    }
}

//! Media Condition - parse and evaluate media-query text.
//!
//! The in-process [`Viewport`](super::Viewport) needs to answer the same
//! question a browser's `matchMedia` does. This module covers the subset of
//! Media Queries Level 4 that viewport observers use:
//!
//! - comma-separated alternatives (any one matching is a match)
//! - optional `not` / `only` prefix and media type (`all`, `screen`, `print`)
//! - `(feature: value)` clauses joined with `and`
//! - `width`, `height`, `resolution`, `aspect-ratio` with `min-`/`max-`
//!   prefixes, plus `orientation`
//!
//! Lengths take `px`, `em`/`rem` (16px) or a bare `0`. Resolutions take
//! `dppx`, `x`, `dpi`, `dpcm`, or a bare number read as dppx.
//!
//! Text that fails to parse never matches, the same way a browser treats an
//! invalid query as `not all`.

use std::fmt;

use bitflags::bitflags;
use thiserror::Error;

use crate::types::Orientation;

const PX_PER_EM: f32 = 16.0;
const DPI_PER_DPPX: f32 = 96.0;
const CM_PER_INCH: f32 = 2.54;

// =============================================================================
// Errors
// =============================================================================

/// Why a media condition could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("empty media query")]
    Empty,
    #[error("unbalanced parentheses in `{0}`")]
    Unbalanced(String),
    #[error("unknown media feature `{0}`")]
    UnknownFeature(String),
    #[error("invalid value `{value}` for media feature `{feature}`")]
    InvalidValue { feature: String, value: String },
    #[error("unknown media type `{0}`")]
    UnknownMediaType(String),
    #[error("unexpected token `{0}`")]
    UnexpectedToken(String),
}

// =============================================================================
// Features
// =============================================================================

bitflags! {
    /// Display dimensions a condition depends on.
    ///
    /// Used to skip re-evaluation when an unrelated dimension changes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MediaFeatures: u8 {
        const WIDTH = 1 << 0;
        const HEIGHT = 1 << 1;
        const RESOLUTION = 1 << 2;
    }
}

/// Current display state a condition is evaluated against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayMetrics {
    /// Viewport width in CSS px.
    pub width: u32,
    /// Viewport height in CSS px.
    pub height: u32,
    /// Device pixel ratio (dppx).
    pub resolution: f32,
}

impl Default for DisplayMetrics {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 768,
            resolution: 1.0,
        }
    }
}

impl DisplayMetrics {
    pub fn orientation(&self) -> Orientation {
        if self.height >= self.width {
            Orientation::Portrait
        } else {
            Orientation::Landscape
        }
    }

    fn aspect_ratio(&self) -> f32 {
        if self.height == 0 {
            f32::INFINITY
        } else {
            self.width as f32 / self.height as f32
        }
    }

    /// Which features differ between two states.
    pub fn diff(&self, other: &DisplayMetrics) -> MediaFeatures {
        let mut changed = MediaFeatures::empty();
        if self.width != other.width {
            changed |= MediaFeatures::WIDTH;
        }
        if self.height != other.height {
            changed |= MediaFeatures::HEIGHT;
        }
        if self.resolution != other.resolution {
            changed |= MediaFeatures::RESOLUTION;
        }
        changed
    }
}

// =============================================================================
// Parsed form
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MediaType {
    All,
    Screen,
    Print,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bound {
    Min,
    Max,
    Exact,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum FeatureTest {
    Width(Bound, f32),
    Height(Bound, f32),
    Resolution(Bound, f32),
    AspectRatio(Bound, f32),
    Orientation(Orientation),
    /// Bare `(width)` style test: true when the dimension is non-zero.
    Present(MediaFeatures),
}

impl FeatureTest {
    fn features(&self) -> MediaFeatures {
        match self {
            FeatureTest::Width(..) => MediaFeatures::WIDTH,
            FeatureTest::Height(..) => MediaFeatures::HEIGHT,
            FeatureTest::Resolution(..) => MediaFeatures::RESOLUTION,
            FeatureTest::AspectRatio(..) | FeatureTest::Orientation(_) => {
                MediaFeatures::WIDTH | MediaFeatures::HEIGHT
            }
            FeatureTest::Present(features) => *features,
        }
    }

    fn matches(&self, metrics: &DisplayMetrics) -> bool {
        match *self {
            FeatureTest::Width(bound, v) => compare(bound, metrics.width as f32, v),
            FeatureTest::Height(bound, v) => compare(bound, metrics.height as f32, v),
            FeatureTest::Resolution(bound, v) => compare(bound, metrics.resolution, v),
            FeatureTest::AspectRatio(bound, v) => compare(bound, metrics.aspect_ratio(), v),
            FeatureTest::Orientation(o) => metrics.orientation() == o,
            FeatureTest::Present(features) => {
                if features.contains(MediaFeatures::RESOLUTION) {
                    metrics.resolution > 0.0
                } else if features == MediaFeatures::WIDTH {
                    metrics.width > 0
                } else if features == MediaFeatures::HEIGHT {
                    metrics.height > 0
                } else {
                    true
                }
            }
        }
    }
}

fn compare(bound: Bound, actual: f32, expected: f32) -> bool {
    match bound {
        Bound::Min => actual >= expected,
        Bound::Max => actual <= expected,
        Bound::Exact => (actual - expected).abs() < f32::EPSILON,
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Query {
    negated: bool,
    media_type: MediaType,
    tests: Vec<FeatureTest>,
}

impl Query {
    fn matches(&self, metrics: &DisplayMetrics) -> bool {
        let type_ok = self.media_type != MediaType::Print;
        let result = type_ok && self.tests.iter().all(|t| t.matches(metrics));
        result != self.negated
    }
}

/// A parsed media condition.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaCondition {
    source: String,
    queries: Vec<Query>,
}

impl MediaCondition {
    /// Parse condition text.
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(ParseError::Empty);
        }

        let queries = split_top_level(trimmed)?
            .into_iter()
            .map(parse_query)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            source: trimmed.to_string(),
            queries,
        })
    }

    /// The text this condition was parsed from (trimmed).
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluate against a display state.
    pub fn matches(&self, metrics: &DisplayMetrics) -> bool {
        self.queries.iter().any(|q| q.matches(metrics))
    }

    /// Dimensions this condition reads.
    pub fn features(&self) -> MediaFeatures {
        self.queries
            .iter()
            .flat_map(|q| q.tests.iter())
            .fold(MediaFeatures::empty(), |acc, t| acc | t.features())
    }
}

impl fmt::Display for MediaCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Parse and evaluate in one step. Invalid text evaluates to `false`.
pub fn evaluate(text: &str, metrics: &DisplayMetrics) -> bool {
    MediaCondition::parse(text)
        .map(|c| c.matches(metrics))
        .unwrap_or(false)
}

// =============================================================================
// Parsing
// =============================================================================

enum Token<'a> {
    Word(&'a str),
    Group(&'a str),
}

/// Split on commas that are not inside parentheses.
fn split_top_level(text: &str) -> Result<Vec<&str>, ParseError> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;

    for (i, c) in text.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return Err(ParseError::Unbalanced(text.to_string()));
                }
            }
            ',' if depth == 0 => {
                parts.push(text[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(ParseError::Unbalanced(text.to_string()));
    }
    parts.push(text[start..].trim());

    if parts.iter().any(|p| p.is_empty()) {
        return Err(ParseError::Empty);
    }
    Ok(parts)
}

fn tokenize(text: &str) -> Result<Vec<Token<'_>>, ParseError> {
    let mut tokens = Vec::new();
    let bytes = text.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];
        if c.is_ascii_whitespace() {
            i += 1;
        } else if c == b'(' {
            let close = text[i..]
                .find(')')
                .map(|offset| i + offset)
                .ok_or_else(|| ParseError::Unbalanced(text.to_string()))?;
            let inner = &text[i + 1..close];
            if inner.contains('(') {
                return Err(ParseError::UnexpectedToken(inner.to_string()));
            }
            tokens.push(Token::Group(inner.trim()));
            i = close + 1;
        } else if c == b')' {
            return Err(ParseError::Unbalanced(text.to_string()));
        } else {
            let end = text[i..]
                .find(|ch: char| ch.is_ascii_whitespace() || ch == '(' || ch == ')')
                .map(|offset| i + offset)
                .unwrap_or(text.len());
            tokens.push(Token::Word(&text[i..end]));
            i = end;
        }
    }
    Ok(tokens)
}

fn parse_query(text: &str) -> Result<Query, ParseError> {
    let tokens = tokenize(text)?;
    let mut iter = tokens.into_iter().peekable();

    let mut negated = false;
    let mut has_prefix = false;
    if let Some(Token::Word(word)) = iter.peek() {
        if word.eq_ignore_ascii_case("not") {
            negated = true;
            has_prefix = true;
            iter.next();
        } else if word.eq_ignore_ascii_case("only") {
            has_prefix = true;
            iter.next();
        }
    }

    let mut media_type = None;
    if let Some(Token::Word(word)) = iter.peek() {
        media_type = Some(parse_media_type(word)?);
        iter.next();
    }

    // `only` must name a media type; `not` may negate a bare feature list.
    if has_prefix && !negated && media_type.is_none() {
        return Err(ParseError::UnexpectedToken("only".to_string()));
    }

    let mut tests = Vec::new();
    let mut need_and = media_type.is_some();
    while let Some(token) = iter.next() {
        match token {
            Token::Word(word) if need_and && word.eq_ignore_ascii_case("and") => {
                match iter.next() {
                    Some(Token::Group(group)) => tests.push(parse_feature(group)?),
                    Some(Token::Word(other)) => {
                        return Err(ParseError::UnexpectedToken(other.to_string()));
                    }
                    None => return Err(ParseError::UnexpectedToken("and".to_string())),
                }
            }
            Token::Group(group) if !need_and => {
                tests.push(parse_feature(group)?);
                need_and = true;
            }
            Token::Word(word) => return Err(ParseError::UnexpectedToken(word.to_string())),
            Token::Group(group) => return Err(ParseError::UnexpectedToken(format!("({group})"))),
        }
    }

    if media_type.is_none() && tests.is_empty() {
        return Err(ParseError::Empty);
    }

    Ok(Query {
        negated,
        media_type: media_type.unwrap_or(MediaType::All),
        tests,
    })
}

fn parse_media_type(word: &str) -> Result<MediaType, ParseError> {
    match word.to_ascii_lowercase().as_str() {
        "all" => Ok(MediaType::All),
        "screen" => Ok(MediaType::Screen),
        "print" => Ok(MediaType::Print),
        _ => Err(ParseError::UnknownMediaType(word.to_string())),
    }
}

fn parse_feature(group: &str) -> Result<FeatureTest, ParseError> {
    let (name, value) = match group.split_once(':') {
        Some((name, value)) => (name.trim().to_ascii_lowercase(), Some(value.trim())),
        None => (group.trim().to_ascii_lowercase(), None),
    };

    let (bound, base) = if let Some(rest) = name.strip_prefix("min-") {
        (Bound::Min, rest)
    } else if let Some(rest) = name.strip_prefix("max-") {
        (Bound::Max, rest)
    } else {
        (Bound::Exact, name.as_str())
    };

    let Some(value) = value else {
        // Range features need a value; bare form only for the plain name.
        if bound != Bound::Exact {
            return Err(ParseError::InvalidValue {
                feature: name.clone(),
                value: String::new(),
            });
        }
        return match base {
            "width" => Ok(FeatureTest::Present(MediaFeatures::WIDTH)),
            "height" => Ok(FeatureTest::Present(MediaFeatures::HEIGHT)),
            "resolution" => Ok(FeatureTest::Present(MediaFeatures::RESOLUTION)),
            "orientation" | "aspect-ratio" => {
                Ok(FeatureTest::Present(MediaFeatures::WIDTH | MediaFeatures::HEIGHT))
            }
            _ => Err(ParseError::UnknownFeature(name.clone())),
        };
    };

    let invalid = || ParseError::InvalidValue {
        feature: name.clone(),
        value: value.to_string(),
    };

    match base {
        "width" => parse_length(value).map(|v| FeatureTest::Width(bound, v)).ok_or_else(invalid),
        "height" => parse_length(value).map(|v| FeatureTest::Height(bound, v)).ok_or_else(invalid),
        "resolution" => parse_resolution(value)
            .map(|v| FeatureTest::Resolution(bound, v))
            .ok_or_else(invalid),
        "aspect-ratio" => parse_ratio(value)
            .map(|v| FeatureTest::AspectRatio(bound, v))
            .ok_or_else(invalid),
        "orientation" if bound == Bound::Exact => match value.to_ascii_lowercase().as_str() {
            "landscape" => Ok(FeatureTest::Orientation(Orientation::Landscape)),
            "portrait" => Ok(FeatureTest::Orientation(Orientation::Portrait)),
            _ => Err(invalid()),
        },
        _ => Err(ParseError::UnknownFeature(name.clone())),
    }
}

/// Split `12.5px` into (`12.5`, `px`).
fn split_number(value: &str) -> Option<(f32, &str)> {
    let end = value
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-' || c == '+'))
        .unwrap_or(value.len());
    let number = value[..end].parse::<f32>().ok()?;
    if !number.is_finite() {
        return None;
    }
    Some((number, value[end..].trim()))
}

fn parse_length(value: &str) -> Option<f32> {
    let (number, unit) = split_number(value)?;
    match unit.to_ascii_lowercase().as_str() {
        "px" => Some(number),
        "em" | "rem" => Some(number * PX_PER_EM),
        "" if number == 0.0 => Some(0.0),
        _ => None,
    }
}

fn parse_resolution(value: &str) -> Option<f32> {
    let (number, unit) = split_number(value)?;
    match unit.to_ascii_lowercase().as_str() {
        "dppx" | "x" | "" => Some(number),
        "dpi" => Some(number / DPI_PER_DPPX),
        "dpcm" => Some(number * CM_PER_INCH / DPI_PER_DPPX),
        _ => None,
    }
}

fn parse_ratio(value: &str) -> Option<f32> {
    match value.split_once('/') {
        Some((w, h)) => {
            let w = w.trim().parse::<f32>().ok()?;
            let h = h.trim().parse::<f32>().ok()?;
            if h == 0.0 { None } else { Some(w / h) }
        }
        None => value.trim().parse::<f32>().ok(),
    }
}

// =============================================================================
// Tests
// =============================================================================

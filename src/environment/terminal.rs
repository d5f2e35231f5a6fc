//! Terminal bridge - crossterm focus and resize events.
//!
//! A terminal has the same two signals a browser page has:
//! - focus reporting (`CSI I` / `CSI O`) says whether the terminal window is
//!   in the foreground, which maps onto page visibility
//! - resize events give the viewport size, in cells
//!
//! # API
//!
//! - [`TerminalFocus`] - `VisibilitySource` driven by FocusGained/FocusLost
//! - [`route_event`] - apply a crossterm event to focus + viewport
//! - [`enable_focus_reporting`] / [`disable_focus_reporting`]
//! - [`detect_viewport`] - seed a `Viewport` from the real terminal size
//! - [`set_cell_scale`] / [`cell_scale`] - px per cell for media conditions
//!
//! # Example
//!
//! ```ignore
//! use std::rc::Rc;
//! use std::time::Duration;
//! use spark_observers::environment::terminal::{self, TerminalFocus};
//!
//! terminal::enable_focus_reporting()?;
//! let focus = Rc::new(TerminalFocus::new());
//! let viewport = Rc::new(terminal::detect_viewport());
//!
//! loop {
//!     if let Some(event) = terminal::poll_event(Duration::from_millis(16))? {
//!         terminal::route_event(&event, &focus, &viewport);
//!     }
//! }
//! ```

use std::io::{self, stdout};
use std::time::Duration;

use crossterm::event::{poll, read, DisableFocusChange, EnableFocusChange, Event};
use crossterm::execute;
use spark_signals::{signal, Signal};

use super::document::HeadlessDocument;
use super::viewport::{Viewport, ViewportConfig};
use super::VisibilitySource;
use crate::types::ChangeListener;

// =============================================================================
// Cell Scale
// =============================================================================

/// How many px one terminal cell counts as in media conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellScale {
    pub width: u32,
    pub height: u32,
}

impl Default for CellScale {
    fn default() -> Self {
        Self { width: 1, height: 1 }
    }
}

thread_local! {
    static CELL_SCALE: Signal<CellScale> = signal(CellScale::default());
}

/// Get the current cell scale.
pub fn cell_scale() -> CellScale {
    CELL_SCALE.with(|s| s.get())
}

/// Set the cell scale (e.g. 8x16 to make `(min-width: 768px)` mean 96 columns).
pub fn set_cell_scale(scale: CellScale) {
    CELL_SCALE.with(|s| s.set(scale));
}

/// Convert a terminal size in cells to viewport px.
pub fn cells_to_px(columns: u16, rows: u16) -> (u32, u32) {
    let scale = cell_scale();
    (
        columns as u32 * scale.width,
        rows as u32 * scale.height,
    )
}

// =============================================================================
// Terminal Focus
// =============================================================================

/// Visibility source fed by terminal focus events.
///
/// Starts focused: terminals only report focus changes, never the current
/// state.
pub struct TerminalFocus {
    document: HeadlessDocument,
}

impl Default for TerminalFocus {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalFocus {
    pub fn new() -> Self {
        Self {
            document: HeadlessDocument::new(false),
        }
    }

    /// Terminal window gained focus.
    pub fn focus_gained(&self) {
        self.document.show();
    }

    /// Terminal window lost focus.
    pub fn focus_lost(&self) {
        self.document.hide();
    }

    pub fn is_focused(&self) -> bool {
        !self.document.is_hidden()
    }
}

impl VisibilitySource for TerminalFocus {
    fn is_hidden(&self) -> bool {
        self.document.is_hidden()
    }

    fn add_change_listener(&self, listener: &ChangeListener) {
        self.document.add_change_listener(listener);
    }

    fn remove_change_listener(&self, listener: &ChangeListener) {
        self.document.remove_change_listener(listener);
    }
}

// =============================================================================
// Event Routing
// =============================================================================

/// Apply a crossterm event to the focus source and viewport.
/// Returns true if the event was a focus or resize event.
pub fn route_event(event: &Event, focus: &TerminalFocus, viewport: &Viewport) -> bool {
    match event {
        Event::FocusGained => {
            focus.focus_gained();
            true
        }
        Event::FocusLost => {
            focus.focus_lost();
            true
        }
        Event::Resize(columns, rows) => {
            let (width, height) = cells_to_px(*columns, *rows);
            viewport.resize(width, height);
            true
        }
        _ => false,
    }
}

/// Poll for the next event (non-blocking with timeout).
pub fn poll_event(timeout: Duration) -> io::Result<Option<Event>> {
    if poll(timeout)? {
        Ok(Some(read()?))
    } else {
        Ok(None)
    }
}

/// Ask the terminal to report focus changes.
pub fn enable_focus_reporting() -> io::Result<()> {
    execute!(stdout(), EnableFocusChange)
}

/// Stop focus change reporting.
pub fn disable_focus_reporting() -> io::Result<()> {
    execute!(stdout(), DisableFocusChange)
}

/// Build a viewport from the real terminal size.
///
/// Falls back to the default 1024x768 when the size cannot be queried
/// (not a tty).
pub fn detect_viewport() -> Viewport {
    let config = match crossterm::terminal::size() {
        Ok((columns, rows)) => {
            let (width, height) = cells_to_px(columns, rows);
            ViewportConfig::sized(width, height)
        }
        Err(error) => {
            tracing::debug!(%error, "terminal size unavailable, using default viewport");
            ViewportConfig::default()
        }
    };
    Viewport::new(config)
}

// =============================================================================
// Tests
// =============================================================================

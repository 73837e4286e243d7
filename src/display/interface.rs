//! Two-line character display interface.
//!
//! The panel core only needs the operations below to exist and to be
//! synchronous; the controller's command-byte encoding lives behind whatever
//! implements [`CharDisplay`]. [`BufferDisplay`] is the in-memory
//! implementation used by tests and by the binary's simulation mode.

#![allow(missing_docs)]

use crate::core::errors::{PanelError, Result};

/// Number of text lines on the module.
pub const LINES: usize = 2;

/// Scroll direction for the whole display window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollDirection {
    Left,
    Right,
}

/// Synchronous two-line character display.
///
/// `write` also sets the current character address; writing empty text is
/// the idiom for parking the (visible) cursor at a position.
pub trait CharDisplay: Send {
    /// Blank the display and home the address.
    fn clear(&mut self) -> Result<()>;
    /// Write text starting at `(line, column)`.
    fn write(&mut self, text: &str, line: u8, column: u8) -> Result<()>;
    /// Show or hide the blinking cursor at the current address.
    fn set_cursor(&mut self, visible: bool) -> Result<()>;
    /// Toggle double-height rendering for line 0.
    fn set_double_height(&mut self, on: bool) -> Result<()>;
    /// Shift the display window one column.
    fn scroll(&mut self, direction: ScrollDirection) -> Result<()>;
}

// ──────────────────── frames ────────────────────

/// A fully-specified display state: two lines plus cursor and height flags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScreenFrame {
    pub line0: String,
    pub line1: String,
    pub double_height: bool,
    /// `(line, column)` of the visible cursor, if any.
    pub cursor: Option<(u8, u8)>,
}

impl ScreenFrame {
    /// Frame with both lines set and everything else off.
    #[must_use]
    pub fn new(line0: impl Into<String>, line1: impl Into<String>) -> Self {
        Self {
            line0: line0.into(),
            line1: line1.into(),
            double_height: false,
            cursor: None,
        }
    }

    /// Same frame with double-height on.
    #[must_use]
    pub fn double_height(mut self) -> Self {
        self.double_height = true;
        self
    }

    /// Same frame with a visible cursor at `(line, column)`.
    #[must_use]
    pub const fn with_cursor(mut self, line: u8, column: u8) -> Self {
        self.cursor = Some((line, column));
        self
    }

    /// Commit this frame to a display: clear, flags, text, cursor.
    pub fn apply(&self, display: &mut dyn CharDisplay) -> Result<()> {
        display.clear()?;
        display.set_cursor(false)?;
        display.set_double_height(self.double_height)?;
        display.write(&self.line0, 0, 0)?;
        if !self.line1.is_empty() {
            display.write(&self.line1, 1, 0)?;
        }
        if let Some((line, column)) = self.cursor {
            display.write("", line, column)?;
            display.set_cursor(true)?;
        }
        Ok(())
    }
}

// ──────────────────── in-memory implementation ────────────────────

/// In-memory display double: keeps the character buffer plus an operation
/// log so tests can assert on exactly what was drawn, and optionally echoes
/// each committed frame to stderr for the simulation mode.
#[derive(Debug)]
pub struct BufferDisplay {
    columns: usize,
    lines: [Vec<char>; LINES],
    cursor_visible: bool,
    double_height: bool,
    address: (u8, u8),
    ops: Vec<String>,
    /// When set, every write fails; exercises the degraded path.
    pub fail_writes: bool,
    echo: bool,
}

impl BufferDisplay {
    /// Display with the given column count.
    #[must_use]
    pub fn new(columns: u8) -> Self {
        let columns = columns as usize;
        Self {
            columns,
            lines: [vec![' '; columns], vec![' '; columns]],
            cursor_visible: false,
            double_height: false,
            address: (0, 0),
            ops: Vec::new(),
            fail_writes: false,
            echo: false,
        }
    }

    /// Echo committed lines to stderr (simulation mode).
    #[must_use]
    pub const fn with_echo(mut self) -> Self {
        self.echo = true;
        self
    }

    /// Rendered content of one line.
    #[must_use]
    pub fn line(&self, line: usize) -> String {
        self.lines
            .get(line)
            .map(|l| l.iter().collect::<String>().trim_end().to_string())
            .unwrap_or_default()
    }

    /// Whether the cursor is currently shown.
    #[must_use]
    pub const fn cursor_visible(&self) -> bool {
        self.cursor_visible
    }

    /// Whether double-height mode is on.
    #[must_use]
    pub const fn is_double_height(&self) -> bool {
        self.double_height
    }

    /// Current character address (last write position).
    #[must_use]
    pub const fn address(&self) -> (u8, u8) {
        self.address
    }

    /// Everything done to the display, in order.
    #[must_use]
    pub fn ops(&self) -> &[String] {
        &self.ops
    }

    /// Forget the operation log.
    pub fn clear_ops(&mut self) {
        self.ops.clear();
    }
}

impl CharDisplay for BufferDisplay {
    fn clear(&mut self) -> Result<()> {
        for line in &mut self.lines {
            line.fill(' ');
        }
        self.address = (0, 0);
        self.ops.push("clear".to_string());
        Ok(())
    }

    fn write(&mut self, text: &str, line: u8, column: u8) -> Result<()> {
        if self.fail_writes {
            return Err(PanelError::DisplayWrite {
                details: "simulated write failure".to_string(),
            });
        }
        self.address = (line, column);
        let Some(buffer) = self.lines.get_mut(line as usize) else {
            return Err(PanelError::DisplayWrite {
                details: format!("line {line} out of range"),
            });
        };
        for (offset, ch) in text.chars().enumerate() {
            let idx = column as usize + offset;
            if idx >= self.columns {
                break;
            }
            buffer[idx] = ch;
        }
        self.ops.push(format!("write:{line}:{column}:{text}"));
        if self.echo && !text.is_empty() {
            eprintln!("[RMP-DISPLAY] {line}|{text}");
        }
        Ok(())
    }

    fn set_cursor(&mut self, visible: bool) -> Result<()> {
        self.cursor_visible = visible;
        self.ops.push(format!("cursor:{visible}"));
        Ok(())
    }

    fn set_double_height(&mut self, on: bool) -> Result<()> {
        self.double_height = on;
        self.ops.push(format!("double_height:{on}"));
        Ok(())
    }

    fn scroll(&mut self, direction: ScrollDirection) -> Result<()> {
        for line in &mut self.lines {
            match direction {
                ScrollDirection::Left => {
                    line.rotate_left(1);
                    if let Some(last) = line.last_mut() {
                        *last = ' ';
                    }
                }
                ScrollDirection::Right => {
                    line.rotate_right(1);
                    if let Some(first) = line.first_mut() {
                        *first = ' ';
                    }
                }
            }
        }
        self.ops.push(format!("scroll:{direction:?}"));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_places_text_and_tracks_address() {
        let mut display = BufferDisplay::new(16);
        display.write("21.50C", 0, 2).unwrap();
        assert_eq!(display.line(0), "  21.50C");
        assert_eq!(display.address(), (0, 2));
    }

    #[test]
    fn write_truncates_at_the_right_edge() {
        let mut display = BufferDisplay::new(8);
        display.write("0123456789", 0, 4).unwrap();
        assert_eq!(display.line(0), "    0123");
    }

    #[test]
    fn out_of_range_line_is_a_display_error() {
        let mut display = BufferDisplay::new(16);
        let err = display.write("x", 2, 0).unwrap_err();
        assert_eq!(err.code(), "RMP-3001");
        assert!(err.is_retryable());
    }

    #[test]
    fn scroll_left_shifts_content_out() {
        let mut display = BufferDisplay::new(8);
        display.write("ab", 0, 0).unwrap();
        display.scroll(ScrollDirection::Left).unwrap();
        assert_eq!(display.line(0), "b");
    }

    #[test]
    fn frame_apply_draws_both_lines_and_cursor() {
        let mut display = BufferDisplay::new(16);
        let frame = ScreenFrame::new("clock_style", "6").with_cursor(1, 0);
        frame.apply(&mut display).unwrap();
        assert_eq!(display.line(0), "clock_style");
        assert_eq!(display.line(1), "6");
        assert!(display.cursor_visible());
        assert_eq!(display.address(), (1, 0));
    }

    #[test]
    fn frame_apply_resets_stale_state() {
        let mut display = BufferDisplay::new(16);
        ScreenFrame::new("old", "junk")
            .with_cursor(1, 3)
            .apply(&mut display)
            .unwrap();
        ScreenFrame::new("07/05 06:30", "")
            .double_height()
            .apply(&mut display)
            .unwrap();
        assert_eq!(display.line(0), "07/05 06:30");
        assert_eq!(display.line(1), "");
        assert!(!display.cursor_visible());
        assert!(display.is_double_height());
    }

    #[test]
    fn failing_display_surfaces_a_retryable_error() {
        let mut display = BufferDisplay::new(16);
        display.fail_writes = true;
        let err = ScreenFrame::new("x", "").apply(&mut display).unwrap_err();
        assert_eq!(err.code(), "RMP-3001");
    }
}

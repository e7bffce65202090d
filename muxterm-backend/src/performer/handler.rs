//! The screen-facing half of the dispatcher: the [`Screen`] trait the
//! embedder implements, the [`Timeout`] abstraction used to coalesce
//! session attributes, and the SGR/color parsing helpers.

use std::time::{Duration, Instant};

use crate::ansi::attr::Attr;
use crate::ansi::graphics::GraphicData;
use crate::ansi::{
    ClearMode, CursorShape, Hyperlink, LineClearMode, PromptMark, TabulationClearMode,
};
use crate::colors::{AnsiColor, ColorRgb, NamedColor};

/// The abstract screen the emulation drives.
///
/// The grid itself (cells, scrollback, selection, damage) lives outside
/// this crate; every operation decoded from the stream arrives through
/// this trait. Implementations must not call back into the emulator.
pub trait Screen {
    /// A character to be displayed, already translated through the
    /// active charset.
    fn input(&mut self, _c: char) {}

    /// Set cursor to position, zero-based.
    fn goto(&mut self, _line: i32, _col: usize) {}

    /// Set cursor to a specific row.
    fn goto_line(&mut self, _line: i32) {}

    /// Set cursor to a specific column.
    fn goto_col(&mut self, _col: usize) {}

    /// Insert blank characters at the cursor, shifting the line right.
    fn insert_blank(&mut self, _count: usize) {}

    /// Move cursor up `rows`, clipped to the scrolling region.
    fn move_up(&mut self, _rows: usize) {}

    /// Move cursor down `rows`, clipped to the scrolling region.
    fn move_down(&mut self, _rows: usize) {}

    /// Move cursor forward `cols`.
    fn move_forward(&mut self, _cols: usize) {}

    /// Move cursor backward `cols`.
    fn move_backward(&mut self, _cols: usize) {}

    /// Move cursor down `rows` and set to column 1.
    fn move_down_and_cr(&mut self, _rows: usize) {}

    /// Move cursor up `rows` and set to column 1.
    fn move_up_and_cr(&mut self, _rows: usize) {}

    /// Put `count` tabs.
    fn put_tab(&mut self, _count: u16) {}

    /// Backspace one column.
    fn backspace(&mut self) {}

    /// Carriage return.
    fn carriage_return(&mut self) {}

    /// Linefeed.
    fn linefeed(&mut self) {}

    /// Substitute char under cursor.
    fn substitute(&mut self) {}

    /// Set current position as a tabstop.
    fn set_horizontal_tabstop(&mut self) {}

    /// Scroll up `rows` rows within the scrolling region.
    fn scroll_up(&mut self, _rows: usize) {}

    /// Scroll down `rows` rows within the scrolling region.
    fn scroll_down(&mut self, _rows: usize) {}

    /// Insert `count` blank lines.
    fn insert_blank_lines(&mut self, _rows: usize) {}

    /// Delete `count` lines.
    fn delete_lines(&mut self, _rows: usize) {}

    /// Erase `count` chars in the current line following the cursor.
    fn erase_chars(&mut self, _count: usize) {}

    /// Delete `count` chars, shifting the rest of the line left.
    fn delete_chars(&mut self, _count: usize) {}

    /// Move backward `count` tab stops.
    fn move_backward_tabs(&mut self, _count: u16) {}

    /// Move forward `count` tab stops.
    fn move_forward_tabs(&mut self, _count: u16) {}

    /// Save cursor position and rendition.
    fn save_cursor(&mut self) {}

    /// Restore cursor position and rendition.
    fn restore_cursor(&mut self) {}

    /// Clear current line.
    fn clear_line(&mut self, _mode: LineClearMode) {}

    /// Clear screen.
    fn clear_screen(&mut self, _mode: ClearMode) {}

    /// Clear tab stops.
    fn clear_tabs(&mut self, _mode: TabulationClearMode) {}

    /// Set tab stops at every `interval`.
    fn set_tabs(&mut self, _interval: u16) {}

    /// Reset the grid; scrollback and contents are dropped, except for
    /// the current prompt line when `preserve_prompt` is set.
    fn reset_state(&mut self, _preserve_prompt: bool) {}

    /// Reverse Index: move up one line, scrolling at the top margin.
    fn reverse_index(&mut self) {}

    /// Set a terminal attribute for subsequent cells.
    fn terminal_attribute(&mut self, _attr: Attr) {}

    /// DECSTBM - set the scrolling region, one-based.
    fn set_scrolling_region(&mut self, _top: usize, _bottom: Option<usize>) {}

    /// DECOM - whether the cursor is confined to the margins.
    fn set_origin_mode(&mut self, _origin: bool) {}

    /// DECAWM - wrap at the right margin.
    fn set_wrap_mode(&mut self, _wrap: bool) {}

    /// IRM - insert instead of replace.
    fn set_insert_mode(&mut self, _insert: bool) {}

    /// Switch between the primary and alternate screen.
    fn swap_alt_screen(&mut self, _alt: bool) {}

    /// DECCOLM - resize to the given column count and clear.
    fn resize_columns(&mut self, _columns: usize) {}

    /// Run the DECALN screen alignment pattern.
    fn decaln(&mut self) {}

    /// DECTCEM - show or hide the cursor.
    fn set_cursor_visible(&mut self, _visible: bool) {}

    /// DECSCUSR - cursor rendering style.
    fn set_cursor_style(&mut self, _style: Option<CursorShape>, _blinking: bool) {}

    /// OSC 8 - hyperlink for subsequent cells.
    fn set_hyperlink(&mut self, _link: Option<Hyperlink>) {}

    /// OSC 133 - semantic prompt mark at the cursor.
    fn semantic_prompt(&mut self, _mark: PromptMark) {}

    /// Place an inline graphic at the cursor.
    fn commit_graphic(&mut self, _graphic: GraphicData, _scrolls: bool) {}

    /// Number of visible lines.
    fn screen_lines(&self) -> usize {
        24
    }

    /// Number of visible columns.
    fn columns(&self) -> usize {
        80
    }

    /// Cursor position, zero-based `(line, column)`.
    fn cursor_position(&self) -> (i32, usize) {
        (0, 0)
    }

    /// Size of one cell in pixels, `(width, height)`.
    fn cell_size_pixels(&self) -> (usize, usize) {
        (10, 20)
    }

    /// Character stored at the given cell, for DECRQCRA checksums.
    fn char_at(&self, _line: i32, _col: usize) -> char {
        ' '
    }
}

/// Deadline used to coalesce session-attribute updates.
///
/// Abstracted so tests can drive the flush deterministically.
pub trait Timeout: Default {
    /// Arm the timeout.
    fn set_timeout(&mut self, duration: Duration);
    /// Disarm the timeout.
    fn clear_timeout(&mut self);
    /// Whether the timeout is armed and has not fired yet.
    fn pending_timeout(&self) -> bool;
}

/// Wall-clock implementation of [`Timeout`].
#[derive(Default)]
pub struct StdTimeout {
    deadline: Option<Instant>,
}

impl StdTimeout {
    /// When the pending flush is due.
    #[inline]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }
}

impl Timeout for StdTimeout {
    #[inline]
    fn set_timeout(&mut self, duration: Duration) {
        self.deadline = Some(Instant::now() + duration);
    }

    #[inline]
    fn clear_timeout(&mut self) {
        self.deadline = None;
    }

    #[inline]
    fn pending_timeout(&self) -> bool {
        self.deadline.is_some()
    }
}

pub(crate) fn xparse_color(color: &[u8]) -> Option<ColorRgb> {
    if !color.is_empty() && color[0] == b'#' {
        parse_legacy_color(&color[1..])
    } else if color.len() >= 4 && &color[..4] == b"rgb:" {
        parse_rgb_color(&color[4..])
    } else {
        None
    }
}

/// Parse colors in `rgb:r(rrr)/g(ggg)/b(bbb)` format.
fn parse_rgb_color(color: &[u8]) -> Option<ColorRgb> {
    let colors = std::str::from_utf8(color).ok()?.split('/').collect::<Vec<_>>();

    if colors.len() != 3 {
        return None;
    }

    // Scale values instead of filling with `0`s.
    let scale = |input: &str| {
        if input.len() > 4 {
            None
        } else {
            let max = u32::pow(16, input.len() as u32) - 1;
            let value = u32::from_str_radix(input, 16).ok()?;
            Some((255 * value / max) as u8)
        }
    };

    Some(ColorRgb {
        r: scale(colors[0])?,
        g: scale(colors[1])?,
        b: scale(colors[2])?,
    })
}

/// Parse colors in `#r(rrr)g(ggg)b(bbb)` format.
fn parse_legacy_color(color: &[u8]) -> Option<ColorRgb> {
    let item_len = color.len() / 3;

    // Truncate/Fill to two byte precision.
    let color_from_slice = |slice: &[u8]| {
        let col = usize::from_str_radix(std::str::from_utf8(slice).ok()?, 16).ok()? << 4;
        Some((col >> (4 * slice.len().saturating_sub(1))) as u8)
    };

    Some(ColorRgb {
        r: color_from_slice(&color[0..item_len])?,
        g: color_from_slice(&color[item_len..item_len * 2])?,
        b: color_from_slice(&color[item_len * 2..])?,
    })
}

pub(crate) fn parse_number(input: &[u8]) -> Option<u8> {
    if input.is_empty() {
        return None;
    }
    let mut num: u8 = 0;
    for c in input {
        let c = *c as char;
        let digit = c.to_digit(10)?;
        num = num.checked_mul(10).and_then(|v| v.checked_add(digit as u8))?
    }
    Some(num)
}

fn parse_sgr_color(params: &mut dyn Iterator<Item = u16>) -> Option<AnsiColor> {
    match params.next() {
        Some(2) => Some(AnsiColor::Spec(ColorRgb {
            r: u8::try_from(params.next()?).ok()?,
            g: u8::try_from(params.next()?).ok()?,
            b: u8::try_from(params.next()?).ok()?,
        })),
        Some(5) => Some(AnsiColor::Indexed(u8::try_from(params.next()?).ok()?)),
        _ => None,
    }
}

/// Handle the colon form of extended colors, `38:2:<r>:<g>:<b>` with an
/// optional color-space id after the `2`.
#[inline]
fn handle_colon_rgb(params: &[u16]) -> Option<AnsiColor> {
    let rgb_start = if params.len() > 4 { 2 } else { 1 };
    let rgb_iter = params[rgb_start..].iter().copied();
    let mut iter = std::iter::once(params[0]).chain(rgb_iter);

    parse_sgr_color(&mut iter)
}

#[inline]
pub(crate) fn attrs_from_sgr_parameters(
    params: &mut muxterm_parser::ParamsIter<'_>,
) -> Vec<Option<Attr>> {
    let mut attrs = Vec::with_capacity(params.size_hint().0);

    while let Some(param) = params.next() {
        let attr = match param {
            [0] => Some(Attr::Reset),
            [1] => Some(Attr::Bold),
            [2] => Some(Attr::Dim),
            [3] => Some(Attr::Italic),
            [4, 0] => Some(Attr::CancelUnderline),
            [4, 2] => Some(Attr::DoubleUnderline),
            [4, 3] => Some(Attr::Undercurl),
            [4, 4] => Some(Attr::DottedUnderline),
            [4, 5] => Some(Attr::DashedUnderline),
            [4, ..] => Some(Attr::Underline),
            [5] => Some(Attr::BlinkSlow),
            [6] => Some(Attr::BlinkFast),
            [7] => Some(Attr::Reverse),
            [8] => Some(Attr::Hidden),
            [9] => Some(Attr::Strike),
            [21] => Some(Attr::CancelBold),
            [22] => Some(Attr::CancelBoldDim),
            [23] => Some(Attr::CancelItalic),
            [24] => Some(Attr::CancelUnderline),
            [25] => Some(Attr::CancelBlink),
            [27] => Some(Attr::CancelReverse),
            [28] => Some(Attr::CancelHidden),
            [29] => Some(Attr::CancelStrike),
            [30] => Some(Attr::Foreground(AnsiColor::Named(NamedColor::Black))),
            [31] => Some(Attr::Foreground(AnsiColor::Named(NamedColor::Red))),
            [32] => Some(Attr::Foreground(AnsiColor::Named(NamedColor::Green))),
            [33] => Some(Attr::Foreground(AnsiColor::Named(NamedColor::Yellow))),
            [34] => Some(Attr::Foreground(AnsiColor::Named(NamedColor::Blue))),
            [35] => Some(Attr::Foreground(AnsiColor::Named(NamedColor::Magenta))),
            [36] => Some(Attr::Foreground(AnsiColor::Named(NamedColor::Cyan))),
            [37] => Some(Attr::Foreground(AnsiColor::Named(NamedColor::White))),
            [38] => {
                let mut iter = params.map(|param| param[0]);
                parse_sgr_color(&mut iter).map(Attr::Foreground)
            }
            [38, params @ ..] => handle_colon_rgb(params).map(Attr::Foreground),
            [39] => Some(Attr::Foreground(AnsiColor::Named(NamedColor::Foreground))),
            [40] => Some(Attr::Background(AnsiColor::Named(NamedColor::Black))),
            [41] => Some(Attr::Background(AnsiColor::Named(NamedColor::Red))),
            [42] => Some(Attr::Background(AnsiColor::Named(NamedColor::Green))),
            [43] => Some(Attr::Background(AnsiColor::Named(NamedColor::Yellow))),
            [44] => Some(Attr::Background(AnsiColor::Named(NamedColor::Blue))),
            [45] => Some(Attr::Background(AnsiColor::Named(NamedColor::Magenta))),
            [46] => Some(Attr::Background(AnsiColor::Named(NamedColor::Cyan))),
            [47] => Some(Attr::Background(AnsiColor::Named(NamedColor::White))),
            [48] => {
                let mut iter = params.map(|param| param[0]);
                parse_sgr_color(&mut iter).map(Attr::Background)
            }
            [48, params @ ..] => handle_colon_rgb(params).map(Attr::Background),
            [49] => Some(Attr::Background(AnsiColor::Named(NamedColor::Background))),
            [58] => {
                let mut iter = params.map(|param| param[0]);
                parse_sgr_color(&mut iter).map(|color| Attr::UnderlineColor(Some(color)))
            }
            [58, params @ ..] => {
                handle_colon_rgb(params).map(|color| Attr::UnderlineColor(Some(color)))
            }
            [59] => Some(Attr::UnderlineColor(None)),
            [90] => Some(Attr::Foreground(AnsiColor::Named(NamedColor::LightBlack))),
            [91] => Some(Attr::Foreground(AnsiColor::Named(NamedColor::LightRed))),
            [92] => Some(Attr::Foreground(AnsiColor::Named(NamedColor::LightGreen))),
            [93] => Some(Attr::Foreground(AnsiColor::Named(NamedColor::LightYellow))),
            [94] => Some(Attr::Foreground(AnsiColor::Named(NamedColor::LightBlue))),
            [95] => Some(Attr::Foreground(AnsiColor::Named(NamedColor::LightMagenta))),
            [96] => Some(Attr::Foreground(AnsiColor::Named(NamedColor::LightCyan))),
            [97] => Some(Attr::Foreground(AnsiColor::Named(NamedColor::LightWhite))),
            [100] => Some(Attr::Background(AnsiColor::Named(NamedColor::LightBlack))),
            [101] => Some(Attr::Background(AnsiColor::Named(NamedColor::LightRed))),
            [102] => Some(Attr::Background(AnsiColor::Named(NamedColor::LightGreen))),
            [103] => Some(Attr::Background(AnsiColor::Named(NamedColor::LightYellow))),
            [104] => Some(Attr::Background(AnsiColor::Named(NamedColor::LightBlue))),
            [105] => Some(Attr::Background(AnsiColor::Named(NamedColor::LightMagenta))),
            [106] => Some(Attr::Background(AnsiColor::Named(NamedColor::LightCyan))),
            [107] => Some(Attr::Background(AnsiColor::Named(NamedColor::LightWhite))),
            _ => None,
        };
        attrs.push(attr);
    }

    attrs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xparse_color_formats() {
        assert_eq!(
            xparse_color(b"rgb:ff/00/80"),
            Some(ColorRgb::new(255, 0, 128))
        );
        assert_eq!(
            xparse_color(b"rgb:ffff/0000/8080"),
            Some(ColorRgb::new(255, 0, 128))
        );
        assert_eq!(xparse_color(b"#ff0080"), Some(ColorRgb::new(255, 0, 128)));
        assert_eq!(xparse_color(b"red"), None);
    }

    #[test]
    fn number_parsing_rejects_overflow() {
        assert_eq!(parse_number(b"255"), Some(255));
        assert_eq!(parse_number(b"256"), None);
        assert_eq!(parse_number(b""), None);
        assert_eq!(parse_number(b"4a"), None);
    }
}

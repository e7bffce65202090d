//! Glue between the parser state machine and the [`Screen`]: the
//! [`Performer`] receives parser actions and turns them into screen
//! operations, mode changes, replies, and events.

pub mod handler;

use std::collections::BTreeMap;

use tracing::{debug, trace, warn};

use muxterm_parser::{Params, Perform};

use crate::ansi::charset::{charset_from_byte, CharsetIndex, CharsetState};
use crate::ansi::control::C0;
use crate::ansi::graphics::GraphicData;
use crate::ansi::mode::{
    Mode as AnsiMode, NamedMode, NamedPrivateMode, PrivateMode, TermMode,
};
use crate::ansi::{
    iterm2_image_protocol, sixel, ClearMode, CursorShape, Hyperlink, LineClearMode,
    PromptMark, TabulationClearMode,
};
use crate::colors::{default_palette, ColorRgb};
use crate::event::{EventListener, TermEvent};
use self::handler::{attrs_from_sgr_parameters, parse_number, xparse_color, Screen};

/// Session attribute ids, matching the OSC numbers that set them.
pub mod attribute {
    pub const ICON_AND_WINDOW_TITLE: u16 = 0;
    pub const ICON_TITLE: u16 = 1;
    pub const WINDOW_TITLE: u16 = 2;
    pub const CURRENT_DIRECTORY: u16 = 7;
}

/// OSC codes of the dynamic colors, in slot order.
const DYNAMIC_COLOR_CODES: [usize; 5] = [10, 11, 12, 17, 19];

/// Mutable emulation state shared between the performer, the VT52
/// sub-machine, and the public API.
pub struct EmulationState {
    pub term_mode: TermMode,
    pub saved_mode: TermMode,

    /// One charset bank per screen (primary, alternate).
    pub charsets: [CharsetState; 2],
    pub saved_origin: bool,

    pub palette: Box<[ColorRgb; 256]>,
    pub dynamic_colors: [ColorRgb; DYNAMIC_COLOR_CODES.len()],

    /// Coalesced session-attribute updates, flushed in id order.
    pub pending_attrs: BTreeMap<u16, String>,

    pub sixel: Option<Box<sixel::Parser>>,
    pub sixel_shared_palette: Option<Vec<ColorRgb>>,

    pub title: Option<String>,
    pub title_stack: Vec<Option<String>>,

    pub preceding_char: Option<char>,

    /// Ask the outer loop to stop feeding the ANSI parser; set when a
    /// dispatch switched the input language (VT52) or requested a full
    /// reset.
    pub parse_interrupt: bool,

    /// RIS arrived; the owning emulation performs the reset so the tmux
    /// queue and timers are torn down with everything else.
    pub pending_hard_reset: bool,
}

impl Default for EmulationState {
    fn default() -> Self {
        Self {
            term_mode: TermMode::default(),
            saved_mode: TermMode::default(),
            charsets: Default::default(),
            saved_origin: false,
            palette: default_palette(),
            dynamic_colors: default_dynamic_colors(),
            pending_attrs: BTreeMap::new(),
            sixel: None,
            sixel_shared_palette: None,
            title: None,
            title_stack: Vec::new(),
            preceding_char: None,
            parse_interrupt: false,
            pending_hard_reset: false,
        }
    }
}

fn default_dynamic_colors() -> [ColorRgb; DYNAMIC_COLOR_CODES.len()] {
    [
        ColorRgb::new(0xe5, 0xe5, 0xe5), // foreground
        ColorRgb::new(0x00, 0x00, 0x00), // background
        ColorRgb::new(0xe5, 0xe5, 0xe5), // cursor
        ColorRgb::new(0xb2, 0xb2, 0xb2), // highlight background
        ColorRgb::new(0x00, 0x00, 0x00), // highlight foreground
    ]
}

impl EmulationState {
    /// The charset bank of the active screen.
    pub fn charsets(&mut self) -> &mut CharsetState {
        let index = self.term_mode.contains(TermMode::ALT_SCREEN) as usize;
        &mut self.charsets[index]
    }

    pub fn charsets_ref(&self) -> &CharsetState {
        let index = self.term_mode.contains(TermMode::ALT_SCREEN) as usize;
        &self.charsets[index]
    }
}

/// Turn a semver string into the integer reported by DA2.
fn version_number(version: &str) -> usize {
    let mut number = 0;

    for part in version.split('.').take(3) {
        number = number * 100 + part.parse::<usize>().unwrap_or(0);
    }

    number
}

pub struct Performer<'a, S: Screen, L: EventListener> {
    state: &'a mut EmulationState,
    screen: &'a mut S,
    listener: &'a L,
}

impl<'a, S: Screen, L: EventListener> Performer<'a, S, L> {
    pub fn new(
        state: &'a mut EmulationState,
        screen: &'a mut S,
        listener: &'a L,
    ) -> Self {
        Self {
            state,
            screen,
            listener,
        }
    }

    fn emit_bytes(&self, bytes: Vec<u8>) {
        self.listener.send_event(TermEvent::PtyWrite(bytes));
    }

    fn emit_str(&self, text: String) {
        self.emit_bytes(text.into_bytes());
    }

    fn set_session_attribute(&mut self, id: u16, value: String) {
        if id == attribute::ICON_AND_WINDOW_TITLE || id == attribute::WINDOW_TITLE {
            self.state.title = Some(value.clone());
        }
        self.state.pending_attrs.insert(id, value);
    }

    /// DECCOLM: switch between 80 and 132 columns when allowed.
    fn deccolm(&mut self, wide: bool) {
        if !self.state.term_mode.contains(TermMode::ALLOW_COLUMN_CHANGE) {
            trace!("DECCOLM ignored; 132-column mode not allowed");
            return;
        }

        self.state.term_mode.set(TermMode::COLUMN_132, wide);
        self.screen.resize_columns(if wide { 132 } else { 80 });
        self.screen.clear_screen(ClearMode::All);
        self.screen.set_scrolling_region(1, None);
        self.screen.goto(0, 0);
    }

    fn save_cursor(&mut self) {
        self.state.saved_origin = self.state.term_mode.contains(TermMode::ORIGIN);
        self.state.charsets().save();
        self.screen.save_cursor();
    }

    fn restore_cursor(&mut self) {
        let origin = self.state.saved_origin;
        self.state.term_mode.set(TermMode::ORIGIN, origin);
        self.screen.set_origin_mode(origin);
        self.state.charsets().restore();
        self.screen.restore_cursor();
    }

    fn set_mode(&mut self, mode: AnsiMode) {
        let mode = match mode {
            AnsiMode::Named(mode) => mode,
            AnsiMode::Unknown(mode) => {
                debug!("Ignoring unknown mode {} in set_mode", mode);
                return;
            }
        };

        trace!("Setting public mode: {:?}", mode);
        match mode {
            NamedMode::Insert => {
                self.state.term_mode.insert(TermMode::INSERT);
                self.screen.set_insert_mode(true);
            }
            NamedMode::LineFeedNewLine => {
                self.state.term_mode.insert(TermMode::LINE_FEED_NEW_LINE)
            }
        }
    }

    fn unset_mode(&mut self, mode: AnsiMode) {
        let mode = match mode {
            AnsiMode::Named(mode) => mode,
            AnsiMode::Unknown(mode) => {
                debug!("Ignoring unknown mode {} in unset_mode", mode);
                return;
            }
        };

        trace!("Unsetting public mode: {:?}", mode);
        match mode {
            NamedMode::Insert => {
                self.state.term_mode.remove(TermMode::INSERT);
                self.screen.set_insert_mode(false);
            }
            NamedMode::LineFeedNewLine => {
                self.state.term_mode.remove(TermMode::LINE_FEED_NEW_LINE)
            }
        }
    }

    fn set_private_mode(&mut self, mode: PrivateMode) {
        let mode = match mode {
            PrivateMode::Named(mode) => mode,
            PrivateMode::Unknown(mode) => {
                debug!("Ignoring unknown mode {} in set_private_mode", mode);
                return;
            }
        };

        trace!("Setting private mode: {:?}", mode);
        let flags = &mut self.state.term_mode;
        match mode {
            NamedPrivateMode::CursorKeys => flags.insert(TermMode::APP_CURSOR),
            NamedPrivateMode::AnsiMode => flags.insert(TermMode::ANSI),
            NamedPrivateMode::ColumnMode => self.deccolm(true),
            NamedPrivateMode::Origin => {
                flags.insert(TermMode::ORIGIN);
                self.screen.set_origin_mode(true);
                self.screen.goto(0, 0);
            }
            NamedPrivateMode::LineWrap => {
                flags.insert(TermMode::LINE_WRAP);
                self.screen.set_wrap_mode(true);
            }
            NamedPrivateMode::BlinkingCursor => {
                flags.insert(TermMode::BLINKING_CURSOR);
                self.screen.set_cursor_style(None, true);
            }
            NamedPrivateMode::ShowCursor => {
                flags.insert(TermMode::SHOW_CURSOR);
                self.screen.set_cursor_visible(true);
            }
            NamedPrivateMode::Allow132Columns => {
                flags.insert(TermMode::ALLOW_COLUMN_CHANGE)
            }
            NamedPrivateMode::SixelDisplay => flags.insert(TermMode::SIXEL_DISPLAY),
            // Mouse protocols are mutually exclusive.
            NamedPrivateMode::ReportMouseClicks => {
                flags.remove(TermMode::MOUSE_MODE);
                flags.insert(TermMode::MOUSE_REPORT_CLICK);
            }
            NamedPrivateMode::HighlightMouseMotion => {
                flags.remove(TermMode::MOUSE_MODE);
                flags.insert(TermMode::MOUSE_HIGHLIGHT);
            }
            NamedPrivateMode::ReportCellMouseMotion => {
                flags.remove(TermMode::MOUSE_MODE);
                flags.insert(TermMode::MOUSE_DRAG);
            }
            NamedPrivateMode::ReportAllMouseMotion => {
                flags.remove(TermMode::MOUSE_MODE);
                flags.insert(TermMode::MOUSE_MOTION);
            }
            NamedPrivateMode::ReportFocusInOut => flags.insert(TermMode::FOCUS_IN_OUT),
            // Mouse encodings are mutually exclusive.
            NamedPrivateMode::Utf8Mouse => {
                flags.remove(TermMode::SGR_MOUSE | TermMode::URXVT_MOUSE);
                flags.insert(TermMode::UTF8_MOUSE);
            }
            NamedPrivateMode::SgrMouse => {
                flags.remove(TermMode::UTF8_MOUSE | TermMode::URXVT_MOUSE);
                flags.insert(TermMode::SGR_MOUSE);
            }
            NamedPrivateMode::UrxvtMouse => {
                flags.remove(TermMode::UTF8_MOUSE | TermMode::SGR_MOUSE);
                flags.insert(TermMode::URXVT_MOUSE);
            }
            NamedPrivateMode::AlternateScroll => flags.insert(TermMode::ALTERNATE_SCROLL),
            NamedPrivateMode::AltScreen => {
                if !flags.contains(TermMode::ALT_SCREEN) {
                    flags.insert(TermMode::ALT_SCREEN);
                    self.screen.swap_alt_screen(true);
                }
            }
            NamedPrivateMode::SaveCursor => self.save_cursor(),
            NamedPrivateMode::SwapScreenAndSetRestoreCursor => {
                self.save_cursor();
                if !self.state.term_mode.contains(TermMode::ALT_SCREEN) {
                    self.state.term_mode.insert(TermMode::ALT_SCREEN);
                    self.screen.swap_alt_screen(true);
                }
                self.screen.clear_screen(ClearMode::All);
            }
            NamedPrivateMode::SixelPrivateColorRegisters => {
                flags.insert(TermMode::SIXEL_PRIV_PALETTE)
            }
            NamedPrivateMode::BracketedPaste => flags.insert(TermMode::BRACKETED_PASTE),
            NamedPrivateMode::SixelCursorToTheRight => {
                flags.insert(TermMode::SIXEL_CURSOR_TO_THE_RIGHT)
            }
        }
    }

    fn unset_private_mode(&mut self, mode: PrivateMode) {
        let mode = match mode {
            PrivateMode::Named(mode) => mode,
            PrivateMode::Unknown(mode) => {
                debug!("Ignoring unknown mode {} in unset_private_mode", mode);
                return;
            }
        };

        trace!("Unsetting private mode: {:?}", mode);
        let flags = &mut self.state.term_mode;
        match mode {
            NamedPrivateMode::CursorKeys => flags.remove(TermMode::APP_CURSOR),
            NamedPrivateMode::AnsiMode => {
                // DECANM reset drops into VT52 emulation; stop feeding
                // the ANSI state machine.
                flags.remove(TermMode::ANSI);
                self.state.parse_interrupt = true;
            }
            NamedPrivateMode::ColumnMode => self.deccolm(false),
            NamedPrivateMode::Origin => {
                flags.remove(TermMode::ORIGIN);
                self.screen.set_origin_mode(false);
                self.screen.goto(0, 0);
            }
            NamedPrivateMode::LineWrap => {
                flags.remove(TermMode::LINE_WRAP);
                self.screen.set_wrap_mode(false);
            }
            NamedPrivateMode::BlinkingCursor => {
                flags.remove(TermMode::BLINKING_CURSOR);
                self.screen.set_cursor_style(None, false);
            }
            NamedPrivateMode::ShowCursor => {
                flags.remove(TermMode::SHOW_CURSOR);
                self.screen.set_cursor_visible(false);
            }
            NamedPrivateMode::Allow132Columns => {
                flags.remove(TermMode::ALLOW_COLUMN_CHANGE)
            }
            NamedPrivateMode::SixelDisplay => flags.remove(TermMode::SIXEL_DISPLAY),
            NamedPrivateMode::ReportMouseClicks => {
                flags.remove(TermMode::MOUSE_REPORT_CLICK)
            }
            NamedPrivateMode::HighlightMouseMotion => {
                flags.remove(TermMode::MOUSE_HIGHLIGHT)
            }
            NamedPrivateMode::ReportCellMouseMotion => flags.remove(TermMode::MOUSE_DRAG),
            NamedPrivateMode::ReportAllMouseMotion => flags.remove(TermMode::MOUSE_MOTION),
            NamedPrivateMode::ReportFocusInOut => flags.remove(TermMode::FOCUS_IN_OUT),
            NamedPrivateMode::Utf8Mouse => flags.remove(TermMode::UTF8_MOUSE),
            NamedPrivateMode::SgrMouse => flags.remove(TermMode::SGR_MOUSE),
            NamedPrivateMode::UrxvtMouse => flags.remove(TermMode::URXVT_MOUSE),
            NamedPrivateMode::AlternateScroll => flags.remove(TermMode::ALTERNATE_SCROLL),
            NamedPrivateMode::AltScreen => {
                if flags.contains(TermMode::ALT_SCREEN) {
                    flags.remove(TermMode::ALT_SCREEN);
                    self.screen.swap_alt_screen(false);
                }
            }
            NamedPrivateMode::SaveCursor => self.restore_cursor(),
            NamedPrivateMode::SwapScreenAndSetRestoreCursor => {
                if self.state.term_mode.contains(TermMode::ALT_SCREEN) {
                    self.state.term_mode.remove(TermMode::ALT_SCREEN);
                    self.screen.swap_alt_screen(false);
                }
                self.restore_cursor();
            }
            NamedPrivateMode::SixelPrivateColorRegisters => {
                self.state.sixel_shared_palette = None;
                self.state.term_mode.remove(TermMode::SIXEL_PRIV_PALETTE);
            }
            NamedPrivateMode::BracketedPaste => flags.remove(TermMode::BRACKETED_PASTE),
            NamedPrivateMode::SixelCursorToTheRight => {
                flags.remove(TermMode::SIXEL_CURSOR_TO_THE_RIGHT)
            }
        }
    }

    /// DECRQM reply for an ANSI mode.
    fn report_mode(&mut self, mode: AnsiMode) {
        let state = match mode {
            AnsiMode::Named(NamedMode::Insert) => {
                mode_state(self.state.term_mode.contains(TermMode::INSERT))
            }
            AnsiMode::Named(NamedMode::LineFeedNewLine) => {
                mode_state(self.state.term_mode.contains(TermMode::LINE_FEED_NEW_LINE))
            }
            AnsiMode::Unknown(_) => 0,
        };

        self.emit_str(format!("\x1b[{};{}$y", mode.raw(), state));
    }

    /// DECRQM reply for a private mode.
    fn report_private_mode(&mut self, mode: PrivateMode) {
        let flags = self.state.term_mode;
        let state = match mode {
            PrivateMode::Named(named) => {
                let flag = match named {
                    NamedPrivateMode::CursorKeys => Some(TermMode::APP_CURSOR),
                    NamedPrivateMode::AnsiMode => Some(TermMode::ANSI),
                    NamedPrivateMode::ColumnMode => Some(TermMode::COLUMN_132),
                    NamedPrivateMode::Origin => Some(TermMode::ORIGIN),
                    NamedPrivateMode::LineWrap => Some(TermMode::LINE_WRAP),
                    NamedPrivateMode::BlinkingCursor => Some(TermMode::BLINKING_CURSOR),
                    NamedPrivateMode::ShowCursor => Some(TermMode::SHOW_CURSOR),
                    NamedPrivateMode::Allow132Columns => {
                        Some(TermMode::ALLOW_COLUMN_CHANGE)
                    }
                    NamedPrivateMode::SixelDisplay => Some(TermMode::SIXEL_DISPLAY),
                    NamedPrivateMode::ReportMouseClicks => {
                        Some(TermMode::MOUSE_REPORT_CLICK)
                    }
                    NamedPrivateMode::HighlightMouseMotion => {
                        Some(TermMode::MOUSE_HIGHLIGHT)
                    }
                    NamedPrivateMode::ReportCellMouseMotion => Some(TermMode::MOUSE_DRAG),
                    NamedPrivateMode::ReportAllMouseMotion => Some(TermMode::MOUSE_MOTION),
                    NamedPrivateMode::ReportFocusInOut => Some(TermMode::FOCUS_IN_OUT),
                    NamedPrivateMode::Utf8Mouse => Some(TermMode::UTF8_MOUSE),
                    NamedPrivateMode::SgrMouse => Some(TermMode::SGR_MOUSE),
                    NamedPrivateMode::AlternateScroll => Some(TermMode::ALTERNATE_SCROLL),
                    NamedPrivateMode::UrxvtMouse => Some(TermMode::URXVT_MOUSE),
                    NamedPrivateMode::AltScreen
                    | NamedPrivateMode::SwapScreenAndSetRestoreCursor => {
                        Some(TermMode::ALT_SCREEN)
                    }
                    NamedPrivateMode::SaveCursor => None,
                    NamedPrivateMode::SixelPrivateColorRegisters => {
                        Some(TermMode::SIXEL_PRIV_PALETTE)
                    }
                    NamedPrivateMode::BracketedPaste => Some(TermMode::BRACKETED_PASTE),
                    NamedPrivateMode::SixelCursorToTheRight => {
                        Some(TermMode::SIXEL_CURSOR_TO_THE_RIGHT)
                    }
                };

                match flag {
                    Some(flag) => mode_state(flags.contains(flag)),
                    None => 0,
                }
            }
            PrivateMode::Unknown(_) => 0,
        };

        self.emit_str(format!("\x1b[?{};{}$y", mode.raw(), state));
    }

    /// Restore the mode vector saved by XTSAVE and resync the hints the
    /// screen tracks on its own.
    fn restore_modes(&mut self) {
        let restored = self.state.saved_mode;
        let previous = std::mem::replace(&mut self.state.term_mode, restored);

        self.screen
            .set_wrap_mode(restored.contains(TermMode::LINE_WRAP));
        self.screen
            .set_origin_mode(restored.contains(TermMode::ORIGIN));
        self.screen
            .set_insert_mode(restored.contains(TermMode::INSERT));
        self.screen
            .set_cursor_visible(restored.contains(TermMode::SHOW_CURSOR));

        if previous.contains(TermMode::ALT_SCREEN) != restored.contains(TermMode::ALT_SCREEN)
        {
            self.screen
                .swap_alt_screen(restored.contains(TermMode::ALT_SCREEN));
        }
    }

    fn identify_terminal(&mut self, intermediate: Option<char>) {
        match intermediate {
            None => {
                trace!("Reporting primary device attributes");
                self.emit_str(String::from("\x1b[?62;4;6;22c"));
            }
            Some('>') => {
                trace!("Reporting secondary device attributes");
                let version = version_number(env!("CARGO_PKG_VERSION"));
                self.emit_str(format!("\x1b[>0;{version};1c"));
            }
            Some('=') => {
                trace!("Reporting tertiary device attributes");
                self.emit_str(String::from("\x1bP!|00000000\x1b\\"));
            }
            _ => debug!("Unsupported device attributes intermediate"),
        }
    }

    fn device_status(&mut self, private: bool, arg: usize) {
        trace!("Reporting device status: {}", arg);
        match (private, arg) {
            (false, 5) => self.emit_str(String::from("\x1b[0n")),
            (false, 6) => {
                let (line, col) = self.screen.cursor_position();
                self.emit_str(format!("\x1b[{};{}R", line + 1, col + 1));
            }
            (true, 6) => {
                let (line, col) = self.screen.cursor_position();
                self.emit_str(format!("\x1b[?{};{}R", line + 1, col + 1));
            }
            (true, 15) => self.emit_str(String::from("\x1b[?13n")),
            _ => debug!("unknown device status query: {}", arg),
        }
    }

    /// XTWINOPS; only the report operations are honored.
    fn window_op(&mut self, op: usize) {
        match op {
            11 => self.emit_str(String::from("\x1b[1t")),
            13 => self.emit_str(String::from("\x1b[3;0;0t")),
            14 => {
                let (cell_w, cell_h) = self.screen.cell_size_pixels();
                let width = cell_w * self.screen.columns();
                let height = cell_h * self.screen.screen_lines();
                self.emit_str(format!("\x1b[4;{};{}t", height, width));
            }
            16 => {
                let (cell_w, cell_h) = self.screen.cell_size_pixels();
                self.emit_str(format!("\x1b[6;{};{}t", cell_h, cell_w));
            }
            18 => {
                let lines = self.screen.screen_lines();
                let columns = self.screen.columns();
                self.emit_str(format!("\x1b[8;{};{}t", lines, columns));
            }
            19 => {
                let lines = self.screen.screen_lines();
                let columns = self.screen.columns();
                self.emit_str(format!("\x1b[9;{};{}t", lines, columns));
            }
            20 => {
                let title = self.state.title.clone().unwrap_or_default();
                self.emit_str(format!("\x1b]L{}\x1b\\", title));
            }
            21 => {
                let title = self.state.title.clone().unwrap_or_default();
                self.emit_str(format!("\x1b]l{}\x1b\\", title));
            }
            22 => self.state.title_stack.push(self.state.title.clone()),
            23 => {
                if let Some(title) = self.state.title_stack.pop() {
                    let value = title.clone().unwrap_or_default();
                    self.state.title = title;
                    self.state
                        .pending_attrs
                        .insert(attribute::WINDOW_TITLE, value);
                }
            }
            // Destructive window operations (move, resize, iconify) are
            // ignored.
            _ => debug!("Ignoring window operation {}", op),
        }
    }

    /// DECRQCRA: checksum of a screen rectangle.
    ///
    /// The response is `DCS Pi ! ~ XXXX ST` where the checksum is the
    /// negated 16-bit sum of the code points in the rectangle.
    fn checksum_rectangle(&mut self, params: &mut muxterm_parser::ParamsIter<'_>) {
        let mut next = |default: usize| {
            params
                .next()
                .map(|p| p[0] as usize)
                .filter(|&v| v != 0)
                .unwrap_or(default)
        };

        let id = next(0);
        let _page = next(1);
        let top = next(1);
        let left = next(1);
        let bottom = next(self.screen.screen_lines());
        let right = next(self.screen.columns());

        let bottom = bottom.min(self.screen.screen_lines());
        let right = right.min(self.screen.columns());

        let mut checksum = 0u16;
        for line in top..=bottom {
            for col in left..=right {
                let c = self.screen.char_at(line as i32 - 1, col - 1);
                checksum = checksum.wrapping_add(c as u16);
            }
        }
        checksum = checksum.wrapping_neg();

        self.emit_str(format!("\x1bP{}!~{:04X}\x1b\\", id, checksum));
    }

    /// Soft (DECSTR) reset: modes return to defaults, the screen keeps
    /// its contents and cursor.
    fn soft_reset(&mut self) {
        let allow_column_change = self
            .state
            .term_mode
            .contains(TermMode::ALLOW_COLUMN_CHANGE);

        self.state.term_mode = TermMode::default();
        self.state
            .term_mode
            .set(TermMode::ALLOW_COLUMN_CHANGE, allow_column_change);
        self.state.saved_origin = false;

        self.screen.set_origin_mode(false);
        self.screen.set_insert_mode(false);
        self.screen.set_wrap_mode(true);
        self.screen.set_cursor_visible(true);
        self.screen.set_scrolling_region(1, None);
    }

    fn commit_graphic(&mut self, graphic: GraphicData) {
        let scrolls = !self.state.term_mode.contains(TermMode::SIXEL_DISPLAY);
        let (cell_w, cell_h) = self.screen.cell_size_pixels();
        let width = graphic.width;
        let height = graphic.height;

        self.screen.commit_graphic(graphic, scrolls);

        if !scrolls {
            return;
        }

        // Sixel scrolling: the cursor lands on the line after the image,
        // or to its right when mode 8452 is set.
        if self
            .state
            .term_mode
            .contains(TermMode::SIXEL_CURSOR_TO_THE_RIGHT)
        {
            let cols = width.div_ceil(cell_w.max(1));
            self.screen.move_forward(cols);
        } else {
            let rows = height.div_ceil(cell_h.max(1));
            for _ in 0..rows {
                self.screen.linefeed();
            }
            self.screen.carriage_return();
        }
    }

    fn osc_color(&mut self, params: &[&[u8]], terminator: &str) {
        // Set color index: OSC 4 ; index ; spec ...
        if params.len() <= 1 || params.len() % 2 == 0 {
            debug!("Invalid OSC 4 parameter count");
            return;
        }

        for chunk in params[1..].chunks(2) {
            let index = match parse_number(chunk[0]) {
                Some(index) => index as usize,
                None => {
                    debug!("Invalid OSC 4 color index");
                    continue;
                }
            };

            if let Some(color) = xparse_color(chunk[1]) {
                self.state.palette[index] = color;
                self.listener
                    .send_event(TermEvent::PaletteUpdated { index, color });
            } else if chunk[1] == b"?" {
                let color = self.state.palette[index];
                self.emit_str(format!(
                    "\x1b]4;{};{}{}",
                    index,
                    color.to_x11_string(),
                    terminator
                ));
            } else {
                debug!("Invalid OSC 4 color spec");
            }
        }
    }

    /// Dynamic colors: each extra parameter addresses the next code, so
    /// `OSC 10;fg;bg` sets both the foreground and the background.
    fn osc_dynamic_color(&mut self, params: &[&[u8]], mut code: usize, terminator: &str) {
        for param in &params[1..] {
            let Some(slot) = DYNAMIC_COLOR_CODES.iter().position(|&c| c == code) else {
                debug!("Dynamic color code {} out of range", code);
                break;
            };

            if let Some(color) = xparse_color(param) {
                self.state.dynamic_colors[slot] = color;
                self.listener
                    .send_event(TermEvent::DynamicColorChanged { code, color });
            } else if param == b"?" {
                let color = self.state.dynamic_colors[slot];
                self.emit_str(format!(
                    "\x1b]{};{}{}",
                    code,
                    color.to_x11_string(),
                    terminator
                ));
            } else {
                debug!("Invalid dynamic color spec for OSC {}", code);
            }

            code += 1;
        }
    }

    fn osc_semantic_prompt(&mut self, params: &[&[u8]]) {
        let mark = match params.get(1).and_then(|p| p.first()) {
            Some(b'A') => PromptMark::PromptStart,
            Some(b'B') => PromptMark::CommandStart,
            Some(b'C') => PromptMark::OutputStart,
            Some(b'D') => {
                let code = params
                    .get(2)
                    .and_then(|p| std::str::from_utf8(p).ok())
                    .and_then(|s| s.parse().ok());
                PromptMark::CommandFinished(code)
            }
            _ => {
                debug!("Unknown semantic prompt mark");
                return;
            }
        };

        self.screen.semantic_prompt(mark);
    }

    fn osc_notification(&mut self, params: &[&[u8]]) {
        // OSC 777 ; notify ; title ; body
        if params.get(1).map(|p| &p[..]) != Some(b"notify") {
            debug!("Unsupported OSC 777 command");
            return;
        }

        let text = |index: usize| {
            params
                .get(index)
                .map(|p| String::from_utf8_lossy(p).into_owned())
                .unwrap_or_default()
        };

        self.listener.send_event(TermEvent::Notification {
            title: text(2),
            body: text(3),
        });
    }
}

impl<S: Screen, L: EventListener> Perform for Performer<'_, S, L> {
    fn print(&mut self, c: char) {
        let c = self.state.charsets_ref().apply(c);
        self.screen.input(c);
        self.state.preceding_char = Some(c);
    }

    fn execute(&mut self, byte: u8) {
        trace!("[execute] {byte:04x}");

        match byte {
            C0::HT => self.screen.put_tab(1),
            C0::BS => self.screen.backspace(),
            C0::CR => self.screen.carriage_return(),
            C0::LF | C0::VT | C0::FF => {
                self.screen.linefeed();
                if self.state.term_mode.contains(TermMode::LINE_FEED_NEW_LINE) {
                    self.screen.carriage_return();
                }
            }
            C0::BEL => self.listener.send_event(TermEvent::Bell),
            C0::SUB => self.screen.substitute(),
            C0::SI => self.state.charsets().invoke(CharsetIndex::G0),
            C0::SO => self.state.charsets().invoke(CharsetIndex::G1),
            C0::ENQ => trace!("Ignoring ENQ; no answerback configured"),
            _ => warn!("[unhandled] execute byte={byte:02x}"),
        }
    }

    fn hook(&mut self, params: &Params, intermediates: &[u8], ignore: bool, action: char) {
        match (action, intermediates) {
            ('q', []) => {
                let palette = self.state.sixel_shared_palette.take();
                self.state.sixel = Some(Box::new(sixel::Parser::new(params, palette)));
            }
            _ => debug!(
                "[unhandled hook] params={:?}, ints: {:?}, ignore: {:?}, action: {:?}",
                params, intermediates, ignore, action
            ),
        }
    }

    fn put(&mut self, byte: u8) {
        if let Some(parser) = &mut self.state.sixel {
            if let Err(err) = parser.put(byte) {
                warn!("Failed to parse sixel data: {}", err);
                self.state.sixel = None;
            }
        } else {
            debug!("[unhandled put] byte={:?}", byte);
        }
    }

    fn unhook(&mut self) {
        let Some(parser) = self.state.sixel.take() else {
            debug!("[unhandled dcs_unhook]");
            return;
        };

        match parser.finish() {
            Ok((graphic, palette)) => {
                if !self.state.term_mode.contains(TermMode::SIXEL_PRIV_PALETTE) {
                    self.state.sixel_shared_palette = Some(palette);
                }
                self.commit_graphic(graphic);
            }
            Err(err) => warn!("Failed to parse sixel data: {}", err),
        }
    }

    fn osc_dispatch(&mut self, params: &[&[u8]], bell_terminated: bool) {
        let terminator = if bell_terminated { "\x07" } else { "\x1b\\" };

        if params.is_empty() || params[0].is_empty() {
            return;
        }

        fn join_utf8(params: &[&[u8]]) -> String {
            params
                .iter()
                .map(|p| String::from_utf8_lossy(p))
                .collect::<Vec<_>>()
                .join(";")
        }

        match params[0] {
            // Icon and window title, icon title, window title.
            b"0" | b"1" | b"2" => {
                if params.len() >= 2 {
                    let id = parse_number(params[0]).unwrap_or(0) as u16;
                    let value = join_utf8(&params[1..]).trim().to_owned();
                    self.set_session_attribute(id, value);
                } else {
                    debug!("Missing title parameter in OSC {:?}", params[0]);
                }
            }

            b"4" => self.osc_color(params, terminator),

            // Current directory, passed as a file: URL.
            b"7" => {
                if let Some(param) = params.get(1) {
                    if let Ok(s) = std::str::from_utf8(param) {
                        if let Ok(parsed) = url::Url::parse(s) {
                            self.set_session_attribute(
                                attribute::CURRENT_DIRECTORY,
                                parsed.path().to_owned(),
                            );
                        }
                    }
                }
            }

            // Hyperlink.
            b"8" if params.len() > 2 => {
                let link_params = params[1];
                let uri = std::str::from_utf8(params[2]).unwrap_or_default();

                // The OSC 8 escape sequence must be stopped when getting an empty `uri`.
                if uri.is_empty() {
                    self.screen.set_hyperlink(None);
                    return;
                }

                // Link parameters are in format of `key1=value1:key2=value2`. Currently only key
                // `id` is defined.
                let id = link_params
                    .split(|&b| b == b':')
                    .find_map(|kv| kv.strip_prefix(b"id="))
                    .and_then(|kv| std::str::from_utf8(kv).ok());

                self.screen.set_hyperlink(Some(Hyperlink::new(id, uri)));
            }

            b"10" | b"11" | b"12" | b"17" | b"19" => {
                let code = parse_number(params[0]).unwrap_or(0) as usize;
                self.osc_dynamic_color(params, code, terminator);
            }

            b"104" => {
                // Reset all color indexes when no parameters are given.
                if params.len() == 1 || params[1].is_empty() {
                    self.state.palette = default_palette();
                    self.listener.send_event(TermEvent::PaletteReset(None));
                    return;
                }

                let defaults = default_palette();
                for param in &params[1..] {
                    match parse_number(param) {
                        Some(index) => {
                            let index = index as usize;
                            self.state.palette[index] = defaults[index];
                            self.listener
                                .send_event(TermEvent::PaletteReset(Some(index)));
                        }
                        None => debug!("Invalid OSC 104 color index"),
                    }
                }
            }

            b"110" | b"111" | b"112" => {
                let code = parse_number(params[0]).unwrap_or(0) as usize - 100;
                if let Some(slot) = DYNAMIC_COLOR_CODES.iter().position(|&c| c == code) {
                    let color = default_dynamic_colors()[slot];
                    self.state.dynamic_colors[slot] = color;
                    self.listener
                        .send_event(TermEvent::DynamicColorChanged { code, color });
                }
            }

            b"133" => self.osc_semantic_prompt(params),

            b"777" => self.osc_notification(params),

            b"1337" => {
                if let Some(graphic) = iterm2_image_protocol::parse(params) {
                    self.commit_graphic(graphic);
                }
            }

            _ => debug!(
                "[unhandled osc_dispatch] id={:?}",
                String::from_utf8_lossy(params[0])
            ),
        }
    }

    fn csi_dispatch(
        &mut self,
        params: &Params,
        intermediates: &[u8],
        should_ignore: bool,
        action: char,
    ) {
        macro_rules! csi_unhandled {
            () => {{
                warn!(
                    "[csi_dispatch] params={params:#?}, intermediates={intermediates:?}, should_ignore={should_ignore:?}, action={action:?}"
                );
            }};
        }

        if should_ignore || intermediates.len() > 2 {
            csi_unhandled!();
            return;
        }

        let mut params_iter = params.iter();

        let mut next_param_or = |default: u16| match params_iter.next() {
            Some(&[param, ..]) if param != 0 => param,
            _ => default,
        };

        match (action, intermediates) {
            ('@', []) => self.screen.insert_blank(next_param_or(1) as usize),
            ('A', []) => self.screen.move_up(next_param_or(1) as usize),
            ('B', []) | ('e', []) => self.screen.move_down(next_param_or(1) as usize),
            ('b', []) => {
                if let Some(c) = self.state.preceding_char {
                    for _ in 0..next_param_or(1) {
                        self.screen.input(c);
                    }
                } else {
                    warn!("tried to repeat with no preceding char");
                }
            }
            ('C', []) | ('a', []) => self.screen.move_forward(next_param_or(1) as usize),
            ('c', intermediates) if next_param_or(0) == 0 => {
                self.identify_terminal(intermediates.first().map(|&i| i as char))
            }
            ('D', []) => self.screen.move_backward(next_param_or(1) as usize),
            ('d', []) => self.screen.goto_line(next_param_or(1) as i32 - 1),
            ('E', []) => self.screen.move_down_and_cr(next_param_or(1) as usize),
            ('F', []) => self.screen.move_up_and_cr(next_param_or(1) as usize),
            ('G', []) | ('`', []) => self.screen.goto_col(next_param_or(1) as usize - 1),
            ('g', []) => {
                let mode = match next_param_or(0) {
                    0 => TabulationClearMode::Current,
                    3 => TabulationClearMode::All,
                    _ => {
                        csi_unhandled!();
                        return;
                    }
                };

                self.screen.clear_tabs(mode);
            }
            ('H', []) | ('f', []) => {
                let y = next_param_or(1) as i32;
                let x = next_param_or(1) as usize;
                self.screen.goto(y - 1, x - 1);
            }
            ('h', []) => {
                for param in params_iter.map(|param| param[0]) {
                    self.set_mode(AnsiMode::new(param))
                }
            }
            ('h', [b'?']) => {
                for param in params_iter.map(|param| param[0]) {
                    self.set_private_mode(PrivateMode::new(param))
                }
            }
            ('I', []) => self.screen.move_forward_tabs(next_param_or(1)),
            ('J', []) => {
                let mode = match next_param_or(0) {
                    0 => ClearMode::Below,
                    1 => ClearMode::Above,
                    2 => ClearMode::All,
                    3 => ClearMode::Saved,
                    _ => {
                        csi_unhandled!();
                        return;
                    }
                };

                self.screen.clear_screen(mode);
            }
            ('K', []) => {
                let mode = match next_param_or(0) {
                    0 => LineClearMode::Right,
                    1 => LineClearMode::Left,
                    2 => LineClearMode::All,
                    _ => {
                        csi_unhandled!();
                        return;
                    }
                };

                self.screen.clear_line(mode);
            }
            ('L', []) => self.screen.insert_blank_lines(next_param_or(1) as usize),
            ('l', []) => {
                for param in params_iter.map(|param| param[0]) {
                    self.unset_mode(AnsiMode::new(param))
                }
            }
            ('l', [b'?']) => {
                for param in params_iter.map(|param| param[0]) {
                    self.unset_private_mode(PrivateMode::new(param))
                }
            }
            ('M', []) => self.screen.delete_lines(next_param_or(1) as usize),
            ('m', []) => {
                if params.is_empty() {
                    self.screen.terminal_attribute(crate::ansi::attr::Attr::Reset);
                } else {
                    for attr in attrs_from_sgr_parameters(&mut params_iter) {
                        match attr {
                            Some(attr) => self.screen.terminal_attribute(attr),
                            None => csi_unhandled!(),
                        }
                    }
                }
            }
            ('n', []) => self.device_status(false, next_param_or(0) as usize),
            ('n', [b'?']) => self.device_status(true, next_param_or(0) as usize),
            ('P', []) => self.screen.delete_chars(next_param_or(1) as usize),
            ('p', [b'!']) => self.soft_reset(),
            ('p', [b'$']) => {
                let mode = next_param_or(0);
                self.report_mode(AnsiMode::new(mode));
            }
            ('p', [b'?', b'$']) => {
                let mode = next_param_or(0);
                self.report_private_mode(PrivateMode::new(mode));
            }
            ('q', [b'>']) => {
                // XTVERSION (CSI > q) -- Query Terminal Version.
                if next_param_or(0) != 0 {
                    csi_unhandled!();
                    return;
                }
                let version = env!("CARGO_PKG_VERSION");
                self.emit_str(format!("\x1bP>|muxterm {version}\x1b\\"));
            }
            ('q', [b' ']) => {
                // DECSCUSR (CSI SP q) -- Set Cursor Style.
                let cursor_style_id = next_param_or(0);
                let shape = match cursor_style_id {
                    0 => None,
                    1 | 2 => Some(CursorShape::Block),
                    3 | 4 => Some(CursorShape::Underline),
                    5 | 6 => Some(CursorShape::Beam),
                    _ => {
                        csi_unhandled!();
                        return;
                    }
                };

                self.screen.set_cursor_style(shape, cursor_style_id % 2 == 1);
            }
            ('r', []) => {
                let top = next_param_or(1) as usize;
                let bottom = params_iter
                    .next()
                    .map(|param| param[0] as usize)
                    .filter(|&param| param != 0);

                self.screen.set_scrolling_region(top, bottom);
                self.screen.goto(0, 0);
            }
            ('r', [b'?']) => self.restore_modes(),
            ('S', []) => self.screen.scroll_up(next_param_or(1) as usize),
            ('s', []) => self.save_cursor(),
            ('s', [b'?']) => self.state.saved_mode = self.state.term_mode,
            ('T', []) => self.screen.scroll_down(next_param_or(1) as usize),
            ('t', []) => self.window_op(next_param_or(1) as usize),
            ('u', []) => self.restore_cursor(),
            ('X', []) => self.screen.erase_chars(next_param_or(1) as usize),
            ('y', [b'*']) => {
                let mut iter = params.iter();
                self.checksum_rectangle(&mut iter);
            }
            ('Z', []) => self.screen.move_backward_tabs(next_param_or(1)),
            _ => csi_unhandled!(),
        };
    }

    fn esc_dispatch(&mut self, intermediates: &[u8], _ignore: bool, byte: u8) {
        macro_rules! unhandled {
            () => {{
                warn!(
                    "[unhandled] esc_dispatch ints={:?}, byte={:?} ({:02x})",
                    intermediates, byte as char, byte
                );
            }};
        }

        match (byte, intermediates) {
            (b'B' | b'A' | b'0' | b'1' | b'2' | b'@', [slot @ (b'(' | b')' | b'*' | b'+')]) => {
                let index = match slot {
                    b'(' => CharsetIndex::G0,
                    b')' => CharsetIndex::G1,
                    b'*' => CharsetIndex::G2,
                    _ => CharsetIndex::G3,
                };
                match charset_from_byte(byte) {
                    Some(charset) => self.state.charsets().designate(index, charset),
                    None => unhandled!(),
                }
            }
            (b'D', []) => self.screen.linefeed(),
            (b'E', []) => {
                self.screen.linefeed();
                self.screen.carriage_return();
            }
            (b'H', []) => self.screen.set_horizontal_tabstop(),
            (b'M', []) => self.screen.reverse_index(),
            (b'Z', []) => self.identify_terminal(None),
            (b'c', []) => {
                // RIS is handled a level up so the tmux queue and timers
                // reset with everything else.
                self.state.parse_interrupt = true;
                self.state.pending_hard_reset = true;
            }
            (b'7', []) => self.save_cursor(),
            (b'8', [b'#']) => self.screen.decaln(),
            (b'8', []) => self.restore_cursor(),
            (b'=', []) => {
                self.state.term_mode.insert(TermMode::APP_KEYPAD);
            }
            (b'>', []) => {
                self.state.term_mode.remove(TermMode::APP_KEYPAD);
            }
            // String terminator, do nothing (parser handles as string terminator).
            (b'\\', []) => (),
            _ => unhandled!(),
        }
    }

    fn apc_start(&mut self) {
        trace!("APC string started");
    }

    fn apc_put(&mut self, _byte: u8) {}

    fn apc_end(&mut self) {
        // Kitty graphics arrive this way; the protocol itself is not
        // implemented.
        trace!("APC string discarded");
    }

    #[inline]
    fn terminated(&self) -> bool {
        self.state.parse_interrupt
    }
}

fn mode_state(set: bool) -> u8 {
    if set {
        1
    } else {
        2
    }
}

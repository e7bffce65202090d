//! The emulation core: feeds the byte stream through the right decoder
//! (ANSI parser, VT52 sub-machine, or the tmux control-mode lexer) and
//! carries the outbound half of the terminal (key, mouse, paste, focus).

use std::time::Duration;

use tracing::debug;

use muxterm_parser::{Parser, Perform};

use crate::ansi::control::C0;
use crate::ansi::mode::TermMode;
use crate::ansi::{ClearMode, LineClearMode};
use crate::colors::default_palette;
use crate::event::{EventListener, TermEvent};
use crate::input::{
    alternate_scroll_bytes, encode_mouse, KeyEncoder, KeyEvent, Modifiers, MouseButton,
    MouseEventType,
};
use crate::performer::handler::{Screen, StdTimeout, Timeout};
use crate::performer::{EmulationState, Performer};
use crate::tmux::{self, ControlMode};

/// How long session-attribute updates are buffered before flushing.
const SESSION_ATTRIBUTE_DELAY: Duration = Duration::from_millis(20);

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
enum Vt52Stage {
    #[default]
    Ground,
    Escape,
    CupRow,
    CupColumn,
}

#[derive(Debug, Default)]
struct Vt52State {
    stage: Vt52Stage,
    row: u8,
}

/// A VT102/xterm emulation with a nested tmux control-mode decoder.
///
/// All state changes happen on the thread calling [`Emulation::receive`]
/// or one of the `send_*` entry points; there is no interior threading.
pub struct Emulation<S: Screen, L: EventListener + Clone, T: Timeout = StdTimeout> {
    parser: Parser,
    state: EmulationState,
    tmux: ControlMode<L>,
    screen: S,
    listener: L,
    attr_timer: T,
    vt52: Vt52State,

    /// Whether the next terminal byte starts a line, for control-mode
    /// marker detection.
    at_line_start: bool,
    /// Partially matched control-mode marker carried across calls.
    probe: Vec<u8>,
}

impl<S: Screen, L: EventListener + Clone, T: Timeout> Emulation<S, L, T> {
    pub fn new(screen: S, listener: L) -> Self {
        Self {
            parser: Parser::new(),
            state: EmulationState::default(),
            tmux: ControlMode::new(listener.clone()),
            screen,
            listener,
            attr_timer: T::default(),
            vt52: Vt52State::default(),
            at_line_start: true,
            probe: Vec::new(),
        }
    }

    /// The screen being driven.
    pub fn screen(&self) -> &S {
        &self.screen
    }

    pub fn screen_mut(&mut self) -> &mut S {
        &mut self.screen
    }

    /// The current mode bit-vector.
    pub fn mode(&self) -> TermMode {
        self.state.term_mode
    }

    /// The tmux server controller, live while control mode is active.
    pub fn tmux(&self) -> &ControlMode<L> {
        &self.tmux
    }

    pub fn tmux_mut(&mut self) -> &mut ControlMode<L> {
        &mut self.tmux
    }

    /// The coalescing timer for session attributes.
    pub fn session_attribute_timer(&self) -> &T {
        &self.attr_timer
    }

    /// Decode a chunk of output from the child process.
    ///
    /// Never fails; undecodable sequences are logged and dropped.
    pub fn receive(&mut self, bytes: &[u8]) {
        let mut rest = bytes;
        while !rest.is_empty() {
            if self.tmux.is_active() {
                let consumed = self.tmux.advance(rest);
                rest = &rest[consumed..];
                if !self.tmux.is_active() {
                    self.state.term_mode.remove(TermMode::TMUX);
                    self.at_line_start = true;
                }
                continue;
            }

            if !self.probe.is_empty() || (self.at_line_start && rest[0] == b'%') {
                rest = self.advance_probe(rest);
                continue;
            }

            rest = self.advance_terminal(rest);
        }

        if !self.state.pending_attrs.is_empty() && !self.attr_timer.pending_timeout() {
            self.attr_timer.set_timeout(SESSION_ATTRIBUTE_DELAY);
        }
    }

    /// Match bytes against the control-mode activation marker.
    fn advance_probe<'b>(&mut self, bytes: &'b [u8]) -> &'b [u8] {
        let mut consumed = 0;
        for &byte in bytes {
            consumed += 1;
            self.probe.push(byte);

            if !tmux::ACTIVATION_MARKER.starts_with(&self.probe) {
                // Not a control-mode marker after all; the probed bytes
                // belong to the terminal.
                let probe = std::mem::take(&mut self.probe);
                self.feed_terminal(&probe);
                self.at_line_start = probe.last() == Some(&b'\n');
                return &bytes[consumed..];
            }

            if self.probe.len() == tmux::ACTIVATION_MARKER.len() {
                debug!("tmux control mode detected");
                let probe = std::mem::take(&mut self.probe);
                self.state.term_mode.insert(TermMode::TMUX);
                self.tmux.activate();
                let fed = self.tmux.advance(&probe);
                debug_assert_eq!(fed, probe.len());
                return &bytes[consumed..];
            }
        }

        // Chunk ended inside a possible marker; keep the probe.
        &[]
    }

    /// Feed terminal bytes, stopping at the next possible control-mode
    /// marker.
    fn advance_terminal<'b>(&mut self, bytes: &'b [u8]) -> &'b [u8] {
        // Stop at the first `%` following a newline; the probe decides
        // whether it opens control mode.
        if let Some(pos) = memchr::memmem::find(bytes, b"\n%") {
            let (feed, rest) = bytes.split_at(pos + 1);
            self.feed_terminal(feed);
            self.at_line_start = true;
            return rest;
        }

        // A marker could be cut off by the chunk boundary.
        let tail_start = match memchr::memrchr(b'\n', bytes) {
            Some(pos) => pos + 1,
            None => bytes.len(),
        };
        let tail = &bytes[tail_start..];
        if !tail.is_empty()
            && tail[0] == b'%'
            && tmux::ACTIVATION_MARKER.starts_with(tail)
        {
            self.feed_terminal(&bytes[..tail_start]);
            self.probe.extend_from_slice(tail);
            return &[];
        }

        self.feed_terminal(bytes);
        self.at_line_start = bytes.last() == Some(&b'\n');
        &[]
    }

    /// Run bytes through the ANSI parser or the VT52 sub-machine.
    fn feed_terminal(&mut self, bytes: &[u8]) {
        let mut i = 0;
        while i < bytes.len() {
            if self.state.term_mode.contains(TermMode::ANSI) {
                let mut performer =
                    Performer::new(&mut self.state, &mut self.screen, &self.listener);
                i += self
                    .parser
                    .advance_until_terminated(&mut performer, &bytes[i..]);

                if self.state.parse_interrupt {
                    self.state.parse_interrupt = false;
                    if self.state.pending_hard_reset {
                        self.state.pending_hard_reset = false;
                        self.reset(false, false);
                    }
                }
            } else {
                i += self.advance_vt52(&bytes[i..]);
            }
        }
    }

    fn advance_vt52(&mut self, bytes: &[u8]) -> usize {
        let mut consumed = 0;
        for &byte in bytes {
            consumed += 1;
            self.vt52_byte(byte);
            if self.state.term_mode.contains(TermMode::ANSI) {
                break;
            }
        }
        consumed
    }

    fn vt52_byte(&mut self, byte: u8) {
        match self.vt52.stage {
            Vt52Stage::Ground => match byte {
                C0::ESC => self.vt52.stage = Vt52Stage::Escape,
                0x00..=0x1f => {
                    let mut performer =
                        Performer::new(&mut self.state, &mut self.screen, &self.listener);
                    performer.execute(byte);
                }
                _ => {
                    let mut performer =
                        Performer::new(&mut self.state, &mut self.screen, &self.listener);
                    performer.print(byte as char);
                }
            },
            Vt52Stage::Escape => {
                self.vt52.stage = Vt52Stage::Ground;
                match byte {
                    b'A' => self.screen.move_up(1),
                    b'B' => self.screen.move_down(1),
                    b'C' => self.screen.move_forward(1),
                    b'D' => self.screen.move_backward(1),
                    b'F' => self.state.charsets().set_graphic(true),
                    b'G' => self.state.charsets().set_graphic(false),
                    b'H' => self.screen.goto(0, 0),
                    b'I' => self.screen.reverse_index(),
                    b'J' => self.screen.clear_screen(ClearMode::Below),
                    b'K' => self.screen.clear_line(LineClearMode::Right),
                    b'Y' => self.vt52.stage = Vt52Stage::CupRow,
                    b'Z' => self
                        .listener
                        .send_event(TermEvent::PtyWrite(b"\x1b/Z".to_vec())),
                    b'=' => {
                        self.state.term_mode.insert(TermMode::APP_KEYPAD);
                    }
                    b'>' => {
                        self.state.term_mode.remove(TermMode::APP_KEYPAD);
                    }
                    b'<' => {
                        // Back to ANSI operation.
                        self.state.term_mode.insert(TermMode::ANSI);
                    }
                    _ => debug!("Unhandled VT52 escape {:?}", byte as char),
                }
            }
            Vt52Stage::CupRow => {
                self.vt52.row = byte.saturating_sub(0x20);
                self.vt52.stage = Vt52Stage::CupColumn;
            }
            Vt52Stage::CupColumn => {
                let col = byte.saturating_sub(0x20);
                self.screen.goto(self.vt52.row as i32, col as usize);
                self.vt52.stage = Vt52Stage::Ground;
            }
        }
    }

    /// Send typed or pasted text, honoring bracketed paste mode.
    pub fn send_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }

        let mut bytes = Vec::with_capacity(text.len() + 12);
        if self.state.term_mode.contains(TermMode::BRACKETED_PASTE) {
            bytes.extend_from_slice(b"\x1b[200~");
            bytes.extend_from_slice(text.as_bytes());
            bytes.extend_from_slice(b"\x1b[201~");
        } else {
            bytes.extend_from_slice(text.as_bytes());
        }

        self.listener.send_event(TermEvent::PtyWrite(bytes));
    }

    /// Encode a key press through the external translator.
    pub fn send_key_event(&mut self, event: &KeyEvent, encoder: &dyn KeyEncoder) {
        let bytes = encoder.encode(event, self.state.term_mode);
        if !bytes.is_empty() {
            self.listener.send_event(TermEvent::PtyWrite(bytes));
        }
    }

    /// Encode a mouse event for the active tracking mode.
    ///
    /// `column` and `line` are one-based screen coordinates.
    pub fn send_mouse_event(
        &mut self,
        button: MouseButton,
        event: MouseEventType,
        mods: Modifiers,
        column: usize,
        line: usize,
    ) {
        let mode = self.state.term_mode;

        // Wheel events outside mouse mode scroll the alternate screen
        // via arrow keys.
        if !mode.intersects(TermMode::MOUSE_MODE)
            && mode.contains(TermMode::ALTERNATE_SCROLL)
            && mode.contains(TermMode::ALT_SCREEN)
            && event == MouseEventType::Press
        {
            if let Some(bytes) = alternate_scroll_bytes(button, mode) {
                self.listener.send_event(TermEvent::PtyWrite(bytes));
                return;
            }
        }

        if let Some(bytes) = encode_mouse(button, event, mods, column, line, mode) {
            self.listener.send_event(TermEvent::PtyWrite(bytes));
        }
    }

    /// Report focus changes to the child when it asked for them.
    pub fn focus_changed(&mut self, focused: bool) {
        if self.state.term_mode.contains(TermMode::FOCUS_IN_OUT) {
            let report: &[u8] = if focused { b"\x1b[I" } else { b"\x1b[O" };
            self.listener.send_event(TermEvent::PtyWrite(report.to_vec()));
        }
    }

    /// Flush buffered session attributes, in id order.
    ///
    /// Driven by the embedder when the coalescing timer fires.
    pub fn flush_session_attributes(&mut self) {
        self.attr_timer.clear_timeout();
        for (id, value) in std::mem::take(&mut self.state.pending_attrs) {
            self.listener
                .send_event(TermEvent::SessionAttribute { id, value });
        }
    }

    /// Reset the emulation.
    ///
    /// Any in-progress OSC/DCS/sixel/tmux accumulation is aborted and
    /// the parser returns to ground. A hard reset additionally clears
    /// the mode vector (keeping only the 132-column permission), the
    /// palette, the charsets, and the tmux command queue, whose pending
    /// commands fail with a synthetic error.
    pub fn reset(&mut self, soft: bool, preserve_prompt: bool) {
        self.parser.reset();
        self.state.sixel = None;
        self.state.preceding_char = None;
        self.state.parse_interrupt = false;
        self.state.pending_hard_reset = false;
        self.vt52 = Vt52State::default();
        self.probe.clear();
        self.at_line_start = true;

        let allow_column_change = self
            .state
            .term_mode
            .contains(TermMode::ALLOW_COLUMN_CHANGE);
        self.state.term_mode = TermMode::default();
        self.state
            .term_mode
            .set(TermMode::ALLOW_COLUMN_CHANGE, allow_column_change);
        self.state.saved_mode = self.state.term_mode;
        self.state.saved_origin = false;

        self.screen.set_origin_mode(false);
        self.screen.set_insert_mode(false);
        self.screen.set_wrap_mode(true);
        self.screen.set_cursor_visible(true);
        self.screen.set_scrolling_region(1, None);

        if soft {
            self.tmux.abort_line();
        } else {
            self.state.charsets = Default::default();
            self.state.palette = default_palette();
            self.state.pending_attrs.clear();
            self.state.title = None;
            self.state.title_stack.clear();
            self.state.sixel_shared_palette = None;
            self.attr_timer.clear_timeout();
            self.tmux.disconnect("terminal reset");
            self.screen.reset_state(preserve_prompt);
            self.screen.goto(0, 0);
        }

        self.state
            .term_mode
            .set(TermMode::TMUX, self.tmux.is_active());
    }
}

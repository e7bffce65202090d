//! Parser for implementing virtual terminal emulators
//!
//! [`Parser`] follows [Paul Williams' ANSI parser state machine]. The
//! state machine itself assigns no meaning to the parsed data; an
//! implementation of [`Perform`] receives the decoded actions and does
//! something useful with them. The [`Parser`] handles the book keeping,
//! and the [`Perform`] gets to simply handle actions.
//!
//! # Differences from the original state machine description
//!
//! * UTF-8 support for input
//! * OSC strings can be terminated by 0x07
//! * APC payloads are dispatched through [`Perform::apc_put`]
//! * Only 7-bit codes are fully supported; a few 8-bit codes keep
//!   working, but not in all states
//!
//! [Paul Williams' ANSI parser state machine]: https://vt100.net/emu/dec_ansi_parser
#![deny(clippy::if_not_else, clippy::enum_glob_use)]

use core::mem::MaybeUninit;
use core::str;

mod definitions;
mod params;
mod table;

use definitions::{unpack, Action, State};
pub use params::{Params, ParamsIter};

const MAX_INTERMEDIATES: usize = 2;
const MAX_OSC_PARAMS: usize = 16;

/// Operating System Command payloads beyond this many bytes are dropped.
///
/// Session attributes such as window titles are clamped to this length;
/// the sequence still terminates cleanly when oversized.
const MAX_OSC_RAW: usize = 256;

/// Which kind of control string a `SosPmApcString` state is carrying.
#[derive(Default, Copy, Clone, PartialEq, Eq)]
enum StringKind {
    #[default]
    Sos,
    Pm,
    Apc,
}

/// Parser for the raw VT protocol which delegates actions to a [`Perform`].
#[derive(Default)]
pub struct Parser {
    state: State,
    intermediates: [u8; MAX_INTERMEDIATES],
    intermediate_idx: usize,
    params: Params,
    param: u16,
    osc_raw: Vec<u8>,
    osc_params: [(usize, usize); MAX_OSC_PARAMS],
    osc_num_params: usize,
    ignoring: bool,
    string_kind: StringKind,
    partial_utf8: [u8; 4],
    partial_utf8_len: usize,
}

impl Parser {
    /// Create a new Parser.
    pub fn new() -> Parser {
        Default::default()
    }

    /// Whether the parser is mid-sequence.
    #[inline]
    pub fn in_escape_sequence(&self) -> bool {
        self.state != State::Ground
    }

    /// Abort any sequence in progress and return to ground.
    ///
    /// Accumulated parameters, string payloads, and partial UTF-8 bytes
    /// are discarded without dispatching; no `unhook`/`osc_dispatch`
    /// callbacks fire.
    pub fn reset(&mut self) {
        self.state = State::Ground;
        self.reset_params();
        self.osc_raw.clear();
        self.osc_num_params = 0;
        self.partial_utf8_len = 0;
        self.string_kind = StringKind::default();
    }

    #[inline]
    fn params(&self) -> &Params {
        &self.params
    }

    #[inline]
    fn intermediates(&self) -> &[u8] {
        &self.intermediates[..self.intermediate_idx]
    }

    /// Advance the parser state.
    ///
    /// Requires a [`Perform`] implementation to handle the triggered
    /// actions.
    #[inline]
    pub fn advance<P: Perform>(&mut self, performer: &mut P, bytes: &[u8]) {
        let mut i = 0;

        // Handle partial codepoints from previous calls to `advance`.
        if self.partial_utf8_len > 0 {
            i += self.advance_partial_utf8(performer, bytes);
        }

        while i != bytes.len() {
            match self.state {
                State::Ground => i += self.advance_ground(performer, &bytes[i..]),
                _ => {
                    let byte = bytes[i];
                    self.change_state(performer, byte);
                    i += 1;
                }
            }
        }
    }

    /// Partially advance the parser state.
    ///
    /// This is equivalent to [`Self::advance`], but stops as soon as
    /// [`Perform::terminated`] returns true after a processed byte.
    ///
    /// Returns the number of bytes read before termination.
    #[inline]
    #[must_use = "Returned value should be used to process the remaining bytes"]
    pub fn advance_until_terminated<P: Perform>(
        &mut self,
        performer: &mut P,
        bytes: &[u8],
    ) -> usize {
        let mut i = 0;

        if self.partial_utf8_len != 0 {
            i += self.advance_partial_utf8(performer, bytes);
        }

        while i != bytes.len() && !performer.terminated() {
            match self.state {
                State::Ground => i += self.advance_ground(performer, &bytes[i..]),
                _ => {
                    let byte = bytes[i];
                    self.change_state(performer, byte);
                    i += 1;
                }
            }
        }

        i
    }

    /// Look up and perform a single state change outside of ground.
    #[inline]
    fn change_state<P: Perform>(&mut self, performer: &mut P, byte: u8) {
        // The `Anywhere` transitions take precedence over the current
        // state's row.
        let mut change = table::STATE_CHANGES[State::Anywhere as usize][byte as usize];
        if change == 0 {
            change = table::STATE_CHANGES[self.state as usize][byte as usize];
        }

        let (state, action) = unpack(change);
        self.perform_state_change(performer, state, action, byte);
    }

    #[inline]
    fn perform_state_change<P>(
        &mut self,
        performer: &mut P,
        state: State,
        action: Action,
        byte: u8,
    ) where
        P: Perform,
    {
        // An `Anywhere` target means the state is unchanged.
        if state == State::Anywhere {
            self.perform_action(performer, action, byte);
            return;
        }

        // Exit actions for the state being left.
        match self.state {
            State::DcsPassthrough => performer.unhook(),
            State::SosPmApcString => {
                if self.string_kind == StringKind::Apc {
                    performer.apc_end();
                }
            }
            State::OscString => {
                let param_idx = self.osc_num_params;
                let idx = self.osc_raw.len();

                match param_idx {
                    // Finish last parameter if not already maxed.
                    MAX_OSC_PARAMS => (),

                    // First param is special - 0 to current byte index.
                    0 => {
                        self.osc_params[param_idx] = (0, idx);
                        self.osc_num_params += 1;
                    }

                    // All other params depend on previous indexing.
                    _ => {
                        let prev = self.osc_params[param_idx - 1];
                        let begin = prev.1;
                        self.osc_params[param_idx] = (begin, idx);
                        self.osc_num_params += 1;
                    }
                }
                self.osc_dispatch(performer, byte);
            }
            _ => (),
        }

        if action == Action::None {
            // Entry actions for the state being entered.
            match state {
                State::CsiEntry | State::DcsEntry | State::Escape => self.reset_params(),
                State::DcsPassthrough => {
                    if self.params.is_full() {
                        self.ignoring = true;
                    } else {
                        self.params.push(self.param);
                    }

                    performer.hook(
                        self.params(),
                        self.intermediates(),
                        self.ignoring,
                        byte as char,
                    );
                }
                State::OscString => {
                    self.osc_raw.clear();
                    self.osc_num_params = 0;
                }
                State::SosPmApcString => {
                    self.string_kind = match byte {
                        0x5e => StringKind::Pm,
                        0x5f => StringKind::Apc,
                        _ => StringKind::Sos,
                    };
                    if self.string_kind == StringKind::Apc {
                        performer.apc_start();
                    }
                }
                _ => (),
            }
        } else {
            self.perform_action(performer, action, byte);
        }

        self.state = state;
    }

    #[inline]
    fn perform_action<P: Perform>(&mut self, performer: &mut P, action: Action, byte: u8) {
        match action {
            Action::Execute => performer.execute(byte),
            Action::Put => performer.put(byte),
            Action::StrPut => {
                if self.string_kind == StringKind::Apc {
                    performer.apc_put(byte);
                }
            }
            Action::OscPut => {
                let idx = self.osc_raw.len();

                // Param separator.
                if byte == b';' {
                    let param_idx = self.osc_num_params;
                    match param_idx {
                        // Only process up to MAX_OSC_PARAMS.
                        MAX_OSC_PARAMS => return,

                        // First param is special - 0 to current byte index.
                        0 => {
                            self.osc_params[param_idx] = (0, idx);
                        }

                        // All other params depend on previous indexing.
                        _ => {
                            let prev = self.osc_params[param_idx - 1];
                            let begin = prev.1;
                            self.osc_params[param_idx] = (begin, idx);
                        }
                    }

                    self.osc_num_params += 1;
                } else if idx < MAX_OSC_RAW {
                    self.osc_raw.push(byte);
                }
            }
            Action::CsiDispatch => {
                if self.params.is_full() {
                    self.ignoring = true;
                } else {
                    self.params.push(self.param);
                }

                performer.csi_dispatch(
                    self.params(),
                    self.intermediates(),
                    self.ignoring,
                    byte as char,
                );
            }
            Action::EscDispatch => {
                performer.esc_dispatch(self.intermediates(), self.ignoring, byte);
            }
            Action::Collect => {
                if self.intermediate_idx == MAX_INTERMEDIATES {
                    self.ignoring = true;
                } else {
                    self.intermediates[self.intermediate_idx] = byte;
                    self.intermediate_idx += 1;
                }
            }
            Action::Param => {
                if self.params.is_full() {
                    self.ignoring = true;
                    return;
                }

                match byte {
                    b';' => {
                        self.params.push(self.param);
                        self.param = 0;
                    }
                    b':' => {
                        self.params.extend(self.param);
                        self.param = 0;
                    }
                    _ => {
                        // Continue collecting digits into the parameter.
                        self.param = self.param.saturating_mul(10);
                        self.param = self.param.saturating_add((byte - b'0') as u16);
                    }
                }
            }
            _ => (),
        }
    }

    /// Reset escape sequence parameters and intermediates.
    #[inline]
    fn reset_params(&mut self) {
        self.intermediate_idx = 0;
        self.ignoring = false;
        self.param = 0;

        self.params.clear();
    }

    /// Separate method for osc_dispatch that borrows self as read-only.
    ///
    /// The aliasing is needed here for multiple slices into self.osc_raw.
    #[inline]
    fn osc_dispatch<P: Perform>(&self, performer: &mut P, byte: u8) {
        let mut slices: [MaybeUninit<&[u8]>; MAX_OSC_PARAMS] =
            unsafe { MaybeUninit::uninit().assume_init() };

        for (i, slice) in slices.iter_mut().enumerate().take(self.osc_num_params) {
            let indices = self.osc_params[i];
            *slice = MaybeUninit::new(&self.osc_raw[indices.0..indices.1]);
        }

        unsafe {
            let num_params = self.osc_num_params;
            let params = &slices[..num_params] as *const [MaybeUninit<&[u8]>]
                as *const [&[u8]];
            performer.osc_dispatch(&*params, byte == 0x07);
        }
    }

    /// Advance the parser state from ground.
    ///
    /// The ground state is handled separately since it can only be left
    /// via the escape character (`\x1b`), which allows a SIMD search with
    /// [`memchr`].
    #[inline]
    fn advance_ground<P: Perform>(&mut self, performer: &mut P, bytes: &[u8]) -> usize {
        // Find the next escape character.
        let num_bytes = bytes.len();
        let plain_chars = memchr::memchr(0x1B, bytes).unwrap_or(num_bytes);

        // If the next character is ESC, just process it and short-circuit.
        if plain_chars == 0 {
            self.state = State::Escape;
            self.reset_params();
            return 1;
        }

        match str::from_utf8(&bytes[..plain_chars]) {
            Ok(parsed) => {
                Self::ground_dispatch(performer, parsed);
                let mut processed = plain_chars;

                // If there's another character, it must be escape so process it directly.
                if processed < num_bytes {
                    self.state = State::Escape;
                    self.reset_params();
                    processed += 1;
                }

                processed
            }
            // Handle invalid and partial utf8.
            Err(err) => {
                // Dispatch all the valid bytes.
                let valid_bytes = err.valid_up_to();
                let parsed = unsafe { str::from_utf8_unchecked(&bytes[..valid_bytes]) };
                Self::ground_dispatch(performer, parsed);

                match err.error_len() {
                    Some(len) => {
                        // Execute C1 escapes or emit replacement character.
                        if len == 1 && bytes[valid_bytes] <= 0x9F {
                            performer.execute(bytes[valid_bytes]);
                        } else {
                            performer.print(char::REPLACEMENT_CHARACTER);
                        }

                        // Restart processing after the invalid bytes.
                        //
                        // While we could theoretically try to just re-parse
                        // `bytes[valid_bytes + len..plain_chars]`, it's easier
                        // to just skip it and invalid utf8 is pretty rare anyway.
                        valid_bytes + len
                    }
                    None => {
                        if plain_chars < num_bytes {
                            // Process bytes cut off by escape.
                            performer.print(char::REPLACEMENT_CHARACTER);
                            self.state = State::Escape;
                            self.reset_params();
                            plain_chars + 1
                        } else {
                            // Process bytes cut off by the buffer end.
                            let extra_bytes = num_bytes - valid_bytes;
                            let partial_len = self.partial_utf8_len + extra_bytes;
                            self.partial_utf8[self.partial_utf8_len..partial_len]
                                .copy_from_slice(
                                    &bytes[valid_bytes..valid_bytes + extra_bytes],
                                );
                            self.partial_utf8_len = partial_len;
                            num_bytes
                        }
                    }
                }
            }
        }
    }

    /// Advance the parser while processing a partial utf8 codepoint.
    #[inline]
    fn advance_partial_utf8<P: Perform>(
        &mut self,
        performer: &mut P,
        bytes: &[u8],
    ) -> usize {
        // Try to copy up to 3 more characters, to ensure the codepoint is complete.
        let old_bytes = self.partial_utf8_len;
        let to_copy = bytes.len().min(self.partial_utf8.len() - old_bytes);
        self.partial_utf8[old_bytes..old_bytes + to_copy]
            .copy_from_slice(&bytes[..to_copy]);
        self.partial_utf8_len += to_copy;

        // Parse the unicode character.
        match str::from_utf8(&self.partial_utf8[..self.partial_utf8_len]) {
            // If the entire buffer is valid, use the first character and continue parsing.
            Ok(parsed) => {
                let c = unsafe { parsed.chars().next().unwrap_unchecked() };
                performer.print(c);

                self.partial_utf8_len = 0;
                c.len_utf8() - old_bytes
            }
            Err(err) => {
                match err.error_len() {
                    // If the partial character was also invalid, emit the replacement
                    // character.
                    Some(invalid_len) => {
                        performer.print(char::REPLACEMENT_CHARACTER);

                        self.partial_utf8_len = 0;
                        invalid_len - old_bytes
                    }
                    None => {
                        // If we have any valid bytes, that means we partially copied another
                        // utf8 character into `partial_utf8`. Since we only care about the
                        // first character, we just ignore the rest.
                        let valid_bytes = err.valid_up_to();
                        if valid_bytes > 0 {
                            let c = unsafe {
                                let parsed = str::from_utf8_unchecked(
                                    &self.partial_utf8[..valid_bytes],
                                );
                                parsed.chars().next().unwrap_unchecked()
                            };
                            performer.print(c);

                            self.partial_utf8_len = 0;
                            valid_bytes - old_bytes
                        } else {
                            // If the character still isn't complete, wait for more data.
                            bytes.len()
                        }
                    }
                }
            }
        }
    }

    /// Handle ground dispatch of print/execute for all characters in a string.
    #[inline]
    fn ground_dispatch<P: Perform>(performer: &mut P, text: &str) {
        for c in text.chars() {
            match c {
                '\x00'..='\x1f' | '\u{80}'..='\u{9f}' => performer.execute(c as u8),
                _ => performer.print(c),
            }
        }
    }
}

/// Performs actions requested by the Parser.
///
/// Actions in this case mean, for example, handling a CSI escape sequence
/// describing cursor movement, or simply printing characters to the
/// screen.
///
/// The methods on this type correspond to the actions described in
/// <http://vt100.net/emu/dec_ansi_parser>, plus the APC additions.
pub trait Perform {
    /// Draw a character to the screen and update states.
    fn print(&mut self, _c: char) {}

    /// Execute a C0 or C1 control function.
    fn execute(&mut self, _byte: u8) {}

    /// Invoked when a final character arrives in the first part of a
    /// device control string.
    ///
    /// The control function should be determined from the private marker,
    /// final character, and the parameter list. A handler should be
    /// selected for remaining characters in the string; the handler
    /// function should subsequently be called by `put` for every
    /// character in the control string.
    ///
    /// The `ignore` flag indicates that more than two intermediates
    /// arrived and subsequent characters were ignored.
    fn hook(&mut self, _params: &Params, _intermediates: &[u8], _ignore: bool, _action: char) {
    }

    /// Pass bytes as part of a device control string to the handler
    /// chosen in `hook`. C0 controls will also be passed to the handler.
    fn put(&mut self, _byte: u8) {}

    /// Called when a device control string is terminated.
    ///
    /// The previously selected handler should be notified that the DCS
    /// has terminated.
    fn unhook(&mut self) {}

    /// Dispatch an operating system command.
    fn osc_dispatch(&mut self, _params: &[&[u8]], _bell_terminated: bool) {}

    /// A final character has arrived for a CSI sequence.
    ///
    /// The `ignore` flag indicates that either more than two intermediates
    /// arrived or the number of parameters exceeded the maximum supported
    /// length, and subsequent characters were ignored.
    fn csi_dispatch(
        &mut self,
        _params: &Params,
        _intermediates: &[u8],
        _ignore: bool,
        _action: char,
    ) {
    }

    /// The final character of an escape sequence has arrived.
    ///
    /// The `ignore` flag indicates that more than two intermediates
    /// arrived and subsequent characters were ignored.
    fn esc_dispatch(&mut self, _intermediates: &[u8], _ignore: bool, _byte: u8) {}

    /// An application program command string has started.
    fn apc_start(&mut self) {}

    /// A byte of an application program command payload.
    fn apc_put(&mut self, _byte: u8) {}

    /// The application program command string has been terminated.
    fn apc_end(&mut self) {}

    /// Whether the parser should terminate prematurely.
    ///
    /// This can be used in conjunction with
    /// [`Parser::advance_until_terminated`] to stop feeding the state
    /// machine after a dispatch flipped the emulation into a mode the
    /// caller parses differently (tmux control mode, VT52).
    ///
    /// This is checked after every parsed byte, so no expensive
    /// computation should take place in this function.
    #[inline(always)]
    fn terminated(&self) -> bool {
        false
    }
}

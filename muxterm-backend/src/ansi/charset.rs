//! Character-set designation and invocation state.
//!
//! A separate bank is kept for the primary and the alternate screen;
//! each bank designates four G-sets and invokes one of G0/G1 through
//! SI/SO. The invoked set is reduced to the two VT100 "tricks" that
//! matter for rendering: the special graphics table and the UK pound
//! substitution.

/// The G-set slot an escape sequence designates into.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CharsetIndex {
    G0 = 0,
    G1 = 1,
    G2 = 2,
    G3 = 3,
}

/// Designable character sets.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum StandardCharset {
    #[default]
    Ascii,
    /// DEC special graphics (line drawing).
    SpecialCharacterAndLineDrawing,
    /// United Kingdom: `#` renders as the pound sign.
    UnitedKingdom,
}

/// The VT100 special graphics glyphs for code points `0x5f..=0x7e`.
pub const VT100_LINE_DRAWING: [char; 32] = [
    '\u{0020}', '\u{25c6}', '\u{2592}', '\u{2409}', '\u{240c}', '\u{240d}', '\u{240a}',
    '\u{00b0}', '\u{00b1}', '\u{2424}', '\u{240b}', '\u{2518}', '\u{2510}', '\u{250c}',
    '\u{2514}', '\u{253c}', '\u{23ba}', '\u{23bb}', '\u{2500}', '\u{23bc}', '\u{23bd}',
    '\u{251c}', '\u{2524}', '\u{2534}', '\u{252c}', '\u{2502}', '\u{2264}', '\u{2265}',
    '\u{03c0}', '\u{2260}', '\u{00a3}', '\u{00b7}',
];

/// One screen's worth of charset state.
#[derive(Debug, Clone)]
pub struct CharsetState {
    slots: [StandardCharset; 4],
    current: usize,
    graphic: bool,
    pound: bool,
    saved_graphic: bool,
    saved_pound: bool,
}

impl Default for CharsetState {
    fn default() -> Self {
        Self {
            slots: [StandardCharset::Ascii; 4],
            current: 0,
            graphic: false,
            pound: false,
            saved_graphic: false,
            saved_pound: false,
        }
    }
}

impl CharsetState {
    /// Designate a character set into one of the G slots.
    pub fn designate(&mut self, index: CharsetIndex, charset: StandardCharset) {
        self.slots[index as usize] = charset;
        if index as usize == self.current {
            self.refresh();
        }
    }

    /// Invoke one of the G slots as the active set.
    pub fn invoke(&mut self, index: CharsetIndex) {
        self.current = index as usize;
        self.refresh();
    }

    fn refresh(&mut self) {
        let charset = self.slots[self.current];
        self.graphic = charset == StandardCharset::SpecialCharacterAndLineDrawing;
        self.pound = charset == StandardCharset::UnitedKingdom;
    }

    /// Record the invocation flags for DECSC.
    pub fn save(&mut self) {
        self.saved_graphic = self.graphic;
        self.saved_pound = self.pound;
    }

    /// Restore the invocation flags for DECRC.
    pub fn restore(&mut self) {
        self.graphic = self.saved_graphic;
        self.pound = self.saved_pound;
    }

    /// Translate a printable character through the invoked set.
    pub fn apply(&self, c: char) -> char {
        if self.graphic && ('\u{5f}'..='\u{7e}').contains(&c) {
            VT100_LINE_DRAWING[c as usize - 0x5f]
        } else if self.pound && c == '#' {
            '£'
        } else {
            c
        }
    }

    /// Whether the special graphics set is invoked.
    pub fn graphic(&self) -> bool {
        self.graphic
    }

    /// Force the graphics flag, used by the VT52 `ESC F`/`ESC G` pair.
    pub fn set_graphic(&mut self, graphic: bool) {
        self.graphic = graphic;
    }
}

/// Map a designation final byte to a charset.
pub fn charset_from_byte(byte: u8) -> Option<StandardCharset> {
    match byte {
        b'B' | b'1' | b'@' => Some(StandardCharset::Ascii),
        b'0' | b'2' => Some(StandardCharset::SpecialCharacterAndLineDrawing),
        b'A' => Some(StandardCharset::UnitedKingdom),
        _ => None,
    }
}

use bitflags::bitflags;

/// ANSI modes, as set by `CSI Pm h` and reset by `CSI Pm l`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum NamedMode {
    /// IRM insert/replace.
    Insert = 4,
    /// LNM linefeed/new-line.
    LineFeedNewLine = 20,
}

/// An ANSI mode number, known or not.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Mode {
    Named(NamedMode),
    Unknown(u16),
}

impl Mode {
    pub fn new(mode: u16) -> Self {
        match mode {
            4 => Self::Named(NamedMode::Insert),
            20 => Self::Named(NamedMode::LineFeedNewLine),
            _ => Self::Unknown(mode),
        }
    }

    /// Get the raw mode number.
    pub fn raw(self) -> u16 {
        match self {
            Self::Named(named) => named as u16,
            Self::Unknown(mode) => mode,
        }
    }
}

impl From<NamedMode> for Mode {
    fn from(named: NamedMode) -> Self {
        Self::Named(named)
    }
}

/// Private DEC modes, as set by `CSI ? Pm h` and reset by `CSI ? Pm l`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum NamedPrivateMode {
    /// DECCKM cursor keys send application sequences.
    CursorKeys = 1,
    /// DECANM; resetting it drops into VT52 emulation.
    AnsiMode = 2,
    /// DECCOLM 80/132 column switch.
    ColumnMode = 3,
    /// DECOM constrain the cursor to the scrolling region.
    Origin = 6,
    /// DECAWM wrap at the right margin.
    LineWrap = 7,
    BlinkingCursor = 12,
    ShowCursor = 25,
    /// Gate for `ColumnMode`.
    Allow132Columns = 40,
    /// DECSDM sixel display mode; when reset, sixels scroll.
    SixelDisplay = 80,
    /// Report mouse press and release.
    ReportMouseClicks = 1000,
    /// Highlight mouse tracking.
    HighlightMouseMotion = 1001,
    /// Report mouse motion while a button is held.
    ReportCellMouseMotion = 1002,
    /// Report all mouse motion.
    ReportAllMouseMotion = 1003,
    ReportFocusInOut = 1004,
    /// UTF-8 extended coordinates.
    Utf8Mouse = 1005,
    /// SGR extended coordinates.
    SgrMouse = 1006,
    /// Wheel events become arrow keys on the alternate screen.
    AlternateScroll = 1007,
    /// Urxvt extended coordinates.
    UrxvtMouse = 1015,
    /// Alternate screen without cursor bookkeeping.
    AltScreen = 1047,
    /// Save/restore the cursor as a side channel for 1049.
    SaveCursor = 1048,
    SwapScreenAndSetRestoreCursor = 1049,
    /// Use a private palette for each sixel graphic.
    SixelPrivateColorRegisters = 1070,
    BracketedPaste = 2004,
    /// Sixel scrolling leaves the cursor to the right of the graphic.
    SixelCursorToTheRight = 8452,
}

/// A private DEC mode number, known or not.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PrivateMode {
    Named(NamedPrivateMode),
    Unknown(u16),
}

impl PrivateMode {
    pub fn new(mode: u16) -> Self {
        match mode {
            1 => Self::Named(NamedPrivateMode::CursorKeys),
            2 => Self::Named(NamedPrivateMode::AnsiMode),
            3 => Self::Named(NamedPrivateMode::ColumnMode),
            6 => Self::Named(NamedPrivateMode::Origin),
            7 => Self::Named(NamedPrivateMode::LineWrap),
            12 => Self::Named(NamedPrivateMode::BlinkingCursor),
            25 => Self::Named(NamedPrivateMode::ShowCursor),
            40 => Self::Named(NamedPrivateMode::Allow132Columns),
            80 => Self::Named(NamedPrivateMode::SixelDisplay),
            1000 => Self::Named(NamedPrivateMode::ReportMouseClicks),
            1001 => Self::Named(NamedPrivateMode::HighlightMouseMotion),
            1002 => Self::Named(NamedPrivateMode::ReportCellMouseMotion),
            1003 => Self::Named(NamedPrivateMode::ReportAllMouseMotion),
            1004 => Self::Named(NamedPrivateMode::ReportFocusInOut),
            1005 => Self::Named(NamedPrivateMode::Utf8Mouse),
            1006 => Self::Named(NamedPrivateMode::SgrMouse),
            1007 => Self::Named(NamedPrivateMode::AlternateScroll),
            1015 => Self::Named(NamedPrivateMode::UrxvtMouse),
            1047 => Self::Named(NamedPrivateMode::AltScreen),
            1048 => Self::Named(NamedPrivateMode::SaveCursor),
            1049 => Self::Named(NamedPrivateMode::SwapScreenAndSetRestoreCursor),
            1070 => Self::Named(NamedPrivateMode::SixelPrivateColorRegisters),
            2004 => Self::Named(NamedPrivateMode::BracketedPaste),
            8452 => Self::Named(NamedPrivateMode::SixelCursorToTheRight),
            _ => Self::Unknown(mode),
        }
    }

    /// Get the raw mode number.
    pub fn raw(self) -> u16 {
        match self {
            Self::Named(named) => named as u16,
            Self::Unknown(mode) => mode,
        }
    }
}

impl From<NamedPrivateMode> for PrivateMode {
    fn from(named: NamedPrivateMode) -> Self {
        Self::Named(named)
    }
}

bitflags! {
    /// The emulator's mode bit-vector.
    ///
    /// A saved copy of the whole vector backs XTSAVE/XTRESTORE.
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub struct TermMode: u32 {
        const NONE                    = 0;
        const SHOW_CURSOR             = 1;
        const APP_CURSOR              = 1 << 1;
        const APP_KEYPAD              = 1 << 2;
        const MOUSE_REPORT_CLICK      = 1 << 3;
        const MOUSE_HIGHLIGHT         = 1 << 4;
        const MOUSE_DRAG              = 1 << 5;
        const MOUSE_MOTION            = 1 << 6;
        const UTF8_MOUSE              = 1 << 7;
        const SGR_MOUSE               = 1 << 8;
        const URXVT_MOUSE             = 1 << 9;
        const ALTERNATE_SCROLL        = 1 << 10;
        const BRACKETED_PASTE         = 1 << 11;
        const LINE_WRAP               = 1 << 12;
        const LINE_FEED_NEW_LINE      = 1 << 13;
        const ORIGIN                  = 1 << 14;
        const INSERT                  = 1 << 15;
        const FOCUS_IN_OUT            = 1 << 16;
        const ALT_SCREEN              = 1 << 17;
        /// DECANM; cleared while emulating a VT52.
        const ANSI                    = 1 << 18;
        const COLUMN_132              = 1 << 19;
        const ALLOW_COLUMN_CHANGE     = 1 << 20;
        const SIXEL_DISPLAY           = 1 << 21;
        const SIXEL_PRIV_PALETTE      = 1 << 22;
        const SIXEL_CURSOR_TO_THE_RIGHT = 1 << 23;
        /// Line-oriented tmux control-mode parsing is active.
        const TMUX                    = 1 << 24;
        const BLINKING_CURSOR         = 1 << 25;
        const MOUSE_MODE = Self::MOUSE_REPORT_CLICK.bits()
            | Self::MOUSE_HIGHLIGHT.bits()
            | Self::MOUSE_DRAG.bits()
            | Self::MOUSE_MOTION.bits();
        const ANY                     = u32::MAX;
    }
}

impl Default for TermMode {
    fn default() -> TermMode {
        TermMode::SHOW_CURSOR | TermMode::LINE_WRAP | TermMode::ANSI
    }
}

//! Events emitted by the emulation core towards its embedder.

use crate::colors::ColorRgb;

/// Everything the emulator reports back to the world outside the screen:
/// bytes for the child process, coalesced session attributes, tmux
/// traffic, and rendering hints that are not cell data.
#[derive(Debug, Clone, PartialEq)]
pub enum TermEvent {
    /// Bytes to write to the child process (reports, replies, input).
    PtyWrite(Vec<u8>),

    /// A coalesced session attribute update (title, icon, directory).
    SessionAttribute { id: u16, value: String },

    /// The bell rang.
    Bell,

    /// A desktop notification requested through OSC 777.
    Notification { title: String, body: String },

    /// A palette entry changed through OSC 4.
    PaletteUpdated { index: usize, color: ColorRgb },

    /// OSC 104 palette reset; `None` resets every entry.
    PaletteReset(Option<usize>),

    /// A dynamic color (OSC 10/11/12/17/19) changed.
    DynamicColorChanged { code: usize, color: ColorRgb },

    /// Output for a tmux pane, unescaped.
    TmuxOutput { pane: i64, bytes: Vec<u8> },

    /// The tmux client left control mode.
    TmuxExited { reason: String },

    /// The tmux session list should be re-read.
    TmuxSessionsChanged,

    /// The active tmux session changed.
    TmuxSessionChanged { session: i64, name: String },

    /// A tmux window appeared or disappeared.
    TmuxWindowAdded { window: i64 },
    TmuxWindowClosed { window: i64 },

    /// A tmux window layout changed.
    TmuxLayoutChanged { window: i64, layout: String },

    /// A tmux server message for the user.
    TmuxMessage(String),
}

/// Receiver for [`TermEvent`]s.
///
/// Implementations must not call back into the emulator from
/// `send_event`; buffer the event and act on it after `receive`
/// returns.
pub trait EventListener {
    fn send_event(&self, event: TermEvent);
}

/// A listener that drops everything, useful for tests and tools that
/// only care about screen state.
#[derive(Debug, Default, Clone)]
pub struct VoidListener;

impl EventListener for VoidListener {
    fn send_event(&self, _event: TermEvent) {}
}

//! Per-notification argument parsers for tmux control mode.
//!
//! Each `%…` line is classified into a [`Notification`] variant which
//! consumes the remainder of the line byte by byte through
//! [`Notification::push_byte`] and fires into the server controller on
//! end of line through [`Notification::execute`]. Parse failures are
//! logged and leave the variant in an error state; the stream itself
//! stays in control mode.

use std::sync::OnceLock;

use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use crate::event::EventListener;
use crate::tmux::server::TmuxServer;

/// Every line type the control-mode lexer can recognize.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    Begin,
    End,
    Error,
    ClientDetached,
    ClientSessionChanged,
    ConfigError,
    Continue,
    Exit,
    ExtendedOutput,
    LayoutChange,
    Message,
    Output,
    PaneModeChanged,
    PasteBufferChanged,
    PasteBufferDeleted,
    Pause,
    SessionChanged,
    SessionRenamed,
    SessionWindowChanged,
    SessionsChanged,
    SubscriptionChanged,
    UnlinkedWindowAdd,
    UnlinkedWindowClose,
    UnlinkedWindowRenamed,
    WindowAdd,
    WindowClose,
    WindowPaneChanged,
    WindowRenamed,
}

/// Look up the kind for the token following the `%` introducer.
pub fn kind_for_token(token: &[u8]) -> Option<NotificationKind> {
    static LOOKUP: OnceLock<FxHashMap<&'static [u8], NotificationKind>> = OnceLock::new();

    let lookup = LOOKUP.get_or_init(|| {
        use NotificationKind::*;

        let mut table: FxHashMap<&'static [u8], NotificationKind> = FxHashMap::default();
        table.insert(b"begin".as_ref(), Begin);
        table.insert(b"end".as_ref(), End);
        table.insert(b"error".as_ref(), Error);
        table.insert(b"client-detached".as_ref(), ClientDetached);
        table.insert(b"client-session-changed".as_ref(), ClientSessionChanged);
        table.insert(b"config-error".as_ref(), ConfigError);
        table.insert(b"continue".as_ref(), Continue);
        table.insert(b"exit".as_ref(), Exit);
        table.insert(b"extended-output".as_ref(), ExtendedOutput);
        table.insert(b"layout-change".as_ref(), LayoutChange);
        table.insert(b"message".as_ref(), Message);
        table.insert(b"output".as_ref(), Output);
        table.insert(b"pane-mode-changed".as_ref(), PaneModeChanged);
        table.insert(b"paste-buffer-changed".as_ref(), PasteBufferChanged);
        table.insert(b"paste-buffer-deleted".as_ref(), PasteBufferDeleted);
        table.insert(b"pause".as_ref(), Pause);
        table.insert(b"session-changed".as_ref(), SessionChanged);
        table.insert(b"session-renamed".as_ref(), SessionRenamed);
        table.insert(b"session-window-changed".as_ref(), SessionWindowChanged);
        table.insert(b"sessions-changed".as_ref(), SessionsChanged);
        table.insert(b"subscription-changed".as_ref(), SubscriptionChanged);
        table.insert(b"unlinked-window-add".as_ref(), UnlinkedWindowAdd);
        table.insert(b"unlinked-window-close".as_ref(), UnlinkedWindowClose);
        table.insert(b"unlinked-window-renamed".as_ref(), UnlinkedWindowRenamed);
        table.insert(b"window-add".as_ref(), WindowAdd);
        table.insert(b"window-close".as_ref(), WindowClose);
        table.insert(b"window-pane-changed".as_ref(), WindowPaneChanged);
        table.insert(b"window-renamed".as_ref(), WindowRenamed);
        table
    });

    lookup.get(token).copied()
}

/// Parse a tmux id argument with the given sigil.
///
/// `<sigil>*` is the wildcard and maps to -1; `<sigil><digits>` is the
/// id itself. Anything else is a parse error.
pub fn parse_tmux_id(sigil: u8, bytes: &[u8]) -> Option<i64> {
    if bytes.len() == 2 && bytes[0] == sigil && bytes[1] == b'*' {
        return Some(-1);
    }

    if bytes.len() >= 2 && bytes[0] == sigil {
        let mut id: i64 = 0;
        for &byte in &bytes[1..] {
            if !byte.is_ascii_digit() {
                return None;
            }
            id = id.saturating_mul(10).saturating_add((byte - b'0') as i64);
        }
        return Some(id);
    }

    None
}

pub fn parse_session_id(bytes: &[u8]) -> Option<i64> {
    parse_tmux_id(b'$', bytes)
}

pub fn parse_window_id(bytes: &[u8]) -> Option<i64> {
    parse_tmux_id(b'@', bytes)
}

pub fn parse_pane_id(bytes: &[u8]) -> Option<i64> {
    parse_tmux_id(b'%', bytes)
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// Streaming decoder for the 3-digit octal escapes in `%output` lines.
#[derive(Debug, Default, Clone)]
pub struct OctalDecoder {
    /// Number of octal digits consumed, zero when no escape is open.
    digits: u8,
    value: u16,
}

impl OctalDecoder {
    /// Feed one byte, appending decoded output to `out`.
    pub fn feed(&mut self, byte: u8, out: &mut Vec<u8>) {
        if byte == b'\\' {
            // A backslash always starts a fresh escape; a partial one in
            // progress is flushed first.
            self.abort(out);
            self.digits = 0;
            self.value = 0;
            // Mark the escape as open by counting the backslash itself.
            self.digits = 1;
            return;
        }

        if self.digits > 0 {
            if (b'0'..=b'7').contains(&byte) {
                self.value = self.value * 8 + (byte - b'0') as u16;
                self.digits += 1;
                if self.digits == 4 {
                    out.push(self.value as u8);
                    self.digits = 0;
                    self.value = 0;
                }
            } else {
                // Non-octal byte aborts the escape.
                self.abort(out);
                out.push(byte);
            }
            return;
        }

        out.push(byte);
    }

    fn abort(&mut self, out: &mut Vec<u8>) {
        if self.digits > 1 {
            out.push(self.value as u8);
        }
        self.digits = 0;
        self.value = 0;
    }
}

/// `%client-detached client`
#[derive(Debug, Default)]
pub struct ClientDetached {
    client: Vec<u8>,
}

/// `%client-session-changed client session-id name`
#[derive(Debug, Default)]
pub struct ClientSessionChanged {
    arg: u8,
    buf: Vec<u8>,
    client: String,
    session: i64,
}

/// `%extended-output pane-id age ... : value`
#[derive(Debug, Default)]
pub struct ExtendedOutput {
    arg: u8,
    buf: Vec<u8>,
    octal: OctalDecoder,
    pane: i64,
    age: u64,
}

/// `%layout-change window-id window-layout window-visible-layout window-flags`
#[derive(Debug, Default)]
pub struct LayoutChange {
    arg: u8,
    buf: Vec<u8>,
    window: i64,
    layout: String,
    visible_layout: String,
}

/// `%output pane-id value`
#[derive(Debug, Default)]
pub struct Output {
    arg: u8,
    buf: Vec<u8>,
    octal: OctalDecoder,
    pane: i64,
}

/// `%session-changed session-id name`
#[derive(Debug, Default)]
pub struct SessionChanged {
    arg: u8,
    buf: Vec<u8>,
    session: i64,
}

/// `%session-window-changed session-id window-id`
#[derive(Debug, Default)]
pub struct SessionWindowChanged {
    arg: u8,
    buf: Vec<u8>,
    session: i64,
}

/// `%subscription-changed name session-id window-id window-index pane-id ... : value`
#[derive(Debug, Default)]
pub struct SubscriptionChanged {
    arg: u8,
    buf: Vec<u8>,
    name: String,
    session: i64,
    window: i64,
    window_index: i64,
    pane: i64,
}

/// A lone window id argument, `@n`.
#[derive(Debug, Default)]
pub struct WindowIdArg {
    arg: u8,
    window: i64,
    failed: bool,
}

impl WindowIdArg {
    fn push_byte(&mut self, byte: u8, what: &'static str) {
        if self.arg == 0 && byte == b'@' {
            self.arg = 1;
        } else if self.arg == 1 && byte.is_ascii_digit() {
            self.window = self.window * 10 + (byte - b'0') as i64;
        } else {
            self.arg = 2;
            self.window = -2;
            self.failed = true;
            debug!("Expected window ID in {}: unexpected byte {:#04x}", what, byte);
        }
    }
}

/// `%window-pane-changed window-id pane-id`
#[derive(Debug, Default)]
pub struct WindowPaneChanged {
    arg: u8,
    window: i64,
    pane: i64,
}

/// `%window-renamed window-id name`
#[derive(Debug, Default)]
pub struct WindowRenamed {
    arg: u8,
    buf: Vec<u8>,
    window: i64,
}

/// A single text argument running to end of line.
#[derive(Debug, Default)]
pub struct TextArg {
    buf: Vec<u8>,
}

/// A single id argument running to end of line.
#[derive(Debug, Default)]
pub struct IdArg {
    buf: Vec<u8>,
}

/// One in-flight notification line.
#[derive(Debug)]
pub enum Notification {
    ClientDetached(ClientDetached),
    ClientSessionChanged(ClientSessionChanged),
    ConfigError(TextArg),
    Continue(IdArg),
    Exit(TextArg),
    ExtendedOutput(ExtendedOutput),
    LayoutChange(LayoutChange),
    Message(TextArg),
    Output(Output),
    PaneModeChanged(IdArg),
    PasteBufferChanged(TextArg),
    PasteBufferDeleted(TextArg),
    Pause(IdArg),
    SessionChanged(SessionChanged),
    SessionRenamed(TextArg),
    SessionWindowChanged(SessionWindowChanged),
    SessionsChanged,
    SubscriptionChanged(SubscriptionChanged),
    UnlinkedWindowAdd(WindowIdArg),
    UnlinkedWindowClose(WindowIdArg),
    UnlinkedWindowRenamed(WindowIdArg),
    WindowAdd(WindowIdArg),
    WindowClose(WindowIdArg),
    WindowPaneChanged(WindowPaneChanged),
    WindowRenamed(WindowRenamed),
}

impl Notification {
    /// Construct the variant for a recognized notification token.
    ///
    /// `Begin`, `End`, and `Error` frame command responses and are
    /// handled by the lexer itself, never constructed here.
    pub fn new(kind: NotificationKind) -> Option<Self> {
        use NotificationKind as K;

        let notification = match kind {
            K::Begin | K::End | K::Error => return None,
            K::ClientDetached => Self::ClientDetached(Default::default()),
            K::ClientSessionChanged => Self::ClientSessionChanged(Default::default()),
            K::ConfigError => Self::ConfigError(Default::default()),
            K::Continue => Self::Continue(Default::default()),
            K::Exit => Self::Exit(Default::default()),
            K::ExtendedOutput => Self::ExtendedOutput(Default::default()),
            K::LayoutChange => Self::LayoutChange(Default::default()),
            K::Message => Self::Message(Default::default()),
            K::Output => Self::Output(Default::default()),
            K::PaneModeChanged => Self::PaneModeChanged(Default::default()),
            K::PasteBufferChanged => Self::PasteBufferChanged(Default::default()),
            K::PasteBufferDeleted => Self::PasteBufferDeleted(Default::default()),
            K::Pause => Self::Pause(Default::default()),
            K::SessionChanged => Self::SessionChanged(Default::default()),
            K::SessionRenamed => Self::SessionRenamed(Default::default()),
            K::SessionWindowChanged => Self::SessionWindowChanged(Default::default()),
            K::SessionsChanged => Self::SessionsChanged,
            K::SubscriptionChanged => Self::SubscriptionChanged(Default::default()),
            K::UnlinkedWindowAdd => Self::UnlinkedWindowAdd(Default::default()),
            K::UnlinkedWindowClose => Self::UnlinkedWindowClose(Default::default()),
            K::UnlinkedWindowRenamed => Self::UnlinkedWindowRenamed(Default::default()),
            K::WindowAdd => Self::WindowAdd(Default::default()),
            K::WindowClose => Self::WindowClose(Default::default()),
            K::WindowPaneChanged => Self::WindowPaneChanged(Default::default()),
            K::WindowRenamed => Self::WindowRenamed(Default::default()),
        };

        Some(notification)
    }

    /// Whether this notification ends control mode when executed.
    pub fn is_exit(&self) -> bool {
        matches!(self, Self::Exit(_))
    }

    /// Consume one byte of the line after the notification token.
    pub fn push_byte(&mut self, byte: u8) {
        match self {
            Self::ClientDetached(n) => n.client.push(byte),
            Self::ClientSessionChanged(n) => {
                if byte == b' ' && n.arg == 0 {
                    n.client = lossy(&n.buf);
                    n.buf.clear();
                    n.arg += 1;
                } else if byte == b' ' && n.arg == 1 {
                    n.session = parse_session_id(&n.buf).unwrap_or_else(|| {
                        debug!(
                            "Error in tmux %client-session-changed: invalid session: {}",
                            lossy(&n.buf)
                        );
                        -2
                    });
                    n.buf.clear();
                    n.arg += 1;
                } else {
                    n.buf.push(byte);
                }
            }
            Self::ConfigError(n)
            | Self::Exit(n)
            | Self::Message(n)
            | Self::PasteBufferChanged(n)
            | Self::PasteBufferDeleted(n)
            | Self::SessionRenamed(n) => n.buf.push(byte),
            Self::Continue(n) | Self::PaneModeChanged(n) | Self::Pause(n) => {
                n.buf.push(byte)
            }
            Self::ExtendedOutput(n) => match n.arg {
                0 if byte == b' ' => {
                    n.pane = parse_pane_id(&n.buf).unwrap_or_else(|| {
                        debug!(
                            "Error in tmux %extended-output: invalid pane-id: {}",
                            lossy(&n.buf)
                        );
                        -2
                    });
                    n.buf.clear();
                    n.arg += 1;
                }
                1 if byte == b' ' => {
                    n.age = lossy(&n.buf).parse().unwrap_or_else(|_| {
                        debug!(
                            "Error in tmux %extended-output: invalid age: {}",
                            lossy(&n.buf)
                        );
                        0
                    });
                    n.buf.clear();
                    n.arg += 1;
                }
                2 if byte == b' ' => {
                    // Skip additional arguments until the `:` separator.
                    if n.buf == b":" {
                        n.arg += 1;
                    }
                    n.buf.clear();
                }
                0 | 1 | 2 => n.buf.push(byte),
                _ => n.octal.feed(byte, &mut n.buf),
            },
            Self::LayoutChange(n) => match n.arg {
                0 if byte == b' ' => {
                    n.window = parse_window_id(&n.buf).unwrap_or_else(|| {
                        debug!(
                            "Error in tmux %layout-change: invalid window-id: {}",
                            lossy(&n.buf)
                        );
                        -2
                    });
                    n.buf.clear();
                    n.arg += 1;
                }
                1 if byte == b' ' => {
                    n.layout = lossy(&n.buf);
                    n.buf.clear();
                    n.arg += 1;
                }
                2 if byte == b' ' => {
                    n.visible_layout = lossy(&n.buf);
                    n.buf.clear();
                    n.arg += 1;
                }
                _ => n.buf.push(byte),
            },
            Self::Output(n) => {
                if n.arg == 0 {
                    if byte == b' ' {
                        n.pane = parse_pane_id(&n.buf).unwrap_or_else(|| {
                            debug!(
                                "Error in tmux %output: invalid pane-id: {}",
                                lossy(&n.buf)
                            );
                            -2
                        });
                        n.buf.clear();
                        n.arg = 1;
                    } else {
                        n.buf.push(byte);
                    }
                } else {
                    n.octal.feed(byte, &mut n.buf);
                }
            }
            Self::SessionChanged(n) => {
                if byte == b' ' && n.arg == 0 {
                    n.session = parse_session_id(&n.buf).unwrap_or_else(|| {
                        debug!(
                            "Error in tmux %session-changed: invalid session-id: {}",
                            lossy(&n.buf)
                        );
                        -2
                    });
                    n.buf.clear();
                    n.arg += 1;
                } else {
                    n.buf.push(byte);
                }
            }
            Self::SessionWindowChanged(n) => {
                if byte == b' ' && n.arg == 0 {
                    n.session = parse_session_id(&n.buf).unwrap_or_else(|| {
                        debug!(
                            "Error in tmux %session-window-changed: invalid session-id: {}",
                            lossy(&n.buf)
                        );
                        -2
                    });
                    n.buf.clear();
                    n.arg += 1;
                } else {
                    n.buf.push(byte);
                }
            }
            Self::SessionsChanged => (),
            Self::SubscriptionChanged(n) => match n.arg {
                0 if byte == b' ' => {
                    n.name = lossy(&n.buf);
                    n.buf.clear();
                    n.arg += 1;
                }
                1 if byte == b' ' => {
                    n.session = parse_session_id(&n.buf).unwrap_or(-2);
                    n.buf.clear();
                    n.arg += 1;
                }
                2 if byte == b' ' => {
                    n.window = parse_window_id(&n.buf).unwrap_or(-2);
                    n.buf.clear();
                    n.arg += 1;
                }
                3 if byte == b' ' => {
                    n.window_index = lossy(&n.buf).parse().unwrap_or(-2);
                    n.buf.clear();
                    n.arg += 1;
                }
                4 if byte == b' ' => {
                    n.pane = parse_pane_id(&n.buf).unwrap_or(-2);
                    n.buf.clear();
                    n.arg += 1;
                }
                5 if byte == b' ' => {
                    if n.buf == b":" {
                        n.arg += 1;
                    }
                    n.buf.clear();
                }
                _ => n.buf.push(byte),
            },
            Self::UnlinkedWindowAdd(n) => n.push_byte(byte, "%unlinked-window-add"),
            Self::UnlinkedWindowClose(n) => n.push_byte(byte, "%unlinked-window-close"),
            Self::UnlinkedWindowRenamed(n) => {
                n.push_byte(byte, "%unlinked-window-renamed")
            }
            Self::WindowAdd(n) => n.push_byte(byte, "%window-add"),
            Self::WindowClose(n) => n.push_byte(byte, "%window-close"),
            Self::WindowPaneChanged(n) => {
                if n.arg == 0 && byte == b'@' {
                    n.arg = 1;
                } else if n.arg == 1 && byte.is_ascii_digit() {
                    n.window = n.window * 10 + (byte - b'0') as i64;
                } else if n.arg == 1 && byte == b' ' {
                    n.arg = 2;
                } else if n.arg == 2 && byte == b'%' {
                    n.arg = 3;
                } else if n.arg == 3 && byte.is_ascii_digit() {
                    n.pane = n.pane * 10 + (byte - b'0') as i64;
                } else {
                    n.arg = 4;
                    n.window = -2;
                    debug!(
                        "Unexpected byte {:#04x} when receiving %window-pane-changed",
                        byte
                    );
                }
            }
            Self::WindowRenamed(n) => {
                if byte == b' ' && n.arg == 0 {
                    n.window = parse_window_id(&n.buf).unwrap_or_else(|| {
                        debug!(
                            "Error in tmux %window-renamed: invalid window-id: {}",
                            lossy(&n.buf)
                        );
                        -2
                    });
                    n.buf.clear();
                    n.arg += 1;
                } else {
                    n.buf.push(byte);
                }
            }
        }
    }

    /// Dispatch the completed notification into the server controller.
    pub fn execute<L: EventListener + Clone>(self, server: &mut TmuxServer<L>) {
        match self {
            Self::ClientDetached(n) => server.receive_client_detached(lossy(&n.client)),
            Self::ClientSessionChanged(n) => {
                server.receive_client_session_changed(n.client, n.session, lossy(&n.buf))
            }
            Self::ConfigError(n) => server.receive_config_error(lossy(&n.buf)),
            Self::Continue(n) => match parse_pane_id(&n.buf) {
                Some(pane) => server.receive_continue(pane),
                None => warn!("Error in tmux %continue: invalid pane-id: {}", lossy(&n.buf)),
            },
            Self::Exit(n) => server.receive_exit(lossy(&n.buf)),
            Self::ExtendedOutput(n) => server.receive_extended_output(n.pane, n.age, n.buf),
            Self::LayoutChange(n) => {
                server.receive_layout_change(n.window, n.layout, n.visible_layout, lossy(&n.buf))
            }
            Self::Message(n) => server.receive_message(lossy(&n.buf)),
            Self::Output(n) => server.receive_output(n.pane, n.buf),
            Self::PaneModeChanged(n) => match parse_pane_id(&n.buf) {
                Some(pane) => server.receive_pane_mode_changed(pane),
                None => warn!(
                    "Error in tmux %pane-mode-changed: invalid pane-id: {}",
                    lossy(&n.buf)
                ),
            },
            Self::PasteBufferChanged(n) => {
                server.receive_paste_buffer_changed(lossy(&n.buf))
            }
            Self::PasteBufferDeleted(n) => {
                server.receive_paste_buffer_deleted(lossy(&n.buf))
            }
            Self::Pause(n) => match parse_pane_id(&n.buf) {
                Some(pane) => server.receive_pause(pane),
                None => warn!("Error in tmux %pause: invalid pane-id: {}", lossy(&n.buf)),
            },
            Self::SessionChanged(n) => {
                server.receive_session_changed(n.session, lossy(&n.buf))
            }
            Self::SessionRenamed(n) => server.receive_session_renamed(lossy(&n.buf)),
            Self::SessionWindowChanged(n) => match parse_window_id(&n.buf) {
                Some(window) => server.receive_session_window_changed(n.session, window),
                None => warn!(
                    "Error in tmux %session-window-changed: invalid window-id: {}",
                    lossy(&n.buf)
                ),
            },
            Self::SessionsChanged => server.receive_sessions_changed(),
            Self::SubscriptionChanged(n) => server.receive_subscription_changed(
                n.name,
                n.session,
                n.window,
                n.window_index,
                n.pane,
                n.buf,
            ),
            Self::UnlinkedWindowAdd(n) => {
                if !n.failed {
                    server.receive_unlinked_window_add(n.window)
                }
            }
            Self::UnlinkedWindowClose(n) => {
                if !n.failed {
                    server.receive_unlinked_window_close(n.window)
                }
            }
            Self::UnlinkedWindowRenamed(n) => {
                if !n.failed {
                    server.receive_unlinked_window_renamed(n.window)
                }
            }
            Self::WindowAdd(n) => {
                if !n.failed {
                    server.receive_window_add(n.window)
                }
            }
            Self::WindowClose(n) => {
                if !n.failed {
                    server.receive_window_close(n.window)
                }
            }
            Self::WindowPaneChanged(n) => {
                server.receive_window_pane_changed(n.window, n.pane)
            }
            Self::WindowRenamed(n) => server.receive_window_renamed(n.window, lossy(&n.buf)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_parsing() {
        assert_eq!(parse_session_id(b"$0"), Some(0));
        assert_eq!(parse_session_id(b"$42"), Some(42));
        assert_eq!(parse_session_id(b"$*"), Some(-1));
        assert_eq!(parse_session_id(b"$"), None);
        assert_eq!(parse_session_id(b"@3"), None);
        assert_eq!(parse_window_id(b"@10"), Some(10));
        assert_eq!(parse_pane_id(b"%7"), Some(7));
        assert_eq!(parse_pane_id(b"%x7"), None);
    }

    #[test]
    fn octal_escape_round_trip() {
        for byte in 0u16..=255 {
            let escaped = format!("\\{:03o}", byte);
            let mut decoder = OctalDecoder::default();
            let mut out = Vec::new();
            for b in escaped.bytes() {
                decoder.feed(b, &mut out);
            }
            assert_eq!(out, vec![byte as u8], "byte {byte:#04x}");
        }
    }

    #[test]
    fn octal_decoder_passes_plain_bytes() {
        let mut decoder = OctalDecoder::default();
        let mut out = Vec::new();
        for b in b"hello" {
            decoder.feed(*b, &mut out);
        }
        assert_eq!(out, b"hello");
    }

    #[test]
    fn octal_decoder_aborts_on_non_octal() {
        let mut decoder = OctalDecoder::default();
        let mut out = Vec::new();
        for b in b"\\9x" {
            decoder.feed(*b, &mut out);
        }
        // The escape aborts; the digit 9 and the x pass through.
        assert_eq!(out, b"9x");
    }

    #[test]
    fn token_lookup_covers_all_notifications() {
        assert_eq!(kind_for_token(b"begin"), Some(NotificationKind::Begin));
        assert_eq!(kind_for_token(b"output"), Some(NotificationKind::Output));
        assert_eq!(
            kind_for_token(b"window-pane-changed"),
            Some(NotificationKind::WindowPaneChanged)
        );
        assert_eq!(kind_for_token(b"bogus"), None);
    }

    #[test]
    fn window_id_accepts_zero() {
        let mut arg = WindowIdArg::default();
        for byte in b"@10" {
            arg.push_byte(*byte, "test");
        }
        assert_eq!(arg.window, 10);
        assert!(!arg.failed);

        let mut arg = WindowIdArg::default();
        for byte in b"@0" {
            arg.push_byte(*byte, "test");
        }
        assert_eq!(arg.window, 0);
        assert!(!arg.failed);
    }
}

//! Line-oriented decoder for the tmux control-mode (`tmux -CC`) stream.
//!
//! While control mode is active, the ordinary terminal parser is
//! bypassed and bytes are framed into `\n`-terminated lines. Lines
//! starting with `%` carry notifications or response framing; lines
//! inside a `%begin … %end/%error` pair are collected verbatim as the
//! response body of the command in flight.

pub mod notifications;
pub mod server;

use tracing::{debug, warn};

use crate::event::EventListener;
use self::notifications::{kind_for_token, Notification, NotificationKind};
use self::server::TmuxServer;

/// Stream marker whose arrival at the start of a line switches the
/// emulation into control mode.
pub const ACTIVATION_MARKER: &[u8] = b"%begin ";

/// Parse state within the current line.
#[derive(Debug)]
enum LineState {
    /// At the start of a line, nothing consumed yet.
    Read,
    /// Collecting the `%token` introducer.
    Token(Vec<u8>),
    /// Feeding the rest of the line to a notification parser.
    Consume(Notification),
    /// Collecting a response body line.
    Body(Vec<u8>),
    /// Discarding the rest of an unusable line.
    Error,
}

/// Decoder for the control-mode byte stream.
pub struct ControlMode<L: EventListener + Clone> {
    pub server: TmuxServer<L>,
    active: bool,
    line: LineState,
    /// Body lines of an open `%begin` block, if any.
    response: Option<Vec<String>>,
    /// Deferred carriage return, dropped when `\n` follows.
    pending_cr: bool,
}

impl<L: EventListener + Clone> ControlMode<L> {
    pub fn new(listener: L) -> Self {
        Self {
            server: TmuxServer::new(listener),
            active: false,
            line: LineState::Read,
            response: None,
            pending_cr: false,
        }
    }

    /// Whether control-mode parsing is currently active.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Enter control mode; the caller replays the detected marker.
    pub fn activate(&mut self) {
        self.active = true;
        self.line = LineState::Read;
        self.response = None;
        self.pending_cr = false;
        self.server.attach();
    }

    /// Abort the line being accumulated, keeping control mode active.
    ///
    /// Used by soft reset; any open response body survives so the
    /// command in flight can still complete.
    pub fn abort_line(&mut self) {
        self.line = LineState::Read;
        self.pending_cr = false;
    }

    /// Drop all parse state, failing queued commands.
    ///
    /// Used by hard reset while the stream is still in control mode.
    pub fn disconnect(&mut self, reason: &str) {
        if self.active {
            self.server.fail_all(reason);
        }
        self.active = false;
        self.line = LineState::Read;
        self.response = None;
        self.pending_cr = false;
    }

    /// Consume bytes from the stream, returning how many were used.
    ///
    /// All bytes are consumed unless `%exit` deactivates control mode
    /// mid-buffer, in which case the remainder belongs to the terminal
    /// parser again.
    pub fn advance(&mut self, bytes: &[u8]) -> usize {
        for (i, &byte) in bytes.iter().enumerate() {
            self.advance_byte(byte);
            if !self.active {
                return i + 1;
            }
        }
        bytes.len()
    }

    fn advance_byte(&mut self, byte: u8) {
        // Carriage returns are dropped before a newline and otherwise
        // delivered as ordinary payload bytes.
        if self.pending_cr {
            self.pending_cr = false;
            if byte == b'\n' {
                self.end_line();
                return;
            }
            self.push_byte(b'\r');
        }

        match byte {
            b'\r' => self.pending_cr = true,
            b'\n' => self.end_line(),
            _ => self.push_byte(byte),
        }
    }

    fn push_byte(&mut self, byte: u8) {
        match &mut self.line {
            LineState::Read => {
                if byte == b'%' {
                    self.line = LineState::Token(vec![byte]);
                } else if self.response.is_some() {
                    self.line = LineState::Body(vec![byte]);
                } else {
                    warn!(
                        "Protocol error in tmux stream: line starts with {:#04x}",
                        byte
                    );
                    self.line = LineState::Error;
                }
            }
            LineState::Token(token) => {
                if byte == b' ' {
                    let token = std::mem::take(token);
                    self.classify(token, false);
                } else {
                    token.push(byte);
                }
            }
            LineState::Consume(notification) => notification.push_byte(byte),
            LineState::Body(line) => line.push(byte),
            LineState::Error => (),
        }
    }

    fn end_line(&mut self) {
        match std::mem::replace(&mut self.line, LineState::Read) {
            LineState::Read => {
                // Empty lines are permitted inside response bodies.
                if let Some(body) = &mut self.response {
                    body.push(String::new());
                }
            }
            LineState::Token(token) => {
                self.classify(token, true);
                // A token-only notification still executes.
                if let LineState::Consume(_) = self.line {
                    self.end_line();
                    return;
                }
                // Token-only body or framing lines are complete here.
                if let LineState::Body(line) =
                    std::mem::replace(&mut self.line, LineState::Read)
                {
                    self.finish_body_line(line);
                }
                self.line = LineState::Read;
            }
            LineState::Consume(notification) => {
                let exit = notification.is_exit();
                notification.execute(&mut self.server);
                if exit {
                    self.active = false;
                    self.response = None;
                }
            }
            LineState::Body(line) => self.finish_body_line(line),
            LineState::Error => (),
        }
    }

    fn finish_body_line(&mut self, line: Vec<u8>) {
        if let Some(body) = &mut self.response {
            body.push(String::from_utf8_lossy(&line).into_owned());
        }
    }

    /// Decide what the rest of the line means from its `%token`.
    fn classify(&mut self, token: Vec<u8>, at_eol: bool) {
        debug_assert!(token.first() == Some(&b'%'));

        let kind = kind_for_token(&token[1..]);

        match kind {
            Some(NotificationKind::Begin) => {
                if self.response.is_some() {
                    warn!("tmux %begin while a response is already open");
                } else {
                    self.response = Some(Vec::new());
                }
                // The timestamp/command-number arguments are not used.
                self.line = LineState::Error;
            }
            Some(NotificationKind::End) => {
                match self.response.take() {
                    Some(body) => self.server.receive_command_response(body),
                    None => warn!("tmux %end without %begin"),
                }
                self.line = LineState::Error;
            }
            Some(NotificationKind::Error) => {
                match self.response.take() {
                    Some(body) => self.server.receive_command_error(body),
                    None => warn!("tmux %error without %begin"),
                }
                self.line = LineState::Error;
            }
            Some(kind) => {
                if self.response.is_some() {
                    // Notifications never interleave with response
                    // bodies; treat the line as body content.
                    let mut line = token;
                    if !at_eol {
                        line.push(b' ');
                    }
                    self.line = LineState::Body(line);
                    return;
                }

                match Notification::new(kind) {
                    Some(notification) => {
                        self.line = LineState::Consume(notification);
                    }
                    None => self.line = LineState::Error,
                }
            }
            None => {
                if self.response.is_some() {
                    let mut line = token;
                    if !at_eol {
                        line.push(b' ');
                    }
                    self.line = LineState::Body(line);
                    return;
                }

                debug!(
                    "Unknown tmux notification: {}",
                    String::from_utf8_lossy(&token)
                );
                self.line = LineState::Error;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EventListener, TermEvent};
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct Recorder {
        events: Rc<RefCell<Vec<TermEvent>>>,
    }

    impl EventListener for Recorder {
        fn send_event(&self, event: TermEvent) {
            self.events.borrow_mut().push(event);
        }
    }

    impl Recorder {
        fn take(&self) -> Vec<TermEvent> {
            std::mem::take(&mut *self.events.borrow_mut())
        }
    }

    fn attached() -> (ControlMode<Recorder>, Recorder) {
        let recorder = Recorder::default();
        let mut control = ControlMode::new(recorder.clone());
        control.activate();
        // Attach banner.
        control.advance(b"%begin 1 0 0\n%end 1 0 0\n");
        recorder.take();
        (control, recorder)
    }

    #[test]
    fn attach_banner_triggers_session_listing() {
        let recorder = Recorder::default();
        let mut control = ControlMode::new(recorder.clone());
        control.activate();

        control.advance(b"%begin 1 0 0\n%end 1 0 0\n");

        let events = recorder.take();
        assert_eq!(
            events,
            vec![TermEvent::PtyWrite(
                b"ls -F '#{session_id} #{q:session_name}'\n".to_vec()
            )]
        );
    }

    #[test]
    fn response_body_reaches_session_table() {
        let (mut control, _recorder) = attached();

        // Response to the `ls` issued by the attach handler.
        control.advance(b"%begin 2 1 0\n$0 default\n%end 2 1 0\n");

        assert_eq!(control.server.sessions()[&0].name, "default");
    }

    #[test]
    fn output_payload_is_unescaped() {
        let (mut control, recorder) = attached();
        control.advance(b"%output %0 ls\\015\\012\n");

        assert_eq!(
            recorder.take(),
            vec![TermEvent::TmuxOutput {
                pane: 0,
                bytes: b"ls\r\n".to_vec(),
            }]
        );
    }

    #[test]
    fn output_order_is_preserved() {
        let (mut control, recorder) = attached();
        control.advance(b"%output %0 one\n%sessions-changed\n%output %0 two\n");

        let outputs: Vec<Vec<u8>> = recorder
            .take()
            .into_iter()
            .filter_map(|event| match event {
                TermEvent::TmuxOutput { bytes, .. } => Some(bytes),
                _ => None,
            })
            .collect();
        assert_eq!(outputs, vec![b"one".to_vec(), b"two".to_vec()]);
    }

    #[test]
    fn crlf_line_endings_are_stripped() {
        let (mut control, recorder) = attached();
        control.advance(b"%output %1 hi\r\n");

        assert_eq!(
            recorder.take(),
            vec![TermEvent::TmuxOutput {
                pane: 1,
                bytes: b"hi".to_vec(),
            }]
        );
    }

    #[test]
    fn exit_returns_remaining_bytes_to_caller() {
        let (mut control, recorder) = attached();

        let input = b"%exit\nplain terminal bytes";
        let consumed = control.advance(input);

        assert!(!control.is_active());
        assert_eq!(consumed, b"%exit\n".len());
        assert!(recorder
            .take()
            .iter()
            .any(|event| matches!(event, TermEvent::TmuxExited { .. })));
    }

    #[test]
    fn empty_lines_inside_response_are_kept() {
        let (mut control, _recorder) = attached();
        control.server.send_command(server::TmuxCommand::new("show", |_, _| {}));

        let body = Rc::new(RefCell::new(Vec::new()));
        {
            let body = body.clone();
            control
                .server
                .send_command(server::TmuxCommand::new("probe", move |_, lines| {
                    *body.borrow_mut() = lines;
                }));
        }

        // First block answers the attach-time `ls`, the second the
        // `show` command, the third lands on the probe.
        control.advance(b"%begin 9 1 0\n%end 9 1 0\n");
        control.advance(b"%begin 9 2 0\na\n\nb\n%end 9 2 0\n");
        control.advance(b"%begin 9 3 0\nx\n\n\n%end 9 3 0\n");

        assert_eq!(*body.borrow(), vec!["x", "", ""]);
    }

    #[test]
    fn non_percent_line_outside_response_is_skipped() {
        let (mut control, recorder) = attached();
        control.advance(b"garbage line\n%output %2 ok\n");

        assert_eq!(
            recorder.take(),
            vec![TermEvent::TmuxOutput {
                pane: 2,
                bytes: b"ok".to_vec(),
            }]
        );
    }

    #[test]
    fn desync_end_without_begin_is_tolerated() {
        let (mut control, recorder) = attached();
        control.advance(b"%end 5 5 0\n%output %0 still alive\n");

        assert_eq!(
            recorder.take(),
            vec![TermEvent::TmuxOutput {
                pane: 0,
                bytes: b"still alive".to_vec(),
            }]
        );
    }
}

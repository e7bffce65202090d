//! Command queue and session bookkeeping for the tmux server side of
//! control mode.

use std::collections::VecDeque;

use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use crate::event::{EventListener, TermEvent};

/// User option read back from the server to size newly seen sessions.
const GUI_SIZE_OPTION: &str = "@muxterm_size";

type ResponseHandler<L> = Box<dyn FnOnce(&mut TmuxServer<L>, Vec<String>)>;

/// A command sent to the tmux server, with continuations for its
/// `%begin … %end` response or `%begin … %error` failure.
pub struct TmuxCommand<L: EventListener + Clone> {
    text: String,
    on_response: Option<ResponseHandler<L>>,
    on_error: Option<ResponseHandler<L>>,
}

impl<L: EventListener + Clone> TmuxCommand<L> {
    pub fn new(
        text: impl Into<String>,
        on_response: impl FnOnce(&mut TmuxServer<L>, Vec<String>) + 'static,
    ) -> Self {
        Self {
            text: text.into(),
            on_response: Some(Box::new(on_response)),
            on_error: None,
        }
    }

    pub fn with_error_handler(
        mut self,
        on_error: impl FnOnce(&mut TmuxServer<L>, Vec<String>) + 'static,
    ) -> Self {
        self.on_error = Some(Box::new(on_error));
        self
    }

    /// A queue placeholder with no outgoing text, used for the implicit
    /// attach response tmux sends right after `-CC` starts.
    fn internal(
        on_response: impl FnOnce(&mut TmuxServer<L>, Vec<String>) + 'static,
    ) -> Self {
        Self::new(String::new(), on_response)
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// One tmux session known to the controller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TmuxSession {
    pub name: String,
    pub gui_size: Option<(u16, u16)>,
}

/// Controller for the tmux server behind the control-mode stream.
///
/// At most one command is in flight; the rest wait in a FIFO. Responses
/// are routed back to the in-flight command's continuation in arrival
/// order.
pub struct TmuxServer<L: EventListener + Clone> {
    current: Option<TmuxCommand<L>>,
    pending: VecDeque<TmuxCommand<L>>,
    sessions: FxHashMap<i64, TmuxSession>,
    active_session: i64,
    listener: L,
}

impl<L: EventListener + Clone> TmuxServer<L> {
    pub fn new(listener: L) -> Self {
        Self {
            current: None,
            pending: VecDeque::new(),
            sessions: FxHashMap::default(),
            active_session: -1,
            listener,
        }
    }

    /// Whether a command is awaiting its `%end`/`%error`.
    pub fn has_command_in_flight(&self) -> bool {
        self.current.is_some()
    }

    /// The session table, keyed by tmux session id.
    pub fn sessions(&self) -> &FxHashMap<i64, TmuxSession> {
        &self.sessions
    }

    pub fn active_session(&self) -> i64 {
        self.active_session
    }

    /// Mark the unsolicited attach response in flight and schedule the
    /// initial session listing behind it.
    pub fn attach(&mut self) {
        self.current = Some(TmuxCommand::internal(|server, response| {
            if !response.is_empty() {
                debug!("Unhandled data during tmux session attach: {:?}", response);
            }
            server.init();
        }));
    }

    /// Ask the server for its session list.
    pub fn init(&mut self) {
        self.send_command(TmuxCommand::new(
            "ls -F '#{session_id} #{q:session_name}'",
            |server, response| server.update_sessions(response),
        ));
    }

    /// Send a command, or queue it when one is already in flight.
    pub fn send_command(&mut self, command: TmuxCommand<L>) {
        if self.current.is_none() && self.pending.is_empty() {
            self.emit_command(&command);
            self.current = Some(command);
        } else {
            self.pending.push_back(command);
        }
    }

    fn emit_command(&self, command: &TmuxCommand<L>) {
        if command.text.is_empty() {
            return;
        }
        let mut bytes = command.text.clone().into_bytes();
        bytes.push(b'\n');
        self.listener.send_event(TermEvent::PtyWrite(bytes));
    }

    fn advance_queue(&mut self) {
        if self.current.is_none() {
            if let Some(next) = self.pending.pop_front() {
                self.emit_command(&next);
                self.current = Some(next);
            }
        }
    }

    /// Route a completed `%begin … %end` body.
    pub fn receive_command_response(&mut self, response: Vec<String>) {
        match self.current.take() {
            Some(mut command) => {
                if let Some(handler) = command.on_response.take() {
                    handler(self, response);
                }
                self.advance_queue();
            }
            None => {
                warn!("Unexpected tmux command response: {:?}", response);
            }
        }
    }

    /// Route a completed `%begin … %error` body.
    pub fn receive_command_error(&mut self, response: Vec<String>) {
        match self.current.take() {
            Some(mut command) => {
                match command.on_error.take() {
                    Some(handler) => handler(self, response),
                    None => {
                        warn!(
                            "Received error in response to tmux command {:?}: {:?}",
                            command.text, response
                        );
                    }
                }
                self.advance_queue();
            }
            None => {
                warn!("Received error in response to unexpected tmux command: {:?}", response);
            }
        }
    }

    /// Fail the in-flight and queued commands with a synthetic error.
    ///
    /// Used by hard reset and server disconnect; the session table is
    /// dropped as well.
    pub fn fail_all(&mut self, reason: &str) {
        let commands = self
            .current
            .take()
            .into_iter()
            .chain(std::mem::take(&mut self.pending))
            .collect::<Vec<_>>();

        for mut command in commands {
            match command.on_error.take() {
                Some(handler) => handler(self, vec![reason.to_owned()]),
                None => debug!("Dropping tmux command {:?}: {}", command.text, reason),
            }
        }

        self.sessions.clear();
        self.active_session = -1;
    }

    /// Parse an `ls -F '#{session_id} #{q:session_name}'` response.
    fn update_sessions(&mut self, response: Vec<String>) {
        let mut updated: Vec<(i64, String)> = Vec::new();

        for line in &response {
            let Some((id_field, name)) = line.split_once(' ') else {
                debug!("Malformed session line from tmux ls: {:?}", line);
                continue;
            };

            match super::notifications::parse_session_id(id_field.as_bytes()) {
                Some(session) => updated.push((session, name.to_owned())),
                None => debug!("Invalid session id from tmux ls: {:?}", id_field),
            }
        }

        for (session, name) in updated {
            self.sessions
                .entry(session)
                .or_default()
                .name = name;
        }
    }

    pub fn receive_client_detached(&mut self, client: String) {
        debug!("tmux client detached: {}", client);
    }

    pub fn receive_client_session_changed(
        &mut self,
        client: String,
        session: i64,
        name: String,
    ) {
        debug!(
            "tmux client {} switched to session {} ({})",
            client, session, name
        );
        self.receive_session_changed(session, name);
    }

    pub fn receive_config_error(&mut self, error: String) {
        warn!("tmux configuration error: {}", error);
        self.listener.send_event(TermEvent::TmuxMessage(error));
    }

    pub fn receive_continue(&mut self, pane: i64) {
        debug!("tmux pane {} continued", pane);
    }

    pub fn receive_exit(&mut self, reason: String) {
        self.fail_all("tmux exited");
        self.listener.send_event(TermEvent::TmuxExited { reason });
    }

    pub fn receive_extended_output(&mut self, pane: i64, _age: u64, bytes: Vec<u8>) {
        self.listener
            .send_event(TermEvent::TmuxOutput { pane, bytes });
    }

    pub fn receive_layout_change(
        &mut self,
        window: i64,
        layout: String,
        _visible_layout: String,
        _flags: String,
    ) {
        self.listener
            .send_event(TermEvent::TmuxLayoutChanged { window, layout });
    }

    pub fn receive_message(&mut self, message: String) {
        self.listener.send_event(TermEvent::TmuxMessage(message));
    }

    pub fn receive_output(&mut self, pane: i64, bytes: Vec<u8>) {
        self.listener
            .send_event(TermEvent::TmuxOutput { pane, bytes });
    }

    pub fn receive_pane_mode_changed(&mut self, pane: i64) {
        debug!("tmux pane {} changed mode", pane);
    }

    pub fn receive_paste_buffer_changed(&mut self, buffer: String) {
        debug!("tmux paste buffer changed: {}", buffer);
    }

    pub fn receive_paste_buffer_deleted(&mut self, buffer: String) {
        debug!("tmux paste buffer deleted: {}", buffer);
    }

    pub fn receive_pause(&mut self, pane: i64) {
        debug!("tmux pane {} paused", pane);
    }

    /// Upsert the session and, for sessions seen for the first time, ask
    /// the server for the stored GUI size.
    pub fn receive_session_changed(&mut self, session: i64, name: String) {
        if let Some(record) = self.sessions.get_mut(&session) {
            record.name = name.clone();
        } else {
            self.sessions.insert(
                session,
                TmuxSession {
                    name: name.clone(),
                    gui_size: None,
                },
            );

            self.send_command(TmuxCommand::new(
                format!("show -v -q -t ${} {}", session, GUI_SIZE_OPTION),
                move |server, response| {
                    if response.len() > 1 {
                        debug!("Unexpected multi-line {} response", GUI_SIZE_OPTION);
                        return;
                    }
                    let Some(line) = response.first() else { return };
                    let Some(size) = parse_gui_size(line) else {
                        debug!(
                            "Unexpected {} value when sizing session {}: {:?}",
                            GUI_SIZE_OPTION, session, line
                        );
                        return;
                    };
                    if let Some(record) = server.sessions.get_mut(&session) {
                        record.gui_size = Some(size);
                    }
                },
            ));
        }

        self.active_session = session;
        self.listener
            .send_event(TermEvent::TmuxSessionChanged { session, name });
    }

    pub fn receive_session_renamed(&mut self, name: String) {
        if let Some(record) = self.sessions.get_mut(&self.active_session) {
            record.name = name;
        }
    }

    pub fn receive_session_window_changed(&mut self, session: i64, window: i64) {
        debug!("tmux session {} switched to window {}", session, window);
    }

    pub fn receive_sessions_changed(&mut self) {
        self.listener.send_event(TermEvent::TmuxSessionsChanged);
        self.init();
    }

    pub fn receive_subscription_changed(
        &mut self,
        name: String,
        session: i64,
        window: i64,
        window_index: i64,
        pane: i64,
        value: Vec<u8>,
    ) {
        debug!(
            "tmux subscription {} changed ({}:{}:{}:{}): {:?}",
            name, session, window, window_index, pane, value
        );
    }

    pub fn receive_unlinked_window_add(&mut self, window: i64) {
        debug!("tmux unlinked window {} added", window);
    }

    pub fn receive_unlinked_window_close(&mut self, window: i64) {
        debug!("tmux unlinked window {} closed", window);
    }

    pub fn receive_unlinked_window_renamed(&mut self, window: i64) {
        debug!("tmux unlinked window {} renamed", window);
    }

    pub fn receive_window_add(&mut self, window: i64) {
        self.listener.send_event(TermEvent::TmuxWindowAdded { window });
    }

    pub fn receive_window_close(&mut self, window: i64) {
        self.listener.send_event(TermEvent::TmuxWindowClosed { window });
    }

    pub fn receive_window_pane_changed(&mut self, window: i64, pane: i64) {
        debug!("tmux window {} switched to pane {}", window, pane);
    }

    pub fn receive_window_renamed(&mut self, window: i64, name: String) {
        debug!("tmux window {} renamed to {}", window, name);
    }
}

/// Parse the `<width>,<height>` payload of the GUI size option.
fn parse_gui_size(line: &str) -> Option<(u16, u16)> {
    let (width, height) = line.split_once(',')?;
    Some((width.parse().ok()?, height.parse().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::VoidListener;
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

    fn written_commands(recorder: &Recorder) -> Vec<String> {
        recorder
            .events
            .borrow()
            .iter()
            .filter_map(|event| match event {
                TermEvent::PtyWrite(bytes) => {
                    Some(String::from_utf8_lossy(bytes).into_owned())
                }
                _ => None,
            })
            .collect()
    }

    #[test]
    fn commands_are_fifo() {
        let recorder = Recorder::default();
        let order = Rc::new(RefCell::new(Vec::new()));

        let mut server = TmuxServer::new(recorder.clone());
        for i in 0..3 {
            let order = order.clone();
            server.send_command(TmuxCommand::new(format!("cmd{}", i), move |_, _| {
                order.borrow_mut().push(i);
            }));
        }

        // Only the first command has been written so far.
        assert_eq!(written_commands(&recorder), vec!["cmd0\n"]);

        server.receive_command_response(vec![]);
        server.receive_command_response(vec![]);
        server.receive_command_response(vec![]);

        assert_eq!(*order.borrow(), vec![0, 1, 2]);
        assert_eq!(written_commands(&recorder), vec!["cmd0\n", "cmd1\n", "cmd2\n"]);
        assert!(!server.has_command_in_flight());
    }

    #[test]
    fn commands_sent_from_handlers_keep_order() {
        let recorder = Recorder::default();
        let mut server = TmuxServer::new(recorder.clone());

        server.send_command(TmuxCommand::new("first", |server, _| {
            server.send_command(TmuxCommand::new("from-handler", |_, _| {}));
        }));
        server.send_command(TmuxCommand::new("second", |_, _| {}));

        server.receive_command_response(vec![]);

        // "second" was queued before the handler ran, so it goes first.
        assert_eq!(written_commands(&recorder), vec!["first\n", "second\n"]);

        server.receive_command_response(vec![]);
        assert_eq!(
            written_commands(&recorder),
            vec!["first\n", "second\n", "from-handler\n"]
        );
    }

    #[test]
    fn unexpected_response_is_tolerated() {
        let mut server = TmuxServer::new(VoidListener);
        server.receive_command_response(vec!["stray".into()]);
        server.receive_command_error(vec!["stray".into()]);
        assert!(!server.has_command_in_flight());
    }

    #[test]
    fn session_listing_is_parsed() {
        let mut server = TmuxServer::new(VoidListener);
        server.update_sessions(vec![
            "$0 default".into(),
            "$3 work session".into(),
            "garbage".into(),
        ]);

        assert_eq!(server.sessions().len(), 2);
        assert_eq!(server.sessions()[&0].name, "default");
        assert_eq!(server.sessions()[&3].name, "work session");
    }

    #[test]
    fn new_session_queries_gui_size() {
        let recorder = Recorder::default();
        let mut server = TmuxServer::new(recorder.clone());

        server.receive_session_changed(0, "default".into());
        assert_eq!(server.active_session(), 0);
        assert_eq!(
            written_commands(&recorder),
            vec![format!("show -v -q -t $0 {}\n", GUI_SIZE_OPTION)]
        );

        server.receive_command_response(vec!["140,50".into()]);
        assert_eq!(server.sessions()[&0].gui_size, Some((140, 50)));

        // A repeat notification only renames.
        server.receive_session_changed(0, "renamed".into());
        assert_eq!(server.sessions()[&0].name, "renamed");
        assert_eq!(written_commands(&recorder).len(), 1);
    }

    #[test]
    fn attach_consumes_banner_then_inits() {
        let recorder = Recorder::default();
        let mut server = TmuxServer::new(recorder.clone());

        server.attach();
        assert!(server.has_command_in_flight());
        assert!(written_commands(&recorder).is_empty());

        // The attach banner arrives; init's `ls` goes out in turn.
        server.receive_command_response(vec![]);
        assert_eq!(
            written_commands(&recorder),
            vec!["ls -F '#{session_id} #{q:session_name}'\n"]
        );
    }

    #[test]
    fn gui_size_parsing() {
        assert_eq!(parse_gui_size("80,24"), Some((80, 24)));
        assert_eq!(parse_gui_size("80x24"), None);
        assert_eq!(parse_gui_size(""), None);
    }
}

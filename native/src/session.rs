// Session loop: read a message, dispatch its actions, acknowledge, repeat.

use crate::logging;
use crate::protocol::{parse_message, Action, ACKNOWLEDGMENT};
use crate::speech::{SideChannel, SpeechSink};
use crate::transport::Transport;
use log::{debug, error, info, trace, warn};
use std::ops::{Deref, DerefMut};

pub const STARTUP_ANNOUNCEMENT: &str = "X4 NVDA Bridge connected";
pub const READY_ANNOUNCEMENT: &str = "X4 accessibility ready";
pub const FAREWELL_ANNOUNCEMENT: &str = "X4 NVDA Bridge disconnected";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    Idle,
    Connected,
    Reading,
    Dispatching,
    Closed,
}

impl SessionState {
    fn can_enter(self, next: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (Idle, Connected)
                | (Idle, Closed)
                | (Connected, Reading)
                | (Reading, Dispatching)
                | (Reading, Closed)
                | (Dispatching, Reading)
                | (Dispatching, Closed)
        )
    }
}

/// Why a session reached `Closed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    /// The game closed its end of the pipe.
    PeerClosed,
    ConnectFailed(String),
    TransportFault(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReport {
    pub messages_handled: usize,
    pub end: SessionEnd,
}

/// Closes the transport when dropped, on every exit path.
struct ConnectionGuard<'a, T: Transport> {
    transport: &'a mut T,
}

impl<'a, T: Transport> ConnectionGuard<'a, T> {
    fn new(transport: &'a mut T) -> Self {
        Self { transport }
    }
}

impl<T: Transport> Deref for ConnectionGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.transport
    }
}

impl<T: Transport> DerefMut for ConnectionGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.transport
    }
}

impl<T: Transport> Drop for ConnectionGuard<'_, T> {
    fn drop(&mut self) {
        self.transport.close();
    }
}

/// One bridge session over an injected transport and speech sink.
pub struct Session<'a, T: Transport, C: SideChannel> {
    transport: &'a mut T,
    sink: &'a mut SpeechSink<C>,
    state: SessionState,
}

impl<'a, T: Transport, C: SideChannel> Session<'a, T, C> {
    pub fn new(transport: &'a mut T, sink: &'a mut SpeechSink<C>) -> Self {
        Self {
            transport,
            sink,
            state: SessionState::Idle,
        }
    }

    /// Run until the peer disconnects or the transport faults. Never fails;
    /// the report says how the session ended.
    pub fn run(self) -> SessionReport {
        let Session {
            transport,
            sink,
            mut state,
        } = self;

        if sink.probe_running() {
            info!("[SESSION] NVDA is running");
            sink.speak(STARTUP_ANNOUNCEMENT);
        } else {
            warn!("[SESSION] NVDA does not appear to be running");
            warn!("[SESSION] Messages will be printed to console");
        }

        let report = {
            let mut connection = ConnectionGuard::new(transport);

            match connection.connect() {
                Ok(()) => {
                    enter(&mut state, SessionState::Connected);
                    sink.speak(READY_ANNOUNCEMENT);
                    serve(&mut *connection, sink, &mut state)
                }
                Err(e) => {
                    error!("[SESSION] {}", e);
                    logging::capture_critical_error("Pipe Connection", &e.to_string());
                    SessionReport {
                        messages_handled: 0,
                        end: SessionEnd::ConnectFailed(e.to_string()),
                    }
                }
            }
        };

        enter(&mut state, SessionState::Closed);
        sink.speak(FAREWELL_ANNOUNCEMENT);

        info!(
            "[SESSION] Bridge stopped after {} messages ({:?})",
            report.messages_handled, report.end
        );
        report
    }
}

fn serve<T: Transport, C: SideChannel>(
    transport: &mut T,
    sink: &mut SpeechSink<C>,
    state: &mut SessionState,
) -> SessionReport {
    let mut messages_handled = 0;

    loop {
        enter(state, SessionState::Reading);

        let message = match transport.read() {
            Ok(Some(message)) => message,
            Ok(None) => {
                info!("[SESSION] Pipe disconnected");
                return SessionReport {
                    messages_handled,
                    end: SessionEnd::PeerClosed,
                };
            }
            Err(e) => return transport_fault(messages_handled, "read", e),
        };

        enter(state, SessionState::Dispatching);
        dispatch(sink, &message);
        messages_handled += 1;

        if let Err(e) = transport.write(ACKNOWLEDGMENT) {
            return transport_fault(messages_handled, "write", e);
        }
    }
}

fn transport_fault(
    messages_handled: usize,
    operation: &str,
    error: crate::transport::TransportError,
) -> SessionReport {
    error!("[SESSION] Pipe {} error: {}", operation, error);
    logging::log_critical_error("Pipe Transport", &error.to_string());
    SessionReport {
        messages_handled,
        end: SessionEnd::TransportFault(error.to_string()),
    }
}

fn enter(state: &mut SessionState, next: SessionState) {
    debug_assert!(
        state.can_enter(next),
        "illegal session transition {:?} -> {:?}",
        state,
        next
    );
    trace!("[SESSION] {:?} -> {:?}", state, next);
    *state = next;
}

/// Apply every action in `message` to the sink, in order.
/// Returns the number of actions dispatched.
pub fn dispatch<C: SideChannel>(sink: &mut SpeechSink<C>, message: &str) -> usize {
    let trimmed = message.trim();
    if trimmed.is_empty() {
        return 0;
    }

    info!("[SESSION] Received: {}", trimmed);

    let actions = parse_message(trimmed);
    for action in &actions {
        match action {
            Action::Cancel => {
                sink.cancel_speech();
            }
            Action::Speak(text) => {
                sink.speak(text);
            }
        }
    }

    debug!("[SESSION] Dispatched {} actions", actions.len());
    actions.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::speech::sink::tests::{FakeEngine, RecordingChannel};
    use crate::speech::SpeechCapability;
    use crate::transport::TransportError;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::io;
    use std::rc::Rc;

    /// Transport replaying a fixed script of reads.
    #[derive(Default)]
    struct ScriptedTransport {
        connect_error: bool,
        reads: VecDeque<Result<Option<String>, TransportError>>,
        fail_writes: bool,
        writes: Vec<String>,
        read_calls: usize,
        close_calls: usize,
    }

    impl ScriptedTransport {
        fn with_reads(reads: Vec<Result<Option<String>, TransportError>>) -> Self {
            Self {
                reads: reads.into(),
                ..Default::default()
            }
        }
    }

    impl Transport for ScriptedTransport {
        fn connect(&mut self) -> Result<(), TransportError> {
            if self.connect_error {
                return Err(TransportError::Connect(io::Error::new(
                    io::ErrorKind::Other,
                    "pipe busy",
                )));
            }
            Ok(())
        }

        fn read(&mut self) -> Result<Option<String>, TransportError> {
            self.read_calls += 1;
            self.reads.pop_front().unwrap_or(Ok(None))
        }

        fn write(&mut self, message: &str) -> Result<(), TransportError> {
            if self.fail_writes {
                return Err(TransportError::Io(io::Error::new(
                    io::ErrorKind::BrokenPipe,
                    "pipe broken",
                )));
            }
            self.writes.push(message.to_string());
            Ok(())
        }

        fn close(&mut self) {
            self.close_calls += 1;
        }
    }

    fn message(text: &str) -> Result<Option<String>, TransportError> {
        Ok(Some(text.to_string()))
    }

    fn console_sink() -> SpeechSink<RecordingChannel> {
        SpeechSink::with_side_channel(SpeechCapability::Unavailable, RecordingChannel::default())
    }

    #[test]
    fn end_of_stream_closes_without_acknowledgment() {
        let mut transport = ScriptedTransport::with_reads(vec![Ok(None)]);
        let mut sink = console_sink();

        let report = Session::new(&mut transport, &mut sink).run();

        assert_eq!(report.end, SessionEnd::PeerClosed);
        assert_eq!(report.messages_handled, 0);
        assert!(transport.writes.is_empty());
        assert_eq!(transport.close_calls, 1);
        assert_eq!(
            sink.side_channel().emitted,
            vec![READY_ANNOUNCEMENT, FAREWELL_ANNOUNCEMENT]
        );
    }

    #[test]
    fn every_message_is_acknowledged() {
        let mut transport = ScriptedTransport::with_reads(vec![
            message("STOP|SPEAK|Hello"),
            message(""),
            message("CONTEXT|menu|SPEAK|Ready"),
            Ok(None),
        ]);
        let mut sink = console_sink();

        let report = Session::new(&mut transport, &mut sink).run();

        assert_eq!(report.messages_handled, 3);
        assert_eq!(transport.writes, vec!["OK", "OK", "OK"]);
        assert_eq!(transport.close_calls, 1);
        assert_eq!(
            sink.side_channel().emitted,
            vec![READY_ANNOUNCEMENT, "Hello", "Ready", FAREWELL_ANNOUNCEMENT]
        );
    }

    #[test]
    fn read_fault_closes_session() {
        let mut transport = ScriptedTransport::with_reads(vec![
            message("SPEAK|one"),
            Err(TransportError::MessageTooLarge { limit: 16 }),
            message("SPEAK|never read"),
        ]);
        let mut sink = console_sink();

        let report = Session::new(&mut transport, &mut sink).run();

        assert!(matches!(report.end, SessionEnd::TransportFault(_)));
        assert_eq!(report.messages_handled, 1);
        assert_eq!(transport.read_calls, 2);
        assert_eq!(transport.close_calls, 1);
        assert_eq!(
            sink.side_channel().emitted,
            vec![READY_ANNOUNCEMENT, "one", FAREWELL_ANNOUNCEMENT]
        );
    }

    #[test]
    fn write_fault_closes_session() {
        let mut transport = ScriptedTransport::with_reads(vec![message("hello"), message("again")]);
        transport.fail_writes = true;
        let mut sink = console_sink();

        let report = Session::new(&mut transport, &mut sink).run();

        assert!(matches!(report.end, SessionEnd::TransportFault(_)));
        assert_eq!(transport.read_calls, 1);
        assert_eq!(transport.close_calls, 1);
    }

    #[test]
    fn connect_failure_still_releases_transport() {
        let mut transport = ScriptedTransport {
            connect_error: true,
            ..Default::default()
        };
        let mut sink = console_sink();

        let report = Session::new(&mut transport, &mut sink).run();

        assert!(matches!(report.end, SessionEnd::ConnectFailed(_)));
        assert_eq!(transport.read_calls, 0);
        assert_eq!(transport.close_calls, 1);
        assert_eq!(sink.side_channel().emitted, vec![FAREWELL_ANNOUNCEMENT]);
    }

    #[test]
    fn running_engine_hears_startup_and_commands() {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let mut sink = SpeechSink::with_side_channel(
            SpeechCapability::Loaded(Box::new(FakeEngine::healthy(Rc::clone(&calls)))),
            RecordingChannel::default(),
        );
        let mut transport =
            ScriptedTransport::with_reads(vec![message("STOP|SPEAK|Hello"), Ok(None)]);

        Session::new(&mut transport, &mut sink).run();

        assert_eq!(
            *calls.borrow(),
            vec![
                "test_if_running".to_string(),
                format!("speak:{}", STARTUP_ANNOUNCEMENT),
                format!("speak:{}", READY_ANNOUNCEMENT),
                "cancel".to_string(),
                "speak:Hello".to_string(),
                format!("speak:{}", FAREWELL_ANNOUNCEMENT),
            ]
        );
        assert!(sink.side_channel().emitted.is_empty());
    }

    #[test]
    fn session_transitions_follow_the_state_machine() {
        use SessionState::*;

        let mut state = Idle;
        for next in [Connected, Reading, Dispatching, Reading, Closed] {
            assert!(state.can_enter(next), "{:?} -> {:?}", state, next);
            enter(&mut state, next);
        }
        assert_eq!(state, Closed);

        assert!(Idle.can_enter(Closed));
        assert!(Dispatching.can_enter(Closed));
        assert!(!Idle.can_enter(Reading));
        assert!(!Connected.can_enter(Dispatching));
        assert!(!Closed.can_enter(Reading));
        assert!(!Closed.can_enter(Closed));
    }

    #[test]
    fn dispatch_applies_actions_in_order() {
        let mut sink = console_sink();

        assert_eq!(dispatch(&mut sink, "SPEAK|a|b|STOP|SPEAK"), 3);
        assert_eq!(dispatch(&mut sink, "   "), 0);
        assert_eq!(dispatch(&mut sink, "SPEAK|"), 1);
        assert_eq!(sink.side_channel().emitted, vec!["a", "b"]);
    }
}

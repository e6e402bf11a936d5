//! Session loop: one controller connection, one command at a time.
//!
//! A [`Session`] owns its WebSocket stream exclusively.  For each inbound
//! message it:
//!
//! 1. decodes the text with [`decode_inbound`],
//! 2. hands the result to the shared [`CommandDispatcher`] on Tokio's
//!    blocking pool,
//! 3. sends the [`CommandResult`] back before reading the next message.
//!
//! The protocol is strictly request/response per connection: acknowledgement
//! N is on the wire before message N+1 is read, so results come back in
//! arrival order, one per message.
//!
//! # What ends a session
//!
//! Only the transport.  A Close frame, end of stream or a reset connection
//! ends the loop normally; any other read or write error ends it with an
//! error.  Nothing a controller puts *inside* a message can end the session:
//! decode failures, backend failures and even a panicking backend all turn
//! into `{"ok":false}` for that message.

use std::fmt;
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::sync::Arc;

use agent_core::dispatch::CommandDispatcher;
use agent_core::protocol::{decode_inbound, CommandResult, Inbound};
use anyhow::Context;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio_tungstenite::tungstenite::{error::ProtocolError, Error as WsError, Message as WsMessage};
use serde_json::Value;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Whether an acknowledgement made it onto the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delivery {
    Sent,
    /// The controller disconnected before the reply could be written.
    PeerGone,
}

/// One accepted controller connection and its command-processing state.
pub struct Session<S> {
    id: Uuid,
    peer: SocketAddr,
    stream: S,
    processed: u64,
}

impl<S> Session<S>
where
    S: Stream<Item = Result<WsMessage, WsError>> + Sink<WsMessage, Error = WsError> + Unpin,
{
    /// Wraps an established WebSocket stream.
    pub fn new(stream: S, peer: SocketAddr) -> Self {
        Self {
            id: Uuid::new_v4(),
            peer,
            stream,
            processed: 0,
        }
    }

    /// Returns the identifier used for this session in log lines.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Runs the loop until the controller disconnects.
    ///
    /// Returns the number of acknowledgements sent.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport fails while reading or writing.  No
    /// further acknowledgements are sent after that point.
    pub async fn run(mut self, dispatcher: Arc<CommandDispatcher>) -> anyhow::Result<u64> {
        info!("{self}: session started");
        let tag = self.to_string();

        loop {
            let frame = match self.stream.next().await {
                Some(Ok(frame)) => frame,
                Some(Err(e)) if is_peer_gone(&e) => {
                    debug!("{self}: controller went away: {e}");
                    break;
                }
                Some(Err(e)) => {
                    return Err(e).with_context(|| format!("{self}: read failed"));
                }
                None => {
                    debug!("{self}: stream ended");
                    break;
                }
            };

            let text = match frame {
                WsMessage::Text(text) => text,
                WsMessage::Binary(bytes) => match String::from_utf8(bytes) {
                    Ok(text) => text,
                    Err(_) => {
                        warn!("{self}: binary message is not valid UTF-8");
                        let invalid = CommandResult::failure("binary message is not valid UTF-8");
                        if self.reply(&invalid).await? == Delivery::PeerGone {
                            break;
                        }
                        continue;
                    }
                },
                // Control frames; tungstenite answers pings itself.
                WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Frame(_) => continue,
                WsMessage::Close(_) => {
                    debug!("{self}: close frame received");
                    break;
                }
            };

            let result = process(&tag, &dispatcher, &text).await;
            if self.reply(&result).await? == Delivery::PeerGone {
                break;
            }
        }

        Ok(self.processed)
    }

    /// Sends one acknowledgement.  A controller that has already gone is
    /// reported as [`Delivery::PeerGone`], not as an error.
    async fn reply(&mut self, result: &CommandResult) -> anyhow::Result<Delivery> {
        let json = serde_json::to_string(result).context("failed to encode acknowledgement")?;
        match self.stream.send(WsMessage::Text(json)).await {
            Ok(()) => {
                self.processed += 1;
                Ok(Delivery::Sent)
            }
            Err(e) if is_peer_gone(&e) => {
                debug!("{self}: controller went away before the reply was sent: {e}");
                Ok(Delivery::PeerGone)
            }
            Err(e) => Err(e).with_context(|| format!("{self}: send failed")),
        }
    }
}

impl<S> fmt::Display for Session<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session {} ({})", self.id, self.peer)
    }
}

/// Decodes and executes one message.  Always yields a result.
async fn process(tag: &str, dispatcher: &Arc<CommandDispatcher>, text: &str) -> CommandResult {
    let inbound = match decode_inbound(text) {
        Ok(inbound) => inbound,
        Err(e) => {
            warn!("{tag}: rejected message: {e}");
            return CommandResult::failure(e.to_string());
        }
    };

    let label = inbound_label(&inbound);
    debug!("{tag}: dispatching {label}");

    let dispatcher = Arc::clone(dispatcher);
    match tokio::task::spawn_blocking(move || dispatcher.handle(&inbound)).await {
        Ok(result) => result,
        Err(e) => {
            error!("{tag}: {label} handler aborted: {e}");
            CommandResult::failure(format!("{label} aborted: {e}"))
        }
    }
}

/// Transport errors that only mean the controller disconnected.
fn is_peer_gone(err: &WsError) -> bool {
    match err {
        WsError::ConnectionClosed | WsError::AlreadyClosed => true,
        WsError::Protocol(
            ProtocolError::ResetWithoutClosingHandshake | ProtocolError::SendAfterClosing,
        ) => true,
        WsError::Io(io) => matches!(
            io.kind(),
            ErrorKind::BrokenPipe | ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted
        ),
        _ => false,
    }
}

/// Short name for log lines.  Never includes the key value.
fn inbound_label(inbound: &Inbound) -> String {
    match inbound {
        Inbound::Command(command) => command.kind().to_string(),
        Inbound::Unknown(Value::Null) => "unnamed command".to_owned(),
        Inbound::Unknown(Value::String(name)) => format!("unknown command '{name}'"),
        Inbound::Unknown(other) => format!("unknown command {other}"),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::io;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    use agent_core::dispatch::{Automation, AutomationError};
    use agent_core::protocol::{Command, CommandKind};
    use tokio::io::DuplexStream;
    use tokio::task::JoinHandle;
    use tokio_tungstenite::tungstenite::protocol::Role;
    use tokio_tungstenite::WebSocketStream;

    use crate::infrastructure::automation::{AutomationCall, MockAutomation};

    type Client = WebSocketStream<DuplexStream>;

    /// Builds an in-memory WebSocket pair and runs a session on the server end.
    async fn start_session(
        automation: Arc<dyn Automation>,
    ) -> (Client, JoinHandle<anyhow::Result<u64>>) {
        let (server_io, client_io) = tokio::io::duplex(64 * 1024);
        let server = WebSocketStream::from_raw_socket(server_io, Role::Server, None).await;
        let client = WebSocketStream::from_raw_socket(client_io, Role::Client, None).await;

        let dispatcher = Arc::new(CommandDispatcher::new(automation));
        let session = Session::new(server, "127.0.0.1:50000".parse().unwrap());
        let handle = tokio::spawn(session.run(dispatcher));
        (client, handle)
    }

    /// Reads the next acknowledgement, skipping control frames.
    async fn next_result(client: &mut Client) -> CommandResult {
        loop {
            match client.next().await {
                Some(Ok(WsMessage::Text(text))) => return serde_json::from_str(&text).unwrap(),
                Some(Ok(WsMessage::Ping(_) | WsMessage::Pong(_))) => continue,
                other => panic!("expected a text acknowledgement, got {other:?}"),
            }
        }
    }

    async fn send_text(client: &mut Client, text: &str) {
        client.send(WsMessage::Text(text.to_string())).await.unwrap();
    }

    #[tokio::test]
    async fn test_each_message_gets_one_result_in_order() {
        // Arrange
        let automation = Arc::new(MockAutomation::new());
        let (mut client, handle) = start_session(automation.clone()).await;

        // Act
        send_text(&mut client, r#"{"cmd":"key","value":"a"}"#).await;
        let first = next_result(&mut client).await;
        send_text(&mut client, r#"{"cmd":"click"}"#).await;
        let second = next_result(&mut client).await;
        send_text(&mut client, r#"{"cmd":"screenshot"}"#).await;
        let third = next_result(&mut client).await;
        client.close(None).await.unwrap();

        // Assert
        assert_eq!(first, CommandResult::success(CommandKind::Key));
        assert_eq!(second, CommandResult::success(CommandKind::Click));
        assert_eq!(third, CommandResult::success(CommandKind::Screenshot));
        assert_eq!(
            automation.calls(),
            vec![
                AutomationCall::Key("a".to_string()),
                AutomationCall::Click,
                AutomationCall::Screenshot,
            ]
        );
        assert_eq!(handle.await.unwrap().unwrap(), 3);
    }

    #[tokio::test]
    async fn test_malformed_message_fails_and_session_continues() {
        let (mut client, handle) = start_session(Arc::new(MockAutomation::new())).await;

        send_text(&mut client, "this is not json").await;
        let bad = next_result(&mut client).await;
        send_text(&mut client, r#"{"cmd":"click"}"#).await;
        let good = next_result(&mut client).await;
        client.close(None).await.unwrap();

        assert!(matches!(&bad, CommandResult::Failed { error } if !error.is_empty()));
        assert!(good.is_ok());
        assert_eq!(handle.await.unwrap().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_binary_utf8_message_is_processed_like_text() {
        let automation = Arc::new(MockAutomation::new());
        let (mut client, handle) = start_session(automation.clone()).await;

        client
            .send(WsMessage::Binary(br#"{"cmd":"click"}"#.to_vec()))
            .await
            .unwrap();
        let result = next_result(&mut client).await;
        client.close(None).await.unwrap();

        assert_eq!(result, CommandResult::success(CommandKind::Click));
        assert_eq!(automation.calls(), vec![AutomationCall::Click]);
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_binary_non_utf8_message_fails_without_dispatch() {
        let automation = Arc::new(MockAutomation::new());
        let (mut client, handle) = start_session(automation.clone()).await;

        client
            .send(WsMessage::Binary(vec![0xff, 0xfe, 0x00]))
            .await
            .unwrap();
        let result = next_result(&mut client).await;
        client.close(None).await.unwrap();

        assert!(!result.is_ok());
        assert!(automation.calls().is_empty());
        assert_eq!(handle.await.unwrap().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_ping_is_not_acknowledged() {
        let (mut client, handle) = start_session(Arc::new(MockAutomation::new())).await;

        client.send(WsMessage::Ping(b"hi".to_vec())).await.unwrap();
        send_text(&mut client, r#"{"cmd":"noop"}"#).await;
        let result = next_result(&mut client).await;
        client.close(None).await.unwrap();

        // The only acknowledgement is for the text message.
        assert_eq!(result, CommandResult::acknowledged("noop"));
        assert_eq!(handle.await.unwrap().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_dropped_client_ends_session_cleanly() {
        let (mut client, handle) = start_session(Arc::new(MockAutomation::new())).await;

        send_text(&mut client, r#"{"cmd":"click"}"#).await;
        next_result(&mut client).await;
        drop(client);

        assert_eq!(handle.await.unwrap().unwrap(), 1);
    }

    /// Delivers the queued frames, then fails every send with `send_error`.
    struct DeadOnSend {
        inbound: VecDeque<WsMessage>,
        send_error: fn() -> WsError,
    }

    impl DeadOnSend {
        fn new(frames: &[&str], send_error: fn() -> WsError) -> Self {
            Self {
                inbound: frames.iter().map(|f| WsMessage::Text(f.to_string())).collect(),
                send_error,
            }
        }
    }

    impl Stream for DeadOnSend {
        type Item = Result<WsMessage, WsError>;

        fn poll_next(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
            Poll::Ready(self.inbound.pop_front().map(Ok))
        }
    }

    impl Sink<WsMessage> for DeadOnSend {
        type Error = WsError;

        fn poll_ready(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), WsError>> {
            Poll::Ready(Ok(()))
        }

        fn start_send(self: Pin<&mut Self>, _item: WsMessage) -> Result<(), WsError> {
            Err((self.send_error)())
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), WsError>> {
            Poll::Ready(Ok(()))
        }

        fn poll_close(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), WsError>> {
            Poll::Ready(Ok(()))
        }
    }

    async fn run_dead_on_send(send_error: fn() -> WsError) -> anyhow::Result<u64> {
        let stream = DeadOnSend::new(&[r#"{"cmd":"click"}"#, r#"{"cmd":"click"}"#], send_error);
        let automation = Arc::new(MockAutomation::new());
        let dispatcher = Arc::new(CommandDispatcher::new(automation));
        Session::new(stream, "127.0.0.1:50001".parse().unwrap())
            .run(dispatcher)
            .await
    }

    #[tokio::test]
    async fn test_reply_to_closed_connection_ends_session_cleanly() {
        let result = run_dead_on_send(|| WsError::ConnectionClosed).await;

        // Nothing was delivered, and the loop stopped at the first reply.
        assert_eq!(result.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_reply_into_broken_pipe_ends_session_cleanly() {
        let result = run_dead_on_send(|| WsError::Io(io::Error::from(ErrorKind::BrokenPipe))).await;

        assert_eq!(result.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_other_send_errors_are_still_reported() {
        let result = run_dead_on_send(|| WsError::Io(io::Error::other("disk on fire"))).await;

        let err = result.unwrap_err();
        assert!(format!("{err:#}").contains("send failed"), "{err:#}");
    }

    #[test]
    fn test_peer_gone_classification() {
        assert!(is_peer_gone(&WsError::ConnectionClosed));
        assert!(is_peer_gone(&WsError::Protocol(
            ProtocolError::ResetWithoutClosingHandshake
        )));
        assert!(is_peer_gone(&WsError::Io(io::Error::from(
            ErrorKind::ConnectionReset
        ))));
        assert!(!is_peer_gone(&WsError::Io(io::Error::from(
            ErrorKind::PermissionDenied
        ))));
        assert!(!is_peer_gone(&WsError::Utf8));
    }

    struct PanickingAutomation;

    impl Automation for PanickingAutomation {
        fn press_key(&self, _key: &str) -> Result<(), AutomationError> {
            panic!("backend bug");
        }

        fn click_primary(&self) -> Result<(), AutomationError> {
            Ok(())
        }

        fn capture_screen(&self) -> Result<(), AutomationError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_panicking_backend_becomes_failed_result() {
        // Arrange
        let (mut client, handle) = start_session(Arc::new(PanickingAutomation)).await;

        // Act
        send_text(&mut client, r#"{"cmd":"key","value":"a"}"#).await;
        let panicked = next_result(&mut client).await;
        send_text(&mut client, r#"{"cmd":"click"}"#).await;
        let after = next_result(&mut client).await;
        client.close(None).await.unwrap();

        // Assert: the panic is contained to its own command
        let CommandResult::Failed { error } = &panicked else {
            panic!("expected failure, got {panicked:?}");
        };
        assert!(error.starts_with("key aborted"), "{error}");
        assert_eq!(after, CommandResult::success(CommandKind::Click));
        assert_eq!(handle.await.unwrap().unwrap(), 2);
    }

    #[test]
    fn test_inbound_label_hides_key_value() {
        let label = inbound_label(&Inbound::Command(Command::Key {
            value: "hunter2".to_string(),
        }));
        assert_eq!(label, "key");
        assert!(!label.contains("hunter2"));
    }

    #[test]
    fn test_inbound_label_for_unknown_commands() {
        assert_eq!(
            inbound_label(&Inbound::Unknown(Value::from("noop"))),
            "unknown command 'noop'"
        );
        assert_eq!(
            inbound_label(&Inbound::Unknown(Value::from(5))),
            "unknown command 5"
        );
        assert_eq!(inbound_label(&Inbound::Unknown(Value::Null)), "unnamed command");
    }
}

//! Session loop for one connection to a primary
//!
//! Strictly sequential: read a frame, parse it, dispatch it, write the reply
//! if there is one, then read the next frame.

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};

use super::transport::{FrameTransport, TransportError};
use crate::dispatch::{
    DispatchError, Dispatcher, HandlerContext, Outcome, SessionState, TerminationReason,
};
use crate::input::InputSink;
use crate::protocol::{names, Codec, EncodeError, ParsedMessage};
use crate::screen::DisplayGeometry;

/// Session errors
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("Failed to encode reply: {0}")]
    Encode(#[from] EncodeError),

    #[error("No frame from server for {0:?}")]
    KeepAliveTimeout(Duration),
}

pub type SessionResult<T> = Result<T, SessionError>;

/// How a session ended without error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    /// The primary closed the stream between frames
    PeerClosed,
    /// A handler asked for the connection to be closed
    Terminated(TerminationReason),
}

/// Protocol state of the client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    /// Waiting for the handshake
    Unauthenticated,
    /// Handshake answered
    Active,
    /// Connection closed
    Terminated,
}

/// Per-session counters
#[derive(Debug, Clone, Default)]
pub struct SessionStats {
    pub frames_received: u64,
    pub replies_sent: u64,
    pub decode_failures: u64,
    pub unhandled: u64,
}

/// One client session over a byte stream
pub struct Session<S> {
    transport: FrameTransport<S>,
    codec: Codec,
    dispatcher: Arc<Dispatcher>,
    input: Box<dyn InputSink>,
    display: Box<dyn DisplayGeometry>,
    state: SessionState,
    client_state: ClientState,
    idle_timeout: Option<Duration>,
    stats: SessionStats,
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(
        transport: FrameTransport<S>,
        codec: Codec,
        dispatcher: Arc<Dispatcher>,
        input: Box<dyn InputSink>,
        display: Box<dyn DisplayGeometry>,
        state: SessionState,
    ) -> Self {
        Self {
            transport,
            codec,
            dispatcher,
            input,
            display,
            state,
            client_state: ClientState::Unauthenticated,
            idle_timeout: None,
            stats: SessionStats::default(),
        }
    }

    /// End the session if no frame arrives within `timeout`
    pub fn with_idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.idle_timeout = timeout;
        self
    }

    pub fn client_state(&self) -> ClientState {
        self.client_state
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// Run until the primary closes, a handler terminates, or an error occurs
    pub async fn run(&mut self) -> SessionResult<SessionEnd> {
        let result = self.run_inner().await;
        self.client_state = ClientState::Terminated;

        match &result {
            Ok(end) => tracing::info!("Session ended: {:?}", end),
            Err(e) => {
                tracing::error!("Session failed: {}", e);
                if let Err(close_err) = self.transport.close().await {
                    tracing::debug!("Error closing transport: {}", close_err);
                }
            }
        }
        result
    }

    async fn run_inner(&mut self) -> SessionResult<SessionEnd> {
        loop {
            let frame = match self.next_frame().await? {
                Some(frame) => frame,
                None => return Ok(SessionEnd::PeerClosed),
            };
            self.stats.frames_received += 1;

            let message = match self.codec.parse(&frame) {
                Ok(message) => message,
                Err(e) => {
                    self.stats.decode_failures += 1;
                    tracing::warn!("Dropping frame ({}): {:02x?}", e, frame.as_ref());
                    continue;
                }
            };
            tracing::debug!("<- {}", message);

            let outcome = {
                let mut ctx = HandlerContext::new(
                    self.input.as_mut(),
                    self.display.as_ref(),
                    &mut self.state,
                );
                self.dispatcher.dispatch(&mut ctx, &message)
            };

            match outcome {
                Ok(Outcome::Done) => {}
                Ok(Outcome::Reply(reply)) => {
                    self.send(&reply).await?;
                    if message.name == names::HELLO
                        && self.client_state == ClientState::Unauthenticated
                    {
                        self.client_state = ClientState::Active;
                        tracing::info!("Handshake complete as '{}'", self.state.client_name);
                    }
                }
                Ok(Outcome::Terminate(reason)) => {
                    tracing::info!("Terminating: {}", reason);
                    self.transport.close().await?;
                    return Ok(SessionEnd::Terminated(reason));
                }
                Err(DispatchError::Unhandled { name, key }) => {
                    self.stats.unhandled += 1;
                    tracing::warn!("Unhandled message {} (no handler '{}'): {}", name, key, message);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    async fn next_frame(&mut self) -> SessionResult<Option<bytes::Bytes>> {
        match self.idle_timeout {
            Some(limit) => tokio::time::timeout(limit, self.transport.read_frame())
                .await
                .map_err(|_| SessionError::KeepAliveTimeout(limit))?
                .map_err(SessionError::from),
            None => Ok(self.transport.read_frame().await?),
        }
    }

    async fn send(&mut self, message: &ParsedMessage) -> SessionResult<()> {
        let payload = self.codec.format(message)?;
        self.transport.write_frame(&payload).await?;
        self.stats.replies_sent += 1;
        tracing::debug!("-> {}", message);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{standard_handlers, HandlerTable, ProtocolVersion};
    use crate::input::{InputEvent, RecordingInputSink};
    use crate::protocol::Registry;
    use crate::screen::{ScreenGeometry, StaticDisplay};
    use tokio::io::{AsyncWriteExt, DuplexStream};

    fn session_with(
        stream: DuplexStream,
        table: HandlerTable,
        sink: RecordingInputSink,
    ) -> Session<DuplexStream> {
        let registry = Arc::new(Registry::standard().unwrap());
        let dispatcher = Arc::new(Dispatcher::new(table, &registry));
        Session::new(
            FrameTransport::new(stream),
            Codec::new(registry),
            dispatcher,
            Box::new(sink),
            Box::new(StaticDisplay::new(ScreenGeometry::centered(0, 0, 1920, 1080))),
            SessionState::new("tablet", ProtocolVersion::default()),
        )
    }

    #[tokio::test]
    async fn test_handshake_then_peer_close() {
        let (client, server) = tokio::io::duplex(1024);
        let mut session = session_with(client, standard_handlers(), RecordingInputSink::new());
        let mut primary = FrameTransport::new(server);

        primary.write_frame(b"Synergy\x00\x01\x00\x06").await.unwrap();
        let peer = tokio::spawn(async move {
            let reply = primary.read_frame().await.unwrap().unwrap();
            primary.close().await.unwrap();
            reply
        });

        let end = session.run().await.unwrap();
        assert_eq!(end, SessionEnd::PeerClosed);
        assert_eq!(
            peer.await.unwrap().as_ref(),
            b"Synergy\x00\x01\x00\x06\x00\x00\x00\x06tablet"
        );
        assert_eq!(session.stats().replies_sent, 1);
        assert_eq!(
            session.state().server_version,
            Some(ProtocolVersion::new(1, 6))
        );
    }

    #[tokio::test]
    async fn test_close_after_handshake() {
        let (client, server) = tokio::io::duplex(1024);
        let mut session = session_with(client, standard_handlers(), RecordingInputSink::new());
        let mut primary = FrameTransport::new(server);
        assert_eq!(session.client_state(), ClientState::Unauthenticated);

        primary.write_frame(b"Synergy\x00\x01\x00\x06").await.unwrap();
        primary.write_frame(b"CBYE").await.unwrap();

        let end = session.run().await.unwrap();
        assert_eq!(end, SessionEnd::Terminated(TerminationReason::Closed));
        assert_eq!(session.client_state(), ClientState::Terminated);
    }

    #[tokio::test]
    async fn test_bad_frames_skipped() {
        let (client, server) = tokio::io::duplex(1024);
        let sink = RecordingInputSink::new();
        let mut session = session_with(client, standard_handlers(), sink.clone());
        let mut primary = FrameTransport::new(server);

        primary.write_frame(b"ZZZZ").await.unwrap();
        primary.write_frame(b"DMM").await.unwrap();
        primary.write_frame(b"DMMV\x00\x10").await.unwrap();
        primary.write_frame(b"DMMV\x00\x10\x00\x20").await.unwrap();
        primary.close().await.unwrap();

        let end = session.run().await.unwrap();
        assert_eq!(end, SessionEnd::PeerClosed);
        assert_eq!(session.stats().frames_received, 4);
        assert_eq!(session.stats().decode_failures, 3);
        assert_eq!(sink.events(), vec![InputEvent::MouseMove { x: 16, y: 32 }]);
    }

    #[tokio::test]
    async fn test_unhandled_message_continues() {
        let (client, server) = tokio::io::duplex(1024);
        let mut session = session_with(client, HandlerTable::new(), RecordingInputSink::new());
        let mut primary = FrameTransport::new(server);

        primary.write_frame(b"QINF").await.unwrap();
        primary.write_frame(b"CALV").await.unwrap();
        primary.close().await.unwrap();

        assert_eq!(session.run().await.unwrap(), SessionEnd::PeerClosed);
        assert_eq!(session.stats().unhandled, 2);
        assert_eq!(session.stats().replies_sent, 0);
    }

    #[tokio::test]
    async fn test_handler_failure_ends_session() {
        let (client, server) = tokio::io::duplex(1024);
        let mut session = session_with(client, standard_handlers(), RecordingInputSink::failing());
        let mut primary = FrameTransport::new(server);

        primary.write_frame(b"DMDN\x01").await.unwrap();

        let err = session.run().await.unwrap_err();
        assert!(matches!(
            err,
            SessionError::Dispatch(DispatchError::HandlerFailed { .. })
        ));
        assert_eq!(session.client_state(), ClientState::Terminated);
        assert!(primary.read_frame().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_truncated_frame_is_transport_error() {
        let (client, mut server) = tokio::io::duplex(1024);
        let mut session = session_with(client, standard_handlers(), RecordingInputSink::new());

        server.write_all(b"\x00\x00\x00\x08CALV").await.unwrap();
        server.shutdown().await.unwrap();

        let err = session.run().await.unwrap_err();
        assert!(matches!(
            err,
            SessionError::Transport(TransportError::Truncated { .. })
        ));
    }

    #[tokio::test]
    async fn test_idle_timeout() {
        let (client, _server) = tokio::io::duplex(1024);
        let mut session = session_with(client, standard_handlers(), RecordingInputSink::new())
            .with_idle_timeout(Some(Duration::from_millis(50)));

        let err = session.run().await.unwrap_err();
        assert!(matches!(err, SessionError::KeepAliveTimeout(d) if d == Duration::from_millis(50)));
    }
}

//! Synergy client
//!
//! Connects to a primary and runs one session over the connection.

use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpStream;

use super::session::{Session, SessionEnd, SessionError};
use super::transport::FrameTransport;
use super::NetworkConfig;
use crate::dispatch::{Dispatcher, SessionState};
use crate::input::InputSink;
use crate::protocol::Codec;
use crate::screen::DisplayGeometry;

/// Client errors
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Connection timeout")]
    Timeout,
}

pub type ClientResult<T> = Result<T, ClientError>;

/// Synergy client
pub struct Client {
    /// Client configuration
    config: NetworkConfig,
    codec: Codec,
    dispatcher: Arc<Dispatcher>,
}

impl Client {
    /// Create a new client
    pub fn new(config: NetworkConfig, codec: Codec, dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            config,
            codec,
            dispatcher,
        }
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    /// Open a connection to a primary
    pub async fn connect(&self, server_addr: SocketAddr) -> ClientResult<FrameTransport<TcpStream>> {
        tracing::info!("Connecting to {}", server_addr);

        let stream = tokio::time::timeout(
            self.config.connect_timeout(),
            TcpStream::connect(server_addr),
        )
        .await
        .map_err(|_| ClientError::Timeout)??;

        stream.set_nodelay(true)?;
        Ok(FrameTransport::with_max_frame_size(
            stream,
            self.config.max_frame_size,
        ))
    }

    /// Connect and run a session until it ends
    pub async fn run(
        &self,
        server_addr: SocketAddr,
        input: Box<dyn InputSink>,
        display: Box<dyn DisplayGeometry>,
        state: SessionState,
    ) -> ClientResult<SessionEnd> {
        let transport = self.connect(server_addr).await?;
        tracing::info!("Connected to {} as '{}'", server_addr, state.client_name);

        let mut session = Session::new(
            transport,
            self.codec.clone(),
            self.dispatcher.clone(),
            input,
            display,
            state,
        )
        .with_idle_timeout(self.config.idle_timeout());

        let end = session.run().await?;
        let stats = session.stats();
        tracing::debug!(
            "{} frames received, {} replies sent, {} undecodable, {} unhandled",
            stats.frames_received,
            stats.replies_sent,
            stats.decode_failures,
            stats.unhandled
        );
        Ok(end)
    }

    /// Resolve a hostname and run a session against it
    pub async fn run_hostname(
        &self,
        hostname: &str,
        input: Box<dyn InputSink>,
        display: Box<dyn DisplayGeometry>,
        state: SessionState,
    ) -> ClientResult<SessionEnd> {
        let addr = super::resolve_host(hostname, self.config.port).await?;
        self.run(addr, input, display, state).await
    }
}

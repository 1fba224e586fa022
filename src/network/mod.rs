//! Network module - Handles the TCP side of a Synergy client
//!
//! Provides:
//! - Length-prefixed frame transport
//! - The per-connection session loop
//! - Client for connecting to a primary

mod client;
mod session;
mod transport;

pub use client::*;
pub use session::*;
pub use transport::*;

use std::net::SocketAddr;
use std::time::Duration;

/// Configuration for network operations
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Port to connect to
    pub port: u16,
    /// Connection timeout in milliseconds
    pub connect_timeout_ms: u64,
    /// End the session after this long without a frame; 0 disables
    pub keep_alive_timeout_ms: u64,
    /// Maximum frame size
    pub max_frame_size: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            port: crate::protocol::DEFAULT_PORT,
            connect_timeout_ms: 5000,
            keep_alive_timeout_ms: 9000,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }
}

impl NetworkConfig {
    pub fn new(port: u16) -> Self {
        Self {
            port,
            ..Default::default()
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn idle_timeout(&self) -> Option<Duration> {
        match self.keep_alive_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }
}

/// Resolve a hostname to a socket address
pub async fn resolve_host(host: &str, port: u16) -> std::io::Result<SocketAddr> {
    use tokio::net::lookup_host;

    let mut addrs = lookup_host((host, port)).await?;

    addrs.next().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Could not resolve host: {}", host),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_timeout_disabled_by_zero() {
        let mut config = NetworkConfig::new(24801);
        assert_eq!(config.idle_timeout(), Some(Duration::from_secs(9)));
        config.keep_alive_timeout_ms = 0;
        assert_eq!(config.idle_timeout(), None);
    }

    #[tokio::test]
    async fn test_resolve_localhost() {
        let addr = resolve_host("127.0.0.1", 24800).await.unwrap();
        assert_eq!(addr.port(), 24800);
        assert!(addr.ip().is_loopback());
    }
}

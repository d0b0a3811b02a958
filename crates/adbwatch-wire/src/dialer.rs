// Connection establishment to the adb server.
//
// The watcher is generic over `Dialer` so tests can hand it in-memory
// pipes instead of sockets.

use std::future::Future;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

use crate::error::Error;

/// Host the adb server listens on unless told otherwise.
pub const DEFAULT_HOST: &str = "localhost";

/// Port the adb server listens on unless told otherwise.
pub const DEFAULT_PORT: u16 = 5037;

/// Opens a fresh duplex connection to the adb server.
pub trait Dialer: Send + Sync + 'static {
    type Conn: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    fn dial(&self) -> impl Future<Output = Result<Self::Conn, Error>> + Send;
}

/// Dials the adb server over TCP.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TcpDialer {
    pub host: String,
    pub port: u16,
    /// Upper bound on a single connect attempt.
    pub timeout: Duration,
}

impl Default for TcpDialer {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.into(),
            port: DEFAULT_PORT,
            timeout: Duration::from_secs(5),
        }
    }
}

impl TcpDialer {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// `host:port` as passed to the resolver.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Dialer for TcpDialer {
    type Conn = TcpStream;

    async fn dial(&self) -> Result<TcpStream, Error> {
        let addr = self.addr();
        tracing::debug!(%addr, "dialing adb server");

        let stream = tokio::time::timeout(self.timeout, TcpStream::connect(addr.as_str()))
            .await
            .map_err(|_| Error::Timeout {
                addr: addr.clone(),
                timeout_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
            })?
            .map_err(|source| Error::Dial { addr, source })?;

        // Snapshots are tiny; don't let Nagle sit on them.
        if let Err(e) = stream.set_nodelay(true) {
            tracing::trace!(error = %e, "set_nodelay failed");
        }

        Ok(stream)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    use super::*;

    #[test]
    fn default_targets_local_adb_server() {
        let dialer = TcpDialer::default();
        assert_eq!(dialer.addr(), "localhost:5037");
        assert_eq!(dialer.timeout, Duration::from_secs(5));
    }

    #[tokio::test]
    async fn dial_connects_to_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let accept = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            socket.read_to_end(&mut buf).await.unwrap();
            buf
        });

        let conn = TcpDialer::new("127.0.0.1", port).dial().await.unwrap();
        drop(conn);

        assert!(accept.await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn dial_refused_is_dial_failure() {
        // Bind then drop to get a port nothing listens on.
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };

        let err = TcpDialer::new("127.0.0.1", port).dial().await.unwrap_err();
        assert!(err.is_dial_failure(), "unexpected error: {err:?}");
        assert!(err.to_string().contains(&format!("127.0.0.1:{port}")));
    }
}

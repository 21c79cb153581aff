use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::time::timeout;
use tracing::debug;

use crate::buffer::MAX_PACKET_SIZE;
use crate::errors::ResolveError;

/// Sends one query datagram to a name server and waits for its reply.
///
/// Retry policy belongs to the caller; an implementation makes exactly one
/// attempt per call.
pub trait Transport {
    fn exchange(
        &self,
        request: &[u8],
        server: SocketAddr,
    ) -> impl Future<Output = Result<Vec<u8>, ResolveError>> + Send;
}

/// Plain UDP, a fresh ephemeral socket per exchange
#[derive(Debug, Clone)]
pub struct UdpTransport {
    timeout: Duration,
}

impl UdpTransport {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Transport for UdpTransport {
    async fn exchange(&self, request: &[u8], server: SocketAddr) -> Result<Vec<u8>, ResolveError> {
        let sock = UdpSocket::bind("0.0.0.0:0").await?;
        sock.connect(server).await?;
        sock.send(request).await?;

        let mut buf = [0u8; MAX_PACKET_SIZE];
        let len = timeout(self.timeout, sock.recv(&mut buf))
            .await
            .map_err(|_| ResolveError::Timeout { server })??;

        debug!("Received {} bytes from {}", len, server);
        Ok(buf[..len].to_vec())
    }
}

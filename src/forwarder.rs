use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::timeout;

use crate::error::{FirewallError, Result};

/// Relays a raw DNS query to a single configured upstream and returns the
/// raw response, unparsed. No retries, no parallel upstreams: the contract
/// is exactly what the Resolver needs on its hot path.
pub struct UpstreamForwarder {
    upstream_addr: SocketAddr,
    timeout: Duration,
}

impl UpstreamForwarder {
    pub fn new(upstream_addr: SocketAddr, timeout: Duration) -> Self {
        Self { upstream_addr, timeout }
    }

    /// Sends `query` and waits for a response whose transaction id matches
    /// the query's. Responses with another id are dropped and the wait
    /// continues until the overall timeout elapses.
    pub async fn forward(&self, query: &[u8]) -> Result<Vec<u8>> {
        if query.len() < 2 {
            return Err(FirewallError::ParseError("query too short to forward".into()));
        }
        let query_id = u16::from_be_bytes([query[0], query[1]]);

        // A fresh local socket per call -- each request's wait is isolated
        // from every other in-flight request, and nothing needs to demux
        // responses by anything other than the kernel's own port binding.
        let local_addr: SocketAddr = "0.0.0.0:0".parse().unwrap();
        let socket = UdpSocket::bind(local_addr)
            .await
            .map_err(|e| FirewallError::Upstream(e.to_string()))?;

        timeout(self.timeout, self.send_and_await(&socket, query, query_id))
            .await
            .map_err(|_| FirewallError::UpstreamTimeout)?
    }

    async fn send_and_await(&self, socket: &UdpSocket, query: &[u8], query_id: u16) -> Result<Vec<u8>> {
        socket
            .send_to(query, self.upstream_addr)
            .await
            .map_err(|e| FirewallError::Upstream(e.to_string()))?;

        let mut buf = vec![0u8; 4096];
        loop {
            let (len, from) = socket
                .recv_from(&mut buf)
                .await
                .map_err(|e| FirewallError::Upstream(e.to_string()))?;

            if from != self.upstream_addr || len < 2 {
                continue;
            }
            let response_id = u16::from_be_bytes([buf[0], buf[1]]);
            if response_id != query_id {
                continue;
            }
            return Ok(buf[..len].to_vec());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn forwards_and_returns_matching_response() {
        let upstream = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let upstream_addr = upstream.local_addr().unwrap();

        tokio::spawn(async move {
            let mut buf = vec![0u8; 512];
            let (len, from) = upstream.recv_from(&mut buf).await.unwrap();
            upstream.send_to(&buf[..len], from).await.unwrap();
        });

        let forwarder = UpstreamForwarder::new(upstream_addr, Duration::from_secs(1));
        let query = vec![0x12, 0x34, 0x01, 0x00];
        let response = forwarder.forward(&query).await.unwrap();
        assert_eq!(response, query);
    }

    #[tokio::test]
    async fn timeout_yields_upstream_timeout_error() {
        let dead_addr: SocketAddr = "127.0.0.1:1".parse().unwrap();
        let forwarder = UpstreamForwarder::new(dead_addr, Duration::from_millis(50));
        let query = vec![0xAB, 0xCD, 0x01, 0x00];
        let err = forwarder.forward(&query).await.unwrap_err();
        assert!(matches!(err, FirewallError::UpstreamTimeout | FirewallError::Upstream(_)));
    }
}

//! Network transport layer for meter communication
//!
//! A [`TcpTransport`] is one live TCP session to the meter. It is
//! constructed inside a single acquisition cycle, performs one request, and
//! is closed before the cycle returns — never cached at process scope and
//! never shared.

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

use crate::constants::{MAX_READ_REGISTERS, MBAP_HEADER_LEN};
use crate::error::{LinkError, LinkResult};
use crate::protocol::{self, ReadRequest};

/// Byte and frame counters for one connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransportStats {
    /// Requests written to the socket
    pub requests_sent: u64,
    /// Complete responses parsed from the socket
    pub responses_received: u64,
    /// Total bytes written
    pub bytes_sent: u64,
    /// Total bytes read
    pub bytes_received: u64,
}

/// One TCP session to the meter.
pub struct TcpTransport {
    stream: TcpStream,
    endpoint: String,
    response_timeout: Duration,
    next_transaction_id: u16,
    stats: TransportStats,
}

impl TcpTransport {
    /// Connect to the meter with a bounded timeout.
    ///
    /// A timeout or any connect error maps to [`LinkError::Unreachable`].
    pub async fn connect(
        endpoint: &str,
        connect_timeout: Duration,
        response_timeout: Duration,
    ) -> LinkResult<Self> {
        let stream = timeout(connect_timeout, TcpStream::connect(endpoint))
            .await
            .map_err(|_| {
                LinkError::unreachable(
                    endpoint,
                    format!("connect timed out after {connect_timeout:?}"),
                )
            })?
            .map_err(|e| LinkError::unreachable(endpoint, e))?;

        let _ = stream.set_nodelay(true);
        debug!(endpoint, "meter connection established");

        Ok(Self {
            stream,
            endpoint: endpoint.to_string(),
            response_timeout,
            next_transaction_id: 1,
            stats: TransportStats::default(),
        })
    }

    /// Perform one holding-register read transaction (FC03).
    pub async fn read_holding_registers(
        &mut self,
        unit_id: u8,
        address: u16,
        quantity: u16,
    ) -> LinkResult<Vec<u16>> {
        if quantity == 0 || quantity as usize > MAX_READ_REGISTERS {
            return Err(LinkError::read_failed(format!(
                "invalid register quantity {quantity} (1..={MAX_READ_REGISTERS})"
            )));
        }

        let request = ReadRequest {
            transaction_id: self.take_transaction_id(),
            unit_id,
            address,
            quantity,
        };
        let frame = request.encode();

        timeout(self.response_timeout, self.stream.write_all(&frame))
            .await
            .map_err(|_| LinkError::read_failed("request write timed out"))?
            .map_err(|e| LinkError::read_failed(format!("request write failed: {e}")))?;
        self.stats.requests_sent += 1;
        self.stats.bytes_sent += frame.len() as u64;

        let mut raw_header = [0u8; MBAP_HEADER_LEN];
        self.read_exact_timed(&mut raw_header).await?;
        let header = protocol::parse_mbap_header(&raw_header)?;

        let mut pdu = vec![0u8; header.pdu_len];
        self.read_exact_timed(&mut pdu).await?;
        self.stats.responses_received += 1;
        self.stats.bytes_received += (MBAP_HEADER_LEN + header.pdu_len) as u64;

        protocol::parse_read_response(&request, &header, &pdu)
    }

    /// Close the session, returning its counters for aggregation.
    ///
    /// Shutdown errors are ignored: the socket is dropped either way and the
    /// peer may already have gone away.
    pub async fn close(mut self) -> TransportStats {
        let _ = self.stream.shutdown().await;
        debug!(endpoint = %self.endpoint, "meter connection closed");
        self.stats
    }

    /// Counters accumulated so far on this session
    pub fn stats(&self) -> TransportStats {
        self.stats
    }

    async fn read_exact_timed(&mut self, buf: &mut [u8]) -> LinkResult<()> {
        timeout(self.response_timeout, self.stream.read_exact(buf))
            .await
            .map_err(|_| {
                LinkError::read_failed(format!(
                    "response timed out after {:?}",
                    self.response_timeout
                ))
            })?
            .map_err(|e| LinkError::read_failed(format!("response read failed: {e}")))?;
        Ok(())
    }

    fn take_transaction_id(&mut self) -> u16 {
        let id = self.next_transaction_id;
        self.next_transaction_id = self.next_transaction_id.wrapping_add(1).max(1);
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_connect_refused_is_unreachable() {
        // Nothing listens on the discard port of localhost
        let result = TcpTransport::connect(
            "127.0.0.1:1",
            Duration::from_millis(500),
            Duration::from_millis(500),
        )
        .await;
        assert!(matches!(result, Err(LinkError::Unreachable { .. })));
    }

    #[tokio::test]
    async fn test_zero_connect_timeout_is_unreachable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = listener.local_addr().unwrap().to_string();

        // Even with a listener present, a zero budget can never connect
        let result =
            TcpTransport::connect(&endpoint, Duration::ZERO, Duration::from_millis(500)).await;
        assert!(matches!(result, Err(LinkError::Unreachable { .. })));
    }

    #[tokio::test]
    async fn test_silent_peer_times_out_as_read_failed() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = listener.local_addr().unwrap().to_string();

        // Accept the connection but never answer
        let server = tokio::spawn(async move {
            let (_stream, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let mut transport = TcpTransport::connect(
            &endpoint,
            Duration::from_secs(1),
            Duration::from_millis(100),
        )
        .await
        .unwrap();

        let result = transport.read_holding_registers(1, 0, 3).await;
        assert!(matches!(result, Err(LinkError::ReadFailed { .. })));

        let stats = transport.close().await;
        assert_eq!(stats.requests_sent, 1);
        assert_eq!(stats.responses_received, 0);
        server.abort();
    }

    #[tokio::test]
    async fn test_invalid_quantity_rejected_without_io() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = listener.local_addr().unwrap().to_string();

        let mut transport = TcpTransport::connect(
            &endpoint,
            Duration::from_secs(1),
            Duration::from_millis(100),
        )
        .await
        .unwrap();

        let result = transport.read_holding_registers(1, 0, 0).await;
        assert!(matches!(result, Err(LinkError::ReadFailed { .. })));
        assert_eq!(transport.stats().requests_sent, 0);
    }
}

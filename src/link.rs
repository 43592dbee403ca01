//! Meter link: device connection lifecycle and the per-cycle read
//!
//! The link owns everything about talking to one meter: endpoint, unit id,
//! register window, timeouts, and the connectivity state machine. Each
//! [`MeterLink::acquire`] call runs one complete transaction —
//! connect, read, decode, close — and always ends with the link
//! `Disconnected`, whatever the outcome. Connections are never held open
//! across cycles, so a failing device cannot leak sockets.
//!
//! State progression within one cycle:
//!
//! `Disconnected → Connecting → Connected → Reading → Disconnected`
//!
//! Retry policy deliberately lives with the caller; a single `acquire()`
//! makes exactly one attempt.

use std::time::Duration;

use tracing::debug;

use crate::constants::{
    DEFAULT_BASE_ADDRESS, DEFAULT_CONNECT_TIMEOUT_MS, DEFAULT_REGISTER_COUNT,
    DEFAULT_RESPONSE_TIMEOUT_MS, DEFAULT_TCP_PORT, DEFAULT_UNIT_ID, MIN_REGISTER_COUNT,
};
use crate::decoder::decode_registers;
use crate::error::LinkResult;
use crate::reading::{Reading, Source};
use crate::transport::{TcpTransport, TransportStats};

/// Connectivity state of the link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// No session open; the resting state between cycles
    Disconnected,
    /// TCP connect in flight
    Connecting,
    /// Session established, no transaction in flight
    Connected,
    /// Read transaction in flight
    Reading,
}

/// Configuration for one meter endpoint.
///
/// # Example
///
/// ```rust
/// use voltage_pqm::LinkConfig;
/// use std::time::Duration;
///
/// let config = LinkConfig::new("192.168.1.100:502")
///     .with_unit_id(1)
///     .with_register_count(6)
///     .with_connect_timeout(Duration::from_secs(3));
/// ```
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// Meter endpoint, `host:port`
    pub endpoint: String,
    /// Modbus unit/slave identifier
    pub unit_id: u8,
    /// First register of the electrical quantities block
    pub base_address: u16,
    /// Registers read per cycle; clamped up to the mandatory three
    pub register_count: u16,
    /// Budget for establishing the TCP session
    pub connect_timeout: Duration,
    /// Budget for each write/read on the established session
    pub response_timeout: Duration,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            endpoint: format!("127.0.0.1:{DEFAULT_TCP_PORT}"),
            unit_id: DEFAULT_UNIT_ID,
            base_address: DEFAULT_BASE_ADDRESS,
            register_count: DEFAULT_REGISTER_COUNT,
            connect_timeout: Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS),
            response_timeout: Duration::from_millis(DEFAULT_RESPONSE_TIMEOUT_MS),
        }
    }
}

impl LinkConfig {
    /// Create a configuration for the given endpoint with defaults elsewhere
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }

    /// Set the unit identifier
    pub fn with_unit_id(mut self, unit_id: u8) -> Self {
        self.unit_id = unit_id;
        self
    }

    /// Set the base register address
    pub fn with_base_address(mut self, base_address: u16) -> Self {
        self.base_address = base_address;
        self
    }

    /// Set the register count; values below the mandatory three are clamped
    pub fn with_register_count(mut self, register_count: u16) -> Self {
        self.register_count = register_count.max(MIN_REGISTER_COUNT as u16);
        self
    }

    /// Set the connect timeout
    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    /// Set the response timeout
    pub fn with_response_timeout(mut self, response_timeout: Duration) -> Self {
        self.response_timeout = response_timeout;
        self
    }
}

/// Cumulative counters across acquisition cycles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkStats {
    /// Acquisition attempts made
    pub cycles: u64,
    /// Attempts that ended in any [`LinkError`]
    pub failures: u64,
    /// Requests written across all sessions
    pub requests_sent: u64,
    /// Responses parsed across all sessions
    pub responses_received: u64,
    /// Bytes written across all sessions
    pub bytes_sent: u64,
    /// Bytes read across all sessions
    pub bytes_received: u64,
}

impl LinkStats {
    fn merge(&mut self, session: TransportStats) {
        self.requests_sent += session.requests_sent;
        self.responses_received += session.responses_received;
        self.bytes_sent += session.bytes_sent;
        self.bytes_received += session.bytes_received;
    }
}

/// Anything that can produce one meter reading per call.
///
/// The acquisition cycle is generic over this seam so tests can substitute
/// scripted links for the TCP-backed [`MeterLink`].
pub trait TelemetryLink: Send {
    /// Perform one acquisition attempt.
    fn acquire(&mut self) -> impl std::future::Future<Output = LinkResult<Reading>> + Send;
}

/// TCP-backed link to a physical meter.
pub struct MeterLink {
    config: LinkConfig,
    state: LinkState,
    stats: LinkStats,
}

impl MeterLink {
    /// Create a link from its configuration.
    ///
    /// The register count is clamped up to the mandatory three quantities.
    pub fn new(mut config: LinkConfig) -> Self {
        config.register_count = config.register_count.max(MIN_REGISTER_COUNT as u16);
        Self {
            config,
            state: LinkState::Disconnected,
            stats: LinkStats::default(),
        }
    }

    /// Current connectivity state; `Disconnected` between cycles
    pub fn state(&self) -> LinkState {
        self.state
    }

    /// Cumulative counters across all cycles
    pub fn stats(&self) -> LinkStats {
        self.stats
    }

    /// The configured endpoint
    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }

    /// One complete transaction: connect, read, decode, close.
    async fn transact(&mut self) -> LinkResult<Reading> {
        self.state = LinkState::Connecting;
        let mut transport = TcpTransport::connect(
            &self.config.endpoint,
            self.config.connect_timeout,
            self.config.response_timeout,
        )
        .await?;
        self.state = LinkState::Connected;

        self.state = LinkState::Reading;
        let read = transport
            .read_holding_registers(
                self.config.unit_id,
                self.config.base_address,
                self.config.register_count,
            )
            .await;

        // Close before inspecting the outcome: the session must not outlive
        // the transaction on any path.
        self.stats.merge(transport.close().await);
        self.state = LinkState::Connected;

        let registers = read?;
        let quantities = decode_registers(&registers)?;
        debug!(
            endpoint = %self.config.endpoint,
            voltage = quantities.voltage,
            current = quantities.current,
            power = quantities.power,
            "live reading decoded"
        );
        Ok(Reading::now(
            quantities.voltage,
            quantities.current,
            quantities.power,
            Source::Live,
        ))
    }
}

impl TelemetryLink for MeterLink {
    async fn acquire(&mut self) -> LinkResult<Reading> {
        self.stats.cycles += 1;
        let outcome = self.transact().await;
        // Terminal per cycle, success or failure
        self.state = LinkState::Disconnected;
        if outcome.is_err() {
            self.stats.failures += 1;
        }
        outcome
    }
}

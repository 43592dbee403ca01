//! # Voltage PQM - Power-Quality Meter Telemetry
//!
//! Acquisition-and-persistence core for a single power-quality meter:
//! polls voltage, current, and power over Modbus TCP, substitutes a
//! plausible simulated sample whenever the device cannot answer, and
//! appends every sample durably to a local history log that serves a
//! recent-history window for display.
//!
//! ## Features
//!
//! - **Per-cycle connections**: one TCP session per poll, always closed
//!   before the cycle returns — no leaked sockets under failure
//! - **Bounded waits**: connect and response are both under explicit
//!   timeouts; an unresponsive device never blocks the process
//! - **Typed failure classes**: device-absent, device-garbled, and
//!   storage failures are distinct, so callers can fall back or warn
//! - **Honest provenance**: every sample is tagged `live` or `simulated`,
//!   and the tag survives persistence and retrieval
//! - **Durable appends**: a sample is flushed and fsynced before it is
//!   acknowledged
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use voltage_pqm::{AcquisitionCycle, LinkConfig, MeterLink, SampleStore, Simulator};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let link = MeterLink::new(LinkConfig::new("192.168.1.100:502"));
//!     let store = SampleStore::open("pqm_data.csv")?;
//!     let mut cycle = AcquisitionCycle::new(link, Simulator::new(), store);
//!
//!     // One poll: live reading, or a tagged simulated substitute
//!     let reading = cycle.run_once().await?;
//!     println!("{:.1} V ({})", reading.voltage, reading.source);
//!
//!     // Recent history for charting, most-recent-first
//!     let history = cycle.store().recent(20);
//!     println!("{} samples on record", history.len());
//!
//!     cycle.close()?;
//!     Ok(())
//! }
//! ```

// ============================================================================
// Core modules
// ============================================================================

/// Core error types and result handling
pub mod error;

/// Protocol and meter constants
pub mod constants;

/// Telemetry sample value object
pub mod reading;

/// Register decoding for the meter's electrical quantities block
pub mod decoder;

/// Modbus TCP framing for the meter transaction
pub mod protocol;

/// Network transport layer for meter communication
pub mod transport;

/// Meter link: device connection lifecycle and the per-cycle read
pub mod link;

/// Fallback sample generator
pub mod sim;

/// Append-only sample store
pub mod store;

/// Acquisition cycle orchestration
pub mod cycle;

/// Monitor configuration
pub mod config;

// ============================================================================
// Re-exports for convenience
// ============================================================================

// === Async runtime (users can use voltage_pqm::tokio) ===
pub use tokio;

// === Core API ===
pub use cycle::AcquisitionCycle;
pub use link::{LinkConfig, LinkState, LinkStats, MeterLink, TelemetryLink};
pub use reading::{Reading, Source};
pub use sim::Simulator;
pub use store::SampleStore;

// === Error handling ===
pub use error::{CycleError, DecodeError, LinkError, LinkResult, StoreError, StoreResult};

// === Configuration ===
pub use config::MonitorConfig;

// === Decoding (advanced usage) ===
pub use decoder::{decode_registers, ElectricalQuantities};

// === Transport (advanced usage) ===
pub use transport::{TcpTransport, TransportStats};

// === Commonly needed constants ===
pub use constants::{DEFAULT_POLL_INTERVAL_SECS, DEFAULT_TCP_PORT, MIN_REGISTER_COUNT};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

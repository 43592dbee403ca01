//! Acquisition cycle orchestration
//!
//! One cycle = one poll: ask the link for a reading, substitute a simulated
//! one if the device cannot answer, persist the result, hand it back for
//! display. The device being unreachable is never a cycle failure — the
//! degradation is reported through the reading's provenance tag. Only a
//! persistence failure fails the cycle, and even then the acquired reading
//! is carried in the error so the caller can still display it.
//!
//! Cycles are meant to run strictly one at a time; a periodic deployment
//! awaits `run_once()` inside a single timer loop and skips ticks that
//! elapse while a cycle is still in flight.

use tracing::{info, warn};

use crate::error::{CycleError, StoreResult};
use crate::link::TelemetryLink;
use crate::reading::Reading;
use crate::sim::Simulator;
use crate::store::SampleStore;

/// Orchestrates link, simulator, and store for one poll at a time.
pub struct AcquisitionCycle<L: TelemetryLink> {
    link: L,
    simulator: Simulator,
    store: SampleStore,
}

impl<L: TelemetryLink> AcquisitionCycle<L> {
    /// Assemble a cycle from its collaborators
    pub fn new(link: L, simulator: Simulator, store: SampleStore) -> Self {
        Self {
            link,
            simulator,
            store,
        }
    }

    /// Run one acquisition cycle.
    ///
    /// Always produces a reading: live when the meter answers, simulated
    /// otherwise. The reading is appended to the store before returning;
    /// if that append fails the cycle returns
    /// [`CycleError::PersistFailure`] carrying the reading.
    pub async fn run_once(&mut self) -> Result<Reading, CycleError> {
        let reading = match self.link.acquire().await {
            Ok(reading) => {
                info!(
                    voltage = reading.voltage,
                    current = reading.current,
                    power = reading.power,
                    "live sample acquired"
                );
                reading
            }
            Err(err) => {
                warn!(error = %err, "meter unavailable, substituting simulated sample");
                self.simulator.simulate()
            }
        };

        if let Err(err) = self.store.append(&reading) {
            warn!(error = %err, "sample acquired but not persisted");
            return Err(CycleError::PersistFailure {
                reading,
                source: err,
            });
        }

        Ok(reading)
    }

    /// The backing store, for recency queries at the presentation boundary
    pub fn store(&self) -> &SampleStore {
        &self.store
    }

    /// The underlying link, for state and statistics
    pub fn link(&self) -> &L {
        &self.link
    }

    /// Shut down, closing the store durably.
    pub fn close(self) -> StoreResult<()> {
        self.store.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{LinkError, LinkResult};
    use crate::reading::Source;
    use chrono::{Duration, Utc};
    use tempfile::tempdir;

    /// Link that always answers with the same live reading.
    struct FixedLink {
        reading: Reading,
    }

    impl TelemetryLink for FixedLink {
        async fn acquire(&mut self) -> LinkResult<Reading> {
            Ok(self.reading.clone())
        }
    }

    /// Link that always fails with the given error.
    struct FailingLink {
        error: LinkError,
    }

    impl TelemetryLink for FailingLink {
        async fn acquire(&mut self) -> LinkResult<Reading> {
            Err(self.error.clone())
        }
    }

    fn open_store(dir: &tempfile::TempDir) -> SampleStore {
        SampleStore::open(dir.path().join("samples.csv")).unwrap()
    }

    #[tokio::test]
    async fn test_live_reading_is_persisted_and_returned() {
        let dir = tempdir().unwrap();
        let reading = Reading::now(230.1, 5.12, 1180.0, Source::Live);
        let link = FixedLink {
            reading: reading.clone(),
        };
        let mut cycle = AcquisitionCycle::new(link, Simulator::with_seed(1), open_store(&dir));

        let produced = cycle.run_once().await.unwrap();
        assert_eq!(produced, reading);
        assert_eq!(cycle.store().recent(1), vec![reading]);
    }

    #[tokio::test]
    async fn test_link_failure_falls_back_to_simulation() {
        let dir = tempdir().unwrap();
        let link = FailingLink {
            error: LinkError::unreachable("10.0.0.7:502", "connection refused"),
        };
        let mut cycle = AcquisitionCycle::new(link, Simulator::with_seed(2), open_store(&dir));

        let produced = cycle.run_once().await.unwrap();
        assert_eq!(produced.source, Source::Simulated);
        // The fallback sample must still be appended
        assert_eq!(cycle.store().recent(1), vec![produced]);
    }

    #[tokio::test]
    async fn test_garbled_device_also_falls_back() {
        let dir = tempdir().unwrap();
        let link = FailingLink {
            error: LinkError::read_failed("device exception 0x04: Server Device Failure"),
        };
        let mut cycle = AcquisitionCycle::new(link, Simulator::with_seed(3), open_store(&dir));

        let produced = cycle.run_once().await.unwrap();
        assert_eq!(produced.source, Source::Simulated);
    }

    #[tokio::test]
    async fn test_persist_failure_carries_the_reading() {
        let dir = tempdir().unwrap();
        let mut store = open_store(&dir);
        // Pre-seed a sample from the future so the cycle's append is
        // rejected as out of order
        let future = Reading::new(
            Utc::now() + Duration::hours(1),
            230.0,
            1.0,
            230.0,
            Source::Live,
        );
        store.append(&future).unwrap();

        let reading = Reading::now(228.7, 2.5, 571.8, Source::Live);
        let link = FixedLink {
            reading: reading.clone(),
        };
        let mut cycle = AcquisitionCycle::new(link, Simulator::with_seed(4), store);

        let err = cycle.run_once().await.unwrap_err();
        let CycleError::PersistFailure {
            reading: carried, ..
        } = err;
        // The reading survives the failure, well-formed and displayable
        assert_eq!(carried, reading);
        // Nothing was appended
        assert_eq!(cycle.store().len(), 1);
    }
}

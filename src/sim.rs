//! Fallback sample generator
//!
//! Produces plausible substitute readings when the meter cannot supply one.
//! The value ranges intentionally overlap real mains measurements, so a
//! simulated sample is distinguishable only by its `Simulated` provenance
//! tag — consumers must check the tag, never the values.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::constants::{
    SIM_CURRENT_MAX, SIM_CURRENT_MIN, SIM_POWER_FACTOR_MAX, SIM_POWER_FACTOR_MIN, SIM_VOLTAGE_MAX,
    SIM_VOLTAGE_MIN,
};
use crate::reading::{Reading, Source};

/// Deterministic-shape random generator of substitute readings.
pub struct Simulator {
    rng: StdRng,
}

impl Simulator {
    /// Create a generator seeded from OS entropy
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Create a generator with a fixed seed, for reproducible sequences
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Generate one substitute reading, stamped now and tagged `Simulated`.
    ///
    /// Voltage is uniform in [210, 240] V, current uniform in [0, 20] A,
    /// and power is voltage × current × a power factor uniform in
    /// [0.8, 1.0].
    pub fn simulate(&mut self) -> Reading {
        let voltage = self.rng.gen_range(SIM_VOLTAGE_MIN..=SIM_VOLTAGE_MAX);
        let current = self.rng.gen_range(SIM_CURRENT_MIN..=SIM_CURRENT_MAX);
        let power_factor = self.rng.gen_range(SIM_POWER_FACTOR_MIN..=SIM_POWER_FACTOR_MAX);

        Reading::now(
            voltage,
            current,
            voltage * current * power_factor,
            Source::Simulated,
        )
    }
}

impl Default for Simulator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simulated_values_stay_in_range() {
        let mut simulator = Simulator::with_seed(7);
        for _ in 0..1000 {
            let reading = simulator.simulate();
            assert_eq!(reading.source, Source::Simulated);
            assert!((SIM_VOLTAGE_MIN..=SIM_VOLTAGE_MAX).contains(&reading.voltage));
            assert!((SIM_CURRENT_MIN..=SIM_CURRENT_MAX).contains(&reading.current));

            // Power must be consistent with a power factor in [0.8, 1.0]
            let apparent = reading.voltage * reading.current;
            assert!(reading.power <= apparent * SIM_POWER_FACTOR_MAX + 1e-9);
            assert!(reading.power >= apparent * SIM_POWER_FACTOR_MIN - 1e-9);
        }
    }

    #[test]
    fn test_seeded_sequences_are_reproducible() {
        let mut a = Simulator::with_seed(42);
        let mut b = Simulator::with_seed(42);
        for _ in 0..10 {
            let ra = a.simulate();
            let rb = b.simulate();
            assert_eq!(ra.voltage, rb.voltage);
            assert_eq!(ra.current, rb.current);
            assert_eq!(ra.power, rb.power);
        }
    }
}

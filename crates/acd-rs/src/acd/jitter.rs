//! Deterministic jitter for probe timing.
//!
//! Devices without an entropy source still need to spread their probes so
//! that units booting at the same moment do not stay synchronized. The value
//! is derived from the interface MAC (see `MacAddress::jitter_seed`) and the
//! number of probes already sent.

use crate::config::AcdTimings;

/// Pseudo-random value for the current probe.
pub fn random_value(seed: u32, probes_sent: u16) -> u32 {
    seed.wrapping_add(u32::from(probes_sent))
}

/// Delay before the first probe, in `[0, probe_wait)`. Zero when PROBE_WAIT is disabled.
pub fn initial_wait(timings: &AcdTimings, random: u32) -> u16 {
    if timings.probe_wait == 0 {
        return 0;
    }
    (random % u32::from(timings.probe_wait)) as u16
}

/// Delay until the next probe, in `[probe_min, probe_max)`, or `probe_min` when the range is empty.
pub fn probe_interval(timings: &AcdTimings, random: u32) -> u16 {
    if timings.probe_max > timings.probe_min {
        let span = u32::from(timings.probe_max - timings.probe_min);
        (random % span) as u16 + timings.probe_min
    } else {
        timings.probe_min
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AcdConfig;

    #[test]
    fn test_zero_probe_wait_short_circuits() {
        let t = AcdConfig::default().validate().unwrap();
        assert_eq!(initial_wait(&t, u32::MAX), 0);
    }

    #[test]
    fn test_initial_wait_bounds() {
        let t = AcdConfig { probe_wait_ms: 1000, ..Default::default() }.validate().unwrap();
        for r in [0, 1, 9, 10, 12345, u32::MAX] {
            assert!(initial_wait(&t, r) < 10);
        }
    }

    #[test]
    fn test_probe_interval_bounds() {
        let t = AcdConfig::default().validate().unwrap();
        for r in [0, 1, 9, 10, 0x5533_2244, u32::MAX] {
            let i = probe_interval(&t, r);
            assert!((10..20).contains(&i), "interval {i} out of range");
        }
    }

    #[test]
    fn test_equal_min_max_uses_min() {
        let t = AcdConfig { probe_min_ms: 500, probe_max_ms: 500, ..Default::default() }
            .validate()
            .unwrap();
        assert_eq!(probe_interval(&t, 7), 5);
    }

    #[test]
    fn test_different_seeds_spread() {
        let t = AcdConfig::default().validate().unwrap();
        let a = probe_interval(&t, random_value(0x0100_0000, 1));
        let b = probe_interval(&t, random_value(0x0100_0003, 1));
        assert_ne!(a, b);
    }
}

//! Timing and sizing configuration for the conflict detection engine.
//!
//! `AcdConfig` holds the user-facing values in milliseconds (defaults from
//! RFC 5227, Section 1.1). It is validated once into `AcdTimings`, which holds
//! the same values converted to ticks of the periodic driver.

use crate::hal::AcdError;

/// Reference interval of the periodic driver in milliseconds.
pub const DEFAULT_TICK_INTERVAL_MS: u32 = 100;

/// Default number of detection contexts per interface.
pub const DEFAULT_MAX_CONTEXTS: usize = 8;

/// Largest registry a context handle can address.
pub const MAX_CONTEXTS_LIMIT: usize = u16::MAX as usize + 1;

/// User-facing ACD configuration. All durations are in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcdConfig {
    /// Interval at which `AcdEngine::tick` is called.
    pub tick_interval_ms: u32,
    /// Upper bound of the random delay before the first probe (PROBE_WAIT).
    pub probe_wait_ms: u32,
    /// Minimum delay between two probes (PROBE_MIN).
    pub probe_min_ms: u32,
    /// Maximum delay between two probes (PROBE_MAX).
    pub probe_max_ms: u32,
    /// Number of probes to send (PROBE_NUM).
    pub probe_num: u16,
    /// Delay between the last probe and the first announcement (ANNOUNCE_WAIT).
    pub announce_wait_ms: u32,
    /// Delay between two announcements (ANNOUNCE_INTERVAL).
    pub announce_interval_ms: u32,
    /// Number of announcements to send (ANNOUNCE_NUM).
    pub announce_num: u16,
    /// Number of consecutive conflicts before rate limiting (MAX_CONFLICTS).
    pub max_conflicts: u16,
    /// Delay imposed once `max_conflicts` is reached (RATE_LIMIT_INTERVAL).
    pub rate_limit_interval_ms: u32,
    /// Window in which a second conflict makes the host retreat (DEFEND_INTERVAL).
    pub defend_interval_ms: u32,
    /// Interval of the unsolicited defensive probes in ONGOING. 0 disables them.
    pub periodic_defend_interval_ms: u32,
    /// Maximum number of detection contexts per interface.
    pub max_contexts: usize,
}

impl Default for AcdConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            probe_wait_ms: 0,
            probe_min_ms: 1_000,
            probe_max_ms: 2_000,
            probe_num: 3,
            announce_wait_ms: 2_000,
            announce_interval_ms: 2_000,
            announce_num: 2,
            max_conflicts: 10,
            rate_limit_interval_ms: 60_000,
            defend_interval_ms: 10_000,
            periodic_defend_interval_ms: 10_000,
            max_contexts: DEFAULT_MAX_CONTEXTS,
        }
    }
}

/// Validated configuration expressed in ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcdTimings {
    pub probe_wait: u16,
    pub probe_min: u16,
    pub probe_max: u16,
    pub probe_num: u16,
    pub announce_wait: u16,
    pub announce_interval: u16,
    pub announce_num: u16,
    pub max_conflicts: u16,
    pub rate_limit_interval: u16,
    pub defend_interval: u16,
    /// 0 means periodic defense is disabled.
    pub periodic_defend_interval: u16,
    pub max_contexts: usize,
}

impl AcdConfig {
    /// Validates the configuration and converts every duration to ticks.
    pub fn validate(&self) -> Result<AcdTimings, AcdError> {
        if self.tick_interval_ms == 0 {
            return Err(AcdError::InvalidConfig("tick interval must be non-zero"));
        }
        if self.probe_min_ms > self.probe_max_ms {
            return Err(AcdError::InvalidConfig("probe_min_ms exceeds probe_max_ms"));
        }
        if self.probe_num == 0 {
            return Err(AcdError::InvalidConfig("probe_num must be at least 1"));
        }
        if self.announce_num == 0 {
            return Err(AcdError::InvalidConfig("announce_num must be at least 1"));
        }
        if self.max_conflicts == 0 {
            return Err(AcdError::InvalidConfig("max_conflicts must be at least 1"));
        }
        if self.max_contexts == 0 {
            return Err(AcdError::InvalidConfig("max_contexts must be at least 1"));
        }
        if self.max_contexts > MAX_CONTEXTS_LIMIT {
            return Err(AcdError::InvalidConfig("max_contexts exceeds 65536"));
        }

        let tick = self.tick_interval_ms;
        Ok(AcdTimings {
            probe_wait: ms_to_ticks(self.probe_wait_ms, tick)?,
            probe_min: ms_to_ticks(self.probe_min_ms, tick)?,
            probe_max: ms_to_ticks(self.probe_max_ms, tick)?,
            probe_num: self.probe_num,
            announce_wait: ms_to_ticks(self.announce_wait_ms, tick)?,
            announce_interval: ms_to_ticks(self.announce_interval_ms, tick)?.max(1),
            announce_num: self.announce_num,
            max_conflicts: self.max_conflicts,
            rate_limit_interval: ms_to_ticks(self.rate_limit_interval_ms, tick)?,
            defend_interval: ms_to_ticks(self.defend_interval_ms, tick)?,
            periodic_defend_interval: ms_to_ticks(self.periodic_defend_interval_ms, tick)?,
            max_contexts: self.max_contexts,
        })
    }
}

/// Converts milliseconds to ticks, rounding up.
pub fn ms_to_ticks(ms: u32, tick_interval_ms: u32) -> Result<u16, AcdError> {
    if ms == 0 {
        return Ok(0);
    }
    let ticks = ms.div_ceil(tick_interval_ms);
    u16::try_from(ticks).map_err(|_| AcdError::InvalidConfig("duration exceeds tick counter range"))
}

/// States of a detection context.
/// (Reference: RFC 5227, Sections 2.1 to 2.4)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AcdState {
    /// Detection is not running for this context.
    #[default]
    Off,
    /// Waiting the initial random delay before the first probe.
    ProbeWait,
    /// Sending probes for the candidate address.
    Probing,
    /// All probes sent, waiting before the first announcement.
    AnnounceWait,
    /// Sending announcements for the claimed address.
    Announcing,
    /// Address is in use; conflicts are defended and periodic probes are sent.
    Ongoing,
    /// Address is a superseded link-local fallback; conflicts cause an immediate retreat.
    PassiveOngoing,
    /// Too many consecutive conflicts; waiting before the client may try again.
    RateLimit,
}

impl AcdState {
    /// States in which the address has not been claimed yet (RFC 5227, Section 2.1.1).
    pub fn is_probing(&self) -> bool {
        matches!(self, AcdState::ProbeWait | AcdState::Probing | AcdState::AnnounceWait)
    }

    /// States in which the address is claimed (RFC 5227, Section 2.4).
    pub fn is_claimed(&self) -> bool {
        matches!(self, AcdState::Announcing | AcdState::Ongoing | AcdState::PassiveOngoing)
    }
}

/// Outcome reported to the address-acquisition client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcdOutcome {
    /// The address passed detection and may be used.
    IpOk,
    /// The address is in conflict and must not be used.
    Decline,
    /// The client should restart address acquisition.
    RestartClient,
}

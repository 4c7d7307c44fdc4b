use super::actions::AcdAction;
use super::jitter;
use super::states::{AcdOutcome, AcdState};
use crate::config::AcdTimings;
use crate::diagnostics::AcdActivity;
use crate::frame::ArpPacket;
use crate::types::MacAddress;
use alloc::vec::Vec;
use core::net::Ipv4Addr;

/// Conflict detection state for one candidate address on one interface.
///
/// All mutation goes through `start`, `stop`, `on_tick`, `on_arp` and
/// `demote`. Each returns the side effects it requires instead of performing them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectionContext {
    address: Ipv4Addr,
    state: AcdState,
    ticks_to_wait: u16,
    probes_sent: u16,
    consecutive_conflicts: u16,
    last_conflict_cooldown: u16,
}

impl Default for DetectionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectionContext {
    pub fn new() -> Self {
        Self {
            address: Ipv4Addr::UNSPECIFIED,
            state: AcdState::Off,
            ticks_to_wait: 0,
            probes_sent: 0,
            consecutive_conflicts: 0,
            last_conflict_cooldown: 0,
        }
    }

    pub fn address(&self) -> Ipv4Addr {
        self.address
    }

    pub fn state(&self) -> AcdState {
        self.state
    }

    pub fn ticks_to_wait(&self) -> u16 {
        self.ticks_to_wait
    }

    pub fn probes_sent(&self) -> u16 {
        self.probes_sent
    }

    pub fn consecutive_conflicts(&self) -> u16 {
        self.consecutive_conflicts
    }

    pub fn last_conflict_cooldown(&self) -> u16 {
        self.last_conflict_cooldown
    }

    /// True unless the context is OFF.
    pub fn is_active(&self) -> bool {
        self.state != AcdState::Off
    }

    /// Begins probing `address`. The conflict counter is kept so that rate
    /// limiting spans restarts of the address-acquisition client.
    pub fn start(&mut self, address: Ipv4Addr, timings: &AcdTimings, seed: u32) {
        self.address = address;
        self.probes_sent = 0;
        self.last_conflict_cooldown = 0;
        self.state = AcdState::ProbeWait;
        self.ticks_to_wait = jitter::initial_wait(timings, jitter::random_value(seed, self.probes_sent));
    }

    /// Forces the context OFF. Frames already sent are not retracted.
    pub fn stop(&mut self) {
        self.state = AcdState::Off;
    }

    /// Advances the context by one tick.
    pub fn on_tick(&mut self, timings: &AcdTimings, seed: u32) -> Vec<AcdAction> {
        let mut actions = Vec::new();

        self.last_conflict_cooldown = self.last_conflict_cooldown.saturating_sub(1);
        self.ticks_to_wait = self.ticks_to_wait.saturating_sub(1);
        if self.ticks_to_wait > 0 {
            return actions;
        }

        match self.state {
            AcdState::ProbeWait | AcdState::Probing => {
                self.state = AcdState::Probing;
                actions.push(AcdAction::SendProbe(self.address));
                self.probes_sent = self.probes_sent.saturating_add(1);
                if self.probes_sent >= timings.probe_num {
                    self.probes_sent = 0;
                    self.state = AcdState::AnnounceWait;
                    self.ticks_to_wait = timings.announce_wait;
                } else {
                    let random = jitter::random_value(seed, self.probes_sent);
                    self.ticks_to_wait = jitter::probe_interval(timings, random);
                }
            }
            AcdState::AnnounceWait | AcdState::Announcing => {
                if self.probes_sent == 0 {
                    self.state = AcdState::Announcing;
                    // Fast re-probing is allowed again once the address is claimed.
                    self.consecutive_conflicts = 0;
                }
                actions.push(AcdAction::SendAnnounce(self.address));
                self.ticks_to_wait = timings.announce_interval;
                self.probes_sent = self.probes_sent.saturating_add(1);
                if self.probes_sent >= timings.announce_num {
                    self.state = AcdState::Ongoing;
                    self.probes_sent = 0;
                    self.ticks_to_wait = timings.periodic_defend_interval;
                    actions.push(AcdAction::InvokeCallback(AcdOutcome::IpOk));
                }
            }
            AcdState::Ongoing => {
                if timings.periodic_defend_interval > 0 {
                    actions.push(AcdAction::SendProbe(self.address));
                    self.ticks_to_wait = timings.periodic_defend_interval;
                }
            }
            AcdState::RateLimit => {
                self.state = AcdState::Off;
                actions.push(AcdAction::InvokeCallback(AcdOutcome::RestartClient));
            }
            AcdState::PassiveOngoing | AcdState::Off => {}
        }
        actions
    }

    /// Classifies an incoming ARP packet and reacts to a conflict.
    pub fn on_arp(&mut self, packet: &ArpPacket, local_mac: MacAddress, timings: &AcdTimings) -> Vec<AcdAction> {
        let mut actions = Vec::new();
        let foreign = packet.sender_mac != local_mac;
        let holds_address = packet.sender_ip == self.address && foreign;

        if self.state.is_probing() {
            // RFC 5227, 2.1.1: someone already uses the address, or is probing it too.
            let probes_address = packet.sender_ip.is_unspecified() && packet.target_ip == self.address && foreign;
            if holds_address || probes_address {
                self.capture(packet, AcdActivity::ProbeIpv4Address, &mut actions);
                self.restart(timings, &mut actions);
            }
        } else if self.state.is_claimed() && holds_address {
            // RFC 5227, 2.4: someone else is using our address.
            self.capture(packet, AcdActivity::OngoingDetection, &mut actions);
            self.handle_ongoing_conflict(timings, &mut actions);
        }
        actions
    }

    /// Demotes the context after its address was replaced by a routable one.
    /// A claimed address keeps being watched passively; anything earlier is abandoned.
    pub fn demote(&mut self) -> Vec<AcdAction> {
        let mut actions = Vec::new();
        match self.state {
            AcdState::ProbeWait | AcdState::Probing | AcdState::AnnounceWait | AcdState::RateLimit => {
                self.state = AcdState::Off;
                actions.push(AcdAction::InvokeCallback(AcdOutcome::Decline));
            }
            AcdState::Announcing | AcdState::Ongoing => {
                self.state = AcdState::PassiveOngoing;
            }
            AcdState::Off | AcdState::PassiveOngoing => {}
        }
        actions
    }

    fn capture(&self, packet: &ArpPacket, activity: AcdActivity, actions: &mut Vec<AcdAction>) {
        actions.push(AcdAction::CaptureDiagnostic {
            activity,
            mac: packet.sender_mac,
            frame: *packet.as_bytes(),
        });
    }

    fn handle_ongoing_conflict(&mut self, timings: &AcdTimings, actions: &mut Vec<AcdAction>) {
        if self.state == AcdState::PassiveOngoing {
            // No defense for a background address: back off immediately.
            self.state = AcdState::Off;
            actions.push(AcdAction::InvokeCallback(AcdOutcome::Decline));
        } else if self.last_conflict_cooldown > 0 {
            // Second conflict inside DEFEND_INTERVAL: retreat.
            self.restart(timings, actions);
        } else {
            actions.push(AcdAction::SendAnnounce(self.address));
            self.last_conflict_cooldown = timings.defend_interval;
        }
    }

    fn restart(&mut self, timings: &AcdTimings, actions: &mut Vec<AcdAction>) {
        self.consecutive_conflicts = self.consecutive_conflicts.saturating_add(1);
        actions.push(AcdAction::InvokeCallback(AcdOutcome::Decline));
        if self.consecutive_conflicts >= timings.max_conflicts {
            // RFC 5227, 2.1.1: limit the rate of new attempts.
            self.state = AcdState::RateLimit;
            self.ticks_to_wait = timings.rate_limit_interval;
        } else {
            self.state = AcdState::Off;
            actions.push(AcdAction::InvokeCallback(AcdOutcome::RestartClient));
        }
    }
}

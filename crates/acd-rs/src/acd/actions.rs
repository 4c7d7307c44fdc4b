use super::states::AcdOutcome;
use crate::diagnostics::AcdActivity;
use crate::frame::ARP_PACKET_LEN;
use crate::types::MacAddress;
use core::net::Ipv4Addr;

/// A side effect requested by a state transition.
///
/// Actions are returned in the order they must be executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcdAction {
    /// Send an ARP probe (sender IP 0.0.0.0) for the address.
    SendProbe(Ipv4Addr),
    /// Send a gratuitous ARP announcement for the address.
    SendAnnounce(Ipv4Addr),
    /// Report an outcome to the context's callback.
    InvokeCallback(AcdOutcome),
    /// Hand the conflicting packet to the diagnostic sink.
    CaptureDiagnostic {
        activity: AcdActivity,
        mac: MacAddress,
        frame: [u8; ARP_PACKET_LEN],
    },
}

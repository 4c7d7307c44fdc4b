//! Diagnostic capture of address conflicts.
//!
//! A `DiagnosticSink` is told about every classified conflict before the
//! owning client is called back. The data is what an EtherNet/IP TCP/IP
//! Interface Object exposes as "Last Conflict Detected": the ACD activity,
//! the remote MAC address and the raw ARP PDU.

use crate::frame::ARP_PACKET_LEN;
use crate::types::MacAddress;
use log::warn;

/// What the device was doing when the conflict was detected.
/// Encoded as in the CIP "Last Conflict Detected" attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum AcdActivity {
    #[default]
    NoConflict = 0,
    ProbeIpv4Address = 1,
    OngoingDetection = 2,
    SemiActiveProbe = 3,
}

/// A trait that defines how detected conflicts are recorded.
/// Implementations must not block.
pub trait DiagnosticSink {
    /// Records the hardware address of the conflicting host.
    fn record_conflicting_mac(&mut self, mac: MacAddress);

    /// Records the raw ARP PDU that caused the conflict.
    fn record_raw_frame(&mut self, frame: &[u8]);

    /// Records the detection phase. Called before the MAC and frame.
    fn record_activity(&mut self, _activity: AcdActivity) {}
}

/// A `no_std` compatible sink that does nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpDiagnosticSink;
impl DiagnosticSink for NoOpDiagnosticSink {
    fn record_conflicting_mac(&mut self, _mac: MacAddress) {}
    fn record_raw_frame(&mut self, _frame: &[u8]) {}
}

/// A sink that logs conflicts using the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingDiagnosticSink;
impl DiagnosticSink for LoggingDiagnosticSink {
    fn record_conflicting_mac(&mut self, mac: MacAddress) {
        warn!("[ACD Diag]: conflicting host {}", mac);
    }

    fn record_raw_frame(&mut self, frame: &[u8]) {
        warn!("[ACD Diag]: conflicting ARP PDU {:02X?}", frame);
    }
}

/// An example `std`-based sink that prints conflicts to the console.
#[cfg(feature = "std")]
pub struct StdoutDiagnosticSink;
#[cfg(feature = "std")]
impl DiagnosticSink for StdoutDiagnosticSink {
    fn record_conflicting_mac(&mut self, mac: MacAddress) {
        println!("[ACD CONFLICT]: remote MAC {}", mac);
    }

    fn record_raw_frame(&mut self, frame: &[u8]) {
        println!("[ACD CONFLICT]: ARP PDU {:02X?}", frame);
    }
}

/// Keeps the most recent conflict, ready to be served as a management attribute.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LastConflictRecorder {
    activity: AcdActivity,
    remote_mac: MacAddress,
    arp_pdu: [u8; ARP_PACKET_LEN],
    conflicts: u32,
}

impl LastConflictRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn activity(&self) -> AcdActivity {
        self.activity
    }

    pub fn remote_mac(&self) -> MacAddress {
        self.remote_mac
    }

    pub fn arp_pdu(&self) -> &[u8; ARP_PACKET_LEN] {
        &self.arp_pdu
    }

    /// Number of conflicts recorded since creation or the last `clear`.
    pub fn conflict_count(&self) -> u32 {
        self.conflicts
    }

    /// Encodes the attribute as `activity (1) | remote MAC (6) | ARP PDU (28)`.
    pub fn to_bytes(&self) -> [u8; 1 + 6 + ARP_PACKET_LEN] {
        let mut out = [0u8; 1 + 6 + ARP_PACKET_LEN];
        out[0] = self.activity as u8;
        out[1..7].copy_from_slice(&self.remote_mac.0);
        out[7..].copy_from_slice(&self.arp_pdu);
        out
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

impl DiagnosticSink for LastConflictRecorder {
    fn record_conflicting_mac(&mut self, mac: MacAddress) {
        self.remote_mac = mac;
        self.conflicts = self.conflicts.saturating_add(1);
    }

    fn record_raw_frame(&mut self, frame: &[u8]) {
        // Shorter frames are zero padded, longer ones truncated to the PDU size.
        self.arp_pdu = [0u8; ARP_PACKET_LEN];
        let len = frame.len().min(ARP_PACKET_LEN);
        self.arp_pdu[..len].copy_from_slice(&frame[..len]);
    }

    fn record_activity(&mut self, activity: AcdActivity) {
        self.activity = activity;
    }
}

impl<T: DiagnosticSink + ?Sized> DiagnosticSink for &mut T {
    fn record_conflicting_mac(&mut self, mac: MacAddress) {
        (**self).record_conflicting_mac(mac)
    }

    fn record_raw_frame(&mut self, frame: &[u8]) {
        (**self).record_raw_frame(frame)
    }

    fn record_activity(&mut self, activity: AcdActivity) {
        (**self).record_activity(activity)
    }
}

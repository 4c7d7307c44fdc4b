// crates/acd-rs/tests/simulator/segment.rs

use acd_rs::frame::{ARP_FRAME_LEN, ArpPacket, build_announce, build_probe, parse_ethernet_arp};
use acd_rs::{AcdError, ArpTransport, InterfaceId, MacAddress};
use std::collections::HashMap;
use std::net::Ipv4Addr;

/// A frame put on the wire by the engine.
#[derive(Debug, Clone, Copy)]
pub struct WireFrame {
    pub interface: InterfaceId,
    pub tick: u32,
    pub data: [u8; ARP_FRAME_LEN],
}

impl WireFrame {
    pub fn packet(&self) -> ArpPacket {
        parse_ethernet_arp(&self.data).unwrap().1
    }
}

/// An `ArpTransport` that encodes frames exactly like a real driver would and
/// records them instead of sending them.
#[derive(Default)]
pub struct SimulatedTransport {
    macs: HashMap<InterfaceId, MacAddress>,
    pub history: Vec<WireFrame>,
    pub fail_sends: bool,
    tick: u32,
}

impl SimulatedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&mut self, interface: InterfaceId, mac: MacAddress) {
        self.macs.insert(interface, mac);
    }

    /// Stamps subsequent frames with the given tick number.
    pub fn set_tick(&mut self, tick: u32) {
        self.tick = tick;
    }

    pub fn probes(&self, ip: Ipv4Addr) -> Vec<&WireFrame> {
        self.history
            .iter()
            .filter(|f| {
                let p = f.packet();
                p.is_probe() && p.target_ip == ip
            })
            .collect()
    }

    pub fn announcements(&self, ip: Ipv4Addr) -> Vec<&WireFrame> {
        self.history
            .iter()
            .filter(|f| {
                let p = f.packet();
                p.is_announcement() && p.sender_ip == ip
            })
            .collect()
    }

    fn emit(&mut self, interface: InterfaceId, build: fn(MacAddress, Ipv4Addr) -> [u8; ARP_FRAME_LEN], ip: Ipv4Addr) -> Result<(), AcdError> {
        if self.fail_sends {
            return Err(AcdError::IoError);
        }
        let mac = *self.macs.get(&interface).ok_or(AcdError::UnknownInterface)?;
        self.history.push(WireFrame {
            interface,
            tick: self.tick,
            data: build(mac, ip),
        });
        Ok(())
    }
}

impl ArpTransport for SimulatedTransport {
    fn send_probe(&mut self, interface: InterfaceId, ip: Ipv4Addr) -> Result<(), AcdError> {
        self.emit(interface, build_probe, ip)
    }

    fn send_announce(&mut self, interface: InterfaceId, ip: Ipv4Addr) -> Result<(), AcdError> {
        self.emit(interface, build_announce, ip)
    }
}

//! ARP (RFC 826) PDU codec for Ethernet/IPv4, plus the probe and
//! announcement frames of RFC 5227.
//!
//! ```text
//!  0       2       4   5   6       8            14        18            24        28
//!  | HTYPE | PTYPE |HLN|PLN| OPER  |    SHA     |   SPA   |     THA     |   TPA   |
//! ```

use super::basic::{ETHERNET_HEADER_SIZE, EthernetHeader};
use crate::hal::AcdError;
use crate::types::{ARP_HTYPE_ETHERNET, ARP_PTYPE_IPV4, BROADCAST_MAC, ETHERTYPE_ARP, MAC_ADDRESS_SIZE, MacAddress};
use core::net::Ipv4Addr;

/// Size of an Ethernet/IPv4 ARP PDU.
pub const ARP_PACKET_LEN: usize = 28;

/// Size of an ARP frame including the Ethernet header (without padding or FCS).
pub const ARP_FRAME_LEN: usize = ETHERNET_HEADER_SIZE + ARP_PACKET_LEN;

const OPCODE_REQUEST: u16 = 1;
const OPCODE_REPLY: u16 = 2;

/// ARP operation code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ArpOperation {
    Request = OPCODE_REQUEST,
    Reply = OPCODE_REPLY,
}

impl TryFrom<u16> for ArpOperation {
    type Error = AcdError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            OPCODE_REQUEST => Ok(ArpOperation::Request),
            OPCODE_REPLY => Ok(ArpOperation::Reply),
            _ => Err(AcdError::InvalidArpPacket),
        }
    }
}

/// A parsed Ethernet/IPv4 ARP packet.
///
/// The raw PDU is kept alongside the decoded fields so that it can be
/// handed to a diagnostic sink unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArpPacket {
    pub operation: ArpOperation,
    pub sender_mac: MacAddress,
    pub sender_ip: Ipv4Addr,
    pub target_mac: MacAddress,
    pub target_ip: Ipv4Addr,
    raw: [u8; ARP_PACKET_LEN],
}

impl ArpPacket {
    /// Builds a packet from its fields and encodes the matching raw PDU.
    pub fn new(
        operation: ArpOperation,
        sender_mac: MacAddress,
        sender_ip: Ipv4Addr,
        target_mac: MacAddress,
        target_ip: Ipv4Addr,
    ) -> Self {
        let mut raw = [0u8; ARP_PACKET_LEN];
        raw[0..2].copy_from_slice(&ARP_HTYPE_ETHERNET.to_be_bytes());
        raw[2..4].copy_from_slice(&ARP_PTYPE_IPV4.to_be_bytes());
        raw[4] = MAC_ADDRESS_SIZE as u8;
        raw[5] = 4;
        raw[6..8].copy_from_slice(&(operation as u16).to_be_bytes());
        raw[8..14].copy_from_slice(&sender_mac.0);
        raw[14..18].copy_from_slice(&sender_ip.octets());
        raw[18..24].copy_from_slice(&target_mac.0);
        raw[24..28].copy_from_slice(&target_ip.octets());
        Self {
            operation,
            sender_mac,
            sender_ip,
            target_mac,
            target_ip,
            raw,
        }
    }

    /// Parses an ARP PDU from the start of `buffer`. Trailing bytes (Ethernet padding) are ignored.
    pub fn parse(buffer: &[u8]) -> Result<Self, AcdError> {
        if buffer.len() < ARP_PACKET_LEN {
            return Err(AcdError::BufferTooShort);
        }
        let raw: [u8; ARP_PACKET_LEN] = buffer[..ARP_PACKET_LEN].try_into()?;

        let htype = u16::from_be_bytes([raw[0], raw[1]]);
        let ptype = u16::from_be_bytes([raw[2], raw[3]]);
        if htype != ARP_HTYPE_ETHERNET
            || ptype != ARP_PTYPE_IPV4
            || raw[4] as usize != MAC_ADDRESS_SIZE
            || raw[5] != 4
        {
            return Err(AcdError::InvalidArpPacket);
        }
        let operation = ArpOperation::try_from(u16::from_be_bytes([raw[6], raw[7]]))?;

        Ok(Self {
            operation,
            sender_mac: MacAddress(raw[8..14].try_into()?),
            sender_ip: Ipv4Addr::new(raw[14], raw[15], raw[16], raw[17]),
            target_mac: MacAddress(raw[18..24].try_into()?),
            target_ip: Ipv4Addr::new(raw[24], raw[25], raw[26], raw[27]),
            raw,
        })
    }

    /// The 28 raw PDU bytes as received (or as encoded by `new`).
    pub fn as_bytes(&self) -> &[u8; ARP_PACKET_LEN] {
        &self.raw
    }

    /// True for an RFC 5227 probe: sender IP 0.0.0.0.
    pub fn is_probe(&self) -> bool {
        self.sender_ip.is_unspecified()
    }

    /// True for a gratuitous ARP: sender IP equals target IP.
    pub fn is_announcement(&self) -> bool {
        !self.sender_ip.is_unspecified() && self.sender_ip == self.target_ip
    }
}

/// Parses a complete Ethernet II frame carrying an ARP PDU.
pub fn parse_ethernet_arp(frame: &[u8]) -> Result<(EthernetHeader, ArpPacket), AcdError> {
    let header = EthernetHeader::deserialize(frame)?;
    if !header.is_arp() {
        return Err(AcdError::InvalidEthernetFrame);
    }
    let packet = ArpPacket::parse(&frame[ETHERNET_HEADER_SIZE..])?;
    Ok((header, packet))
}

/// Builds a broadcast ARP probe frame for `ip` (sender IP 0.0.0.0).
pub fn build_probe(local_mac: MacAddress, ip: Ipv4Addr) -> [u8; ARP_FRAME_LEN] {
    build_request(local_mac, Ipv4Addr::UNSPECIFIED, ip)
}

/// Builds a broadcast ARP announcement frame for `ip` (sender IP = target IP = `ip`).
pub fn build_announce(local_mac: MacAddress, ip: Ipv4Addr) -> [u8; ARP_FRAME_LEN] {
    build_request(local_mac, ip, ip)
}

fn build_request(local_mac: MacAddress, sender_ip: Ipv4Addr, target_ip: Ipv4Addr) -> [u8; ARP_FRAME_LEN] {
    let mut frame = [0u8; ARP_FRAME_LEN];
    let packet = ArpPacket::new(
        ArpOperation::Request,
        local_mac,
        sender_ip,
        MacAddress::default(),
        target_ip,
    );
    frame[0..6].copy_from_slice(&BROADCAST_MAC.0);
    frame[6..12].copy_from_slice(&local_mac.0);
    frame[12..ETHERNET_HEADER_SIZE].copy_from_slice(&ETHERTYPE_ARP.to_be_bytes());
    frame[ETHERNET_HEADER_SIZE..].copy_from_slice(packet.as_bytes());
    frame
}

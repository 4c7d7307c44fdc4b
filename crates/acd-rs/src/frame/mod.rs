//! Defines the wire structures for the Ethernet and ARP frames the engine consumes and emits.

pub mod arp;
pub mod basic;

pub use arp::{ArpOperation, ArpPacket, ARP_PACKET_LEN, ARP_FRAME_LEN, build_announce, build_probe, parse_ethernet_arp};
pub use basic::{EthernetHeader, ETHERNET_HEADER_SIZE};

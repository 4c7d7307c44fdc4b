use crate::hal::AcdError;
use crate::types::{ETHERTYPE_ARP, MacAddress};

// --- Constants and Sizes ---

pub const ETHERNET_HEADER_SIZE: usize = 14;

// --- Ethernet Header ---

/// Represents a standard 14-byte Ethernet Header (Layer 2).
/// Structure: Destination MAC (6), Source MAC (6), EtherType (2).
/// The EtherType is held in host order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EthernetHeader {
    pub destination_mac: MacAddress,
    pub source_mac: MacAddress,
    pub ether_type: u16,
}

impl EthernetHeader {
    /// Creates a new ARP header destined for a specific unicast or broadcast MAC address.
    pub fn new_arp(dest: MacAddress, src: MacAddress) -> Self {
        Self {
            destination_mac: dest,
            source_mac: src,
            ether_type: ETHERTYPE_ARP,
        }
    }

    /// Checks if the EtherType matches ARP (0x0806).
    pub fn is_arp(&self) -> bool {
        self.ether_type == ETHERTYPE_ARP
    }

    /// Serializes the header into the start of `buffer`.
    pub fn serialize(&self, buffer: &mut [u8]) -> Result<usize, AcdError> {
        if buffer.len() < ETHERNET_HEADER_SIZE {
            return Err(AcdError::BufferTooShort);
        }
        buffer[0..6].copy_from_slice(&self.destination_mac.0);
        buffer[6..12].copy_from_slice(&self.source_mac.0);
        buffer[12..14].copy_from_slice(&self.ether_type.to_be_bytes());
        Ok(ETHERNET_HEADER_SIZE)
    }

    /// Deserializes the 14-byte Ethernet header from the start of a buffer.
    pub fn deserialize(buffer: &[u8]) -> Result<Self, AcdError> {
        if buffer.len() < ETHERNET_HEADER_SIZE {
            return Err(AcdError::BufferTooShort);
        }
        Ok(Self {
            destination_mac: MacAddress(buffer[0..6].try_into()?),
            source_mac: MacAddress(buffer[6..12].try_into()?),
            ether_type: u16::from_be_bytes(buffer[12..14].try_into()?),
        })
    }
}

// --- Unit Tests ---

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BROADCAST_MAC;

    #[test]
    fn test_ethernet_header_is_arp() {
        let mut header = EthernetHeader::new_arp(BROADCAST_MAC, MacAddress::new([0; 6]));
        assert!(header.is_arp());

        header.ether_type = 0x0800; // IP packet
        assert!(!header.is_arp());
    }

    #[test]
    fn test_ethernet_header_wire_layout() {
        let src = MacAddress::new([0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]);
        let header = EthernetHeader::new_arp(BROADCAST_MAC, src);
        let mut buf = [0u8; ETHERNET_HEADER_SIZE];
        assert_eq!(header.serialize(&mut buf), Ok(ETHERNET_HEADER_SIZE));
        assert_eq!(&buf[0..6], &[0xFF; 6]);
        assert_eq!(&buf[6..12], &src.0);
        assert_eq!(&buf[12..14], &[0x08, 0x06]);
        assert_eq!(EthernetHeader::deserialize(&buf), Ok(header));
    }

    #[test]
    fn test_short_buffer_is_rejected() {
        assert_eq!(EthernetHeader::deserialize(&[0u8; 13]), Err(AcdError::BufferTooShort));
        let header = EthernetHeader::new_arp(BROADCAST_MAC, BROADCAST_MAC);
        assert_eq!(header.serialize(&mut [0u8; 4]), Err(AcdError::BufferTooShort));
    }
}

use core::fmt;
use core::net::Ipv4Addr;

// --- Protocol Constants (RFC 826 / RFC 5227) ---

/// Ethernet EtherType for ARP frames: 0x0806
pub const ETHERTYPE_ARP: u16 = 0x0806;

/// ARP hardware type for Ethernet.
pub const ARP_HTYPE_ETHERNET: u16 = 1;

/// ARP protocol type for IPv4.
pub const ARP_PTYPE_IPV4: u16 = 0x0800;

/// The broadcast MAC address: FF-FF-FF-FF-FF-FF
pub const BROADCAST_MAC: MacAddress = MacAddress([0xFF; MAC_ADDRESS_SIZE]);

pub const MAC_ADDRESS_SIZE: usize = 6;

/// Identifies a network interface known to the engine, wrapping a `u8`.
///
/// The value is chosen by the owner of the interface (e.g. the netif number)
/// and only needs to be unique within one engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InterfaceId(pub u8);

impl fmt::Display for InterfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "if{}", self.0)
    }
}

impl From<InterfaceId> for u8 {
    fn from(id: InterfaceId) -> Self {
        id.0
    }
}

// --- MacAddress ---

/// A 6-byte IEEE 802 MAC address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct MacAddress(pub [u8; MAC_ADDRESS_SIZE]);

impl MacAddress {
    /// Creates a new `MacAddress` from a 6-byte array.
    pub const fn new(bytes: [u8; MAC_ADDRESS_SIZE]) -> Self {
        MacAddress(bytes)
    }

    /// Checks if the address is a multicast address.
    pub fn is_multicast(&self) -> bool {
        // The first bit of the first octet is 1 for multicast addresses.
        (self.0[0] & 0x01) != 0
    }

    /// Checks if the address is the broadcast address (FF:FF:FF:FF:FF:FF).
    pub fn is_broadcast(&self) -> bool {
        self.0 == [0xFF; 6]
    }

    /// Seed for the probe jitter: bytes 5, 3, 2 and 4 packed from the most
    /// significant end down, as used by lwIP-derived stacks.
    pub fn jitter_seed(&self) -> u32 {
        (u32::from(self.0[5]) << 24)
            | (u32::from(self.0[3]) << 16)
            | (u32::from(self.0[2]) << 8)
            | u32::from(self.0[4])
    }
}

impl fmt::Display for MacAddress {
    /// Formats the MAC address as "XX:XX:XX:XX:XX:XX".
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            self.0[0], self.0[1], self.0[2], self.0[3], self.0[4], self.0[5]
        )
    }
}

impl From<[u8; MAC_ADDRESS_SIZE]> for MacAddress {
    fn from(bytes: [u8; MAC_ADDRESS_SIZE]) -> Self {
        MacAddress(bytes)
    }
}

/// Returns true for addresses that can never be claimed on a segment.
pub(crate) fn is_unusable_candidate(ip: Ipv4Addr) -> bool {
    ip.is_unspecified() || ip.is_broadcast() || ip.is_multicast()
}

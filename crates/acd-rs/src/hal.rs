use crate::types::InterfaceId;
use core::array::TryFromSliceError;
use core::fmt;
use core::net::Ipv4Addr;

/// Defines a portable, descriptive Error type for the ACD stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcdError {
    /// The provided buffer is too small for the operation.
    BufferTooShort,
    /// An underlying I/O error occurred while sending or receiving a frame.
    IoError,
    /// A received frame is not an Ethernet II frame carrying ARP.
    InvalidEthernetFrame,
    /// A received ARP PDU is not an Ethernet/IPv4 request or reply.
    InvalidArpPacket,
    /// The interface is not known to the engine.
    UnknownInterface,
    /// An interface with the same identifier was already added.
    DuplicateInterface,
    /// The context handle does not refer to a registered context.
    UnknownContext,
    /// Another active context on the interface is already probing or holding this address.
    AddressInUse,
    /// The address cannot be claimed (unspecified, broadcast or multicast).
    InvalidAddress,
    /// The interface registry has no free slot.
    RegistryFull,
    /// The configuration was rejected during validation.
    InvalidConfig(&'static str),
}

impl fmt::Display for AcdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BufferTooShort => write!(f, "Buffer is too short for the frame"),
            Self::IoError => write!(f, "An underlying I/O error occurred"),
            Self::InvalidEthernetFrame => write!(f, "Frame is not a valid Ethernet II ARP frame"),
            Self::InvalidArpPacket => write!(f, "Packet is not a valid Ethernet/IPv4 ARP packet"),
            Self::UnknownInterface => write!(f, "The interface is not registered with the engine"),
            Self::DuplicateInterface => write!(f, "The interface is already registered with the engine"),
            Self::UnknownContext => write!(f, "The detection context handle is not registered"),
            Self::AddressInUse => write!(f, "The address is already under detection on this interface"),
            Self::InvalidAddress => write!(f, "The address cannot be used as a candidate"),
            Self::RegistryFull => write!(f, "The interface registry is full"),
            Self::InvalidConfig(s) => write!(f, "Invalid ACD configuration: {}", s),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for AcdError {}

// --- From Implementations for Error Conversion ---

impl From<TryFromSliceError> for AcdError {
    fn from(_: TryFromSliceError) -> Self {
        AcdError::BufferTooShort
    }
}

/// Hardware Abstraction Layer (HAL) for ARP transmission.
///
/// This trait abstracts the sending of ARP probes and announcements, enabling
/// the conflict detection logic to remain platform-agnostic (no_std).
/// Implementations must not block for longer than a bounded time.
pub trait ArpTransport {
    /// Sends an ARP probe for `ip` on `interface`.
    ///
    /// A probe is an ARP request with sender IP 0.0.0.0 and target IP `ip`.
    fn send_probe(&mut self, interface: InterfaceId, ip: Ipv4Addr) -> Result<(), AcdError>;

    /// Sends an ARP announcement (gratuitous ARP) for `ip` on `interface`.
    ///
    /// An announcement is an ARP request where both sender and target IP are `ip`.
    fn send_announce(&mut self, interface: InterfaceId, ip: Ipv4Addr) -> Result<(), AcdError>;
}

impl<T: ArpTransport + ?Sized> ArpTransport for &mut T {
    fn send_probe(&mut self, interface: InterfaceId, ip: Ipv4Addr) -> Result<(), AcdError> {
        (**self).send_probe(interface, ip)
    }

    fn send_announce(&mut self, interface: InterfaceId, ip: Ipv4Addr) -> Result<(), AcdError> {
        (**self).send_announce(interface, ip)
    }
}

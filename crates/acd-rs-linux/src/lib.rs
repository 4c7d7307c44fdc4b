// crates/acd-rs-linux/src/lib.rs
#![cfg(target_os = "linux")]

mod service;

pub use service::{AcdCommand, AcdEvent, AcdService, FrameReceiver, ServiceHandle};

use acd_rs::frame::{build_announce, build_probe};
use acd_rs::{AcdError, ArpTransport, InterfaceId, MacAddress};
use log::{debug, info, warn};
use pnet::datalink::{self, Channel, NetworkInterface as PnetInterface};
use std::collections::BTreeMap;
use std::io;
use std::net::Ipv4Addr;
use std::sync::Mutex;
use std::time::Duration;

/// One raw Ethernet channel bound to an OS interface.
struct PnetPort {
    tx: Mutex<Box<dyn datalink::DataLinkSender>>,
    rx: Mutex<Box<dyn datalink::DataLinkReceiver>>,
    name: String,
    mac: MacAddress,
}

/// Sends and receives ARP frames on Linux interfaces through `pnet` datalink channels.
///
/// Each OS interface is opened under an `InterfaceId` chosen by the caller;
/// the same id must then be added to the `AcdEngine`.
#[derive(Default)]
pub struct LinuxArpTransport {
    ports: BTreeMap<InterfaceId, PnetPort>,
}

impl LinuxArpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens `interface_name` and returns its MAC address.
    ///
    /// `read_timeout` bounds how long `receive_frame` may block; the tick
    /// service relies on it being well below the tick interval.
    pub fn open(&mut self, id: InterfaceId, interface_name: &str, read_timeout: Duration) -> Result<MacAddress, String> {
        if self.ports.contains_key(&id) {
            return Err(format!("Interface id {} is already open", id));
        }
        let interface = datalink::interfaces()
            .into_iter()
            .find(|iface: &PnetInterface| iface.name == interface_name)
            .ok_or_else(|| format!("Interface '{}' not found", interface_name))?;

        let mac: [u8; 6] = interface.mac.ok_or("Interface has no MAC address")?.into();
        let mac = MacAddress(mac);

        // Probes from other hosts are broadcast, so promiscuous mode is not needed.
        let config = datalink::Config {
            read_timeout: Some(read_timeout),
            promiscuous: false,
            ..Default::default()
        };

        let (tx, rx) = match datalink::channel(&interface, config) {
            Ok(Channel::Ethernet(tx, rx)) => (tx, rx),
            Ok(_) => return Err("Unsupported channel type".to_string()),
            Err(e) => return Err(e.to_string()),
        };

        info!("[ACD-Linux] Opened {} as {} ({})", interface_name, id, mac);
        self.ports.insert(
            id,
            PnetPort {
                tx: Mutex::new(tx),
                rx: Mutex::new(rx),
                name: interface_name.to_string(),
                mac,
            },
        );
        Ok(mac)
    }

    /// Closes the channel of `id`. Returns false if it was not open.
    pub fn close(&mut self, id: InterfaceId) -> bool {
        self.ports
            .remove(&id)
            .map(|port| debug!("[ACD-Linux] Closed {} ({})", port.name, id))
            .is_some()
    }

    pub fn local_mac(&self, id: InterfaceId) -> Option<MacAddress> {
        self.ports.get(&id).map(|port| port.mac)
    }

    fn send(&self, id: InterfaceId, frame: &[u8]) -> Result<(), AcdError> {
        let port = self.ports.get(&id).ok_or(AcdError::UnknownInterface)?;
        port.tx
            .lock()
            .map_err(|_| AcdError::IoError)?
            .send_to(frame, None)
            .ok_or(AcdError::IoError)? // For channel closed
            .map_err(|e| {
                warn!("[ACD-Linux] Send on {} failed: {}", port.name, e);
                AcdError::IoError
            })
    }
}

impl ArpTransport for LinuxArpTransport {
    fn send_probe(&mut self, interface: InterfaceId, ip: Ipv4Addr) -> Result<(), AcdError> {
        let mac = self.local_mac(interface).ok_or(AcdError::UnknownInterface)?;
        self.send(interface, &build_probe(mac, ip))
    }

    fn send_announce(&mut self, interface: InterfaceId, ip: Ipv4Addr) -> Result<(), AcdError> {
        let mac = self.local_mac(interface).ok_or(AcdError::UnknownInterface)?;
        self.send(interface, &build_announce(mac, ip))
    }
}

impl FrameReceiver for LinuxArpTransport {
    fn interfaces(&self) -> Vec<InterfaceId> {
        self.ports.keys().copied().collect()
    }

    fn receive_frame(&mut self, interface: InterfaceId, buffer: &mut [u8]) -> Result<usize, AcdError> {
        let port = self.ports.get(&interface).ok_or(AcdError::UnknownInterface)?;
        let mut rx_guard = port.rx.lock().map_err(|_| AcdError::IoError)?;

        match rx_guard.next() {
            Ok(frame) => {
                let len = frame.len();
                if buffer.len() >= len {
                    buffer[..len].copy_from_slice(frame);
                    Ok(len)
                } else {
                    Err(AcdError::BufferTooShort)
                }
            }
            // Return 0 bytes on timeout, not an error
            Err(e) if e.kind() == io::ErrorKind::TimedOut => Ok(0),
            Err(_) => Err(AcdError::IoError),
        }
    }
}

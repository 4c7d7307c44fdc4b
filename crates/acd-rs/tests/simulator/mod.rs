// crates/acd-rs/tests/simulator/mod.rs
pub mod segment;

pub use segment::{SimulatedTransport, WireFrame};

use acd_rs::diagnostics::LastConflictRecorder;
use acd_rs::frame::{ArpOperation, ArpPacket, ARP_FRAME_LEN, ETHERNET_HEADER_SIZE, EthernetHeader};
use acd_rs::types::BROADCAST_MAC;
use acd_rs::{AcdConfig, AcdEngine, AcdError, AcdOutcome, AcdState, ContextHandle, InterfaceId, MacAddress, SendFailure};
use std::net::Ipv4Addr;
use std::sync::{Arc, Mutex};

/// Outcomes reported through the callbacks, in delivery order.
pub type OutcomeLog = Arc<Mutex<Vec<(ContextHandle, AcdOutcome)>>>;

/// Drives an engine tick by tick against a simulated Ethernet segment.
pub struct AcdHarness {
    pub engine: AcdEngine<LastConflictRecorder>,
    pub transport: SimulatedTransport,
    pub outcomes: OutcomeLog,
    pub ticks: u32,
    pub failures: Vec<SendFailure>,
}

impl AcdHarness {
    pub fn new(config: AcdConfig) -> Self {
        Self {
            engine: AcdEngine::with_sink(&config, LastConflictRecorder::new()).unwrap(),
            transport: SimulatedTransport::new(),
            outcomes: Arc::new(Mutex::new(Vec::new())),
            ticks: 0,
            failures: Vec::new(),
        }
    }

    pub fn add_interface(&mut self, interface: InterfaceId, mac: MacAddress) {
        self.engine.add_interface(interface, mac).unwrap();
        self.transport.attach(interface, mac);
    }

    /// Registers a context whose outcomes land in `self.outcomes`.
    pub fn register(&mut self, interface: InterfaceId) -> ContextHandle {
        let log = self.outcomes.clone();
        self.engine
            .register(interface, move |handle, outcome| log.lock().unwrap().push((handle, outcome)))
            .unwrap()
    }

    pub fn tick(&mut self) {
        self.ticks += 1;
        self.transport.set_tick(self.ticks);
        let failures = self.engine.tick(&mut self.transport);
        self.failures.extend(failures);
    }

    pub fn run(&mut self, ticks: u32) {
        for _ in 0..ticks {
            self.tick();
        }
    }

    /// Ticks until `handle` reaches `state`. Returns the number of ticks taken.
    pub fn run_until(&mut self, handle: ContextHandle, state: AcdState, max_ticks: u32) -> Option<u32> {
        for n in 1..=max_ticks {
            self.tick();
            if self.engine.state(handle) == Some(state) {
                return Some(n);
            }
        }
        None
    }

    /// Delivers a raw frame as if received on `interface`.
    pub fn inject(&mut self, interface: InterfaceId, frame: &[u8]) -> Result<(), AcdError> {
        let failures = self.engine.process_raw_frame(interface, frame, &mut self.transport)?;
        self.failures.extend(failures);
        Ok(())
    }

    pub fn outcomes_for(&self, handle: ContextHandle) -> Vec<AcdOutcome> {
        self.outcomes
            .lock()
            .unwrap()
            .iter()
            .filter(|(h, _)| *h == handle)
            .map(|(_, o)| *o)
            .collect()
    }
}

/// Builds an ARP reply from a host that owns `ip`.
pub fn foreign_reply(mac: MacAddress, ip: Ipv4Addr, target_ip: Ipv4Addr) -> [u8; ARP_FRAME_LEN] {
    let mut frame = [0u8; ARP_FRAME_LEN];
    EthernetHeader::new_arp(BROADCAST_MAC, mac).serialize(&mut frame).unwrap();
    let packet = ArpPacket::new(ArpOperation::Reply, mac, ip, MacAddress::default(), target_ip);
    frame[ETHERNET_HEADER_SIZE..].copy_from_slice(packet.as_bytes());
    frame
}

/// Installs the test logger once per binary. Set `RUST_LOG=debug` to follow the state machines.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

//! The conflict detection engine: per-interface registries of detection
//! contexts, plus the executor that turns `AcdAction`s into ARP traffic,
//! callbacks and diagnostic records.
//!
//! Every entry point takes `&mut self`, so `tick`, `arp_input` and the
//! start/stop requests are serialized by construction. Callbacks run while
//! the engine is borrowed and cannot re-enter it; clients that want to
//! restart acquisition queue the request and issue it after the call returns.

use crate::acd::{AcdAction, AcdOutcome, AcdState, DetectionContext};
use crate::config::{AcdConfig, AcdTimings};
use crate::diagnostics::{DiagnosticSink, NoOpDiagnosticSink};
use crate::frame::{ArpPacket, parse_ethernet_arp};
use crate::hal::{AcdError, ArpTransport};
use crate::log::{AcdLogContext, my_debug, my_info, my_trace, my_warn};
use crate::types::{InterfaceId, MacAddress, is_unusable_candidate};
use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use core::net::Ipv4Addr;

/// Callback through which the address-acquisition client learns the outcome of detection.
pub type ConflictCallback = Box<dyn FnMut(ContextHandle, AcdOutcome) + Send>;

/// Stable reference to a registered detection context.
///
/// The generation makes a handle to a removed context fail instead of
/// silently addressing whichever context reuses its slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContextHandle {
    interface: InterfaceId,
    index: u16,
    generation: u32,
}

impl ContextHandle {
    pub fn interface(&self) -> InterfaceId {
        self.interface
    }
}

/// Which frame a failed send was for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Probe,
    Announce,
}

/// A transport failure reported back to the caller. Never fatal: the state
/// machine has already advanced as if the frame had been sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendFailure {
    pub handle: ContextHandle,
    pub kind: FrameKind,
    pub address: Ipv4Addr,
    pub error: AcdError,
}

struct Registration {
    context: DetectionContext,
    callback: ConflictCallback,
}

struct Slot {
    generation: u32,
    registration: Option<Registration>,
}

/// The detection contexts of one interface.
struct InterfaceRegistry {
    local_mac: MacAddress,
    slots: Vec<Slot>,
    capacity: usize,
}

impl InterfaceRegistry {
    fn new(local_mac: MacAddress, capacity: usize) -> Self {
        Self {
            local_mac,
            slots: Vec::new(),
            capacity,
        }
    }

    fn insert(&mut self, interface: InterfaceId, callback: ConflictCallback) -> Result<ContextHandle, AcdError> {
        let registration = Registration {
            context: DetectionContext::new(),
            callback,
        };
        let index = match self.slots.iter().position(|slot| slot.registration.is_none()) {
            Some(free) => free,
            None if self.slots.len() < self.capacity => self.slots.len(),
            None => return Err(AcdError::RegistryFull),
        };
        // Checked before growing so a failure leaves no unreachable slot behind.
        let index_u16 = u16::try_from(index).map_err(|_| AcdError::RegistryFull)?;
        if index == self.slots.len() {
            self.slots.push(Slot { generation: 0, registration: None });
        }
        let slot = &mut self.slots[index];
        slot.registration = Some(registration);
        Ok(ContextHandle {
            interface,
            index: index_u16,
            generation: slot.generation,
        })
    }

    fn get(&self, handle: ContextHandle) -> Option<&Registration> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.registration.as_ref())
    }

    fn get_mut(&mut self, handle: ContextHandle) -> Option<&mut Registration> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.registration.as_mut())
    }

    fn remove(&mut self, handle: ContextHandle) -> Option<Registration> {
        let slot = self
            .slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)?;
        let removed = slot.registration.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        Some(removed)
    }

    /// True if a context other than `except` is active on `address`.
    fn address_in_use(&self, address: Ipv4Addr, except: ContextHandle) -> bool {
        self.slots.iter().enumerate().any(|(index, slot)| {
            index != except.index as usize
                && slot
                    .registration
                    .as_ref()
                    .is_some_and(|r| r.context.is_active() && r.context.address() == address)
        })
    }

    fn iter_mut(&mut self, interface: InterfaceId) -> impl Iterator<Item = (ContextHandle, &mut Registration)> {
        self.slots.iter_mut().enumerate().filter_map(move |(index, slot)| {
            let generation = slot.generation;
            slot.registration.as_mut().map(|registration| {
                (
                    ContextHandle {
                        interface,
                        index: index as u16,
                        generation,
                    },
                    registration,
                )
            })
        })
    }
}

/// Owns every detection context of every interface.
pub struct AcdEngine<D: DiagnosticSink = NoOpDiagnosticSink> {
    timings: AcdTimings,
    interfaces: BTreeMap<InterfaceId, InterfaceRegistry>,
    sink: D,
}

impl AcdEngine<NoOpDiagnosticSink> {
    /// Creates an engine without diagnostic capture.
    pub fn new(config: &AcdConfig) -> Result<Self, AcdError> {
        Self::with_sink(config, NoOpDiagnosticSink)
    }
}

impl<D: DiagnosticSink> AcdEngine<D> {
    /// Creates an engine that reports every conflict to `sink`.
    pub fn with_sink(config: &AcdConfig, sink: D) -> Result<Self, AcdError> {
        let timings = config.validate()?;
        my_debug!("[ACD] Engine created with timings {:?}", timings);
        Ok(Self {
            timings,
            interfaces: BTreeMap::new(),
            sink,
        })
    }

    pub fn timings(&self) -> &AcdTimings {
        &self.timings
    }

    pub fn sink(&self) -> &D {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut D {
        &mut self.sink
    }

    /// Makes an interface known to the engine.
    pub fn add_interface(&mut self, interface: InterfaceId, local_mac: MacAddress) -> Result<(), AcdError> {
        if self.interfaces.contains_key(&interface) {
            return Err(AcdError::DuplicateInterface);
        }
        self.interfaces
            .insert(interface, InterfaceRegistry::new(local_mac, self.timings.max_contexts));
        my_info!("[ACD] Added interface {} ({})", interface, local_mac);
        Ok(())
    }

    /// Drops an interface together with all its contexts. No callbacks are invoked.
    pub fn remove_interface(&mut self, interface: InterfaceId) -> Result<(), AcdError> {
        self.interfaces
            .remove(&interface)
            .map(|_| my_info!("[ACD] Removed interface {}", interface))
            .ok_or(AcdError::UnknownInterface)
    }

    pub fn local_mac(&self, interface: InterfaceId) -> Option<MacAddress> {
        self.interfaces.get(&interface).map(|r| r.local_mac)
    }

    /// Registers a new, stopped detection context on `interface`.
    pub fn register<F>(&mut self, interface: InterfaceId, callback: F) -> Result<ContextHandle, AcdError>
    where
        F: FnMut(ContextHandle, AcdOutcome) + Send + 'static,
    {
        let registry = self.interfaces.get_mut(&interface).ok_or(AcdError::UnknownInterface)?;
        let handle = registry.insert(interface, Box::new(callback))?;
        my_debug!("[ACD] Registered context {:?}", handle);
        Ok(handle)
    }

    /// Unregisters a context. Its handle becomes invalid.
    pub fn remove(&mut self, handle: ContextHandle) -> Result<(), AcdError> {
        self.registry_mut(handle.interface)?
            .remove(handle)
            .map(|_| my_debug!("[ACD] Removed context {:?}", handle))
            .ok_or(AcdError::UnknownContext)
    }

    /// Starts detection of `address`. The first probe goes out once the initial wait elapses.
    pub fn start(&mut self, handle: ContextHandle, address: Ipv4Addr) -> Result<(), AcdError> {
        if is_unusable_candidate(address) {
            return Err(AcdError::InvalidAddress);
        }
        let timings = self.timings;
        let registry = self.registry_mut(handle.interface)?;
        if registry.get(handle).is_none() {
            return Err(AcdError::UnknownContext);
        }
        if registry.address_in_use(address, handle) {
            return Err(AcdError::AddressInUse);
        }
        let seed = registry.local_mac.jitter_seed();
        let registration = registry.get_mut(handle).ok_or(AcdError::UnknownContext)?;
        registration.context.start(address, &timings, seed);
        my_info!(
            AcdLogContext { interface: handle.interface, address },
            "Detection started, first probe in {} ticks",
            registration.context.ticks_to_wait()
        );
        Ok(())
    }

    /// Stops detection immediately, whatever the phase.
    pub fn stop(&mut self, handle: ContextHandle) -> Result<(), AcdError> {
        let registration = self
            .registry_mut(handle.interface)?
            .get_mut(handle)
            .ok_or(AcdError::UnknownContext)?;
        registration.context.stop();
        my_debug!(
            AcdLogContext { interface: handle.interface, address: registration.context.address() },
            "Detection stopped"
        );
        Ok(())
    }

    pub fn state(&self, handle: ContextHandle) -> Option<AcdState> {
        self.context(handle).map(DetectionContext::state)
    }

    pub fn context(&self, handle: ContextHandle) -> Option<&DetectionContext> {
        self.interfaces
            .get(&handle.interface)
            .and_then(|registry| registry.get(handle))
            .map(|registration| &registration.context)
    }

    /// Advances every context of every interface by one tick.
    /// Must be called once per configured tick interval.
    pub fn tick<T: ArpTransport>(&mut self, transport: &mut T) -> Vec<SendFailure> {
        let Self { timings, interfaces, sink } = self;
        let mut failures = Vec::new();
        for (&interface, registry) in interfaces.iter_mut() {
            let seed = registry.local_mac.jitter_seed();
            for (handle, registration) in registry.iter_mut(interface) {
                let before = registration.context.state();
                let actions = registration.context.on_tick(timings, seed);
                log_transition(handle, &registration.context, before);
                execute(handle, registration, actions, transport, sink, &mut failures);
            }
        }
        failures
    }

    /// Classifies a received ARP packet against every context on `interface`.
    pub fn arp_input<T: ArpTransport>(
        &mut self,
        interface: InterfaceId,
        packet: &ArpPacket,
        transport: &mut T,
    ) -> Result<Vec<SendFailure>, AcdError> {
        let Self { timings, interfaces, sink } = self;
        let registry = interfaces.get_mut(&interface).ok_or(AcdError::UnknownInterface)?;
        let local_mac = registry.local_mac;
        my_trace!(
            "[ACD] {} ARP {:?} from {} ({}) for {}",
            interface,
            packet.operation,
            packet.sender_ip,
            packet.sender_mac,
            packet.target_ip
        );

        let mut failures = Vec::new();
        for (handle, registration) in registry.iter_mut(interface) {
            let before = registration.context.state();
            let actions = registration.context.on_arp(packet, local_mac, timings);
            log_transition(handle, &registration.context, before);
            execute(handle, registration, actions, transport, sink, &mut failures);
        }
        Ok(failures)
    }

    /// Parses a received Ethernet frame and feeds it to `arp_input`.
    /// Frames that are not well-formed Ethernet/IPv4 ARP are rejected without touching any context.
    pub fn process_raw_frame<T: ArpTransport>(
        &mut self,
        interface: InterfaceId,
        frame: &[u8],
        transport: &mut T,
    ) -> Result<Vec<SendFailure>, AcdError> {
        if !self.interfaces.contains_key(&interface) {
            return Err(AcdError::UnknownInterface);
        }
        let (_, packet) = parse_ethernet_arp(frame).inspect_err(|e| {
            my_trace!("[ACD] {} dropped frame of {} bytes: {}", interface, frame.len(), e);
        })?;
        self.arp_input(interface, &packet, transport)
    }

    /// Stops every context on `interface`. No callbacks are invoked.
    pub fn link_down(&mut self, interface: InterfaceId) -> Result<(), AcdError> {
        let registry = self.registry_mut(interface)?;
        for (_, registration) in registry.iter_mut(interface) {
            registration.context.stop();
        }
        my_info!("[ACD] Link down on {}, all contexts stopped", interface);
        Ok(())
    }

    /// Informs the engine that the interface address changed from `old` to `new`.
    ///
    /// When a link-local address is replaced by a routable one, contexts on the
    /// old address that already claimed it keep watching passively, and
    /// contexts still probing it are stopped with `Decline`.
    pub fn address_role_changed(
        &mut self,
        interface: InterfaceId,
        old: Ipv4Addr,
        new: Ipv4Addr,
    ) -> Result<(), AcdError> {
        let registry = self.registry_mut(interface)?;
        if old.is_unspecified() || new.is_unspecified() {
            return Ok(());
        }
        if !(old.is_link_local() && !new.is_link_local()) {
            return Ok(());
        }
        my_debug!("[ACD] {} changed from link-local {} to routable {}", interface, old, new);

        for (handle, registration) in registry.iter_mut(interface) {
            if registration.context.address() != old {
                continue;
            }
            let before = registration.context.state();
            let actions = registration.context.demote();
            log_transition(handle, &registration.context, before);
            for action in actions {
                if let AcdAction::InvokeCallback(outcome) = action {
                    (registration.callback)(handle, outcome);
                }
            }
        }
        Ok(())
    }

    fn registry_mut(&mut self, interface: InterfaceId) -> Result<&mut InterfaceRegistry, AcdError> {
        self.interfaces.get_mut(&interface).ok_or(AcdError::UnknownInterface)
    }
}

fn log_transition(handle: ContextHandle, context: &DetectionContext, before: AcdState) {
    let after = context.state();
    if after != before {
        my_debug!(
            AcdLogContext { interface: handle.interface, address: context.address() },
            "{:?} -> {:?}",
            before,
            after
        );
    }
}

/// Performs the actions of one transition in order.
fn execute<T: ArpTransport, D: DiagnosticSink>(
    handle: ContextHandle,
    registration: &mut Registration,
    actions: Vec<AcdAction>,
    transport: &mut T,
    sink: &mut D,
    failures: &mut Vec<SendFailure>,
) {
    let ctx = AcdLogContext {
        interface: handle.interface,
        address: registration.context.address(),
    };
    for action in actions {
        match action {
            AcdAction::SendProbe(address) => {
                my_trace!(ctx, "Sending ARP probe");
                if let Err(error) = transport.send_probe(handle.interface, address) {
                    my_warn!(ctx, "Failed to send ARP probe: {}", error);
                    failures.push(SendFailure { handle, kind: FrameKind::Probe, address, error });
                }
            }
            AcdAction::SendAnnounce(address) => {
                my_trace!(ctx, "Sending ARP announcement");
                if let Err(error) = transport.send_announce(handle.interface, address) {
                    my_warn!(ctx, "Failed to send ARP announcement: {}", error);
                    failures.push(SendFailure { handle, kind: FrameKind::Announce, address, error });
                }
            }
            AcdAction::CaptureDiagnostic { activity, mac, frame } => {
                my_warn!(ctx, "Address conflict with {} ({:?})", mac, activity);
                sink.record_activity(activity);
                sink.record_conflicting_mac(mac);
                sink.record_raw_frame(&frame);
            }
            AcdAction::InvokeCallback(outcome) => {
                my_debug!(ctx, "Reporting {:?}", outcome);
                (registration.callback)(handle, outcome);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::LastConflictRecorder;
    use crate::frame::{ArpOperation, build_probe};
    use alloc::sync::Arc;
    use alloc::vec;
    use std::sync::Mutex;

    const IF0: InterfaceId = InterfaceId(0);
    const LOCAL: MacAddress = MacAddress([0x02, 0x00, 0x00, 0x00, 0x00, 0x01]);
    const FOREIGN: MacAddress = MacAddress([0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0x01]);
    const CANDIDATE: Ipv4Addr = Ipv4Addr::new(192, 168, 1, 50);

    #[derive(Default)]
    struct RecordingTransport {
        probes: Vec<Ipv4Addr>,
        announces: Vec<Ipv4Addr>,
        fail: bool,
    }

    impl ArpTransport for RecordingTransport {
        fn send_probe(&mut self, _interface: InterfaceId, ip: Ipv4Addr) -> Result<(), AcdError> {
            if self.fail {
                return Err(AcdError::IoError);
            }
            self.probes.push(ip);
            Ok(())
        }

        fn send_announce(&mut self, _interface: InterfaceId, ip: Ipv4Addr) -> Result<(), AcdError> {
            if self.fail {
                return Err(AcdError::IoError);
            }
            self.announces.push(ip);
            Ok(())
        }
    }

    type Outcomes = Arc<Mutex<Vec<AcdOutcome>>>;

    fn engine() -> AcdEngine<LastConflictRecorder> {
        let mut engine = AcdEngine::with_sink(&AcdConfig::default(), LastConflictRecorder::new()).unwrap();
        engine.add_interface(IF0, LOCAL).unwrap();
        engine
    }

    fn register(engine: &mut AcdEngine<LastConflictRecorder>) -> (ContextHandle, Outcomes) {
        let outcomes: Outcomes = Arc::new(Mutex::new(Vec::new()));
        let sink = outcomes.clone();
        let handle = engine
            .register(IF0, move |_, outcome| sink.lock().unwrap().push(outcome))
            .unwrap();
        (handle, outcomes)
    }

    #[test]
    fn test_unknown_interface_is_rejected() {
        let mut engine = engine();
        assert_eq!(
            engine.register(InterfaceId(9), |_, _| {}).err(),
            Some(AcdError::UnknownInterface)
        );
        assert_eq!(engine.link_down(InterfaceId(9)), Err(AcdError::UnknownInterface));
        assert_eq!(engine.add_interface(IF0, LOCAL), Err(AcdError::DuplicateInterface));
    }

    #[test]
    fn test_duplicate_active_address_is_rejected() {
        let mut engine = engine();
        let (a, _) = register(&mut engine);
        let (b, _) = register(&mut engine);
        engine.start(a, CANDIDATE).unwrap();
        assert_eq!(engine.start(b, CANDIDATE), Err(AcdError::AddressInUse));

        // Restarting the same context is allowed.
        assert_eq!(engine.start(a, CANDIDATE), Ok(()));

        // Once stopped, the address is free again.
        engine.stop(a).unwrap();
        assert_eq!(engine.start(b, CANDIDATE), Ok(()));
    }

    #[test]
    fn test_invalid_candidates_are_rejected() {
        let mut engine = engine();
        let (a, _) = register(&mut engine);
        assert_eq!(engine.start(a, Ipv4Addr::UNSPECIFIED), Err(AcdError::InvalidAddress));
        assert_eq!(engine.start(a, Ipv4Addr::BROADCAST), Err(AcdError::InvalidAddress));
        assert_eq!(engine.state(a), Some(AcdState::Off));
    }

    #[test]
    fn test_registry_capacity() {
        let config = AcdConfig { max_contexts: 2, ..Default::default() };
        let mut engine = AcdEngine::new(&config).unwrap();
        engine.add_interface(IF0, LOCAL).unwrap();
        let a = engine.register(IF0, |_, _| {}).unwrap();
        let _b = engine.register(IF0, |_, _| {}).unwrap();
        assert_eq!(engine.register(IF0, |_, _| {}).err(), Some(AcdError::RegistryFull));

        engine.start(a, CANDIDATE).unwrap();
        assert_eq!(engine.state(a), Some(AcdState::ProbeWait));

        engine.remove(a).unwrap();
        assert!(engine.register(IF0, |_, _| {}).is_ok());
    }

    #[test]
    fn test_stale_handle_is_rejected_after_slot_reuse() {
        let mut engine = engine();
        let (a, _) = register(&mut engine);
        engine.remove(a).unwrap();
        let (b, _) = register(&mut engine);
        assert_ne!(a, b);
        assert_eq!(engine.stop(a), Err(AcdError::UnknownContext));
        assert_eq!(engine.remove(a), Err(AcdError::UnknownContext));
        assert_eq!(engine.state(a), None);
        assert_eq!(engine.state(b), Some(AcdState::Off));
    }

    #[test]
    fn test_stale_handle_survives_many_slot_reuses() {
        let config = AcdConfig { max_contexts: 1, ..Default::default() };
        let mut engine = AcdEngine::new(&config).unwrap();
        engine.add_interface(IF0, LOCAL).unwrap();
        let first = engine.register(IF0, |_, _| {}).unwrap();
        engine.remove(first).unwrap();

        let mut current = engine.register(IF0, |_, _| {}).unwrap();
        for _ in 0..u32::from(u16::MAX) + 1 {
            engine.remove(current).unwrap();
            current = engine.register(IF0, |_, _| {}).unwrap();
        }
        assert_ne!(first, current);
        assert_eq!(engine.state(first), None);
        assert_eq!(engine.stop(first), Err(AcdError::UnknownContext));
        assert_eq!(engine.state(current), Some(AcdState::Off));
        assert_eq!(engine.register(IF0, |_, _| {}).err(), Some(AcdError::RegistryFull));
    }

    #[test]
    fn test_tick_sends_through_transport() {
        let mut engine = engine();
        let (a, outcomes) = register(&mut engine);
        let mut transport = RecordingTransport::default();
        engine.start(a, CANDIDATE).unwrap();
        for _ in 0..110 {
            assert!(engine.tick(&mut transport).is_empty());
        }
        assert_eq!(transport.probes.len(), 3);
        assert_eq!(transport.announces.len(), 2);
        assert_eq!(*outcomes.lock().unwrap(), vec![AcdOutcome::IpOk]);
        assert_eq!(engine.state(a), Some(AcdState::Ongoing));
    }

    #[test]
    fn test_send_failure_is_reported_once_and_machine_proceeds() {
        let mut engine = engine();
        let (a, _) = register(&mut engine);
        let mut transport = RecordingTransport { fail: true, ..Default::default() };
        engine.start(a, CANDIDATE).unwrap();

        let failures = engine.tick(&mut transport);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].kind, FrameKind::Probe);
        assert_eq!(failures[0].address, CANDIDATE);
        assert_eq!(failures[0].error, AcdError::IoError);
        assert_eq!(engine.state(a), Some(AcdState::Probing));
        assert_eq!(engine.context(a).unwrap().probes_sent(), 1);
    }

    #[test]
    fn test_conflict_reaches_sink_before_callback() {
        let mut engine = engine();
        let (a, outcomes) = register(&mut engine);
        let mut transport = RecordingTransport::default();
        engine.start(a, CANDIDATE).unwrap();
        engine.tick(&mut transport);

        let packet = ArpPacket::new(ArpOperation::Reply, FOREIGN, CANDIDATE, LOCAL, CANDIDATE);
        engine.arp_input(IF0, &packet, &mut transport).unwrap();

        assert_eq!(*outcomes.lock().unwrap(), vec![AcdOutcome::Decline, AcdOutcome::RestartClient]);
        assert_eq!(engine.sink().remote_mac(), FOREIGN);
        assert_eq!(engine.sink().arp_pdu(), packet.as_bytes());
        assert_eq!(engine.sink().conflict_count(), 1);
        assert_eq!(engine.state(a), Some(AcdState::Off));
    }

    #[test]
    fn test_malformed_frame_touches_nothing() {
        let mut engine = engine();
        let (a, outcomes) = register(&mut engine);
        let mut transport = RecordingTransport::default();
        engine.start(a, CANDIDATE).unwrap();
        let before = engine.context(a).unwrap().clone();

        let mut frame = build_probe(FOREIGN, CANDIDATE);
        assert_eq!(
            engine.process_raw_frame(IF0, &frame[..20], &mut transport),
            Err(AcdError::BufferTooShort)
        );
        frame[12] = 0x86;
        frame[13] = 0xDD;
        assert_eq!(
            engine.process_raw_frame(IF0, &frame, &mut transport),
            Err(AcdError::InvalidEthernetFrame)
        );

        assert_eq!(engine.context(a), Some(&before));
        assert!(outcomes.lock().unwrap().is_empty());
        assert_eq!(engine.sink().conflict_count(), 0);
    }

    #[test]
    fn test_raw_probe_from_foreign_host_is_a_conflict() {
        let mut engine = engine();
        let (a, outcomes) = register(&mut engine);
        let mut transport = RecordingTransport::default();
        engine.start(a, CANDIDATE).unwrap();

        let frame = build_probe(FOREIGN, CANDIDATE);
        engine.process_raw_frame(IF0, &frame, &mut transport).unwrap();
        assert_eq!(*outcomes.lock().unwrap(), vec![AcdOutcome::Decline, AcdOutcome::RestartClient]);
    }

    #[test]
    fn test_link_down_stops_all_contexts_silently() {
        let mut engine = engine();
        let (a, outcomes_a) = register(&mut engine);
        let (b, _) = register(&mut engine);
        engine.start(a, CANDIDATE).unwrap();
        engine.start(b, Ipv4Addr::new(169, 254, 10, 20)).unwrap();

        engine.link_down(IF0).unwrap();
        assert_eq!(engine.state(a), Some(AcdState::Off));
        assert_eq!(engine.state(b), Some(AcdState::Off));
        assert!(outcomes_a.lock().unwrap().is_empty());
    }

    #[test]
    fn test_address_role_change_ignores_unspecified_and_routable_moves() {
        let mut engine = engine();
        let (a, outcomes) = register(&mut engine);
        engine.start(a, CANDIDATE).unwrap();

        engine.address_role_changed(IF0, CANDIDATE, Ipv4Addr::new(10, 0, 0, 1)).unwrap();
        engine.address_role_changed(IF0, Ipv4Addr::UNSPECIFIED, CANDIDATE).unwrap();
        assert_eq!(engine.state(a), Some(AcdState::ProbeWait));
        assert!(outcomes.lock().unwrap().is_empty());
    }

    #[test]
    fn test_address_role_change_stops_probing_link_local() {
        let mut engine = engine();
        let (a, outcomes) = register(&mut engine);
        let link_local = Ipv4Addr::new(169, 254, 10, 20);
        engine.start(a, link_local).unwrap();

        engine.address_role_changed(IF0, link_local, CANDIDATE).unwrap();
        assert_eq!(engine.state(a), Some(AcdState::Off));
        assert_eq!(*outcomes.lock().unwrap(), vec![AcdOutcome::Decline]);
    }

    #[test]
    fn test_remove_interface_drops_contexts() {
        let mut engine = engine();
        let (a, _) = register(&mut engine);
        engine.remove_interface(IF0).unwrap();
        assert_eq!(engine.state(a), None);
        assert_eq!(engine.remove_interface(IF0), Err(AcdError::UnknownInterface));
    }
}

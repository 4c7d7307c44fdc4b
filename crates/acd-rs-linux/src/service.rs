// crates/acd-rs-linux/src/service.rs
//! A dedicated thread that owns the engine, ticks it at the configured
//! interval and feeds it every received frame.
//!
//! Requests from the address-acquisition client arrive over a command queue
//! and are applied between ticks, so the engine itself is never shared.
//! Outcomes flow back over an event queue.

use acd_rs::{
    AcdEngine, AcdError, AcdOutcome, ArpTransport, ContextHandle, DiagnosticSink, InterfaceId,
    NoOpDiagnosticSink, SendFailure,
};
use crossbeam_channel::{self, Receiver, Sender, TryRecvError};
use log::{debug, info, trace, warn};
use std::net::Ipv4Addr;
use std::thread;
use std::time::{Duration, Instant};

/// Largest Ethernet frame accepted from the driver.
const RX_BUFFER_SIZE: usize = 1518;

/// Frames read from one interface before the loop returns to commands and ticks.
pub const MAX_FRAMES_PER_POLL: usize = 64;

/// Frame reception side of a driver.
pub trait FrameReceiver {
    /// Interfaces that can be polled.
    fn interfaces(&self) -> Vec<InterfaceId>;

    /// Copies the next frame into `buffer`. Returns 0 when nothing arrived within the read timeout.
    fn receive_frame(&mut self, interface: InterfaceId, buffer: &mut [u8]) -> Result<usize, AcdError>;
}

type Reply<T> = Sender<Result<T, AcdError>>;

/// A request applied by the service thread between two ticks.
pub enum AcdCommand {
    Register {
        interface: InterfaceId,
        reply: Reply<ContextHandle>,
    },
    Start {
        handle: ContextHandle,
        address: Ipv4Addr,
        reply: Reply<()>,
    },
    Stop {
        handle: ContextHandle,
        reply: Reply<()>,
    },
    Remove {
        handle: ContextHandle,
        reply: Reply<()>,
    },
    LinkDown {
        interface: InterfaceId,
        reply: Reply<()>,
    },
    AddressRoleChanged {
        interface: InterfaceId,
        old: Ipv4Addr,
        new: Ipv4Addr,
        reply: Reply<()>,
    },
}

/// An outcome reported by a detection context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcdEvent {
    pub handle: ContextHandle,
    pub outcome: AcdOutcome,
}

/// Client side of a running `AcdService`.
#[derive(Clone)]
pub struct ServiceHandle {
    commands: Sender<AcdCommand>,
    events: Receiver<AcdEvent>,
}

impl ServiceHandle {
    pub fn register(&self, interface: InterfaceId) -> Result<ContextHandle, AcdError> {
        self.request(|reply| AcdCommand::Register { interface, reply })
    }

    pub fn start(&self, handle: ContextHandle, address: Ipv4Addr) -> Result<(), AcdError> {
        self.request(|reply| AcdCommand::Start { handle, address, reply })
    }

    pub fn stop(&self, handle: ContextHandle) -> Result<(), AcdError> {
        self.request(|reply| AcdCommand::Stop { handle, reply })
    }

    pub fn remove(&self, handle: ContextHandle) -> Result<(), AcdError> {
        self.request(|reply| AcdCommand::Remove { handle, reply })
    }

    pub fn link_down(&self, interface: InterfaceId) -> Result<(), AcdError> {
        self.request(|reply| AcdCommand::LinkDown { interface, reply })
    }

    pub fn address_role_changed(&self, interface: InterfaceId, old: Ipv4Addr, new: Ipv4Addr) -> Result<(), AcdError> {
        self.request(|reply| AcdCommand::AddressRoleChanged { interface, old, new, reply })
    }

    /// Outcomes of every context, in the order they were reported.
    pub fn events(&self) -> &Receiver<AcdEvent> {
        &self.events
    }

    /// Sends a command and blocks until the service thread has applied it.
    fn request<R>(&self, build: impl FnOnce(Reply<R>) -> AcdCommand) -> Result<R, AcdError> {
        let (reply_tx, reply_rx) = crossbeam_channel::bounded(1);
        self.commands.send(build(reply_tx)).map_err(|_| AcdError::IoError)?;
        reply_rx.recv().map_err(|_| AcdError::IoError)?
    }
}

/// Owns an engine and its driver and runs them on one thread.
pub struct AcdService<T, D: DiagnosticSink = NoOpDiagnosticSink> {
    engine: AcdEngine<D>,
    io: T,
    tick_interval: Duration,
    commands: Receiver<AcdCommand>,
    events: Sender<AcdEvent>,
    rx_buffer: Vec<u8>,
}

impl<T, D> AcdService<T, D>
where
    T: ArpTransport + FrameReceiver,
    D: DiagnosticSink,
{
    /// Wraps `engine` and `io`. Interfaces must already be added to the engine.
    pub fn new(engine: AcdEngine<D>, io: T, tick_interval: Duration) -> (Self, ServiceHandle) {
        let (command_tx, command_rx) = crossbeam_channel::unbounded();
        let (event_tx, event_rx) = crossbeam_channel::unbounded();
        let service = Self {
            engine,
            io,
            tick_interval,
            commands: command_rx,
            events: event_tx,
            rx_buffer: vec![0u8; RX_BUFFER_SIZE],
        };
        let handle = ServiceHandle {
            commands: command_tx,
            events: event_rx,
        };
        (service, handle)
    }

    pub fn engine(&self) -> &AcdEngine<D> {
        &self.engine
    }

    pub fn io(&self) -> &T {
        &self.io
    }

    /// Applies one command and answers it.
    pub fn handle_command(&mut self, command: AcdCommand) {
        match command {
            AcdCommand::Register { interface, reply } => {
                let events = self.events.clone();
                let result = self.engine.register(interface, move |handle, outcome| {
                    // The client may have gone away; outcomes are then dropped.
                    let _ = events.send(AcdEvent { handle, outcome });
                });
                let _ = reply.send(result);
            }
            AcdCommand::Start { handle, address, reply } => {
                let _ = reply.send(self.engine.start(handle, address));
            }
            AcdCommand::Stop { handle, reply } => {
                let _ = reply.send(self.engine.stop(handle));
            }
            AcdCommand::Remove { handle, reply } => {
                let _ = reply.send(self.engine.remove(handle));
            }
            AcdCommand::LinkDown { interface, reply } => {
                let _ = reply.send(self.engine.link_down(interface));
            }
            AcdCommand::AddressRoleChanged { interface, old, new, reply } => {
                let _ = reply.send(self.engine.address_role_changed(interface, old, new));
            }
        }
    }

    /// Applies every queued command. Returns false once all handles are dropped.
    pub fn drain_commands(&mut self) -> bool {
        loop {
            match self.commands.try_recv() {
                Ok(command) => self.handle_command(command),
                Err(TryRecvError::Empty) => return true,
                Err(TryRecvError::Disconnected) => return false,
            }
        }
    }

    /// Reads frames from every interface until each one times out, `deadline`
    /// passes or `MAX_FRAMES_PER_POLL` frames were read from it.
    /// At least one read is attempted per interface. Returns the number of frames read.
    pub fn poll_frames(&mut self, deadline: Instant) -> usize {
        let mut total = 0;
        for interface in self.io.interfaces() {
            for _ in 0..MAX_FRAMES_PER_POLL {
                let len = match self.io.receive_frame(interface, &mut self.rx_buffer) {
                    Ok(0) => break,
                    Ok(len) => len,
                    Err(e) => {
                        warn!("[ACD-Service] Receive on {} failed: {}", interface, e);
                        break;
                    }
                };
                total += 1;
                match self.engine.process_raw_frame(interface, &self.rx_buffer[..len], &mut self.io) {
                    Ok(failures) => report_failures(&failures),
                    // Non-ARP traffic is expected on a shared link.
                    Err(e) => trace!("[ACD-Service] Ignored frame on {}: {}", interface, e),
                }
                if Instant::now() >= deadline {
                    break;
                }
            }
        }
        total
    }

    /// Advances the engine by one tick.
    pub fn tick(&mut self) {
        let failures = self.engine.tick(&mut self.io);
        report_failures(&failures);
    }

    /// Runs until every `ServiceHandle` has been dropped.
    pub fn run(mut self) {
        info!("[ACD-Service] Starting tick loop, interval {:?}", self.tick_interval);
        let mut next_tick = Instant::now() + self.tick_interval;
        loop {
            if !self.drain_commands() {
                info!("[ACD-Service] All handles dropped, stopping");
                return;
            }
            self.poll_frames(next_tick);

            let now = Instant::now();
            if now >= next_tick {
                self.tick();
                next_tick += self.tick_interval;
                if now > next_tick + self.tick_interval {
                    // Catching up tick by tick would compress every timer.
                    warn!("[ACD-Service] Tick loop overrun, resynchronizing");
                    next_tick = now + self.tick_interval;
                }
            } else {
                thread::sleep((next_tick - now).min(Duration::from_millis(1)));
            }
        }
    }

    /// Moves the service onto its own thread.
    pub fn spawn(self) -> thread::JoinHandle<()>
    where
        T: Send + 'static,
        D: Send + 'static,
    {
        thread::spawn(move || self.run())
    }
}

fn report_failures(failures: &[SendFailure]) {
    // Each failure was already logged by the engine.
    if !failures.is_empty() {
        debug!("[ACD-Service] {} frame(s) lost this cycle", failures.len());
    }
}

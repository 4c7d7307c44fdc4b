//! Claims an IPv4 address on a Linux interface and keeps defending it.
//!
//! Usage (raw sockets need CAP_NET_RAW):
//! `sudo cargo run -p acd-rs-linux --example acd_monitor -- eth0 192.168.1.50`
//!
//! Set `RUST_LOG=debug` to follow the state machine.

use acd_rs::{AcdConfig, AcdEngine, AcdOutcome, InterfaceId, LoggingDiagnosticSink};
use acd_rs_linux::{AcdService, LinuxArpTransport};
use log::{error, info, warn};
use std::net::Ipv4Addr;
use std::{env, process, time::Duration};

const IF0: InterfaceId = InterfaceId(0);

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run() {
        error!("{}", e);
        process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let mut args = env::args().skip(1);
    let interface_name = args.next().unwrap_or_else(|| "eth0".to_string());
    let address: Ipv4Addr = args
        .next()
        .unwrap_or_else(|| "169.254.1.1".to_string())
        .parse()
        .map_err(|e| format!("Invalid IPv4 address: {}", e))?;

    let config = AcdConfig::default();
    let tick = Duration::from_millis(u64::from(config.tick_interval_ms));

    let mut transport = LinuxArpTransport::new();
    let mac = transport.open(IF0, &interface_name, Duration::from_millis(1))?;

    let mut engine = AcdEngine::with_sink(&config, LoggingDiagnosticSink)
        .map_err(|e| format!("Failed to create engine: {}", e))?;
    engine
        .add_interface(IF0, mac)
        .map_err(|e| format!("Failed to add interface: {}", e))?;

    let (service, handle) = AcdService::new(engine, transport, tick);
    let _worker = service.spawn();

    let ctx = handle.register(IF0).map_err(|e| format!("Failed to register: {}", e))?;
    handle
        .start(ctx, address)
        .map_err(|e| format!("Failed to start detection: {}", e))?;
    info!("Probing {} on {} ({})", address, interface_name, mac);

    for event in handle.events().iter() {
        match event.outcome {
            AcdOutcome::IpOk => info!("{} is ours, defending it", address),
            AcdOutcome::Decline => warn!("{} is in use by another host", address),
            AcdOutcome::RestartClient => {
                info!("Retrying {} after conflict", address);
                handle
                    .start(ctx, address)
                    .map_err(|e| format!("Failed to restart detection: {}", e))?;
            }
        }
    }
    Ok(())
}

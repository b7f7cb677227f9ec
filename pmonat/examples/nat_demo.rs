//! Exemple : découverte des passerelles et redirection d'un port UDP
//!
//! Pour tester :
//! ```bash
//! cargo run -p pmonat --example nat_demo -- -inPort 17269 -exPort 17269 -d 3600
//! ```

use std::sync::Arc;

use pmoconfig::get_config;
use pmonat::{Discover, Nat, NatConfigExt, TracingLogger};
use tokio_util::sync::CancellationToken;

const USAGE: &str = "Usage: nat_demo [-inPort <port>] [-exPort <port>] [-d <seconds>] [-h]

  -inPort  internal port (default 17269)
  -exPort  external port (default 17269)
  -d       lease duration in seconds (default 3600)
  -h       help";

struct Args {
    internal_port: u16,
    external_port: u16,
    lease_duration: u32,
}

fn parse_args() -> Result<Option<Args>, String> {
    let mut args = Args {
        internal_port: 17269,
        external_port: 17269,
        lease_duration: 3600,
    };

    let mut it = std::env::args().skip(1);
    while let Some(flag) = it.next() {
        let flag = flag.trim_start_matches('-');
        if flag == "h" || flag == "help" {
            return Ok(None);
        }
        let value = it.next().ok_or_else(|| format!("missing value for -{flag}"))?;
        let invalid = |e: std::num::ParseIntError| format!("invalid value for -{flag}: {e}");
        match flag {
            "inPort" => args.internal_port = value.parse().map_err(invalid)?,
            "exPort" => args.external_port = value.parse().map_err(invalid)?,
            "d" => args.lease_duration = value.parse().map_err(invalid)?,
            other => return Err(format!("unknown flag -{other}")),
        }
    }
    Ok(Some(args))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = match parse_args() {
        Ok(Some(args)) => args,
        Ok(None) => {
            println!("{USAGE}");
            return Ok(());
        }
        Err(e) => {
            eprintln!("{e}\n\n{USAGE}");
            std::process::exit(2);
        }
    };

    let config = get_config();
    let level = config
        .get_log_min_level()
        .unwrap_or_else(|_| "INFO".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(level.to_lowercase()))
        .init();

    let discover = Discover::new(Arc::new(TracingLogger), config.get_nat_config());
    let cancel = CancellationToken::new();

    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    let nats = discover.discover_nats(&cancel).await?;
    if nats.is_empty() {
        println!("No UPnP gateway found");
        return Ok(());
    }

    for (i, nat) in nats.iter().enumerate() {
        println!(
            "[{}] {} {} {}",
            i,
            nat.nat_type(),
            nat.device_name(),
            nat.location()
        );

        match nat.get_external_address().await {
            Ok(ip) => println!("  external address: {ip}"),
            Err(e) => println!("  external address: {e}"),
        }
        match nat.get_internal_address().await {
            Ok(ip) => println!("  internal address: {ip}"),
            Err(e) => println!("  internal address: {e}"),
        }
        match nat.get_device_address().await {
            Ok(ip) => println!("  device address: {ip}"),
            Err(e) => println!("  device address: {e}"),
        }
        match nat.get_device_status().await {
            Ok(status) => println!(
                "  status: {} (uptime {}s, last error {:?})",
                status.connection_status, status.uptime, status.last_connection_error
            ),
            Err(e) => println!("  status: {e}"),
        }

        nat.add_port_mapping(
            "udp",
            args.internal_port,
            args.external_port,
            args.lease_duration,
            "remoteP2P",
        )
        .await?;

        let entry = nat.get_port_mapping("udp", args.external_port).await?;
        println!(
            "  mapping UDP {} -> {}:{} ({}, lease {}s)",
            args.external_port,
            entry.internal_client,
            entry.internal_port,
            entry.description,
            entry.lease_duration
        );
    }

    Ok(())
}

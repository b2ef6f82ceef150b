//! Tabmesh Demo
//!
//! Joins several sessions to one room inside a single process, the way
//! several tabs of one browser would, and lets simulated players run around
//! for a while. Useful for watching discovery, heartbeats and departures in
//! the logs.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tabmesh_core::Origin;
use tabmesh_core::proto::{RoomId, room_link};
use url::Url;

use crate::config::DemoConfig;
use crate::logging::{LogFormat, init_logging};
use crate::sim::Scenario;

mod config;
mod logging;
mod sim;

#[derive(Parser, Debug)]
#[command(name = "tabmesh-demo", version, about = "Simulate co-located tabmesh sessions")]
struct Cli {
    /// Room to join; a new one is generated when omitted.
    #[arg(long, env = "TABMESH_ROOM")]
    room: Option<String>,

    /// Number of sessions; the first one hosts.
    #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u16).range(1..=64))]
    peers: u16,

    /// Run time in seconds.
    #[arg(long, default_value_t = 10)]
    seconds: u64,

    /// TOML config file.
    #[arg(long, env = "TABMESH_CONFIG")]
    config: Option<PathBuf>,

    /// Disable the direct broadcast transport.
    #[arg(long)]
    no_direct: bool,

    /// Disable the shared store transport.
    #[arg(long)]
    no_store: bool,

    /// Log as JSON lines.
    #[arg(long)]
    json_logs: bool,
}

impl Cli {
    fn origin(&self) -> Origin {
        match (self.no_direct, self.no_store) {
            (false, false) => Origin::new(),
            (true, false) => Origin::without_direct(),
            (false, true) => Origin::without_store(),
            (true, true) => Origin::isolated(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => DemoConfig::from_toml_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => DemoConfig::default(),
    };
    if cli.json_logs {
        config.log.format = LogFormat::Json;
    }
    init_logging(config.log.format, &config.log.level);

    let room = match &cli.room {
        Some(raw) => RoomId::parse(raw).with_context(|| format!("Invalid room id '{raw}'"))?,
        None => RoomId::generate(),
    };
    let base = Url::parse(&config.link_base)
        .with_context(|| format!("Invalid link_base '{}'", config.link_base))?;
    println!("Room link: {}", room_link(&base, &room));

    let scenario = Scenario {
        room,
        peers: usize::from(cli.peers),
        duration: Duration::from_secs(cli.seconds),
        sync: config.sync,
    };
    tracing::info!(
        room = %scenario.room,
        peers = scenario.peers,
        seconds = cli.seconds,
        "[demo] Starting"
    );

    sim::run(&cli.origin(), &scenario).await?;

    tracing::info!("[demo] Done");
    Ok(())
}

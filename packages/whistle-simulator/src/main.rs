//! main.rs: whistle report simulator entry point
//!
//! Plays the robot side of the direction whistle challenge: every tick one whistle
//! report is encoded as an SPL standard message and sent to the tester port of the
//! simulated team. Optionally interleaves regular gameplay messages, which the tester
//! must ignore without complaint.

mod udp_tx;
mod whistle_gen;

use std::net::ToSocketAddrs;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::time::interval;
use tracing::info;
use whistle_types::Vector2D;

use udp_tx::UdpTransmitter;
use whistle_gen::{WhistleGenerator, WhistleSource};

// ── CLI ───────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "whistle-sim", about = "Sends whistle reports to the direction whistle tester")]
struct Args {
    /// Team number (selects the tester port)
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=99))]
    team: u8,
    /// Player number of the sending robot
    #[arg(long, default_value = "1")]
    player: u8,
    /// Tester host
    #[arg(long, default_value = "127.0.0.1")]
    host: String,
    /// Tester base port; the team's port is base + team
    #[arg(long, default_value = "10000")]
    base_port: u16,
    /// Whistle x in meters
    #[arg(long, requires = "y", allow_negative_numbers = true)]
    x: Option<f32>,
    /// Whistle y in meters
    #[arg(long, requires = "x", allow_negative_numbers = true)]
    y: Option<f32>,
    /// Draw a new whistle location for every message
    #[arg(long, conflicts_with_all = ["x", "y"])]
    random: bool,
    /// Always claim the whistle was on the other field
    #[arg(long)]
    other_field: bool,
    /// Standard deviation of the localization noise (meters)
    #[arg(long, default_value = "0.0")]
    noise_m: f32,
    /// Delay between messages
    #[arg(long, default_value = "1000")]
    interval_ms: u64,
    /// Number of messages to send (0 = until interrupted)
    #[arg(long, default_value = "1")]
    count: u64,
    /// Send every M-th message as regular gameplay traffic (0 = never)
    #[arg(long, default_value = "0")]
    foreign_every: u64,
}

// ── Main ──────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "whistle_sim=info".into()),
        )
        .init();

    let args = Args::parse();

    let source = match (args.random, args.x, args.y) {
        (true, _, _) => WhistleSource::Random,
        (false, Some(x), Some(y)) => WhistleSource::Fixed(Vector2D::new(x, y)),
        _ => WhistleSource::Fixed(Vector2D::ZERO),
    };
    let generator = WhistleGenerator::new(source, args.other_field, args.noise_m)
        .with_context(|| format!("invalid noise sigma {}", args.noise_m))?;

    let port = args
        .base_port
        .checked_add(u16::from(args.team))
        .context("team port out of range")?;
    let target = (args.host.as_str(), port)
        .to_socket_addrs()
        .with_context(|| format!("resolving {}", args.host))?
        .next()
        .with_context(|| format!("no address for {}", args.host))?;
    let transmitter = UdpTransmitter::new(target).context("binding UDP socket")?;

    info!(
        "Whistle simulator: team {} player {} → {} ({:?}, σ = {} m)",
        args.team,
        args.player,
        transmitter.target(),
        source,
        args.noise_m
    );

    let mut rng = rand::thread_rng();
    let mut ticker = interval(Duration::from_millis(args.interval_ms.max(1)));
    let mut sequence = 0u64;

    while args.count == 0 || sequence < args.count {
        ticker.tick().await;
        sequence += 1;

        let (actual, report) = generator.next_report(&mut rng);
        let foreign = whistle_gen::is_foreign(sequence, args.foreign_every);
        let message = whistle_gen::build_message(args.player, args.team, &report, foreign);

        if transmitter.send(&message) {
            if foreign {
                info!("#{sequence}: gameplay message (should be ignored)");
            } else {
                info!(
                    "#{sequence}: whistle at ({:.2}, {:.2}), reported ({:.2}, {:.2}) on {} field",
                    actual.x,
                    actual.y,
                    report.location.x,
                    report.location.y,
                    if report.on_same_field { "same" } else { "other" }
                );
            }
        }
    }

    info!("Sent {sequence} messages");
    Ok(())
}

mod config;
mod tcp;

use std::net::TcpListener;
use std::time::{Duration, Instant};

use anyhow::Result;
use clap::Parser;

use skirmish::{FixedTimestep, ServerSimulator, spawn_match};

use config::ServerConfig;
use tcp::TcpConnection;

#[derive(Parser)]
#[command(name = "skirmish-server")]
#[command(about = "Authoritative skirmish game server")]
struct Args {
    #[arg(short, long, default_value = "0.0.0.0")]
    bind: String,

    #[arg(short, long, default_value_t = skirmish::DEFAULT_PORT)]
    port: u16,

    #[arg(short, long, default_value_t = skirmish::DEFAULT_TICK_RATE)]
    tick_rate: u32,

    #[arg(long, default_value_t = 2, help = "Players required to start a match")]
    players: usize,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = ServerConfig {
        bind: args.bind,
        port: args.port,
        tick_rate: args.tick_rate,
        players: args.players,
    };

    let listener = TcpListener::bind(config.bind_addr())?;
    log::info!(
        "listening on {}, waiting for {} players",
        listener.local_addr()?,
        config.players
    );

    let players = config.players;
    let mut simulator: ServerSimulator<TcpConnection> =
        ServerSimulator::new(players, config.tick_rate, move |db| spawn_match(db, players));

    // Sessions are admitted before the tick loop starts; the match cannot
    // begin without full capacity anyway.
    while !simulator.is_started() {
        let (stream, peer) = listener.accept()?;
        log::info!("{} connecting", peer);
        match TcpConnection::new(stream) {
            Ok(connection) => {
                if simulator.connect_client(connection).is_none() {
                    log::warn!("{} rejected: match is full", peer);
                }
            }
            Err(error) => log::warn!("{} rejected: {}", peer, error),
        }
    }

    run(&mut simulator, config.tick_rate);
    simulator.close_all();
    log::info!("server shutting down");
    Ok(())
}

/// Drives the simulator at the fixed tick rate until the match is decided.
fn run(simulator: &mut ServerSimulator<TcpConnection>, tick_rate: u32) {
    let mut timestep = FixedTimestep::new(tick_rate);
    let mut last = Instant::now();
    loop {
        let now = Instant::now();
        timestep.accumulate(now.duration_since(last).as_secs_f32());
        last = now;

        while timestep.consume() {
            simulator.tick();
            for (frame, effect) in simulator.drain_effects() {
                log::debug!("frame {}: {:?}", frame, effect);
            }
        }
        if simulator.db().components.tanks.len() <= 1 {
            log::info!("match over at frame {}", simulator.frame());
            return;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
}

//! Loopback demonstration: one authoritative server and two prediction
//! engines wired through in-memory connections, with the server echoing a
//! couple of ticks late so reconciliation actually has work to do.

use anyhow::Result;

use skirmish::{
    AttackInput, MemoryConnection, MoveDirection, MoveInput, PredictionEngine, ServerSimulator,
    spawn_match, tank_of_player,
};

const TICK_RATE: u32 = 30;
const PLAYERS: usize = 2;
const FRAMES: u32 = 120;
const SERVER_LAG_TICKS: u32 = 3;

fn scripted_direction(player: u8, frame: u32) -> MoveDirection {
    match (player, (frame / 30) % 4) {
        (0, 0) => MoveDirection::UpRight,
        (0, 1) => MoveDirection::Right,
        (0, 2) => MoveDirection::Up,
        (0, _) => MoveDirection::None,
        (_, 0) => MoveDirection::DownLeft,
        (_, 1) => MoveDirection::Left,
        (_, 2) => MoveDirection::Down,
        (_, _) => MoveDirection::None,
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut server = ServerSimulator::new(PLAYERS, TICK_RATE, |db| spawn_match(db, PLAYERS));
    let mut clients = Vec::new();
    for _ in 0..PLAYERS {
        let (client_side, server_side) = MemoryConnection::pair();
        let player_number = server
            .connect_client(server_side)
            .expect("demo stays within capacity");
        let mut engine = PredictionEngine::new(client_side, player_number, PLAYERS, TICK_RATE);
        engine.set_debug_draw(true);
        clients.push(engine);
    }

    for frame in 0..FRAMES {
        for client in &mut clients {
            let player = client.player_number();
            let movement = Some(MoveInput {
                direction: scripted_direction(player, frame),
                dash: frame % 50 == 10,
            });
            let attack = (player == 0 && frame % 16 == 0).then_some(AttackInput {
                target_pos: [10.0, 10.0],
                fire_held: false,
                fire_down: true,
            });
            client.predict(movement, attack, false)?;
        }

        // Hold the server back a few ticks so clients run speculatively.
        if frame % SERVER_LAG_TICKS == 0 {
            server.tick();
        }
        for client in &mut clients {
            client.process_server_messages()?;
            for (effect_frame, effect) in client.drain_effects() {
                log::info!(
                    "client {}: frame {} {:?}",
                    client.player_number(),
                    effect_frame,
                    effect
                );
            }
        }

        if frame % 30 == 29 {
            report(&server, &clients);
        }
    }

    server.tick();
    for client in &mut clients {
        client.process_server_messages()?;
    }
    report(&server, &clients);

    for client in &mut clients {
        log::info!(
            "client {}: {} debug shapes collected",
            client.player_number(),
            client.drain_debug().len()
        );
        client.close();
    }
    Ok(())
}

fn report(
    server: &ServerSimulator<MemoryConnection>,
    clients: &[PredictionEngine<MemoryConnection>],
) {
    log::info!("server frame {}", server.frame());
    for client in clients {
        let player = client.player_number();
        let position = tank_of_player(&client.db().components, player)
            .and_then(|id| client.db().components.transforms.get(id))
            .map(|t| t.position);
        log::info!(
            "client {}: confirmed {:?}, {} frames speculative, own tank at {:?}",
            player,
            client.confirmed_frame(),
            client.predicted_count(),
            position
        );
    }
}

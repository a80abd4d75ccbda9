use glam::Vec2;

use skirmish::{
    AttackInput, ClientMessage, Connection, MemoryConnection, MoveDirection, MoveInput,
    PredictionEngine, ServerSimulator, spawn_match,
};

const TICK_RATE: u32 = 30;
const PLAYERS: usize = 2;

struct Harness {
    server: ServerSimulator<MemoryConnection>,
    clients: Vec<PredictionEngine<MemoryConnection>>,
}

fn harness() -> Harness {
    let mut server = ServerSimulator::new(PLAYERS, TICK_RATE, |db| spawn_match(db, PLAYERS));
    let mut clients = Vec::new();
    for expected in 0..PLAYERS as u8 {
        let (client_side, server_side) = MemoryConnection::pair();
        let player_number = server.connect_client(server_side).expect("capacity");
        assert_eq!(player_number, expected);
        clients.push(PredictionEngine::new(
            client_side,
            player_number,
            PLAYERS,
            TICK_RATE,
        ));
    }
    Harness { server, clients }
}

fn transforms(db: &skirmish::ArenaDb) -> Vec<(u32, Vec2)> {
    db.components
        .transforms
        .iter()
        .map(|(id, t)| (id.0, t.position))
        .collect()
}

fn direction_for(player: u8) -> MoveDirection {
    if player == 0 {
        MoveDirection::UpRight
    } else {
        MoveDirection::DownLeft
    }
}

#[test]
fn clients_converge_on_the_server_world() {
    let mut h = harness();

    for _ in 0..30 {
        for client in &mut h.clients {
            let direction = direction_for(client.player_number());
            client
                .predict(
                    Some(MoveInput {
                        direction,
                        dash: false,
                    }),
                    None,
                    false,
                )
                .unwrap();
        }
        h.server.tick();
        for client in &mut h.clients {
            client.process_server_messages().unwrap();
        }
    }

    assert_eq!(h.server.frame(), 30);
    let authoritative = transforms(h.server.db());
    for client in &h.clients {
        // Every frame was confirmed before the next prediction, so the
        // predicted head sits exactly on the authoritative world.
        assert_eq!(client.confirmed_frame(), Some(29));
        assert_eq!(client.predicted_count(), 0);
        assert_eq!(transforms(client.db()), authoritative);
    }
}

#[test]
fn prediction_survives_a_lagging_server() {
    let mut h = harness();

    // Ten frames of input with no server ticks at all: pure speculation.
    for _ in 0..10 {
        for client in &mut h.clients {
            let direction = direction_for(client.player_number());
            client
                .predict(
                    Some(MoveInput {
                        direction,
                        dash: false,
                    }),
                    None,
                    false,
                )
                .unwrap();
        }
    }
    for client in &h.clients {
        assert_eq!(client.confirmed_frame(), None);
        assert_eq!(client.predicted_count(), 10);
    }

    // The server wakes up, consumes the backlog, and the clients reconcile.
    assert_eq!(h.server.tick(), 10);
    for client in &mut h.clients {
        client.process_server_messages().unwrap();
        assert_eq!(client.confirmed_frame(), Some(9));
        assert_eq!(client.predicted_count(), 0);
    }

    let authoritative = transforms(h.server.db());
    for client in &h.clients {
        assert_eq!(transforms(client.db()), authoritative);
    }
}

#[test]
fn combat_stays_consistent_across_reconciliation() {
    let mut h = harness();

    // Player 0 holds fire toward player 1's spawn corner while both advance.
    for _ in 0..60 {
        for client in &mut h.clients {
            let player = client.player_number();
            let attack = (player == 0).then_some(AttackInput {
                target_pos: [16.0, 16.0],
                fire_held: true,
                fire_down: false,
            });
            client
                .predict(
                    Some(MoveInput {
                        direction: direction_for(player),
                        dash: false,
                    }),
                    attack,
                    false,
                )
                .unwrap();
        }
        h.server.tick();
        for client in &mut h.clients {
            client.process_server_messages().unwrap();
        }
    }

    let authoritative = transforms(h.server.db());
    for client in &h.clients {
        assert_eq!(transforms(client.db()), authoritative);
    }

    // Shots were fired authoritatively; each client saw each shot once.
    let server_shots = h
        .server
        .drain_effects()
        .iter()
        .filter(|(_, effect)| matches!(effect, skirmish::Effect::ShotFired { .. }))
        .count();
    assert!(server_shots > 0);
    for client in &mut h.clients {
        let client_shots = client
            .drain_effects()
            .iter()
            .filter(|(_, effect)| matches!(effect, skirmish::Effect::ShotFired { .. }))
            .count();
        assert_eq!(client_shots, server_shots);
    }
}

#[test]
fn malformed_traffic_does_not_stall_the_match() {
    let mut h = harness();

    // Garbage on the wire in both directions before honest traffic.
    let (mut rogue, server_side) = MemoryConnection::pair();
    assert!(h.server.connect_client(server_side).is_none());
    rogue.send(b"\xff\xfe not a message");

    for _ in 0..5 {
        for client in &mut h.clients {
            client
                .predict(
                    Some(MoveInput {
                        direction: MoveDirection::Up,
                        dash: false,
                    }),
                    None,
                    false,
                )
                .unwrap();
        }
        h.server.tick();
        for client in &mut h.clients {
            client.process_server_messages().unwrap();
        }
    }

    assert_eq!(h.server.frame(), 5);
    for client in &h.clients {
        assert_eq!(client.confirmed_frame(), Some(4));
    }
}

#[test]
fn input_echo_matches_what_clients_sent() {
    let mut h = harness();

    let mut raw = ClientMessage::empty(0, 0);
    raw.movement = Some(MoveInput {
        direction: MoveDirection::Left,
        dash: true,
    });
    // Drive client 0 by hand through the engine, client 1 idles.
    h.clients[0]
        .predict(raw.movement, None, false)
        .unwrap();
    h.clients[1].predict(None, None, false).unwrap();
    h.server.tick();

    for client in &mut h.clients {
        assert_eq!(client.process_server_messages().unwrap(), 1);
        assert_eq!(client.confirmed_frame(), Some(0));
    }
}

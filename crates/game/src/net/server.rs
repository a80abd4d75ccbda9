use std::collections::{BTreeMap, HashMap};

use crate::simulation::{DebugDraw, Effect, EffectSink, FrameState, SimulationPhase, simulate};
use crate::world::ArenaDb;

use super::protocol::{ClientMessage, ServerMessage};
use super::transport::Connection;

struct ServerSession<C> {
    connection: C,
    player_number: u8,
    last_input_frame: Option<u32>,
}

type ReadyCallback = Box<dyn FnOnce(&mut ArenaDb)>;

/// Authoritative tick driver.
///
/// Buffers per-player input by frame and only advances once every connected
/// player has supplied input for the next frame (quorum). Each advanced frame
/// is simulated through the shared pipeline, committed, and echoed to all
/// clients as a [`ServerMessage`] carrying the resolved input set.
pub struct ServerSimulator<C: Connection> {
    db: ArenaDb,
    sessions: Vec<ServerSession<C>>,
    capacity: usize,
    frame: u32,
    dt: f32,
    input_buffer: HashMap<u32, BTreeMap<u8, ClientMessage>>,
    effects: EffectSink,
    debug: DebugDraw,
    on_ready: Option<ReadyCallback>,
    started: bool,
}

impl<C: Connection> ServerSimulator<C> {
    /// `on_ready` runs exactly once, when the `capacity`-th client connects,
    /// and is expected to register and commit the initial world state.
    pub fn new(capacity: usize, tick_rate: u32, on_ready: impl FnOnce(&mut ArenaDb) + 'static) -> Self {
        Self {
            db: ArenaDb::new(),
            sessions: Vec::with_capacity(capacity),
            capacity,
            frame: 0,
            dt: 1.0 / tick_rate as f32,
            input_buffer: HashMap::new(),
            effects: EffectSink::new(),
            debug: DebugDraw::default(),
            on_ready: Some(Box::new(on_ready)),
            started: false,
        }
    }

    /// Admits a connection and assigns it the next player number, or returns
    /// `None` (connection dropped, no session) once capacity is reached.
    pub fn connect_client(&mut self, connection: C) -> Option<u8> {
        if self.sessions.len() >= self.capacity {
            log::warn!("rejecting connection: server is at capacity ({})", self.capacity);
            return None;
        }
        let player_number = self.sessions.len() as u8;
        self.sessions.push(ServerSession {
            connection,
            player_number,
            last_input_frame: None,
        });
        log::info!("player {} connected", player_number);

        if self.sessions.len() == self.capacity
            && let Some(on_ready) = self.on_ready.take()
        {
            on_ready(&mut self.db);
            self.started = true;
            log::info!("all {} players connected, match started", self.capacity);
        }
        Some(player_number)
    }

    /// One driver tick: drain inbound messages, then simulate every frame
    /// that has reached input quorum. Returns how many frames advanced.
    pub fn tick(&mut self) -> u32 {
        self.drain_connections();
        if !self.started {
            return 0;
        }

        let mut advanced = 0;
        while let Some(inputs) = self.take_quorum() {
            let mut state = FrameState {
                db: &mut self.db,
                frame: self.frame,
                inputs: &inputs,
                phase: SimulationPhase::ServerTick,
                effects: &mut self.effects,
                debug: &mut self.debug,
            };
            if let Err(error) = simulate(&mut state, self.dt) {
                // A failed tick must not leave half a frame applied; the
                // world stays at the previous commit.
                log::error!("frame {} failed: {}", self.frame, error);
                self.db.undo_prediction();
                break;
            }
            self.db.commit_prediction();
            self.broadcast(ServerMessage {
                frame: self.frame,
                inputs,
            });
            self.frame += 1;
            advanced += 1;
        }
        advanced
    }

    fn drain_connections(&mut self) {
        let current_frame = self.frame;
        for session in &mut self.sessions {
            for payload in session.connection.consume() {
                let message = match ClientMessage::decode(&payload) {
                    Ok(message) => message,
                    Err(error) => {
                        // Trusted peers can still send garbage; reject the
                        // payload, never the tick driver.
                        log::warn!("player {}: discarding payload: {}", session.player_number, error);
                        continue;
                    }
                };
                if message.player_number != session.player_number {
                    log::warn!(
                        "player {}: discarding input claiming player {}",
                        session.player_number,
                        message.player_number
                    );
                    continue;
                }
                if message.frame < current_frame {
                    log::debug!(
                        "player {}: discarding stale input for frame {}",
                        session.player_number,
                        message.frame
                    );
                    continue;
                }
                session.last_input_frame = Some(
                    session
                        .last_input_frame
                        .map_or(message.frame, |last| last.max(message.frame)),
                );
                self.input_buffer
                    .entry(message.frame)
                    .or_default()
                    .insert(message.player_number, message);
            }
        }
        self.input_buffer.retain(|&frame, _| frame >= current_frame);
    }

    /// The gate: the next frame simulates only once every player's input for
    /// it has arrived, so no client's history can diverge from the echo.
    fn take_quorum(&mut self) -> Option<Vec<ClientMessage>> {
        let ready = self
            .input_buffer
            .get(&self.frame)
            .is_some_and(|inputs| inputs.len() == self.capacity);
        if !ready {
            return None;
        }
        self.input_buffer
            .remove(&self.frame)
            .map(|inputs| inputs.into_values().collect())
    }

    fn broadcast(&mut self, message: ServerMessage) {
        match message.encode() {
            Ok(payload) => {
                for session in &mut self.sessions {
                    session.connection.send(&payload);
                }
            }
            Err(error) => log::error!("failed to encode frame {}: {}", message.frame, error),
        }
    }

    pub fn frame(&self) -> u32 {
        self.frame
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn player_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn db(&self) -> &ArenaDb {
        &self.db
    }

    pub fn drain_effects(&mut self) -> Vec<(u32, Effect)> {
        self.effects.drain()
    }

    pub fn close_all(&mut self) {
        for session in &mut self.sessions {
            session.connection.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::{MemoryConnection, MoveDirection, MoveInput};
    use crate::world::spawn_match;

    fn server(capacity: usize) -> ServerSimulator<MemoryConnection> {
        ServerSimulator::new(capacity, 30, move |db| spawn_match(db, capacity))
    }

    fn input(frame: u32, player: u8) -> ClientMessage {
        let mut message = ClientMessage::empty(frame, player);
        message.movement = Some(MoveInput {
            direction: MoveDirection::Up,
            dash: false,
        });
        message
    }

    fn send(client: &mut MemoryConnection, message: &ClientMessage) {
        client.send(&message.encode().unwrap());
    }

    #[test]
    fn capacity_gate_rejects_extra_clients() {
        let mut server = server(2);
        let (side_a, _keep_a) = MemoryConnection::pair();
        let (side_b, _keep_b) = MemoryConnection::pair();
        let (side_c, _keep_c) = MemoryConnection::pair();

        assert_eq!(server.connect_client(side_a), Some(0));
        assert!(!server.is_started());
        assert_eq!(server.connect_client(side_b), Some(1));
        assert!(server.is_started());
        assert_eq!(server.connect_client(side_c), None);
        assert_eq!(server.player_count(), 2);
    }

    #[test]
    fn world_initializes_when_full() {
        let mut server = server(2);
        let (side_a, _a) = MemoryConnection::pair();
        let (side_b, _b) = MemoryConnection::pair();
        server.connect_client(side_a);
        assert_eq!(server.db().components.tanks.len(), 0);
        server.connect_client(side_b);
        assert_eq!(server.db().components.tanks.len(), 2);
    }

    #[test]
    fn tick_waits_for_quorum() {
        let mut server = server(2);
        let (server_a, mut client_a) = MemoryConnection::pair();
        let (server_b, mut client_b) = MemoryConnection::pair();
        server.connect_client(server_a);
        server.connect_client(server_b);

        send(&mut client_a, &input(0, 0));
        assert_eq!(server.tick(), 0);
        assert_eq!(server.frame(), 0);

        send(&mut client_b, &input(0, 1));
        assert_eq!(server.tick(), 1);
        assert_eq!(server.frame(), 1);
    }

    #[test]
    fn broadcast_echoes_the_applied_inputs() {
        let mut server = server(2);
        let (server_a, mut client_a) = MemoryConnection::pair();
        let (server_b, mut client_b) = MemoryConnection::pair();
        server.connect_client(server_a);
        server.connect_client(server_b);

        send(&mut client_a, &input(0, 0));
        send(&mut client_b, &input(0, 1));
        server.tick();

        for client in [&mut client_a, &mut client_b] {
            let payloads = client.consume();
            assert_eq!(payloads.len(), 1);
            let message = ServerMessage::decode(&payloads[0]).unwrap();
            assert_eq!(message.frame, 0);
            let players: Vec<u8> = message.inputs.iter().map(|m| m.player_number).collect();
            assert_eq!(players, vec![0, 1]);
        }
    }

    #[test]
    fn buffered_future_inputs_advance_in_order() {
        let mut server = server(2);
        let (server_a, mut client_a) = MemoryConnection::pair();
        let (server_b, mut client_b) = MemoryConnection::pair();
        server.connect_client(server_a);
        server.connect_client(server_b);

        for frame in 0..3 {
            send(&mut client_a, &input(frame, 0));
            send(&mut client_b, &input(frame, 1));
        }
        assert_eq!(server.tick(), 3);
        assert_eq!(server.frame(), 3);
        assert_eq!(client_a.consume().len(), 3);
    }

    #[test]
    fn malformed_and_spoofed_payloads_are_discarded() {
        let mut server = server(2);
        let (server_a, mut client_a) = MemoryConnection::pair();
        let (server_b, mut client_b) = MemoryConnection::pair();
        server.connect_client(server_a);
        server.connect_client(server_b);

        client_a.send(b"{ not json");
        // Player 0's connection claiming to be player 1 must not fill 1's slot.
        send(&mut client_a, &input(0, 1));
        send(&mut client_b, &input(0, 1));
        assert_eq!(server.tick(), 0);

        send(&mut client_a, &input(0, 0));
        assert_eq!(server.tick(), 1);
    }
}

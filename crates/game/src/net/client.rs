use std::collections::VecDeque;

use crate::simulation::{
    DebugDraw, DebugShape, Effect, EffectSink, FrameState, SimulationError, SimulationPhase,
    simulate,
};
use crate::world::{ArenaDb, spawn_match};

use super::protocol::{AttackInput, ClientMessage, MoveInput, ProtocolError, ServerMessage};
use super::transport::Connection;

/// How far the client may run ahead of the last authoritative frame.
pub const MAX_PREDICTED_FRAMES: usize = 20;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error(transparent)]
    Simulation(#[from] SimulationError),
}

/// Client-side prediction and reconciliation driver.
///
/// Local input is applied speculatively the moment it is captured, so the
/// player sees instant response. All predicted frames live inside one open
/// uncommitted window on the [`ArenaDb`]; commits happen only when a frame
/// becomes authoritative. When a [`ServerMessage`] arrives, the whole
/// speculative suffix is rolled back, the authoritative frame is re-simulated
/// with the server's input set and committed as the new baseline, and the
/// locally buffered inputs that were not superseded are re-applied on top.
pub struct PredictionEngine<C: Connection> {
    db: ArenaDb,
    connection: C,
    player_number: u8,
    confirmed_frame: Option<u32>,
    pending: VecDeque<ClientMessage>,
    effects: EffectSink,
    debug: DebugDraw,
    dt: f32,
}

impl<C: Connection> PredictionEngine<C> {
    /// Builds the engine around its own world copy, spawned from the same
    /// deterministic match setup the server commits, so frame 0 predicts off
    /// an identical baseline.
    pub fn new(connection: C, player_number: u8, player_count: usize, tick_rate: u32) -> Self {
        let mut db = ArenaDb::new();
        spawn_match(&mut db, player_count);
        Self {
            db,
            connection,
            player_number,
            confirmed_frame: None,
            pending: VecDeque::new(),
            effects: EffectSink::new(),
            debug: DebugDraw::default(),
            dt: 1.0 / tick_rate as f32,
        }
    }

    /// Frame the next locally captured input will be assigned.
    pub fn next_predicted_frame(&self) -> u32 {
        self.confirmed_frame.map_or(0, |frame| frame + 1) + self.pending.len() as u32
    }

    /// Captures one frame of local input: sends it to the server, buffers it
    /// for reprediction, and simulates it speculatively. Returns `None`
    /// without consuming the input when the prediction window is full; the
    /// caller retries once the server catches up.
    pub fn predict(
        &mut self,
        movement: Option<MoveInput>,
        attack: Option<AttackInput>,
        change_weapon: bool,
    ) -> Result<Option<u32>, ClientError> {
        if self.pending.len() >= MAX_PREDICTED_FRAMES {
            log::debug!(
                "prediction window full ({} frames ahead of {:?})",
                self.pending.len(),
                self.confirmed_frame
            );
            return Ok(None);
        }
        let message = ClientMessage {
            frame: self.next_predicted_frame(),
            player_number: self.player_number,
            movement,
            attack,
            change_weapon,
        };
        self.connection.send(&message.encode()?);

        let frame = message.frame;
        let inputs = [message.clone()];
        self.pending.push_back(message);
        self.run_frame(frame, &inputs, SimulationPhase::ClientPrediction)?;
        Ok(Some(frame))
    }

    /// Drains the connection and reconciles every authoritative frame found.
    /// Malformed payloads are discarded; reconciliation simply stalls at the
    /// last confirmed frame until a later message arrives.
    pub fn process_server_messages(&mut self) -> Result<u32, ClientError> {
        let mut applied = 0;
        for payload in self.connection.consume() {
            let message = match ServerMessage::decode(&payload) {
                Ok(message) => message,
                Err(error) => {
                    log::warn!("discarding server payload: {}", error);
                    continue;
                }
            };
            if self.reconcile(message)? {
                applied += 1;
            }
        }
        Ok(applied)
    }

    fn reconcile(&mut self, message: ServerMessage) -> Result<bool, ClientError> {
        if self
            .confirmed_frame
            .is_some_and(|confirmed| message.frame <= confirmed)
        {
            log::debug!("ignoring stale authoritative frame {}", message.frame);
            return Ok(false);
        }

        // Drop the whole speculative suffix, then rebuild: authoritative
        // frame first (committed, the new baseline), buffered local inputs
        // after (speculative again).
        self.db.undo_prediction();

        let mut inputs = message.inputs;
        inputs.sort_by_key(|input| input.player_number);
        self.run_frame(message.frame, &inputs, SimulationPhase::ClientAuthoritative)?;
        self.db.commit_prediction();
        self.confirmed_frame = Some(message.frame);
        self.effects.forget_up_to(message.frame);

        while self
            .pending
            .front()
            .is_some_and(|pending| pending.frame <= message.frame)
        {
            self.pending.pop_front();
        }

        let replays: Vec<ClientMessage> = self.pending.iter().cloned().collect();
        for pending in replays {
            let frame = pending.frame;
            let inputs = [pending];
            self.run_frame(frame, &inputs, SimulationPhase::ClientReprediction)?;
        }
        Ok(true)
    }

    fn run_frame(
        &mut self,
        frame: u32,
        inputs: &[ClientMessage],
        phase: SimulationPhase,
    ) -> Result<(), ClientError> {
        let mut state = FrameState {
            db: &mut self.db,
            frame,
            inputs,
            phase,
            effects: &mut self.effects,
            debug: &mut self.debug,
        };
        simulate(&mut state, self.dt)?;
        Ok(())
    }

    pub fn player_number(&self) -> u8 {
        self.player_number
    }

    pub fn confirmed_frame(&self) -> Option<u32> {
        self.confirmed_frame
    }

    pub fn predicted_count(&self) -> usize {
        self.pending.len()
    }

    pub fn db(&self) -> &ArenaDb {
        &self.db
    }

    pub fn drain_effects(&mut self) -> Vec<(u32, Effect)> {
        self.effects.drain()
    }

    /// Per-session debug rendering toggle.
    pub fn set_debug_draw(&mut self, enabled: bool) {
        self.debug.set_enabled(enabled);
    }

    pub fn drain_debug(&mut self) -> Vec<(SimulationPhase, DebugShape)> {
        self.debug.drain()
    }

    pub fn close(&mut self) {
        self.connection.close();
    }
}

mod client;
mod protocol;
mod server;
mod transport;

pub use client::{ClientError, MAX_PREDICTED_FRAMES, PredictionEngine};
pub use protocol::{
    AttackInput, ClientMessage, DEFAULT_PORT, DEFAULT_TICK_RATE, MoveDirection, MoveInput,
    ProtocolError, ServerMessage,
};
pub use server::ServerSimulator;
pub use transport::{Connection, MemoryConnection};

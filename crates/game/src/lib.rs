pub mod net;
pub mod simulation;
pub mod state;
pub mod world;

pub use net::{
    AttackInput, ClientError, ClientMessage, Connection, DEFAULT_PORT, DEFAULT_TICK_RATE,
    MAX_PREDICTED_FRAMES, MemoryConnection, MoveDirection, MoveInput, PredictionEngine,
    ProtocolError, ServerMessage, ServerSimulator,
};
pub use simulation::{
    DebugDraw, DebugShape, Effect, EffectSink, FixedTimestep, FrameState, SimulationError,
    SimulationPhase, simulate,
};
pub use state::{
    ComponentError, ComponentSet, ComponentTable, EntityId, EntitySet, StateDb, Store,
    WorldIndexes,
};
pub use world::{ArenaComponents, ArenaDb, ArenaIndexes, EntityConfig, spawn_match, tank_of_player};

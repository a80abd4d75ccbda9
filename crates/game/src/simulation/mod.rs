mod effects;
mod frame;
mod systems;
mod tick;

pub use effects::{Effect, EffectSink};
pub use frame::{DebugDraw, DebugShape, FrameState, SimulationPhase};
pub use systems::{SimulationError, simulate};
pub use tick::FixedTimestep;

use glam::Vec2;

use crate::net::ClientMessage;
use crate::simulation::EffectSink;
use crate::world::ArenaDb;

/// Which execution path invoked the pipeline. Purely diagnostic: it colors
/// debug-draw output and log lines, and is never branched on by systems,
/// since the same code must run regardless of role for the worlds to sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimulationPhase {
    ServerTick,
    ClientPrediction,
    ClientAuthoritative,
    ClientReprediction,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DebugShape {
    Line { from: Vec2, to: Vec2 },
    Circle { center: Vec2, radius: f32 },
}

/// Sink for per-tick debug geometry, tagged with the phase that produced it.
/// Disabled by default; toggled per session via [`DebugDraw::set_enabled`]
/// rather than through any global flag.
#[derive(Debug, Default)]
pub struct DebugDraw {
    enabled: bool,
    shapes: Vec<(SimulationPhase, DebugShape)>,
}

impl DebugDraw {
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.shapes.clear();
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn push(&mut self, phase: SimulationPhase, shape: DebugShape) {
        if self.enabled {
            self.shapes.push((phase, shape));
        }
    }

    pub fn drain(&mut self) -> Vec<(SimulationPhase, DebugShape)> {
        std::mem::take(&mut self.shapes)
    }
}

/// Everything one tick of the pipeline needs, bundled for the duration of a
/// single `simulate` call and never persisted.
pub struct FrameState<'a> {
    pub db: &'a mut ArenaDb,
    pub frame: u32,
    pub inputs: &'a [ClientMessage],
    pub phase: SimulationPhase,
    pub effects: &'a mut EffectSink,
    pub debug: &'a mut DebugDraw,
}

use std::collections::HashSet;

use crate::state::EntityId;

/// One-shot gameplay events surfaced to presentation code (audio, particles).
/// Keyed by value for de-duplication, so variants carry only stable ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Effect {
    ShotFired { shooter: EntityId },
    TankDestroyed { tank: EntityId },
    PickupTaken { tank: EntityId },
}

/// Collects effects emitted by systems, de-duplicating by `(frame, effect)`.
///
/// Reconciliation re-simulates frames the client already played; without the
/// log, every rollback would re-fire shot sounds and muzzle flashes. An
/// effect emitted for a frame the sink has already seen is swallowed.
#[derive(Debug, Default)]
pub struct EffectSink {
    seen: HashSet<(u32, Effect)>,
    pending: Vec<(u32, Effect)>,
}

impl EffectSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `effect` for `frame`. Returns false if this exact effect was
    /// already emitted for this frame (a re-simulation duplicate).
    pub fn emit(&mut self, frame: u32, effect: Effect) -> bool {
        if !self.seen.insert((frame, effect)) {
            return false;
        }
        self.pending.push((frame, effect));
        true
    }

    /// Takes the effects emitted since the last drain.
    pub fn drain(&mut self) -> Vec<(u32, Effect)> {
        std::mem::take(&mut self.pending)
    }

    /// Drops dedup entries for frames at or below `frame`. Confirmed frames
    /// are never re-simulated, so their entries only cost memory.
    pub fn forget_up_to(&mut self, frame: u32) {
        self.seen.retain(|&(f, _)| f > frame);
    }
}

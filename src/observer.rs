//! Outward notification surface.
//!
//! Presentation subscribes to these callbacks; the core fires them and moves
//! on. Implementations must not block, nothing in the simulation waits on
//! them.

use crate::{
    fire::{FireId, FireState},
    grid::{Coordinate, TileKind},
};

pub trait WorldObserver {
    fn tile_changed(&mut self, _coord: Coordinate, _kind: TileKind, _snowed: bool) {}
    fn fire_visual_state_changed(&mut self, _fire: FireId, _state: FireState) {}
    fn particle_emission_toggled(&mut self, _fire: FireId, _enabled: bool) {}
}

/// Default observer for headless runs.
pub struct NullObserver;

impl WorldObserver for NullObserver {}

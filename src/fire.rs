//! Fire records: the hearth and its satellite campfires.
//!
//! A fire anchors to one tile, consumes wood, spawns workers, and projects an
//! influence radius. Fires live in a dense table on the world and are handed
//! around by index; presentation keeps its own handle-to-visual mapping.

use serde::Serialize;

use crate::{config::FireParams, grid::Coordinate, jobs::JobDispatcher};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct FireId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FireState {
    Inactive,
    Activating,
    Active,
    Growing,
    Shrinking,
    /// Terminal for this fire instance.
    Deactivated,
}

pub struct Fire {
    pub id: FireId,
    pub tile: Coordinate,
    pub state: FireState,
    pub is_hearth: bool,

    base_burn_rate: f32,
    pub burn_rate_increase: f32,
    pub burn_rate_to_win: f32,
    base_spawn_rate: f32,
    pub spawn_rate_increase: f32,
    base_radius: i32,
    pub radius_increase: i32,

    pub burn_rate: f32,
    pub spawn_rate: f32,
    pub radius: i32,
    pub burn_progress: f32,
    pub spawn_progress: f32,

    /// Tiles currently inside the influence radius, Manhattan-sorted from
    /// the fire's tile.
    pub influence: Vec<Coordinate>,
    pub jobs: JobDispatcher,
    pub worker_count: u32,
}

impl Fire {
    pub fn new(id: FireId, tile: Coordinate, is_hearth: bool, params: &FireParams) -> Self {
        Self {
            id,
            tile,
            state: FireState::Inactive,
            is_hearth,
            base_burn_rate: params.burn_rate,
            burn_rate_increase: params.burn_rate_increase,
            burn_rate_to_win: params.burn_rate_to_win,
            base_spawn_rate: params.spawn_rate,
            spawn_rate_increase: params.spawn_rate_increase,
            base_radius: params.radius,
            radius_increase: params.radius_increase,
            burn_rate: 0.0,
            spawn_rate: 0.0,
            radius: 0,
            burn_progress: 0.0,
            spawn_progress: 0.0,
            influence: Vec::new(),
            jobs: JobDispatcher::new(),
            worker_count: 0,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(
            self.state,
            FireState::Active | FireState::Growing | FireState::Shrinking
        )
    }

    /// Reset the working rates to their base configured values. The caller
    /// recomputes influence afterwards.
    pub fn activate(&mut self) {
        self.burn_progress = 0.0;
        self.radius = self.base_radius;
        self.burn_rate = self.base_burn_rate;
        self.spawn_rate = self.base_spawn_rate;
        self.state = FireState::Active;
    }

    /// Apply a feeding: rates and radius grow by their configured
    /// increments. Returns the win progress in `0..=1` (only meaningful for
    /// the hearth). The caller recomputes influence.
    pub fn feed(&mut self) -> f32 {
        self.radius += self.radius_increase;
        self.burn_rate += self.burn_rate_increase;
        self.spawn_rate += self.spawn_rate_increase;
        self.state = FireState::Growing;
        if self.burn_rate_to_win > 0.0 {
            self.burn_rate / self.burn_rate_to_win
        } else {
            1.0
        }
    }

    /// One step of wood starvation. Returns true when the fire died and must
    /// be deactivated by the caller.
    pub fn shrink(&mut self) -> bool {
        self.radius -= 1;
        self.burn_rate -= self.burn_rate_increase;
        self.state = FireState::Shrinking;
        self.radius <= 0 || self.burn_rate <= 0.01
    }

    pub fn deactivate(&mut self) {
        self.burn_progress = 0.0;
        self.radius = 0;
        self.burn_rate = 0.0;
        self.spawn_rate = 0.0;
        self.state = FireState::Deactivated;
    }

    /// Accumulate burn progress; returns the whole units of wood that must
    /// be consumed this tick (0 while the accumulator is below 1).
    pub fn accumulate_burn(&mut self, dt: f32) -> i64 {
        self.burn_progress += self.burn_rate * dt;
        if self.burn_progress >= 1.0 {
            self.burn_progress.floor() as i64
        } else {
            0
        }
    }

    pub fn settle_burn(&mut self, consumed: i64) {
        self.burn_progress -= consumed as f32;
    }

    pub fn reset_burn(&mut self) {
        self.burn_progress = 0.0;
    }

    /// Accumulate spawn progress; returns the number of workers owed.
    pub fn accumulate_spawn(&mut self, dt: f32) -> u32 {
        self.spawn_progress += self.spawn_rate * dt;
        if self.spawn_progress >= 1.0 {
            let owed = self.spawn_progress.floor() as u32;
            self.spawn_progress -= owed as f32;
            owed
        } else {
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Scenario;

    fn fire() -> Fire {
        let params = Scenario::frozen_valley().params.fire;
        Fire::new(FireId(0), Coordinate::new(5, 5), true, &params)
    }

    #[test]
    fn test_activate_restores_base_values() {
        let mut f = fire();
        assert_eq!(f.state, FireState::Inactive);
        f.activate();
        assert_eq!(f.state, FireState::Active);
        assert!(f.radius > 0);
        assert!(f.burn_rate > 0.0);
    }

    #[test]
    fn test_feed_strictly_increases_radius() {
        let mut f = fire();
        f.activate();
        let before = f.radius;
        f.feed();
        assert!(f.radius > before);
    }

    #[test]
    fn test_burn_accumulates_fractionally() {
        let mut f = fire();
        f.activate();
        f.burn_rate = 0.5;
        assert_eq!(f.accumulate_burn(1.0), 0);
        let owed = f.accumulate_burn(1.0);
        assert_eq!(owed, 1);
        f.settle_burn(owed);
        assert!(f.burn_progress.abs() < 1e-5);
    }

    #[test]
    fn test_shrink_to_deactivation() {
        let mut f = fire();
        f.activate();
        let mut died = false;
        for _ in 0..100 {
            if f.shrink() {
                died = true;
                break;
            }
        }
        assert!(died, "repeated shrinking must eventually kill the fire");
        f.deactivate();
        assert_eq!(f.state, FireState::Deactivated);
        assert_eq!(f.radius, 0);
    }
}

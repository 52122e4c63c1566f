//! Worker records.
//!
//! A worker is a plain record keyed by handle; the systems drive its job and
//! movement state each tick. Movement integrates a velocity clamped to the
//! configured speed and follows the current path back-to-front.

use serde::Serialize;

use crate::{
    fire::FireId,
    grid::WorldPosition,
    jobs::Job,
    pathfinding::Path,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct WorkerId(pub u64);

pub struct Worker {
    pub id: WorkerId,
    pub home_fire: FireId,
    pub position: WorldPosition,
    pub idle: bool,
    pub job: Option<Job>,
    pub job_progress: f32,
    pub at_job_site: bool,
    pub path: Path,
    /// Next time this worker may pick a new roam target.
    pub next_roam_at: f32,
    pub death_timer: f32,
    pub dead: bool,
    pub despawn_timer: f32,
}

impl Worker {
    pub fn new(id: WorkerId, home_fire: FireId, position: WorldPosition) -> Self {
        Self {
            id,
            home_fire,
            position,
            idle: true,
            job: None,
            job_progress: 0.0,
            at_job_site: false,
            path: Path::default(),
            next_roam_at: 0.0,
            death_timer: 0.0,
            dead: false,
            despawn_timer: 0.0,
        }
    }

    /// Step toward the next waypoint. Consumes waypoints as the worker comes
    /// within the path epsilon of them.
    pub fn advance(&mut self, dt: f32, max_speed: f32) {
        let position = self.position;
        if let Some(target) = self.path.next_point(position) {
            let dx = target.x - position.x;
            let dy = target.y - position.y;
            let distance = (dx * dx + dy * dy).sqrt();
            if distance <= f32::EPSILON {
                return;
            }
            let step = (max_speed * dt).min(distance);
            self.position = WorldPosition::new(
                position.x + dx / distance * step,
                position.y + dy / distance * step,
            );
        }
    }

    pub fn arrived_at_job(&self) -> bool {
        self.job.is_some() && !self.path.has_path()
    }

    pub fn clear_job(&mut self) {
        self.job = None;
        self.job_progress = 0.0;
        self.at_job_site = false;
        self.idle = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{Coordinate, Grid};
    use crate::pathfinding::build_path;

    #[test]
    fn test_advance_walks_the_path_to_its_end() {
        let mut grid = Grid::new(5, 1, 1.0);
        for x in 0..5 {
            grid.tile_at(Coordinate::new(x, 0));
        }
        let start = Coordinate::new(0, 0).to_world(1.0);
        let goal = Coordinate::new(4, 0).to_world(1.0);
        let mut worker = Worker::new(WorkerId(0), FireId(0), start);
        worker.path = build_path(&grid, start, goal).unwrap();

        for _ in 0..200 {
            worker.advance(0.1, 1.0);
        }
        assert!(!worker.path.has_path(), "path must be fully consumed");
        assert!(worker.position.distance_to(goal) < 1.5);
    }

    #[test]
    fn test_clear_job_returns_to_idle() {
        let mut worker = Worker::new(WorkerId(1), FireId(0), WorldPosition::new(0.0, 0.0));
        worker.idle = false;
        worker.job_progress = 3.0;
        worker.clear_job();
        assert!(worker.idle);
        assert_eq!(worker.job_progress, 0.0);
        assert!(worker.job.is_none());
    }
}

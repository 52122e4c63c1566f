//! Worker behavior: job acquisition, movement, on-site work, idle roaming,
//! and death once the home fire has gone out.
//!
//! Each worker is detached from the table for its step so it can be ticked
//! against the rest of the world without aliasing, then reattached (or
//! dropped once its despawn delay elapses).

use anyhow::Result;
use tracing::debug;

use crate::{
    engine::{System, SystemContext},
    grid::Coordinate,
    jobs::JobKind,
    pathfinding::Path,
    rng::{RngExt, SystemRng},
    worker::Worker,
    world::SimWorld,
};

/// Seconds between roam target picks for an idle worker.
const ROAM_INTERVAL: f32 = 2.0;

#[derive(Default)]
pub struct WorkerSystem;

impl WorkerSystem {
    pub fn new() -> Self {
        Self
    }
}

impl System for WorkerSystem {
    fn name(&self) -> &str {
        "workers"
    }

    fn run(
        &mut self,
        ctx: &SystemContext,
        world: &mut SimWorld,
        rng: &mut SystemRng<'_>,
    ) -> Result<()> {
        let dt = ctx.dt;
        let params = world.params.workers.clone();
        for id in world.sorted_worker_ids() {
            let Some(mut worker) = world.take_worker(id) else {
                continue;
            };

            if worker.dead {
                worker.despawn_timer += dt;
                if worker.despawn_timer >= params.despawn_delay {
                    world.despawn_worker(worker);
                } else {
                    world.put_worker(worker);
                }
                continue;
            }

            if worker.job.is_none() {
                acquire_job_or_roam(&mut worker, world, rng, params.roam_radius_tiles);
            }

            worker.advance(dt, params.max_speed);

            if worker.arrived_at_job() {
                work(&mut worker, world, dt);
            }

            if world.fire(worker.home_fire).radius <= 0 {
                worker.death_timer += dt;
                if worker.death_timer >= params.seconds_to_death {
                    worker.dead = true;
                    // A held chop must go back on offer, or its guard entry
                    // would block the tile forever.
                    if let Some(job) = worker.job.take() {
                        if job.kind == JobKind::Chop {
                            world.fire_mut(worker.home_fire).jobs.release_chop(job.coordinate);
                        }
                    }
                    debug!(worker = worker.id.0, "worker froze after the home fire went out");
                }
            } else {
                worker.death_timer = 0.0;
            }

            world.put_worker(worker);
        }
        Ok(())
    }
}

fn acquire_job_or_roam(
    worker: &mut Worker,
    world: &mut SimWorld,
    rng: &mut SystemRng<'_>,
    roam_radius: i32,
) {
    let home = worker.home_fire;
    let tile_size = world.grid.tile_size();
    let own_tile = Coordinate::from_world(worker.position, tile_size);
    let Some(job) = world.fire_mut(home).jobs.next_available_job(own_tile) else {
        roam(worker, world, rng, roam_radius);
        return;
    };
    match approach_path(world, worker, job.coordinate) {
        Some(path) => {
            if job.kind == JobKind::Expedition {
                world.fire_mut(home).jobs.expedition_worker_assigned();
            }
            worker.path = path;
            worker.job = Some(job);
            worker.idle = false;
            worker.at_job_site = false;
            worker.job_progress = 0.0;
        }
        None => {
            debug!(
                worker = worker.id.0,
                x = job.coordinate.x,
                y = job.coordinate.y,
                "no path to job site"
            );
            match job.kind {
                JobKind::Chop => world.fire_mut(home).jobs.requeue(job),
                // The wood was already spent; the copy is simply dropped.
                JobKind::Expedition => {}
            }
        }
    }
}

/// Path to the job tile, or to its nearest open 4-neighbor when the tile
/// itself cannot be walked on (trees are worked from an adjacent tile).
fn approach_path(world: &SimWorld, worker: &Worker, target: Coordinate) -> Option<Path> {
    let tile_size = world.grid.tile_size();
    if world.grid.is_traversable(target) {
        return world.path_between(worker.position, target.to_world(tile_size));
    }
    let mut best: Option<(Path, f32)> = None;
    for (dx, dy) in [(0, 1), (0, -1), (-1, 0), (1, 0)] {
        let side = target.offset(dx, dy);
        if !world.grid.is_traversable(side) {
            continue;
        }
        if let Some(path) = world.path_between(worker.position, side.to_world(tile_size)) {
            let length = path.total_length(worker.position);
            if best.as_ref().map(|&(_, l)| length < l).unwrap_or(true) {
                best = Some((path, length));
            }
        }
    }
    best.map(|(path, _)| path)
}

fn roam(worker: &mut Worker, world: &SimWorld, rng: &mut SystemRng<'_>, roam_radius: i32) {
    if worker.path.has_path() || world.now() < worker.next_roam_at {
        return;
    }
    worker.next_roam_at = world.now() + ROAM_INTERVAL;
    let tile_size = world.grid.tile_size();
    let own_tile = Coordinate::from_world(worker.position, tile_size);
    let target = own_tile
        .offset(
            rng.range_i32(-roam_radius, roam_radius),
            rng.range_i32(-roam_radius, roam_radius),
        )
        .to_world(tile_size);
    if let Some(path) = world.path_between(worker.position, target) {
        worker.path = path;
    }
}

/// On-site work step for a worker whose path is exhausted.
fn work(worker: &mut Worker, world: &mut SimWorld, dt: f32) {
    let Some(job) = worker.job.clone() else {
        return;
    };
    let home = worker.home_fire;
    let coordinate = job.coordinate;

    // A crew member already completed this expedition; stand down.
    if job.kind == JobKind::Expedition
        && worker.at_job_site
        && !world.fire(home).jobs.expedition_in_flight(coordinate)
    {
        worker.clear_job();
        return;
    }

    let ready = match job.kind {
        JobKind::Chop => job.is_ready(),
        JobKind::Expedition => world.fire(home).jobs.expedition_ready(coordinate),
    };
    if ready {
        worker.job_progress += dt;
    } else if !worker.at_job_site {
        worker.at_job_site = true;
        if let Some(j) = worker.job.as_mut() {
            j.arrived();
        }
        if job.kind == JobKind::Expedition {
            world.fire_mut(home).jobs.expedition_worker_arrived(coordinate);
        }
    }

    if worker.job_progress >= job.duration() {
        match job.kind {
            JobKind::Chop => world.complete_chop(home, coordinate),
            JobKind::Expedition => world.complete_expedition(home, coordinate),
        }
        worker.clear_job();
    }
}

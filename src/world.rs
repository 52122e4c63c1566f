//! The simulation context: grid, fires, workers, inventory, clock, deferred
//! actions, and the outward notification surface. Passed explicitly to every
//! system. No global lookup, one instance per run.

use std::collections::{HashMap, HashSet};

use rand::{seq::SliceRandom, Rng};
use tracing::{debug, warn};

use crate::{
    config::{GenerationParams, Scenario},
    fire::{Fire, FireId, FireState},
    grid::{Coordinate, Grid, TileKind, WorldPosition},
    inventory::Inventory,
    jobs::JobKind,
    observer::{NullObserver, WorldObserver},
    pathfinding::{build_path, Path},
    rng::{RngExt, RngManager},
    worker::{Worker, WorkerId},
    worldgen,
};

/// Campfires light a moment after the expedition completes.
pub const CAMPFIRE_ACTIVATION_DELAY: f32 = 2.0;

/// Snow transitions spread over this many seconds, in one batch per second.
const SNOW_TRANSITION_DURATION: f32 = 10.0;
const SNOW_BATCH_INTERVAL: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Victory,
    Defeat,
}

/// Work executed at a deadline rather than inline: fixed-delay activations
/// and periodic house spawns. Processed once per tick in deadline order,
/// never as a blocking wait.
#[derive(Debug, Clone, Copy)]
pub enum DeferredAction {
    ActivateFire(FireId),
    SpawnInitialWorkers(FireId),
    SpawnHouse(FireId),
}

struct Scheduled {
    deadline: f32,
    seq: u64,
    action: DeferredAction,
}

/// Incremental cosmetic snow/thaw sweep with an explicit progress cursor, so
/// large influence changes never stall a tick.
struct SnowTransition {
    changes: Vec<(Coordinate, bool)>,
    cursor: usize,
    per_batch: usize,
    next_batch_at: f32,
}

impl SnowTransition {
    fn new(changes: Vec<(Coordinate, bool)>, now: f32) -> Self {
        let batches = (SNOW_TRANSITION_DURATION / SNOW_BATCH_INTERVAL).max(1.0);
        let per_batch = ((changes.len() as f32 / batches).ceil() as usize).max(1);
        Self {
            changes,
            cursor: 0,
            per_batch,
            next_batch_at: now,
        }
    }

    fn done(&self) -> bool {
        self.cursor >= self.changes.len()
    }
}

pub struct SimWorld {
    pub grid: Grid,
    pub params: GenerationParams,
    hearth: Coordinate,
    fires: Vec<Fire>,
    workers: HashMap<WorkerId, Worker>,
    next_worker_id: u64,
    pub inventory: Inventory,
    clock: f32,
    pending: Vec<Scheduled>,
    next_seq: u64,
    transitions: HashMap<FireId, SnowTransition>,
    outcome: Option<Outcome>,
    observer: Box<dyn WorldObserver>,
}

impl SimWorld {
    /// Generate a world from a scenario. Generation runs strictly before any
    /// influence or job processing; the same scenario reproduces the same
    /// world bit-for-bit.
    pub fn generate(scenario: &Scenario) -> Self {
        let mut rng = RngManager::new(scenario.seed);
        let (grid, hearth) = worldgen::generate(&scenario.params, &mut rng.stream("worldgen"));
        let mut world = Self {
            grid,
            params: scenario.params.clone(),
            hearth,
            fires: Vec::new(),
            workers: HashMap::new(),
            next_worker_id: 0,
            inventory: Inventory::new(scenario.params.resources.starting_wood),
            clock: 0.0,
            pending: Vec::new(),
            next_seq: 0,
            transitions: HashMap::new(),
            outcome: None,
            observer: Box::new(NullObserver),
        };
        let hearth_fire = world.add_fire(hearth, true);
        world.schedule(0.0, DeferredAction::ActivateFire(hearth_fire));
        world.schedule(0.0, DeferredAction::SpawnInitialWorkers(hearth_fire));
        world
    }

    pub fn with_observer(mut self, observer: Box<dyn WorldObserver>) -> Self {
        self.observer = observer;
        self
    }

    // --- clock / outcome -------------------------------------------------

    pub fn now(&self) -> f32 {
        self.clock
    }

    pub fn advance_clock(&mut self, dt: f32) {
        self.clock += dt;
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    fn set_outcome(&mut self, outcome: Outcome) {
        // First terminal state wins.
        if self.outcome.is_none() {
            self.outcome = Some(outcome);
        }
    }

    // --- fires -----------------------------------------------------------

    pub fn hearth_coordinate(&self) -> Coordinate {
        self.hearth
    }

    pub fn hearth_id(&self) -> FireId {
        FireId(0)
    }

    fn add_fire(&mut self, tile: Coordinate, is_hearth: bool) -> FireId {
        let id = FireId(self.fires.len());
        self.fires.push(Fire::new(id, tile, is_hearth, &self.params.fire));
        id
    }

    pub fn fire(&self, id: FireId) -> &Fire {
        &self.fires[id.0]
    }

    pub fn fire_mut(&mut self, id: FireId) -> &mut Fire {
        &mut self.fires[id.0]
    }

    pub fn fire_ids(&self) -> Vec<FireId> {
        (0..self.fires.len()).map(FireId).collect()
    }

    // --- workers ---------------------------------------------------------

    pub fn worker(&self, id: WorkerId) -> Option<&Worker> {
        self.workers.get(&id)
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Deterministic iteration order over the worker table.
    pub fn sorted_worker_ids(&self) -> Vec<WorkerId> {
        let mut ids: Vec<_> = self.workers.keys().copied().collect();
        ids.sort();
        ids
    }

    /// Detach a worker for a tick of processing; reattach with
    /// [`SimWorld::put_worker`], or drop it to despawn.
    pub fn take_worker(&mut self, id: WorkerId) -> Option<Worker> {
        self.workers.remove(&id)
    }

    pub fn put_worker(&mut self, worker: Worker) {
        self.workers.insert(worker.id, worker);
    }

    pub fn despawn_worker(&mut self, worker: Worker) {
        let fire = &mut self.fires[worker.home_fire.0];
        fire.worker_count = fire.worker_count.saturating_sub(1);
    }

    /// Spawn a worker anchored to a fire, placed on an influence tile with
    /// Grass/Tree tiles weighted over the rest.
    pub fn spawn_worker(&mut self, fire_id: FireId, rng: &mut impl Rng) -> WorkerId {
        let tile = {
            let fire = &self.fires[fire_id.0];
            let influence = &fire.influence;
            if influence.is_empty() {
                fire.tile
            } else {
                let weights: Vec<(Coordinate, u32)> = influence
                    .iter()
                    .map(|&c| {
                        let favored = self
                            .grid
                            .get(c)
                            .map(|t| matches!(t.kind, TileKind::Grass | TileKind::Tree))
                            .unwrap_or(false);
                        (c, if favored { 3 } else { 1 })
                    })
                    .collect();
                weights
                    .choose_weighted(rng, |&(_, w)| w)
                    .map(|&(c, _)| c)
                    .unwrap_or(fire.tile)
            }
        };
        let id = WorkerId(self.next_worker_id);
        self.next_worker_id += 1;
        let position = tile.to_world(self.grid.tile_size());
        self.workers
            .insert(id, Worker::new(id, fire_id, position));
        self.fires[fire_id.0].worker_count += 1;
        id
    }

    /// Idle worker with the shortest realized path to the target; workers
    /// with no path are excluded. `None` is "no worker available".
    pub fn nearest_idle_worker(&self, target: WorldPosition) -> Option<WorkerId> {
        let mut best: Option<(WorkerId, f32)> = None;
        for id in self.sorted_worker_ids() {
            let worker = &self.workers[&id];
            if !worker.idle || worker.dead {
                continue;
            }
            let Some(path) = build_path(&self.grid, worker.position, target) else {
                continue;
            };
            let length = path.total_length(worker.position);
            if best.map(|(_, l)| length < l).unwrap_or(true) {
                best = Some((id, length));
            }
        }
        best.map(|(id, _)| id)
    }

    // --- tiles -----------------------------------------------------------

    /// Mutate a tile's kind and notify presentation, for the tile itself and
    /// for the neighbors whose borders now differ.
    pub fn set_tile_kind(&mut self, coord: Coordinate, kind: TileKind) {
        if !self.grid.set_kind(coord, kind) {
            return;
        }
        let snowed = self.grid.tile_at(coord).snowed;
        self.observer.tile_changed(coord, kind, snowed);
        for neighbor in self.grid.neighbors_differing(coord) {
            let tile = self.grid.tile_at(neighbor);
            let (kind, snowed) = (tile.kind, tile.snowed);
            self.observer.tile_changed(neighbor, kind, snowed);
        }
    }

    fn set_snowed(&mut self, coord: Coordinate, snowed: bool) {
        if self.grid.set_snowed(coord, snowed) {
            let kind = self.grid.tile_at(coord).kind;
            self.observer.tile_changed(coord, kind, snowed);
        }
    }

    // --- influence -------------------------------------------------------

    /// Recompute a fire's influence set: tiles strictly within the radius,
    /// Manhattan-sorted from the fire. Tree tiles inside are submitted as
    /// chop jobs (the dispatcher deduplicates); snow changes are spread over
    /// a gradual transition rather than applied in one stall.
    pub fn compute_influence(&mut self, id: FireId) {
        let (tile, radius) = {
            let fire = &self.fires[id.0];
            (fire.tile, fire.radius.max(0))
        };
        let new = Grid::sort_by_distance(self.grid.tiles_in_radius(tile, radius), tile);
        let old = std::mem::take(&mut self.fires[id.0].influence);

        let tree_tiles: Vec<Coordinate> = new
            .iter()
            .copied()
            .filter(|&c| self.grid.get(c).map(|t| t.kind) == Some(TileKind::Tree))
            .collect();
        {
            let fire = &mut self.fires[id.0];
            for c in tree_tiles {
                fire.jobs.queue_job(c, JobKind::Chop);
            }
        }

        let new_set: HashSet<Coordinate> = new.iter().copied().collect();
        let mut changes: Vec<(Coordinate, bool)> = Vec::new();
        for &c in &new {
            if self.grid.get(c).map(|t| t.snowed).unwrap_or(true) {
                changes.push((c, false));
            }
        }
        for &c in &old {
            if !new_set.contains(&c) {
                changes.push((c, true));
            }
        }
        if !changes.is_empty() {
            // Replaces any sweep still in flight for this fire.
            self.transitions
                .insert(id, SnowTransition::new(changes, self.clock));
        }

        self.fires[id.0].influence = new;
    }

    /// Advance every in-flight snow sweep by its due batches.
    pub fn advance_transitions(&mut self) {
        let mut ids: Vec<FireId> = self.transitions.keys().copied().collect();
        ids.sort();
        for id in ids {
            let Some(mut transition) = self.transitions.remove(&id) else {
                continue;
            };
            while transition.next_batch_at <= self.clock && !transition.done() {
                let end = (transition.cursor + transition.per_batch).min(transition.changes.len());
                let batch: Vec<_> = transition.changes[transition.cursor..end].to_vec();
                transition.cursor = end;
                transition.next_batch_at += SNOW_BATCH_INTERVAL;
                for (coord, snowed) in batch {
                    self.set_snowed(coord, snowed);
                }
            }
            if !transition.done() {
                self.transitions.insert(id, transition);
            }
        }
    }

    // --- fire lifecycle --------------------------------------------------

    pub fn activate_fire(&mut self, id: FireId, rng: &mut impl Rng) {
        if self.fires[id.0].state == FireState::Deactivated {
            return;
        }
        self.fires[id.0].activate();
        self.compute_influence(id);
        self.observer.fire_visual_state_changed(id, FireState::Active);
        self.observer.particle_emission_toggled(id, true);

        let interval = &self.params.infrastructure.house_spawn_interval;
        let deadline = self.clock + rng.range_f32(interval.min, interval.max);
        self.schedule(deadline, DeferredAction::SpawnHouse(id));
    }

    /// Wood starvation step: radius and burn rate drop; a fire that falls to
    /// nothing deactivates.
    pub fn shrink_fire(&mut self, id: FireId) {
        let died = self.fires[id.0].shrink();
        self.observer
            .fire_visual_state_changed(id, FireState::Shrinking);
        if died {
            self.deactivate_fire(id);
        } else {
            self.compute_influence(id);
            self.fires[id.0].state = FireState::Active;
        }
    }

    pub fn deactivate_fire(&mut self, id: FireId) {
        self.fires[id.0].deactivate();
        self.observer
            .fire_visual_state_changed(id, FireState::Deactivated);
        self.observer.particle_emission_toggled(id, false);
        self.compute_influence(id);
        if self.fires[id.0].is_hearth {
            self.set_outcome(Outcome::Defeat);
        }
        // A deactivated campfire stops producing jobs; whatever is already
        // queued stays claimable.
    }

    // --- player commands -------------------------------------------------

    /// Deposit wood into the hearth, growing its influence. Reaching the win
    /// burn rate ends the simulation in victory.
    pub fn feed_hearth(&mut self) -> bool {
        if self.outcome.is_some() {
            return false;
        }
        let hearth = self.hearth_id();
        if !self.fires[hearth.0].is_active() {
            return false;
        }
        let amount = self.params.resources.hearth_feed_amount;
        if !self.inventory.try_remove(amount) {
            debug!(amount, wood = self.inventory.wood(), "not enough wood to feed the hearth");
            return false;
        }
        let win_progress = self.fires[hearth.0].feed();
        self.observer
            .fire_visual_state_changed(hearth, FireState::Growing);
        self.compute_influence(hearth);
        self.fires[hearth.0].state = FireState::Active;
        if win_progress >= 1.0 {
            self.set_outcome(Outcome::Victory);
        }
        true
    }

    /// Queue an expedition toward a grass tile. Costs wood per tile of
    /// Manhattan distance from the nearest fire, paid up front.
    pub fn place_expedition(&mut self, target: WorldPosition) -> bool {
        if self.outcome.is_some() {
            return false;
        }
        let coord = Coordinate::from_world(target, self.grid.tile_size());
        if self.grid.get(coord).map(|t| t.kind) != Some(TileKind::Grass) {
            return false;
        }
        let Some(fire_id) = self.closest_fire(target) else {
            return false;
        };
        let distance = Grid::manhattan_distance(coord, self.fires[fire_id.0].tile);
        let cost = self.params.resources.expedition_wood_cost_per_tile * distance as i64;
        if self.inventory.wood() <= cost {
            debug!(cost, wood = self.inventory.wood(), "cannot afford expedition");
            return false;
        }
        if !self.inventory.try_remove(cost) {
            return false;
        }
        self.fires[fire_id.0]
            .jobs
            .queue_job(coord, JobKind::Expedition);
        true
    }

    /// Turn a grass tile into a campfire. Activation is deferred a moment,
    /// scheduled by deadline rather than slept on.
    pub fn spawn_campfire(&mut self, target: WorldPosition) -> bool {
        let coord = Coordinate::from_world(target, self.grid.tile_size());
        if self.grid.get(coord).map(|t| t.kind) != Some(TileKind::Grass) {
            return false;
        }
        self.set_tile_kind(coord, TileKind::Campfire);
        let id = self.add_fire(coord, false);
        self.fires[id.0].state = FireState::Activating;
        self.observer
            .fire_visual_state_changed(id, FireState::Activating);
        self.schedule(
            self.clock + CAMPFIRE_ACTIVATION_DELAY,
            DeferredAction::ActivateFire(id),
        );
        true
    }

    fn closest_fire(&self, target: WorldPosition) -> Option<FireId> {
        let tile_size = self.grid.tile_size();
        let mut best: Option<(FireId, f32)> = None;
        for fire in &self.fires {
            let pos = fire.tile.to_world(tile_size);
            let distance = pos.distance_to(target);
            if best.map(|(_, d)| distance < d).unwrap_or(true) {
                best = Some((fire.id, distance));
            }
        }
        best.map(|(id, _)| id)
    }

    // --- deferred actions ------------------------------------------------

    pub fn schedule(&mut self, deadline: f32, action: DeferredAction) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.pending.push(Scheduled {
            deadline,
            seq,
            action,
        });
    }

    /// Pop every action whose deadline has passed, in deadline order (ties
    /// by scheduling order).
    pub fn take_due_actions(&mut self) -> Vec<DeferredAction> {
        let now = self.clock;
        let mut due: Vec<Scheduled> = Vec::new();
        let mut rest: Vec<Scheduled> = Vec::new();
        for item in self.pending.drain(..) {
            if item.deadline <= now {
                due.push(item);
            } else {
                rest.push(item);
            }
        }
        self.pending = rest;
        due.sort_by(|a, b| {
            a.deadline
                .partial_cmp(&b.deadline)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.seq.cmp(&b.seq))
        });
        due.into_iter().map(|s| s.action).collect()
    }

    pub fn apply_action(&mut self, action: DeferredAction, rng: &mut impl Rng) {
        match action {
            DeferredAction::ActivateFire(id) => self.activate_fire(id, rng),
            DeferredAction::SpawnInitialWorkers(id) => {
                for _ in 0..self.params.resources.starting_workers {
                    self.spawn_worker(id, rng);
                }
            }
            DeferredAction::SpawnHouse(id) => self.spawn_house(id, rng),
        }
    }

    /// Periodic settlement growth: a random influence grass tile with no
    /// house nearby becomes a house.
    fn spawn_house(&mut self, id: FireId, rng: &mut impl Rng) {
        if !self.fires[id.0].is_active() {
            return;
        }
        let spacing = self.params.infrastructure.min_house_spacing;
        let mut candidates = self.fires[id.0].influence.clone();
        candidates.shuffle(rng);
        let spot = candidates.into_iter().find(|&c| {
            if self.grid.get(c).map(|t| t.kind) != Some(TileKind::Grass) {
                return false;
            }
            !self
                .grid
                .tiles_in_square(c, spacing)
                .into_iter()
                .any(|n| self.grid.get(n).map(|t| t.kind) == Some(TileKind::House))
        });
        match spot {
            Some(coord) => self.set_tile_kind(coord, TileKind::House),
            None => warn!(fire = id.0, "no room for a house inside this influence"),
        }

        let interval = &self.params.infrastructure.house_spawn_interval;
        let deadline = self.clock + rng.range_f32(interval.min, interval.max);
        self.schedule(deadline, DeferredAction::SpawnHouse(id));
    }

    // --- job completion --------------------------------------------------

    /// A chop job finished: the tree becomes grass and the wood is credited.
    pub fn complete_chop(&mut self, fire_id: FireId, coord: Coordinate) {
        if self.grid.get(coord).map(|t| t.kind) == Some(TileKind::Tree) {
            self.set_tile_kind(coord, TileKind::Grass);
            self.inventory.add(self.params.resources.wood_per_tree);
        }
        self.fires[fire_id.0].jobs.release_chop(coord);
    }

    /// An expedition finished: the site becomes a new campfire. Guarded so
    /// the crew's stragglers cannot found it twice.
    pub fn complete_expedition(&mut self, fire_id: FireId, coord: Coordinate) {
        self.fires[fire_id.0].jobs.expedition_finished(coord);
        if self.grid.get(coord).map(|t| t.kind) == Some(TileKind::Grass) {
            self.spawn_campfire(coord.to_world(self.grid.tile_size()));
        }
    }

    /// Build a path between two world positions over the current grid.
    pub fn path_between(&self, from: WorldPosition, to: WorldPosition) -> Option<Path> {
        build_path(&self.grid, from, to)
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use super::*;
    use crate::config::IntRange;

    fn small_scenario() -> Scenario {
        let mut scenario = Scenario::frozen_valley();
        scenario.params.grid.width = 10;
        scenario.params.grid.height = 10;
        scenario.params.infrastructure.hearth_min_edge_distance = 3;
        scenario.params.forests.paths = IntRange { min: 0, max: 0 };
        scenario
    }

    struct RecordingObserver {
        tiles: Rc<RefCell<Vec<(Coordinate, TileKind)>>>,
    }

    impl WorldObserver for RecordingObserver {
        fn tile_changed(&mut self, coord: Coordinate, kind: TileKind, _snowed: bool) {
            self.tiles.borrow_mut().push((coord, kind));
        }
    }

    #[test]
    fn test_tile_changes_notify_the_observer() {
        let tiles = Rc::new(RefCell::new(Vec::new()));
        let mut world = SimWorld::generate(&small_scenario()).with_observer(Box::new(
            RecordingObserver {
                tiles: Rc::clone(&tiles),
            },
        ));
        let coord = world.hearth_coordinate().offset(1, 1);
        world.set_tile_kind(coord, TileKind::Tree);
        assert!(
            tiles.borrow().contains(&(coord, TileKind::Tree)),
            "kind change must be reported outward"
        );
    }

    #[test]
    fn test_place_expedition_charges_manhattan_cost() {
        let mut world = SimWorld::generate(&small_scenario());
        let wood_before = world.inventory.wood();
        let target = world
            .hearth_coordinate()
            .offset(2, 1)
            .to_world(world.grid.tile_size());
        assert!(world.place_expedition(target));
        let per_tile = world.params.resources.expedition_wood_cost_per_tile;
        assert_eq!(world.inventory.wood(), wood_before - 3 * per_tile);

        // The hearth tile itself is not a valid target.
        let hearth_pos = world.hearth_coordinate().to_world(world.grid.tile_size());
        assert!(!world.place_expedition(hearth_pos));

        // Strictly-greater check: a stock equal to the cost is refused.
        let wood = world.inventory.wood();
        assert!(world.inventory.try_remove(wood));
        assert!(!world.place_expedition(target));
    }

    #[test]
    fn test_due_actions_come_out_in_deadline_order() {
        let mut world = SimWorld::generate(&small_scenario());
        // Drain the startup actions first.
        let startup = world.take_due_actions();
        assert_eq!(startup.len(), 2);
        assert!(matches!(startup[0], DeferredAction::ActivateFire(_)));
        assert!(matches!(startup[1], DeferredAction::SpawnInitialWorkers(_)));

        world.schedule(5.0, DeferredAction::SpawnHouse(FireId(0)));
        world.schedule(1.0, DeferredAction::ActivateFire(FireId(0)));
        world.advance_clock(2.0);
        let due = world.take_due_actions();
        assert_eq!(due.len(), 1, "the 5 s action is not due yet");
        assert!(matches!(due[0], DeferredAction::ActivateFire(_)));

        world.advance_clock(4.0);
        let due = world.take_due_actions();
        assert_eq!(due.len(), 1);
        assert!(matches!(due[0], DeferredAction::SpawnHouse(_)));
    }

    #[test]
    fn test_spawn_campfire_requires_grass() {
        let mut world = SimWorld::generate(&small_scenario());
        let tile_size = world.grid.tile_size();
        let hearth_pos = world.hearth_coordinate().to_world(tile_size);
        assert!(!world.spawn_campfire(hearth_pos));

        let site = world.hearth_coordinate().offset(2, 2);
        assert!(world.spawn_campfire(site.to_world(tile_size)));
        assert_eq!(world.grid.get(site).map(|t| t.kind), Some(TileKind::Campfire));
        let id = *world.fire_ids().last().unwrap();
        assert_eq!(world.fire(id).state, FireState::Activating);
        assert!(!world.fire(id).is_active(), "activation is deferred");
    }

    #[test]
    fn test_hearth_deactivation_is_defeat() {
        let mut world = SimWorld::generate(&small_scenario());
        let hearth = world.hearth_id();
        world.fire_mut(hearth).activate();
        world.compute_influence(hearth);
        world.deactivate_fire(hearth);
        assert_eq!(world.outcome(), Some(Outcome::Defeat));
    }
}

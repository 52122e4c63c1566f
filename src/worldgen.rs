//! Procedural world generation.
//!
//! Every random decision comes from the caller's seeded stream, so the same
//! `(seed, params)` pair reproduces an identical grid and hearth placement.
//!
//! Forest placement runs on a theoretical wood budget: walking away from the
//! hearth costs wood per tile, placed trees pay wood back in. Paths that
//! cannot afford their difficulty penalty are skipped with a warning. A
//! misconfigured budget is a degraded world, never a crash.

use rand::{seq::SliceRandom, Rng};
use tracing::warn;

use crate::{
    config::GenerationParams,
    grid::{Coordinate, Grid, TileKind},
    rng::RngExt,
};

/// Compass step offsets, clockwise from north.
const DIRECTIONS: [(i32, i32); 8] = [
    (0, 1),
    (1, 1),
    (1, 0),
    (1, -1),
    (0, -1),
    (-1, -1),
    (-1, 0),
    (-1, 1),
];

/// Generate the world grid and place the hearth.
pub fn generate(params: &GenerationParams, rng: &mut impl Rng) -> (Grid, Coordinate) {
    let mut grid = Grid::new(params.grid.width, params.grid.height, params.grid.tile_size);

    // Dense grass fill over the whole extent.
    for y in 0..params.grid.height {
        for x in 0..params.grid.width {
            grid.tile_at(Coordinate::new(x, y));
        }
    }

    let hearth = place_hearth(&mut grid, params, rng);

    let mut budget = params.resources.starting_wood;
    let path_count = rng.range_i32(params.forests.paths.min, params.forests.paths.max);
    for _ in 0..path_count {
        budget = generate_forest_path(&mut grid, params, rng, hearth, budget);
    }

    (grid, hearth)
}

fn place_hearth(grid: &mut Grid, params: &GenerationParams, rng: &mut impl Rng) -> Coordinate {
    let margin = params
        .infrastructure
        .hearth_min_edge_distance
        .min((grid.width() - 1) / 2)
        .min((grid.height() - 1) / 2)
        .max(0);
    let hearth = Coordinate::new(
        rng.range_i32(margin, grid.width() - 1 - margin),
        rng.range_i32(margin, grid.height() - 1 - margin),
    );
    grid.set_kind(hearth, TileKind::Hearth);
    hearth
}

/// Walk one forest path out from the hearth, dropping tree patches along the
/// way. Returns the updated wood budget; the result is never negative.
pub fn generate_forest_path(
    grid: &mut Grid,
    params: &GenerationParams,
    rng: &mut impl Rng,
    hearth: Coordinate,
    budget: i64,
) -> i64 {
    let forests = &params.forests;
    let step_cost = params.resources.expedition_wood_cost_per_tile;
    let mut budget = budget - forests.difficulty_distance_modifier;
    if budget < step_cost {
        warn!(
            budget,
            step_cost, "wood budget below per-tile cost after difficulty penalty; skipping forest path"
        );
        return budget.max(0);
    }

    let mut seed_pos = hearth;
    let mut directions: Vec<usize> = (0..DIRECTIONS.len()).collect();
    let consistent_every = forests.patches_with_consistent_direction.max(1);
    let patch_count = rng.range_i32(forests.patches_per_path.min, forests.patches_per_path.max);

    for patch_index in 0..patch_count as u32 {
        if patch_index > 0 && patch_index % consistent_every == 0 {
            directions = (0..DIRECTIONS.len()).collect();
        }

        let dir = pick_direction(&mut directions, rng);
        let (dx, dy) = DIRECTIONS[dir];

        // One tile of distance per remaining budget unit.
        while budget >= step_cost {
            let next = seed_pos.offset(dx, dy);
            if !grid.in_bounds(next) {
                break;
            }
            seed_pos = next;
            budget -= step_cost;
        }

        budget = place_patch(grid, params, rng, seed_pos, budget);
    }

    budget.max(0)
}

/// Pick a walk direction and prune its three opposite-ish entries so the walk
/// stays roughly directional. An emptied set falls back to a uniform draw.
fn pick_direction(directions: &mut Vec<usize>, rng: &mut impl Rng) -> usize {
    let dir = match directions.choose(rng) {
        Some(&d) => d,
        None => {
            warn!("direction set emptied mid-walk; falling back to a uniform direction");
            return rng.gen_range(0..DIRECTIONS.len());
        }
    };
    let n = DIRECTIONS.len();
    let banned = [(dir + n / 2 - 1) % n, (dir + n / 2) % n, (dir + n / 2 + 1) % n];
    directions.retain(|d| !banned.contains(d));
    dir
}

fn place_patch(
    grid: &mut Grid,
    params: &GenerationParams,
    rng: &mut impl Rng,
    center: Coordinate,
    mut budget: i64,
) -> i64 {
    let forests = &params.forests;
    let wood_per_tree = params.resources.wood_per_tree;
    let radius = rng.range_i32(forests.patch_radius.min, forests.patch_radius.max);
    let density = rng
        .range_f32(forests.patch_density.min, forests.patch_density.max)
        .clamp(0.0, 1.0);
    let wood_cap = rng.range_i32(forests.wood_per_patch.min, forests.wood_per_patch.max) as i64;

    let mut candidates = grid.tiles_in_radius(center, radius);
    candidates.shuffle(rng);

    let mut patch_wood = 0;
    for coord in candidates {
        if patch_wood >= wood_cap {
            break;
        }
        // The hearth is never overwritten by a patch.
        if grid.kind_at(coord) == TileKind::Hearth {
            continue;
        }
        if rng.chance(density) {
            grid.set_kind(coord, TileKind::Tree);
            patch_wood += wood_per_tree;
            budget += wood_per_tree;
        }
    }
    budget
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Scenario;
    use crate::rng::RngManager;

    fn collect_kinds(grid: &mut Grid) -> Vec<(Coordinate, TileKind)> {
        let mut out = Vec::new();
        for y in 0..grid.height() {
            for x in 0..grid.width() {
                let c = Coordinate::new(x, y);
                out.push((c, grid.kind_at(c)));
            }
        }
        out
    }

    #[test]
    fn test_same_seed_same_world() {
        let params = Scenario::frozen_valley().params;
        let mut rng_a = RngManager::new(42);
        let mut rng_b = RngManager::new(42);
        let (mut grid_a, hearth_a) = generate(&params, &mut rng_a.stream("worldgen"));
        let (mut grid_b, hearth_b) = generate(&params, &mut rng_b.stream("worldgen"));
        assert_eq!(hearth_a, hearth_b);
        assert_eq!(collect_kinds(&mut grid_a), collect_kinds(&mut grid_b));
    }

    #[test]
    fn test_hearth_respects_edge_margin() {
        let params = Scenario::frozen_valley().params;
        let margin = params.infrastructure.hearth_min_edge_distance;
        for seed in 0..20 {
            let mut rng = RngManager::new(seed);
            let (grid, hearth) = generate(&params, &mut rng.stream("worldgen"));
            assert!(hearth.x >= margin && hearth.x < grid.width() - margin);
            assert!(hearth.y >= margin && hearth.y < grid.height() - margin);
        }
    }

    #[test]
    fn test_underfunded_path_aborts_non_negative() {
        let params = Scenario::frozen_valley().params;
        let mut rng = RngManager::new(1);
        let mut stream = rng.stream("worldgen");
        let mut grid = Grid::new(16, 16, 1.0);
        let hearth = Coordinate::new(8, 8);
        let starting = params.resources.expedition_wood_cost_per_tile
            + params.forests.difficulty_distance_modifier
            - 1;
        let budget = generate_forest_path(&mut grid, &params, &mut stream, hearth, starting);
        assert!(budget >= 0, "budget must never go negative, got {budget}");
        // Aborted before any steps: no trees placed.
        let mut trees = 0;
        for y in 0..16 {
            for x in 0..16 {
                if grid.kind_at(Coordinate::new(x, y)) == TileKind::Tree {
                    trees += 1;
                }
            }
        }
        assert_eq!(trees, 0);
    }

    #[test]
    fn test_hearth_survives_generation() {
        let params = Scenario::frozen_valley().params;
        for seed in 0..10 {
            let mut rng = RngManager::new(seed);
            let (mut grid, hearth) = generate(&params, &mut rng.stream("worldgen"));
            assert_eq!(grid.kind_at(hearth), TileKind::Hearth);
        }
    }

    #[test]
    fn test_generation_places_some_trees() {
        let params = Scenario::frozen_valley().params;
        let mut rng = RngManager::new(42);
        let (mut grid, _) = generate(&params, &mut rng.stream("worldgen"));
        let mut trees = 0;
        for y in 0..grid.height() {
            for x in 0..grid.width() {
                if grid.kind_at(Coordinate::new(x, y)) == TileKind::Tree {
                    trees += 1;
                }
            }
        }
        assert!(trees > 0, "a funded budget should yield at least one patch");
    }
}

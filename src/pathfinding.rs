//! A* search over the tile grid.
//!
//! Deliberately mirrors the simulation's historical search: the open list is
//! kept sorted by `F` with a stable sort, and a node already in the open
//! list is never re-scored. First discovery wins. Downstream fixtures depend
//! on that, so it stays even though canonical A* would re-score.

use std::collections::{HashMap, HashSet};

use crate::grid::{Coordinate, Grid, WorldPosition};

/// Search gives up after closing this many nodes; callers treat the cap as
/// "no path found".
const MAX_CLOSED_NODES: usize = 10_000;

/// Distance at which a waypoint counts as reached.
pub const WAYPOINT_EPSILON: f32 = 1.0;

/// Ordered waypoints, goal first. Consumed back-to-front: the last element is
/// the next point to walk to.
#[derive(Debug, Clone, Default)]
pub struct Path {
    points: Vec<WorldPosition>,
}

impl Path {
    pub fn has_path(&self) -> bool {
        !self.points.is_empty()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[WorldPosition] {
        &self.points
    }

    /// Sum of segment lengths from `from` through every remaining waypoint.
    pub fn total_length(&self, from: WorldPosition) -> f32 {
        let mut length = 0.0;
        let mut cursor = from;
        for point in self.points.iter().rev() {
            length += cursor.distance_to(*point);
            cursor = *point;
        }
        length
    }

    /// Next waypoint for a walker at `query`. Waypoints within
    /// [`WAYPOINT_EPSILON`] are popped before the next one is returned.
    pub fn next_point(&mut self, query: WorldPosition) -> Option<WorldPosition> {
        while let Some(&candidate) = self.points.last() {
            if query.distance_to(candidate) < WAYPOINT_EPSILON {
                self.points.pop();
            } else {
                return Some(candidate);
            }
        }
        None
    }
}

#[derive(Clone, Copy)]
struct Node {
    parent: Option<Coordinate>,
    cost: f32,
    heuristic: f32,
}

impl Node {
    fn f(&self) -> f32 {
        self.cost + self.heuristic
    }
}

fn euclidean(a: Coordinate, b: Coordinate) -> f32 {
    let dx = (a.x - b.x) as f32;
    let dy = (a.y - b.y) as f32;
    (dx * dx + dy * dy).sqrt()
}

/// Build a path between two world positions. `None` means no path: a missing
/// endpoint, an exhausted open list, or the expansion cap.
pub fn build_path(grid: &Grid, start: WorldPosition, end: WorldPosition) -> Option<Path> {
    let tile_size = grid.tile_size();
    let start_coord = Coordinate::from_world(start, tile_size);
    let end_coord = Coordinate::from_world(end, tile_size);
    if !grid.contains(start_coord) || !grid.contains(end_coord) {
        return None;
    }

    // Per-call scratch; tiles carry no search state between calls.
    let mut nodes: HashMap<Coordinate, Node> = HashMap::new();
    let mut open: Vec<Coordinate> = Vec::new();
    let mut closed: HashSet<Coordinate> = HashSet::new();

    nodes.insert(
        start_coord,
        Node {
            parent: None,
            cost: 0.0,
            heuristic: euclidean(start_coord, end_coord),
        },
    );
    open.push(start_coord);

    while !open.is_empty() && !closed.contains(&end_coord) && closed.len() < MAX_CLOSED_NODES {
        let current = open.remove(0);
        closed.insert(current);
        let current_cost = nodes[&current].cost;

        for neighbor in grid.adjacent(current) {
            if closed.contains(&neighbor) || !grid.is_traversable(neighbor) {
                continue;
            }
            if nodes.contains_key(&neighbor) {
                // Already discovered; first discovery wins, never re-scored.
                continue;
            }
            nodes.insert(
                neighbor,
                Node {
                    parent: Some(current),
                    cost: current_cost + 1.0,
                    heuristic: euclidean(neighbor, end_coord),
                },
            );
            open.push(neighbor);
            // Stable sort keeps discovery order for equal F.
            open.sort_by(|a, b| {
                nodes[a]
                    .f()
                    .partial_cmp(&nodes[b].f())
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
        }
    }

    if !closed.contains(&end_coord) {
        return None;
    }

    // Walk parent links goal -> start, excluding the start tile itself.
    let mut points = Vec::new();
    let mut cursor = end_coord;
    while cursor != start_coord {
        points.push(cursor.to_world(tile_size));
        cursor = match nodes[&cursor].parent {
            Some(parent) => parent,
            None => break,
        };
    }

    Some(Path { points })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::TileKind;

    fn grass_grid(width: i32, height: i32) -> Grid {
        let mut grid = Grid::new(width, height, 1.0);
        for y in 0..height {
            for x in 0..width {
                grid.tile_at(Coordinate::new(x, y));
            }
        }
        grid
    }

    fn center(c: Coordinate) -> WorldPosition {
        c.to_world(1.0)
    }

    #[test]
    fn test_trivial_diagonal_crossing() {
        let grid = grass_grid(3, 3);
        let path = build_path(&grid, center(Coordinate::new(0, 0)), center(Coordinate::new(2, 2)))
            .expect("open 3x3 grid must be traversable");
        // Manhattan-optimal, no diagonals: 4 steps, start excluded.
        assert_eq!(path.len(), 4);
    }

    #[test]
    fn test_goal_surrounded_by_mountains() {
        let mut grid = grass_grid(5, 5);
        let goal = Coordinate::new(2, 2);
        for c in [
            goal.offset(0, 1),
            goal.offset(0, -1),
            goal.offset(1, 0),
            goal.offset(-1, 0),
        ] {
            grid.set_kind(c, TileKind::Mountain);
        }
        let path = build_path(&grid, center(Coordinate::new(0, 0)), center(goal));
        assert!(path.is_none(), "walled-off goal must yield no path");
    }

    #[test]
    fn test_expansion_cap_is_no_path() {
        // Enough open tiles that the search hits the node cap before it can
        // exhaust the open list looking for the sealed corner.
        let mut grid = grass_grid(120, 120);
        let goal = Coordinate::new(119, 119);
        grid.set_kind(goal.offset(-1, 0), TileKind::Mountain);
        grid.set_kind(goal.offset(0, -1), TileKind::Mountain);
        let path = build_path(&grid, center(Coordinate::new(0, 0)), center(goal));
        assert!(path.is_none(), "the search must give up at the node cap");
    }

    #[test]
    fn test_uninstantiated_endpoint_is_no_path() {
        let grid = grass_grid(3, 3);
        let path = build_path(
            &grid,
            center(Coordinate::new(0, 0)),
            center(Coordinate::new(40, 40)),
        );
        assert!(path.is_none());
    }

    #[test]
    fn test_routes_around_wall() {
        let mut grid = grass_grid(5, 5);
        // Vertical wall with a gap at the bottom row.
        for y in 1..5 {
            grid.set_kind(Coordinate::new(2, y), TileKind::Mountain);
        }
        let path = build_path(&grid, center(Coordinate::new(0, 2)), center(Coordinate::new(4, 2)))
            .expect("gap exists");
        assert!(path.len() >= 8, "detour is longer than the straight line");
    }

    #[test]
    fn test_waypoints_consumed_back_to_front() {
        let grid = grass_grid(3, 1);
        let mut path = build_path(
            &grid,
            center(Coordinate::new(0, 0)),
            center(Coordinate::new(2, 0)),
        )
        .unwrap();
        // Stored goal-first, walked back-to-front.
        assert_eq!(path.points().first().copied(), Some(center(Coordinate::new(2, 0))));
        let first = path.next_point(center(Coordinate::new(0, 0))).unwrap();
        // Nearest remaining waypoint comes first, not the goal.
        assert!((first.x - center(Coordinate::new(1, 0)).x).abs() < f32::EPSILON);
    }

    #[test]
    fn test_total_length_sums_segments() {
        let grid = grass_grid(4, 1);
        let path = build_path(
            &grid,
            center(Coordinate::new(0, 0)),
            center(Coordinate::new(3, 0)),
        )
        .unwrap();
        let length = path.total_length(center(Coordinate::new(0, 0)));
        assert!((length - 3.0).abs() < 1e-4);
    }

    #[test]
    fn test_start_equals_goal_is_empty_path() {
        let grid = grass_grid(3, 3);
        let path = build_path(
            &grid,
            center(Coordinate::new(1, 1)),
            center(Coordinate::new(1, 1)),
        )
        .expect("same-cell query succeeds");
        assert!(path.is_empty());
    }
}

//! Budgeted A* pathfinding on a tile grid
//!
//! Requests are queued and resolved later, a few per tick, inside a
//! wall-clock budget. Results are either stored for polling with
//! [`PathFinder::try_take_result`] or handed to a sink via
//! [`PathFinder::update_with`].

use std::collections::VecDeque;
use std::fmt;
use std::time::{Duration, Instant};

use glam::Vec2;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::ai::grid::{GridCoord, NavGrid, TileSource};
use crate::core::config::PathFinderConfig;
use crate::core::debug::BudgetStats;

/// Identifier correlating a request with its result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Waypoints in world coordinates, origin cell first
pub type Path = Vec<Vec2>;

/// Outcome codes of a path request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultCode {
    PathFound,
    OriginOutOfMap,
    DestinationOutOfMap,
    OriginNonWalkable,
    DestinationNonWalkable,
    NoPath,
}

/// Reasons a request produced no path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PathError {
    /// Origin resolves to no grid cell
    OriginOutOfMap,
    /// Destination resolves to no grid cell
    DestinationOutOfMap,
    /// Origin cell is not walkable
    OriginNonWalkable,
    /// Destination cell is not walkable
    DestinationNonWalkable,
    /// Open set exhausted without reaching the destination
    NoPath,
}

impl PathError {
    #[must_use]
    pub fn code(self) -> ResultCode {
        match self {
            Self::OriginOutOfMap => ResultCode::OriginOutOfMap,
            Self::DestinationOutOfMap => ResultCode::DestinationOutOfMap,
            Self::OriginNonWalkable => ResultCode::OriginNonWalkable,
            Self::DestinationNonWalkable => ResultCode::DestinationNonWalkable,
            Self::NoPath => ResultCode::NoPath,
        }
    }
}

impl fmt::Display for PathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OriginOutOfMap => write!(f, "origin is outside the map"),
            Self::DestinationOutOfMap => write!(f, "destination is outside the map"),
            Self::OriginNonWalkable => write!(f, "origin cell is not walkable"),
            Self::DestinationNonWalkable => write!(f, "destination cell is not walkable"),
            Self::NoPath => write!(f, "no path between origin and destination"),
        }
    }
}

impl std::error::Error for PathError {}

/// Result of a single path request
#[derive(Debug, Clone, PartialEq)]
pub struct PathResult {
    pub id: RequestId,
    pub outcome: Result<Path, PathError>,
}

impl PathResult {
    #[must_use]
    pub fn code(&self) -> ResultCode {
        match &self.outcome {
            Ok(_) => ResultCode::PathFound,
            Err(e) => e.code(),
        }
    }

    /// The path, if one was found
    #[must_use]
    pub fn path(&self) -> Option<&[Vec2]> {
        self.outcome.as_deref().ok()
    }
}

#[derive(Debug, Clone)]
struct PathRequest {
    id: RequestId,
    origin: Vec2,
    destination: Vec2,
}

/// Per-search bookkeeping for one cell
#[derive(Debug, Clone, Copy)]
struct SearchNode {
    g: f32,
    h: f32,
    parent: Option<GridCoord>,
}

impl SearchNode {
    fn f(&self) -> f32 {
        self.g + self.h
    }
}

/// Queue-driven pathfinder that owns the level's navigation grid
#[derive(Debug)]
pub struct PathFinder {
    grid: NavGrid,
    requests: VecDeque<PathRequest>,
    completed: FxHashMap<RequestId, PathResult>,
    forgotten: FxHashSet<RequestId>,
    next_id: u64,
    budget: Duration,
    pixels_per_metre: f32,
    stats: BudgetStats,
}

impl PathFinder {
    /// Create a pathfinder with an empty grid; call [`PathFinder::init`] per level
    #[must_use]
    pub fn new(config: &PathFinderConfig) -> Self {
        Self {
            grid: NavGrid::empty(config.pixels_per_metre),
            requests: VecDeque::new(),
            completed: FxHashMap::default(),
            forgotten: FxHashSet::default(),
            next_id: 1,
            budget: config.budget(),
            pixels_per_metre: config.pixels_per_metre,
            stats: BudgetStats::new(),
        }
    }

    /// Rebuild the grid for a new level, dropping all pending work
    pub fn init(&mut self, source: &impl TileSource) {
        self.set_grid(NavGrid::from_source(source, self.pixels_per_metre));
    }

    /// Replace the grid directly, dropping all pending work
    pub fn set_grid(&mut self, grid: NavGrid) {
        let dropped = self.requests.len();
        self.grid = grid;
        self.requests.clear();
        self.completed.clear();
        self.forgotten.clear();

        if dropped > 0 {
            log::debug!("PathFinder reset, {dropped} pending requests dropped");
        }
    }

    #[must_use]
    pub fn grid(&self) -> &NavGrid {
        &self.grid
    }

    #[must_use]
    pub fn stats(&self) -> &BudgetStats {
        &self.stats
    }

    /// Number of queued, unresolved requests
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.requests.len()
    }

    /// Queue a request; it is resolved by a later `update()`
    pub fn request_path(&mut self, origin: Vec2, destination: Vec2) -> RequestId {
        let id = RequestId(self.next_id);
        self.next_id += 1;
        self.requests.push_back(PathRequest {
            id,
            origin,
            destination,
        });
        id
    }

    /// Resolve queued requests within the budget, storing the results
    ///
    /// Returns the number of requests resolved.
    pub fn update(&mut self) -> usize {
        let mut completed = std::mem::take(&mut self.completed);
        let processed = self.update_with(|result| {
            completed.insert(result.id, result);
        });
        self.completed = completed;
        processed
    }

    /// Resolve queued requests within the budget, handing each result to `deliver`
    ///
    /// At least one request is resolved when any are queued. The deadline is
    /// only checked between requests, so a single slow search may overrun.
    /// Forgotten requests are dropped without a search.
    pub fn update_with<F: FnMut(PathResult)>(&mut self, mut deliver: F) -> usize {
        let start = Instant::now();
        let deadline = start + self.budget;
        let total = self.requests.len();
        let mut processed = 0;

        while let Some(request) = self.requests.pop_front() {
            if self.forgotten.remove(&request.id) {
                continue;
            }
            deliver(self.process_request(&request));
            processed += 1;

            if Instant::now() >= deadline {
                break;
            }
        }

        if processed > 0 {
            log::debug!("{processed} / {total} paths processed");
        }

        self.stats.record(processed, start.elapsed(), self.budget);
        processed
    }

    /// Take the stored result for `id`, if it has been resolved
    pub fn try_take_result(&mut self, id: RequestId) -> Option<PathResult> {
        self.completed.remove(&id)
    }

    /// Drop interest in a request; its result will not be stored
    pub fn forget(&mut self, id: RequestId) {
        if self.completed.remove(&id).is_none() && self.requests.iter().any(|r| r.id == id) {
            self.forgotten.insert(id);
        }
    }

    fn process_request(&self, request: &PathRequest) -> PathResult {
        PathResult {
            id: request.id,
            outcome: self.find_path(request.origin, request.destination),
        }
    }

    /// Run a synchronous A* search between two world positions
    ///
    /// # Errors
    ///
    /// Returns the reason no path could be produced
    pub fn find_path(&self, origin: Vec2, destination: Vec2) -> Result<Path, PathError> {
        let start = self.grid.world_to_grid(origin);
        let goal = self.grid.world_to_grid(destination);

        let start_walkable = self.grid.cell(start).ok_or(PathError::OriginOutOfMap)?;
        let goal_walkable = self.grid.cell(goal).ok_or(PathError::DestinationOutOfMap)?;

        if !start_walkable {
            return Err(PathError::OriginNonWalkable);
        }
        if !goal_walkable {
            return Err(PathError::DestinationNonWalkable);
        }

        let heuristic = |c: GridCoord| c.distance_squared(goal) as f32;

        let mut nodes: FxHashMap<GridCoord, SearchNode> = FxHashMap::default();
        let mut open: Vec<GridCoord> = vec![start];
        let mut closed: FxHashSet<GridCoord> = FxHashSet::default();

        nodes.insert(
            start,
            SearchNode {
                g: 0.0,
                h: heuristic(start),
                parent: None,
            },
        );

        while let Some(index) = best_candidate(&open, &nodes) {
            let current = open[index];

            if current == goal {
                return Ok(self.reconstruct(&nodes, current));
            }

            open.remove(index);
            closed.insert(current);

            let next_g = nodes.get(&current).map_or(f32::INFINITY, |n| n.g) + 1.0;

            for neighbor in self.grid.neighbors(current) {
                let known = nodes.get(&neighbor).copied();
                let better = known.is_none_or(|n| next_g < n.g);

                if closed.contains(&neighbor) {
                    // Closed cells never return to the open list
                    if better {
                        nodes.insert(
                            neighbor,
                            SearchNode {
                                g: next_g,
                                h: heuristic(neighbor),
                                parent: Some(current),
                            },
                        );
                    }
                    continue;
                }

                let in_open = known.is_some();
                if !in_open || better {
                    nodes.insert(
                        neighbor,
                        SearchNode {
                            g: next_g,
                            h: heuristic(neighbor),
                            parent: Some(current),
                        },
                    );
                    if !in_open {
                        open.push(neighbor);
                    }
                }
            }
        }

        Err(PathError::NoPath)
    }

    fn reconstruct(&self, nodes: &FxHashMap<GridCoord, SearchNode>, goal: GridCoord) -> Path {
        let mut cells = vec![goal];
        let mut current = goal;
        while let Some(parent) = nodes.get(&current).and_then(|n| n.parent) {
            cells.push(parent);
            current = parent;
        }

        cells
            .iter()
            .rev()
            .map(|&c| self.grid.grid_to_world(c))
            .collect()
    }
}

/// Index of the open cell with the lowest `g + h`; earliest wins ties
fn best_candidate(open: &[GridCoord], nodes: &FxHashMap<GridCoord, SearchNode>) -> Option<usize> {
    let mut best = None;
    let mut lowest = f32::INFINITY;

    for (i, coord) in open.iter().enumerate() {
        let f = nodes.get(coord).map_or(f32::INFINITY, SearchNode::f);
        if f < lowest || best.is_none() {
            best = Some(i);
            lowest = f;
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(budget_ms: u64) -> PathFinderConfig {
        PathFinderConfig {
            budget_ms,
            pixels_per_metre: 1.0,
        }
    }

    /// 1m cells, so cell (x, y) spans [x, x+1) x [y, y+1)
    fn finder(width: usize, height: usize, budget_ms: u64) -> PathFinder {
        let mut finder = PathFinder::new(&config(budget_ms));
        finder.set_grid(NavGrid::new(width, height, 1.0, 1.0));
        finder
    }

    fn cells_of(finder: &PathFinder, path: &[Vec2]) -> Vec<GridCoord> {
        path.iter().map(|&p| finder.grid().world_to_grid(p)).collect()
    }

    fn resolve(finder: &mut PathFinder, origin: Vec2, destination: Vec2) -> PathResult {
        let id = finder.request_path(origin, destination);
        finder.update();
        finder.try_take_result(id).unwrap()
    }

    #[test]
    fn test_corner_to_corner() {
        let mut finder = finder(10, 10, 5);
        let result = resolve(&mut finder, Vec2::new(0.0, 0.0), Vec2::new(9.0, 9.0));

        assert_eq!(result.code(), ResultCode::PathFound);
        let path = result.path().unwrap();
        // Origin cell plus nine diagonal steps
        assert_eq!(path.len(), 10);
        assert!((path[0] - Vec2::new(0.5, 0.5)).length() < 1e-5);
        assert!((path[9] - Vec2::new(9.5, 9.5)).length() < 1e-5);
    }

    #[test]
    fn test_path_is_contiguous_around_wall() {
        let mut finder = finder(10, 10, 5);
        let mut grid = NavGrid::new(10, 10, 1.0, 1.0);
        for y in 0..8 {
            grid.set_walkable(5, y, false);
        }
        finder.set_grid(grid);

        let result = resolve(&mut finder, Vec2::new(2.5, 2.5), Vec2::new(8.5, 2.5));
        let path = result.path().unwrap().to_vec();
        let cells = cells_of(&finder, &path);

        assert_eq!(cells.first(), Some(&GridCoord::new(2, 2)));
        assert_eq!(cells.last(), Some(&GridCoord::new(8, 2)));
        for pair in cells.windows(2) {
            assert!(pair[0].is_adjacent(pair[1]), "{:?} -> {:?}", pair[0], pair[1]);
        }
        assert!(cells.iter().all(|&c| finder.grid().is_walkable(c)));
        assert!(cells.iter().any(|c| c.y >= 8), "path must go around the wall");
    }

    #[test]
    fn test_out_of_map() {
        let mut finder = finder(4, 4, 5);

        let result = resolve(&mut finder, Vec2::new(-0.5, 1.0), Vec2::new(1.0, 1.0));
        assert_eq!(result.code(), ResultCode::OriginOutOfMap);
        assert!(result.path().is_none());

        let result = resolve(&mut finder, Vec2::new(1.0, 1.0), Vec2::new(1.0, 4.0));
        assert_eq!(result.code(), ResultCode::DestinationOutOfMap);
        assert!(result.path().is_none());
    }

    #[test]
    fn test_non_walkable_origin_checked_first() {
        let mut finder = finder(4, 4, 5);
        let mut grid = NavGrid::new(4, 4, 1.0, 1.0);
        grid.set_walkable(0, 0, false);
        grid.set_walkable(3, 3, false);
        finder.set_grid(grid);

        let both = resolve(&mut finder, Vec2::new(0.5, 0.5), Vec2::new(3.5, 3.5));
        assert_eq!(both.code(), ResultCode::OriginNonWalkable);

        let dest = resolve(&mut finder, Vec2::new(1.5, 1.5), Vec2::new(3.5, 3.5));
        assert_eq!(dest.code(), ResultCode::DestinationNonWalkable);
        assert_eq!(dest.outcome, Err(PathError::DestinationNonWalkable));
    }

    #[test]
    fn test_destination_non_walkable_on_open_grid() {
        let mut finder = finder(10, 10, 5);
        let mut grid = NavGrid::new(10, 10, 1.0, 1.0);
        grid.set_walkable(9, 9, false);
        finder.set_grid(grid);

        let result = resolve(&mut finder, Vec2::ZERO, Vec2::new(9.0, 9.0));
        assert_eq!(result.code(), ResultCode::DestinationNonWalkable);
        assert!(result.path().is_none());
    }

    #[test]
    fn test_enclosed_destination_has_no_path() {
        let mut finder = finder(7, 7, 5);
        let mut grid = NavGrid::new(7, 7, 1.0, 1.0);
        for x in 3..=5 {
            for y in 3..=5 {
                if (x, y) != (4, 4) {
                    grid.set_walkable(x, y, false);
                }
            }
        }
        finder.set_grid(grid);

        let result = resolve(&mut finder, Vec2::new(0.5, 0.5), Vec2::new(4.5, 4.5));
        assert_eq!(result.code(), ResultCode::NoPath);
        assert!(result.path().is_none());
    }

    #[test]
    fn test_identical_requests_resolve_independently() {
        let mut finder = finder(8, 8, 5);
        let a = finder.request_path(Vec2::new(0.5, 0.5), Vec2::new(6.5, 3.5));
        let b = finder.request_path(Vec2::new(0.5, 0.5), Vec2::new(6.5, 3.5));
        assert_ne!(a, b);

        finder.update();
        let first = finder.try_take_result(a).unwrap();
        let second = finder.try_take_result(b).unwrap();

        assert_eq!(first.code(), second.code());
        assert_eq!(first.outcome, second.outcome);
        assert!(finder.try_take_result(a).is_none());
    }

    #[test]
    fn test_requests_are_not_searched_on_enqueue() {
        let mut finder = finder(4, 4, 5);
        let id = finder.request_path(Vec2::new(0.5, 0.5), Vec2::new(2.5, 2.5));

        assert_eq!(finder.pending_len(), 1);
        assert!(finder.try_take_result(id).is_none());
    }

    #[test]
    fn test_zero_budget_resolves_one_per_update_in_order() {
        let mut finder = finder(6, 6, 0);
        let ids: Vec<RequestId> = (0..3)
            .map(|i| finder.request_path(Vec2::new(0.5, 0.5), Vec2::new(5.5, i as f32 + 0.5)))
            .collect();

        let mut order = Vec::new();
        for _ in 0..3 {
            let processed = finder.update_with(|result| order.push(result.id));
            assert_eq!(processed, 1);
        }

        assert_eq!(order, ids);
        assert_eq!(finder.pending_len(), 0);
        assert_eq!(finder.update(), 0);
    }

    #[test]
    fn test_budget_drains_cheap_requests_once_each() {
        let mut finder = finder(5, 5, 50);
        let ids: Vec<RequestId> = (0..20)
            .map(|_| finder.request_path(Vec2::new(0.5, 0.5), Vec2::new(1.5, 1.5)))
            .collect();

        let mut seen = Vec::new();
        let mut calls: u128 = 0;
        let started = Instant::now();
        while finder.pending_len() > 0 {
            finder.update_with(|result| seen.push(result.id));
            calls += 1;
        }
        let elapsed = started.elapsed().as_millis();

        assert_eq!(seen, ids);
        // Only the final update may stop before its budget is spent
        assert!(calls <= elapsed / 50 + 1, "{calls} updates in {elapsed}ms");
        assert_eq!(finder.stats().total_processed(), 20);
    }

    #[test]
    fn test_generous_budget_drains_queue_in_one_update() {
        let mut finder = finder(5, 5, 1000);
        for _ in 0..20 {
            finder.request_path(Vec2::new(0.5, 0.5), Vec2::new(1.5, 1.5));
        }

        assert_eq!(finder.update(), 20);
        assert_eq!(finder.pending_len(), 0);
    }

    #[test]
    fn test_cheaper_route_reparents_closed_cell() {
        // y5  # . S .
        // y4  # . # .
        // y3  . . . .
        // y2  . # # #
        // y1  . . . G
        // y0  . . . #
        let mut finder = finder(4, 6, 5);
        let mut grid = NavGrid::new(4, 6, 1.0, 1.0);
        for (x, y) in [(0, 5), (0, 4), (2, 4), (1, 2), (2, 2), (3, 2), (3, 0)] {
            grid.set_walkable(x, y, false);
        }
        finder.set_grid(grid);

        let result = resolve(&mut finder, Vec2::new(2.5, 5.5), Vec2::new(3.5, 1.5));
        let cells = cells_of(&finder, result.path().unwrap());

        // (1, 3) is closed via (2, 3) before the shorter route through (1, 4)
        // is found; the path must follow the updated parent
        let expected: Vec<GridCoord> = [(2, 5), (1, 4), (1, 3), (0, 2), (1, 1), (2, 1), (3, 1)]
            .into_iter()
            .map(|(x, y)| GridCoord::new(x, y))
            .collect();
        assert_eq!(cells, expected);
    }

    #[test]
    fn test_equal_cost_ties_go_to_first_opened() {
        // Blocked centre; going below and above (1, 1) cost the same, and
        // the lower cell is generated first
        let mut finder = finder(3, 3, 5);
        let mut grid = NavGrid::new(3, 3, 1.0, 1.0);
        grid.set_walkable(1, 1, false);
        finder.set_grid(grid);

        let result = resolve(&mut finder, Vec2::new(0.5, 1.5), Vec2::new(2.5, 1.5));
        let cells = cells_of(&finder, result.path().unwrap());

        assert_eq!(
            cells,
            vec![GridCoord::new(0, 1), GridCoord::new(1, 0), GridCoord::new(2, 1)]
        );
    }

    #[test]
    fn test_init_drops_pending_but_keeps_ids_increasing() {
        let mut finder = finder(4, 4, 5);
        let before = finder.request_path(Vec2::ZERO, Vec2::ONE);

        finder.set_grid(NavGrid::new(4, 4, 1.0, 1.0));
        assert_eq!(finder.pending_len(), 0);
        assert_eq!(finder.update(), 0);
        assert!(finder.try_take_result(before).is_none());

        let after = finder.request_path(Vec2::ZERO, Vec2::ONE);
        assert!(after > before);
    }

    #[test]
    fn test_forget_pending_request() {
        let mut finder = finder(4, 4, 5);
        let kept = finder.request_path(Vec2::ZERO, Vec2::ONE);
        let dropped = finder.request_path(Vec2::ZERO, Vec2::ONE);

        finder.forget(dropped);
        // Forgotten requests are skipped, not searched
        assert_eq!(finder.update(), 1);
        assert_eq!(finder.pending_len(), 0);

        assert!(finder.try_take_result(kept).is_some());
        assert!(finder.try_take_result(dropped).is_none());
    }

    #[test]
    fn test_forget_applies_to_sink_delivery() {
        let mut finder = finder(4, 4, 5);
        let dropped = finder.request_path(Vec2::ZERO, Vec2::ONE);
        let kept = finder.request_path(Vec2::ZERO, Vec2::ONE);
        finder.forget(dropped);

        let mut delivered = Vec::new();
        finder.update_with(|result| delivered.push(result.id));
        assert_eq!(delivered, vec![kept]);
    }

    #[test]
    fn test_start_equals_goal() {
        let mut finder = finder(4, 4, 5);
        let result = resolve(&mut finder, Vec2::new(1.2, 1.7), Vec2::new(1.9, 1.1));

        assert_eq!(result.path().map(<[Vec2]>::len), Some(1));
    }
}

//! Path oracle built on a reverse breadth-first distance field.

use std::collections::VecDeque;

use frontline_core::{EdgeSide, Location, ARENA_SIZE};

const CELL_COUNT: usize = (ARENA_SIZE * ARENA_SIZE) as usize;

/// Dense distance grid seeded from a set of endpoint cells.
///
/// Distances default to `u16::MAX` for cells that cannot reach any endpoint so
/// callers can distinguish blocked or isolated cells from traversable ones.
#[derive(Clone, Debug)]
pub(crate) struct NavigationField {
    distances: Vec<u16>,
}

impl Default for NavigationField {
    fn default() -> Self {
        Self {
            distances: vec![u16::MAX; CELL_COUNT],
        }
    }
}

impl NavigationField {
    /// Rebuilds the distances outward from `endpoints` using a breadth-first search.
    pub(crate) fn rebuild_with<F>(&mut self, endpoints: &[Location], mut is_blocked: F)
    where
        F: FnMut(Location) -> bool,
    {
        self.distances.fill(u16::MAX);
        let mut queue = VecDeque::new();

        for &endpoint in endpoints {
            if is_blocked(endpoint) {
                continue;
            }

            let Some(index) = index(endpoint) else {
                continue;
            };
            if self.distances[index] == 0 {
                continue;
            }

            self.distances[index] = 0;
            queue.push_back(endpoint);
        }

        while let Some(cell) = queue.pop_front() {
            let Some(current_index) = index(cell) else {
                continue;
            };
            let current_distance = self.distances[current_index];

            if current_distance >= u16::MAX.saturating_sub(1) {
                continue;
            }

            let next_distance = current_distance + 1;

            for neighbor in neighbors(cell) {
                if is_blocked(neighbor) {
                    continue;
                }

                let Some(neighbor_index) = index(neighbor) else {
                    continue;
                };

                if self.distances[neighbor_index] <= next_distance {
                    continue;
                }

                self.distances[neighbor_index] = next_distance;
                queue.push_back(neighbor);
            }
        }
    }

    /// Distance captured for the provided cell, if it lies within the arena.
    #[must_use]
    pub(crate) fn distance(&self, cell: Location) -> Option<u16> {
        index(cell).and_then(|offset| self.distances.get(offset).copied())
    }
}

/// Computes the route a mobile unit takes from `start` toward `target`.
///
/// Reachable cells of the target edge become the endpoints. When the edge is
/// sealed off the unit heads for the reachable cell deepest toward the target,
/// breaking ties toward the target's side. The walk then descends the distance
/// field, alternating axes where possible and otherwise moving toward the target.
pub(crate) fn find_path<F>(start: Location, target: EdgeSide, is_blocked: F) -> Option<Vec<Location>>
where
    F: Fn(Location) -> bool,
{
    if !start.in_arena() || is_blocked(start) {
        return None;
    }

    let reachable = flood(start, &is_blocked);
    let edge = target.locations();
    let mut endpoints: Vec<Location> = reachable
        .iter()
        .copied()
        .filter(|cell| edge.contains(cell))
        .collect();

    if endpoints.is_empty() {
        let deepest = reachable
            .iter()
            .copied()
            .max_by_key(|cell| endpoint_preference(*cell, target))?;
        endpoints.push(deepest);
    }

    let mut field = NavigationField::default();
    field.rebuild_with(&endpoints, &is_blocked);

    let mut path = vec![start];
    let mut current = start;
    let mut last_axis: Option<Axis> = None;

    for _ in 0..CELL_COUNT {
        let distance = field.distance(current)?;
        if distance == 0 {
            return Some(path);
        }

        let next = neighbors(current)
            .filter(|neighbor| field.distance(*neighbor) == Some(distance - 1))
            .min_by_key(|neighbor| step_preference(current, *neighbor, last_axis, target))?;

        last_axis = Some(Axis::between(current, next));
        path.push(next);
        current = next;
    }

    Some(path)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Axis {
    Horizontal,
    Vertical,
}

impl Axis {
    fn between(from: Location, to: Location) -> Axis {
        if from.x() == to.x() {
            Axis::Vertical
        } else {
            Axis::Horizontal
        }
    }
}

fn endpoint_preference(cell: Location, target: EdgeSide) -> (i32, i32) {
    let depth = if target.is_top() { cell.y() } else { -cell.y() };
    let side = if target.is_right() { cell.x() } else { -cell.x() };
    (depth, side)
}

fn step_preference(from: Location, to: Location, last_axis: Option<Axis>, target: EdgeSide) -> (bool, bool) {
    let axis = Axis::between(from, to);
    let repeats_axis = last_axis == Some(axis);
    let toward_target = match axis {
        Axis::Vertical => (to.y() > from.y()) == target.is_top(),
        Axis::Horizontal => (to.x() > from.x()) == target.is_right(),
    };
    (repeats_axis, !toward_target)
}

fn flood<F>(start: Location, is_blocked: &F) -> Vec<Location>
where
    F: Fn(Location) -> bool,
{
    let mut visited = vec![false; CELL_COUNT];
    let mut reachable = Vec::new();
    let mut queue = VecDeque::new();

    if let Some(index) = index(start) {
        visited[index] = true;
        queue.push_back(start);
    }

    while let Some(cell) = queue.pop_front() {
        reachable.push(cell);
        for neighbor in neighbors(cell) {
            if is_blocked(neighbor) {
                continue;
            }
            let Some(index) = index(neighbor) else {
                continue;
            };
            if visited[index] {
                continue;
            }
            visited[index] = true;
            queue.push_back(neighbor);
        }
    }

    reachable
}

fn neighbors(cell: Location) -> impl Iterator<Item = Location> {
    [(0, 1), (1, 0), (0, -1), (-1, 0)]
        .into_iter()
        .filter_map(move |(dx, dy)| cell.offset(dx, dy))
}

fn index(cell: Location) -> Option<usize> {
    if !cell.in_arena() {
        return None;
    }
    let column = usize::try_from(cell.x()).ok()?;
    let row = usize::try_from(cell.y()).ok()?;
    let width = usize::try_from(ARENA_SIZE).ok()?;
    row.checked_mul(width)?.checked_add(column)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rebuild_with_sets_endpoints_to_zero() {
        let mut field = NavigationField::default();
        let endpoints = [Location::new(13, 5)];

        field.rebuild_with(&endpoints, |_| false);

        assert_eq!(field.distance(Location::new(13, 5)), Some(0));
        assert_eq!(field.distance(Location::new(13, 4)), Some(1));
        assert_eq!(field.distance(Location::new(12, 4)), Some(2));
        assert_eq!(field.distance(Location::new(0, 0)), None);
    }

    #[test]
    fn rebuild_with_respects_walls() {
        let mut field = NavigationField::default();
        let endpoints = [Location::new(13, 5)];
        let wall = Location::new(13, 4);

        field.rebuild_with(&endpoints, |cell| cell == wall);

        assert_eq!(field.distance(wall), Some(u16::MAX));
        assert_eq!(field.distance(Location::new(13, 3)), Some(4));
    }

    #[test]
    fn open_arena_path_reaches_opposite_edge() {
        let start = Location::new(13, 0);
        let path = find_path(start, EdgeSide::TopRight, |_| false).expect("path");

        assert_eq!(path.first(), Some(&start));
        let end = path.last().copied().expect("non-empty");
        assert!(EdgeSide::TopRight.locations().contains(&end));
        for pair in path.windows(2) {
            assert_eq!(pair[0].manhattan_distance(pair[1]), 1, "steps are adjacent");
        }
    }

    #[test]
    fn blocked_start_has_no_path() {
        let start = Location::new(13, 0);
        assert_eq!(find_path(start, EdgeSide::TopRight, |cell| cell == start), None);
        assert_eq!(find_path(Location::new(0, 0), EdgeSide::TopRight, |_| false), None);
    }

    #[test]
    fn sealed_edge_routes_to_deepest_reachable_cell() {
        let start = Location::new(13, 0);
        let path = find_path(start, EdgeSide::TopRight, |cell| cell.y() == 10).expect("path");

        let end = path.last().copied().expect("non-empty");
        assert_eq!(end, Location::new(23, 9));
    }
}

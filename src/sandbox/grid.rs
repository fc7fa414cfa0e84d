//! Grid floor plan for the sandbox
//!
//! Cell-based blocking with O(1) lookup, A* over the 8-neighbourhood and
//! segment sampling for sight and walkability. World positions map onto
//! the x/z plane; `y` is ignored.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use ahash::{AHashMap, AHashSet};
use glam::{Vec2, Vec3};

/// Sample spacing for segment checks, in cells
const SEGMENT_STEP: f32 = 0.1;

pub type Cell = (i32, i32);

/// Bounded floor with blocked cells
///
/// The default floor has no cells, so everything is blocked.
#[derive(Debug, Clone, Default)]
pub struct FloorGrid {
    width: i32,
    depth: i32,
    blocked: AHashSet<Cell>,
}

/// Entry in the A* open set
#[derive(Debug, Clone)]
struct OpenCell {
    cell: Cell,
    f_cost: f32,
}

impl PartialEq for OpenCell {
    fn eq(&self, other: &Self) -> bool {
        self.cell == other.cell
    }
}

impl Eq for OpenCell {}

impl Ord for OpenCell {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse order for min-heap
        other
            .f_cost
            .partial_cmp(&self.f_cost)
            .unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for OpenCell {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl FloorGrid {
    pub fn new(width: i32, depth: i32) -> Self {
        Self {
            width,
            depth,
            blocked: AHashSet::new(),
        }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn depth(&self) -> i32 {
        self.depth
    }

    pub fn block(&mut self, x: i32, z: i32) {
        self.blocked.insert((x, z));
    }

    pub fn unblock(&mut self, x: i32, z: i32) {
        self.blocked.remove(&(x, z));
    }

    /// Out-of-bounds cells count as blocked
    pub fn is_blocked(&self, cell: Cell) -> bool {
        cell.0 < 0 || cell.1 < 0 || cell.0 >= self.width || cell.1 >= self.depth || self.blocked.contains(&cell)
    }

    pub fn cell_of(position: Vec3) -> Cell {
        (position.x.floor() as i32, position.z.floor() as i32)
    }

    pub fn center_of(cell: Cell) -> Vec3 {
        Vec3::new(cell.0 as f32 + 0.5, 0.0, cell.1 as f32 + 0.5)
    }

    pub fn is_position_blocked(&self, position: Vec3) -> bool {
        self.is_blocked(Self::cell_of(position))
    }

    /// No blocked cell along the segment
    pub fn segment_clear(&self, from: Vec3, to: Vec3) -> bool {
        let a = Vec2::new(from.x, from.z);
        let b = Vec2::new(to.x, to.z);
        let length = a.distance(b);
        let samples = (length / SEGMENT_STEP).ceil().max(1.0) as usize;
        (0..=samples).all(|i| {
            let p = a.lerp(b, i as f32 / samples as f32);
            !self.is_blocked((p.x.floor() as i32, p.y.floor() as i32))
        })
    }

    /// Cell path using A*; `None` if no path exists
    pub fn find_cells(&self, start: Cell, goal: Cell) -> Option<Vec<Cell>> {
        if self.is_blocked(start) || self.is_blocked(goal) {
            return None;
        }
        if start == goal {
            return Some(vec![start]);
        }

        let mut open_set = BinaryHeap::new();
        let mut came_from: AHashMap<Cell, Cell> = AHashMap::new();
        let mut g_scores: AHashMap<Cell, f32> = AHashMap::new();

        g_scores.insert(start, 0.0);
        open_set.push(OpenCell {
            cell: start,
            f_cost: heuristic(start, goal),
        });

        while let Some(current) = open_set.pop() {
            if current.cell == goal {
                return Some(reconstruct(&came_from, current.cell));
            }

            let current_g = *g_scores.get(&current.cell).unwrap_or(&f32::INFINITY);

            for (neighbor, step_cost) in self.neighbors(current.cell) {
                let tentative_g = current_g + step_cost;
                let neighbor_g = *g_scores.get(&neighbor).unwrap_or(&f32::INFINITY);

                if tentative_g < neighbor_g {
                    came_from.insert(neighbor, current.cell);
                    g_scores.insert(neighbor, tentative_g);
                    open_set.push(OpenCell {
                        cell: neighbor,
                        f_cost: tentative_g + heuristic(neighbor, goal),
                    });
                }
            }
        }

        None
    }

    /// Passable neighbours; diagonals may not cut blocked corners
    fn neighbors(&self, (x, z): Cell) -> impl Iterator<Item = (Cell, f32)> + '_ {
        const DIRS: [(i32, i32); 8] = [(1, 0), (-1, 0), (0, 1), (0, -1), (1, 1), (1, -1), (-1, 1), (-1, -1)];
        DIRS.iter().filter_map(move |&(dx, dz)| {
            let next = (x + dx, z + dz);
            if self.is_blocked(next) {
                return None;
            }
            if dx != 0 && dz != 0 {
                if self.is_blocked((x + dx, z)) || self.is_blocked((x, z + dz)) {
                    return None;
                }
                return Some((next, std::f32::consts::SQRT_2));
            }
            Some((next, 1.0))
        })
    }

    /// Smoothed path corners from `from` to `to`, both included
    pub fn path_corners(&self, from: Vec3, to: Vec3) -> Option<Vec<Vec3>> {
        let cells = self.find_cells(Self::cell_of(from), Self::cell_of(to))?;
        let from = Vec3::new(from.x, 0.0, from.z);
        let to = Vec3::new(to.x, 0.0, to.z);
        if self.segment_clear(from, to) {
            return Some(vec![from, to]);
        }

        let mut points: Vec<Vec3> = Vec::with_capacity(cells.len() + 1);
        points.push(from);
        points.extend(cells.iter().skip(1).take(cells.len().saturating_sub(2)).map(|c| Self::center_of(*c)));
        points.push(to);

        // Greedy string pulling: jump to the furthest directly walkable point
        let mut corners = vec![from];
        let mut anchor = 0;
        while anchor < points.len() - 1 {
            let mut next = anchor + 1;
            for candidate in (anchor + 1..points.len()).rev() {
                if self.segment_clear(points[anchor], points[candidate]) {
                    next = candidate;
                    break;
                }
            }
            corners.push(points[next]);
            anchor = next;
        }
        Some(corners)
    }

    /// Closest unblocked cell centre within `radius`
    pub fn nearest_open(&self, position: Vec3, radius: f32) -> Option<Vec3> {
        if !self.is_position_blocked(position) {
            return Some(position);
        }
        let (cx, cz) = Self::cell_of(position);
        let reach = radius.ceil() as i32;
        let mut best: Option<(f32, Vec3)> = None;
        for x in cx - reach..=cx + reach {
            for z in cz - reach..=cz + reach {
                if self.is_blocked((x, z)) {
                    continue;
                }
                let center = Self::center_of((x, z));
                let d = Vec2::new(center.x - position.x, center.z - position.z).length();
                if d <= radius && best.map_or(true, |(bd, _)| d < bd) {
                    best = Some((d, center));
                }
            }
        }
        best.map(|(_, p)| p)
    }
}

fn heuristic(a: Cell, b: Cell) -> f32 {
    let dx = (a.0 - b.0) as f32;
    let dz = (a.1 - b.1) as f32;
    (dx * dx + dz * dz).sqrt()
}

fn reconstruct(came_from: &AHashMap<Cell, Cell>, mut current: Cell) -> Vec<Cell> {
    let mut path = vec![current];
    while let Some(&prev) = came_from.get(&current) {
        path.push(prev);
        current = prev;
    }
    path.reverse();
    path
}

/// Length of a polyline on the floor plane
pub fn polyline_length(corners: &[Vec3]) -> f32 {
    corners
        .windows(2)
        .map(|w| Vec2::new(w[1].x - w[0].x, w[1].z - w[0].z).length())
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_straight_line_path() {
        let grid = FloorGrid::new(10, 10);
        let path = grid.find_cells((0, 0), (5, 0)).unwrap();
        assert_eq!(path.first(), Some(&(0, 0)));
        assert_eq!(path.last(), Some(&(5, 0)));
        assert_eq!(path.len(), 6);
    }

    #[test]
    fn test_path_around_wall() {
        let mut grid = FloorGrid::new(10, 10);
        for z in 0..8 {
            grid.block(5, z);
        }
        let path = grid.find_cells((0, 0), (9, 0)).unwrap();
        assert!(!path.iter().any(|c| c.0 == 5 && c.1 < 8));
    }

    #[test]
    fn test_no_path_into_enclosure() {
        let mut grid = FloorGrid::new(10, 10);
        for (x, z) in [(4, 4), (5, 4), (6, 4), (4, 5), (6, 5), (4, 6), (5, 6), (6, 6)] {
            grid.block(x, z);
        }
        assert!(grid.find_cells((0, 0), (5, 5)).is_none());
    }

    #[test]
    fn test_out_of_bounds_blocked() {
        let grid = FloorGrid::new(4, 4);
        assert!(grid.is_blocked((-1, 0)));
        assert!(grid.is_blocked((4, 0)));
        assert!(!grid.is_blocked((3, 3)));
    }

    #[test]
    fn test_corners_collapse_on_open_floor() {
        let grid = FloorGrid::new(20, 20);
        let corners = grid
            .path_corners(Vec3::new(1.5, 0.0, 1.5), Vec3::new(15.5, 0.0, 9.5))
            .unwrap();
        assert_eq!(corners.len(), 2);
    }

    #[test]
    fn test_corners_bend_around_wall() {
        let mut grid = FloorGrid::new(20, 20);
        for z in 0..15 {
            grid.block(10, z);
        }
        let corners = grid
            .path_corners(Vec3::new(2.5, 0.0, 2.5), Vec3::new(17.5, 0.0, 2.5))
            .unwrap();
        assert!(corners.len() > 2);
        assert!(corners.windows(2).all(|w| grid.segment_clear(w[0], w[1])));
    }

    #[test]
    fn test_segment_blocked_by_wall() {
        let mut grid = FloorGrid::new(10, 10);
        grid.block(5, 5);
        assert!(!grid.segment_clear(Vec3::new(0.5, 0.0, 5.5), Vec3::new(9.5, 0.0, 5.5)));
        assert!(grid.segment_clear(Vec3::new(0.5, 0.0, 2.5), Vec3::new(9.5, 0.0, 2.5)));
    }
}

//! Uniform spatial grid for neighbor search.
//!
//! Particles are bucketed by the integer cell containing their position. With
//! a cell size no smaller than the smoothing radius, every particle within one
//! radius of a query point lies in the 3x3 block of cells around it.
//!
//! The grid carries no state between sub-steps: it is cleared and rebuilt
//! from the current positions each time.

use std::collections::HashMap;

use bevy::prelude::*;

/// Offsets of the 3x3 cell neighborhood.
pub static NEIGHBOR_OFFSETS: [IVec2; 9] = [
    IVec2::new(-1, -1),
    IVec2::new(-1, 0),
    IVec2::new(-1, 1),
    IVec2::new(0, -1),
    IVec2::new(0, 0),
    IVec2::new(0, 1),
    IVec2::new(1, -1),
    IVec2::new(1, 0),
    IVec2::new(1, 1),
];

/// Pack a cell coordinate into a single map key.
#[inline]
pub fn cell_key(cell: IVec2) -> u64 {
    ((cell.x as u32 as u64) << 32) | cell.y as u32 as u64
}

/// Spatial hash grid mapping cells to particle arena indices.
#[derive(Default, Debug, Clone)]
pub struct SpatialGrid {
    cell_size: f32,
    cells: HashMap<u64, Vec<usize>>,
    len: usize,
}

impl SpatialGrid {
    /// Create an empty grid with the given cell size.
    pub fn new(cell_size: f32) -> Self {
        Self {
            cell_size,
            ..default()
        }
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Number of particles inserted by the last rebuild.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of cells holding at least one particle.
    pub fn occupied_cells(&self) -> usize {
        self.cells.values().filter(|bucket| !bucket.is_empty()).count()
    }

    /// Calculate the grid cell for a position.
    #[inline]
    pub fn cell_of(&self, position: Vec2) -> IVec2 {
        (position / self.cell_size).floor().as_ivec2()
    }

    /// Clear the grid and insert every position under its array index.
    ///
    /// Buckets of cells that stay occupied keep their allocation.
    pub fn rebuild(&mut self, positions: impl IntoIterator<Item = Vec2>, cell_size: f32) {
        self.cell_size = cell_size;
        self.len = 0;
        for bucket in self.cells.values_mut() {
            bucket.clear();
        }

        for (index, position) in positions.into_iter().enumerate() {
            let key = cell_key(self.cell_of(position));
            self.cells.entry(key).or_default().push(index);
            self.len += 1;
        }

        self.cells.retain(|_, bucket| !bucket.is_empty());
    }

    /// Indices of all particles in the 3x3 block of cells around `position`.
    ///
    /// The result is a candidate set: it includes the querying particle
    /// itself and particles farther than one cell size away.
    pub fn query_neighborhood(&self, position: Vec2) -> impl Iterator<Item = usize> + '_ {
        let cell = self.cell_of(position);
        NEIGHBOR_OFFSETS
            .iter()
            .filter_map(move |offset| self.cells.get(&cell_key(cell + *offset)))
            .flat_map(|bucket| bucket.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_of() {
        let grid = SpatialGrid::new(10.0);

        assert_eq!(grid.cell_of(Vec2::new(5.0, 5.0)), IVec2::ZERO);
        assert_eq!(grid.cell_of(Vec2::new(15.0, 5.0)), IVec2::new(1, 0));
        assert_eq!(grid.cell_of(Vec2::new(-0.5, 25.0)), IVec2::new(-1, 2));
    }

    #[test]
    fn test_cell_key_is_unique_for_signed_cells() {
        let keys = [
            cell_key(IVec2::new(0, 0)),
            cell_key(IVec2::new(-1, 0)),
            cell_key(IVec2::new(0, -1)),
            cell_key(IVec2::new(1, 0)),
            cell_key(IVec2::new(0, 1)),
        ];
        for (i, a) in keys.iter().enumerate() {
            for b in &keys[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_query_neighborhood() {
        let mut grid = SpatialGrid::default();
        let positions = vec![
            Vec2::new(1.0, 1.0),
            Vec2::new(2.0, 1.5),
            Vec2::new(9.0, 9.0),
            Vec2::new(50.0, 50.0),
        ];

        grid.rebuild(positions.iter().copied(), 5.0);
        assert_eq!(grid.len(), 4);
        assert_eq!(grid.occupied_cells(), 3);

        let found: Vec<usize> = grid.query_neighborhood(Vec2::new(1.0, 1.0)).collect();
        assert!(found.contains(&0));
        assert!(found.contains(&1));
        assert!(found.contains(&2));
        assert!(!found.contains(&3));
    }

    #[test]
    fn test_neighborhood_covers_smoothing_radius() {
        let h = 4.0;
        let mut grid = SpatialGrid::default();
        let mut positions = Vec::new();
        for i in 0..20 {
            for j in 0..20 {
                positions.push(Vec2::new(i as f32 * 1.3 - 7.0, j as f32 * 1.1 - 3.0));
            }
        }
        grid.rebuild(positions.iter().copied(), h);

        for (i, &p) in positions.iter().enumerate() {
            let candidates: Vec<usize> = grid.query_neighborhood(p).collect();
            for (j, &q) in positions.iter().enumerate() {
                if p.distance_squared(q) < h * h {
                    assert!(candidates.contains(&j), "{i} misses {j}");
                }
            }
        }
    }

    #[test]
    fn test_rebuild_replaces_contents() {
        let mut grid = SpatialGrid::default();
        grid.rebuild([Vec2::new(0.5, 0.5), Vec2::new(0.6, 0.6)], 1.0);
        grid.rebuild([Vec2::new(100.5, 100.5)], 1.0);

        assert_eq!(grid.len(), 1);
        assert_eq!(grid.occupied_cells(), 1);
        assert_eq!(grid.query_neighborhood(Vec2::new(0.5, 0.5)).count(), 0);
        assert_eq!(
            grid.query_neighborhood(Vec2::new(100.0, 100.0)).collect::<Vec<_>>(),
            vec![0]
        );
    }
}

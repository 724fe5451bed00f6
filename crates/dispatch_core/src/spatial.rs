//! Spatial operations: uniform square grid over planar coordinates.
//!
//! This module provides:
//!
//! - **cell keys**: `(floor(x / cell_size), floor(y / cell_size))`
//! - **SpatialIndex**: cell → entity mappings plus a reverse entity → position map,
//!   updated incrementally as vehicles and requests move or change state
//! - **k_nearest**: ring expansion around the query cell, bounded by the number of
//!   populated cells
//!
//! A very large cell size collapses the grid to a single cell, which turns every
//! query into a full scan.

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

use crate::model::Point;

pub type CellKey = (i64, i64);

/// One result of a nearest-candidate query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor<K> {
    pub id: K,
    pub distance: f64,
}

/// Grid index for efficient entity lookups by position.
///
/// Keeps a cell → ids map for queries and an id → position map for O(1) updates.
#[derive(Debug, Clone)]
pub struct SpatialIndex<K> {
    cell_size: f64,
    cells: HashMap<CellKey, Vec<K>>,
    positions: HashMap<K, Point>,
}

impl<K: Copy + Eq + Hash + Ord> SpatialIndex<K> {
    pub fn new(cell_size: f64) -> Self {
        debug_assert!(cell_size > 0.0, "cell size must be positive");
        Self {
            cell_size,
            cells: HashMap::new(),
            positions: HashMap::new(),
        }
    }

    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    pub fn cell_key(&self, point: &Point) -> CellKey {
        (
            (point.x / self.cell_size).floor() as i64,
            (point.y / self.cell_size).floor() as i64,
        )
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn contains(&self, id: K) -> bool {
        self.positions.contains_key(&id)
    }

    pub fn position(&self, id: K) -> Option<Point> {
        self.positions.get(&id).copied()
    }

    pub fn cell_of(&self, id: K) -> Option<CellKey> {
        self.position(id).map(|point| self.cell_key(&point))
    }

    /// Insert an entity; an entity already present is moved instead.
    pub fn insert(&mut self, id: K, point: Point) {
        if self.positions.contains_key(&id) {
            self.update(id, point);
            return;
        }
        let cell = self.cell_key(&point);
        self.cells.entry(cell).or_default().push(id);
        self.positions.insert(id, point);
    }

    /// Remove an entity, returning its last position.
    pub fn remove(&mut self, id: K) -> Option<Point> {
        let point = self.positions.remove(&id)?;
        let cell = self.cell_key(&point);
        self.detach(cell, id);
        Some(point)
    }

    /// Move an entity (insert if unknown).
    pub fn update(&mut self, id: K, point: Point) {
        let Some(old) = self.positions.get(&id).copied() else {
            self.insert(id, point);
            return;
        };
        let old_cell = self.cell_key(&old);
        let new_cell = self.cell_key(&point);
        if old_cell != new_cell {
            self.detach(old_cell, id);
            self.cells.entry(new_cell).or_default().push(id);
        }
        self.positions.insert(id, point);
    }

    fn detach(&mut self, cell: CellKey, id: K) {
        if let Some(ids) = self.cells.get_mut(&cell) {
            ids.retain(|&e| e != id);
            if ids.is_empty() {
                self.cells.remove(&cell);
            }
        }
    }

    /// Number of entities per populated cell.
    pub fn cell_counts(&self) -> HashMap<CellKey, usize> {
        self.cells
            .iter()
            .map(|(cell, ids)| (*cell, ids.len()))
            .collect()
    }

    /// Clear all entries (between simulation runs).
    pub fn clear(&mut self) {
        self.cells.clear();
        self.positions.clear();
    }

    /// Up to `limit` entities nearest to `query`, by exact distance then ascending id.
    ///
    /// Rings of cells around the query cell are collected until at least `limit`
    /// candidates are in hand. Once more cells have been visited than are populated,
    /// the remaining populated cells are taken in ring order instead of scanning empty
    /// ones. A `limit` at or above the population is a full scan.
    pub fn k_nearest(&self, query: &Point, limit: usize) -> Vec<Neighbor<K>> {
        self.k_nearest_filtered(query, limit, |_| true)
    }

    /// Like [SpatialIndex::k_nearest], counting only entities that pass `keep`.
    ///
    /// Rejected entities never use up the limit: the search widens until `limit`
    /// accepted entities are found or the index is exhausted.
    pub fn k_nearest_filtered<F>(&self, query: &Point, limit: usize, keep: F) -> Vec<Neighbor<K>>
    where
        F: Fn(K) -> bool,
    {
        if limit == 0 || self.is_empty() {
            return Vec::new();
        }

        let mut collected: Vec<K> = Vec::new();
        if limit >= self.len() {
            collected.extend(self.positions.keys().copied().filter(|&id| keep(id)));
        } else {
            let center = self.cell_key(query);
            let mut ring: i64 = 0;
            let mut visited = 0usize;
            while collected.len() < limit {
                if visited > self.cells.len() {
                    self.collect_remaining_rings(center, ring, limit, &keep, &mut collected);
                    break;
                }
                for cell in ring_cells(center, ring) {
                    visited += 1;
                    if let Some(ids) = self.cells.get(&cell) {
                        collected.extend(ids.iter().copied().filter(|&id| keep(id)));
                    }
                }
                ring += 1;
            }
        }

        let mut neighbors: Vec<Neighbor<K>> = collected
            .into_iter()
            .filter_map(|id| {
                self.positions.get(&id).map(|point| Neighbor {
                    id,
                    distance: point.distance(query),
                })
            })
            .collect();
        neighbors.sort_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then_with(|| a.id.cmp(&b.id))
        });
        neighbors.truncate(limit);
        neighbors
    }

    /// Accepted entities of populated cells at Chebyshev ring `from_ring` or beyond,
    /// ring by ring.
    fn collect_remaining_rings<F>(
        &self,
        center: CellKey,
        from_ring: i64,
        limit: usize,
        keep: &F,
        collected: &mut Vec<K>,
    ) where
        F: Fn(K) -> bool,
    {
        let mut by_ring: BTreeMap<i64, Vec<&Vec<K>>> = BTreeMap::new();
        for (cell, ids) in &self.cells {
            let ring = (cell.0 - center.0).abs().max((cell.1 - center.1).abs());
            if ring >= from_ring {
                by_ring.entry(ring).or_default().push(ids);
            }
        }
        for groups in by_ring.into_values() {
            for ids in groups {
                collected.extend(ids.iter().copied().filter(|&id| keep(id)));
            }
            if collected.len() >= limit {
                break;
            }
        }
    }
}

/// Cells at Chebyshev distance exactly `ring` from `center`.
fn ring_cells(center: CellKey, ring: i64) -> Vec<CellKey> {
    let (cx, cy) = center;
    if ring == 0 {
        return vec![center];
    }
    let mut cells = Vec::with_capacity((8 * ring) as usize);
    for x in (cx - ring)..=(cx + ring) {
        cells.push((x, cy - ring));
        cells.push((x, cy + ring));
    }
    for y in (cy - ring + 1)..=(cy + ring - 1) {
        cells.push((cx - ring, y));
        cells.push((cx + ring, y));
    }
    cells
}

// aoi_server/server/src/concurrent/spatial_index.rs

use crate::core::error::{AoiError, AoiResult};
use crate::core::types::{CellBounds, CellId, CellResolution, EntityId, WorldBounds};
use crate::world::cell::Cell;
use metrics::{counter, histogram};
use smallvec::SmallVec;
use std::fmt;
use tracing::{debug, trace};

pub type NeighborIds = SmallVec<[CellId; 9]>;

/// Area-of-interest grid over a fixed, bounded world.
///
/// The grid topology is decided once in [`GridIndex::create`] and never changes;
/// only cell membership is mutable. Each cell carries its own lock, so updates to
/// unrelated cells never contend. Multi-cell reads take the cell locks in
/// ascending id order.
pub struct GridIndex {
    cells: Vec<Cell>,
    world: WorldBounds,
    column_count: usize,
    row_count: usize,
    cell_width: i64,
    cell_height: i64,
}

impl GridIndex {
    pub fn create(world: WorldBounds, column_count: usize, row_count: usize) -> AoiResult<Self> {
        if column_count == 0 || row_count == 0 {
            return Err(AoiError::InvalidConfiguration(format!(
                "cell counts must be positive, got {}x{}",
                column_count, row_count
            )));
        }
        if world.max_x <= world.min_x || world.max_y <= world.min_y {
            return Err(AoiError::InvalidConfiguration(format!("degenerate world bounds ({})", world)));
        }
        let total_cells = column_count.checked_mul(row_count).ok_or_else(|| {
            AoiError::InvalidConfiguration(format!("{}x{} cells overflows", column_count, row_count))
        })?;

        let cell_width = world.width() / column_count as i64;
        let cell_height = world.height() / row_count as i64;
        if cell_width == 0 || cell_height == 0 {
            return Err(AoiError::InvalidConfiguration(format!(
                "world ({}) is too small for a {}x{} grid",
                world, column_count, row_count
            )));
        }

        let mut cells = Vec::with_capacity(total_cells);
        for row in 0..row_count {
            for column in 0..column_count {
                let id = row * column_count + column;
                // The last column/row absorbs whatever the integer division left over.
                let min_x = world.min_x as i64 + column as i64 * cell_width;
                let max_x = if column + 1 == column_count { world.max_x as i64 } else { min_x + cell_width };
                let min_y = world.min_y as i64 + row as i64 * cell_height;
                let max_y = if row + 1 == row_count { world.max_y as i64 } else { min_y + cell_height };
                let bounds = CellBounds {
                    min_x: min_x as i32,
                    max_x: max_x as i32,
                    min_y: min_y as i32,
                    max_y: max_y as i32,
                };
                cells.push(Cell::new(id, bounds));
            }
        }

        debug!(
            "AOI grid initialized: {}x{} grid, {} total cells, cell size: {}x{}, world: {}",
            column_count, row_count, total_cells, cell_width, cell_height, world
        );

        Ok(GridIndex {
            cells,
            world,
            column_count,
            row_count,
            cell_width,
            cell_height,
        })
    }

    pub fn world_bounds(&self) -> WorldBounds {
        self.world
    }

    pub fn column_count(&self) -> usize {
        self.column_count
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn cell_width(&self) -> i64 {
        self.cell_width
    }

    pub fn cell_height(&self) -> i64 {
        self.cell_height
    }

    pub fn cell(&self, cell_id: CellId) -> Option<&Cell> {
        self.cells.get(cell_id)
    }

    pub fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter()
    }

    fn known_cell(&self, cell_id: CellId) -> AoiResult<&Cell> {
        self.cells.get(cell_id).ok_or_else(|| {
            counter!("aoi_unknown_cell_total").increment(1);
            AoiError::UnknownCellId(cell_id)
        })
    }

    /// Maps one coordinate onto its axis. The flag is set when the coordinate
    /// had to be clamped because it lies outside `[min, max)`.
    #[inline]
    fn axis_index(coord: f32, min: i32, max: i32, size: i64, count: usize) -> (usize, bool) {
        let last = count - 1;
        if coord.is_nan() {
            return (0, true);
        }
        let coord = coord as f64;
        if coord < min as f64 {
            return (0, true);
        }
        if coord >= max as f64 {
            return (last, true);
        }
        let index = ((coord - min as f64) / size as f64).floor() as usize;
        (index.min(last), false)
    }

    pub fn cell_id_for_position(&self, x: f32, y: f32) -> AoiResult<CellResolution> {
        if self.column_count == 0 || self.row_count == 0 {
            return Err(AoiError::CellIdOutOfRange {
                column_count: self.column_count,
                row_count: self.row_count,
            });
        }

        let (column, x_clamped) =
            Self::axis_index(x, self.world.min_x, self.world.max_x, self.cell_width, self.column_count);
        let (row, y_clamped) =
            Self::axis_index(y, self.world.min_y, self.world.max_y, self.cell_height, self.row_count);

        let resolution = CellResolution {
            cell_id: row * self.column_count + column,
            x,
            y,
            clamped: x_clamped || y_clamped,
        };
        if resolution.clamped {
            counter!("aoi_position_out_of_bounds_total").increment(1);
            debug!(
                "Position ({}, {}) outside world ({}), clamped to cell {}",
                x, y, self.world, resolution.cell_id
            );
        }
        Ok(resolution)
    }

    /// Ids of the cell and its up to eight surrounding cells, ascending.
    /// Unknown ids yield an empty set.
    pub fn neighbor_cell_ids(&self, cell_id: CellId) -> NeighborIds {
        let mut ids = NeighborIds::new();
        if cell_id >= self.cells.len() {
            return ids;
        }

        ids.push(cell_id);
        let column = cell_id % self.column_count;
        if column > 0 {
            ids.push(cell_id - 1);
        }
        if column + 1 < self.column_count {
            ids.push(cell_id + 1);
        }

        let horizontal = ids.len();
        for i in 0..horizontal {
            let id = ids[i];
            let row = id / self.column_count;
            if row > 0 {
                ids.push(id - self.column_count);
            }
            if row + 1 < self.row_count {
                ids.push(id + self.column_count);
            }
        }

        ids.sort_unstable();
        ids
    }

    pub fn neighbor_cells(&self, cell_id: CellId) -> Vec<&Cell> {
        self.neighbor_cell_ids(cell_id)
            .into_iter()
            .filter_map(|id| self.cells.get(id))
            .collect()
    }

    /// Entities in the nine-block around `(x, y)`.
    pub fn entity_ids_near(&self, x: f32, y: f32) -> AoiResult<Vec<EntityId>> {
        let resolution = self.cell_id_for_position(x, y)?;
        let neighbor_ids = self.neighbor_cell_ids(resolution.cell_id);

        // Ascending id order; guards are held together so the union is one snapshot.
        let guards: SmallVec<[_; 9]> = neighbor_ids
            .iter()
            .filter_map(|&id| self.cells.get(id))
            .map(|cell| cell.read_members())
            .collect();

        let capacity = guards.iter().map(|members| members.len()).sum();
        let mut nearby = Vec::with_capacity(capacity);
        for members in &guards {
            nearby.extend(members.iter().copied());
        }
        drop(guards);

        counter!("aoi_near_queries_total").increment(1);
        histogram!("aoi_near_query_result_size").record(nearby.len() as f64);
        trace!(
            "AOI query at ({}, {}) -> cell {}, {} cells, {} entities",
            x, y, resolution.cell_id, neighbor_ids.len(), nearby.len()
        );
        Ok(nearby)
    }

    pub fn entity_ids_in_cell(&self, cell_id: CellId) -> AoiResult<Vec<EntityId>> {
        Ok(self.known_cell(cell_id)?.members())
    }

    pub fn add_entity(&self, entity_id: EntityId, cell_id: CellId) -> AoiResult<()> {
        let cell = self.known_cell(cell_id)?;
        if cell.add(entity_id) {
            counter!("aoi_entities_added_total").increment(1);
            trace!("Entity {} added to cell {}", entity_id, cell_id);
        }
        Ok(())
    }

    pub fn remove_entity(&self, entity_id: EntityId, cell_id: CellId) -> AoiResult<()> {
        let cell = self.known_cell(cell_id)?;
        if cell.remove(entity_id) {
            counter!("aoi_entities_removed_total").increment(1);
            trace!("Entity {} removed from cell {}", entity_id, cell_id);
        }
        Ok(())
    }

    pub fn add_entity_at_position(&self, entity_id: EntityId, x: f32, y: f32) -> AoiResult<CellResolution> {
        let resolution = self.cell_id_for_position(x, y)?;
        self.add_entity(entity_id, resolution.cell_id)?;
        Ok(resolution)
    }

    pub fn remove_entity_at_position(&self, entity_id: EntityId, x: f32, y: f32) -> AoiResult<CellResolution> {
        let resolution = self.cell_id_for_position(x, y)?;
        self.remove_entity(entity_id, resolution.cell_id)?;
        Ok(resolution)
    }

    pub fn stats(&self) -> GridIndexStats {
        let mut occupied_cells = 0;
        let mut total_entities = 0;
        let mut max_entities_per_cell = 0;

        for cell in &self.cells {
            let entity_count = cell.len();
            if entity_count > 0 {
                occupied_cells += 1;
                total_entities += entity_count;
                max_entities_per_cell = max_entities_per_cell.max(entity_count);
            }
        }

        GridIndexStats {
            total_cells: self.cells.len(),
            occupied_cells,
            total_entities,
            max_entities_per_cell,
        }
    }
}

impl fmt::Display for GridIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "GridIndex: {}, columns:{}, rows:{}, cell size:{}x{}",
            self.world, self.column_count, self.row_count, self.cell_width, self.cell_height
        )?;
        writeln!(f, "Cells:")?;
        for cell in &self.cells {
            writeln!(f, "{}", cell)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridIndexStats {
    pub total_cells: usize,
    pub occupied_cells: usize,
    pub total_entities: usize,
    pub max_entities_per_cell: usize,
}

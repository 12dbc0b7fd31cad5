// aoi_server/server/src/world/cell.rs
use crate::core::types::{CellBounds, CellId, EntityId};
use ahash::AHashSet;
use parking_lot::{RwLock, RwLockReadGuard};
use std::fmt;

/// One rectangular region of the world and the entities currently inside it.
#[derive(Debug)]
pub struct Cell {
    pub id: CellId,
    pub bounds: CellBounds,
    members: RwLock<AHashSet<EntityId>>,
}

impl Cell {
    pub fn new(id: CellId, bounds: CellBounds) -> Self {
        Cell {
            id,
            bounds,
            members: RwLock::new(AHashSet::new()),
        }
    }

    /// Returns `true` if the entity was not already a member.
    pub fn add(&self, entity_id: EntityId) -> bool {
        self.members.write().insert(entity_id)
    }

    /// Returns `true` if the entity was a member.
    pub fn remove(&self, entity_id: EntityId) -> bool {
        self.members.write().remove(&entity_id)
    }

    pub fn members(&self) -> Vec<EntityId> {
        self.members.read().iter().copied().collect()
    }

    pub fn contains(&self, entity_id: EntityId) -> bool {
        self.members.read().contains(&entity_id)
    }

    pub fn len(&self) -> usize {
        self.members.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.read().is_empty()
    }

    pub(crate) fn read_members(&self) -> RwLockReadGuard<'_, AHashSet<EntityId>> {
        self.members.read()
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut members = self.members();
        members.sort_unstable();
        write!(
            f,
            "Cell id: {}, minX: {}, maxX: {}, minY: {}, maxY: {}, members: {:?}",
            self.id, self.bounds.min_x, self.bounds.max_x, self.bounds.min_y, self.bounds.max_y, members
        )
    }
}

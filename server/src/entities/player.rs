// aoi_server/server/src/entities/player.rs
use crate::concurrent::spatial_index::GridIndex;
use crate::core::constants::{
    MSG_BROADCAST, MSG_SYNC_PID, SPAWN_ORIGIN_X, SPAWN_ORIGIN_Z, SPAWN_SPREAD_X, SPAWN_SPREAD_Z,
};
use crate::core::error::{AoiResult, ConnectionError, ConnectionResult};
use crate::core::types::{CellResolution, EntityId};
use crate::network::connection::Connection;
use bytes::Bytes;
use dashmap::DashMap;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// `tp` value of a position broadcast.
pub const BROADCAST_POSITION: u32 = 2;

// Player ID source, injected wherever players are created
#[derive(Debug)]
pub struct PlayerIdGenerator {
    next: AtomicU64,
}

impl PlayerIdGenerator {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    pub fn starting_at(first: EntityId) -> Self {
        PlayerIdGenerator { next: AtomicU64::new(first) }
    }

    pub fn next_id(&self) -> EntityId {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for PlayerIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionMsg {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub v: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncPidMsg {
    pub pid: EntityId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BroadcastMsg {
    pub pid: EntityId,
    pub tp: u32,
    pub pos: PositionMsg,
}

/// A connected player. `x`/`z` span the ground plane, `y` is height and is
/// never handed to the AOI grid.
#[derive(Clone)]
pub struct Player {
    pub id: EntityId,
    connection: Option<Arc<dyn Connection>>,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub rotation: f32,
}

impl std::fmt::Debug for Player {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Player")
            .field("id", &self.id)
            .field("conn_id", &self.connection.as_ref().map(|c| c.conn_id()))
            .field("x", &self.x)
            .field("y", &self.y)
            .field("z", &self.z)
            .field("rotation", &self.rotation)
            .finish()
    }
}

impl Player {
    pub fn new(id: EntityId, connection: Option<Arc<dyn Connection>>, x: f32, y: f32, z: f32) -> Self {
        Player { id, connection, x, y, z, rotation: 0.0 }
    }

    /// New player somewhere in the spawn area, on the ground, facing 0.
    pub fn spawn<R: Rng + ?Sized>(
        connection: Option<Arc<dyn Connection>>,
        ids: &PlayerIdGenerator,
        rng: &mut R,
    ) -> Self {
        let x = SPAWN_ORIGIN_X + rng.gen_range(0..SPAWN_SPREAD_X) as f32;
        let z = SPAWN_ORIGIN_Z + rng.gen_range(0..SPAWN_SPREAD_Z) as f32;
        Self::new(ids.next_id(), connection, x, 0.0, z)
    }

    pub fn connection(&self) -> Option<&Arc<dyn Connection>> {
        self.connection.as_ref()
    }

    pub fn position_msg(&self) -> PositionMsg {
        PositionMsg { x: self.x, y: self.y, z: self.z, v: self.rotation }
    }

    pub fn send_msg<T: Serialize>(&self, msg_id: u32, data: &T) -> ConnectionResult<()> {
        let payload = serde_json::to_vec(data)?;
        let conn = self.connection.as_ref().ok_or(ConnectionError::Closed)?;
        conn.send_msg(msg_id, Bytes::from(payload))
    }

    pub fn sync_pid(&self) -> ConnectionResult<()> {
        self.send_msg(MSG_SYNC_PID, &SyncPidMsg { pid: self.id })
    }

    pub fn broadcast_start_position(&self) -> ConnectionResult<()> {
        self.send_msg(
            MSG_BROADCAST,
            &BroadcastMsg { pid: self.id, tp: BROADCAST_POSITION, pos: self.position_msg() },
        )
    }

    pub fn enter_world(&self, grid: &GridIndex) -> AoiResult<CellResolution> {
        let resolution = grid.add_entity_at_position(self.id, self.x, self.z)?;
        if let Some(diag) = resolution.diagnostic() {
            warn!("Player {} entered outside the world: {}", self.id, diag);
        }
        Ok(resolution)
    }

    pub fn leave_world(&self, grid: &GridIndex) -> AoiResult<CellResolution> {
        grid.remove_entity_at_position(self.id, self.x, self.z)
    }

    /// Applies a new pose and re-indexes the player when it crossed into another
    /// cell. Returns whether the cell changed.
    pub fn move_to(&mut self, grid: &GridIndex, x: f32, y: f32, z: f32, rotation: f32) -> AoiResult<bool> {
        let old_cell = grid.cell_id_for_position(self.x, self.z)?.cell_id;
        let new_cell = grid.cell_id_for_position(x, z)?.cell_id;
        let changed = old_cell != new_cell;
        if changed {
            grid.remove_entity_at_position(self.id, self.x, self.z)?;
            grid.add_entity_at_position(self.id, x, z)?;
            debug!("Player {} moved from cell {} to cell {}", self.id, old_cell, new_cell);
        }
        self.x = x;
        self.y = y;
        self.z = z;
        self.rotation = rotation;
        Ok(changed)
    }

    /// Everyone else in this player's nine-block.
    pub fn surrounding_player_ids(&self, grid: &GridIndex) -> AoiResult<Vec<EntityId>> {
        let mut ids = grid.entity_ids_near(self.x, self.z)?;
        ids.retain(|&id| id != self.id);
        Ok(ids)
    }
}

// Player Manager
pub struct PlayerManager {
    pub id_pool: Arc<PlayerIdGenerator>,
    players: DashMap<EntityId, Player>,
    grid: Arc<GridIndex>,
}

impl PlayerManager {
    pub fn new(grid: Arc<GridIndex>, id_pool: Arc<PlayerIdGenerator>) -> Self {
        PlayerManager {
            id_pool,
            players: DashMap::new(),
            grid,
        }
    }

    pub fn grid(&self) -> &Arc<GridIndex> {
        &self.grid
    }

    /// Spawns a player, indexes it, and greets it with its id and spawn point.
    pub fn add_player<R: Rng + ?Sized>(
        &self,
        connection: Option<Arc<dyn Connection>>,
        rng: &mut R,
    ) -> AoiResult<EntityId> {
        let player = Player::spawn(connection, &self.id_pool, rng);
        player.enter_world(&self.grid)?;
        if let Err(e) = player.sync_pid().and_then(|_| player.broadcast_start_position()) {
            warn!("Could not greet player {}: {}", player.id, e);
        }
        let id = player.id;
        self.players.insert(id, player);
        Ok(id)
    }

    pub fn remove_player(&self, player_id: EntityId) -> AoiResult<Option<Player>> {
        match self.players.remove(&player_id) {
            Some((_, player)) => {
                player.leave_world(&self.grid)?;
                if let Some(conn) = player.connection() {
                    conn.stop();
                }
                Ok(Some(player))
            }
            None => {
                warn!("Attempted to remove player {} but they were not found.", player_id);
                Ok(None)
            }
        }
    }

    /// Returns `Ok(None)` for unknown players, otherwise whether the cell changed.
    pub fn update_player_position(
        &self,
        player_id: EntityId,
        x: f32,
        y: f32,
        z: f32,
        rotation: f32,
    ) -> AoiResult<Option<bool>> {
        match self.players.get_mut(&player_id) {
            Some(mut player) => player.move_to(&self.grid, x, y, z, rotation).map(Some),
            None => Ok(None),
        }
    }

    /// Sends the player's current pose to every other player in its nine-block.
    /// Returns how many players received it.
    pub fn broadcast_position(&self, player_id: EntityId) -> AoiResult<usize> {
        let (msg, neighbors) = match self.players.get(&player_id) {
            Some(player) => (
                BroadcastMsg { pid: player.id, tp: BROADCAST_POSITION, pos: player.position_msg() },
                player.surrounding_player_ids(&self.grid)?,
            ),
            None => return Ok(0),
        };

        let mut delivered = 0;
        for neighbor_id in neighbors {
            let neighbor = match self.players.get(&neighbor_id) {
                Some(entry) => entry.value().clone(),
                None => continue,
            };
            match neighbor.send_msg(MSG_BROADCAST, &msg) {
                Ok(()) => delivered += 1,
                Err(e) => debug!("Broadcast from {} to {} dropped: {}", player_id, neighbor_id, e),
            }
        }
        Ok(delivered)
    }

    pub fn get_player(&self, player_id: EntityId) -> Option<Player> {
        self.players.get(&player_id).map(|entry| entry.value().clone())
    }

    pub fn player_ids(&self) -> Vec<EntityId> {
        self.players.iter().map(|entry| *entry.key()).collect()
    }

    pub fn for_each_player<F>(&self, mut func: F)
    where
        F: FnMut(&Player),
    {
        for entry in self.players.iter() {
            func(entry.value());
        }
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }
}

// aoi_server/server/tests/performance/concurrent_membership.rs

use aoi_server_core::concurrent::spatial_index::GridIndex;
use aoi_server_core::core::types::{EntityId, WorldBounds};
use rayon::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

const THREADS: usize = 8;
const ENTITIES_PER_THREAD: u64 = 2_000;

fn grid() -> Arc<GridIndex> {
    Arc::new(GridIndex::create(WorldBounds::new(0, 1600, 0, 1600), 16, 16).unwrap())
}

#[test]
fn disjoint_writers_lose_no_updates() {
    let grid = grid();
    let cells_per_thread = grid.cell_count() / THREADS;

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let grid = grid.clone();
            thread::spawn(move || {
                let base = t as u64 * ENTITIES_PER_THREAD;
                for i in 0..ENTITIES_PER_THREAD {
                    let cell = t * cells_per_thread + (i as usize % cells_per_thread);
                    grid.add_entity(base + i, cell).unwrap();
                }
                // Remove every third one again.
                for i in (0..ENTITIES_PER_THREAD).step_by(3) {
                    let cell = t * cells_per_thread + (i as usize % cells_per_thread);
                    grid.remove_entity(base + i, cell).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let sequential = GridIndex::create(grid.world_bounds(), grid.column_count(), grid.row_count()).unwrap();
    for t in 0..THREADS {
        let base = t as u64 * ENTITIES_PER_THREAD;
        for i in 0..ENTITIES_PER_THREAD {
            let cell = t * cells_per_thread + (i as usize % cells_per_thread);
            sequential.add_entity(base + i, cell).unwrap();
        }
        for i in (0..ENTITIES_PER_THREAD).step_by(3) {
            let cell = t * cells_per_thread + (i as usize % cells_per_thread);
            sequential.remove_entity(base + i, cell).unwrap();
        }
    }

    for (concurrent, expected) in grid.cells().zip(sequential.cells()) {
        let mut got = concurrent.members();
        let mut want = expected.members();
        got.sort_unstable();
        want.sort_unstable();
        assert_eq!(got, want, "cell {}", concurrent.id);
    }
}

#[test]
fn migrating_entities_never_appear_twice() {
    let grid = grid();
    let movers: Vec<EntityId> = (1..=256).collect();
    for &id in &movers {
        grid.add_entity_at_position(id, 50.0, 50.0).unwrap();
    }

    let reader = {
        let grid = grid.clone();
        thread::spawn(move || {
            for _ in 0..2_000 {
                let seen = grid.entity_ids_near(150.0, 150.0).unwrap();
                let unique: HashSet<_> = seen.iter().copied().collect();
                assert_eq!(unique.len(), seen.len(), "duplicate entity in one snapshot");
            }
        })
    };

    // Each mover hops back and forth between two adjacent cells.
    movers.par_iter().for_each(|&id| {
        let (mut x, mut y) = (50.0f32, 50.0f32);
        for step in 0..200 {
            let (nx, ny) = if step % 2 == 0 { (150.0, 150.0) } else { (50.0, 50.0) };
            grid.remove_entity_at_position(id, x, y).unwrap();
            grid.add_entity_at_position(id, nx, ny).unwrap();
            x = nx;
            y = ny;
        }
    });
    reader.join().unwrap();

    // 200 hops end where they started.
    let home = grid.cell_id_for_position(50.0, 50.0).unwrap().cell_id;
    let mut settled = grid.entity_ids_in_cell(home).unwrap();
    settled.sort_unstable();
    assert_eq!(settled, movers);
    assert_eq!(grid.stats().total_entities, movers.len());
}

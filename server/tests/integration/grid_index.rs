// aoi_server/server/tests/integration/grid_index.rs

use aoi_server_core::core::error::AoiError;
use aoi_server_core::core::types::{EntityId, WorldBounds};
use aoi_server_core::concurrent::spatial_index::GridIndex;
use proptest::prelude::*;

fn example_grid() -> GridIndex {
    GridIndex::create(WorldBounds::new(0, 250, 0, 250), 5, 5).expect("valid grid")
}

fn grid_distance(grid: &GridIndex, a: usize, b: usize) -> usize {
    let cols = grid.column_count();
    let (ax, ay) = (a % cols, a / cols);
    let (bx, by) = (b % cols, b / cols);
    ax.abs_diff(bx).max(ay.abs_diff(by))
}

#[test]
fn worked_example_from_world_configuration() {
    let grid = example_grid();
    assert_eq!(grid.cell_width(), 50);
    assert_eq!(grid.cell_height(), 50);
    assert_eq!(grid.cell_id_for_position(10.0, 10.0).unwrap().cell_id, 0);
    assert_eq!(grid.cell_id_for_position(60.0, 10.0).unwrap().cell_id, 1);
    assert_eq!(grid.cell_id_for_position(10.0, 60.0).unwrap().cell_id, 5);
    assert_eq!(grid.neighbor_cell_ids(0).into_vec(), vec![0, 1, 5, 6]);

    grid.add_entity_at_position(42, 10.0, 10.0).unwrap();
    assert!(grid.entity_ids_near(60.0, 60.0).unwrap().contains(&42));
    assert!(!grid.entity_ids_near(210.0, 210.0).unwrap().contains(&42));
}

#[test]
fn corner_edge_and_interior_neighbor_counts() {
    let grid = GridIndex::create(WorldBounds::new(-70, 70, 0, 60), 7, 4).unwrap();
    let (cols, rows) = (grid.column_count(), grid.row_count());
    let corners = [0, cols - 1, cols * (rows - 1), cols * rows - 1];

    for cell in grid.cells() {
        let id = cell.id;
        let (column, row) = (id % cols, id / cols);
        let on_column_edge = column == 0 || column == cols - 1;
        let on_row_edge = row == 0 || row == rows - 1;
        let neighbors = grid.neighbor_cell_ids(id);
        assert!(neighbors.contains(&id));

        let expected = if corners.contains(&id) {
            4
        } else if on_column_edge || on_row_edge {
            6
        } else {
            9
        };
        assert_eq!(neighbors.len(), expected, "cell {}", id);
        assert!(neighbors.iter().all(|&n| grid_distance(&grid, id, n) <= 1));
        assert!(neighbors.windows(2).all(|w| w[0] < w[1]));
    }
}

#[test]
fn unknown_cell_operations_fail_cleanly() {
    let grid = example_grid();
    grid.add_entity(1, 3).unwrap();
    assert!(matches!(grid.entity_ids_in_cell(25), Err(AoiError::UnknownCellId(25))));
    assert!(matches!(grid.add_entity(2, 25), Err(AoiError::UnknownCellId(25))));
    assert!(matches!(grid.remove_entity(1, 26), Err(AoiError::UnknownCellId(26))));
    assert!(grid.neighbor_cell_ids(25).is_empty());
    assert_eq!(grid.entity_ids_in_cell(3).unwrap(), vec![1]);
}

#[test]
fn outside_positions_resolve_to_edge_cells() {
    let grid = example_grid();
    let resolution = grid.add_entity_at_position(5, -100.0, 400.0).unwrap();
    assert_eq!(resolution.cell_id, 20);
    assert!(resolution.clamped);
    assert!(matches!(resolution.diagnostic(), Some(AoiError::PositionOutOfBounds { .. })));
    assert_eq!(grid.entity_ids_in_cell(20).unwrap(), vec![5]);
    assert_eq!(grid.entity_ids_near(0.0, 249.0).unwrap(), vec![5]);
}

fn in_world() -> impl Strategy<Value = (f32, f32)> {
    (0.0f32..250.0, 0.0f32..250.0)
}

proptest! {
    #[test]
    fn in_world_positions_never_clamp(
        (min_x, min_y) in (-1000i32..1000, -1000i32..1000),
        (w, h) in (1i32..2000, 1i32..2000),
        (cols, rows) in (1usize..20, 1usize..20),
        (fx, fy) in (0.0f64..1.0, 0.0f64..1.0),
    ) {
        prop_assume!(w as usize >= cols && h as usize >= rows);
        let world = WorldBounds::new(min_x, min_x + w, min_y, min_y + h);
        let grid = GridIndex::create(world, cols, rows).unwrap();
        let x = (min_x as f64 + fx * w as f64) as f32;
        let y = (min_y as f64 + fy * h as f64) as f32;
        prop_assume!(world.contains(x, y));

        let resolution = grid.cell_id_for_position(x, y).unwrap();
        prop_assert!(resolution.cell_id < cols * rows);
        prop_assert!(!resolution.clamped);

        let bounds = grid.cell(resolution.cell_id).unwrap().bounds;
        prop_assert!(x as f64 >= bounds.min_x as f64 && (x as f64) < bounds.max_x as f64);
        prop_assert!(y as f64 >= bounds.min_y as f64 && (y as f64) < bounds.max_y as f64);
    }

    #[test]
    fn add_then_remove_is_identity(
        existing in prop::collection::vec((1u64..1000, in_world()), 0..40),
        (x, y) in in_world(),
    ) {
        let grid = example_grid();
        for (id, (ex, ey)) in &existing {
            grid.add_entity_at_position(*id, *ex, *ey).unwrap();
        }
        let before: Vec<Vec<EntityId>> = grid.cells().map(|c| {
            let mut m = c.members();
            m.sort_unstable();
            m
        }).collect();

        let fresh = 5000;
        grid.add_entity_at_position(fresh, x, y).unwrap();
        grid.remove_entity_at_position(fresh, x, y).unwrap();

        let after: Vec<Vec<EntityId>> = grid.cells().map(|c| {
            let mut m = c.members();
            m.sort_unstable();
            m
        }).collect();
        prop_assert_eq!(before, after);
    }

    #[test]
    fn visibility_matches_chebyshev_distance(
        (px, py) in in_world(),
        (qx, qy) in in_world(),
    ) {
        let grid = example_grid();
        let home = grid.add_entity_at_position(7, px, py).unwrap().cell_id;
        let observer = grid.cell_id_for_position(qx, qy).unwrap().cell_id;
        let visible = grid.entity_ids_near(qx, qy).unwrap().contains(&7);
        prop_assert_eq!(visible, grid_distance(&grid, home, observer) <= 1);
    }
}

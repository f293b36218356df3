//! Integration tests for the quad-tree database on a global grid.

use binstore::quadtree::Lifecycle;
use binstore::{BinStoreError, BinStoreResult, GridPoint, QuadTreeDatabase};
use binstore_int_test::test_util::{
    cell_values, cleanup, create_grid_context, run_test, TestContext,
};
use std::fs;

const WIDTH: usize = 4320;
const HEIGHT: usize = 2160;
const NUM_VARS: usize = 3;

fn create_global_context() -> BinStoreResult<TestContext> {
    create_grid_context(WIDTH, HEIGHT)
}

fn scattered_cells() -> Vec<(usize, usize)> {
    vec![
        (0, 0),
        (0, WIDTH - 1),
        (HEIGHT - 1, 0),
        (HEIGHT - 1, WIDTH - 1),
        (1080, 2160),
        (1079, 2159),
        (17, 34),
        (500, 3000),
    ]
}

#[test]
fn test_global_grid_geometry() {
    run_test(
        create_global_context,
        |ctx| {
            let db = QuadTreeDatabase::create(ctx.path(), WIDTH, HEIGHT, 64, 0, NUM_VARS)?;
            let geometry = db.geometry();
            assert_eq!(geometry.num_layers, 7);
            assert_eq!(geometry.tile_width, 34);
            assert_eq!(geometry.tile_height, 17);
            // ceil(4320 / 34) + 1
            assert_eq!(db.num_buffers(), 129);
            assert_eq!(db.lifecycle(), Lifecycle::Created);
            assert!(db.leaf_layer_indices().is_empty());
            db.close()?;
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_corner_tiles_are_named_by_path() {
    run_test(
        create_global_context,
        |ctx| {
            let db = QuadTreeDatabase::create(ctx.path(), WIDTH, HEIGHT, 64, 0, NUM_VARS)?;
            db.write(GridPoint::from_row_col(0, 0), &[1.0, 2.0, 3.0])?;
            db.write(
                GridPoint::from_row_col(HEIGHT - 1, WIDTH - 1),
                &[4.0, 5.0, 6.0],
            )?;

            assert_eq!(db.leaf_layer_indices(), vec!["1111111", "3333333"]);
            assert!(db.is_leaf("1111111"));
            assert!(!db.is_leaf("111111"));

            let tile_bytes = (34 * 17 * NUM_VARS * 4) as u64;
            for index in ["1111111", "3333333"] {
                let path = db.leaf_file_path(index);
                assert_eq!(fs::metadata(&path)?.len(), tile_bytes);
            }
            db.close()?;
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_scattered_writes_survive_reopen() {
    run_test(
        create_global_context,
        |ctx| {
            let leaves = {
                let db = QuadTreeDatabase::create(ctx.path(), WIDTH, HEIGHT, 64, 0, NUM_VARS)?;
                for (row, col) in scattered_cells() {
                    db.write(
                        GridPoint::from_row_col(row, col),
                        &cell_values(row, col, NUM_VARS),
                    )?;
                }
                let leaves = db.leaf_layer_indices();
                db.close()?;
                leaves
            };

            let db = QuadTreeDatabase::open(ctx.path())?;
            assert_eq!(db.lifecycle(), Lifecycle::Opened);
            assert_eq!(db.leaf_layer_indices(), leaves);
            assert_eq!(db.stats().disk_reads, 0);

            let mut values = vec![0.0f32; NUM_VARS];
            for (row, col) in scattered_cells() {
                db.read(GridPoint::from_row_col(row, col), &mut values)?;
                assert_eq!(values, cell_values(row, col, NUM_VARS));
            }

            // Same tile as (17, 34) but never written
            db.read(GridPoint::from_row_col(18, 35), &mut values)?;
            assert!(values.iter().all(|v| *v == 0.0));

            // A tile that was never created
            db.read(GridPoint::from_row_col(2000, 100), &mut values)?;
            assert!(values.iter().all(|v| *v == 0.0));
            assert_eq!(db.leaf_layer_indices(), leaves);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_reopen_ignores_foreign_files() {
    run_test(
        create_global_context,
        |ctx| {
            {
                let db = QuadTreeDatabase::create(ctx.path(), WIDTH, HEIGHT, 64, 0, NUM_VARS)?;
                db.write(GridPoint::from_row_col(5, 5), &[1.0, 1.0, 1.0])?;
                db.close()?;
            }
            fs::write(ctx.path().join("notes.txt"), "not a tile")?;
            fs::write(ctx.path().join("9.dat"), [0u8; 16])?;

            let db = QuadTreeDatabase::open(ctx.path())?;
            assert_eq!(db.leaf_layer_indices(), vec!["1111111"]);
            let mut values = vec![0.0f32; NUM_VARS];
            db.read(GridPoint::from_row_col(5, 5), &mut values)?;
            assert_eq!(values, vec![1.0, 1.0, 1.0]);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_delete_removes_database() {
    run_test(
        create_global_context,
        |ctx| {
            let dir = ctx.path().join("db");
            let db = QuadTreeDatabase::create(&dir, WIDTH, HEIGHT, 64, 0, NUM_VARS)?;
            db.write(GridPoint::from_row_col(100, 100), &[1.0, 2.0, 3.0])?;
            db.delete()?;
            assert_eq!(db.lifecycle(), Lifecycle::Deleted);
            assert!(!dir.exists());

            let mut values = vec![0.0f32; NUM_VARS];
            assert!(matches!(
                db.read(GridPoint::from_row_col(100, 100), &mut values),
                Err(BinStoreError::Closed)
            ));
            assert!(matches!(
                QuadTreeDatabase::open(&dir),
                Err(BinStoreError::ConfigDirectoryInvalid(_))
            ));
            Ok(())
        },
        cleanup,
    )
}

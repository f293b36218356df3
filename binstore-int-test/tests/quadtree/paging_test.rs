//! Tile paging through a buffer pool much smaller than the tile count.

use binstore::{GridPoint, QuadTreeDatabase};
use binstore_int_test::test_util::{cell_values, cleanup, create_grid_context, run_test};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::sync::{Arc, Barrier};
use std::thread;

const SIZE: usize = 512;
const TILE: usize = 32;
const NUM_VARS: usize = 2;

#[test]
fn test_row_scan_loads_each_tile_once() {
    run_test(
        || create_grid_context(SIZE, SIZE),
        |ctx| {
            let db = QuadTreeDatabase::create(ctx.path(), SIZE, SIZE, TILE, 0, NUM_VARS)?;
            assert_eq!(db.geometry().tile_width, 32);
            assert_eq!(db.num_buffers(), 17);

            for row in 0..SIZE {
                for col in 0..SIZE {
                    db.write(
                        GridPoint::from_row_col(row, col),
                        &cell_values(row, col, NUM_VARS),
                    )?;
                }
            }

            let stats = db.stats();
            assert_eq!(stats.leaf_count, 256);
            assert_eq!(stats.disk_reads, 256);
            assert_eq!(stats.evictions, 256 - 17);
            assert_eq!(stats.resident_buffers, 17);
            db.close()?;
            assert_eq!(db.stats().resident_buffers, 0);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_column_scan_after_reopen() {
    run_test(
        || create_grid_context(SIZE, SIZE),
        |ctx| {
            {
                let db = QuadTreeDatabase::create(ctx.path(), SIZE, SIZE, TILE, 0, NUM_VARS)?;
                for row in 0..SIZE {
                    for col in 0..SIZE {
                        db.write(
                            GridPoint::from_row_col(row, col),
                            &cell_values(row, col, NUM_VARS),
                        )?;
                    }
                }
                db.close()?;
            }

            let db = QuadTreeDatabase::open(ctx.path())?;
            let mut values = vec![0.0f32; NUM_VARS];
            for col in 0..SIZE {
                for row in 0..SIZE {
                    db.read(GridPoint::from_row_col(row, col), &mut values)?;
                    assert_eq!(values, cell_values(row, col, NUM_VARS));
                }
            }
            let stats = db.stats();
            assert!(stats.resident_buffers <= stats.buffer_slots);
            assert!(stats.evictions > 0);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_random_updates_are_never_lost() {
    run_test(
        || create_grid_context(SIZE, SIZE),
        |ctx| {
            let mut rng = StdRng::seed_from_u64(42);
            let mut expected: HashMap<(usize, usize), Vec<f32>> = HashMap::new();
            {
                let db = QuadTreeDatabase::create(ctx.path(), SIZE, SIZE, TILE, 0, NUM_VARS)?;
                for i in 0..20_000 {
                    let row = rng.random_range(0..SIZE);
                    let col = rng.random_range(0..SIZE);
                    let values = vec![i as f32, -(i as f32)];
                    db.write(GridPoint::from_row_col(row, col), &values)?;
                    expected.insert((row, col), values);
                }
                assert!(db.stats().evictions > 0);
                db.close()?;
            }

            let db = QuadTreeDatabase::open(ctx.path())?;
            let mut values = vec![0.0f32; NUM_VARS];
            for ((row, col), want) in &expected {
                db.read(GridPoint::from_row_col(*row, *col), &mut values)?;
                assert_eq!(&values, want, "cell ({}, {})", row, col);
            }
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_concurrent_writers() {
    run_test(
        || create_grid_context(SIZE, SIZE),
        |ctx| {
            let db = Arc::new(QuadTreeDatabase::create(
                ctx.path(),
                SIZE,
                SIZE,
                TILE,
                0,
                NUM_VARS,
            )?);

            let num_threads = 4;
            let barrier = Arc::new(Barrier::new(num_threads));
            let mut handles = vec![];

            for thread_id in 0..num_threads {
                let db = Arc::clone(&db);
                let barrier = Arc::clone(&barrier);
                handles.push(thread::spawn(move || {
                    barrier.wait();
                    // Each thread owns every num_threads-th row
                    for row in (thread_id..SIZE).step_by(num_threads) {
                        for col in (0..SIZE).step_by(3) {
                            db.write(
                                GridPoint::from_row_col(row, col),
                                &cell_values(row, col, NUM_VARS),
                            )
                            .unwrap();
                        }
                    }
                }));
            }

            for handle in handles {
                handle.join().unwrap();
            }

            let mut values = vec![0.0f32; NUM_VARS];
            for row in 0..SIZE {
                for col in (0..SIZE).step_by(3) {
                    db.read(GridPoint::from_row_col(row, col), &mut values)?;
                    assert_eq!(values, cell_values(row, col, NUM_VARS));
                }
            }
            db.close()?;
            Ok(())
        },
        cleanup,
    )
}

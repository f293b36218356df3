//! Every store kind returns the same bins for the same write sequence.

use binstore::{BinStore, BinStoreFactory, GridPoint, MemoryBinStore, VectorBin};
use binstore_int_test::test_util::{cleanup, create_test_context, run_test};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;

const NUM_VARS: usize = 3;

fn apply_writes(store: &dyn BinStore, width: usize, height: usize) -> binstore::BinStoreResult<()> {
    let mut rng = StdRng::seed_from_u64(2024);
    let mut bin = VectorBin::new(NUM_VARS);
    for _ in 0..5_000 {
        let pos = GridPoint::new(rng.random_range(0..width), rng.random_range(0..height));
        store.read(pos, &mut bin)?;
        for value in bin.values_mut() {
            *value += rng.random_range(0.0f32..1.0);
        }
        store.write(pos, &bin)?;
    }
    Ok(())
}

#[test]
fn test_stores_are_equivalent() {
    run_test(
        create_test_context,
        |ctx| {
            let (width, height) = (ctx.width(), ctx.height());
            let factory = BinStoreFactory::new().with_tile_size(16);

            let memory = MemoryBinStore::new(ctx.locator(), NUM_VARS);
            let file = factory.create_file_store(&ctx.sub_ctx("file"), NUM_VARS)?;
            let quadtree = factory.create_temporal_store(&ctx.sub_ctx("quadtree"), NUM_VARS)?;

            apply_writes(&memory, width, height)?;
            apply_writes(file.as_ref(), width, height)?;
            apply_writes(quadtree.as_ref(), width, height)?;
            file.close()?;
            quadtree.close()?;

            let file = factory.open_store(&ctx.sub_ctx("file"))?;
            let quadtree = factory.open_store(&ctx.sub_ctx("quadtree"))?;

            let mut want = VectorBin::new(NUM_VARS);
            let mut got = VectorBin::new(NUM_VARS);
            for row in 0..height {
                for col in 0..width {
                    let pos = GridPoint::from_row_col(row, col);
                    memory.read(pos, &mut want)?;
                    file.read(pos, &mut got)?;
                    assert_eq!(got, want, "file store at {}", pos);
                    quadtree.read(pos, &mut got)?;
                    assert_eq!(got, want, "quad-tree store at {}", pos);
                }
            }
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_store_shared_between_threads() {
    run_test(
        create_test_context,
        |ctx| {
            let store: Arc<dyn BinStore> = Arc::from(
                BinStoreFactory::new()
                    .with_memory_threshold(0)
                    .create_spatial_store(ctx.store_ctx(), 1)?,
            );

            let handles: Vec<_> = (0..4)
                .map(|t| {
                    let store = Arc::clone(&store);
                    std::thread::spawn(move || {
                        for col in (t..720).step_by(4) {
                            store
                                .write(
                                    GridPoint::new(col, 7),
                                    &VectorBin::from_values(vec![col as f32]),
                                )
                                .unwrap();
                        }
                    })
                })
                .collect();
            for handle in handles {
                handle.join().unwrap();
            }

            let mut bin = VectorBin::new(1);
            for col in 0..720 {
                store.read(GridPoint::new(col, 7), &mut bin)?;
                assert_eq!(bin.values(), &[col as f32]);
            }
            store.close()?;
            Ok(())
        },
        cleanup,
    )
}

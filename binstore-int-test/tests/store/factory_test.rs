//! Factory selection and reopening through a directory context.

use binstore::{
    BinStoreContext, BinStoreError, BinStoreFactory, GridPoint, StorageType, VectorBin,
};
use binstore_int_test::test_util::{
    cell_values, cleanup, create_grid_context, create_test_context, run_test,
};
use std::fs;

#[test]
fn test_spatial_store_switches_on_threshold() {
    run_test(
        create_test_context,
        |ctx| {
            // 720 * 360 * 4 floats
            let floats = ctx.width() * ctx.height() * 4;

            let below = BinStoreFactory::new().with_memory_threshold(floats + 1);
            let store = below.create_spatial_store(&ctx.sub_ctx("below"), 4)?;
            assert_eq!(store.storage_type(), StorageType::Memory);
            store.close()?;

            let at = BinStoreFactory::new().with_memory_threshold(floats);
            let store = at.create_spatial_store(&ctx.sub_ctx("at"), 4)?;
            assert_eq!(store.storage_type(), StorageType::QuadTree);
            assert!(ctx.path().join("at").join("quadtree").is_dir());
            store.delete()?;
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_temporal_store_across_runs() {
    run_test(
        || create_grid_context(4320, 2160),
        |ctx| {
            let factory = BinStoreFactory::default();
            let cells = [(0, 0), (1080, 2160), (2159, 4319)];
            {
                let store = factory.create_temporal_store(ctx.store_ctx(), 5)?;
                for (row, col) in cells {
                    store.write(
                        GridPoint::from_row_col(row, col),
                        &VectorBin::from_values(cell_values(row, col, 5)),
                    )?;
                }
                store.close()?;
            }
            assert_eq!(
                ctx.store_ctx().storage_type_tag()?.as_deref(),
                Some("quadtree")
            );

            let store = factory.open_store(ctx.store_ctx())?;
            assert_eq!(store.num_vars(), 5);
            let mut bin = VectorBin::new(5);
            for (row, col) in cells {
                store.read(GridPoint::from_row_col(row, col), &mut bin)?;
                assert_eq!(bin.values(), cell_values(row, col, 5).as_slice());
            }
            store.read(GridPoint::from_row_col(10, 4000), &mut bin)?;
            assert!(bin.is_zero());
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_file_store_across_runs() {
    run_test(
        create_test_context,
        |ctx| {
            let factory = BinStoreFactory::default();
            {
                let store = factory.create_file_store(ctx.store_ctx(), 2)?;
                store.write(
                    GridPoint::from_row_col(359, 719),
                    &VectorBin::from_values(vec![0.5, 0.25]),
                )?;
                store.close()?;
            }

            let store = factory.open_store(ctx.store_ctx())?;
            assert_eq!(store.storage_type(), StorageType::File);
            let mut bin = VectorBin::new(2);
            store.read(GridPoint::from_row_col(359, 719), &mut bin)?;
            assert_eq!(bin.values(), &[0.5, 0.25]);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_open_rejects_unknown_storage() {
    run_test(
        create_test_context,
        |ctx| {
            fs::write(ctx.path().join("store.properties"), "storage_type=netcdf\n")?;
            assert!(matches!(
                BinStoreFactory::default().open_store(ctx.store_ctx()),
                Err(BinStoreError::UnsupportedStorageType(tag)) if tag == "netcdf"
            ));

            // No tag at all
            assert!(matches!(
                BinStoreFactory::default().open_store(&ctx.sub_ctx("empty")),
                Err(BinStoreError::ConfigDirectoryInvalid(_))
            ));
            fs::create_dir(ctx.path().join("empty"))?;
            assert!(matches!(
                BinStoreFactory::default().open_store(&ctx.sub_ctx("empty")),
                Err(BinStoreError::UnsupportedStorageType(_))
            ));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_deleted_temporal_store_cannot_reopen() {
    run_test(
        create_test_context,
        |ctx| {
            let factory = BinStoreFactory::default();
            let store = factory.create_temporal_store(ctx.store_ctx(), 1)?;
            store.write(GridPoint::new(1, 1), &VectorBin::from_values(vec![1.0]))?;
            store.delete()?;
            assert!(!ctx.path().join("quadtree").exists());

            // The context tag survives; the database is gone
            assert!(matches!(
                factory.open_store(ctx.store_ctx()),
                Err(BinStoreError::ConfigDirectoryInvalid(_))
            ));
            Ok(())
        },
        cleanup,
    )
}

use binstore::{BinStoreFactory, BinStoreResult, GridPoint, VectorBin};
use binstore_int_test::test_util::{cleanup, create_grid_context};
use rand::Rng;

const WIDTH: usize = 8640;
const HEIGHT: usize = 4320;
const NUM_VARS: usize = 5;

fn main() -> BinStoreResult<()> {
    colog::init();
    println!("Starting stress test...");
    let ctx = create_grid_context(WIDTH, HEIGHT)?;
    let factory = BinStoreFactory::default();

    let store = factory.create_temporal_store(ctx.store_ctx(), NUM_VARS)?;
    let mut rng = rand::rng();

    let count = 1_000_000;
    let start = std::time::Instant::now();
    let mut bin = VectorBin::new(NUM_VARS);
    for _ in 0..count {
        let pos = GridPoint::new(rng.random_range(0..WIDTH), rng.random_range(0..HEIGHT));
        store.read(pos, &mut bin)?;
        for value in bin.values_mut() {
            *value += 1.0;
        }
        store.write(pos, &bin)?;
    }
    println!("Accumulated {} random bins in {:?}", count, start.elapsed());

    let start = std::time::Instant::now();
    for row in 0..HEIGHT {
        for col in 0..WIDTH {
            store.write(
                GridPoint::from_row_col(row, col),
                &VectorBin::from_values(vec![row as f32; NUM_VARS]),
            )?;
        }
    }
    println!("Wrote every bin row by row in {:?}", start.elapsed());

    let start = std::time::Instant::now();
    store.close()?;
    println!("Closed store in {:?}", start.elapsed());

    let start = std::time::Instant::now();
    let store = factory.open_store(ctx.store_ctx())?;
    let mut sum = 0.0f64;
    for row in 0..HEIGHT {
        for col in 0..WIDTH {
            store.read(GridPoint::from_row_col(row, col), &mut bin)?;
            sum += bin.values()[0] as f64;
        }
    }
    println!("Read back every bin in {:?} (checksum {})", start.elapsed(), sum);

    store.delete()?;
    cleanup(ctx)?;
    Ok(())
}

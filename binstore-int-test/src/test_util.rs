use binstore::{BinStoreContext, BinStoreResult, DirectoryContext, Locator, RectangularLocator};
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use std::{env, fs, thread};

/// Grid used by tests that do not care about its size
pub const DEFAULT_WIDTH: usize = 720;
pub const DEFAULT_HEIGHT: usize = 360;

/// Runs `test` between `before` and `after`.
///
/// `after` runs even when the test fails or panics, so the test directory
/// is always cleaned up. Failures are reported with the elapsed time.
pub fn run_test<T, B, A>(before: B, test: T, after: A)
where
    T: Fn(TestContext) -> BinStoreResult<()>,
    B: Fn() -> BinStoreResult<TestContext>,
    A: Fn(TestContext) -> BinStoreResult<()>,
{
    let ctx = match before() {
        Ok(ctx) => ctx,
        Err(e) => panic!("Before run failed: {:?}", e),
    };

    let start_time = Instant::now();
    let test_ctx = ctx.clone();
    let result = std::panic::catch_unwind(AssertUnwindSafe(move || test(test_ctx)));
    let elapsed = start_time.elapsed();

    if let Err(e) = after(ctx) {
        eprintln!("Warning: After run failed: {:?}", e);
    }

    match result {
        Ok(Ok(())) => {}
        Ok(Err(e)) => panic!("Test failed after {:?}: {:?}", elapsed, e),
        Err(panic_err) => {
            let err_msg = if let Some(s) = panic_err.downcast_ref::<&str>() {
                s.to_string()
            } else if let Some(s) = panic_err.downcast_ref::<String>() {
                s.clone()
            } else {
                "Unknown panic".to_string()
            };
            panic!("Test panicked after {:?}: {}", elapsed, err_msg);
        }
    }
}

#[derive(Clone)]
pub struct TestContext {
    path: PathBuf,
    locator: Arc<RectangularLocator>,
    store_ctx: DirectoryContext,
}

impl TestContext {
    pub fn new(path: PathBuf, width: usize, height: usize) -> Self {
        let locator = Arc::new(RectangularLocator::new(width, height));
        let store_ctx = DirectoryContext::new(locator.clone(), &path);
        Self {
            path,
            locator,
            store_ctx,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn locator(&self) -> Arc<RectangularLocator> {
        self.locator.clone()
    }

    pub fn width(&self) -> usize {
        self.locator.width()
    }

    pub fn height(&self) -> usize {
        self.locator.height()
    }

    /// Context for the bin store factory, rooted at the test directory
    pub fn store_ctx(&self) -> &dyn BinStoreContext {
        &self.store_ctx
    }

    /// Context rooted at a subdirectory of the test directory
    pub fn sub_ctx(&self, name: &str) -> DirectoryContext {
        DirectoryContext::new(self.locator.clone(), self.path.join(name))
    }
}

pub fn random_path() -> PathBuf {
    let id = uuid::Uuid::new_v4();
    env::temp_dir().join(format!("binstore-{}", id))
}

pub fn create_test_context() -> BinStoreResult<TestContext> {
    create_grid_context(DEFAULT_WIDTH, DEFAULT_HEIGHT)
}

/// Test context for a `width` x `height` grid. The directory is created.
pub fn create_grid_context(width: usize, height: usize) -> BinStoreResult<TestContext> {
    let path = random_path();
    if path.exists() {
        let _ = fs::remove_dir_all(&path);
    }
    fs::create_dir_all(&path)?;
    Ok(TestContext::new(path, width, height))
}

pub fn cleanup(ctx: TestContext) -> BinStoreResult<()> {
    let max_retries = 5;
    let mut delay_ms = 20u64;

    for retry in 0..max_retries {
        match fs::remove_dir_all(ctx.path()) {
            Ok(_) => return Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) if retry < max_retries - 1 => {
                log::debug!("Retrying removal of {}: {}", ctx.path().display(), e);
                thread::sleep(Duration::from_millis(delay_ms));
                delay_ms *= 2;
            }
            Err(e) => {
                // Temp files will be cleaned up by the OS eventually
                eprintln!(
                    "Warning: Failed to remove test directory {} after {} attempts: {:?}",
                    ctx.path().display(),
                    max_retries,
                    e
                );
            }
        }
    }

    Ok(())
}

/// Deterministic test vector for a cell
pub fn cell_values(row: usize, col: usize, num_vars: usize) -> Vec<f32> {
    (0..num_vars)
        .map(|v| (row * 10_000 + col) as f32 + v as f32 * 0.25)
        .collect()
}

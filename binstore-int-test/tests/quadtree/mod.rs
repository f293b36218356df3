//! Quad-tree database integration tests.
//!
//! These exercise the database directly on realistic grid sizes, including
//! persistence across reopen and tile paging under a small buffer pool.

mod database_test;
mod paging_test;

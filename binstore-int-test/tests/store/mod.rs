//! Bin store integration tests through the factory.

mod equivalence_test;
mod factory_test;

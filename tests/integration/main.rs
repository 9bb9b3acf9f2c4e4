//! Integration test driver for the `tests/integration/` submodules.
//!
//! Each `mod` below maps to a file that exercises one subsystem of the
//! engine against the in-memory mocks in [`mock`]. All tests run on the
//! host with no network or flash.

mod admin_tests;
mod dispatch_tests;
mod mock;
mod persistence_tests;

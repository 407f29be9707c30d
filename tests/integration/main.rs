//! Integration test driver for `tests/integration/` submodules.
//!
//! Each `mod` below maps to a file that exercises the monitor against the
//! recording mocks in `mock_hw`.  No real GPIO is required.

mod lifecycle_tests;
mod mock_hw;

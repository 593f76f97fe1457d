//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises one supervisory stage
//! against mock or simulated collaborators.  All tests run on the host
//! with no real hardware required.

mod bootstrap_tests;
mod mock_machine;
mod reset_tests;
mod sim_machine_tests;
mod supervisor_tests;

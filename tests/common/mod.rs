//! Common utilities for integration tests

pub mod mock_gas;
pub mod test_helpers;

// Re-export commonly used items
#[allow(unused_imports)]
pub use mock_gas::{ConstTransport, FrozenKinetics, LinearKinetics, MockGas};
#[allow(unused_imports)]
pub use test_helpers::{counterflow_sim, free_flame_sim, spray_sim, FLOW};

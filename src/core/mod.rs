pub mod config;
pub mod error;
pub mod types;

pub use config::{DivisionFailure, SimulationConfig};
pub use error::{Result, SimError};

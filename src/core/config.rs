//! Simulation configuration with documented constants
//!
//! Every tunable that used to be a process-wide global lives here. A config
//! is built once, validated, and then owned by the [`Simulation`].
//!
//! [`Simulation`]: crate::simulation::tick::Simulation

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::{Result, SimError};
use crate::spatial::geometry::GridDims;

/// What happens to a dividing cell that has no empty neighbor to put its
/// offspring into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DivisionFailure {
    /// The parent is removed from the grid
    #[default]
    ParentDies,
    /// The parent stays put; the halved energy is simply lost
    ParentSurvives,
}

/// Configuration for the simulation systems
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    // === GRID ===
    /// Grid width in cells (columns)
    pub width: usize,

    /// Grid height in cells (rows)
    pub height: usize,

    // === LIFECYCLE ===
    /// Upper bound of the per-division point-mutation count
    ///
    /// Each offspring receives a count drawn uniformly from `[0, mutation_rate]`.
    pub mutation_rate: usize,

    /// Success threshold for feeding on a richer neighbor
    ///
    /// When the eater's energy+power is below the prey's, a draw from
    /// `[0, diff]` must land below this value. Higher = predation pays more.
    pub feed_threshold: u16,

    /// Policy for a division with nowhere to place the offspring
    pub division_failure: DivisionFailure,

    /// Energy at or above which a cell halves itself and divides
    pub division_energy: u8,

    /// Old-age ceiling. Death chance per tick is `1 / (max_age - age + 1)`.
    pub max_age: u32,

    // === EXTERNAL COMMANDS ===
    /// Cells injected by one spawn command
    pub spawn_batch: usize,

    /// Cells spawned when the simulation is built
    pub initial_cells: usize,

    /// Master RNG seed. `None` picks a random seed at startup.
    pub seed: Option<u64>,

    // === PARALLELIZATION ===
    /// Minimum live cell count before the begin/end phases go parallel
    ///
    /// Below this, rayon's job overhead costs more than it saves.
    pub parallel_threshold: usize,

    /// Cells per parallel job. Each job owns one RNG stream, so this also
    /// fixes the stream layout independently of the thread count.
    pub worker_chunk: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            width: 200,
            height: 150,

            mutation_rate: 10,
            feed_threshold: 25,
            division_failure: DivisionFailure::ParentDies,
            division_energy: 200,
            max_age: 1024,

            spawn_batch: 10,
            initial_cells: 0,
            seed: None,

            parallel_threshold: 1024,
            worker_chunk: 256,
        }
    }
}

impl SimulationConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Default config for a grid of the given size
    pub fn with_dims(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    pub fn dims(&self) -> GridDims {
        GridDims::new(self.width, self.height)
    }

    /// Parse a TOML document. Missing keys fall back to defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: SimulationConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(SimError::InvalidConfig(format!(
                "grid dimensions must be positive, got {}x{}",
                self.width, self.height
            )));
        }

        if self.division_energy == 0 {
            return Err(SimError::InvalidConfig(
                "division_energy must be positive".into(),
            ));
        }

        if self.worker_chunk == 0 {
            return Err(SimError::InvalidConfig("worker_chunk must be positive".into()));
        }

        if self.max_age == 0 {
            return Err(SimError::InvalidConfig("max_age must be positive".into()));
        }

        Ok(())
    }
}

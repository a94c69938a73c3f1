//! The generation scheduler and its phases

pub mod lifecycle;
pub mod light;
pub mod resolve;
pub mod tick;
pub mod workers;

pub use lifecycle::{DeathCounts, Verdicts};
pub use light::{day_light, update_light};
pub use resolve::{ResolveOutcome, Requests, Staged};
pub use tick::{PhaseTimings, Simulation, TickSummary};

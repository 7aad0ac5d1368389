// Synthetic scenarios for exercising the filter end to end

pub mod runner;
pub mod scenario;

pub use runner::{run_scenario, ScenarioReport};
pub use scenario::{generate_scenario, Scenario, ScenarioConfig, SensorPattern};

pub mod engine;
pub mod scenario;

pub use engine::ReturnModel;
pub use scenario::{Percentiles, RetirementScenario, ScenarioError, SimulationResult};

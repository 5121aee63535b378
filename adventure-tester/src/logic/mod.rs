pub mod network;
pub mod policy;
pub mod reports;
pub mod simulation;
pub mod tester;

pub use network::NetworkProfile;
pub use policy::GameplayStrategy;
pub use simulation::{SimulationPlan, SimulationSummary, run_plan};
pub use tester::*;

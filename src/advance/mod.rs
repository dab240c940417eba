pub mod method;
pub mod orchestrator;

pub use method::AdvanceMethod;
pub use orchestrator::{
    AdvanceFailure, AdvanceOrchestrator, AdvanceOutcome, AdvancePlan, OrchestratorConfig,
};

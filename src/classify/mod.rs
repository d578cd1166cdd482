pub mod orchestrator;
pub mod rules;

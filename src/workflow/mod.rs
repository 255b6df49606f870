pub mod definition;
pub mod machine;
pub mod runner;

pub use definition::{DefinitionBuilder, StateMachineDefinition};
pub use machine::{route, FinalStatus, Phase, Route, StackOutcome};
pub use runner::Workflow;

//! Tools
//!
//! Registry, executor and the bounded tool loop.

pub mod executor;
pub mod orchestrator;
pub mod registry;

pub use executor::{ToolExecutionResult, ToolExecutor, ToolOutcome};
pub use orchestrator::{
    OrchestrationOutcome, OrchestrationPhase, OrchestrationState, ToolOrchestrator,
};
pub use registry::{FnTool, ToolDefinition, ToolFunction, ToolRegistry};

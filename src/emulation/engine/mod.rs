//! Execution context and the seams the step function calls out through.

mod context;
mod error;
mod executor;

pub use context::ExecutionContext;
pub use error::EmulationError;
pub use executor::InstructionExecutor;

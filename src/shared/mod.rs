// Shared kernel: cross-module error and logging types

pub mod errors; // Shared error types
pub mod utils; // Shared utilities

// Re-exports for convenience
pub use errors::{AppError, AppResult};
pub use utils::{init_logger, LogContext, TimedOperation};

//! Domain model for vmscope
//!
//! Core identity types and errors:
//! - Compile-time safety via newtype pattern
//! - Self-documenting function signatures
//! - Structured error handling

pub mod errors;
pub mod types;

// Re-export common types for convenience
pub use types::{ContextId, InterruptKind, ThreadId};

pub use errors::ReactorError;

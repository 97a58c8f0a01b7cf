// All core functionality is in copyedit-core
// This CLI acts as a thin wrapper around the core library

// CLI-specific modules
pub mod overrides;

// Re-export core types for convenience
pub use copyedit_core::*;

pub use overrides::PipelineArgs;

//! Dispatch operations
//!
//! - `tools`: routed and backend-qualified tool calls (errors as data)
//! - `resources`: namespaced and backend-qualified resource reads
//! - `prompts`: routed and backend-qualified prompt rendering
//! - `logging`: logging level broadcast

pub mod logging;
pub mod prompts;
pub mod resources;
pub mod tools;

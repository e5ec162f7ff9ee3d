//! Delve Core - Core data structures and trait definitions
//!
//! Defines the error, configuration and logging foundation shared by every
//! delve crate, plus the two capability traits the research loop consumes.

pub mod config;
pub mod error;
pub mod logging;
pub mod traits;
pub mod types;

pub use error::*;
pub use logging::*;
pub use traits::*;
pub use types::*;

// Re-export commonly used external types
pub use async_trait::async_trait;
pub use tracing;

//! Wire types, configuration, and defaults shared across codr's crates.

pub mod config;
pub mod defaults;
pub mod error;
pub mod filename;
pub mod types;

pub use config::{Config, ConfigError};
pub use error::{ProtocolError, Result};
pub use filename::validate_filename;
pub use types::{
    ClientFrame, ExecutionResult, Job, JobQueueEntry, JobStatus, Language, SandboxLimits,
    ServerFrame,
};

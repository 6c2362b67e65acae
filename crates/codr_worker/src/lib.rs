pub mod cancel;
pub mod executor;
pub mod pty_runner;
pub mod sandbox;
pub mod sanitizer;
pub mod worker;

pub use worker::{Worker, WorkerConfig, WorkerError};

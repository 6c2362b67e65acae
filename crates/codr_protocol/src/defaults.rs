//! Default values for configuration knobs listed in the external interfaces.

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_JWT_ALGORITHM: &str = "HS256";
pub const DEFAULT_JWT_EXPIRATION_MINUTES: i64 = 15;
pub const DEFAULT_EXECUTION_TIMEOUT_SECS: u64 = 7;
pub const DEFAULT_MAX_MEMORY_MB: u64 = 300;
pub const DEFAULT_MAX_FILE_SIZE_MB: u64 = 1;
pub const DEFAULT_COMPILATION_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_MAX_INPUT_KB: u64 = 100;
pub const DEFAULT_REDIS_URL: &str = "redis://localhost:6379/0";
pub const DEFAULT_REDIS_TTL_SECS: u64 = 3600;
pub const DEFAULT_JOB_QUEUE_NAME: &str = "codr:job_queue";
pub const DEFAULT_WORKER_POLL_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_MAX_QUEUE_SIZE: u64 = 1000;
pub const DEFAULT_MAX_POLL_ATTEMPTS: u32 = 60;
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 1;
pub const DEFAULT_RATE_LIMIT_SUBMIT: &str = "10/minute";
pub const DEFAULT_RATE_LIMIT_STREAM: &str = "30/minute";

pub const AUTH_FRAME_TIMEOUT_SECS: u64 = 5;
pub const PTY_SELECT_POLL_MILLIS: u64 = 10;
pub const REAP_GRACE_MILLIS: u64 = 500;
pub const PTY_READ_CHUNK_BYTES: usize = 4096;
pub const PTY_WINDOW_ROWS: u16 = 24;
pub const PTY_WINDOW_COLS: u16 = 80;

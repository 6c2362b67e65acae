use thiserror::Error;

#[derive(Debug, Error)]
pub enum BusError {
    #[error("bus unavailable: {0}")]
    Unavailable(#[from] redis::RedisError),

    #[error("job not found")]
    NotFound,

    #[error("malformed job record: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("illegal status transition: {from:?} -> {to:?}")]
    IllegalTransition {
        from: codr_protocol::JobStatus,
        to: codr_protocol::JobStatus,
    },
}

pub type Result<T> = std::result::Result<T, BusError>;

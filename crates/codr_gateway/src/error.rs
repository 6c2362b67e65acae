//! Gateway error kinds, matching spec.md §7's Kind column. Each variant
//! knows its own close code and whether it is safe to show a client
//! verbatim; `Internal` is the only kind ever redacted in production.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("missing job token")]
    AuthMissing,
    #[error("{0}")]
    AuthInvalid(String),
    #[error("token expired")]
    AuthExpired,
    #[error("job token has already been used")]
    AuthReused,
    #[error("{0}")]
    ValidationRejected(String),
    #[error("{0}")]
    SubmissionMalformed(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    pub fn close_code(&self) -> u16 {
        match self {
            GatewayError::AuthMissing
            | GatewayError::AuthInvalid(_)
            | GatewayError::AuthExpired
            | GatewayError::AuthReused => 1008,
            GatewayError::ValidationRejected(_) | GatewayError::SubmissionMalformed(_) => 1000,
            GatewayError::Internal(_) => 1011,
        }
    }

    /// The message shown to the client. `env != development` redacts
    /// `Internal` failures to a generic string; every other kind is
    /// already a client-safe description (spec.md §7).
    pub fn client_message(&self, is_development: bool) -> String {
        match self {
            GatewayError::Internal(cause) if !is_development => {
                let _ = cause;
                "internal error".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl From<codr_security::TokenError> for GatewayError {
    fn from(err: codr_security::TokenError) -> Self {
        match err {
            codr_security::TokenError::Expired => GatewayError::AuthExpired,
            other => GatewayError::AuthInvalid(other.to_string()),
        }
    }
}

impl From<codr_bus::BusError> for GatewayError {
    fn from(err: codr_bus::BusError) -> Self {
        GatewayError::Internal(err.to_string())
    }
}

//! Process configuration loaded from the environment.
//!
//! Kept as a plain struct with a manual `from_env`, not a builder — this
//! mirrors the teacher's thin, hand-rolled config modules rather than
//! pulling in a settings framework.

use crate::defaults;

#[derive(Debug, Clone)]
pub struct Config {
    pub env: String,
    pub api_key: Option<String>,
    pub host: String,
    pub port: u16,
    pub cors_origins: String,

    pub jwt_secret: String,
    pub jwt_algorithm: String,
    pub jwt_expiration_minutes: i64,

    pub execution_timeout_secs: u64,
    pub max_memory_mb: u64,
    pub max_file_size_mb: u64,
    pub compilation_timeout_secs: u64,
    pub max_input_kb: u64,

    pub redis_url: String,
    pub redis_ttl_secs: u64,

    pub rate_limit_submit: String,
    pub rate_limit_stream: String,

    pub job_queue_name: String,
    pub worker_poll_timeout_secs: u64,
    pub worker_id: Option<String>,
    pub max_queue_size: u64,

    pub max_poll_attempts: u32,
    pub poll_interval_secs: u64,
}

impl Config {
    /// Load configuration from environment variables, falling back to the
    /// documented defaults. `JWT_SECRET` has no safe default and must be set.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            env: env_string("ENV", "production"),
            api_key: env_optional("API_KEY"),
            host: env_string("HOST", defaults::DEFAULT_HOST),
            port: env_parsed("PORT", defaults::DEFAULT_PORT),
            cors_origins: env_string("CORS_ORIGINS", "*"),

            jwt_secret: std::env::var("JWT_SECRET").map_err(|_| ConfigError::MissingJwtSecret)?,
            jwt_algorithm: env_string("JWT_ALGORITHM", defaults::DEFAULT_JWT_ALGORITHM),
            jwt_expiration_minutes: env_parsed(
                "JWT_EXPIRATION_MINUTES",
                defaults::DEFAULT_JWT_EXPIRATION_MINUTES,
            ),

            execution_timeout_secs: env_parsed(
                "EXECUTION_TIMEOUT",
                defaults::DEFAULT_EXECUTION_TIMEOUT_SECS,
            ),
            max_memory_mb: env_parsed("MAX_MEMORY_MB", defaults::DEFAULT_MAX_MEMORY_MB),
            max_file_size_mb: env_parsed("MAX_FILE_SIZE_MB", defaults::DEFAULT_MAX_FILE_SIZE_MB),
            compilation_timeout_secs: env_parsed(
                "COMPILATION_TIMEOUT",
                defaults::DEFAULT_COMPILATION_TIMEOUT_SECS,
            ),
            max_input_kb: env_parsed("MAX_INPUT_KB", defaults::DEFAULT_MAX_INPUT_KB),

            redis_url: env_string("REDIS_URL", defaults::DEFAULT_REDIS_URL),
            redis_ttl_secs: env_parsed("REDIS_TTL", defaults::DEFAULT_REDIS_TTL_SECS),

            rate_limit_submit: env_string("RATE_LIMIT_SUBMIT", defaults::DEFAULT_RATE_LIMIT_SUBMIT),
            rate_limit_stream: env_string("RATE_LIMIT_STREAM", defaults::DEFAULT_RATE_LIMIT_STREAM),

            job_queue_name: env_string("JOB_QUEUE_NAME", defaults::DEFAULT_JOB_QUEUE_NAME),
            worker_poll_timeout_secs: env_parsed(
                "WORKER_POLL_TIMEOUT",
                defaults::DEFAULT_WORKER_POLL_TIMEOUT_SECS,
            ),
            worker_id: env_optional("WORKER_ID"),
            max_queue_size: env_parsed("MAX_QUEUE_SIZE", defaults::DEFAULT_MAX_QUEUE_SIZE),

            max_poll_attempts: env_parsed("MAX_POLL_ATTEMPTS", defaults::DEFAULT_MAX_POLL_ATTEMPTS),
            poll_interval_secs: env_parsed("POLL_INTERVAL", defaults::DEFAULT_POLL_INTERVAL_SECS),
        })
    }

    pub fn is_development(&self) -> bool {
        self.env == "development"
    }

    pub fn cors_origins_list(&self) -> Vec<String> {
        if self.cors_origins == "*" {
            vec!["*".to_string()]
        } else {
            self.cors_origins
                .split(',')
                .map(|s| s.trim().to_string())
                .collect()
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("JWT_SECRET must be set")]
    MissingJwtSecret,
}

fn env_string(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_optional(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn env_parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_jwt_secret_is_an_error() {
        std::env::remove_var("JWT_SECRET");
        assert!(matches!(Config::from_env(), Err(ConfigError::MissingJwtSecret)));
    }

    #[test]
    fn cors_origins_list_splits_on_comma() {
        std::env::set_var("JWT_SECRET", "test-secret");
        std::env::set_var("CORS_ORIGINS", "https://a.example, https://b.example");
        let cfg = Config::from_env().unwrap();
        assert_eq!(
            cfg.cors_origins_list(),
            vec!["https://a.example", "https://b.example"]
        );
        std::env::remove_var("CORS_ORIGINS");
        std::env::remove_var("JWT_SECRET");
    }
}

//! Redis-backed job store (C4) and message bus (C5).

pub mod channels;
pub mod error;
pub mod store;
pub mod testing;

pub use channels::{Bus, RedisBus};
pub use error::{BusError, Result};
pub use store::{JobStore, RedisJobStore};
pub use testing::{FakeBus, FakeJobStore};

use redis::aio::ConnectionManager;

/// Connect to Redis and verify the link with a `PING`, matching the
/// original system's connection manager (TLS is implicit in `rediss://`
/// URLs via the `tls-native-tls` feature).
pub async fn connect(redis_url: &str) -> Result<(ConnectionManager, redis::Client)> {
    let client = redis::Client::open(redis_url)?;
    let mut conn = ConnectionManager::new(client.clone()).await?;
    let _: String = redis::cmd("PING").query_async(&mut conn).await?;
    Ok((conn, client))
}

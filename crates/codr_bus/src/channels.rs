//! Message bus (C5): per-job output/complete/error channels, the shared
//! work queue, and the single-use token keyspace.

use codr_ids::JobId;
use codr_protocol::{JobQueueEntry, ServerFrame};
use futures_util::StreamExt;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tokio::sync::mpsc;

use crate::error::Result;

pub trait Bus: Send + Sync {
    fn publish_output(
        &self,
        job_id: &JobId,
        data: String,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    fn publish_complete(
        &self,
        job_id: &JobId,
        exit_code: i32,
        execution_time: f64,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    fn publish_error(
        &self,
        job_id: &JobId,
        message: String,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Fan output+complete to the returned channel; the stream ends (the
    /// sender is dropped) once a `Complete` frame is delivered.
    fn subscribe(&self, job_id: &JobId) -> impl std::future::Future<Output = Result<mpsc::Receiver<ServerFrame>>> + Send;

    /// Subscribe to a job's input channel; each delivered message is one
    /// keystroke payload published by the gateway.
    fn subscribe_input(&self, job_id: &JobId) -> impl std::future::Future<Output = Result<mpsc::Receiver<String>>> + Send;

    fn publish_input(&self, job_id: &JobId, data: String) -> impl std::future::Future<Output = Result<()>> + Send;

    fn enqueue(&self, entry: JobQueueEntry) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Current depth of the work list, for the gateway's advisory
    /// `max_queue_size` check before pushing a new entry.
    fn queue_len(&self, queue_name: &str) -> impl std::future::Future<Output = Result<u64>> + Send;

    /// Blocking pop with `timeout_secs`; `None` means the timeout elapsed
    /// with no job available.
    fn dequeue(
        &self,
        queue_name: &str,
        timeout_secs: u64,
    ) -> impl std::future::Future<Output = Result<Option<JobQueueEntry>>> + Send;

    fn mark_used(&self, jti: &str, ttl_secs: u64) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Fail-open: a connection error is reported as "not used" so a
    /// transient bus outage never blocks legitimate single-use redemption.
    /// This is a deliberate availability trade-off, not an oversight.
    fn is_used(&self, jti: &str) -> impl std::future::Future<Output = bool> + Send;
}

#[derive(Clone)]
pub struct RedisBus {
    conn: ConnectionManager,
    client: redis::Client,
    queue_name: String,
}

impl RedisBus {
    pub fn new(conn: ConnectionManager, client: redis::Client, queue_name: String) -> Self {
        Self {
            conn,
            client,
            queue_name,
        }
    }

    fn output_channel(job_id: &JobId) -> String {
        format!("job:{job_id}:output")
    }

    fn complete_channel(job_id: &JobId) -> String {
        format!("job:{job_id}:complete")
    }

    pub fn input_channel(job_id: &JobId) -> String {
        format!("job:{job_id}:input")
    }

    fn used_token_key(jti: &str) -> String {
        format!("used_token:{jti}")
    }
}

impl Bus for RedisBus {
    async fn publish_output(&self, job_id: &JobId, data: String) -> Result<()> {
        let frame = ServerFrame::output(data);
        let payload = serde_json::to_string(&frame)?;
        let mut conn = self.conn.clone();
        let _: i64 = conn.publish(Self::output_channel(job_id), payload).await?;
        Ok(())
    }

    async fn publish_complete(&self, job_id: &JobId, exit_code: i32, execution_time: f64) -> Result<()> {
        let frame = ServerFrame::Complete {
            exit_code,
            execution_time,
        };
        let payload = serde_json::to_string(&frame)?;
        let mut conn = self.conn.clone();
        let _: i64 = conn
            .publish(Self::complete_channel(job_id), payload)
            .await?;
        Ok(())
    }

    async fn publish_error(&self, job_id: &JobId, message: String) -> Result<()> {
        let frame = ServerFrame::Error { message };
        let payload = serde_json::to_string(&frame)?;
        let mut conn = self.conn.clone();
        // Errors are delivered on the output channel, matching the
        // original system: there is no distinct error channel to subscribe to.
        let _: i64 = conn.publish(Self::output_channel(job_id), payload).await?;
        Ok(())
    }

    async fn subscribe(&self, job_id: &JobId) -> Result<mpsc::Receiver<ServerFrame>> {
        let (tx, rx) = mpsc::channel(64);
        let output_channel = Self::output_channel(job_id);
        let complete_channel = Self::complete_channel(job_id);
        let client = self.client.clone();

        tokio::spawn(async move {
            let conn = match client.get_async_pubsub().await {
                Ok(conn) => conn,
                Err(_) => return,
            };
            let mut pubsub = conn;
            if pubsub
                .subscribe(&[output_channel.as_str(), complete_channel.as_str()])
                .await
                .is_err()
            {
                return;
            }
            let mut stream = pubsub.on_message();
            while let Some(msg) = stream.next().await {
                let Ok(payload) = msg.get_payload::<String>() else {
                    continue;
                };
                let Ok(frame) = serde_json::from_str::<ServerFrame>(&payload) else {
                    continue;
                };
                let is_complete = matches!(frame, ServerFrame::Complete { .. });
                if tx.send(frame).await.is_err() {
                    break;
                }
                if is_complete {
                    break;
                }
            }
        });

        Ok(rx)
    }

    async fn subscribe_input(&self, job_id: &JobId) -> Result<mpsc::Receiver<String>> {
        let (tx, rx) = mpsc::channel(256);
        let channel = Self::input_channel(job_id);
        let client = self.client.clone();

        tokio::spawn(async move {
            let conn = match client.get_async_pubsub().await {
                Ok(conn) => conn,
                Err(_) => return,
            };
            let mut pubsub = conn;
            if pubsub.subscribe(&channel).await.is_err() {
                return;
            }
            let mut stream = pubsub.on_message();
            while let Some(msg) = stream.next().await {
                let Ok(payload) = msg.get_payload::<String>() else {
                    continue;
                };
                if tx.send(payload).await.is_err() {
                    break;
                }
            }
        });

        Ok(rx)
    }

    async fn publish_input(&self, job_id: &JobId, data: String) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: i64 = conn.publish(Self::input_channel(job_id), data).await?;
        Ok(())
    }

    async fn enqueue(&self, entry: JobQueueEntry) -> Result<()> {
        let payload = serde_json::to_string(&entry)?;
        let mut conn = self.conn.clone();
        let _: i64 = conn.lpush(&self.queue_name, payload).await?;
        Ok(())
    }

    async fn queue_len(&self, queue_name: &str) -> Result<u64> {
        let mut conn = self.conn.clone();
        let len: u64 = conn.llen(queue_name).await?;
        Ok(len)
    }

    async fn dequeue(&self, queue_name: &str, timeout_secs: u64) -> Result<Option<JobQueueEntry>> {
        let mut conn = self.conn.clone();
        let popped: Option<(String, String)> = conn.brpop(queue_name, timeout_secs as f64).await?;
        match popped {
            Some((_, payload)) => Ok(Some(serde_json::from_str(&payload)?)),
            None => Ok(None),
        }
    }

    async fn mark_used(&self, jti: &str, ttl_secs: u64) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = conn
            .set_ex(Self::used_token_key(jti), "1", ttl_secs)
            .await?;
        Ok(())
    }

    async fn is_used(&self, jti: &str) -> bool {
        let mut conn = self.conn.clone();
        match conn.exists::<_, bool>(Self::used_token_key(jti)).await {
            Ok(used) => used,
            Err(_) => false,
        }
    }
}

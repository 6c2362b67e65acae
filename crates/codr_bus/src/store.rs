//! Job store (C4): durable per-job metadata with TTL, addressed by
//! `job:{id}`. Terminal writes land in a single pipelined batch so an
//! observer never sees a terminal status without its payload.

use chrono::Utc;
use codr_ids::JobId;
use codr_protocol::{ExecutionResult, Job, JobStatus, Language};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use crate::error::{BusError, Result};

/// Dependency boundary for the job store so workers/gateways can be built
/// against a fake in tests without a live Redis.
pub trait JobStore: Send + Sync {
    /// `job_id` is supplied by the caller (minted alongside the job token
    /// before the client ever connects), not generated here.
    fn create(
        &self,
        job_id: &JobId,
        code: String,
        language: Language,
        filename: String,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    fn get(&self, job_id: &JobId) -> impl std::future::Future<Output = Result<Option<Job>>> + Send;

    fn mark_processing(&self, job_id: &JobId) -> impl std::future::Future<Output = Result<()>> + Send;

    fn mark_completed(
        &self,
        job_id: &JobId,
        result: ExecutionResult,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    fn mark_failed(
        &self,
        job_id: &JobId,
        error: String,
        result: Option<ExecutionResult>,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    fn exists(&self, job_id: &JobId) -> impl std::future::Future<Output = Result<bool>> + Send;

    fn status(&self, job_id: &JobId) -> impl std::future::Future<Output = Result<Option<JobStatus>>> + Send;

    /// Liveness probe for `GET /health`: issues a Redis `PING` rather than
    /// a keyspace lookup, matching the original system's `health_check()`.
    fn ping(&self) -> impl std::future::Future<Output = Result<()>> + Send;
}

#[derive(Clone)]
pub struct RedisJobStore {
    conn: ConnectionManager,
    ttl_secs: u64,
}

impl RedisJobStore {
    pub fn new(conn: ConnectionManager, ttl_secs: u64) -> Self {
        Self { conn, ttl_secs }
    }

    fn job_key(job_id: &JobId) -> String {
        format!("job:{job_id}")
    }
}

impl JobStore for RedisJobStore {
    async fn create(&self, job_id: &JobId, code: String, language: Language, filename: String) -> Result<()> {
        let job = Job::new(job_id.clone(), code, language, filename);
        let key = Self::job_key(job_id);

        let mut conn = self.conn.clone();
        let _: () = redis::pipe()
            .hset(&key, "job_id", job.job_id.to_string())
            .ignore()
            .hset(&key, "code", job.code.clone())
            .ignore()
            .hset(&key, "language", job.language.as_str())
            .ignore()
            .hset(&key, "filename", job.filename.clone())
            .ignore()
            .hset(&key, "status", job.status.as_str())
            .ignore()
            .hset(&key, "created_at", job.created_at.to_rfc3339())
            .ignore()
            .expire(&key, self.ttl_secs as i64)
            .ignore()
            .query_async(&mut conn)
            .await?;

        Ok(())
    }

    async fn get(&self, job_id: &JobId) -> Result<Option<Job>> {
        let key = Self::job_key(job_id);
        let mut conn = self.conn.clone();
        let fields: std::collections::HashMap<String, String> = conn.hgetall(&key).await?;
        if fields.is_empty() {
            return Ok(None);
        }

        let language = Language::parse(fields.get("language").map(String::as_str).unwrap_or(""))
            .ok_or(BusError::Malformed(
                serde_json::Error::io(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    "unknown language",
                )),
            ))?;
        let status = match fields.get("status").map(String::as_str) {
            Some("queued") => JobStatus::Queued,
            Some("processing") => JobStatus::Processing,
            Some("completed") => JobStatus::Completed,
            Some("failed") => JobStatus::Failed,
            _ => JobStatus::Queued,
        };
        let result = fields
            .get("result")
            .map(|raw| serde_json::from_str::<ExecutionResult>(raw))
            .transpose()?;
        let completed_at = fields
            .get("completed_at")
            .and_then(|raw| chrono::DateTime::parse_from_rfc3339(raw).ok())
            .map(|dt| dt.with_timezone(&Utc));
        let created_at = fields
            .get("created_at")
            .and_then(|raw| chrono::DateTime::parse_from_rfc3339(raw).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(Utc::now);

        Ok(Some(Job {
            job_id: job_id.clone(),
            code: fields.get("code").cloned().unwrap_or_default(),
            language,
            filename: fields.get("filename").cloned().unwrap_or_default(),
            status,
            created_at,
            completed_at,
            result,
            error: fields.get("error").cloned(),
        }))
    }

    async fn mark_processing(&self, job_id: &JobId) -> Result<()> {
        let key = Self::job_key(job_id);
        let mut conn = self.conn.clone();
        conn.hset::<_, _, _, ()>(&key, "status", JobStatus::Processing.as_str())
            .await?;
        Ok(())
    }

    async fn mark_completed(&self, job_id: &JobId, result: ExecutionResult) -> Result<()> {
        let key = Self::job_key(job_id);
        let mut conn = self.conn.clone();
        let result_json = serde_json::to_string(&result)?;
        let _: () = redis::pipe()
            .hset(&key, "status", JobStatus::Completed.as_str())
            .ignore()
            .hset(&key, "result", result_json)
            .ignore()
            .hset(&key, "completed_at", Utc::now().to_rfc3339())
            .ignore()
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn mark_failed(
        &self,
        job_id: &JobId,
        error: String,
        result: Option<ExecutionResult>,
    ) -> Result<()> {
        let key = Self::job_key(job_id);
        let mut conn = self.conn.clone();
        let mut pipe = redis::pipe();
        pipe.hset(&key, "status", JobStatus::Failed.as_str()).ignore();
        pipe.hset(&key, "error", error).ignore();
        pipe.hset(&key, "completed_at", Utc::now().to_rfc3339()).ignore();
        if let Some(result) = result {
            pipe.hset(&key, "result", serde_json::to_string(&result)?).ignore();
        }
        let _: () = pipe.query_async(&mut conn).await?;
        Ok(())
    }

    async fn exists(&self, job_id: &JobId) -> Result<bool> {
        let key = Self::job_key(job_id);
        let mut conn = self.conn.clone();
        let exists: bool = conn.exists(&key).await?;
        Ok(exists)
    }

    async fn status(&self, job_id: &JobId) -> Result<Option<JobStatus>> {
        let key = Self::job_key(job_id);
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.hget(&key, "status").await?;
        Ok(raw.and_then(|s| match s.as_str() {
            "queued" => Some(JobStatus::Queued),
            "processing" => Some(JobStatus::Processing),
            "completed" => Some(JobStatus::Completed),
            "failed" => Some(JobStatus::Failed),
            _ => None,
        }))
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}

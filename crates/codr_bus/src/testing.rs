//! In-memory `JobStore`/`Bus` fakes for gateway/worker tests that don't
//! need a live Redis, per the dependency-injection seam both traits are
//! built around (construct against the trait, inject a fake in tests).

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use codr_ids::JobId;
use codr_protocol::{ExecutionResult, Job, JobQueueEntry, JobStatus, Language, ServerFrame};
use tokio::sync::mpsc;

use crate::channels::Bus;
use crate::error::Result;
use crate::store::JobStore;

#[derive(Clone, Default)]
pub struct FakeJobStore {
    jobs: Arc<Mutex<HashMap<JobId, Job>>>,
}

impl FakeJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl JobStore for FakeJobStore {
    async fn create(&self, job_id: &JobId, code: String, language: Language, filename: String) -> Result<()> {
        let job = Job::new(job_id.clone(), code, language, filename);
        self.jobs.lock().unwrap().insert(job_id.clone(), job);
        Ok(())
    }

    async fn get(&self, job_id: &JobId) -> Result<Option<Job>> {
        Ok(self.jobs.lock().unwrap().get(job_id).cloned())
    }

    async fn mark_processing(&self, job_id: &JobId) -> Result<()> {
        if let Some(job) = self.jobs.lock().unwrap().get_mut(job_id) {
            job.status = JobStatus::Processing;
        }
        Ok(())
    }

    async fn mark_completed(&self, job_id: &JobId, result: ExecutionResult) -> Result<()> {
        if let Some(job) = self.jobs.lock().unwrap().get_mut(job_id) {
            job.status = JobStatus::Completed;
            job.completed_at = Some(chrono::Utc::now());
            job.result = Some(result);
        }
        Ok(())
    }

    async fn mark_failed(&self, job_id: &JobId, error: String, result: Option<ExecutionResult>) -> Result<()> {
        if let Some(job) = self.jobs.lock().unwrap().get_mut(job_id) {
            job.status = JobStatus::Failed;
            job.completed_at = Some(chrono::Utc::now());
            job.error = Some(error);
            job.result = result;
        }
        Ok(())
    }

    async fn exists(&self, job_id: &JobId) -> Result<bool> {
        Ok(self.jobs.lock().unwrap().contains_key(job_id))
    }

    async fn status(&self, job_id: &JobId) -> Result<Option<JobStatus>> {
        Ok(self.jobs.lock().unwrap().get(job_id).map(|j| j.status))
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

/// In-memory stand-in for `RedisBus`. Output/complete frames for a job
/// are queued until someone calls `subscribe`, since tests drive these
/// deterministically rather than racing a real pubsub connection.
#[derive(Clone, Default)]
pub struct FakeBus {
    queue: Arc<Mutex<VecDeque<JobQueueEntry>>>,
    used_tokens: Arc<Mutex<std::collections::HashSet<String>>>,
    frame_senders: Arc<Mutex<HashMap<JobId, mpsc::Sender<ServerFrame>>>>,
    input_senders: Arc<Mutex<HashMap<JobId, mpsc::Sender<String>>>>,
}

impl FakeBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queued_jobs(&self) -> Vec<JobQueueEntry> {
        self.queue.lock().unwrap().iter().cloned().collect()
    }
}

impl Bus for FakeBus {
    async fn publish_output(&self, job_id: &JobId, data: String) -> Result<()> {
        if let Some(tx) = self.frame_senders.lock().unwrap().get(job_id) {
            let _ = tx.try_send(ServerFrame::output(data));
        }
        Ok(())
    }

    async fn publish_complete(&self, job_id: &JobId, exit_code: i32, execution_time: f64) -> Result<()> {
        if let Some(tx) = self.frame_senders.lock().unwrap().remove(job_id) {
            let _ = tx.try_send(ServerFrame::Complete {
                exit_code,
                execution_time,
            });
        }
        Ok(())
    }

    async fn publish_error(&self, job_id: &JobId, message: String) -> Result<()> {
        if let Some(tx) = self.frame_senders.lock().unwrap().get(job_id) {
            let _ = tx.try_send(ServerFrame::Error { message });
        }
        Ok(())
    }

    async fn subscribe(&self, job_id: &JobId) -> Result<mpsc::Receiver<ServerFrame>> {
        let (tx, rx) = mpsc::channel(64);
        self.frame_senders.lock().unwrap().insert(job_id.clone(), tx);
        Ok(rx)
    }

    async fn subscribe_input(&self, job_id: &JobId) -> Result<mpsc::Receiver<String>> {
        let (tx, rx) = mpsc::channel(256);
        self.input_senders.lock().unwrap().insert(job_id.clone(), tx);
        Ok(rx)
    }

    async fn publish_input(&self, job_id: &JobId, data: String) -> Result<()> {
        if let Some(tx) = self.input_senders.lock().unwrap().get(job_id) {
            let _ = tx.try_send(data);
        }
        Ok(())
    }

    async fn enqueue(&self, entry: JobQueueEntry) -> Result<()> {
        self.queue.lock().unwrap().push_back(entry);
        Ok(())
    }

    async fn queue_len(&self, _queue_name: &str) -> Result<u64> {
        Ok(self.queue.lock().unwrap().len() as u64)
    }

    async fn dequeue(&self, _queue_name: &str, _timeout_secs: u64) -> Result<Option<JobQueueEntry>> {
        Ok(self.queue.lock().unwrap().pop_front())
    }

    async fn mark_used(&self, jti: &str, _ttl_secs: u64) -> Result<()> {
        self.used_tokens.lock().unwrap().insert(jti.to_string());
        Ok(())
    }

    async fn is_used(&self, jti: &str) -> bool {
        self.used_tokens.lock().unwrap().contains(jti)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codr_ids::JobId;

    #[tokio::test]
    async fn fake_job_store_roundtrips_status_transitions() {
        let store = FakeJobStore::new();
        let job_id = JobId::new();
        store
            .create(&job_id, "print(1)".to_string(), Language::Python, "main.py".to_string())
            .await
            .unwrap();
        assert_eq!(store.status(&job_id).await.unwrap(), Some(JobStatus::Queued));

        store.mark_processing(&job_id).await.unwrap();
        assert_eq!(store.status(&job_id).await.unwrap(), Some(JobStatus::Processing));

        store
            .mark_completed(&job_id, ExecutionResult::new(0, 0.1, "1".to_string(), String::new()))
            .await
            .unwrap();
        let job = store.get(&job_id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.result.unwrap().exit_code, 0);
    }

    #[tokio::test]
    async fn fake_bus_enqueue_and_dequeue_roundtrip() {
        let bus = FakeBus::new();
        let job_id = JobId::new();
        bus.enqueue(JobQueueEntry {
            job_id: job_id.clone(),
            code: "1+1".to_string(),
            language: Language::Python,
            filename: "main.py".to_string(),
            queued_at: chrono::Utc::now(),
        })
        .await
        .unwrap();

        assert_eq!(bus.queue_len("codr:job_queue").await.unwrap(), 1);
        let popped = bus.dequeue("codr:job_queue", 1).await.unwrap().unwrap();
        assert_eq!(popped.job_id, job_id);
    }

    #[tokio::test]
    async fn fake_bus_dequeue_is_fifo_like_the_redis_queue() {
        let bus = FakeBus::new();
        let first = JobId::new();
        let second = JobId::new();
        for job_id in [&first, &second] {
            bus.enqueue(JobQueueEntry {
                job_id: job_id.clone(),
                code: "1+1".to_string(),
                language: Language::Python,
                filename: "main.py".to_string(),
                queued_at: chrono::Utc::now(),
            })
            .await
            .unwrap();
        }

        let popped_first = bus.dequeue("codr:job_queue", 1).await.unwrap().unwrap();
        let popped_second = bus.dequeue("codr:job_queue", 1).await.unwrap().unwrap();
        assert_eq!(popped_first.job_id, first);
        assert_eq!(popped_second.job_id, second);
    }

    #[tokio::test]
    async fn fake_bus_single_use_marking_is_observable() {
        let bus = FakeBus::new();
        assert!(!bus.is_used("jti-1").await);
        bus.mark_used("jti-1", 60).await.unwrap();
        assert!(bus.is_used("jti-1").await);
    }
}

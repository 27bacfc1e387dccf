//! In-process job notification queue.
//!
//! Messages are intentionally minimal — a job id and an enqueue timestamp.
//! All job data is resolved by id from the store, so nothing large or
//! stale travels in transit. Delivery is at-least-once from the consumer's
//! point of view: producers may enqueue the same id any number of times,
//! and the orchestrator's idempotency guard makes the duplicates no-ops.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobMessage {
    pub job_id: String,
    pub enqueued_at: DateTime<Utc>,
}

pub struct JobQueue {
    tx: UnboundedSender<JobMessage>,
    rx: Mutex<UnboundedReceiver<JobMessage>>,
}

impl JobQueue {
    pub fn new() -> Self {
        let (tx, rx) = unbounded_channel();
        Self {
            tx,
            rx: Mutex::new(rx),
        }
    }

    pub fn enqueue(&self, job_id: &str) {
        // The receiver lives as long as the queue, so the send cannot fail.
        let _ = self.tx.send(JobMessage {
            job_id: job_id.to_string(),
            enqueued_at: Utc::now(),
        });
    }

    pub async fn dequeue(&self) -> Option<JobMessage> {
        self.rx.lock().await.recv().await
    }
}

impl Default for JobQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn messages_dequeue_in_order() {
        let queue = JobQueue::new();
        queue.enqueue("job-a");
        queue.enqueue("job-b");

        assert_eq!(queue.dequeue().await.unwrap().job_id, "job-a");
        assert_eq!(queue.dequeue().await.unwrap().job_id, "job-b");
    }

    #[tokio::test]
    async fn duplicate_enqueues_are_delivered() {
        let queue = JobQueue::new();
        queue.enqueue("job-a");
        queue.enqueue("job-a");

        assert_eq!(queue.dequeue().await.unwrap().job_id, "job-a");
        assert_eq!(queue.dequeue().await.unwrap().job_id, "job-a");
    }

    #[tokio::test]
    async fn message_carries_enqueue_time() {
        let queue = JobQueue::new();
        let before = Utc::now();
        queue.enqueue("job-a");
        let message = queue.dequeue().await.unwrap();
        assert!(message.enqueued_at >= before);
        assert!(message.enqueued_at <= Utc::now());
    }
}

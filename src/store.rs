//! Durable job storage with check-then-write status discipline.
//!
//! The store is the only resource shared across workers. Every status
//! write goes through [`JobStore::update_if`], which compares the stored
//! record's status against the caller's expectation and refuses the write
//! on mismatch. A duplicate or delayed queue message therefore cannot
//! revert a terminal job or overwrite terminal results with stale
//! progress.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use thiserror::Error;

use crate::pipeline::job::{Job, JobStatus};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("job already exists: {0}")]
    Duplicate(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub trait JobStore: Send + Sync {
    /// Adds a new job record. Fails if the id is already present.
    fn insert(&self, job: &Job) -> Result<(), StoreError>;

    fn get(&self, id: &str) -> Result<Option<Job>, StoreError>;

    /// Writes `job` only if the stored record's status equals `expected`.
    /// Returns whether the write happened. A missing record never matches.
    fn update_if(&self, job: &Job, expected: JobStatus) -> Result<bool, StoreError>;

    /// Ids of every job still waiting to be processed.
    fn pending_ids(&self) -> Result<Vec<String>, StoreError>;
}

/// In-memory store for tests and the demo command.
#[derive(Default)]
pub struct MemoryStore {
    jobs: Mutex<HashMap<String, Job>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl JobStore for MemoryStore {
    fn insert(&self, job: &Job) -> Result<(), StoreError> {
        let mut jobs = self.jobs.lock().expect("store lock poisoned");
        if jobs.contains_key(&job.id) {
            return Err(StoreError::Duplicate(job.id.clone()));
        }
        jobs.insert(job.id.clone(), job.clone());
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<Job>, StoreError> {
        let jobs = self.jobs.lock().expect("store lock poisoned");
        Ok(jobs.get(id).cloned())
    }

    fn update_if(&self, job: &Job, expected: JobStatus) -> Result<bool, StoreError> {
        let mut jobs = self.jobs.lock().expect("store lock poisoned");
        match jobs.get(&job.id) {
            Some(current) if current.status == expected => {
                jobs.insert(job.id.clone(), job.clone());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn pending_ids(&self) -> Result<Vec<String>, StoreError> {
        let jobs = self.jobs.lock().expect("store lock poisoned");
        let mut ids: Vec<String> = jobs
            .values()
            .filter(|job| job.status == JobStatus::Pending)
            .map(|job| job.id.clone())
            .collect();
        ids.sort();
        Ok(ids)
    }
}

/// One JSON document per job under a directory. Writes go to a temp file
/// first and are renamed into place; the compare step of `update_if` is
/// serialized by an in-process lock.
pub struct FileStore {
    dir: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            lock: Mutex::new(()),
        })
    }

    fn job_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    fn read_job(&self, id: &str) -> Result<Option<Job>, StoreError> {
        let path = self.job_path(id);
        if !path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&contents)?))
    }

    fn write_job(&self, job: &Job) -> Result<(), StoreError> {
        let path = self.job_path(&job.id);
        let tmp = self.dir.join(format!("{}.json.tmp", job.id));
        fs::write(&tmp, serde_json::to_string_pretty(job)?)?;
        fs::rename(tmp, path)?;
        Ok(())
    }
}

impl JobStore for FileStore {
    fn insert(&self, job: &Job) -> Result<(), StoreError> {
        let _guard = self.lock.lock().expect("store lock poisoned");
        if self.job_path(&job.id).exists() {
            return Err(StoreError::Duplicate(job.id.clone()));
        }
        self.write_job(job)
    }

    fn get(&self, id: &str) -> Result<Option<Job>, StoreError> {
        self.read_job(id)
    }

    fn update_if(&self, job: &Job, expected: JobStatus) -> Result<bool, StoreError> {
        let _guard = self.lock.lock().expect("store lock poisoned");
        match self.read_job(&job.id)? {
            Some(current) if current.status == expected => {
                self.write_job(job)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn pending_ids(&self) -> Result<Vec<String>, StoreError> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            let contents = fs::read_to_string(&path)?;
            let job: Job = serde_json::from_str(&contents)?;
            if job.status == JobStatus::Pending {
                ids.push(job.id);
            }
        }
        ids.sort();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::job::{Account, PortfolioSnapshot, Position};
    use crate::retirement::scenario::RetirementScenario;

    fn sample_job() -> Job {
        Job::new(
            PortfolioSnapshot {
                accounts: vec![Account {
                    name: "isa".into(),
                    positions: vec![Position {
                        symbol: "VWRL".into(),
                        quantity: 50.0,
                        asset_class: Some("equity".into()),
                    }],
                }],
            },
            RetirementScenario {
                initial_balance: 400_000.0,
                years_to_retirement: 20,
                annual_withdrawal: 16_000.0,
                inflation_rate: 0.02,
                return_mean: 0.05,
                return_stdev: 0.11,
                num_trajectories: 100,
                seed: Some(8),
            },
        )
    }

    #[test]
    fn memory_store_insert_and_get() {
        let store = MemoryStore::new();
        let job = sample_job();
        store.insert(&job).unwrap();

        let loaded = store.get(&job.id).unwrap().unwrap();
        assert_eq!(loaded.id, job.id);
        assert_eq!(loaded.status, JobStatus::Pending);
        assert!(store.get("missing").unwrap().is_none());
    }

    #[test]
    fn memory_store_rejects_duplicate_insert() {
        let store = MemoryStore::new();
        let job = sample_job();
        store.insert(&job).unwrap();
        assert!(matches!(
            store.insert(&job),
            Err(StoreError::Duplicate(_))
        ));
    }

    #[test]
    fn update_if_wins_only_on_matching_status() {
        let store = MemoryStore::new();
        let mut job = sample_job();
        store.insert(&job).unwrap();

        job.status = JobStatus::Running;
        assert!(store.update_if(&job, JobStatus::Pending).unwrap());

        // A second claim against the same prior status loses.
        let mut stale = store.get(&job.id).unwrap().unwrap();
        stale.status = JobStatus::Running;
        assert!(!store.update_if(&stale, JobStatus::Pending).unwrap());
    }

    #[test]
    fn terminal_records_cannot_be_rewritten() {
        let store = MemoryStore::new();
        let mut job = sample_job();
        store.insert(&job).unwrap();

        job.status = JobStatus::Running;
        assert!(store.update_if(&job, JobStatus::Pending).unwrap());
        job.status = JobStatus::Completed;
        assert!(store.update_if(&job, JobStatus::Running).unwrap());

        // Neither a fresh claim nor a stale running write gets through.
        let mut stale = job.clone();
        stale.status = JobStatus::Running;
        assert!(!store.update_if(&stale, JobStatus::Pending).unwrap());
        assert!(!store.update_if(&stale, JobStatus::Running).unwrap());
        assert_eq!(
            store.get(&job.id).unwrap().unwrap().status,
            JobStatus::Completed
        );
    }

    #[test]
    fn update_if_on_missing_record_is_a_no_op() {
        let store = MemoryStore::new();
        let job = sample_job();
        assert!(!store.update_if(&job, JobStatus::Pending).unwrap());
    }

    #[test]
    fn pending_ids_filters_by_status() {
        let store = MemoryStore::new();
        let first = sample_job();
        let mut second = sample_job();
        store.insert(&first).unwrap();
        store.insert(&second).unwrap();

        second.status = JobStatus::Running;
        assert!(store.update_if(&second, JobStatus::Pending).unwrap());

        assert_eq!(store.pending_ids().unwrap(), vec![first.id.clone()]);
    }

    #[test]
    fn file_store_roundtrip_and_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let job = sample_job();

        {
            let store = FileStore::open(dir.path()).unwrap();
            store.insert(&job).unwrap();
        }

        // A new handle over the same directory sees the record.
        let store = FileStore::open(dir.path()).unwrap();
        let loaded = store.get(&job.id).unwrap().unwrap();
        assert_eq!(loaded.id, job.id);
        assert_eq!(store.pending_ids().unwrap(), vec![job.id.clone()]);
    }

    #[test]
    fn file_store_check_then_write() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        let mut job = sample_job();
        store.insert(&job).unwrap();

        job.status = JobStatus::Running;
        assert!(store.update_if(&job, JobStatus::Pending).unwrap());
        assert!(!store.update_if(&job, JobStatus::Pending).unwrap());

        job.status = JobStatus::Failed;
        job.error_message = Some("stage request timed out".into());
        assert!(store.update_if(&job, JobStatus::Running).unwrap());

        let loaded = store.get(&job.id).unwrap().unwrap();
        assert_eq!(loaded.status, JobStatus::Failed);
        assert_eq!(
            loaded.error_message.as_deref(),
            Some("stage request timed out")
        );
        assert!(store.pending_ids().unwrap().is_empty());
    }

    #[test]
    fn file_store_rejects_duplicate_insert() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        let job = sample_job();
        store.insert(&job).unwrap();
        assert!(matches!(
            store.insert(&job),
            Err(StoreError::Duplicate(_))
        ));
    }
}

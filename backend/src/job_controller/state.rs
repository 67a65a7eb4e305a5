//! Shared state of background report jobs.
//!
//! - `JobsState` is cloned into the Actix application data in `main.rs`.
//! - `JobUpdate` carries a status change from a job back to the state.
//! - `start_job_updater` is the single writer: it drains the update channel
//!   and stores each status under its job id.

use common::jobs::JobStatus;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::{mpsc, Mutex, RwLock};

#[derive(Clone)]
pub struct JobsState {
    /// Job id to latest status. Read by `GET /api/reports/status/{job_id}`,
    /// written only by `start_job_updater`.
    pub jobs: Arc<RwLock<HashMap<String, JobStatus>>>,

    pub tx: mpsc::Sender<JobUpdate>,

    /// Held by a job for its whole run, so two jobs never read and write
    /// back the same sheet file at once.
    pub sheet_lock: Arc<Mutex<()>>,
}

impl JobsState {
    pub fn new(tx: mpsc::Sender<JobUpdate>) -> Self {
        Self {
            jobs: Arc::new(RwLock::new(HashMap::new())),
            tx,
            sheet_lock: Arc::new(Mutex::new(())),
        }
    }
}

#[derive(Debug)]
pub struct JobUpdate {
    pub(crate) job_id: String,
    pub(crate) status: JobStatus,
}

impl JobUpdate {
    pub fn new(job_id: impl Into<String>, status: JobStatus) -> Self {
        Self {
            job_id: job_id.into(),
            status,
        }
    }
}

/// Runs until every sender is dropped; spawned once from `main.rs`.
pub async fn start_job_updater(state: JobsState, mut rx: mpsc::Receiver<JobUpdate>) {
    while let Some(update) = rx.recv().await {
        let mut jobs = state.jobs.write().await;
        jobs.insert(update.job_id, update.status);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn updater_keeps_the_latest_status() {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        runtime.block_on(async {
            let (tx, rx) = mpsc::channel(8);
            let state = JobsState::new(tx.clone());
            tokio::spawn(start_job_updater(state.clone(), rx));

            tx.send(JobUpdate::new("job-1", JobStatus::InProgress(50)))
                .await
                .unwrap();
            tx.send(JobUpdate::new("job-1", JobStatus::Completed("done".to_string())))
                .await
                .unwrap();

            let expected = JobStatus::Completed("done".to_string());
            for _ in 0..100 {
                if state.jobs.read().await.get("job-1") == Some(&expected) {
                    return;
                }
                tokio::task::yield_now().await;
            }
            panic!("job status was never updated");
        });
    }
}

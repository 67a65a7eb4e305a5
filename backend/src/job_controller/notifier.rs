//! Bridges pipeline notifications from a blocking worker into job updates.

use crate::report::pipeline::{Notice, NoticeLevel, Notifier};
use common::jobs::JobStatus;
use tokio::sync::mpsc;

/// Sent from the blocking worker to the job's async listener.
#[derive(Debug, PartialEq)]
pub enum ReportUpdate {
    Job(JobStatus),
    Row { done: usize, total: usize },
}

impl ReportUpdate {
    pub fn into_status(self) -> JobStatus {
        match self {
            ReportUpdate::Job(status) => status,
            ReportUpdate::Row { done, total } => JobStatus::InProgress(percent(done, total)),
        }
    }
}

/// Populating rows is the bulk of a run; the last few percent cover
/// rendering and write-back, so progress tops out below 100.
fn percent(done: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    (done as f32 / total as f32 * 95.0) as u32
}

/// Must only be used off the async runtime: it calls `blocking_send`.
pub struct JobNotifier {
    tx: mpsc::Sender<ReportUpdate>,
}

impl JobNotifier {
    pub fn new(tx: mpsc::Sender<ReportUpdate>) -> Self {
        Self { tx }
    }
}

impl Notifier for JobNotifier {
    fn notify(&self, notice: Notice) {
        let status = match notice.level {
            NoticeLevel::Info => JobStatus::Completed(notice.message),
            NoticeLevel::Error => JobStatus::Failed(notice.message),
        };
        let _ = self.tx.blocking_send(ReportUpdate::Job(status));
    }

    fn progress(&self, rows_done: usize, rows_total: usize) {
        let _ = self.tx.blocking_send(ReportUpdate::Row {
            done: rows_done,
            total: rows_total,
        });
    }
}

use crate::model::report::{ReportKind, SelectionStrategy};
use serde::{Deserialize, Serialize};

/// Request payload for `POST /api/reports/start`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartReportRequest {
    pub kind: ReportKind,
    pub strategy: SelectionStrategy,
}

use serde::Serialize;
use utoipa::ToSchema;

use crate::entities::PackageRequestStatus;

/// 修复依据：该申请已有的佣金流水
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ReconciliationEvidence {
    pub earning_ids: Vec<i64>,
    pub row_count: usize,
    /// 流水合计(分)
    pub total_amount: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ReconciledRequest {
    pub request_id: i64,
    pub previous_status: PackageRequestStatus,
    pub new_status: PackageRequestStatus,
    pub evidence: ReconciliationEvidence,
}

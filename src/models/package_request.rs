use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entities::{EarningType, PackageRequestStatus, package_request_entity as requests};

use super::{EarningResponse, PaginatedResponse};

/// 审批动作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalDecision {
    Approve,
    Reject,
}

/// 审批请求体
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct DecisionRequest {
    pub decision: ApprovalDecision,
    /// 管理员备注，会写入申请的 admin_notes
    pub admin_notes: Option<String>,
}

/// 单个受益人的佣金
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct BeneficiaryPayout {
    pub user_id: i64,
    pub earning_type: EarningType,
    /// 相对购买人的层级，1 为直推
    pub depth: i32,
    /// 金额(分)
    pub amount: i64,
    /// 本次审批新写入的流水为 true；续跑时沿用已有流水为 false
    pub newly_recorded: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct RankChange {
    pub user_id: i64,
    pub previous_rank_id: Option<i64>,
    pub new_rank_id: Option<i64>,
    pub new_rank_title: Option<String>,
}

/// 审批结果
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ApprovalOutcome {
    pub request_id: i64,
    pub status: PackageRequestStatus,
    pub beneficiaries: Vec<BeneficiaryPayout>,
    pub rank_changes: Vec<RankChange>,
    /// 是否沿用了上一次中断审批已写入的流水
    pub resumed: bool,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PackageRequestResponse {
    pub id: i64,
    pub user_id: i64,
    pub package_id: i64,
    pub status: PackageRequestStatus,
    pub admin_notes: Option<String>,
    pub processed_by: Option<i64>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<requests::Model> for PackageRequestResponse {
    fn from(m: requests::Model) -> Self {
        Self {
            id: m.id,
            user_id: m.user_id,
            package_id: m.package_id,
            status: m.status,
            admin_notes: m.admin_notes,
            processed_by: m.processed_by,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

/// 申请列表查询参数
#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct PackageRequestQuery {
    /// 按状态过滤
    pub status: Option<PackageRequestStatus>,
    /// 页码 (默认 1)
    pub page: Option<u32>,
    /// 每页数量 (默认 20)
    pub per_page: Option<u32>,
}

/// 申请详情（含佣金流水）
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PackageRequestDetail {
    pub request: PackageRequestResponse,
    pub earnings: Vec<EarningResponse>,
    /// 流水合计(分)
    pub total_paid: i64,
}

pub type PackageRequestPageResponse = PaginatedResponse<PackageRequestResponse>;

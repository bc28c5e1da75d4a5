use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::entities::{EarningType, earning_entity as earnings};

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct EarningResponse {
    pub id: i64,
    /// 受益人
    pub user_id: i64,
    pub package_request_id: i64,
    pub earning_type: EarningType,
    pub depth: i32,
    /// 金额(分)
    pub amount: i64,
    pub description: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<earnings::Model> for EarningResponse {
    fn from(m: earnings::Model) -> Self {
        Self {
            id: m.id,
            user_id: m.user_id,
            package_request_id: m.package_request_id,
            earning_type: m.earning_type,
            depth: m.depth,
            amount: m.amount,
            description: m.description,
            created_at: m.created_at,
        }
    }
}

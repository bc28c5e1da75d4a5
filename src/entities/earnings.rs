use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema, DeriveActiveEnum,
    EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "String(Some(32))")]
#[serde(rename_all = "snake_case")]
pub enum EarningType {
    #[sea_orm(string_value = "direct_commission")]
    DirectCommission,
    #[sea_orm(string_value = "indirect_commission")]
    IndirectCommission,
}

impl std::fmt::Display for EarningType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EarningType::DirectCommission => write!(f, "direct_commission"),
            EarningType::IndirectCommission => write!(f, "indirect_commission"),
        }
    }
}

/// 佣金流水实体（审计记录，写入后不可变）
/// - amount: 金额(分)
/// - idempotency_key: `{package_request_id}:{user_id}:{earning_type}`，唯一
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "earnings")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// 受益人
    pub user_id: i64,
    pub package_request_id: i64,
    pub earning_type: EarningType,
    /// 受益人相对购买人的层级，1 为直推
    pub depth: i32,
    pub amount: i64,
    pub description: Option<String>,
    #[sea_orm(unique)]
    pub idempotency_key: String,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

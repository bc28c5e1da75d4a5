use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema, DeriveActiveEnum, EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "String(Some(32))")]
#[serde(rename_all = "snake_case")]
pub enum PackageRequestStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "approved")]
    Approved,
    #[sea_orm(string_value = "failed")]
    Failed,
}

impl PackageRequestStatus {
    /// approved / failed 均为终态
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PackageRequestStatus::Pending)
    }
}

impl std::fmt::Display for PackageRequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PackageRequestStatus::Pending => write!(f, "pending"),
            PackageRequestStatus::Approved => write!(f, "approved"),
            PackageRequestStatus::Failed => write!(f, "failed"),
        }
    }
}

/// 套餐购买申请：由会员创建，只允许审批流程 / 对账工具修改，不删除
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "package_requests")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// 购买人
    pub user_id: i64,
    pub package_id: i64,
    pub status: PackageRequestStatus,
    pub admin_notes: Option<String>,
    /// 处理该申请的管理员
    pub processed_by: Option<i64>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

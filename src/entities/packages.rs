use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

/// 套餐实体
/// - price: 价格(分)
/// - direct_rate_bp: 直推佣金比例 (basis points, 1% = 100bp)
/// - 间推比例按层级存放在 package_commission_levels
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "packages")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub name: String,
    pub price: i64,
    pub points: i64,
    pub direct_rate_bp: i32,
    /// 有效天数，用于计算到期时间
    pub duration_days: i32,
    pub is_active: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

/// 会员实体
/// - balance / total_earnings 单位为分
/// - referrer_id 指向直接上线，构成推荐森林（无环）
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub username: String,
    pub points: i64,
    pub balance: i64,
    pub rank_id: Option<i64>,
    pub current_package_id: Option<i64>,
    pub package_expires_at: Option<DateTime<Utc>>,
    pub referrer_id: Option<i64>,
    pub referral_count: i64,
    pub total_earnings: i64,
    pub is_active: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Model {
    /// 当前套餐是否仍在有效期内
    pub fn has_valid_package(&self, now: DateTime<Utc>) -> bool {
        self.current_package_id.is_some()
            && self.package_expires_at.is_some_and(|expires| expires > now)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

//! 佣金流水写入。流水只追加、不修改；幂等键保证同一申请同一受益人同一类型只有一行。

use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};

use crate::entities::{EarningType, earning_entity as earnings};
use crate::error::AppResult;
use crate::services::commission_calculator::Payout;

pub fn idempotency_key(request_id: i64, user_id: i64, earning_type: EarningType) -> String {
    format!("{request_id}:{user_id}:{earning_type}")
}

fn describe(payout: &Payout, request_id: i64, buyer: &str) -> String {
    match payout.earning_type {
        EarningType::DirectCommission => {
            format!("Direct commission from {buyer} (package request #{request_id})")
        }
        EarningType::IndirectCommission => format!(
            "Level {} commission from {buyer} (package request #{request_id})",
            payout.depth
        ),
    }
}

pub async fn entries_for_request<C: ConnectionTrait>(
    db: &C,
    request_id: i64,
) -> AppResult<Vec<earnings::Model>> {
    let rows = earnings::Entity::find()
        .filter(earnings::Column::PackageRequestId.eq(request_id))
        .order_by_asc(earnings::Column::Depth)
        .order_by_asc(earnings::Column::Id)
        .all(db)
        .await?;
    Ok(rows)
}

/// 逐行写入，返回与 payouts 对齐的标记：true 为本次新插入，false 为幂等键已存在
pub async fn append<C: ConnectionTrait>(
    db: &C,
    request_id: i64,
    buyer: &str,
    payouts: &[Payout],
) -> AppResult<Vec<bool>> {
    let mut inserted = Vec::with_capacity(payouts.len());
    let now = Utc::now();

    for payout in payouts {
        let row = earnings::ActiveModel {
            user_id: Set(payout.user_id),
            package_request_id: Set(request_id),
            earning_type: Set(payout.earning_type),
            depth: Set(payout.depth as i32),
            amount: Set(payout.amount),
            description: Set(Some(describe(payout, request_id, buyer))),
            idempotency_key: Set(idempotency_key(request_id, payout.user_id, payout.earning_type)),
            created_at: Set(Some(now)),
            ..Default::default()
        };

        let affected = earnings::Entity::insert(row)
            .on_conflict(
                OnConflict::column(earnings::Column::IdempotencyKey)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(db)
            .await?;

        if affected == 0 {
            log::warn!(
                "Earning {} already recorded, skipped",
                idempotency_key(request_id, payout.user_id, payout.earning_type)
            );
        }
        inserted.push(affected > 0);
    }

    Ok(inserted)
}

/// 用户全部佣金之和（分）。在应用侧求和，避免各后端 SUM 返回类型不一致
pub async fn total_for_user<C: ConnectionTrait>(db: &C, user_id: i64) -> AppResult<i64> {
    let amounts: Vec<i64> = earnings::Entity::find()
        .select_only()
        .column(earnings::Column::Amount)
        .filter(earnings::Column::UserId.eq(user_id))
        .into_tuple()
        .all(db)
        .await?;
    Ok(amounts.into_iter().sum())
}

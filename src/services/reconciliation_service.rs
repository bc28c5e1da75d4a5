use std::time::Duration;

use chrono::Utc;
use sea_orm::sea_query::Query;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbBackend, EntityTrait,
    IntoActiveModel, QueryFilter, QueryOrder, Set, TransactionTrait,
};

use crate::config::ApprovalConfig;
use crate::entities::{
    EarningType, PackageRequestStatus, earning_entity as earnings,
    package_request_entity as requests,
};
use crate::error::AppResult;
use crate::models::{ReconciledRequest, ReconciliationEvidence};
use crate::services::approval_service::lock_request;
use crate::services::ledger_writer;

#[derive(Clone)]
pub struct ReconciliationService {
    pool: DatabaseConnection,
    lock_wait: Duration,
}

/// 流水能否作为已完成审批的依据
fn evidence_problem(request: &requests::Model, rows: &[earnings::Model]) -> Option<String> {
    if rows.is_empty() {
        return Some("no earning rows".to_string());
    }
    if let Some(row) = rows.iter().find(|r| r.package_request_id != request.id) {
        return Some(format!(
            "earning {} belongs to request {}",
            row.id, row.package_request_id
        ));
    }
    let direct = rows
        .iter()
        .filter(|r| r.earning_type == EarningType::DirectCommission)
        .count();
    if direct > 1 {
        return Some(format!("{direct} direct commission rows"));
    }
    if let Some(row) = rows.iter().find(|r| r.user_id == request.user_id) {
        return Some(format!("earning {} pays the buyer", row.id));
    }
    None
}

impl ReconciliationService {
    pub fn new(pool: DatabaseConnection, settings: &ApprovalConfig) -> Self {
        Self {
            pool,
            lock_wait: Duration::from_secs(settings.lock_wait_secs),
        }
    }

    /// 修复「流水已写入但状态为 failed」的申请
    ///
    /// 每个申请单独一个事务，行锁后重新检查状态与流水；不新增流水，不改余额和积分。
    /// 单个申请失败只记录日志，不影响其余申请。
    pub async fn reconcile_failed_requests(&self) -> AppResult<Vec<ReconciledRequest>> {
        let candidates = requests::Entity::find()
            .filter(requests::Column::Status.eq(PackageRequestStatus::Failed))
            .filter(
                requests::Column::Id.in_subquery(
                    Query::select()
                        .column(earnings::Column::PackageRequestId)
                        .from(earnings::Entity)
                        .to_owned(),
                ),
            )
            .order_by_asc(requests::Column::Id)
            .all(&self.pool)
            .await?;

        let mut repaired = Vec::new();
        for candidate in candidates {
            match self.repair_one(candidate.id).await {
                Ok(Some(entry)) => repaired.push(entry),
                Ok(None) => {}
                Err(e) => {
                    log::error!("Failed to reconcile package request {}: {e}", candidate.id)
                }
            }
        }

        if !repaired.is_empty() {
            log::info!("Reconciliation repaired {} package requests", repaired.len());
        }
        Ok(repaired)
    }

    async fn repair_one(&self, request_id: i64) -> AppResult<Option<ReconciledRequest>> {
        let is_postgres = self.pool.get_database_backend() == DbBackend::Postgres;
        let txn = self.pool.begin().await?;

        let request = lock_request(&txn, request_id, is_postgres, self.lock_wait).await?;
        if request.status != PackageRequestStatus::Failed {
            // 并发处理过了
            return Ok(None);
        }

        let rows = ledger_writer::entries_for_request(&txn, request_id).await?;
        if let Some(problem) = evidence_problem(&request, &rows) {
            log::warn!(
                "Package request {request_id} left as failed, earning evidence rejected: {problem}"
            );
            return Ok(None);
        }

        let evidence = ReconciliationEvidence {
            earning_ids: rows.iter().map(|r| r.id).collect(),
            row_count: rows.len(),
            total_amount: rows.iter().map(|r| r.amount).sum(),
        };
        let annotation = format!(
            "[reconciled {}] failed -> approved; earnings {:?}, {} rows, total {} cents",
            Utc::now().to_rfc3339(),
            evidence.earning_ids,
            evidence.row_count,
            evidence.total_amount
        );
        let notes = match request.admin_notes.as_deref() {
            Some(existing) if !existing.is_empty() => format!("{existing}\n{annotation}"),
            _ => annotation,
        };

        let previous_status = request.status;
        let mut am = request.into_active_model();
        am.status = Set(PackageRequestStatus::Approved);
        am.admin_notes = Set(Some(notes));
        am.updated_at = Set(Some(Utc::now()));
        am.update(&txn).await?;
        txn.commit().await?;

        log::info!(
            "Package request {request_id} reconciled to approved ({} earning rows, {} cents)",
            evidence.row_count,
            evidence.total_amount
        );

        Ok(Some(ReconciledRequest {
            request_id,
            previous_status,
            new_status: PackageRequestStatus::Approved,
            evidence,
        }))
    }
}

use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    DbBackend, EntityTrait, IntoActiveModel, IsolationLevel, QueryFilter, QueryOrder, QuerySelect,
    Set, Statement, TransactionTrait,
};

use crate::config::ApprovalConfig;
use crate::entities::{
    PackageRequestStatus, commission_level_entity as levels, package_entity as packages,
    package_request_entity as requests, user_entity as users,
};
use crate::error::{AppError, AppResult};
use crate::models::{ApprovalDecision, ApprovalOutcome, BeneficiaryPayout, RankChange};
use crate::services::commission_calculator::{CommissionSchedule, calculate};
use crate::services::ledger_writer;
use crate::services::rank_resolver::RankTable;
use crate::services::referral_graph::ancestors_of;
use crate::utils::{AdminIdentity, RetryPolicy};

/// 购买资格检查结果
enum Eligibility {
    Eligible {
        buyer: users::Model,
        package: packages::Model,
        /// 生效后的积分与到期时间，均已做溢出检查
        points: i64,
        expires_at: DateTime<Utc>,
    },
    Rejected(String),
}

#[derive(Clone)]
pub struct ApprovalService {
    pool: DatabaseConnection,
    settings: ApprovalConfig,
    retry: RetryPolicy,
}

impl ApprovalService {
    pub fn new(pool: DatabaseConnection, settings: ApprovalConfig) -> Self {
        let retry = RetryPolicy::from(&settings);
        Self {
            pool,
            settings,
            retry,
        }
    }

    /// 审批套餐购买申请
    ///
    /// 整个审批在一个事务内完成：
    /// 1. 行锁读取申请，非 pending 直接返回 AlreadyProcessed；reject 置为 failed
    /// 2. 校验购买人与套餐，不合格置为 failed 并返回 ValidationError
    ///    （申请已有流水时不置 failed，保持 pending 并返回 ValidationError）
    /// 3. 已有佣金流水则视为上次中断，跳过计算
    /// 4. 否则回溯上线、计算佣金、写流水并入账余额
    /// 5. 更新购买人套餐、积分、等级，重算受益人累计收益
    /// 6. 置为 approved 并提交
    ///
    /// 取连接、开事务、行锁的等待合计受 lock_wait 限制。
    /// 锁等待 / 死锁 / 序列化冲突按重试策略从第 1 步整体重试。
    pub async fn approve_or_reject_request(
        &self,
        admin: AdminIdentity,
        request_id: i64,
        decision: ApprovalDecision,
        admin_notes: Option<String>,
    ) -> AppResult<ApprovalOutcome> {
        let mut attempt = 1;
        loop {
            match self
                .run_unit(admin, request_id, decision, admin_notes.as_deref())
                .await
            {
                Err(e) if e.is_transient() && self.retry.should_retry(attempt) => {
                    let delay = self.retry.delay_for_attempt(attempt);
                    log::warn!(
                        "Package request {request_id} attempt {attempt}/{} failed: {e}; retrying in {}ms",
                        self.retry.max_attempts,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    async fn run_unit(
        &self,
        admin: AdminIdentity,
        request_id: i64,
        decision: ApprovalDecision,
        admin_notes: Option<&str>,
    ) -> AppResult<ApprovalOutcome> {
        let started = Instant::now();
        let backend = self.pool.get_database_backend();
        let is_postgres = backend == DbBackend::Postgres;
        let lock_wait = Duration::from_secs(self.settings.lock_wait_secs);

        let txn = tokio::time::timeout(lock_wait, self.begin_unit(backend, lock_wait))
            .await
            .map_err(|_| lock_wait_exceeded(request_id, lock_wait))??;

        // 1. 行锁
        let request = lock_request(&txn, request_id, is_postgres, lock_wait).await?;
        if request.status != PackageRequestStatus::Pending {
            return Err(AppError::AlreadyProcessed {
                request_id,
                status: request.status,
            });
        }

        // 已有流水的申请不能再置为 failed，否则对账会把它翻成 approved
        let existing = ledger_writer::entries_for_request(&txn, request_id).await?;

        let now = Utc::now();
        if decision == ApprovalDecision::Reject {
            if !existing.is_empty() {
                log::warn!(
                    "Package request {request_id} has {} earning rows; rejection refused, request stays pending",
                    existing.len()
                );
                return Err(AppError::ValidationError(format!(
                    "Package request {request_id} already has {} earning rows and cannot be rejected",
                    existing.len()
                )));
            }
            finish_request(
                &txn,
                request,
                PackageRequestStatus::Failed,
                admin_notes.map(str::to_string),
                admin,
                now,
            )
            .await?;
            txn.commit().await?;
            log::info!(
                "Package request {request_id} rejected by admin {}",
                admin.admin_id
            );
            return Ok(ApprovalOutcome {
                request_id,
                status: PackageRequestStatus::Failed,
                beneficiaries: Vec::new(),
                rank_changes: Vec::new(),
                resumed: false,
            });
        }

        // 2. 资格校验
        let eligibility = check_eligibility(&txn, &request, now).await?;
        let (buyer, package, points, expires_at) = match eligibility {
            Eligibility::Eligible {
                buyer,
                package,
                points,
                expires_at,
            } => (buyer, package, points, expires_at),
            Eligibility::Rejected(reason) if !existing.is_empty() => {
                log::error!(
                    "Package request {request_id} failed validation with {} earning rows recorded; left pending: {reason}",
                    existing.len()
                );
                return Err(AppError::ValidationError(format!(
                    "{reason}; package request {request_id} already has earning rows and stays pending"
                )));
            }
            Eligibility::Rejected(reason) => {
                let notes = merge_notes(admin_notes, &format!("Rejected: {reason}"));
                finish_request(
                    &txn,
                    request,
                    PackageRequestStatus::Failed,
                    Some(notes),
                    admin,
                    now,
                )
                .await?;
                txn.commit().await?;
                log::warn!("Package request {request_id} failed validation: {reason}");
                return Err(AppError::ValidationError(reason));
            }
        };

        let rank_table = RankTable::load(&txn).await?;

        // 3. 已有流水：续跑
        let resumed = !existing.is_empty();
        let beneficiaries = if resumed {
            log::warn!(
                "PartialWriteDetected: package request {request_id} already has {} earning rows; resuming without recomputation",
                existing.len()
            );
            existing
                .into_iter()
                .map(|e| BeneficiaryPayout {
                    user_id: e.user_id,
                    earning_type: e.earning_type,
                    depth: e.depth,
                    amount: e.amount,
                    newly_recorded: false,
                })
                .collect::<Vec<_>>()
        } else {
            // 4. 计算并写流水
            self.record_commissions(&txn, request_id, &buyer, &package, started, now)
                .await?
        };

        // 5. 更新购买人
        let rank_changes = apply_package_to_buyer(
            &txn,
            buyer,
            package.id,
            points,
            expires_at,
            &rank_table,
            now,
        )
        .await?;

        let beneficiary_ids: BTreeSet<i64> = beneficiaries.iter().map(|b| b.user_id).collect();
        for user_id in beneficiary_ids {
            let total = ledger_writer::total_for_user(&txn, user_id).await?;
            users::Entity::update_many()
                .col_expr(users::Column::TotalEarnings, Expr::value(total))
                .filter(users::Column::Id.eq(user_id))
                .exec(&txn)
                .await?;
        }

        // 6. 完成
        finish_request(
            &txn,
            request,
            PackageRequestStatus::Approved,
            admin_notes.map(str::to_string),
            admin,
            now,
        )
        .await?;
        txn.commit().await?;

        log::info!(
            "Package request {request_id} approved by admin {}: {} beneficiaries, resumed={resumed}",
            admin.admin_id,
            beneficiaries.len()
        );

        Ok(ApprovalOutcome {
            request_id,
            status: PackageRequestStatus::Approved,
            beneficiaries,
            rank_changes,
            resumed,
        })
    }

    async fn begin_unit(
        &self,
        backend: DbBackend,
        lock_wait: Duration,
    ) -> AppResult<DatabaseTransaction> {
        if backend != DbBackend::Postgres {
            return Ok(self.pool.begin().await?);
        }
        let txn = self
            .pool
            .begin_with_config(Some(IsolationLevel::ReadCommitted), None)
            .await?;
        // 0 在 Postgres 中表示不限时
        txn.execute(Statement::from_string(
            backend,
            format!("SET LOCAL lock_timeout = '{}ms'", lock_wait.as_millis().max(1)),
        ))
        .await?;
        Ok(txn)
    }

    async fn record_commissions(
        &self,
        txn: &DatabaseTransaction,
        request_id: i64,
        buyer: &users::Model,
        package: &packages::Model,
        started: Instant,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<BeneficiaryPayout>> {
        let level_rows = levels::Entity::find()
            .filter(levels::Column::PackageId.eq(package.id))
            .order_by_asc(levels::Column::Depth)
            .all(txn)
            .await?;
        let schedule = CommissionSchedule::from_package(package, &level_rows)?;
        let chain = ancestors_of(txn, buyer, schedule.max_depth()).await?;
        let plan = calculate(&schedule, &chain, self.settings.overflow_policy);
        if plan.forfeited > 0 {
            log::info!(
                "Package request {request_id}: {} cents forfeited, upline has only {} levels",
                plan.forfeited,
                chain.len()
            );
        }

        // 流水开始写入后不再中止
        let budget = Duration::from_secs(self.settings.execution_budget_secs);
        if started.elapsed() >= budget {
            return Err(AppError::ConcurrencyTimeout(format!(
                "Package request {request_id} exceeded the {}s execution budget before ledger writes",
                budget.as_secs()
            )));
        }

        let inserted = ledger_writer::append(txn, request_id, &buyer.username, &plan.payouts).await?;

        let mut beneficiaries = Vec::with_capacity(plan.payouts.len());
        for (payout, newly_recorded) in plan.payouts.iter().zip(inserted) {
            if newly_recorded {
                users::Entity::update_many()
                    .col_expr(
                        users::Column::Balance,
                        Expr::col(users::Column::Balance).add(payout.amount),
                    )
                    .col_expr(users::Column::UpdatedAt, Expr::value(Some(now)))
                    .filter(users::Column::Id.eq(payout.user_id))
                    .exec(txn)
                    .await?;
            }
            beneficiaries.push(BeneficiaryPayout {
                user_id: payout.user_id,
                earning_type: payout.earning_type,
                depth: payout.depth as i32,
                amount: payout.amount,
                newly_recorded,
            });
        }
        Ok(beneficiaries)
    }
}

/// 读取申请并加行锁（Postgres 下为 SELECT ... FOR UPDATE），等待超过 lock_wait 视为并发超时
pub(crate) async fn lock_request(
    txn: &DatabaseTransaction,
    request_id: i64,
    is_postgres: bool,
    lock_wait: Duration,
) -> AppResult<requests::Model> {
    let mut query = requests::Entity::find_by_id(request_id);
    if is_postgres {
        query = query.lock_exclusive();
    }
    tokio::time::timeout(lock_wait, query.one(txn))
        .await
        .map_err(|_| lock_wait_exceeded(request_id, lock_wait))??
        .ok_or_else(|| AppError::NotFound(format!("Package request {request_id} not found")))
}

fn lock_wait_exceeded(request_id: i64, lock_wait: Duration) -> AppError {
    AppError::ConcurrencyTimeout(format!(
        "Timed out after {}ms waiting for the lock on package request {request_id}",
        lock_wait.as_millis()
    ))
}

async fn check_eligibility(
    txn: &DatabaseTransaction,
    request: &requests::Model,
    now: DateTime<Utc>,
) -> AppResult<Eligibility> {
    let Some(package) = packages::Entity::find_by_id(request.package_id)
        .one(txn)
        .await?
    else {
        return Ok(Eligibility::Rejected(format!(
            "Package {} does not exist",
            request.package_id
        )));
    };
    if !package.is_active {
        return Ok(Eligibility::Rejected(format!(
            "Package '{}' is not active",
            package.name
        )));
    }
    if package.duration_days <= 0 {
        return Ok(Eligibility::Rejected(format!(
            "Package '{}' has a duration of {} days",
            package.name, package.duration_days
        )));
    }
    let Some(expires_at) = chrono::Duration::try_days(package.duration_days as i64)
        .and_then(|d| now.checked_add_signed(d))
    else {
        return Ok(Eligibility::Rejected(format!(
            "Package '{}' duration of {} days is out of range",
            package.name, package.duration_days
        )));
    };
    if package.points < 0 {
        return Ok(Eligibility::Rejected(format!(
            "Package '{}' grants negative points ({})",
            package.name, package.points
        )));
    }

    let Some(buyer) = users::Entity::find_by_id(request.user_id).one(txn).await? else {
        return Ok(Eligibility::Rejected(format!(
            "Buyer {} does not exist",
            request.user_id
        )));
    };
    if !buyer.is_active {
        return Ok(Eligibility::Rejected(format!(
            "Buyer '{}' is deactivated",
            buyer.username
        )));
    }

    // 当前套餐仍有效时不允许降级
    if buyer.has_valid_package(now)
        && let Some(current_id) = buyer.current_package_id
        && let Some(current) = packages::Entity::find_by_id(current_id).one(txn).await?
        && current.price > package.price
    {
        return Ok(Eligibility::Rejected(format!(
            "Buyer '{}' holds package '{}' until {}; downgrade to '{}' is not allowed",
            buyer.username,
            current.name,
            buyer
                .package_expires_at
                .map(|t| t.to_rfc3339())
                .unwrap_or_default(),
            package.name
        )));
    }

    let Some(points) = buyer.points.checked_add(package.points) else {
        return Ok(Eligibility::Rejected(format!(
            "Buyer '{}' points would overflow ({} + {})",
            buyer.username, buyer.points, package.points
        )));
    };

    Ok(Eligibility::Eligible {
        buyer,
        package,
        points,
        expires_at,
    })
}

/// 套餐生效：有效期、积分、等级
async fn apply_package_to_buyer(
    txn: &DatabaseTransaction,
    buyer: users::Model,
    package_id: i64,
    points: i64,
    expires_at: DateTime<Utc>,
    rank_table: &RankTable,
    now: DateTime<Utc>,
) -> AppResult<Vec<RankChange>> {
    let new_rank = rank_table.resolve(points);
    let new_rank_id = new_rank.map(|r| r.id);

    let mut rank_changes = Vec::new();
    if new_rank_id != buyer.rank_id {
        log::info!(
            "User {} rank changed {:?} -> {:?} at {points} points",
            buyer.id,
            buyer.rank_id,
            new_rank_id
        );
        rank_changes.push(RankChange {
            user_id: buyer.id,
            previous_rank_id: buyer.rank_id,
            new_rank_id,
            new_rank_title: new_rank.map(|r| r.title.clone()),
        });
    }

    let mut am = buyer.into_active_model();
    am.points = Set(points);
    am.rank_id = Set(new_rank_id);
    am.current_package_id = Set(Some(package_id));
    am.package_expires_at = Set(Some(expires_at));
    am.updated_at = Set(Some(now));
    am.update(txn).await?;

    Ok(rank_changes)
}

async fn finish_request(
    txn: &DatabaseTransaction,
    request: requests::Model,
    status: PackageRequestStatus,
    admin_notes: Option<String>,
    admin: AdminIdentity,
    now: DateTime<Utc>,
) -> AppResult<requests::Model> {
    let mut am = request.into_active_model();
    am.status = Set(status);
    am.admin_notes = Set(admin_notes);
    am.processed_by = Set(Some(admin.admin_id));
    am.updated_at = Set(Some(now));
    Ok(am.update(txn).await?)
}

fn merge_notes(admin_notes: Option<&str>, extra: &str) -> String {
    match admin_notes.map(str::trim) {
        Some(notes) if !notes.is_empty() => format!("{notes}\n{extra}"),
        _ => extra.to_string(),
    }
}

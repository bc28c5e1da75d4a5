//! 测试用内存 SQLite 数据库与数据构造

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbBackend,
    Schema, Set,
};

use crate::config::ApprovalConfig;
use crate::entities::{
    EarningType, PackageRequestStatus, commission_level_entity as levels,
    earning_entity as earnings, package_entity as packages, package_request_entity as requests,
    rank_entity as ranks, user_entity as users,
};
use crate::services::ledger_writer::idempotency_key;

pub async fn setup_db() -> DatabaseConnection {
    // 单连接，保证所有查询落在同一个内存库上
    let mut opt = ConnectOptions::new("sqlite::memory:");
    opt.max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let db = Database::connect(opt).await.expect("connect sqlite");

    let schema = Schema::new(DbBackend::Sqlite);
    let statements = [
        schema.create_table_from_entity(ranks::Entity),
        schema.create_table_from_entity(users::Entity),
        schema.create_table_from_entity(packages::Entity),
        schema.create_table_from_entity(levels::Entity),
        schema.create_table_from_entity(requests::Entity),
        schema.create_table_from_entity(earnings::Entity),
    ];
    for stmt in statements.iter() {
        db.execute(db.get_database_backend().build(stmt))
            .await
            .expect("create table");
    }
    db
}

pub fn approval_config() -> ApprovalConfig {
    ApprovalConfig {
        retry_base_delay_ms: 1,
        ..ApprovalConfig::default()
    }
}

pub async fn insert_user(
    db: &DatabaseConnection,
    username: &str,
    referrer_id: Option<i64>,
) -> users::Model {
    let now = Utc::now();
    users::ActiveModel {
        username: Set(username.to_string()),
        points: Set(0),
        balance: Set(0),
        rank_id: Set(None),
        current_package_id: Set(None),
        package_expires_at: Set(None),
        referrer_id: Set(referrer_id),
        referral_count: Set(0),
        total_earnings: Set(0),
        is_active: Set(true),
        created_at: Set(Some(now)),
        updated_at: Set(Some(now)),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("insert user")
}

/// indirect_rates_bp[0] 对应第 2 层
pub async fn insert_package(
    db: &DatabaseConnection,
    price: i64,
    points: i64,
    direct_rate_bp: i32,
    indirect_rates_bp: &[i32],
    is_active: bool,
) -> packages::Model {
    let now = Utc::now();
    let package = packages::ActiveModel {
        name: Set(format!("Package {price}")),
        price: Set(price),
        points: Set(points),
        direct_rate_bp: Set(direct_rate_bp),
        duration_days: Set(30),
        is_active: Set(is_active),
        created_at: Set(Some(now)),
        updated_at: Set(Some(now)),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("insert package");

    for (idx, rate) in indirect_rates_bp.iter().enumerate() {
        levels::ActiveModel {
            package_id: Set(package.id),
            depth: Set(idx as i32 + 2),
            rate_bp: Set(*rate),
            ..Default::default()
        }
        .insert(db)
        .await
        .expect("insert commission level");
    }
    package
}

pub async fn insert_rank(db: &DatabaseConnection, title: &str, required_points: i64) -> ranks::Model {
    ranks::ActiveModel {
        title: Set(title.to_string()),
        required_points: Set(required_points),
        created_at: Set(Some(Utc::now())),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("insert rank")
}

pub async fn insert_request(
    db: &DatabaseConnection,
    user_id: i64,
    package_id: i64,
    status: PackageRequestStatus,
) -> requests::Model {
    let now = Utc::now();
    requests::ActiveModel {
        user_id: Set(user_id),
        package_id: Set(package_id),
        status: Set(status),
        admin_notes: Set(None),
        processed_by: Set(None),
        created_at: Set(Some(now)),
        updated_at: Set(Some(now)),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("insert package request")
}

/// 直接写入一行流水，模拟历史数据或中断的审批
pub async fn insert_earning(
    db: &DatabaseConnection,
    request_id: i64,
    user_id: i64,
    earning_type: EarningType,
    depth: i32,
    amount: i64,
) -> earnings::Model {
    earnings::ActiveModel {
        user_id: Set(user_id),
        package_request_id: Set(request_id),
        earning_type: Set(earning_type),
        depth: Set(depth),
        amount: Set(amount),
        description: Set(None),
        idempotency_key: Set(idempotency_key(request_id, user_id, earning_type)),
        created_at: Set(Some(Utc::now())),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("insert earning")
}

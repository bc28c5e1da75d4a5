use actix_web::{App, HttpServer, middleware::Logger, web};
use chrono::Local;
use env_logger::{Env, Target};
use std::io::Write;

use rewards_backoffice::{
    config::Config,
    database::{create_pool, run_migrations},
    handlers,
    middlewares::{AdminAuthMiddleware, create_cors},
    services::*,
    swagger::swagger_config,
    tasks,
    utils::JwtService,
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // 每行一条 JSON 日志
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let ts = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z");
            let level = record.level().as_str().to_ascii_lowercase();
            let msg_json = serde_json::to_string(&format!("{}", record.args()))
                .unwrap_or_else(|_| "\"<invalid utf8>\"".to_string());
            writeln!(
                buf,
                "{{\"timestamp\":\"{}\",\"level\":\"{}\",\"message\":{},\"target\":\"{}\"}}",
                ts,
                level,
                msg_json,
                record.target(),
            )
        })
        .target(Target::Stdout)
        .init();

    let config = Config::from_toml().expect("Failed to load configuration");

    let pool = create_pool(&config.database)
        .await
        .expect("Failed to connect to the database");

    run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");

    let jwt_service = JwtService::new(&config.jwt.secret);

    let approval_service = ApprovalService::new(pool.clone(), config.approval.clone());
    let reconciliation_service = ReconciliationService::new(pool.clone(), &config.approval);
    let package_request_service = PackageRequestService::new(pool.clone());
    let referral_graph_service = ReferralGraphService::new(pool.clone());

    tasks::spawn_all(&config.reconciliation, reconciliation_service.clone());

    log::info!(
        "Starting HTTP server at {}:{} (overflow policy: {:?})",
        config.server.host,
        config.server.port,
        config.approval.overflow_policy
    );

    HttpServer::new(move || {
        App::new()
            .wrap(AdminAuthMiddleware::new(jwt_service.clone()))
            .wrap(create_cors())
            .wrap(Logger::default())
            .app_data(web::Data::new(approval_service.clone()))
            .app_data(web::Data::new(reconciliation_service.clone()))
            .app_data(web::Data::new(package_request_service.clone()))
            .app_data(web::Data::new(referral_graph_service.clone()))
            .configure(swagger_config)
            .service(web::scope("/api/v1").configure(handlers::admin_config))
    })
    .bind((config.server.host.as_str(), config.server.port))?
    .run()
    .await
}

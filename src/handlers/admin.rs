use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};

use crate::entities::PackageRequestStatus;
use crate::error::AppError;
use crate::middlewares::current_admin;
use crate::models::*;
use crate::services::{
    ApprovalService, PackageRequestService, ReconciliationService, ReferralGraphService,
};

#[utoipa::path(
    post,
    path = "/admin/package-requests/{id}/decision",
    tag = "admin",
    params(
        ("id" = i64, Path, description = "套餐申请ID")
    ),
    request_body = DecisionRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "审批完成", body = ApprovalOutcome),
        (status = 400, description = "不符合条件：无流水时申请置为 failed，已有流水时保持 pending"),
        (status = 401, description = "未授权"),
        (status = 403, description = "非管理员"),
        (status = 404, description = "申请不存在"),
        (status = 409, description = "申请已处理"),
        (status = 503, description = "并发冲突，稍后重试")
    )
)]
/// 审批（approve）或驳回（reject）套餐购买申请
pub async fn decide_package_request(
    service: web::Data<ApprovalService>,
    req: HttpRequest,
    path: web::Path<i64>,
    body: web::Json<DecisionRequest>,
) -> Result<HttpResponse> {
    let Some(admin) = current_admin(&req) else {
        return Ok(AppError::AuthError("Missing admin identity".to_string()).error_response());
    };
    let DecisionRequest {
        decision,
        admin_notes,
    } = body.into_inner();

    match service
        .approve_or_reject_request(admin, path.into_inner(), decision, admin_notes)
        .await
    {
        Ok(outcome) => Ok(HttpResponse::Ok().json(ApiResponse::success(outcome))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/admin/package-requests",
    tag = "admin",
    params(
        ("status" = Option<PackageRequestStatus>, Query, description = "按状态过滤"),
        ("page" = Option<u32>, Query, description = "页码 (默认1)"),
        ("per_page" = Option<u32>, Query, description = "每页数量 (默认20，最大100)")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "获取申请列表成功", body = PaginatedResponse<PackageRequestResponse>),
        (status = 401, description = "未授权")
    )
)]
pub async fn list_package_requests(
    service: web::Data<PackageRequestService>,
    query: web::Query<PackageRequestQuery>,
) -> Result<HttpResponse> {
    match service.list(&query.into_inner()).await {
        Ok(page) => Ok(HttpResponse::Ok().json(ApiResponse::success(page))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/admin/package-requests/{id}",
    tag = "admin",
    params(
        ("id" = i64, Path, description = "套餐申请ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "获取申请详情成功", body = PackageRequestDetail),
        (status = 401, description = "未授权"),
        (status = 404, description = "申请不存在")
    )
)]
pub async fn get_package_request(
    service: web::Data<PackageRequestService>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    match service.detail(path.into_inner()).await {
        Ok(detail) => Ok(HttpResponse::Ok().json(ApiResponse::success(detail))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/admin/reconciliation/run",
    tag = "admin",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "对账完成，返回被修复的申请", body = [ReconciledRequest]),
        (status = 401, description = "未授权")
    )
)]
/// 手动触发对账：把流水完整但状态为 failed 的申请修复为 approved
pub async fn run_reconciliation(
    service: web::Data<ReconciliationService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    if let Some(admin) = current_admin(&req) {
        log::info!("Reconciliation triggered by admin {}", admin.admin_id);
    }
    match service.reconcile_failed_requests().await {
        Ok(repaired) => {
            let message = format!("{} package requests reconciled", repaired.len());
            Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(repaired, message)))
        }
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/admin/users/{username}/upline",
    tag = "admin",
    params(
        ("username" = String, Path, description = "会员用户名"),
        ("max_depth" = Option<u32>, Query, description = "最大层级 (默认且最多32)")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "获取上线成功", body = UplineResponse),
        (status = 401, description = "未授权"),
        (status = 404, description = "会员不存在")
    )
)]
pub async fn get_upline(
    service: web::Data<ReferralGraphService>,
    path: web::Path<String>,
    query: web::Query<UplineQuery>,
) -> Result<HttpResponse> {
    let username = path.into_inner();
    match service.upline(&username, query.max_depth).await {
        Ok(ancestors) => Ok(HttpResponse::Ok().json(ApiResponse::success(UplineResponse {
            username,
            ancestors,
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn admin_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin")
            .route("/package-requests", web::get().to(list_package_requests))
            .route("/package-requests/{id}", web::get().to(get_package_request))
            .route(
                "/package-requests/{id}/decision",
                web::post().to(decide_package_request),
            )
            .route("/reconciliation/run", web::post().to(run_reconciliation))
            .route("/users/{username}/upline", web::get().to(get_upline)),
    );
}

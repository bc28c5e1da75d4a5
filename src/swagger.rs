use actix_web::web;
use utoipa::OpenApi;
use utoipa::{
    Modify,
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::entities::{EarningType, PackageRequestStatus};
use crate::handlers;
use crate::models::*;
use crate::services::Ancestor;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            )
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::admin::decide_package_request,
        handlers::admin::list_package_requests,
        handlers::admin::get_package_request,
        handlers::admin::run_reconciliation,
        handlers::admin::get_upline,
    ),
    components(
        schemas(
            ApprovalDecision,
            DecisionRequest,
            ApprovalOutcome,
            BeneficiaryPayout,
            RankChange,
            PackageRequestStatus,
            PackageRequestResponse,
            PackageRequestQuery,
            PackageRequestDetail,
            EarningType,
            EarningResponse,
            ReconciledRequest,
            ReconciliationEvidence,
            UplineResponse,
            Ancestor,
            ApiError,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "admin", description = "Package approval and reconciliation API"),
    ),
    info(
        title = "Rewards Back Office API",
        version = "0.1.0",
        description = "Administrator API for package approvals, commissions and reconciliation",
    ),
    servers(
        (url = "/api/v1", description = "Local server")
    )
)]
pub struct ApiDoc;

pub fn swagger_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
    )
    .route(
        "/swagger-ui",
        web::get().to(|| async {
            actix_web::HttpResponse::Found()
                .append_header(("Location", "/swagger-ui/"))
                .finish()
        }),
    );
}

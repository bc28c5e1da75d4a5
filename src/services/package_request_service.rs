use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, Order, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect,
};

use crate::entities::package_request_entity as requests;
use crate::error::{AppError, AppResult};
use crate::models::{
    EarningResponse, PackageRequestDetail, PackageRequestPageResponse, PackageRequestQuery,
    PackageRequestResponse, PaginatedResponse, PaginationParams,
};
use crate::services::ledger_writer;

/// 后台查询套餐申请（只读）
#[derive(Clone)]
pub struct PackageRequestService {
    pool: DatabaseConnection,
}

impl PackageRequestService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    /// 申请列表（分页，可按状态过滤），按创建时间倒序
    pub async fn list(&self, query: &PackageRequestQuery) -> AppResult<PackageRequestPageResponse> {
        let params = PaginationParams::new(query.page, query.per_page);

        let mut base_query = requests::Entity::find();
        if let Some(status) = query.status {
            base_query = base_query.filter(requests::Column::Status.eq(status));
        }

        let total = base_query.clone().count(&self.pool).await? as i64;

        let items = base_query
            .order_by(requests::Column::CreatedAt, Order::Desc)
            .order_by(requests::Column::Id, Order::Desc)
            .limit(params.get_limit())
            .offset(params.get_offset())
            .all(&self.pool)
            .await?;

        Ok(PaginatedResponse::new(
            items.into_iter().map(PackageRequestResponse::from).collect(),
            params,
            total,
        ))
    }

    pub async fn detail(&self, request_id: i64) -> AppResult<PackageRequestDetail> {
        let request = requests::Entity::find_by_id(request_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Package request {request_id} not found")))?;

        let rows = ledger_writer::entries_for_request(&self.pool, request_id).await?;
        let total_paid = rows.iter().map(|r| r.amount).sum();

        Ok(PackageRequestDetail {
            request: request.into(),
            earnings: rows.into_iter().map(EarningResponse::from).collect(),
            total_paid,
        })
    }
}

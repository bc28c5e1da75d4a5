use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::services::referral_graph::Ancestor;

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct UplineQuery {
    /// 最大层级 (默认且最多 32)
    pub max_depth: Option<u32>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UplineResponse {
    pub username: String,
    /// 近者在前
    pub ancestors: Vec<Ancestor>,
}

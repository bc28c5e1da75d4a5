use std::collections::HashSet;

use sea_orm::{ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter};
use serde::Serialize;
use utoipa::ToSchema;

use crate::entities::user_entity as users;
use crate::error::{AppError, AppResult};

/// 后台查询上线时允许的最大层级
pub const MAX_UPLINE_DEPTH: u32 = 32;

/// 上线节点，depth 从 1 开始（1 为直接推荐人）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Ancestor {
    pub user_id: i64,
    pub username: String,
    pub depth: u32,
}

/// 按用户名回溯上线，近者在前
pub async fn ancestors<C: ConnectionTrait>(
    db: &C,
    username: &str,
    max_depth: u32,
) -> AppResult<Vec<Ancestor>> {
    let user = users::Entity::find()
        .filter(users::Column::Username.eq(username))
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {username} not found")))?;
    ancestors_of(db, &user, max_depth).await
}

/// 从已加载的用户出发沿 referrer_id 回溯上线。
///
/// 遇到根节点或达到 max_depth 时停止；上线记录缺失或出现环时截断链路并记录日志，不向调用方报错。
pub async fn ancestors_of<C: ConnectionTrait>(
    db: &C,
    user: &users::Model,
    max_depth: u32,
) -> AppResult<Vec<Ancestor>> {
    let mut chain = Vec::new();
    let mut visited = HashSet::from([user.id]);
    let mut next = user.referrer_id;

    while (chain.len() as u32) < max_depth {
        let Some(parent_id) = next else {
            break;
        };
        if !visited.insert(parent_id) {
            log::error!(
                "Referral cycle detected above user {} at user {}; upline truncated at depth {}",
                user.id,
                parent_id,
                chain.len()
            );
            break;
        }
        let Some(parent) = users::Entity::find_by_id(parent_id).one(db).await? else {
            log::warn!(
                "Dangling referrer {} above user {}; upline truncated at depth {}",
                parent_id,
                user.id,
                chain.len()
            );
            break;
        };

        chain.push(Ancestor {
            user_id: parent.id,
            username: parent.username,
            depth: chain.len() as u32 + 1,
        });
        next = parent.referrer_id;
    }

    Ok(chain)
}

#[derive(Clone)]
pub struct ReferralGraphService {
    pool: DatabaseConnection,
}

impl ReferralGraphService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    /// 后台查看会员上线
    pub async fn upline(&self, username: &str, max_depth: Option<u32>) -> AppResult<Vec<Ancestor>> {
        let depth = max_depth
            .unwrap_or(MAX_UPLINE_DEPTH)
            .min(MAX_UPLINE_DEPTH);
        ancestors(&self.pool, username, depth).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;
    use sea_orm::{ActiveModelTrait, IntoActiveModel, Set};

    #[tokio::test]
    async fn test_ancestors_nearest_first() {
        let db = setup_db().await;
        let root = insert_user(&db, "root", None).await;
        let mid = insert_user(&db, "mid", Some(root.id)).await;
        let near = insert_user(&db, "near", Some(mid.id)).await;
        insert_user(&db, "buyer", Some(near.id)).await;

        let chain = ancestors(&db, "buyer", 10).await.unwrap();
        let names: Vec<_> = chain.iter().map(|a| a.username.as_str()).collect();
        assert_eq!(names, vec!["near", "mid", "root"]);
        assert_eq!(
            chain.iter().map(|a| a.depth).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
    }

    #[tokio::test]
    async fn test_ancestors_stop_at_max_depth() {
        let db = setup_db().await;
        let root = insert_user(&db, "root", None).await;
        let mid = insert_user(&db, "mid", Some(root.id)).await;
        insert_user(&db, "buyer", Some(mid.id)).await;

        let chain = ancestors(&db, "buyer", 1).await.unwrap();
        assert_eq!(chain.len(), 1);
        assert_eq!(chain[0].username, "mid");

        assert!(ancestors(&db, "buyer", 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_root_has_no_ancestors() {
        let db = setup_db().await;
        insert_user(&db, "root", None).await;
        assert!(ancestors(&db, "root", 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_dangling_referrer_truncates_chain() {
        let db = setup_db().await;
        let orphan = insert_user(&db, "orphan", Some(9_999)).await;
        insert_user(&db, "buyer", Some(orphan.id)).await;

        let chain = ancestors(&db, "buyer", 5).await.unwrap();
        assert_eq!(chain.len(), 1);
        assert_eq!(chain[0].username, "orphan");
    }

    #[tokio::test]
    async fn test_cycle_is_detected_and_truncated() {
        let db = setup_db().await;
        let a = insert_user(&db, "a", None).await;
        let b = insert_user(&db, "b", Some(a.id)).await;
        let mut am = a.into_active_model();
        am.referrer_id = Set(Some(b.id));
        am.update(&db).await.unwrap();
        insert_user(&db, "buyer", Some(b.id)).await;

        let chain = ancestors(&db, "buyer", 10).await.unwrap();
        let names: Vec<_> = chain.iter().map(|a| a.username.as_str()).collect();
        assert_eq!(names, vec!["b", "a"]);
    }

    #[tokio::test]
    async fn test_unknown_username_is_not_found() {
        let db = setup_db().await;
        assert!(matches!(
            ancestors(&db, "ghost", 3).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_upline_depth_is_capped() {
        let db = setup_db().await;
        let root = insert_user(&db, "root", None).await;
        insert_user(&db, "buyer", Some(root.id)).await;

        let service = ReferralGraphService::new(db);
        let chain = service.upline("buyer", Some(10_000)).await.unwrap();
        assert_eq!(chain.len(), 1);
    }
}

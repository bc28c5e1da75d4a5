use sea_orm::{ConnectionTrait, EntityTrait, QueryOrder};

use crate::entities::rank_entity as ranks;
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankTier {
    pub id: i64,
    pub title: String,
    pub required_points: i64,
}

impl From<ranks::Model> for RankTier {
    fn from(m: ranks::Model) -> Self {
        Self {
            id: m.id,
            title: m.title,
            required_points: m.required_points,
        }
    }
}

/// 等级门槛只读快照，每次审批事务内加载一次
#[derive(Debug, Clone)]
pub struct RankTable {
    // 按 required_points 降序
    tiers: Vec<RankTier>,
}

impl RankTable {
    /// 门槛重复视为配置错误
    pub fn new(mut tiers: Vec<RankTier>) -> AppResult<Self> {
        tiers.sort_by(|a, b| b.required_points.cmp(&a.required_points));
        if let Some(pair) = tiers
            .windows(2)
            .find(|w| w[0].required_points == w[1].required_points)
        {
            return Err(AppError::ConfigError(format!(
                "Ranks '{}' and '{}' share the threshold {}",
                pair[0].title, pair[1].title, pair[0].required_points
            )));
        }
        Ok(Self { tiers })
    }

    pub async fn load<C: ConnectionTrait>(db: &C) -> AppResult<Self> {
        let models = ranks::Entity::find()
            .order_by_desc(ranks::Column::RequiredPoints)
            .all(db)
            .await?;
        Self::new(models.into_iter().map(RankTier::from).collect())
    }

    /// 降序扫描，返回第一个门槛 <= points 的等级；都不满足时返回最低等级，表为空返回 None
    pub fn resolve(&self, points: i64) -> Option<&RankTier> {
        self.tiers
            .iter()
            .find(|t| t.required_points <= points)
            .or_else(|| self.tiers.last())
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tier(id: i64, title: &str, required_points: i64) -> RankTier {
        RankTier {
            id,
            title: title.to_string(),
            required_points,
        }
    }

    fn table() -> RankTable {
        RankTable::new(vec![
            tier(1, "Bronze", 0),
            tier(3, "Gold", 1000),
            tier(2, "Silver", 100),
        ])
        .unwrap()
    }

    #[test]
    fn test_resolve_by_threshold() {
        let table = table();
        assert_eq!(table.resolve(0).unwrap().title, "Bronze");
        assert_eq!(table.resolve(99).unwrap().title, "Bronze");
        assert_eq!(table.resolve(500).unwrap().title, "Silver");
        assert_eq!(table.resolve(5000).unwrap().title, "Gold");
    }

    #[test]
    fn test_threshold_equality_qualifies() {
        let table = table();
        assert_eq!(table.resolve(100).unwrap().title, "Silver");
        assert_eq!(table.resolve(1000).unwrap().title, "Gold");
    }

    #[test]
    fn test_below_lowest_threshold_falls_back_to_lowest_rank() {
        let table = RankTable::new(vec![tier(1, "Starter", 50), tier(2, "Pro", 500)]).unwrap();
        assert_eq!(table.resolve(10).unwrap().title, "Starter");
    }

    #[test]
    fn test_empty_table_resolves_to_none() {
        let table = RankTable::new(vec![]).unwrap();
        assert!(table.is_empty());
        assert!(table.resolve(1_000_000).is_none());
    }

    #[test]
    fn test_tied_thresholds_are_rejected() {
        let result = RankTable::new(vec![tier(1, "A", 100), tier(2, "B", 100)]);
        assert!(matches!(result, Err(AppError::ConfigError(_))));
    }

    #[test]
    fn test_resolve_is_monotonic() {
        let table = table();
        let mut previous = i64::MIN;
        for points in (0..3000).step_by(7) {
            let threshold = table.resolve(points).unwrap().required_points;
            assert!(threshold >= previous, "rank regressed at {points}");
            previous = threshold;
        }
    }
}

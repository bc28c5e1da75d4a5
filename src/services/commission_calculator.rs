//! 佣金计算（纯函数，不访问数据库）
//!
//! 金额单位为分，比例单位为 basis points (1% = 100bp)。
//! 单笔佣金 = price * rate_bp / 10000，向零截断保留到分，余数不再分配。

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entities::{EarningType, commission_level_entity as levels, package_entity as packages};
use crate::error::{AppError, AppResult};
use crate::services::referral_graph::Ancestor;

pub const BASIS_POINTS: i128 = 10_000;

/// 上线层级不足时，未分配部分的处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// 直接作废（默认）
    #[default]
    Forfeit,
    /// 归入链路最顶端的上线（按间推计）
    RollUp,
}

impl std::str::FromStr for OverflowPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "forfeit" => Ok(OverflowPolicy::Forfeit),
            "roll_up" => Ok(OverflowPolicy::RollUp),
            other => Err(format!("unknown overflow policy '{other}'")),
        }
    }
}

/// 套餐佣金表
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommissionSchedule {
    pub price: i64,
    pub direct_rate_bp: i32,
    /// 下标 0 对应第 2 层
    pub indirect_rates_bp: Vec<i32>,
}

impl CommissionSchedule {
    pub fn new(price: i64, direct_rate_bp: i32, indirect_rates_bp: Vec<i32>) -> AppResult<Self> {
        if price < 0 {
            return Err(AppError::ConfigError(format!(
                "Package price must not be negative (got {price})"
            )));
        }
        if direct_rate_bp < 0 || indirect_rates_bp.iter().any(|r| *r < 0) {
            return Err(AppError::ConfigError(
                "Commission rates must not be negative".into(),
            ));
        }
        // 各层合计不得超过售价，单笔与合计金额因此都落在 i64 内
        let total_bp = direct_rate_bp as i64
            + indirect_rates_bp.iter().map(|r| *r as i64).sum::<i64>();
        if total_bp > BASIS_POINTS as i64 {
            return Err(AppError::ConfigError(format!(
                "Commission rates add up to {total_bp}bp, above {BASIS_POINTS}bp"
            )));
        }
        Ok(Self {
            price,
            direct_rate_bp,
            indirect_rates_bp,
        })
    }

    /// 由套餐及其层级配置构造；缺失的中间层级按 0 处理
    pub fn from_package(package: &packages::Model, level_rows: &[levels::Model]) -> AppResult<Self> {
        let mut indirect: Vec<i32> = Vec::new();
        for row in level_rows {
            if row.depth < 2 {
                return Err(AppError::ConfigError(format!(
                    "Package {} has an indirect level at depth {}",
                    package.id, row.depth
                )));
            }
            let idx = (row.depth - 2) as usize;
            if indirect.len() <= idx {
                indirect.resize(idx + 1, 0);
            }
            indirect[idx] = row.rate_bp;
        }
        Self::new(package.price, package.direct_rate_bp, indirect)
    }

    /// 需要回溯的上线层数
    pub fn max_depth(&self) -> u32 {
        1 + self.indirect_rates_bp.len() as u32
    }

    pub fn rate_for_depth(&self, depth: u32) -> i32 {
        match depth {
            0 => 0,
            1 => self.direct_rate_bp,
            d => self
                .indirect_rates_bp
                .get((d - 2) as usize)
                .copied()
                .unwrap_or(0),
        }
    }

    /// 理论最大支出 price * (direct + Σindirect)
    pub fn max_payout(&self) -> i64 {
        let total_bp: i128 = self.direct_rate_bp as i128
            + self
                .indirect_rates_bp
                .iter()
                .map(|r| *r as i128)
                .sum::<i128>();
        saturate(self.price as i128 * total_bp / BASIS_POINTS)
    }
}

fn saturate(amount: i128) -> i64 {
    amount.clamp(i64::MIN as i128, i64::MAX as i128) as i64
}

pub fn commission_amount(price: i64, rate_bp: i32) -> i64 {
    saturate(price as i128 * rate_bp as i128 / BASIS_POINTS)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Payout {
    pub user_id: i64,
    pub username: String,
    pub depth: u32,
    pub earning_type: EarningType,
    pub amount: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommissionPlan {
    pub payouts: Vec<Payout>,
    /// 因上线层级不足而作废的金额
    pub forfeited: i64,
}

impl CommissionPlan {
    pub fn total(&self) -> i64 {
        self.payouts.iter().map(|p| p.amount).sum()
    }
}

/// chain 须按近者在前排列（与 referral_graph::ancestors 一致）
pub fn calculate(
    schedule: &CommissionSchedule,
    chain: &[Ancestor],
    policy: OverflowPolicy,
) -> CommissionPlan {
    let max_depth = schedule.max_depth() as usize;

    let mut payouts: Vec<Payout> = chain
        .iter()
        .take(max_depth)
        .enumerate()
        .map(|(idx, ancestor)| {
            let depth = idx as u32 + 1;
            let earning_type = if depth == 1 {
                EarningType::DirectCommission
            } else {
                EarningType::IndirectCommission
            };
            Payout {
                user_id: ancestor.user_id,
                username: ancestor.username.clone(),
                depth,
                earning_type,
                amount: commission_amount(schedule.price, schedule.rate_for_depth(depth)),
            }
        })
        .collect();

    let unpaid: i64 = ((payouts.len() + 1)..=max_depth)
        .map(|depth| commission_amount(schedule.price, schedule.rate_for_depth(depth as u32)))
        .sum();

    let mut forfeited = unpaid;
    if policy == OverflowPolicy::RollUp && unpaid > 0 {
        if let Some(top) = payouts.last_mut().filter(|p| p.depth > 1) {
            top.amount += unpaid;
            forfeited = 0;
        } else if let Some(top) = payouts.last().cloned() {
            // 只有直推人时，溢出部分以间推类型另记一笔
            payouts.push(Payout {
                earning_type: EarningType::IndirectCommission,
                amount: unpaid,
                ..top
            });
            forfeited = 0;
        }
    }

    payouts.retain(|p| p.amount > 0);
    CommissionPlan { payouts, forfeited }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(names: &[&str]) -> Vec<Ancestor> {
        names
            .iter()
            .enumerate()
            .map(|(i, name)| Ancestor {
                user_id: i as i64 + 100,
                username: name.to_string(),
                depth: i as u32 + 1,
            })
            .collect()
    }

    fn schedule() -> CommissionSchedule {
        CommissionSchedule::new(10_000, 1000, vec![500, 300, 200]).unwrap()
    }

    #[test]
    fn test_three_level_chain() {
        let plan = calculate(&schedule(), &chain(&["A", "B", "C"]), OverflowPolicy::Forfeit);

        let rows: Vec<_> = plan
            .payouts
            .iter()
            .map(|p| (p.username.as_str(), p.amount, p.earning_type))
            .collect();
        assert_eq!(
            rows,
            vec![
                ("A", 1000, EarningType::DirectCommission),
                ("B", 500, EarningType::IndirectCommission),
                ("C", 300, EarningType::IndirectCommission),
            ]
        );
        // 第 4 层无人，200 作废
        assert_eq!(plan.forfeited, 200);
        assert_eq!(plan.total(), 1800);
    }

    #[test]
    fn test_empty_chain_pays_nothing() {
        let plan = calculate(&schedule(), &[], OverflowPolicy::Forfeit);
        assert!(plan.payouts.is_empty());
        assert_eq!(plan.forfeited, 2000);

        let plan = calculate(&schedule(), &[], OverflowPolicy::RollUp);
        assert!(plan.payouts.is_empty());
        assert_eq!(plan.forfeited, 2000);
    }

    #[test]
    fn test_chain_longer_than_schedule_is_cut() {
        let plan = calculate(
            &schedule(),
            &chain(&["A", "B", "C", "D", "E", "F"]),
            OverflowPolicy::Forfeit,
        );
        assert_eq!(plan.payouts.len(), 4);
        assert_eq!(plan.payouts[3].username, "D");
        assert_eq!(plan.payouts[3].amount, 200);
        assert_eq!(plan.forfeited, 0);
    }

    #[test]
    fn test_amounts_truncate_to_cents() {
        // 999 * 3.33% = 33.2667 -> 33
        assert_eq!(commission_amount(999, 333), 33);
        // 1 * 99.99% -> 0
        assert_eq!(commission_amount(1, 9999), 0);
        let s = CommissionSchedule::new(999, 333, vec![]).unwrap();
        let plan = calculate(&s, &chain(&["A"]), OverflowPolicy::Forfeit);
        assert_eq!(plan.payouts[0].amount, 33);
    }

    #[test]
    fn test_zero_amount_payouts_are_dropped() {
        let s = CommissionSchedule::new(10_000, 1000, vec![0, 300]).unwrap();
        let plan = calculate(&s, &chain(&["A", "B", "C"]), OverflowPolicy::Forfeit);
        let names: Vec<_> = plan.payouts.iter().map(|p| p.username.as_str()).collect();
        assert_eq!(names, vec!["A", "C"]);
        assert_eq!(plan.payouts[1].depth, 3);
    }

    #[test]
    fn test_roll_up_credits_topmost_ancestor() {
        let plan = calculate(&schedule(), &chain(&["A", "B"]), OverflowPolicy::RollUp);
        assert_eq!(plan.forfeited, 0);
        assert_eq!(plan.payouts.len(), 2);
        // B: 500 + 300 + 200
        assert_eq!(plan.payouts[1].amount, 1000);
        assert_eq!(plan.total(), 2000);
    }

    #[test]
    fn test_roll_up_with_only_direct_referrer_adds_indirect_row() {
        let plan = calculate(&schedule(), &chain(&["A"]), OverflowPolicy::RollUp);
        assert_eq!(plan.payouts.len(), 2);
        assert_eq!(plan.payouts[0].earning_type, EarningType::DirectCommission);
        assert_eq!(plan.payouts[0].amount, 1000);
        assert_eq!(plan.payouts[1].earning_type, EarningType::IndirectCommission);
        assert_eq!(plan.payouts[1].user_id, plan.payouts[0].user_id);
        assert_eq!(plan.payouts[1].amount, 1000);
    }

    #[test]
    fn test_total_never_exceeds_schedule_bound() {
        let names = ["A", "B", "C", "D", "E", "F", "G"];
        for price in [0, 1, 99, 10_000, 123_457, 9_999_999] {
            let s = CommissionSchedule::new(price, 1234, vec![777, 333, 101, 9]).unwrap();
            for len in 0..=names.len() {
                for policy in [OverflowPolicy::Forfeit, OverflowPolicy::RollUp] {
                    let plan = calculate(&s, &chain(&names[..len]), policy);
                    assert!(plan.total() <= s.max_payout());
                    assert!(plan.total() + plan.forfeited <= s.max_payout());
                    for p in &plan.payouts {
                        if policy == OverflowPolicy::Forfeit {
                            assert_eq!(p.amount, commission_amount(price, s.rate_for_depth(p.depth)));
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_negative_rates_are_rejected() {
        assert!(CommissionSchedule::new(100, -1, vec![]).is_err());
        assert!(CommissionSchedule::new(100, 10, vec![5, -5]).is_err());
        assert!(CommissionSchedule::new(-100, 10, vec![]).is_err());
    }

    #[test]
    fn test_rates_above_full_price_are_rejected() {
        assert!(CommissionSchedule::new(100, 10_000, vec![]).is_ok());
        assert!(CommissionSchedule::new(100, 10_001, vec![]).is_err());
        assert!(CommissionSchedule::new(100, 6_000, vec![3_000, 1_001]).is_err());
        assert!(CommissionSchedule::new(i64::MAX, i32::MAX, vec![i32::MAX]).is_err());
    }

    #[test]
    fn test_amount_at_price_limit_does_not_wrap() {
        assert_eq!(commission_amount(i64::MAX, 10_000), i64::MAX);
        assert_eq!(commission_amount(i64::MAX, i32::MAX), i64::MAX);

        let s = CommissionSchedule::new(i64::MAX, 6_000, vec![4_000]).unwrap();
        let plan = calculate(&s, &chain(&["A"]), OverflowPolicy::RollUp);
        assert!(plan.payouts.iter().all(|p| p.amount > 0));
        assert!(plan.total() <= s.max_payout());
    }

    #[test]
    fn test_from_package_fills_missing_levels() {
        let package = packages::Model {
            id: 1,
            name: "Starter".into(),
            price: 10_000,
            points: 100,
            direct_rate_bp: 1000,
            duration_days: 30,
            is_active: true,
            created_at: None,
            updated_at: None,
        };
        let rows = vec![
            levels::Model {
                id: 1,
                package_id: 1,
                depth: 4,
                rate_bp: 200,
            },
            levels::Model {
                id: 2,
                package_id: 1,
                depth: 2,
                rate_bp: 500,
            },
        ];
        let s = CommissionSchedule::from_package(&package, &rows).unwrap();
        assert_eq!(s.indirect_rates_bp, vec![500, 0, 200]);
        assert_eq!(s.max_depth(), 4);
        assert_eq!(s.rate_for_depth(3), 0);

        let bad = vec![levels::Model {
            id: 3,
            package_id: 1,
            depth: 1,
            rate_bp: 10,
        }];
        assert!(CommissionSchedule::from_package(&package, &bad).is_err());
    }

    #[test]
    fn test_overflow_policy_from_str() {
        assert_eq!("forfeit".parse::<OverflowPolicy>(), Ok(OverflowPolicy::Forfeit));
        assert_eq!("roll_up".parse::<OverflowPolicy>(), Ok(OverflowPolicy::RollUp));
        assert!("reserve".parse::<OverflowPolicy>().is_err());
    }
}

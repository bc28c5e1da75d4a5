pub mod approval_service;
pub mod commission_calculator;
pub mod ledger_writer;
pub mod package_request_service;
pub mod rank_resolver;
pub mod reconciliation_service;
pub mod referral_graph;

pub use approval_service::*;
pub use commission_calculator::{CommissionPlan, CommissionSchedule, OverflowPolicy, Payout};
pub use package_request_service::*;
pub use rank_resolver::{RankTable, RankTier};
pub use reconciliation_service::*;
pub use referral_graph::{Ancestor, ReferralGraphService};

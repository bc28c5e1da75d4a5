pub mod common;
pub mod earning;
pub mod package_request;
pub mod pagination;
pub mod reconciliation;
pub mod referral;

pub use common::*;
pub use earning::*;
pub use package_request::*;
pub use pagination::*;
pub use reconciliation::*;
pub use referral::*;

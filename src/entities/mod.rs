pub mod earnings;
pub mod package_commission_levels;
pub mod package_requests;
pub mod packages;
pub mod ranks;
pub mod users;

pub use earnings as earning_entity;
pub use package_commission_levels as commission_level_entity;
pub use package_requests as package_request_entity;
pub use packages as package_entity;
pub use ranks as rank_entity;
pub use users as user_entity;

pub use earnings::EarningType;
pub use package_requests::PackageRequestStatus;

pub use sea_orm_migration::prelude::*;

mod m20260901_000001_create_ranks_and_users;
mod m20260901_000002_create_packages;
mod m20260901_000003_create_package_requests_and_earnings;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260901_000001_create_ranks_and_users::Migration),
            Box::new(m20260901_000002_create_packages::Migration),
            Box::new(m20260901_000003_create_package_requests_and_earnings::Migration),
        ]
    }
}

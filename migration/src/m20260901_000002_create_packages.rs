use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum Packages {
    Table,
    Id,
    Name,
    Price,
    Points,
    DirectRateBp,
    DurationDays,
    IsActive,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum PackageCommissionLevels {
    Table,
    Id,
    PackageId,
    Depth,
    RateBp,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Packages::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Packages::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Packages::Name).string_len(128).not_null())
                    .col(ColumnDef::new(Packages::Price).big_integer().not_null())
                    .col(
                        ColumnDef::new(Packages::Points)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    // 1% = 100bp
                    .col(
                        ColumnDef::new(Packages::DirectRateBp)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Packages::DurationDays)
                            .integer()
                            .not_null()
                            .default(365),
                    )
                    .col(
                        ColumnDef::new(Packages::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Packages::CreatedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::cust("NOW()"))
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Packages::UpdatedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::cust("NOW()"))
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PackageCommissionLevels::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PackageCommissionLevels::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(PackageCommissionLevels::PackageId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PackageCommissionLevels::Depth)
                            .integer()
                            .not_null()
                            .check(Expr::col(PackageCommissionLevels::Depth).gte(2)),
                    )
                    .col(
                        ColumnDef::new(PackageCommissionLevels::RateBp)
                            .integer()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("uq_package_commission_levels_package_depth")
                    .table(PackageCommissionLevels::Table)
                    .col(PackageCommissionLevels::PackageId)
                    .col(PackageCommissionLevels::Depth)
                    .unique()
                    .to_owned(),
            )
            .await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .if_exists()
                    .table(PackageCommissionLevels::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().if_exists().table(Packages::Table).to_owned())
            .await?;
        Ok(())
    }
}

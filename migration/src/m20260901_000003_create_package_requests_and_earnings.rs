use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum PackageRequests {
    Table,
    Id,
    UserId,
    PackageId,
    Status,
    AdminNotes,
    ProcessedBy,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Earnings {
    Table,
    Id,
    UserId,
    PackageRequestId,
    EarningType,
    Depth,
    Amount,
    Description,
    IdempotencyKey,
    CreatedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PackageRequests::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PackageRequests::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PackageRequests::UserId).big_integer().not_null())
                    .col(
                        ColumnDef::new(PackageRequests::PackageId)
                            .big_integer()
                            .not_null(),
                    )
                    // pending / approved / failed
                    .col(
                        ColumnDef::new(PackageRequests::Status)
                            .string_len(32)
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(PackageRequests::AdminNotes).text().null())
                    .col(ColumnDef::new(PackageRequests::ProcessedBy).big_integer().null())
                    .col(
                        ColumnDef::new(PackageRequests::CreatedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::cust("NOW()"))
                            .null(),
                    )
                    .col(
                        ColumnDef::new(PackageRequests::UpdatedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::cust("NOW()"))
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_package_requests_status")
                    .table(PackageRequests::Table)
                    .col(PackageRequests::Status)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_package_requests_user_id")
                    .table(PackageRequests::Table)
                    .col(PackageRequests::UserId)
                    .to_owned(),
            )
            .await?;

        // 佣金流水：只追加，不修改
        manager
            .create_table(
                Table::create()
                    .table(Earnings::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Earnings::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Earnings::UserId).big_integer().not_null())
                    .col(
                        ColumnDef::new(Earnings::PackageRequestId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Earnings::EarningType).string_len(32).not_null())
                    .col(ColumnDef::new(Earnings::Depth).integer().not_null())
                    .col(ColumnDef::new(Earnings::Amount).big_integer().not_null())
                    .col(ColumnDef::new(Earnings::Description).text().null())
                    .col(
                        ColumnDef::new(Earnings::IdempotencyKey)
                            .string_len(128)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(Earnings::CreatedAt)
                            .timestamp_with_time_zone()
                            .default(Expr::cust("NOW()"))
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        // 同一申请 + 受益人 + 类型 只能有一条
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("uq_earnings_request_user_type")
                    .table(Earnings::Table)
                    .col(Earnings::PackageRequestId)
                    .col(Earnings::UserId)
                    .col(Earnings::EarningType)
                    .unique()
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_earnings_user_id")
                    .table(Earnings::Table)
                    .col(Earnings::UserId)
                    .to_owned(),
            )
            .await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().if_exists().table(Earnings::Table).to_owned())
            .await?;
        manager
            .drop_table(
                Table::drop()
                    .if_exists()
                    .table(PackageRequests::Table)
                    .to_owned(),
            )
            .await?;
        Ok(())
    }
}

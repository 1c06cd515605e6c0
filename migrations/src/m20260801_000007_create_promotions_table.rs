use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Promotions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Promotions::PromoId)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Promotions::PromoCode).string_len(50).not_null())
                    .col(
                        ColumnDef::new(Promotions::Description)
                            .string_len(255)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Promotions::DiscountType)
                            .string_len(20)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Promotions::DiscountValue)
                            .decimal_len(10, 2)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Promotions::StartDate).date().not_null())
                    .col(ColumnDef::new(Promotions::EndDate).date().not_null())
                    .col(
                        ColumnDef::new(Promotions::MinOrderAmount)
                            .decimal_len(10, 2)
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(Promotions::UsageLimit)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Promotions::UsedCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Promotions::Status)
                            .string_len(20)
                            .not_null()
                            .default("active"),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_promotions_promo_code")
                    .table(Promotions::Table)
                    .col(Promotions::PromoCode)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Promotions::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Promotions {
    Table,
    PromoId,
    PromoCode,
    Description,
    DiscountType,
    DiscountValue,
    StartDate,
    EndDate,
    MinOrderAmount,
    UsageLimit,
    UsedCount,
    Status,
}

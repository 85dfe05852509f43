//! Ledger schema: targets, their progress entries and user-to-user fund
//! shares.
//!
//! Money columns are stored in minor units (cents). User ids are opaque
//! strings owned by the surrounding identity system, so they carry no
//! foreign key.

use sea_orm::ConnectionTrait;
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// ─────────────────────────────────────────────────────────────────────────────
// Table identifiers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Iden)]
enum Targets {
    Table,
    Id,
    UserId,
    TargetAmountMinor,
    Category,
    PeriodStart,
    PeriodEnd,
    Status,
    Notes,
    CreatedBy,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum ProgressEntries {
    Table,
    Id,
    TargetId,
    AmountMinor,
    Category,
    TransactionDate,
    Status,
    SourceUserId,
    ApprovedBy,
    ApprovedAt,
    CreatedAt,
}

#[derive(Iden)]
enum FundShares {
    Table,
    Id,
    FromUserId,
    ToUserId,
    AmountMinor,
    Reason,
    Status,
    CreatedBy,
    CreatedAt,
    ReversedAt,
    ReversedBy,
    ReversalReason,
}

// One active target per user, enforced by the store as well as the engine.
// sea-query has no portable partial-index builder, so this one is raw SQL.
const ONE_ACTIVE_TARGET_INDEX: &str = "CREATE UNIQUE INDEX IF NOT EXISTS \
     \"ux-targets-user_id-active\" ON \"targets\" (\"user_id\") WHERE \"status\" = 'active'";

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ─────────────────────────────────────────────────────────────────────
        // targets
        // ─────────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Targets::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Targets::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Targets::UserId).string().not_null())
                    .col(
                        ColumnDef::new(Targets::TargetAmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Targets::Category).string())
                    .col(ColumnDef::new(Targets::PeriodStart).date().not_null())
                    .col(ColumnDef::new(Targets::PeriodEnd).date())
                    .col(ColumnDef::new(Targets::Status).string().not_null())
                    .col(ColumnDef::new(Targets::Notes).text())
                    .col(ColumnDef::new(Targets::CreatedBy).string().not_null())
                    .col(ColumnDef::new(Targets::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Targets::UpdatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-targets-user_id-period_start")
                    .table(Targets::Table)
                    .col(Targets::UserId)
                    .col(Targets::PeriodStart)
                    .to_owned(),
            )
            .await?;

        manager
            .get_connection()
            .execute_unprepared(ONE_ACTIVE_TARGET_INDEX)
            .await?;

        // ─────────────────────────────────────────────────────────────────────
        // progress_entries
        // ─────────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(ProgressEntries::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ProgressEntries::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ProgressEntries::TargetId).string().not_null())
                    .col(
                        ColumnDef::new(ProgressEntries::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ProgressEntries::Category).string())
                    .col(
                        ColumnDef::new(ProgressEntries::TransactionDate)
                            .date()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ProgressEntries::Status).string().not_null())
                    .col(
                        ColumnDef::new(ProgressEntries::SourceUserId)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ProgressEntries::ApprovedBy).string())
                    .col(ColumnDef::new(ProgressEntries::ApprovedAt).timestamp())
                    .col(
                        ColumnDef::new(ProgressEntries::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-progress_entries-target_id")
                            .from(ProgressEntries::Table, ProgressEntries::TargetId)
                            .to(Targets::Table, Targets::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-progress_entries-target_id-status")
                    .table(ProgressEntries::Table)
                    .col(ProgressEntries::TargetId)
                    .col(ProgressEntries::Status)
                    .to_owned(),
            )
            .await?;

        // ─────────────────────────────────────────────────────────────────────
        // fund_shares
        // ─────────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(FundShares::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(FundShares::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(FundShares::FromUserId).string().not_null())
                    .col(ColumnDef::new(FundShares::ToUserId).string().not_null())
                    .col(
                        ColumnDef::new(FundShares::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(FundShares::Reason).text())
                    .col(ColumnDef::new(FundShares::Status).string().not_null())
                    .col(ColumnDef::new(FundShares::CreatedBy).string().not_null())
                    .col(ColumnDef::new(FundShares::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(FundShares::ReversedAt).timestamp())
                    .col(ColumnDef::new(FundShares::ReversedBy).string())
                    .col(ColumnDef::new(FundShares::ReversalReason).text())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-fund_shares-from_user_id-status")
                    .table(FundShares::Table)
                    .col(FundShares::FromUserId)
                    .col(FundShares::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-fund_shares-to_user_id-status")
                    .table(FundShares::Table)
                    .col(FundShares::ToUserId)
                    .col(FundShares::Status)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(FundShares::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ProgressEntries::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Targets::Table).to_owned())
            .await?;
        Ok(())
    }
}

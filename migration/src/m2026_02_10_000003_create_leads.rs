//! Migration to create the leads table.
//!
//! Leads reference perks and categories by value as well as by id so that
//! lead history survives catalog deletions. There is deliberately no foreign
//! key on perk_id or category_id.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Leads::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Leads::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Leads::Name).text().not_null())
                    .col(ColumnDef::new(Leads::Email).text().not_null())
                    .col(ColumnDef::new(Leads::Phone).text().null())
                    .col(ColumnDef::new(Leads::CompanyName).text().null())
                    .col(ColumnDef::new(Leads::Message).text().null())
                    .col(ColumnDef::new(Leads::Interests).json_binary().null())
                    .col(
                        ColumnDef::new(Leads::BudgetRange)
                            .text()
                            .not_null()
                            .default("not-specified"),
                    )
                    .col(
                        ColumnDef::new(Leads::Timeline)
                            .text()
                            .not_null()
                            .default("flexible"),
                    )
                    .col(
                        ColumnDef::new(Leads::Source)
                            .text()
                            .not_null()
                            .default("website"),
                    )
                    .col(
                        ColumnDef::new(Leads::Status)
                            .text()
                            .not_null()
                            .default("new"),
                    )
                    .col(
                        ColumnDef::new(Leads::Priority)
                            .text()
                            .not_null()
                            .default("medium"),
                    )
                    .col(
                        ColumnDef::new(Leads::LeadScore)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Leads::PerkId).uuid().null())
                    .col(ColumnDef::new(Leads::PerkTitle).text().null())
                    .col(ColumnDef::new(Leads::CategoryId).uuid().null())
                    .col(ColumnDef::new(Leads::CategoryName).text().null())
                    .col(ColumnDef::new(Leads::AssignedTo).uuid().null())
                    .col(ColumnDef::new(Leads::Notes).json_binary().null())
                    .col(
                        ColumnDef::new(Leads::ContactAttempts)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Leads::LastContactedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Leads::FollowUpAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Leads::ConvertedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Leads::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Leads::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Create composite unique index on (email, perk_id). Rows with a NULL
        // perk_id are not deduplicated by the database, so the repository also
        // probes for duplicates before insert.
        manager
            .create_index(
                Index::create()
                    .name("idx_leads_email_perk")
                    .table(Leads::Table)
                    .col(Leads::Email)
                    .col(Leads::PerkId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Index on status for pipeline filters
        manager
            .create_index(
                Index::create()
                    .name("idx_leads_status")
                    .table(Leads::Table)
                    .col(Leads::Status)
                    .to_owned(),
            )
            .await?;

        // Index on lead_score for hot-lead ordering
        manager
            .create_index(
                Index::create()
                    .name("idx_leads_lead_score")
                    .table(Leads::Table)
                    .col(Leads::LeadScore)
                    .to_owned(),
            )
            .await?;

        // Index on follow_up_at for the follow-up queue
        manager
            .create_index(
                Index::create()
                    .name("idx_leads_follow_up_at")
                    .table(Leads::Table)
                    .col(Leads::FollowUpAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Drop indexes first
        manager
            .drop_index(Index::drop().name("idx_leads_email_perk").to_owned())
            .await?;

        manager
            .drop_index(Index::drop().name("idx_leads_status").to_owned())
            .await?;

        manager
            .drop_index(Index::drop().name("idx_leads_lead_score").to_owned())
            .await?;

        manager
            .drop_index(Index::drop().name("idx_leads_follow_up_at").to_owned())
            .await?;

        // Then drop table
        manager
            .drop_table(Table::drop().table(Leads::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Leads {
    Table,
    Id,
    Name,
    Email,
    Phone,
    CompanyName,
    Message,
    Interests,
    BudgetRange,
    Timeline,
    Source,
    Status,
    Priority,
    LeadScore,
    PerkId,
    PerkTitle,
    CategoryId,
    CategoryName,
    AssignedTo,
    Notes,
    ContactAttempts,
    LastContactedAt,
    FollowUpAt,
    ConvertedAt,
    CreatedAt,
    UpdatedAt,
}

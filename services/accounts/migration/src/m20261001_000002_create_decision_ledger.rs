use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // No foreign keys: entries must outlive the accounts they describe.
        manager
            .create_table(
                Table::create()
                    .table(DecisionLedger::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DecisionLedger::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(DecisionLedger::TargetAccountId)
                            .uuid()
                            .not_null(),
                    )
                    .col(ColumnDef::new(DecisionLedger::TargetEmail).string().not_null())
                    .col(
                        ColumnDef::new(DecisionLedger::TargetRole)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DecisionLedger::ActorAccountId)
                            .uuid()
                            .not_null(),
                    )
                    .col(ColumnDef::new(DecisionLedger::ActorEmail).string().not_null())
                    .col(ColumnDef::new(DecisionLedger::Kind).string_len(16).not_null())
                    .col(
                        ColumnDef::new(DecisionLedger::StatusBefore)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DecisionLedger::StatusAfter)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(ColumnDef::new(DecisionLedger::Reason).text())
                    .col(
                        ColumnDef::new(DecisionLedger::Details)
                            .json_binary()
                            .not_null(),
                    )
                    .col(ColumnDef::new(DecisionLedger::IpAddress).string())
                    .col(ColumnDef::new(DecisionLedger::UserAgent).text())
                    .col(
                        ColumnDef::new(DecisionLedger::DecidedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .table(DecisionLedger::Table)
                    .col(DecisionLedger::TargetAccountId)
                    .col(DecisionLedger::DecidedAt)
                    .name("idx_decision_ledger_target_decided_at")
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .table(DecisionLedger::Table)
                    .col(DecisionLedger::ActorAccountId)
                    .name("idx_decision_ledger_actor")
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .table(DecisionLedger::Table)
                    .col(DecisionLedger::Kind)
                    .col(DecisionLedger::DecidedAt)
                    .name("idx_decision_ledger_kind_decided_at")
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(DecisionLedger::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum DecisionLedger {
    Table,
    Id,
    TargetAccountId,
    TargetEmail,
    TargetRole,
    ActorAccountId,
    ActorEmail,
    Kind,
    StatusBefore,
    StatusAfter,
    Reason,
    Details,
    IpAddress,
    UserAgent,
    DecidedAt,
}

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Accounts::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Accounts::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Accounts::Name).string().not_null())
                    .col(ColumnDef::new(Accounts::Surname).string().not_null())
                    .col(
                        ColumnDef::new(Accounts::Email)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Accounts::PasswordHash).string().not_null())
                    .col(ColumnDef::new(Accounts::Phone).string())
                    .col(ColumnDef::new(Accounts::Gender).string_len(16).not_null())
                    .col(ColumnDef::new(Accounts::Role).string_len(16).not_null())
                    .col(
                        ColumnDef::new(Accounts::VerificationStatus)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Accounts::VerifiedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Accounts::RejectionReason).text())
                    .col(ColumnDef::new(Accounts::ShopName).string())
                    .col(ColumnDef::new(Accounts::ShopDescription).text())
                    .col(ColumnDef::new(Accounts::ShopSite).string())
                    .col(
                        ColumnDef::new(Accounts::Active)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(Accounts::SuspensionReason).text())
                    .col(ColumnDef::new(Accounts::SuspendedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Accounts::EmailConfirmed)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Accounts::EmailVerificationToken).string())
                    .col(
                        ColumnDef::new(Accounts::EmailVerificationExpiresAt)
                            .timestamp_with_time_zone(),
                    )
                    .col(ColumnDef::new(Accounts::PasswordResetToken).string())
                    .col(
                        ColumnDef::new(Accounts::PasswordResetExpiresAt)
                            .timestamp_with_time_zone(),
                    )
                    .col(ColumnDef::new(Accounts::InvitationCode).string())
                    .col(
                        ColumnDef::new(Accounts::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Accounts::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Moderation queue scans: pending requests by role, newest first.
        manager
            .create_index(
                Index::create()
                    .table(Accounts::Table)
                    .col(Accounts::VerificationStatus)
                    .col(Accounts::Role)
                    .col(Accounts::CreatedAt)
                    .name("idx_accounts_status_role_created_at")
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .table(Accounts::Table)
                    .col(Accounts::InvitationCode)
                    .name("idx_accounts_invitation_code")
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .table(Accounts::Table)
                    .col(Accounts::EmailVerificationToken)
                    .name("idx_accounts_email_verification_token")
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Accounts::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Accounts {
    Table,
    Id,
    Name,
    Surname,
    Email,
    PasswordHash,
    Phone,
    Gender,
    Role,
    VerificationStatus,
    VerifiedAt,
    RejectionReason,
    ShopName,
    ShopDescription,
    ShopSite,
    Active,
    SuspensionReason,
    SuspendedAt,
    EmailConfirmed,
    EmailVerificationToken,
    EmailVerificationExpiresAt,
    PasswordResetToken,
    PasswordResetExpiresAt,
    InvitationCode,
    CreatedAt,
    UpdatedAt,
}

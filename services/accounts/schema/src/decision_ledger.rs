use sea_orm::entity::prelude::*;

/// Immutable record of one administrative decision.
///
/// No foreign key to `accounts`: the denormalized snapshot columns keep the entry
/// meaningful after the target or actor account is altered or removed.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "decision_ledger")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub target_account_id: Uuid,
    pub target_email: String,
    pub target_role: String,
    pub actor_account_id: Uuid,
    pub actor_email: String,
    pub kind: String,
    pub status_before: String,
    pub status_after: String,
    pub reason: Option<String>,
    pub details: Json,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub decided_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

use sea_orm::entity::prelude::*;

/// Registered identity. Role, verification status and gender are stored as their
/// lowercase wire strings.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub surname: String,
    /// Lower-cased on write; the unique index is the authoritative duplicate guard.
    #[sea_orm(unique)]
    pub email: String,
    pub password_hash: String,
    pub phone: Option<String>,
    pub gender: String,
    pub role: String,
    pub verification_status: String,
    pub verified_at: Option<DateTimeUtc>,
    pub rejection_reason: Option<String>,
    pub shop_name: Option<String>,
    pub shop_description: Option<String>,
    pub shop_site: Option<String>,
    pub active: bool,
    pub suspension_reason: Option<String>,
    pub suspended_at: Option<DateTimeUtc>,
    pub email_confirmed: bool,
    pub email_verification_token: Option<String>,
    pub email_verification_expires_at: Option<DateTimeUtc>,
    pub password_reset_token: Option<String>,
    pub password_reset_expires_at: Option<DateTimeUtc>,
    pub invitation_code: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

use chrono::{DateTime, Utc};
use serde::Deserialize;

use marche_core::config::Config;

use crate::domain::policy::{InvitationCode, InvitationTable};

fn default_accounts_port() -> u16 {
    3114
}

fn default_public_base_url() -> String {
    "http://localhost:3000".to_owned()
}

fn default_mail_api_url() -> String {
    "https://api.brevo.com/v3/smtp/email".to_owned()
}

fn default_vendor_max_uses() -> u64 {
    1000
}

fn default_staff_max_uses() -> u64 {
    10
}

/// Accounts service configuration loaded from environment variables.
///
/// Field `foo_bar` is read from env var `FOO_BAR`.
#[derive(Debug, Deserialize)]
pub struct AccountsConfig {
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// HTTP port (default 3114).
    #[serde(default = "default_accounts_port")]
    pub accounts_port: u16,
    /// HS256 secret for session tokens.
    pub jwt_secret: String,
    pub cookie_domain: String,
    /// Storefront URL used in email links.
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,

    #[serde(default = "default_mail_api_url")]
    pub mail_api_url: String,
    /// When unset, emails are logged instead of sent.
    pub mail_api_key: Option<String>,
    pub mail_sender_email: Option<String>,
    pub mail_sender_name: Option<String>,
    /// Comma-separated list of addresses alerted about staff applications.
    #[serde(default)]
    pub admin_notification_emails: String,

    pub vendor_invitation_code: Option<String>,
    #[serde(default = "default_vendor_max_uses")]
    pub vendor_invitation_max_uses: u64,
    pub vendor_invitation_expires_at: Option<DateTime<Utc>>,

    pub moderator_invitation_code: Option<String>,
    #[serde(default = "default_staff_max_uses")]
    pub moderator_invitation_max_uses: u64,
    pub moderator_invitation_expires_at: Option<DateTime<Utc>>,

    pub admin_invitation_code: Option<String>,
    #[serde(default = "default_staff_max_uses")]
    pub admin_invitation_max_uses: u64,
    pub admin_invitation_expires_at: Option<DateTime<Utc>>,
}

impl Config for AccountsConfig {}

fn invitation(
    code: &Option<String>,
    max_uses: u64,
    expires_at: Option<DateTime<Utc>>,
) -> Option<InvitationCode> {
    let code = code.as_deref().map(str::trim).filter(|c| !c.is_empty())?;
    Some(InvitationCode {
        code: code.to_owned(),
        max_uses,
        expires_at,
    })
}

impl AccountsConfig {
    pub fn invitation_table(&self) -> InvitationTable {
        InvitationTable {
            vendor: invitation(
                &self.vendor_invitation_code,
                self.vendor_invitation_max_uses,
                self.vendor_invitation_expires_at,
            ),
            moderator: invitation(
                &self.moderator_invitation_code,
                self.moderator_invitation_max_uses,
                self.moderator_invitation_expires_at,
            ),
            admin: invitation(
                &self.admin_invitation_code,
                self.admin_invitation_max_uses,
                self.admin_invitation_expires_at,
            ),
        }
    }

    pub fn admin_recipients(&self) -> Vec<String> {
        self.admin_notification_emails
            .split(',')
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .map(str::to_owned)
            .collect()
    }
}

use chrono::{DateTime, Utc};
use uuid::Uuid;

use marche_domain::account::{AccountRole, DecisionKind, Gender, VerificationStatus};
use marche_domain::pagination::{PageRequest, Sort};

// ── Account ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShopProfile {
    pub name: Option<String>,
    pub description: Option<String>,
    pub site: Option<String>,
}

/// A single-use token with an expiry, used for email confirmation and
/// password reset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpiringToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl ExpiringToken {
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

#[derive(Debug, Clone)]
pub struct Account {
    pub id: Uuid,
    pub name: String,
    pub surname: String,
    pub email: String,
    pub password_hash: String,
    pub phone: Option<String>,
    pub gender: Gender,
    pub role: AccountRole,
    pub verification_status: VerificationStatus,
    pub verified_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    /// Present only for vendors.
    pub shop: Option<ShopProfile>,
    pub active: bool,
    pub suspension_reason: Option<String>,
    pub suspended_at: Option<DateTime<Utc>>,
    pub email_confirmed: bool,
    pub email_verification: Option<ExpiringToken>,
    pub password_reset: Option<ExpiringToken>,
    pub invitation_code: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.name, self.surname)
    }

    /// Approval: pending → verified. The email is considered confirmed by
    /// the moderator's review.
    pub fn approve(&mut self, at: DateTime<Utc>) {
        self.verification_status = VerificationStatus::Verified;
        self.verified_at = Some(at);
        self.rejection_reason = None;
        self.email_confirmed = true;
        self.updated_at = at;
    }

    /// Rejection: pending → rejected.
    pub fn reject(&mut self, reason: String, at: DateTime<Utc>) {
        self.verification_status = VerificationStatus::Rejected;
        self.verified_at = Some(at);
        self.rejection_reason = Some(reason);
        self.updated_at = at;
    }

    pub fn suspend(&mut self, reason: String, at: DateTime<Utc>) {
        self.active = false;
        self.suspension_reason = Some(reason);
        self.suspended_at = Some(at);
        self.updated_at = at;
    }

    pub fn activate(&mut self, at: DateTime<Utc>) {
        self.active = true;
        self.suspension_reason = None;
        self.suspended_at = None;
        self.updated_at = at;
    }

    /// Move to `role`, keeping the shop profile only while the account is a vendor.
    pub fn change_role(&mut self, role: AccountRole, at: DateTime<Utc>) {
        self.role = role;
        self.shop = match role {
            AccountRole::Vendor => Some(self.shop.take().unwrap_or_default()),
            _ => None,
        };
        self.updated_at = at;
    }

    /// The label recorded in the ledger for the activity flag.
    pub fn activity_label(&self) -> &'static str {
        if self.active { "active" } else { "suspended" }
    }

    pub fn summary(&self) -> AccountSummary {
        AccountSummary {
            id: self.id,
            name: self.name.clone(),
            surname: self.surname.clone(),
            email: self.email.clone(),
            role: self.role,
            shop_name: self.shop.as_ref().and_then(|s| s.name.clone()),
        }
    }
}

/// The non-secret identity of an account, carried by workflow events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountSummary {
    pub id: Uuid,
    pub name: String,
    pub surname: String,
    pub email: String,
    pub role: AccountRole,
    pub shop_name: Option<String>,
}

impl AccountSummary {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.name, self.surname)
    }
}

// ── Decision ledger ──────────────────────────────────────────────────────────

/// Network origin of a staff action.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Provenance {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Staff member who took a decision, as known at decision time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActorSnapshot {
    pub id: Uuid,
    pub email: String,
    pub role: AccountRole,
}

/// An append-only record of one moderation decision.
///
/// Target and actor identities are snapshots: the entry stays readable
/// after either account changes or is deleted.
#[derive(Debug, Clone)]
pub struct LedgerEntry {
    pub id: Uuid,
    pub target_account_id: Uuid,
    pub target_email: String,
    pub target_role: AccountRole,
    pub actor_account_id: Uuid,
    pub actor_email: String,
    pub kind: DecisionKind,
    pub status_before: String,
    pub status_after: String,
    pub reason: Option<String>,
    pub details: serde_json::Value,
    pub provenance: Provenance,
    pub decided_at: DateTime<Utc>,
}

/// Precondition a decision is committed under. The commit fails with
/// `AlreadyProcessed` if the stored account no longer satisfies it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionGuard {
    StatusIs(VerificationStatus),
    ActiveIs(bool),
}

// ── Queries ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RequestSortField {
    #[default]
    CreatedAt,
    Name,
    Email,
    Role,
}

impl RequestSortField {
    pub fn from_kebab(s: &str) -> Option<Self> {
        match s {
            "created-at" => Some(Self::CreatedAt),
            "name" => Some(Self::Name),
            "email" => Some(Self::Email),
            "role" => Some(Self::Role),
            _ => None,
        }
    }
}

/// Filter over registration requests. Clients never appear in the result.
#[derive(Debug, Clone)]
pub struct RequestFilter {
    pub role: Option<AccountRole>,
    pub status: VerificationStatus,
    pub created_from: Option<DateTime<Utc>>,
    pub created_to: Option<DateTime<Utc>>,
    pub search: Option<String>,
    pub sort_field: RequestSortField,
    pub sort: Sort,
    pub page: PageRequest,
}

impl Default for RequestFilter {
    fn default() -> Self {
        Self {
            role: None,
            status: VerificationStatus::Pending,
            created_from: None,
            created_to: None,
            search: None,
            sort_field: RequestSortField::default(),
            sort: Sort::default(),
            page: PageRequest::default(),
        }
    }
}

impl RequestFilter {
    pub fn matches(&self, account: &Account) -> bool {
        account.role != AccountRole::Client
            && account.verification_status == self.status
            && self.role.is_none_or(|r| r == account.role)
            && self.created_from.is_none_or(|from| account.created_at >= from)
            && self.created_to.is_none_or(|to| account.created_at <= to)
            && self.matches_search(account)
    }

    fn matches_search(&self, account: &Account) -> bool {
        let Some(term) = self.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) else {
            return true;
        };
        let term = term.to_lowercase();
        let shop_name = account.shop.as_ref().and_then(|s| s.name.as_deref());
        [Some(&*account.name), Some(&*account.surname), Some(&*account.email), shop_name]
            .into_iter()
            .flatten()
            .any(|field| field.to_lowercase().contains(&term))
    }
}

#[derive(Debug, Clone, Default)]
pub struct DecisionFilter {
    pub kinds: Vec<DecisionKind>,
    pub actor_id: Option<Uuid>,
    pub target_id: Option<Uuid>,
    pub decided_from: Option<DateTime<Utc>>,
    pub decided_to: Option<DateTime<Utc>>,
    pub page: PageRequest,
}

impl DecisionFilter {
    pub fn matches(&self, entry: &LedgerEntry) -> bool {
        (self.kinds.is_empty() || self.kinds.contains(&entry.kind))
            && self.actor_id.is_none_or(|id| id == entry.actor_account_id)
            && self.target_id.is_none_or(|id| id == entry.target_account_id)
            && self.decided_from.is_none_or(|from| entry.decided_at >= from)
            && self.decided_to.is_none_or(|to| entry.decided_at <= to)
    }
}

/// Registration requests created in one calendar month, for one role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthlyRequestCount {
    /// `YYYY-MM`.
    pub month: String,
    pub role: AccountRole,
    pub count: u64,
}

#[derive(Debug, Clone)]
pub struct ModerationStatistics {
    pub total_pending: u64,
    pub pending_by_role: Vec<(AccountRole, u64)>,
    pub monthly_trend: Vec<MonthlyRequestCount>,
    pub recent_decisions: Vec<LedgerEntry>,
    pub live_admin_connections: usize,
}

// ── Notifications ────────────────────────────────────────────────────────────

/// Something that happened in the workflow and may warrant an email or a
/// live push to connected admins.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowEvent {
    /// Any account was created.
    Registered {
        account: AccountSummary,
        status: VerificationStatus,
        email_verification_token: Option<String>,
    },
    /// A restricted-role account is waiting for a decision.
    RequestSubmitted {
        account: AccountSummary,
        alert_admins_by_email: bool,
    },
    Approved {
        account: AccountSummary,
        actor_email: String,
        decided_at: DateTime<Utc>,
    },
    Rejected {
        account: AccountSummary,
        actor_email: String,
        reason: String,
        decided_at: DateTime<Utc>,
    },
    Suspended {
        account: AccountSummary,
        actor_email: String,
        reason: String,
        decided_at: DateTime<Utc>,
    },
    Activated {
        account: AccountSummary,
        actor_email: String,
        decided_at: DateTime<Utc>,
    },
}

/// An outbound email, already rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to_email: String,
    pub to_name: Option<String>,
    pub subject: String,
    pub html: String,
    pub text: String,
}

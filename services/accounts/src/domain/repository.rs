#![allow(async_fn_in_trait)]

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use marche_domain::account::AccountRole;
use marche_domain::pagination::Page;

use crate::domain::types::{
    Account, DecisionFilter, DecisionGuard, EmailMessage, LedgerEntry, MonthlyRequestCount,
    RequestFilter, ShopProfile, WorkflowEvent,
};
use crate::error::AccountsServiceError;

/// Repository for account records.
pub trait AccountRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, AccountsServiceError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, AccountsServiceError>;
    async fn find_by_email_verification_token(
        &self,
        token: &str,
    ) -> Result<Option<Account>, AccountsServiceError>;

    /// Insert a new account. A concurrent registration of the same email
    /// surfaces as [`AccountsServiceError::EmailTaken`].
    async fn create(&self, account: &Account) -> Result<(), AccountsServiceError>;

    /// Number of accounts registered with `code` for `role`.
    async fn count_by_invitation_code(
        &self,
        role: AccountRole,
        code: &str,
    ) -> Result<u64, AccountsServiceError>;

    async fn update_profile(
        &self,
        id: Uuid,
        name: &str,
        surname: &str,
        phone: Option<&str>,
        shop: Option<&ShopProfile>,
    ) -> Result<(), AccountsServiceError>;
    async fn update_password_hash(
        &self,
        id: Uuid,
        password_hash: &str,
    ) -> Result<(), AccountsServiceError>;
    async fn confirm_email(&self, id: Uuid) -> Result<(), AccountsServiceError>;
    async fn update_role(
        &self,
        id: Uuid,
        role: AccountRole,
        shop: Option<&ShopProfile>,
    ) -> Result<(), AccountsServiceError>;

    /// Returns `false` when no such account existed.
    async fn delete(&self, id: Uuid) -> Result<bool, AccountsServiceError>;

    async fn list_requests(
        &self,
        filter: &RequestFilter,
    ) -> Result<Page<Account>, AccountsServiceError>;
    async fn count_pending_by_role(&self) -> Result<Vec<(AccountRole, u64)>, AccountsServiceError>;
    async fn monthly_request_counts(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<MonthlyRequestCount>, AccountsServiceError>;
}

/// Read side of the decision ledger. Entries are only ever written by
/// [`DecisionStore::commit_decision`].
pub trait LedgerRepository: Send + Sync {
    /// Every decision about `account_id`, newest first.
    async fn list_for_target(
        &self,
        account_id: Uuid,
    ) -> Result<Vec<LedgerEntry>, AccountsServiceError>;
    async fn list(&self, filter: &DecisionFilter)
    -> Result<Page<LedgerEntry>, AccountsServiceError>;
    async fn recent(&self, limit: u64) -> Result<Vec<LedgerEntry>, AccountsServiceError>;
}

/// Atomic write of a decision: the account update and its ledger entry
/// land together or not at all.
pub trait DecisionStore: Send + Sync {
    /// Persist the decision fields of `updated` and append `entry`, provided
    /// the stored account still satisfies `guard`. Otherwise nothing is
    /// written and [`AccountsServiceError::AlreadyProcessed`] is returned.
    async fn commit_decision(
        &self,
        updated: &Account,
        guard: DecisionGuard,
        entry: &LedgerEntry,
    ) -> Result<(), AccountsServiceError>;
}

/// Outbound email transport.
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> anyhow::Result<()>;
}

/// Fire-and-forget hand-off of workflow events.
///
/// Never blocks the caller and never fails it; delivery problems are the
/// sink's to log.
pub trait NotificationSink: Send + Sync {
    fn dispatch(&self, event: WorkflowEvent);
}

/// Count of admin sessions currently subscribed to live updates.
pub trait AdminPresence: Send + Sync {
    fn connected_admins(&self) -> usize;
}

impl<T: AdminPresence + ?Sized> AdminPresence for Arc<T> {
    fn connected_admins(&self) -> usize {
        (**self).connected_admins()
    }
}

use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use marche_domain::account::{AccountRole, DecisionKind, VerificationStatus};

use crate::domain::repository::{AccountRepository, DecisionStore, NotificationSink};
use crate::domain::types::{
    Account, ActorSnapshot, DecisionGuard, LedgerEntry, Provenance, WorkflowEvent,
};
use crate::error::AccountsServiceError;

/// Who is acting, and from where.
#[derive(Debug, Clone)]
pub struct ModerationContext {
    pub actor_id: Uuid,
    pub provenance: Provenance,
}

/// Load the acting staff member and the target account.
///
/// Checks run in order: self-targeting, actor privilege, target existence.
/// The actor's role is read from storage, not from the caller's claims, so a
/// demoted moderator loses access immediately.
async fn resolve_parties<A: AccountRepository>(
    accounts: &A,
    target_id: Uuid,
    ctx: &ModerationContext,
) -> Result<(ActorSnapshot, Account), AccountsServiceError> {
    if target_id == ctx.actor_id {
        return Err(AccountsServiceError::SelfActionForbidden);
    }
    let actor = accounts
        .find_by_id(ctx.actor_id)
        .await?
        .filter(|a| a.role.is_staff() && a.active)
        .ok_or(AccountsServiceError::Forbidden)?;
    let target = accounts
        .find_by_id(target_id)
        .await?
        .ok_or(AccountsServiceError::AccountNotFound)?;
    let actor = ActorSnapshot {
        id: actor.id,
        email: actor.email,
        role: actor.role,
    };
    Ok((actor, target))
}

/// Deciding on a staff account takes an admin; moderators handle the rest.
fn ensure_can_decide(actor: &ActorSnapshot, target: &Account) -> Result<(), AccountsServiceError> {
    if target.role.is_staff() && actor.role != AccountRole::Admin {
        return Err(AccountsServiceError::Forbidden);
    }
    Ok(())
}

fn require_reason(reason: &str) -> Result<String, AccountsServiceError> {
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(AccountsServiceError::MissingReason);
    }
    Ok(reason.to_owned())
}

fn ledger_entry(
    kind: DecisionKind,
    actor: &ActorSnapshot,
    target: &Account,
    (status_before, status_after): (&str, &str),
    reason: Option<String>,
    ctx: &ModerationContext,
    decided_at: DateTime<Utc>,
) -> LedgerEntry {
    let details = serde_json::json!({
        "actor_role": actor.role.as_str(),
        "target_name": target.display_name(),
        "shop_name": target.shop.as_ref().and_then(|s| s.name.clone()),
    });
    LedgerEntry {
        id: Uuid::now_v7(),
        target_account_id: target.id,
        target_email: target.email.clone(),
        target_role: target.role,
        actor_account_id: actor.id,
        actor_email: actor.email.clone(),
        kind,
        status_before: status_before.to_owned(),
        status_after: status_after.to_owned(),
        reason,
        details,
        provenance: ctx.provenance.clone(),
        decided_at,
    }
}

// ── ApproveRequest ───────────────────────────────────────────────────────────

pub struct ApproveRequestUseCase<A, S, N>
where
    A: AccountRepository,
    S: DecisionStore,
    N: NotificationSink,
{
    pub accounts: A,
    pub decisions: S,
    pub notifier: N,
}

impl<A, S, N> ApproveRequestUseCase<A, S, N>
where
    A: AccountRepository,
    S: DecisionStore,
    N: NotificationSink,
{
    pub async fn execute(
        &self,
        account_id: Uuid,
        ctx: ModerationContext,
    ) -> Result<Account, AccountsServiceError> {
        let (actor, mut account) = resolve_parties(&self.accounts, account_id, &ctx).await?;
        if account.verification_status != VerificationStatus::Pending {
            return Err(AccountsServiceError::AlreadyProcessed);
        }
        ensure_can_decide(&actor, &account)?;

        let now = Utc::now();
        let before = account.verification_status;
        account.approve(now);
        let entry = ledger_entry(
            DecisionKind::Approval,
            &actor,
            &account,
            (before.as_str(), account.verification_status.as_str()),
            None,
            &ctx,
            now,
        );
        self.decisions
            .commit_decision(&account, DecisionGuard::StatusIs(before), &entry)
            .await?;

        info!(
            account_id = %account.id,
            actor_id = %actor.id,
            decision = "approval",
            "registration request approved"
        );
        self.notifier.dispatch(WorkflowEvent::Approved {
            account: account.summary(),
            actor_email: actor.email,
            decided_at: now,
        });
        Ok(account)
    }
}

// ── RejectRequest ────────────────────────────────────────────────────────────

pub struct RejectRequestUseCase<A, S, N>
where
    A: AccountRepository,
    S: DecisionStore,
    N: NotificationSink,
{
    pub accounts: A,
    pub decisions: S,
    pub notifier: N,
}

impl<A, S, N> RejectRequestUseCase<A, S, N>
where
    A: AccountRepository,
    S: DecisionStore,
    N: NotificationSink,
{
    pub async fn execute(
        &self,
        account_id: Uuid,
        reason: &str,
        ctx: ModerationContext,
    ) -> Result<Account, AccountsServiceError> {
        let reason = require_reason(reason)?;
        let (actor, mut account) = resolve_parties(&self.accounts, account_id, &ctx).await?;
        if account.verification_status != VerificationStatus::Pending {
            return Err(AccountsServiceError::AlreadyProcessed);
        }
        ensure_can_decide(&actor, &account)?;

        let now = Utc::now();
        let before = account.verification_status;
        account.reject(reason.clone(), now);
        let entry = ledger_entry(
            DecisionKind::Rejection,
            &actor,
            &account,
            (before.as_str(), account.verification_status.as_str()),
            Some(reason.clone()),
            &ctx,
            now,
        );
        self.decisions
            .commit_decision(&account, DecisionGuard::StatusIs(before), &entry)
            .await?;

        info!(
            account_id = %account.id,
            actor_id = %actor.id,
            decision = "rejection",
            "registration request rejected"
        );
        self.notifier.dispatch(WorkflowEvent::Rejected {
            account: account.summary(),
            actor_email: actor.email,
            reason,
            decided_at: now,
        });
        Ok(account)
    }
}

// ── SuspendAccount ───────────────────────────────────────────────────────────

pub struct SuspendAccountUseCase<A, S, N>
where
    A: AccountRepository,
    S: DecisionStore,
    N: NotificationSink,
{
    pub accounts: A,
    pub decisions: S,
    pub notifier: N,
}

impl<A, S, N> SuspendAccountUseCase<A, S, N>
where
    A: AccountRepository,
    S: DecisionStore,
    N: NotificationSink,
{
    pub async fn execute(
        &self,
        account_id: Uuid,
        reason: &str,
        ctx: ModerationContext,
    ) -> Result<Account, AccountsServiceError> {
        let reason = require_reason(reason)?;
        let (actor, mut account) = resolve_parties(&self.accounts, account_id, &ctx).await?;
        // Admin accounts cannot be suspended by anyone.
        if account.role == AccountRole::Admin {
            return Err(AccountsServiceError::Forbidden);
        }
        ensure_can_decide(&actor, &account)?;
        if !account.active {
            return Err(AccountsServiceError::AlreadyProcessed);
        }

        let now = Utc::now();
        let before = account.activity_label();
        account.suspend(reason.clone(), now);
        let entry = ledger_entry(
            DecisionKind::Suspension,
            &actor,
            &account,
            (before, account.activity_label()),
            Some(reason.clone()),
            &ctx,
            now,
        );
        self.decisions
            .commit_decision(&account, DecisionGuard::ActiveIs(true), &entry)
            .await?;

        info!(
            account_id = %account.id,
            actor_id = %actor.id,
            decision = "suspension",
            "account suspended"
        );
        self.notifier.dispatch(WorkflowEvent::Suspended {
            account: account.summary(),
            actor_email: actor.email,
            reason,
            decided_at: now,
        });
        Ok(account)
    }
}

// ── ActivateAccount ──────────────────────────────────────────────────────────

pub struct ActivateAccountUseCase<A, S, N>
where
    A: AccountRepository,
    S: DecisionStore,
    N: NotificationSink,
{
    pub accounts: A,
    pub decisions: S,
    pub notifier: N,
}

impl<A, S, N> ActivateAccountUseCase<A, S, N>
where
    A: AccountRepository,
    S: DecisionStore,
    N: NotificationSink,
{
    pub async fn execute(
        &self,
        account_id: Uuid,
        ctx: ModerationContext,
    ) -> Result<Account, AccountsServiceError> {
        let (actor, mut account) = resolve_parties(&self.accounts, account_id, &ctx).await?;
        ensure_can_decide(&actor, &account)?;
        if account.active {
            return Err(AccountsServiceError::AlreadyProcessed);
        }

        let now = Utc::now();
        let before = account.activity_label();
        account.activate(now);
        let entry = ledger_entry(
            DecisionKind::Activation,
            &actor,
            &account,
            (before, account.activity_label()),
            None,
            &ctx,
            now,
        );
        self.decisions
            .commit_decision(&account, DecisionGuard::ActiveIs(false), &entry)
            .await?;

        info!(
            account_id = %account.id,
            actor_id = %actor.id,
            decision = "activation",
            "account reactivated"
        );
        self.notifier.dispatch(WorkflowEvent::Activated {
            account: account.summary(),
            actor_email: actor.email,
            decided_at: now,
        });
        Ok(account)
    }
}

// ── ChangeRole ───────────────────────────────────────────────────────────────

pub struct ChangeRoleUseCase<A: AccountRepository> {
    pub accounts: A,
}

impl<A: AccountRepository> ChangeRoleUseCase<A> {
    pub async fn execute(
        &self,
        account_id: Uuid,
        role: AccountRole,
        ctx: ModerationContext,
    ) -> Result<Account, AccountsServiceError> {
        let (actor, mut account) = resolve_parties(&self.accounts, account_id, &ctx).await?;
        if actor.role != AccountRole::Admin {
            return Err(AccountsServiceError::Forbidden);
        }
        let previous = account.role;
        account.change_role(role, Utc::now());
        self.accounts
            .update_role(account.id, account.role, account.shop.as_ref())
            .await?;
        info!(
            account_id = %account.id,
            actor_id = %actor.id,
            from = previous.as_str(),
            to = role.as_str(),
            "account role changed"
        );
        Ok(account)
    }
}

// ── DeleteAccount ────────────────────────────────────────────────────────────

pub struct DeleteAccountUseCase<A: AccountRepository> {
    pub accounts: A,
}

impl<A: AccountRepository> DeleteAccountUseCase<A> {
    pub async fn execute(
        &self,
        account_id: Uuid,
        ctx: ModerationContext,
    ) -> Result<(), AccountsServiceError> {
        let (actor, account) = resolve_parties(&self.accounts, account_id, &ctx).await?;
        if actor.role != AccountRole::Admin {
            return Err(AccountsServiceError::Forbidden);
        }
        if !self.accounts.delete(account.id).await? {
            return Err(AccountsServiceError::AccountNotFound);
        }
        info!(
            account_id = %account.id,
            actor_id = %actor.id,
            role = account.role.as_str(),
            "account deleted"
        );
        Ok(())
    }
}

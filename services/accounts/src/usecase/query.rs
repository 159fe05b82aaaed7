use chrono::{DateTime, Datelike, TimeZone, Utc};
use uuid::Uuid;

use marche_domain::account::AccountRole;
use marche_domain::pagination::Page;

use crate::domain::repository::{AccountRepository, AdminPresence, LedgerRepository};
use crate::domain::types::{
    Account, DecisionFilter, LedgerEntry, ModerationStatistics, MonthlyRequestCount,
    RequestFilter,
};
use crate::error::AccountsServiceError;

/// Months covered by the statistics trend, current month included.
pub const TREND_MONTHS: u32 = 6;

/// Decisions shown in the statistics summary.
pub const RECENT_DECISIONS: u64 = 10;

// ── ListRequests ─────────────────────────────────────────────────────────────

pub struct ListRequestsUseCase<A: AccountRepository> {
    pub accounts: A,
}

impl<A: AccountRepository> ListRequestsUseCase<A> {
    pub async fn execute(
        &self,
        mut filter: RequestFilter,
    ) -> Result<Page<Account>, AccountsServiceError> {
        if let (Some(from), Some(to)) = (filter.created_from, filter.created_to) {
            if from > to {
                return Err(AccountsServiceError::InvalidQuery(
                    "date-from must not be after date-to".to_owned(),
                ));
            }
        }
        filter.page = filter.page.clamped();
        self.accounts.list_requests(&filter).await
    }
}

// ── Statistics ───────────────────────────────────────────────────────────────

pub struct StatisticsUseCase<A, L, P>
where
    A: AccountRepository,
    L: LedgerRepository,
    P: AdminPresence,
{
    pub accounts: A,
    pub ledger: L,
    pub presence: P,
}

impl<A, L, P> StatisticsUseCase<A, L, P>
where
    A: AccountRepository,
    L: LedgerRepository,
    P: AdminPresence,
{
    pub async fn execute(&self) -> Result<ModerationStatistics, AccountsServiceError> {
        let now = Utc::now();
        let months = trend_months(now, TREND_MONTHS);
        let since = month_start(months[0]).ok_or_else(|| {
            AccountsServiceError::Upstream(anyhow::anyhow!("invalid trend start month"))
        })?;

        let pending = self.accounts.count_pending_by_role().await?;
        let counts = self.accounts.monthly_request_counts(since).await?;
        let recent_decisions = self.ledger.recent(RECENT_DECISIONS).await?;

        let pending_by_role: Vec<(AccountRole, u64)> = AccountRole::ALL
            .into_iter()
            .filter(|role| role.is_restricted())
            .map(|role| {
                let count = pending
                    .iter()
                    .find(|(r, _)| *r == role)
                    .map_or(0, |(_, c)| *c);
                (role, count)
            })
            .collect();

        Ok(ModerationStatistics {
            total_pending: pending_by_role.iter().map(|(_, c)| c).sum(),
            pending_by_role,
            monthly_trend: fill_trend(&months, &counts),
            recent_decisions,
            live_admin_connections: self.presence.connected_admins(),
        })
    }
}

/// The last `count` calendar months as `(year, month)`, oldest first.
fn trend_months(now: DateTime<Utc>, count: u32) -> Vec<(i32, u32)> {
    let current = now.year() * 12 + now.month0() as i32;
    (0..count as i32)
        .rev()
        .map(|back| {
            let index = current - back;
            (index.div_euclid(12), index.rem_euclid(12) as u32 + 1)
        })
        .collect()
}

fn month_start((year, month): (i32, u32)) -> Option<DateTime<Utc>> {
    Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0).single()
}

/// One entry per month and restricted role, zero where nothing was counted.
fn fill_trend(months: &[(i32, u32)], counts: &[MonthlyRequestCount]) -> Vec<MonthlyRequestCount> {
    months
        .iter()
        .flat_map(|&(year, month)| {
            let key = format!("{year:04}-{month:02}");
            AccountRole::ALL
                .into_iter()
                .filter(|role| role.is_restricted())
                .map(move |role| {
                    let count = counts
                        .iter()
                        .find(|c| c.month == key && c.role == role)
                        .map_or(0, |c| c.count);
                    MonthlyRequestCount {
                        month: key.clone(),
                        role,
                        count,
                    }
                })
        })
        .collect()
}

// ── AccountDecisions ─────────────────────────────────────────────────────────

pub struct AccountDecisionsUseCase<A, L>
where
    A: AccountRepository,
    L: LedgerRepository,
{
    pub accounts: A,
    pub ledger: L,
}

impl<A, L> AccountDecisionsUseCase<A, L>
where
    A: AccountRepository,
    L: LedgerRepository,
{
    /// Full history for one account, newest first. History outlives the
    /// account itself; only an id with neither yields `AccountNotFound`.
    pub async fn execute(&self, account_id: Uuid) -> Result<Vec<LedgerEntry>, AccountsServiceError> {
        let entries = self.ledger.list_for_target(account_id).await?;
        if entries.is_empty() && self.accounts.find_by_id(account_id).await?.is_none() {
            return Err(AccountsServiceError::AccountNotFound);
        }
        Ok(entries)
    }
}

// ── ListDecisions ────────────────────────────────────────────────────────────

pub struct ListDecisionsUseCase<L: LedgerRepository> {
    pub ledger: L,
}

impl<L: LedgerRepository> ListDecisionsUseCase<L> {
    pub async fn execute(
        &self,
        mut filter: DecisionFilter,
    ) -> Result<Page<LedgerEntry>, AccountsServiceError> {
        if let (Some(from), Some(to)) = (filter.decided_from, filter.decided_to) {
            if from > to {
                return Err(AccountsServiceError::InvalidQuery(
                    "date-from must not be after date-to".to_owned(),
                ));
            }
        }
        filter.page = filter.page.clamped();
        self.ledger.list(&filter).await
    }
}

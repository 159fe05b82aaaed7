use anyhow::{Context as _, anyhow};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection,
    DatabaseTransaction, DbErr, EntityTrait, FromQueryResult, Order, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, SqlErr, Statement, TransactionError, TransactionTrait, UpdateMany,
    sea_query::Expr,
};
use uuid::Uuid;

use marche_accounts_schema::{accounts, decision_ledger};
use marche_core::sea_ext::SearchInsensitive;
use marche_domain::account::{AccountRole, VerificationStatus};
use marche_domain::pagination::{Page, PageMeta, Sort};

use crate::domain::repository::{AccountRepository, DecisionStore, LedgerRepository};
use crate::domain::types::{
    Account, DecisionFilter, DecisionGuard, ExpiringToken, LedgerEntry, MonthlyRequestCount,
    Provenance, RequestFilter, RequestSortField, ShopProfile,
};
use crate::error::AccountsServiceError;

// ── Account repository ───────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbAccountRepository {
    pub db: DatabaseConnection,
}

impl AccountRepository for DbAccountRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, AccountsServiceError> {
        let model = accounts::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .context("find account by id")?;
        Ok(model.map(account_from_model).transpose()?)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, AccountsServiceError> {
        let model = accounts::Entity::find()
            .filter(accounts::Column::Email.eq(email))
            .one(&self.db)
            .await
            .context("find account by email")?;
        Ok(model.map(account_from_model).transpose()?)
    }

    async fn find_by_email_verification_token(
        &self,
        token: &str,
    ) -> Result<Option<Account>, AccountsServiceError> {
        let model = accounts::Entity::find()
            .filter(accounts::Column::EmailVerificationToken.eq(token))
            .one(&self.db)
            .await
            .context("find account by email verification token")?;
        Ok(model.map(account_from_model).transpose()?)
    }

    async fn create(&self, account: &Account) -> Result<(), AccountsServiceError> {
        let shop = account.shop.clone().unwrap_or_default();
        let result = accounts::ActiveModel {
            id: Set(account.id),
            name: Set(account.name.clone()),
            surname: Set(account.surname.clone()),
            email: Set(account.email.clone()),
            password_hash: Set(account.password_hash.clone()),
            phone: Set(account.phone.clone()),
            gender: Set(account.gender.as_str().to_owned()),
            role: Set(account.role.as_str().to_owned()),
            verification_status: Set(account.verification_status.as_str().to_owned()),
            verified_at: Set(account.verified_at),
            rejection_reason: Set(account.rejection_reason.clone()),
            shop_name: Set(shop.name),
            shop_description: Set(shop.description),
            shop_site: Set(shop.site),
            active: Set(account.active),
            suspension_reason: Set(account.suspension_reason.clone()),
            suspended_at: Set(account.suspended_at),
            email_confirmed: Set(account.email_confirmed),
            email_verification_token: Set(account.email_verification.as_ref().map(|t| t.token.clone())),
            email_verification_expires_at: Set(account.email_verification.as_ref().map(|t| t.expires_at)),
            password_reset_token: Set(account.password_reset.as_ref().map(|t| t.token.clone())),
            password_reset_expires_at: Set(account.password_reset.as_ref().map(|t| t.expires_at)),
            invitation_code: Set(account.invitation_code.clone()),
            created_at: Set(account.created_at),
            updated_at: Set(account.updated_at),
        }
        .insert(&self.db)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                Err(AccountsServiceError::EmailTaken)
            }
            Err(e) => Err(anyhow::Error::new(e).context("create account").into()),
        }
    }

    async fn count_by_invitation_code(
        &self,
        role: AccountRole,
        code: &str,
    ) -> Result<u64, AccountsServiceError> {
        let count = accounts::Entity::find()
            .filter(accounts::Column::Role.eq(role.as_str()))
            .filter(accounts::Column::InvitationCode.eq(code))
            .count(&self.db)
            .await
            .context("count accounts by invitation code")?;
        Ok(count)
    }

    async fn update_profile(
        &self,
        id: Uuid,
        name: &str,
        surname: &str,
        phone: Option<&str>,
        shop: Option<&ShopProfile>,
    ) -> Result<(), AccountsServiceError> {
        let shop = shop.cloned().unwrap_or_default();
        let result = accounts::Entity::update_many()
            .col_expr(accounts::Column::Name, Expr::value(name))
            .col_expr(accounts::Column::Surname, Expr::value(surname))
            .col_expr(accounts::Column::Phone, Expr::value(phone.map(str::to_owned)))
            .col_expr(accounts::Column::ShopName, Expr::value(shop.name))
            .col_expr(accounts::Column::ShopDescription, Expr::value(shop.description))
            .col_expr(accounts::Column::ShopSite, Expr::value(shop.site))
            .col_expr(accounts::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(accounts::Column::Id.eq(id))
            .exec(&self.db)
            .await
            .context("update account profile")?;
        if result.rows_affected == 0 {
            return Err(AccountsServiceError::AccountNotFound);
        }
        Ok(())
    }

    async fn update_password_hash(
        &self,
        id: Uuid,
        password_hash: &str,
    ) -> Result<(), AccountsServiceError> {
        let result = accounts::Entity::update_many()
            .col_expr(accounts::Column::PasswordHash, Expr::value(password_hash))
            .col_expr(accounts::Column::PasswordResetToken, Expr::value(Option::<String>::None))
            .col_expr(
                accounts::Column::PasswordResetExpiresAt,
                Expr::value(Option::<DateTime<Utc>>::None),
            )
            .col_expr(accounts::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(accounts::Column::Id.eq(id))
            .exec(&self.db)
            .await
            .context("update password hash")?;
        if result.rows_affected == 0 {
            return Err(AccountsServiceError::AccountNotFound);
        }
        Ok(())
    }

    async fn confirm_email(&self, id: Uuid) -> Result<(), AccountsServiceError> {
        accounts::Entity::update_many()
            .col_expr(accounts::Column::EmailConfirmed, Expr::value(true))
            .col_expr(accounts::Column::EmailVerificationToken, Expr::value(Option::<String>::None))
            .col_expr(
                accounts::Column::EmailVerificationExpiresAt,
                Expr::value(Option::<DateTime<Utc>>::None),
            )
            .col_expr(accounts::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(accounts::Column::Id.eq(id))
            .exec(&self.db)
            .await
            .context("confirm email")?;
        Ok(())
    }

    async fn update_role(
        &self,
        id: Uuid,
        role: AccountRole,
        shop: Option<&ShopProfile>,
    ) -> Result<(), AccountsServiceError> {
        let shop = shop.cloned().unwrap_or_default();
        let result = accounts::Entity::update_many()
            .col_expr(accounts::Column::Role, Expr::value(role.as_str()))
            .col_expr(accounts::Column::ShopName, Expr::value(shop.name))
            .col_expr(accounts::Column::ShopDescription, Expr::value(shop.description))
            .col_expr(accounts::Column::ShopSite, Expr::value(shop.site))
            .col_expr(accounts::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(accounts::Column::Id.eq(id))
            .exec(&self.db)
            .await
            .context("update account role")?;
        if result.rows_affected == 0 {
            return Err(AccountsServiceError::AccountNotFound);
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, AccountsServiceError> {
        let result = accounts::Entity::delete_by_id(id)
            .exec(&self.db)
            .await
            .context("delete account")?;
        Ok(result.rows_affected > 0)
    }

    async fn list_requests(
        &self,
        filter: &RequestFilter,
    ) -> Result<Page<Account>, AccountsServiceError> {
        let mut query = accounts::Entity::find()
            .filter(accounts::Column::VerificationStatus.eq(filter.status.as_str()));
        query = match filter.role {
            Some(role) => query.filter(accounts::Column::Role.eq(role.as_str())),
            None => query.filter(accounts::Column::Role.ne(AccountRole::Client.as_str())),
        };
        if let Some(from) = filter.created_from {
            query = query.filter(accounts::Column::CreatedAt.gte(from));
        }
        if let Some(to) = filter.created_to {
            query = query.filter(accounts::Column::CreatedAt.lte(to));
        }
        if let Some(term) = filter.search.as_deref() {
            query = query.search_insensitive(
                &[
                    accounts::Column::Name,
                    accounts::Column::Surname,
                    accounts::Column::Email,
                    accounts::Column::ShopName,
                ],
                term,
            );
        }
        let column = match filter.sort_field {
            RequestSortField::CreatedAt => accounts::Column::CreatedAt,
            RequestSortField::Name => accounts::Column::Name,
            RequestSortField::Email => accounts::Column::Email,
            RequestSortField::Role => accounts::Column::Role,
        };
        query = query
            .order_by(column, order(filter.sort))
            .order_by_asc(accounts::Column::Id);

        let page = filter.page.clamped();
        let paginator = query.paginate(&self.db, u64::from(page.per_page));
        let total = paginator
            .num_items()
            .await
            .context("count registration requests")?;
        let models = paginator
            .fetch_page(page.index())
            .await
            .context("list registration requests")?;
        let items = models
            .into_iter()
            .map(account_from_model)
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(Page {
            items,
            meta: PageMeta::new(page, total),
        })
    }

    async fn count_pending_by_role(&self) -> Result<Vec<(AccountRole, u64)>, AccountsServiceError> {
        let rows: Vec<(String, i64)> = accounts::Entity::find()
            .select_only()
            .column(accounts::Column::Role)
            .column_as(Expr::col(accounts::Column::Id).count(), "count")
            .filter(
                accounts::Column::VerificationStatus.eq(VerificationStatus::Pending.as_str()),
            )
            .filter(accounts::Column::Role.ne(AccountRole::Client.as_str()))
            .group_by(accounts::Column::Role)
            .into_tuple()
            .all(&self.db)
            .await
            .context("count pending requests by role")?;
        rows.into_iter()
            .map(|(role, count)| -> Result<_, AccountsServiceError> {
                let role = role.parse::<AccountRole>().context("stored account role")?;
                Ok((role, count.max(0) as u64))
            })
            .collect()
    }

    async fn monthly_request_counts(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<MonthlyRequestCount>, AccountsServiceError> {
        #[derive(Debug, FromQueryResult)]
        struct MonthlyRow {
            month: String,
            role: String,
            count: i64,
        }

        let rows = MonthlyRow::find_by_statement(Statement::from_sql_and_values(
            self.db.get_database_backend(),
            r#"
            SELECT to_char(date_trunc('month', created_at AT TIME ZONE 'UTC'), 'YYYY-MM') AS month,
                   role,
                   COUNT(*) AS count
                FROM accounts
                WHERE role <> 'client' AND created_at >= $1
                GROUP BY 1, 2
            "#,
            [since.into()],
        ))
        .all(&self.db)
        .await
        .context("count registration requests per month")?;

        rows.into_iter()
            .map(|row| -> Result<_, AccountsServiceError> {
                Ok(MonthlyRequestCount {
                    month: row.month,
                    role: row.role.parse::<AccountRole>().context("stored account role")?,
                    count: row.count.max(0) as u64,
                })
            })
            .collect()
    }
}

fn order(sort: Sort) -> Order {
    match sort {
        Sort::Desc => Order::Desc,
        Sort::Asc => Order::Asc,
    }
}

fn expiring_token(
    token: Option<String>,
    expires_at: Option<DateTime<Utc>>,
) -> Option<ExpiringToken> {
    Some(ExpiringToken {
        token: token?,
        expires_at: expires_at?,
    })
}

fn account_from_model(model: accounts::Model) -> anyhow::Result<Account> {
    let role: AccountRole = model.role.parse().context("stored account role")?;
    let shop = (role == AccountRole::Vendor).then(|| ShopProfile {
        name: model.shop_name,
        description: model.shop_description,
        site: model.shop_site,
    });
    Ok(Account {
        id: model.id,
        name: model.name,
        surname: model.surname,
        email: model.email,
        password_hash: model.password_hash,
        phone: model.phone,
        gender: model.gender.parse().context("stored gender")?,
        role,
        verification_status: model
            .verification_status
            .parse()
            .context("stored verification status")?,
        verified_at: model.verified_at,
        rejection_reason: model.rejection_reason,
        shop,
        active: model.active,
        suspension_reason: model.suspension_reason,
        suspended_at: model.suspended_at,
        email_confirmed: model.email_confirmed,
        email_verification: expiring_token(
            model.email_verification_token,
            model.email_verification_expires_at,
        ),
        password_reset: expiring_token(model.password_reset_token, model.password_reset_expires_at),
        invitation_code: model.invitation_code,
        created_at: model.created_at,
        updated_at: model.updated_at,
    })
}

// ── Ledger repository ────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbLedgerRepository {
    pub db: DatabaseConnection,
}

impl LedgerRepository for DbLedgerRepository {
    async fn list_for_target(
        &self,
        account_id: Uuid,
    ) -> Result<Vec<LedgerEntry>, AccountsServiceError> {
        let models = decision_ledger::Entity::find()
            .filter(decision_ledger::Column::TargetAccountId.eq(account_id))
            .order_by_desc(decision_ledger::Column::DecidedAt)
            .order_by_desc(decision_ledger::Column::Id)
            .all(&self.db)
            .await
            .context("list decisions for account")?;
        Ok(models
            .into_iter()
            .map(entry_from_model)
            .collect::<anyhow::Result<Vec<_>>>()?)
    }

    async fn list(
        &self,
        filter: &DecisionFilter,
    ) -> Result<Page<LedgerEntry>, AccountsServiceError> {
        let mut query = decision_ledger::Entity::find();
        if !filter.kinds.is_empty() {
            query = query.filter(
                decision_ledger::Column::Kind.is_in(filter.kinds.iter().map(|k| k.as_str())),
            );
        }
        if let Some(actor_id) = filter.actor_id {
            query = query.filter(decision_ledger::Column::ActorAccountId.eq(actor_id));
        }
        if let Some(target_id) = filter.target_id {
            query = query.filter(decision_ledger::Column::TargetAccountId.eq(target_id));
        }
        if let Some(from) = filter.decided_from {
            query = query.filter(decision_ledger::Column::DecidedAt.gte(from));
        }
        if let Some(to) = filter.decided_to {
            query = query.filter(decision_ledger::Column::DecidedAt.lte(to));
        }
        query = query
            .order_by_desc(decision_ledger::Column::DecidedAt)
            .order_by_desc(decision_ledger::Column::Id);

        let page = filter.page.clamped();
        let paginator = query.paginate(&self.db, u64::from(page.per_page));
        let total = paginator.num_items().await.context("count decisions")?;
        let models = paginator
            .fetch_page(page.index())
            .await
            .context("list decisions")?;
        let items = models
            .into_iter()
            .map(entry_from_model)
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(Page {
            items,
            meta: PageMeta::new(page, total),
        })
    }

    async fn recent(&self, limit: u64) -> Result<Vec<LedgerEntry>, AccountsServiceError> {
        let models = decision_ledger::Entity::find()
            .order_by_desc(decision_ledger::Column::DecidedAt)
            .order_by_desc(decision_ledger::Column::Id)
            .limit(limit)
            .all(&self.db)
            .await
            .context("list recent decisions")?;
        Ok(models
            .into_iter()
            .map(entry_from_model)
            .collect::<anyhow::Result<Vec<_>>>()?)
    }
}

fn entry_from_model(model: decision_ledger::Model) -> anyhow::Result<LedgerEntry> {
    Ok(LedgerEntry {
        id: model.id,
        target_account_id: model.target_account_id,
        target_email: model.target_email,
        target_role: model.target_role.parse().context("stored target role")?,
        actor_account_id: model.actor_account_id,
        actor_email: model.actor_email,
        kind: model.kind.parse().context("stored decision kind")?,
        status_before: model.status_before,
        status_after: model.status_after,
        reason: model.reason,
        details: model.details,
        provenance: Provenance {
            ip_address: model.ip_address,
            user_agent: model.user_agent,
        },
        decided_at: model.decided_at,
    })
}

// ── Decision store ───────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
enum CommitError {
    #[error("account no longer matches the decision precondition")]
    Stale,
    #[error(transparent)]
    Db(#[from] DbErr),
}

#[derive(Clone)]
pub struct DbDecisionStore {
    pub db: DatabaseConnection,
}

impl DecisionStore for DbDecisionStore {
    async fn commit_decision(
        &self,
        updated: &Account,
        guard: DecisionGuard,
        entry: &LedgerEntry,
    ) -> Result<(), AccountsServiceError> {
        let result = self
            .db
            .transaction::<_, (), CommitError>(|txn| {
                let updated = updated.clone();
                let entry = entry.clone();
                Box::pin(async move {
                    apply_decision(txn, &updated, guard).await?;
                    insert_ledger_entry(txn, &entry).await?;
                    Ok(())
                })
            })
            .await;

        match result {
            Ok(()) => Ok(()),
            Err(TransactionError::Transaction(CommitError::Stale)) => {
                Err(AccountsServiceError::AlreadyProcessed)
            }
            Err(TransactionError::Transaction(CommitError::Db(e)))
            | Err(TransactionError::Connection(e)) => {
                Err(anyhow!(e).context("commit moderation decision").into())
            }
        }
    }
}

/// Conditional update: zero affected rows means another decision got there first.
///
/// Only the columns on the guarded axis are written, so a suspension never
/// rewrites a verification status it did not check, and vice versa.
async fn apply_decision(
    txn: &DatabaseTransaction,
    updated: &Account,
    guard: DecisionGuard,
) -> Result<(), CommitError> {
    let result = decision_update(updated, guard).exec(txn).await?;
    if result.rows_affected == 0 {
        return Err(CommitError::Stale);
    }
    Ok(())
}

fn decision_update(updated: &Account, guard: DecisionGuard) -> UpdateMany<accounts::Entity> {
    let update = accounts::Entity::update_many()
        .col_expr(accounts::Column::UpdatedAt, Expr::value(updated.updated_at))
        .filter(accounts::Column::Id.eq(updated.id));
    let update = match guard {
        DecisionGuard::StatusIs(status) => update
            .col_expr(
                accounts::Column::VerificationStatus,
                Expr::value(updated.verification_status.as_str()),
            )
            .col_expr(accounts::Column::VerifiedAt, Expr::value(updated.verified_at))
            .col_expr(
                accounts::Column::RejectionReason,
                Expr::value(updated.rejection_reason.clone()),
            )
            .col_expr(accounts::Column::EmailConfirmed, Expr::value(updated.email_confirmed))
            .filter(accounts::Column::VerificationStatus.eq(status.as_str())),
        DecisionGuard::ActiveIs(active) => update
            .col_expr(accounts::Column::Active, Expr::value(updated.active))
            .col_expr(
                accounts::Column::SuspensionReason,
                Expr::value(updated.suspension_reason.clone()),
            )
            .col_expr(accounts::Column::SuspendedAt, Expr::value(updated.suspended_at))
            .filter(accounts::Column::Active.eq(active)),
    };
    update
}

async fn insert_ledger_entry(txn: &DatabaseTransaction, entry: &LedgerEntry) -> Result<(), DbErr> {
    decision_ledger::ActiveModel {
        id: Set(entry.id),
        target_account_id: Set(entry.target_account_id),
        target_email: Set(entry.target_email.clone()),
        target_role: Set(entry.target_role.as_str().to_owned()),
        actor_account_id: Set(entry.actor_account_id),
        actor_email: Set(entry.actor_email.clone()),
        kind: Set(entry.kind.as_str().to_owned()),
        status_before: Set(entry.status_before.clone()),
        status_after: Set(entry.status_after.clone()),
        reason: Set(entry.reason.clone()),
        details: Set(entry.details.clone()),
        ip_address: Set(entry.provenance.ip_address.clone()),
        user_agent: Set(entry.provenance.user_agent.clone()),
        decided_at: Set(entry.decided_at),
    }
    .insert(txn)
    .await?;
    Ok(())
}

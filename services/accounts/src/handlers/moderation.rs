use axum::{
    Json,
    extract::{Path, RawQuery, State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use marche_auth_types::identity::IdentityHeaders;
use marche_domain::account::{AccountRole, DecisionKind, VerificationStatus};
use marche_domain::pagination::{PageMeta, PageRequest, Sort};

use crate::domain::types::{
    DecisionFilter, LedgerEntry, ModerationStatistics, RequestFilter, RequestSortField,
};
use crate::error::AccountsServiceError;
use crate::handlers::JsonBody;
use crate::handlers::account::AccountResponse;
use crate::handlers::provenance_from_headers;
use crate::state::AppState;
use crate::usecase::moderation::{
    ActivateAccountUseCase, ApproveRequestUseCase, ChangeRoleUseCase, DeleteAccountUseCase,
    ModerationContext, RejectRequestUseCase, SuspendAccountUseCase,
};
use crate::usecase::query::{
    AccountDecisionsUseCase, ListDecisionsUseCase, ListRequestsUseCase, StatisticsUseCase,
};

/// Coarse gate on the gateway-supplied role. Use cases re-check the stored role.
fn require_staff(identity: &IdentityHeaders) -> Result<(), AccountsServiceError> {
    if !identity.is_staff() {
        return Err(AccountsServiceError::Forbidden);
    }
    Ok(())
}

fn context(identity: &IdentityHeaders, headers: &HeaderMap) -> ModerationContext {
    ModerationContext {
        actor_id: identity.account_id,
        provenance: provenance_from_headers(headers),
    }
}

fn parse_query<T>(raw_query: Option<String>) -> Result<T, AccountsServiceError>
where
    T: for<'de> Deserialize<'de> + Default,
{
    raw_query
        .as_deref()
        .map(serde_qs::from_str)
        .transpose()
        .map_err(|e| AccountsServiceError::InvalidQuery(e.to_string()))
        .map(Option::unwrap_or_default)
}

// ── Response types ───────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct PageResponse<T> {
    pub items: Vec<T>,
    pub meta: PageMeta,
}

#[derive(Serialize)]
pub struct DecisionResponse {
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
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    #[serde(serialize_with = "marche_core::serde::to_rfc3339_ms")]
    pub decided_at: DateTime<Utc>,
}

impl From<LedgerEntry> for DecisionResponse {
    fn from(entry: LedgerEntry) -> Self {
        Self {
            id: entry.id,
            target_account_id: entry.target_account_id,
            target_email: entry.target_email,
            target_role: entry.target_role,
            actor_account_id: entry.actor_account_id,
            actor_email: entry.actor_email,
            kind: entry.kind,
            status_before: entry.status_before,
            status_after: entry.status_after,
            reason: entry.reason,
            details: entry.details,
            ip_address: entry.provenance.ip_address,
            user_agent: entry.provenance.user_agent,
            decided_at: entry.decided_at,
        }
    }
}

#[derive(Serialize)]
pub struct RoleCount {
    pub role: AccountRole,
    pub count: u64,
}

#[derive(Serialize)]
pub struct MonthlyCountResponse {
    pub month: String,
    pub role: AccountRole,
    pub count: u64,
}

#[derive(Serialize)]
pub struct StatisticsResponse {
    pub total_pending: u64,
    pub pending_by_role: Vec<RoleCount>,
    pub monthly_trend: Vec<MonthlyCountResponse>,
    pub recent_decisions: Vec<DecisionResponse>,
    pub live_admin_connections: usize,
}

impl From<ModerationStatistics> for StatisticsResponse {
    fn from(stats: ModerationStatistics) -> Self {
        Self {
            total_pending: stats.total_pending,
            pending_by_role: stats
                .pending_by_role
                .into_iter()
                .map(|(role, count)| RoleCount { role, count })
                .collect(),
            monthly_trend: stats
                .monthly_trend
                .into_iter()
                .map(|c| MonthlyCountResponse {
                    month: c.month,
                    role: c.role,
                    count: c.count,
                })
                .collect(),
            recent_decisions: stats
                .recent_decisions
                .into_iter()
                .map(DecisionResponse::from)
                .collect(),
            live_admin_connections: stats.live_admin_connections,
        }
    }
}

// ── GET /moderation/requests ─────────────────────────────────────────────────

#[derive(Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub struct RequestListQuery {
    pub per_page: Option<u32>,
    pub page: Option<u32>,
    pub role: Option<String>,
    pub status: Option<String>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
    pub search: Option<String>,
    pub sort_field: Option<String>,
    pub sort_order: Option<Sort>,
}

impl TryFrom<RequestListQuery> for RequestFilter {
    type Error = AccountsServiceError;

    fn try_from(query: RequestListQuery) -> Result<Self, Self::Error> {
        let role = query
            .role
            .as_deref()
            .map(|r| {
                r.parse::<AccountRole>()
                    .ok()
                    .filter(|role| role.is_restricted())
                    .ok_or_else(|| AccountsServiceError::InvalidQuery(format!("role: {r}")))
            })
            .transpose()?;
        let status = query
            .status
            .as_deref()
            .map(|s| {
                s.parse::<VerificationStatus>()
                    .map_err(|_| AccountsServiceError::InvalidQuery(format!("status: {s}")))
            })
            .transpose()?
            .unwrap_or(VerificationStatus::Pending);
        let sort_field = query
            .sort_field
            .as_deref()
            .map(|s| {
                RequestSortField::from_kebab(s)
                    .ok_or_else(|| AccountsServiceError::InvalidQuery(format!("sort-field: {s}")))
            })
            .transpose()?
            .unwrap_or_default();
        Ok(Self {
            role,
            status,
            created_from: query.date_from,
            created_to: query.date_to,
            search: query.search,
            sort_field,
            sort: query.sort_order.unwrap_or_default(),
            page: PageRequest {
                per_page: query.per_page.unwrap_or(25),
                page: query.page.unwrap_or(1),
            },
        })
    }
}

pub async fn list_requests(
    identity: IdentityHeaders,
    State(state): State<AppState>,
    RawQuery(raw_query): RawQuery,
) -> Result<Json<PageResponse<AccountResponse>>, AccountsServiceError> {
    require_staff(&identity)?;
    let query: RequestListQuery = parse_query(raw_query)?;
    let usecase = ListRequestsUseCase {
        accounts: state.account_repo(),
    };
    let page = usecase.execute(query.try_into()?).await?;
    Ok(Json(PageResponse {
        items: page.items.into_iter().map(AccountResponse::from).collect(),
        meta: page.meta,
    }))
}

// ── POST /moderation/requests/{id}/approve ───────────────────────────────────

pub async fn approve_request(
    identity: IdentityHeaders,
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(account_id): Path<Uuid>,
) -> Result<Json<AccountResponse>, AccountsServiceError> {
    require_staff(&identity)?;
    let usecase = ApproveRequestUseCase {
        accounts: state.account_repo(),
        decisions: state.decision_store(),
        notifier: state.notifier.clone(),
    };
    let account = usecase
        .execute(account_id, context(&identity, &headers))
        .await?;
    Ok(Json(account.into()))
}

// ── POST /moderation/requests/{id}/reject ────────────────────────────────────

#[derive(Deserialize)]
pub struct ReasonRequest {
    pub reason: Option<String>,
}

/// The decision reason; a request without a JSON body carries none.
fn reason_from(body: JsonBody<ReasonRequest>) -> Result<String, AccountsServiceError> {
    match body {
        Ok(Json(body)) => Ok(body.reason.unwrap_or_default()),
        Err(JsonRejection::MissingJsonContentType(_)) => Ok(String::new()),
        Err(rejection) => Err(rejection.into()),
    }
}

pub async fn reject_request(
    identity: IdentityHeaders,
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(account_id): Path<Uuid>,
    body: JsonBody<ReasonRequest>,
) -> Result<Json<AccountResponse>, AccountsServiceError> {
    require_staff(&identity)?;
    let reason = reason_from(body)?;
    let usecase = RejectRequestUseCase {
        accounts: state.account_repo(),
        decisions: state.decision_store(),
        notifier: state.notifier.clone(),
    };
    let account = usecase
        .execute(
            account_id,
            &reason,
            context(&identity, &headers),
        )
        .await?;
    Ok(Json(account.into()))
}

// ── POST /moderation/accounts/{id}/suspend ───────────────────────────────────

pub async fn suspend_account(
    identity: IdentityHeaders,
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(account_id): Path<Uuid>,
    body: JsonBody<ReasonRequest>,
) -> Result<Json<AccountResponse>, AccountsServiceError> {
    require_staff(&identity)?;
    let reason = reason_from(body)?;
    let usecase = SuspendAccountUseCase {
        accounts: state.account_repo(),
        decisions: state.decision_store(),
        notifier: state.notifier.clone(),
    };
    let account = usecase
        .execute(
            account_id,
            &reason,
            context(&identity, &headers),
        )
        .await?;
    Ok(Json(account.into()))
}

// ── POST /moderation/accounts/{id}/activate ──────────────────────────────────

pub async fn activate_account(
    identity: IdentityHeaders,
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(account_id): Path<Uuid>,
) -> Result<Json<AccountResponse>, AccountsServiceError> {
    require_staff(&identity)?;
    let usecase = ActivateAccountUseCase {
        accounts: state.account_repo(),
        decisions: state.decision_store(),
        notifier: state.notifier.clone(),
    };
    let account = usecase
        .execute(account_id, context(&identity, &headers))
        .await?;
    Ok(Json(account.into()))
}

// ── PATCH /moderation/accounts/{id}/role ─────────────────────────────────────

#[derive(Deserialize)]
pub struct ChangeRoleRequest {
    pub role: String,
}

pub async fn change_role(
    identity: IdentityHeaders,
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(account_id): Path<Uuid>,
    body: JsonBody<ChangeRoleRequest>,
) -> Result<Json<AccountResponse>, AccountsServiceError> {
    if !identity.is_admin() {
        return Err(AccountsServiceError::Forbidden);
    }
    let Json(body) = body?;
    let role = body
        .role
        .parse::<AccountRole>()
        .map_err(|_| AccountsServiceError::UnknownRole(body.role.clone()))?;
    let usecase = ChangeRoleUseCase {
        accounts: state.account_repo(),
    };
    let account = usecase
        .execute(account_id, role, context(&identity, &headers))
        .await?;
    Ok(Json(account.into()))
}

// ── DELETE /moderation/accounts/{id} ─────────────────────────────────────────

pub async fn delete_account(
    identity: IdentityHeaders,
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(account_id): Path<Uuid>,
) -> Result<StatusCode, AccountsServiceError> {
    if !identity.is_admin() {
        return Err(AccountsServiceError::Forbidden);
    }
    let usecase = DeleteAccountUseCase {
        accounts: state.account_repo(),
    };
    usecase
        .execute(account_id, context(&identity, &headers))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// ── GET /moderation/accounts/{id}/decisions ──────────────────────────────────

pub async fn account_decisions(
    identity: IdentityHeaders,
    State(state): State<AppState>,
    Path(account_id): Path<Uuid>,
) -> Result<Json<Vec<DecisionResponse>>, AccountsServiceError> {
    require_staff(&identity)?;
    let usecase = AccountDecisionsUseCase {
        accounts: state.account_repo(),
        ledger: state.ledger_repo(),
    };
    let entries = usecase.execute(account_id).await?;
    Ok(Json(entries.into_iter().map(DecisionResponse::from).collect()))
}

// ── GET /moderation/decisions ────────────────────────────────────────────────

#[derive(Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub struct DecisionListQuery {
    pub per_page: Option<u32>,
    pub page: Option<u32>,
    #[serde(default)]
    pub kinds: Vec<String>,
    pub actor: Option<Uuid>,
    pub target: Option<Uuid>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
}

impl TryFrom<DecisionListQuery> for DecisionFilter {
    type Error = AccountsServiceError;

    fn try_from(query: DecisionListQuery) -> Result<Self, Self::Error> {
        let kinds = query
            .kinds
            .iter()
            .map(|k| {
                k.parse::<DecisionKind>()
                    .map_err(|_| AccountsServiceError::InvalidQuery(format!("kinds: {k}")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            kinds,
            actor_id: query.actor,
            target_id: query.target,
            decided_from: query.date_from,
            decided_to: query.date_to,
            page: PageRequest {
                per_page: query.per_page.unwrap_or(25),
                page: query.page.unwrap_or(1),
            },
        })
    }
}

pub async fn list_decisions(
    identity: IdentityHeaders,
    State(state): State<AppState>,
    RawQuery(raw_query): RawQuery,
) -> Result<Json<PageResponse<DecisionResponse>>, AccountsServiceError> {
    require_staff(&identity)?;
    let query: DecisionListQuery = parse_query(raw_query)?;
    let usecase = ListDecisionsUseCase {
        ledger: state.ledger_repo(),
    };
    let page = usecase.execute(query.try_into()?).await?;
    Ok(Json(PageResponse {
        items: page.items.into_iter().map(DecisionResponse::from).collect(),
        meta: page.meta,
    }))
}

// ── GET /moderation/statistics ───────────────────────────────────────────────

pub async fn statistics(
    identity: IdentityHeaders,
    State(state): State<AppState>,
) -> Result<Json<StatisticsResponse>, AccountsServiceError> {
    require_staff(&identity)?;
    let usecase = StatisticsUseCase {
        accounts: state.account_repo(),
        ledger: state.ledger_repo(),
        presence: state.admin_registry.clone(),
    };
    let stats = usecase.execute().await?;
    Ok(Json(stats.into()))
}

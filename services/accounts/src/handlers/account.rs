use axum::{Json, extract::State, http::StatusCode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use marche_auth_types::identity::IdentityHeaders;
use marche_domain::account::{AccountRole, Gender, VerificationStatus};

use crate::domain::types::Account;
use crate::error::AccountsServiceError;
use crate::handlers::JsonBody;
use crate::state::AppState;
use crate::usecase::account::{
    ChangePasswordUseCase, GetAccountUseCase, UpdateProfileInput, UpdateProfileUseCase,
};

// ── Response types ───────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct ShopResponse {
    pub name: Option<String>,
    pub description: Option<String>,
    pub site: Option<String>,
}

/// Public projection of an account. Credentials and one-time tokens never
/// leave the service.
#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub id: Uuid,
    pub name: String,
    pub surname: String,
    pub email: String,
    pub phone: Option<String>,
    pub gender: Gender,
    pub role: AccountRole,
    pub verification_status: VerificationStatus,
    #[serde(serialize_with = "marche_core::serde::to_rfc3339_ms_opt")]
    pub verified_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shop: Option<ShopResponse>,
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suspension_reason: Option<String>,
    pub email_confirmed: bool,
    #[serde(serialize_with = "marche_core::serde::to_rfc3339_ms")]
    pub created_at: DateTime<Utc>,
    #[serde(serialize_with = "marche_core::serde::to_rfc3339_ms")]
    pub updated_at: DateTime<Utc>,
}

impl From<Account> for AccountResponse {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            name: account.name,
            surname: account.surname,
            email: account.email,
            phone: account.phone,
            gender: account.gender,
            role: account.role,
            verification_status: account.verification_status,
            verified_at: account.verified_at,
            rejection_reason: account.rejection_reason,
            shop: account.shop.map(|s| ShopResponse {
                name: s.name,
                description: s.description,
                site: s.site,
            }),
            active: account.active,
            suspension_reason: account.suspension_reason,
            email_confirmed: account.email_confirmed,
            created_at: account.created_at,
            updated_at: account.updated_at,
        }
    }
}

// ── GET /accounts/@me ────────────────────────────────────────────────────────

pub async fn get_me(
    identity: IdentityHeaders,
    State(state): State<AppState>,
) -> Result<Json<AccountResponse>, AccountsServiceError> {
    let usecase = GetAccountUseCase {
        accounts: state.account_repo(),
    };
    let account = usecase.execute(identity.account_id).await?;
    Ok(Json(account.into()))
}

// ── PATCH /accounts/@me ──────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct UpdateMeRequest {
    pub name: Option<String>,
    pub surname: Option<String>,
    pub phone: Option<String>,
    #[serde(alias = "shopName")]
    pub shop_name: Option<String>,
    #[serde(alias = "shopDescription")]
    pub shop_description: Option<String>,
    #[serde(alias = "shopSite")]
    pub shop_site: Option<String>,
}

pub async fn update_me(
    identity: IdentityHeaders,
    State(state): State<AppState>,
    body: JsonBody<UpdateMeRequest>,
) -> Result<Json<AccountResponse>, AccountsServiceError> {
    let Json(body) = body?;
    let usecase = UpdateProfileUseCase {
        accounts: state.account_repo(),
    };
    let account = usecase
        .execute(
            identity.account_id,
            UpdateProfileInput {
                name: body.name,
                surname: body.surname,
                phone: body.phone,
                shop_name: body.shop_name,
                shop_description: body.shop_description,
                shop_site: body.shop_site,
            },
        )
        .await?;
    Ok(Json(account.into()))
}

// ── PUT /accounts/@me/password ───────────────────────────────────────────────

#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    #[serde(alias = "currentPassword")]
    pub current_password: String,
    #[serde(alias = "newPassword")]
    pub new_password: String,
}

pub async fn change_password(
    identity: IdentityHeaders,
    State(state): State<AppState>,
    body: JsonBody<ChangePasswordRequest>,
) -> Result<StatusCode, AccountsServiceError> {
    let Json(body) = body?;
    let usecase = ChangePasswordUseCase {
        accounts: state.account_repo(),
    };
    usecase
        .execute(identity.account_id, &body.current_password, &body.new_password)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

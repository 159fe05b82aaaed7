use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use axum_extra::extract::CookieJar;
use serde::{Deserialize, Serialize};

use marche_auth_types::cookie::set_session_cookie;

use crate::error::AccountsServiceError;
use crate::handlers::JsonBody;
use crate::handlers::account::AccountResponse;
use crate::state::AppState;
use crate::usecase::account::ConfirmEmailUseCase;
use crate::usecase::registration::{RegisterInput, RegisterUseCase};

// ── POST /accounts ───────────────────────────────────────────────────────────

/// Registration payload. Field presence is validated per role by the use
/// case, so everything is optional here.
#[derive(Deserialize)]
pub struct RegisterRequest {
    pub role: Option<String>,
    pub name: Option<String>,
    pub surname: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub phone: Option<String>,
    pub gender: Option<String>,
    #[serde(alias = "invitationCode")]
    pub invitation_code: Option<String>,
    #[serde(alias = "shopName")]
    pub shop_name: Option<String>,
    #[serde(alias = "shopDescription")]
    pub shop_description: Option<String>,
    #[serde(alias = "shopSite")]
    pub shop_site: Option<String>,
}

#[derive(Serialize)]
pub struct RegisterResponse {
    pub account: AccountResponse,
    pub session_token: String,
    pub session_token_exp: u64,
}

pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    body: JsonBody<RegisterRequest>,
) -> Result<impl IntoResponse, AccountsServiceError> {
    let Json(body) = body?;
    let usecase = RegisterUseCase {
        accounts: state.account_repo(),
        notifier: state.notifier.clone(),
        invitations: state.invitations.clone(),
        jwt_secret: state.jwt_secret.clone(),
    };
    let out = usecase
        .execute(RegisterInput {
            role: body.role,
            name: body.name,
            surname: body.surname,
            email: body.email,
            password: body.password,
            phone: body.phone,
            gender: body.gender,
            invitation_code: body.invitation_code,
            shop_name: body.shop_name,
            shop_description: body.shop_description,
            shop_site: body.shop_site,
        })
        .await?;

    let jar = set_session_cookie(jar, out.session.token.clone(), state.cookie_domain.clone());
    let body = RegisterResponse {
        account: out.account.into(),
        session_token: out.session.token,
        session_token_exp: out.session.exp,
    };
    Ok((StatusCode::CREATED, jar, Json(body)))
}

// ── POST /accounts/email-confirmation ────────────────────────────────────────

#[derive(Deserialize)]
pub struct ConfirmEmailRequest {
    pub token: String,
}

pub async fn confirm_email(
    State(state): State<AppState>,
    body: JsonBody<ConfirmEmailRequest>,
) -> Result<StatusCode, AccountsServiceError> {
    let Json(body) = body?;
    let usecase = ConfirmEmailUseCase {
        accounts: state.account_repo(),
    };
    usecase.execute(&body.token).await?;
    Ok(StatusCode::NO_CONTENT)
}

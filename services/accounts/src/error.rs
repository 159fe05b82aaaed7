use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::domain::phone::PhoneError;
use crate::domain::policy::InvitationRejection;

/// Accounts service error variants.
///
/// Every variant belongs to one [`ErrorCategory`], which fixes its HTTP status.
#[derive(Debug, thiserror::Error)]
pub enum AccountsServiceError {
    #[error("unknown role: {0}")]
    UnknownRole(String),
    #[error("missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),
    #[error("invalid invitation code")]
    InvalidInvitation(InvitationRejection),
    #[error("invalid phone number")]
    InvalidPhone(PhoneError),
    #[error("invalid gender: {0}")]
    InvalidGender(String),
    #[error("invalid email address")]
    InvalidEmail(String),
    #[error("password must be at least {min} characters")]
    WeakPassword { min: usize },
    #[error("a reason is required for this decision")]
    MissingReason,
    #[error("shop profile is only available to vendors")]
    ShopProfileNotAllowed,
    #[error("current password does not match")]
    InvalidCredential,
    #[error("invalid or expired verification token")]
    InvalidVerificationToken,
    #[error("invalid query: {0}")]
    InvalidQuery(String),
    #[error("invalid request body: {0}")]
    InvalidBody(String),
    #[error("email already registered")]
    EmailTaken,
    #[error("account was already processed")]
    AlreadyProcessed,
    #[error("account not found")]
    AccountNotFound,
    #[error("cannot perform this action on your own account")]
    SelfActionForbidden,
    #[error("forbidden")]
    Forbidden,
    #[error("upstream failure")]
    Upstream(#[from] anyhow::Error),
}

/// Coarse error classification shared by all variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Validation,
    Conflict,
    NotFound,
    Forbidden,
    Upstream,
}

impl ErrorCategory {
    pub fn status(self) -> StatusCode {
        match self {
            Self::Validation => StatusCode::BAD_REQUEST,
            Self::Conflict => StatusCode::CONFLICT,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::Upstream => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// One entry of the per-field breakdown attached to validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl AccountsServiceError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnknownRole(_) => "UNKNOWN_ROLE",
            Self::MissingFields(_) => "MISSING_FIELDS",
            Self::InvalidInvitation(_) => "INVALID_INVITATION",
            Self::InvalidPhone(PhoneError::UnsupportedCountryCode { .. }) => {
                "UNSUPPORTED_COUNTRY_CODE"
            }
            Self::InvalidPhone(_) => "INVALID_PHONE",
            Self::InvalidGender(_) => "INVALID_GENDER",
            Self::InvalidEmail(_) => "INVALID_EMAIL",
            Self::WeakPassword { .. } => "WEAK_PASSWORD",
            Self::MissingReason => "MISSING_REASON",
            Self::ShopProfileNotAllowed => "SHOP_PROFILE_NOT_ALLOWED",
            Self::InvalidCredential => "INVALID_CREDENTIAL",
            Self::InvalidVerificationToken => "INVALID_VERIFICATION_TOKEN",
            Self::InvalidQuery(_) => "INVALID_QUERY",
            Self::InvalidBody(_) => "INVALID_BODY",
            Self::EmailTaken => "EMAIL_TAKEN",
            Self::AlreadyProcessed => "ALREADY_PROCESSED",
            Self::AccountNotFound => "ACCOUNT_NOT_FOUND",
            Self::SelfActionForbidden => "SELF_ACTION_FORBIDDEN",
            Self::Forbidden => "FORBIDDEN",
            Self::Upstream(_) => "UPSTREAM",
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::UnknownRole(_)
            | Self::MissingFields(_)
            | Self::InvalidInvitation(_)
            | Self::InvalidPhone(_)
            | Self::InvalidGender(_)
            | Self::InvalidEmail(_)
            | Self::WeakPassword { .. }
            | Self::MissingReason
            | Self::ShopProfileNotAllowed
            | Self::InvalidCredential
            | Self::InvalidVerificationToken
            | Self::InvalidQuery(_)
            | Self::InvalidBody(_) => ErrorCategory::Validation,
            Self::EmailTaken | Self::AlreadyProcessed => ErrorCategory::Conflict,
            Self::AccountNotFound => ErrorCategory::NotFound,
            Self::SelfActionForbidden | Self::Forbidden => ErrorCategory::Forbidden,
            Self::Upstream(_) => ErrorCategory::Upstream,
        }
    }

    /// Per-field breakdown for validation failures. Empty for every other variant.
    pub fn field_errors(&self) -> Vec<FieldError> {
        match self {
            Self::UnknownRole(value) => vec![FieldError {
                field: "role",
                message: "is not a known role".to_owned(),
                value: Some(value.clone()),
            }],
            Self::MissingFields(fields) => fields
                .iter()
                .map(|&field| FieldError {
                    field,
                    message: "is required".to_owned(),
                    value: None,
                })
                .collect(),
            // The expected code is a secret; never echo what was sent.
            Self::InvalidInvitation(rejection) => vec![FieldError {
                field: "invitation_code",
                message: rejection.to_string(),
                value: None,
            }],
            Self::InvalidPhone(err) => vec![FieldError {
                field: "phone",
                message: err.to_string(),
                value: err.value().map(str::to_owned),
            }],
            Self::InvalidGender(value) => vec![FieldError {
                field: "gender",
                message: "must be one of: male, female".to_owned(),
                value: Some(value.clone()),
            }],
            Self::InvalidEmail(value) => vec![FieldError {
                field: "email",
                message: "is not a valid email address".to_owned(),
                value: Some(value.clone()),
            }],
            Self::WeakPassword { min } => vec![FieldError {
                field: "password",
                message: format!("must be at least {min} characters"),
                value: None,
            }],
            Self::MissingReason => vec![FieldError {
                field: "reason",
                message: "is required".to_owned(),
                value: None,
            }],
            _ => Vec::new(),
        }
    }
}

impl From<JsonRejection> for AccountsServiceError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidBody(rejection.body_text())
    }
}

impl IntoResponse for AccountsServiceError {
    fn into_response(self) -> Response {
        let category = self.category();
        if let Self::Upstream(ref e) = self {
            tracing::error!(error = %e, kind = "UPSTREAM", "upstream failure");
        }
        let mut body = serde_json::json!({
            "kind": self.kind(),
            "category": category,
            "message": self.to_string(),
        });
        let errors = self.field_errors();
        if !errors.is_empty() {
            body["errors"] = serde_json::json!(errors);
        }
        (category.status(), axum::Json(body)).into_response()
    }
}

use std::sync::{Arc, LazyLock};

use anyhow::anyhow;
use chrono::{Duration, Utc};
use regex::Regex;
use tracing::info;
use uuid::Uuid;

use marche_auth_types::token::{IssuedToken, issue_session_token};
use marche_domain::account::{AccountRole, Gender, VerificationStatus};

use crate::domain::phone::validate_phone;
use crate::domain::policy::{InvitationRejection, InvitationTable, RegistrationField, RolePolicy};
use crate::domain::repository::{AccountRepository, NotificationSink};
use crate::domain::types::{Account, ExpiringToken, ShopProfile, WorkflowEvent};
use crate::error::AccountsServiceError;
use crate::usecase::credential::{check_password_strength, generate_token, hash_password_off_thread};

/// Lifetime of the email-confirmation token handed to new clients.
pub const EMAIL_VERIFICATION_TTL_HOURS: i64 = 24;

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("static email pattern"));

/// Raw registration payload. Every field is optional at this point; which
/// ones must be present depends on the requested role.
#[derive(Debug, Clone, Default)]
pub struct RegisterInput {
    pub role: Option<String>,
    pub name: Option<String>,
    pub surname: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub phone: Option<String>,
    pub gender: Option<String>,
    pub invitation_code: Option<String>,
    pub shop_name: Option<String>,
    pub shop_description: Option<String>,
    pub shop_site: Option<String>,
}

impl RegisterInput {
    /// The trimmed value of `field`, or `None` when absent or blank.
    fn value(&self, field: RegistrationField) -> Option<&str> {
        let raw = match field {
            RegistrationField::Name => &self.name,
            RegistrationField::Surname => &self.surname,
            RegistrationField::Email => &self.email,
            RegistrationField::Password => &self.password,
            RegistrationField::Phone => &self.phone,
            RegistrationField::Gender => &self.gender,
            RegistrationField::ShopName => &self.shop_name,
            RegistrationField::ShopDescription => &self.shop_description,
            RegistrationField::ShopSite => &self.shop_site,
        };
        raw.as_deref().map(str::trim).filter(|v| !v.is_empty())
    }

    fn owned(&self, field: RegistrationField) -> Option<String> {
        self.value(field).map(str::to_owned)
    }
}

#[derive(Debug)]
pub struct RegisterOutput {
    pub account: Account,
    pub session: IssuedToken,
}

pub struct RegisterUseCase<A, N>
where
    A: AccountRepository,
    N: NotificationSink,
{
    pub accounts: A,
    pub notifier: N,
    pub invitations: Arc<InvitationTable>,
    pub jwt_secret: String,
}

impl<A, N> RegisterUseCase<A, N>
where
    A: AccountRepository,
    N: NotificationSink,
{
    /// Gates run in a fixed order and the first failure wins.
    pub async fn execute(&self, input: RegisterInput) -> Result<RegisterOutput, AccountsServiceError> {
        let now = Utc::now();

        // 1. role
        let policy = match input.role.as_deref().map(str::trim).filter(|r| !r.is_empty()) {
            Some(identifier) => {
                RolePolicy::resolve(identifier).map_err(AccountsServiceError::UnknownRole)?
            }
            None => RolePolicy::for_role(AccountRole::Client),
        };
        let role = policy.role();
        let requirements = policy.requirements();

        // 2. required fields
        let missing: Vec<&'static str> = requirements
            .required
            .iter()
            .filter(|field| input.value(**field).is_none())
            .map(|field| field.as_str())
            .collect();
        if !missing.is_empty() {
            return Err(AccountsServiceError::MissingFields(missing));
        }

        // 3. invitation
        let invitation_code = if requirements.requires_invitation {
            let code = self
                .invitations
                .check(role, input.invitation_code.as_deref(), now)
                .map_err(AccountsServiceError::InvalidInvitation)?;
            let used = self.accounts.count_by_invitation_code(role, &code.code).await?;
            if used >= code.max_uses {
                return Err(AccountsServiceError::InvalidInvitation(
                    InvitationRejection::Exhausted,
                ));
            }
            Some(code.code.clone())
        } else {
            None
        };

        // 4. phone
        let phone = match input.value(RegistrationField::Phone) {
            Some(raw) if requirements.validates_phone => Some(
                validate_phone(raw)
                    .map_err(AccountsServiceError::InvalidPhone)?
                    .e164,
            ),
            Some(raw) => Some(raw.to_owned()),
            None => None,
        };

        // 5. gender
        let gender_raw = input.value(RegistrationField::Gender).unwrap_or_default();
        let gender: Gender = gender_raw
            .parse()
            .map_err(|_| AccountsServiceError::InvalidGender(gender_raw.to_owned()))?;

        let email = input
            .value(RegistrationField::Email)
            .unwrap_or_default()
            .to_lowercase();
        if !EMAIL.is_match(&email) {
            return Err(AccountsServiceError::InvalidEmail(email));
        }
        let password = input.password.as_deref().unwrap_or_default();
        check_password_strength(password)?;

        // 6. uniqueness; the storage unique index settles races
        if self.accounts.find_by_email(&email).await?.is_some() {
            return Err(AccountsServiceError::EmailTaken);
        }

        // 7. credential
        let password_hash = hash_password_off_thread(password).await?;

        // 8. record
        let status = policy.initial_status();
        let email_verification = (status == VerificationStatus::Verified).then(|| ExpiringToken {
            token: generate_token(),
            expires_at: now + Duration::hours(EMAIL_VERIFICATION_TTL_HOURS),
        });
        let shop = policy.accepts_shop_profile().then(|| ShopProfile {
            name: input.owned(RegistrationField::ShopName),
            description: input.owned(RegistrationField::ShopDescription),
            site: input.owned(RegistrationField::ShopSite),
        });
        let account = Account {
            id: Uuid::now_v7(),
            name: input.owned(RegistrationField::Name).unwrap_or_default(),
            surname: input.owned(RegistrationField::Surname).unwrap_or_default(),
            email,
            password_hash,
            phone,
            gender,
            role,
            verification_status: status,
            verified_at: (status == VerificationStatus::Verified).then_some(now),
            rejection_reason: None,
            shop,
            active: true,
            suspension_reason: None,
            suspended_at: None,
            email_confirmed: false,
            email_verification,
            password_reset: None,
            invitation_code,
            created_at: now,
            updated_at: now,
        };
        self.accounts.create(&account).await?;

        info!(
            account_id = %account.id,
            role = role.as_str(),
            status = status.as_str(),
            "account registered"
        );

        // 9. notifications
        if status == VerificationStatus::Pending {
            self.notifier.dispatch(WorkflowEvent::RequestSubmitted {
                account: account.summary(),
                alert_admins_by_email: policy.alerts_admins_by_email(),
            });
        }
        self.notifier.dispatch(WorkflowEvent::Registered {
            account: account.summary(),
            status,
            email_verification_token: account.email_verification.as_ref().map(|t| t.token.clone()),
        });

        // 10. session
        let session = issue_session_token(account.id, role, &self.jwt_secret)
            .map_err(|e| anyhow!("failed to issue session token: {e}"))?;

        Ok(RegisterOutput { account, session })
    }
}

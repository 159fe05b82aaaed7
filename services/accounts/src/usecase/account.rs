use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::domain::phone::validate_phone;
use crate::domain::repository::AccountRepository;
use crate::domain::types::{Account, ShopProfile};
use crate::error::AccountsServiceError;
use crate::usecase::credential::{
    check_password_strength, hash_password_off_thread, verify_password_off_thread,
};

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

// ── GetAccount ───────────────────────────────────────────────────────────────

pub struct GetAccountUseCase<A: AccountRepository> {
    pub accounts: A,
}

impl<A: AccountRepository> GetAccountUseCase<A> {
    pub async fn execute(&self, account_id: Uuid) -> Result<Account, AccountsServiceError> {
        self.accounts
            .find_by_id(account_id)
            .await?
            .ok_or(AccountsServiceError::AccountNotFound)
    }
}

// ── UpdateProfile ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct UpdateProfileInput {
    pub name: Option<String>,
    pub surname: Option<String>,
    pub phone: Option<String>,
    pub shop_name: Option<String>,
    pub shop_description: Option<String>,
    pub shop_site: Option<String>,
}

impl UpdateProfileInput {
    fn touches_shop(&self) -> bool {
        self.shop_name.is_some() || self.shop_description.is_some() || self.shop_site.is_some()
    }

    fn is_empty(&self) -> bool {
        self.name.is_none() && self.surname.is_none() && self.phone.is_none() && !self.touches_shop()
    }
}

pub struct UpdateProfileUseCase<A: AccountRepository> {
    pub accounts: A,
}

impl<A: AccountRepository> UpdateProfileUseCase<A> {
    /// Absent fields are left unchanged. An empty `phone` removes the number;
    /// empty shop fields clear that part of the shop profile.
    pub async fn execute(
        &self,
        account_id: Uuid,
        input: UpdateProfileInput,
    ) -> Result<Account, AccountsServiceError> {
        if input.is_empty() {
            return Err(AccountsServiceError::MissingFields(vec![
                "name", "surname", "phone",
            ]));
        }
        let mut account = self
            .accounts
            .find_by_id(account_id)
            .await?
            .ok_or(AccountsServiceError::AccountNotFound)?;
        if input.touches_shop() && account.shop.is_none() {
            return Err(AccountsServiceError::ShopProfileNotAllowed);
        }

        if let Some(name) = input.name {
            account.name = trimmed(Some(name))
                .ok_or_else(|| AccountsServiceError::MissingFields(vec!["name"]))?;
        }
        if let Some(surname) = input.surname {
            account.surname = trimmed(Some(surname))
                .ok_or_else(|| AccountsServiceError::MissingFields(vec!["surname"]))?;
        }
        if let Some(phone) = input.phone {
            account.phone = match trimmed(Some(phone)) {
                Some(raw) => Some(
                    validate_phone(&raw)
                        .map_err(AccountsServiceError::InvalidPhone)?
                        .e164,
                ),
                None => None,
            };
        }
        if let Some(shop) = account.shop.as_mut() {
            let ShopProfile {
                name,
                description,
                site,
            } = shop;
            if input.shop_name.is_some() {
                *name = trimmed(input.shop_name);
            }
            if input.shop_description.is_some() {
                *description = trimmed(input.shop_description);
            }
            if input.shop_site.is_some() {
                *site = trimmed(input.shop_site);
            }
        }
        account.updated_at = Utc::now();

        self.accounts
            .update_profile(
                account.id,
                &account.name,
                &account.surname,
                account.phone.as_deref(),
                account.shop.as_ref(),
            )
            .await?;
        Ok(account)
    }
}

// ── ChangePassword ───────────────────────────────────────────────────────────

pub struct ChangePasswordUseCase<A: AccountRepository> {
    pub accounts: A,
}

impl<A: AccountRepository> ChangePasswordUseCase<A> {
    pub async fn execute(
        &self,
        account_id: Uuid,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AccountsServiceError> {
        let account = self
            .accounts
            .find_by_id(account_id)
            .await?
            .ok_or(AccountsServiceError::AccountNotFound)?;
        if !verify_password_off_thread(current_password, &account.password_hash).await? {
            return Err(AccountsServiceError::InvalidCredential);
        }
        check_password_strength(new_password)?;
        let hash = hash_password_off_thread(new_password).await?;
        self.accounts.update_password_hash(account.id, &hash).await?;
        info!(account_id = %account.id, "password changed");
        Ok(())
    }
}

// ── ConfirmEmail ─────────────────────────────────────────────────────────────

pub struct ConfirmEmailUseCase<A: AccountRepository> {
    pub accounts: A,
}

impl<A: AccountRepository> ConfirmEmailUseCase<A> {
    pub async fn execute(&self, token: &str) -> Result<(), AccountsServiceError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AccountsServiceError::InvalidVerificationToken);
        }
        let account = self
            .accounts
            .find_by_email_verification_token(token)
            .await?
            .ok_or(AccountsServiceError::InvalidVerificationToken)?;
        let valid = account
            .email_verification
            .as_ref()
            .is_some_and(|t| t.token == token && t.is_valid_at(Utc::now()));
        if !valid {
            return Err(AccountsServiceError::InvalidVerificationToken);
        }
        self.accounts.confirm_email(account.id).await?;
        info!(account_id = %account.id, "email confirmed");
        Ok(())
    }
}

use chrono::{Duration, Utc};

use marche_accounts::domain::types::ExpiringToken;
use marche_accounts::error::AccountsServiceError;
use marche_accounts::usecase::account::{
    ChangePasswordUseCase, ConfirmEmailUseCase, GetAccountUseCase, UpdateProfileInput,
    UpdateProfileUseCase,
};
use marche_accounts::usecase::credential::verify_password;
use marche_domain::account::AccountRole;

use crate::helpers::{InMemoryStore, TEST_PASSWORD, client, pending};

// ── GetAccount ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn should_get_own_account() {
    let account = client();
    let store = InMemoryStore::new(vec![account.clone()]);

    let found = GetAccountUseCase {
        accounts: store.clone(),
    }
    .execute(account.id)
    .await
    .unwrap();

    assert_eq!(found.email, account.email);
}

#[tokio::test]
async fn should_return_not_found_for_deleted_account() {
    let store = InMemoryStore::default();

    let result = GetAccountUseCase {
        accounts: store.clone(),
    }
    .execute(uuid::Uuid::now_v7())
    .await;

    assert!(matches!(result, Err(AccountsServiceError::AccountNotFound)));
}

// ── UpdateProfile ────────────────────────────────────────────────────────────

#[tokio::test]
async fn should_update_name_and_normalize_phone() {
    let account = client();
    let store = InMemoryStore::new(vec![account.clone()]);

    let updated = UpdateProfileUseCase {
        accounts: store.clone(),
    }
    .execute(
        account.id,
        UpdateProfileInput {
            name: Some("  Mariama ".into()),
            phone: Some("+225 07 12 34 56 78".into()),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    assert_eq!(updated.name, "Mariama");
    assert_eq!(updated.surname, account.surname);
    assert_eq!(updated.phone.as_deref(), Some("+2250712345678"));

    let stored = store.account(account.id).unwrap();
    assert_eq!(stored.name, "Mariama");
    assert_eq!(stored.phone.as_deref(), Some("+2250712345678"));
}

#[tokio::test]
async fn should_clear_phone_when_empty() {
    let account = client();
    let store = InMemoryStore::new(vec![account.clone()]);

    let updated = UpdateProfileUseCase {
        accounts: store.clone(),
    }
    .execute(
        account.id,
        UpdateProfileInput {
            phone: Some(String::new()),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    assert_eq!(updated.phone, None);
}

#[tokio::test]
async fn should_reject_invalid_phone_on_update() {
    let account = client();
    let store = InMemoryStore::new(vec![account.clone()]);

    let result = UpdateProfileUseCase {
        accounts: store.clone(),
    }
    .execute(
        account.id,
        UpdateProfileInput {
            phone: Some("771234567".into()),
            ..Default::default()
        },
    )
    .await;

    assert!(
        matches!(result, Err(AccountsServiceError::InvalidPhone(_))),
        "expected InvalidPhone, got {result:?}"
    );
    assert_eq!(store.account(account.id).unwrap().phone, account.phone);
}

#[tokio::test]
async fn should_update_shop_profile_for_vendor() {
    let vendor = pending(AccountRole::Vendor);
    let store = InMemoryStore::new(vec![vendor.clone()]);

    let updated = UpdateProfileUseCase {
        accounts: store.clone(),
    }
    .execute(
        vendor.id,
        UpdateProfileInput {
            shop_name: Some("Wax & Co".into()),
            shop_description: Some("Tissus wax de Dakar".into()),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    let shop = updated.shop.unwrap();
    assert_eq!(shop.name.as_deref(), Some("Wax & Co"));
    assert_eq!(shop.description.as_deref(), Some("Tissus wax de Dakar"));
    assert_eq!(shop.site, None);
}

#[tokio::test]
async fn should_refuse_shop_profile_for_client() {
    let account = client();
    let store = InMemoryStore::new(vec![account.clone()]);

    let result = UpdateProfileUseCase {
        accounts: store.clone(),
    }
    .execute(
        account.id,
        UpdateProfileInput {
            shop_name: Some("Side business".into()),
            ..Default::default()
        },
    )
    .await;

    assert!(matches!(
        result,
        Err(AccountsServiceError::ShopProfileNotAllowed)
    ));
}

#[tokio::test]
async fn should_reject_empty_update() {
    let account = client();
    let store = InMemoryStore::new(vec![account.clone()]);

    let result = UpdateProfileUseCase {
        accounts: store.clone(),
    }
    .execute(account.id, UpdateProfileInput::default())
    .await;

    assert!(matches!(result, Err(AccountsServiceError::MissingFields(_))));
}

// ── ChangePassword ───────────────────────────────────────────────────────────

#[tokio::test]
async fn should_change_password_after_verifying_current_one() {
    let account = client();
    let store = InMemoryStore::new(vec![account.clone()]);

    ChangePasswordUseCase {
        accounts: store.clone(),
    }
    .execute(account.id, TEST_PASSWORD, "a-brand-new-secret")
    .await
    .unwrap();

    let stored = store.account(account.id).unwrap();
    assert!(verify_password("a-brand-new-secret", &stored.password_hash));
    assert!(!verify_password(TEST_PASSWORD, &stored.password_hash));
}

#[tokio::test]
async fn should_reject_wrong_current_password() {
    let account = client();
    let store = InMemoryStore::new(vec![account.clone()]);

    let result = ChangePasswordUseCase {
        accounts: store.clone(),
    }
    .execute(account.id, "not-my-password", "a-brand-new-secret")
    .await;

    assert!(matches!(result, Err(AccountsServiceError::InvalidCredential)));
}

#[tokio::test]
async fn should_reject_weak_new_password() {
    let account = client();
    let store = InMemoryStore::new(vec![account.clone()]);

    let result = ChangePasswordUseCase {
        accounts: store.clone(),
    }
    .execute(account.id, TEST_PASSWORD, "tiny")
    .await;

    assert!(matches!(result, Err(AccountsServiceError::WeakPassword { .. })));
}

// ── ConfirmEmail ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn should_confirm_email_with_valid_token() {
    let mut account = client();
    account.email_confirmed = false;
    account.email_verification = Some(ExpiringToken {
        token: "confirm-me".into(),
        expires_at: Utc::now() + Duration::hours(1),
    });
    let store = InMemoryStore::new(vec![account.clone()]);

    ConfirmEmailUseCase {
        accounts: store.clone(),
    }
    .execute("confirm-me")
    .await
    .unwrap();

    let stored = store.account(account.id).unwrap();
    assert!(stored.email_confirmed);
    assert!(stored.email_verification.is_none());
}

#[tokio::test]
async fn should_reject_expired_confirmation_token() {
    let mut account = client();
    account.email_confirmed = false;
    account.email_verification = Some(ExpiringToken {
        token: "too-late".into(),
        expires_at: Utc::now() - Duration::minutes(1),
    });
    let store = InMemoryStore::new(vec![account.clone()]);

    let result = ConfirmEmailUseCase {
        accounts: store.clone(),
    }
    .execute("too-late")
    .await;

    assert!(matches!(
        result,
        Err(AccountsServiceError::InvalidVerificationToken)
    ));
    assert!(!store.account(account.id).unwrap().email_confirmed);
}

#[tokio::test]
async fn should_reject_unknown_confirmation_token() {
    let store = InMemoryStore::new(vec![client()]);

    let result = ConfirmEmailUseCase {
        accounts: store.clone(),
    }
    .execute("never-issued")
    .await;

    assert!(matches!(
        result,
        Err(AccountsServiceError::InvalidVerificationToken)
    ));
}

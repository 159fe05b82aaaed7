use marche_accounts::domain::phone::PhoneError;
use marche_accounts::domain::policy::{InvitationRejection, RegistrationField, RolePolicy};
use marche_accounts::domain::types::WorkflowEvent;
use marche_accounts::error::AccountsServiceError;
use marche_accounts::usecase::credential::verify_password;
use marche_accounts::usecase::registration::{RegisterInput, RegisterUseCase};
use marche_auth_types::token::validate_session_token;
use marche_domain::account::{AccountRole, Gender, VerificationStatus};

use crate::helpers::{
    ADMIN_CODE, InMemoryStore, MODERATOR_CODE, RecordingNotifier, TEST_JWT_SECRET, VENDOR_CODE,
    invitation_table,
};

fn usecase(
    store: &InMemoryStore,
    notifier: &RecordingNotifier,
) -> RegisterUseCase<InMemoryStore, RecordingNotifier> {
    RegisterUseCase {
        accounts: store.clone(),
        notifier: notifier.clone(),
        invitations: invitation_table(),
        jwt_secret: TEST_JWT_SECRET.to_owned(),
    }
}

fn client_input() -> RegisterInput {
    RegisterInput {
        role: Some("client".into()),
        name: Some("Awa".into()),
        surname: Some("Ndiaye".into()),
        email: Some("Awa.Ndiaye@Example.sn".into()),
        password: Some("s3cret-pass".into()),
        gender: Some("female".into()),
        ..Default::default()
    }
}

fn vendor_input() -> RegisterInput {
    RegisterInput {
        role: Some("vendor".into()),
        name: Some("Fatou".into()),
        surname: Some("Diop".into()),
        email: Some("fatou@example.sn".into()),
        password: Some("s3cret-pass".into()),
        phone: Some("+221 77 123 45 67".into()),
        gender: Some("female".into()),
        invitation_code: Some(VENDOR_CODE.into()),
        shop_name: Some("Boutique Fatou".into()),
        shop_site: Some("https://boutique-fatou.sn".into()),
        ..Default::default()
    }
}

fn staff_input(role: &str, code: &str, email: &str) -> RegisterInput {
    RegisterInput {
        role: Some(role.into()),
        name: Some("Moussa".into()),
        surname: Some("Ba".into()),
        email: Some(email.into()),
        password: Some("s3cret-pass".into()),
        phone: Some("0033612345678".into()),
        gender: Some("male".into()),
        invitation_code: Some(code.into()),
        ..Default::default()
    }
}

// ── Clients ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn should_register_client_as_verified_immediately() {
    let store = InMemoryStore::default();
    let notifier = RecordingNotifier::default();

    let out = usecase(&store, &notifier)
        .execute(client_input())
        .await
        .unwrap();

    assert_eq!(out.account.role, AccountRole::Client);
    assert_eq!(out.account.verification_status, VerificationStatus::Verified);
    assert!(out.account.verified_at.is_some());
    assert!(!out.account.email_confirmed);
    assert_eq!(out.account.email, "awa.ndiaye@example.sn");
    assert_eq!(out.account.gender, Gender::Female);
    assert!(out.account.shop.is_none());

    let stored = store.account(out.account.id).unwrap();
    assert_ne!(stored.password_hash, "s3cret-pass");
    assert!(verify_password("s3cret-pass", &stored.password_hash));
    assert!(stored.email_verification.is_some());

    let session = validate_session_token(&out.session.token, TEST_JWT_SECRET).unwrap();
    assert_eq!(session.account_id, out.account.id);
    assert_eq!(session.role, AccountRole::Client);
}

#[tokio::test]
async fn should_default_to_client_when_role_is_absent() {
    let store = InMemoryStore::default();
    let notifier = RecordingNotifier::default();
    let input = RegisterInput {
        role: None,
        ..client_input()
    };

    let out = usecase(&store, &notifier).execute(input).await.unwrap();
    assert_eq!(out.account.role, AccountRole::Client);
}

#[tokio::test]
async fn should_send_welcome_event_with_confirmation_token_to_clients() {
    let store = InMemoryStore::default();
    let notifier = RecordingNotifier::default();

    let out = usecase(&store, &notifier)
        .execute(client_input())
        .await
        .unwrap();

    let events = notifier.events();
    assert_eq!(events.len(), 1);
    match &events[0] {
        WorkflowEvent::Registered {
            account,
            status,
            email_verification_token,
        } => {
            assert_eq!(account.id, out.account.id);
            assert_eq!(*status, VerificationStatus::Verified);
            let stored = store.account(out.account.id).unwrap();
            assert_eq!(
                email_verification_token.as_deref(),
                stored.email_verification.as_ref().map(|t| t.token.as_str())
            );
        }
        other => panic!("expected Registered, got {other:?}"),
    }
}

// ── Validation gates ─────────────────────────────────────────────────────────

#[tokio::test]
async fn should_reject_unknown_role() {
    let store = InMemoryStore::default();
    let notifier = RecordingNotifier::default();
    let input = RegisterInput {
        role: Some("superuser".into()),
        ..client_input()
    };

    let result = usecase(&store, &notifier).execute(input).await;
    assert!(
        matches!(result, Err(AccountsServiceError::UnknownRole(ref r)) if r == "superuser"),
        "expected UnknownRole, got {result:?}"
    );
}

#[tokio::test]
async fn should_list_every_missing_field() {
    let store = InMemoryStore::default();
    let notifier = RecordingNotifier::default();
    let input = RegisterInput {
        role: Some("vendor".into()),
        name: Some("Fatou".into()),
        surname: Some("   ".into()),
        invitation_code: Some(VENDOR_CODE.into()),
        ..Default::default()
    };

    let result = usecase(&store, &notifier).execute(input).await;
    match result {
        Err(AccountsServiceError::MissingFields(fields)) => {
            assert_eq!(fields, ["surname", "email", "password", "phone", "gender"]);
        }
        other => panic!("expected MissingFields, got {other:?}"),
    }
    assert!(notifier.events().is_empty());
}

fn complete_input(role: AccountRole) -> RegisterInput {
    match role {
        AccountRole::Client => client_input(),
        AccountRole::Vendor => vendor_input(),
        AccountRole::Moderator => staff_input("moderator", MODERATOR_CODE, "moussa@example.sn"),
        AccountRole::Admin => staff_input("admin", ADMIN_CODE, "moussa@example.sn"),
    }
}

fn blank(input: &mut RegisterInput, field: RegistrationField) {
    let slot = match field {
        RegistrationField::Name => &mut input.name,
        RegistrationField::Surname => &mut input.surname,
        RegistrationField::Email => &mut input.email,
        RegistrationField::Password => &mut input.password,
        RegistrationField::Phone => &mut input.phone,
        RegistrationField::Gender => &mut input.gender,
        RegistrationField::ShopName => &mut input.shop_name,
        RegistrationField::ShopDescription => &mut input.shop_description,
        RegistrationField::ShopSite => &mut input.shop_site,
    };
    *slot = None;
}

#[tokio::test]
async fn should_name_each_missing_required_field_for_every_role() {
    for role in AccountRole::ALL {
        for &field in RolePolicy::for_role(role).requirements().required {
            let store = InMemoryStore::default();
            let notifier = RecordingNotifier::default();
            let mut input = complete_input(role);
            blank(&mut input, field);

            let result = usecase(&store, &notifier).execute(input).await;
            match result {
                Err(AccountsServiceError::MissingFields(fields)) => {
                    assert_eq!(fields, [field.as_str()], "{role:?} without {field:?}");
                }
                other => panic!("{role:?} without {field:?}: expected MissingFields, got {other:?}"),
            }
            assert!(store.accounts.lock().unwrap().is_empty());
        }
    }
}

#[tokio::test]
async fn should_require_invitation_for_vendor() {
    let store = InMemoryStore::default();
    let notifier = RecordingNotifier::default();
    let input = RegisterInput {
        invitation_code: None,
        ..vendor_input()
    };

    let result = usecase(&store, &notifier).execute(input).await;
    assert!(
        matches!(
            result,
            Err(AccountsServiceError::InvalidInvitation(InvitationRejection::Missing))
        ),
        "expected Missing invitation, got {result:?}"
    );
}

#[tokio::test]
async fn should_not_accept_another_roles_invitation() {
    let store = InMemoryStore::default();
    let notifier = RecordingNotifier::default();
    let input = staff_input("admin", MODERATOR_CODE, "moussa@example.sn");

    let result = usecase(&store, &notifier).execute(input).await;
    assert!(
        matches!(
            result,
            Err(AccountsServiceError::InvalidInvitation(InvitationRejection::Mismatch))
        ),
        "expected Mismatch, got {result:?}"
    );
}

#[tokio::test]
async fn should_reject_invitation_once_usage_cap_is_reached() {
    let store = InMemoryStore::default();
    let notifier = RecordingNotifier::default();
    let uc = usecase(&store, &notifier);

    uc.execute(staff_input("admin", ADMIN_CODE, "first@example.sn"))
        .await
        .unwrap();
    let result = uc
        .execute(staff_input("admin", ADMIN_CODE, "second@example.sn"))
        .await;

    assert!(
        matches!(
            result,
            Err(AccountsServiceError::InvalidInvitation(InvitationRejection::Exhausted))
        ),
        "expected Exhausted, got {result:?}"
    );
}

#[tokio::test]
async fn should_reject_unsupported_country_code() {
    let store = InMemoryStore::default();
    let notifier = RecordingNotifier::default();
    let input = RegisterInput {
        phone: Some("+81 90 1234 5678".into()),
        ..vendor_input()
    };

    let result = usecase(&store, &notifier).execute(input).await;
    match result {
        Err(AccountsServiceError::InvalidPhone(err)) => {
            assert!(matches!(err, PhoneError::UnsupportedCountryCode { .. }));
        }
        other => panic!("expected InvalidPhone, got {other:?}"),
    }
}

#[tokio::test]
async fn should_reject_invalid_gender() {
    let store = InMemoryStore::default();
    let notifier = RecordingNotifier::default();
    let input = RegisterInput {
        gender: Some("other".into()),
        ..client_input()
    };

    let result = usecase(&store, &notifier).execute(input).await;
    assert!(
        matches!(result, Err(AccountsServiceError::InvalidGender(ref g)) if g == "other"),
        "expected InvalidGender, got {result:?}"
    );
}

#[tokio::test]
async fn should_reject_weak_password() {
    let store = InMemoryStore::default();
    let notifier = RecordingNotifier::default();
    let input = RegisterInput {
        password: Some("short".into()),
        ..client_input()
    };

    let result = usecase(&store, &notifier).execute(input).await;
    assert!(
        matches!(result, Err(AccountsServiceError::WeakPassword { min: 8 })),
        "expected WeakPassword, got {result:?}"
    );
}

#[tokio::test]
async fn should_reject_duplicate_email_case_insensitively() {
    let store = InMemoryStore::default();
    let notifier = RecordingNotifier::default();
    let uc = usecase(&store, &notifier);

    uc.execute(client_input()).await.unwrap();
    let input = RegisterInput {
        email: Some("AWA.NDIAYE@example.SN".into()),
        ..client_input()
    };
    let result = uc.execute(input).await;

    assert!(
        matches!(result, Err(AccountsServiceError::EmailTaken)),
        "expected EmailTaken, got {result:?}"
    );
    assert_eq!(store.accounts.lock().unwrap().len(), 1);
}

// ── Restricted roles ─────────────────────────────────────────────────────────

#[tokio::test]
async fn should_register_vendor_as_pending_with_shop_profile() {
    let store = InMemoryStore::default();
    let notifier = RecordingNotifier::default();

    let out = usecase(&store, &notifier)
        .execute(vendor_input())
        .await
        .unwrap();

    let account = &out.account;
    assert_eq!(account.verification_status, VerificationStatus::Pending);
    assert!(account.verified_at.is_none());
    assert_eq!(account.phone.as_deref(), Some("+221771234567"));
    assert_eq!(account.invitation_code.as_deref(), Some(VENDOR_CODE));
    assert!(account.email_verification.is_none());
    let shop = account.shop.as_ref().unwrap();
    assert_eq!(shop.name.as_deref(), Some("Boutique Fatou"));
    assert_eq!(shop.description, None);
    assert_eq!(shop.site.as_deref(), Some("https://boutique-fatou.sn"));
}

#[tokio::test]
async fn should_signal_new_request_without_admin_email_for_vendor() {
    let store = InMemoryStore::default();
    let notifier = RecordingNotifier::default();

    usecase(&store, &notifier)
        .execute(vendor_input())
        .await
        .unwrap();

    let events = notifier.events();
    assert_eq!(events.len(), 2);
    assert!(matches!(
        events[0],
        WorkflowEvent::RequestSubmitted {
            alert_admins_by_email: false,
            ..
        }
    ));
    assert!(matches!(
        events[1],
        WorkflowEvent::Registered {
            status: VerificationStatus::Pending,
            email_verification_token: None,
            ..
        }
    ));
}

#[tokio::test]
async fn should_alert_admins_by_email_for_staff_applications() {
    let store = InMemoryStore::default();
    let notifier = RecordingNotifier::default();

    let out = usecase(&store, &notifier)
        .execute(staff_input("moderator", MODERATOR_CODE, "moussa@example.sn"))
        .await
        .unwrap();

    assert_eq!(out.account.role, AccountRole::Moderator);
    assert_eq!(out.account.phone.as_deref(), Some("+33612345678"));
    assert!(out.account.shop.is_none());
    assert!(matches!(
        notifier.events()[0],
        WorkflowEvent::RequestSubmitted {
            alert_admins_by_email: true,
            ..
        }
    ));
}

#[tokio::test]
async fn should_ignore_shop_fields_for_non_vendors() {
    let store = InMemoryStore::default();
    let notifier = RecordingNotifier::default();
    let input = RegisterInput {
        shop_name: Some("Should not stick".into()),
        ..client_input()
    };

    let out = usecase(&store, &notifier).execute(input).await.unwrap();
    assert!(out.account.shop.is_none());
}

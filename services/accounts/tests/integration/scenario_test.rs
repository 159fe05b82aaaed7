use std::sync::Arc;

use marche_accounts::infra::live::{AdminConnectionRegistry, LiveEvent};
use marche_accounts::infra::notify::{NotificationQueue, run_notification_worker};
use marche_accounts::infra::templates::EmailTemplates;
use marche_accounts::domain::policy::InvitationRejection;
use marche_accounts::domain::types::RequestFilter;
use marche_accounts::error::AccountsServiceError;
use marche_accounts::usecase::moderation::ApproveRequestUseCase;
use marche_accounts::usecase::query::ListRequestsUseCase;
use marche_accounts::usecase::registration::{RegisterInput, RegisterUseCase};
use marche_domain::account::{AccountRole, DecisionKind, VerificationStatus};

use crate::helpers::{
    FailingMailer, InMemoryStore, MODERATOR_CODE, RecordingMailer, RecordingNotifier,
    TEST_JWT_SECRET, VENDOR_CODE, admin, ctx, invitation_table, moderator,
};

fn templates() -> EmailTemplates {
    EmailTemplates {
        base_url: "https://marche.sn".into(),
        admin_recipients: vec!["ops@marche.sn".into()],
    }
}

#[tokio::test]
async fn should_carry_vendor_from_registration_to_approval() {
    let moderator = moderator();
    let admin = admin();
    let store = InMemoryStore::new(vec![moderator.clone(), admin.clone()]);

    let registry = Arc::new(AdminConnectionRegistry::new());
    let (_session, mut live) = registry.join(admin.id);
    let (queue, events) = NotificationQueue::new();
    let mailer = RecordingMailer::default();
    let worker = tokio::spawn(run_notification_worker(
        events,
        mailer.clone(),
        registry.clone(),
        templates(),
    ));

    let registered = RegisterUseCase {
        accounts: store.clone(),
        notifier: queue.clone(),
        invitations: invitation_table(),
        jwt_secret: TEST_JWT_SECRET.to_owned(),
    }
    .execute(RegisterInput {
        role: Some("vendor".into()),
        name: Some("Fatou".into()),
        surname: Some("Diop".into()),
        email: Some("fatou@example.sn".into()),
        password: Some("s3cret-pass".into()),
        phone: Some("+221 77 123 45 67".into()),
        gender: Some("female".into()),
        invitation_code: Some(VENDOR_CODE.into()),
        shop_name: Some("Boutique Fatou".into()),
        ..Default::default()
    })
    .await
    .unwrap();
    let fatou = registered.account;
    assert_eq!(fatou.verification_status, VerificationStatus::Pending);

    let pending_vendors = ListRequestsUseCase {
        accounts: store.clone(),
    }
    .execute(RequestFilter {
        role: Some(AccountRole::Vendor),
        ..Default::default()
    })
    .await
    .unwrap();
    assert_eq!(pending_vendors.meta.total, 1);
    assert_eq!(pending_vendors.items[0].id, fatou.id);

    let approved = ApproveRequestUseCase {
        accounts: store.clone(),
        decisions: store.clone(),
        notifier: queue.clone(),
    }
    .execute(fatou.id, ctx(&moderator))
    .await
    .unwrap();
    assert_eq!(approved.verification_status, VerificationStatus::Verified);

    // Closing the last sender lets the worker drain and stop.
    drop(queue);
    worker.await.unwrap();

    let history = store.ledger_entries();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].kind, DecisionKind::Approval);
    assert_eq!(history[0].target_account_id, fatou.id);

    match live.try_recv().unwrap() {
        LiveEvent::NewRequest {
            account_id, role, ..
        } => {
            assert_eq!(account_id, fatou.id);
            assert_eq!(role, AccountRole::Vendor);
        }
        other => panic!("expected NewRequest, got {other:?}"),
    }
    match live.try_recv().unwrap() {
        LiveEvent::Decision {
            account_id,
            decision,
            actor_email,
            ..
        } => {
            assert_eq!(account_id, fatou.id);
            assert_eq!(decision, "approval");
            assert_eq!(actor_email, moderator.email);
        }
        other => panic!("expected Decision, got {other:?}"),
    }
    assert!(live.try_recv().is_err());

    // Vendors get a welcome and an approval email; admins are not emailed.
    let sent = mailer.sent();
    assert_eq!(sent.len(), 2);
    assert!(sent.iter().all(|m| m.to_email == "fatou@example.sn"));
    assert_eq!(sent[0].subject, "Welcome to Marché");
    assert_eq!(sent[1].subject, "Your account has been approved");
    assert!(sent[1].text.contains("Boutique Fatou"));
}

#[tokio::test]
async fn should_keep_going_when_mail_delivery_fails() {
    let admin = admin();
    let store = InMemoryStore::new(vec![admin.clone()]);

    let registry = Arc::new(AdminConnectionRegistry::new());
    let (_session, mut live) = registry.join(admin.id);
    let (queue, events) = NotificationQueue::new();
    let mailer = FailingMailer::default();
    let worker = tokio::spawn(run_notification_worker(
        events,
        mailer.clone(),
        registry.clone(),
        templates(),
    ));

    let out = RegisterUseCase {
        accounts: store.clone(),
        notifier: queue.clone(),
        invitations: invitation_table(),
        jwt_secret: TEST_JWT_SECRET.to_owned(),
    }
    .execute(RegisterInput {
        role: Some("moderator".into()),
        name: Some("Moussa".into()),
        surname: Some("Ba".into()),
        email: Some("moussa@example.sn".into()),
        password: Some("s3cret-pass".into()),
        phone: Some("+221 70 123 45 67".into()),
        gender: Some("male".into()),
        invitation_code: Some(MODERATOR_CODE.into()),
        ..Default::default()
    })
    .await;
    assert!(out.is_ok());

    drop(queue);
    worker.await.unwrap();

    // One alert to the admin list plus the applicant's welcome email.
    assert_eq!(*mailer.attempts.lock().unwrap(), 2);
    assert!(matches!(
        live.try_recv().unwrap(),
        LiveEvent::NewRequest {
            role: AccountRole::Moderator,
            ..
        }
    ));
}

#[tokio::test]
async fn should_refuse_moderator_without_invitation() {
    let store = InMemoryStore::new(vec![admin()]);
    let notifier = RecordingNotifier::default();

    let result = RegisterUseCase {
        accounts: store.clone(),
        notifier: notifier.clone(),
        invitations: invitation_table(),
        jwt_secret: TEST_JWT_SECRET.to_owned(),
    }
    .execute(RegisterInput {
        role: Some("moderator".into()),
        name: Some("Awa".into()),
        surname: Some("Ndiaye".into()),
        email: Some("awa@example.sn".into()),
        password: Some("s3cret-pass".into()),
        phone: Some("+221 76 555 44 33".into()),
        gender: Some("female".into()),
        ..Default::default()
    })
    .await;

    assert!(
        matches!(
            result,
            Err(AccountsServiceError::InvalidInvitation(InvitationRejection::Missing))
        ),
        "expected Missing invitation, got {result:?}"
    );
    assert_eq!(store.accounts.lock().unwrap().len(), 1);
    assert!(store.ledger_entries().is_empty());
    assert!(notifier.events().is_empty());
}

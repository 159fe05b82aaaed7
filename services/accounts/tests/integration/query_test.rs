use chrono::{Duration, Utc};

use marche_accounts::domain::types::{DecisionFilter, RequestFilter, RequestSortField};
use marche_accounts::error::AccountsServiceError;
use marche_accounts::usecase::moderation::{ApproveRequestUseCase, RejectRequestUseCase};
use marche_accounts::usecase::query::{
    AccountDecisionsUseCase, ListDecisionsUseCase, ListRequestsUseCase, StatisticsUseCase,
};
use marche_domain::account::{AccountRole, DecisionKind, VerificationStatus};
use marche_domain::pagination::{PageRequest, Sort};

use crate::helpers::{
    FixedPresence, InMemoryStore, RecordingNotifier, admin, client, ctx, moderator, pending,
};

fn named(role: AccountRole, name: &str, shop: Option<&str>) -> marche_accounts::domain::types::Account {
    let mut account = pending(role);
    account.name = name.into();
    if let (Some(profile), Some(shop)) = (account.shop.as_mut(), shop) {
        profile.name = Some(shop.into());
    }
    account
}

// ── ListRequests ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn should_list_only_pending_restricted_requests_by_default() {
    let vendor = pending(AccountRole::Vendor);
    let applicant = pending(AccountRole::Moderator);
    let mut approved = pending(AccountRole::Vendor);
    approved.verification_status = VerificationStatus::Verified;
    let store = InMemoryStore::new(vec![
        client(),
        vendor.clone(),
        applicant.clone(),
        approved,
    ]);

    let page = ListRequestsUseCase {
        accounts: store.clone(),
    }
    .execute(RequestFilter::default())
    .await
    .unwrap();

    assert_eq!(page.meta.total, 2);
    let ids: Vec<_> = page.items.iter().map(|a| a.id).collect();
    assert!(ids.contains(&vendor.id));
    assert!(ids.contains(&applicant.id));
}

#[tokio::test]
async fn should_filter_by_role_and_search_shop_name() {
    let store = InMemoryStore::new(vec![
        named(AccountRole::Vendor, "Fatou", Some("Boutique Teranga")),
        named(AccountRole::Vendor, "Ibrahima", Some("Sandaga Electronics")),
        named(AccountRole::Moderator, "Teranga", None),
    ]);
    let uc = ListRequestsUseCase {
        accounts: store.clone(),
    };

    let page = uc
        .execute(RequestFilter {
            role: Some(AccountRole::Vendor),
            search: Some("TERANGA".into()),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].name, "Fatou");
}

#[tokio::test]
async fn should_sort_and_paginate_requests() {
    let store = InMemoryStore::new(vec![
        named(AccountRole::Vendor, "Binta", None),
        named(AccountRole::Vendor, "Aminata", None),
        named(AccountRole::Vendor, "Cheikh", None),
    ]);
    let uc = ListRequestsUseCase {
        accounts: store.clone(),
    };

    let page = uc
        .execute(RequestFilter {
            sort_field: RequestSortField::Name,
            sort: Sort::Asc,
            page: PageRequest {
                per_page: 2,
                page: 2,
            },
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].name, "Cheikh");
    assert_eq!(page.meta.total, 3);
    assert_eq!(page.meta.total_pages, 2);
    assert!(!page.meta.has_next);
    assert!(page.meta.has_prev);
}

#[tokio::test]
async fn should_reject_inverted_date_range() {
    let store = InMemoryStore::default();
    let now = Utc::now();

    let result = ListRequestsUseCase {
        accounts: store.clone(),
    }
    .execute(RequestFilter {
        created_from: Some(now),
        created_to: Some(now - Duration::days(1)),
        ..Default::default()
    })
    .await;

    assert!(matches!(result, Err(AccountsServiceError::InvalidQuery(_))));
}

#[tokio::test]
async fn should_clamp_oversized_pages() {
    let store = InMemoryStore::new(vec![pending(AccountRole::Vendor)]);

    let page = ListRequestsUseCase {
        accounts: store.clone(),
    }
    .execute(RequestFilter {
        page: PageRequest {
            per_page: 5000,
            page: 0,
        },
        ..Default::default()
    })
    .await
    .unwrap();

    assert_eq!(page.meta.per_page, 100);
    assert_eq!(page.meta.page, 1);
    assert_eq!(page.items.len(), 1);
}

// ── Statistics ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn should_aggregate_statistics() {
    let admin = admin();
    let decided = pending(AccountRole::Vendor);
    let store = InMemoryStore::new(vec![
        admin.clone(),
        decided.clone(),
        pending(AccountRole::Vendor),
        pending(AccountRole::Vendor),
        pending(AccountRole::Admin),
        client(),
    ]);
    ApproveRequestUseCase {
        accounts: store.clone(),
        decisions: store.clone(),
        notifier: RecordingNotifier::default(),
    }
    .execute(decided.id, ctx(&admin))
    .await
    .unwrap();

    let stats = StatisticsUseCase {
        accounts: store.clone(),
        ledger: store.clone(),
        presence: FixedPresence(2),
    }
    .execute()
    .await
    .unwrap();

    assert_eq!(stats.total_pending, 3);
    assert_eq!(
        stats.pending_by_role,
        [
            (AccountRole::Vendor, 2),
            (AccountRole::Moderator, 0),
            (AccountRole::Admin, 1),
        ]
    );
    assert_eq!(stats.live_admin_connections, 2);
    assert_eq!(stats.recent_decisions.len(), 1);
    assert_eq!(stats.recent_decisions[0].target_account_id, decided.id);

    // 6 months x 3 restricted roles, zero-filled
    assert_eq!(stats.monthly_trend.len(), 18);
    let this_month = Utc::now().format("%Y-%m").to_string();
    let vendors_now = stats
        .monthly_trend
        .iter()
        .find(|c| c.month == this_month && c.role == AccountRole::Vendor)
        .unwrap();
    assert_eq!(vendors_now.count, 3);
    assert!(
        stats
            .monthly_trend
            .iter()
            .filter(|c| c.month != this_month)
            .all(|c| c.count == 0)
    );
}

// ── Decision history ─────────────────────────────────────────────────────────

#[tokio::test]
async fn should_return_account_history_newest_first() {
    let moderator = moderator();
    let vendor = pending(AccountRole::Vendor);
    let store = InMemoryStore::new(vec![moderator.clone(), vendor.clone()]);
    let notifier = RecordingNotifier::default();

    RejectRequestUseCase {
        accounts: store.clone(),
        decisions: store.clone(),
        notifier: notifier.clone(),
    }
    .execute(vendor.id, "blurry ID", ctx(&moderator))
    .await
    .unwrap();

    let history = AccountDecisionsUseCase {
        accounts: store.clone(),
        ledger: store.clone(),
    }
    .execute(vendor.id)
    .await
    .unwrap();

    assert_eq!(history.len(), 1);
    assert_eq!(history[0].kind, DecisionKind::Rejection);
}

#[tokio::test]
async fn should_return_empty_history_for_undecided_account() {
    let vendor = pending(AccountRole::Vendor);
    let store = InMemoryStore::new(vec![vendor.clone()]);

    let history = AccountDecisionsUseCase {
        accounts: store.clone(),
        ledger: store.clone(),
    }
    .execute(vendor.id)
    .await
    .unwrap();

    assert!(history.is_empty());
}

#[tokio::test]
async fn should_return_not_found_for_unknown_history() {
    let store = InMemoryStore::default();

    let result = AccountDecisionsUseCase {
        accounts: store.clone(),
        ledger: store.clone(),
    }
    .execute(uuid::Uuid::now_v7())
    .await;

    assert!(matches!(result, Err(AccountsServiceError::AccountNotFound)));
}

#[tokio::test]
async fn should_filter_decision_feed_by_kind_and_actor() {
    let moderator = moderator();
    let admin = admin();
    let first = pending(AccountRole::Vendor);
    let second = pending(AccountRole::Vendor);
    let store = InMemoryStore::new(vec![
        moderator.clone(),
        admin.clone(),
        first.clone(),
        second.clone(),
    ]);
    let notifier = RecordingNotifier::default();

    ApproveRequestUseCase {
        accounts: store.clone(),
        decisions: store.clone(),
        notifier: notifier.clone(),
    }
    .execute(first.id, ctx(&moderator))
    .await
    .unwrap();
    RejectRequestUseCase {
        accounts: store.clone(),
        decisions: store.clone(),
        notifier: notifier.clone(),
    }
    .execute(second.id, "not a real shop", ctx(&admin))
    .await
    .unwrap();

    let uc = ListDecisionsUseCase {
        ledger: store.clone(),
    };

    let rejections = uc
        .execute(DecisionFilter {
            kinds: vec![DecisionKind::Rejection],
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(rejections.meta.total, 1);
    assert_eq!(rejections.items[0].target_account_id, second.id);

    let by_moderator = uc
        .execute(DecisionFilter {
            actor_id: Some(moderator.id),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(by_moderator.meta.total, 1);
    assert_eq!(by_moderator.items[0].kind, DecisionKind::Approval);

    let everything = uc.execute(DecisionFilter::default()).await.unwrap();
    assert_eq!(everything.meta.total, 2);
}

use std::sync::Arc;

use sea_orm::Database;
use tracing::info;

use marche_accounts::config::AccountsConfig;
use marche_accounts::infra::live::AdminConnectionRegistry;
use marche_accounts::infra::mail::HttpMailer;
use marche_accounts::infra::notify::{NotificationQueue, run_notification_worker};
use marche_accounts::infra::templates::EmailTemplates;
use marche_accounts::router::build_router;
use marche_accounts::state::AppState;
use marche_core::config::Config;

#[tokio::main]
async fn main() {
    marche_core::tracing::init_tracing();

    let config = AccountsConfig::from_env();

    let db = Database::connect(&config.database_url)
        .await
        .expect("failed to connect to database");

    let admin_registry = Arc::new(AdminConnectionRegistry::new());
    let (notifier, events) = NotificationQueue::new();
    let mailer = HttpMailer::from_config(&config);
    let templates = EmailTemplates {
        base_url: config.public_base_url.clone(),
        admin_recipients: config.admin_recipients(),
    };
    tokio::spawn(run_notification_worker(
        events,
        mailer,
        admin_registry.clone(),
        templates,
    ));

    let state = AppState {
        db,
        jwt_secret: config.jwt_secret.clone(),
        cookie_domain: config.cookie_domain.clone(),
        invitations: Arc::new(config.invitation_table()),
        notifier,
        admin_registry,
    };

    let router = build_router(state);
    let addr = format!("0.0.0.0:{}", config.accounts_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind");

    info!("accounts service listening on {addr}");
    axum::serve(listener, router).await.expect("server error");
}

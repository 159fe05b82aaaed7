use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::domain::policy::InvitationTable;
use crate::infra::db::{DbAccountRepository, DbDecisionStore, DbLedgerRepository};
use crate::infra::live::AdminConnectionRegistry;
use crate::infra::notify::NotificationQueue;

/// Shared application state passed to every handler via axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub jwt_secret: String,
    pub cookie_domain: String,
    pub invitations: Arc<InvitationTable>,
    pub notifier: NotificationQueue,
    pub admin_registry: Arc<AdminConnectionRegistry>,
}

impl AppState {
    pub fn account_repo(&self) -> DbAccountRepository {
        DbAccountRepository {
            db: self.db.clone(),
        }
    }

    pub fn ledger_repo(&self) -> DbLedgerRepository {
        DbLedgerRepository {
            db: self.db.clone(),
        }
    }

    pub fn decision_store(&self) -> DbDecisionStore {
        DbDecisionStore {
            db: self.db.clone(),
        }
    }
}

//! Registry of admin sessions subscribed to live moderation updates.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

use marche_domain::account::AccountRole;

use crate::domain::repository::AdminPresence;
use crate::domain::types::{AccountSummary, WorkflowEvent};

/// Payload pushed to connected admins.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LiveEvent {
    NewRequest {
        account_id: Uuid,
        name: String,
        email: String,
        role: AccountRole,
        #[serde(serialize_with = "marche_core::serde::to_rfc3339_ms")]
        at: DateTime<Utc>,
    },
    Decision {
        account_id: Uuid,
        email: String,
        role: AccountRole,
        decision: &'static str,
        actor_email: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
        #[serde(serialize_with = "marche_core::serde::to_rfc3339_ms")]
        at: DateTime<Utc>,
    },
}

impl LiveEvent {
    fn decision(
        account: &AccountSummary,
        decision: &'static str,
        actor_email: &str,
        reason: Option<&str>,
        at: DateTime<Utc>,
    ) -> Self {
        Self::Decision {
            account_id: account.id,
            email: account.email.clone(),
            role: account.role,
            decision,
            actor_email: actor_email.to_owned(),
            reason: reason.map(str::to_owned),
            at,
        }
    }

    /// The live projection of a workflow event, if admins should see it.
    pub fn from_workflow(event: &WorkflowEvent) -> Option<Self> {
        match event {
            WorkflowEvent::Registered { .. } => None,
            WorkflowEvent::RequestSubmitted { account, .. } => Some(Self::NewRequest {
                account_id: account.id,
                name: account.display_name(),
                email: account.email.clone(),
                role: account.role,
                at: Utc::now(),
            }),
            WorkflowEvent::Approved {
                account,
                actor_email,
                decided_at,
            } => Some(Self::decision(account, "approval", actor_email, None, *decided_at)),
            WorkflowEvent::Rejected {
                account,
                actor_email,
                reason,
                decided_at,
            } => Some(Self::decision(
                account,
                "rejection",
                actor_email,
                Some(reason),
                *decided_at,
            )),
            WorkflowEvent::Suspended {
                account,
                actor_email,
                reason,
                decided_at,
            } => Some(Self::decision(
                account,
                "suspension",
                actor_email,
                Some(reason),
                *decided_at,
            )),
            WorkflowEvent::Activated {
                account,
                actor_email,
                decided_at,
            } => Some(Self::decision(account, "activation", actor_email, None, *decided_at)),
        }
    }
}

struct AdminSession {
    admin_id: Uuid,
    tx: mpsc::UnboundedSender<LiveEvent>,
}

/// Connected admin sessions, keyed by a per-connection id so one admin may
/// hold several tabs open.
#[derive(Default)]
pub struct AdminConnectionRegistry {
    sessions: Mutex<HashMap<Uuid, AdminSession>>,
}

impl AdminConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, AdminSession>> {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Register a session. Events arrive on the returned receiver until
    /// [`leave`](Self::leave) is called.
    pub fn join(&self, admin_id: Uuid) -> (Uuid, mpsc::UnboundedReceiver<LiveEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let session_id = Uuid::new_v4();
        self.lock().insert(session_id, AdminSession { admin_id, tx });
        debug!(%session_id, %admin_id, "admin joined live updates");
        (session_id, rx)
    }

    pub fn leave(&self, session_id: Uuid) {
        if let Some(session) = self.lock().remove(&session_id) {
            debug!(%session_id, admin_id = %session.admin_id, "admin left live updates");
        }
    }

    pub fn connected(&self) -> usize {
        self.lock().len()
    }

    /// Deliver `event` to every session. Sessions whose receiver is gone are
    /// pruned. Returns the number of sessions reached.
    pub fn broadcast(&self, event: &LiveEvent) -> usize {
        let mut sessions = self.lock();
        sessions.retain(|_, session| session.tx.send(event.clone()).is_ok());
        sessions.len()
    }
}

impl AdminPresence for AdminConnectionRegistry {
    fn connected_admins(&self) -> usize {
        self.connected()
    }
}

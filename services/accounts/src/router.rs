use axum::{
    Router,
    routing::{delete, get, patch, post, put},
};

use marche_core::health::{healthz, readyz};
use marche_core::middleware::{propagate_request_id_layer, request_id_layer, trace_layer};

use crate::handlers::{
    account::{change_password, get_me, update_me},
    live::live_updates,
    moderation::{
        account_decisions, activate_account, approve_request, change_role, delete_account,
        list_decisions, list_requests, reject_request, statistics, suspend_account,
    },
    registration::{confirm_email, register},
};
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // Registration
        .route("/accounts", post(register))
        .route("/accounts/email-confirmation", post(confirm_email))
        // Account holder
        .route("/accounts/@me", get(get_me).patch(update_me))
        .route("/accounts/@me/password", put(change_password))
        // Moderation queue
        .route("/moderation/requests", get(list_requests))
        .route("/moderation/requests/{id}/approve", post(approve_request))
        .route("/moderation/requests/{id}/reject", post(reject_request))
        // Account administration
        .route("/moderation/accounts/{id}", delete(delete_account))
        .route("/moderation/accounts/{id}/suspend", post(suspend_account))
        .route("/moderation/accounts/{id}/activate", post(activate_account))
        .route("/moderation/accounts/{id}/role", patch(change_role))
        .route("/moderation/accounts/{id}/decisions", get(account_decisions))
        // Ledger and dashboard
        .route("/moderation/decisions", get(list_decisions))
        .route("/moderation/statistics", get(statistics))
        .route("/moderation/live", get(live_updates))
        .layer(propagate_request_id_layer())
        .layer(trace_layer())
        .layer(request_id_layer())
        .with_state(state)
}

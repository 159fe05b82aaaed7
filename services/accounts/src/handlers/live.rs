use std::sync::Arc;

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use marche_auth_types::identity::IdentityHeaders;

use crate::error::AccountsServiceError;
use crate::infra::live::AdminConnectionRegistry;
use crate::state::AppState;

// ── GET /moderation/live ─────────────────────────────────────────────────────

pub async fn live_updates(
    identity: IdentityHeaders,
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> Result<Response, AccountsServiceError> {
    if !identity.is_admin() {
        return Err(AccountsServiceError::Forbidden);
    }
    let registry = state.admin_registry.clone();
    Ok(ws.on_upgrade(move |socket| serve_admin(socket, registry, identity.account_id)))
}

/// Forward live events to one admin until either side goes away.
async fn serve_admin(mut socket: WebSocket, registry: Arc<AdminConnectionRegistry>, admin_id: Uuid) {
    let (session_id, mut events) = registry.join(admin_id);
    info!(%admin_id, %session_id, "admin live session opened");

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                let frame = match serde_json::to_string(&event) {
                    Ok(frame) => frame,
                    Err(e) => {
                        warn!(error = %e, "failed to encode live event");
                        continue;
                    }
                };
                if socket.send(Message::Text(frame.into())).await.is_err() {
                    break;
                }
            }
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => debug!(%session_id, "ignoring inbound frame"),
            },
        }
    }

    registry.leave(session_id);
    info!(%admin_id, %session_id, "admin live session closed");
}

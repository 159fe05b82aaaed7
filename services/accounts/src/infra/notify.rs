use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::domain::repository::{Mailer, NotificationSink};
use crate::domain::types::WorkflowEvent;
use crate::infra::live::{AdminConnectionRegistry, LiveEvent};
use crate::infra::templates::EmailTemplates;

/// Sending half of the notification pipeline. Cloned into every request.
#[derive(Clone)]
pub struct NotificationQueue {
    tx: mpsc::UnboundedSender<WorkflowEvent>,
}

impl NotificationQueue {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<WorkflowEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl NotificationSink for NotificationQueue {
    fn dispatch(&self, event: WorkflowEvent) {
        if self.tx.send(event).is_err() {
            warn!("notification worker is gone; event dropped");
        }
    }
}

/// Drain the queue until every sender is dropped.
///
/// Live pushes go out first so admins are not held up by the mail provider.
/// A failed email is logged and never retried.
pub async fn run_notification_worker<M: Mailer>(
    mut events: mpsc::UnboundedReceiver<WorkflowEvent>,
    mailer: M,
    registry: Arc<AdminConnectionRegistry>,
    templates: EmailTemplates,
) {
    while let Some(event) = events.recv().await {
        if let Some(live) = LiveEvent::from_workflow(&event) {
            let reached = registry.broadcast(&live);
            debug!(reached, "live update broadcast");
        }
        for message in templates.render(&event) {
            if let Err(e) = mailer.send(&message).await {
                warn!(
                    error = %format!("{e:#}"),
                    to = %message.to_email,
                    subject = %message.subject,
                    "failed to send notification email"
                );
            }
        }
    }
    debug!("notification worker stopped");
}

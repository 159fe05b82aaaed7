//! Email rendering for workflow events.

use marche_domain::account::{AccountRole, VerificationStatus};

use crate::domain::types::{AccountSummary, EmailMessage, WorkflowEvent};

#[derive(Debug, Clone)]
pub struct EmailTemplates {
    /// Public URL of the storefront, used for links in emails.
    pub base_url: String,
    /// Addresses alerted about new staff applications.
    pub admin_recipients: Vec<String>,
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

fn role_label(role: AccountRole) -> &'static str {
    match role {
        AccountRole::Client => "client",
        AccountRole::Vendor => "vendor",
        AccountRole::Moderator => "moderator",
        AccountRole::Admin => "administrator",
    }
}

impl EmailTemplates {
    fn base(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    fn to_account(&self, account: &AccountSummary, subject: String, lines: Vec<String>) -> EmailMessage {
        let greeting = format!("Hello {},", account.name);
        let text = std::iter::once(greeting.clone())
            .chain(lines.iter().cloned())
            .collect::<Vec<_>>()
            .join("\n\n");
        let html = std::iter::once(greeting)
            .chain(lines)
            .map(|line| format!("<p>{}</p>", escape_html(&line)))
            .collect::<String>();
        EmailMessage {
            to_email: account.email.clone(),
            to_name: Some(account.display_name()),
            subject,
            html,
            text,
        }
    }

    /// Every email `event` should produce. May be empty.
    pub fn render(&self, event: &WorkflowEvent) -> Vec<EmailMessage> {
        match event {
            WorkflowEvent::Registered {
                account,
                status,
                email_verification_token,
            } => {
                let mut lines = Vec::new();
                match status {
                    VerificationStatus::Verified => {
                        lines.push("Welcome to Marché, your account is ready.".to_owned());
                        if let Some(token) = email_verification_token {
                            lines.push(format!(
                                "Please confirm your email address within 24 hours: {}/confirm-email?token={token}",
                                self.base()
                            ));
                        }
                    }
                    _ => {
                        lines.push(format!(
                            "We received your {} application.",
                            role_label(account.role)
                        ));
                        lines.push(
                            "Our team will review it and email you once a decision is made."
                                .to_owned(),
                        );
                    }
                }
                vec![self.to_account(account, "Welcome to Marché".to_owned(), lines)]
            }
            WorkflowEvent::RequestSubmitted {
                account,
                alert_admins_by_email,
            } => {
                if !alert_admins_by_email {
                    return Vec::new();
                }
                let subject = format!("New {} registration request", role_label(account.role));
                let text = format!(
                    "{} <{}> applied for a {} account.\n\nReview it at {}/admin/requests",
                    account.display_name(),
                    account.email,
                    role_label(account.role),
                    self.base()
                );
                let html = format!(
                    "<p>{} &lt;{}&gt; applied for a {} account.</p><p><a href=\"{}/admin/requests\">Review pending requests</a></p>",
                    escape_html(&account.display_name()),
                    escape_html(&account.email),
                    role_label(account.role),
                    escape_html(self.base())
                );
                self.admin_recipients
                    .iter()
                    .map(|to| EmailMessage {
                        to_email: to.clone(),
                        to_name: None,
                        subject: subject.clone(),
                        html: html.clone(),
                        text: text.clone(),
                    })
                    .collect()
            }
            WorkflowEvent::Approved { account, .. } => {
                let mut lines = vec![format!(
                    "Good news: your {} account has been approved.",
                    role_label(account.role)
                )];
                if let Some(shop) = &account.shop_name {
                    lines.push(format!("Your shop \"{shop}\" can now start selling."));
                }
                lines.push(format!("Sign in at {}/login", self.base()));
                vec![self.to_account(account, "Your account has been approved".to_owned(), lines)]
            }
            WorkflowEvent::Rejected { account, reason, .. } => vec![self.to_account(
                account,
                "Your registration request".to_owned(),
                vec![
                    format!(
                        "We are sorry, your {} application was not approved.",
                        role_label(account.role)
                    ),
                    format!("Reason: {reason}"),
                ],
            )],
            WorkflowEvent::Suspended { account, reason, .. } => vec![self.to_account(
                account,
                "Your account has been suspended".to_owned(),
                vec![
                    "Your Marché account has been suspended.".to_owned(),
                    format!("Reason: {reason}"),
                ],
            )],
            WorkflowEvent::Activated { account, .. } => vec![self.to_account(
                account,
                "Your account has been reactivated".to_owned(),
                vec![format!(
                    "Your Marché account is active again. Sign in at {}/login",
                    self.base()
                )],
            )],
        }
    }
}

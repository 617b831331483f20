// src/services/mailer.rs
//! Sends email through the configured provider and records each attempt in `email_log`

use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::common::new_id;
use crate::services::email::{EmailError, EmailSender, OutgoingEmail, SentEmail};

/// Who and what an email is about, stored next to the delivery result
#[derive(Debug, Clone, Copy)]
pub struct EmailContext<'a> {
    pub kind: &'a str,
    pub candidate_id: Option<&'a str>,
    pub sent_by: Option<&'a str>,
}

pub async fn send_logged(
    pool: &SqlitePool,
    sender: &dyn EmailSender,
    email: OutgoingEmail,
    context: EmailContext<'_>,
) -> Result<SentEmail, EmailError> {
    let recipients = serde_json::to_string(&email.to).unwrap_or_else(|_| "[]".to_string());
    let subject = email.subject.clone();

    let result = sender.send(email).await;

    let (status, provider_id, error_message) = match &result {
        Ok(sent) => ("enviado", Some(sent.id.clone()), None),
        Err(e) => ("fallido", None, Some(e.to_string())),
    };

    let logged = sqlx::query(
        r#"
        INSERT INTO email_log (id, kind, recipients, subject, provider_id, status, error_message, candidate_id, sent_by)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(new_id())
    .bind(context.kind)
    .bind(&recipients)
    .bind(&subject)
    .bind(&provider_id)
    .bind(status)
    .bind(&error_message)
    .bind(context.candidate_id)
    .bind(context.sent_by)
    .execute(pool)
    .await;

    if let Err(e) = logged {
        warn!(error = %e, kind = %context.kind, "Failed to write email log entry");
    }

    match &result {
        Ok(sent) => info!(kind = %context.kind, email_id = %sent.id, "Email delivered"),
        Err(e) => warn!(kind = %context.kind, error = %e, "Email delivery failed"),
    }

    result
}

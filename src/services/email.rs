// src/services/email.rs
//! Transactional email: Resend client and the HTML templates sent to
//! candidates and dashboard users

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info};

use crate::common::config::EmailConfig;
use crate::common::helpers::escape_html;
use crate::common::safe_email_log;

const RESEND_ENDPOINT: &str = "https://api.resend.com/emails";

#[derive(Debug, Error)]
pub enum EmailError {
    #[error("Email provider not configured")]
    NotConfigured,

    #[error("No recipients")]
    NoRecipients,

    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("Email API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },
}

#[derive(Debug, Clone)]
pub struct OutgoingEmail {
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
    pub reply_to: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentEmail {
    pub id: String,
}

#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, email: OutgoingEmail) -> Result<SentEmail, EmailError>;
}

#[derive(Debug, Serialize)]
struct ResendRequest<'a> {
    from: &'a str,
    to: &'a [String],
    subject: &'a str,
    html: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_to: Option<&'a str>,
}

#[derive(Debug, Clone)]
pub struct ResendClient {
    client: Client,
    api_key: Option<String>,
    from: String,
    endpoint: String,
}

impl ResendClient {
    pub fn new(config: &EmailConfig, client: Client) -> Self {
        Self {
            client,
            api_key: config.resend_api_key.clone(),
            from: config.from.clone(),
            endpoint: RESEND_ENDPOINT.to_string(),
        }
    }
}

#[async_trait]
impl EmailSender for ResendClient {
    async fn send(&self, email: OutgoingEmail) -> Result<SentEmail, EmailError> {
        let api_key = self.api_key.as_deref().ok_or(EmailError::NotConfigured)?;
        if email.to.is_empty() {
            return Err(EmailError::NoRecipients);
        }

        debug!(
            recipients = ?email.to.iter().map(|r| safe_email_log(r)).collect::<Vec<_>>(),
            subject = %email.subject,
            "Sending email through Resend"
        );

        let body = ResendRequest {
            from: &self.from,
            to: &email.to,
            subject: &email.subject,
            html: &email.html,
            reply_to: email.reply_to.as_deref(),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to send email request");
                EmailError::RequestFailed(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = crate::services::supabase_auth::extract_error_message(
                &response.text().await.unwrap_or_default(),
            );
            error!(status = %status, error = %message, "Resend rejected the email");
            return Err(EmailError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let sent = response
            .json::<SentEmail>()
            .await
            .map_err(|e| EmailError::RequestFailed(e.to_string()))?;

        info!(email_id = %sent.id, "Email sent");
        Ok(sent)
    }
}

// ============================================================================
// Templates
// ============================================================================

/// Subject and HTML body of a rendered template
#[derive(Debug, Clone)]
pub struct RenderedEmail {
    pub subject: String,
    pub html: String,
}

fn render_layout(heading: &str, accent: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <style>
        body {{ font-family: Arial, sans-serif; line-height: 1.6; color: #333; }}
        .container {{ max-width: 600px; margin: 0 auto; padding: 20px; }}
        .header {{ background-color: {accent}; color: white; padding: 20px; text-align: center; }}
        .content {{ padding: 20px; background-color: #f9f9f9; }}
        .details {{ background-color: #fff; padding: 15px; border-left: 4px solid {accent}; margin: 15px 0; }}
        .button {{ display: inline-block; padding: 12px 24px; background-color: {accent}; color: white; text-decoration: none; border-radius: 5px; margin: 10px 0; }}
        .footer {{ padding: 20px; text-align: center; font-size: 12px; color: #666; }}
    </style>
</head>
<body>
    <div class="container">
        <div class="header">
            <h1>{heading}</h1>
        </div>
        <div class="content">
{body}
        </div>
        <div class="footer">
            <p>Este es un mensaje automático. Por favor no respondas directamente a este correo.</p>
        </div>
    </div>
</body>
</html>"#,
        accent = accent,
        heading = escape_html(heading),
        body = body
    )
}

/// Free text → escaped paragraphs, keeping line breaks
fn paragraphs(text: &str) -> String {
    text.split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| format!("<p>{}</p>", escape_html(p).replace('\n', "<br>")))
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Debug, Clone)]
pub struct InterviewInvitationData {
    pub candidate_name: String,
    pub application_title: String,
    pub interviewer_name: String,
    pub scheduled_at_display: String,
    pub duration_minutes: i64,
    pub meet_link: Option<String>,
    pub location: Option<String>,
    pub notes: Option<String>,
}

pub fn interview_invitation_email(data: &InterviewInvitationData) -> RenderedEmail {
    let place = match (&data.meet_link, &data.location) {
        (Some(link), _) => format!(
            r#"<p><strong>Enlace:</strong> <a href="{0}">{0}</a></p>
            <p><a class="button" href="{0}">Unirse a la reunión</a></p>"#,
            escape_html(link)
        ),
        (None, Some(location)) => {
            format!("<p><strong>Lugar:</strong> {}</p>", escape_html(location))
        }
        (None, None) => String::new(),
    };
    let notes = data
        .notes
        .as_deref()
        .filter(|n| !n.trim().is_empty())
        .map(|n| format!("<p><strong>Indicaciones:</strong></p>{}", paragraphs(n)))
        .unwrap_or_default();

    let body = format!(
        r#"            <p>Hola {candidate},</p>
            <p>Queremos invitarte a una entrevista para el proceso <strong>{title}</strong>.</p>
            <div class="details">
                <p><strong>Fecha y hora:</strong> {when}</p>
                <p><strong>Duración:</strong> {duration} minutos</p>
                <p><strong>Entrevistador(a):</strong> {interviewer}</p>
                {place}
            </div>
            {notes}
            <p>Si no puedes asistir, por favor avísanos con anticipación.</p>
            <p>Saludos,<br>Equipo de Selección</p>"#,
        candidate = escape_html(&data.candidate_name),
        title = escape_html(&data.application_title),
        when = escape_html(&data.scheduled_at_display),
        duration = data.duration_minutes,
        interviewer = escape_html(&data.interviewer_name),
        place = place,
        notes = notes,
    );

    RenderedEmail {
        subject: format!("Invitación a entrevista - {}", data.application_title),
        html: render_layout("Invitación a entrevista", "#4F46E5", &body),
    }
}

pub fn candidate_message_email(candidate_name: &str, subject: &str, message: &str) -> RenderedEmail {
    let body = format!(
        r#"            <p>Hola {},</p>
            {}
            <p>Saludos,<br>Equipo de Selección</p>"#,
        escape_html(candidate_name),
        paragraphs(message)
    );

    RenderedEmail {
        subject: subject.to_string(),
        html: render_layout(subject, "#4F46E5", &body),
    }
}

pub fn stage_update_email(
    candidate_name: &str,
    application_title: &str,
    stage_label: &str,
) -> RenderedEmail {
    let body = format!(
        r#"            <p>Hola {},</p>
            <p>Tu postulación al proceso <strong>{}</strong> avanzó a la etapa:</p>
            <div class="details"><p><strong>{}</strong></p></div>
            <p>Te contactaremos pronto con los siguientes pasos.</p>
            <p>Saludos,<br>Equipo de Selección</p>"#,
        escape_html(candidate_name),
        escape_html(application_title),
        escape_html(stage_label)
    );

    RenderedEmail {
        subject: format!("Actualización de tu postulación - {}", application_title),
        html: render_layout("Actualización de tu postulación", "#10B981", &body),
    }
}

pub fn rejection_email(candidate_name: &str, application_title: &str) -> RenderedEmail {
    let body = format!(
        r#"            <p>Hola {},</p>
            <p>Gracias por tu interés en el proceso <strong>{}</strong> y por el tiempo dedicado.</p>
            <p>Después de una cuidadosa revisión, decidimos continuar con otros candidatos cuyo perfil se ajusta más a las necesidades actuales del cargo.</p>
            <p>Te animamos a postular a futuras oportunidades.</p>
            <p>Saludos,<br>Equipo de Selección</p>"#,
        escape_html(candidate_name),
        escape_html(application_title)
    );

    RenderedEmail {
        subject: format!("Resultado de tu postulación - {}", application_title),
        html: render_layout("Resultado de tu postulación", "#6B7280", &body),
    }
}

pub fn welcome_email(full_name: &str, role: &str, login_url: &str) -> RenderedEmail {
    let body = format!(
        r#"            <p>Hola {name},</p>
            <p>Se creó tu cuenta en HirePro con el rol <strong>{role}</strong>.</p>
            <p><a class="button" href="{url}">Ingresar al panel</a></p>
            <p>Si no esperabas este correo, contacta al administrador.</p>"#,
        name = escape_html(full_name),
        role = escape_html(role),
        url = escape_html(login_url)
    );

    RenderedEmail {
        subject: "Bienvenido a HirePro".to_string(),
        html: render_layout("Bienvenido a HirePro", "#8B5CF6", &body),
    }
}

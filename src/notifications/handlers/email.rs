// src/notifications/handlers/email.rs

use axum::{extract::Extension, response::IntoResponse, Json};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::auth::{AuthedUser, Permission};
use crate::candidates::models::{Candidate, Stage};
use crate::candidates::queries::{find_application_title, find_candidate, find_postulation};
use crate::common::helpers::trimmed;
use crate::common::{safe_email_log, ApiError, ApiResponse, AppState, Validator};
use crate::notifications::models::{SendEmailRequest, SendEmailResponse};
use crate::notifications::validators::SendEmailValidator;
use crate::services::email::{
    candidate_message_email, rejection_email, stage_update_email, OutgoingEmail, RenderedEmail,
};
use crate::services::interviews::{send_interview_invitation, INVITATION_EMAIL_KIND};
use crate::services::mailer::{send_logged, EmailContext};
use crate::services::timeline::{self, TimelineEntry, TimelineEvent};

/// POST /api/send-email - Dispatches on `type`
pub async fn send_email(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Json(request): Json<SendEmailRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let state = state_lock.read().await.clone();
    authed.require(Permission::SendEmails)?;

    SendEmailValidator.validate(&request).into_result()?;

    let response = match request.kind.as_deref().unwrap_or_default() {
        "candidate_email" => send_candidate_email(&state, &authed, &request).await?,
        INVITATION_EMAIL_KIND => {
            let interview_id = request.interview_id.as_deref().unwrap_or_default();
            let details = send_interview_invitation(&state, interview_id, Some(&authed.id)).await?;
            SendEmailResponse {
                kind: INVITATION_EMAIL_KIND.to_string(),
                email_id: None,
                recipients: vec![details.candidate_email],
            }
        }
        kind @ ("stage_update" | "rejection") => {
            send_postulation_email(&state, &authed, &request, kind).await?
        }
        "custom" => {
            authed.require(Permission::ManageUsers)?;
            send_custom_email(&state, &authed, &request).await?
        }
        other => {
            return Err(ApiError::BadRequest(format!("Tipo de correo inválido: {}", other)));
        }
    };

    info!(
        kind = %response.kind,
        recipients = response.recipients.len(),
        sent_by = %authed.id,
        "Email dispatched"
    );
    Ok(ApiResponse::ok(response).with_message("Correo enviado exitosamente"))
}

async fn deliver_to_candidate(
    state: &AppState,
    authed: &AuthedUser,
    candidate: &Candidate,
    application_id: Option<&str>,
    kind: &str,
    rendered: RenderedEmail,
) -> Result<SendEmailResponse, ApiError> {
    let subject = rendered.subject.clone();
    let email = OutgoingEmail {
        to: vec![candidate.email.clone()],
        subject: rendered.subject,
        html: rendered.html,
        reply_to: Some(authed.email.clone()),
    };

    let sent = send_logged(
        &state.db,
        &*state.email,
        email,
        EmailContext {
            kind,
            candidate_id: Some(&candidate.id),
            sent_by: Some(&authed.id),
        },
    )
    .await?;

    timeline::record(
        &state.db,
        TimelineEntry::new(
            &candidate.id,
            TimelineEvent::EmailSent,
            format!("Correo enviado: {}", subject),
        )
        .application(application_id)
        .metadata(json!({ "kind": kind, "emailId": sent.id, "subject": subject }))
        .actor(&authed.id),
    )
    .await;

    Ok(SendEmailResponse {
        kind: kind.to_string(),
        email_id: Some(sent.id),
        recipients: vec![candidate.email.clone()],
    })
}

async fn send_candidate_email(
    state: &AppState,
    authed: &AuthedUser,
    request: &SendEmailRequest,
) -> Result<SendEmailResponse, ApiError> {
    let candidate_id = request.candidate_id.as_deref().unwrap_or_default();
    let candidate = find_candidate(&state.db, candidate_id).await?;
    let subject = trimmed(&request.subject).unwrap_or_default();
    let message = request.message.as_deref().unwrap_or_default();

    info!(
        candidate_id = %candidate.id,
        to = %safe_email_log(&candidate.email),
        "Sending message to candidate"
    );
    let rendered = candidate_message_email(&candidate.full_name, &subject, message);
    deliver_to_candidate(state, authed, &candidate, None, "candidate_email", rendered).await
}

async fn send_postulation_email(
    state: &AppState,
    authed: &AuthedUser,
    request: &SendEmailRequest,
    kind: &str,
) -> Result<SendEmailResponse, ApiError> {
    let postulation_id = request.postulation_id.as_deref().unwrap_or_default();
    let postulation = find_postulation(&state.db, postulation_id).await?;
    let candidate = find_candidate(&state.db, &postulation.candidate_id).await?;
    let title = find_application_title(&state.db, &postulation.application_id).await?;

    let rendered = if kind == "rejection" {
        if postulation.stage != Stage::Descartado.as_str() {
            warn!(
                postulation_id = %postulation_id,
                stage = %postulation.stage,
                "Sending rejection for a postulation that is not discarded"
            );
        }
        rejection_email(&candidate.full_name, &title)
    } else {
        let label = Stage::parse(&postulation.stage)
            .map(|s| s.label())
            .unwrap_or(postulation.stage.as_str());
        stage_update_email(&candidate.full_name, &title, label)
    };

    deliver_to_candidate(
        state,
        authed,
        &candidate,
        Some(&postulation.application_id),
        kind,
        rendered,
    )
    .await
}

async fn send_custom_email(
    state: &AppState,
    authed: &AuthedUser,
    request: &SendEmailRequest,
) -> Result<SendEmailResponse, ApiError> {
    let recipients: Vec<String> = request
        .to
        .clone()
        .unwrap_or_default()
        .into_iter()
        .map(|r| r.trim().to_lowercase())
        .collect();

    let email = OutgoingEmail {
        to: recipients.clone(),
        subject: trimmed(&request.subject).unwrap_or_default(),
        html: request.html.clone().unwrap_or_default(),
        reply_to: Some(authed.email.clone()),
    };

    let sent = send_logged(
        &state.db,
        &*state.email,
        email,
        EmailContext {
            kind: "custom",
            candidate_id: None,
            sent_by: Some(&authed.id),
        },
    )
    .await?;

    Ok(SendEmailResponse {
        kind: "custom".to_string(),
        email_id: Some(sent.id),
        recipients,
    })
}

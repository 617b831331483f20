// src/services/interviews.rs
//! Interview scheduling flow: calendar event, stored row, invitation email

use chrono::{DateTime, Duration, FixedOffset, SecondsFormat};
use serde_json::json;
use sqlx::{FromRow, SqlitePool};
use tracing::{error, info, warn};

use crate::candidates::queries::{find_application_title, find_candidate};
use crate::common::helpers::trimmed;
use crate::common::validation::parse_future_datetime;
use crate::common::{new_id, ApiError, AppState, Validator};
use crate::interviews::models::{
    InterviewDetails, ScheduleInterviewRequest, DEFAULT_DURATION_MINUTES,
};
use crate::interviews::validators::ScheduleInterviewValidator;
use crate::services::email::{interview_invitation_email, EmailError, InterviewInvitationData, OutgoingEmail};
use crate::services::google::CalendarEvent;
use crate::services::mailer::{send_logged, EmailContext};
use crate::services::notifications::{notify_user, NewNotification};
use crate::services::timeline::{self, TimelineEntry, TimelineEvent};

pub const INVITATION_EMAIL_KIND: &str = "interview_invitation";

const DETAILS_SELECT: &str = r#"
    SELECT i.*, c.full_name AS candidate_name, c.email AS candidate_email,
           a.title AS application_title, u.full_name AS interviewer_name,
           u.email AS interviewer_email
    FROM interviews i
    JOIN candidates c ON c.id = i.candidate_id
    JOIN applications a ON a.id = i.application_id
    LEFT JOIN users u ON u.id = i.interviewer_id
"#;

#[derive(Debug, FromRow)]
struct Assignee {
    id: String,
    full_name: String,
    email: String,
}

/// Base query for interview listings, callers append WHERE / ORDER BY
pub fn details_select() -> &'static str {
    DETAILS_SELECT
}

pub async fn load_interview_details(pool: &SqlitePool, interview_id: &str) -> Result<InterviewDetails, ApiError> {
    sqlx::query_as::<_, InterviewDetails>(&format!("{} WHERE i.id = ?", DETAILS_SELECT))
        .bind(interview_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::NotFound("Entrevista no encontrada".to_string()))
}

async fn find_assignee(pool: &SqlitePool, assignee_id: &str) -> Result<Assignee, ApiError> {
    sqlx::query_as::<_, Assignee>(
        "SELECT id, full_name, email FROM users WHERE id = ? AND is_active = 1",
    )
    .bind(assignee_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| {
        warn!(assignee_id = %assignee_id, "Interview assignee not found or inactive");
        ApiError::NotFound("Entrevistador no encontrado".to_string())
    })
}

/// Human readable date in the offset the interview was scheduled with
pub fn display_datetime(value: &DateTime<FixedOffset>) -> String {
    value.format("%d/%m/%Y a las %H:%M (UTC%:z)").to_string()
}

/// Schedules an interview and emails the candidate
///
/// Calendar failures abort before anything is stored. Once the row exists,
/// an email failure is reported with the interview id so the invitation can
/// be re-sent through `/api/send-email`.
pub async fn schedule_interview(
    state: &AppState,
    request: ScheduleInterviewRequest,
    actor_id: &str,
) -> Result<InterviewDetails, ApiError> {
    ScheduleInterviewValidator.validate(&request).into_result()?;

    let candidate_id = request.candidate_id.as_deref().unwrap_or_default().trim();
    let application_id = request.application_id.as_deref().unwrap_or_default().trim();
    let assignee_id = request.assignee_id.as_deref().unwrap_or_default().trim();
    let scheduled_at_raw = request.scheduled_at.as_deref().unwrap_or_default().trim();
    let scheduled_at = parse_future_datetime(scheduled_at_raw)
        .map_err(|message| ApiError::BadRequest(message.to_string()))?;
    // Canonical RFC 3339, readable by SQLite datetime()
    let scheduled_at_stored = scheduled_at.to_rfc3339_opts(SecondsFormat::Secs, true);
    let duration_minutes = request.duration_minutes.unwrap_or(DEFAULT_DURATION_MINUTES);
    let mode = request.mode.clone().unwrap_or_else(|| "virtual".to_string());
    let location = trimmed(&request.location);
    let notes = trimmed(&request.notes);
    let create_meet = request.create_meet.unwrap_or(mode == "virtual");

    let candidate = find_candidate(&state.db, candidate_id).await?;
    let assignee = find_assignee(&state.db, assignee_id).await?;
    let application_title = find_application_title(&state.db, application_id).await?;

    info!(
        candidate_id = %candidate_id,
        application_id = %application_id,
        assignee_id = %assignee.id,
        scheduled_at = %scheduled_at_stored,
        create_meet = create_meet,
        "Scheduling interview"
    );

    let (meet_link, calendar_event_id) = if create_meet {
        let event = CalendarEvent {
            summary: format!("Entrevista: {} - {}", candidate.full_name, application_title),
            description: notes.clone(),
            start: scheduled_at,
            end: scheduled_at + Duration::minutes(duration_minutes),
            attendees: vec![candidate.email.clone(), assignee.email.clone()],
            create_meet_link: true,
        };
        let created = state.calendar.create_event(&event).await.map_err(|e| {
            error!(error = %e, candidate_id = %candidate_id, "Failed to create calendar event");
            ApiError::from(e)
        })?;
        info!(event_id = %created.id, has_meet_link = created.meet_link.is_some(), "Calendar event created");
        (created.meet_link, Some(created.id))
    } else {
        (None, None)
    };

    let interview_id = new_id();
    let inserted = sqlx::query(
        r#"
        INSERT INTO interviews (
            id, candidate_id, application_id, interviewer_id, scheduled_at, duration_minutes,
            mode, location, meet_link, calendar_event_id, notes, created_by
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&interview_id)
    .bind(candidate_id)
    .bind(application_id)
    .bind(&assignee.id)
    .bind(&scheduled_at_stored)
    .bind(duration_minutes)
    .bind(&mode)
    .bind(&location)
    .bind(&meet_link)
    .bind(&calendar_event_id)
    .bind(&notes)
    .bind(actor_id)
    .execute(&state.db)
    .await;

    if let Err(e) = inserted {
        error!(error = %e, "Database error creating interview");
        if let Some(event_id) = &calendar_event_id {
            if let Err(cleanup) = state.calendar.delete_event(event_id).await {
                warn!(error = %cleanup, event_id = %event_id, "Failed to remove orphaned calendar event");
            }
        }
        return Err(ApiError::DatabaseError(e));
    }

    let when = display_datetime(&scheduled_at);

    timeline::record(
        &state.db,
        TimelineEntry::new(
            candidate_id,
            TimelineEvent::InterviewScheduled,
            format!("Entrevista agendada para el {}", when),
        )
        .application(Some(application_id))
        .metadata(json!({
            "interviewId": interview_id,
            "scheduledAt": scheduled_at_stored,
            "mode": mode,
            "meetLink": meet_link,
        }))
        .actor(actor_id),
    )
    .await;

    notify_user(
        &state.db,
        NewNotification {
            user_id: &assignee.id,
            kind: "interview_scheduled",
            title: "Nueva entrevista asignada".to_string(),
            body: format!(
                "Entrevista con {} ({}) el {}",
                candidate.full_name, application_title, when
            ),
            link: Some(format!("/interviews/{}", interview_id)),
        },
    )
    .await;

    let details = load_interview_details(&state.db, &interview_id).await?;
    info!(interview_id = %interview_id, "Interview stored");

    if !request.send_email.unwrap_or(true) {
        return Ok(details);
    }

    match deliver_invitation(state, &details, Some(actor_id)).await {
        Ok(()) => load_interview_details(&state.db, &interview_id).await,
        Err(e) => {
            error!(error = %e, interview_id = %interview_id, "Interview stored but invitation email failed");
            Err(ApiError::InternalWithMessage {
                error: format!("No se pudo enviar el correo de invitación: {}", e),
                message: format!(
                    "La entrevista {} quedó agendada. Reenvíe la invitación con POST /api/send-email (type: interview_invitation, interviewId: {})",
                    interview_id, interview_id
                ),
            })
        }
    }
}

/// Sends (or re-sends) the invitation for a stored interview
pub async fn send_interview_invitation(
    state: &AppState,
    interview_id: &str,
    sent_by: Option<&str>,
) -> Result<InterviewDetails, ApiError> {
    let details = load_interview_details(&state.db, interview_id).await?;
    if details.interview.status == "cancelada" {
        return Err(ApiError::BadRequest(
            "No se puede enviar la invitación de una entrevista cancelada".to_string(),
        ));
    }

    deliver_invitation(state, &details, sent_by).await?;
    load_interview_details(&state.db, interview_id).await
}

async fn deliver_invitation(
    state: &AppState,
    details: &InterviewDetails,
    sent_by: Option<&str>,
) -> Result<(), EmailError> {
    let interview = &details.interview;
    let scheduled_at_display = DateTime::parse_from_rfc3339(&interview.scheduled_at)
        .map(|dt| display_datetime(&dt))
        .unwrap_or_else(|_| interview.scheduled_at.clone());

    let rendered = interview_invitation_email(&InterviewInvitationData {
        candidate_name: details.candidate_name.clone(),
        application_title: details.application_title.clone(),
        interviewer_name: details
            .interviewer_name
            .clone()
            .unwrap_or_else(|| "el equipo de selección".to_string()),
        scheduled_at_display,
        duration_minutes: interview.duration_minutes,
        meet_link: interview.meet_link.clone(),
        location: interview.location.clone(),
        notes: interview.notes.clone(),
    });

    let email = OutgoingEmail {
        to: vec![details.candidate_email.clone()],
        subject: rendered.subject.clone(),
        html: rendered.html,
        reply_to: details.interviewer_email.clone(),
    };

    send_logged(
        &state.db,
        &*state.email,
        email,
        EmailContext {
            kind: INVITATION_EMAIL_KIND,
            candidate_id: Some(&interview.candidate_id),
            sent_by,
        },
    )
    .await?;

    if let Err(e) = sqlx::query("UPDATE interviews SET email_sent = 1, updated_at = datetime('now') WHERE id = ?")
        .bind(&interview.id)
        .execute(&state.db)
        .await
    {
        warn!(error = %e, interview_id = %interview.id, "Failed to flag invitation as sent");
    }

    let mut entry = TimelineEntry::new(
        &interview.candidate_id,
        TimelineEvent::EmailSent,
        format!("Invitación a entrevista enviada: {}", rendered.subject),
    )
    .application(Some(&interview.application_id))
    .metadata(json!({ "kind": INVITATION_EMAIL_KIND, "interviewId": interview.id }));
    if let Some(actor) = sent_by {
        entry = entry.actor(actor);
    }
    timeline::record(&state.db, entry).await;

    Ok(())
}

/// Moves an interview to a new status; cancelling also drops the calendar event
pub async fn change_interview_status(
    state: &AppState,
    interview_id: &str,
    status: &str,
    notes: Option<String>,
    actor_id: &str,
) -> Result<InterviewDetails, ApiError> {
    let current = load_interview_details(&state.db, interview_id).await?;
    let previous = current.interview.status.clone();

    if previous == "cancelada" && status != "cancelada" {
        return Err(ApiError::BadRequest(
            "La entrevista está cancelada y no puede cambiar de estado".to_string(),
        ));
    }
    if previous == status {
        return Ok(current);
    }

    if status == "cancelada" {
        if let Some(event_id) = &current.interview.calendar_event_id {
            match state.calendar.delete_event(event_id).await {
                Ok(()) => info!(event_id = %event_id, "Calendar event deleted"),
                Err(e) => warn!(error = %e, event_id = %event_id, "Failed to delete calendar event"),
            }
        }
    }

    sqlx::query(
        "UPDATE interviews SET status = ?, notes = COALESCE(?, notes), updated_at = datetime('now') WHERE id = ?",
    )
    .bind(status)
    .bind(&notes)
    .bind(interview_id)
    .execute(&state.db)
    .await?;

    timeline::record(
        &state.db,
        TimelineEntry::new(
            &current.interview.candidate_id,
            TimelineEvent::InterviewStatusChanged,
            format!("Entrevista {}: {} → {}", interview_id, previous, status),
        )
        .application(Some(&current.interview.application_id))
        .metadata(json!({ "interviewId": interview_id, "from": previous, "to": status }))
        .actor(actor_id),
    )
    .await;

    if current.interview.interviewer_id != actor_id {
        notify_user(
            &state.db,
            NewNotification {
                user_id: &current.interview.interviewer_id,
                kind: "interview_status",
                title: "Entrevista actualizada".to_string(),
                body: format!(
                    "La entrevista con {} pasó a estado {}",
                    current.candidate_name, status
                ),
                link: Some(format!("/interviews/{}", interview_id)),
            },
        )
        .await;
    }

    info!(interview_id = %interview_id, from = %previous, to = %status, "Interview status changed");
    load_interview_details(&state.db, interview_id).await
}

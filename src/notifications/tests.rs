//! Tests for email dispatch and the notification inbox

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use chrono::{Duration, Utc};
    use serde_json::json;

    use super::super::models::SendEmailRequest;
    use super::super::validators::SendEmailValidator;
    use crate::auth::Role;
    use crate::common::testing::TestApp;
    use crate::common::Validator;
    use crate::services::notifications::{notify_user, NewNotification};

    async fn notify(app: &TestApp, user_id: &str, title: &str) {
        notify_user(
            app.db(),
            NewNotification {
                user_id,
                kind: "test",
                title: title.to_string(),
                body: "cuerpo".to_string(),
                link: None,
            },
        )
        .await
        .unwrap();
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let request = SendEmailRequest {
            kind: Some("newsletter".to_string()),
            ..Default::default()
        };
        let result = SendEmailValidator.validate(&request);
        assert!(!result.is_valid);
        assert_eq!(result.errors[0].field, "type");
    }

    #[test]
    fn test_custom_requires_valid_recipients() {
        let request = SendEmailRequest {
            kind: Some("custom".to_string()),
            to: Some(vec!["ok@x.cl".to_string(), "malo".to_string()]),
            subject: Some("Hola".to_string()),
            html: Some("<p>x</p>".to_string()),
            ..Default::default()
        };
        let result = SendEmailValidator.validate(&request);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].message, "Uno o más destinatarios no son válidos");
    }

    #[tokio::test]
    async fn test_candidate_email_is_sent_logged_and_timelined() {
        let app = TestApp::new().await;
        let token = app.user_token(Role::Reclutador).await;
        let candidate_id = app.insert_candidate("Ana Pérez", "ana@x.cl").await;

        let (status, body) = app
            .post(
                "/api/send-email",
                Some(&token),
                json!({
                    "type": "candidate_email",
                    "candidateId": candidate_id,
                    "subject": "Próximos pasos",
                    "message": "Hola Ana\n\nTe escribimos para coordinar."
                }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["recipients"], json!(["ana@x.cl"]));

        let sent = app.email.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, "Próximos pasos");
        assert!(sent[0].html.contains("Ana Pérez"));

        let logged: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM email_log WHERE kind = 'candidate_email' AND candidate_id = ?",
        )
        .bind(&candidate_id)
        .fetch_one(app.db())
        .await
        .unwrap();
        assert_eq!(logged, 1);

        let events: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM candidate_timeline WHERE candidate_id = ? AND event_type = 'email_sent'",
        )
        .bind(&candidate_id)
        .fetch_one(app.db())
        .await
        .unwrap();
        assert_eq!(events, 1);
    }

    #[tokio::test]
    async fn test_candidate_email_missing_fields() {
        let app = TestApp::new().await;
        let token = app.user_token(Role::Reclutador).await;

        let (status, body) = app
            .post("/api/send-email", Some(&token), json!({ "type": "candidate_email" }))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "El candidato es requerido");
    }

    #[tokio::test]
    async fn test_provider_failure_is_500_and_logged() {
        let app = TestApp::new().await;
        let token = app.user_token(Role::Reclutador).await;
        let candidate_id = app.insert_candidate("Ana", "ana@x.cl").await;
        app.email.set_failing(true);

        let (status, _) = app
            .post(
                "/api/send-email",
                Some(&token),
                json!({
                    "type": "candidate_email",
                    "candidateId": candidate_id,
                    "subject": "Hola",
                    "message": "Mensaje"
                }),
            )
            .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

        let status: String = sqlx::query_scalar("SELECT status FROM email_log")
            .fetch_one(app.db())
            .await
            .unwrap();
        assert_eq!(status, "fallido");
    }

    #[tokio::test]
    async fn test_stage_update_uses_stage_label() {
        let app = TestApp::new().await;
        let token = app.user_token(Role::Reclutador).await;
        let application_id = app.insert_application("Backend").await;
        let candidate_id = app.insert_candidate("Ana", "ana@x.cl").await;
        let postulation_id = app.insert_postulation(&candidate_id, &application_id).await;
        sqlx::query("UPDATE postulations SET stage = 'entrevista-tecnica' WHERE id = ?")
            .bind(&postulation_id)
            .execute(app.db())
            .await
            .unwrap();

        let (status, _) = app
            .post(
                "/api/send-email",
                Some(&token),
                json!({ "type": "stage_update", "postulationId": postulation_id }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);

        let sent = app.email.sent();
        assert_eq!(sent[0].subject, "Actualización de tu postulación - Backend");
        assert!(sent[0].html.contains("Entrevista técnica"));
    }

    #[tokio::test]
    async fn test_interview_invitation_resend() {
        let app = TestApp::new().await;
        let token = app.user_token(Role::Reclutador).await;
        let assignee = app.insert_user("e@hirepro.test", Role::Entrevistador).await;
        let application_id = app.insert_application("Backend").await;
        let candidate_id = app.insert_candidate("Ana", "ana@x.cl").await;

        app.email.set_failing(true);
        let (status, _) = app
            .post(
                "/api/schedule-interview",
                Some(&token),
                json!({
                    "candidateId": candidate_id,
                    "applicationId": application_id,
                    "assigneeId": assignee,
                    "scheduledAt": (Utc::now() + Duration::days(2)).to_rfc3339(),
                }),
            )
            .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let interview_id: String = sqlx::query_scalar("SELECT id FROM interviews")
            .fetch_one(app.db())
            .await
            .unwrap();

        app.email.set_failing(false);
        let (status, body) = app
            .post(
                "/api/send-email",
                Some(&token),
                json!({ "type": "interview_invitation", "interviewId": interview_id }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["recipients"], json!(["ana@x.cl"]));

        let email_sent: bool = sqlx::query_scalar("SELECT email_sent FROM interviews WHERE id = ?")
            .bind(&interview_id)
            .fetch_one(app.db())
            .await
            .unwrap();
        assert!(email_sent);
    }

    #[tokio::test]
    async fn test_custom_email_requires_user_management() {
        let app = TestApp::new().await;
        let recruiter = app.user_token(Role::Reclutador).await;
        let admin = app.user_token(Role::Administrador).await;
        let body = json!({
            "type": "custom",
            "to": ["equipo@empresa.cl"],
            "subject": "Aviso",
            "html": "<p>Hola equipo</p>"
        });

        let (status, _) = app.post("/api/send-email", Some(&recruiter), body.clone()).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = app.post("/api/send-email", Some(&admin), body).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(app.email.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_inbox_unread_filter_and_mark_read() {
        let app = TestApp::new().await;
        let (user_id, token) = app.user_with_token(Role::Entrevistador).await;
        let (other_id, other_token) = app.user_with_token(Role::Entrevistador).await;
        notify(&app, &user_id, "Primera").await;
        notify(&app, &user_id, "Segunda").await;
        notify(&app, &other_id, "Ajena").await;

        let (status, body) = app.get("/api/notifications", Some(&token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["unreadCount"], 2);
        let first_id = body["data"]["notifications"][0]["id"].as_str().unwrap().to_string();

        let (status, _) = app
            .patch(&format!("/api/notifications/{}/read", first_id), Some(&other_token), json!({}))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = app
            .patch(&format!("/api/notifications/{}/read", first_id), Some(&token), json!({}))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["data"]["readAt"].is_string());

        let (_, body) = app.get("/api/notifications?unread=true", Some(&token)).await;
        assert_eq!(body["data"]["notifications"].as_array().unwrap().len(), 1);
        assert_eq!(body["data"]["unreadCount"], 1);

        let (_, body) = app.post("/api/notifications/read-all", Some(&token), json!({})).await;
        assert_eq!(body["data"]["updated"], 1);

        let (_, body) = app.get("/api/notifications", Some(&other_token)).await;
        assert_eq!(body["data"]["unreadCount"], 1);
    }
}

//! Tests for the applications module

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use super::super::models::*;
    use super::super::validators::ApplicationValidator;
    use crate::auth::Role;
    use crate::common::testing::TestApp;
    use crate::common::Validator;

    fn create_request(title: Option<&str>, status: Option<&str>) -> CreateApplicationRequest {
        CreateApplicationRequest {
            title: title.map(str::to_string),
            description: None,
            department: Some("Ingeniería".to_string()),
            location: None,
            status: status.map(str::to_string),
        }
    }

    #[test]
    fn test_title_is_required() {
        let result = ApplicationValidator.validate(&create_request(Some("   "), None));
        assert!(!result.is_valid);
        assert_eq!(result.errors[0].message, "El título es requerido");
    }

    #[test]
    fn test_status_must_be_known() {
        let result = ApplicationValidator.validate(&create_request(Some("Backend"), Some("archivada")));
        assert!(!result.is_valid);
        assert_eq!(result.errors[0].field, "status");

        let result = ApplicationValidator.validate(&create_request(Some("Backend"), Some("pausada")));
        assert!(result.is_valid);
    }

    #[tokio::test]
    async fn test_create_and_list_by_status() {
        let app = TestApp::new().await;
        let token = app.user_token(Role::Reclutador).await;

        let (status, body) = app
            .post("/api/applications", Some(&token), json!({ "title": "Backend Rust" }))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["status"], "abierta");

        app.post(
            "/api/applications",
            Some(&token),
            json!({ "title": "Diseño", "status": "cerrada" }),
        )
        .await;

        let (_, body) = app.get("/api/applications?status=abierta", Some(&token)).await;
        let list = body["data"].as_array().unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0]["title"], "Backend Rust");
        assert_eq!(list[0]["candidateCount"], 0);

        let (status, _) = app.get("/api/applications?status=borrador", Some(&token)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_entrevistador_cannot_create_application() {
        let app = TestApp::new().await;
        let token = app.user_token(Role::Entrevistador).await;

        let (status, _) = app
            .post("/api/applications", Some(&token), json!({ "title": "QA" }))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_detail_counts_candidates_per_stage() {
        let app = TestApp::new().await;
        let token = app.user_token(Role::Visualizador).await;
        let application_id = app.insert_application("Data").await;
        for (name, email) in [("Ana", "ana@x.cl"), ("Luis", "luis@x.cl"), ("Eva", "eva@x.cl")] {
            let candidate_id = app.insert_candidate(name, email).await;
            app.insert_postulation(&candidate_id, &application_id).await;
        }
        sqlx::query("UPDATE postulations SET stage = 'oferta' WHERE rowid = 1")
            .execute(app.db())
            .await
            .unwrap();

        let (status, body) = app
            .get(&format!("/api/applications/{}", application_id), Some(&token))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["totalCandidates"], 3);
        let counts = body["data"]["stageCounts"].as_array().unwrap();
        assert_eq!(counts.len(), 7);
        assert_eq!(counts[0]["stage"], "postulado");
        assert_eq!(counts[0]["count"], 2);
        assert_eq!(counts[4]["stage"], "oferta");
        assert_eq!(counts[4]["count"], 1);
    }

    #[tokio::test]
    async fn test_update_and_pipeline() {
        let app = TestApp::new().await;
        let token = app.user_token(Role::Administrador).await;
        let application_id = app.insert_application("Ops").await;
        let candidate_id = app.insert_candidate("Ana", "ana@x.cl").await;
        app.insert_postulation(&candidate_id, &application_id).await;

        let (status, body) = app
            .put(
                &format!("/api/applications/{}", application_id),
                Some(&token),
                json!({ "status": "pausada" }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "pausada");
        assert_eq!(body["data"]["title"], "Ops");

        let (status, body) = app
            .get(
                &format!("/api/applications/{}/postulations", application_id),
                Some(&token),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"][0]["fullName"], "Ana");
        assert_eq!(body["data"][0]["stage"], "postulado");

        let (status, _) = app.get("/api/applications/nope/postulations", Some(&token)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}

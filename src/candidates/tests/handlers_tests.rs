// src/candidates/tests/handlers_tests.rs

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::auth::Role;
    use crate::common::testing::TestApp;

    const PDF: &[u8] = b"%PDF-1.7\n1 0 obj\n<<>>\nendobj\ntrailer\n<<>>\n%%EOF";

    #[tokio::test]
    async fn test_create_candidate_with_application_creates_postulation() {
        let app = TestApp::new().await;
        let token = app.user_token(Role::Reclutador).await;
        let application_id = app.insert_application("Backend Rust").await;

        let (status, body) = app
            .post(
                "/api/candidates",
                Some(&token),
                json!({
                    "fullName": "Ana Pérez",
                    "email": "Ana@Empresa.cl",
                    "applicationId": application_id
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["email"], "ana@empresa.cl");
        let candidate_id = body["data"]["id"].as_str().unwrap().to_string();

        let (status, body) = app.get(&format!("/api/candidates/{}", candidate_id), Some(&token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["postulations"][0]["stage"], "postulado");
        assert_eq!(body["data"]["postulations"][0]["applicationTitle"], "Backend Rust");

        let (_, body) = app
            .get(&format!("/api/candidates/{}/timeline", candidate_id), Some(&token))
            .await;
        let events: Vec<&str> = body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["eventType"].as_str().unwrap())
            .collect();
        assert!(events.contains(&"candidate_created"));
        assert!(events.contains(&"postulation_created"));
    }

    #[tokio::test]
    async fn test_create_candidate_missing_email_is_spanish_400() {
        let app = TestApp::new().await;
        let token = app.user_token(Role::Reclutador).await;

        let (status, body) = app
            .post("/api/candidates", Some(&token), json!({ "fullName": "Ana" }))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "El email es requerido");
    }

    #[tokio::test]
    async fn test_visualizador_cannot_create_candidate() {
        let app = TestApp::new().await;
        let token = app.user_token(Role::Visualizador).await;

        let (status, body) = app
            .post(
                "/api/candidates",
                Some(&token),
                json!({ "fullName": "Ana", "email": "ana@x.cl" }),
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "No tienes permisos para realizar esta acción");
    }

    #[tokio::test]
    async fn test_list_candidates_filters_by_stage_and_search() {
        let app = TestApp::new().await;
        let token = app.user_token(Role::Visualizador).await;
        let application_id = app.insert_application("Frontend").await;
        let ana = app.insert_candidate("Ana Pérez", "ana@x.cl").await;
        let luis = app.insert_candidate("Luis Soto", "luis@x.cl").await;
        app.insert_postulation(&ana, &application_id).await;
        let p_luis = app.insert_postulation(&luis, &application_id).await;
        sqlx::query("UPDATE postulations SET stage = 'oferta' WHERE id = ?")
            .bind(&p_luis)
            .execute(app.db())
            .await
            .unwrap();

        let (_, body) = app
            .get(
                &format!("/api/candidates?applicationId={}&stage=oferta", application_id),
                Some(&token),
            )
            .await;
        let list = body["data"].as_array().unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0]["fullName"], "Luis Soto");

        let (_, body) = app.get("/api/candidates?search=p%C3%A9rez", Some(&token)).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 1);

        let (status, _) = app.get("/api/candidates?stage=contratado", Some(&token)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_duplicate_postulation_is_rejected() {
        let app = TestApp::new().await;
        let token = app.user_token(Role::Reclutador).await;
        let application_id = app.insert_application("QA").await;
        let candidate_id = app.insert_candidate("Ana", "ana@x.cl").await;

        let uri = format!("/api/applications/{}/candidates", application_id);
        let (status, _) = app
            .post(&uri, Some(&token), json!({ "candidateId": candidate_id }))
            .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = app
            .post(&uri, Some(&token), json!({ "candidateId": candidate_id }))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "El candidato ya está en este proceso");
    }

    #[tokio::test]
    async fn test_postulation_stored_after_check_is_bad_request() {
        let app = TestApp::new().await;
        let token = app.user_token(Role::Reclutador).await;
        let application_id = app.insert_application("QA").await;
        let candidate_id = app.insert_candidate("Ana", "ana@x.cl").await;
        // Another request adds the same pair right before this insert
        sqlx::query(
            r#"
            CREATE TRIGGER concurrent_postulation BEFORE INSERT ON postulations WHEN NEW.id != 'otra'
            BEGIN
                INSERT INTO postulations (id, candidate_id, application_id) VALUES ('otra', NEW.candidate_id, NEW.application_id);
            END
            "#,
        )
        .execute(app.db())
        .await
        .unwrap();

        let (status, body) = app
            .post(
                &format!("/api/applications/{}/candidates", application_id),
                Some(&token),
                json!({ "candidateId": candidate_id }),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "El candidato ya está en este proceso");
    }

    #[tokio::test]
    async fn test_candidate_email_stored_after_check_is_bad_request() {
        let app = TestApp::new().await;
        let token = app.user_token(Role::Reclutador).await;
        sqlx::query(
            r#"
            CREATE TRIGGER concurrent_candidate BEFORE INSERT ON candidates WHEN NEW.id != 'otro'
            BEGIN
                INSERT INTO candidates (id, full_name, email) VALUES ('otro', 'Otro', NEW.email);
            END
            "#,
        )
        .execute(app.db())
        .await
        .unwrap();

        let (status, body) = app
            .post(
                "/api/candidates",
                Some(&token),
                json!({ "fullName": "Ana Pérez", "email": "ana@x.cl" }),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Ya existe un candidato con ese email");

        let stored: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM candidates")
            .fetch_one(app.db())
            .await
            .unwrap();
        assert_eq!(stored, 0);
    }

    #[tokio::test]
    async fn test_search_treats_wildcards_literally() {
        let app = TestApp::new().await;
        let token = app.user_token(Role::Visualizador).await;
        app.insert_candidate("Ana Pérez", "ana_perez@x.cl").await;
        app.insert_candidate("Luis Soto", "luis@x.cl").await;
        app.insert_candidate("Rosa 100% Díaz", "rosa@x.cl").await;

        let (status, body) = app.get("/api/candidates?search=_", Some(&token)).await;
        assert_eq!(status, StatusCode::OK);
        let list = body["data"].as_array().unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0]["fullName"], "Ana Pérez");

        let (_, body) = app.get("/api/candidates?search=%25", Some(&token)).await;
        let list = body["data"].as_array().unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0]["fullName"], "Rosa 100% Díaz");

        let (_, body) = app.get("/api/candidates?search=%5C", Some(&token)).await;
        assert!(body["data"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stage_change_logs_timeline_and_notifies_assignee() {
        let app = TestApp::new().await;
        let token = app.user_token(Role::Reclutador).await;
        let assignee = app.insert_user("entrevistador@hirepro.test", Role::Entrevistador).await;
        let application_id = app.insert_application("Data").await;
        let candidate_id = app.insert_candidate("Ana", "ana@x.cl").await;
        let postulation_id = app.insert_postulation(&candidate_id, &application_id).await;
        sqlx::query("UPDATE postulations SET assigned_to = ? WHERE id = ?")
            .bind(&assignee)
            .bind(&postulation_id)
            .execute(app.db())
            .await
            .unwrap();

        let (status, body) = app
            .patch(
                &format!("/api/postulations/{}/stage", postulation_id),
                Some(&token),
                json!({ "stage": "pre-entrevista", "reason": "Buen perfil" }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["stage"], "pre-entrevista");

        let metadata: String = sqlx::query_scalar(
            "SELECT metadata FROM candidate_timeline WHERE candidate_id = ? AND event_type = 'stage_changed'",
        )
        .bind(&candidate_id)
        .fetch_one(app.db())
        .await
        .unwrap();
        let metadata: serde_json::Value = serde_json::from_str(&metadata).unwrap();
        assert_eq!(metadata["from"], "postulado");
        assert_eq!(metadata["reason"], "Buen perfil");

        let notifications: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM notifications WHERE user_id = ?")
                .bind(&assignee)
                .fetch_one(app.db())
                .await
                .unwrap();
        assert_eq!(notifications, 1);
    }

    #[tokio::test]
    async fn test_evaluations_average_into_postulation_score() {
        let app = TestApp::new().await;
        let token = app.user_token(Role::Entrevistador).await;
        let application_id = app.insert_application("Backend").await;
        let candidate_id = app.insert_candidate("Ana", "ana@x.cl").await;
        let postulation_id = app.insert_postulation(&candidate_id, &application_id).await;
        let uri = format!("/api/candidates/{}/evaluations", candidate_id);

        for score in [80, 60] {
            let (status, _) = app
                .post(
                    &uri,
                    Some(&token),
                    json!({
                        "applicationId": application_id,
                        "score": score,
                        "recommendation": "avanzar",
                        "strengths": ["Comunicación"]
                    }),
                )
                .await;
            assert_eq!(status, StatusCode::CREATED);
        }

        let score: Option<f64> = sqlx::query_scalar("SELECT score FROM postulations WHERE id = ?")
            .bind(&postulation_id)
            .fetch_one(app.db())
            .await
            .unwrap();
        assert_eq!(score, Some(70.0));

        let (_, body) = app.get(&uri, Some(&token)).await;
        let evaluations = body["data"].as_array().unwrap();
        assert_eq!(evaluations.len(), 2);
        assert_eq!(evaluations[0]["strengths"], json!(["Comunicación"]));
    }

    #[tokio::test]
    async fn test_evaluation_score_out_of_range() {
        let app = TestApp::new().await;
        let token = app.user_token(Role::Entrevistador).await;
        let candidate_id = app.insert_candidate("Ana", "ana@x.cl").await;

        let (status, body) = app
            .post(
                &format!("/api/candidates/{}/evaluations", candidate_id),
                Some(&token),
                json!({ "score": 150, "recommendation": "avanzar" }),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "El puntaje debe estar entre 0 y 100");
    }

    #[tokio::test]
    async fn test_note_delete_requires_author_or_manager() {
        let app = TestApp::new().await;
        let author = app.user_token(Role::Entrevistador).await;
        let other = app.user_token(Role::Visualizador).await;
        let manager = app.user_token(Role::Reclutador).await;
        let candidate_id = app.insert_candidate("Ana", "ana@x.cl").await;

        let (status, body) = app
            .post(
                &format!("/api/candidates/{}/notes", candidate_id),
                Some(&author),
                json!({ "content": "Muy buena entrevista" }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let note_id = body["data"]["id"].as_str().unwrap().to_string();
        assert_eq!(body["data"]["authorName"], "Usuario Entrevistador");

        let (status, _) = app.delete(&format!("/api/notes/{}", note_id), Some(&other)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = app.delete(&format!("/api/notes/{}", note_id), Some(&manager)).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = app.delete(&format!("/api/notes/{}", note_id), Some(&manager)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_attachment_upload_sign_and_delete() {
        let app = TestApp::new().await;
        let token = app.user_token(Role::Reclutador).await;
        let candidate_id = app.insert_candidate("Ana", "ana@x.cl").await;

        let (status, body) = app
            .upload(
                &format!("/api/candidates/{}/attachments", candidate_id),
                &token,
                "CV Ana.pdf",
                PDF,
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["mimeType"], "application/pdf");
        assert_eq!(body["data"]["fileName"], "CV Ana.pdf");
        let attachment_id = body["data"]["id"].as_str().unwrap().to_string();
        let path = body["data"]["storagePath"].as_str().unwrap().to_string();
        assert!(path.ends_with("CV_Ana.pdf"));
        assert!(app.storage.contains(&path));

        let (status, body) = app
            .get(&format!("/api/attachments/{}/url", attachment_id), Some(&token))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["data"]["url"].as_str().unwrap().contains(&path));

        let (status, _) = app
            .delete(&format!("/api/attachments/{}", attachment_id), Some(&token))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(app.storage.len(), 0);
    }

    #[tokio::test]
    async fn test_attachment_rejects_unknown_content() {
        let app = TestApp::new().await;
        let token = app.user_token(Role::Reclutador).await;
        let candidate_id = app.insert_candidate("Ana", "ana@x.cl").await;

        let (status, body) = app
            .upload(
                &format!("/api/candidates/{}/attachments", candidate_id),
                &token,
                "cv.pdf",
                b"this is not really a pdf",
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Tipo de archivo no reconocido");
        assert_eq!(app.storage.len(), 0);
    }

    #[tokio::test]
    async fn test_delete_candidate_cascades() {
        let app = TestApp::new().await;
        let token = app.user_token(Role::Administrador).await;
        let application_id = app.insert_application("Ops").await;
        let candidate_id = app.insert_candidate("Ana", "ana@x.cl").await;
        app.insert_postulation(&candidate_id, &application_id).await;

        let (status, _) = app
            .delete(&format!("/api/candidates/{}", candidate_id), Some(&token))
            .await;
        assert_eq!(status, StatusCode::OK);

        let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM postulations")
            .fetch_one(app.db())
            .await
            .unwrap();
        assert_eq!(remaining, 0);

        let (status, _) = app
            .get(&format!("/api/candidates/{}", candidate_id), Some(&token))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}

//! Tests for dashboard user management

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::{json, Value};

    use super::super::models::CreateUserRequest;
    use super::super::validators::CreateUserValidator;
    use crate::auth::Role;
    use crate::common::testing::TestApp;
    use crate::common::Validator;

    fn new_user(email: &str, role: &str) -> Value {
        json!({
            "email": email,
            "password": "secreta123",
            "fullName": "María González",
            "role": role,
        })
    }

    #[test]
    fn test_create_user_validation_messages() {
        let missing = CreateUserValidator.validate(&CreateUserRequest::default());
        let messages: Vec<&str> = missing.errors.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages[0], "El email es requerido");
        assert!(messages.contains(&"El nombre completo es requerido"));

        let invalid = CreateUserValidator.validate(&CreateUserRequest {
            email: Some("no-es-email".to_string()),
            password: Some("corta".to_string()),
            full_name: Some("María".to_string()),
            role: Some("gerente".to_string()),
            send_welcome_email: None,
        });
        let messages: Vec<&str> = invalid.errors.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "El email no es válido",
                "La contraseña debe tener al menos 8 caracteres",
                "Rol inválido"
            ]
        );
    }

    #[tokio::test]
    async fn test_create_user_stores_permissions_and_sends_welcome() {
        let app = TestApp::new().await;
        let (admin_id, token) = app.user_with_token(Role::Administrador).await;

        let mut body = new_user("Maria@Empresa.cl", "entrevistador");
        body["sendWelcomeEmail"] = json!(true);
        let (status, body) = app.post("/api/admin/create-user", Some(&token), body).await;
        assert_eq!(status, StatusCode::CREATED);

        let data = &body["data"];
        assert_eq!(data["email"], "maria@empresa.cl");
        assert_eq!(data["role"], "Entrevistador");
        assert_eq!(data["createdBy"], admin_id.as_str());
        assert_eq!(
            data["permissions"],
            json!([
                "ver_postulaciones",
                "ver_candidatos",
                "ver_entrevistas",
                "crear_evaluaciones",
                "ver_reportes"
            ])
        );

        let created = app.auth_admin.created();
        assert_eq!(created.len(), 1);
        assert_eq!(data["id"], created[0].id.as_str());

        let sent = app.email.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, "Bienvenido a HirePro");
        assert_eq!(sent[0].to, vec!["maria@empresa.cl".to_string()]);
    }

    #[tokio::test]
    async fn test_welcome_email_failure_does_not_fail_creation() {
        let app = TestApp::new().await;
        let token = app.user_token(Role::Administrador).await;
        app.email.set_failing(true);

        let mut body = new_user("nuevo@empresa.cl", "Reclutador");
        body["sendWelcomeEmail"] = json!(true);
        let (status, _) = app.post("/api/admin/create-user", Some(&token), body).await;
        assert_eq!(status, StatusCode::CREATED);

        let logged: String = sqlx::query_scalar("SELECT status FROM email_log WHERE kind = 'welcome'")
            .fetch_one(app.db())
            .await
            .unwrap();
        assert_eq!(logged, "fallido");
    }

    #[tokio::test]
    async fn test_duplicate_email_is_rejected_before_auth() {
        let app = TestApp::new().await;
        let token = app.user_token(Role::Administrador).await;
        app.insert_user("existe@empresa.cl", Role::Visualizador).await;

        let (status, body) = app
            .post("/api/admin/create-user", Some(&token), new_user("EXISTE@empresa.cl", "Visualizador"))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Ya existe un usuario con ese email");
        assert!(app.auth_admin.created().is_empty());
    }

    #[tokio::test]
    async fn test_row_failure_removes_auth_user() {
        let app = TestApp::new().await;
        let token = app.user_token(Role::Administrador).await;
        sqlx::query(
            "CREATE TRIGGER block_users BEFORE INSERT ON users WHEN NEW.email = 'roto@empresa.cl' BEGIN SELECT RAISE(ABORT, 'blocked'); END",
        )
        .execute(app.db())
        .await
        .unwrap();

        let (status, body) = app
            .post("/api/admin/create-user", Some(&token), new_user("roto@empresa.cl", "Reclutador"))
            .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Error al crear el usuario en la base de datos");

        let created = app.auth_admin.created();
        assert_eq!(app.auth_admin.deleted(), vec![created[0].id.clone()]);
    }

    #[tokio::test]
    async fn test_email_taken_after_check_is_bad_request() {
        let app = TestApp::new().await;
        let token = app.user_token(Role::Administrador).await;
        // Another request stores the same email right before this insert
        sqlx::query(
            r#"
            CREATE TRIGGER concurrent_user BEFORE INSERT ON users WHEN NEW.email = 'doble@empresa.cl'
            BEGIN
                INSERT INTO users (id, email, full_name, role) VALUES ('otro', NEW.email, 'Otro', 'reclutador');
            END
            "#,
        )
        .execute(app.db())
        .await
        .unwrap();

        let (status, body) = app
            .post("/api/admin/create-user", Some(&token), new_user("doble@empresa.cl", "Reclutador"))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Ya existe un usuario con ese email");

        let created = app.auth_admin.created();
        assert_eq!(app.auth_admin.deleted(), vec![created[0].id.clone()]);
    }

    #[tokio::test]
    async fn test_auth_failure_is_reported() {
        let app = TestApp::new().await;
        let token = app.user_token(Role::Administrador).await;
        app.auth_admin.set_failing(true);

        let (status, _) = app
            .post("/api/admin/create-user", Some(&token), new_user("a@empresa.cl", "Reclutador"))
            .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

        let users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE email = 'a@empresa.cl'")
            .fetch_one(app.db())
            .await
            .unwrap();
        assert_eq!(users, 0);
    }

    #[tokio::test]
    async fn test_only_user_managers_can_administer() {
        let app = TestApp::new().await;
        let token = app.user_token(Role::Reclutador).await;

        let (status, body) = app
            .post("/api/admin/create-user", Some(&token), new_user("x@empresa.cl", "Reclutador"))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "No tienes permisos para realizar esta acción");

        let (status, _) = app.get("/api/admin/users", Some(&token)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_role_change_recomputes_permissions() {
        let app = TestApp::new().await;
        let token = app.user_token(Role::Administrador).await;
        let user_id = app.insert_user("v@empresa.cl", Role::Visualizador).await;

        let (status, body) = app
            .put(&format!("/api/admin/users/{}/role", user_id), Some(&token), json!({ "role": "reclutador" }))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["role"], "Reclutador");
        assert_eq!(body["data"]["permissions"].as_array().unwrap().len(), 10);

        let (status, _) = app
            .put(&format!("/api/admin/users/{}/role", user_id), Some(&token), json!({ "role": "jefe" }))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = app
            .put("/api/admin/users/missing/role", Some(&token), json!({ "role": "Reclutador" }))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_deactivated_user_loses_access() {
        let app = TestApp::new().await;
        let (admin_id, token) = app.user_with_token(Role::Administrador).await;
        let (user_id, user_token) = app.user_with_token(Role::Reclutador).await;

        let (status, body) = app
            .patch(&format!("/api/admin/users/{}/status", user_id), Some(&token), json!({ "isActive": false }))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["isActive"], false);

        let (status, _) = app.get("/api/me", Some(&user_token)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (_, body) = app.get("/api/admin/users?active=false", Some(&token)).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 1);

        let (status, _) = app
            .patch(&format!("/api/admin/users/{}/status", admin_id), Some(&token), json!({ "isActive": false }))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_delete_user_removes_auth_account_then_row() {
        let app = TestApp::new().await;
        let (admin_id, token) = app.user_with_token(Role::Administrador).await;
        let user_id = app.insert_user("borrar@empresa.cl", Role::Entrevistador).await;

        let (status, body) = app.delete(&format!("/api/admin/users/{}", admin_id), Some(&token)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No puedes eliminar tu propia cuenta");

        let (status, _) = app.delete(&format!("/api/admin/users/{}", user_id), Some(&token)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(app.auth_admin.deleted(), vec![user_id.clone()]);

        let (_, body) = app.get("/api/admin/users?role=Entrevistador", Some(&token)).await;
        assert!(body["data"].as_array().unwrap().is_empty());

        let (status, _) = app.delete(&format!("/api/admin/users/{}", user_id), Some(&token)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}

// src/admin/handlers/users.rs

use axum::{
    extract::{Extension, Path, Query},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use crate::admin::models::*;
use crate::admin::validators::{CreateUserValidator, UpdateRoleValidator};
use crate::auth::models::User;
use crate::auth::permissions::permission_strings;
use crate::auth::{AuthedUser, Permission, Role};
use crate::common::error::is_unique_violation;
use crate::common::{safe_email_log, ApiError, ApiResponse, AppState, Validator};
use crate::services::email::{welcome_email, OutgoingEmail};
use crate::services::mailer::{send_logged, EmailContext};
use crate::services::supabase_auth::NewAuthUser;

const DUPLICATE_EMAIL: &str = "Ya existe un usuario con ese email";

async fn find_user(state: &AppState, user_id: &str) -> Result<User, ApiError> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::NotFound("Usuario no encontrado".to_string()))
}

fn permissions_json(role: Role) -> String {
    serde_json::to_string(&permission_strings(role)).unwrap_or_else(|_| "[]".to_string())
}

/// POST /api/admin/create-user
pub async fn create_user(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Json(request): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let state = state_lock.read().await.clone();
    authed.require(Permission::ManageUsers)?;

    CreateUserValidator.validate(&request).into_result()?;

    let email = request.email.as_deref().unwrap_or_default().trim().to_lowercase();
    let full_name = request.full_name.as_deref().unwrap_or_default().trim().to_string();
    let role = request
        .role
        .as_deref()
        .and_then(Role::parse)
        .ok_or_else(|| ApiError::ValidationError("Rol inválido".to_string()))?;

    info!(
        admin_user_id = %authed.id,
        email = %safe_email_log(&email),
        role = role.as_str(),
        "Creating dashboard user"
    );

    let existing = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE email = ?")
        .bind(&email)
        .fetch_one(&state.db)
        .await?;
    if existing > 0 {
        warn!(email = %safe_email_log(&email), "User creation rejected: email already registered");
        return Err(ApiError::BadRequest(DUPLICATE_EMAIL.to_string()));
    }

    let auth_user = state
        .auth_admin
        .create_user(&NewAuthUser {
            email: email.clone(),
            password: request.password.clone().unwrap_or_default(),
            full_name: full_name.clone(),
            role: role.as_str().to_string(),
        })
        .await
        .map_err(|e| {
            error!(error = %e, email = %safe_email_log(&email), "Auth user creation failed");
            ApiError::from(e)
        })?;

    let inserted = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (id, email, full_name, role, permissions, created_by)
        VALUES (?, ?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(&auth_user.id)
    .bind(&email)
    .bind(&full_name)
    .bind(role.as_str())
    .bind(permissions_json(role))
    .bind(&authed.id)
    .fetch_one(&state.db)
    .await;

    let user = match inserted {
        Ok(user) => user,
        Err(e) => {
            error!(
                error = %e,
                auth_user_id = %auth_user.id,
                "Failed to store user row, removing Auth user"
            );
            if let Err(cleanup) = state.auth_admin.delete_user(&auth_user.id).await {
                error!(
                    error = %cleanup,
                    auth_user_id = %auth_user.id,
                    "Failed to remove orphaned Auth user"
                );
            }
            if is_unique_violation(&e) {
                return Err(ApiError::BadRequest(DUPLICATE_EMAIL.to_string()));
            }
            return Err(ApiError::InternalServer(
                "Error al crear el usuario en la base de datos".to_string(),
            ));
        }
    };

    if request.send_welcome_email.unwrap_or(false) {
        let rendered = welcome_email(&user.full_name, &user.role, &state.config.app_base_url);
        let sent = send_logged(
            &state.db,
            &*state.email,
            OutgoingEmail {
                to: vec![user.email.clone()],
                subject: rendered.subject,
                html: rendered.html,
                reply_to: None,
            },
            EmailContext {
                kind: "welcome",
                candidate_id: None,
                sent_by: Some(&authed.id),
            },
        )
        .await;
        if let Err(e) = sent {
            warn!(error = %e, user_id = %user.id, "Welcome email not delivered");
        }
    }

    info!(
        admin_user_id = %authed.id,
        user_id = %user.id,
        role = %user.role,
        "Dashboard user created"
    );

    Ok(ApiResponse::created(user).with_message("Usuario creado exitosamente"))
}

/// GET /api/admin/users
pub async fn list_users(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Query(query): Query<UserListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let state = state_lock.read().await.clone();
    authed.require(Permission::ManageUsers)?;

    let role = match query.role.as_deref() {
        Some(raw) => Some(
            Role::parse(raw)
                .ok_or_else(|| ApiError::ValidationError("Rol inválido".to_string()))?
                .as_str(),
        ),
        None => None,
    };

    let users = sqlx::query_as::<_, User>(
        r#"
        SELECT * FROM users
        WHERE (?1 IS NULL OR role = ?1)
          AND (?2 IS NULL OR is_active = ?2)
        ORDER BY created_at DESC, rowid DESC
        "#,
    )
    .bind(role)
    .bind(query.active)
    .fetch_all(&state.db)
    .await?;

    Ok(ApiResponse::ok(users))
}

/// PUT /api/admin/users/:id/role - Changes the role and recomputes permissions
pub async fn update_user_role(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Path(user_id): Path<String>,
    Json(request): Json<UpdateRoleRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let state = state_lock.read().await.clone();
    authed.require(Permission::ManageUsers)?;

    UpdateRoleValidator.validate(&request).into_result()?;
    let role = request
        .role
        .as_deref()
        .and_then(Role::parse)
        .ok_or_else(|| ApiError::ValidationError("Rol inválido".to_string()))?;

    let current = find_user(&state, &user_id).await?;
    if current.id == authed.id && role != Role::Administrador {
        return Err(ApiError::BadRequest(
            "No puedes quitarte el rol de administrador".to_string(),
        ));
    }

    let user = sqlx::query_as::<_, User>(
        r#"
        UPDATE users SET role = ?, permissions = ?, updated_at = datetime('now')
        WHERE id = ?
        RETURNING *
        "#,
    )
    .bind(role.as_str())
    .bind(permissions_json(role))
    .bind(&user_id)
    .fetch_one(&state.db)
    .await?;

    info!(
        admin_user_id = %authed.id,
        user_id = %user.id,
        from = %current.role,
        to = %user.role,
        "User role updated"
    );

    Ok(ApiResponse::ok(user).with_message("Rol actualizado"))
}

/// PATCH /api/admin/users/:id/status
pub async fn update_user_status(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Path(user_id): Path<String>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let state = state_lock.read().await.clone();
    authed.require(Permission::ManageUsers)?;

    let is_active = request
        .is_active
        .ok_or_else(|| ApiError::ValidationError("El campo isActive es requerido".to_string()))?;

    find_user(&state, &user_id).await?;
    if user_id == authed.id && !is_active {
        return Err(ApiError::BadRequest(
            "No puedes desactivar tu propia cuenta".to_string(),
        ));
    }

    let user = sqlx::query_as::<_, User>(
        "UPDATE users SET is_active = ?, updated_at = datetime('now') WHERE id = ? RETURNING *",
    )
    .bind(is_active)
    .bind(&user_id)
    .fetch_one(&state.db)
    .await?;

    info!(
        admin_user_id = %authed.id,
        user_id = %user.id,
        is_active,
        "User status updated"
    );

    let message = if is_active {
        "Usuario activado"
    } else {
        "Usuario desactivado"
    };
    Ok(ApiResponse::ok(user).with_message(message))
}

/// DELETE /api/admin/users/:id - Removes the Auth account, then the row
pub async fn delete_user(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    authed: AuthedUser,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let state = state_lock.read().await.clone();
    authed.require(Permission::ManageUsers)?;

    if user_id == authed.id {
        return Err(ApiError::BadRequest(
            "No puedes eliminar tu propia cuenta".to_string(),
        ));
    }
    let user = find_user(&state, &user_id).await?;

    state.auth_admin.delete_user(&user.id).await.map_err(|e| {
        error!(error = %e, user_id = %user.id, "Failed to delete Auth user");
        ApiError::from(e)
    })?;

    sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(&user.id)
        .execute(&state.db)
        .await?;

    info!(
        admin_user_id = %authed.id,
        user_id = %user.id,
        email = %safe_email_log(&user.email),
        "User deleted"
    );

    Ok(ApiResponse::message("Usuario eliminado"))
}

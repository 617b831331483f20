// src/ai_processing/handlers.rs

use axum::{
    extract::{Extension, Path},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

use super::models::*;
use super::queue::{AiQueue, NewTask, TaskOutcome};
use super::validators::{CompleteTaskValidator, EnqueueValidator};
use crate::auth::QueueCaller;
use crate::common::helpers::trimmed;
use crate::common::{ApiError, ApiResponse, AppState, Validator};

fn worker_id_or_caller(worker_id: &Option<String>, caller: &QueueCaller) -> String {
    trimmed(worker_id).unwrap_or_else(|| caller.actor_id())
}

/// POST /api/ai-processing/enqueue
pub async fn enqueue_task(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    caller: QueueCaller,
    Json(request): Json<EnqueueRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let state = state_lock.read().await.clone();

    EnqueueValidator.validate(&request).into_result()?;

    let requested_by = caller.actor_id();
    let application_id = trimmed(&request.application_id);
    let (task, created) = AiQueue::new(state.db.clone())
        .enqueue(NewTask {
            candidate_id: request.candidate_id.as_deref().unwrap_or_default().trim(),
            application_id: application_id.as_deref(),
            task_type: request.task_type.as_deref().unwrap_or_default(),
            priority: request.priority.unwrap_or(DEFAULT_PRIORITY),
            payload: request.payload.as_ref(),
            requested_by: Some(&requested_by),
        })
        .await?;

    let response = EnqueueResponse { task, created };
    Ok(if created {
        ApiResponse::created(response).with_message("Tarea encolada")
    } else {
        ApiResponse::ok(response).with_message("Ya existe una tarea pendiente para este candidato")
    })
}

/// GET /api/ai-processing/next-task - Peek without claiming
pub async fn peek_next_task(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    _caller: QueueCaller,
) -> Result<impl IntoResponse, ApiError> {
    let state = state_lock.read().await.clone();

    let task = AiQueue::new(state.db.clone()).peek().await?;
    let message = if task.is_some() {
        "Siguiente tarea disponible"
    } else {
        "No hay tareas pendientes"
    };
    Ok(ApiResponse::ok(task).with_message(message))
}

/// POST /api/ai-processing/next-task - Claim the next task
pub async fn claim_next_task(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    caller: QueueCaller,
    body: Option<Json<ClaimRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let state = state_lock.read().await.clone();

    let request = body.map(|Json(r)| r).unwrap_or_default();
    let worker_id = worker_id_or_caller(&request.worker_id, &caller);

    let task = AiQueue::new(state.db.clone()).claim_next(&worker_id).await?;
    let message = if task.is_some() {
        "Tarea asignada"
    } else {
        "No hay tareas pendientes"
    };
    Ok(ApiResponse::ok(task).with_message(message))
}

/// POST /api/ai-processing/start
pub async fn start_task(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    caller: QueueCaller,
    Json(request): Json<StartTaskRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let state = state_lock.read().await.clone();

    let task_id = trimmed(&request.task_id)
        .ok_or_else(|| ApiError::ValidationError("El id de la tarea es requerido".to_string()))?;
    let worker_id = worker_id_or_caller(&request.worker_id, &caller);

    let task = AiQueue::new(state.db.clone()).start(&task_id, &worker_id).await?;
    Ok(ApiResponse::ok(task).with_message("Tarea iniciada"))
}

/// POST /api/ai-processing/complete
pub async fn complete_task(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    _caller: QueueCaller,
    Json(request): Json<CompleteTaskRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let state = state_lock.read().await.clone();

    CompleteTaskValidator.validate(&request).into_result()?;
    let task_id = request.task_id.as_deref().unwrap_or_default().trim();

    let outcome = match (request.success, request.result) {
        (Some(true), Some(result)) => TaskOutcome::Success(result),
        _ => TaskOutcome::Failure(
            trimmed(&request.error).unwrap_or_else(|| "Error desconocido".to_string()),
        ),
    };

    let completed = AiQueue::new(state.db.clone()).complete(task_id, outcome).await?;
    let message = match completed.task.status.as_str() {
        "completed" => "Tarea completada",
        "pending" => "Tarea fallida, se reintentará",
        _ => "Tarea fallida",
    };
    Ok(ApiResponse::ok(completed).with_message(message))
}

/// GET /api/ai-processing/tasks/:id
pub async fn get_task(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    _caller: QueueCaller,
    Path(task_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let state = state_lock.read().await.clone();

    let task = AiQueue::new(state.db.clone()).get(&task_id).await?;
    Ok(ApiResponse::ok(task))
}

/// GET /api/ai-processing/stats
pub async fn queue_stats(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    _caller: QueueCaller,
) -> Result<impl IntoResponse, ApiError> {
    let state = state_lock.read().await.clone();

    let stats = AiQueue::new(state.db.clone()).stats().await?;
    Ok(ApiResponse::ok(stats))
}

/// POST /api/ai-processing/process-next - Claim and analyze in-process
pub async fn process_next(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    caller: QueueCaller,
) -> Result<impl IntoResponse, ApiError> {
    let state = state_lock.read().await.clone();

    let worker_id = format!("api:{}", caller.actor_id());
    let completed = AiQueue::new(state.db.clone())
        .process_next(&*state.ai, &worker_id)
        .await?;

    match &completed {
        Some(done) => info!(task_id = %done.task.id, status = %done.task.status, "Processed AI task on request"),
        None => info!("process-next called with an empty queue"),
    }
    let message = if completed.is_some() {
        "Tarea procesada"
    } else {
        "No hay tareas pendientes"
    };
    Ok(ApiResponse::ok(completed).with_message(message))
}

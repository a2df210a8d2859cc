//! HTTP review surface: drafts, tasks, and manual scan triggers.
//!
//! Transport-thin by design — every handler delegates to the review,
//! task, or scanner services, which own the semantics.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::ingest::BatchReport;
use crate::models::draft::{Draft, DraftEdits};
use crate::models::task::{EnergyLevel, RecurrenceRule, Task, Workspace};
use crate::persistence::draft_repo::DraftRepo;
use crate::review::{BulkOutcome, ReviewService};
use crate::scheduler::Scanner;
use crate::tasks::{CompletionOutcome, TaskService};
use crate::{AppError, Result};

/// Shared state handed to every handler.
pub struct AppState {
    /// Draft review service.
    pub review: ReviewService,
    /// Task service.
    pub tasks: TaskService,
    /// Draft store for list queries.
    pub drafts: DraftRepo,
    /// Scan orchestration for manual triggers.
    pub scanner: Arc<Scanner>,
}

/// JSON error body with a status mapped from the error taxonomy.
struct ApiError(AppError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::AlreadyDecided(_) => StatusCode::CONFLICT,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Source(_) | AppError::Extraction(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(serde_json::json!({ "error": self.0.to_string() }));
        (status, body).into_response()
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

/// Manual task entry payload.
#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    /// Task title.
    pub title: String,
    /// Optional description.
    pub description: Option<String>,
    /// Workspace bucket.
    pub workspace: Workspace,
    /// Energy demand.
    pub energy: EnergyLevel,
    /// Estimated duration in minutes.
    pub estimated_minutes: Option<u32>,
    /// Tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Due timestamp.
    pub due_at: Option<DateTime<Utc>>,
    /// Recurrence rule.
    pub recurrence: Option<RecurrenceRule>,
}

/// Bulk review action.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BulkAction {
    /// Approve every listed draft.
    Approve,
    /// Reject every listed draft.
    Reject,
}

/// Bulk review payload.
#[derive(Debug, Deserialize)]
pub struct BulkRequest {
    /// Operation to apply.
    pub action: BulkAction,
    /// Draft ids to apply it to.
    pub ids: Vec<String>,
}

/// Snooze payload.
#[derive(Debug, Deserialize)]
pub struct SnoozeRequest {
    /// Hide the task until this timestamp.
    pub until: DateTime<Utc>,
}

/// Build the application router.
#[must_use]
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/users/{user_id}/drafts", get(list_drafts))
        .route("/users/{user_id}/tasks", get(list_tasks).post(create_task))
        .route("/drafts/{id}/approve", post(approve_draft))
        .route("/drafts/{id}/reject", post(reject_draft))
        .route("/drafts/{id}/edit", post(edit_draft))
        .route("/drafts/bulk", post(bulk_review))
        .route("/tasks/{id}/complete", post(complete_task))
        .route("/tasks/{id}/snooze", post(snooze_task))
        .route("/integrations/{id}/scan", post(scan_integration))
        .with_state(state)
}

/// Serve the review surface until the token is cancelled.
///
/// # Errors
///
/// Returns `AppError::Http` if the server fails to bind.
pub async fn serve(state: Arc<AppState>, port: u16, cancel: CancellationToken) -> Result<()> {
    let bind = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .map_err(|err| AppError::Http(format!("failed to bind {bind}: {err}")))?;
    info!(%bind, "review surface listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(cancel.cancelled_owned())
        .await
        .map_err(|err| AppError::Http(format!("server error: {err}")))
}

/// Handler for `GET /health` — returns 200 OK with a plain-text body.
async fn health() -> &'static str {
    "ok"
}

async fn list_drafts(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<Vec<Draft>>> {
    Ok(Json(state.drafts.list_pending_for_user(&user_id).await?))
}

async fn list_tasks(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<Vec<Task>>> {
    Ok(Json(state.tasks.list(&user_id).await?))
}

async fn create_task(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Json(req): Json<CreateTaskRequest>,
) -> ApiResult<Json<Task>> {
    let mut task = Task::new(user_id, req.title, req.workspace, req.energy);
    task.description = req.description;
    task.estimated_minutes = req.estimated_minutes;
    task.tags = req.tags;
    task.due_at = req.due_at;
    task.recurrence = req.recurrence;
    Ok(Json(state.tasks.create(&task).await?))
}

async fn approve_draft(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    edits: Option<Json<DraftEdits>>,
) -> ApiResult<Json<Task>> {
    let edits = edits.map(|Json(e)| e);
    Ok(Json(state.review.approve(&id, edits).await?))
}

async fn reject_draft(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.review.reject(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn edit_draft(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(edits): Json<DraftEdits>,
) -> ApiResult<Json<Draft>> {
    Ok(Json(state.review.edit(&id, &edits).await?))
}

async fn bulk_review(
    State(state): State<Arc<AppState>>,
    Json(req): Json<BulkRequest>,
) -> ApiResult<Json<Vec<BulkOutcome>>> {
    let outcomes = match req.action {
        BulkAction::Approve => state.review.approve_many(&req.ids).await,
        BulkAction::Reject => state.review.reject_many(&req.ids).await,
    };
    Ok(Json(outcomes))
}

async fn complete_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<CompletionOutcome>> {
    Ok(Json(state.tasks.complete(&id).await?))
}

async fn snooze_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<SnoozeRequest>,
) -> ApiResult<Json<Task>> {
    Ok(Json(state.tasks.snooze(&id, req.until).await?))
}

async fn scan_integration(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<BatchReport>> {
    Ok(Json(state.scanner.scan_now(&id).await?))
}

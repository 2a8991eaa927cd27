//! Axum route handlers for the submission API.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::document::DOCX_MIME;
use crate::errors::AppError;
use crate::form::answers::ExitInterviewAnswers;
use crate::state::AppState;
use crate::submission::pipeline::process_submission;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    /// Form session; a new one is opened when absent.
    #[serde(default)]
    pub session_id: Option<Uuid>,
    pub answers: ExitInterviewAnswers,
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub session_id: Uuid,
    pub submitted: bool,
    pub file_name: String,
    pub download_url: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct SessionStatusResponse {
    pub session_id: Uuid,
    pub submitted: bool,
    pub file_name: Option<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/submissions
///
/// Validates the answers, fills the template and mails it to HR. On success
/// the session is closed for further submissions and the document becomes
/// downloadable.
pub async fn handle_submit(
    State(state): State<AppState>,
    payload: Result<Json<SubmitRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SubmitResponse>), AppError> {
    let Json(request) = payload?;
    let session_id = request.session_id.unwrap_or_else(Uuid::new_v4);
    let receipt = process_submission(&state, session_id, request.answers).await?;

    Ok((
        StatusCode::CREATED,
        Json(SubmitResponse {
            session_id,
            submitted: true,
            file_name: receipt.file_name(),
            download_url: download_url(session_id),
            message: "Feedback form submitted successfully.".to_string(),
        }),
    ))
}

/// GET /api/v1/sessions/:session_id
pub async fn handle_session_status(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionStatusResponse>, AppError> {
    let session = state
        .sessions
        .get(session_id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Session {session_id} not found")))?;

    Ok(Json(SessionStatusResponse {
        session_id,
        submitted: session.submitted,
        file_name: session
            .document
            .as_deref()
            .and_then(|path| path.file_name())
            .map(|name| name.to_string_lossy().into_owned()),
    }))
}

/// GET /api/v1/sessions/:session_id/document
///
/// Returns the filled document of a completed submission.
pub async fn handle_download(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let document = state
        .sessions
        .get(session_id)
        .await
        .and_then(|session| session.document)
        .ok_or_else(|| {
            AppError::NotFound(format!("No submitted document for session {session_id}"))
        })?;

    let body = match tokio::fs::read(&document).await {
        Ok(bytes) => Bytes::from(bytes),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(AppError::NotFound(format!(
                "Document {} is no longer available",
                document.display()
            )));
        }
        Err(e) => return Err(AppError::Internal(e.into())),
    };

    let file_name = document
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    Ok((
        [
            (header::CONTENT_TYPE, DOCX_MIME.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            ),
        ],
        body,
    )
        .into_response())
}

fn download_url(session_id: Uuid) -> String {
    format!("/api/v1/sessions/{session_id}/document")
}

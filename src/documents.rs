//! Owner-scoped document endpoints.
//!
//! Every handler takes an [`AuthUser`], so a request without a live session is
//! rejected with `AUTH_REQUIRED` before it reaches the store.

use crate::app::{AppState, SharedState};
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::models::{
    parse_tag_field, CreateUrlDocumentRequest, DeleteDocumentResponse, Document,
    UpdateDocumentRequest,
};
use axum::body::Bytes;
use axum::extract::multipart::MultipartError;
use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use tracing::{info, warn};

const OCTET_STREAM: &str = "application/octet-stream";

fn not_found() -> ApiError {
    ApiError::NotFound("Document not found".to_string())
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(err.body_text())
    } else {
        ApiError::BadRequest(format!("Invalid upload: {}", err.body_text()))
    }
}

pub async fn list_documents(
    State(state): State<SharedState>,
    user: AuthUser,
) -> Json<Vec<Document>> {
    Json(state.documents.list_for_owner(&user.user_id).await)
}

pub async fn get_document(
    State(state): State<SharedState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Document>, ApiError> {
    state
        .documents
        .get(&id, &user.user_id)
        .await
        .map(Json)
        .ok_or_else(not_found)
}

struct UploadedPayload {
    file_name: String,
    content_type: Option<String>,
    data: Bytes,
}

/// Accepts `multipart/form-data` with a required `file` part and optional
/// `name` and `tags` parts.
pub async fn upload_document(
    State(state): State<SharedState>,
    user: AuthUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<Document>), ApiError> {
    let mut multipart = multipart.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let mut payload: Option<UploadedPayload> = None;
    let mut name: Option<String> = None;
    let mut tags: Vec<String> = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let field_name = field.name().map(|n| n.to_string());
        match field_name.as_deref() {
            Some("file") => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().map(|c| c.to_string());
                let data = field.bytes().await.map_err(multipart_error)?;

                // browsers send an empty, nameless part when no file was picked
                if file_name.is_empty() && data.is_empty() {
                    continue;
                }
                payload = Some(UploadedPayload {
                    file_name,
                    content_type,
                    data,
                });
            }
            Some("name") => name = Some(field.text().await.map_err(multipart_error)?),
            Some("tags") => tags = parse_tag_field(&field.text().await.map_err(multipart_error)?),
            _ => {}
        }
    }

    let payload = payload.ok_or_else(|| ApiError::BadRequest("No file uploaded".to_string()))?;
    let file_name = if payload.file_name.is_empty() {
        "upload".to_string()
    } else {
        payload.file_name
    };
    let mime_type = resolve_mime(payload.content_type.as_deref(), &file_name);
    let name = name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| file_name.clone());

    let stored = state
        .files
        .save(&file_name, &payload.data)
        .await
        .map_err(|e| ApiError::upstream("Failed to store uploaded file", e))?;

    let document = Document::new_file(
        user.user_id,
        name,
        stored.path.clone(),
        stored.size,
        mime_type,
        tags,
    );

    let document = match state.documents.insert(document).await {
        Ok(document) => document,
        Err(e) => {
            if let Err(cleanup) = state.files.remove(&stored.path).await {
                warn!(path = %stored.path, error = %format!("{cleanup:#}"), "orphaned upload left on disk");
            }
            return Err(ApiError::upstream("Failed to save document", e));
        }
    };

    let document = run_processor(&state, document).await;
    info!(id = %document.id, kind = ?document.kind, bytes = stored.size, "document uploaded");

    Ok((StatusCode::CREATED, Json(document)))
}

async fn run_processor(state: &AppState, document: Document) -> Document {
    let processed = match state.processor.process(&document).await {
        Ok(processed) => processed,
        Err(e) => {
            warn!(id = %document.id, error = %format!("{e:#}"), "document processing failed");
            return document;
        }
    };

    match state
        .documents
        .set_processed(&document.id, &document.owner, processed)
        .await
    {
        Ok(Some(updated)) => updated,
        Ok(None) => document,
        Err(e) => {
            warn!(id = %document.id, error = %format!("{e:#}"), "failed to record processing result");
            document
        }
    }
}

/// The declared content type, unless it is missing or generic, in which case
/// the file name decides.
pub fn resolve_mime(declared: Option<&str>, file_name: &str) -> String {
    match declared.map(str::trim) {
        Some(mime) if !mime.is_empty() && !mime.eq_ignore_ascii_case(OCTET_STREAM) => {
            mime.to_string()
        }
        _ => mime_guess::from_path(file_name)
            .first_or_octet_stream()
            .essence_str()
            .to_string(),
    }
}

pub async fn create_url_document(
    State(state): State<SharedState>,
    user: AuthUser,
    payload: Result<Json<CreateUrlDocumentRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Document>), ApiError> {
    let Json(payload) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let name = payload.name.as_deref().map(str::trim).unwrap_or_default();
    let url = payload.url.as_deref().map(str::trim).unwrap_or_default();
    if name.is_empty() || url.is_empty() {
        return Err(ApiError::BadRequest("Name and URL are required".to_string()));
    }

    let document = Document::new_link(user.user_id, name.to_string(), url.to_string(), payload.tags);
    let document = state
        .documents
        .insert(document)
        .await
        .map_err(|e| ApiError::upstream("Failed to save document", e))?;

    info!(id = %document.id, "url document created");
    Ok((StatusCode::CREATED, Json(document)))
}

pub async fn update_document(
    State(state): State<SharedState>,
    user: AuthUser,
    Path(id): Path<String>,
    payload: Result<Json<UpdateDocumentRequest>, JsonRejection>,
) -> Result<Json<Document>, ApiError> {
    let Json(payload) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let name = match payload.name {
        Some(name) if name.trim().is_empty() => {
            return Err(ApiError::BadRequest("Name cannot be empty".to_string()));
        }
        Some(name) => Some(name.trim().to_string()),
        None => None,
    };

    state
        .documents
        .update(&id, &user.user_id, name, payload.tags)
        .await
        .map_err(|e| ApiError::upstream("Failed to update document", e))?
        .map(Json)
        .ok_or_else(not_found)
}

/// Tombstones the record, then removes its file and the record itself. If the
/// second step fails the reaper finishes it later; the document is already
/// gone as far as the owner can tell.
pub async fn delete_document(
    State(state): State<SharedState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<DeleteDocumentResponse>, ApiError> {
    let document = state
        .documents
        .mark_pending_delete(&id, &user.user_id)
        .await
        .map_err(|e| ApiError::upstream("Failed to delete document", e))?
        .ok_or_else(not_found)?;

    match finish_delete(&state, &document).await {
        Ok(_) => info!(id = %document.id, "document deleted"),
        Err(e) => warn!(id = %document.id, error = %format!("{e:#}"), "delete deferred to reaper"),
    }

    Ok(Json(DeleteDocumentResponse {
        message: "Document deleted successfully".to_string(),
        id,
    }))
}

/// Removes a tombstoned document's backing file (if any), then its record.
/// Returns `false` when the record was already purged by someone else.
pub async fn finish_delete(state: &AppState, document: &Document) -> anyhow::Result<bool> {
    if let Some(path) = document.file_path() {
        state.files.remove(path).await?;
    }
    state.documents.purge(&document.id, &document.owner).await
}

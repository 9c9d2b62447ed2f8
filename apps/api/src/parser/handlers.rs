//! HTTP surface for upload and extraction.

use std::convert::Infallible;
use std::pin::Pin;

use axum::extract::{Multipart, Query, State};
use axum::response::sse::{Event, Sse};
use axum::Json;
use futures::Stream;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tracing::info;

use crate::documents::{allowed_file, extract_text};
use crate::errors::AppError;
use crate::parser::events::{ProgressEvent, Step};
use crate::parser::{ProgressiveParser, EXTRACTION_STEPS};
use crate::state::AppState;

type SseStream = Pin<Box<dyn Stream<Item = Result<Event, Infallible>> + Send>>;

/// Buffer for one run's worth of progress events; the producer never
/// blocks on a slow consumer for a run this size.
const EVENT_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Deserialize)]
pub struct ParseRequest {
    pub filename: String,
}

#[derive(Debug, Deserialize)]
pub struct StreamQuery {
    pub filename: String,
}

/// POST /api/v1/upload
/// Accepts one multipart `file` field and stores it under the uploads
/// directory with a sanitized name. The body limit rejects oversized
/// payloads before this handler runs.
pub async fn handle_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<Value>, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let original = field.file_name().unwrap_or_default().to_string();
        if original.is_empty() {
            return Err(AppError::Validation("No file selected".to_string()));
        }
        if !allowed_file(&original) {
            return Err(AppError::Validation(
                "Invalid file type. Please upload TXT, PDF, DOC, or DOCX files.".to_string(),
            ));
        }

        let filename = sanitize_filename(&original);
        if filename.is_empty() {
            return Err(AppError::Validation("Invalid filename".to_string()));
        }

        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Failed to read upload: {e}")))?;

        tokio::fs::create_dir_all(&state.config.upload_dir)
            .await
            .map_err(|e| AppError::Internal(e.into()))?;
        let path = state.config.upload_dir.join(&filename);
        tokio::fs::write(&path, &data)
            .await
            .map_err(|e| AppError::Internal(e.into()))?;

        info!(filename = %filename, bytes = data.len(), "stored upload");
        return Ok(Json(json!({ "success": true, "filename": filename })));
    }

    Err(AppError::Validation("No file provided".to_string()))
}

/// POST /api/v1/parse
/// Runs the full progressive extraction synchronously and returns the
/// assembled candidate mapping. Intermediate events are discarded.
pub async fn handle_parse(
    State(state): State<AppState>,
    Json(req): Json<ParseRequest>,
) -> Result<Json<Value>, AppError> {
    let parser = build_parser(&state, &req.filename)?;

    // No consumer: sends are ignored and the run is unaffected.
    let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    drop(rx);
    let outcome = parser.run(tx).await;

    if outcome.step_errors.len() == EXTRACTION_STEPS.len() {
        let detail = outcome
            .step_errors
            .first()
            .map(|(_, msg)| msg.clone())
            .unwrap_or_default();
        return Err(AppError::Model(format!(
            "every extraction step failed; first error: {detail}"
        )));
    }

    Ok(Json(json!({
        "success": true,
        "candidate": outcome.candidate_data,
        "file_saved": outcome.file_saved.map(|p| p.display().to_string()),
    })))
}

/// GET /api/v1/parse/stream?filename=…
/// Relays orchestrator progress as one SSE message per event. Pre-flight
/// failures produce a single synthetic `error` event. A client disconnect
/// drops the relay but never aborts the run.
pub async fn handle_parse_stream(
    State(state): State<AppState>,
    Query(query): Query<StreamQuery>,
) -> Sse<SseStream> {
    let parser = match build_parser(&state, &query.filename) {
        Ok(parser) => parser,
        Err(err) => {
            let event = ProgressEvent::error(Step::Initialize, err.to_string());
            let stream: SseStream = Box::pin(async_stream::stream! {
                yield Ok::<_, Infallible>(to_sse_event(&event));
            });
            return Sse::new(stream);
        }
    };

    let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    tokio::spawn(parser.run(tx));

    let stream: SseStream =
        Box::pin(ReceiverStream::new(rx).map(|event| Ok(to_sse_event(&event))));
    Sse::new(stream)
}

fn to_sse_event(event: &ProgressEvent) -> Event {
    Event::default().data(serde_json::to_string(event).unwrap_or_default())
}

/// Validates the requested filename against the uploads directory and
/// extracts its text. Rejects anything that does not round-trip through
/// sanitization, so path traversal never reaches the filesystem.
fn build_parser(state: &AppState, filename: &str) -> Result<ProgressiveParser, AppError> {
    if filename.is_empty() {
        return Err(AppError::Validation("Missing filename".to_string()));
    }
    if sanitize_filename(filename) != filename {
        return Err(AppError::Validation("Invalid filename".to_string()));
    }

    let path = state.config.upload_dir.join(filename);
    let cv_text = extract_text(&path)?;

    Ok(ProgressiveParser::new(
        cv_text,
        filename.to_string(),
        state.config.parsed_dir.clone(),
        state.config.step_timeout,
        state.invoker.clone(),
    ))
}

/// Keeps the final path component, restricted to `[A-Za-z0-9._-]`, with
/// leading dots stripped.
fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    cleaned.trim_start_matches('.').to_string()
}

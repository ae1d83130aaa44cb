//! Speech endpoints: statement catalog, audio retrieval, cache control

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use serde::{Deserialize, Serialize};

use super::ApiState;
use crate::Error;
use crate::catalog::Language;
use crate::speech::{AudioHandle, CacheStats, InitPhase};

/// Build speech router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/statements", get(list_statements))
        .route("/statements/{id}/audio", get(statement_audio))
        .route("/speech", post(speak))
        .route("/speech/status", get(status))
        .route("/speech/cache", delete(clear_cache))
        .with_state(state)
}

/// Query parameters for the statement listing
#[derive(Debug, Deserialize)]
pub struct StatementsQuery {
    pub lang: Option<String>,
}

/// Statement as shown to the UI
#[derive(Debug, Serialize)]
pub struct StatementInfo {
    pub id: String,
    pub title: String,
    pub text: String,
    pub cached: bool,
}

/// Response for listing statements
#[derive(Debug, Serialize)]
pub struct StatementListResponse {
    pub lang: Language,
    pub statements: Vec<StatementInfo>,
}

/// List catalog statements with titles in the requested language
async fn list_statements(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<StatementsQuery>,
) -> Result<Json<StatementListResponse>, SpeechApiError> {
    let lang = match query.lang.as_deref() {
        Some(raw) => raw
            .parse::<Language>()
            .map_err(|_| SpeechApiError::BadRequest("unsupported language"))?,
        None => Language::default(),
    };

    let statements = state
        .speech
        .catalog()
        .iter()
        .map(|s| StatementInfo {
            id: s.id.clone(),
            title: s.title.get(lang).to_string(),
            text: s.text.clone(),
            cached: state.speech.cached(&s.text).is_some(),
        })
        .collect();

    Ok(Json(StatementListResponse { lang, statements }))
}

/// Audio for a catalog statement
async fn statement_audio(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
) -> Result<Response, SpeechApiError> {
    let text = state
        .speech
        .catalog()
        .get(&id)
        .map(|s| s.text.clone())
        .ok_or(SpeechApiError::NotFound("unknown statement"))?;

    let handle = state.speech.get_audio(&text).await?;
    audio_response(&handle)
}

/// Synthesis request
#[derive(Debug, Deserialize)]
pub struct SpeakRequest {
    pub text: String,
}

/// Audio for arbitrary text
///
/// Returns audio in MP3 format
async fn speak(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<SpeakRequest>,
) -> Result<Response, SpeechApiError> {
    let handle = state.speech.get_audio(&request.text).await?;
    audio_response(&handle)
}

/// Cache status response
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    #[serde(flatten)]
    pub stats: CacheStats,
    pub init_phase: InitPhase,
}

async fn status(State(state): State<Arc<ApiState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        stats: state.speech.stats(),
        init_phase: state.speech.init_phase(),
    })
}

/// Cache clear response
#[derive(Debug, Serialize)]
pub struct ClearResponse {
    pub released: usize,
}

async fn clear_cache(State(state): State<Arc<ApiState>>) -> Json<ClearResponse> {
    Json(ClearResponse {
        released: state.speech.clear(),
    })
}

fn audio_response(handle: &AudioHandle) -> Result<Response, SpeechApiError> {
    // A concurrent clear can revoke the handle between lookup and response
    let bytes = handle
        .bytes()
        .ok_or(SpeechApiError::Released("audio was released, retry the request"))?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, handle.mime_type()),
            (header::CACHE_CONTROL, "private, max-age=3600"),
        ],
        bytes.to_vec(),
    )
        .into_response())
}

/// Speech API errors
#[derive(Debug)]
pub enum SpeechApiError {
    BadRequest(&'static str),
    NotFound(&'static str),
    /// Handle revoked by a concurrent cache clear (409)
    Released(&'static str),
    SynthesisFailed(String),
    Internal(String),
}

impl From<Error> for SpeechApiError {
    fn from(e: Error) -> Self {
        match e {
            Error::InvalidText(_) => Self::BadRequest("text must not be empty"),
            Error::Synthesis(_) => Self::SynthesisFailed(e.to_string()),
            other => Self::Internal(other.to_string()),
        }
    }
}

/// JSON error envelope shared by all API errors
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

impl IntoResponse for SpeechApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.to_string()),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.to_string()),
            Self::Released(msg) => (StatusCode::CONFLICT, "released", msg.to_string()),
            Self::SynthesisFailed(msg) => (StatusCode::BAD_GATEWAY, "synthesis_failed", msg),
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "internal", msg),
        };

        if status.is_server_error() {
            tracing::warn!(%status, code, message = %message, "speech request failed");
        }

        (
            status,
            Json(ErrorResponse {
                error: ErrorBody { code, message },
            }),
        )
            .into_response()
    }
}

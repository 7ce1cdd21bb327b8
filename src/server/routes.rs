use std::sync::Arc;

use anyhow::Context as _;
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tokio::sync::Semaphore;

use crate::{
    artifact::output::OUTPUT_CONTENT_TYPE,
    foundation::error::{FailureKind, FilmgrainError, PipelineFailure},
    pipeline::orchestrator::Pipeline,
    server::{config::ServerConfig, form::ProcessForm},
};

/// File name suggested to clients for the grained image.
pub const OUTPUT_FILE_NAME: &str = "grained.png";

#[derive(Clone)]
struct AppState {
    pipeline: Arc<Pipeline>,
    permits: Option<Arc<Semaphore>>,
}

/// Build the HTTP router: `GET /health` and `POST /process`.
pub fn router(pipeline: Arc<Pipeline>, config: &ServerConfig) -> Router {
    let state = AppState {
        pipeline,
        permits: config
            .max_concurrent
            .map(|n| Arc::new(Semaphore::new(n.max(1)))),
    };

    Router::new()
        .route("/health", get(health))
        .route("/process", post(process))
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .with_state(state)
}

/// Bind `config.bind` and serve until Ctrl-C.
pub async fn serve(pipeline: Arc<Pipeline>, config: ServerConfig) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("bind {}", config.bind))?;
    tracing::info!(addr = %listener.local_addr()?, "filmgrain listening");

    axum::serve(listener, router(pipeline, &config))
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %err, "failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
            tracing::info!("shutting down");
        })
        .await
        .context("http server")?;
    Ok(())
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn process(State(state): State<AppState>, multipart: Multipart) -> Response {
    match run_process(state, multipart).await {
        Ok(bytes) => (
            [
                (header::CONTENT_TYPE, OUTPUT_CONTENT_TYPE.to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{OUTPUT_FILE_NAME}\""),
                ),
            ],
            bytes,
        )
            .into_response(),
        Err(err) => ApiError::from(err).into_response(),
    }
}

async fn run_process(state: AppState, multipart: Multipart) -> Result<Vec<u8>, FilmgrainError> {
    let form = ProcessForm::from_multipart(multipart).await?;

    let _permit = match &state.permits {
        Some(permits) => Some(
            Arc::clone(permits)
                .acquire_owned()
                .await
                .context("pipeline semaphore closed")?,
        ),
        None => None,
    };

    let pipeline = Arc::clone(&state.pipeline);
    tokio::task::spawn_blocking(move || {
        let image = pipeline.apply_grain(&form.source, &form.params)?;
        // The response carries the bytes, so the output file is done with once read.
        image.into_bytes()
    })
    .await
    .context("pipeline task panicked")?
}

/// A pipeline failure rendered as an HTTP response.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    failure: PipelineFailure,
}

impl ApiError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        self.status
    }
}

/// HTTP status used for each failure kind.
pub fn status_for(kind: FailureKind) -> StatusCode {
    match kind {
        FailureKind::Validation => StatusCode::BAD_REQUEST,
        FailureKind::Decode => StatusCode::UNPROCESSABLE_ENTITY,
        FailureKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
        FailureKind::Launch
        | FailureKind::ToolExecution
        | FailureKind::Resource
        | FailureKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<FilmgrainError> for ApiError {
    fn from(err: FilmgrainError) -> Self {
        let failure = err.failure();
        let status = status_for(failure.kind);
        if status.is_server_error() {
            tracing::error!(kind = ?failure.kind, detail = %failure.detail, "request failed");
        } else {
            tracing::info!(kind = ?failure.kind, detail = %failure.detail, "request rejected");
        }
        Self { status, failure }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.failure)).into_response()
    }
}

//! HTTP API serving speech audio to UI clients

pub mod health;
pub mod rate_limit;
pub mod speech;

use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::Result;
use crate::speech::SpeechCache;
use rate_limit::SharedLimiter;

/// Shared state for API handlers
#[derive(Clone)]
pub struct ApiState {
    pub speech: SpeechCache,
    pub rate_limiter: Option<SharedLimiter>,
}

impl ApiState {
    /// State with no request limiter
    #[must_use]
    pub const fn new(speech: SpeechCache) -> Self {
        Self {
            speech,
            rate_limiter: None,
        }
    }

    /// Limit API requests to `requests_per_minute` across all clients
    #[must_use]
    pub fn with_rate_limit(mut self, requests_per_minute: u32) -> Self {
        self.rate_limiter = Some(rate_limit::create_limiter(requests_per_minute));
        self
    }
}

/// Build the full API router
pub fn router(state: Arc<ApiState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = speech::router(state.clone()).layer(axum::middleware::from_fn_with_state(
        state,
        rate_limit::rate_limit_middleware,
    ));

    Router::new()
        .merge(health::router())
        .nest("/api", api)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// API server
pub struct ApiServer {
    state: Arc<ApiState>,
    port: u16,
}

impl ApiServer {
    #[must_use]
    pub fn new(state: ApiState, port: u16) -> Self {
        Self {
            state: Arc::new(state),
            port,
        }
    }

    /// Run the API server until Ctrl-C
    ///
    /// # Errors
    ///
    /// Returns error if server fails to bind or run
    pub async fn run(self) -> Result<()> {
        let addr = format!("0.0.0.0:{}", self.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| crate::Error::Config(format!("failed to bind API server: {e}")))?;

        tracing::info!(port = self.port, "API server listening");

        axum::serve(listener, router(self.state))
            .with_graceful_shutdown(async {
                tokio::signal::ctrl_c().await.ok();
                tracing::info!("shutting down API server");
            })
            .await
            .map_err(|e| crate::Error::Config(format!("API server error: {e}")))?;

        Ok(())
    }

    /// Run the API server in a background task
    #[must_use]
    pub fn spawn(self) -> tokio::task::JoinHandle<Result<()>> {
        tokio::spawn(async move { self.run().await })
    }
}

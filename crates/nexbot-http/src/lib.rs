//! Small read-only HTTP API next to the bot.
//!
//! Every failure is rendered by the core error boundary, so the JSON error shape matches
//! what the boundary logs.

use std::{
    net::{IpAddr, SocketAddr},
    sync::Arc,
};

use axum::{
    extract::{Path, State},
    http::{Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio_util::sync::CancellationToken;

use nexbot_core::{
    config::Config,
    interaction::{
        boundary::{ApiResponse, ErrorBoundary},
        error::{CaughtError, HttpError},
    },
    polls::{PollStore, PollSummary},
    services::Services,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpConfig {
    pub port: u16,
    pub bind_address: IpAddr,
}

impl HttpConfig {
    /// `None` when no port is configured; the API is then not served.
    pub fn from_config(cfg: &Config) -> Option<Self> {
        cfg.http_port.map(|port| Self {
            port,
            bind_address: cfg.http_bind_address,
        })
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.port)
    }
}

#[derive(Clone)]
pub struct HttpState {
    pub polls: Arc<PollStore>,
    pub boundary: ErrorBoundary,
}

impl HttpState {
    pub fn from_services(services: &Services) -> Self {
        Self {
            polls: services.polls.clone(),
            boundary: services.boundary.clone(),
        }
    }

    fn reject(&self, err: impl Into<CaughtError>) -> Response {
        into_response(self.boundary.handle_api(err.into()))
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

pub fn router(state: HttpState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/polls/{id}", get(poll))
        .fallback(not_found)
        .with_state(state)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

async fn poll(State(state): State<HttpState>, Path(id): Path<String>) -> Response {
    match state.polls.get(&id) {
        Some(p) => {
            let summary: PollSummary = p.summary(Utc::now());
            Json(summary).into_response()
        }
        None => state.reject(HttpError::not_found(format!("Poll {id} not found"))),
    }
}

async fn not_found(State(state): State<HttpState>, method: Method, uri: Uri) -> Response {
    let message = format!("Cannot {method} {}", uri.path());
    let body = json!({ "statusCode": 404, "message": message, "error": "Not Found" });
    state.reject(HttpError::not_found(message).with_body(body))
}

fn into_response(resp: ApiResponse) -> Response {
    let status =
        StatusCode::from_u16(resp.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(resp.body)).into_response()
}

/// Serve until `shutdown` is cancelled.
pub async fn serve(
    config: HttpConfig,
    state: HttpState,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("HTTP API listening on http://{addr}");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    Ok(())
}

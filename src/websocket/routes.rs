//! Router assembly and process-level `run_server` entry point.
//!
//! CORS-origin parsing kept verbatim from the teacher (`create_router`'s origin-list
//! handling is domain-agnostic); routes retargeted to the lobby/room attach paths and the
//! `AppState` this crate actually carries.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;

use crate::config::Config;
use crate::server::AppState;

use super::handler::{lobby_handler, room_handler};

/// Builds the axum router: `/ws/lobby`, `/ws/room/{code}`, `/health`, `/metrics`.
pub fn create_router(cors_origins: &str) -> axum::Router<Arc<AppState>> {
    use tower_http::cors::{Any, CorsLayer};
    use tower_http::trace::TraceLayer;

    let cors = if cors_origins == "*" {
        CorsLayer::permissive()
    } else {
        let origins: Vec<_> = cors_origins
            .split(',')
            .filter_map(|s| s.trim().parse::<axum::http::HeaderValue>().ok())
            .collect();

        if origins.is_empty() {
            tracing::warn!("no valid CORS origins configured, using permissive CORS");
            CorsLayer::permissive()
        } else {
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods(Any)
                .allow_headers(Any)
        }
    };

    axum::Router::new()
        .route("/ws/lobby", get(lobby_handler))
        .route("/ws/room/{code}", get(room_handler))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

async fn health_check(State(state): State<Arc<AppState>>) -> axum::response::Result<&'static str> {
    if state.storage.health_check().await {
        Ok("OK")
    } else {
        Err(axum::http::StatusCode::SERVICE_UNAVAILABLE.into())
    }
}

async fn metrics_handler(
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> axum::response::Result<axum::Json<crate::metrics::MetricsSnapshot>> {
    if state.config.security.require_metrics_auth {
        enforce_metrics_auth(&headers, &state)?;
    }
    Ok(axum::Json(state.metrics.snapshot()))
}

fn enforce_metrics_auth(headers: &HeaderMap, state: &AppState) -> Result<(), StatusCode> {
    let Some(raw_header) = headers.get(AUTHORIZATION).and_then(|value| value.to_str().ok()) else {
        tracing::warn!("unauthorized metrics access attempt: missing Authorization header");
        return Err(StatusCode::UNAUTHORIZED);
    };

    let Some(token) = raw_header.strip_prefix("Bearer ") else {
        tracing::warn!("unauthorized metrics access attempt: invalid Authorization scheme");
        return Err(StatusCode::UNAUTHORIZED);
    };

    if let Some(expected) = state.config.security.metrics_auth_token.as_deref() {
        if token == expected {
            return Ok(());
        }
    }

    tracing::warn!("unauthorized metrics access attempt: token rejected");
    Err(StatusCode::UNAUTHORIZED)
}

/// Builds `AppState` from `config`, binds `addr`, and serves until the process is signalled.
pub async fn run_server(addr: SocketAddr, config: Config) -> anyhow::Result<()> {
    let cors_origins = config.security.cors_origins.clone();
    let state = AppState::new(config);

    let app = create_router(&cors_origins).with_state(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "starting dicee server");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn state_with_metrics_auth(token: Option<&str>) -> Arc<AppState> {
        let mut config = Config::default();
        config.security.require_metrics_auth = true;
        config.security.metrics_auth_token = token.map(str::to_string);
        AppState::new(config)
    }

    #[test]
    fn metrics_auth_rejects_missing_header() {
        let state = state_with_metrics_auth(Some("shared-token"));
        let headers = HeaderMap::new();
        assert_eq!(
            enforce_metrics_auth(&headers, &state).unwrap_err(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn metrics_auth_accepts_matching_bearer_token() {
        let state = state_with_metrics_auth(Some("shared-token"));
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, "Bearer shared-token".parse().unwrap());
        assert!(enforce_metrics_auth(&headers, &state).is_ok());
    }

    #[test]
    fn metrics_auth_rejects_wrong_token() {
        let state = state_with_metrics_auth(Some("correct-token"));
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, "Bearer wrong-token".parse().unwrap());
        assert_eq!(
            enforce_metrics_auth(&headers, &state).unwrap_err(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn metrics_auth_rejects_non_bearer_scheme() {
        let state = state_with_metrics_auth(Some("some-token"));
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, "Basic some-token".parse().unwrap());
        assert_eq!(
            enforce_metrics_auth(&headers, &state).unwrap_err(),
            StatusCode::UNAUTHORIZED
        );
    }
}

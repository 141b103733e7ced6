//! WebSocket upgrade handlers: verify the bearer token before upgrading (spec §4.8,
//! §7 "Auth/token: rejected at upgrade; no WebSocket opens").

use std::sync::Arc;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use crate::metrics::ServerMetrics;
use crate::protocol::types::ConnectionRole;
use crate::server::AppState;

use super::connection;

#[derive(Debug, Deserialize)]
pub struct ConnectParams {
    pub token: Option<String>,
    pub role: Option<String>,
}

/// `WS /ws/lobby?token=…`
pub async fn lobby_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(params): Query<ConnectParams>,
) -> Response {
    let identity = match state.auth.authenticate(params.token.as_deref()) {
        Ok(identity) => identity,
        Err(err) => {
            tracing::warn!(error = %err, "rejected lobby upgrade");
            ServerMetrics::inc(&state.metrics.connections_rejected_auth);
            return StatusCode::UNAUTHORIZED.into_response();
        }
    };

    ws.on_upgrade(move |socket| connection::run_lobby_connection(socket, state, identity))
}

/// `WS /ws/room/{code}?token=…[&role=spectator]`
pub async fn room_handler(
    ws: WebSocketUpgrade,
    Path(code): Path<String>,
    State(state): State<Arc<AppState>>,
    Query(params): Query<ConnectParams>,
) -> Response {
    let identity = match state.auth.authenticate(params.token.as_deref()) {
        Ok(identity) => identity,
        Err(err) => {
            tracing::warn!(error = %err, "rejected room upgrade");
            ServerMetrics::inc(&state.metrics.connections_rejected_auth);
            return StatusCode::UNAUTHORIZED.into_response();
        }
    };

    let requested_role = if params.role.as_deref() == Some("spectator") {
        ConnectionRole::Spectator
    } else {
        ConnectionRole::Player
    };

    ws.on_upgrade(move |socket| {
        connection::run_room_connection(socket, state, code, identity, requested_role)
    })
}

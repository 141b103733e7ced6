//! WebSocket gateway: upgrade handlers, per-connection attach/receive/detach loop, and the
//! outbound writer that enforces backpressure.
//!
//! - handler: verifies the bearer token and upgrades (spec §4.8)
//! - connection: drives one connection's lobby/room attach + receive loop
//! - sending: per-connection outbound writer with backpressure drop
//! - routes: router assembly, health/metrics endpoints, `run_server`

mod connection;
mod handler;
mod sending;
mod routes;

pub use routes::{create_router, run_server};

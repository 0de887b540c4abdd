//! HTTP and WebSocket surfaces.
//!
//! Both protocol prefixes (`/robotics`, `/video`) expose the same room
//! lifecycle REST endpoints plus a per-room WebSocket; the video prefix
//! adds the WebRTC signaling endpoint. Everything shares one
//! process-wide [`AppState`] handle created at startup.

pub mod config;
pub mod http;
pub mod ws;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::registry::Registry;
use crate::room::{RoboticsRoom, VideoRoom};
use crate::stats::FabricStats;

pub use config::ServerConfig;

/// Process-wide handle passed to every HTTP and WebSocket entry point.
#[derive(Clone)]
pub struct AppState {
    pub robotics: Arc<Registry<RoboticsRoom>>,
    pub video: Arc<Registry<VideoRoom>>,
    pub stats: Arc<FabricStats>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            robotics: Arc::new(Registry::new()),
            video: Arc::new(Registry::new()),
            stats: Arc::new(FabricStats::new()),
            config: Arc::new(config),
        }
    }
}

/// Build the axum router for both protocol surfaces.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(http::health))
        // Robotics surface
        .route("/robotics/health", get(http::robotics_health))
        .route("/robotics/status", get(http::robotics_status))
        .route(
            "/robotics/workspaces/{workspace_id}/rooms",
            get(http::robotics_list_rooms).post(http::robotics_create_room),
        )
        .route(
            "/robotics/workspaces/{workspace_id}/rooms/{room_id}",
            get(http::robotics_get_room).delete(http::robotics_delete_room),
        )
        .route(
            "/robotics/workspaces/{workspace_id}/rooms/{room_id}/state",
            get(http::robotics_room_state),
        )
        .route(
            "/robotics/workspaces/{workspace_id}/rooms/{room_id}/command",
            post(http::robotics_send_command),
        )
        .route(
            "/robotics/workspaces/{workspace_id}/rooms/{room_id}/ws",
            get(ws::robotics_ws),
        )
        // Video surface
        .route("/video/health", get(http::video_health))
        .route("/video/status", get(http::video_status))
        .route(
            "/video/workspaces/{workspace_id}/rooms",
            get(http::video_list_rooms).post(http::video_create_room),
        )
        .route(
            "/video/workspaces/{workspace_id}/rooms/{room_id}",
            get(http::video_get_room).delete(http::video_delete_room),
        )
        .route(
            "/video/workspaces/{workspace_id}/rooms/{room_id}/state",
            get(http::video_room_state),
        )
        .route(
            "/video/workspaces/{workspace_id}/rooms/{room_id}/webrtc/signal",
            post(http::video_signal),
        )
        .route(
            "/video/workspaces/{workspace_id}/rooms/{room_id}/ws",
            get(ws::video_ws),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Run the server until shutdown.
///
/// Binds the configured address, serves both protocol surfaces, and
/// shuts down gracefully on ctrl-c.
pub async fn serve(config: ServerConfig) -> crate::error::Result<()> {
    let bind_addr = config.bind_addr;
    let state = AppState::new(config);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    tracing::info!(addr = %bind_addr, "fleetlink listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("Shutdown signal received");
}

//! Lectern Live Relay
//!
//! Single binary that runs:
//! - Two UDP listeners for the encoder's video/audio elementary streams
//! - The viewer WebSocket endpoint with token gate and backpressure
//! - A health probe for operators

use std::net::SocketAddr;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use lectern_relay::gate::LiveFlag;
use lectern_relay::registry::BackpressurePolicy;
use lectern_relay::{ingest, state};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── Logging ─────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // ── JWT context ─────────────────────────────────────────────
    let jwt_seed = std::env::var("JWT_SEED_B64").unwrap_or_else(|_| {
        tracing::warn!(
            "JWT_SEED_B64 not set — generating ephemeral key (tokens won't survive restart)"
        );
        let (_, seed) = lectern_common::auth::JwtContext::generate();
        seed
    });
    let jwt = lectern_common::auth::JwtContext::from_ed25519_seed(&jwt_seed)
        .map_err(|e| anyhow::anyhow!("invalid JWT seed: {e}"))?;

    // ── Backpressure policy ─────────────────────────────────────
    let mut policy = BackpressurePolicy::default();
    if let Ok(raw) = std::env::var("MAX_BUFFERED_BYTES") {
        policy.max_buffered_bytes = raw.parse()?;
    }

    // The platform toggles this when a live session starts/ends. Until it
    // does, the relay treats the stream as on air.
    let live = LiveFlag::new(true);

    // ── Shared state ────────────────────────────────────────────
    let state = state::AppState::new(jwt, live, policy);

    // ── UDP ingestion — bound before any viewer can connect ─────
    let video_addr: SocketAddr = std::env::var("VIDEO_BIND")
        .unwrap_or_else(|_| "0.0.0.0:5004".into())
        .parse()?;
    let audio_addr: SocketAddr = std::env::var("AUDIO_BIND")
        .unwrap_or_else(|_| "0.0.0.0:5006".into())
        .parse()?;

    let video_socket = tokio::net::UdpSocket::bind(video_addr).await?;
    let audio_socket = tokio::net::UdpSocket::bind(audio_addr).await?;
    tracing::info!(video = %video_addr, audio = %audio_addr, "UDP ingest bound");

    tokio::spawn(ingest::run_video(video_socket, state.clone()));
    tokio::spawn(ingest::run_audio(audio_socket, state.clone()));

    // ── Router ──────────────────────────────────────────────────
    let app = lectern_relay::app(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // ── Listen ──────────────────────────────────────────────────
    let addr: SocketAddr = std::env::var("LISTEN_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:3000".into())
        .parse()?;

    tracing::info!("lectern-relay listening on {addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

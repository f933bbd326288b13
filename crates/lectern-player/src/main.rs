//! Lectern player demo binary.
//!
//! Connects to a relay and counts frames with logging decoder stubs —
//! useful for smoke-testing a deployment without a real decoder attached.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use lectern_player::sink::{LoggingAudioDecoder, LoggingVideoDecoder};
use lectern_player::{run, FrameRouter, PlayerConfig};

#[derive(Debug, Parser)]
#[command(name = "lectern-player", about = "Lectern live stream consumer")]
struct Args {
    /// Live endpoint URL.
    #[arg(long, default_value = "ws://127.0.0.1:3000/live/ws")]
    url: String,

    /// Viewer JWT.
    #[arg(long)]
    token: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut router = FrameRouter::new(
        LoggingVideoDecoder::default(),
        LoggingAudioDecoder::default(),
    );

    let config = PlayerConfig {
        url: args.url,
        token: args.token,
    };

    run(config, &mut router).await?;
    Ok(())
}

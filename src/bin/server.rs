#[cfg(target_arch = "wasm32")]
fn main() {}

#[cfg(not(target_arch = "wasm32"))]
use clap::Parser;
#[cfg(not(target_arch = "wasm32"))]
use pairlink::config::{
    DEFAULT_COLS, DEFAULT_ROWS, DEFAULT_SCORE_PER_MATCH, DEFAULT_TILE_KINDS, GameConfig,
};
#[cfg(not(target_arch = "wasm32"))]
use pairlink::{RoomRegistry, serve, telemetry};
#[cfg(not(target_arch = "wasm32"))]
use std::path::PathBuf;
#[cfg(not(target_arch = "wasm32"))]
use std::sync::Arc;
#[cfg(not(target_arch = "wasm32"))]
use tokio::net::TcpListener;

/// Two-player tile matching server speaking JSON over websockets.
#[cfg(not(target_arch = "wasm32"))]
#[derive(Parser, Debug)]
struct Opts {
    /// Address to listen for websocket connections
    #[arg(long, default_value = "0.0.0.0:5050")]
    listen: String,
    #[arg(long, default_value_t = DEFAULT_ROWS)]
    rows: usize,
    #[arg(long, default_value_t = DEFAULT_COLS)]
    cols: usize,
    /// Number of distinct tile kinds dealt onto a board
    #[arg(long, default_value_t = DEFAULT_TILE_KINDS)]
    tile_kinds: u8,
    #[arg(long, default_value_t = DEFAULT_SCORE_PER_MATCH)]
    score_per_match: u32,
    /// Optional JSON game config; replaces the board flags above
    #[arg(long)]
    config: Option<PathBuf>,
}

#[cfg(not(target_arch = "wasm32"))]
impl Opts {
    fn game_config(&self) -> anyhow::Result<GameConfig> {
        if let Some(path) = self.config.as_ref() {
            let raw = std::fs::read_to_string(path)?;
            return Ok(serde_json::from_str(&raw)?);
        }
        Ok(GameConfig {
            rows: self.rows,
            cols: self.cols,
            tile_kinds: self.tile_kinds,
            score_per_match: self.score_per_match,
            ..GameConfig::default()
        })
    }
}

#[cfg(not(target_arch = "wasm32"))]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let opts = Opts::parse();
    telemetry::init_tracing();

    let config = opts.game_config()?;
    let registry = Arc::new(RoomRegistry::new(config.clone())?);
    let listener = TcpListener::bind(&opts.listen).await?;
    tracing::info!(
        listen = %opts.listen,
        rows = config.rows,
        cols = config.cols,
        tile_kinds = config.tile_kinds,
        "pairlink server listening"
    );

    serve(listener, registry).await
}

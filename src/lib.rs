pub mod board;
pub mod collapse;
pub mod config;
pub mod connect;
pub mod deadlock;
pub mod error;
pub mod protocol;
pub mod room_id;
pub mod wasm;

#[cfg(not(target_arch = "wasm32"))]
pub mod server;
#[cfg(not(target_arch = "wasm32"))]
pub mod session;
#[cfg(not(target_arch = "wasm32"))]
pub mod telemetry;

pub use board::{Board, Position, Tile};
pub use collapse::{CollapseMode, collapse};
pub use config::GameConfig;
pub use connect::{MAX_TURNS, Path, Waypoint, connect};
pub use deadlock::{Reshuffle, available_pairs, ensure_solvable, pair_ceiling};
pub use error::{BoardError, ConfigError, SessionError};
pub use protocol::{ClientEvent, PlayerId, Scores, ServerEvent};
pub use room_id::RoomId;

#[cfg(not(target_arch = "wasm32"))]
pub use server::serve;
#[cfg(not(target_arch = "wasm32"))]
pub use session::{MoveOutcome, Outbox, RoomPhase, RoomRegistry, RoomSnapshot};

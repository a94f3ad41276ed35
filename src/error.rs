use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BoardError {
    #[error("board must have at least one row and one column")]
    Empty,
    #[error("row {row} has {found} cells, expected {expected}")]
    Ragged {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("a {rows}x{cols} board has an odd cell count and cannot be filled with pairs")]
    OddCellCount { rows: usize, cols: usize },
    #[error("a {rows}x{cols} board has more cells than can be addressed")]
    TooLarge { rows: usize, cols: usize },
    #[error("at least one tile kind is required")]
    NoTileKinds,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid board shape: {0}")]
    Board(#[from] BoardError),
    #[error("room id length must be positive")]
    RoomIdLength,
}

/// Failures surfaced to the player who sent the offending event.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("room {0} does not exist")]
    RoomNotFound(String),
    #[error("room is full")]
    RoomFull,
    #[error("you are already in this room")]
    AlreadyJoined,
    #[error("you are not a player in this room")]
    NotInRoom,
    #[error("position [{row}, {col}] is outside the board")]
    OutOfBounds { row: usize, col: usize },
    #[error("a display name is required")]
    MissingName,
    #[error(transparent)]
    Board(#[from] BoardError),
}

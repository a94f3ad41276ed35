use serde::{Deserialize, Serialize};

use crate::error::{BoardError, ConfigError};

pub const DEFAULT_ROWS: usize = 9;
pub const DEFAULT_COLS: usize = 16;
pub const DEFAULT_TILE_KINDS: u8 = 36;
pub const DEFAULT_SCORE_PER_MATCH: u32 = 20;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub rows: usize,
    pub cols: usize,
    pub tile_kinds: u8,
    pub score_per_match: u32,
    /// Connectable pairs a presented board must offer.
    pub min_pairs: usize,
    pub room_id_len: usize,
    /// Reshuffle attempts before settling for the best arrangement found.
    pub max_shuffles: usize,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            rows: DEFAULT_ROWS,
            cols: DEFAULT_COLS,
            tile_kinds: DEFAULT_TILE_KINDS,
            score_per_match: DEFAULT_SCORE_PER_MATCH,
            min_pairs: 3,
            room_id_len: 6,
            max_shuffles: 500,
        }
    }
}

impl GameConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rows == 0 || self.cols == 0 {
            return Err(BoardError::Empty.into());
        }
        let cells = self
            .rows
            .checked_mul(self.cols)
            .ok_or(BoardError::TooLarge {
                rows: self.rows,
                cols: self.cols,
            })?;
        if cells % 2 != 0 {
            return Err(BoardError::OddCellCount {
                rows: self.rows,
                cols: self.cols,
            }
            .into());
        }
        if self.tile_kinds == 0 {
            return Err(BoardError::NoTileKinds.into());
        }
        if self.room_id_len == 0 {
            return Err(ConfigError::RoomIdLength);
        }
        Ok(())
    }
}

use rand::Rng;
use rand::seq::SliceRandom;
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::BoardError;

/// Content of a single cell. Serialized as `null` or the kind id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "Option<u8>", into = "Option<u8>")]
pub enum Tile {
    #[default]
    Empty,
    Kind(u8),
}

impl Tile {
    pub fn is_empty(self) -> bool {
        matches!(self, Tile::Empty)
    }

    pub fn kind(self) -> Option<u8> {
        match self {
            Tile::Empty => None,
            Tile::Kind(id) => Some(id),
        }
    }

    /// Two tiles match only when both are occupied by the same kind.
    pub fn matches(self, other: Tile) -> bool {
        match (self, other) {
            (Tile::Kind(a), Tile::Kind(b)) => a == b,
            _ => false,
        }
    }
}

impl From<Option<u8>> for Tile {
    fn from(value: Option<u8>) -> Self {
        value.map_or(Tile::Empty, Tile::Kind)
    }
}

impl From<Tile> for Option<u8> {
    fn from(tile: Tile) -> Self {
        tile.kind()
    }
}

/// Cell address, serialized as `[row, col]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "[usize; 2]", into = "[usize; 2]")]
pub struct Position {
    pub row: usize,
    pub col: usize,
}

impl Position {
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

impl From<[usize; 2]> for Position {
    fn from([row, col]: [usize; 2]) -> Self {
        Self { row, col }
    }
}

impl From<Position> for [usize; 2] {
    fn from(p: Position) -> Self {
        [p.row, p.col]
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Board {
    rows: usize,
    cols: usize,
    cells: Vec<Tile>,
}

impl Board {
    pub fn empty(rows: usize, cols: usize) -> Result<Self, BoardError> {
        if rows == 0 || cols == 0 {
            return Err(BoardError::Empty);
        }
        let len = rows
            .checked_mul(cols)
            .ok_or(BoardError::TooLarge { rows, cols })?;
        Ok(Self {
            rows,
            cols,
            cells: vec![Tile::Empty; len],
        })
    }

    /// Fills every cell with pairs of kinds `i % kinds` and shuffles them.
    pub fn generate<R: Rng + ?Sized>(
        rows: usize,
        cols: usize,
        kinds: u8,
        rng: &mut R,
    ) -> Result<Self, BoardError> {
        let mut board = Self::empty(rows, cols)?;
        if kinds == 0 {
            return Err(BoardError::NoTileKinds);
        }
        let total = board.cells.len();
        if total % 2 != 0 {
            return Err(BoardError::OddCellCount { rows, cols });
        }
        let mut tiles = Vec::with_capacity(total);
        for i in 0..total / 2 {
            let kind = (i % kinds as usize) as u8;
            tiles.push(Tile::Kind(kind));
            tiles.push(Tile::Kind(kind));
        }
        tiles.shuffle(rng);
        board.cells = tiles;
        Ok(board)
    }

    /// Builds a board from row-major kind ids, `None` marking an empty cell.
    pub fn from_rows(rows: Vec<Vec<Option<u8>>>) -> Result<Self, BoardError> {
        let cols = rows.first().map(Vec::len).unwrap_or(0);
        let mut board = Self::empty(rows.len(), cols)?;
        for (r, row) in rows.into_iter().enumerate() {
            if row.len() != cols {
                return Err(BoardError::Ragged {
                    row: r,
                    expected: cols,
                    found: row.len(),
                });
            }
            for (c, cell) in row.into_iter().enumerate() {
                board.cells[r * cols + c] = cell.into();
            }
        }
        Ok(board)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn contains(&self, pos: Position) -> bool {
        pos.row < self.rows && pos.col < self.cols
    }

    pub fn get(&self, pos: Position) -> Option<Tile> {
        if self.contains(pos) {
            Some(self.cells[pos.row * self.cols + pos.col])
        } else {
            None
        }
    }

    /// Signed lookup used by the pathfinder; anything off the board reads as `None`.
    pub(crate) fn get_signed(&self, row: isize, col: isize) -> Option<Tile> {
        if row < 0 || col < 0 {
            return None;
        }
        self.get(Position::new(row as usize, col as usize))
    }

    /// Panics on out-of-bounds positions; callers validate with [`Board::contains`].
    pub fn set(&mut self, pos: Position, tile: Tile) {
        assert!(self.contains(pos), "position {pos:?} outside board");
        self.cells[pos.row * self.cols + pos.col] = tile;
    }

    pub fn clear(&mut self, pos: Position) {
        self.set(pos, Tile::Empty);
    }

    pub fn occupied(&self) -> usize {
        self.cells.iter().filter(|t| !t.is_empty()).count()
    }

    pub fn is_cleared(&self) -> bool {
        self.cells.iter().all(|t| t.is_empty())
    }

    pub fn row(&self, row: usize) -> &[Tile] {
        &self.cells[row * self.cols..(row + 1) * self.cols]
    }

    pub(crate) fn row_mut(&mut self, row: usize) -> &mut [Tile] {
        &mut self.cells[row * self.cols..(row + 1) * self.cols]
    }

    /// Occupied cells in row-major order.
    pub fn tiles(&self) -> impl Iterator<Item = (Position, u8)> + '_ {
        let cols = self.cols;
        self.cells
            .iter()
            .enumerate()
            .filter_map(move |(i, t)| t.kind().map(|k| (Position::new(i / cols, i % cols), k)))
    }

    pub(crate) fn cells(&self) -> &[Tile] {
        &self.cells
    }

    pub(crate) fn cells_mut(&mut self) -> &mut [Tile] {
        &mut self.cells
    }
}

impl Serialize for Board {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.rows))?;
        for r in 0..self.rows {
            seq.serialize_element(self.row(r))?;
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for Board {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let rows = Vec::<Vec<Option<u8>>>::deserialize(deserializer)?;
        Board::from_rows(rows).map_err(serde::de::Error::custom)
    }
}

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::board::{Board, Tile};

/// Gravity applied after every match, fixed for the lifetime of a board.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollapseMode {
    Down,
    Up,
    Left,
    Right,
    /// Even columns fall down, odd columns rise up.
    ZigZag,
}

impl CollapseMode {
    pub const ALL: [CollapseMode; 5] = [
        CollapseMode::Down,
        CollapseMode::Up,
        CollapseMode::Left,
        CollapseMode::Right,
        CollapseMode::ZigZag,
    ];

    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        *Self::ALL.choose(rng).unwrap_or(&CollapseMode::Down)
    }
}

#[derive(Clone, Copy)]
enum Anchor {
    Start,
    End,
}

fn settle(line: &mut [Tile], anchor: Anchor) {
    let tiles: Vec<Tile> = line.iter().copied().filter(|t| !t.is_empty()).collect();
    let gap = line.len() - tiles.len();
    match anchor {
        Anchor::Start => {
            line[..tiles.len()].copy_from_slice(&tiles);
            line[tiles.len()..].fill(Tile::Empty);
        }
        Anchor::End => {
            line[..gap].fill(Tile::Empty);
            line[gap..].copy_from_slice(&tiles);
        }
    }
}

fn settle_column(board: &mut Board, col: usize, anchor: Anchor) {
    let (rows, cols) = (board.rows(), board.cols());
    let cells = board.cells_mut();
    let mut column: Vec<Tile> = (0..rows).map(|r| cells[r * cols + col]).collect();
    settle(&mut column, anchor);
    for (r, tile) in column.into_iter().enumerate() {
        cells[r * cols + col] = tile;
    }
}

/// Compacts occupied tiles toward the side `mode` names, keeping their
/// relative order within each row or column.
pub fn collapse(board: &mut Board, mode: CollapseMode) {
    match mode {
        CollapseMode::Down => {
            for c in 0..board.cols() {
                settle_column(board, c, Anchor::End);
            }
        }
        CollapseMode::Up => {
            for c in 0..board.cols() {
                settle_column(board, c, Anchor::Start);
            }
        }
        CollapseMode::Left => {
            for r in 0..board.rows() {
                settle(board.row_mut(r), Anchor::Start);
            }
        }
        CollapseMode::Right => {
            for r in 0..board.rows() {
                settle(board.row_mut(r), Anchor::End);
            }
        }
        CollapseMode::ZigZag => {
            for c in 0..board.cols() {
                let anchor = if c % 2 == 0 { Anchor::End } else { Anchor::Start };
                settle_column(board, c, anchor);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Position;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn board(rows: Vec<Vec<Option<u8>>>) -> Board {
        Board::from_rows(rows).unwrap()
    }

    fn column(values: &[Option<u8>]) -> Board {
        board(values.iter().map(|v| vec![*v]).collect())
    }

    #[test]
    fn down_and_up_on_a_single_column() {
        let mut down = column(&[Some(1), None, Some(2)]);
        collapse(&mut down, CollapseMode::Down);
        assert_eq!(down, column(&[None, Some(1), Some(2)]));

        let mut up = column(&[Some(1), None, Some(2)]);
        collapse(&mut up, CollapseMode::Up);
        assert_eq!(up, column(&[Some(1), Some(2), None]));
    }

    #[test]
    fn left_and_right_keep_row_order() {
        let start = board(vec![vec![None, Some(3), None, Some(4)]]);

        let mut left = start.clone();
        collapse(&mut left, CollapseMode::Left);
        assert_eq!(left, board(vec![vec![Some(3), Some(4), None, None]]));

        let mut right = start;
        collapse(&mut right, CollapseMode::Right);
        assert_eq!(right, board(vec![vec![None, None, Some(3), Some(4)]]));
    }

    #[test]
    fn zigzag_alternates_by_column() {
        let mut b = board(vec![
            vec![Some(1), None, Some(5)],
            vec![None, None, None],
            vec![None, Some(2), None],
        ]);
        collapse(&mut b, CollapseMode::ZigZag);
        assert_eq!(
            b,
            board(vec![
                vec![None, Some(2), None],
                vec![None, None, None],
                vec![Some(1), None, Some(5)],
            ])
        );
    }

    #[test]
    fn collapse_is_idempotent_in_every_mode() {
        let mut rng = StdRng::seed_from_u64(42);
        for mode in CollapseMode::ALL {
            let mut b = Board::generate(6, 8, 10, &mut rng).unwrap();
            for (i, (pos, _)) in b.clone().tiles().enumerate() {
                if i % 3 == 0 {
                    b.clear(pos);
                }
            }
            collapse(&mut b, mode);
            let once = b.clone();
            collapse(&mut b, mode);
            assert_eq!(b, once, "{mode:?} changed an already collapsed board");
        }
    }

    #[test]
    fn collapse_preserves_tile_count() {
        let mut b = board(vec![
            vec![Some(1), None, Some(1)],
            vec![None, Some(2), None],
        ]);
        b.clear(Position::new(0, 0));
        for mode in CollapseMode::ALL {
            let mut c = b.clone();
            collapse(&mut c, mode);
            assert_eq!(c.occupied(), 2);
        }
    }

    #[test]
    fn modes_use_lowercase_names() {
        assert_eq!(serde_json::to_string(&CollapseMode::ZigZag).unwrap(), "\"zigzag\"");
        let mode: CollapseMode = serde_json::from_str("\"left\"").unwrap();
        assert_eq!(mode, CollapseMode::Left);
    }
}

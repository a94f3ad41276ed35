use std::collections::BTreeMap;

use rand::Rng;
use rand::seq::SliceRandom;
use tracing::{debug, warn};

use crate::board::{Board, Position, Tile};
use crate::connect::connect;

/// Every unordered pair of matching tiles that [`connect`] accepts, with
/// `first < second` in row-major order. Sorted by first, then second.
pub fn available_pairs(board: &Board) -> Vec<(Position, Position)> {
    let mut by_kind: BTreeMap<u8, Vec<Position>> = BTreeMap::new();
    for (pos, kind) in board.tiles() {
        by_kind.entry(kind).or_default().push(pos);
    }

    let mut pairs = Vec::new();
    for positions in by_kind.values() {
        for (i, &a) in positions.iter().enumerate() {
            for &b in &positions[i + 1..] {
                if connect(board, a, b).is_some() {
                    pairs.push((a, b));
                }
            }
        }
    }
    pairs.sort_unstable();
    pairs
}

/// Upper bound on connectable pairs for the board's tile multiset: the
/// number of same-kind pairs, regardless of placement.
pub fn pair_ceiling(board: &Board) -> usize {
    let mut counts: BTreeMap<u8, usize> = BTreeMap::new();
    for (_, kind) in board.tiles() {
        *counts.entry(kind).or_default() += 1;
    }
    counts.values().map(|n| n * n.saturating_sub(1) / 2).sum()
}

/// Permutes the occupied tiles in place. Empty cells stay empty and the
/// count of every kind is unchanged.
pub fn shuffle_tiles<R: Rng + ?Sized>(board: &mut Board, rng: &mut R) {
    let mut values: Vec<Tile> = board
        .cells()
        .iter()
        .copied()
        .filter(|t| !t.is_empty())
        .collect();
    values.shuffle(rng);
    let mut values = values.into_iter();
    for cell in board.cells_mut().iter_mut().filter(|t| !t.is_empty()) {
        if let Some(v) = values.next() {
            *cell = v;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reshuffle {
    pub shuffles: usize,
    pub pairs: usize,
    pub converged: bool,
}

/// Reshuffles until at least `min_pairs` connectable pairs exist, or as many
/// as the tile multiset can ever form when that is fewer.
///
/// After `max_shuffles` failed attempts the best arrangement seen is
/// restored and `converged` is false.
pub fn ensure_solvable<R: Rng + ?Sized>(
    board: &mut Board,
    min_pairs: usize,
    max_shuffles: usize,
    rng: &mut R,
) -> Reshuffle {
    let target = min_pairs.min(pair_ceiling(board));
    let pairs = available_pairs(board).len();
    if pairs >= target {
        return Reshuffle {
            shuffles: 0,
            pairs,
            converged: true,
        };
    }

    let mut best = (pairs, board.cells().to_vec());
    for shuffles in 1..=max_shuffles {
        shuffle_tiles(board, rng);
        let pairs = available_pairs(board).len();
        if pairs >= target {
            debug!(shuffles, pairs, "board reshuffled");
            return Reshuffle {
                shuffles,
                pairs,
                converged: true,
            };
        }
        if pairs > best.0 {
            best = (pairs, board.cells().to_vec());
        }
    }

    board.cells_mut().copy_from_slice(&best.1);
    warn!(
        max_shuffles,
        target,
        pairs = best.0,
        "reshuffle cap reached, keeping best arrangement"
    );
    Reshuffle {
        shuffles: max_shuffles,
        pairs: best.0,
        converged: false,
    }
}

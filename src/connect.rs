use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::board::{Board, Position, Tile};

/// Maximum number of direction changes a connecting line may make.
pub const MAX_TURNS: u8 = 2;

/// A point on the connecting line. Rows and columns may sit one step
/// outside the board when the line routes around its edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[isize; 2]", into = "[isize; 2]")]
pub struct Waypoint {
    pub row: isize,
    pub col: isize,
}

impl Waypoint {
    pub const fn new(row: isize, col: isize) -> Self {
        Self { row, col }
    }
}

impl From<Position> for Waypoint {
    fn from(p: Position) -> Self {
        Self::new(p.row as isize, p.col as isize)
    }
}

impl From<[isize; 2]> for Waypoint {
    fn from([row, col]: [isize; 2]) -> Self {
        Self { row, col }
    }
}

impl From<Waypoint> for [isize; 2] {
    fn from(w: Waypoint) -> Self {
        [w.row, w.col]
    }
}

pub type Path = Vec<Waypoint>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Direction {
    East,
    South,
    West,
    North,
}

// Enumeration order doubles as the tie-break between equally short lines.
const DIRECTIONS: [Direction; 4] = [
    Direction::East,
    Direction::South,
    Direction::West,
    Direction::North,
];

impl Direction {
    fn delta(self) -> (isize, isize) {
        match self {
            Direction::East => (0, 1),
            Direction::South => (1, 0),
            Direction::West => (0, -1),
            Direction::North => (-1, 0),
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

struct Step {
    row: isize,
    col: isize,
    dir: Direction,
    turns: u8,
    parent: Option<usize>,
}

struct Search<'a> {
    board: &'a Board,
    target: (isize, isize),
    // Lowest turn count seen per (cell, incoming direction), over the board plus its border ring.
    best: Vec<u8>,
    steps: Vec<Step>,
    queue: VecDeque<usize>,
}

impl<'a> Search<'a> {
    fn new(board: &'a Board, target: Position) -> Self {
        let ring = (board.rows() + 2) * (board.cols() + 2);
        Self {
            board,
            target: (target.row as isize, target.col as isize),
            best: vec![MAX_TURNS + 1; ring * DIRECTIONS.len()],
            steps: Vec::new(),
            queue: VecDeque::new(),
        }
    }

    fn in_ring(&self, row: isize, col: isize) -> bool {
        (-1..=self.board.rows() as isize).contains(&row)
            && (-1..=self.board.cols() as isize).contains(&col)
    }

    fn is_passable(&self, row: isize, col: isize) -> bool {
        (row, col) == self.target || self.board.get_signed(row, col).is_none_or(Tile::is_empty)
    }

    fn slot(&self, row: isize, col: isize, dir: Direction) -> usize {
        let width = self.board.cols() + 2;
        let cell = (row + 1) as usize * width + (col + 1) as usize;
        cell * DIRECTIONS.len() + dir.index()
    }

    fn push(&mut self, row: isize, col: isize, dir: Direction, turns: u8, parent: Option<usize>) {
        let slot = self.slot(row, col, dir);
        self.best[slot] = turns;
        self.steps.push(Step {
            row,
            col,
            dir,
            turns,
            parent,
        });
        self.queue.push_back(self.steps.len() - 1);
    }

    fn run(mut self, source: Position) -> Option<Path> {
        let (sr, sc) = (source.row as isize, source.col as isize);
        for dir in DIRECTIONS {
            let (dr, dc) = dir.delta();
            let (nr, nc) = (sr + dr, sc + dc);
            if self.in_ring(nr, nc) && self.is_passable(nr, nc) {
                self.push(nr, nc, dir, 0, None);
            }
        }

        while let Some(idx) = self.queue.pop_front() {
            let (row, col, dir, turns) = {
                let s = &self.steps[idx];
                (s.row, s.col, s.dir, s.turns)
            };
            if (row, col) == self.target {
                return Some(self.trace(source, idx));
            }
            for next in DIRECTIONS {
                let (dr, dc) = next.delta();
                let (nr, nc) = (row + dr, col + dc);
                if !self.in_ring(nr, nc) {
                    continue;
                }
                let next_turns = turns + u8::from(next != dir);
                if next_turns > MAX_TURNS || !self.is_passable(nr, nc) {
                    continue;
                }
                if next_turns < self.best[self.slot(nr, nc, next)] {
                    self.push(nr, nc, next, next_turns, Some(idx));
                }
            }
        }
        None
    }

    fn trace(&self, source: Position, mut idx: usize) -> Path {
        let mut path = Vec::new();
        loop {
            let step = &self.steps[idx];
            path.push(Waypoint::new(step.row, step.col));
            match step.parent {
                Some(parent) => idx = parent,
                None => break,
            }
        }
        path.push(source.into());
        path.reverse();
        path
    }
}

/// Finds the shortest line joining `a` and `b` that bends at most
/// [`MAX_TURNS`] times, travelling only through empty cells or the
/// implicit empty ring around the board.
///
/// Returns `None` when the positions coincide, fall outside the board, or
/// hold tiles that do not match.
pub fn connect(board: &Board, a: Position, b: Position) -> Option<Path> {
    if a == b {
        return None;
    }
    let (ta, tb) = (board.get(a)?, board.get(b)?);
    if !ta.matches(tb) {
        return None;
    }
    Search::new(board, b).run(a)
}

//! Room registry and the two-player session lifecycle.
//!
//! Every action against a room runs under that room's mutex, including the
//! enqueueing of the events it produces, so both players observe board
//! states in the order they were made. Rooms never share a lock.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::Mutex;
use rand::Rng;
use rand::thread_rng;
use tokio::sync::mpsc;
use tracing::{debug, info, trace};

use crate::board::{Board, Position};
use crate::collapse::{CollapseMode, collapse};
use crate::config::GameConfig;
use crate::connect::{Path, connect};
use crate::deadlock::ensure_solvable;
use crate::error::{BoardError, ConfigError, SessionError};
use crate::protocol::{ClientEvent, PlayerId, Scores, ServerEvent};
use crate::room_id::RoomId;

/// Outbound queue of a single connection.
pub type Outbox = mpsc::UnboundedSender<ServerEvent>;

const OPPONENT_LEFT: &str = "Your opponent left. The room has been closed.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomPhase {
    Waiting,
    Active,
    Finished,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoomSnapshot {
    pub board: Board,
    pub mode: CollapseMode,
    pub players: Vec<PlayerId>,
    pub scores: Scores,
    pub locked: bool,
    pub phase: RoomPhase,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MoveOutcome {
    Matched { path: Path, finished: bool },
    Rejected,
}

pub(crate) struct Room {
    id: RoomId,
    board: Board,
    mode: CollapseMode,
    locked: bool,
    players: Vec<PlayerId>,
    names: BTreeMap<PlayerId, String>,
    scores: Scores,
    // Set under the lock before the room leaves the registry.
    closed: bool,
}

impl Room {
    fn contains(&self, player: PlayerId) -> bool {
        self.players.contains(&player)
    }

    fn phase(&self) -> RoomPhase {
        if !self.locked {
            RoomPhase::Waiting
        } else if self.board.is_cleared() {
            RoomPhase::Finished
        } else {
            RoomPhase::Active
        }
    }

    fn start_game(&self) -> ServerEvent {
        ServerEvent::StartGame {
            board: self.board.clone(),
            players: self.names.clone(),
            scores: self.scores.clone(),
            room: self.id.clone(),
            mode: self.mode,
        }
    }

    fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            board: self.board.clone(),
            mode: self.mode,
            players: self.players.clone(),
            scores: self.scores.clone(),
            locked: self.locked,
            phase: self.phase(),
        }
    }
}

pub struct RoomRegistry {
    config: GameConfig,
    rooms: DashMap<RoomId, Arc<Mutex<Room>>>,
    outboxes: DashMap<PlayerId, Outbox>,
    next_player: AtomicU64,
}

impl RoomRegistry {
    pub fn new(config: GameConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            rooms: DashMap::new(),
            outboxes: DashMap::new(),
            next_player: AtomicU64::new(1),
        })
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Attaches a connection and greets it with its player id.
    pub fn register(&self, outbox: Outbox) -> PlayerId {
        let player = PlayerId(self.next_player.fetch_add(1, Ordering::Relaxed));
        self.outboxes.insert(player, outbox);
        self.send(player, ServerEvent::Connected { player });
        player
    }

    /// Leaves every room the player is part of and detaches the connection.
    pub fn disconnect(&self, player: PlayerId) {
        let ids: Vec<RoomId> = self.rooms.iter().map(|e| e.key().clone()).collect();
        for id in ids {
            self.leave(id.as_str(), player);
        }
        self.outboxes.remove(&player);
        info!(%player, "player disconnected");
    }

    pub fn send_error(&self, player: PlayerId, msg: impl Into<String>) {
        self.send(player, ServerEvent::RoomError { msg: msg.into() });
    }

    /// Routes one inbound event. Failures are reported to the sender only.
    pub fn dispatch(&self, player: PlayerId, event: ClientEvent) {
        let result = match event {
            ClientEvent::CreateRoom { name } => self
                .create_room(player, name.as_deref().unwrap_or_default())
                .map(drop),
            ClientEvent::JoinRoomRequest { room, name } => self.join(&room, player, &name),
            ClientEvent::Select { room, a, b } => self.select(&room, player, a, b).map(drop),
            ClientEvent::Restart { room } => self.restart(&room),
        };
        match result {
            Ok(()) => {}
            Err(SessionError::MissingName) => {
                debug!(%player, "create_room without a name ignored");
            }
            Err(err) => {
                debug!(%player, error = %err, "event rejected");
                self.send_error(player, err.to_string());
            }
        }
    }

    pub fn create_room(&self, player: PlayerId, name: &str) -> Result<RoomId, SessionError> {
        if name.is_empty() {
            return Err(SessionError::MissingName);
        }
        let mut rng = thread_rng();
        let (board, mode) = self.fresh_round(&mut rng)?;
        let id = loop {
            let id = RoomId::generate(self.config.room_id_len, &mut rng);
            if let Entry::Vacant(slot) = self.rooms.entry(id.clone()) {
                slot.insert(Arc::new(Mutex::new(Room {
                    id: id.clone(),
                    board,
                    mode,
                    locked: false,
                    players: vec![player],
                    names: BTreeMap::from([(player, name.to_string())]),
                    scores: Scores::from([(player, 0)]),
                    closed: false,
                })));
                break id;
            }
        };
        info!(room = %id, %player, ?mode, "room created");
        self.send(player, ServerEvent::RoomCreated { room: id.clone() });
        Ok(id)
    }

    pub fn join(&self, room_id: &str, player: PlayerId, name: &str) -> Result<(), SessionError> {
        self.with_room(room_id, |room| {
            if room.contains(player) {
                return Err(SessionError::AlreadyJoined);
            }
            if room.locked || room.players.len() >= 2 {
                return Err(SessionError::RoomFull);
            }
            room.players.push(player);
            room.names.insert(player, name.to_string());
            room.scores.insert(player, 0);
            room.locked = true;
            info!(room = %room.id, %player, "second player joined, game starting");
            self.broadcast(room, room.start_game());
            Ok(())
        })
    }

    /// Attempts to match the tiles at `a` and `b` on behalf of `player`.
    ///
    /// A refused match leaves the room untouched and answers the requester
    /// alone with `move_rejected`.
    pub fn select(
        &self,
        room_id: &str,
        player: PlayerId,
        a: Position,
        b: Position,
    ) -> Result<MoveOutcome, SessionError> {
        self.with_room(room_id, |room| {
            for pos in [a, b] {
                if !room.board.contains(pos) {
                    return Err(SessionError::OutOfBounds {
                        row: pos.row,
                        col: pos.col,
                    });
                }
            }
            if !room.contains(player) {
                return Err(SessionError::NotInRoom);
            }

            let Some(path) = connect(&room.board, a, b) else {
                debug!(room = %room.id, %player, ?a, ?b, "no connecting line");
                self.send(player, ServerEvent::MoveRejected { a, b });
                return Ok(MoveOutcome::Rejected);
            };

            room.board.clear(a);
            room.board.clear(b);
            if let Some(score) = room.scores.get_mut(&player) {
                *score = score.saturating_add(self.config.score_per_match);
            }
            collapse(&mut room.board, room.mode);
            ensure_solvable(
                &mut room.board,
                self.config.min_pairs,
                self.config.max_shuffles,
                &mut thread_rng(),
            );

            self.broadcast(
                room,
                ServerEvent::Update {
                    board: room.board.clone(),
                    scores: room.scores.clone(),
                    path: path.clone(),
                    removed: [a, b],
                },
            );
            let finished = room.board.is_cleared();
            if finished {
                info!(room = %room.id, scores = ?room.scores, "board cleared");
                self.broadcast(room, ServerEvent::GameOver(room.scores.clone()));
            }
            debug!(room = %room.id, %player, steps = path.len(), "tiles matched");
            Ok(MoveOutcome::Matched { path, finished })
        })
    }

    /// New board and collapse mode, scores back to zero, same players.
    pub fn restart(&self, room_id: &str) -> Result<(), SessionError> {
        self.with_room(room_id, |room| {
            let (board, mode) = self.fresh_round(&mut thread_rng())?;
            room.board = board;
            room.mode = mode;
            room.scores.values_mut().for_each(|s| *s = 0);
            info!(room = %room.id, ?mode, "room restarted");
            self.broadcast(room, room.start_game());
            Ok(())
        })
    }

    /// Removes `player` from the room and destroys it. A player left behind
    /// is told to exit. Returns whether the player was in the room.
    pub fn leave(&self, room_id: &str, player: PlayerId) -> bool {
        let Some(handle) = self.handle(room_id) else {
            return false;
        };
        {
            let mut room = handle.lock();
            if room.closed || !room.contains(player) {
                return false;
            }
            room.players.retain(|p| *p != player);
            if let [remaining] = *room.players.as_slice() {
                self.send(
                    remaining,
                    ServerEvent::ForceExit {
                        msg: OPPONENT_LEFT.to_string(),
                    },
                );
            }
            room.closed = true;
        }
        self.rooms
            .remove_if(room_id, |_, current| Arc::ptr_eq(current, &handle));
        info!(room = room_id, %player, "player left, room destroyed");
        true
    }

    pub fn snapshot(&self, room_id: &str) -> Option<RoomSnapshot> {
        let handle = self.handle(room_id)?;
        let room = handle.lock();
        (!room.closed).then(|| room.snapshot())
    }

    pub fn phase(&self, room_id: &str) -> Option<RoomPhase> {
        self.snapshot(room_id).map(|s| s.phase)
    }

    fn fresh_round<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<(Board, CollapseMode), BoardError> {
        let mut board = Board::generate(
            self.config.rows,
            self.config.cols,
            self.config.tile_kinds,
            rng,
        )?;
        ensure_solvable(
            &mut board,
            self.config.min_pairs,
            self.config.max_shuffles,
            rng,
        );
        Ok((board, CollapseMode::random(rng)))
    }

    // Clones the handle out so no map guard is held while the room is locked.
    pub(crate) fn handle(&self, room_id: &str) -> Option<Arc<Mutex<Room>>> {
        self.rooms.get(room_id).map(|e| Arc::clone(e.value()))
    }

    fn with_room<T>(
        &self,
        room_id: &str,
        f: impl FnOnce(&mut Room) -> Result<T, SessionError>,
    ) -> Result<T, SessionError> {
        let handle = self
            .handle(room_id)
            .ok_or_else(|| SessionError::RoomNotFound(room_id.to_string()))?;
        enter(room_id, &handle, f)
    }

    fn send(&self, to: PlayerId, event: ServerEvent) {
        if let Some(outbox) = self.outboxes.get(&to) {
            if outbox.send(event).is_err() {
                trace!(player = %to, "outbox closed, event dropped");
            }
        }
    }

    fn broadcast(&self, room: &Room, event: ServerEvent) {
        for &player in &room.players {
            self.send(player, event.clone());
        }
    }
}

/// Runs `f` inside the room's critical section. A handle obtained before a
/// concurrent `leave` sees the room as gone.
fn enter<T>(
    room_id: &str,
    handle: &Mutex<Room>,
    f: impl FnOnce(&mut Room) -> Result<T, SessionError>,
) -> Result<T, SessionError> {
    let mut room = handle.lock();
    if room.closed {
        return Err(SessionError::RoomNotFound(room_id.to_string()));
    }
    f(&mut *room)
}

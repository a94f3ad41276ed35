//! Wire events. Each websocket text frame carries one JSON object of the
//! form `{"event": "<name>", "data": <payload>}`.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

use crate::board::{Board, Position};
use crate::collapse::CollapseMode;
use crate::connect::Path;
use crate::room_id::RoomId;

/// Connection-scoped player identity, assigned when the socket opens.
///
/// Serialized as a bare integer; as a map key JSON turns it into a string,
/// so both forms are accepted on the way back in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl<'de> Deserialize<'de> for PlayerId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct PlayerIdVisitor;

        impl Visitor<'_> for PlayerIdVisitor {
            type Value = PlayerId;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a player id as an integer or a decimal string")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<PlayerId, E> {
                Ok(PlayerId(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<PlayerId, E> {
                u64::try_from(v)
                    .map(PlayerId)
                    .map_err(|_| E::invalid_value(de::Unexpected::Signed(v), &self))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<PlayerId, E> {
                v.parse()
                    .map(PlayerId)
                    .map_err(|_| E::invalid_value(de::Unexpected::Str(v), &self))
            }
        }

        deserializer.deserialize_any(PlayerIdVisitor)
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

pub type Scores = BTreeMap<PlayerId, u32>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    CreateRoom {
        #[serde(default)]
        name: Option<String>,
    },
    JoinRoomRequest {
        room: String,
        #[serde(default)]
        name: String,
    },
    Select {
        room: String,
        a: Position,
        b: Position,
    },
    Restart {
        room: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    Connected {
        player: PlayerId,
    },
    RoomCreated {
        room: RoomId,
    },
    RoomError {
        msg: String,
    },
    StartGame {
        board: Board,
        players: BTreeMap<PlayerId, String>,
        scores: Scores,
        room: RoomId,
        mode: CollapseMode,
    },
    Update {
        board: Board,
        scores: Scores,
        path: Path,
        removed: [Position; 2],
    },
    MoveRejected {
        a: Position,
        b: Position,
    },
    GameOver(Scores),
    ForceExit {
        msg: String,
    },
}

// Protocol messages for client-server communication.
//
// Two enums define the full protocol vocabulary:
// - `ClientMessage`: sent by game clients to the server.
// - `ServerMessage`: sent by the server to game clients.
//
// Supporting structs (`Character`, `Room`, `ChatMessage`) are shared by both
// directions: a client proposes a `Character` at creation and the server
// answers with the authoritative one, and chat frames are forwarded verbatim.
//
// Every text field is a `WireText`: the bytes exactly as they crossed the
// wire, with no encoding assumed. Names are limited to `MAX_NAME_LEN` bytes
// so they fit a 32-byte zero-terminated field; descriptions and chat bodies
// are limited to `MAX_TEXT_LEN` bytes by their 16-bit length prefix. The
// limits are enforced when encoding (see `codec.rs`), never by truncation.

use crate::text::WireText;
use crate::types::{ErrorCode, RoomId, Status};

/// Longest name, in bytes, that fits the 32-byte field with its terminator.
pub const MAX_NAME_LEN: usize = 31;

/// Longest description or chat body, in bytes.
pub const MAX_TEXT_LEN: usize = u16::MAX as usize;

/// A player or monster.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Character {
    pub name: WireText,
    pub status: Status,
    pub attack: u16,
    pub defense: u16,
    pub regen: u16,
    /// Signed on the wire; the server never lets it drop below zero.
    pub health: i16,
    pub gold: u16,
    pub room: RoomId,
    pub description: WireText,
}

impl Character {
    /// Sum of the three stats a player distributes at creation.
    pub fn stat_total(&self) -> u32 {
        u32::from(self.attack) + u32::from(self.defense) + u32::from(self.regen)
    }
}

/// A room, as announced by Room and Connection frames.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Room {
    pub number: RoomId,
    pub name: WireText,
    pub description: WireText,
}

/// A chat frame. Identical layout in both directions.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChatMessage {
    pub recipient: WireText,
    pub sender: WireText,
    pub body: WireText,
}

/// Messages sent by a client to the server.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClientMessage {
    /// Chat addressed to another character by name.
    Chat(ChatMessage),
    /// Move to an adjacent room.
    Move(RoomId),
    /// Fight the monsters in the current room.
    Fight,
    /// Fight another player. Never supported.
    PvpFight,
    /// Loot a body. Never supported, loot is distributed by fights.
    Loot,
    /// Enter the world with the created character.
    Start,
    /// Proposed character; the server overrides room, gold, health and most
    /// of the status.
    CreateCharacter(Character),
    /// Leave the game.
    Quit,
    /// Any opcode the protocol does not define. Occupies exactly one byte.
    Unknown(u8),
}

/// Messages sent by the server to a client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ServerMessage {
    /// Chat forwarded from another client.
    Chat(ChatMessage),
    /// A request was rejected.
    Error { code: ErrorCode, message: WireText },
    /// A request of the given client opcode was accepted.
    Accept(u8),
    /// Description of the room the client just entered.
    Room(Room),
    /// Current state of one character.
    Character(Character),
    /// Game parameters, sent once after connecting.
    Game {
        initial_points: u16,
        stat_limit: u16,
        description: WireText,
    },
    /// A room reachable from the client's current room.
    Connection(Room),
    /// Protocol version, sent first after connecting. `extensions` is the
    /// raw extension list; the server advertises none.
    Version {
        major: u8,
        minor: u8,
        extensions: Vec<u8>,
    },
}

impl ServerMessage {
    /// Build an Error frame.
    pub fn error(code: ErrorCode, message: impl Into<WireText>) -> Self {
        Self::Error {
            code,
            message: message.into(),
        }
    }
}

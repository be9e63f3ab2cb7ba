// Rejections reported to a client as Error frames.
//
// Every handler in `session.rs` returns `Result<_, GameError>`. A
// `GameError` is never fatal: the session turns it into an Error frame with
// the variant's protocol code and its display text, and keeps reading.
// Transport failures are not represented here; they end the session.

use lurk_protocol::{ErrorCode, RoomId, ServerMessage, WireText};
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum GameError {
    #[error("Proposed stats total {total}, the initial stat limit is {limit}")]
    StatBudget { total: u32, limit: u16 },

    #[error("Character already exists for this client")]
    CharacterExists,

    #[error("A player named {0} is already in the game")]
    NameTaken(WireText),

    #[error("Character name must be between 1 and 31 bytes")]
    InvalidName,

    #[error("Character has not been created yet")]
    NoCharacter,

    #[error("Already started")]
    AlreadyStarted,

    #[error("Character has not started")]
    NotStarted,

    #[error("Character is not alive")]
    NotAlive,

    #[error("Room {0} does not exist")]
    NoSuchRoom(RoomId),

    #[error("No connection to room {0}")]
    NoConnection(RoomId),

    #[error("Recipient {0} of message does not exist")]
    RecipientNotFound(WireText),

    #[error("There are no living monsters in this room")]
    NoMonsters,

    #[error("Loot is distributed automatically by fights")]
    LootAutomatic,

    #[error("Server does not support PVPFight")]
    PvpUnsupported,

    #[error("Unknown message type {0}")]
    UnknownMessage(u8),
}

impl GameError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::StatBudget { .. } => ErrorCode::StatError,
            Self::CharacterExists | Self::NameTaken(_) => ErrorCode::PlayerExists,
            Self::NoCharacter | Self::NotStarted | Self::NotAlive => ErrorCode::NotReady,
            Self::NoSuchRoom(_) | Self::NoConnection(_) => ErrorCode::BadRoom,
            Self::RecipientNotFound(_) => ErrorCode::NoTarget,
            Self::NoMonsters => ErrorCode::NoFight,
            Self::PvpUnsupported => ErrorCode::NoPvp,
            Self::InvalidName
            | Self::AlreadyStarted
            | Self::LootAutomatic
            | Self::UnknownMessage(_) => ErrorCode::Other,
        }
    }

    /// The Error frame reporting this rejection.
    pub fn to_message(&self) -> ServerMessage {
        ServerMessage::error(self.code(), self.to_string())
    }
}

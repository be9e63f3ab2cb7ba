// Core value types shared by the codec and the server.
//
// `RoomId` is the stable room index used on the wire. `Status` replaces the
// raw flag byte of a character with named booleans; the byte layout only
// exists inside `from_bits` / `to_bits`. `ErrorCode` is the numeric code
// carried by an Error frame, and the `opcode` module lists the leading byte
// of every frame kind in both directions.
//
// See also: `message.rs` for the frame payload structs, `codec.rs` for the
// byte-level encoding.

/// Index of a room in the world's room list.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoomId(pub u16);

impl RoomId {
    /// The room index as a `usize`, for indexing room tables.
    pub fn index(self) -> usize {
        usize::from(self.0)
    }
}

impl std::fmt::Display for RoomId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Leading byte of every frame.
pub mod opcode {
    pub const MESSAGE: u8 = 1;
    pub const MOVE: u8 = 2;
    pub const FIGHT: u8 = 3;
    pub const PVP_FIGHT: u8 = 4;
    pub const LOOT: u8 = 5;
    pub const START: u8 = 6;
    pub const ERROR: u8 = 7;
    pub const ACCEPT: u8 = 8;
    pub const ROOM: u8 = 9;
    pub const CHARACTER: u8 = 10;
    pub const GAME: u8 = 11;
    pub const QUIT: u8 = 12;
    pub const CONNECTION: u8 = 13;
    pub const VERSION: u8 = 14;
}

// Wire bits of the character flag byte.
const ALIVE: u8 = 0x80;
const COMBATANT: u8 = 0x40;
const MONSTER: u8 = 0x20;
const STARTED: u8 = 0x10;
const READY: u8 = 0x08;

/// Lifecycle and role of a character.
///
/// On the wire `started` occupies two bits (STARTED and READY) that are
/// always set and cleared together.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Status {
    pub alive: bool,
    /// Joins every fight in its room, not only fights it starts.
    pub combatant: bool,
    pub monster: bool,
    pub started: bool,
}

impl Status {
    /// Every status bit set; the seeded monsters use this.
    pub const ALL: Status = Status {
        alive: true,
        combatant: true,
        monster: true,
        started: true,
    };

    pub fn from_bits(bits: u8) -> Self {
        Self {
            alive: bits & ALIVE != 0,
            combatant: bits & COMBATANT != 0,
            monster: bits & MONSTER != 0,
            started: bits & (STARTED | READY) != 0,
        }
    }

    pub fn to_bits(self) -> u8 {
        let mut bits = 0;
        if self.alive {
            bits |= ALIVE;
        }
        if self.combatant {
            bits |= COMBATANT;
        }
        if self.monster {
            bits |= MONSTER;
        }
        if self.started {
            bits |= STARTED | READY;
        }
        bits
    }

    /// Status after losing all health: only the monster marker survives.
    pub fn defeated(self) -> Self {
        Self {
            monster: self.monster,
            ..Self::default()
        }
    }

    /// Status granted to a freshly created player character. Only the
    /// alive and combatant choices of the proposal are honoured, and alive
    /// is forced on.
    pub fn creation(self) -> Self {
        Self {
            alive: true,
            combatant: self.combatant,
            ..Self::default()
        }
    }
}

/// Numeric code carried by an Error frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum ErrorCode {
    Other = 0,
    BadRoom = 1,
    PlayerExists = 2,
    BadMonster = 3,
    StatError = 4,
    NotReady = 5,
    NoTarget = 6,
    NoFight = 7,
    NoPvp = 8,
}

impl ErrorCode {
    /// Map a wire code back to a known variant. Codes the protocol does not
    /// define collapse to `Other`.
    pub fn from_u8(code: u8) -> Self {
        match code {
            1 => Self::BadRoom,
            2 => Self::PlayerExists,
            3 => Self::BadMonster,
            4 => Self::StatError,
            5 => Self::NotReady,
            6 => Self::NoTarget,
            7 => Self::NoFight,
            8 => Self::NoPvp,
            _ => Self::Other,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

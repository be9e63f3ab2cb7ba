// Byte-level encoding of every frame kind.
//
// Wire format: a 1-byte opcode, then fixed-width fields, then at most one
// variable text field whose 16-bit length sits somewhere in the fixed part.
// All multi-byte integers are little-endian. Names occupy a 32-byte field,
// zero-padded, and are read up to the first zero byte. Text is copied as
// raw bytes in both directions, so decode followed by encode reproduces the
// frame exactly.
//
// `WireMessage` is implemented for both `ClientMessage` and `ServerMessage`.
// `frame_len` is what makes stream reassembly possible: given the bytes
// buffered so far, it reports how long the frame at the head of the buffer
// is, or `None` if the buffer does not yet hold the whole frame. Only after
// that does `decode` run, on exactly the frame's bytes.
//
// Encoding emits exactly the declared text length, never a padded maximum.
//
// See also: `framing.rs` for the stream reader/writer built on this trait.

use crate::error::{FrameError, Result};
use crate::message::{
    Character, ChatMessage, ClientMessage, MAX_NAME_LEN, MAX_TEXT_LEN, Room, ServerMessage,
};
use crate::text::WireText;
use crate::types::{ErrorCode, RoomId, Status, opcode};

const NAME_FIELD: usize = 32;

// Size of the fixed part of each variable-length frame, opcode included,
// and the offset of its 16-bit text length.
const CHARACTER_FIXED: usize = 48;
const CHARACTER_LEN_AT: usize = 46;
const ROOM_FIXED: usize = 37;
const ROOM_LEN_AT: usize = 35;
const CHAT_FIXED: usize = 67;
const CHAT_LEN_AT: usize = 1;
const ERROR_FIXED: usize = 4;
const ERROR_LEN_AT: usize = 2;
const GAME_FIXED: usize = 7;
const GAME_LEN_AT: usize = 5;
const VERSION_FIXED: usize = 5;
const VERSION_LEN_AT: usize = 3;

const ACCEPT_LEN: usize = 2;
const MOVE_LEN: usize = 3;

/// A message with a binary frame representation.
pub trait WireMessage: Sized {
    /// Length of the complete frame at the head of `buf`, or `None` if more
    /// bytes are needed. An empty buffer always needs more bytes.
    fn frame_len(buf: &[u8]) -> Result<Option<usize>>;

    /// Decode one complete frame, as delimited by `frame_len`.
    fn decode(frame: &[u8]) -> Result<Self>;

    /// Encode into a complete frame, opcode included.
    fn encode(&self) -> Result<Vec<u8>>;
}

fn fixed(buf: &[u8], len: usize) -> Option<usize> {
    (buf.len() >= len).then_some(len)
}

fn variable(buf: &[u8], fixed_len: usize, len_at: usize) -> Option<usize> {
    if buf.len() < fixed_len {
        return None;
    }
    let text_len = usize::from(u16::from_le_bytes([buf[len_at], buf[len_at + 1]]));
    let total = fixed_len + text_len;
    (buf.len() >= total).then_some(total)
}

// ---------------------------------------------------------------------------
// Field cursors
// ---------------------------------------------------------------------------

struct WireReader<'a> {
    frame: &'a [u8],
    pos: usize,
}

impl<'a> WireReader<'a> {
    fn new(frame: &'a [u8]) -> Self {
        Self { frame, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self.pos + n;
        let bytes = self.frame.get(self.pos..end).ok_or(FrameError::Truncated {
            needed: end,
            available: self.frame.len(),
        })?;
        self.pos = end;
        Ok(bytes)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn i16(&mut self) -> Result<i16> {
        let b = self.take(2)?;
        Ok(i16::from_le_bytes([b[0], b[1]]))
    }

    fn name(&mut self) -> Result<WireText> {
        let field = self.take(NAME_FIELD)?;
        let end = field
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(field.len())
            .min(MAX_NAME_LEN);
        Ok(WireText::from(&field[..end]))
    }

    fn text(&mut self, len: u16) -> Result<WireText> {
        Ok(WireText::from(self.take(usize::from(len))?))
    }

    fn bytes(&mut self, len: u16) -> Result<Vec<u8>> {
        Ok(self.take(usize::from(len))?.to_vec())
    }
}

struct WireWriter {
    buf: Vec<u8>,
}

impl WireWriter {
    fn new(op: u8) -> Self {
        Self { buf: vec![op] }
    }

    fn u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn i16(&mut self, v: i16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn name(&mut self, name: &[u8]) -> Result<()> {
        if name.len() > MAX_NAME_LEN {
            return Err(FrameError::NameTooLong {
                len: name.len(),
                max: MAX_NAME_LEN,
            });
        }
        let start = self.buf.len();
        self.buf.extend_from_slice(name);
        self.buf.resize(start + NAME_FIELD, 0);
        Ok(())
    }

    fn bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    fn finish(self) -> Vec<u8> {
        self.buf
    }
}

/// Length prefix for a text field, rejecting text that does not fit.
fn text_len(text: &[u8]) -> Result<u16> {
    u16::try_from(text.len()).map_err(|_| FrameError::TextTooLong {
        len: text.len(),
        max: MAX_TEXT_LEN,
    })
}

// ---------------------------------------------------------------------------
// Shared payloads
// ---------------------------------------------------------------------------

fn read_character(r: &mut WireReader<'_>) -> Result<Character> {
    let name = r.name()?;
    let status = Status::from_bits(r.u8()?);
    let attack = r.u16()?;
    let defense = r.u16()?;
    let regen = r.u16()?;
    let health = r.i16()?;
    let gold = r.u16()?;
    let room = RoomId(r.u16()?);
    let desc_len = r.u16()?;
    let description = r.text(desc_len)?;
    Ok(Character {
        name,
        status,
        attack,
        defense,
        regen,
        health,
        gold,
        room,
        description,
    })
}

fn write_character(w: &mut WireWriter, c: &Character) -> Result<()> {
    let desc_len = text_len(c.description.as_bytes())?;
    w.name(c.name.as_bytes())?;
    w.u8(c.status.to_bits());
    w.u16(c.attack);
    w.u16(c.defense);
    w.u16(c.regen);
    w.i16(c.health);
    w.u16(c.gold);
    w.u16(c.room.0);
    w.u16(desc_len);
    w.bytes(c.description.as_bytes());
    Ok(())
}

fn read_room(r: &mut WireReader<'_>) -> Result<Room> {
    let number = RoomId(r.u16()?);
    let name = r.name()?;
    let desc_len = r.u16()?;
    let description = r.text(desc_len)?;
    Ok(Room {
        number,
        name,
        description,
    })
}

fn write_room(w: &mut WireWriter, room: &Room) -> Result<()> {
    let desc_len = text_len(room.description.as_bytes())?;
    w.u16(room.number.0);
    w.name(room.name.as_bytes())?;
    w.u16(desc_len);
    w.bytes(room.description.as_bytes());
    Ok(())
}

fn read_chat(r: &mut WireReader<'_>) -> Result<ChatMessage> {
    let body_len = r.u16()?;
    let recipient = r.name()?;
    let sender = r.name()?;
    let body = r.text(body_len)?;
    Ok(ChatMessage {
        recipient,
        sender,
        body,
    })
}

fn write_chat(w: &mut WireWriter, chat: &ChatMessage) -> Result<()> {
    w.u16(text_len(chat.body.as_bytes())?);
    w.name(chat.recipient.as_bytes())?;
    w.name(chat.sender.as_bytes())?;
    w.bytes(chat.body.as_bytes());
    Ok(())
}

// ---------------------------------------------------------------------------
// Client -> server
// ---------------------------------------------------------------------------

impl WireMessage for ClientMessage {
    fn frame_len(buf: &[u8]) -> Result<Option<usize>> {
        let Some(&op) = buf.first() else {
            return Ok(None);
        };
        Ok(match op {
            opcode::MESSAGE => variable(buf, CHAT_FIXED, CHAT_LEN_AT),
            opcode::MOVE => fixed(buf, MOVE_LEN),
            opcode::CHARACTER => variable(buf, CHARACTER_FIXED, CHARACTER_LEN_AT),
            // Bodiless requests, and unknown opcodes, which cannot be
            // delimited any other way.
            _ => Some(1),
        })
    }

    fn decode(frame: &[u8]) -> Result<Self> {
        let mut r = WireReader::new(frame);
        Ok(match r.u8()? {
            opcode::MESSAGE => Self::Chat(read_chat(&mut r)?),
            opcode::MOVE => Self::Move(RoomId(r.u16()?)),
            opcode::FIGHT => Self::Fight,
            opcode::PVP_FIGHT => Self::PvpFight,
            opcode::LOOT => Self::Loot,
            opcode::START => Self::Start,
            opcode::CHARACTER => Self::CreateCharacter(read_character(&mut r)?),
            opcode::QUIT => Self::Quit,
            other => Self::Unknown(other),
        })
    }

    fn encode(&self) -> Result<Vec<u8>> {
        let w = match self {
            Self::Chat(chat) => {
                let mut w = WireWriter::new(opcode::MESSAGE);
                write_chat(&mut w, chat)?;
                w
            }
            Self::Move(room) => {
                let mut w = WireWriter::new(opcode::MOVE);
                w.u16(room.0);
                w
            }
            Self::Fight => WireWriter::new(opcode::FIGHT),
            Self::PvpFight => WireWriter::new(opcode::PVP_FIGHT),
            Self::Loot => WireWriter::new(opcode::LOOT),
            Self::Start => WireWriter::new(opcode::START),
            Self::CreateCharacter(c) => {
                let mut w = WireWriter::new(opcode::CHARACTER);
                write_character(&mut w, c)?;
                w
            }
            Self::Quit => WireWriter::new(opcode::QUIT),
            Self::Unknown(op) => WireWriter::new(*op),
        };
        Ok(w.finish())
    }
}

// ---------------------------------------------------------------------------
// Server -> client
// ---------------------------------------------------------------------------

impl WireMessage for ServerMessage {
    fn frame_len(buf: &[u8]) -> Result<Option<usize>> {
        let Some(&op) = buf.first() else {
            return Ok(None);
        };
        Ok(match op {
            opcode::MESSAGE => variable(buf, CHAT_FIXED, CHAT_LEN_AT),
            opcode::ERROR => variable(buf, ERROR_FIXED, ERROR_LEN_AT),
            opcode::ACCEPT => fixed(buf, ACCEPT_LEN),
            opcode::ROOM | opcode::CONNECTION => variable(buf, ROOM_FIXED, ROOM_LEN_AT),
            opcode::CHARACTER => variable(buf, CHARACTER_FIXED, CHARACTER_LEN_AT),
            opcode::GAME => variable(buf, GAME_FIXED, GAME_LEN_AT),
            opcode::VERSION => variable(buf, VERSION_FIXED, VERSION_LEN_AT),
            other => return Err(FrameError::UnknownOpcode(other)),
        })
    }

    fn decode(frame: &[u8]) -> Result<Self> {
        let mut r = WireReader::new(frame);
        Ok(match r.u8()? {
            opcode::MESSAGE => Self::Chat(read_chat(&mut r)?),
            opcode::ERROR => {
                let code = ErrorCode::from_u8(r.u8()?);
                let len = r.u16()?;
                let message = r.text(len)?;
                Self::Error { code, message }
            }
            opcode::ACCEPT => Self::Accept(r.u8()?),
            opcode::ROOM => Self::Room(read_room(&mut r)?),
            opcode::CHARACTER => Self::Character(read_character(&mut r)?),
            opcode::GAME => {
                let initial_points = r.u16()?;
                let stat_limit = r.u16()?;
                let len = r.u16()?;
                let description = r.text(len)?;
                Self::Game {
                    initial_points,
                    stat_limit,
                    description,
                }
            }
            opcode::CONNECTION => Self::Connection(read_room(&mut r)?),
            opcode::VERSION => {
                let major = r.u8()?;
                let minor = r.u8()?;
                let len = r.u16()?;
                let extensions = r.bytes(len)?;
                Self::Version {
                    major,
                    minor,
                    extensions,
                }
            }
            other => return Err(FrameError::UnknownOpcode(other)),
        })
    }

    fn encode(&self) -> Result<Vec<u8>> {
        let w = match self {
            Self::Chat(chat) => {
                let mut w = WireWriter::new(opcode::MESSAGE);
                write_chat(&mut w, chat)?;
                w
            }
            Self::Error { code, message } => {
                let mut w = WireWriter::new(opcode::ERROR);
                w.u8(code.as_u8());
                w.u16(text_len(message.as_bytes())?);
                w.bytes(message.as_bytes());
                w
            }
            Self::Accept(kind) => {
                let mut w = WireWriter::new(opcode::ACCEPT);
                w.u8(*kind);
                w
            }
            Self::Room(room) => {
                let mut w = WireWriter::new(opcode::ROOM);
                write_room(&mut w, room)?;
                w
            }
            Self::Character(c) => {
                let mut w = WireWriter::new(opcode::CHARACTER);
                write_character(&mut w, c)?;
                w
            }
            Self::Game {
                initial_points,
                stat_limit,
                description,
            } => {
                let mut w = WireWriter::new(opcode::GAME);
                w.u16(*initial_points);
                w.u16(*stat_limit);
                w.u16(text_len(description.as_bytes())?);
                w.bytes(description.as_bytes());
                w
            }
            Self::Connection(room) => {
                let mut w = WireWriter::new(opcode::CONNECTION);
                write_room(&mut w, room)?;
                w
            }
            Self::Version {
                major,
                minor,
                extensions,
            } => {
                let mut w = WireWriter::new(opcode::VERSION);
                w.u8(*major);
                w.u8(*minor);
                w.u16(text_len(extensions)?);
                w.bytes(extensions);
                w
            }
        };
        Ok(w.finish())
    }
}

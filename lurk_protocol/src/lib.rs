// lurk_protocol — binary wire protocol for the LURK adventure server.
//
// This crate defines the message types, the byte-level codec, and stream
// framing used by the server (`lurk_server`) and by clients. It is shared by
// both sides and knows nothing about rooms, fights or sessions.
//
// Module overview:
// - `types.rs`:    `RoomId`, `Status` (named character flags), `ErrorCode`,
//                  opcode constants.
// - `message.rs`:  Client-to-server and server-to-client message enums, plus
//                  the shared payload structs (`Character`, `Room`,
//                  `ChatMessage`).
// - `text.rs`:    `WireText`, raw bytes of a name or text field.
// - `codec.rs`:    `WireMessage`: little-endian encode/decode of every frame
//                  kind, and `frame_len` for finding frame boundaries.
// - `framing.rs`:  `FrameReader` (reassembles frames from partial and
//                  coalesced reads) and `write_frame`.
// - `error.rs`:    `FrameError`.
//
// Design decisions:
// - **No async runtime.** Uses `std::io::Read`/`Write`, compatible with
//   blocking TCP streams, buffered wrappers and in-memory cursors.
// - **Lengths are validated, never trusted.** Encoding rejects oversized
//   names and text; decoding never reads past the frame it was given.

pub mod codec;
pub mod error;
pub mod framing;
pub mod message;
pub mod text;
pub mod types;

pub use codec::WireMessage;
pub use error::FrameError;
pub use framing::{FrameReader, write_frame};
pub use message::{
    Character, ChatMessage, ClientMessage, MAX_NAME_LEN, MAX_TEXT_LEN, Room, ServerMessage,
};
pub use text::WireText;
pub use types::{ErrorCode, RoomId, Status, opcode};

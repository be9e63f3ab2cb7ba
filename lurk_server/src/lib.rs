// lurk_server — multiplayer LURK adventure server.
//
// Clients connect over TCP, create a character, walk a directed graph of
// rooms, fight the monsters in them and send each other chat messages. The
// wire format lives in `lurk_protocol`; this crate holds the game.
//
// Module overview:
// - `config.rs`:      `GameConfig` (JSON, serde) and `ServerConfig`.
// - `error.rs`:       `GameError`, the rejections reported as Error frames.
// - `world.rs`:       `World`: rooms, connection graph, character slots, name
//                     routing and per-session outboxes. Shared under one lock.
// - `session.rs`:     Per-connection state machine and frame dispatch.
// - `transition.rs`:  Moving a character between rooms and announcing it.
// - `combat.rs`:      One simultaneous round of room combat, with loot.
// - `router.rs`:      Chat delivery by recipient name.
// - `server.rs`:      TCP listener, session threads and writer threads.
//
// The server can run as a standalone binary (`main.rs`) or be embedded, as
// the integration tests do, via `start_server`.

pub mod combat;
pub mod config;
pub mod error;
pub mod router;
pub mod server;
pub mod session;
pub mod transition;
pub mod world;

pub use config::{GameConfig, ServerConfig};
pub use server::{ServerHandle, start_server};

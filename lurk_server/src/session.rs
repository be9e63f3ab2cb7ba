// Per-connection session state machine.
//
// A `Session` is created when a connection is accepted and lives until the
// client quits or its socket fails. It holds only what is private to the
// connection: its id, the index of its character slot in the `World`, and
// where it is in the lifecycle:
//
//   Connected --create--> CharacterCreated --start--> Started
//       \______________________\_____________________\__--> Disconnected
//
// `server.rs` reads one frame at a time outside the world lock, then locks
// the `World` and calls `Session::handle`. Every precondition check, world
// mutation and outbound frame for that frame happens inside that call.
// Handlers return `Result<(), GameError>`; a rejection becomes one Error
// frame to this client and leaves the session where it was.
//
// See also: `transition.rs` (Move and Start), `combat.rs` (Fight),
// `router.rs` (chat), `world.rs` for the state being mutated.

use lurk_protocol::{Character, ChatMessage, ClientMessage, RoomId, ServerMessage, opcode};
use tracing::{debug, info};

use crate::combat;
use crate::error::GameError;
use crate::router;
use crate::transition;
use crate::world::{Outbox, SessionId, World};

/// Health every new character starts with.
pub const STARTING_HEALTH: i16 = 100;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// No character yet.
    Connected,
    CharacterCreated,
    /// In the world; may move and fight while alive.
    Started,
    Disconnected,
}

/// What the connection loop should do after a frame has been handled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct Session {
    id: SessionId,
    slot: usize,
    state: SessionState,
}

impl Session {
    /// Register a new connection with the world and greet it with the
    /// Version and Game frames.
    pub fn open(world: &mut World, outbox: Outbox) -> Self {
        let (id, slot) = world.open_session(outbox);
        let config = world.config();
        let version = ServerMessage::Version {
            major: config.version_major,
            minor: config.version_minor,
            extensions: Vec::new(),
        };
        let game = ServerMessage::Game {
            initial_points: config.initial_points,
            stat_limit: config.stat_limit,
            description: config.description.as_str().into(),
        };
        world.send_to(id, version);
        world.send_to(id, game);
        debug!(session = %id, slot, "session opened");
        Self {
            id,
            slot,
            state: SessionState::Connected,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn slot(&self) -> usize {
        self.slot
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Handle one decoded frame. Rejections are reported to the client and
    /// do not end the session.
    pub fn handle(&mut self, world: &mut World, message: ClientMessage) -> Flow {
        if self.state == SessionState::Disconnected {
            return Flow::Quit;
        }
        if message == ClientMessage::Quit {
            self.close(world);
            return Flow::Quit;
        }
        if let Err(err) = self.dispatch(world, message) {
            debug!(session = %self.id, code = err.code().as_u8(), "rejected: {err}");
            world.send_to(self.id, err.to_message());
        }
        Flow::Continue
    }

    /// Leave the world: the outbox and any routing entry for this session
    /// are dropped. The character stays where it is.
    pub fn close(&mut self, world: &mut World) {
        if self.state == SessionState::Disconnected {
            return;
        }
        world.close_session(self.id);
        self.state = SessionState::Disconnected;
        info!(session = %self.id, "session closed");
    }

    fn dispatch(&mut self, world: &mut World, message: ClientMessage) -> Result<(), GameError> {
        match message {
            ClientMessage::CreateCharacter(proposed) => self.create_character(world, proposed),
            ClientMessage::Start => self.start(world),
            ClientMessage::Fight => self.fight(world),
            ClientMessage::Move(room) => self.change_room(world, room),
            ClientMessage::Chat(chat) => self.chat(world, chat),
            ClientMessage::Loot => Err(GameError::LootAutomatic),
            ClientMessage::PvpFight => Err(GameError::PvpUnsupported),
            ClientMessage::Unknown(op) => Err(GameError::UnknownMessage(op)),
            ClientMessage::Quit => Ok(()),
        }
    }

    fn create_character(&mut self, world: &mut World, proposed: Character) -> Result<(), GameError> {
        if self.state != SessionState::Connected {
            return Err(GameError::CharacterExists);
        }
        let limit = world.config().initial_points;
        let total = proposed.stat_total();
        if total > u32::from(limit) {
            return Err(GameError::StatBudget { total, limit });
        }
        if proposed.name.is_empty() || proposed.name.len() > lurk_protocol::MAX_NAME_LEN {
            return Err(GameError::InvalidName);
        }
        world.register_name(&proposed.name, self.id)?;

        let character = Character {
            status: proposed.status.creation(),
            health: STARTING_HEALTH,
            gold: 0,
            room: RoomId(0),
            ..proposed
        };
        info!(session = %self.id, name = %character.name, "character created");
        world.fill_slot(self.slot, character.clone());
        self.state = SessionState::CharacterCreated;

        world.send_to(self.id, ServerMessage::Accept(opcode::CHARACTER));
        world.send_to(self.id, ServerMessage::Character(character));
        Ok(())
    }

    fn start(&mut self, world: &mut World) -> Result<(), GameError> {
        match self.state {
            SessionState::Connected => return Err(GameError::NoCharacter),
            SessionState::Started => return Err(GameError::AlreadyStarted),
            _ => {}
        }
        let character = world
            .character_mut(self.slot)
            .ok_or(GameError::NoCharacter)?;
        character.status.started = true;
        let snapshot = character.clone();
        self.state = SessionState::Started;
        info!(session = %self.id, name = %snapshot.name, "started");

        world.send_to(self.id, ServerMessage::Character(snapshot));
        transition::change_room(world, self.id, self.slot, RoomId(0));
        Ok(())
    }

    /// The character, if this session may act in the world right now.
    fn active_character<'w>(&self, world: &'w World) -> Result<&'w Character, GameError> {
        if self.state != SessionState::Started {
            return Err(GameError::NotStarted);
        }
        match world.character(self.slot) {
            Some(c) if c.status.alive => Ok(c),
            _ => Err(GameError::NotAlive),
        }
    }

    fn fight(&mut self, world: &mut World) -> Result<(), GameError> {
        let room = self.active_character(world)?.room;
        let has_prey = world
            .occupants(room)
            .into_iter()
            .filter_map(|slot| world.character(slot))
            .any(|c| c.status.monster && c.status.alive);
        if !has_prey {
            return Err(GameError::NoMonsters);
        }
        combat::fight(world, self.slot);
        Ok(())
    }

    fn change_room(&mut self, world: &mut World, destination: RoomId) -> Result<(), GameError> {
        let here = self.active_character(world)?.room;
        if destination.index() >= world.room_count() {
            return Err(GameError::NoSuchRoom(destination));
        }
        if !world.is_connected(here, destination) {
            return Err(GameError::NoConnection(destination));
        }
        transition::change_room(world, self.id, self.slot, destination);
        Ok(())
    }

    fn chat(&mut self, world: &mut World, chat: ChatMessage) -> Result<(), GameError> {
        if self.state == SessionState::Connected {
            return Err(GameError::NoCharacter);
        }
        router::route_chat(world, chat)
    }
}

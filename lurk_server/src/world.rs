// Shared world state: rooms, the connection graph, character slots, the
// name routing table and the registry of live sessions.
//
// One `World` exists per server. It is wrapped in a single `Mutex`
// (`server::SharedWorld`) and every read or mutation, including queuing
// outbound frames, happens while that lock is held, so the whole effect of
// one inbound frame is atomic with respect to every other session.
//
// Character slots: a slot is appended for every accepted connection before
// any character data arrives, and slots are never removed. A slot that never
// received a character is *vacant* and is skipped by every query. A filled
// slot whose session has gone stays in its room as an inert character.
//
// Outbound frames never touch a socket here. Each session registers an
// `Outbox` (the sending half of an `mpsc` channel drained by that
// connection's writer thread), and `send_to` only enqueues. Frames for one
// recipient are therefore delivered in lock-acquisition order, while a slow
// peer delays nobody but itself.
//
// See also: `session.rs` for the per-connection state machine that drives
// this, `server.rs` for the lock and the writer threads.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::mpsc::Sender;

use lurk_protocol::{Character, Room, RoomId, ServerMessage, WireText};
use tracing::debug;

use crate::config::GameConfig;
use crate::error::GameError;

/// Server-assigned identifier of one accepted connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Queue of frames waiting to be written to one client.
pub type Outbox = Sender<ServerMessage>;

struct SessionEntry {
    slot: usize,
    outbox: Outbox,
}

pub struct World {
    config: GameConfig,
    rooms: Vec<Room>,
    /// Directed adjacency, indexed by source room.
    connections: Vec<BTreeSet<RoomId>>,
    slots: Vec<Option<Character>>,
    routes: BTreeMap<WireText, SessionId>,
    sessions: BTreeMap<SessionId, SessionEntry>,
    next_session_id: u64,
}

impl World {
    /// An empty world: no rooms, no characters.
    pub fn new(config: GameConfig) -> Self {
        Self {
            config,
            rooms: Vec::new(),
            connections: Vec::new(),
            slots: Vec::new(),
            routes: BTreeMap::new(),
            sessions: BTreeMap::new(),
            next_session_id: 0,
        }
    }

    /// Build the starting world from config: `room_count` rooms joined in a
    /// ring, and one monster in each. `room_count` is a `u16`, so every room
    /// gets an id.
    pub fn seed(config: &GameConfig) -> Self {
        let mut world = Self::new(config.clone());
        for i in 0..config.room_count {
            world.add_room(
                format!("{} {i}", config.room_name_prefix).into(),
                config.room_description.as_str().into(),
            );
        }
        for i in 0..config.room_count {
            let next = if i + 1 == config.room_count { 0 } else { i + 1 };
            world.add_connection(RoomId(i), RoomId(next));
        }
        let monster = &config.monster;
        for i in 0..config.room_count {
            world.add_character(Character {
                name: format!("{} {i}", monster.name_prefix).into(),
                status: monster.status(),
                attack: monster.attack,
                defense: monster.defense,
                regen: monster.regen,
                health: monster.health,
                gold: monster.gold,
                room: RoomId(i),
                description: monster.description.as_str().into(),
            });
        }
        world
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    // -----------------------------------------------------------------------
    // Rooms and the connection graph
    // -----------------------------------------------------------------------

    /// Append a room and return its id. Room ids are dense, starting at 0.
    /// Returns `None`, adding nothing, once all 65536 ids are taken.
    pub fn add_room(&mut self, name: WireText, description: WireText) -> Option<RoomId> {
        let number = RoomId(u16::try_from(self.rooms.len()).ok()?);
        self.rooms.push(Room {
            number,
            name,
            description,
        });
        self.connections.push(BTreeSet::new());
        Some(number)
    }

    pub fn room(&self, id: RoomId) -> Option<&Room> {
        self.rooms.get(id.index())
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Allow movement from `from` to `to`. Ignored if `from` does not exist.
    pub fn add_connection(&mut self, from: RoomId, to: RoomId) {
        if let Some(edges) = self.connections.get_mut(from.index()) {
            edges.insert(to);
        }
    }

    pub fn is_connected(&self, from: RoomId, to: RoomId) -> bool {
        self.connections
            .get(from.index())
            .is_some_and(|edges| edges.contains(&to))
    }

    /// Rooms reachable in one move from `from`, in room-number order.
    pub fn connections_from(&self, from: RoomId) -> Vec<Room> {
        self.connections
            .get(from.index())
            .into_iter()
            .flatten()
            .filter_map(|to| self.room(*to).cloned())
            .collect()
    }

    // -----------------------------------------------------------------------
    // Character slots
    // -----------------------------------------------------------------------

    /// Append a filled slot (used for seeding monsters). Returns its index.
    pub fn add_character(&mut self, character: Character) -> usize {
        self.slots.push(Some(character));
        self.slots.len() - 1
    }

    /// Append a vacant slot for a connection that has no character yet.
    pub fn reserve_slot(&mut self) -> usize {
        self.slots.push(None);
        self.slots.len() - 1
    }

    pub fn fill_slot(&mut self, slot: usize, character: Character) {
        if let Some(entry) = self.slots.get_mut(slot) {
            *entry = Some(character);
        }
    }

    pub fn character(&self, slot: usize) -> Option<&Character> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    pub fn character_mut(&mut self, slot: usize) -> Option<&mut Character> {
        self.slots.get_mut(slot).and_then(Option::as_mut)
    }

    /// Slots of every character in `room`, in slot order.
    pub fn occupants(&self, room: RoomId) -> Vec<usize> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(slot, c)| c.as_ref().filter(|c| c.room == room).map(|_| slot))
            .collect()
    }

    /// Mutable access to every character in `room`, in slot order.
    pub fn occupants_mut(&mut self, room: RoomId) -> Vec<(usize, &mut Character)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(slot, c)| c.as_mut().map(|c| (slot, c)))
            .filter(|(_, c)| c.room == room)
            .collect()
    }

    // -----------------------------------------------------------------------
    // Sessions and routing
    // -----------------------------------------------------------------------

    /// Register a new connection: reserve its character slot and its outbox.
    pub fn open_session(&mut self, outbox: Outbox) -> (SessionId, usize) {
        let id = SessionId(self.next_session_id);
        self.next_session_id += 1;
        let slot = self.reserve_slot();
        self.sessions.insert(id, SessionEntry { slot, outbox });
        (id, slot)
    }

    /// Forget a connection. Its routing entry goes too, if it still points
    /// at this session; its character slot stays.
    pub fn close_session(&mut self, id: SessionId) {
        self.sessions.remove(&id);
        self.routes.retain(|_, owner| *owner != id);
    }

    /// Route `name` to `id`. A name held by another live session is refused.
    pub fn register_name(&mut self, name: &WireText, id: SessionId) -> Result<(), GameError> {
        match self.routes.get(name) {
            Some(owner) if *owner != id => Err(GameError::NameTaken(name.clone())),
            _ => {
                self.routes.insert(name.clone(), id);
                Ok(())
            }
        }
    }

    pub fn route(&self, name: &[u8]) -> Option<SessionId> {
        self.routes.get(name).copied()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// The live session controlling `slot`, if any.
    pub fn session_for_slot(&self, slot: usize) -> Option<SessionId> {
        self.sessions
            .iter()
            .find(|(_, entry)| entry.slot == slot)
            .map(|(id, _)| *id)
    }

    /// Live sessions whose character is in `room`, in connection order.
    pub fn sessions_in(&self, room: RoomId) -> Vec<SessionId> {
        self.sessions
            .iter()
            .filter(|(_, entry)| self.character(entry.slot).is_some_and(|c| c.room == room))
            .map(|(id, _)| *id)
            .collect()
    }

    /// Queue a frame for one session. Frames for sessions that have gone,
    /// or whose writer has stopped, are dropped.
    pub fn send_to(&self, id: SessionId, message: ServerMessage) {
        match self.sessions.get(&id) {
            Some(entry) => {
                if entry.outbox.send(message).is_err() {
                    debug!(session = %id, "outbox closed, frame dropped");
                }
            }
            None => debug!(session = %id, "no such session, frame dropped"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc::{self, Receiver};

    use lurk_protocol::Status;

    use super::*;

    fn drain(rx: &Receiver<ServerMessage>) -> Vec<ServerMessage> {
        rx.try_iter().collect()
    }

    #[test]
    fn seed_builds_a_ring_with_one_monster_per_room() {
        let config = GameConfig::default();
        let world = World::seed(&config);
        assert_eq!(world.room_count(), 10);
        assert_eq!(world.room(RoomId(0)).unwrap().name, "Test Room 0");
        for i in 0..10u16 {
            let next = (i + 1) % 10;
            assert!(world.is_connected(RoomId(i), RoomId(next)));
            let occupants = world.occupants(RoomId(i));
            assert_eq!(occupants.len(), 1);
            let monster = world.character(occupants[0]).unwrap();
            assert_eq!(monster.name, format!("Test Monster {i}"));
            assert_eq!(monster.status, Status::ALL);
            assert_eq!(monster.health, 50);
            assert_eq!(monster.gold, 1);
        }
    }

    #[test]
    fn arbitrary_graph_edges() {
        let mut world = World::new(GameConfig::default());
        let a = world.add_room("a".into(), WireText::default()).unwrap();
        let b = world.add_room("b".into(), WireText::default()).unwrap();
        let c = world.add_room("c".into(), WireText::default()).unwrap();
        world.add_connection(a, c);
        world.add_connection(a, b);
        world.add_connection(RoomId(99), a);
        assert!(world.is_connected(a, b));
        assert!(!world.is_connected(b, a));
        assert!(!world.is_connected(RoomId(99), a));
        let names: Vec<String> = world
            .connections_from(a)
            .into_iter()
            .map(|r| r.name.to_string())
            .collect();
        assert_eq!(names, vec!["b", "c"]);
        assert!(world.connections_from(RoomId(7)).is_empty());
    }

    #[test]
    fn room_ids_stop_at_the_last_u16() {
        let mut world = World::new(GameConfig::default());
        for i in 0..=u16::MAX {
            assert_eq!(
                world.add_room(WireText::default(), WireText::default()),
                Some(RoomId(i))
            );
        }
        assert_eq!(world.add_room("one too many".into(), WireText::default()), None);
        assert_eq!(world.room_count(), usize::from(u16::MAX) + 1);
        assert_eq!(world.room(RoomId(u16::MAX)).unwrap().number, RoomId(u16::MAX));
    }

    #[test]
    fn names_route_by_exact_bytes() {
        let mut world = World::new(GameConfig::default());
        let (tx, _rx) = mpsc::channel();
        let (id, _) = world.open_session(tx);
        world.register_name(&WireText::new(vec![0xE9, b'A']), id).unwrap();
        assert_eq!(world.route(&[0xE9, b'A']), Some(id));
        assert_eq!(world.route("\u{FFFD}A".as_bytes()), None);
    }

    #[test]
    fn vacant_slots_are_invisible() {
        let mut world = World::seed(&GameConfig::default());
        let (tx, _rx) = mpsc::channel();
        let (_id, slot) = world.open_session(tx);
        assert!(world.character(slot).is_none());
        assert_eq!(world.occupants(RoomId(0)).len(), 1);
        assert!(world.sessions_in(RoomId(0)).is_empty());
    }

    #[test]
    fn duplicate_live_name_is_refused() {
        let mut world = World::new(GameConfig::default());
        let (tx1, _rx1) = mpsc::channel();
        let (tx2, _rx2) = mpsc::channel();
        let (a, _) = world.open_session(tx1);
        let (b, _) = world.open_session(tx2);
        let name = WireText::from("Aranel");
        world.register_name(&name, a).unwrap();
        assert_eq!(
            world.register_name(&name, b),
            Err(GameError::NameTaken("Aranel".into()))
        );
        assert_eq!(world.route(b"Aranel"), Some(a));

        // Once the owner is gone the name is free again.
        world.close_session(a);
        assert_eq!(world.route(b"Aranel"), None);
        world.register_name(&name, b).unwrap();
        assert_eq!(world.route(b"Aranel"), Some(b));
    }

    #[test]
    fn closed_session_keeps_its_character() {
        let mut world = World::new(GameConfig::default());
        world.add_room("hall".into(), WireText::default());
        let (tx, _rx) = mpsc::channel();
        let (id, slot) = world.open_session(tx);
        world.fill_slot(
            slot,
            Character {
                name: "Ghost".into(),
                ..Character::default()
            },
        );
        world.register_name(&"Ghost".into(), id).unwrap();
        world.close_session(id);
        assert_eq!(world.session_count(), 0);
        assert_eq!(world.occupants(RoomId(0)), vec![slot]);
        assert_eq!(world.session_for_slot(slot), None);
    }

    #[test]
    fn send_to_enqueues_in_order_and_tolerates_gone_sessions() {
        let mut world = World::new(GameConfig::default());
        let (tx, rx) = mpsc::channel();
        let (id, _) = world.open_session(tx);
        world.send_to(id, ServerMessage::Accept(10));
        world.send_to(id, ServerMessage::Accept(6));
        assert_eq!(
            drain(&rx),
            vec![ServerMessage::Accept(10), ServerMessage::Accept(6)]
        );

        world.close_session(id);
        world.send_to(id, ServerMessage::Accept(1));
        assert!(drain(&rx).is_empty());
    }
}

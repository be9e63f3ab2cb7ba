// Moving a character between rooms.
//
// The caller has already checked that the destination exists and is
// reachable. The frames go out in a fixed order:
//   1. the mover's new state, to the mover;
//   2. the mover's new state, to every session still in the room left;
//   3. the destination room, to the mover;
//   4. the mover's new state, to every session in the destination
//      (the mover included);
//   5. one Connection frame per outgoing edge of the destination;
//   6. every character in the destination, to the mover.
// Nobody else hears about the move.
//
// Starting a character reuses this with room 0 as both origin and
// destination, so peers in room 0 see the newcomer twice.

use lurk_protocol::{RoomId, ServerMessage};
use tracing::debug;

use crate::world::{SessionId, World};

/// Move the character in `slot`, controlled by `mover`, to `destination`.
pub fn change_room(world: &mut World, mover: SessionId, slot: usize, destination: RoomId) {
    let Some(character) = world.character_mut(slot) else {
        return;
    };
    let leaving = character.room;
    character.room = destination;
    let moved = character.clone();
    debug!(name = %moved.name, from = %leaving, to = %destination, "room change");

    world.send_to(mover, ServerMessage::Character(moved.clone()));

    for peer in world.sessions_in(leaving) {
        world.send_to(peer, ServerMessage::Character(moved.clone()));
    }

    if let Some(room) = world.room(destination).cloned() {
        world.send_to(mover, ServerMessage::Room(room));
    }

    for peer in world.sessions_in(destination) {
        world.send_to(peer, ServerMessage::Character(moved.clone()));
    }

    for room in world.connections_from(destination) {
        world.send_to(mover, ServerMessage::Connection(room));
    }

    for occupant in world.occupants(destination) {
        if let Some(other) = world.character(occupant).cloned() {
            world.send_to(mover, ServerMessage::Character(other));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc::{self, Receiver};

    use lurk_protocol::{Character, Status};

    use super::*;
    use crate::config::GameConfig;

    fn join(world: &mut World, name: &str, room: RoomId) -> (SessionId, usize, Receiver<ServerMessage>) {
        let (tx, rx) = mpsc::channel();
        let (id, slot) = world.open_session(tx);
        world.fill_slot(
            slot,
            Character {
                name: name.into(),
                status: Status {
                    alive: true,
                    started: true,
                    ..Status::default()
                },
                health: 100,
                room,
                ..Character::default()
            },
        );
        world.register_name(&name.into(), id).unwrap();
        (id, slot, rx)
    }

    fn kinds(rx: &Receiver<ServerMessage>) -> Vec<String> {
        rx.try_iter()
            .map(|m| match m {
                ServerMessage::Character(c) => format!("char:{}", c.name),
                ServerMessage::Room(r) => format!("room:{}", r.number.0),
                ServerMessage::Connection(r) => format!("conn:{}", r.number.0),
                other => format!("{other:?}"),
            })
            .collect()
    }

    #[test]
    fn mover_receives_frames_in_order() {
        let mut world = World::seed(&GameConfig::default());
        let (id, slot, rx) = join(&mut world, "Aranel", RoomId(0));

        change_room(&mut world, id, slot, RoomId(1));

        assert_eq!(world.character(slot).unwrap().room, RoomId(1));
        assert_eq!(
            kinds(&rx),
            vec![
                "char:Aranel",
                "room:1",
                "char:Aranel",
                "conn:2",
                "char:Test Monster 1",
                "char:Aranel",
            ]
        );
    }

    #[test]
    fn peers_see_departure_and_arrival() {
        let mut world = World::seed(&GameConfig::default());
        let (mover, slot, _mover_rx) = join(&mut world, "Aranel", RoomId(0));
        let (_, _, left_rx) = join(&mut world, "Stays", RoomId(0));
        let (_, _, dest_rx) = join(&mut world, "Waits", RoomId(1));
        let (_, _, far_rx) = join(&mut world, "Far", RoomId(5));

        change_room(&mut world, mover, slot, RoomId(1));

        assert_eq!(kinds(&left_rx), vec!["char:Aranel"]);
        assert_eq!(kinds(&dest_rx), vec!["char:Aranel"]);
        assert!(kinds(&far_rx).is_empty());
    }

    #[test]
    fn every_outgoing_edge_is_announced() {
        let mut world = World::new(GameConfig::default());
        for name in ["hub", "north", "south", "east"] {
            world.add_room(name.into(), Default::default());
        }
        world.add_connection(RoomId(1), RoomId(0));
        world.add_connection(RoomId(0), RoomId(3));
        world.add_connection(RoomId(0), RoomId(1));
        world.add_connection(RoomId(0), RoomId(2));
        let (id, slot, rx) = join(&mut world, "Aranel", RoomId(1));

        change_room(&mut world, id, slot, RoomId(0));

        let conns: Vec<String> = kinds(&rx)
            .into_iter()
            .filter(|k| k.starts_with("conn:"))
            .collect();
        assert_eq!(conns, vec!["conn:1", "conn:2", "conn:3"]);
    }
}

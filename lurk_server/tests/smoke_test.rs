// Integration smoke test for the LURK server.
//
// Starts a server on localhost and drives one client through the whole
// lifecycle over a plain TCP socket: greeting, character creation, start,
// a move, a fight to the death, and Quit.
//
// The client uses only the protocol crate's framing and message types, so
// this exercises the real listener, session thread and writer thread with
// no test harness in between.

use std::net::TcpStream;
use std::time::Duration;

use lurk_protocol::{
    Character, ClientMessage, FrameReader, RoomId, ServerMessage, Status, write_frame,
};
use lurk_server::config::ServerConfig;
use lurk_server::server::start_server;

fn send(stream: &mut TcpStream, msg: &ClientMessage) {
    write_frame(stream, msg).unwrap();
}

fn recv(reader: &mut FrameReader<TcpStream>) -> ServerMessage {
    reader.read_frame().unwrap().expect("connection closed early")
}

/// Read frames until `done` matches one; return all of them.
fn recv_until(
    reader: &mut FrameReader<TcpStream>,
    done: impl Fn(&ServerMessage) -> bool,
) -> Vec<ServerMessage> {
    let mut frames = Vec::new();
    loop {
        let msg = recv(reader);
        let last = done(&msg);
        frames.push(msg);
        if last {
            return frames;
        }
    }
}

#[test]
fn full_session_lifecycle() {
    // 1. Start a server on a random port.
    let config = ServerConfig {
        port: 0,
        ..ServerConfig::default()
    };
    let (handle, addr) = start_server(config).unwrap();

    let mut stream = TcpStream::connect(addr).unwrap();
    stream
        .set_read_timeout(Some(Duration::from_secs(5)))
        .unwrap();
    let mut reader = FrameReader::new(stream.try_clone().unwrap());

    // 2. Greeting: Version, then Game.
    assert_eq!(
        recv(&mut reader),
        ServerMessage::Version {
            major: 2,
            minor: 3,
            extensions: vec![],
        }
    );
    match recv(&mut reader) {
        ServerMessage::Game {
            initial_points,
            description,
            ..
        } => {
            assert_eq!(initial_points, 100);
            assert_eq!(description, "LURK Test Realm");
        }
        other => panic!("expected Game, got {other:?}"),
    }

    // 3. Create a character. The server picks room, gold and health.
    send(
        &mut stream,
        &ClientMessage::CreateCharacter(Character {
            name: "Smoke".into(),
            status: Status {
                alive: true,
                combatant: true,
                ..Status::default()
            },
            attack: 20,
            defense: 20,
            regen: 10,
            health: 1,
            gold: 1000,
            description: "just passing through".into(),
            ..Character::default()
        }),
    );
    assert_eq!(recv(&mut reader), ServerMessage::Accept(10));
    match recv(&mut reader) {
        ServerMessage::Character(c) => {
            assert_eq!(c.name, "Smoke");
            assert_eq!(c.health, 100);
            assert_eq!(c.gold, 0);
            assert_eq!(c.room, RoomId(0));
        }
        other => panic!("expected Character, got {other:?}"),
    }

    // 4. Start: the arrival ends with the room's occupants, this character
    //    last.
    send(&mut stream, &ClientMessage::Start);
    let frames = recv_until(&mut reader, |m| {
        matches!(m, ServerMessage::Character(c) if c.name == "Smoke" && c.status.started)
    });
    assert!(matches!(frames[0], ServerMessage::Character(_)));
    let frames = recv_until(&mut reader, |m| matches!(m, ServerMessage::Room(_)));
    assert_eq!(
        frames.last(),
        Some(&ServerMessage::Room(lurk_protocol::Room {
            number: RoomId(0),
            name: "Test Room 0".into(),
            description: "Placeholder room for testing".into(),
        }))
    );
    recv_until(&mut reader, |m| {
        matches!(m, ServerMessage::Connection(r) if r.number == RoomId(1))
    });
    recv_until(&mut reader, |m| {
        matches!(m, ServerMessage::Character(c) if c.name == "Smoke")
    });

    // 5. Move one room along the ring.
    send(&mut stream, &ClientMessage::Move(RoomId(1)));
    let frames = recv_until(&mut reader, |m| {
        matches!(m, ServerMessage::Connection(r) if r.number == RoomId(2))
    });
    assert!(frames.contains(&ServerMessage::Room(lurk_protocol::Room {
        number: RoomId(1),
        name: "Test Room 1".into(),
        description: "Placeholder room for testing".into(),
    })));
    recv_until(&mut reader, |m| {
        matches!(m, ServerMessage::Character(c) if c.name == "Smoke")
    });

    // 6. Fight the room's monster three times. Each round refreshes every
    //    occupant: the monster first, then us.
    let mut monster_health = Vec::new();
    for _ in 0..3 {
        send(&mut stream, &ClientMessage::Fight);
        let frames = recv_until(&mut reader, |m| {
            matches!(m, ServerMessage::Character(c) if c.name == "Smoke")
        });
        for frame in &frames {
            if let ServerMessage::Character(c) = frame {
                if c.name == "Test Monster 1" {
                    monster_health.push(c.health);
                }
            }
        }
        if let Some(ServerMessage::Character(me)) = frames.last() {
            if monster_health.last() == Some(&0) {
                assert_eq!(me.gold, 1);
            }
        }
    }
    assert_eq!(monster_health, vec![30, 10, 0]);

    // 7. Nothing left to fight.
    send(&mut stream, &ClientMessage::Fight);
    match recv(&mut reader) {
        ServerMessage::Error { code, .. } => assert_eq!(code.as_u8(), 7),
        other => panic!("expected Error, got {other:?}"),
    }

    // 8. Quit: the server closes the connection.
    send(&mut stream, &ClientMessage::Quit);
    assert!(reader.read_frame::<ServerMessage>().unwrap().is_none());

    handle.stop();
}

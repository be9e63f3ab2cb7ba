// Test-only LURK client for end-to-end tests.
//
// Wraps a real `TcpStream` with the protocol crate's `FrameReader` and
// `write_frame`, and gives tests a blocking, panic-on-surprise API:
// connect, create, start, move, fight, chat, read what comes back.
//
// Synchronising with the server: frames to one client are delivered in the
// order the server handled them, and a Loot request is always answered with
// the same Error frame whatever the session's state. `sync` sends Loot and
// collects everything up to that answer, so after it returns every frame
// caused by earlier requests (this client's or anyone's already handled) is
// in hand. No sleeps are needed to wait for broadcasts.
//
// See also: `tests/full_pipeline.rs` for the scenarios.

use std::io::{ErrorKind, Write};
use std::net::{SocketAddr, TcpStream};
use std::time::Duration;

use lurk_protocol::{
    Character, ChatMessage, ClientMessage, ErrorCode, FrameError, FrameReader, RoomId,
    ServerMessage, Status, write_frame,
};
use lurk_server::config::{GameConfig, ServerConfig};
use lurk_server::server::{ServerHandle, start_server};

/// Read timeout for a frame the test expects to arrive.
const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// Start a server on a free localhost port with the given game config.
pub fn start_test_server_with(game: GameConfig) -> (ServerHandle, SocketAddr) {
    let config = ServerConfig {
        host: "127.0.0.1".into(),
        port: 0,
        game,
    };
    start_server(config).expect("start_server failed")
}

/// Start a server with the stock test world.
pub fn start_test_server() -> (ServerHandle, SocketAddr) {
    start_test_server_with(GameConfig::default())
}

fn is_sync_reply(message: &ServerMessage) -> bool {
    matches!(
        message,
        ServerMessage::Error { code: ErrorCode::Other, message }
            if message == "Loot is distributed automatically by fights"
    )
}

pub struct TestClient {
    reader: FrameReader<TcpStream>,
    writer: TcpStream,
    pub name: String,
}

impl TestClient {
    /// Connect without reading anything.
    pub fn connect_raw(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).expect("connect failed");
        stream
            .set_read_timeout(Some(RECV_TIMEOUT))
            .expect("set_read_timeout failed");
        let writer = stream.try_clone().expect("try_clone failed");
        Self {
            reader: FrameReader::new(stream),
            writer,
            name: String::new(),
        }
    }

    /// Connect and consume the Version and Game greeting.
    pub fn connect(addr: SocketAddr) -> Self {
        let mut client = Self::connect_raw(addr);
        let version = client.recv();
        assert!(
            matches!(version, ServerMessage::Version { .. }),
            "expected Version, got {version:?}"
        );
        let game = client.recv();
        assert!(
            matches!(game, ServerMessage::Game { .. }),
            "expected Game, got {game:?}"
        );
        client
    }

    pub fn send(&mut self, message: &ClientMessage) {
        write_frame(&mut self.writer, message).expect("send failed");
    }

    /// Write arbitrary bytes, e.g. half a frame.
    pub fn send_raw(&mut self, bytes: &[u8]) {
        self.writer.write_all(bytes).expect("send_raw failed");
        self.writer.flush().expect("flush failed");
    }

    /// Block for the next frame. Panics on timeout or disconnect.
    pub fn recv(&mut self) -> ServerMessage {
        match self.reader.read_frame::<ServerMessage>() {
            Ok(Some(message)) => message,
            Ok(None) => panic!("server closed the connection"),
            Err(e) => panic!("recv failed: {e}"),
        }
    }

    /// True once the server has closed the connection and every frame it
    /// sent before closing has been read.
    pub fn is_closed(&mut self) -> bool {
        loop {
            match self.reader.read_frame::<ServerMessage>() {
                Ok(Some(_)) => continue,
                Ok(None) => return true,
                Err(FrameError::Io(e))
                    if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
                {
                    return false;
                }
                Err(_) => return true,
            }
        }
    }

    /// Collect every frame caused by requests handled so far.
    pub fn sync(&mut self) -> Vec<ServerMessage> {
        self.send(&ClientMessage::Loot);
        let mut frames = Vec::new();
        loop {
            let message = self.recv();
            if is_sync_reply(&message) {
                return frames;
            }
            frames.push(message);
        }
    }

    /// Send one request and return the frames it produced.
    pub fn request(&mut self, message: &ClientMessage) -> Vec<ServerMessage> {
        self.send(message);
        self.sync()
    }

    /// Send one request that must be rejected, and return the error code.
    pub fn expect_error(&mut self, message: &ClientMessage) -> u8 {
        let frames = self.request(message);
        match frames.as_slice() {
            [ServerMessage::Error { code, .. }] => code.as_u8(),
            other => panic!("expected a single Error frame, got {other:?}"),
        }
    }

    /// Propose a character with the given stats.
    pub fn proposal(&self, name: &str, attack: u16, defense: u16, regen: u16) -> ClientMessage {
        ClientMessage::CreateCharacter(Character {
            name: name.into(),
            status: Status {
                alive: true,
                combatant: true,
                ..Status::default()
            },
            attack,
            defense,
            regen,
            description: format!("{name} the tester").into(),
            ..Character::default()
        })
    }

    /// Create a character and return the server's version of it.
    pub fn create(&mut self, name: &str, attack: u16, defense: u16, regen: u16) -> Character {
        let proposal = self.proposal(name, attack, defense, regen);
        let frames = self.request(&proposal);
        match frames.as_slice() {
            [ServerMessage::Accept(10), ServerMessage::Character(c)] => {
                self.name = name.into();
                c.clone()
            }
            other => panic!("expected Accept and Character, got {other:?}"),
        }
    }

    /// Start playing and return every frame the start produced.
    pub fn start(&mut self) -> Vec<ServerMessage> {
        self.request(&ClientMessage::Start)
    }

    /// Create, start and discard the arrival frames.
    pub fn join_game(&mut self, name: &str, attack: u16, defense: u16, regen: u16) {
        self.create(name, attack, defense, regen);
        self.start();
    }

    pub fn move_to(&mut self, room: u16) -> Vec<ServerMessage> {
        self.request(&ClientMessage::Move(RoomId(room)))
    }

    pub fn fight(&mut self) -> Vec<ServerMessage> {
        self.request(&ClientMessage::Fight)
    }

    pub fn chat(&self, to: &str, body: &str) -> ClientMessage {
        ClientMessage::Chat(ChatMessage {
            recipient: to.into(),
            sender: self.name.as_str().into(),
            body: body.into(),
        })
    }

    pub fn quit(&mut self) {
        self.send(&ClientMessage::Quit);
    }
}

/// The last Character frame for `name` among `frames`.
pub fn last_state_of(frames: &[ServerMessage], name: &str) -> Option<Character> {
    frames.iter().rev().find_map(|m| match m {
        ServerMessage::Character(c) if c.name == name => Some(c.clone()),
        _ => None,
    })
}

/// Names of all Character frames in `frames`, in order.
pub fn character_names(frames: &[ServerMessage]) -> Vec<String> {
    frames
        .iter()
        .filter_map(|m| match m {
            ServerMessage::Character(c) => Some(c.name.to_string()),
            _ => None,
        })
        .collect()
}

// TCP listener and per-connection threads.
//
// Architecture: one shared `World` behind a single `Mutex`, and two threads
// per client.
//
// - **Accept thread** (`TcpListener::accept()` loop, non-blocking so it can
//   notice `stop`): for each connection, registers a `Session` with the
//   world and spawns the two threads below.
// - **Session thread**: blocks in `FrameReader::read_frame` with no lock
//   held, then locks the world for exactly one `Session::handle` call. All
//   frames caused by that call, including broadcasts to other clients, are
//   queued on outboxes before the lock is released, so the world goes
//   through one whole frame at a time in lock order.
// - **Writer thread**: drains the client's outbox into its socket. The lock
//   is never held across a socket write, so a client that stops reading
//   only grows its own queue.
//
// When a session ends (Quit, EOF or a read error) it removes itself from the
// world, which drops the outbox sender. The writer then flushes what is left
// and exits, and the socket closes once both halves are gone.
//
// Session and writer threads are detached. `ServerHandle::stop` only stops
// accepting new connections.

use std::io::{self, BufWriter, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use lurk_protocol::{ClientMessage, FrameReader, ServerMessage, WireMessage};
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::session::{Flow, Session};
use crate::world::{SessionId, World};

/// The world every session thread shares.
pub type SharedWorld = Arc<Mutex<World>>;

/// Lock the world. A session thread that panicked mid-frame leaves the lock
/// poisoned; the world is still used as it stands.
pub fn lock(world: &SharedWorld) -> MutexGuard<'_, World> {
    world.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Handle returned by `start_server` to control the running server.
pub struct ServerHandle {
    keep_running: Arc<AtomicBool>,
    thread: Option<thread::JoinHandle<()>>,
    world: SharedWorld,
}

impl ServerHandle {
    /// Stop accepting connections and wait for the accept thread to exit.
    pub fn stop(mut self) {
        self.keep_running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }

    /// Block until the accept thread exits.
    pub fn wait(mut self) {
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }

    pub fn world(&self) -> SharedWorld {
        Arc::clone(&self.world)
    }
}

/// Seed the world, bind the listener and start accepting on a background
/// thread. Returns the handle and the bound address (port 0 picks a free
/// port).
pub fn start_server(config: ServerConfig) -> io::Result<(ServerHandle, SocketAddr)> {
    let listener = TcpListener::bind((config.host.as_str(), config.port))?;
    let addr = listener.local_addr()?;
    listener.set_nonblocking(true)?;

    let world: SharedWorld = Arc::new(Mutex::new(World::seed(&config.game)));
    info!(
        %addr,
        rooms = config.game.room_count,
        "LURK server listening"
    );

    let keep_running = Arc::new(AtomicBool::new(true));
    let keep_running_clone = Arc::clone(&keep_running);
    let world_clone = Arc::clone(&world);
    let thread = thread::spawn(move || {
        accept_loop(listener, world_clone, keep_running_clone);
    });

    Ok((
        ServerHandle {
            keep_running,
            thread: Some(thread),
            world,
        },
        addr,
    ))
}

fn accept_loop(listener: TcpListener, world: SharedWorld, keep_running: Arc<AtomicBool>) {
    while keep_running.load(Ordering::SeqCst) {
        match listener.accept() {
            Ok((stream, peer)) => {
                if let Err(e) = spawn_connection(stream, peer, &world) {
                    warn!(%peer, error = %e, "could not set up connection");
                }
            }
            Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => {
                thread::sleep(Duration::from_millis(50));
            }
            Err(e) => {
                warn!(error = %e, "accept failed");
                thread::sleep(Duration::from_millis(50));
            }
        }
    }
    info!("listener stopped");
}

fn spawn_connection(stream: TcpStream, peer: SocketAddr, world: &SharedWorld) -> io::Result<()> {
    stream.set_nonblocking(false)?;
    stream.set_nodelay(true)?;
    let write_half = stream.try_clone()?;

    let (outbox, queued) = mpsc::channel();
    let session = Session::open(&mut lock(world), outbox);
    let id = session.id();
    info!(session = %id, %peer, "client connected");

    thread::spawn(move || writer_loop(write_half, queued, id));
    let world = Arc::clone(world);
    thread::spawn(move || session_loop(stream, world, session));
    Ok(())
}

/// Read frames until the client quits or the socket fails.
fn session_loop(stream: TcpStream, world: SharedWorld, mut session: Session) {
    let mut reader = FrameReader::new(stream);
    loop {
        let message = match reader.read_frame::<ClientMessage>() {
            Ok(Some(message)) => message,
            Ok(None) => {
                debug!(session = %session.id(), "client closed the connection");
                break;
            }
            Err(e) => {
                debug!(session = %session.id(), error = %e, "read failed");
                break;
            }
        };
        if session.handle(&mut lock(&world), message) == Flow::Quit {
            break;
        }
    }
    session.close(&mut lock(&world));
}

/// Write queued frames to the socket, flushing whenever the queue runs dry.
/// Exits when the session drops its outbox or the socket fails.
fn writer_loop(stream: TcpStream, queued: Receiver<ServerMessage>, id: SessionId) {
    let mut writer = BufWriter::new(stream);
    while let Ok(first) = queued.recv() {
        let mut next = Some(first);
        while let Some(message) = next {
            match message.encode() {
                Ok(bytes) => {
                    if let Err(e) = writer.write_all(&bytes) {
                        debug!(session = %id, error = %e, "write failed");
                        return;
                    }
                }
                Err(e) => warn!(session = %id, error = %e, "dropping unencodable frame"),
            }
            next = queued.try_recv().ok();
        }
        if let Err(e) = writer.flush() {
            debug!(session = %id, error = %e, "flush failed");
            return;
        }
    }
    debug!(session = %id, "writer finished");
}

//! TCP transport feeding client packets into the arena and streaming its events back

use crate::arena::{ArenaError, ArenaHandle, PlayerSession};
use log::{debug, error, info, warn};
use shared::{read_frame, write_frame, ClientPacket, Event, FrameError, PlayerId};
use std::net::SocketAddr;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::Duration;

const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error(transparent)]
    Arena(#[from] ArenaError),
    #[error("expected a join packet, got {0:?}")]
    ExpectedJoin(ClientPacket),
}

/// Accepts connections and runs one session task per client
pub struct Server {
    listener: TcpListener,
    arena: ArenaHandle,
}

impl Server {
    pub async fn bind(addr: &str, arena: ArenaHandle) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        info!(
            "[arena {}] Server listening on {}",
            arena.id(),
            listener.local_addr()?
        );
        Ok(Server { listener, arena })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept loop. Returns once the arena has stopped.
    pub async fn run(self) {
        loop {
            let accepted = tokio::select! {
                accepted = self.listener.accept() => accepted,
                _ = self.arena.closed() => {
                    info!("Arena closed, no longer accepting connections");
                    return;
                }
            };
            let (stream, addr) = match accepted {
                Ok(accepted) => accepted,
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                    // Errors such as running out of descriptors repeat at once.
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                    continue;
                }
            };

            debug!("Connection from {}", addr);
            let arena = self.arena.clone();
            tokio::spawn(async move {
                if let Err(e) = handle_connection(stream, addr, arena).await {
                    warn!("Session with {} ended with error: {}", addr, e);
                }
            });
        }
    }
}

/// Runs one client session: join, then relay packets and events until either
/// side goes away. A refused join closes the socket without writing anything.
pub async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    arena: ArenaHandle,
) -> Result<(), ConnectionError> {
    let (mut reader, mut writer) = stream.into_split();

    let username = match read_frame::<_, ClientPacket>(&mut reader).await? {
        Some(ClientPacket::Join { username }) => username,
        Some(other) => return Err(ConnectionError::ExpectedJoin(other)),
        None => return Ok(()),
    };

    let PlayerSession { id, mut events } = arena.join(username.clone()).await?;
    let Some(snapshot) = events.recv().await else {
        info!("Join of {:?} from {} refused", username, addr);
        return Ok(());
    };
    write_frame(&mut writer, &snapshot).await?;
    info!("{:?} from {} joined as {}", username, addr, id);

    let outcome = tokio::select! {
        result = forward_events(&mut events, &mut writer) => result,
        result = forward_input(&mut reader, &arena, id) => result,
    };

    // The arena may already be gone; nothing left to tell it then.
    let _ = arena.leave(id).await;
    info!("{:?} ({}) disconnected", username, id);
    outcome
}

async fn forward_events(
    events: &mut mpsc::UnboundedReceiver<Event>,
    writer: &mut OwnedWriteHalf,
) -> Result<(), ConnectionError> {
    while let Some(event) = events.recv().await {
        write_frame(writer, &event).await?;
    }
    Ok(())
}

async fn forward_input(
    reader: &mut OwnedReadHalf,
    arena: &ArenaHandle,
    id: PlayerId,
) -> Result<(), ConnectionError> {
    loop {
        match read_frame::<_, ClientPacket>(reader).await? {
            Some(ClientPacket::ChangeDirection(direction)) => {
                arena.change_direction(id, direction).await?;
            }
            Some(ClientPacket::Join { .. }) => {
                warn!("Player {} sent a second join, ignoring", id);
            }
            Some(ClientPacket::Leave) | None => return Ok(()),
        }
    }
}

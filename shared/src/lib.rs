use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Largest frame accepted on the wire, in bytes.
pub const MAX_FRAME_LEN: usize = 64 * 1024;

/// A cell coordinate on the toroidal arena.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position {
    pub x: u16,
    pub y: u16,
}

impl Position {
    pub fn new(x: u16, y: u16) -> Self {
        Self { x, y }
    }

    /// Returns the neighbouring cell in `direction`, re-entering at the
    /// opposite edge when stepping off the grid.
    pub fn step(self, direction: Direction, width: u16, height: u16) -> Self {
        let (dx, dy) = direction.delta();
        Self {
            x: wrap(self.x, dx, width),
            y: wrap(self.y, dy, height),
        }
    }
}

fn wrap(value: u16, delta: i32, size: u16) -> u16 {
    (i32::from(value) + delta).rem_euclid(i32::from(size)) as u16
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    /// Unit vector of the direction. `y` grows downwards.
    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }
}

/// Visual identity of a player. The declaration order is the order in which
/// identities are handed out.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Color {
    Green,
    Red,
    Lime,
    Blue,
    Teal,
    Purple,
    Orange,
    Magenta,
}

impl Color {
    pub const PALETTE: [Color; 8] = [
        Color::Green,
        Color::Red,
        Color::Lime,
        Color::Blue,
        Color::Teal,
        Color::Purple,
        Color::Orange,
        Color::Magenta,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Color::Green => "green",
            Color::Red => "red",
            Color::Lime => "lime",
            Color::Blue => "blue",
            Color::Teal => "teal",
            Color::Purple => "purple",
            Color::Orange => "orange",
            Color::Magenta => "magenta",
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlayerId(pub u32);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A player's body as seen by observers, head first.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct PeerSnapshot {
    pub id: PlayerId,
    pub username: String,
    pub color: Color,
    pub body: Vec<Position>,
}

/// Full arena state delivered once to a newly joined player.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct JoinSnapshot {
    pub player: PeerSnapshot,
    pub others: Vec<PeerSnapshot>,
    pub berries: Vec<Position>,
    pub width: u16,
    pub height: u16,
}

/// Movement of one snake during a tick.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct PositionUpdate {
    pub id: PlayerId,
    pub color: Color,
    pub head: Position,
    pub prev_head: Position,
    pub tail: Position,
    /// False when another segment of the same snake still covers `tail`.
    pub clear_tail: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct TickUpdate {
    pub tick: u64,
    pub timestamp: u64,
    pub updates: Vec<PositionUpdate>,
    pub new_berries: Vec<Position>,
}

/// Everything the arena sends to a player's mailbox.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub enum Event {
    Joined(JoinSnapshot),
    PeerJoined(PeerSnapshot),
    Tick(TickUpdate),
}

/// Packets a client sends over the transport.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub enum ClientPacket {
    Join { username: String },
    ChangeDirection(Direction),
    Leave,
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed frame: {0}")]
    Codec(#[from] bincode::Error),
    #[error("frame of {0} bytes exceeds the {MAX_FRAME_LEN} byte limit")]
    TooLarge(usize),
    #[error("stream ended inside a frame")]
    Truncated,
}

fn truncated(e: std::io::Error) -> FrameError {
    if e.kind() == std::io::ErrorKind::UnexpectedEof {
        FrameError::Truncated
    } else {
        FrameError::Io(e)
    }
}

/// Writes `value` as a bincode payload behind a big-endian `u32` length.
pub async fn write_frame<W, T>(writer: &mut W, value: &T) -> Result<(), FrameError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let payload = bincode::serialize(value)?;
    if payload.len() > MAX_FRAME_LEN {
        return Err(FrameError::TooLarge(payload.len()));
    }
    writer.write_u32(payload.len() as u32).await?;
    writer.write_all(&payload).await?;
    writer.flush().await?;
    Ok(())
}

/// Reads one frame. Returns `Ok(None)` when the stream ends cleanly between
/// frames and `FrameError::Truncated` when it ends part way through one.
pub async fn read_frame<R, T>(reader: &mut R) -> Result<Option<T>, FrameError>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let mut prefix = [0u8; 4];
    if reader.read(&mut prefix[..1]).await? == 0 {
        return Ok(None);
    }
    reader.read_exact(&mut prefix[1..]).await.map_err(truncated)?;
    let len = u32::from_be_bytes(prefix) as usize;
    if len > MAX_FRAME_LEN {
        return Err(FrameError::TooLarge(len));
    }
    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await.map_err(truncated)?;
    Ok(Some(bincode::deserialize(&payload)?))
}

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn get_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_millis() as u64
}

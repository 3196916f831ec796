use clap::Parser;
use log::{info, warn};
use rand::seq::SliceRandom;
use shared::{read_frame, write_frame, ClientPacket, Direction, Event};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::{interval, Duration};

/// Headless bot: joins the arena, steers at random and logs what it sees.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:2222")]
    server: String,

    /// Username to join with
    #[arg(short = 'u', long, default_value = "bot")]
    username: String,

    /// Milliseconds between random turns
    #[arg(short = 't', long, default_value = "600")]
    turn_ms: u64,

    /// Leave after this many ticks (0 = never)
    #[arg(short = 'n', long, default_value = "0")]
    ticks: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();
    let stream = TcpStream::connect(&args.server).await?;
    info!("Connected to {}", args.server);
    let (mut reader, mut writer) = stream.into_split();

    let join = ClientPacket::Join {
        username: args.username.clone(),
    };
    write_frame(&mut writer, &join).await?;

    let snapshot = match read_frame::<_, Event>(&mut reader).await? {
        Some(Event::Joined(snapshot)) => snapshot,
        Some(other) => {
            warn!("Unexpected first event: {:?}", other);
            return Ok(());
        }
        None => {
            warn!("Join refused: username taken, arena full or no free cell");
            return Ok(());
        }
    };
    info!(
        "Joined {}x{} arena as {} ({}), head at {}, {} other players, {} berries",
        snapshot.width,
        snapshot.height,
        snapshot.player.id,
        snapshot.player.color,
        snapshot.player.body[0],
        snapshot.others.len(),
        snapshot.berries.len()
    );
    let me = snapshot.player.id;

    // Frames are written from one task so reads are never cut short.
    let (packets, mut outgoing) = mpsc::channel::<ClientPacket>(16);
    let writer_task = tokio::spawn(async move {
        while let Some(packet) = outgoing.recv().await {
            if let Err(e) = write_frame(&mut writer, &packet).await {
                warn!("Failed to send {:?}: {}", packet, e);
                break;
            }
        }
    });

    let steering = packets.clone();
    let turn_ms = args.turn_ms;
    let steering_task = tokio::spawn(async move {
        let mut turn_timer = interval(Duration::from_millis(turn_ms));
        let mut heading: Option<Direction> = None;
        loop {
            turn_timer.tick().await;
            // Never turn straight back onto the neck.
            let choices: Vec<Direction> = Direction::ALL
                .into_iter()
                .filter(|d| heading.map_or(true, |h| *d != h.opposite()))
                .collect();
            let direction = *choices
                .choose(&mut rand::thread_rng())
                .unwrap_or(&Direction::Right);
            heading = Some(direction);
            if steering
                .send(ClientPacket::ChangeDirection(direction))
                .await
                .is_err()
            {
                break;
            }
        }
    });

    let mut ticks_seen = 0;
    loop {
        match read_frame::<_, Event>(&mut reader).await? {
            Some(Event::PeerJoined(peer)) => {
                info!("{} joined as {} at {}", peer.username, peer.color, peer.body[0]);
            }
            Some(Event::Tick(update)) => {
                ticks_seen += 1;
                if let Some(mine) = update.updates.iter().find(|u| u.id == me) {
                    info!("Tick {}: head {} -> {}", update.tick, mine.prev_head, mine.head);
                }
                for berry in &update.new_berries {
                    info!("Berry appeared at {}", berry);
                }
                if args.ticks > 0 && ticks_seen >= args.ticks {
                    info!("Leaving after {} ticks", ticks_seen);
                    break;
                }
            }
            Some(Event::Joined(_)) => warn!("Received a second join snapshot"),
            None => {
                info!("Server closed the connection");
                break;
            }
        }
    }

    steering_task.abort();
    // Ignored when the server already hung up.
    let _ = packets.send(ClientPacket::Leave).await;
    drop(packets);
    let _ = writer_task.await;
    Ok(())
}

use clap::Parser;
use log::{error, info};
use server::arena::Arena;
use server::config::ArenaConfig;
use server::network::Server;
use std::time::Duration;

/// Main-method of the application.
/// Parses command-line arguments, then starts the arena and the TCP server.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Command line arguments
    #[derive(Parser, Debug)]
    #[clap(author, version, about)]
    struct Args {
        /// Server IP address to bind to
        #[clap(short = 'H', long, default_value = "127.0.0.1")]
        host: String,
        /// Server port to listen on
        #[clap(short, long, default_value = "2222")]
        port: u16,
        /// Arena width in cells
        #[clap(long, default_value = "50")]
        width: u16,
        /// Arena height in cells
        #[clap(long, default_value = "30")]
        height: u16,
        /// Segments of a newly joined snake
        #[clap(short, long, default_value = "6")]
        length: usize,
        /// Milliseconds between ticks
        #[clap(short, long, default_value = "200")]
        tick_ms: u64,
        /// Number of player colours, caps concurrent players
        #[clap(short, long, default_value = "5")]
        colors: usize,
        /// Berries placed when the arena starts
        #[clap(short, long, default_value = "3")]
        berries: usize,
        /// Seed for placement randomness
        #[clap(long)]
        seed: Option<u64>,
    }

    env_logger::init();

    // Parse command line arguments
    let args = Args::parse();

    let config = ArenaConfig {
        width: args.width,
        height: args.height,
        initial_length: args.length,
        tick_interval: Duration::from_millis(args.tick_ms),
        palette_size: args.colors,
        initial_berries: args.berries,
        seed: args.seed,
        ..ArenaConfig::default()
    };

    let (arena, arena_task) = Arena::spawn(config)?;
    let address = format!("{}:{}", args.host, args.port);
    let server = Server::bind(&address, arena.clone()).await?;
    let server_handle = tokio::spawn(server.run());

    // Handle shutdown gracefully
    tokio::select! {
        result = server_handle => {
            if let Err(e) = result {
                error!("Network task panicked: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully...");
        }
    }

    if arena.shutdown().await.is_ok() {
        if let Err(e) = arena_task.await {
            error!("Arena task panicked: {}", e);
        }
    }

    Ok(())
}

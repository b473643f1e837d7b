use clap::Parser;
use log::info;
use server::canvas::CanvasStore;
use server::cooldown::CooldownLedger;
use server::hub::ConnectionHub;
use server::leaderboard::Leaderboard;
use server::network::Server;
use server::persistence;
use server::pipeline::PaintPipeline;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Main-method of the application.
/// Parses command-line arguments, restores the backing store, wires the
/// components together and serves until the listener fails or Ctrl+C.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    // Command line arguments
    #[derive(Parser, Debug)]
    #[clap(author, version, about)]
    struct Args {
        /// Server IP address to bind to
        #[clap(short = 'H', long, default_value = "127.0.0.1")]
        host: String,
        /// Server port to listen on
        #[clap(short, long, default_value = "3000")]
        port: u16,
        /// Canvas width in pixels
        #[clap(long, default_value_t = shared::DEFAULT_CANVAS_WIDTH)]
        width: u32,
        /// Canvas height in pixels
        #[clap(long, default_value_t = shared::DEFAULT_CANVAS_HEIGHT)]
        height: u32,
        /// Seconds an actor must wait between accepted paints
        #[clap(long, default_value_t = shared::DEFAULT_COOLDOWN_SECS)]
        cooldown_secs: u64,
        /// Directory holding the canvas and score files
        #[clap(long, default_value = "./data")]
        data_dir: PathBuf,
    }

    let args = Args::parse();

    // A server with no canvas must not serve: a failed startup load is fatal,
    // unlike runtime persistence faults which only degrade durability.
    let stored = persistence::load_or_create(&args.data_dir, args.width, args.height).await?;
    info!(
        "restored {}x{} canvas and {} leaderboard entries from {}",
        args.width,
        args.height,
        stored.leaderboard.scores.len(),
        args.data_dir.display()
    );

    let (persist_tx, persist_rx) = mpsc::unbounded_channel();
    tokio::spawn(persistence::run(args.data_dir.clone(), persist_rx));

    let canvas = Arc::new(CanvasStore::from_buffer(
        args.width,
        args.height,
        stored.canvas,
        Some(persist_tx.clone()),
    ));
    let cooldown = Arc::new(CooldownLedger::new(Duration::from_secs(args.cooldown_secs)));
    Arc::clone(&cooldown).spawn_sweeper(Duration::from_secs(60));
    let leaderboard = Arc::new(Leaderboard::with_persistence(persist_tx));
    leaderboard.restore(stored.leaderboard);
    let hub = Arc::new(ConnectionHub::new());
    let pipeline = Arc::new(PaintPipeline::new(
        canvas,
        cooldown,
        leaderboard,
        Arc::clone(&hub),
    ));

    let server = Server::bind(&format!("{}:{}", args.host, args.port), hub, pipeline).await?;

    tokio::select! {
        result = server.run() => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("received Ctrl+C, shutting down");
        }
    }

    Ok(())
}

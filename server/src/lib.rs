//! # Pixel Wall Server Library
//!
//! Authoritative server for a shared, persistent pixel canvas that many
//! clients paint on concurrently. The server owns the canonical W×H grid,
//! enforces a per-actor paint cooldown, keeps a contribution leaderboard,
//! and fans every accepted change out to all connected viewers in real time.
//!
//! ## Architecture
//!
//! State lives in three store components with a single writer path and many
//! concurrent readers:
//!
//! - [`canvas::CanvasStore`] — the flattened byte grid; bounds-validated
//!   single-byte writes, whole-buffer snapshots.
//! - [`cooldown::CooldownLedger`] — actor id → expiry instant; existence of
//!   a live entry means the actor may not paint yet.
//! - [`leaderboard::Leaderboard`] — monotonically increasing paint counts
//!   plus display nicknames.
//!
//! The [`hub::ConnectionHub`] tracks the live viewer set and provides
//! broadcast and unicast delivery over each viewer's outbound queue. The
//! [`pipeline::PaintPipeline`] orchestrates every inbound event against
//! those pieces; it holds no state of its own, so any number of pipeline
//! invocations can run in parallel and coordinate purely through the stores'
//! atomic operations. Durability is handled by a dedicated writer task in
//! [`persistence`] fed over a channel, keeping file I/O off the hot path.
//!
//! Failures are contained per request: malformed frames and policy
//! rejections are silent drops, store faults abort the single request, and
//! nothing short of a failed startup load takes the process down.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use server::canvas::CanvasStore;
//! use server::cooldown::CooldownLedger;
//! use server::hub::ConnectionHub;
//! use server::leaderboard::Leaderboard;
//! use server::network::Server;
//! use server::pipeline::PaintPipeline;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let canvas = Arc::new(CanvasStore::new(100, 100));
//!     let cooldown = Arc::new(CooldownLedger::new(Duration::from_secs(10)));
//!     let leaderboard = Arc::new(Leaderboard::new());
//!     let hub = Arc::new(ConnectionHub::new());
//!     let pipeline = Arc::new(PaintPipeline::new(canvas, cooldown, leaderboard, hub.clone()));
//!
//!     let server = Server::bind("127.0.0.1:3000", hub, pipeline).await?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod canvas;
pub mod cooldown;
pub mod hub;
pub mod leaderboard;
pub mod network;
pub mod persistence;
pub mod pipeline;

//! File-backed persistence for canvas and leaderboard state.
//!
//! The backing store is a data directory holding `canvas.bin` (the raw W×H
//! color-index buffer) and `scores.json` (the leaderboard sidecar). A single
//! writer task owns the files and drains a command queue, so concurrent
//! pipeline invocations never touch the filesystem and never hold a lock
//! across a write.

use log::{error, info};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncSeekExt, AsyncWriteExt};
use tokio::sync::mpsc::UnboundedReceiver;

pub const CANVAS_FILE: &str = "canvas.bin";
pub const SCORES_FILE: &str = "scores.json";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("backing store I/O failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("canvas file holds {found} bytes, expected {expected}")]
    CanvasSize { expected: usize, found: usize },
    #[error("scores file is not readable as JSON: {0}")]
    CorruptScores(#[from] serde_json::Error),
}

/// Commands accepted by the persistence task.
#[derive(Debug)]
pub enum PersistCommand {
    /// Positioned single-byte write into the canvas file.
    WritePixel { offset: u64, color: u8 },
    /// Full rewrite of the score/nickname sidecar.
    SaveScores(LeaderboardSnapshot),
}

/// Serialized form of the leaderboard tables.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct LeaderboardSnapshot {
    pub scores: HashMap<String, u64>,
    pub nicknames: HashMap<String, String>,
}

/// State recovered from the data directory at startup.
#[derive(Debug)]
pub struct StoredState {
    pub canvas: Vec<u8>,
    pub leaderboard: LeaderboardSnapshot,
}

/// Idempotent startup load.
///
/// Creates the data directory and a zero-filled canvas file when absent;
/// re-running against a populated store returns the stored bytes untouched.
/// A canvas file of the wrong length is corrupt and refuses to load rather
/// than serving a guessed buffer.
pub async fn load_or_create(
    dir: &Path,
    width: u32,
    height: u32,
) -> Result<StoredState, StoreError> {
    fs::create_dir_all(dir).await?;
    let expected = width as usize * height as usize;

    let canvas_path = dir.join(CANVAS_FILE);
    let canvas = match fs::read(&canvas_path).await {
        Ok(bytes) => {
            if bytes.len() != expected {
                return Err(StoreError::CanvasSize {
                    expected,
                    found: bytes.len(),
                });
            }
            bytes
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            let blank = vec![0u8; expected];
            fs::write(&canvas_path, &blank).await?;
            info!(
                "initialized blank {}x{} canvas at {}",
                width,
                height,
                canvas_path.display()
            );
            blank
        }
        Err(err) => return Err(err.into()),
    };

    let scores_path = dir.join(SCORES_FILE);
    let leaderboard = match fs::read(&scores_path).await {
        Ok(bytes) => serde_json::from_slice(&bytes)?,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => LeaderboardSnapshot::default(),
        Err(err) => return Err(err.into()),
    };

    Ok(StoredState {
        canvas,
        leaderboard,
    })
}

/// Runs the writer task until every command sender is dropped.
///
/// Write faults are logged and swallowed: a failed write degrades durability
/// but never takes down the serving process — the in-memory state stays
/// authoritative.
pub async fn run(dir: PathBuf, mut rx: UnboundedReceiver<PersistCommand>) {
    let canvas_path = dir.join(CANVAS_FILE);
    let scores_path = dir.join(SCORES_FILE);
    let mut canvas_file: Option<File> = None;

    while let Some(cmd) = rx.recv().await {
        match cmd {
            PersistCommand::WritePixel { offset, color } => {
                if canvas_file.is_none() {
                    match OpenOptions::new().write(true).open(&canvas_path).await {
                        Ok(file) => canvas_file = Some(file),
                        Err(err) => {
                            error!(
                                "cannot open {} for writing, pixel at offset {} not persisted: {}",
                                canvas_path.display(),
                                offset,
                                err
                            );
                            continue;
                        }
                    }
                }

                if let Some(file) = canvas_file.as_mut() {
                    if let Err(err) = write_pixel(file, offset, color).await {
                        error!("canvas write at offset {} failed: {}", offset, err);
                        // Force a reopen on the next write.
                        canvas_file = None;
                    }
                }
            }
            PersistCommand::SaveScores(snapshot) => match serde_json::to_vec(&snapshot) {
                Ok(bytes) => {
                    if let Err(err) = fs::write(&scores_path, bytes).await {
                        error!("score snapshot write failed: {}", err);
                    }
                }
                Err(err) => error!("score snapshot serialization failed: {}", err),
            },
        }
    }
}

async fn write_pixel(file: &mut File, offset: u64, color: u8) -> std::io::Result<()> {
    file.seek(SeekFrom::Start(offset)).await?;
    file.write_all(&[color]).await?;
    file.flush().await
}

//! Authoritative canvas state.
//!
//! The canvas is a fixed-size W×H grid of palette indices, flattened
//! row-major into a byte buffer of exactly `W*H` bytes. All mutation goes
//! through [`CanvasStore::set_pixel`], one byte at a time; whichever write
//! lands last on a contested offset wins. The buffer lock is only ever held
//! for the synchronous copy or write, never across an await point.

use crate::persistence::PersistCommand;
use log::warn;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::RwLock;

pub struct CanvasStore {
    width: u32,
    height: u32,
    buffer: RwLock<Vec<u8>>,
    persist_tx: Option<UnboundedSender<PersistCommand>>,
}

impl CanvasStore {
    /// Blank in-memory canvas with no persistence attached.
    pub fn new(width: u32, height: u32) -> Self {
        let len = width as usize * height as usize;
        Self::from_buffer(width, height, vec![0; len], None)
    }

    /// Adopts a previously persisted buffer. The buffer length must match
    /// the declared dimensions; `persistence::load_or_create` guarantees it.
    pub fn from_buffer(
        width: u32,
        height: u32,
        buffer: Vec<u8>,
        persist_tx: Option<UnboundedSender<PersistCommand>>,
    ) -> Self {
        assert_eq!(
            buffer.len(),
            width as usize * height as usize,
            "canvas buffer length does not match dimensions"
        );
        Self {
            width,
            height,
            buffer: RwLock::new(buffer),
            persist_tx,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn contains(&self, x: i64, y: i64) -> bool {
        x >= 0 && y >= 0 && x < self.width as i64 && y < self.height as i64
    }

    /// Point-in-time copy of the full buffer. The copy may already be stale
    /// by the time a slow consumer receives it; the live `pixel_changed`
    /// stream is what converges every viewer.
    pub async fn snapshot(&self) -> Vec<u8> {
        self.buffer.read().await.clone()
    }

    /// Writes a single byte at `y*W + x`. Returns `false` and leaves the
    /// buffer untouched when the coordinates fall outside the canvas.
    pub async fn set_pixel(&self, x: i64, y: i64, color: u8) -> bool {
        if !self.contains(x, y) {
            return false;
        }
        let offset = y as usize * self.width as usize + x as usize;

        {
            let mut buffer = self.buffer.write().await;
            buffer[offset] = color;
        }

        if let Some(tx) = &self.persist_tx {
            if tx
                .send(PersistCommand::WritePixel {
                    offset: offset as u64,
                    color,
                })
                .is_err()
            {
                warn!("persistence task gone; pixel at offset {} not durable", offset);
            }
        }

        true
    }
}

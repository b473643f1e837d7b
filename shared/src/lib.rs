//! Wire protocol shared between the pixel wall server and its clients.
//!
//! Every event travels as a JSON text frame shaped `{"event": ..., "data": ...}`.
//! The one exception is the canvas snapshot (`init_canvas`), which is delivered
//! as the connection's only binary frame: the raw row-major W×H color-index
//! buffer, with no envelope.

use serde::{Deserialize, Serialize};

pub const DEFAULT_CANVAS_WIDTH: u32 = 100;
pub const DEFAULT_CANVAS_HEIGHT: u32 = 100;
pub const DEFAULT_COOLDOWN_SECS: u64 = 10;
pub const LEADERBOARD_SIZE: usize = 10;

/// Label shown for leaderboard entries whose nickname was never recorded.
pub const UNKNOWN_NICKNAME: &str = "Unknown";

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    RequestCanvas,
    PaintPixel(PaintRequest),
    GetLeaderboard,
    CheckNickname(String),
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    PixelChanged {
        x: i64,
        y: i64,
        #[serde(rename = "colorIndex")]
        color_index: u8,
        nickname: String,
    },
    UserCount(usize),
    LeaderboardData(Vec<LeaderboardRow>),
    NickStatus { success: bool, nickname: String },
}

/// A paint submission as it arrives off the wire.
///
/// Coordinates and color are deliberately wider than the valid ranges so that
/// out-of-range values deserialize cleanly and get rejected by validation
/// instead of surfacing as a parse error. `actorId` and `nickname` are
/// optional on the wire; absent fields decode as empty strings.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PaintRequest {
    pub x: i64,
    pub y: i64,
    #[serde(rename = "colorIndex")]
    pub color_index: i64,
    #[serde(default, rename = "actorId")]
    pub actor_id: String,
    #[serde(default)]
    pub nickname: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct LeaderboardRow {
    pub nickname: String,
    pub score: u64,
}

impl ClientEvent {
    pub fn decode(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl ServerEvent {
    pub fn decode(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

//! Paint ingestion pipeline and request handlers.
//!
//! Every inbound event is dispatched here with the originating viewer's id;
//! the pipeline owns no state of its own and works entirely through the
//! injected stores and hub, so concurrent invocations coordinate only through
//! the stores' own atomic operations.
//!
//! A paint request moves through validate → cooldown check → apply → score →
//! broadcast, short-circuiting to a dropped outcome at any step. Two ordering
//! rules matter: the cooldown is checked before the write so a rejected paint
//! never costs the actor their window, and it is charged only after a
//! successful write so a store fault does not penalize the actor either.

use crate::canvas::CanvasStore;
use crate::cooldown::CooldownLedger;
use crate::hub::{ConnectionHub, ViewerId};
use crate::leaderboard::Leaderboard;
use log::{debug, error, warn};
use shared::{ClientEvent, PaintRequest, ServerEvent, LEADERBOARD_SIZE};
use std::sync::Arc;

/// Terminal state of one paint submission. Everything except `Applied` is a
/// silent drop from the sender's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaintOutcome {
    Applied,
    OutOfBounds,
    BadColor,
    OnCooldown,
    StoreFailed,
}

pub struct PaintPipeline {
    canvas: Arc<CanvasStore>,
    cooldown: Arc<CooldownLedger>,
    leaderboard: Arc<Leaderboard>,
    hub: Arc<ConnectionHub>,
}

impl PaintPipeline {
    pub fn new(
        canvas: Arc<CanvasStore>,
        cooldown: Arc<CooldownLedger>,
        leaderboard: Arc<Leaderboard>,
        hub: Arc<ConnectionHub>,
    ) -> Self {
        Self {
            canvas,
            cooldown,
            leaderboard,
            hub,
        }
    }

    /// Routes one decoded client event.
    pub async fn dispatch(&self, viewer: ViewerId, event: ClientEvent) {
        match event {
            ClientEvent::RequestCanvas => self.handle_request_canvas(viewer).await,
            ClientEvent::PaintPixel(request) => {
                self.handle_paint(viewer, request).await;
            }
            ClientEvent::GetLeaderboard => self.handle_get_leaderboard(viewer),
            ClientEvent::CheckNickname(nickname) => self.handle_check_nickname(viewer, nickname),
        }
    }

    pub async fn handle_paint(&self, viewer: ViewerId, request: PaintRequest) -> PaintOutcome {
        if !self.canvas.contains(request.x, request.y) {
            warn!(
                "viewer {}: paint at ({}, {}) outside {}x{} canvas",
                viewer,
                request.x,
                request.y,
                self.canvas.width(),
                self.canvas.height()
            );
            return PaintOutcome::OutOfBounds;
        }

        let color = match u8::try_from(request.color_index) {
            Ok(color) => color,
            Err(_) => {
                warn!(
                    "viewer {}: color index {} outside palette",
                    viewer, request.color_index
                );
                return PaintOutcome::BadColor;
            }
        };

        let actor = resolve_actor(viewer, &request.actor_id);
        if self.cooldown.is_on_cooldown(&actor) {
            debug!("actor {}: paint dropped, still on cooldown", actor);
            return PaintOutcome::OnCooldown;
        }

        if !self.canvas.set_pixel(request.x, request.y, color).await {
            error!(
                "canvas refused validated write at ({}, {})",
                request.x, request.y
            );
            return PaintOutcome::StoreFailed;
        }

        self.cooldown.set_cooldown(&actor);
        self.leaderboard.record_paint(&actor, &request.nickname);

        self.hub.broadcast_all(&ServerEvent::PixelChanged {
            x: request.x,
            y: request.y,
            color_index: color,
            nickname: request.nickname,
        });

        PaintOutcome::Applied
    }

    /// Snapshot delivery is unicast; the requester also gets a fresh viewer
    /// count alongside it.
    pub async fn handle_request_canvas(&self, viewer: ViewerId) {
        let snapshot = self.canvas.snapshot().await;
        if !self.hub.send_canvas(viewer, snapshot) {
            debug!("viewer {} gone before snapshot delivery", viewer);
            return;
        }
        self.hub
            .send_to(viewer, &ServerEvent::UserCount(self.hub.count()));
    }

    pub fn handle_get_leaderboard(&self, viewer: ViewerId) {
        let rows = self.leaderboard.top(LEADERBOARD_SIZE);
        self.hub.send_to(viewer, &ServerEvent::LeaderboardData(rows));
    }

    pub fn handle_check_nickname(&self, viewer: ViewerId, nickname: String) {
        let success = self.leaderboard.is_nickname_available(&nickname);
        self.hub
            .send_to(viewer, &ServerEvent::NickStatus { success, nickname });
    }
}

/// One durable definition of "actor": the client-supplied id when present,
/// otherwise an identity scoped to this connection. Cooldown and leaderboard
/// always key on the same resolved value.
fn resolve_actor(viewer: ViewerId, supplied: &str) -> String {
    let trimmed = supplied.trim();
    if trimmed.is_empty() {
        format!("conn:{}", viewer)
    } else {
        trimmed.to_string()
    }
}

//! Integration tests for the pixel wall server.
//!
//! These tests exercise real WebSocket connections against a server bound to
//! an ephemeral port, plus persistence round trips against a real data
//! directory.

use futures_util::{SinkExt, StreamExt};
use server::canvas::CanvasStore;
use server::cooldown::CooldownLedger;
use server::hub::ConnectionHub;
use server::leaderboard::Leaderboard;
use server::network::Server;
use server::persistence::{self, PersistCommand};
use server::pipeline::PaintPipeline;
use shared::{ClientEvent, PaintRequest, ServerEvent};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// REAL-SOCKET EVENT SURFACE TESTS
mod event_surface_tests {
    use super::*;

    #[tokio::test]
    async fn user_count_follows_connects_and_disconnects() {
        let addr = start_server(100, 100, Duration::from_secs(10)).await;

        let mut alice = connect(addr).await;
        assert_eq!(next_event(&mut alice).await, ServerEvent::UserCount(1));

        let mut bob = connect(addr).await;
        assert_eq!(next_event(&mut bob).await, ServerEvent::UserCount(2));
        assert_eq!(next_event(&mut alice).await, ServerEvent::UserCount(2));

        // Dropping the socket counts as a disconnect.
        drop(bob);
        assert_eq!(next_event(&mut alice).await, ServerEvent::UserCount(1));
    }

    #[tokio::test]
    async fn canvas_snapshot_is_a_unicast_binary_frame() {
        let addr = start_server(100, 100, Duration::from_secs(10)).await;

        let mut alice = connect(addr).await;
        let mut bob = connect(addr).await;
        next_event(&mut alice).await; // count 1
        next_event(&mut alice).await; // count 2
        next_event(&mut bob).await; // count 2

        send(&mut alice, &ClientEvent::RequestCanvas).await;

        let snapshot = next_binary(&mut alice).await;
        assert_eq!(snapshot.len(), 10_000);
        assert!(snapshot.iter().all(|&b| b == 0));
        // The requester also gets a viewer count refresh.
        assert_eq!(next_event(&mut alice).await, ServerEvent::UserCount(2));

        // The snapshot never goes to anyone else.
        assert_silent(&mut bob).await;
    }

    #[tokio::test]
    async fn accepted_paint_broadcasts_to_all_viewers() {
        let addr = start_server(100, 100, Duration::from_secs(10)).await;

        let mut alice = connect(addr).await;
        let mut bob = connect(addr).await;
        next_event(&mut alice).await;
        next_event(&mut alice).await;
        next_event(&mut bob).await;

        send(&mut alice, &paint_event(5, 5, 3, "a-1", "alice")).await;

        let expected = ServerEvent::PixelChanged {
            x: 5,
            y: 5,
            color_index: 3,
            nickname: "alice".to_string(),
        };
        assert_eq!(next_event(&mut alice).await, expected);
        assert_eq!(next_event(&mut bob).await, expected);

        // The snapshot now reflects the write at offset y*W + x.
        send(&mut bob, &ClientEvent::RequestCanvas).await;
        let snapshot = next_binary(&mut bob).await;
        assert_eq!(snapshot[505], 3);
    }

    #[tokio::test]
    async fn cooldown_drops_paints_silently() {
        let addr = start_server(100, 100, Duration::from_millis(300)).await;

        let mut alice = connect(addr).await;
        next_event(&mut alice).await;

        send(&mut alice, &paint_event(5, 5, 3, "alice", "alice")).await;
        assert!(matches!(
            next_event(&mut alice).await,
            ServerEvent::PixelChanged { .. }
        ));

        // Second paint inside the window: no broadcast, no error, nothing.
        send(&mut alice, &paint_event(6, 6, 4, "alice", "alice")).await;
        assert_silent(&mut alice).await;

        send(&mut alice, &ClientEvent::RequestCanvas).await;
        let snapshot = next_binary(&mut alice).await;
        assert_eq!(snapshot[606], 0);
        next_event(&mut alice).await; // trailing user_count

        // Once the window passes, the paint lands and the score reaches 2.
        tokio::time::sleep(Duration::from_millis(350)).await;
        send(&mut alice, &paint_event(6, 6, 4, "alice", "alice")).await;
        assert!(matches!(
            next_event(&mut alice).await,
            ServerEvent::PixelChanged { .. }
        ));

        send(&mut alice, &ClientEvent::GetLeaderboard).await;
        match next_event(&mut alice).await {
            ServerEvent::LeaderboardData(rows) => {
                assert_eq!(rows.len(), 1);
                assert_eq!(rows[0].nickname, "alice");
                assert_eq!(rows[0].score, 2);
            }
            other => panic!("expected leaderboard data, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn malformed_frames_do_not_kill_the_connection() {
        let addr = start_server(100, 100, Duration::from_secs(10)).await;

        let mut alice = connect(addr).await;
        next_event(&mut alice).await;

        alice
            .send(Message::Text("definitely not json".to_string()))
            .await
            .unwrap();
        alice
            .send(Message::Text(r#"{"event":"paint_pixel","data":{"x":"NaN"}}"#.to_string()))
            .await
            .unwrap();

        // The connection survives and keeps working.
        send(&mut alice, &paint_event(1, 1, 1, "a-1", "alice")).await;
        assert!(matches!(
            next_event(&mut alice).await,
            ServerEvent::PixelChanged { .. }
        ));
    }

    #[tokio::test]
    async fn empty_leaderboard_is_an_empty_list() {
        let addr = start_server(100, 100, Duration::from_secs(10)).await;

        let mut alice = connect(addr).await;
        next_event(&mut alice).await;

        send(&mut alice, &ClientEvent::GetLeaderboard).await;
        assert_eq!(
            next_event(&mut alice).await,
            ServerEvent::LeaderboardData(vec![])
        );
    }

    #[tokio::test]
    async fn nickname_check_round_trip() {
        let addr = start_server(100, 100, Duration::from_secs(10)).await;

        let mut alice = connect(addr).await;
        next_event(&mut alice).await;

        send(&mut alice, &paint_event(1, 1, 1, "a-1", "alice")).await;
        next_event(&mut alice).await;

        send(&mut alice, &ClientEvent::CheckNickname("alice".to_string())).await;
        assert_eq!(
            next_event(&mut alice).await,
            ServerEvent::NickStatus {
                success: false,
                nickname: "alice".to_string()
            }
        );

        send(&mut alice, &ClientEvent::CheckNickname("zoe".to_string())).await;
        assert_eq!(
            next_event(&mut alice).await,
            ServerEvent::NickStatus {
                success: true,
                nickname: "zoe".to_string()
            }
        );
    }
}

/// PERSISTENCE INTEGRATION TESTS
mod persistence_tests {
    use super::*;

    #[tokio::test]
    async fn painted_pixels_survive_a_restart() {
        let dir = tempfile::tempdir().unwrap();

        // First process lifetime: init, paint, drain the writer.
        {
            let stored = persistence::load_or_create(dir.path(), 10, 10)
                .await
                .unwrap();
            let (tx, rx) = mpsc::unbounded_channel();
            let writer = tokio::spawn(persistence::run(dir.path().to_path_buf(), rx));

            let canvas = CanvasStore::from_buffer(10, 10, stored.canvas, Some(tx));
            assert!(canvas.set_pixel(3, 2, 7).await);

            drop(canvas);
            writer.await.unwrap();
        }

        // Second lifetime sees the paint.
        let stored = persistence::load_or_create(dir.path(), 10, 10)
            .await
            .unwrap();
        assert_eq!(stored.canvas[23], 7);
    }

    #[tokio::test]
    async fn leaderboard_survives_a_restart() {
        let dir = tempfile::tempdir().unwrap();

        {
            persistence::load_or_create(dir.path(), 10, 10).await.unwrap();
            let (tx, rx) = mpsc::unbounded_channel();
            let writer = tokio::spawn(persistence::run(dir.path().to_path_buf(), rx));

            let board = Leaderboard::with_persistence(tx);
            board.record_paint("a-1", "alice");
            board.record_paint("a-1", "alice");

            drop(board);
            writer.await.unwrap();
        }

        let stored = persistence::load_or_create(dir.path(), 10, 10)
            .await
            .unwrap();
        let board = Leaderboard::new();
        board.restore(stored.leaderboard);
        assert_eq!(board.score("a-1"), 2);
        assert_eq!(board.top(10)[0].nickname, "alice");
    }

    #[tokio::test]
    async fn explicit_write_commands_land_in_the_file() {
        let dir = tempfile::tempdir().unwrap();
        persistence::load_or_create(dir.path(), 10, 10).await.unwrap();

        let (tx, rx) = mpsc::unbounded_channel();
        let writer = tokio::spawn(persistence::run(dir.path().to_path_buf(), rx));
        tx.send(PersistCommand::WritePixel {
            offset: 99,
            color: 255,
        })
        .unwrap();
        drop(tx);
        writer.await.unwrap();

        let stored = persistence::load_or_create(dir.path(), 10, 10)
            .await
            .unwrap();
        assert_eq!(stored.canvas[99], 255);
    }
}

/// CONCURRENCY TESTS
mod concurrency_tests {
    use super::*;

    /// Many actors painting in parallel through the same pipeline: every
    /// accepted paint scores exactly once and the final buffer holds one of
    /// the contending colors on the shared pixel.
    #[tokio::test]
    async fn parallel_paints_keep_scores_consistent() {
        let canvas = Arc::new(CanvasStore::new(100, 100));
        let cooldown = Arc::new(CooldownLedger::new(Duration::from_secs(10)));
        let leaderboard = Arc::new(Leaderboard::new());
        let hub = Arc::new(ConnectionHub::new());
        let pipeline = Arc::new(PaintPipeline::new(
            Arc::clone(&canvas),
            cooldown,
            Arc::clone(&leaderboard),
            hub,
        ));

        let mut handles = Vec::new();
        for i in 0..20u32 {
            let pipeline = Arc::clone(&pipeline);
            handles.push(tokio::spawn(async move {
                let request = PaintRequest {
                    x: 50,
                    y: 50,
                    color_index: (i % 8) as i64 + 1,
                    actor_id: format!("actor-{}", i),
                    nickname: format!("nick-{}", i),
                };
                pipeline.handle_paint(i + 1, request).await
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        // Every actor scored exactly once.
        for i in 0..20u32 {
            assert_eq!(leaderboard.score(&format!("actor-{}", i)), 1);
        }
        // The contested pixel holds whichever write landed last.
        let byte = canvas.snapshot().await[5_050];
        assert!((1..=8).contains(&byte), "unexpected color {}", byte);
    }
}

// HELPER FUNCTIONS

async fn start_server(width: u32, height: u32, cooldown: Duration) -> SocketAddr {
    let canvas = Arc::new(CanvasStore::new(width, height));
    let ledger = Arc::new(CooldownLedger::new(cooldown));
    let leaderboard = Arc::new(Leaderboard::new());
    let hub = Arc::new(ConnectionHub::new());
    let pipeline = Arc::new(PaintPipeline::new(canvas, ledger, leaderboard, Arc::clone(&hub)));

    let server = Server::bind("127.0.0.1:0", hub, pipeline).await.unwrap();
    let addr = server.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = server.run().await;
    });
    addr
}

async fn connect(addr: SocketAddr) -> WsClient {
    let (client, _) = connect_async(format!("ws://{}", addr)).await.unwrap();
    client
}

async fn send(client: &mut WsClient, event: &ClientEvent) {
    client
        .send(Message::Text(event.encode().unwrap()))
        .await
        .unwrap();
}

fn paint_event(x: i64, y: i64, color_index: i64, actor_id: &str, nickname: &str) -> ClientEvent {
    ClientEvent::PaintPixel(PaintRequest {
        x,
        y,
        color_index,
        actor_id: actor_id.to_string(),
        nickname: nickname.to_string(),
    })
}

/// Next text frame, decoded. Panics after five seconds of silence.
async fn next_event(client: &mut WsClient) -> ServerEvent {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(5), client.next())
            .await
            .expect("timed out waiting for server event")
            .expect("connection closed")
            .expect("socket error");
        if let Message::Text(text) = frame {
            return ServerEvent::decode(&text).unwrap();
        }
    }
}

/// Next binary frame (the canvas snapshot), skipping interleaved text.
async fn next_binary(client: &mut WsClient) -> Vec<u8> {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(5), client.next())
            .await
            .expect("timed out waiting for snapshot")
            .expect("connection closed")
            .expect("socket error");
        if let Message::Binary(bytes) = frame {
            return bytes;
        }
    }
}

/// Asserts nothing arrives for a while (silent-drop checks).
async fn assert_silent(client: &mut WsClient) {
    let result = tokio::time::timeout(Duration::from_millis(200), client.next()).await;
    assert!(result.is_err(), "expected silence, got {:?}", result);
}

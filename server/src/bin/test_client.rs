use futures_util::{SinkExt, StreamExt};
use shared::{ClientEvent, PaintRequest, ServerEvent};
use std::time::Duration;
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

// Manual smoke client: connects, requests the canvas and leaderboard,
// paints one pixel, then prints whatever the server broadcasts.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "ws://127.0.0.1:3000".to_string());

    println!("Connecting to {}", url);
    let (mut socket, _) = connect_async(url).await?;
    println!("Connected");

    socket
        .send(Message::Text(ClientEvent::RequestCanvas.encode()?))
        .await?;
    socket
        .send(Message::Text(ClientEvent::GetLeaderboard.encode()?))
        .await?;

    let request = PaintRequest {
        x: 10,
        y: 10,
        color_index: 5,
        actor_id: "test-client".to_string(),
        nickname: "tester".to_string(),
    };
    socket
        .send(Message::Text(ClientEvent::PaintPixel(request).encode()?))
        .await?;
    println!("Paint request sent, listening for 10 seconds...");

    let listen = async {
        while let Some(frame) = socket.next().await {
            match frame {
                Ok(Message::Text(text)) => match ServerEvent::decode(&text) {
                    Ok(ServerEvent::PixelChanged {
                        x,
                        y,
                        color_index,
                        nickname,
                    }) => {
                        println!("pixel_changed: ({}, {}) -> {} by \"{}\"", x, y, color_index, nickname);
                    }
                    Ok(ServerEvent::UserCount(count)) => println!("user_count: {}", count),
                    Ok(ServerEvent::LeaderboardData(rows)) => {
                        println!("leaderboard ({} rows):", rows.len());
                        for row in rows {
                            println!("  {}: {}", row.nickname, row.score);
                        }
                    }
                    Ok(ServerEvent::NickStatus { success, nickname }) => {
                        println!("nick_status: \"{}\" available={}", nickname, success);
                    }
                    Err(err) => println!("undecodable frame: {}", err),
                },
                Ok(Message::Binary(bytes)) => {
                    let painted = bytes.iter().filter(|&&b| b != 0).count();
                    println!("canvas snapshot: {} bytes, {} painted", bytes.len(), painted);
                }
                Ok(_) => {}
                Err(err) => {
                    println!("socket error: {}", err);
                    break;
                }
            }
        }
    };
    let _ = timeout(Duration::from_secs(10), listen).await;

    println!("Test client finished");
    Ok(())
}

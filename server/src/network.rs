//! WebSocket transport layer: listener, handshake, per-connection tasks.
//!
//! Each accepted connection runs as its own task with two halves: a reader
//! loop that decodes inbound frames and hands them to the pipeline, and a
//! writer task that drains the viewer's outbound queue into the socket. The
//! hub's sender is the only link between them, so a slow or dead socket never
//! blocks a broadcast.

use crate::hub::ConnectionHub;
use crate::pipeline::PaintPipeline;
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use shared::{ClientEvent, ServerEvent};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

pub struct Server {
    listener: TcpListener,
    hub: Arc<ConnectionHub>,
    pipeline: Arc<PaintPipeline>,
}

impl Server {
    pub async fn bind(
        addr: &str,
        hub: Arc<ConnectionHub>,
        pipeline: Arc<PaintPipeline>,
    ) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        info!("listening on {}", listener.local_addr()?);
        Ok(Self {
            listener,
            hub,
            pipeline,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept loop; runs until the listener fails irrecoverably.
    pub async fn run(&self) -> std::io::Result<()> {
        loop {
            match self.listener.accept().await {
                Ok((stream, peer)) => {
                    let hub = Arc::clone(&self.hub);
                    let pipeline = Arc::clone(&self.pipeline);
                    tokio::spawn(async move {
                        handle_connection(stream, peer, hub, pipeline).await;
                    });
                }
                Err(err) => {
                    error!("accept failed: {}", err);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                }
            }
        }
    }
}

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    hub: Arc<ConnectionHub>,
    pipeline: Arc<PaintPipeline>,
) {
    let ws = match tokio_tungstenite::accept_async(stream).await {
        Ok(ws) => ws,
        Err(err) => {
            warn!("handshake with {} failed: {}", peer, err);
            return;
        }
    };
    let (mut sink, mut source) = ws.split();

    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();
    let control_tx = tx.clone();
    let viewer = hub.register(tx);
    info!("viewer {} connected from {}", viewer, peer);
    hub.broadcast_all(&ServerEvent::UserCount(hub.count()));

    // Writer half: everything queued for this viewer goes out here.
    let writer = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if sink.send(message).await.is_err() {
                break;
            }
        }
    });

    while let Some(frame) = source.next().await {
        match frame {
            Ok(Message::Text(text)) => match ClientEvent::decode(&text) {
                Ok(event) => pipeline.dispatch(viewer, event).await,
                Err(err) => {
                    // Malformed input is dropped per-frame; the connection
                    // itself stays up.
                    warn!("viewer {}: undecodable frame dropped: {}", viewer, err);
                }
            },
            Ok(Message::Ping(payload)) => {
                let _ = control_tx.send(Message::Pong(payload));
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(err) => {
                debug!("viewer {} socket error: {}", viewer, err);
                break;
            }
        }
    }

    // A disconnect mid-paint never cancels the mutation; only this viewer's
    // own delivery disappears with the unregistration.
    hub.unregister(viewer);
    drop(control_tx);
    hub.broadcast_all(&ServerEvent::UserCount(hub.count()));
    info!("viewer {} disconnected", viewer);

    let _ = writer.await;
}

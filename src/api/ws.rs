use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use sqlx::SqlitePool;
use tokio::sync::broadcast;

use crate::tracker::{self, BusLocation, LocationUpdateSender};

#[derive(Clone)]
pub struct LiveWsState {
    pub pool: SqlitePool,
    pub updates_tx: LocationUpdateSender,
}

/// Events pushed to observers, tagged by `type` on the wire.
#[derive(Debug, Serialize)]
#[serde(tag = "type")]
#[serde(rename_all = "snake_case")]
enum LiveEvent {
    /// Sent once, right after the upgrade completes.
    Connected { message: String },
    /// Location snapshot covering every tracked bus.
    Live { buses: Vec<BusLocation> },
}

/// Serialize an event onto the socket. Returns `false` once the peer is gone.
async fn push_event(out: &mut SplitSink<WebSocket, Message>, event: &LiveEvent) -> bool {
    match serde_json::to_string(event) {
        Ok(json) => out.send(Message::Text(json.into())).await.is_ok(),
        Err(_) => true,
    }
}

/// WebSocket endpoint for live bus locations
pub async fn ws_live(ws: WebSocketUpgrade, State(state): State<LiveWsState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| serve_live(socket, state))
}

async fn serve_live(socket: WebSocket, state: LiveWsState) {
    let (mut out, mut incoming) = socket.split();
    let mut updates_rx = state.updates_tx.subscribe();

    let greeting = LiveEvent::Connected {
        message: "Live bus feed connected.".to_string(),
    };
    push_event(&mut out, &greeting).await;

    // First snapshot comes straight from the database so a fresh observer
    // is not stuck waiting for the next tracker tick.
    match tracker::live_feed(&state.pool).await {
        Ok(buses) => {
            push_event(&mut out, &LiveEvent::Live { buses }).await;
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load initial live snapshot");
        }
    }

    // Relay tracker broadcasts for as long as the peer keeps the socket
    // open. An observer that lags the channel skips ahead to the newest
    // snapshot on its next recv.
    let push_task = tokio::spawn(async move {
        loop {
            match updates_rx.recv().await {
                Ok(buses) => {
                    if !push_event(&mut out, &LiveEvent::Live { buses }).await {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    // Observers never send anything we act on, and axum answers pings on
    // its own, so the read side only watches for the close.
    while let Some(msg) = incoming.next().await {
        match msg {
            Ok(Message::Close(_)) | Err(_) => break,
            _ => {}
        }
    }

    push_task.abort();
}

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

use crate::api::AppState;
use crate::protocol::Reading;

/// GET /ws - Latest reading on connect, then every new one
pub async fn live_updates(ws: WebSocketUpgrade, State(app): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| stream_readings(socket, app))
}

async fn stream_readings(mut socket: WebSocket, app: AppState) {
    // Subscribe before reading the latest so nothing falls in between
    let mut updates = app.live.subscribe();
    tracing::debug!("Live client connected");

    let latest = app.monitor.read().await.latest_reading.clone();
    if let Some(reading) = latest {
        if send_reading(&mut socket, &reading).await.is_err() {
            return;
        }
    }

    loop {
        tokio::select! {
            update = next_update(&mut updates) => match update {
                Some(reading) => {
                    if send_reading(&mut socket, &reading).await.is_err() {
                        break;
                    }
                }
                None => break,
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    tracing::debug!("Live client disconnected");
}

/// Next reading for a client; a slow client skips what it missed.
/// `None` once the poll loop's sender is gone.
async fn next_update(updates: &mut broadcast::Receiver<Reading>) -> Option<Reading> {
    loop {
        match updates.recv().await {
            Ok(reading) => return Some(reading),
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!("Live client fell behind, skipped {} readings", skipped);
            }
            Err(RecvError::Closed) => return None,
        }
    }
}

async fn send_reading(socket: &mut WebSocket, reading: &Reading) -> Result<(), axum::Error> {
    let json = serde_json::to_string(reading).map_err(axum::Error::new)?;
    socket.send(Message::Text(json.into())).await
}

//! WebSocket handler for real-time readings.
//!
//! Each connection registers with the [`Broadcaster`](thermo_core::Broadcaster)
//! and gets its own bounded outbound queue. A send task drains that queue
//! into text frames; a receive task feeds text frames back as control
//! messages.

use std::sync::Arc;

use axum::{
    Router,
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::IntoResponse,
    routing::get,
};
use futures::{SinkExt, StreamExt};
use tracing::{debug, warn};

use thermo_core::outbound_channel;

use crate::state::AppState;

/// Create the WebSocket router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/ws", get(ws_handler))
}

/// WebSocket upgrade handler.
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle a WebSocket connection.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let (outbound, mut queue) = outbound_channel();
    let id = state.broadcaster.on_connect(outbound);

    // Drain the connection's queue into text frames.
    let mut send_task = tokio::spawn(async move {
        while let Some(message) = queue.recv().await {
            let json = match message.to_json() {
                Ok(j) => j,
                Err(e) => {
                    warn!("Failed to serialize message: {}", e);
                    continue;
                }
            };

            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    // Feed text frames to the broadcaster as control messages.
    let broadcaster = Arc::clone(&state.broadcaster);
    let mut recv_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(Message::Text(text)) => broadcaster.on_client_message(id, text.as_str()),
                Ok(Message::Binary(data)) => {
                    broadcaster.on_client_message(id, &String::from_utf8_lossy(&data))
                }
                Ok(Message::Close(_)) => break,
                Ok(_) => {
                    // Pings are answered by axum.
                }
                Err(e) => {
                    broadcaster.on_transport_error(id, &e);
                    break;
                }
            }
        }
    });

    // Wait for either task to finish, then abort the other
    tokio::select! {
        _ = &mut send_task => {
            recv_task.abort();
        },
        _ = &mut recv_task => {
            send_task.abort();
        },
    }

    if state.broadcaster.on_disconnect(id) {
        debug!(connection = id, "WebSocket closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, http::StatusCode};
    use tower::ServiceExt;

    use crate::config::Config;

    #[tokio::test]
    async fn test_ws_route_requires_upgrade() {
        let state = AppState::new(Config::default());
        let app = router().with_state(state);

        let response = app
            .oneshot(Request::builder().uri("/ws").body(Body::empty()).unwrap())
            .await
            .unwrap();

        // A plain GET without upgrade headers is rejected by the extractor.
        assert!(response.status().is_client_error());
        assert_ne!(response.status(), StatusCode::NOT_FOUND);
    }
}

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use futures::{SinkExt, StreamExt};

use super::AppState;
use crate::hub::HubHandle;

pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    if state.hub.is_closed() {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }
    let hub = state.hub.clone();
    ws.on_upgrade(move |socket| client_session(socket, hub))
}

/// Forwards the client's hub queue to the socket until either side goes away.
/// Inbound frames are read only to notice closes.
async fn client_session(socket: WebSocket, hub: HubHandle) {
    let mut subscription = match hub.register().await {
        Ok(subscription) => subscription,
        Err(e) => {
            tracing::warn!(error = %e, "websocket rejected");
            return;
        }
    };
    let client_id = subscription.id;
    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            frame = subscription.recv() => match frame {
                Some(text) => {
                    if let Err(e) = sender.send(Message::Text(text.as_ref().into())).await {
                        tracing::debug!(client_id = %client_id, error = %e, "websocket send failed");
                        break;
                    }
                }
                None => {
                    // Unregistered, evicted, or the hub shut down.
                    let _ = sender.send(Message::Close(None)).await;
                    break;
                }
            },
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::debug!(client_id = %client_id, error = %e, "websocket read failed");
                    break;
                }
            },
        }
    }

    hub.unregister(client_id).await;
}

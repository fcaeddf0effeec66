//! WebSocket 事件流
//!
//! `GET /api/events?token=` 升级为 WebSocket 后，客户端收到：
//!
//! 1. 一帧 `welcome`（协议版本、server_epoch、各集合版本号）
//! 2. 之后的 `sync` / `booking` / `notification` 帧
//!
//! 浏览器的 WebSocket 握手带不了 Authorization 头，令牌走查询参数，
//! 在这里验证；认证中间件对该路径放行。
//!
//! 每个连接有自己的有界 mpsc 发送队列：总线广播先进队列再写 socket，
//! 慢客户端丢帧（靠 welcome/sync 里的版本号重新对齐），不会拖住总线。

use axum::{
    Router,
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    extract::{Query, State},
    response::IntoResponse,
    routing::get,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::{broadcast, mpsc};
use uuid::Uuid;

use shared::message::BusMessage;

use crate::auth::Identity;
use crate::core::ServerState;
use crate::message::ConnectedClient;
use crate::utils::AppError;
use crate::utils::time::now_iso;

/// 单连接发送队列长度，塞满说明客户端跟不上
const CLIENT_QUEUE_CAPACITY: usize = 32;

/// Event feed router - token-authenticated in the handler
pub fn router() -> Router<ServerState> {
    Router::new().route("/api/events", get(handle_events_ws))
}

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    pub token: String,
}

/// GET /api/events?token= — upgrade to WebSocket
pub async fn handle_events_ws(
    State(state): State<ServerState>,
    Query(query): Query<EventsQuery>,
    ws: WebSocketUpgrade,
) -> Result<impl IntoResponse, AppError> {
    let claims = state
        .jwt_service()
        .validate_token(&query.token)
        .map_err(|e| match e {
            crate::auth::JwtError::ExpiredToken => AppError::token_expired(),
            _ => AppError::invalid_token("Invalid token"),
        })?;
    let identity = Identity::from(claims);

    Ok(ws.on_upgrade(move |socket| handle_connection(socket, state, identity)))
}

async fn handle_connection(socket: WebSocket, state: ServerState, identity: Identity) {
    let client_id = Uuid::new_v4().to_string();

    tracing::info!(
        client_id = %client_id,
        user_id = %identity.user_id,
        "Event feed connected"
    );

    state.bus.register_client(ConnectedClient {
        id: client_id.clone(),
        user_id: identity.user_id.clone(),
        name: identity.name.clone(),
        connected_at: now_iso(),
    });

    let (mut ws_sink, mut ws_stream) = socket.split();

    // 欢迎帧必须先于一切 sync 帧到达
    let welcome = BusMessage::welcome(&state.welcome_payload());
    match welcome.to_frame_json() {
        Ok(json) => {
            if ws_sink.send(Message::Text(json.into())).await.is_err() {
                tracing::warn!(client_id = %client_id, "Failed to send welcome, disconnecting");
                state.bus.remove_client(&client_id);
                return;
            }
        }
        Err(e) => {
            tracing::error!(client_id = %client_id, "Failed to serialize welcome: {}", e);
            state.bus.remove_client(&client_id);
            return;
        }
    }

    // 总线广播 -> 本连接队列的泵
    let (queue_tx, mut queue_rx) = mpsc::channel::<BusMessage>(CLIENT_QUEUE_CAPACITY);
    let mut bus_rx = state.bus.subscribe();
    let shutdown = state.bus.shutdown_token().clone();
    let pump_id = client_id.clone();
    let pump = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,

                msg = bus_rx.recv() => {
                    match msg {
                        Ok(msg) => {
                            // 队列满就丢，客户端用版本号补课
                            if let Err(mpsc::error::TrySendError::Closed(_)) =
                                queue_tx.try_send(msg)
                            {
                                break;
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!(
                                client_id = %pump_id,
                                skipped,
                                "Event feed consumer lagging"
                            );
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
            }
        }
    });

    // Main select loop
    loop {
        tokio::select! {
            // Frame to push to the client
            msg = queue_rx.recv() => {
                match msg {
                    Some(msg) => {
                        if let Ok(json) = msg.to_frame_json()
                            && ws_sink.send(Message::Text(json.into())).await.is_err()
                        {
                            break;
                        }
                    }
                    None => break, // pump gone
                }
            }

            // Incoming message from the client
            incoming = ws_stream.next() => {
                match incoming {
                    Some(Ok(Message::Ping(data))) => {
                        let _ = ws_sink.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        tracing::info!(client_id = %client_id, "Event feed disconnected");
                        break;
                    }
                    Some(Err(e)) => {
                        tracing::warn!(client_id = %client_id, "Event feed error: {}", e);
                        break;
                    }
                    // 事件流是单向的，文本/二进制入帧一律忽略
                    _ => {}
                }
            }
        }
    }

    // Send Close frame (best-effort)
    let _ = ws_sink.close().await;

    pump.abort();
    state.bus.remove_client(&client_id);
}

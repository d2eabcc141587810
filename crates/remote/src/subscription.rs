//! Live timeline transport over the `graphql-transport-ws` protocol.
//!
//! One socket per subscription: connect, `connection_init` with the auth
//! payload, wait for `connection_ack`, `subscribe`, then translate
//! `next`/`error`/`complete` frames into feed events until the server
//! stops or the feed handle is dropped.

use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use parlor_storage::{
    ConversationId, FeedEvent, MessageFeed, MessageRecord, StoreError, StoreResult,
    make_message_feed,
};

use crate::graphql::{GraphQlError, SUBSCRIBE_MESSAGES, SubscriptionData, join_error_messages};

pub const WS_SUBPROTOCOL: &str = "graphql-transport-ws";
const SUBSCRIPTION_OPERATION_ID: &str = "1";

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Client→server frames.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    ConnectionInit { payload: Value },
    Subscribe { id: String, payload: SubscribePayload },
    Complete { id: String },
    Pong,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SubscribePayload {
    pub query: &'static str,
    pub variables: Value,
}

/// Server→client frames. Unknown types are tolerated and skipped.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    ConnectionAck {
        #[serde(default)]
        payload: Option<Value>,
    },
    Next {
        id: String,
        payload: NextPayload,
    },
    Error {
        id: String,
        payload: Vec<GraphQlError>,
    },
    Complete {
        id: String,
    },
    Ping {
        #[serde(default)]
        payload: Option<Value>,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct NextPayload {
    #[serde(default)]
    pub data: Option<SubscriptionData>,
    #[serde(default)]
    pub errors: Option<Vec<GraphQlError>>,
}

/// What the reader task should do with one incoming frame.
#[derive(Debug, PartialEq)]
pub enum FrameAction {
    Deliver(FeedEvent),
    /// Deliver the event, then stop reading: the feed is dead.
    DeliverAndStop(FeedEvent),
    Pong,
    Ignore,
}

/// Opens the standing subscription for one conversation.
pub(crate) async fn open_message_feed(
    ws_url: String,
    auth_headers: Vec<(String, String)>,
    conversation_id: ConversationId,
) -> StoreResult<MessageFeed> {
    let mut request = ws_url
        .as_str()
        .into_client_request()
        .map_err(|source| subscription_error(conversation_id, "ws-request", source.to_string()))?;
    request.headers_mut().insert(
        "Sec-WebSocket-Protocol",
        HeaderValue::from_static(WS_SUBPROTOCOL),
    );

    let (mut socket, _response) = connect_async(request)
        .await
        .map_err(|source| subscription_error(conversation_id, "ws-connect", source.to_string()))?;

    // The init payload mirrors the HTTP auth headers.
    let mut header_map = serde_json::Map::new();
    for (name, value) in auth_headers {
        header_map.insert(name, Value::String(value));
    }
    let init = ClientFrame::ConnectionInit {
        payload: json!({ "headers": Value::Object(header_map) }),
    };
    send_frame(&mut socket, &init)
        .await
        .map_err(|details| subscription_error(conversation_id, "ws-init", details))?;

    wait_for_ack(&mut socket, conversation_id).await?;

    let subscribe = ClientFrame::Subscribe {
        id: SUBSCRIPTION_OPERATION_ID.to_string(),
        payload: SubscribePayload {
            query: SUBSCRIBE_MESSAGES,
            variables: json!({ "chat_id": conversation_id.as_uuid() }),
        },
    };
    send_frame(&mut socket, &subscribe)
        .await
        .map_err(|details| subscription_error(conversation_id, "ws-subscribe", details))?;

    let (event_tx, feed, mut unsubscribe_rx) = make_message_feed(conversation_id);

    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = &mut unsubscribe_rx => {
                    // Courteous teardown: complete the operation, then close.
                    let complete = ClientFrame::Complete {
                        id: SUBSCRIPTION_OPERATION_ID.to_string(),
                    };
                    let _ = send_frame(&mut socket, &complete).await;
                    let _ = socket.close(None).await;
                    break;
                }
                incoming = socket.next() => {
                    let action = match incoming {
                        None => FrameAction::DeliverAndStop(FeedEvent::Lost {
                            details: "websocket closed by server".to_string(),
                        }),
                        Some(Err(source)) => FrameAction::DeliverAndStop(FeedEvent::Lost {
                            details: source.to_string(),
                        }),
                        Some(Ok(message)) => classify_frame(message),
                    };

                    match action {
                        FrameAction::Deliver(event) => {
                            if event_tx.send(event).is_err() {
                                // Receiver gone without the unsubscribe
                                // handle firing first; stop reading.
                                break;
                            }
                        }
                        FrameAction::DeliverAndStop(event) => {
                            let _ = event_tx.send(event);
                            break;
                        }
                        FrameAction::Pong => {
                            let _ = send_frame(&mut socket, &ClientFrame::Pong).await;
                        }
                        FrameAction::Ignore => {}
                    }
                }
            }
        }
        tracing::debug!(conversation = %conversation_id, "subscription reader stopped");
    });

    Ok(feed)
}

async fn wait_for_ack(socket: &mut Socket, conversation_id: ConversationId) -> StoreResult<()> {
    loop {
        let Some(incoming) = socket.next().await else {
            return Err(subscription_error(
                conversation_id,
                "ws-ack",
                "connection closed before acknowledgement".to_string(),
            ));
        };
        let message = incoming
            .map_err(|source| subscription_error(conversation_id, "ws-ack", source.to_string()))?;

        let WsMessage::Text(text) = message else {
            continue;
        };
        match serde_json::from_str::<ServerFrame>(text.as_str()) {
            Ok(ServerFrame::ConnectionAck { .. }) => return Ok(()),
            Ok(ServerFrame::Ping { .. }) => {
                send_frame(socket, &ClientFrame::Pong)
                    .await
                    .map_err(|details| subscription_error(conversation_id, "ws-ack", details))?;
            }
            Ok(_) => continue,
            Err(source) => {
                tracing::warn!(
                    conversation = %conversation_id,
                    error = %source,
                    "skipping unparseable frame while waiting for ack"
                );
            }
        }
    }
}

pub fn classify_frame(message: WsMessage) -> FrameAction {
    let text = match message {
        WsMessage::Text(text) => text,
        WsMessage::Close(_) => {
            return FrameAction::DeliverAndStop(FeedEvent::Lost {
                details: "websocket closed by server".to_string(),
            });
        }
        // Transport-level control and binary frames are not protocol frames.
        WsMessage::Binary(_) | WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Frame(_) => {
            return FrameAction::Ignore;
        }
    };

    match serde_json::from_str::<ServerFrame>(text.as_str()) {
        Ok(ServerFrame::Next { payload, .. }) => {
            if let Some(errors) = payload.errors.filter(|errors| !errors.is_empty()) {
                return FrameAction::DeliverAndStop(FeedEvent::Lost {
                    details: join_error_messages(&errors),
                });
            }
            match payload.data {
                Some(data) => FrameAction::Deliver(FeedEvent::Snapshot(
                    data.messages
                        .into_iter()
                        .map(MessageRecord::from)
                        .collect(),
                )),
                None => FrameAction::Ignore,
            }
        }
        Ok(ServerFrame::Error { payload, .. }) => FrameAction::DeliverAndStop(FeedEvent::Lost {
            details: join_error_messages(&payload),
        }),
        Ok(ServerFrame::Complete { .. }) => FrameAction::DeliverAndStop(FeedEvent::Lost {
            details: "subscription completed by server".to_string(),
        }),
        Ok(ServerFrame::Ping { .. }) => FrameAction::Pong,
        Ok(ServerFrame::ConnectionAck { .. }) | Ok(ServerFrame::Unknown) => FrameAction::Ignore,
        Err(source) => {
            tracing::warn!(error = %source, "skipping unparseable subscription frame");
            FrameAction::Ignore
        }
    }
}

async fn send_frame(socket: &mut Socket, frame: &ClientFrame) -> Result<(), String> {
    let text = serde_json::to_string(frame).map_err(|source| source.to_string())?;
    socket
        .send(WsMessage::Text(text.into()))
        .await
        .map_err(|source| source.to_string())
}

fn subscription_error(
    conversation_id: ConversationId,
    stage: &'static str,
    details: String,
) -> StoreError {
    StoreError::Subscription {
        stage,
        conversation_id,
        details,
    }
}

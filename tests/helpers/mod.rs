//! Shared helpers for connection integration tests.

#![allow(dead_code)]

use iterm2_client::protocol::api::client_originated_message::Submessage as ClientSubmessage;
use iterm2_client::protocol::api::list_sessions_response::{Tab, Window};
use iterm2_client::protocol::api::server_originated_message::Submessage as ServerSubmessage;
use iterm2_client::protocol::api::{
    ClientOriginatedMessage, KeystrokeNotification, ListSessionsRequest, ListSessionsResponse,
    Notification, NotificationResponse, ServerOriginatedMessage, notification_response,
};
use iterm2_client::transport::memory::{self, MemorySink, ServerEnd};
use iterm2_client::{ClientSettings, Connection, RequestId};
use tokio::task::JoinHandle;

/// Install a test logger once; output is captured per test.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Connection over an in-memory transport with the given settings.
pub fn start_connection(settings: &ClientSettings) -> (Connection<MemorySink>, ServerEnd) {
    init_logging();
    let (transport, server) = memory::pair();
    let connection = Connection::start(transport, settings).expect("tokio runtime available");
    (connection, server)
}

pub fn list_sessions_request(id: RequestId) -> ClientOriginatedMessage {
    ClientOriginatedMessage {
        id: Some(id.as_i64()),
        submessage: Some(ClientSubmessage::ListSessionsRequest(ListSessionsRequest {})),
    }
}

/// A session listing whose single window is named after `id`.
pub fn sessions_reply(id: i64) -> ServerOriginatedMessage {
    ServerOriginatedMessage {
        id: Some(id),
        submessage: Some(ServerSubmessage::ListSessionsResponse(ListSessionsResponse {
            windows: vec![Window {
                window_id: Some(format!("window-{}", id)),
                tabs: vec![Tab {
                    tab_id: Some("1".to_string()),
                    session_ids: vec![format!("session-{}", id)],
                }],
            }],
        })),
    }
}

pub fn error_reply(id: i64, message: &str) -> ServerOriginatedMessage {
    ServerOriginatedMessage {
        id: Some(id),
        submessage: Some(ServerSubmessage::Error(message.to_string())),
    }
}

pub fn keystroke_event(characters: &str) -> ServerOriginatedMessage {
    ServerOriginatedMessage {
        id: None,
        submessage: Some(ServerSubmessage::Notification(Notification {
            keystroke_notification: Some(KeystrokeNotification {
                characters: Some(characters.to_string()),
                session: Some("session-1".to_string()),
            }),
            ..Default::default()
        })),
    }
}

/// Play a well-behaved API server: answer every request with its own id.
///
/// Session listings get `sessions_reply`, notification requests an OK
/// status. Returns when the client goes away.
pub fn spawn_answering_server(mut server: ServerEnd) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(request) = server.recv_request().await {
            let id = request.id.expect("client always sends an id");
            let reply = match request.submessage {
                Some(ClientSubmessage::NotificationRequest(_)) => ServerOriginatedMessage {
                    id: Some(id),
                    submessage: Some(ServerSubmessage::NotificationResponse(
                        NotificationResponse {
                            status: Some(notification_response::Status::Ok as i32),
                        },
                    )),
                },
                _ => sessions_reply(id),
            };
            if !server.send_message(&reply) {
                break;
            }
        }
    })
}

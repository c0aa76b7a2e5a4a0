//! Integration tests for notification fan-out and the convenience requests.

mod helpers;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use helpers::{error_reply, keystroke_event, spawn_answering_server, start_connection};
use iterm2_client::protocol::api::client_originated_message::Submessage as ClientSubmessage;
use iterm2_client::protocol::api::notification_response::Status;
use iterm2_client::protocol::api::server_originated_message::Submessage as ServerSubmessage;
use iterm2_client::protocol::api::{NotificationResponse, NotificationType, ServerOriginatedMessage};
use iterm2_client::{ClientError, ClientSettings, NotificationCategory};
use rstest::rstest;

#[tokio::test]
async fn events_reach_subscribers_without_touching_pending_table() {
    let (connection, server) = start_connection(&ClientSettings::default());
    let (_listener, mut events) = connection
        .notifications()
        .subscribe(NotificationCategory::Keystroke, 8);

    server.send_message(&keystroke_event("a"));
    server.send_message(&keystroke_event("b"));

    let mut seen = Vec::new();
    for _ in 0..2 {
        let event = tokio::time::timeout(Duration::from_secs(1), events.recv())
            .await
            .expect("should not timeout")
            .expect("subscription open");
        seen.push(event.keystroke_notification.unwrap().characters.unwrap());
    }
    seen.sort();
    assert_eq!(seen, vec!["a".to_string(), "b".to_string()]);
    assert_eq!(connection.pending_count(), 0);
}

#[tokio::test]
async fn callbacks_run_for_matching_category_only() {
    let (connection, server) = start_connection(&ClientSettings::default());
    let keystrokes = Arc::new(AtomicUsize::new(0));
    let layouts = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&keystrokes);
    connection
        .notifications()
        .register(NotificationCategory::Keystroke, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
    let counter = Arc::clone(&layouts);
    connection
        .notifications()
        .register(NotificationCategory::LayoutChange, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

    // A subscriber gives us a point to wait on.
    let (_id, mut events) = connection
        .notifications()
        .subscribe(NotificationCategory::Keystroke, 1);
    server.send_message(&keystroke_event("x"));
    tokio::time::timeout(Duration::from_secs(1), events.recv())
        .await
        .expect("should not timeout");

    assert_eq!(keystrokes.load(Ordering::SeqCst), 1);
    assert_eq!(layouts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn unregistered_listener_receives_nothing() {
    let (connection, server) = start_connection(&ClientSettings::default());
    let router = connection.notifications();
    let (gone, mut gone_rx) = router.subscribe(NotificationCategory::Keystroke, 1);
    let (_kept, mut kept_rx) = router.subscribe(NotificationCategory::Keystroke, 1);

    assert!(router.unregister(gone));
    server.send_message(&keystroke_event("z"));

    tokio::time::timeout(Duration::from_secs(1), kept_rx.recv())
        .await
        .expect("should not timeout")
        .expect("subscription open");
    assert!(gone_rx.recv().await.is_none(), "sender dropped on unregister");
}

#[tokio::test]
async fn list_sessions_returns_server_listing() {
    let (connection, server) = start_connection(&ClientSettings::default());
    let _server = spawn_answering_server(server);

    let listing = connection.list_sessions().await.unwrap();

    assert_eq!(listing.windows.len(), 1);
    let window = &listing.windows[0];
    let id = window.window_id.as_deref().unwrap().trim_start_matches("window-");
    assert_eq!(window.tabs[0].session_ids, vec![format!("session-{}", id)]);
    assert_eq!(connection.pending_count(), 0);
}

#[tokio::test]
async fn concurrent_convenience_calls_are_correlated() {
    let (connection, server) = start_connection(&ClientSettings::default());
    let _server = spawn_answering_server(server);

    let (a, b, c) = tokio::join!(
        connection.list_sessions(),
        connection.list_sessions(),
        connection.subscribe_notifications(None, NotificationCategory::NewSession, true),
    );

    let a = a.unwrap().windows[0].window_id.clone();
    let b = b.unwrap().windows[0].window_id.clone();
    assert_ne!(a, b, "each caller sees the reply to its own request");
    assert_eq!(c.unwrap().status, Some(Status::Ok as i32));
}

#[rstest]
#[case(NotificationCategory::Keystroke, NotificationType::NotifyOnKeystroke)]
#[case(NotificationCategory::ScreenUpdate, NotificationType::NotifyOnScreenUpdate)]
#[case(NotificationCategory::LayoutChange, NotificationType::NotifyOnLayoutChange)]
#[tokio::test]
async fn subscribe_notifications_sends_category_and_scope(
    #[case] category: NotificationCategory,
    #[case] expected: NotificationType,
) {
    let (connection, mut server) = start_connection(&ClientSettings::default());

    let call = connection.subscribe_notifications(Some("session-1"), category, true);
    let serve = async {
        let request = server.recv_request().await.unwrap();
        let Some(ClientSubmessage::NotificationRequest(body)) = request.submessage.clone() else {
            panic!("expected notification request, got {:?}", request);
        };
        server.send_message(&ServerOriginatedMessage {
            id: request.id,
            submessage: Some(ServerSubmessage::NotificationResponse(NotificationResponse {
                status: Some(Status::AlreadySubscribed as i32),
            })),
        });
        body
    };

    let (response, body) = tokio::join!(call, serve);
    assert_eq!(body.session.as_deref(), Some("session-1"));
    assert_eq!(body.subscribe, Some(true));
    assert_eq!(body.notification_type, Some(expected as i32));
    assert_eq!(
        response.unwrap().status,
        Some(Status::AlreadySubscribed as i32)
    );
}

#[tokio::test]
async fn server_error_reply_becomes_typed_error() {
    let (connection, mut server) = start_connection(&ClientSettings::default());

    let call = connection.list_sessions();
    let serve = async {
        let request = server.recv_request().await.unwrap();
        server.send_message(&error_reply(request.id.unwrap(), "no such session"));
    };

    let (result, ()) = tokio::join!(call, serve);
    match result {
        Err(ClientError::Server { message, .. }) => assert_eq!(message, "no such session"),
        other => panic!("expected server error, got {:?}", other),
    }
}

#[tokio::test]
async fn unanswered_call_times_out_and_forgets_its_entry() {
    let settings = ClientSettings {
        request_timeout_ms: Some(50),
        ..Default::default()
    };
    let (connection, mut server) = start_connection(&settings);

    let call = connection.list_sessions();
    let serve = async { server.recv_request().await.unwrap().id.unwrap() };
    let (result, id) = tokio::join!(call, serve);

    assert!(matches!(
        result,
        Err(ClientError::Timeout { timeout_ms: 50, .. })
    ));
    assert_eq!(connection.pending_count(), 0);

    // A late reply is now unknown and must not break later calls.
    server.send_message(&helpers::sessions_reply(id));
    let next = connection.new_id();
    let slot = connection
        .send(&helpers::list_sessions_request(next))
        .await
        .unwrap();
    server.send_message(&helpers::sessions_reply(next.as_i64()));
    assert!(slot.recv().await.is_some());
}

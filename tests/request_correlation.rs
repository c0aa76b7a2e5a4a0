//! Integration tests for request/reply correlation over a live connection.
//!
//! Each test drives a real `Connection` (dispatcher task included) over the
//! in-memory transport, with the test playing the API server.

mod helpers;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use helpers::{list_sessions_request, sessions_reply, start_connection};
use iterm2_client::protocol::api::server_originated_message::Submessage;
use iterm2_client::transport::Frame;
use iterm2_client::{ClientError, ClientSettings, ConnectionState, RequestId};

#[tokio::test]
async fn reply_with_matching_id_is_delivered_exactly_once() {
    let (connection, mut server) = start_connection(&ClientSettings::default());
    let id = RequestId::new(7);

    let slot = connection.send(&list_sessions_request(id)).await.unwrap();
    let request = server.recv_request().await.unwrap();
    assert_eq!(request.id, Some(7));

    server.send_message(&sessions_reply(7));

    let reply = tokio::time::timeout(Duration::from_secs(1), slot.recv())
        .await
        .expect("should not timeout")
        .expect("reply should be delivered");
    assert_eq!(reply, sessions_reply(7));
    assert_eq!(connection.pending_count(), 0, "entry 7 should be gone");

    // A duplicate reply for 7 is now unknown and must not disturb anything.
    server.send_message(&sessions_reply(7));
    let id = connection.new_id();
    let slot = connection.send(&list_sessions_request(id)).await.unwrap();
    server.send_message(&sessions_reply(id.as_i64()));
    assert!(slot.recv().await.is_some());
}

#[tokio::test]
async fn concurrent_requests_answered_out_of_order_reach_their_callers() {
    let (connection, mut server) = start_connection(&ClientSettings::default());
    let connection = Arc::new(connection);

    let mut slots = Vec::new();
    for _ in 0..20 {
        let id = connection.new_id();
        slots.push(connection.send(&list_sessions_request(id)).await.unwrap());
    }

    let mut received = Vec::new();
    for _ in 0..20 {
        received.push(server.recv_request().await.unwrap().id.unwrap());
    }
    for id in received.iter().rev() {
        server.send_message(&sessions_reply(*id));
    }

    for slot in slots {
        let expected = slot.id().as_i64();
        let reply = tokio::time::timeout(Duration::from_secs(1), slot.recv())
            .await
            .expect("should not timeout")
            .expect("reply should be delivered");
        assert_eq!(reply.id, Some(expected));
    }
    assert_eq!(connection.pending_count(), 0);
}

#[tokio::test]
async fn ids_issued_from_many_tasks_are_distinct() {
    let (connection, _server) = start_connection(&ClientSettings::default());
    let connection = Arc::new(connection);

    let tasks: Vec<_> = (0..3)
        .map(|_| {
            let connection = Arc::clone(&connection);
            tokio::spawn(async move { connection.new_id() })
        })
        .collect();

    let mut ids = HashSet::new();
    for task in tasks {
        let id = task.await.unwrap();
        assert!(id.as_i64() >= 1);
        assert!(ids.insert(id));
    }
    assert_eq!(ids.len(), 3);
}

#[tokio::test]
async fn unknown_reply_is_dropped_and_loop_keeps_running() {
    let (connection, mut server) = start_connection(&ClientSettings::default());
    let id = connection.new_id();
    let slot = connection.send(&list_sessions_request(id)).await.unwrap();
    server.recv_request().await.unwrap();

    server.send_message(&sessions_reply(99));
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(connection.pending_count(), 1, "table size unchanged");
    assert_eq!(connection.unknown_replies(), 1);
    assert_eq!(connection.state(), ConnectionState::Dispatching);

    server.send_message(&sessions_reply(id.as_i64()));
    assert!(slot.recv().await.is_some());
}

#[tokio::test]
async fn control_and_corrupt_frames_do_not_stop_dispatch() {
    let (connection, mut server) = start_connection(&ClientSettings::default());
    let id = connection.new_id();
    let slot = connection.send(&list_sessions_request(id)).await.unwrap();
    server.recv_request().await.unwrap();

    server.send(Frame::Ping(vec![1]));
    server.send(Frame::Text("not binary".into()));
    server.send(Frame::Binary(vec![0xff, 0xff, 0xff]));
    server.send_message(&sessions_reply(id.as_i64()));

    let reply = tokio::time::timeout(Duration::from_secs(1), slot.recv())
        .await
        .expect("should not timeout");
    assert!(reply.is_some());
}

#[tokio::test]
async fn error_reply_is_delivered_to_raw_sender() {
    let (connection, mut server) = start_connection(&ClientSettings::default());
    let id = connection.new_id();
    let slot = connection.send(&list_sessions_request(id)).await.unwrap();
    server.recv_request().await.unwrap();

    server.send_message(&helpers::error_reply(id.as_i64(), "bad request"));

    let reply = slot.recv().await.unwrap();
    assert_eq!(
        reply.submessage,
        Some(Submessage::Error("bad request".to_string()))
    );
}

#[tokio::test]
async fn transport_closure_stops_dispatch_and_leaves_slots_unresolved() {
    let (connection, mut server) = start_connection(&ClientSettings::default());
    let id = connection.new_id();
    let slot = connection.send(&list_sessions_request(id)).await.unwrap();
    server.recv_request().await.unwrap();

    server.send_error(std::io::Error::new(
        std::io::ErrorKind::ConnectionReset,
        "connection closed",
    ));

    tokio::time::timeout(Duration::from_secs(1), connection.closed())
        .await
        .expect("dispatcher should stop");
    assert_eq!(connection.state(), ConnectionState::Closed);

    // Nothing fails the waiter: it stays pending until the caller gives up.
    assert_eq!(connection.pending_count(), 1);
    let waited = tokio::time::timeout(Duration::from_millis(50), slot.recv()).await;
    assert!(waited.is_err(), "slot should remain unresolved");
}

#[tokio::test]
async fn failed_write_rolls_back_pending_entry() {
    let (connection, mut server) = start_connection(&ClientSettings::default());
    server.reject_writes();
    let id = connection.new_id();

    let err = connection
        .send(&list_sessions_request(id))
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Transport { .. }));
    assert_eq!(connection.pending_count(), 0);
}

#[tokio::test]
async fn dropping_connection_closes_outstanding_slots() {
    let (connection, mut server) = start_connection(&ClientSettings::default());
    let id = connection.new_id();
    let slot = connection.send(&list_sessions_request(id)).await.unwrap();
    server.recv_request().await.unwrap();

    drop(connection);

    let reply = tokio::time::timeout(Duration::from_secs(1), slot.recv())
        .await
        .expect("slot should close once the connection is gone");
    assert!(reply.is_none());
}

#[tokio::test]
async fn single_dispatch_permit_still_routes_every_frame() {
    let settings = ClientSettings {
        max_concurrent_dispatch: Some(1),
        ..Default::default()
    };
    let (connection, mut server) = start_connection(&settings);

    let mut slots = Vec::new();
    for _ in 0..10 {
        let id = connection.new_id();
        slots.push(connection.send(&list_sessions_request(id)).await.unwrap());
    }
    for _ in 0..10 {
        let id = server.recv_request().await.unwrap().id.unwrap();
        server.send_message(&sessions_reply(id));
    }

    for slot in slots {
        let reply = tokio::time::timeout(Duration::from_secs(1), slot.recv())
            .await
            .expect("should not timeout");
        assert!(reply.is_some());
    }
}

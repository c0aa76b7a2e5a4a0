//! Envelope messages of the iTerm2 API.
//!
//! Only the part of the schema the connection core touches is modelled:
//! the `id` correlation field, the submessage discriminant, the
//! notification family, and the session listing used by
//! `Connection::list_sessions`. prost skips unknown fields on decode, so
//! replies carrying richer payloads still decode into these types.

/// Message sent by the client. `id` is echoed back on the reply.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ClientOriginatedMessage {
    #[prost(int64, optional, tag = "1")]
    pub id: ::core::option::Option<i64>,
    #[prost(oneof = "client_originated_message::Submessage", tags = "102, 106")]
    pub submessage: ::core::option::Option<client_originated_message::Submessage>,
}

pub mod client_originated_message {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Submessage {
        #[prost(message, tag = "102")]
        NotificationRequest(super::NotificationRequest),
        #[prost(message, tag = "106")]
        ListSessionsRequest(super::ListSessionsRequest),
    }
}

/// Message sent by the server: either a reply (carries `id`) or a
/// notification (submessage `notification`).
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ServerOriginatedMessage {
    #[prost(int64, optional, tag = "1")]
    pub id: ::core::option::Option<i64>,
    #[prost(oneof = "server_originated_message::Submessage", tags = "2, 102, 106, 1000")]
    pub submessage: ::core::option::Option<server_originated_message::Submessage>,
}

pub mod server_originated_message {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Submessage {
        #[prost(string, tag = "2")]
        Error(::prost::alloc::string::String),
        #[prost(message, tag = "102")]
        NotificationResponse(super::NotificationResponse),
        #[prost(message, tag = "106")]
        ListSessionsResponse(super::ListSessionsResponse),
        #[prost(message, tag = "1000")]
        Notification(super::Notification),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum NotificationType {
    NotifyOnKeystroke = 1,
    NotifyOnScreenUpdate = 2,
    NotifyOnNewSession = 6,
    NotifyOnTerminateSession = 7,
    NotifyOnLayoutChange = 8,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct NotificationRequest {
    #[prost(string, optional, tag = "1")]
    pub session: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(bool, optional, tag = "2")]
    pub subscribe: ::core::option::Option<bool>,
    #[prost(enumeration = "NotificationType", optional, tag = "3")]
    pub notification_type: ::core::option::Option<i32>,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct NotificationResponse {
    #[prost(enumeration = "notification_response::Status", optional, tag = "1")]
    pub status: ::core::option::Option<i32>,
}

pub mod notification_response {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum Status {
        Ok = 0,
        SessionNotFound = 1,
        RequestMalformed = 2,
        NotSubscribed = 3,
        AlreadySubscribed = 4,
    }
}

/// Unsolicited event. Exactly one category field is expected to be set.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Notification {
    #[prost(message, optional, tag = "1")]
    pub keystroke_notification: ::core::option::Option<KeystrokeNotification>,
    #[prost(message, optional, tag = "2")]
    pub screen_update_notification: ::core::option::Option<ScreenUpdateNotification>,
    #[prost(message, optional, tag = "7")]
    pub new_session_notification: ::core::option::Option<NewSessionNotification>,
    #[prost(message, optional, tag = "8")]
    pub terminate_session_notification: ::core::option::Option<TerminateSessionNotification>,
    #[prost(message, optional, tag = "9")]
    pub layout_changed_notification: ::core::option::Option<LayoutChangedNotification>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct KeystrokeNotification {
    #[prost(string, optional, tag = "1")]
    pub characters: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(string, optional, tag = "5")]
    pub session: ::core::option::Option<::prost::alloc::string::String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ScreenUpdateNotification {
    #[prost(string, optional, tag = "1")]
    pub session: ::core::option::Option<::prost::alloc::string::String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct NewSessionNotification {
    #[prost(string, optional, tag = "1")]
    pub session_id: ::core::option::Option<::prost::alloc::string::String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TerminateSessionNotification {
    #[prost(string, optional, tag = "1")]
    pub session_id: ::core::option::Option<::prost::alloc::string::String>,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct LayoutChangedNotification {}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct ListSessionsRequest {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ListSessionsResponse {
    #[prost(message, repeated, tag = "1")]
    pub windows: ::prost::alloc::vec::Vec<list_sessions_response::Window>,
}

pub mod list_sessions_response {
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Window {
        #[prost(message, repeated, tag = "1")]
        pub tabs: ::prost::alloc::vec::Vec<Tab>,
        #[prost(string, optional, tag = "2")]
        pub window_id: ::core::option::Option<::prost::alloc::string::String>,
    }

    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Tab {
        #[prost(string, optional, tag = "2")]
        pub tab_id: ::core::option::Option<::prost::alloc::string::String>,
        #[prost(string, repeated, tag = "4")]
        pub session_ids: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
    }
}

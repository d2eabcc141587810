#![deny(unsafe_code)]

//! Adapters that fulfill the chat boundaries against a Hasura-style
//! GraphQL backend: mutations and queries over HTTP, the live timeline
//! over a `graphql-transport-ws` subscription, and the responder trigger
//! as the backend's action mutation.

pub mod client;
pub mod config;
/// Operation documents and wire row types.
pub mod graphql;
pub mod subscription;

pub use client::{GraphQlChatStore, USER_ID_HEADER};
pub use config::{ConfigError, ConfigResult, DEFAULT_HTTP_URL, DEFAULT_WS_URL, RemoteConfig};
pub use subscription::WS_SUBPROTOCOL;

// Copyright (c) gqlws.dev 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

//! Server side of the `graphql-transport-ws` protocol.
//!
//! This crate provides a tokio-tungstenite-based WebSocket server running
//! GraphQL queries, mutations and subscriptions multiplexed over persistent
//! connections. The protocol core is the per-socket [`Connection`] state
//! machine: it enforces the init handshake and its timeout, dispatches every
//! inbound frame, and tracks active operations, each of which runs as an
//! independent task so no operation can block another.
//!
//! # Message Protocol
//!
//! All messages are JSON-formatted text frames with the following structure:
//!
//! ```json
//! {
//!   "id": "client-chosen-operation-id",
//!   "type": "connection_init|ping|pong|subscribe|complete",
//!   "payload": { ... }
//! }
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//!
//! use gqlws_server::{WsConfig, WsSubsystem};
//!
//! let mut server = WsSubsystem::new(WsConfig::default(), Arc::new(engine));
//! server.start().await?;
//! ```

pub mod config;
pub mod connection;
mod executor;
pub mod handler;
mod operation;
mod reaper;
pub mod subsystem;

pub use config::WsConfig;
pub use connection::{Connection, Outgoing};
pub use handler::handle_connection;
pub use subsystem::{HealthStatus, ServerError, WsSubsystem};

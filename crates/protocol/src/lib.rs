// Copyright (c) gqlws.dev 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

//! Wire message types for the `graphql-transport-ws` protocol.
//!
//! These types define the JSON message format exchanged over the WebSocket:
//! client messages (`connection_init`, `ping`, `pong`, `subscribe`,
//! `complete`) and server messages (`connection_ack`, `ping`, `pong`, `next`,
//! `error`, `complete`), discriminated by the `type` field.
//!
//! Decoding never fails: [`decode`] maps every input, however malformed, to a
//! [`Decoded`] variant, so the transport layer is free of error paths.

pub mod close;
pub mod codec;
pub mod message;

/// The WebSocket subprotocol name negotiated during the handshake.
pub const GRAPHQL_TRANSPORT_WS_PROTOCOL: &str = "graphql-transport-ws";

pub use close::CloseCode;
pub use codec::{decode, Decoded};
pub use message::{ClientMessage, NextPayload, ServerMessage, SubscribePayload};

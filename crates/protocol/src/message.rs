// Copyright (c) gqlws.dev 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

//! Message shapes, client and server side.

use gqlws_api::{ExecutionResult, GraphQLError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A message received from a client.
///
/// Discriminated by the `type` field in JSON:
/// - `"connection_init"` - Handshake request, opens the connection for use
/// - `"ping"` / `"pong"` - Protocol-level keepalive
/// - `"subscribe"` - Start an operation under a client-chosen id
/// - `"complete"` - Stop the operation with the given id
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
	ConnectionInit {
		/// Opaque payload exposed to execution contexts. Decoded as a
		/// raw value; the connection rejects non-mapping payloads.
		#[serde(default, skip_serializing_if = "Option::is_none")]
		payload: Option<Value>,
	},
	Ping {
		#[serde(default, skip_serializing_if = "Option::is_none")]
		payload: Option<Value>,
	},
	Pong {
		#[serde(default, skip_serializing_if = "Option::is_none")]
		payload: Option<Value>,
	},
	Subscribe {
		/// Client-chosen id, unique among currently active operations.
		id: String,
		payload: SubscribePayload,
	},
	Complete {
		id: String,
	},
}

/// The payload of a `subscribe` message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscribePayload {
	pub query: String,
	#[serde(default, rename = "operationName", skip_serializing_if = "Option::is_none")]
	pub operation_name: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub variables: Option<Map<String, Value>>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub extensions: Option<Map<String, Value>>,
}

/// A message sent to a client.
///
/// The server never originates `ping`; keepalive probing is left to the
/// client and to WebSocket-level ping frames.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
	ConnectionAck {
		#[serde(default, skip_serializing_if = "Option::is_none")]
		payload: Option<Map<String, Value>>,
	},
	Pong {
		#[serde(default, skip_serializing_if = "Option::is_none")]
		payload: Option<Value>,
	},
	Next {
		id: String,
		payload: NextPayload,
	},
	Error {
		id: String,
		payload: Vec<GraphQLError>,
	},
	Complete {
		id: String,
	},
}

impl ServerMessage {
	/// Terminal messages end the operation their id names; at most one is
	/// ever delivered per active operation.
	pub fn is_terminal(&self) -> bool {
		matches!(self, ServerMessage::Error { .. } | ServerMessage::Complete { .. })
	}
}

/// The payload of a `next` message.
///
/// `data` is always present on the wire, `null` when execution produced
/// nothing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NextPayload {
	pub data: Option<Value>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub errors: Vec<GraphQLError>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub extensions: Option<Map<String, Value>>,
}

impl From<ExecutionResult> for NextPayload {
	fn from(result: ExecutionResult) -> Self {
		Self {
			data: result.data,
			errors: result.errors,
			extensions: result.extensions,
		}
	}
}

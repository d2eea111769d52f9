// Copyright (c) gqlws.dev 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

//! Decoding of inbound frames into [`ClientMessage`] values.

use serde_json::Value;

use crate::message::ClientMessage;

/// Outcome of decoding one inbound text frame.
///
/// Decoding never fails: every input maps to a variant, and the two
/// non-message variants carry distinct close reasons with the same 4400
/// severity.
#[derive(Debug)]
pub enum Decoded {
	/// A recognized, well-formed client message.
	Message(ClientMessage),
	/// The `type` field named something the protocol does not know.
	UnknownType(String),
	/// Not a JSON object, no string `type` field, or required fields
	/// missing or of the wrong shape.
	Malformed,
}

const CLIENT_TYPES: [&str; 5] = ["connection_init", "ping", "pong", "subscribe", "complete"];

/// Decode one inbound JSON value.
///
/// The `type` tag is inspected first so an unknown tag is reported as such
/// even when the rest of the message would not deserialize.
pub fn decode(value: Value) -> Decoded {
	let Some(tag) = value.get("type").and_then(Value::as_str) else {
		return Decoded::Malformed;
	};
	if !CLIENT_TYPES.contains(&tag) {
		return Decoded::UnknownType(tag.to_string());
	}
	match serde_json::from_value(value) {
		Ok(message) => Decoded::Message(message),
		Err(_) => Decoded::Malformed,
	}
}

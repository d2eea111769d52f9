// Copyright (c) gqlws.dev 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

//! Error types shared between the engine boundary and the wire protocol.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A formatted GraphQL error in the shape delivered to clients.
///
/// This is the standard error object of GraphQL responses: a message plus
/// optional source locations, response path and extensions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphQLError {
	pub message: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub locations: Option<Vec<ErrorLocation>>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub path: Option<Vec<PathSegment>>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub extensions: Option<Map<String, Value>>,
}

impl GraphQLError {
	/// Create an error carrying only a message.
	pub fn new(message: impl Into<String>) -> Self {
		Self {
			message: message.into(),
			locations: None,
			path: None,
			extensions: None,
		}
	}

	/// Attach the response path the error occurred at.
	pub fn with_path(mut self, path: Vec<PathSegment>) -> Self {
		self.path = Some(path);
		self
	}
}

/// A line/column position in the query source, 1-indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorLocation {
	pub line: u32,
	pub column: u32,
}

/// One segment of a response path: a field name or a list index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
	Field(String),
	Index(usize),
}

impl From<&str> for PathSegment {
	fn from(field: &str) -> Self {
		PathSegment::Field(field.to_string())
	}
}

impl From<usize> for PathSegment {
	fn from(index: usize) -> Self {
		PathSegment::Index(index)
	}
}

/// A query document failed to parse.
///
/// The message is surfaced verbatim as the close reason of the connection
/// that submitted the document.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct SyntaxError {
	pub message: String,
}

impl SyntaxError {
	pub fn new(message: impl Into<String>) -> Self {
		Self {
			message: message.into(),
		}
	}
}

/// An unexpected failure escaping the engine boundary.
///
/// Not a structured GraphQL error: engines fold those into
/// [`ExecutionResult::errors`](crate::ExecutionResult). This covers the rest,
/// such as a context factory or a result stream failing outright. The
/// transport wraps it into a single formatted [`GraphQLError`] for the
/// affected operation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct EngineError {
	pub message: String,
}

impl EngineError {
	pub fn new(message: impl Into<String>) -> Self {
		Self {
			message: message.into(),
		}
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	#[test]
	fn formatted_error_skips_absent_fields() {
		let error = GraphQLError::new("boom");
		let value = serde_json::to_value(&error).unwrap();
		assert_eq!(value, json!({"message": "boom"}));
	}

	#[test]
	fn path_segments_serialize_as_plain_values() {
		let error = GraphQLError::new("You are not authorized")
			.with_path(vec!["forbidden".into(), 0usize.into()]);
		let value = serde_json::to_value(&error).unwrap();
		assert_eq!(
			value,
			json!({"message": "You are not authorized", "path": ["forbidden", 0]})
		);
	}

	#[test]
	fn path_segments_deserialize_mixed() {
		let error: GraphQLError =
			serde_json::from_value(json!({"message": "m", "path": ["a", 3, "b"]})).unwrap();
		assert_eq!(
			error.path,
			Some(vec![
				PathSegment::Field("a".to_string()),
				PathSegment::Index(3),
				PathSegment::Field("b".to_string()),
			])
		);
	}
}

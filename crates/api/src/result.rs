// Copyright (c) gqlws.dev 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

//! The result shape produced by the query engine.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::GraphQLError;

/// Result of executing one GraphQL operation, or of one item of a
/// subscription stream.
///
/// `data` is `None` when execution never started (a request error such as a
/// validation failure) and `Some` once the operation ran, even when the value
/// is `Value::Null` or partial. The transport routes the two cases
/// differently, see [`is_request_error`](Self::is_request_error).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub data: Option<Value>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub errors: Vec<GraphQLError>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub extensions: Option<Map<String, Value>>,
}

impl ExecutionResult {
	/// A successful result carrying only data.
	pub fn from_data(data: Value) -> Self {
		Self {
			data: Some(data),
			..Self::default()
		}
	}

	/// A bare errored result: execution never started.
	pub fn from_errors(errors: Vec<GraphQLError>) -> Self {
		Self {
			errors,
			..Self::default()
		}
	}

	pub fn has_errors(&self) -> bool {
		!self.errors.is_empty()
	}

	/// Whether this is a request error: errors were reported and execution
	/// produced no data at all. Field errors keep `data` present (null or
	/// partial) and are not request errors.
	pub fn is_request_error(&self) -> bool {
		self.has_errors() && self.data.is_none()
	}
}

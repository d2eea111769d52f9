// Copyright (c) gqlws.dev 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

//! The engine trait the transport drives.

use std::{fmt, pin::Pin};

use async_trait::async_trait;
use futures_util::Stream;
use serde_json::{Map, Value};

use crate::{
	error::{EngineError, GraphQLError, SyntaxError},
	result::ExecutionResult,
};

/// The opaque payload a client supplies with `connection_init`, exposed to
/// execution contexts.
pub type ConnectionParams = Map<String, Value>;

/// A lazy, possibly unbounded sequence of execution results.
///
/// Dropping the stream is the cleanup path: engines must release whatever
/// the stream holds (event source registrations, transactions) in `Drop`,
/// which also covers forced cancellation of the consuming task.
pub type ResultStream = Pin<Box<dyn Stream<Item = Result<ExecutionResult, EngineError>> + Send>>;

/// The kind of a GraphQL operation, derived from the parsed document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
	Query,
	Mutation,
	Subscription,
}

impl OperationKind {
	pub fn is_subscription(&self) -> bool {
		matches!(self, OperationKind::Subscription)
	}
}

impl fmt::Display for OperationKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			OperationKind::Query => f.write_str("query"),
			OperationKind::Mutation => f.write_str("mutation"),
			OperationKind::Subscription => f.write_str("subscription"),
		}
	}
}

/// One operation as submitted by a client.
#[derive(Debug, Clone)]
pub struct ExecutionRequest {
	pub query: String,
	pub operation_name: Option<String>,
	pub variables: Option<Map<String, Value>>,
	pub extensions: Option<Map<String, Value>>,
}

/// Outcome of starting a streaming operation.
pub enum SubscribeOutcome {
	/// The engine produced a live stream of results.
	Stream(ResultStream),
	/// Execution failed before any stream was produced; the result carries
	/// only errors.
	Failure(ExecutionResult),
}

/// A GraphQL engine as consumed by the transport.
///
/// The transport parses nothing itself: it asks the engine for a document
/// and an operation kind up front (to validate a `subscribe` message), then
/// hands the raw request back to the engine for execution.
#[async_trait]
pub trait QueryEngine: Send + Sync + 'static {
	/// Parsed query document. Only ever passed back to
	/// [`operation_kind`](Self::operation_kind).
	type Document: Send + Sync;

	/// Per-operation execution context.
	type Context: Send;

	/// Parse a query document, or report the syntax error verbatim.
	fn parse(&self, query: &str) -> Result<Self::Document, SyntaxError>;

	/// Resolve the kind of the operation named by `operation_name`, or of
	/// the single anonymous operation. `None` when the document does not
	/// name exactly one resolvable operation.
	fn operation_kind(
		&self,
		document: &Self::Document,
		operation_name: Option<&str>,
	) -> Option<OperationKind>;

	/// Build the execution context for one operation. The connection's init
	/// payload is passed through so resolvers can see it.
	async fn build_context(&self, connection_params: Option<ConnectionParams>) -> Self::Context;

	/// Root value execution starts from.
	async fn root_value(&self) -> Option<Value>;

	/// Execute a query or mutation to a single result.
	async fn execute(
		&self,
		request: ExecutionRequest,
		context: Self::Context,
		root_value: Option<Value>,
	) -> Result<ExecutionResult, EngineError>;

	/// Start a subscription, yielding a result stream or an immediate
	/// failure.
	async fn subscribe(
		&self,
		request: ExecutionRequest,
		context: Self::Context,
		root_value: Option<Value>,
	) -> Result<SubscribeOutcome, EngineError>;

	/// Observe every error batch the transport delivers to a client.
	fn process_errors(&self, errors: &[GraphQLError]) {
		for error in errors {
			tracing::error!("GraphQL request error: {}", error.message);
		}
	}
}

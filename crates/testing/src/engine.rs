// Copyright (c) gqlws.dev 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

//! The stub engine.

use std::{sync::Mutex, time::Duration};

use async_trait::async_trait;
use futures_util::stream;
use gqlws_api::{
	ConnectionParams, EngineError, ExecutionRequest, ExecutionResult, GraphQLError, OperationKind,
	QueryEngine, ResultStream, SubscribeOutcome, SyntaxError,
};
use serde_json::{Value, json};

/// Deterministic [`QueryEngine`] driven entirely by the query text.
///
/// Field catalog:
/// - `hello` - plain data
/// - `connectionParams` - echoes the init payload from the context
/// - `forbidden` - null data with an attached field error
/// - `requestError` - fails before execution starts, errors only
/// - `boom` - an [`EngineError`] from the engine call itself
/// - `echo(message: "..", delay: ms)` - one item, optionally delayed
/// - `count(to: n)` - n items
/// - `never` - a stream that never produces
/// - `errorInStream` - one errored item inside the stream
/// - `streamBoom` - the stream itself fails with an [`EngineError`]
///
/// Every error batch handed to [`process_errors`](QueryEngine::process_errors)
/// is recorded for assertions.
pub struct StubEngine {
	error_batches: Mutex<Vec<Vec<GraphQLError>>>,
}

/// Parse output: the operation header plus the first selected field.
#[derive(Debug)]
pub struct StubDocument {
	kind: OperationKind,
	name: Option<String>,
	field: String,
}

/// Execution context handed to every operation.
pub struct StubContext {
	pub connection_params: Option<ConnectionParams>,
}

impl StubEngine {
	pub fn new() -> Self {
		Self {
			error_batches: Mutex::new(Vec::new()),
		}
	}

	/// Number of error batches reported so far.
	pub fn recorded_error_batches(&self) -> usize {
		self.error_batches.lock().unwrap().len()
	}

	/// Messages of the most recently reported batch.
	pub fn last_error_messages(&self) -> Vec<String> {
		self.error_batches
			.lock()
			.unwrap()
			.last()
			.map(|batch| batch.iter().map(|error| error.message.clone()).collect())
			.unwrap_or_default()
	}

	fn one_shot(&self, query: &str, context: &StubContext) -> Result<ExecutionResult, EngineError> {
		let field = first_field(query);
		match field.as_str() {
			"connectionParams" => {
				let params = match &context.connection_params {
					Some(map) => Value::Object(map.clone()),
					None => Value::Null,
				};
				Ok(ExecutionResult::from_data(json!({"connectionParams": params})))
			}
			"forbidden" => Ok(ExecutionResult {
				data: Some(json!({"forbidden": null})),
				errors: vec![
					GraphQLError::new("You are not authorized")
						.with_path(vec!["forbidden".into()]),
				],
				extensions: None,
			}),
			"requestError" => Ok(ExecutionResult::from_errors(vec![GraphQLError::new(
				"Bad request",
			)])),
			"boom" => Err(EngineError::new("engine exploded")),
			"echo" => {
				let message = string_arg(query, "message").unwrap_or_default();
				Ok(ExecutionResult::from_data(json!({"echo": message})))
			}
			"count" => {
				let to = number_arg(query, "to").unwrap_or(1);
				Ok(ExecutionResult::from_data(json!({"count": to})))
			}
			"hello" => Ok(ExecutionResult::from_data(json!({"hello": "Hello world!"}))),
			other => {
				let mut data = serde_json::Map::new();
				data.insert(other.to_string(), Value::Null);
				Ok(ExecutionResult::from_data(Value::Object(data)))
			}
		}
	}
}

impl Default for StubEngine {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl QueryEngine for StubEngine {
	type Document = StubDocument;
	type Context = StubContext;

	fn parse(&self, query: &str) -> Result<StubDocument, SyntaxError> {
		let open = query.matches('{').count();
		let close = query.matches('}').count();
		if open == 0 || open != close {
			return Err(SyntaxError::new("Syntax Error: Expected Name, found <EOF>."));
		}

		let header = query[..query.find('{').unwrap()].trim();
		let mut words = header.split_whitespace();
		let (kind, name) = match words.next() {
			Some("mutation") => (OperationKind::Mutation, words.next()),
			Some("subscription") => (OperationKind::Subscription, words.next()),
			Some(_) => (OperationKind::Query, words.next()),
			None => (OperationKind::Query, None),
		};

		Ok(StubDocument {
			kind,
			name: name.map(str::to_string),
			field: first_field(query),
		})
	}

	fn operation_kind(
		&self,
		document: &StubDocument,
		operation_name: Option<&str>,
	) -> Option<OperationKind> {
		match operation_name {
			// A requested name must match the document's.
			Some(requested) if document.name.as_deref() != Some(requested) => None,
			_ => Some(document.kind),
		}
	}

	async fn build_context(&self, connection_params: Option<ConnectionParams>) -> StubContext {
		StubContext {
			connection_params,
		}
	}

	async fn root_value(&self) -> Option<Value> {
		None
	}

	async fn execute(
		&self,
		request: ExecutionRequest,
		context: StubContext,
		_root_value: Option<Value>,
	) -> Result<ExecutionResult, EngineError> {
		if first_field(&request.query) == "never" {
			futures_util::future::pending::<()>().await;
		}
		if let Some(delay) = number_arg(&request.query, "delay") {
			tokio::time::sleep(Duration::from_millis(delay)).await;
		}
		self.one_shot(&request.query, &context)
	}

	async fn subscribe(
		&self,
		request: ExecutionRequest,
		context: StubContext,
		_root_value: Option<Value>,
	) -> Result<SubscribeOutcome, EngineError> {
		let query = request.query;
		let stream: ResultStream = match first_field(&query).as_str() {
			"never" => Box::pin(stream::pending()),
			"count" => {
				let to = number_arg(&query, "to").unwrap_or(1);
				Box::pin(stream::iter((1..=to).map(|count| {
					Ok(ExecutionResult::from_data(json!({ "count": count })))
				})))
			}
			"errorInStream" => Box::pin(stream::iter([Ok(ExecutionResult {
				data: Some(Value::Null),
				errors: vec![GraphQLError::new("stream failed")],
				extensions: None,
			})])),
			"streamBoom" => {
				Box::pin(stream::iter([Err(EngineError::new("stream exploded"))]))
			}
			"requestError" => {
				return Ok(SubscribeOutcome::Failure(ExecutionResult::from_errors(vec![
					GraphQLError::new("Bad request"),
				])));
			}
			"boom" => return Err(EngineError::new("engine exploded")),
			_ => {
				let delay = number_arg(&query, "delay");
				let result = self.one_shot(&query, &context)?;
				Box::pin(stream::once(async move {
					if let Some(delay) = delay {
						tokio::time::sleep(Duration::from_millis(delay)).await;
					}
					Ok(result)
				}))
			}
		};
		Ok(SubscribeOutcome::Stream(stream))
	}

	fn process_errors(&self, errors: &[GraphQLError]) {
		self.error_batches.lock().unwrap().push(errors.to_vec());
	}
}

// First identifier after the opening brace.
fn first_field(query: &str) -> String {
	let Some(open) = query.find('{') else {
		return String::new();
	};
	query[open + 1..]
		.trim_start()
		.chars()
		.take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
		.collect()
}

fn string_arg(query: &str, name: &str) -> Option<String> {
	let rest = &query[query.find(&format!("{name}:"))? + name.len() + 1..];
	let start = rest.find('"')? + 1;
	let end = start + rest[start..].find('"')?;
	Some(rest[start..end].to_string())
}

fn number_arg(query: &str, name: &str) -> Option<u64> {
	let rest = query[query.find(&format!("{name}:"))? + name.len() + 1..].trim_start();
	let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
	digits.parse().ok()
}

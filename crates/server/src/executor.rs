// Copyright (c) gqlws.dev 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

//! The task driving one operation from start to its terminal message.

use std::sync::Arc;

use futures_util::{StreamExt, stream};
use gqlws_api::{
	ConnectionParams, EngineError, ExecutionRequest, GraphQLError, QueryEngine, ResultStream,
	SubscribeOutcome,
};
use gqlws_protocol::ServerMessage;

use crate::operation::Operation;

/// Drive one registered operation to completion.
///
/// Runs as an independent task so a slow or long-lived operation never
/// blocks other traffic on the connection. Cancellation (a client
/// `complete` or connection teardown) aborts the task; dropping the result
/// stream runs the engine's cleanup, and no further message is sent.
pub(crate) async fn run_operation<E: QueryEngine>(
	engine: Arc<E>,
	mut operation: Operation,
	request: ExecutionRequest,
	connection_params: Option<ConnectionParams>,
) {
	if let Err(error) = drive(engine.as_ref(), &mut operation, request, connection_params).await {
		// A failure escaping the engine boundary is not a structured
		// GraphQL error yet; it reaches the client as a single
		// formatted error.
		tracing::warn!("operation {} failed at the engine boundary: {error}", operation.id());
		let errors = vec![GraphQLError::new(error.to_string())];
		engine.process_errors(&errors);
		let id = operation.id().to_string();
		operation.send(ServerMessage::Error {
			id,
			payload: errors,
		})
		.await;
	}
}

async fn drive<E: QueryEngine>(
	engine: &E,
	operation: &mut Operation,
	request: ExecutionRequest,
	connection_params: Option<ConnectionParams>,
) -> Result<(), EngineError> {
	let context = engine.build_context(connection_params).await;
	let root_value = engine.root_value().await;

	let mut source: ResultStream = if operation.kind().is_subscription() {
		match engine.subscribe(request, context, root_value).await? {
			SubscribeOutcome::Stream(stream) => stream,
			SubscribeOutcome::Failure(result) => {
				// Execution never started; the result carries only
				// errors.
				engine.process_errors(&result.errors);
				let id = operation.id().to_string();
				operation.send(ServerMessage::Error {
					id,
					payload: result.errors,
				})
				.await;
				return Ok(());
			}
		}
	} else {
		let result = engine.execute(request, context, root_value).await?;
		if result.is_request_error() {
			engine.process_errors(&result.errors);
			let id = operation.id().to_string();
			operation.send(ServerMessage::Error {
				id,
				payload: result.errors,
			})
			.await;
			return Ok(());
		}
		// Single results share the streaming path below.
		Box::pin(stream::iter([Ok(result)]))
	};

	while let Some(item) = source.next().await {
		let result = item?;
		if result.has_errors() {
			engine.process_errors(&result.errors);
			if operation.kind().is_subscription() {
				// Subscriptions terminate on the first errored
				// item; dropping the stream releases its
				// resources.
				let id = operation.id().to_string();
				operation.send(ServerMessage::Error {
					id,
					payload: result.errors,
				})
				.await;
				return Ok(());
			}
			// Single-result operations keep field errors embedded in
			// the item itself.
		}
		let id = operation.id().to_string();
		operation.send(ServerMessage::Next {
			id,
			payload: result.into(),
		})
		.await;
	}

	let id = operation.id().to_string();
	operation.send(ServerMessage::Complete {
		id,
	})
	.await;
	Ok(())
}

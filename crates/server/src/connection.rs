// Copyright (c) gqlws.dev 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

//! The per-socket protocol state machine.
//!
//! One `Connection` exists per accepted WebSocket. It owns the connection
//! lifecycle (init, ack, init-timeout), dispatches every inbound frame to a
//! handler, and tracks the active operations. Operations run as independent
//! tasks; the dispatch path never awaits one, so a slow operation cannot
//! delay other traffic on the same socket.
//!
//! The machine is transport-independent: everything it emits goes through an
//! [`Outgoing`] channel, which the WebSocket handler drains into the socket
//! and tests drain directly.

use std::{
	sync::{
		Arc, RwLock,
		atomic::{AtomicBool, AtomicU64, Ordering},
	},
	time::Duration,
};

use dashmap::{DashMap, mapref::entry::Entry};
use gqlws_api::{ConnectionParams, ExecutionRequest, QueryEngine};
use gqlws_protocol::{ClientMessage, CloseCode, Decoded, ServerMessage, SubscribePayload, decode};
use serde_json::Value;
use tokio::{sync::mpsc, task::AbortHandle};

use crate::{
	config::WsConfig,
	executor,
	operation::{Operation, OperationHandle},
	reaper::TaskReaper,
};

/// A frame bound for the transport.
#[derive(Debug)]
pub enum Outgoing {
	/// A protocol message, JSON-encoded into a text frame.
	Message(ServerMessage),
	/// A WebSocket-level pong replying to a transport-level ping.
	Pong(Vec<u8>),
	/// Close the socket with a code and reason; nothing follows.
	Close {
		code: u16,
		reason: String,
	},
}

/// State shared between the dispatch flow and the operation executors.
pub(crate) struct Shared {
	pub(crate) init_received: AtomicBool,
	pub(crate) acknowledged: AtomicBool,
	pub(crate) timed_out: AtomicBool,
	pub(crate) connection_params: RwLock<Option<ConnectionParams>>,
	/// Active operations by client-supplied id. An entry is removed the
	/// instant its operation turns terminal, freeing the id for reuse.
	pub(crate) operations: DashMap<String, OperationHandle>,
	pub(crate) out_tx: mpsc::Sender<Outgoing>,
	next_token: AtomicU64,
}

impl Shared {
	pub(crate) fn new(out_tx: mpsc::Sender<Outgoing>) -> Self {
		Self {
			init_received: AtomicBool::new(false),
			acknowledged: AtomicBool::new(false),
			timed_out: AtomicBool::new(false),
			connection_params: RwLock::new(None),
			operations: DashMap::new(),
			out_tx,
			next_token: AtomicU64::new(0),
		}
	}
}

/// The state machine for one WebSocket connection.
pub struct Connection<E: QueryEngine> {
	engine: Arc<E>,
	init_timeout: Duration,
	shared: Arc<Shared>,
	reaper: TaskReaper,
	init_deadline: Option<AbortHandle>,
}

impl<E: QueryEngine> Connection<E> {
	pub fn new(engine: Arc<E>, config: &WsConfig, out_tx: mpsc::Sender<Outgoing>) -> Self {
		Self {
			engine,
			init_timeout: config.connection_init_wait_timeout,
			shared: Arc::new(Shared::new(out_tx)),
			reaper: TaskReaper::new(),
			init_deadline: None,
		}
	}

	/// Whether the init handshake has completed.
	pub fn acknowledged(&self) -> bool {
		self.shared.acknowledged.load(Ordering::SeqCst)
	}

	/// Number of currently active operations.
	pub fn active_operations(&self) -> usize {
		self.shared.operations.len()
	}

	/// Start the one-shot init deadline. Called once the WebSocket accept
	/// response has been sent; expiry closes the socket with 4408.
	pub fn arm_init_deadline(&mut self) {
		let shared = self.shared.clone();
		let timeout = self.init_timeout;
		let deadline = self.reaper.spawn(async move {
			tokio::time::sleep(timeout).await;
			if shared.init_received.load(Ordering::SeqCst) {
				return;
			}
			shared.timed_out.store(true, Ordering::SeqCst);
			let _ = shared
				.out_tx
				.send(Outgoing::Close {
					code: CloseCode::InitTimeout.as_u16(),
					reason: "Connection initialisation timeout".to_string(),
				})
				.await;
		});
		self.init_deadline = Some(deadline);
	}

	/// Handle one inbound text frame.
	pub async fn handle_text(&mut self, text: &str) {
		match serde_json::from_str::<Value>(text) {
			Ok(value) => self.dispatch(decode(value)).await,
			Err(_) => {
				self.close(CloseCode::InvalidMessage, "WebSocket message type must be text")
					.await
			}
		}
		self.reaper.reap_finished();
	}

	/// Handle one inbound binary frame, which the protocol forbids.
	pub async fn handle_binary(&mut self) {
		self.close(CloseCode::InvalidMessage, "WebSocket message type must be text").await;
		self.reaper.reap_finished();
	}

	/// Tear the connection down: stop the deadline timer, cancel every
	/// active operation and drain their tasks.
	pub async fn shutdown(&mut self) {
		if let Some(deadline) = self.init_deadline.take() {
			deadline.abort();
		}
		self.reaper.shutdown().await;
		self.shared.operations.clear();
	}

	async fn dispatch(&mut self, decoded: Decoded) {
		match decoded {
			Decoded::Message(ClientMessage::ConnectionInit {
				payload,
			}) => self.handle_connection_init(payload).await,
			Decoded::Message(ClientMessage::Ping {
				..
			}) => self.handle_ping().await,
			// Keepalive acknowledgment only.
			Decoded::Message(ClientMessage::Pong {
				..
			}) => {}
			Decoded::Message(ClientMessage::Subscribe {
				id,
				payload,
			}) => self.handle_subscribe(id, payload).await,
			Decoded::Message(ClientMessage::Complete {
				id,
			}) => self.handle_complete(&id),
			Decoded::UnknownType(tag) => {
				self.close(CloseCode::InvalidMessage, format!("Unknown message type: {tag}"))
					.await
			}
			Decoded::Malformed => {
				self.close(CloseCode::InvalidMessage, "Failed to parse message").await
			}
		}
	}

	async fn handle_connection_init(&mut self, payload: Option<Value>) {
		if self.shared.timed_out.load(Ordering::SeqCst) {
			// The deadline already closed the socket.
			return;
		}
		if let Some(deadline) = self.init_deadline.take() {
			deadline.abort();
		}

		let params = match payload {
			None | Some(Value::Null) => None,
			Some(Value::Object(map)) => Some(map),
			Some(_) => {
				self.close(CloseCode::InvalidMessage, "Invalid connection init payload")
					.await;
				return;
			}
		};

		if self.shared.init_received.swap(true, Ordering::SeqCst) {
			self.close(CloseCode::TooManyInitRequests, "Too many initialisation requests")
				.await;
			return;
		}

		*self.shared.connection_params.write().unwrap() = params;
		self.send(ServerMessage::ConnectionAck {
			payload: None,
		})
		.await;
		self.shared.acknowledged.store(true, Ordering::SeqCst);
	}

	async fn handle_ping(&mut self) {
		// Always answered, acknowledged or not.
		self.send(ServerMessage::Pong {
			payload: None,
		})
		.await;
	}

	async fn handle_subscribe(&mut self, id: String, payload: SubscribePayload) {
		if !self.shared.acknowledged.load(Ordering::SeqCst) {
			self.close(CloseCode::Unauthorized, "Unauthorized").await;
			return;
		}

		let document = match self.engine.parse(&payload.query) {
			Ok(document) => document,
			Err(error) => {
				self.close(CloseCode::InvalidMessage, error.message).await;
				return;
			}
		};

		let Some(kind) = self.engine.operation_kind(&document, payload.operation_name.as_deref())
		else {
			self.close(CloseCode::InvalidMessage, "Can't get GraphQL operation type").await;
			return;
		};

		let request = ExecutionRequest {
			query: payload.query,
			operation_name: payload.operation_name,
			variables: payload.variables,
			extensions: payload.extensions,
		};
		let connection_params = self.shared.connection_params.read().unwrap().clone();

		// The duplicate check and the registration are one atomic step:
		// the entry guard is held across the spawn, so the executor can
		// never observe the registry without its own entry in it.
		let registered = match self.shared.operations.entry(id.clone()) {
			Entry::Occupied(_) => false,
			Entry::Vacant(vacant) => {
				let token = self.shared.next_token.fetch_add(1, Ordering::Relaxed);
				let operation =
					Operation::new(id.clone(), kind, token, self.shared.clone());
				let abort = self.reaper.spawn(executor::run_operation(
					self.engine.clone(),
					operation,
					request,
					connection_params,
				));
				vacant.insert(OperationHandle {
					kind,
					token,
					abort,
				});
				true
			}
		};

		if !registered {
			self.close(
				CloseCode::SubscriberAlreadyExists,
				format!("Subscriber for {id} already exists"),
			)
			.await;
		}
	}

	fn handle_complete(&mut self, id: &str) {
		// Unknown ids are the normal race of a terminal message crossing
		// a client complete. The executor is only signalled, never
		// awaited; its cleanup runs on its own schedule.
		if let Some((_, handle)) = self.shared.operations.remove(id) {
			handle.abort.abort();
		}
	}

	async fn send(&self, message: ServerMessage) {
		let _ = self.shared.out_tx.send(Outgoing::Message(message)).await;
	}

	async fn close(&self, code: CloseCode, reason: impl Into<String>) {
		let _ = self
			.shared
			.out_tx
			.send(Outgoing::Close {
				code: code.as_u16(),
				reason: reason.into(),
			})
			.await;
	}
}

#[cfg(test)]
mod tests {
	use gqlws_api::GraphQLError;
	use gqlws_protocol::NextPayload;
	use gqlws_testing::StubEngine;
	use serde_json::json;
	use tokio::time::timeout;

	use super::*;

	fn connection() -> (Connection<StubEngine>, mpsc::Receiver<Outgoing>) {
		connection_with_engine(Arc::new(StubEngine::new()))
	}

	fn connection_with_engine(
		engine: Arc<StubEngine>,
	) -> (Connection<StubEngine>, mpsc::Receiver<Outgoing>) {
		let (out_tx, out_rx) = mpsc::channel(64);
		(Connection::new(engine, &WsConfig::default(), out_tx), out_rx)
	}

	fn connection_with_timeout(
		init_timeout: Duration,
	) -> (Connection<StubEngine>, mpsc::Receiver<Outgoing>) {
		let config = WsConfig {
			connection_init_wait_timeout: init_timeout,
			..WsConfig::default()
		};
		let (out_tx, out_rx) = mpsc::channel(64);
		(Connection::new(Arc::new(StubEngine::new()), &config, out_tx), out_rx)
	}

	async fn send(connection: &mut Connection<StubEngine>, value: Value) {
		connection.handle_text(&value.to_string()).await;
	}

	async fn recv(out_rx: &mut mpsc::Receiver<Outgoing>) -> Outgoing {
		timeout(Duration::from_secs(5), out_rx.recv())
			.await
			.expect("no outgoing frame within 5s")
			.expect("outgoing channel closed")
	}

	async fn recv_nothing(out_rx: &mut mpsc::Receiver<Outgoing>) {
		for _ in 0..50 {
			tokio::task::yield_now().await;
		}
		if let Ok(outgoing) = out_rx.try_recv() {
			panic!("expected no outgoing frame, got {outgoing:?}");
		}
	}

	async fn init(connection: &mut Connection<StubEngine>, out_rx: &mut mpsc::Receiver<Outgoing>) {
		send(connection, json!({"type": "connection_init"})).await;
		match recv(out_rx).await {
			Outgoing::Message(ServerMessage::ConnectionAck {
				..
			}) => {}
			other => panic!("expected connection_ack, got {other:?}"),
		}
	}

	fn subscribe(id: &str, query: &str) -> Value {
		json!({"type": "subscribe", "id": id, "payload": {"query": query}})
	}

	fn as_close(outgoing: Outgoing) -> (u16, String) {
		match outgoing {
			Outgoing::Close {
				code,
				reason,
			} => (code, reason),
			other => panic!("expected close, got {other:?}"),
		}
	}

	fn as_next(outgoing: Outgoing) -> (String, NextPayload) {
		match outgoing {
			Outgoing::Message(ServerMessage::Next {
				id,
				payload,
			}) => (id, payload),
			other => panic!("expected next, got {other:?}"),
		}
	}

	fn as_error(outgoing: Outgoing) -> (String, Vec<GraphQLError>) {
		match outgoing {
			Outgoing::Message(ServerMessage::Error {
				id,
				payload,
			}) => (id, payload),
			other => panic!("expected error, got {other:?}"),
		}
	}

	fn as_complete(outgoing: Outgoing) -> String {
		match outgoing {
			Outgoing::Message(ServerMessage::Complete {
				id,
			}) => id,
			other => panic!("expected complete, got {other:?}"),
		}
	}

	#[tokio::test]
	async fn init_is_acknowledged_once() {
		let (mut connection, mut out_rx) = connection();
		init(&mut connection, &mut out_rx).await;
		assert!(connection.acknowledged());
	}

	#[tokio::test]
	async fn repeated_init_closes_4429() {
		let (mut connection, mut out_rx) = connection();
		init(&mut connection, &mut out_rx).await;
		send(&mut connection, json!({"type": "connection_init"})).await;
		assert_eq!(
			as_close(recv(&mut out_rx).await),
			(4429, "Too many initialisation requests".to_string())
		);
	}

	#[tokio::test]
	async fn non_mapping_init_payload_closes_4400() {
		let (mut connection, mut out_rx) = connection();
		send(&mut connection, json!({"type": "connection_init", "payload": 42})).await;
		assert_eq!(
			as_close(recv(&mut out_rx).await),
			(4400, "Invalid connection init payload".to_string())
		);
	}

	#[tokio::test]
	async fn null_init_payload_is_accepted() {
		let (mut connection, mut out_rx) = connection();
		send(&mut connection, json!({"type": "connection_init", "payload": null})).await;
		assert!(matches!(
			recv(&mut out_rx).await,
			Outgoing::Message(ServerMessage::ConnectionAck { .. })
		));
	}

	#[tokio::test]
	async fn ping_answers_pong_before_ack() {
		let (mut connection, mut out_rx) = connection();
		send(&mut connection, json!({"type": "ping"})).await;
		assert!(matches!(
			recv(&mut out_rx).await,
			Outgoing::Message(ServerMessage::Pong { .. })
		));
	}

	#[tokio::test]
	async fn pong_is_a_no_op() {
		let (mut connection, mut out_rx) = connection();
		send(&mut connection, json!({"type": "pong"})).await;
		recv_nothing(&mut out_rx).await;
	}

	#[tokio::test]
	async fn subscribe_before_ack_closes_4401() {
		let (mut connection, mut out_rx) = connection();
		send(&mut connection, subscribe("1", "query { hello }")).await;
		assert_eq!(as_close(recv(&mut out_rx).await), (4401, "Unauthorized".to_string()));
	}

	#[tokio::test]
	async fn unknown_message_type_closes_with_the_tag() {
		let (mut connection, mut out_rx) = connection();
		send(&mut connection, json!({"type": "start", "id": "1"})).await;
		assert_eq!(
			as_close(recv(&mut out_rx).await),
			(4400, "Unknown message type: start".to_string())
		);
	}

	#[tokio::test]
	async fn malformed_message_closes_4400() {
		let (mut connection, mut out_rx) = connection();
		send(&mut connection, json!({"type": "subscribe", "id": "1"})).await;
		assert_eq!(as_close(recv(&mut out_rx).await), (4400, "Failed to parse message".to_string()));
	}

	#[tokio::test]
	async fn non_json_text_closes_4400() {
		let (mut connection, mut out_rx) = connection();
		connection.handle_text("definitely not json").await;
		assert_eq!(
			as_close(recv(&mut out_rx).await),
			(4400, "WebSocket message type must be text".to_string())
		);
	}

	#[tokio::test]
	async fn binary_frame_closes_4400() {
		let (mut connection, mut out_rx) = connection();
		connection.handle_binary().await;
		assert_eq!(
			as_close(recv(&mut out_rx).await),
			(4400, "WebSocket message type must be text".to_string())
		);
	}

	#[tokio::test(start_paused = true)]
	async fn missing_init_times_out_with_4408() {
		let (mut connection, mut out_rx) = connection_with_timeout(Duration::from_secs(1));
		connection.arm_init_deadline();
		assert_eq!(
			as_close(recv(&mut out_rx).await),
			(4408, "Connection initialisation timeout".to_string())
		);
		// Init after the deadline fired is ignored outright.
		send(&mut connection, json!({"type": "connection_init"})).await;
		recv_nothing(&mut out_rx).await;
	}

	#[tokio::test(start_paused = true)]
	async fn timely_init_cancels_the_deadline() {
		let (mut connection, mut out_rx) = connection_with_timeout(Duration::from_secs(1));
		connection.arm_init_deadline();
		init(&mut connection, &mut out_rx).await;
		tokio::time::advance(Duration::from_secs(120)).await;
		recv_nothing(&mut out_rx).await;
	}

	#[tokio::test]
	async fn subscription_streams_next_then_complete() {
		let (mut connection, mut out_rx) = connection();
		init(&mut connection, &mut out_rx).await;
		send(&mut connection, subscribe("1", r#"subscription { echo(message: "Hi") }"#)).await;

		let (id, payload) = as_next(recv(&mut out_rx).await);
		assert_eq!(id, "1");
		assert_eq!(payload.data, Some(json!({"echo": "Hi"})));
		assert!(payload.errors.is_empty());
		assert_eq!(as_complete(recv(&mut out_rx).await), "1");
		assert_eq!(connection.active_operations(), 0);
	}

	#[tokio::test]
	async fn subscription_items_arrive_in_order() {
		let (mut connection, mut out_rx) = connection();
		init(&mut connection, &mut out_rx).await;
		send(&mut connection, subscribe("1", "subscription { count(to: 3) }")).await;

		for expected in 1..=3 {
			let (_, payload) = as_next(recv(&mut out_rx).await);
			assert_eq!(payload.data, Some(json!({"count": expected})));
		}
		assert_eq!(as_complete(recv(&mut out_rx).await), "1");
	}

	#[tokio::test]
	async fn syntax_error_closes_4400_with_the_parser_message() {
		let (mut connection, mut out_rx) = connection();
		init(&mut connection, &mut out_rx).await;
		send(&mut connection, subscribe("1", "subscription { INVALID")).await;

		let (code, reason) = as_close(recv(&mut out_rx).await);
		assert_eq!(code, 4400);
		assert!(reason.starts_with("Syntax Error"), "unexpected reason: {reason}");
	}

	#[tokio::test]
	async fn unresolvable_operation_closes_4400() {
		let (mut connection, mut out_rx) = connection();
		init(&mut connection, &mut out_rx).await;
		send(
			&mut connection,
			json!({
				"type": "subscribe",
				"id": "1",
				"payload": {"query": "query Known { hello }", "operationName": "Missing"}
			}),
		)
		.await;
		assert_eq!(
			as_close(recv(&mut out_rx).await),
			(4400, "Can't get GraphQL operation type".to_string())
		);
	}

	#[tokio::test]
	async fn duplicate_id_closes_4409() {
		let (mut connection, mut out_rx) = connection();
		init(&mut connection, &mut out_rx).await;
		send(&mut connection, subscribe("1", "subscription { never }")).await;
		// A different operation kind shares the same id namespace.
		send(&mut connection, subscribe("1", "query { hello }")).await;
		assert_eq!(
			as_close(recv(&mut out_rx).await),
			(4409, "Subscriber for 1 already exists".to_string())
		);
	}

	#[tokio::test]
	async fn error_is_never_followed_by_another_message() {
		let (mut connection, mut out_rx) = connection();
		init(&mut connection, &mut out_rx).await;
		send(&mut connection, subscribe("1", "subscription { errorInStream }")).await;

		let (id, errors) = as_error(recv(&mut out_rx).await);
		assert_eq!(id, "1");
		assert!(!errors.is_empty());
		recv_nothing(&mut out_rx).await;
		assert_eq!(connection.active_operations(), 0);
	}

	#[tokio::test]
	async fn field_errors_are_embedded_in_next_for_queries() {
		let (mut connection, mut out_rx) = connection();
		init(&mut connection, &mut out_rx).await;
		send(&mut connection, subscribe("1", "query { forbidden }")).await;

		let (id, payload) = as_next(recv(&mut out_rx).await);
		assert_eq!(id, "1");
		assert_eq!(payload.data, Some(json!({"forbidden": null})));
		assert_eq!(payload.errors.len(), 1);
		assert_eq!(payload.errors[0].message, "You are not authorized");
		assert_eq!(as_complete(recv(&mut out_rx).await), "1");
	}

	#[tokio::test]
	async fn request_error_yields_a_terminal_error() {
		let engine = Arc::new(StubEngine::new());
		let (mut connection, mut out_rx) = connection_with_engine(engine.clone());
		init(&mut connection, &mut out_rx).await;
		send(&mut connection, subscribe("1", "query { requestError }")).await;

		let (id, errors) = as_error(recv(&mut out_rx).await);
		assert_eq!(id, "1");
		assert!(!errors.is_empty());
		recv_nothing(&mut out_rx).await;
		assert_eq!(engine.recorded_error_batches(), 1);
	}

	#[tokio::test]
	async fn engine_failure_is_wrapped_into_a_single_error() {
		let (mut connection, mut out_rx) = connection();
		init(&mut connection, &mut out_rx).await;
		send(&mut connection, subscribe("1", "query { boom }")).await;

		let (id, errors) = as_error(recv(&mut out_rx).await);
		assert_eq!(id, "1");
		assert_eq!(errors.len(), 1);
		assert_eq!(errors[0].message, "engine exploded");
		recv_nothing(&mut out_rx).await;
	}

	#[tokio::test]
	async fn mid_stream_engine_failure_terminates_with_error() {
		let (mut connection, mut out_rx) = connection();
		init(&mut connection, &mut out_rx).await;
		send(&mut connection, subscribe("1", "subscription { streamBoom }")).await;

		let (id, errors) = as_error(recv(&mut out_rx).await);
		assert_eq!(id, "1");
		assert_eq!(errors.len(), 1);
		assert_eq!(errors[0].message, "stream exploded");
		recv_nothing(&mut out_rx).await;
	}

	#[tokio::test]
	async fn fast_operation_overtakes_a_slow_one() {
		let (mut connection, mut out_rx) = connection();
		init(&mut connection, &mut out_rx).await;
		// Submitted first, delivers last.
		send(&mut connection, subscribe("slow", r#"subscription { echo(message: "s", delay: 200) }"#))
			.await;
		send(&mut connection, subscribe("fast", r#"subscription { echo(message: "f") }"#)).await;

		let (id, payload) = as_next(recv(&mut out_rx).await);
		assert_eq!(id, "fast");
		assert_eq!(payload.data, Some(json!({"echo": "f"})));
		assert_eq!(as_complete(recv(&mut out_rx).await), "fast");

		let (id, payload) = as_next(recv(&mut out_rx).await);
		assert_eq!(id, "slow");
		assert_eq!(payload.data, Some(json!({"echo": "s"})));
		assert_eq!(as_complete(recv(&mut out_rx).await), "slow");
	}

	#[tokio::test]
	async fn complete_cancels_and_frees_the_id() {
		let (mut connection, mut out_rx) = connection();
		init(&mut connection, &mut out_rx).await;
		send(&mut connection, subscribe("1", "subscription { never }")).await;
		assert_eq!(connection.active_operations(), 1);

		send(&mut connection, json!({"type": "complete", "id": "1"})).await;
		// Forced cancellation sends nothing for the old cycle.
		send(&mut connection, subscribe("1", r#"subscription { echo(message: "Hi") }"#)).await;

		let (id, payload) = as_next(recv(&mut out_rx).await);
		assert_eq!(id, "1");
		assert_eq!(payload.data, Some(json!({"echo": "Hi"})));
		assert_eq!(as_complete(recv(&mut out_rx).await), "1");
	}

	#[tokio::test]
	async fn serial_reuse_of_an_id_yields_one_terminal_message_per_cycle() {
		let (mut connection, mut out_rx) = connection();
		init(&mut connection, &mut out_rx).await;
		for _ in 0..3 {
			send(&mut connection, subscribe("1", "query { hello }")).await;
			let (id, _) = as_next(recv(&mut out_rx).await);
			assert_eq!(id, "1");
			assert_eq!(as_complete(recv(&mut out_rx).await), "1");
		}
		recv_nothing(&mut out_rx).await;
	}

	#[tokio::test]
	async fn complete_for_an_unknown_id_is_ignored() {
		let (mut connection, mut out_rx) = connection();
		init(&mut connection, &mut out_rx).await;
		send(&mut connection, json!({"type": "complete", "id": "ghost"})).await;
		recv_nothing(&mut out_rx).await;
	}

	#[tokio::test]
	async fn connection_params_reach_the_execution_context() {
		let (mut connection, mut out_rx) = connection();
		send(&mut connection, json!({"type": "connection_init", "payload": {"user": "ada"}}))
			.await;
		assert!(matches!(
			recv(&mut out_rx).await,
			Outgoing::Message(ServerMessage::ConnectionAck { .. })
		));

		send(&mut connection, subscribe("1", "query { connectionParams }")).await;
		let (_, payload) = as_next(recv(&mut out_rx).await);
		assert_eq!(payload.data, Some(json!({"connectionParams": {"user": "ada"}})));
		assert_eq!(as_complete(recv(&mut out_rx).await), "1");
	}

	#[tokio::test]
	async fn shutdown_cancels_active_operations() {
		let (mut connection, mut out_rx) = connection();
		init(&mut connection, &mut out_rx).await;
		send(&mut connection, subscribe("1", "subscription { never }")).await;
		send(&mut connection, subscribe("2", "subscription { never }")).await;
		assert_eq!(connection.active_operations(), 2);

		connection.shutdown().await;
		assert_eq!(connection.active_operations(), 0);
		recv_nothing(&mut out_rx).await;
	}
}

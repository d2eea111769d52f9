// Copyright (c) gqlws.dev 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

//! WebSocket transport binding for the connection state machine.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use gqlws_api::QueryEngine;
use gqlws_protocol::GRAPHQL_TRANSPORT_WS_PROTOCOL;
use tokio::{
	net::TcpStream,
	sync::{mpsc, watch},
};
use tokio_tungstenite::{
	accept_hdr_async,
	tungstenite::{
		Message,
		handshake::server::{ErrorResponse, Request, Response},
		http::HeaderValue,
		protocol::CloseFrame,
	},
};

use crate::{
	config::WsConfig,
	connection::{Connection, Outgoing},
};

/// Serve one accepted TCP stream for its whole life.
///
/// Performs the WebSocket handshake (echoing the `graphql-transport-ws`
/// subprotocol when offered), then splits the socket: a dedicated writer
/// task drains the connection's outbound channel, and this task reads
/// inbound frames into the state machine until the socket closes or the
/// server shuts down. A stalled client exerts backpressure on operation
/// executors through the channel, never on the read loop's dispatch.
pub async fn handle_connection<E: QueryEngine>(
	stream: TcpStream,
	engine: Arc<E>,
	config: WsConfig,
	mut shutdown_rx: watch::Receiver<bool>,
) {
	let ws = match accept_hdr_async(stream, negotiate_subprotocol).await {
		Ok(ws) => ws,
		Err(error) => {
			tracing::debug!("WebSocket handshake failed: {error}");
			return;
		}
	};
	let (mut write, mut read) = ws.split();

	let (out_tx, mut out_rx) = mpsc::channel::<Outgoing>(64);

	let writer = tokio::spawn(async move {
		while let Some(outgoing) = out_rx.recv().await {
			match outgoing {
				Outgoing::Message(message) => {
					if let Ok(json) = serde_json::to_string(&message) {
						if write.send(Message::Text(json.into())).await.is_err() {
							break;
						}
					}
				}
				Outgoing::Pong(payload) => {
					if write.send(Message::Pong(payload.into())).await.is_err() {
						break;
					}
				}
				// Nothing follows a close; the writer winds down with
				// the frame on the wire.
				Outgoing::Close {
					code,
					reason,
				} => {
					let frame = CloseFrame {
						code: code.into(),
						reason: reason.into(),
					};
					let _ = write.send(Message::Close(Some(frame))).await;
					break;
				}
			}
		}
	});

	let mut connection = Connection::new(engine, &config, out_tx.clone());
	connection.arm_init_deadline();

	loop {
		tokio::select! {
			changed = shutdown_rx.changed() => {
				if changed.is_err() || *shutdown_rx.borrow() {
					let _ = out_tx
						.send(Outgoing::Close {
							code: 1001,
							reason: "Going away".to_string(),
						})
						.await;
					break;
				}
			}

			frame = read.next() => {
				match frame {
					Some(Ok(Message::Text(text))) => connection.handle_text(text.as_str()).await,
					Some(Ok(Message::Binary(_))) => connection.handle_binary().await,
					Some(Ok(Message::Ping(payload))) => {
						let _ = out_tx.send(Outgoing::Pong(payload.to_vec())).await;
					}
					Some(Ok(Message::Close(_))) | None => break,
					Some(Ok(_)) => {}
					Some(Err(error)) => {
						tracing::debug!("WebSocket read failed: {error}");
						break;
					}
				}
			}
		}
	}

	connection.shutdown().await;
	// Releasing the last senders ends the writer once its queue drains.
	drop(connection);
	drop(out_tx);
	let _ = writer.await;
}

// Echo the graphql-transport-ws subprotocol when the client offers it.
// Clients that offer nothing are accepted; rejecting them is a routing
// concern of the host.
fn negotiate_subprotocol(
	request: &Request,
	mut response: Response,
) -> Result<Response, ErrorResponse> {
	let offered = request
		.headers()
		.get("Sec-WebSocket-Protocol")
		.and_then(|value| value.to_str().ok())
		.is_some_and(|value| {
			value.split(',').any(|protocol| protocol.trim() == GRAPHQL_TRANSPORT_WS_PROTOCOL)
		});
	if offered {
		response.headers_mut().insert(
			"Sec-WebSocket-Protocol",
			HeaderValue::from_static(GRAPHQL_TRANSPORT_WS_PROTOCOL),
		);
	}
	Ok(response)
}

// Copyright (c) gqlws.dev 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

//! Process-level server lifecycle.

use std::{
	net::SocketAddr,
	sync::{
		Arc, RwLock,
		atomic::{AtomicBool, AtomicUsize, Ordering},
	},
	time::Duration,
};

use gqlws_api::QueryEngine;
use tokio::{
	net::TcpListener,
	sync::watch,
	time::{sleep, timeout},
};

use crate::{config::WsConfig, handler::handle_connection};

const SHUTDOWN_DRAIN_DEADLINE: Duration = Duration::from_secs(30);

/// Health of the server subsystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
	Healthy,
	Warning {
		description: String,
	},
	Failed {
		description: String,
	},
}

/// Failure bringing the server up.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
	#[error("failed to bind {addr}: {source}")]
	Bind {
		addr: String,
		#[source]
		source: std::io::Error,
	},
	#[error("bound address unavailable: {0}")]
	AddressUnavailable(#[source] std::io::Error),
}

// State the accept loop and connection tasks update behind the subsystem's
// back.
struct ServerState {
	running: AtomicBool,
	active_connections: AtomicUsize,
}

/// The WebSocket server.
///
/// Binds a listener and hands every accepted socket to
/// [`handle_connection`] in its own task, up to the configured connection
/// limit. The active-connection count drives both health reporting and the
/// drain on graceful shutdown.
pub struct WsSubsystem<E: QueryEngine> {
	config: WsConfig,
	engine: Arc<E>,
	state: Arc<ServerState>,
	/// Bound address, known once started (the config may name port 0).
	actual_addr: RwLock<Option<SocketAddr>>,
	shutdown_tx: Option<watch::Sender<bool>>,
}

impl<E: QueryEngine> WsSubsystem<E> {
	pub fn new(config: WsConfig, engine: Arc<E>) -> Self {
		Self {
			config,
			engine,
			state: Arc::new(ServerState {
				running: AtomicBool::new(false),
				active_connections: AtomicUsize::new(0),
			}),
			actual_addr: RwLock::new(None),
			shutdown_tx: None,
		}
	}

	/// The configured bind address.
	pub fn bind_addr(&self) -> &str {
		&self.config.bind_addr
	}

	/// The bound address, once started.
	pub fn local_addr(&self) -> Option<SocketAddr> {
		*self.actual_addr.read().unwrap()
	}

	/// The bound port, once started.
	pub fn port(&self) -> Option<u16> {
		self.local_addr().map(|addr| addr.port())
	}

	/// Number of currently open connections.
	pub fn active_connections(&self) -> usize {
		self.state.active_connections.load(Ordering::SeqCst)
	}

	pub fn is_running(&self) -> bool {
		self.state.running.load(Ordering::SeqCst)
	}

	/// Bind and start accepting connections. Idempotent while running.
	pub async fn start(&mut self) -> Result<(), ServerError> {
		if self.is_running() {
			return Ok(());
		}

		let listener =
			TcpListener::bind(&self.config.bind_addr).await.map_err(|source| {
				ServerError::Bind {
					addr: self.config.bind_addr.clone(),
					source,
				}
			})?;
		let actual_addr = listener.local_addr().map_err(ServerError::AddressUnavailable)?;
		*self.actual_addr.write().unwrap() = Some(actual_addr);
		tracing::info!("listening on {actual_addr}");

		let (shutdown_tx, shutdown_rx) = watch::channel(false);
		self.state.running.store(true, Ordering::SeqCst);
		tokio::spawn(accept_loop(
			listener,
			self.engine.clone(),
			self.config.clone(),
			self.state.clone(),
			shutdown_rx,
		));
		self.shutdown_tx = Some(shutdown_tx);
		Ok(())
	}

	/// Signal shutdown and wait for open connections to drain, up to a
	/// deadline.
	pub async fn shutdown(&mut self) {
		let Some(shutdown_tx) = self.shutdown_tx.take() else {
			return;
		};
		let _ = shutdown_tx.send(true);

		let drained = timeout(SHUTDOWN_DRAIN_DEADLINE, async {
			while self.state.active_connections.load(Ordering::SeqCst) > 0 {
				sleep(Duration::from_millis(50)).await;
			}
		})
		.await;
		if drained.is_err() {
			tracing::warn!(
				"shutdown deadline passed with {} connections still open",
				self.state.active_connections.load(Ordering::SeqCst)
			);
		}
	}

	pub fn health_status(&self) -> HealthStatus {
		if !self.is_running() {
			return HealthStatus::Failed {
				description: "not running".to_string(),
			};
		}
		let active = self.active_connections();
		let max = self.config.max_connections;
		if active * 10 >= max * 9 {
			HealthStatus::Warning {
				description: format!("{active} of {max} connection slots in use"),
			}
		} else {
			HealthStatus::Healthy
		}
	}
}

// Accepts sockets until shutdown is signalled or the subsystem is dropped.
// The connection limit is enforced with the active-connection counter: the
// slot is claimed before the handshake and released when the connection
// task ends.
async fn accept_loop<E: QueryEngine>(
	listener: TcpListener,
	engine: Arc<E>,
	config: WsConfig,
	state: Arc<ServerState>,
	mut shutdown_rx: watch::Receiver<bool>,
) {
	loop {
		let accepted = tokio::select! {
			_ = shutdown_rx.wait_for(|stop| *stop) => break,
			accepted = listener.accept() => accepted,
		};
		let (stream, peer) = match accepted {
			Ok(accepted) => accepted,
			Err(error) => {
				tracing::warn!("accept failed: {error}");
				continue;
			}
		};

		let claimed = state.active_connections.fetch_add(1, Ordering::SeqCst);
		if claimed >= config.max_connections {
			// Back out the claim; dropping the stream closes it
			// without a handshake.
			state.active_connections.fetch_sub(1, Ordering::SeqCst);
			tracing::warn!("connection limit reached, rejecting {peer}");
			continue;
		}

		tracing::debug!("accepted connection from {peer}");
		let engine = engine.clone();
		let config = config.clone();
		let shutdown_rx = shutdown_rx.clone();
		let state = state.clone();
		tokio::spawn(async move {
			handle_connection(stream, engine, config, shutdown_rx).await;
			state.active_connections.fetch_sub(1, Ordering::SeqCst);
		});
	}

	state.running.store(false, Ordering::SeqCst);
	tracing::info!("server stopped");
}

// Copyright (c) gqlws.dev 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

//! Server configuration.

use std::time::Duration;

/// Configuration for the WebSocket server.
#[derive(Debug, Clone)]
pub struct WsConfig {
	/// Address and port to bind to. Port 0 picks a free port; the bound
	/// address is available from the subsystem after start.
	pub bind_addr: String,
	/// How long a freshly accepted connection may wait before sending
	/// `connection_init`. Expiry closes the socket with code 4408.
	pub connection_init_wait_timeout: Duration,
	/// Maximum number of concurrently open connections.
	pub max_connections: usize,
}

impl Default for WsConfig {
	fn default() -> Self {
		Self {
			bind_addr: "0.0.0.0:8090".to_string(),
			connection_init_wait_timeout: Duration::from_secs(60),
			max_connections: 256,
		}
	}
}

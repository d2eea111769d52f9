// Copyright (c) gqlws.dev 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

//! Collection of finished background tasks.
//!
//! Operation executors and the init-deadline timer run as independent tasks
//! that the dispatch loop never awaits. Their handles are held here and
//! drained at fixed checkpoints (after each inbound message and at shutdown)
//! so a panic escaping a task is surfaced instead of silently discarded.

use std::future::Future;

use tokio::task::{AbortHandle, JoinError, JoinSet};

/// Registry of the background tasks belonging to one connection.
pub(crate) struct TaskReaper {
	tasks: JoinSet<()>,
}

impl TaskReaper {
	pub(crate) fn new() -> Self {
		Self {
			tasks: JoinSet::new(),
		}
	}

	/// Spawn a task into the registry, returning a handle that cancels it.
	pub(crate) fn spawn<F>(&mut self, future: F) -> AbortHandle
	where
		F: Future<Output = ()> + Send + 'static,
	{
		self.tasks.spawn(future)
	}

	/// Drain every task that has already finished, without blocking on the
	/// ones still running.
	pub(crate) fn reap_finished(&mut self) {
		while let Some(result) = self.tasks.try_join_next() {
			Self::surface(result);
		}
	}

	/// Cancel all remaining tasks and wait for every one of them to wind
	/// down, draining their outcomes.
	pub(crate) async fn shutdown(&mut self) {
		self.tasks.abort_all();
		while let Some(result) = self.tasks.join_next().await {
			Self::surface(result);
		}
	}

	// Cancellation is the normal end of an aborted task; only panics are
	// worth reporting.
	fn surface(result: Result<(), JoinError>) {
		if let Err(error) = result {
			if error.is_panic() {
				tracing::error!("background task panicked: {error}");
			}
		}
	}
}

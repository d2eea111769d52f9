// Copyright (c) gqlws.dev 2025
// This file is licensed under the AGPL-3.0-or-later, see license.md file

//! One client-identified unit of work.

use std::sync::Arc;

use gqlws_api::OperationKind;
use gqlws_protocol::ServerMessage;
use tokio::task::AbortHandle;

use crate::connection::{Outgoing, Shared};

/// Registry entry for an active operation, owned by the connection.
///
/// The token ties the entry to one subscribe/complete cycle: a reused id gets
/// a fresh token, so a late deregistration from the previous cycle can never
/// remove the new registration.
pub(crate) struct OperationHandle {
	pub(crate) kind: OperationKind,
	pub(crate) token: u64,
	pub(crate) abort: AbortHandle,
}

/// The executor-side view of one operation.
///
/// All messages for the operation flow through [`send`](Self::send), which
/// enforces the terminal-message rule: the first `complete` or `error` marks
/// the operation completed and frees its id, and everything after it is
/// silently dropped.
pub(crate) struct Operation {
	id: String,
	kind: OperationKind,
	token: u64,
	completed: bool,
	shared: Arc<Shared>,
}

impl Operation {
	pub(crate) fn new(id: String, kind: OperationKind, token: u64, shared: Arc<Shared>) -> Self {
		Self {
			id,
			kind,
			token,
			completed: false,
			shared,
		}
	}

	pub(crate) fn id(&self) -> &str {
		&self.id
	}

	pub(crate) fn kind(&self) -> OperationKind {
		self.kind
	}

	/// Send a message scoped to this operation.
	///
	/// A terminal message deregisters the id *before* it is handed to the
	/// outbound path: the moment the client can see the terminal message,
	/// the id is already free for reuse, and nothing can be sent under it
	/// afterwards.
	pub(crate) async fn send(&mut self, message: ServerMessage) {
		if self.completed {
			return;
		}
		if message.is_terminal() {
			self.completed = true;
			self.deregister();
		}
		// The receiver only goes away while the connection tears down,
		// which cancels this operation with it.
		let _ = self.shared.out_tx.send(Outgoing::Message(message)).await;
	}

	// Token-checked removal: never clobbers a re-registration of the id.
	fn deregister(&self) {
		self.shared.operations.remove_if(&self.id, |_, handle| handle.token == self.token);
	}
}

impl Drop for Operation {
	fn drop(&mut self) {
		// A cancelled or crashed executor must still free its id.
		if !self.completed {
			self.deregister();
		}
	}
}

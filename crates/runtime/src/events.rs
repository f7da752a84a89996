//! Transport events and the connection-event sink.
//!
//! Transports do not call back into the engine. They post
//! [`ConnectionEvent`]s onto a channel, and the [`EventSink`] consumes them:
//! status changes update pool state, completions are correlated through the
//! transaction registry and forwarded to the outward [`ClientNotifier`].
//! Tests inject events by calling [`EventSink::handle`] directly.

use std::sync::Arc;

use switchboard_protocol::{Completion, ConnectionId, ConnectionStatus, RequestHandle, TransactionId};
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use crate::pool::SessionPool;
use crate::transactions::TransactionRegistry;

/// Sender half handed to transports for posting events to the engine.
pub type EventSender = mpsc::UnboundedSender<ConnectionEvent>;

/// Creates the event channel the engine consumes.
pub fn event_channel() -> (EventSender, mpsc::UnboundedReceiver<ConnectionEvent>) {
	mpsc::unbounded_channel()
}

/// Asynchronous notification posted by a transport.
#[derive(Debug, Clone)]
pub enum ConnectionEvent {
	/// A session's connection status changed.
	StatusChanged {
		connection_id: ConnectionId,
		status: ConnectionStatus,
	},
	/// An asynchronous call completed.
	Completion {
		transaction_id: TransactionId,
		completion: Completion,
	},
}

/// Outward client interface receiving correlated notifications.
pub trait ClientNotifier: Send + Sync {
	/// A session's connection status changed.
	fn connection_status_changed(&self, connection_id: ConnectionId, status: ConnectionStatus);

	/// An asynchronous request completed; `request_handle` is the handle the
	/// request was dispatched with.
	fn completion(&self, request_handle: RequestHandle, completion: Completion);
}

/// Consumes transport events and applies them to engine state.
///
/// Status changes never trigger reconnection here; reconnecting is
/// [`SessionPool::do_housekeeping`]'s job, driven by an external scheduler.
pub struct EventSink {
	pool: Arc<SessionPool>,
	transactions: Arc<TransactionRegistry>,
	client: Arc<dyn ClientNotifier>,
}

impl EventSink {
	pub fn new(
		pool: Arc<SessionPool>,
		transactions: Arc<TransactionRegistry>,
		client: Arc<dyn ClientNotifier>,
	) -> Self {
		Self {
			pool,
			transactions,
			client,
		}
	}

	/// Applies one event. Synchronous so it can be driven without a channel.
	pub fn handle(&self, event: ConnectionEvent) {
		match event {
			ConnectionEvent::StatusChanged {
				connection_id,
				status,
			} => {
				if self.pool.record_status(connection_id, status) {
					trace!(
						target = "sb.events",
						%connection_id,
						%status,
						"connection status changed"
					);
					self.client.connection_status_changed(connection_id, status);
				} else {
					warn!(
						target = "sb.events",
						%connection_id,
						%status,
						"status change for unknown session dropped"
					);
				}
			}
			ConnectionEvent::Completion {
				transaction_id,
				completion,
			} => match self.transactions.resolve(transaction_id) {
				Some(request_handle) => {
					debug!(
						target = "sb.events",
						%transaction_id,
						%request_handle,
						good = completion.is_good(),
						"forwarding completion"
					);
					self.client.completion(request_handle, completion);
				}
				// legitimately happens for a request torn down before its
				// completion arrived; never an error of the pool
				None => warn!(
					target = "sb.events",
					%transaction_id,
					"completion for unknown transaction dropped"
				),
			},
		}
	}

	/// Event loop; runs until every sender is dropped.
	pub async fn run(self, mut events: mpsc::UnboundedReceiver<ConnectionEvent>) {
		while let Some(event) = events.recv().await {
			self.handle(event);
		}
	}
}

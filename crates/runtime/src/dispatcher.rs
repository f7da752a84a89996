//! Generic request dispatch across pooled sessions.

use std::sync::Arc;

use switchboard_protocol::{Mask, TransactionId};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::{Error, Result};
use crate::events::{ClientNotifier, EventSender, EventSink, event_channel};
use crate::pool::SessionPool;
use crate::service::{Invocation, InvocationBuilder, RequestLevel, Service, ServiceRequest, ServiceResult};
use crate::session::SessionConnector;
use crate::transactions::TransactionRegistry;

/// Orchestrates invocation building, session acquisition, and result
/// assembly for an arbitrary service type.
///
/// Owns the session pool, the transaction registry, and the event-sink task
/// consuming transport events. Torn down with [`shutdown`](Self::shutdown);
/// dropping the dispatcher stops the sink task.
pub struct Dispatcher {
	pool: Arc<SessionPool>,
	transactions: Arc<TransactionRegistry>,
	events: EventSender,
	sink_task: JoinHandle<()>,
}

impl Dispatcher {
	/// Creates the dispatcher and spawns its event-sink task.
	pub fn new(connector: Arc<dyn SessionConnector>, client: Arc<dyn ClientNotifier>) -> Self {
		let (events, receiver) = event_channel();
		let pool = SessionPool::new(connector, events.clone());
		let transactions = Arc::new(TransactionRegistry::new());
		let sink = EventSink::new(Arc::clone(&pool), Arc::clone(&transactions), client);
		let sink_task = tokio::spawn(sink.run(receiver));
		Self {
			pool,
			transactions,
			events,
			sink_task,
		}
	}

	/// The session pool, for housekeeping, manual lifecycles, and
	/// information queries.
	pub fn pool(&self) -> &Arc<SessionPool> {
		&self.pool
	}

	/// The transaction registry.
	pub fn transactions(&self) -> &Arc<TransactionRegistry> {
		&self.transactions
	}

	/// Sender half of the event channel; clones of this go to transports.
	pub fn event_sender(&self) -> EventSender {
		self.events.clone()
	}

	/// Invokes `request` across however many sessions its masked targets
	/// span, assembling per-target outcomes into `result`.
	///
	/// `result` is caller-owned so a partial mask can re-dispatch only the
	/// targets that failed previously; slots outside the mask keep their
	/// prior values.
	pub async fn invoke_request<S: Service>(
		&self,
		request: &S::Request,
		mask: &Mask,
		result: &mut S::Result,
	) -> Result<()> {
		debug!(
			target = "sb.dispatch",
			service = S::NAME,
			request_handle = %request.request_handle(),
			masked = mask.count_set(),
			"invoking request"
		);

		result.prepare_targets(request.target_count());

		// session-level asynchronous requests get their transaction id before
		// any transport work; subscription-level requests are correlated a
		// layer above this engine
		let transaction_id = if S::ASYNCHRONOUS && S::LEVEL == RequestLevel::Session {
			Some(self.transactions.register(request.request_handle()))
		} else {
			None
		};

		let outcome = self
			.dispatch_invocations::<S>(request, mask, transaction_id, result)
			.await;

		// a failed dispatch, or one that reached no session at all, will
		// never produce a completion; do not leak the registration
		if matches!(&outcome, Err(_) | Ok(0)) {
			if let Some(transaction_id) = transaction_id {
				self.transactions.discard(transaction_id);
			}
		}
		outcome.map(|_| ())
	}

	/// Dispatches every built invocation, fail-fast; returns how many were
	/// processed.
	async fn dispatch_invocations<S: Service>(
		&self,
		request: &S::Request,
		mask: &Mask,
		transaction_id: Option<TransactionId>,
		result: &mut S::Result,
	) -> Result<usize> {
		let invocations = S::Builder::build(request, mask)?;
		debug!(
			target = "sb.dispatch",
			service = S::NAME,
			invocations = invocations.len(),
			"built invocations"
		);

		if S::ASYNCHRONOUS && invocations.len() > 1 {
			return Err(Error::Unsupported(
				"an asynchronous request must be assignable to a single session".to_string(),
			));
		}

		let mut dispatched = 0;
		for (server_uri, mut invocation) in invocations {
			if let Some(transaction_id) = transaction_id {
				invocation.set_transaction_id(transaction_id);
			}

			let guard = self
				.pool
				.acquire(&server_uri, invocation.session_settings())
				.await?;
			invocation.set_session_information(guard.information());

			if !guard.session().is_connected() {
				return Err(Error::Connection(format!(
					"no connected session for {server_uri}"
				)));
			}

			debug!(
				target = "sb.dispatch",
				service = S::NAME,
				connection_id = %guard.connection_id(),
				%server_uri,
				"forwarding invocation"
			);
			invocation.invoke(guard.session().transport().as_ref()).await?;

			if !S::ASYNCHRONOUS {
				invocation.merge_into(result)?;
			}
			dispatched += 1;
		}

		Ok(dispatched)
	}

	/// Tears the engine down: removes every session and clears the registry.
	pub async fn shutdown(&self) {
		self.pool.delete_all_sessions().await;
		self.transactions.clear();
	}
}

impl Drop for Dispatcher {
	fn drop(&mut self) {
		self.sink_task.abort();
	}
}

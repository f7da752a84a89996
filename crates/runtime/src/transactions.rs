//! Correlation of asynchronous requests with their out-of-band completions.

use std::sync::atomic::{AtomicU32, Ordering};

use dashmap::DashMap;
use switchboard_protocol::{RequestHandle, TransactionId};
use tracing::{debug, trace};

/// Maps in-flight transaction ids to the request handles that own them.
///
/// An entry exists only between dispatching an asynchronous request and
/// receiving its completion, or being explicitly discarded when the dispatch
/// fails before a completion could ever arrive.
pub struct TransactionRegistry {
	next_id: AtomicU32,
	pending: DashMap<TransactionId, RequestHandle>,
}

impl TransactionRegistry {
	pub fn new() -> Self {
		Self {
			next_id: AtomicU32::new(0),
			pending: DashMap::new(),
		}
	}

	/// Returns a fresh transaction id, unique and monotonic for this
	/// registry's lifetime. Wraparound at `u32::MAX` is accepted.
	pub fn next_transaction_id(&self) -> TransactionId {
		TransactionId(self.next_id.fetch_add(1, Ordering::SeqCst))
	}

	/// Generates a transaction id and stores its mapping to `request_handle`.
	pub fn register(&self, request_handle: RequestHandle) -> TransactionId {
		let transaction_id = self.next_transaction_id();
		self.pending.insert(transaction_id, request_handle);
		debug!(
			target = "sb.txn",
			%transaction_id,
			%request_handle,
			"registered transaction"
		);
		transaction_id
	}

	/// Removes and returns the request handle a completion belongs to.
	///
	/// `None` means the transaction is stale or unknown; the caller drops the
	/// completion.
	pub fn resolve(&self, transaction_id: TransactionId) -> Option<RequestHandle> {
		let resolved = self.pending.remove(&transaction_id).map(|(_, handle)| handle);
		match resolved {
			Some(request_handle) => {
				debug!(target = "sb.txn", %transaction_id, %request_handle, "resolved transaction");
			}
			None => {
				trace!(target = "sb.txn", %transaction_id, "transaction not found");
			}
		}
		resolved
	}

	/// Removes a registration whose dispatch failed before any completion
	/// could arrive.
	pub fn discard(&self, transaction_id: TransactionId) {
		if self.pending.remove(&transaction_id).is_some() {
			debug!(target = "sb.txn", %transaction_id, "discarded transaction");
		} else {
			trace!(target = "sb.txn", %transaction_id, "discard of unknown transaction");
		}
	}

	/// Number of in-flight transactions.
	pub fn len(&self) -> usize {
		self.pending.len()
	}

	/// Returns `true` when no transactions are in flight.
	pub fn is_empty(&self) -> bool {
		self.pending.is_empty()
	}

	/// Drops every in-flight entry; used at engine teardown.
	pub(crate) fn clear(&self) {
		self.pending.clear();
	}
}

impl Default for TransactionRegistry {
	fn default() -> Self {
		Self::new()
	}
}

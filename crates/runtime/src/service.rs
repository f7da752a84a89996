//! The pluggable service capability that parameterizes generic dispatch.
//!
//! A [`Service`] describes one protocol service: its request/result shapes,
//! whether its results arrive out-of-band as completions, which engine layer
//! correlates those completions, and how a request is partitioned into
//! per-server [`Invocation`]s. The dispatcher is written once against this
//! trait family.

use std::collections::BTreeMap;

use async_trait::async_trait;
use switchboard_protocol::{Mask, RequestHandle, SessionInformation, SessionSettings, TransactionId};

use crate::error::Result;
use crate::session::SessionTransport;

/// Which engine layer correlates a service's asynchronous completions.
///
/// Subscription-level requests are correlated by the analogous layer above
/// this engine and are never entered into its transaction registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestLevel {
	Session,
	Subscription,
}

/// A request carrying one or more logical targets across one or more servers.
pub trait ServiceRequest: Send + Sync {
	/// Caller-assigned correlation handle.
	fn request_handle(&self) -> RequestHandle;

	/// Number of logical targets the request carries.
	fn target_count(&self) -> usize;
}

/// Aggregate result matching a request's target layout.
pub trait ServiceResult: Send {
	/// Ensures one outcome slot per target, default-initialized.
	///
	/// Existing slots keep their values, so a partial-mask retry preserves
	/// the outcomes of targets it does not reprocess.
	fn prepare_targets(&mut self, count: usize);
}

/// Per-server unit of work split off one request.
///
/// Ephemeral: built, dispatched, merged into the result, dropped.
#[async_trait]
pub trait Invocation: Send {
	/// Aggregate result type this invocation merges into.
	type Output: ServiceResult;

	/// Settings the invocation's session must be acquired with.
	fn session_settings(&self) -> &SessionSettings;

	/// Attaches the transaction id of the owning asynchronous request.
	fn set_transaction_id(&mut self, transaction_id: TransactionId);

	/// Records a snapshot of the session the invocation ran on.
	fn set_session_information(&mut self, info: SessionInformation);

	/// Performs the protocol call on the session's transport.
	async fn invoke(&mut self, transport: &dyn SessionTransport) -> Result<()>;

	/// Folds this invocation's per-target outcomes into the aggregate result.
	fn merge_into(&self, result: &mut Self::Output) -> Result<()>;
}

/// Partitions a request's masked targets by destination server URI.
pub trait InvocationBuilder<S: Service> {
	/// Builds one invocation per distinct destination server.
	///
	/// Map iteration order is the dispatch order, which makes dispatch
	/// deterministic for a given request.
	fn build(request: &S::Request, mask: &Mask) -> Result<BTreeMap<String, S::Invocation>>;
}

/// Description of one protocol service understood by the dispatcher.
///
/// `ASYNCHRONOUS` and `LEVEL` select, at the type level, whether a dispatch
/// registers a transaction before touching the transport.
pub trait Service: Sized + Send + Sync + 'static {
	/// Service name, for diagnostics only.
	const NAME: &'static str;

	/// Whether results arrive out-of-band as completions.
	const ASYNCHRONOUS: bool;

	/// Which layer correlates asynchronous completions.
	const LEVEL: RequestLevel;

	type Request: ServiceRequest;
	type Result: ServiceResult;
	type Invocation: Invocation<Output = Self::Result>;
	type Builder: InvocationBuilder<Self>;
}

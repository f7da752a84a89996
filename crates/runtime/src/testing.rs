//! Shared test doubles: a scriptable connector/transport pair, probe
//! services exercising the dispatch path, and a recording client notifier.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use switchboard_protocol::{
	Completion, ConnectionId, ConnectionStatus, Mask, RequestHandle, SessionInformation,
	SessionSettings, TransactionId,
};

use crate::error::{Error, Result};
use crate::events::{ClientNotifier, ConnectionEvent, EventSender};
use crate::service::{
	Invocation, InvocationBuilder, RequestLevel, Service, ServiceRequest, ServiceResult,
};
use crate::session::{SessionConnector, SessionTransport};

/// Installs a test-writer subscriber so traced state transitions show up in
/// failing tests. Safe to call from every test; only the first call wins.
pub fn init_tracing() {
	let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Transport double recording connect/disconnect/invoke traffic.
pub struct TestTransport {
	pub connection_id: ConnectionId,
	pub server_uri: String,
	pub fail_connect: AtomicBool,
	pub fail_invoke: AtomicBool,
	pub connect_calls: AtomicU32,
	pub disconnect_calls: AtomicU32,
	/// Target payloads received, in dispatch order.
	pub invoked: Mutex<Vec<String>>,
	/// Transaction id attached to each invocation that reached this transport.
	pub seen_transaction_ids: Mutex<Vec<Option<TransactionId>>>,
	events: EventSender,
}

impl TestTransport {
	/// Posts an event the way a real transport would.
	pub fn post(&self, event: ConnectionEvent) {
		let _ = self.events.send(event);
	}
}

#[async_trait]
impl SessionTransport for TestTransport {
	async fn connect(&self) -> Result<()> {
		self.connect_calls.fetch_add(1, Ordering::SeqCst);
		if self.fail_connect.load(Ordering::SeqCst) {
			return Err(Error::Transport(format!(
				"{} refused the connection",
				self.server_uri
			)));
		}
		Ok(())
	}

	async fn disconnect(&self) -> Result<()> {
		self.disconnect_calls.fetch_add(1, Ordering::SeqCst);
		Ok(())
	}
}

/// Connector double with per-URI reachability scripting.
#[derive(Default)]
pub struct TestConnector {
	unreachable: Mutex<HashSet<String>>,
	refused: Mutex<HashSet<String>>,
	rejecting: Mutex<HashSet<String>>,
	/// Every transport handed out, in creation order.
	pub transports: Mutex<Vec<Arc<TestTransport>>>,
}

impl TestConnector {
	pub fn new() -> Arc<Self> {
		Arc::new(Self::default())
	}

	/// `establish` fails for this URI.
	pub fn mark_unreachable(&self, server_uri: &str) {
		self.unreachable.lock().insert(server_uri.to_string());
	}

	/// Transports for this URI fail their connect call.
	pub fn refuse_connect(&self, server_uri: &str) {
		self.refused.lock().insert(server_uri.to_string());
	}

	/// Transports for this URI reject protocol calls.
	pub fn reject_invoke(&self, server_uri: &str) {
		self.rejecting.lock().insert(server_uri.to_string());
	}

	/// Most recent transport created for `server_uri`.
	pub fn transport_for(&self, server_uri: &str) -> Option<Arc<TestTransport>> {
		self.transports
			.lock()
			.iter()
			.rev()
			.find(|transport| transport.server_uri == server_uri)
			.cloned()
	}
}

#[async_trait]
impl SessionConnector for TestConnector {
	async fn establish(
		&self,
		connection_id: ConnectionId,
		server_uri: &str,
		_settings: &SessionSettings,
		events: EventSender,
	) -> Result<Arc<dyn SessionTransport>> {
		if self.unreachable.lock().contains(server_uri) {
			return Err(Error::Transport(format!("no route to {server_uri}")));
		}
		let transport = Arc::new(TestTransport {
			connection_id,
			server_uri: server_uri.to_string(),
			fail_connect: AtomicBool::new(self.refused.lock().contains(server_uri)),
			fail_invoke: AtomicBool::new(self.rejecting.lock().contains(server_uri)),
			connect_calls: AtomicU32::new(0),
			disconnect_calls: AtomicU32::new(0),
			invoked: Mutex::new(Vec::new()),
			seen_transaction_ids: Mutex::new(Vec::new()),
			events,
		});
		self.transports.lock().push(Arc::clone(&transport));
		Ok(transport)
	}
}

/// Client-notifier double recording everything it is handed.
#[derive(Default)]
pub struct RecordingNotifier {
	pub status_changes: Mutex<Vec<(ConnectionId, ConnectionStatus)>>,
	pub completions: Mutex<Vec<(RequestHandle, Completion)>>,
}

impl ClientNotifier for RecordingNotifier {
	fn connection_status_changed(&self, connection_id: ConnectionId, status: ConnectionStatus) {
		self.status_changes.lock().push((connection_id, status));
	}

	fn completion(&self, request_handle: RequestHandle, completion: Completion) {
		self.completions.lock().push((request_handle, completion));
	}
}

/// One probe target: a payload sent to one server.
#[derive(Debug, Clone)]
pub struct ProbeTarget {
	pub server_uri: String,
	pub payload: String,
}

impl ProbeTarget {
	pub fn new(server_uri: &str, payload: &str) -> Self {
		Self {
			server_uri: server_uri.to_string(),
			payload: payload.to_string(),
		}
	}
}

/// Multi-target probe request.
pub struct ProbeRequest {
	pub handle: RequestHandle,
	pub settings: SessionSettings,
	pub targets: Vec<ProbeTarget>,
}

impl ProbeRequest {
	pub fn new(handle: u64, targets: Vec<ProbeTarget>) -> Self {
		Self {
			handle: RequestHandle(handle),
			settings: SessionSettings::default(),
			targets,
		}
	}
}

impl ServiceRequest for ProbeRequest {
	fn request_handle(&self) -> RequestHandle {
		self.handle
	}

	fn target_count(&self) -> usize {
		self.targets.len()
	}
}

/// One echo outcome slot per probe target.
#[derive(Debug, Default, PartialEq)]
pub struct ProbeResult {
	pub targets: Vec<Option<String>>,
}

impl ServiceResult for ProbeResult {
	fn prepare_targets(&mut self, count: usize) {
		if self.targets.len() < count {
			self.targets.resize(count, None);
		}
	}
}

/// Per-server probe invocation echoing each payload through the transport.
pub struct ProbeInvocation {
	pub settings: SessionSettings,
	pub transaction_id: Option<TransactionId>,
	pub session_information: Option<SessionInformation>,
	pub targets: Vec<(usize, String)>,
	pub outcomes: Vec<(usize, String)>,
}

#[async_trait]
impl Invocation for ProbeInvocation {
	type Output = ProbeResult;

	fn session_settings(&self) -> &SessionSettings {
		&self.settings
	}

	fn set_transaction_id(&mut self, transaction_id: TransactionId) {
		self.transaction_id = Some(transaction_id);
	}

	fn set_session_information(&mut self, info: SessionInformation) {
		self.session_information = Some(info);
	}

	async fn invoke(&mut self, transport: &dyn SessionTransport) -> Result<()> {
		// the dispatcher copies the session snapshot in before invoking
		let info = self.session_information.as_ref().ok_or_else(|| {
			Error::Programming("invocation dispatched without session information".to_string())
		})?;
		debug_assert!(info.status.is_connected());
		let transport = transport
			.downcast_ref::<TestTransport>()
			.ok_or_else(|| Error::Transport("unexpected transport type".to_string()))?;
		if transport.fail_invoke.load(Ordering::SeqCst) {
			return Err(Error::Transport(format!(
				"{} rejected the call",
				transport.server_uri
			)));
		}
		transport
			.seen_transaction_ids
			.lock()
			.push(self.transaction_id);
		for (index, payload) in &self.targets {
			transport.invoked.lock().push(payload.clone());
			self.outcomes.push((*index, format!("echo:{payload}")));
		}
		Ok(())
	}

	fn merge_into(&self, result: &mut ProbeResult) -> Result<()> {
		for (index, outcome) in &self.outcomes {
			if let Some(slot) = result.targets.get_mut(*index) {
				*slot = Some(outcome.clone());
			}
		}
		Ok(())
	}
}

fn build_probe_invocations(
	request: &ProbeRequest,
	mask: &Mask,
) -> Result<BTreeMap<String, ProbeInvocation>> {
	let mut invocations: BTreeMap<String, ProbeInvocation> = BTreeMap::new();
	for (index, target) in request.targets.iter().enumerate() {
		if !mask.is_set(index) {
			continue;
		}
		invocations
			.entry(target.server_uri.clone())
			.or_insert_with(|| ProbeInvocation {
				settings: request.settings.clone(),
				transaction_id: None,
				session_information: None,
				targets: Vec::new(),
				outcomes: Vec::new(),
			})
			.targets
			.push((index, target.payload.clone()));
	}
	Ok(invocations)
}

pub struct ProbeBuilder;

/// Synchronous session-level probe service.
pub struct SyncProbe;

impl Service for SyncProbe {
	const NAME: &'static str = "SyncProbe";
	const ASYNCHRONOUS: bool = false;
	const LEVEL: RequestLevel = RequestLevel::Session;

	type Request = ProbeRequest;
	type Result = ProbeResult;
	type Invocation = ProbeInvocation;
	type Builder = ProbeBuilder;
}

impl InvocationBuilder<SyncProbe> for ProbeBuilder {
	fn build(request: &ProbeRequest, mask: &Mask) -> Result<BTreeMap<String, ProbeInvocation>> {
		build_probe_invocations(request, mask)
	}
}

/// Asynchronous session-level probe service.
pub struct AsyncProbe;

impl Service for AsyncProbe {
	const NAME: &'static str = "AsyncProbe";
	const ASYNCHRONOUS: bool = true;
	const LEVEL: RequestLevel = RequestLevel::Session;

	type Request = ProbeRequest;
	type Result = ProbeResult;
	type Invocation = ProbeInvocation;
	type Builder = ProbeBuilder;
}

impl InvocationBuilder<AsyncProbe> for ProbeBuilder {
	fn build(request: &ProbeRequest, mask: &Mask) -> Result<BTreeMap<String, ProbeInvocation>> {
		build_probe_invocations(request, mask)
	}
}

/// Asynchronous probe whose completions are correlated a layer above the
/// engine; must never touch the transaction registry.
pub struct SubscriptionProbe;

impl Service for SubscriptionProbe {
	const NAME: &'static str = "SubscriptionProbe";
	const ASYNCHRONOUS: bool = true;
	const LEVEL: RequestLevel = RequestLevel::Subscription;

	type Request = ProbeRequest;
	type Result = ProbeResult;
	type Invocation = ProbeInvocation;
	type Builder = ProbeBuilder;
}

impl InvocationBuilder<SubscriptionProbe> for ProbeBuilder {
	fn build(request: &ProbeRequest, mask: &Mask) -> Result<BTreeMap<String, ProbeInvocation>> {
		build_probe_invocations(request, mask)
	}
}

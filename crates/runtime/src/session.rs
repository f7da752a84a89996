//! Session records and the transport capability seam.
//!
//! The engine never speaks the wire protocol itself. It drives opaque
//! [`SessionTransport`] objects created by a [`SessionConnector`], and typed
//! invocations reach their concrete transport by downcasting, the same way
//! protocol objects are recovered from an opaque registry elsewhere in this
//! codebase family.

use std::sync::Arc;

use async_trait::async_trait;
use downcast_rs::{DowncastSync, impl_downcast};
use parking_lot::Mutex;
use switchboard_protocol::{ConnectionId, ConnectionStatus, SessionInformation, SessionSettings};

use crate::error::Result;
use crate::events::EventSender;

/// One stateful wire connection to a server, as the engine sees it.
///
/// `connect` and `disconnect` are, together with
/// [`Invocation::invoke`](crate::service::Invocation::invoke), the only
/// blocking points in the engine; the pool never holds its lock across them.
/// Timeout enforcement belongs to the implementation, not the engine.
#[async_trait]
pub trait SessionTransport: DowncastSync {
	/// Establishes (or re-establishes) the connection.
	async fn connect(&self) -> Result<()>;

	/// Tears the connection down.
	async fn disconnect(&self) -> Result<()>;
}

impl_downcast!(sync SessionTransport);

/// Factory the pool calls to create transports.
#[async_trait]
pub trait SessionConnector: Send + Sync {
	/// Creates a transport for `server_uri` with `settings`.
	///
	/// The transport keeps `events` and posts status changes and completions
	/// for `connection_id` onto it for the engine's event sink to consume.
	async fn establish(
		&self,
		connection_id: ConnectionId,
		server_uri: &str,
		settings: &SessionSettings,
		events: EventSender,
	) -> Result<Arc<dyn SessionTransport>>;
}

/// Pool-owned record of one live session.
///
/// Never destroyed while its activity count is nonzero; the count itself
/// lives in the pool's state, in lockstep with the session map.
pub struct Session {
	connection_id: ConnectionId,
	server_uri: String,
	settings: SessionSettings,
	transport: Arc<dyn SessionTransport>,
	status: Mutex<ConnectionStatus>,
}

impl Session {
	pub(crate) fn new(
		connection_id: ConnectionId,
		server_uri: String,
		settings: SessionSettings,
		transport: Arc<dyn SessionTransport>,
	) -> Self {
		Self {
			connection_id,
			server_uri,
			settings,
			transport,
			status: Mutex::new(ConnectionStatus::Connecting),
		}
	}

	/// Pool-assigned handle naming this session.
	pub fn connection_id(&self) -> ConnectionId {
		self.connection_id
	}

	/// Server URI this session is connected to.
	pub fn server_uri(&self) -> &str {
		&self.server_uri
	}

	/// Settings this session was created with.
	pub fn settings(&self) -> &SessionSettings {
		&self.settings
	}

	/// The underlying transport.
	pub fn transport(&self) -> &Arc<dyn SessionTransport> {
		&self.transport
	}

	/// Connection status as last recorded.
	pub fn status(&self) -> ConnectionStatus {
		*self.status.lock()
	}

	/// Returns `true` when protocol calls may be invoked.
	pub fn is_connected(&self) -> bool {
		self.status().is_connected()
	}

	pub(crate) fn set_status(&self, status: ConnectionStatus) {
		*self.status.lock() = status;
	}

	pub(crate) fn information(&self, activity: u32, pinned: bool) -> SessionInformation {
		SessionInformation {
			connection_id: self.connection_id,
			server_uri: self.server_uri.clone(),
			status: self.status(),
			settings: self.settings.clone(),
			activity,
			pinned,
		}
	}
}

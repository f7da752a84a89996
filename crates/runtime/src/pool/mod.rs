//! Reference-counted ownership of live sessions.
//!
//! The pool owns every session, keyed by connection id, together with its
//! activity count (in-flight operations currently holding it) and pinned
//! flag (manual lifecycle). One mutex guards all of that state; it is held
//! only for map mutation, never across connect/invoke/disconnect, so slow
//! network calls on one session never stall acquire/release on another.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use futures_util::future::join_all;
use parking_lot::Mutex;
use switchboard_protocol::{ConnectionId, ConnectionStatus, SessionInformation, SessionSettings};
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::events::EventSender;
use crate::session::{Session, SessionConnector};


struct PoolEntry {
	session: Arc<Session>,
	activity: u32,
	pinned: bool,
}

/// Owns the set of live sessions and the acquire/release/garbage-collect
/// protocol.
///
/// Garbage-collection policy: an entry is removed on the release that makes
/// it eligible (activity zero, disconnected, not pinned, collection allowed);
/// [`do_housekeeping`](Self::do_housekeeping) reclaims entries that become
/// eligible while idle, e.g. when the disconnect notification arrives after
/// the last release.
pub struct SessionPool {
	connector: Arc<dyn SessionConnector>,
	events: EventSender,
	next_connection_id: AtomicU32,
	state: Mutex<HashMap<ConnectionId, PoolEntry>>,
}

impl SessionPool {
	pub fn new(connector: Arc<dyn SessionConnector>, events: EventSender) -> Arc<Self> {
		Arc::new(Self {
			connector,
			events,
			next_connection_id: AtomicU32::new(0),
			state: Mutex::new(HashMap::new()),
		})
	}

	/// Hands out a session for `(server_uri, settings)`, creating and
	/// connecting a new one when no compatible session exists.
	///
	/// The returned guard releases the session when dropped; callers must
	/// not retain the session beyond the guard. A concurrent create for the
	/// same key can produce a second session (the lock is not held across
	/// the connect call); the surplus one is garbage-collected once idle.
	pub async fn acquire(
		self: &Arc<Self>,
		server_uri: &str,
		settings: &SessionSettings,
	) -> Result<SessionGuard> {
		if let Some(guard) = self.acquire_compatible(server_uri, settings) {
			return Ok(guard);
		}

		let session = self.create_session(server_uri, settings).await?;
		let mut state = self.state.lock();
		let entry = state
			.entry(session.connection_id())
			.or_insert_with(|| PoolEntry {
				session: Arc::clone(&session),
				activity: 0,
				pinned: false,
			});
		entry.activity += 1;
		trace!(
			target = "sb.pool",
			connection_id = %session.connection_id(),
			activity = entry.activity,
			"acquired new session"
		);
		Ok(SessionGuard {
			pool: Arc::clone(self),
			session,
		})
	}

	/// Hands out the session named by `connection_id`; used by manual-connect
	/// workflows that address a session directly.
	pub fn acquire_existing(self: &Arc<Self>, connection_id: ConnectionId) -> Result<SessionGuard> {
		let mut state = self.state.lock();
		let entry = state.get_mut(&connection_id).ok_or_else(|| {
			Error::NotFound(format!("no session with connection id {connection_id}"))
		})?;
		entry.activity += 1;
		trace!(
			target = "sb.pool",
			%connection_id,
			activity = entry.activity,
			"acquired existing session"
		);
		Ok(SessionGuard {
			pool: Arc::clone(self),
			session: Arc::clone(&entry.session),
		})
	}

	fn acquire_compatible(
		self: &Arc<Self>,
		server_uri: &str,
		settings: &SessionSettings,
	) -> Option<SessionGuard> {
		let mut state = self.state.lock();
		for entry in state.values_mut() {
			if entry.session.server_uri() == server_uri && entry.session.settings() == settings {
				entry.activity += 1;
				trace!(
					target = "sb.pool",
					connection_id = %entry.session.connection_id(),
					activity = entry.activity,
					"reusing compatible session"
				);
				return Some(SessionGuard {
					pool: Arc::clone(self),
					session: Arc::clone(&entry.session),
				});
			}
		}
		None
	}

	async fn create_session(
		&self,
		server_uri: &str,
		settings: &SessionSettings,
	) -> Result<Arc<Session>> {
		let connection_id = ConnectionId(self.next_connection_id.fetch_add(1, Ordering::SeqCst));
		debug!(target = "sb.pool", %connection_id, %server_uri, "creating session");

		let transport = self
			.connector
			.establish(connection_id, server_uri, settings, self.events.clone())
			.await
			.map_err(|e| {
				Error::Connection(format!("failed to create session to {server_uri}: {e}"))
			})?;

		let session = Arc::new(Session::new(
			connection_id,
			server_uri.to_string(),
			settings.clone(),
			transport,
		));

		if let Err(e) = session.transport().connect().await {
			session.set_status(ConnectionStatus::Disconnected);
			return Err(Error::Connection(format!(
				"failed to connect to {server_uri}: {e}"
			)));
		}
		session.set_status(ConnectionStatus::Connected);
		Ok(session)
	}

	/// Returns a reference taken by acquire.
	///
	/// Fails with [`Error::Programming`] when the activity count is already
	/// zero, leaving state unchanged. An id the pool no longer knows (removed
	/// by [`delete_all_sessions`](Self::delete_all_sessions) while the
	/// reference was in flight) is treated as already released.
	pub(crate) fn release(
		&self,
		connection_id: ConnectionId,
		allow_garbage_collection: bool,
	) -> Result<()> {
		let collected = {
			let mut state = self.state.lock();
			let Some(entry) = state.get_mut(&connection_id) else {
				trace!(target = "sb.pool", %connection_id, "release of already-removed session");
				return Ok(());
			};
			if entry.activity == 0 {
				return Err(Error::Programming(format!(
					"session {connection_id} released more often than acquired"
				)));
			}
			entry.activity -= 1;
			trace!(
				target = "sb.pool",
				%connection_id,
				activity = entry.activity,
				"released session"
			);

			let eligible = entry.activity == 0
				&& !entry.pinned
				&& allow_garbage_collection
				&& entry.session.status() == ConnectionStatus::Disconnected;
			if eligible { state.remove(&connection_id) } else { None }
		};

		if collected.is_some() {
			debug!(
				target = "sb.pool",
				%connection_id,
				"garbage-collected idle disconnected session"
			);
		}
		Ok(())
	}

	/// Creates (or reuses) a session exactly like
	/// [`acquire`](Self::acquire), but pins it for manual lifecycle
	/// management instead of holding an activity reference. The session
	/// stays alive until [`manually_disconnect`](Self::manually_disconnect).
	pub async fn manually_connect(
		self: &Arc<Self>,
		server_uri: &str,
		settings: &SessionSettings,
	) -> Result<ConnectionId> {
		{
			let mut state = self.state.lock();
			for entry in state.values_mut() {
				if entry.session.server_uri() == server_uri && entry.session.settings() == settings
				{
					entry.pinned = true;
					debug!(
						target = "sb.pool",
						connection_id = %entry.session.connection_id(),
						"pinned existing session"
					);
					return Ok(entry.session.connection_id());
				}
			}
		}

		let session = self.create_session(server_uri, settings).await?;
		let connection_id = session.connection_id();
		self.state.lock().insert(
			connection_id,
			PoolEntry {
				session,
				activity: 0,
				pinned: true,
			},
		);
		debug!(target = "sb.pool", %connection_id, %server_uri, "manually connected session");
		Ok(connection_id)
	}

	/// Disconnects and removes a session created by
	/// [`manually_connect`](Self::manually_connect).
	pub async fn manually_disconnect(&self, connection_id: ConnectionId) -> Result<()> {
		let session = {
			let mut state = self.state.lock();
			let Some(entry) = state.remove(&connection_id) else {
				return Err(Error::NotFound(format!(
					"no session with connection id {connection_id}"
				)));
			};
			if !entry.pinned || entry.activity > 0 {
				let rejected = if !entry.pinned {
					Error::NotFound(format!(
						"session {connection_id} was not manually connected"
					))
				} else {
					Error::Programming(format!(
						"session {connection_id} still has {} active references",
						entry.activity
					))
				};
				state.insert(connection_id, entry);
				return Err(rejected);
			}
			entry.session
		};

		debug!(target = "sb.pool", %connection_id, "manually disconnecting session");
		session.set_status(ConnectionStatus::Disconnected);
		session.transport().disconnect().await
	}

	/// Housekeeping pass: reconnects disconnected sessions that still have
	/// activity or are pinned, then reclaims idle disconnected ones.
	///
	/// Driven by an external scheduler; status-change events themselves never
	/// trigger reconnection.
	pub async fn do_housekeeping(&self) {
		let snapshot: Vec<(Arc<Session>, u32, bool)> = {
			let state = self.state.lock();
			state
				.values()
				.map(|entry| (Arc::clone(&entry.session), entry.activity, entry.pinned))
				.collect()
		};

		for (session, activity, pinned) in &snapshot {
			if session.status() != ConnectionStatus::Disconnected || (*activity == 0 && !*pinned) {
				continue;
			}
			let connection_id = session.connection_id();
			debug!(target = "sb.pool", %connection_id, "housekeeping: reconnecting session");
			session.set_status(ConnectionStatus::Connecting);
			match session.transport().connect().await {
				Ok(()) => session.set_status(ConnectionStatus::Connected),
				Err(e) => {
					session.set_status(ConnectionStatus::Disconnected);
					warn!(
						target = "sb.pool",
						%connection_id,
						error = %e,
						"housekeeping: reconnect failed"
					);
				}
			}
		}

		let reclaimed: Vec<ConnectionId> = {
			let mut state = self.state.lock();
			let eligible: Vec<ConnectionId> = state
				.iter()
				.filter(|(_, entry)| {
					entry.activity == 0
						&& !entry.pinned
						&& entry.session.status() == ConnectionStatus::Disconnected
				})
				.map(|(id, _)| *id)
				.collect();
			for id in &eligible {
				state.remove(id);
			}
			eligible
		};
		for connection_id in reclaimed {
			debug!(
				target = "sb.pool",
				%connection_id,
				"housekeeping: reclaimed idle disconnected session"
			);
		}
	}

	/// Read-only snapshot of one session.
	pub fn session_information(&self, connection_id: ConnectionId) -> Result<SessionInformation> {
		let state = self.state.lock();
		state
			.get(&connection_id)
			.map(|entry| entry.session.information(entry.activity, entry.pinned))
			.ok_or_else(|| Error::NotFound(format!("no session with connection id {connection_id}")))
	}

	/// Read-only snapshots of every session, connected or not.
	pub fn all_session_informations(&self) -> Vec<SessionInformation> {
		let state = self.state.lock();
		state
			.values()
			.map(|entry| entry.session.information(entry.activity, entry.pinned))
			.collect()
	}

	/// Disconnects and removes every session unconditionally; used at
	/// shutdown.
	///
	/// Contends only on the pool lock and never preempts an in-flight
	/// dispatch; a guard released afterwards finds its session gone and
	/// no-ops.
	pub async fn delete_all_sessions(&self) {
		let sessions: Vec<Arc<Session>> = {
			let mut state = self.state.lock();
			state.drain().map(|(_, entry)| entry.session).collect()
		};
		if sessions.is_empty() {
			return;
		}
		debug!(target = "sb.pool", count = sessions.len(), "deleting all sessions");

		let disconnects = sessions.iter().map(|session| async move {
			session.set_status(ConnectionStatus::Disconnected);
			if let Err(e) = session.transport().disconnect().await {
				warn!(
					target = "sb.pool",
					connection_id = %session.connection_id(),
					error = %e,
					"disconnect failed during shutdown"
				);
			}
		});
		join_all(disconnects).await;
	}

	/// Applies a transport status notification. Returns `false` for ids the
	/// pool no longer knows.
	pub(crate) fn record_status(&self, connection_id: ConnectionId, status: ConnectionStatus) -> bool {
		let state = self.state.lock();
		match state.get(&connection_id) {
			Some(entry) => {
				entry.session.set_status(status);
				true
			}
			None => false,
		}
	}
}

/// Scope-guarded session reference.
///
/// Releases the activity reference on every exit path via `Drop`; the
/// session must not be retained or used once the guard is gone.
pub struct SessionGuard {
	pool: Arc<SessionPool>,
	session: Arc<Session>,
}

impl SessionGuard {
	/// The guarded session.
	pub fn session(&self) -> &Session {
		&self.session
	}

	/// Connection id of the guarded session.
	pub fn connection_id(&self) -> ConnectionId {
		self.session.connection_id()
	}

	/// Snapshot of the guarded session.
	pub fn information(&self) -> SessionInformation {
		self.pool
			.session_information(self.session.connection_id())
			.unwrap_or_else(|_| self.session.information(0, false))
	}
}

impl std::fmt::Debug for SessionGuard {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SessionGuard")
			.field("connection_id", &self.session.connection_id())
			.finish()
	}
}

impl Drop for SessionGuard {
	fn drop(&mut self) {
		if let Err(e) = self.pool.release(self.session.connection_id(), true) {
			// double release signals a bug in the engine itself; surfaced
			// loudly but the process carries on
			warn!(
				target = "sb.pool",
				connection_id = %self.session.connection_id(),
				error = %e,
				"session release failed"
			);
		}
	}
}

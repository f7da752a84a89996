//! Read-only session snapshots.

use serde::{Deserialize, Serialize};

use crate::ids::ConnectionId;
use crate::settings::SessionSettings;
use crate::status::ConnectionStatus;

/// Point-in-time snapshot of one pooled session.
///
/// Produced by the pool's information queries; mutating a snapshot has no
/// effect on the pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionInformation {
	/// Handle naming the session within the pool.
	pub connection_id: ConnectionId,
	/// Server URI the session is connected to.
	pub server_uri: String,
	/// Connection status at snapshot time.
	pub status: ConnectionStatus,
	/// Settings the session was created with.
	pub settings: SessionSettings,
	/// Number of in-flight operations holding the session at snapshot time.
	pub activity: u32,
	/// Whether the session's lifecycle is pinned by a manual connect.
	pub pinned: bool,
}

//! Connection status as recorded by the session pool.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Status of one session's underlying transport connection.
///
/// Updated by the connection-event sink from transport notifications; the
/// pool itself only sets it around connect/disconnect calls it performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
	/// No usable transport connection.
	Disconnected,
	/// A connect attempt is in progress.
	Connecting,
	/// The transport connection is established and usable.
	Connected,
	/// The transport reported an unrecoverable connection error.
	Errored,
}

impl ConnectionStatus {
	/// Returns `true` when protocol calls may be invoked on the session.
	pub fn is_connected(self) -> bool {
		matches!(self, ConnectionStatus::Connected)
	}
}

impl fmt::Display for ConnectionStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			ConnectionStatus::Disconnected => "disconnected",
			ConnectionStatus::Connecting => "connecting",
			ConnectionStatus::Connected => "connected",
			ConnectionStatus::Errored => "errored",
		};
		f.write_str(s)
	}
}

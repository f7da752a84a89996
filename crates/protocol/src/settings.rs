//! Session settings and the reuse-compatibility policy.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Message security applied to a session's transport connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityPolicy {
	/// No signing or encryption.
	#[default]
	None,
	/// Messages are signed but not encrypted.
	Sign,
	/// Messages are signed and encrypted.
	SignAndEncrypt,
}

/// Settings a session is created with.
///
/// `PartialEq` doubles as the reuse-compatibility policy: the pool hands out
/// an existing session for a server URI only when its settings compare equal
/// to the requested ones. Timeout enforcement itself belongs to the
/// transport, not the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSettings {
	/// Requested lifetime of the session on the server.
	pub session_timeout: Duration,
	/// Upper bound for the transport's connect attempt.
	pub connect_timeout: Duration,
	/// Interval at which the transport watches the connection's health.
	pub watchdog_interval: Duration,
	/// Message security for the connection.
	pub security_policy: SecurityPolicy,
}

impl Default for SessionSettings {
	fn default() -> Self {
		Self {
			session_timeout: Duration::from_secs(1200),
			connect_timeout: Duration::from_secs(2),
			watchdog_interval: Duration::from_secs(5),
			security_policy: SecurityPolicy::None,
		}
	}
}

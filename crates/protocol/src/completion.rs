//! Completion payloads for asynchronous protocol calls.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Which kind of asynchronous call a completion belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionKind {
	/// Method-call completion.
	Call,
	/// Read completion.
	Read,
	/// Write completion.
	Write,
}

/// Outcome of one asynchronous protocol call, as delivered by the transport.
///
/// Either `result` or `error` is set; `diagnostics` carries whatever
/// per-target detail the transport surfaced and is passed through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Completion {
	/// Kind of call this completion answers.
	pub kind: CompletionKind,
	/// Payload of a successful call.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub result: Option<Value>,
	/// Transport-level failure message, verbatim.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
	/// Per-target diagnostic detail from the transport.
	#[serde(default)]
	pub diagnostics: Vec<String>,
}

impl Completion {
	/// Successful completion carrying `result`.
	pub fn good(kind: CompletionKind, result: Value) -> Self {
		Self {
			kind,
			result: Some(result),
			error: None,
			diagnostics: Vec::new(),
		}
	}

	/// Failed completion carrying the transport's error message.
	pub fn bad(kind: CompletionKind, error: impl Into<String>) -> Self {
		Self {
			kind,
			result: None,
			error: Some(error.into()),
			diagnostics: Vec::new(),
		}
	}

	/// Returns `true` when the call succeeded.
	pub fn is_good(&self) -> bool {
		self.error.is_none()
	}
}

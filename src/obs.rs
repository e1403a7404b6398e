//! Observability helpers: operation spans, outcome counters, and the explicitly threaded log
//! configuration.
//!
//! # Feature Flags
//!
//! - Spans named `firebase_rules.operation` carry the `operation` and `stage` fields and are always
//!   emitted through `tracing`.
//! - Enable `metrics` to increment `firebase_rules_operation_total` (labeled by `operation` and
//!   `outcome`) and `firebase_rules_http_retry_total`.

mod log;
mod metrics;
mod tracing;

pub use log::*;
pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Public operations observed by the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperationKind {
	/// Credential resolution and transport bootstrap.
	SessionLoad,
	/// Two-phase ruleset deployment.
	RulesDeploy,
	/// Release and ruleset read-back.
	RulesRead,
	/// Rules removal (no-op).
	RulesDelete,
	/// Identity Platform config read.
	AuthConfigRead,
	/// Identity Platform config update.
	AuthConfigUpdate,
	/// Identity Platform config removal (no-op).
	AuthConfigDelete,
}
impl OperationKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OperationKind::SessionLoad => "session_load",
			OperationKind::RulesDeploy => "rules_deploy",
			OperationKind::RulesRead => "rules_read",
			OperationKind::RulesDelete => "rules_delete",
			OperationKind::AuthConfigRead => "auth_config_read",
			OperationKind::AuthConfigUpdate => "auth_config_update",
			OperationKind::AuthConfigDelete => "auth_config_delete",
		}
	}
}
impl Display for OperationKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperationOutcome {
	/// Entry to a public operation.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl OperationOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OperationOutcome::Attempt => "attempt",
			OperationOutcome::Success => "success",
			OperationOutcome::Failure => "failure",
		}
	}

	/// Maps a finished operation to its outcome label.
	pub fn of<T, E>(result: &std::result::Result<T, E>) -> Self {
		if result.is_ok() { Self::Success } else { Self::Failure }
	}
}
impl Display for OperationOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

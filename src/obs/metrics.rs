// self
use crate::obs::{OperationKind, OperationOutcome};

/// Records an operation outcome via the global metrics recorder (when enabled).
pub fn record_operation_outcome(kind: OperationKind, outcome: OperationOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"firebase_rules_operation_total",
			"operation" => kind.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}

/// Records one retried HTTP attempt, labeled by the reason the attempt failed.
pub fn record_http_retry(reason: &'static str) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!("firebase_rules_http_retry_total", "reason" => reason).increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = reason;
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn recorders_noop_without_metrics() {
		record_operation_outcome(OperationKind::RulesDeploy, OperationOutcome::Failure);
		record_http_retry("status");
	}
}

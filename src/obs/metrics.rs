// self
use crate::obs::{Operation, Outcome};

/// Records an operation outcome via the global metrics recorder (when enabled).
pub fn record_outcome(op: Operation, outcome: Outcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"copilot_broker_op_total",
			"op" => op.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (op, outcome);
	}
}

/// Records the outcome matching `result`.
pub fn record_result<T, E>(op: Operation, result: &Result<T, E>) {
	match result {
		Ok(_) => record_outcome(op, Outcome::Success),
		Err(_) => record_outcome(op, Outcome::Failure),
	}
}

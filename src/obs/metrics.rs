// std
use std::time::Duration as StdDuration;
// self
use crate::{
	_prelude::*,
	auth::TicketKey,
	obs::{FlowKind, FlowOutcome},
};

/// Records a flow outcome via the global metrics recorder (when enabled).
pub fn record_flow_outcome(kind: FlowKind, outcome: FlowOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"wsaa_broker_flow_total",
			"flow" => kind.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}

/// Records how long one signing or exchange stage took, labeled by its outcome.
pub fn record_stage_latency(kind: FlowKind, outcome: FlowOutcome, elapsed: StdDuration) {
	#[cfg(feature = "metrics")]
	{
		metrics::histogram!(
			"wsaa_broker_stage_seconds",
			"flow" => kind.as_str(),
			"outcome" => outcome.as_str()
		)
		.record(elapsed.as_secs_f64());
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome, elapsed);
	}
}

/// Publishes the expiration instant (unix seconds) of the ticket now cached under `key`.
pub fn record_ticket_expiration(key: &TicketKey, expiration: OffsetDateTime) {
	#[cfg(feature = "metrics")]
	{
		metrics::gauge!(
			"wsaa_broker_ticket_expiration_seconds",
			"service" => key.service.to_string(),
			"environment" => key.environment.as_str()
		)
		.set(expiration.unix_timestamp() as f64);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (key, expiration);
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;
	use crate::auth::ServiceId;

	#[test]
	fn recording_is_safe_without_a_recorder() {
		let service = ServiceId::new("wsfe").expect("Service fixture should be valid.");
		let key = TicketKey::new(&service, Environment::Testing);

		record_flow_outcome(FlowKind::Exchange, FlowOutcome::Failure);
		record_flow_outcome(FlowKind::TicketLookup, FlowOutcome::CacheHit);
		record_stage_latency(FlowKind::Signing, FlowOutcome::Success, StdDuration::from_millis(40));
		record_ticket_expiration(&key, macros::datetime!(2025-01-15 21:58 -3));
	}
}

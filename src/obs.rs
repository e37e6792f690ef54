//! Observability helpers for broker flows.
//!
//! Every flow stage runs inside a `wsaa_broker.flow` span carrying the `flow` and `stage` fields.
//! Credentials never appear in span fields or events; tickets are identified by the
//! [`TicketSecret::fingerprint`](crate::auth::TicketSecret::fingerprint) of their token.
//!
//! # Feature Flags
//!
//! - Enable `metrics` to increment the `wsaa_broker_flow_total` counter for every
//!   attempt, cache hit, success, and failure, labeled by `flow` + `outcome`. Signing and
//!   exchange stages also feed the `wsaa_broker_stage_seconds` histogram, and every newly cached
//!   ticket sets `wsaa_broker_ticket_expiration_seconds{service, environment}`.

mod metrics;
mod tracing;

pub use self::{metrics::*, tracing::*};

// self
use crate::_prelude::*;

/// Broker stages observed by spans and counters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowKind {
	/// Cache lookup and overall ticket acquisition.
	TicketLookup,
	/// Producing the CMS envelope.
	Signing,
	/// The `loginCms` call and response parsing.
	Exchange,
}
impl FlowKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowKind::TicketLookup => "ticket_lookup",
			FlowKind::Signing => "signing",
			FlowKind::Exchange => "exchange",
		}
	}
}
impl Display for FlowKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowOutcome {
	/// Entry to a broker stage.
	Attempt,
	/// A cached ticket satisfied the request.
	CacheHit,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl FlowOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			FlowOutcome::Attempt => "attempt",
			FlowOutcome::CacheHit => "cache_hit",
			FlowOutcome::Success => "success",
			FlowOutcome::Failure => "failure",
		}
	}
}
impl Display for FlowOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

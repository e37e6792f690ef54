// crates.io
use tracing::{Instrument, Span, field, instrument::Instrumented};
// self
use crate::{_prelude::*, auth::TicketKey, obs::FlowKind};

/// Span wrapper used by broker flows.
///
/// Spans carry `service` and `environment` fields when they are tied to a cache key, so the
/// signing and exchange stages of one issuance can be correlated with the lookup that caused it.
#[derive(Clone, Debug)]
pub struct FlowSpan {
	span: Span,
}
impl FlowSpan {
	/// Creates a new span tagged with the provided flow kind + stage.
	pub fn new(kind: FlowKind, stage: &'static str) -> Self {
		Self {
			span: tracing::info_span!(
				"wsaa_broker.flow",
				flow = kind.as_str(),
				stage,
				service = field::Empty,
				environment = field::Empty,
			),
		}
	}

	/// Creates a span for a stage working on behalf of `key`.
	pub fn for_key(kind: FlowKind, stage: &'static str, key: &TicketKey) -> Self {
		let this = Self::new(kind, stage);

		this.span.record("service", field::display(&key.service));
		this.span.record("environment", key.environment.as_str());

		this
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> Instrumented<Fut>
	where
		Fut: Future,
	{
		fut.instrument(self.span.clone())
	}
}

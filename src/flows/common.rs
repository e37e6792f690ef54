//! Shared helpers for flow implementations (cached-request state, guards).

// self
use crate::{
	_prelude::*,
	auth::{AccessTicket, ServiceId, TicketKey},
	flows::TicketBroker,
	http::TicketTransport,
};

/// Parameters for a ticket lookup that may be satisfied from the cache.
#[derive(Clone, Debug)]
pub struct TicketRequest {
	/// Service the ticket must grant access to.
	pub service: ServiceId,
	/// Environment the ticket must be issued in.
	pub environment: Environment,
	/// Bypasses the cache when true.
	pub force: bool,
	/// Minimum validity a returned ticket must still have.
	pub buffer_window: Duration,
}
impl TicketRequest {
	/// Default safety margin subtracted from the expiration instant.
	pub const DEFAULT_BUFFER_WINDOW: Duration = Duration::minutes(2);

	/// Creates a request for the provided service and environment.
	pub fn new(service: ServiceId, environment: Environment) -> Self {
		Self { service, environment, force: false, buffer_window: Self::DEFAULT_BUFFER_WINDOW }
	}

	/// Forces the broker to bypass cache checks.
	pub fn force_refresh(mut self) -> Self {
		self.force = true;

		self
	}

	/// Overrides the force flag.
	pub fn with_force(mut self, force: bool) -> Self {
		self.force = force;

		self
	}

	/// Overrides the buffer window (defaults to two minutes). Negative values clamp to zero.
	pub fn with_buffer_window(mut self, window: Duration) -> Self {
		self.buffer_window = if window.is_negative() { Duration::ZERO } else { window };

		self
	}

	/// Cache key for the request.
	pub fn key(&self) -> TicketKey {
		TicketKey::new(&self.service, self.environment)
	}

	/// Determines whether the cached ticket must be replaced.
	pub fn should_refresh(&self, ticket: &AccessTicket, now: OffsetDateTime) -> bool {
		self.force || !ticket.is_usable_at(now, self.buffer_window)
	}
}

/// Returns (and creates on demand) the singleflight guard for a ticket key.
pub(crate) fn flow_guard<T>(broker: &TicketBroker<T>, key: &TicketKey) -> Arc<AsyncMutex<()>>
where
	T: ?Sized + TicketTransport,
{
	let mut guards = broker.flow_guards.lock();

	guards.entry(key.clone()).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
}

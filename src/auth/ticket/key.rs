//! Cache key identifying one ticket lifecycle.

// self
use crate::{_prelude::*, auth::ServiceId};

/// Unique (service, environment) pair a stored ticket is filed under.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TicketKey {
	/// Downstream service the ticket grants access to.
	pub service: ServiceId,
	/// Environment the ticket was issued in.
	pub environment: Environment,
}
impl TicketKey {
	/// Builds a key for the provided service and environment.
	pub fn new(service: &ServiceId, environment: Environment) -> Self {
		Self { service: service.clone(), environment }
	}
}
impl Display for TicketKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "{}@{}", self.service, self.environment)
	}
}

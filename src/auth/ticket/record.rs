//! Immutable access ticket records, lifecycle helpers, and builders.

// self
use crate::{
	_prelude::*,
	auth::{ServiceId, TicketKey, TicketSecret},
};

/// Lifecycle status of a ticket relative to an instant and a buffer window.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TicketStatus {
	/// More than the buffer window of validity remains.
	Valid,
	/// Still unexpired, but inside the buffer window; callers must refresh.
	Expiring,
	/// The expiration instant has passed.
	Expired,
}

/// Errors produced by [`AccessTicketBuilder`].
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum TicketBuilderError {
	/// No token value was provided, or it was blank.
	#[error("Ticket token is required.")]
	MissingToken,
	/// No signature value was provided, or it was blank.
	#[error("Ticket signature is required.")]
	MissingSignature,
	/// A validity bound was not supplied.
	#[error("Ticket {0} is required.")]
	MissingTime(&'static str),
	/// The generation instant is not strictly before the expiration instant.
	#[error("Ticket generation time must precede its expiration time.")]
	InvertedValidity,
}

/// Credential pair issued by the identity service together with its validity window.
///
/// Records are never mutated after construction; a refresh stores a new record in place of the
/// old one.
#[derive(Clone, Serialize, Deserialize)]
pub struct AccessTicket {
	/// Service the ticket grants access to.
	pub service: ServiceId,
	/// Environment the ticket was issued in.
	pub environment: Environment,
	/// Opaque bearer credential.
	pub token: TicketSecret,
	/// Signature paired with the token; downstream services require both.
	pub signature: TicketSecret,
	/// Generation instant reported by the issuer.
	pub generation_time: OffsetDateTime,
	/// Expiration instant reported by the issuer; authoritative for validity.
	pub expiration_time: OffsetDateTime,
}
impl AccessTicket {
	/// Returns a builder for the provided service and environment.
	pub fn builder(service: ServiceId, environment: Environment) -> AccessTicketBuilder {
		AccessTicketBuilder::new(service, environment)
	}

	/// Cache key the ticket is filed under.
	pub fn key(&self) -> TicketKey {
		TicketKey::new(&self.service, self.environment)
	}

	/// Computes the lifecycle status at `instant`, treating the last `buffer` as expiring.
	pub fn status_at(&self, instant: OffsetDateTime, buffer: Duration) -> TicketStatus {
		if instant >= self.expiration_time {
			return TicketStatus::Expired;
		}
		if instant >= self.expiration_time - buffer {
			return TicketStatus::Expiring;
		}

		TicketStatus::Valid
	}

	/// Returns `true` if more than `buffer` of validity remains at `instant`.
	pub fn is_usable_at(&self, instant: OffsetDateTime, buffer: Duration) -> bool {
		matches!(self.status_at(instant, buffer), TicketStatus::Valid)
	}

	/// Remaining validity at `instant`, clamped at zero.
	pub fn remaining_at(&self, instant: OffsetDateTime) -> Duration {
		let remaining = self.expiration_time - instant;

		if remaining.is_negative() { Duration::ZERO } else { remaining }
	}
}
impl Debug for AccessTicket {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AccessTicket")
			.field("service", &self.service)
			.field("environment", &self.environment)
			.field("token", &"<redacted>")
			.field("signature", &"<redacted>")
			.field("generation_time", &self.generation_time)
			.field("expiration_time", &self.expiration_time)
			.finish()
	}
}

/// Builder for [`AccessTicket`].
#[derive(Clone, Debug)]
pub struct AccessTicketBuilder {
	service: ServiceId,
	environment: Environment,
	token: Option<TicketSecret>,
	signature: Option<TicketSecret>,
	generation_time: Option<OffsetDateTime>,
	expiration_time: Option<OffsetDateTime>,
}
impl AccessTicketBuilder {
	fn new(service: ServiceId, environment: Environment) -> Self {
		Self {
			service,
			environment,
			token: None,
			signature: None,
			generation_time: None,
			expiration_time: None,
		}
	}

	/// Provides the token value.
	pub fn token(mut self, token: impl Into<String>) -> Self {
		self.token = Some(TicketSecret::new(token));

		self
	}

	/// Provides the signature value.
	pub fn signature(mut self, signature: impl Into<String>) -> Self {
		self.signature = Some(TicketSecret::new(signature));

		self
	}

	/// Sets the generation instant.
	pub fn generation_time(mut self, instant: OffsetDateTime) -> Self {
		self.generation_time = Some(instant);

		self
	}

	/// Sets the expiration instant.
	pub fn expiration_time(mut self, instant: OffsetDateTime) -> Self {
		self.expiration_time = Some(instant);

		self
	}

	/// Consumes the builder and produces an [`AccessTicket`].
	pub fn build(self) -> Result<AccessTicket, TicketBuilderError> {
		let token =
			self.token.filter(|value| !value.is_blank()).ok_or(TicketBuilderError::MissingToken)?;
		let signature = self
			.signature
			.filter(|value| !value.is_blank())
			.ok_or(TicketBuilderError::MissingSignature)?;
		let generation_time =
			self.generation_time.ok_or(TicketBuilderError::MissingTime("generation time"))?;
		let expiration_time =
			self.expiration_time.ok_or(TicketBuilderError::MissingTime("expiration time"))?;

		if generation_time >= expiration_time {
			return Err(TicketBuilderError::InvertedValidity);
		}

		Ok(AccessTicket {
			service: self.service,
			environment: self.environment,
			token,
			signature,
			generation_time,
			expiration_time,
		})
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	fn service() -> ServiceId {
		ServiceId::new("wsfe").expect("Service fixture should be valid.")
	}

	#[test]
	fn status_transitions_cover_all_states() {
		let ticket = AccessTicket::builder(service(), Environment::Testing)
			.token("token")
			.signature("sign")
			.generation_time(macros::datetime!(2025-01-01 00:00 -3))
			.expiration_time(macros::datetime!(2025-01-01 12:00 -3))
			.build()
			.expect("Ticket builder should succeed for status transitions.");
		let buffer = Duration::minutes(2);

		assert_eq!(
			ticket.status_at(macros::datetime!(2025-01-01 11:57 -3), buffer),
			TicketStatus::Valid
		);
		assert_eq!(
			ticket.status_at(macros::datetime!(2025-01-01 11:58 -3), buffer),
			TicketStatus::Expiring
		);
		assert_eq!(
			ticket.status_at(macros::datetime!(2025-01-01 12:00 -3), buffer),
			TicketStatus::Expired
		);
		assert_eq!(ticket.remaining_at(macros::datetime!(2025-01-01 13:00 -3)), Duration::ZERO);
	}

	#[test]
	fn builder_requires_paired_credentials() {
		let base = AccessTicket::builder(service(), Environment::Production)
			.generation_time(macros::datetime!(2025-01-01 00:00 UTC))
			.expiration_time(macros::datetime!(2025-01-01 12:00 UTC));

		assert_eq!(
			base.clone().signature("sign").build().map(|_| ()),
			Err(TicketBuilderError::MissingToken)
		);
		assert_eq!(
			base.clone().token("token").signature(" ").build().map(|_| ()),
			Err(TicketBuilderError::MissingSignature)
		);
		assert!(base.token("token").signature("sign").build().is_ok());
	}

	#[test]
	fn builder_rejects_inverted_window() {
		let err = AccessTicket::builder(service(), Environment::Testing)
			.token("token")
			.signature("sign")
			.generation_time(macros::datetime!(2025-01-01 12:00 UTC))
			.expiration_time(macros::datetime!(2025-01-01 12:00 UTC))
			.build()
			.expect_err("Equal bounds must be rejected.");

		assert_eq!(err, TicketBuilderError::InvertedValidity);
	}

	#[test]
	fn debug_output_redacts_credentials() {
		let ticket = AccessTicket::builder(service(), Environment::Testing)
			.token("very-secret-token")
			.signature("very-secret-sign")
			.generation_time(macros::datetime!(2025-01-01 00:00 UTC))
			.expiration_time(macros::datetime!(2025-01-01 12:00 UTC))
			.build()
			.expect("Ticket builder should succeed.");
		let rendered = format!("{ticket:?}");

		assert!(!rendered.contains("very-secret"));
		assert_eq!(ticket.key().to_string(), "wsfe@testing");
	}
}

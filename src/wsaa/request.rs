//! Login ticket request (TRA) construction and serialization.

// std
use std::sync::atomic::{AtomicU32, Ordering};
// crates.io
use quick_xml::escape;
use time::{UtcOffset, format_description::BorrowedFormatItem, macros};
// self
use crate::{_prelude::*, auth::ServiceId};

static PROCESS_UNIQUE_IDS: UniqueIdSource = UniqueIdSource::new();

const WIRE_TIMESTAMP: &[BorrowedFormatItem<'static>] = macros::format_description!(
	"[year]-[month]-[day]T[hour]:[minute]:[second][offset_hour sign:mandatory]:[offset_minute]"
);

/// Timing policy applied to every access request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RequestPolicy {
	/// Subtracted from "now" so an issuer whose clock runs ahead never sees a future request.
	pub skew: Duration,
	/// Requested lifetime, counted from the generation time.
	pub lifetime: Duration,
	/// Offset the wire timestamps are rendered in.
	pub utc_offset: UtcOffset,
}
impl RequestPolicy {
	/// Default skew guard.
	pub const DEFAULT_SKEW: Duration = Duration::minutes(2);
	/// Issuer's maximum ticket lifetime.
	pub const DEFAULT_LIFETIME: Duration = Duration::hours(12);
	/// Issuer's local offset (UTC−03:00).
	pub const DEFAULT_OFFSET: UtcOffset = macros::offset!(-3);

	/// Overrides the skew guard. Negative values are clamped to zero.
	pub fn with_skew(mut self, skew: Duration) -> Self {
		self.skew = if skew.is_negative() { Duration::ZERO } else { skew };

		self
	}

	/// Overrides the requested lifetime.
	pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
		self.lifetime = lifetime;

		self
	}

	/// Overrides the offset used on the wire.
	pub fn with_utc_offset(mut self, offset: UtcOffset) -> Self {
		self.utc_offset = offset;

		self
	}
}
impl Default for RequestPolicy {
	fn default() -> Self {
		Self {
			skew: Self::DEFAULT_SKEW,
			lifetime: Self::DEFAULT_LIFETIME,
			utc_offset: Self::DEFAULT_OFFSET,
		}
	}
}

/// Source of request identifiers.
///
/// Identifiers track the clock in whole seconds but never repeat: a second request within the
/// same second receives `last + 1`. Every builder draws from [`UniqueIdSource::process`], so
/// brokers sharing a process never collide.
#[derive(Debug, Default)]
pub struct UniqueIdSource(AtomicU32);
impl UniqueIdSource {
	/// Creates a source that has not handed out any identifier yet.
	pub const fn new() -> Self {
		Self(AtomicU32::new(0))
	}

	/// The source shared by every builder in this process.
	pub fn process() -> &'static Self {
		&PROCESS_UNIQUE_IDS
	}

	/// Returns the next identifier for a request generated at `now`.
	pub fn next(&self, now: OffsetDateTime) -> u32 {
		let candidate = u32::try_from(now.unix_timestamp().max(0)).unwrap_or(u32::MAX);
		let advance = |last: u32| candidate.max(last.saturating_add(1));
		let previous = match self.0.fetch_update(Ordering::AcqRel, Ordering::Acquire, |last| {
			Some(advance(last))
		}) {
			Ok(previous) | Err(previous) => previous,
		};

		advance(previous)
	}
}

/// Time-bounded request for access to a named service.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccessRequest {
	/// Identifier unique per request.
	pub unique_id: u32,
	/// Generation instant, already shifted back by the skew guard.
	pub generation_time: OffsetDateTime,
	/// Expiration instant.
	pub expiration_time: OffsetDateTime,
	/// Target service.
	pub service: ServiceId,
}
impl AccessRequest {
	/// Serializes the request into the `loginTicketRequest` document.
	pub fn to_xml(&self) -> String {
		format!(
			"<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
			 <loginTicketRequest version=\"1.0\">\n\
			 \x20 <header>\n\
			 \x20   <uniqueId>{}</uniqueId>\n\
			 \x20   <generationTime>{}</generationTime>\n\
			 \x20   <expirationTime>{}</expirationTime>\n\
			 \x20 </header>\n\
			 \x20 <service>{}</service>\n\
			 </loginTicketRequest>",
			self.unique_id,
			format_wire_timestamp(self.generation_time),
			format_wire_timestamp(self.expiration_time),
			escape::escape(self.service.as_ref()),
		)
	}
}

/// Builds [`AccessRequest`] values under a [`RequestPolicy`].
#[derive(Clone, Debug)]
pub struct AccessRequestBuilder {
	policy: RequestPolicy,
	unique_ids: &'static UniqueIdSource,
}
impl AccessRequestBuilder {
	/// Creates a builder with the provided policy drawing from the process-wide identifiers.
	pub fn new(policy: RequestPolicy) -> Self {
		Self { policy, unique_ids: UniqueIdSource::process() }
	}

	/// Returns the policy in force.
	pub fn policy(&self) -> &RequestPolicy {
		&self.policy
	}

	/// Builds a request for `service` as of `now`.
	pub fn build(&self, service: &ServiceId, now: OffsetDateTime) -> AccessRequest {
		let generation_time = (now - self.policy.skew).to_offset(self.policy.utc_offset);
		let expiration_time = generation_time + self.policy.lifetime;

		AccessRequest {
			unique_id: self.unique_ids.next(now),
			generation_time,
			expiration_time,
			service: service.clone(),
		}
	}
}

impl Default for AccessRequestBuilder {
	fn default() -> Self {
		Self::new(RequestPolicy::default())
	}
}

/// Renders an instant as `YYYY-MM-DDTHH:MM:SS±HH:MM` in its own offset.
pub fn format_wire_timestamp(instant: OffsetDateTime) -> String {
	// The layout only contains numeric components, which always format.
	instant.format(WIRE_TIMESTAMP).unwrap_or_default()
}

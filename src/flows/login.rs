//! Ticket lookup and issuance with caching + singleflight guards.
//!
//! [`TicketBroker::get_ticket`] returns the cached ticket for a (service, environment) key while
//! more than the buffer window of validity remains. Otherwise it builds a login request, signs
//! it, exchanges it through `loginCms`, parses the issued ticket, and replaces the cached entry.
//! A per-key guard makes concurrent callers piggy-back on a single in-flight issuance, which
//! matters because the issuer refuses a second ticket while the first one is still valid.

mod metrics;

pub use self::metrics::LoginMetrics;

// std
use std::time::Instant;
// self
use crate::{
	_prelude::*,
	auth::{AccessTicket, ServiceId, TicketKey, TicketStatus},
	error::ResponseError,
	flows::{TicketBroker, TicketRequest, common},
	http::TicketTransport,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	sign::SigningProvider,
	store::TicketStore,
	wsaa,
};

/// Non-secret view of a cached ticket for diagnostics.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CachedTicketInfo {
	/// Cache key the ticket is filed under.
	pub key: TicketKey,
	/// Issuer-reported expiration instant.
	pub expiration_time: OffsetDateTime,
	/// Status relative to the default buffer window at snapshot time.
	pub status: TicketStatus,
	/// Short fingerprint of the token, safe to log.
	pub token_fingerprint: String,
}

impl<T> TicketBroker<T>
where
	T: ?Sized + TicketTransport,
{
	/// Returns a ticket for `service` in `environment` with at least two minutes of validity.
	pub async fn get_ticket(
		&self,
		service: &ServiceId,
		environment: Environment,
	) -> Result<AccessTicket> {
		self.ticket(TicketRequest::new(service.clone(), environment)).await
	}

	/// Returns a ticket satisfying `request`, issuing a new one when the cache cannot.
	///
	/// On failure the cache is left untouched and the error of the failing stage is returned.
	pub async fn ticket(&self, request: TicketRequest) -> Result<AccessTicket> {
		const KIND: FlowKind = FlowKind::TicketLookup;

		let key = request.key();
		let span = FlowSpan::for_key(KIND, "ticket", &key);

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);
		self.login_metrics.record_attempt();

		let result: Result<AccessTicket> = span
			.instrument(async {
				let guard = common::flow_guard(self, &key);
				let _singleflight = guard.lock().await;
				let now = OffsetDateTime::now_utc();

				if let Some(current) = <dyn TicketStore>::fetch(self.store.as_ref(), &key)
					.await?
					.filter(|ticket| !request.should_refresh(ticket, now))
				{
					obs::record_flow_outcome(KIND, FlowOutcome::CacheHit);
					self.login_metrics.record_cache_hit();
					tracing::debug!(
						%key,
						token = %current.token.fingerprint(),
						remaining = %current.remaining_at(now),
						"reusing cached ticket"
					);

					return Ok(current);
				}

				let ticket = self.issue(&request, &key).await?;

				<dyn TicketStore>::save(self.store.as_ref(), ticket.clone()).await?;
				self.login_metrics.record_issued();
				obs::record_ticket_expiration(&key, ticket.expiration_time);
				tracing::info!(
					%key,
					token = %ticket.token.fingerprint(),
					expiration = %ticket.expiration_time,
					"stored new ticket"
				);

				Ok(ticket)
			})
			.await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(err) => {
				obs::record_flow_outcome(KIND, FlowOutcome::Failure);
				self.login_metrics.record_failure();
				tracing::warn!(
					%key,
					retryable = err.is_retryable(),
					error = %err,
					"ticket lookup failed"
				);
			},
		}

		result
	}

	/// Drops the cached ticket for one key so the next lookup issues a new one.
	pub async fn invalidate(
		&self,
		service: &ServiceId,
		environment: Environment,
	) -> Result<Option<AccessTicket>> {
		let key = TicketKey::new(service, environment);
		let guard = common::flow_guard(self, &key);
		let _singleflight = guard.lock().await;

		Ok(<dyn TicketStore>::remove(self.store.as_ref(), &key).await?)
	}

	/// Drops every cached ticket.
	pub async fn clear_cache(&self) -> Result<()> {
		<dyn TicketStore>::clear(self.store.as_ref()).await?;
		tracing::info!("cleared ticket cache");

		Ok(())
	}

	/// Snapshot of the cache contents without credentials, ordered by key.
	pub async fn cached_tickets(&self) -> Result<Vec<CachedTicketInfo>> {
		let now = OffsetDateTime::now_utc();
		let mut entries: Vec<_> = <dyn TicketStore>::entries(self.store.as_ref())
			.await?
			.into_iter()
			.map(|ticket| CachedTicketInfo {
				key: ticket.key(),
				expiration_time: ticket.expiration_time,
				status: ticket.status_at(now, TicketRequest::DEFAULT_BUFFER_WINDOW),
				token_fingerprint: ticket.token.fingerprint(),
			})
			.collect();

		entries.sort_by(|a, b| {
			(a.key.service.as_ref(), a.key.environment)
				.cmp(&(b.key.service.as_ref(), b.key.environment))
		});

		Ok(entries)
	}

	async fn issue(&self, request: &TicketRequest, key: &TicketKey) -> Result<AccessTicket> {
		let profile = self.config.profile(request.environment)?;
		let material = profile.signing_material();

		material.ensure_readable().await?;

		let access_request = self.requests.build(&request.service, OffsetDateTime::now_utc());
		let payload = access_request.to_xml();

		tracing::debug!(
			service = %request.service,
			environment = %request.environment,
			unique_id = access_request.unique_id,
			"built login request"
		);

		let envelope = observe(
			FlowSpan::for_key(FlowKind::Signing, "sign", key),
			FlowKind::Signing,
			<dyn SigningProvider>::sign(self.signer.as_ref(), payload.as_bytes(), &material),
		)
		.await?;
		let exchange_span = FlowSpan::for_key(FlowKind::Exchange, "login_cms", key);
		let raw = observe(exchange_span, FlowKind::Exchange, async {
			self.transport.login_cms(&profile.endpoint, envelope).await.map_err(|err| {
				if err.is_already_authenticated() {
					tracing::warn!(
						%key,
						"issuer still holds a valid ticket for this service; \
						 persist tickets to reuse it"
					);
				}

				Error::from(err)
			})
		})
		.await?;
		let ticket = wsaa::parse_ticket_response(&raw, &request.service, request.environment)?;

		if !ticket.is_usable_at(OffsetDateTime::now_utc(), request.buffer_window) {
			return Err(ResponseError::ExpiresTooSoon { expiration: ticket.expiration_time }.into());
		}

		Ok(ticket)
	}
}

async fn observe<Fut, V>(span: FlowSpan, kind: FlowKind, fut: Fut) -> Result<V>
where
	Fut: Future<Output = Result<V>>,
{
	obs::record_flow_outcome(kind, FlowOutcome::Attempt);

	let started = Instant::now();
	let result = span.instrument(fut).await;
	let outcome = if result.is_ok() { FlowOutcome::Success } else { FlowOutcome::Failure };

	obs::record_flow_outcome(kind, outcome);
	obs::record_stage_latency(kind, outcome, started.elapsed());

	result
}

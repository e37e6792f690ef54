//! Ticket acquisition orchestrated by the broker facade.

pub mod common;
pub mod login;

pub use common::*;
pub use login::*;

// self
use crate::{
	_prelude::*,
	auth::TicketKey,
	config::ConfigProvider,
	http::TicketTransport,
	sign::SigningProvider,
	store::TicketStore,
	wsaa::{AccessRequestBuilder, RequestPolicy},
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;

#[cfg(feature = "reqwest")]
/// Broker specialized for the crate's default reqwest transport.
pub type ReqwestBroker = TicketBroker<ReqwestTransport>;

/// Hands out WSAA access tickets, reusing cached ones until they approach expiry.
///
/// The broker owns the ticket store, configuration provider, signer, and transport so the login
/// flow can focus on the build, sign, exchange, parse sequence. Cache misses for the same
/// (service, environment) key are serialized so concurrent callers share one issuance.
#[derive(Clone)]
pub struct TicketBroker<T>
where
	T: ?Sized + TicketTransport,
{
	/// Transport used for every `loginCms` call.
	pub transport: Arc<T>,
	/// Ticket cache.
	pub store: Arc<dyn TicketStore>,
	/// Per-environment endpoints and credentials.
	pub config: Arc<dyn ConfigProvider>,
	/// Produces CMS envelopes over login requests.
	pub signer: Arc<dyn SigningProvider>,
	/// In-process counters for login outcomes.
	pub login_metrics: Arc<LoginMetrics>,
	requests: AccessRequestBuilder,
	flow_guards: Arc<Mutex<HashMap<TicketKey, Arc<AsyncMutex<()>>>>>,
}
impl<T> TicketBroker<T>
where
	T: ?Sized + TicketTransport,
{
	/// Creates a broker that reuses the caller-provided transport.
	pub fn with_transport(
		store: Arc<dyn TicketStore>,
		config: Arc<dyn ConfigProvider>,
		signer: Arc<dyn SigningProvider>,
		transport: impl Into<Arc<T>>,
	) -> Self {
		Self {
			transport: transport.into(),
			store,
			config,
			signer,
			login_metrics: Default::default(),
			requests: Default::default(),
			flow_guards: Default::default(),
		}
	}

	/// Replaces the clock skew, lifetime, and offset policy applied to login requests.
	pub fn with_request_policy(mut self, policy: RequestPolicy) -> Self {
		self.requests = AccessRequestBuilder::new(policy);

		self
	}

	/// Policy applied to login requests.
	pub fn request_policy(&self) -> &RequestPolicy {
		self.requests.policy()
	}
}
#[cfg(feature = "reqwest")]
impl TicketBroker<ReqwestTransport> {
	/// Creates a broker backed by the default reqwest transport (30 second deadline).
	pub fn new(
		store: Arc<dyn TicketStore>,
		config: Arc<dyn ConfigProvider>,
		signer: Arc<dyn SigningProvider>,
	) -> Self {
		Self::with_transport(store, config, signer, ReqwestTransport::default())
	}
}
impl<T> Debug for TicketBroker<T>
where
	T: ?Sized + TicketTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TicketBroker")
			.field("request_policy", self.requests.policy())
			.field("in_flight_keys", &self.flow_guards.lock().len())
			.finish()
	}
}

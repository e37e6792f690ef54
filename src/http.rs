//! Transport primitives for the `loginCms` exchange.
//!
//! The broker depends only on [`TicketTransport`]; [`ReqwestTransport`] is the default
//! implementation. A transport performs exactly one call per exchange and never retries.

// self
use crate::{
	_prelude::*,
	error::TransportError,
	sign::SignedEnvelope,
	wsaa::{login_cms_request, parse_login_cms_response},
};

/// Boxed future returned by [`TicketTransport::login_cms`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<String, TransportError>> + 'a + Send>>;

/// Delivers a signed envelope to the identity service and returns the raw ticket document.
pub trait TicketTransport
where
	Self: 'static + Send + Sync,
{
	/// Sends `envelope` to `endpoint` and returns the `loginCmsReturn` payload.
	///
	/// Dropping the returned future cancels the call.
	fn login_cms<'a>(&'a self, endpoint: &'a Url, envelope: SignedEnvelope)
	-> TransportFuture<'a>;
}

/// Captures metadata from the most recent HTTP response for diagnostics.
#[derive(Clone, Debug, Default)]
pub struct ResponseMetadata {
	/// HTTP status code returned by the identity service, if available.
	pub status: Option<u16>,
}

/// Thin wrapper around [`ReqwestClient`] that speaks SOAP to the WSAA endpoint.
///
/// Every request carries a fixed deadline (30 seconds unless overridden), independent of any
/// timeout configured on the wrapped client.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
	client: ReqwestClient,
	timeout: std::time::Duration,
	last_response: Arc<Mutex<Option<ResponseMetadata>>>,
}
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Default per-request deadline.
	pub const DEFAULT_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);
	const BODY_PREVIEW_LIMIT: usize = 256;

	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self { client, timeout: Self::DEFAULT_TIMEOUT, last_response: Default::default() }
	}

	/// Overrides the per-request deadline.
	pub fn with_timeout(mut self, timeout: std::time::Duration) -> Self {
		self.timeout = timeout;

		self
	}

	/// Metadata captured from the most recent response, if any.
	pub fn last_response(&self) -> Option<ResponseMetadata> {
		self.last_response.lock().clone()
	}

	async fn exchange(
		&self,
		endpoint: &Url,
		envelope: SignedEnvelope,
	) -> Result<String, TransportError> {
		let body = login_cms_request(envelope.as_str());

		drop(envelope);
		self.last_response.lock().take();
		tracing::info!(%endpoint, "calling loginCms");

		let response = self
			.client
			.post(endpoint.clone())
			.timeout(self.timeout)
			.header(reqwest::header::CONTENT_TYPE, "text/xml; charset=utf-8")
			.header("SOAPAction", "\"\"")
			.body(body)
			.send()
			.await?;
		let status = response.status();

		*self.last_response.lock() = Some(ResponseMetadata { status: Some(status.as_u16()) });

		let text = response.text().await?;

		match parse_login_cms_response(&text) {
			Ok(payload) => {
				if !status.is_success() {
					tracing::warn!(
						status = status.as_u16(),
						"loginCms returned a payload with a non-success status"
					);
				}

				Ok(payload)
			},
			Err(TransportError::MalformedEnvelope { .. }) if !status.is_success() =>
				Err(TransportError::HttpStatus {
					status: status.as_u16(),
					body_preview: preview(&text, Self::BODY_PREVIEW_LIMIT),
				}),
			Err(err) => Err(err),
		}
	}
}
#[cfg(feature = "reqwest")]
impl Default for ReqwestTransport {
	fn default() -> Self {
		Self::with_client(ReqwestClient::default())
	}
}
#[cfg(feature = "reqwest")]
impl TicketTransport for ReqwestTransport {
	fn login_cms<'a>(
		&'a self,
		endpoint: &'a Url,
		envelope: SignedEnvelope,
	) -> TransportFuture<'a> {
		Box::pin(self.exchange(endpoint, envelope))
	}
}

#[cfg(feature = "reqwest")]
fn preview(text: &str, limit: usize) -> String {
	let trimmed = text.trim();

	match trimmed.char_indices().nth(limit) {
		Some((end, _)) => format!("{}…", &trimmed[..end]),
		None => trimmed.to_owned(),
	}
}

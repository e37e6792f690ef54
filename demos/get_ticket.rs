//! Demonstrates obtaining and reusing a WSAA ticket with the reqwest transport, an
//! in-memory cache, and a mock `LoginCms` endpoint standing in for the homologation service.
//!
//! The signer below returns a canned envelope; production code uses
//! [`OpensslCmsSigner`](wsaa_broker::sign::OpensslCmsSigner) with real credentials.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use quick_xml::escape;
use time::{Duration, OffsetDateTime, format_description::well_known::Rfc3339};
use url::Url;
// self
use wsaa_broker::{
	auth::{Cuit, Environment, ServiceId},
	config::{EnvironmentProfile, StaticConfig},
	ext::WsAuth,
	flows::TicketBroker,
	http::ReqwestTransport,
	reqwest::Client,
	sign::{SignFuture, SignedEnvelope, SigningMaterial, SigningProvider},
	store::{MemoryStore, TicketStore},
};

struct CannedSigner;
impl SigningProvider for CannedSigner {
	fn sign<'a>(&'a self, _payload: &'a [u8], material: &'a SigningMaterial) -> SignFuture<'a> {
		Box::pin(async move {
			material.ensure_readable().await?;

			Ok(SignedEnvelope::new("TUlJQ01TREVNTw=="))
		})
	}
}

fn login_cms_body() -> Result<String> {
	let generation = OffsetDateTime::now_utc() - Duration::minutes(2);
	let expiration = generation + Duration::hours(12);
	let ticket = format!(
		"<loginTicketResponse version=\"1.0\"><header><uniqueId>1</uniqueId>\
		 <generationTime>{}</generationTime><expirationTime>{}</expirationTime></header>\
		 <credentials><token>demo-token</token><sign>demo-sign</sign></credentials>\
		 </loginTicketResponse>",
		generation.format(&Rfc3339)?,
		expiration.format(&Rfc3339)?,
	);

	Ok(format!(
		"<soapenv:Envelope xmlns:soapenv=\"http://schemas.xmlsoap.org/soap/envelope/\">\
		 <soapenv:Body><loginCmsResponse><loginCmsReturn>{}</loginCmsReturn></loginCmsResponse>\
		 </soapenv:Body></soapenv:Envelope>",
		escape::escape(&ticket)
	))
}

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let credentials = tempfile::tempdir()?;
	let certificate = credentials.path().join("demo.crt");
	let key = credentials.path().join("demo.key");

	std::fs::write(&certificate, "demo certificate")?;
	std::fs::write(&key, "demo key")?;

	let body = login_cms_body()?;
	let server = MockServer::start_async().await;
	let login_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/ws/services/LoginCms");
			then.status(200).header("content-type", "text/xml").body(body);
		})
		.await;
	let config = StaticConfig::builder()
		.profile(
			Environment::Testing,
			EnvironmentProfile::new(
				Url::parse(&server.url("/ws/services/LoginCms"))?,
				&certificate,
				&key,
			),
		)
		.build();
	let store: Arc<dyn TicketStore> = Arc::new(MemoryStore::default());
	let transport = ReqwestTransport::with_client(
		Client::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()?,
	);
	let broker = <TicketBroker<ReqwestTransport>>::with_transport(
		store,
		Arc::new(config),
		Arc::new(CannedSigner),
		transport,
	);
	let service = ServiceId::new("wsfe")?;
	let first = broker.get_ticket(&service, Environment::Testing).await?;
	let second = broker.get_ticket(&service, Environment::Testing).await?;

	println!("first ticket: {first:?}");
	println!("reused ticket expires at {}", second.expiration_time);
	println!("loginCms calls: {}", login_mock.calls_async().await);

	for entry in broker.cached_tickets().await? {
		println!("cached {} ({:?}, token {})", entry.key, entry.status, entry.token_fingerprint);
	}

	let auth = WsAuth::from_ticket(&first, Cuit::new("20123456789")?);

	println!("{}", auth.to_soap_fragment(Some("ar")));

	Ok(())
}

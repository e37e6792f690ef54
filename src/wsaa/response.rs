//! Login ticket response (TA) parsing.

// crates.io
use time::format_description::well_known::Rfc3339;
// self
use crate::{
	_prelude::*,
	auth::{AccessTicket, ServiceId},
	error::ResponseError,
};

#[derive(Debug, Deserialize)]
struct LoginTicketResponse {
	header: Option<ResponseHeader>,
	credentials: Option<ResponseCredentials>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponseHeader {
	source: Option<String>,
	destination: Option<String>,
	unique_id: Option<String>,
	generation_time: Option<String>,
	expiration_time: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseCredentials {
	token: Option<String>,
	sign: Option<String>,
}

/// Parses a `loginTicketResponse` document into an [`AccessTicket`] for `service`.
pub fn parse_ticket_response(
	raw: &str,
	service: &ServiceId,
	environment: Environment,
) -> Result<AccessTicket, ResponseError> {
	let document: LoginTicketResponse = quick_xml::de::from_str(raw)
		.map_err(|e| ResponseError::Malformed { message: e.to_string() })?;
	let header = document.header.ok_or(ResponseError::MissingSection { section: "header" })?;
	let credentials =
		document.credentials.ok_or(ResponseError::MissingSection { section: "credentials" })?;

	tracing::debug!(
		source = header.source.as_deref().unwrap_or_default(),
		destination = header.destination.as_deref().unwrap_or_default(),
		unique_id = header.unique_id.as_deref().unwrap_or_default(),
		"parsed ticket response header"
	);

	let mut builder = AccessTicket::builder(service.clone(), environment);

	if let Some(token) = credentials.token {
		builder = builder.token(token);
	}
	if let Some(sign) = credentials.sign {
		builder = builder.signature(sign);
	}
	if let Some(raw) = header.generation_time.as_deref() {
		builder = builder.generation_time(parse_timestamp("generationTime", raw)?);
	}
	if let Some(raw) = header.expiration_time.as_deref() {
		builder = builder.expiration_time(parse_timestamp("expirationTime", raw)?);
	}

	Ok(builder.build()?)
}

fn parse_timestamp(field: &'static str, raw: &str) -> Result<OffsetDateTime, ResponseError> {
	OffsetDateTime::parse(raw.trim(), &Rfc3339)
		.map_err(|source| ResponseError::InvalidTimestamp { field, source })
}

//! The `<Auth>` credential block shared by the downstream web services.

// crates.io
use quick_xml::escape;
// self
use crate::{
	_prelude::*,
	auth::{AccessTicket, Cuit, TicketSecret},
	ext::AttachTicketExt,
};

/// Token, signature, and issuer CUIT as sent in every downstream call.
///
/// `Debug` output keeps the credentials redacted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WsAuth {
	/// Ticket token.
	pub token: TicketSecret,
	/// Ticket signature.
	pub sign: TicketSecret,
	/// Taxpayer the ticket was issued to.
	pub cuit: Cuit,
}
impl WsAuth {
	/// Bundles a ticket with the issuer CUIT.
	pub fn from_ticket(ticket: &AccessTicket, cuit: Cuit) -> Self {
		Self { token: ticket.token.clone(), sign: ticket.signature.clone(), cuit }
	}

	/// Renders `<Auth><Token/><Sign/><Cuit/></Auth>`, optionally with a namespace prefix on every
	/// element (e.g. `ar` for `<ar:Auth>`).
	pub fn to_soap_fragment(&self, prefix: Option<&str>) -> String {
		let p = prefix.map(|p| format!("{p}:")).unwrap_or_default();

		format!(
			"<{p}Auth><{p}Token>{}</{p}Token><{p}Sign>{}</{p}Sign><{p}Cuit>{}</{p}Cuit></{p}Auth>",
			escape::escape(self.token.expose()),
			escape::escape(self.sign.expose()),
			self.cuit,
		)
	}
}

/// Splices the `<Auth>` block into a SOAP body at an `{{auth}}` placeholder.
#[derive(Clone, Debug)]
pub struct AuthPlaceholder {
	cuit: Cuit,
	prefix: Option<String>,
}
impl AuthPlaceholder {
	/// Placeholder text replaced by the rendered block.
	pub const MARKER: &'static str = "{{auth}}";

	/// Creates an attacher for the given issuer.
	pub fn new(cuit: Cuit) -> Self {
		Self { cuit, prefix: None }
	}

	/// Sets the namespace prefix used for the rendered elements.
	pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.prefix = Some(prefix.into());

		self
	}
}
impl AttachTicketExt<String, MissingAuthPlaceholder> for AuthPlaceholder {
	fn attach_ticket(
		&self,
		request: String,
		ticket: &AccessTicket,
	) -> Result<String, MissingAuthPlaceholder> {
		if !request.contains(Self::MARKER) {
			return Err(MissingAuthPlaceholder);
		}

		let auth = WsAuth::from_ticket(ticket, self.cuit.clone());

		Ok(request.replacen(Self::MARKER, &auth.to_soap_fragment(self.prefix.as_deref()), 1))
	}
}

/// Returned when a request body has no `{{auth}}` placeholder.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ThisError)]
#[error("Request body has no `{{{{auth}}}}` placeholder.")]
pub struct MissingAuthPlaceholder;

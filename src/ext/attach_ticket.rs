//! Contract for attaching broker-issued tickets to arbitrary downstream requests.

// self
use crate::auth::AccessTicket;

/// Describes how to attach an [`AccessTicket`] to an outbound request without constraining the
/// client type.
///
/// Generic over both the request and error types so implementers can target a SOAP builder, a
/// generated client, or a raw XML string.
pub trait AttachTicketExt<Request, Error>
where
	Self: Send + Sync,
{
	/// Consumes the provided request and injects the ticket's token and signature.
	fn attach_ticket(&self, request: Request, ticket: &AccessTicket) -> Result<Request, Error>;
}

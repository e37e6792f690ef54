//! Helpers for handing issued tickets to downstream services.
//!
//! The broker stops at issuing tickets; [`WsAuth`] renders the credential block the downstream
//! SOAP services expect, and [`AttachTicketExt`] lets callers plug tickets into whatever request
//! type their client uses.

pub mod attach_ticket;
pub mod ws_auth;

pub use attach_ticket::*;
pub use ws_auth::*;

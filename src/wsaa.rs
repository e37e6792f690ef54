//! WSAA wire contracts: the login ticket request (TRA), the login ticket response (TA), and the
//! SOAP `loginCms` envelope that carries them.
//!
//! Element names, their order, and the timestamp layout are fixed by the issuer and reproduced
//! verbatim here.

pub mod request;
pub mod response;
pub mod soap;

pub use request::*;
pub use response::*;
pub use soap::*;

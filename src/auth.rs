//! Auth-domain identifiers, environments, and access ticket models.

pub mod environment;
pub mod id;
pub mod ticket;

pub use environment::*;
pub use id::*;
pub use ticket::{key::*, record::*, secret::*};

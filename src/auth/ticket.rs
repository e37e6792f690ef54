//! Access tickets issued by the identity service and the keys that index them.

pub mod key;
pub mod record;
pub mod secret;

//! Issuer environments; every lookup and cache key is scoped by one.

// self
use crate::_prelude::*;

/// Identity-service environment a ticket was issued in.
///
/// Endpoints and trust anchors differ per environment, so tickets are never shared across them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
	/// Homologation environment used for integration testing.
	#[default]
	Testing,
	/// Production environment.
	Production,
}
impl Environment {
	/// Every known environment, in a stable order.
	pub const ALL: [Environment; 2] = [Environment::Testing, Environment::Production];

	/// Returns a stable label suitable for span fields and config keys.
	pub const fn as_str(self) -> &'static str {
		match self {
			Environment::Testing => "testing",
			Environment::Production => "production",
		}
	}
}
impl Display for Environment {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for Environment {
	type Err = UnknownEnvironment;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"testing" | "homologation" | "homo" => Ok(Environment::Testing),
			"production" | "prod" => Ok(Environment::Production),
			_ => Err(UnknownEnvironment(s.to_owned())),
		}
	}
}

/// Error returned when an environment label is not recognized.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("Unknown environment `{0}`; expected `testing` or `production`.")]
pub struct UnknownEnvironment(pub String);

//! Per-environment configuration consumed by the broker.
//!
//! The broker never reads process environment variables itself; it asks a [`ConfigProvider`]
//! for the profile of the environment a caller requested. [`StaticConfig`] is the bundled
//! provider and can be assembled programmatically, from `ARCA_*` variables, or from a JSON file.

// std
use std::collections::BTreeMap;
// self
use crate::{
	_prelude::*,
	auth::{Cuit, TicketSecret},
	error::ConfigError,
	sign::SigningMaterial,
};

/// Well-known `LoginCms` endpoint of the homologation environment.
pub const TESTING_WSAA_URL: &str = "https://wsaahomo.afip.gov.ar/ws/services/LoginCms";
/// Well-known `LoginCms` endpoint of the production environment.
pub const PRODUCTION_WSAA_URL: &str = "https://wsaa.afip.gov.ar/ws/services/LoginCms";

/// Everything the broker needs to obtain tickets in one environment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentProfile {
	/// `LoginCms` SOAP endpoint.
	pub endpoint: Url,
	/// WSDL or schema location describing the endpoint, kept for diagnostics.
	#[serde(default)]
	pub schema_location: Option<String>,
	/// PEM certificate issued to this client for the environment.
	pub certificate_path: PathBuf,
	/// PEM private key matching the certificate.
	pub private_key_path: PathBuf,
	/// Passphrase protecting the private key.
	#[serde(default)]
	pub passphrase: Option<TicketSecret>,
	/// Taxpayer identifier the certificate was issued to.
	#[serde(default)]
	pub issuer_cuit: Option<Cuit>,
}
impl EnvironmentProfile {
	/// Creates a profile with the mandatory endpoint and credential paths.
	pub fn new(
		endpoint: Url,
		certificate_path: impl Into<PathBuf>,
		private_key_path: impl Into<PathBuf>,
	) -> Self {
		Self {
			endpoint,
			schema_location: None,
			certificate_path: certificate_path.into(),
			private_key_path: private_key_path.into(),
			passphrase: None,
			issuer_cuit: None,
		}
	}

	/// Records the WSDL or schema location.
	pub fn with_schema_location(mut self, location: impl Into<String>) -> Self {
		self.schema_location = Some(location.into());

		self
	}

	/// Sets the private key passphrase.
	pub fn with_passphrase(mut self, passphrase: impl Into<String>) -> Self {
		self.passphrase = Some(TicketSecret::new(passphrase));

		self
	}

	/// Sets the issuer CUIT.
	pub fn with_issuer_cuit(mut self, cuit: Cuit) -> Self {
		self.issuer_cuit = Some(cuit);

		self
	}

	/// Signing material derived from the credential paths and passphrase.
	pub fn signing_material(&self) -> SigningMaterial {
		SigningMaterial {
			certificate_path: self.certificate_path.clone(),
			private_key_path: self.private_key_path.clone(),
			passphrase: self.passphrase.clone(),
		}
	}

	fn rebase(mut self, base: &Path) -> Self {
		if self.certificate_path.is_relative() {
			self.certificate_path = base.join(&self.certificate_path);
		}
		if self.private_key_path.is_relative() {
			self.private_key_path = base.join(&self.private_key_path);
		}

		self
	}
}

/// Source of per-environment profiles.
pub trait ConfigProvider
where
	Self: Send + Sync,
{
	/// Returns the profile for `environment`.
	fn profile(&self, environment: Environment) -> Result<EnvironmentProfile, ConfigError>;

	/// `LoginCms` endpoint for the environment.
	fn endpoint_url(&self, environment: Environment) -> Result<Url, ConfigError> {
		Ok(self.profile(environment)?.endpoint)
	}

	/// WSDL or schema location for the environment, if configured.
	fn schema_location(&self, environment: Environment) -> Result<Option<String>, ConfigError> {
		Ok(self.profile(environment)?.schema_location)
	}

	/// Certificate path for the environment.
	fn certificate_path(&self, environment: Environment) -> Result<PathBuf, ConfigError> {
		Ok(self.profile(environment)?.certificate_path)
	}

	/// Private key path for the environment.
	fn private_key_path(&self, environment: Environment) -> Result<PathBuf, ConfigError> {
		Ok(self.profile(environment)?.private_key_path)
	}

	/// Signing material for the environment.
	fn signing_material(&self, environment: Environment) -> Result<SigningMaterial, ConfigError> {
		Ok(self.profile(environment)?.signing_material())
	}
}

/// Immutable set of environment profiles.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StaticConfig {
	profiles: BTreeMap<Environment, EnvironmentProfile>,
}
impl StaticConfig {
	/// Starts an empty builder.
	pub fn builder() -> StaticConfigBuilder {
		StaticConfigBuilder::default()
	}

	/// Reads `ARCA_*` process environment variables.
	///
	/// Relative credential paths are resolved against the current working directory.
	pub fn from_env() -> Result<Self, ConfigError> {
		let config = Self::from_lookup(|key| std::env::var(key).ok())?;

		match std::env::current_dir() {
			Ok(cwd) => Ok(config.rebased(&cwd)),
			Err(_) => Ok(config),
		}
	}

	/// Builds profiles from `ARCA_*` keys resolved through `lookup`.
	///
	/// An environment gets a profile when its certificate path is set (`ARCA_TESTING_PATH` or
	/// `ARCA_PRODUCTION_PATH`). `ARCA_PRIVATE_KEY_PATH` is shared by both profiles. Endpoints
	/// default to the well-known WSAA URLs.
	pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let get = |key: &str| lookup(key).map(|v| v.trim().to_owned()).filter(|v| !v.is_empty());
		let passphrase = get("ARCA_PRIVATE_KEY_PASSPHRASE");
		let issuer_cuit = get("ARCA_CUIT_EMISOR").map(Cuit::new).transpose()?;
		let mut builder = Self::builder();

		for environment in Environment::ALL {
			let keys = EnvKeys::for_environment(environment);
			let Some(certificate) = get(keys.certificate) else {
				continue;
			};
			let private_key = get("ARCA_PRIVATE_KEY_PATH")
				.ok_or_else(|| ConfigError::MissingValue { key: "ARCA_PRIVATE_KEY_PATH".into() })?;
			let raw_endpoint = get(keys.endpoint).unwrap_or_else(|| keys.default_endpoint.into());
			let endpoint = Url::parse(&raw_endpoint)
				.map_err(|source| ConfigError::InvalidEndpoint { value: raw_endpoint, source })?;
			let mut profile = EnvironmentProfile::new(endpoint, certificate, private_key);

			profile.schema_location = get(keys.schema);
			profile.passphrase = passphrase.clone().map(TicketSecret::new);
			profile.issuer_cuit = issuer_cuit.clone();
			builder = builder.profile(environment, profile);
		}

		let config = builder.build();

		if config.profiles.is_empty() {
			return Err(ConfigError::MissingValue { key: "ARCA_TESTING_PATH".into() });
		}

		Ok(config)
	}

	/// Loads profiles from a JSON document keyed by environment name.
	///
	/// Relative credential paths are resolved against the file's directory.
	pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let bytes = std::fs::read(path)
			.map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
		let deserializer = &mut serde_json::Deserializer::from_slice(&bytes);
		// String keys keep field paths readable (`testing.endpoint`, not `?.endpoint`).
		let raw: BTreeMap<String, EnvironmentProfile> =
			serde_path_to_error::deserialize(deserializer)
				.map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })?;
		let profiles = raw
			.into_iter()
			.map(|(label, profile)| label.parse::<Environment>().map(|env| (env, profile)))
			.collect::<Result<_, _>>()
			.map_err(|source| ConfigError::UnknownEnvironment {
				path: path.to_path_buf(),
				source,
			})?;
		let config = Self { profiles };

		match path.parent() {
			Some(dir) if !dir.as_os_str().is_empty() => Ok(config.rebased(dir)),
			_ => Ok(config),
		}
	}

	/// Configured environments.
	pub fn environments(&self) -> impl Iterator<Item = Environment> + '_ {
		self.profiles.keys().copied()
	}

	/// Checks that every profile's certificate and key resolve to readable regular files.
	pub fn validate(&self) -> Result<(), ConfigError> {
		for (environment, profile) in &self.profiles {
			let credentials = [
				("certificate", &profile.certificate_path),
				("private key", &profile.private_key_path),
			];

			for (role, path) in credentials {
				let readable = std::fs::File::open(path)
					.and_then(|file| file.metadata())
					.is_ok_and(|metadata| metadata.is_file());

				if !readable {
					tracing::warn!(
						%environment,
						role,
						path = %path.display(),
						"credential file missing"
					);

					return Err(ConfigError::FileNotFound { role, path: path.clone() });
				}
			}
		}

		Ok(())
	}

	fn rebased(self, base: &Path) -> Self {
		let profiles =
			self.profiles.into_iter().map(|(env, profile)| (env, profile.rebase(base))).collect();

		Self { profiles }
	}
}
impl ConfigProvider for StaticConfig {
	fn profile(&self, environment: Environment) -> Result<EnvironmentProfile, ConfigError> {
		self.profiles
			.get(&environment)
			.cloned()
			.ok_or(ConfigError::MissingEnvironment { environment })
	}
}

/// Builder for [`StaticConfig`].
#[derive(Debug, Default)]
pub struct StaticConfigBuilder {
	profiles: BTreeMap<Environment, EnvironmentProfile>,
}
impl StaticConfigBuilder {
	/// Sets (or replaces) the profile for an environment.
	pub fn profile(mut self, environment: Environment, profile: EnvironmentProfile) -> Self {
		self.profiles.insert(environment, profile);

		self
	}

	/// Finishes the configuration.
	pub fn build(self) -> StaticConfig {
		StaticConfig { profiles: self.profiles }
	}
}

struct EnvKeys {
	endpoint: &'static str,
	default_endpoint: &'static str,
	schema: &'static str,
	certificate: &'static str,
}
impl EnvKeys {
	fn for_environment(environment: Environment) -> Self {
		match environment {
			Environment::Testing => Self {
				endpoint: "ARCA_WSAA_URL",
				default_endpoint: TESTING_WSAA_URL,
				schema: "ARCA_WSAA_TESTING_PATH",
				certificate: "ARCA_TESTING_PATH",
			},
			Environment::Production => Self {
				endpoint: "ARCA_WSAA_PROD_URL",
				default_endpoint: PRODUCTION_WSAA_URL,
				schema: "ARCA_WSAA_PRODUCTION_PATH",
				certificate: "ARCA_PRODUCTION_PATH",
			},
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
		let map: HashMap<String, String> =
			pairs.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect();

		move |key| map.get(key).cloned()
	}

	#[test]
	fn env_lookup_builds_profiles_with_default_endpoints() {
		let config = StaticConfig::from_lookup(lookup_from(&[
			("ARCA_TESTING_PATH", "certs/homo.crt"),
			("ARCA_PRODUCTION_PATH", "certs/prod.crt"),
			("ARCA_PRIVATE_KEY_PATH", "certs/issuer.key"),
			("ARCA_WSAA_TESTING_PATH", "wsdl/wsaa-homo.wsdl"),
			("ARCA_CUIT_EMISOR", "20123456789"),
		]))
		.expect("Complete variables should produce a config.");
		let testing = config.profile(Environment::Testing).expect("Testing profile should exist.");
		let production =
			config.profile(Environment::Production).expect("Production profile should exist.");

		assert_eq!(testing.endpoint.as_str(), TESTING_WSAA_URL);
		assert_eq!(production.endpoint.as_str(), PRODUCTION_WSAA_URL);
		assert_eq!(testing.certificate_path, PathBuf::from("certs/homo.crt"));
		assert_eq!(production.private_key_path, PathBuf::from("certs/issuer.key"));
		assert_eq!(testing.schema_location.as_deref(), Some("wsdl/wsaa-homo.wsdl"));
		assert_eq!(production.schema_location, None);
		assert_eq!(testing.issuer_cuit.as_deref(), Some("20123456789"));
		assert!(testing.passphrase.is_none());
	}

	#[test]
	fn env_lookup_honours_endpoint_overrides_and_skips_unset_environments() {
		let config = StaticConfig::from_lookup(lookup_from(&[
			("ARCA_TESTING_PATH", "/etc/wsaa/homo.crt"),
			("ARCA_PRIVATE_KEY_PATH", "/etc/wsaa/issuer.key"),
			("ARCA_PRIVATE_KEY_PASSPHRASE", "hunter2"),
			("ARCA_WSAA_URL", "http://127.0.0.1:8080/ws/services/LoginCms"),
		]))
		.expect("Testing-only variables should produce a config.");

		assert_eq!(
			config.endpoint_url(Environment::Testing).expect("Endpoint should resolve.").as_str(),
			"http://127.0.0.1:8080/ws/services/LoginCms"
		);
		assert!(matches!(
			config.profile(Environment::Production),
			Err(ConfigError::MissingEnvironment { environment: Environment::Production })
		));

		let material =
			config.signing_material(Environment::Testing).expect("Material should resolve.");

		assert_eq!(material.passphrase.as_ref().map(TicketSecret::expose), Some("hunter2"));
	}

	#[test]
	fn env_lookup_reports_missing_and_invalid_values() {
		assert!(matches!(
			StaticConfig::from_lookup(lookup_from(&[])),
			Err(ConfigError::MissingValue { key }) if key == "ARCA_TESTING_PATH"
		));
		assert!(matches!(
			StaticConfig::from_lookup(lookup_from(&[("ARCA_TESTING_PATH", "homo.crt")])),
			Err(ConfigError::MissingValue { key }) if key == "ARCA_PRIVATE_KEY_PATH"
		));
		assert!(matches!(
			StaticConfig::from_lookup(lookup_from(&[
				("ARCA_TESTING_PATH", "homo.crt"),
				("ARCA_PRIVATE_KEY_PATH", "issuer.key"),
				("ARCA_WSAA_URL", "not a url"),
			])),
			Err(ConfigError::InvalidEndpoint { .. })
		));
		assert!(matches!(
			StaticConfig::from_lookup(lookup_from(&[
				("ARCA_TESTING_PATH", "homo.crt"),
				("ARCA_PRIVATE_KEY_PATH", "issuer.key"),
				("ARCA_CUIT_EMISOR", "20-12345678-9"),
			])),
			Err(ConfigError::InvalidIdentifier(_))
		));
	}

	#[test]
	fn json_file_resolves_relative_paths_and_reports_field_paths() {
		let dir = tempfile::tempdir().expect("Failed to create temporary directory.");
		let path = dir.path().join("wsaa.json");

		std::fs::write(
			&path,
			r#"{
				"production": {
					"endpoint": "https://wsaa.afip.gov.ar/ws/services/LoginCms",
					"certificate_path": "prod.crt",
					"private_key_path": "/abs/issuer.key",
					"issuer_cuit": "20123456789"
				}
			}"#,
		)
		.expect("Failed to write config fixture.");

		let config = StaticConfig::from_json_file(&path).expect("Config file should load.");
		let profile = config.profile(Environment::Production).expect("Profile should exist.");

		assert_eq!(profile.certificate_path, dir.path().join("prod.crt"));
		assert_eq!(profile.private_key_path, PathBuf::from("/abs/issuer.key"));
		assert_eq!(config.environments().collect::<Vec<_>>(), [Environment::Production]);

		std::fs::write(&path, r#"{ "testing": { "endpoint": 42 } }"#)
			.expect("Failed to write invalid config fixture.");

		let err = StaticConfig::from_json_file(&path).expect_err("Invalid config must fail.");

		assert!(matches!(&err, ConfigError::Parse { .. }));
		assert!(err.to_string().contains("`testing.endpoint`"), "{err}");

		let valid_profile = r#"{
			"endpoint": "https://wsaa.afip.gov.ar/ws/services/LoginCms",
			"certificate_path": "prod.crt",
			"private_key_path": "issuer.key"
		}"#;

		std::fs::write(&path, format!(r#"{{ "staging": {valid_profile} }}"#))
			.expect("Failed to write unknown-environment fixture.");

		assert!(matches!(
			StaticConfig::from_json_file(&path),
			Err(ConfigError::UnknownEnvironment { source, .. }) if source.0 == "staging"
		));
	}

	#[test]
	fn profile_builders_feed_signing_material() {
		let endpoint = Url::parse(TESTING_WSAA_URL).expect("Endpoint constant should parse.");
		let profile = EnvironmentProfile::new(endpoint, "homo.crt", "issuer.key")
			.with_schema_location("https://wsaahomo.afip.gov.ar/ws/services/LoginCms?wsdl")
			.with_passphrase("s3cret")
			.with_issuer_cuit(Cuit::new("20123456789").expect("CUIT fixture should be valid."));
		let material = profile.signing_material();

		assert!(profile.schema_location.as_deref().is_some_and(|s| s.ends_with("?wsdl")));
		assert_eq!(
			profile.issuer_cuit.as_ref().map(ToString::to_string).as_deref(),
			Some("20123456789")
		);
		assert_eq!(material.certificate_path, PathBuf::from("homo.crt"));
		assert_eq!(material.passphrase.as_ref().map(TicketSecret::expose), Some("s3cret"));
	}

	#[test]
	fn validate_requires_existing_credentials() {
		let dir = tempfile::tempdir().expect("Failed to create temporary directory.");
		let certificate = dir.path().join("issuer.crt");

		std::fs::write(&certificate, "cert").expect("Failed to write certificate fixture.");

		let endpoint = Url::parse(TESTING_WSAA_URL).expect("Endpoint constant should parse.");
		let config = StaticConfig::builder()
			.profile(
				Environment::Testing,
				EnvironmentProfile::new(endpoint, &certificate, dir.path().join("missing.key")),
			)
			.build();

		assert!(matches!(
			config.validate(),
			Err(ConfigError::FileNotFound { role: "private key", .. })
		));
	}
}

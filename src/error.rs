//! Broker-level error types shared across signing, transport, parsing, and stores.

// self
use crate::_prelude::*;

/// Broker-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical broker error exposed by public APIs.
///
/// A caller of [`TicketBroker::get_ticket`](crate::flows::TicketBroker::get_ticket) sees either a
/// valid ticket or exactly one of these variants; partially populated tickets never escape.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem (missing files, unknown environment, bad endpoint).
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// The signing provider failed to produce an envelope.
	#[error(transparent)]
	Signing(#[from] SigningError),
	/// The identity service could not be reached or answered with a fault.
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// The identity service answered with a document that is not a usable ticket.
	#[error(transparent)]
	InvalidResponse(#[from] ResponseError),
}
impl Error {
	/// Returns `true` when retrying the same call may succeed.
	///
	/// Signing and transport failures are retryable (signing once, transport with backoff);
	/// configuration problems and malformed issuer replies are not.
	pub fn is_retryable(&self) -> bool {
		match self {
			Self::Signing(err) => !matches!(err, SigningError::MissingPemMarkers),
			Self::Transport(err) => !err.is_already_authenticated(),
			Self::Storage(_) => true,
			Self::Config(_) | Self::InvalidResponse(_) => false,
		}
	}
}

/// Configuration and validation failures raised by the broker.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// A certificate or key file does not resolve to a readable file.
	#[error("The {role} file was not found: {}.", path.display())]
	FileNotFound {
		/// Which credential the path was supposed to hold.
		role: &'static str,
		/// Path that failed to resolve.
		path: PathBuf,
	},
	/// No profile is configured for the requested environment.
	#[error("No configuration profile is defined for the {environment} environment.")]
	MissingEnvironment {
		/// Environment that was requested.
		environment: Environment,
	},
	/// A required configuration value is absent.
	#[error("Configuration value `{key}` is not set.")]
	MissingValue {
		/// Name of the missing key.
		key: String,
	},
	/// An endpoint URL cannot be parsed.
	#[error("Endpoint `{value}` is not a valid URL.")]
	InvalidEndpoint {
		/// Raw value that failed to parse.
		value: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// A configuration file could not be read.
	#[error("Failed to read configuration file {}.", path.display())]
	Read {
		/// Path of the configuration file.
		path: PathBuf,
		/// Underlying IO failure.
		#[source]
		source: std::io::Error,
	},
	/// A configuration file is not valid JSON for the expected shape.
	#[error("Configuration file {} is invalid at `{}`.", path.display(), source.path())]
	Parse {
		/// Path of the configuration file.
		path: PathBuf,
		/// Structured parsing failure with the offending field path.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// A configuration file keys a profile by an unrecognized environment label.
	#[error("Configuration file {} defines a profile for an unknown environment.", path.display())]
	UnknownEnvironment {
		/// Path of the configuration file.
		path: PathBuf,
		/// Label that failed to parse.
		#[source]
		source: crate::auth::UnknownEnvironment,
	},
	/// Service identifier or CUIT failed validation.
	#[error(transparent)]
	InvalidIdentifier(#[from] crate::auth::IdentifierError),
}

/// Failures raised while producing a signed envelope.
#[derive(Debug, ThisError)]
pub enum SigningError {
	/// The signer program could not be started.
	#[error("Failed to start signer program `{program}`.")]
	Spawn {
		/// Program that failed to start.
		program: String,
		/// Underlying IO failure.
		#[source]
		source: std::io::Error,
	},
	/// The signer exited with a non-zero status.
	#[error(
		"Signer exited with status {}: {diagnostic}.",
		status.map_or_else(|| "signal".into(), |code| code.to_string())
	)]
	Exit {
		/// Exit code, or `None` when the process was terminated by a signal.
		status: Option<i32>,
		/// Diagnostic text the signer wrote to stderr.
		diagnostic: String,
	},
	/// The transient work area could not be prepared, written, or read back.
	#[error("Signer work area I/O failed.")]
	Io(#[from] std::io::Error),
	/// The signer output does not contain a `BEGIN CMS`/`END CMS` block.
	#[error("Signer output does not contain a PEM CMS block.")]
	MissingPemMarkers,
	/// The PEM body is not valid base64.
	#[error("Signer output is not valid base64.")]
	InvalidBase64(#[from] base64::DecodeError),
}

/// Transport-level failures while calling the identity service.
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the identity service.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// The request exceeded its deadline.
	#[error("Request to the identity service timed out.")]
	Timeout,
	/// The identity service answered with a SOAP fault.
	#[error("Identity service returned fault `{code}`: {message}.")]
	Fault {
		/// Fault code (e.g. `ns1:coe.alreadyAuthenticated`).
		code: String,
		/// Fault string supplied by the service.
		message: String,
	},
	/// The identity service answered with an unexpected HTTP status and no fault.
	#[error("Identity service returned HTTP {status}: {body_preview}.")]
	HttpStatus {
		/// HTTP status code.
		status: u16,
		/// Truncated response body.
		body_preview: String,
	},
	/// The SOAP envelope could not be understood.
	#[error("Identity service returned a malformed SOAP envelope: {message}.")]
	MalformedEnvelope {
		/// Description of what was wrong.
		message: String,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}

	/// Returns `true` when the issuer refused because a ticket for the service is still valid.
	pub fn is_already_authenticated(&self) -> bool {
		matches!(self, Self::Fault { code, .. } if code.ends_with("alreadyAuthenticated"))
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		if e.is_timeout() { Self::Timeout } else { Self::network(e) }
	}
}

/// The issuer answered with a document that cannot become an
/// [`AccessTicket`](crate::auth::AccessTicket).
#[derive(Debug, ThisError)]
pub enum ResponseError {
	/// The document is not well-formed XML for the ticket response shape.
	#[error("Ticket response is not well-formed: {message}.")]
	Malformed {
		/// Parser diagnostic.
		message: String,
	},
	/// A required section (`header` or `credentials`) is absent.
	#[error("Ticket response is missing the `{section}` section.")]
	MissingSection {
		/// Name of the missing section.
		section: &'static str,
	},
	/// A timestamp could not be parsed.
	#[error("Ticket response field `{field}` is not a valid timestamp.")]
	InvalidTimestamp {
		/// Name of the offending field.
		field: &'static str,
		/// Underlying parse failure.
		#[source]
		source: time::error::Parse,
	},
	/// The ticket fields violate the ticket invariants.
	#[error(transparent)]
	Ticket(#[from] crate::auth::TicketBuilderError),
	/// The freshly issued ticket does not cover the safety buffer.
	#[error("Issued ticket expires at {expiration}, inside the refresh buffer.")]
	ExpiresTooSoon {
		/// Expiration instant reported by the issuer.
		expiration: OffsetDateTime,
	},
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn retry_guidance_follows_error_taxonomy() {
		let config: Error = ConfigError::MissingValue { key: "ARCA_TESTING_PATH".into() }.into();
		let signing: Error =
			SigningError::Exit { status: Some(1), diagnostic: "bad".into() }.into();
		let fault: Error =
			TransportError::Fault { code: "soapenv:Server".into(), message: "boom".into() }.into();
		let already: Error = TransportError::Fault {
			code: "ns1:coe.alreadyAuthenticated".into(),
			message: "El CEE ya posee un TA valido".into(),
		}
		.into();
		let response: Error = ResponseError::MissingSection { section: "credentials" }.into();

		assert!(!config.is_retryable());
		assert!(signing.is_retryable());
		assert!(fault.is_retryable());
		assert!(!already.is_retryable());
		assert!(!response.is_retryable());
	}

	#[test]
	fn exit_error_renders_signal_without_code() {
		let err = SigningError::Exit { status: None, diagnostic: "killed".into() };

		assert_eq!(err.to_string(), "Signer exited with status signal: killed.");
	}
}

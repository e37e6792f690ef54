//! Signing provider contract and the built-in `openssl cms` implementation.
//!
//! The broker only depends on [`SigningProvider`]; the subprocess signer in [`openssl`] is one
//! implementation, and an in-process CMS library can replace it without touching the broker.

pub mod openssl;
pub mod pem;

pub use openssl::OpensslCmsSigner;

// self
use crate::{_prelude::*, auth::TicketSecret, error::ConfigError};

/// Boxed future returned by [`SigningProvider::sign`].
pub type SignFuture<'a> = Pin<Box<dyn Future<Output = Result<SignedEnvelope>> + 'a + Send>>;

/// Produces a CMS envelope over an arbitrary payload.
pub trait SigningProvider
where
	Self: Send + Sync,
{
	/// Signs `payload` with the certificate and key described by `material`.
	///
	/// Implementations must report unreadable credential files as
	/// [`ConfigError::FileNotFound`] before attempting to sign.
	fn sign<'a>(&'a self, payload: &'a [u8], material: &'a SigningMaterial) -> SignFuture<'a>;
}

/// Certificate, private key, and optional passphrase used to sign a request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SigningMaterial {
	/// PEM certificate issued to the client.
	pub certificate_path: PathBuf,
	/// PEM private key matching the certificate.
	pub private_key_path: PathBuf,
	/// Passphrase protecting the private key, if any.
	pub passphrase: Option<TicketSecret>,
}
impl SigningMaterial {
	/// Creates material without a passphrase.
	pub fn new(certificate_path: impl Into<PathBuf>, private_key_path: impl Into<PathBuf>) -> Self {
		Self {
			certificate_path: certificate_path.into(),
			private_key_path: private_key_path.into(),
			passphrase: None,
		}
	}

	/// Attaches a key passphrase.
	pub fn with_passphrase(mut self, passphrase: impl Into<String>) -> Self {
		self.passphrase = Some(TicketSecret::new(passphrase));

		self
	}

	/// Verifies that the certificate and key resolve to readable regular files.
	pub async fn ensure_readable(&self) -> Result<(), ConfigError> {
		ensure_file("certificate", &self.certificate_path).await?;
		ensure_file("private key", &self.private_key_path).await
	}
}

/// Base64 CMS envelope ready for a single exchange.
///
/// The envelope is moved into the transport, so it cannot be replayed by accident.
#[derive(Clone, PartialEq, Eq)]
pub struct SignedEnvelope(String);
impl SignedEnvelope {
	/// Wraps an already base64-encoded CMS body.
	pub fn new(base64: impl Into<String>) -> Self {
		Self(base64.into())
	}

	/// Returns the base64 body.
	pub fn as_str(&self) -> &str {
		&self.0
	}

	/// Consumes the envelope and returns the base64 body.
	pub fn into_inner(self) -> String {
		self.0
	}
}
impl Debug for SignedEnvelope {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("SignedEnvelope").field(&format_args!("{} bytes", self.0.len())).finish()
	}
}

async fn ensure_file(role: &'static str, path: &Path) -> Result<(), ConfigError> {
	let not_found = || ConfigError::FileNotFound { role, path: path.to_path_buf() };
	// Opening proves read access; metadata alone succeeds on mode 000 files.
	let file = tokio::fs::File::open(path).await.map_err(|_| not_found())?;

	match file.metadata().await {
		Ok(metadata) if metadata.is_file() => Ok(()),
		_ => Err(not_found()),
	}
}

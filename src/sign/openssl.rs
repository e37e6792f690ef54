//! [`SigningProvider`] that shells out to `openssl cms -sign`.
//!
//! Each call writes the payload into its own temporary directory, runs the signer, reads the PEM
//! output back, and removes the directory on every exit path (the [`tempfile::TempDir`] guard is
//! dropped when the future completes or is cancelled). The child process is killed if the future
//! is dropped mid-flight.

// std
use std::{ffi::OsString, process::Stdio};
// crates.io
use tempfile::TempDir;
use tokio::process::Command;
// self
use crate::{
	_prelude::*,
	error::SigningError,
	sign::{SignFuture, SignedEnvelope, SigningMaterial, SigningProvider, pem},
};

const PASSPHRASE_ENV: &str = "WSAA_BROKER_SIGNER_PASSPHRASE";
const PAYLOAD_FILE: &str = "request.xml";
const OUTPUT_FILE: &str = "request.cms";
const DIAGNOSTIC_LIMIT: usize = 512;

/// Subprocess signer backed by the `openssl` command-line tool.
#[derive(Clone, Debug)]
pub struct OpensslCmsSigner {
	program: OsString,
	leading_args: Vec<OsString>,
	work_root: Option<PathBuf>,
}
impl OpensslCmsSigner {
	/// Creates a signer that runs `openssl` from `PATH` and works under the system temp dir.
	pub fn new() -> Self {
		Self { program: "openssl".into(), leading_args: Vec::new(), work_root: None }
	}

	/// Overrides the program, e.g. an absolute path or an `openssl3` binary.
	pub fn with_program(mut self, program: impl Into<OsString>) -> Self {
		self.program = program.into();

		self
	}

	/// Arguments placed before `cms -sign …`, for launchers that wrap the real tool.
	pub fn with_leading_args<I, S>(mut self, args: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<OsString>,
	{
		self.leading_args = args.into_iter().map(Into::into).collect();

		self
	}

	/// Directory under which per-call work areas are created.
	pub fn with_work_root(mut self, root: impl Into<PathBuf>) -> Self {
		self.work_root = Some(root.into());

		self
	}

	fn work_area(&self) -> Result<TempDir, SigningError> {
		let mut builder = tempfile::Builder::new();

		builder.prefix("wsaa-sign-");

		let dir = match &self.work_root {
			Some(root) => builder.tempdir_in(root)?,
			None => builder.tempdir()?,
		};

		Ok(dir)
	}

	fn command(&self, input: &Path, output: &Path, material: &SigningMaterial) -> Command {
		let mut command = Command::new(&self.program);

		command
			.args(&self.leading_args)
			.args(["cms", "-sign", "-nodetach", "-outform", "PEM", "-in"])
			.arg(input)
			.arg("-out")
			.arg(output)
			.arg("-signer")
			.arg(&material.certificate_path)
			.arg("-inkey")
			.arg(&material.private_key_path)
			.stdin(Stdio::null())
			.stdout(Stdio::null())
			.stderr(Stdio::piped())
			.kill_on_drop(true);

		if let Some(passphrase) = &material.passphrase {
			command.arg("-passin").arg(format!("env:{PASSPHRASE_ENV}"));
			command.env(PASSPHRASE_ENV, passphrase.expose());
		}

		command
	}

	async fn sign_in_work_area(
		&self,
		payload: &[u8],
		material: &SigningMaterial,
	) -> Result<SignedEnvelope> {
		material.ensure_readable().await?;

		let work_area = self.work_area()?;
		let input = work_area.path().join(PAYLOAD_FILE);
		let output = work_area.path().join(OUTPUT_FILE);

		tokio::fs::write(&input, payload).await.map_err(SigningError::from)?;
		tracing::debug!(work_area = %work_area.path().display(), "running openssl cms signer");

		let result = self.command(&input, &output, material).output().await.map_err(|source| {
			SigningError::Spawn { program: self.program.to_string_lossy().into_owned(), source }
		})?;

		if !result.status.success() {
			let diagnostic = diagnostic(&result.stderr);

			tracing::warn!(
				status = ?result.status.code(),
				%diagnostic,
				"openssl cms signer failed"
			);

			return Err(SigningError::Exit { status: result.status.code(), diagnostic }.into());
		}

		let pem_output = tokio::fs::read_to_string(&output).await.map_err(SigningError::from)?;
		let body = pem::extract_cms_base64(&pem_output)?;

		drop(work_area);

		Ok(SignedEnvelope::new(body))
	}
}
impl Default for OpensslCmsSigner {
	fn default() -> Self {
		Self::new()
	}
}
impl SigningProvider for OpensslCmsSigner {
	fn sign<'a>(&'a self, payload: &'a [u8], material: &'a SigningMaterial) -> SignFuture<'a> {
		Box::pin(self.sign_in_work_area(payload, material))
	}
}

fn diagnostic(stderr: &[u8]) -> String {
	let text = String::from_utf8_lossy(stderr);
	let text = text.trim();

	if text.len() <= DIAGNOSTIC_LIMIT {
		return text.to_owned();
	}

	let mut end = DIAGNOSTIC_LIMIT;

	while !text.is_char_boundary(end) {
		end -= 1;
	}

	format!("{}…", &text[..end])
}

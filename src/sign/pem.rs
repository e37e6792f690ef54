//! Extraction of the base64 body from a PEM `CMS` block.

// crates.io
use base64::{Engine, engine::general_purpose::STANDARD};
// self
use crate::error::SigningError;

const BEGIN_CMS: &str = "-----BEGIN CMS-----";
const END_CMS: &str = "-----END CMS-----";

/// Returns the base64 body between the `BEGIN CMS` and `END CMS` markers with all whitespace
/// removed.
///
/// The body is decoded once to make sure it is well formed; the decoded bytes are discarded.
pub fn extract_cms_base64(pem: &str) -> Result<String, SigningError> {
	let start = pem.find(BEGIN_CMS).ok_or(SigningError::MissingPemMarkers)? + BEGIN_CMS.len();
	let length = pem[start..].find(END_CMS).ok_or(SigningError::MissingPemMarkers)?;
	let body: String =
		pem[start..start + length].chars().filter(|c| !c.is_whitespace()).collect();

	if body.is_empty() {
		return Err(SigningError::MissingPemMarkers);
	}

	STANDARD.decode(&body)?;

	Ok(body)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn strips_markers_and_line_breaks() {
		let pem = "-----BEGIN CMS-----\r\nTUlJ\r\nQ01T\nRklY\n-----END CMS-----\n";

		assert_eq!(extract_cms_base64(pem).expect("PEM body should extract."), "TUlJQ01TRklY");
	}

	#[test]
	fn missing_or_empty_blocks_fail() {
		assert!(matches!(extract_cms_base64(""), Err(SigningError::MissingPemMarkers)));
		assert!(matches!(
			extract_cms_base64("-----BEGIN CMS-----\nTUlJ\n"),
			Err(SigningError::MissingPemMarkers)
		));
		assert!(matches!(
			extract_cms_base64("-----BEGIN CMS-----\n\n-----END CMS-----"),
			Err(SigningError::MissingPemMarkers)
		));
	}

	#[test]
	fn non_base64_bodies_fail() {
		let pem = "-----BEGIN CMS-----\nnot*base64!\n-----END CMS-----";

		assert!(matches!(extract_cms_base64(pem), Err(SigningError::InvalidBase64(_))));
	}
}

//! Secret strings shared by access tokens and refresh credentials.

// crates.io
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use sha2::{Digest, Sha256};
// self
use crate::_prelude::*;

const REDACTED: &str = "<redacted>";
const FINGERPRINT_BYTES: usize = 6;

/// Secret value that never appears in `Debug` or `Display` output.
///
/// Serializes as the bare string, so a cached token keeps the shape the token endpoint sent.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenSecret(String);
impl TokenSecret {
	/// Wraps a secret string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the raw value for placement in a header. Never log it.
	pub fn expose(&self) -> &str {
		&self.0
	}

	/// Returns `true` when the secret holds no characters.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Short, non-reversible identifier that lets logs correlate a secret across events.
	pub fn fingerprint(&self) -> String {
		let digest = Sha256::digest(self.0.as_bytes());

		URL_SAFE_NO_PAD.encode(&digest[..FINGERPRINT_BYTES])
	}
}
impl AsRef<str> for TokenSecret {
	fn as_ref(&self) -> &str {
		self.expose()
	}
}
impl Debug for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("TokenSecret").field(&REDACTED).finish()
	}
}
impl Display for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(REDACTED)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn formatters_redact_copilot_token() {
		let secret = TokenSecret::new("tid=abc;exp=1700000000;sku=free");

		assert_eq!(format!("{secret:?}"), "TokenSecret(\"<redacted>\")");
		assert_eq!(format!("{secret}"), "<redacted>");
	}

	#[test]
	fn serializes_as_plain_string() {
		let payload = serde_json::to_string(&TokenSecret::new("abc"))
			.expect("TokenSecret should serialize to JSON.");

		assert_eq!(payload, "\"abc\"");
	}

	#[test]
	fn fingerprint_is_stable_and_hides_the_value() {
		let secret = TokenSecret::new("gho_secret");
		let fingerprint = secret.fingerprint();

		assert_eq!(fingerprint, TokenSecret::new("gho_secret").fingerprint());
		assert_ne!(fingerprint, TokenSecret::new("gho_other").fingerprint());
		assert_eq!(fingerprint.len(), 8);
		assert!(!fingerprint.contains("gho"));
	}
}

//! Immutable access token records issued by the Copilot token endpoint.

// crates.io
use oauth2::http::{HeaderValue, header::InvalidHeaderValue};
// self
use crate::{_prelude::*, auth::TokenSecret};

/// Current lifecycle status for an access token.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenStatus {
	/// Token can be attached to outbound requests.
	Active,
	/// Token reached its expiry instant.
	Expired,
	/// The issuing service returned error details instead of a usable token.
	Rejected,
}

/// Named service endpoints returned alongside a token.
///
/// Values are passed through untouched; GitHub Enterprise instances may point `api` elsewhere.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoints {
	/// Completion API base URL.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub api: Option<String>,
	/// Origin tracker URL.
	#[serde(default, rename = "origin-tracker", skip_serializing_if = "Option::is_none")]
	pub origin_tracker: Option<String>,
	/// Proxy URL.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub proxy: Option<String>,
	/// Telemetry URL.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub telemetry: Option<String>,
}

/// Structured rejection payload the token endpoint sends instead of a token.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetails {
	/// Link with more information (usually a settings or signup page).
	#[serde(default, skip_serializing_if = "String::is_empty")]
	pub url: String,
	/// Human-readable explanation.
	#[serde(default, skip_serializing_if = "String::is_empty")]
	pub message: String,
	/// Short title for the notification.
	#[serde(default, skip_serializing_if = "String::is_empty")]
	pub title: String,
	/// Service-side notification identifier.
	#[serde(default, skip_serializing_if = "String::is_empty")]
	pub notification_id: String,
}

/// Short-lived bearer credential with an absolute expiry.
///
/// Values are never mutated after construction; a refresh produces a new token that replaces
/// the held one.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
	token: TokenSecret,
	#[serde(with = "time::serde::timestamp")]
	expires_at: OffsetDateTime,
	#[serde(default)]
	endpoints: Endpoints,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	error_details: Option<ErrorDetails>,
}
impl AccessToken {
	/// Creates a token that expires at the provided instant.
	pub fn new(token: impl Into<String>, expires_at: OffsetDateTime) -> Self {
		Self {
			token: TokenSecret::new(token),
			expires_at,
			endpoints: Endpoints::default(),
			error_details: None,
		}
	}

	/// Returns a copy carrying the provided service endpoints.
	pub fn with_endpoints(self, endpoints: Endpoints) -> Self {
		Self { endpoints, ..self }
	}

	/// Returns a copy carrying a rejection payload.
	pub fn with_error_details(self, details: ErrorDetails) -> Self {
		Self { error_details: Some(details), ..self }
	}

	/// Bearer secret; callers must avoid logging it.
	pub fn secret(&self) -> &TokenSecret {
		&self.token
	}

	/// Absolute expiry instant.
	pub fn expires_at(&self) -> OffsetDateTime {
		self.expires_at
	}

	/// Endpoints advertised by the issuing service.
	pub fn endpoints(&self) -> &Endpoints {
		&self.endpoints
	}

	/// Rejection payload, if the service declined to issue a token.
	pub fn error_details(&self) -> Option<&ErrorDetails> {
		self.error_details.as_ref()
	}

	/// Computes the lifecycle status at a given instant.
	pub fn status_at(&self, instant: OffsetDateTime) -> TokenStatus {
		if self.error_details.is_some() {
			return TokenStatus::Rejected;
		}
		if self.expires_at <= instant {
			return TokenStatus::Expired;
		}

		TokenStatus::Active
	}

	/// Convenience helper that checks the status using the current UTC instant.
	pub fn status(&self) -> TokenStatus {
		self.status_at(OffsetDateTime::now_utc())
	}

	/// Returns `true` if the token carries no error details and expires strictly after
	/// `instant`.
	pub fn is_usable_at(&self, instant: OffsetDateTime) -> bool {
		matches!(self.status_at(instant), TokenStatus::Active)
	}

	/// Returns `true` if the token is usable relative to the current clock.
	pub fn is_usable(&self) -> bool {
		self.is_usable_at(OffsetDateTime::now_utc())
	}

	/// Returns `true` once `instant` falls in a later Unix second than the expiry.
	///
	/// A held token is only replaced after this point, so a token whose expiry second equals
	/// the second of `instant` is still sent.
	pub fn is_past_expiry_at(&self, instant: OffsetDateTime) -> bool {
		self.expires_at.unix_timestamp() < instant.unix_timestamp()
	}

	/// Builds the `Authorization: Bearer <token>` header value, marked as sensitive.
	pub fn bearer_header(&self) -> Result<HeaderValue, InvalidHeaderValue> {
		let mut value = HeaderValue::from_str(&format!("Bearer {}", self.token.expose()))?;

		value.set_sensitive(true);

		Ok(value)
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::{Duration, macros};
	// self
	use super::*;

	#[test]
	fn usability_uses_strict_expiry_boundary() {
		let expires = macros::datetime!(2025-01-01 01:00 UTC);
		let token = AccessToken::new("abc", expires);

		assert!(token.is_usable_at(macros::datetime!(2025-01-01 00:59:59 UTC)));
		assert!(!token.is_usable_at(expires));
		assert!(!token.is_usable_at(macros::datetime!(2025-01-01 01:00:01 UTC)));
		assert_eq!(token.status_at(expires), TokenStatus::Expired);
	}

	#[test]
	fn error_details_make_token_unusable() {
		let token = AccessToken::new("abc", OffsetDateTime::now_utc() + Duration::hours(1))
			.with_error_details(ErrorDetails {
				message: "Copilot access revoked".into(),
				..ErrorDetails::default()
			});

		assert_eq!(token.status(), TokenStatus::Rejected);
		assert!(!token.is_usable());
	}

	#[test]
	fn past_expiry_uses_whole_seconds() {
		let expires = macros::datetime!(2025-01-01 01:00 UTC);
		let token = AccessToken::new("abc", expires);

		assert!(!token.is_past_expiry_at(expires));
		assert!(!token.is_past_expiry_at(expires + Duration::milliseconds(999)));
		assert!(token.is_past_expiry_at(expires + Duration::seconds(1)));
	}

	#[test]
	fn decodes_token_endpoint_payload() {
		let body = r#"{
			"token": "tid=1;exp=1735693200",
			"expires_at": 1735693200,
			"refresh_in": 1500,
			"endpoints": {
				"api": "https://api.individual.githubcopilot.com",
				"origin-tracker": "https://origin-tracker.individual.githubcopilot.com",
				"proxy": "https://proxy.individual.githubcopilot.com",
				"telemetry": "https://telemetry.individual.githubcopilot.com"
			}
		}"#;
		let token: AccessToken =
			serde_json::from_str(body).expect("Token endpoint payload should decode.");

		assert_eq!(token.secret().expose(), "tid=1;exp=1735693200");
		assert_eq!(token.expires_at(), macros::datetime!(2025-01-01 01:00 UTC));
		assert_eq!(
			token.endpoints().origin_tracker.as_deref(),
			Some("https://origin-tracker.individual.githubcopilot.com")
		);
		assert!(token.error_details().is_none());
	}

	#[test]
	fn cached_payload_keeps_endpoint_names() {
		let token = AccessToken::new("abc", macros::datetime!(2025-01-01 01:00 UTC)).with_endpoints(
			Endpoints {
				api: Some("https://api.enterprise.githubcopilot.com".into()),
				origin_tracker: Some("https://origin-tracker.enterprise.githubcopilot.com".into()),
				..Endpoints::default()
			},
		);
		let payload = serde_json::to_string(&token).expect("Access token should serialize.");

		assert!(payload.contains("\"origin-tracker\""));
		assert!(!payload.contains("telemetry"));
		assert!(!payload.contains("error_details"));

		let decoded: AccessToken =
			serde_json::from_str(&payload).expect("Serialized access token should decode.");

		assert_eq!(decoded, token);
	}

	#[test]
	fn bearer_header_is_sensitive() {
		let token = AccessToken::new("xyz", OffsetDateTime::now_utc());
		let value = token.bearer_header().expect("Plain tokens should form a header value.");

		assert_eq!(value.to_str().expect("Header should be visible ASCII."), "Bearer xyz");
		assert!(value.is_sensitive());
		assert!(AccessToken::new("bad\ntoken", OffsetDateTime::now_utc()).bearer_header().is_err());
	}
}

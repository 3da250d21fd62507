//! Broker-level error types shared by the exchanger, the guarded transport, and the caches.

// crates.io
use oauth2::{
	HttpClientError,
	http::{Error as HttpError, header::InvalidHeaderValue},
};
// self
use crate::{
	_prelude::*,
	auth::{CredentialError, ErrorDetails},
	cache::CacheError,
};

/// Broker-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical broker error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// No usable access token could be obtained; the outbound request was never sent.
	#[error("Token acquisition failed.")]
	TokenAcquisition(
		#[from]
		#[source]
		ExchangeError,
	),
	/// The proxied request itself failed at the transport level.
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Cache backend could not be opened.
	#[error(transparent)]
	Storage(#[from] CacheError),
	/// Refresh credential locator could not be set up.
	#[error(transparent)]
	Credential(#[from] CredentialError),

	/// Issued access token cannot be carried in an `Authorization` header.
	#[error("Access token contains characters that are not valid in an HTTP header.")]
	InvalidBearerToken(#[source] InvalidHeaderValue),
}

/// Failures raised by [`TokenExchanger::fetch`](crate::exchange::TokenExchanger::fetch).
#[derive(Debug, ThisError)]
pub enum ExchangeError {
	/// No refresh credential was found in any known location.
	#[error("No refresh credential is available; sign in to GitHub Copilot again.")]
	NoRefreshCredential(#[source] CredentialError),
	/// The token endpoint could not be reached.
	#[error("Network error occurred while calling the token endpoint.")]
	NetworkFailure(#[source] TransportError),
	/// The token endpoint answered with a body that does not match the token schema.
	#[error("Token endpoint returned a malformed response.")]
	MalformedResponse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code of the response.
		status: Option<u16>,
	},
	/// The token endpoint answered successfully but declined to issue a token.
	#[error("Token endpoint rejected the request: {message}.")]
	RemoteRejected {
		/// Human-readable message supplied by the service.
		message: String,
		/// Full error payload returned instead of a token.
		details: ErrorDetails,
	},
	/// A token was issued but could not be written to the cache, so it was discarded.
	#[error("Failed to cache the issued access token.")]
	CacheWriteFailed(#[source] CacheError),
	/// The token request could not be constructed.
	#[error(transparent)]
	Config(#[from] ConfigError),
}
impl From<CredentialError> for ExchangeError {
	fn from(e: CredentialError) -> Self {
		Self::NoRefreshCredential(e)
	}
}
impl From<TransportError> for ExchangeError {
	fn from(e: TransportError) -> Self {
		Self::NetworkFailure(e)
	}
}

/// Configuration and validation failures raised by the broker.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// Token endpoint cannot be parsed.
	#[error("Token endpoint is not a valid URL.")]
	InvalidEndpoint {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Token endpoint must use HTTPS.
	#[error("The token endpoint must use HTTPS: {url}.")]
	InsecureEndpoint {
		/// Endpoint URL that failed validation.
		url: String,
	},
	/// Cache key must not be empty.
	#[error("Cache key must not be empty.")]
	EmptyCacheKey,
	/// An identification header value cannot be sent over HTTP.
	#[error("The {header} header value is invalid.")]
	InvalidHeader {
		/// Header whose value failed validation.
		header: &'static str,
		/// Underlying validation failure.
		#[source]
		source: InvalidHeaderValue,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] HttpError),
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while sending the request.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while sending the request.")]
	Io(#[from] std::io::Error),
	/// Request could not be converted for the underlying client.
	#[error("Request could not be prepared for sending.")]
	Request(#[source] HttpError),
	/// Transport reported a failure without a structured error.
	#[error("HTTP client error occurred: {message}.")]
	Other {
		/// Message supplied by the transport.
		message: String,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
impl<E> From<HttpClientError<E>> for TransportError
where
	E: 'static + Send + Sync + std::error::Error,
{
	fn from(e: HttpClientError<E>) -> Self {
		match e {
			HttpClientError::Reqwest(inner) => Self::Network { source: inner },
			HttpClientError::Http(inner) => Self::Request(inner),
			HttpClientError::Io(inner) => Self::Io(inner),
			HttpClientError::Other(message) => Self::Other { message },
			other => Self::Other { message: format!("unhandled client error variant: {other:?}") },
		}
	}
}

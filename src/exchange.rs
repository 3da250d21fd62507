//! Access token acquisition: cache consult, refresh credential exchange, and persistence.
//!
//! [`TokenExchanger::fetch`] first consults the expiring cache under the configured key and
//! returns a stored token while it is still usable. Otherwise it asks the
//! [`CredentialLocator`] for the long-lived refresh credential, presents it to the token
//! endpoint as `Authorization: token <credential>`, and writes the issued token back to the
//! cache with the token's own expiry before returning it. A token that cannot be cached is
//! not returned. No step is retried.

mod metrics;

pub use metrics::ExchangeMetrics;

// crates.io
use oauth2::http::header::AUTHORIZATION;
// self
use crate::{
	_prelude::*,
	auth::{AccessToken, CredentialLocator, ErrorDetails, RefreshCredential},
	cache::{CacheError, CacheLookup, ExpiringCache},
	config::BrokerConfig,
	error::{ConfigError, ExchangeError, TransportError},
	http::{HeaderValue, HttpRequest, HttpResponse, HttpTransport, Method, Request},
	obs::{self, OpSpan, Operation, Outcome},
};
#[cfg(feature = "reqwest")]
use crate::{auth::HostsFileLocator, cache::FileCache, http::ReqwestHttpClient};

#[cfg(feature = "reqwest")]
/// Exchanger specialized for the crate's default reqwest transport.
pub type ReqwestExchanger = TokenExchanger<ReqwestHttpClient>;

/// Produces usable Copilot access tokens, preferring cached ones over network exchanges.
pub struct TokenExchanger<C>
where
	C: ?Sized + HttpTransport,
{
	/// Endpoint, cache key, and identification headers.
	pub config: BrokerConfig,
	/// Transport used for the token endpoint call.
	pub http_client: Arc<C>,
	/// Expiring cache holding the most recently issued token.
	pub cache: Arc<dyn ExpiringCache>,
	/// Source of the refresh credential.
	pub locator: Arc<dyn CredentialLocator>,
	/// Shared counters for fetch outcomes.
	pub metrics: Arc<ExchangeMetrics>,
}
impl<C> TokenExchanger<C>
where
	C: ?Sized + HttpTransport,
{
	/// Creates an exchanger from its collaborators.
	pub fn new(
		config: BrokerConfig,
		http_client: impl Into<Arc<C>>,
		cache: Arc<dyn ExpiringCache>,
		locator: Arc<dyn CredentialLocator>,
	) -> Self {
		Self {
			config,
			http_client: http_client.into(),
			cache,
			locator,
			metrics: Default::default(),
		}
	}

	/// Returns a usable access token from the cache or from a fresh exchange.
	pub async fn fetch(&self) -> Result<AccessToken, ExchangeError> {
		const OP: Operation = Operation::Fetch;

		let span = OpSpan::new(OP, "fetch");

		obs::record_outcome(OP, Outcome::Attempt);
		self.metrics.record_attempt();

		let result = span.instrument(self.fetch_uninstrumented()).await;

		if result.is_err() {
			self.metrics.record_failure();
		}

		obs::record_result(OP, &result);

		result
	}

	/// Classifies the cached entry at `now` without touching the network.
	pub async fn lookup(&self, now: OffsetDateTime) -> CacheLookup {
		CacheLookup::read(self.cache.as_ref(), &self.config.cache_key, now).await
	}

	/// Exchanges `credential` for a new token without consulting or updating the cache.
	pub async fn exchange(
		&self,
		credential: &RefreshCredential,
	) -> Result<AccessToken, ExchangeError> {
		let request = self.token_request(credential)?;

		self.metrics.record_exchange();

		let response = self.http_client.send(request).await.map_err(TransportError::from)?;

		#[cfg(feature = "tracing")]
		tracing::debug!(status = response.status().as_u16(), "token endpoint responded");

		decode_token_response(&response)
	}

	async fn fetch_uninstrumented(&self) -> Result<AccessToken, ExchangeError> {
		match self.lookup(OffsetDateTime::now_utc()).await {
			CacheLookup::Hit(token) => {
				self.metrics.record_cache_hit();

				#[cfg(feature = "tracing")]
				tracing::debug!(
					token = %token.secret().fingerprint(),
					expires_at = token.expires_at().unix_timestamp(),
					"cache hit"
				);

				return Ok(token);
			},
			CacheLookup::Miss => {
				#[cfg(feature = "tracing")]
				tracing::debug!("cache miss");
			},
			CacheLookup::Error(_e) => {
				#[cfg(feature = "tracing")]
				tracing::warn!(error = %_e, "cache read failed; exchanging a fresh token");
			},
		}

		let credential = self.locator.locate()?;

		#[cfg(feature = "tracing")]
		tracing::debug!(credential = %credential.fingerprint(), "exchanging refresh credential");

		let token = self.exchange(&credential).await?;

		self.persist(&token).await?;

		Ok(token)
	}

	async fn persist(&self, token: &AccessToken) -> Result<(), ExchangeError> {
		let payload = serde_json::to_vec(token).map_err(|e| {
			ExchangeError::CacheWriteFailed(CacheError::Serialization {
				message: format!("Failed to encode access token: {e}"),
			})
		})?;

		self.cache
			.write(&self.config.cache_key, token.expires_at(), payload)
			.await
			.map_err(ExchangeError::CacheWriteFailed)
	}

	fn token_request(&self, credential: &RefreshCredential) -> Result<HttpRequest, ExchangeError> {
		let mut authorization = HeaderValue::from_str(&format!("token {}", credential.expose()))
			.map_err(|source| ConfigError::InvalidHeader { header: "Authorization", source })?;

		authorization.set_sensitive(true);

		let mut request = Request::builder()
			.method(Method::GET)
			.uri(self.config.token_endpoint.as_str())
			.body(Vec::new())
			.map_err(ConfigError::from)?;
		let headers = request.headers_mut();

		*headers = self.config.identity.exchange_headers();
		headers.insert(AUTHORIZATION, authorization);

		Ok(request)
	}
}
#[cfg(feature = "reqwest")]
impl TokenExchanger<ReqwestHttpClient> {
	/// Wires the reqwest transport, the default file cache, and the Copilot plugin
	/// credential documents with the github.com config.
	///
	/// An unusable cache directory downgrades to an in-memory cache instead of failing.
	pub fn from_env() -> Result<Self> {
		Ok(Self::new(
			BrokerConfig::github()?,
			ReqwestHttpClient::default(),
			FileCache::open_default_or_memory(),
			Arc::new(HostsFileLocator::from_env()?),
		))
	}
}
impl<C> Clone for TokenExchanger<C>
where
	C: ?Sized + HttpTransport,
{
	fn clone(&self) -> Self {
		Self {
			config: self.config.clone(),
			http_client: self.http_client.clone(),
			cache: self.cache.clone(),
			locator: self.locator.clone(),
			metrics: self.metrics.clone(),
		}
	}
}
impl<C> Debug for TokenExchanger<C>
where
	C: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenExchanger")
			.field("token_endpoint", &self.config.token_endpoint.as_str())
			.field("cache_key", &self.config.cache_key)
			.field("metrics", &self.metrics)
			.finish()
	}
}

#[derive(Deserialize)]
struct RejectionProbe {
	#[serde(default)]
	error_details: Option<ErrorDetails>,
}

/// Decodes a token endpoint body, telling rejections apart from malformed payloads.
fn decode_token_response(response: &HttpResponse) -> Result<AccessToken, ExchangeError> {
	let status = Some(response.status().as_u16());
	let probe: RejectionProbe = decode_json(response.body())
		.map_err(|source| ExchangeError::MalformedResponse { source, status })?;

	if let Some(details) = probe.error_details {
		return Err(ExchangeError::RemoteRejected { message: details.message.clone(), details });
	}

	decode_json(response.body())
		.map_err(|source| ExchangeError::MalformedResponse { source, status })
}

fn decode_json<T>(body: &[u8]) -> Result<T, serde_path_to_error::Error<serde_json::Error>>
where
	T: serde::de::DeserializeOwned,
{
	let mut deserializer = serde_json::Deserializer::from_slice(body);

	serde_path_to_error::deserialize(&mut deserializer)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::http::StatusCode;

	fn response(status: StatusCode, body: &str) -> HttpResponse {
		let mut response = HttpResponse::new(body.as_bytes().to_vec());

		*response.status_mut() = status;

		response
	}

	#[test]
	fn rejection_is_reported_with_its_message() {
		let body = r#"{"error_details":{"url":"https://github.com/settings/copilot","message":"You do not have access to Copilot","title":"Access denied","notification_id":"no_copilot_access"}}"#;
		let err = decode_token_response(&response(StatusCode::OK, body))
			.expect_err("Error details must not decode as a token.");

		match err {
			ExchangeError::RemoteRejected { message, details } => {
				assert_eq!(message, "You do not have access to Copilot");
				assert_eq!(details.notification_id, "no_copilot_access");
			},
			other => panic!("Unexpected error variant: {other:?}."),
		}
	}

	#[test]
	fn schema_mismatch_reports_path_and_status() {
		let err = decode_token_response(&response(
			StatusCode::UNAUTHORIZED,
			r#"{"token":"abc","expires_at":"soon"}"#,
		))
		.expect_err("String expiry must not decode.");

		match err {
			ExchangeError::MalformedResponse { source, status } => {
				assert_eq!(status, Some(401));
				assert_eq!(source.path().to_string(), "expires_at");
			},
			other => panic!("Unexpected error variant: {other:?}."),
		}

		assert!(matches!(
			decode_token_response(&response(StatusCode::OK, "<html>")),
			Err(ExchangeError::MalformedResponse { .. })
		));
	}

	#[test]
	fn token_body_decodes() {
		let token = decode_token_response(&response(
			StatusCode::OK,
			r#"{"token":"xyz","expires_at":1735693200,"endpoints":{"api":"https://api.githubcopilot.com"}}"#,
		))
		.expect("Valid token body should decode.");

		assert_eq!(token.secret().expose(), "xyz");
		assert_eq!(token.expires_at().unix_timestamp(), 1_735_693_200);
		assert_eq!(token.endpoints().api.as_deref(), Some("https://api.githubcopilot.com"));
	}
}

//! Fixtures shared by the integration tests.

#![allow(dead_code)]

// std
use std::sync::Arc;
// crates.io
use httpmock::MockServer;
use time::OffsetDateTime;
// self
use copilot_broker::{
	auth::{AccessToken, StaticCredential},
	cache::{ExpiringCache, MemoryCache},
	config::BrokerConfig,
	exchange::{ReqwestExchanger, TokenExchanger},
	http::ReqwestHttpClient,
	reqwest::Client as ReqwestClient,
	url::Url,
};

/// Path of the token endpoint on the mock server.
pub const TOKEN_PATH: &str = "/copilot_internal/v2/token";
/// Refresh credential handed to every test exchanger.
pub const REFRESH_CREDENTIAL: &str = "ghu_refresh";

/// Builds a reqwest HTTP client that accepts the self-signed certificates produced by
/// `httpmock` during tests.
pub fn test_reqwest_http_client() -> ReqwestHttpClient {
	let client = ReqwestClient::builder()
		.danger_accept_invalid_certs(true)
		.build()
		.expect("Failed to build insecure Reqwest client for tests.");

	ReqwestHttpClient::with_client(client)
}

/// Config pointing the token endpoint at the mock server.
pub fn test_config(server: &MockServer) -> BrokerConfig {
	BrokerConfig::builder()
		.token_endpoint(
			Url::parse(&server.url(TOKEN_PATH))
				.expect("Mock token endpoint should parse successfully."),
		)
		.build()
		.expect("Broker config should build successfully.")
}

/// Constructs an exchanger backed by an in-memory cache and a static refresh credential.
pub fn build_reqwest_test_exchanger(server: &MockServer) -> (ReqwestExchanger, Arc<MemoryCache>) {
	let cache = Arc::new(MemoryCache::default());
	let exchanger = build_reqwest_test_exchanger_with_cache(server, cache.clone());

	(exchanger, cache)
}

/// Constructs an exchanger over the provided cache backend.
pub fn build_reqwest_test_exchanger_with_cache(
	server: &MockServer,
	cache: Arc<dyn ExpiringCache>,
) -> ReqwestExchanger {
	let locator = StaticCredential::new(REFRESH_CREDENTIAL)
		.expect("Static refresh credential should be accepted.");

	TokenExchanger::new(test_config(server), test_reqwest_http_client(), cache, Arc::new(locator))
}

/// JSON body the token endpoint returns for a successful exchange.
pub fn token_body(token: &str, expires_at: OffsetDateTime) -> String {
	format!(
		"{{\"token\":\"{token}\",\"expires_at\":{},\"refresh_in\":1500,\"endpoints\":{{\"api\":\"https://api.githubcopilot.com\"}}}}",
		expires_at.unix_timestamp()
	)
}

/// JSON body the token endpoint returns when it refuses to issue a token.
pub fn rejection_body(message: &str) -> String {
	format!(
		"{{\"error_details\":{{\"url\":\"https://github.com/settings/copilot\",\"message\":\"{message}\",\"title\":\"Access denied\",\"notification_id\":\"no_copilot_access\"}}}}"
	)
}

/// Stores `token` under `key` with the token's own expiry.
pub async fn seed_token(cache: &dyn ExpiringCache, key: &str, token: &AccessToken) {
	let payload = serde_json::to_vec(token).expect("Access token fixture should serialize.");

	cache
		.write(key, token.expires_at(), payload)
		.await
		.expect("Failed to seed access token into the cache.");
}

// self
use crate::{
	_prelude::*,
	config::{BrokerConfig, CACHE_KEY, ClientIdentity, TOKEN_ENDPOINT},
	error::ConfigError,
};

/// Builder for [`BrokerConfig`] values.
#[derive(Debug, Default)]
pub struct BrokerConfigBuilder {
	/// Token endpoint override; [`TOKEN_ENDPOINT`] when unset.
	pub token_endpoint: Option<Url>,
	/// Cache key override; [`CACHE_KEY`] when unset.
	pub cache_key: Option<String>,
	/// Identification headers; the Copilot defaults when unset.
	pub identity: Option<ClientIdentity>,
}
impl BrokerConfigBuilder {
	/// Creates a new builder with every field unset.
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets the token endpoint.
	pub fn token_endpoint(mut self, url: Url) -> Self {
		self.token_endpoint = Some(url);

		self
	}

	/// Sets the cache key.
	pub fn cache_key(mut self, key: impl Into<String>) -> Self {
		self.cache_key = Some(key.into());

		self
	}

	/// Overrides the identification headers.
	pub fn identity(mut self, identity: ClientIdentity) -> Self {
		self.identity = Some(identity);

		self
	}

	/// Consumes the builder and validates the resulting config.
	pub fn build(self) -> Result<BrokerConfig, ConfigError> {
		let token_endpoint = match self.token_endpoint {
			Some(url) => url,
			None => Url::parse(TOKEN_ENDPOINT)
				.map_err(|source| ConfigError::InvalidEndpoint { source })?,
		};
		let config = BrokerConfig {
			token_endpoint,
			cache_key: self.cache_key.unwrap_or_else(|| CACHE_KEY.into()),
			identity: self.identity.unwrap_or_default(),
		};

		config.validate()?;

		Ok(config)
	}
}

impl BrokerConfig {
	/// Validates invariants for the config.
	fn validate(&self) -> Result<(), ConfigError> {
		if self.token_endpoint.scheme() != "https" {
			return Err(ConfigError::InsecureEndpoint { url: self.token_endpoint.to_string() });
		}
		if self.cache_key.is_empty() {
			return Err(ConfigError::EmptyCacheKey);
		}

		Ok(())
	}
}

//! Broker configuration: the token endpoint, the cache key, and the client identity.
//!
//! [`BrokerConfig::github`] targets GitHub's Copilot token endpoint; use
//! [`BrokerConfig::builder`] to point at another instance or a mock server.

/// Builder API for assembling broker configs.
pub mod builder;
/// Identification headers shared by every outbound call.
pub mod identity;

pub use builder::*;
pub use identity::*;

// self
use crate::{_prelude::*, error::ConfigError};

/// Endpoint that exchanges the GitHub OAuth token for a Copilot access token.
pub const TOKEN_ENDPOINT: &str = "https://api.github.com/copilot_internal/v2/token";
/// Cache key under which the issued access token is stored.
pub const CACHE_KEY: &str = "copilot";

/// Immutable, validated broker configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BrokerConfig {
	/// Token issuance endpoint.
	pub token_endpoint: Url,
	/// Fixed cache key for the issued token.
	pub cache_key: String,
	/// Identification headers sent on the exchange and on every proxied call.
	pub identity: ClientIdentity,
}
impl BrokerConfig {
	/// Creates a new builder seeded with the GitHub defaults.
	pub fn builder() -> BrokerConfigBuilder {
		BrokerConfigBuilder::new()
	}

	/// Builds the default configuration for github.com.
	pub fn github() -> Result<Self, ConfigError> {
		Self::builder().build()
	}
}


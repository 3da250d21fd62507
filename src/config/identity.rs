// crates.io
use oauth2::http::{
	HeaderMap, HeaderValue,
	header::{ACCEPT, USER_AGENT},
};
// self
use crate::{_prelude::*, error::ConfigError};

/// Editor version the token endpoint expects from Copilot clients.
pub const EDITOR_VERSION: &str = "vscode/1.95.3";
/// User agent that passes the token endpoint's client allowlist check.
pub const USER_AGENT_VALUE: &str = "curl/7.81.0";
/// Header that carries [`EDITOR_VERSION`].
pub const EDITOR_VERSION_HEADER: &str = "editor-version";

/// Fixed headers asserting the client identity the remote service allowlists.
///
/// The same value is applied to the token exchange and to every proxied request, so the two
/// call sites always send byte-identical identification headers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientIdentity {
	editor_version: HeaderValue,
	user_agent: HeaderValue,
}
impl ClientIdentity {
	/// Validates custom identification header values.
	pub fn new(editor_version: &str, user_agent: &str) -> Result<Self, ConfigError> {
		let editor_version = HeaderValue::from_str(editor_version)
			.map_err(|source| ConfigError::InvalidHeader { header: "Editor-Version", source })?;
		let user_agent = HeaderValue::from_str(user_agent)
			.map_err(|source| ConfigError::InvalidHeader { header: "User-Agent", source })?;

		Ok(Self { editor_version, user_agent })
	}

	/// `Editor-Version` value.
	pub fn editor_version(&self) -> &HeaderValue {
		&self.editor_version
	}

	/// `User-Agent` value.
	pub fn user_agent(&self) -> &HeaderValue {
		&self.user_agent
	}

	/// Sets both identification headers, overwriting whatever the request carried.
	pub fn apply(&self, headers: &mut HeaderMap) {
		headers.insert(EDITOR_VERSION_HEADER, self.editor_version.clone());
		headers.insert(USER_AGENT, self.user_agent.clone());
	}

	/// Headers for the token exchange: the identity plus `Accept: application/json`.
	pub(crate) fn exchange_headers(&self) -> HeaderMap {
		let mut headers = HeaderMap::new();

		self.apply(&mut headers);
		headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

		headers
	}
}
impl Default for ClientIdentity {
	fn default() -> Self {
		Self {
			editor_version: HeaderValue::from_static(EDITOR_VERSION),
			user_agent: HeaderValue::from_static(USER_AGENT_VALUE),
		}
	}
}

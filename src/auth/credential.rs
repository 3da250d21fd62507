//! Long-lived refresh credential lookup.
//!
//! The Copilot editor plugins persist the GitHub OAuth token in small JSON documents keyed
//! by host (`github.com` or `github.com:<app>`). [`HostsFileLocator`] searches those
//! documents in order and returns the first `oauth_token` it finds.

// std
use std::fs;
// self
use crate::{_prelude::*, auth::TokenSecret};

/// Directory name used by the Copilot plugins under the user configuration directory.
pub const COPILOT_CONFIG_DIR: &str = "github-copilot";
/// Candidate documents inside [`COPILOT_CONFIG_DIR`], searched in order.
pub const CREDENTIAL_FILES: [&str; 2] = ["hosts.json", "apps.json"];

const HOST: &str = "github.com";
const TOKEN_FIELD: &str = "oauth_token";

/// Failures raised while locating a refresh credential.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum CredentialError {
	/// None of the searched documents contained a usable credential.
	#[error("No refresh credential found in {}.", display_paths(.searched))]
	NotFound {
		/// Every path that was searched.
		searched: Vec<PathBuf>,
	},
	/// The user configuration directory could not be determined.
	#[error("Unable to determine the user configuration directory.")]
	ConfigDirUnavailable,
	/// A refresh credential was supplied but is empty.
	#[error("Refresh credential must not be empty.")]
	Empty,
}

/// Long-lived secret exchanged for short-lived access tokens.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RefreshCredential(TokenSecret);
impl RefreshCredential {
	/// Wraps a credential, rejecting empty values.
	pub fn new(value: impl Into<String>) -> Result<Self, CredentialError> {
		let secret = TokenSecret::new(value);

		if secret.is_empty() {
			return Err(CredentialError::Empty);
		}

		Ok(Self(secret))
	}

	/// Returns the raw value for placement in a header. Never log it.
	pub fn expose(&self) -> &str {
		self.0.expose()
	}

	/// Log-safe identifier of the credential.
	pub fn fingerprint(&self) -> String {
		self.0.fingerprint()
	}
}

/// Source of the long-lived refresh credential.
pub trait CredentialLocator
where
	Self: Send + Sync,
{
	/// Returns the refresh credential or explains why none is available.
	fn locate(&self) -> Result<RefreshCredential, CredentialError>;
}

/// Locator backed by a credential known up front (environment injection, tests).
#[derive(Clone, Debug)]
pub struct StaticCredential(RefreshCredential);
impl StaticCredential {
	/// Wraps a non-empty credential value.
	pub fn new(value: impl Into<String>) -> Result<Self, CredentialError> {
		RefreshCredential::new(value).map(Self)
	}
}
impl CredentialLocator for StaticCredential {
	fn locate(&self) -> Result<RefreshCredential, CredentialError> {
		Ok(self.0.clone())
	}
}

/// Searches the Copilot plugin documents for a `github.com` OAuth token.
#[derive(Clone, Debug)]
pub struct HostsFileLocator {
	paths: Vec<PathBuf>,
}
impl HostsFileLocator {
	/// Searches `hosts.json` then `apps.json` inside `config_dir`.
	pub fn new(config_dir: impl AsRef<Path>) -> Self {
		let dir = config_dir.as_ref();

		Self::with_paths(CREDENTIAL_FILES.iter().map(|name| dir.join(name)))
	}

	/// Searches exactly the provided documents, in order.
	pub fn with_paths<I, P>(paths: I) -> Self
	where
		I: IntoIterator<Item = P>,
		P: Into<PathBuf>,
	{
		Self { paths: paths.into_iter().map(Into::into).collect() }
	}

	/// Uses the platform's Copilot configuration directory.
	///
	/// That is `%LOCALAPPDATA%\github-copilot` on Windows and `$HOME/.config/github-copilot`
	/// everywhere else, matching where the editor plugins write.
	pub fn from_env() -> Result<Self, CredentialError> {
		Ok(Self::new(default_config_dir()?))
	}

	/// Documents searched by this locator.
	pub fn paths(&self) -> &[PathBuf] {
		&self.paths
	}

	fn extract(path: &Path) -> Option<RefreshCredential> {
		let bytes = match fs::read(path) {
			Ok(bytes) => bytes,
			Err(_e) => {
				#[cfg(feature = "tracing")]
				tracing::debug!(path = %path.display(), error = %_e, "credential document unreadable");

				return None;
			},
		};
		let document: BTreeMap<String, serde_json::Value> = match serde_json::from_slice(&bytes) {
			Ok(document) => document,
			Err(_e) => {
				#[cfg(feature = "tracing")]
				tracing::debug!(path = %path.display(), error = %_e, "credential document unparseable");

				return None;
			},
		};

		document
			.iter()
			.filter(|(key, _)| is_github_host(key))
			.filter_map(|(_, entry)| entry.get(TOKEN_FIELD)?.as_str())
			.find_map(|token| RefreshCredential::new(token).ok())
	}
}
impl CredentialLocator for HostsFileLocator {
	fn locate(&self) -> Result<RefreshCredential, CredentialError> {
		self.paths
			.iter()
			.find_map(|path| Self::extract(path))
			.ok_or_else(|| CredentialError::NotFound { searched: self.paths.clone() })
	}
}

fn is_github_host(key: &str) -> bool {
	key == HOST || key.strip_prefix(HOST).is_some_and(|rest| rest.starts_with(':'))
}

fn default_config_dir() -> Result<PathBuf, CredentialError> {
	let base = if cfg!(windows) {
		dirs::data_local_dir()
	} else {
		dirs::home_dir().map(|home| home.join(".config"))
	};

	base.map(|dir| dir.join(COPILOT_CONFIG_DIR)).ok_or(CredentialError::ConfigDirUnavailable)
}

fn display_paths(paths: &[PathBuf]) -> String {
	paths.iter().map(|path| path.display().to_string()).collect::<Vec<_>>().join(", ")
}

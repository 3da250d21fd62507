//! Outbound transport that keeps a valid Copilot bearer token on every request.
//!
//! [`GuardedTransport::dispatch`] overwrites the identification headers, replaces the held
//! token once it is strictly past its expiry (or absent) by calling
//! [`TokenExchanger::fetch`], sets `Authorization: Bearer <token>`, and returns whatever the
//! underlying transport answers. Status codes are not interpreted.

// crates.io
use oauth2::http::header::AUTHORIZATION;
// self
use crate::{
	_prelude::*,
	auth::AccessToken,
	error::TransportError,
	exchange::TokenExchanger,
	http::{HttpRequest, HttpResponse, HttpTransport},
	obs::{self, OpSpan, Operation, Outcome},
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;

#[cfg(feature = "reqwest")]
/// Guarded transport specialized for the crate's default reqwest stack.
pub type ReqwestGuardedTransport = GuardedTransport<ReqwestHttpClient>;

/// Wraps an HTTP transport so every request carries a currently valid bearer token.
///
/// The held token moves through absent, valid, expired, and replaced. Reading and replacing it
/// happens under one async lock, so concurrent callers racing on an expired token wait for a
/// single exchange instead of each performing their own.
pub struct GuardedTransport<C>
where
	C: ?Sized + HttpTransport,
{
	exchanger: TokenExchanger<C>,
	held: AsyncMutex<Option<AccessToken>>,
}
impl<C> GuardedTransport<C>
where
	C: ?Sized + HttpTransport,
{
	/// Creates a transport that starts without a held token.
	pub fn new(exchanger: TokenExchanger<C>) -> Self {
		Self { exchanger, held: AsyncMutex::new(None) }
	}

	/// Exchanger used to replace the held token.
	pub fn exchanger(&self) -> &TokenExchanger<C> {
		&self.exchanger
	}

	/// Returns a copy of the currently held token, if any.
	pub async fn held_token(&self) -> Option<AccessToken> {
		self.held.lock().await.clone()
	}

	/// Signs `request` with the identification headers and a valid bearer token, then sends it.
	///
	/// Fails with [`Error::TokenAcquisition`] without sending anything when no token can be
	/// obtained. Transport failures of the request itself surface as [`Error::Transport`].
	pub async fn dispatch(&self, request: HttpRequest) -> Result<HttpResponse> {
		const OP: Operation = Operation::Dispatch;

		let span = OpSpan::new(OP, "dispatch");

		obs::record_outcome(OP, Outcome::Attempt);

		let result = span.instrument(self.dispatch_uninstrumented(request)).await;

		obs::record_result(OP, &result);

		result
	}

	async fn dispatch_uninstrumented(&self, mut request: HttpRequest) -> Result<HttpResponse> {
		self.exchanger.config.identity.apply(request.headers_mut());

		let token = self.ensure_token().await?;
		let bearer = token.bearer_header().map_err(Error::InvalidBearerToken)?;

		request.headers_mut().insert(AUTHORIZATION, bearer);

		let response =
			self.exchanger.http_client.send(request).await.map_err(TransportError::from)?;

		Ok(response)
	}

	async fn ensure_token(&self) -> Result<AccessToken> {
		let mut held = self.held.lock().await;
		let now = OffsetDateTime::now_utc();

		if let Some(token) = held.as_ref().filter(|token| !token.is_past_expiry_at(now)) {
			return Ok(token.clone());
		}

		#[cfg(feature = "tracing")]
		tracing::debug!(held = held.is_some(), "replacing held access token");

		let token = self.exchanger.fetch().await?;

		*held = Some(token.clone());

		Ok(token)
	}
}
#[cfg(feature = "reqwest")]
impl GuardedTransport<ReqwestHttpClient> {
	/// Builds a transport over [`TokenExchanger::from_env`].
	pub fn from_env() -> Result<Self> {
		Ok(Self::new(TokenExchanger::from_env()?))
	}
}
impl<C> Debug for GuardedTransport<C>
where
	C: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("GuardedTransport").field("exchanger", &self.exchanger).finish()
	}
}

//! Sends one chat completion request through a [`GuardedTransport`] wired from the environment.
//!
//! 1. Sign in to GitHub Copilot in an editor so `~/.config/github-copilot/hosts.json` exists.
//! 2. Run `cargo run --example dispatch`.
//! 3. The first run exchanges the refresh credential and writes the token to the cache
//!    directory; later runs reuse it until it expires.

// crates.io
use color_eyre::Result;
// self
use copilot_broker::{
	http::{HttpRequest, Method, Request, header},
	transport::GuardedTransport,
};

const DEFAULT_API: &str = "https://api.githubcopilot.com";

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let transport = GuardedTransport::from_env()?;
	let token = transport.exchanger().fetch().await?;
	let api = token.endpoints().api.clone().unwrap_or_else(|| DEFAULT_API.into());
	let request: HttpRequest = Request::builder()
		.method(Method::POST)
		.uri(format!("{api}/chat/completions"))
		.header(header::CONTENT_TYPE, "application/json")
		.body(
			serde_json::to_vec(&serde_json::json!({
				"model": "gpt-4o",
				"messages": [{ "role": "user", "content": "Say hello in one word." }],
			}))?,
		)?;
	let response = transport.dispatch(request).await?;

	println!("status: {}", response.status());
	println!("{}", String::from_utf8_lossy(response.body()));

	let metrics = &transport.exchanger().metrics;

	println!(
		"fetch attempts: {}, cache hits: {}, exchanges: {}",
		metrics.attempts(),
		metrics.cache_hits(),
		metrics.exchanges()
	);

	Ok(())
}

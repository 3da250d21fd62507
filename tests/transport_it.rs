#![cfg(feature = "reqwest")]

mod common;

// crates.io
use httpmock::prelude::*;
use time::{Duration, OffsetDateTime};
// self
use common::*;
use copilot_broker::{
	config::{CACHE_KEY, EDITOR_VERSION, USER_AGENT_VALUE},
	error::{Error, ExchangeError},
	http::{HttpRequest, Method, Request, StatusCode},
	transport::GuardedTransport,
};

const CHAT_PATH: &str = "/chat/completions";

fn chat_request(server: &MockServer) -> HttpRequest {
	Request::builder()
		.method(Method::POST)
		.uri(server.url(CHAT_PATH))
		.header("content-type", "application/json")
		.header("user-agent", "custom-agent/2.0")
		.header("editor-version", "stale/0.0.1")
		.body(b"{\"model\":\"gpt-4o\",\"messages\":[]}".to_vec())
		.expect("Chat request fixture should build.")
}

#[tokio::test]
async fn dispatch_signs_request_and_overwrites_identity() {
	let server = MockServer::start_async().await;
	let (exchanger, cache) = build_reqwest_test_exchanger(&server);
	let transport = GuardedTransport::new(exchanger);
	let expires_at = OffsetDateTime::now_utc() + Duration::hours(1);
	let token_mock = server
		.mock_async(|when, then| {
			when.method(GET).path(TOKEN_PATH);
			then.status(200).body(token_body("xyz", expires_at));
		})
		.await;
	let chat_mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path(CHAT_PATH)
				.header("authorization", "Bearer xyz")
				.header("editor-version", EDITOR_VERSION)
				.header("user-agent", USER_AGENT_VALUE)
				.header("content-type", "application/json")
				.body("{\"model\":\"gpt-4o\",\"messages\":[]}");
			then.status(200).body("{\"choices\":[]}");
		})
		.await;
	let response =
		transport.dispatch(chat_request(&server)).await.expect("Dispatch should succeed.");

	token_mock.assert_hits_async(1).await;
	chat_mock.assert_hits_async(1).await;

	assert_eq!(response.status(), StatusCode::OK);
	assert_eq!(response.body().as_slice(), b"{\"choices\":[]}");

	let held = transport.held_token().await.expect("Dispatch should leave a held token.");

	assert_eq!(held.secret().expose(), "xyz");
	assert_eq!(
		cache.expiry_of(CACHE_KEY).map(|at| at.unix_timestamp()),
		Some(expires_at.unix_timestamp())
	);
}

#[tokio::test]
async fn held_token_is_reused_until_expiry() {
	let server = MockServer::start_async().await;
	let (exchanger, _cache) = build_reqwest_test_exchanger(&server);
	let transport = GuardedTransport::new(exchanger);
	let token_mock = server
		.mock_async(|when, then| {
			when.method(GET).path(TOKEN_PATH);
			then.status(200)
				.body(token_body("long-lived", OffsetDateTime::now_utc() + Duration::hours(1)));
		})
		.await;
	let chat_mock = server
		.mock_async(|when, then| {
			when.method(POST).path(CHAT_PATH).header("authorization", "Bearer long-lived");
			then.status(200).body("{}");
		})
		.await;

	for _ in 0..2 {
		transport.dispatch(chat_request(&server)).await.expect("Dispatch should succeed.");
	}

	token_mock.assert_hits_async(1).await;
	chat_mock.assert_hits_async(2).await;

	assert_eq!(transport.exchanger().metrics.attempts(), 1);
}

#[tokio::test]
async fn expired_held_token_is_replaced_on_next_dispatch() {
	let server = MockServer::start_async().await;
	let (exchanger, _cache) = build_reqwest_test_exchanger(&server);
	let transport = GuardedTransport::new(exchanger);
	// The endpoint keeps issuing tokens that are already past their expiry.
	let token_mock = server
		.mock_async(|when, then| {
			when.method(GET).path(TOKEN_PATH);
			then.status(200)
				.body(token_body("short-lived", OffsetDateTime::now_utc() - Duration::seconds(5)));
		})
		.await;
	let chat_mock = server
		.mock_async(|when, then| {
			when.method(POST).path(CHAT_PATH).header("authorization", "Bearer short-lived");
			then.status(200).body("{}");
		})
		.await;

	transport.dispatch(chat_request(&server)).await.expect("First dispatch should succeed.");
	transport.dispatch(chat_request(&server)).await.expect("Second dispatch should succeed.");

	token_mock.assert_hits_async(2).await;
	chat_mock.assert_hits_async(2).await;
}

#[tokio::test]
async fn upstream_status_is_passed_through() {
	let server = MockServer::start_async().await;
	let (exchanger, _cache) = build_reqwest_test_exchanger(&server);
	let transport = GuardedTransport::new(exchanger);

	server
		.mock_async(|when, then| {
			when.method(GET).path(TOKEN_PATH);
			then.status(200)
				.body(token_body("xyz", OffsetDateTime::now_utc() + Duration::hours(1)));
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(POST).path(CHAT_PATH);
			then.status(429).header("retry-after", "7").body("rate limited");
		})
		.await;

	let response = transport
		.dispatch(chat_request(&server))
		.await
		.expect("Non-success status must not become an error.");

	assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
	assert_eq!(
		response.headers().get("retry-after").and_then(|value| value.to_str().ok()),
		Some("7")
	);
	assert_eq!(response.body().as_slice(), b"rate limited");
}

#[tokio::test]
async fn token_failure_prevents_request_from_being_sent() {
	let server = MockServer::start_async().await;
	let (exchanger, _cache) = build_reqwest_test_exchanger(&server);
	let transport = GuardedTransport::new(exchanger);
	let token_mock = server
		.mock_async(|when, then| {
			when.method(GET).path(TOKEN_PATH);
			then.status(200).body(rejection_body("Copilot subscription expired"));
		})
		.await;
	let chat_mock = server
		.mock_async(|when, then| {
			when.method(POST).path(CHAT_PATH);
			then.status(200).body("{}");
		})
		.await;
	let err = transport
		.dispatch(chat_request(&server))
		.await
		.expect_err("Rejected token exchange must fail the dispatch.");

	token_mock.assert_hits_async(1).await;
	chat_mock.assert_hits_async(0).await;

	match err {
		Error::TokenAcquisition(ExchangeError::RemoteRejected { message, .. }) => {
			assert_eq!(message, "Copilot subscription expired");
		},
		other => panic!("Unexpected error variant: {other:?}."),
	}

	assert!(transport.held_token().await.is_none());
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    malformed = { ApiError::MalformedParameter { param: "a=1=2".into() }, "MALFORMED_PARAMETER" },
    method = { ApiError::UnsupportedMethod { method: "head".into() }, "UNSUPPORTED_METHOD" },
    timeout = { ApiError::Timeout { timeout_secs: 5 }, "TIMEOUT" },
    prompt = { ApiError::Prompt { reason: "stdin closed".into() }, "PROMPT" },
    missing_endpoint = { ApiError::MissingEndpoint { method: "get".into() }, "MISSING_ENDPOINT" },
    output = { ApiError::Output { reason: "broken pipe".into() }, "OUTPUT" },
)]
fn as_str_is_stable(err: ApiError, expected: &str) {
    assert_eq!(err.as_str(), expected);
    assert_eq!(err.exit_code(), EXIT_FAILURE);
}

#[test]
fn malformed_parameter_names_offender() {
    let err = ApiError::MalformedParameter { param: "bad".into() };
    assert!(err.message().contains("bad"));
    assert!(err.message().contains("one and only one"));
}

#[test]
fn invalid_body_includes_raw_text() {
    let err = ApiError::InvalidBodyJson { raw: "{bad".into(), reason: "key must be a string".into() };
    assert!(err.message().contains("{bad"));
}

#[test]
fn timeout_mentions_configured_seconds() {
    let err = ApiError::Timeout { timeout_secs: 42 };
    assert!(err.title().contains("42"));
    assert!(err.message().contains("42 seconds"));
}

#[test]
fn token_exchange_wraps_status_and_body() {
    let err = ApiError::TokenExchange { status: Some(400), body: "invalid_grant".into() };
    let msg = err.message();
    assert!(msg.contains("400"));
    assert!(msg.contains("invalid_grant"));
}

#[test]
fn state_mismatch_without_returned_state() {
    let err = ApiError::StateMismatch { expected: "abc".into(), received: None };
    assert!(err.message().contains("\"abc\""));
    assert!(err.message().contains("nothing"));
}

#[test]
fn preferences_title_is_passed_through() {
    let err = ApiError::preferences("Your api_url can't have query parameters", "Maybe try x");
    assert_eq!(err.title(), "Your api_url can't have query parameters");
    assert_eq!(err.message(), "Maybe try x");
}

#[test]
fn report_has_title_and_message() {
    let err = ApiError::Persistence { path: "/tmp/p.yml".into(), reason: "read-only".into() };
    let report = err.report();
    assert!(report.contains("/tmp/p.yml"));
    assert!(report.contains("read-only"));
    assert!(report.contains("still works"));
}

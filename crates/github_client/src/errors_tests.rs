use super::*;
use std::error::Error as StdError;

#[test]
fn test_api_error() {
    let error = Error::ApiError {
        status: 404,
        message: "Integration not found".to_string(),
    };

    assert_eq!(
        error.to_string(),
        "GitHub API request failed with status 404: Integration not found"
    );
    assert_eq!(error.status(), Some(404));
    assert!(error.source().is_none());
}

#[test]
fn test_auth_error() {
    let error = Error::AuthError("Invalid credentials".to_string());

    assert_eq!(
        error.to_string(),
        "Failed to authenticate or initialize GitHub client: Invalid credentials"
    );
    assert_eq!(error.status(), None);
}

#[test]
fn test_invalid_base_url_error() {
    let error = Error::InvalidBaseUrl {
        url: "not a url".to_string(),
        reason: "relative URL without a base".to_string(),
    };

    assert_eq!(
        error.to_string(),
        "Invalid GitHub base URL 'not a url': relative URL without a base"
    );
}

#[test]
fn test_deserialization_error_keeps_source() {
    let json_err = serde_json::from_str::<u64>("nope").unwrap_err();
    let error = Error::from(json_err);

    assert!(error.source().is_some());
    assert!(error
        .to_string()
        .starts_with("Failed to deserialize GitHub response"));
}

#[test]
fn test_rate_limit_exceeded_error() {
    let error = Error::RateLimitExceeded;

    assert_eq!(error.to_string(), "Rate limit exceeded");
    assert_eq!(error.status(), Some(429));
}

#[test]
fn test_error_is_send_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Error>();
}

//! Error classification.
//!
//! Pure functions that map a transport outcome (an HTTP status, a `reqwest`
//! failure, or a non-success body) onto the SDK's [`ErrorKind`] set. The
//! dispatcher asks these functions whether to retry and which typed error to
//! surface; nothing here performs I/O.

use reqwest::{header::HeaderMap, StatusCode};

use crate::{
    errors::{APIError, Error, ErrorKind, RetryMetadata, TransportError, TransportErrorKind},
    http::{request_id_from_headers, retry_after_from_headers},
};

/// Classify an HTTP status. Returns `None` for success (2xx).
pub fn classify_status(status: StatusCode) -> Option<ErrorKind> {
    if status.is_success() {
        return None;
    }
    Some(match status.as_u16() {
        401 | 403 => ErrorKind::Auth,
        429 => ErrorKind::RateLimit,
        400..=499 => ErrorKind::Validation,
        500..=599 => ErrorKind::Server,
        // Informational or unfollowed redirects break the response contract.
        _ => ErrorKind::Decode,
    })
}

/// Classify a `reqwest` failure that happened before a response was received.
pub fn classify_transport(err: &reqwest::Error) -> TransportErrorKind {
    if err.is_timeout() {
        TransportErrorKind::Timeout
    } else if err.is_connect() {
        TransportErrorKind::Connect
    } else if err.is_request() {
        TransportErrorKind::Request
    } else if err.is_body() {
        TransportErrorKind::Body
    } else {
        TransportErrorKind::Other
    }
}

pub(crate) fn transport_error(err: reqwest::Error, retries: Option<RetryMetadata>) -> Error {
    TransportError {
        kind: classify_transport(&err),
        message: err.to_string(),
        source: Some(err),
        retries,
    }
    .into()
}

/// Build the typed error for a non-success response.
pub(crate) fn status_error(
    status: StatusCode,
    headers: &HeaderMap,
    body: String,
    retries: Option<RetryMetadata>,
) -> Error {
    let kind = classify_status(status).unwrap_or(ErrorKind::Decode);
    let mut api = parse_api_error(status, headers, body);
    api.retries = retries;
    if kind == ErrorKind::RateLimit {
        api.retry_after = retry_after_from_headers(headers);
    }
    match kind {
        ErrorKind::Auth => Error::Auth(api),
        ErrorKind::RateLimit => Error::RateLimit(api),
        ErrorKind::Validation => Error::Validation(api),
        ErrorKind::Server => Error::Server(api),
        _ => Error::Decode(crate::errors::DecodeError {
            status: api.status,
            message: format!("unexpected status: {}", api.message),
            body_excerpt: api.raw_body.map(|b| excerpt(&b)),
        }),
    }
}

/// Extract the service error envelope. Accepts `{"error":{...}}`,
/// `{"message":...}`, `{"detail":...}` and falls back to the raw text.
pub(crate) fn parse_api_error(status: StatusCode, headers: &HeaderMap, body: String) -> APIError {
    let request_id = request_id_from_headers(headers);
    let status_code = status.as_u16();
    let status_text = status
        .canonical_reason()
        .unwrap_or("request failed")
        .to_string();

    if body.trim().is_empty() {
        let mut err = APIError::new(status_code, status_text);
        err.request_id = request_id;
        return err;
    }

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(&body) {
        let request_id = value
            .get("request_id")
            .or_else(|| value.get("requestId"))
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .or(request_id.clone());

        if let Some(err_obj) = value.get("error").and_then(|v| v.as_object()) {
            let code = err_obj
                .get("code")
                .or_else(|| err_obj.get("type"))
                .and_then(|v| v.as_str())
                .map(|s| s.to_string());
            let message = err_obj
                .get("message")
                .and_then(|v| v.as_str())
                .map(|s| s.to_string())
                .unwrap_or_else(|| status_text.clone());
            return APIError {
                status: status_code,
                code,
                message,
                request_id,
                retries: None,
                retry_after: None,
                raw_body: Some(body),
            };
        }

        let message = value
            .get("error")
            .or_else(|| value.get("message"))
            .or_else(|| value.get("detail"))
            .and_then(|v| v.as_str())
            .map(|s| s.to_string());
        if let Some(message) = message {
            let code = value
                .get("code")
                .and_then(|v| v.as_str())
                .map(|s| s.to_string());
            return APIError {
                status: status_code,
                code,
                message,
                request_id,
                retries: None,
                retry_after: None,
                raw_body: Some(body),
            };
        }
    }

    APIError {
        status: status_code,
        code: None,
        message: body.clone(),
        request_id,
        retries: None,
        retry_after: None,
        raw_body: Some(body),
    }
}

/// Truncate raw data for error messages (avoid huge payloads in logs).
pub(crate) fn excerpt(data: &str) -> String {
    const MAX: usize = 200;
    if data.len() <= MAX {
        return data.to_string();
    }
    let mut end = MAX;
    while !data.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... ({} bytes total)", &data[..end], data.len())
}

#[cfg(test)]
mod tests {
    use reqwest::header::{HeaderValue, RETRY_AFTER};

    use super::*;

    #[test]
    fn success_is_unclassified() {
        assert_eq!(classify_status(StatusCode::OK), None);
        assert_eq!(classify_status(StatusCode::CREATED), None);
    }

    #[test]
    fn statuses_map_to_kinds() {
        assert_eq!(
            classify_status(StatusCode::UNAUTHORIZED),
            Some(ErrorKind::Auth)
        );
        assert_eq!(classify_status(StatusCode::FORBIDDEN), Some(ErrorKind::Auth));
        assert_eq!(
            classify_status(StatusCode::TOO_MANY_REQUESTS),
            Some(ErrorKind::RateLimit)
        );
        assert_eq!(
            classify_status(StatusCode::BAD_REQUEST),
            Some(ErrorKind::Validation)
        );
        assert_eq!(
            classify_status(StatusCode::NOT_FOUND),
            Some(ErrorKind::Validation)
        );
        assert_eq!(
            classify_status(StatusCode::REQUEST_TIMEOUT),
            Some(ErrorKind::Validation)
        );
        assert_eq!(
            classify_status(StatusCode::INTERNAL_SERVER_ERROR),
            Some(ErrorKind::Server)
        );
        assert_eq!(
            classify_status(StatusCode::SERVICE_UNAVAILABLE),
            Some(ErrorKind::Server)
        );
        assert_eq!(
            classify_status(StatusCode::MOVED_PERMANENTLY),
            Some(ErrorKind::Decode)
        );
    }

    #[test]
    fn nested_error_envelope_is_parsed() {
        let err = status_error(
            StatusCode::BAD_REQUEST,
            &HeaderMap::new(),
            r#"{"error":{"message":"temperature out of range","code":"invalid_param"}}"#.into(),
            None,
        );
        match err {
            Error::Validation(api) => {
                assert_eq!(api.status, 400);
                assert_eq!(api.code.as_deref(), Some("invalid_param"));
                assert_eq!(api.message, "temperature out of range");
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn flat_detail_and_plain_text_bodies() {
        let api = parse_api_error(
            StatusCode::UNAUTHORIZED,
            &HeaderMap::new(),
            r#"{"detail":"invalid api key"}"#.into(),
        );
        assert_eq!(api.message, "invalid api key");

        let api = parse_api_error(
            StatusCode::BAD_GATEWAY,
            &HeaderMap::new(),
            "upstream unavailable".into(),
        );
        assert_eq!(api.message, "upstream unavailable");

        let api = parse_api_error(StatusCode::BAD_GATEWAY, &HeaderMap::new(), String::new());
        assert_eq!(api.message, "Bad Gateway");
        assert!(api.raw_body.is_none());
    }

    #[test]
    fn rate_limit_captures_retry_after() {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("2"));
        let err = status_error(StatusCode::TOO_MANY_REQUESTS, &headers, String::new(), None);
        match err {
            Error::RateLimit(api) => {
                assert_eq!(api.retry_after, Some(std::time::Duration::from_secs(2)))
            }
            other => panic!("expected rate limit error, got {other:?}"),
        }
    }

    #[test]
    fn excerpt_truncates_on_char_boundary() {
        let long = "é".repeat(300);
        let out = excerpt(&long);
        assert!(out.ends_with("(600 bytes total)"));
        assert!(excerpt("short") == "short");
    }
}

//! Gate headers read by every game request.

use actix_web::HttpRequest;

/// Header carrying the client's master-data version.
pub const MASTER_VERSION_HEADER: &str = "x-master-version";

/// Header carrying the login session id.
pub const SESSION_HEADER: &str = "x-session";

fn header<'a>(request: &'a HttpRequest, name: &str) -> Option<&'a str> {
    request
        .headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
}

/// Client master version, if sent.
pub fn master_version(request: &HttpRequest) -> Option<&str> {
    header(request, MASTER_VERSION_HEADER)
}

/// Session id, or an empty string when absent so the gate rejects it.
pub fn session_id(request: &HttpRequest) -> &str {
    header(request, SESSION_HEADER).unwrap_or_default()
}

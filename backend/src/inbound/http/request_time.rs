//! Request timestamp resolution.
//!
//! Clients send the time of the request in an RFC 1123 `x-isu-date` header
//! (`Mon, 02 Jan 2006 15:04:05 +0900`). Game rules run against that time;
//! when the header is missing or unparseable the server clock is used.

use actix_web::HttpRequest;
use chrono::DateTime;
use mockable::Clock;
use tracing::debug;

/// Header carrying the client's request time.
pub const REQUEST_TIME_HEADER: &str = "x-isu-date";

/// Parse an RFC 1123 timestamp into unix seconds.
pub fn parse_request_time(raw: &str) -> Option<i64> {
    DateTime::parse_from_rfc2822(raw.trim())
        .ok()
        .map(|at| at.timestamp())
}

/// Unix seconds of the request, from the header or else from `clock`.
pub fn request_time(request: &HttpRequest, clock: &dyn Clock) -> i64 {
    let header = request
        .headers()
        .get(REQUEST_TIME_HEADER)
        .and_then(|value| value.to_str().ok());
    header.and_then(parse_request_time).unwrap_or_else(|| {
        debug!(present = header.is_some(), "request time falls back to server clock");
        clock.utc().timestamp()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;
    use chrono::{TimeZone, Utc};
    use mockable::MockClock;
    use rstest::{fixture, rstest};

    const SERVER_NOW: i64 = 1_700_000_000;

    #[fixture]
    fn clock() -> MockClock {
        let mut clock = MockClock::new();
        clock
            .expect_utc()
            .return_const(Utc.timestamp_opt(SERVER_NOW, 0).single().expect("valid instant"));
        clock
    }

    #[rstest]
    #[case("Tue, 14 Nov 2023 22:13:20 GMT", 1_700_000_000)]
    #[case("Wed, 15 Nov 2023 07:13:20 +0900", 1_700_000_000)]
    #[case("  Tue, 14 Nov 2023 22:13:21 +0000 ", 1_700_000_001)]
    fn rfc1123_headers_parse(#[case] raw: &str, #[case] expected: i64) {
        assert_eq!(parse_request_time(raw), Some(expected));
    }

    #[rstest]
    #[case("")]
    #[case("2023-11-14T22:13:20Z")]
    #[case("yesterday")]
    fn other_formats_are_rejected(#[case] raw: &str) {
        assert_eq!(parse_request_time(raw), None);
    }

    #[rstest]
    fn header_time_wins_over_the_clock() {
        let mut clock = MockClock::new();
        clock.expect_utc().never();
        let request = TestRequest::default()
            .insert_header((REQUEST_TIME_HEADER, "Wed, 15 Nov 2023 07:13:25 +0900"))
            .to_http_request();

        assert_eq!(request_time(&request, &clock), SERVER_NOW + 5);
    }

    #[rstest]
    #[case(None)]
    #[case(Some("not a date"))]
    fn missing_or_bad_headers_use_the_clock(clock: MockClock, #[case] header: Option<&str>) {
        let mut builder = TestRequest::default();
        if let Some(value) = header {
            builder = builder.insert_header((REQUEST_TIME_HEADER, value));
        }
        let request = builder.to_http_request();

        assert_eq!(request_time(&request, &clock), SERVER_NOW);
    }
}

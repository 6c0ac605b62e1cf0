//! Tests for HTTP error mapping.

use super::*;
use crate::domain::reason;
use actix_web::body::to_bytes;
use rstest::rstest;
use serde_json::json;

#[rstest]
#[case(Error::invalid_request("bad"), StatusCode::BAD_REQUEST)]
#[case(Error::unauthorized("no auth"), StatusCode::UNAUTHORIZED)]
#[case(Error::forbidden("denied"), StatusCode::FORBIDDEN)]
#[case(Error::not_found("missing"), StatusCode::NOT_FOUND)]
#[case(Error::conflict(reason::NOT_ENOUGH_COIN), StatusCode::CONFLICT)]
#[case(Error::unprocessable(reason::INVALID_MASTER_VERSION), StatusCode::UNPROCESSABLE_ENTITY)]
#[case(Error::service_unavailable("down"), StatusCode::SERVICE_UNAVAILABLE)]
#[case(Error::internal("boom"), StatusCode::INTERNAL_SERVER_ERROR)]
fn status_code_matches_error_code(#[case] error: Error, #[case] status: StatusCode) {
    assert_eq!(ResponseError::status_code(&error), status);
}

async fn response_body(error: &Error) -> (StatusCode, Error) {
    let response = ResponseError::error_response(error);
    let status = response.status();
    let bytes = to_bytes(response.into_body())
        .await
        .expect("reading response body succeeds");
    let body = serde_json::from_slice(&bytes).expect("Error JSON deserialisation succeeds");
    (status, body)
}

#[rstest]
#[actix_web::test]
async fn client_errors_keep_reason_and_details() {
    let error = Error::invalid_request(reason::INVALID_TOKEN).with_details(json!({"field": "oneTimeToken"}));

    let (status, body) = response_body(&error).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, error);
}

#[rstest]
#[case(Error::internal("game store error: relation missing").with_details(json!({"sql": "x"})))]
#[case(Error::service_unavailable("game store unavailable: shard 2 refused"))]
#[actix_web::test]
async fn server_faults_are_redacted(#[case] error: Error) {
    let (status, body) = response_body(&error).await;

    assert_eq!(status, ResponseError::status_code(&error));
    assert_eq!(body.code(), error.code());
    assert_ne!(body.message(), error.message());
    assert!(body.details().is_none());
}

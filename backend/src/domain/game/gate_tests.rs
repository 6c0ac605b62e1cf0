//! Tests for the request gate and session authorization.

use rstest::rstest;

use super::*;
use crate::domain::ErrorCode;
use crate::test_support::GameHarness;

#[rstest]
#[tokio::test]
async fn matching_version_passes_for_anonymous_requests() {
    let harness = GameHarness::new();

    harness
        .service
        .check_request(None, Some("1"))
        .await
        .expect("current version");
}

#[rstest]
#[case(None)]
#[case(Some("0"))]
#[case(Some(""))]
#[tokio::test]
async fn stale_or_missing_versions_are_unprocessable(#[case] version: Option<&str>) {
    let harness = GameHarness::new();

    let err = harness
        .service
        .check_request(None, version)
        .await
        .expect_err("version mismatch");

    assert_eq!(err.code(), ErrorCode::UnprocessableEntity);
    assert_eq!(err.message(), reason::INVALID_MASTER_VERSION);
}

#[rstest]
#[tokio::test]
async fn publishing_a_version_reloads_masters_and_moves_the_gate() {
    let harness = GameHarness::new();
    harness
        .service
        .check_request(None, Some("1"))
        .await
        .expect("version 1");
    assert_eq!(harness.source.load_count(), 1);

    harness.masters.publish_version("2").await.expect("publishes");

    let stale = harness
        .service
        .check_request(None, Some("1"))
        .await
        .expect_err("version 1 is stale");
    assert_eq!(stale.code(), ErrorCode::UnprocessableEntity);
    harness
        .service
        .check_request(None, Some("2"))
        .await
        .expect("version 2");
    assert_eq!(harness.source.load_count(), 2);
}

#[rstest]
#[tokio::test]
async fn banned_users_are_unauthorized() {
    let harness = GameHarness::new();
    let created = harness.register("viewer-1").await.expect("registers");
    harness
        .service
        .check_request(Some(created.user_id), Some("1"))
        .await
        .expect("not banned yet");
    harness.store.ban(created.user_id);

    let err = harness
        .service
        .check_request(Some(created.user_id), Some("1"))
        .await
        .expect_err("banned");

    assert_eq!(err.code(), ErrorCode::Unauthorized);
}

#[rstest]
#[case("")]
#[case("no-separator")]
#[case("::42")]
#[case("nonce::not-a-number")]
#[tokio::test]
async fn malformed_session_ids_are_unauthorized(#[case] session_id: &str) {
    let harness = GameHarness::new();

    let err = harness
        .service
        .authorize_session(session_id, UserId::new(42))
        .await
        .expect_err("malformed");

    assert_eq!(err.code(), ErrorCode::Unauthorized);
}

#[rstest]
#[tokio::test]
async fn unknown_sessions_are_unauthorized() {
    let harness = GameHarness::new();

    let err = harness
        .service
        .authorize_session("3f2a::42", UserId::new(42))
        .await
        .expect_err("never issued");

    assert_eq!(err.code(), ErrorCode::Unauthorized);
}

#[rstest]
#[tokio::test]
async fn sessions_belong_to_one_user() {
    let harness = GameHarness::new();
    let owner = harness.register("viewer-1").await.expect("registers");
    let other = harness.register("viewer-2").await.expect("registers");

    let err = harness
        .service
        .authorize_session(&owner.session_id, other.user_id)
        .await
        .expect_err("someone else's session");

    assert_eq!(err.code(), ErrorCode::Forbidden);
}

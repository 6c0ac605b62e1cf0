//! Tests for request decoding.

use super::*;
use crate::domain::ErrorCode;
use rstest::rstest;

fn field_of(error: &Error) -> Option<&str> {
    error
        .details()
        .and_then(|details| details.get("field"))
        .and_then(|field| field.as_str())
}

#[rstest]
fn create_user_bodies_decode_camel_case() {
    let body: CreateUserBody =
        decode_body(br#"{"viewerId":"viewer-1","platformType":2}"#).expect("valid body");
    let request = CreateUserRequest::try_from(body).expect("valid request");

    assert_eq!(request.viewer_id, "viewer-1");
    assert_eq!(request.platform_type, 2);
}

#[rstest]
#[case(br#"{"viewerId":"viewer-1"}"#.as_slice())]
#[case(br#"{"viewerId":"viewer-1","platformType":"two"}"#.as_slice())]
#[case(b"not json".as_slice())]
fn malformed_bodies_are_invalid_requests(#[case] raw: &[u8]) {
    let err = decode_body::<CreateUserBody>(raw).expect_err("malformed");

    assert_eq!(err.code(), ErrorCode::InvalidRequest);
    assert_eq!(err.message(), reason::INVALID_REQUEST_BODY);
}

#[rstest]
fn blank_viewer_ids_name_the_field() {
    let body: ViewerBody = decode_body(br#"{"viewerId":"  "}"#).expect("decodes");

    let err = body.into_viewer_id().expect_err("blank viewer");

    assert_eq!(field_of(&err), Some("viewerId"));
}

#[rstest]
fn draw_bodies_take_ids_from_the_path() {
    let body: DrawGachaBody =
        decode_body(br#"{"viewerId":"v","oneTimeToken":"t"}"#).expect("decodes");

    let request = body.into_request("37", "10").expect("valid path");

    assert_eq!((request.gacha_id, request.count), (37, 10));
    assert_eq!(request.one_time_token, "t");
}

#[rstest]
#[case("x", "1", Some("gachaId"))]
#[case("37", "-1", None)]
fn bad_draw_paths_are_rejected(#[case] gacha: &str, #[case] count: &str, #[case] field: Option<&str>) {
    let body = DrawGachaBody {
        viewer_id: "v".to_owned(),
        one_time_token: "t".to_owned(),
    };

    let err = body.into_request(gacha, count).expect_err("bad path");

    assert_eq!(err.code(), ErrorCode::InvalidRequest);
    assert_eq!(field_of(&err), field);
}

#[rstest]
fn add_exp_bodies_keep_material_order() {
    let body: AddExpBody = decode_body(
        br#"{"viewerId":"v","oneTimeToken":"t","items":[{"id":5,"amount":2},{"id":6,"amount":1}]}"#,
    )
    .expect("decodes");

    let request = body.into_request("99").expect("valid");

    assert_eq!(request.card_id, 99);
    assert_eq!(
        request.items,
        vec![ConsumeItem { id: 5, amount: 2 }, ConsumeItem { id: 6, amount: 1 }]
    );
}

#[rstest]
fn missing_id_lists_decode_as_empty() {
    let presents: ReceivePresentBody = decode_body(br#"{"viewerId":"v"}"#).expect("decodes");
    let deck: UpdateDeckBody = decode_body(br#"{"viewerId":"v"}"#).expect("decodes");

    assert_eq!(presents.into_parts().map(|(_, ids)| ids), Ok(Vec::new()));
    assert_eq!(UpdateDeckRequest::try_from(deck).map(|r| r.card_ids), Ok(Vec::new()));
}

#[rstest]
#[case("42", Ok(UserId::new(42)))]
#[case("-42", Err(()))]
#[case("", Err(()))]
fn user_ids_parse_from_the_path(#[case] raw: &str, #[case] expected: Result<UserId, ()>) {
    assert_eq!(parse_user_id(raw).map_err(|_| ()), expected);
}

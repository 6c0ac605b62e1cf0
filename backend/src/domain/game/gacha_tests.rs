//! Tests for gacha listing and draws.

use rstest::rstest;

use super::*;
use crate::domain::ErrorCode;
use crate::test_support::{FIXTURE_NOW, GameHarness, OPEN_GACHA_ID, sample_master_tables};

async fn listed_user(harness: &GameHarness) -> (UserId, String) {
    let created = harness.register("viewer-1").await.expect("registers");
    let listing = harness
        .service
        .list_gacha(created.user_id, FIXTURE_NOW)
        .await
        .expect("lists");
    (created.user_id, listing.one_time_token)
}

fn draw(token: &str, count: u32) -> DrawGachaRequest {
    DrawGachaRequest {
        viewer_id: "viewer-1".to_owned(),
        one_time_token: token.to_owned(),
        gacha_id: OPEN_GACHA_ID,
        count,
    }
}

#[rstest]
#[tokio::test]
async fn listing_shows_open_gachas_and_issues_a_token() {
    let harness = GameHarness::new();
    let created = harness.register("viewer-1").await.expect("registers");

    let listing = harness
        .service
        .list_gacha(created.user_id, FIXTURE_NOW)
        .await
        .expect("lists");

    let ids: Vec<i64> = listing.gachas.iter().map(|entry| entry.gacha.id).collect();
    assert_eq!(ids, vec![OPEN_GACHA_ID]);
    assert_eq!(listing.gachas.first().map(|entry| entry.gacha_item_list.len()), Some(3));
    assert_eq!(
        harness.tokens.current(created.user_id),
        Some((listing.one_time_token.clone(), TokenType::Gacha))
    );
    let state = harness.store.state();
    let live: Vec<_> = state.tokens.iter().filter(|row| row.deleted_at.is_none()).collect();
    assert_eq!(live.len(), 1);
    assert!(live.iter().all(|row| row.record.token == listing.one_time_token));
}

#[rstest]
#[tokio::test]
async fn relisting_replaces_the_previous_token() {
    let harness = GameHarness::new();
    let (user_id, first) = listed_user(&harness).await;

    let second = harness
        .service
        .list_gacha(user_id, FIXTURE_NOW + 1)
        .await
        .expect("lists again")
        .one_time_token;

    assert_ne!(first, second);
    let err = harness
        .service
        .draw_gacha(user_id, &draw(&first, 1), FIXTURE_NOW + 2)
        .await
        .expect_err("superseded token");
    assert_eq!(err.message(), reason::INVALID_TOKEN);
    let state = harness.store.state();
    assert_eq!(state.tokens.iter().filter(|row| row.deleted_at.is_none()).count(), 1);
}

#[rstest]
#[tokio::test]
async fn nothing_open_means_no_token() {
    let mut tables = sample_master_tables();
    tables.gachas.retain(|gacha| gacha.id != OPEN_GACHA_ID);
    let harness = GameHarness::with_tables(tables);
    let created = harness.register("viewer-1").await.expect("registers");
    let before = harness.store.transactions_begun();

    let listing = harness
        .service
        .list_gacha(created.user_id, FIXTURE_NOW)
        .await
        .expect("lists");

    assert!(listing.gachas.is_empty());
    assert!(listing.one_time_token.is_empty());
    assert_eq!(harness.store.transactions_begun(), before);
    assert!(harness.tokens.current(created.user_id).is_none());
}

#[rstest]
#[tokio::test]
async fn open_gacha_without_prizes_fails_the_listing() {
    let mut tables = sample_master_tables();
    tables.gacha_items.retain(|prize| prize.gacha_id != OPEN_GACHA_ID);
    let harness = GameHarness::with_tables(tables);
    let created = harness.register("viewer-1").await.expect("registers");

    let err = harness
        .service
        .list_gacha(created.user_id, FIXTURE_NOW)
        .await
        .expect_err("empty prize table");

    assert_eq!(err.code(), ErrorCode::NotFound);
    assert_eq!(err.message(), reason::GACHA_ITEM_NOT_FOUND);
}

#[rstest]
#[case(1, 1_000)]
#[case(10, 10_000)]
#[tokio::test]
async fn draws_charge_coins_and_mail_prizes(#[case] count: u32, #[case] cost: i64) {
    let harness = GameHarness::new();
    let (user_id, token) = listed_user(&harness).await;
    harness.fund(user_id, cost + 5);

    let drawn = harness
        .service
        .draw_gacha(user_id, &draw(&token, count), FIXTURE_NOW + 10)
        .await
        .expect("draws");

    assert_eq!(drawn.presents.len(), usize::try_from(count).expect("small count"));
    assert!(drawn
        .presents
        .iter()
        .all(|present| present.present_message == "standardの付与アイテムです"));
    let state = harness.store.state();
    assert_eq!(state.users.get(&user_id).map(|user| user.isu_coin), Some(5));
    assert_eq!(state.open_presents(user_id).len(), 2 + drawn.presents.len());
    assert!(state.tokens.iter().all(|row| row.deleted_at.is_some()));
    assert!(harness.tokens.current(user_id).is_none());
}

#[rstest]
#[tokio::test]
async fn insufficient_coin_changes_nothing() {
    let harness = GameHarness::new();
    let (user_id, token) = listed_user(&harness).await;

    let err = harness
        .service
        .draw_gacha(user_id, &draw(&token, 1), FIXTURE_NOW + 10)
        .await
        .expect_err("150 coins are not enough");

    assert_eq!(err.code(), ErrorCode::Conflict);
    let state = harness.store.state();
    assert_eq!(state.users.get(&user_id).map(|user| user.isu_coin), Some(150));
    assert_eq!(state.open_presents(user_id).len(), 2);
}

#[rstest]
#[tokio::test]
async fn tokens_are_single_use() {
    let harness = GameHarness::new();
    let (user_id, token) = listed_user(&harness).await;
    harness.fund(user_id, 5_000);

    harness
        .service
        .draw_gacha(user_id, &draw(&token, 1), FIXTURE_NOW + 10)
        .await
        .expect("first draw");
    let err = harness
        .service
        .draw_gacha(user_id, &draw(&token, 1), FIXTURE_NOW + 11)
        .await
        .expect_err("token already spent");

    assert_eq!(err.code(), ErrorCode::InvalidRequest);
    assert_eq!(err.message(), reason::INVALID_TOKEN);
    assert_eq!(
        harness.store.state().users.get(&user_id).map(|user| user.isu_coin),
        Some(4_000)
    );
}

#[rstest]
#[tokio::test]
async fn expired_tokens_are_rejected_and_retired() {
    let harness = GameHarness::new();
    let (user_id, token) = listed_user(&harness).await;
    harness.fund(user_id, 5_000);
    let ttl = i64::try_from(harness.service.settings().token_ttl.as_secs()).expect("small ttl");

    let err = harness
        .service
        .draw_gacha(user_id, &draw(&token, 1), FIXTURE_NOW + ttl + 1)
        .await
        .expect_err("expired");

    assert_eq!(err.message(), reason::INVALID_TOKEN);
    let state = harness.store.state();
    assert!(state.tokens.iter().all(|row| row.deleted_at.is_some()));
    assert_eq!(state.users.get(&user_id).map(|user| user.isu_coin), Some(5_000));
}

#[rstest]
#[tokio::test]
async fn card_exp_tokens_do_not_open_gachas() {
    let harness = GameHarness::new();
    let created = harness.register("viewer-1").await.expect("registers");
    harness.fund(created.user_id, 5_000);
    let token = harness
        .service
        .list_items(created.user_id, FIXTURE_NOW)
        .await
        .expect("lists items")
        .one_time_token;

    let err = harness
        .service
        .draw_gacha(created.user_id, &draw(&token, 1), FIXTURE_NOW + 1)
        .await
        .expect_err("wrong token type");

    assert_eq!(err.message(), reason::INVALID_TOKEN);
}

#[rstest]
#[case(0)]
#[case(2)]
#[case(11)]
#[tokio::test]
async fn only_single_and_ten_draws_are_allowed(#[case] count: u32) {
    let harness = GameHarness::new();
    let (user_id, token) = listed_user(&harness).await;

    let err = harness
        .service
        .draw_gacha(user_id, &draw(&token, count), FIXTURE_NOW + 1)
        .await
        .expect_err("bad count");

    assert_eq!(err.message(), reason::INVALID_DRAW_COUNT);
    assert!(harness.tokens.current(user_id).is_some(), "token survives validation failures");
}

#[rstest]
#[tokio::test]
async fn closed_gachas_cannot_be_drawn() {
    let harness = GameHarness::new();
    let (user_id, token) = listed_user(&harness).await;
    harness.fund(user_id, 5_000);
    let request = DrawGachaRequest {
        gacha_id: 38,
        ..draw(&token, 1)
    };

    let err = harness
        .service
        .draw_gacha(user_id, &request, FIXTURE_NOW + 1)
        .await
        .expect_err("closed gacha");

    assert_eq!(err.code(), ErrorCode::NotFound);
    assert_eq!(err.message(), reason::GACHA_NOT_FOUND);
}

#[rstest]
#[tokio::test]
async fn draws_require_a_registered_device() {
    let harness = GameHarness::new();
    let (user_id, token) = listed_user(&harness).await;
    harness.fund(user_id, 5_000);
    let request = DrawGachaRequest {
        viewer_id: "someone-else".to_owned(),
        ..draw(&token, 1)
    };

    let err = harness
        .service
        .draw_gacha(user_id, &request, FIXTURE_NOW + 1)
        .await
        .expect_err("unknown device");

    assert_eq!(err.message(), reason::USER_DEVICE_NOT_FOUND);
}

#[rstest]
#[tokio::test]
async fn rolled_back_listing_leaves_the_old_token_live() {
    let harness = GameHarness::new();
    let (user_id, first) = listed_user(&harness).await;
    harness.store.fail_commits(true);

    harness
        .service
        .list_gacha(user_id, FIXTURE_NOW + 1)
        .await
        .expect_err("commit fails");

    assert_eq!(harness.tokens.current(user_id), Some((first, TokenType::Gacha)));
}

#[rstest]
#[tokio::test]
async fn gacha_with_only_zero_weights_charges_nothing() {
    let mut tables = sample_master_tables();
    for entry in tables
        .gacha_items
        .iter_mut()
        .filter(|entry| entry.gacha_id == OPEN_GACHA_ID)
    {
        entry.weight = 0;
    }
    let harness = GameHarness::with_tables(tables);
    let (user_id, token) = listed_user(&harness).await;
    harness.fund(user_id, 5_000);

    let err = harness
        .service
        .draw_gacha(user_id, &draw(&token, 1), FIXTURE_NOW + 1)
        .await
        .expect_err("nothing to draw");

    assert_eq!(err.code(), ErrorCode::NotFound);
    assert_eq!(err.message(), reason::GACHA_ITEM_NOT_FOUND);
    assert_eq!(
        harness.store.state().users.get(&user_id).map(|user| user.isu_coin),
        Some(5_000)
    );
}

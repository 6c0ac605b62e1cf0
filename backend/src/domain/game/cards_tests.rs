//! Tests for inventory, card leveling, decks and passive income.

use rstest::rstest;

use super::*;
use crate::domain::{ErrorCode, ItemKind, UserCard};
use crate::test_support::{FIXTURE_NOW, GameHarness};

struct Player {
    user_id: UserId,
    cards: Vec<i64>,
}

async fn player(harness: &GameHarness) -> Player {
    let created = harness.register("viewer-1").await.expect("registers");
    let cards = created
        .updated_resources
        .user_cards
        .iter()
        .flatten()
        .map(|card| card.id)
        .collect();
    Player {
        user_id: created.user_id,
        cards,
    }
}

async fn card_token(harness: &GameHarness, user_id: UserId) -> String {
    harness
        .service
        .list_items(user_id, FIXTURE_NOW)
        .await
        .expect("lists items")
        .one_time_token
}

fn feed(token: &str, card_id: i64, items: &[(i64, i64)]) -> AddExpRequest {
    AddExpRequest {
        viewer_id: "viewer-1".to_owned(),
        one_time_token: token.to_owned(),
        card_id,
        items: items
            .iter()
            .map(|&(id, amount)| ConsumeItem { id, amount })
            .collect(),
    }
}

fn first(cards: &[i64]) -> i64 {
    cards.first().copied().expect("starter card")
}

#[rstest]
#[tokio::test]
async fn inventory_lists_rows_and_issues_a_card_token() {
    let harness = GameHarness::new();
    let player = player(&harness).await;
    harness.stock(player.user_id, ItemKind::ExpMaterial, 11, 4);

    let listing = harness
        .service
        .list_items(player.user_id, FIXTURE_NOW)
        .await
        .expect("lists");

    assert_eq!(listing.cards.len(), 3);
    assert_eq!(listing.items.len(), 1);
    assert_eq!(listing.user.id, player.user_id);
    assert_eq!(
        harness.tokens.current(player.user_id),
        Some((listing.one_time_token, TokenType::CardExp))
    );
}

#[rstest]
#[tokio::test]
async fn card_token_goes_live_only_after_commit() {
    let harness = GameHarness::new();
    let player = player(&harness).await;
    harness.store.fail_commits(true);

    harness
        .service
        .list_items(player.user_id, FIXTURE_NOW)
        .await
        .expect_err("commit fails");

    assert!(harness.tokens.current(player.user_id).is_none());
    assert!(harness.store.state().tokens.is_empty());
}

#[rstest]
#[tokio::test]
async fn feeding_materials_levels_the_card() {
    let harness = GameHarness::new();
    let player = player(&harness).await;
    let stack = harness.stock(player.user_id, ItemKind::ExpMaterial, 11, 10);
    let token = card_token(&harness, player.user_id).await;
    let card_id = first(&player.cards);

    let resources = harness
        .service
        .add_exp_to_card(player.user_id, &feed(&token, card_id, &[(stack, 10)]), FIXTURE_NOW + 5)
        .await
        .expect("levels");

    let card = resources
        .user_cards
        .as_ref()
        .and_then(|cards| cards.first())
        .expect("updated card");
    assert_eq!((card.level, card.total_exp, card.amount_per_sec), (2, 100, 20));
    let state = harness.store.state();
    assert_eq!(state.item_amount(player.user_id, 11), 0);
    assert!(state.tokens.iter().all(|row| row.deleted_at.is_some()));
    assert!(resources.user.is_some());
}

#[rstest]
#[tokio::test]
async fn card_and_deck_writes_hold_the_user_lock_first() {
    let harness = GameHarness::new();
    let player = player(&harness).await;
    let stack = harness.stock(player.user_id, ItemKind::ExpMaterial, 11, 2);
    let token = card_token(&harness, player.user_id).await;

    let before_feed = harness.store.journal().len();
    harness
        .service
        .add_exp_to_card(
            player.user_id,
            &feed(&token, first(&player.cards), &[(stack, 2)]),
            FIXTURE_NOW + 5,
        )
        .await
        .expect("levels");
    let before_deck = harness.store.journal().len();
    harness
        .service
        .update_deck(
            player.user_id,
            &UpdateDeckRequest {
                viewer_id: "viewer-1".to_owned(),
                card_ids: player.cards.clone(),
            },
            FIXTURE_NOW + 6,
        )
        .await
        .expect("updates");

    let journal = harness.store.journal();
    let feed_calls: Vec<&str> = journal
        .iter()
        .copied()
        .skip(before_feed)
        .take(before_deck - before_feed)
        .collect();
    let deck_calls: Vec<&str> = journal.iter().copied().skip(before_deck).collect();
    assert_eq!(
        feed_calls,
        vec!["lock_user", "find_cards", "find_items", "update_card", "upsert_items"]
    );
    assert_eq!(deck_calls, vec!["lock_user", "find_cards", "retire_decks"]);
}

#[rstest]
#[tokio::test]
async fn max_level_cards_are_rejected_before_the_token_is_spent() {
    let harness = GameHarness::new();
    let player = player(&harness).await;
    let maxed = harness.ids.next_id();
    harness.store.update(|state| {
        state.cards.push(UserCard {
            id: maxed,
            user_id: player.user_id,
            card_id: 3,
            amount_per_sec: 100,
            level: 2,
            total_exp: 500,
            created_at: FIXTURE_NOW,
            updated_at: FIXTURE_NOW,
        });
    });
    let stack = harness.stock(player.user_id, ItemKind::ExpMaterial, 11, 1);
    let token = card_token(&harness, player.user_id).await;

    let err = harness
        .service
        .add_exp_to_card(player.user_id, &feed(&token, maxed, &[(stack, 1)]), FIXTURE_NOW + 5)
        .await
        .expect_err("max level");

    assert_eq!(err.message(), reason::CARD_MAX_LEVEL);
    assert!(harness.tokens.current(player.user_id).is_some());
}

#[rstest]
#[case::too_many(&[(0, 11)], reason::ITEM_NOT_ENOUGH)]
#[case::duplicates_add_up(&[(0, 6), (0, 5)], reason::ITEM_NOT_ENOUGH)]
#[case::non_positive(&[(0, 0)], reason::INVALID_REQUEST_BODY)]
#[tokio::test]
async fn material_requests_are_validated(#[case] items: &[(i64, i64)], #[case] expected: &str) {
    let harness = GameHarness::new();
    let player = player(&harness).await;
    let stack = harness.stock(player.user_id, ItemKind::ExpMaterial, 11, 10);
    let token = card_token(&harness, player.user_id).await;
    let items: Vec<(i64, i64)> = items.iter().map(|&(_, amount)| (stack, amount)).collect();

    let err = harness
        .service
        .add_exp_to_card(player.user_id, &feed(&token, first(&player.cards), &items), FIXTURE_NOW + 5)
        .await
        .expect_err("invalid materials");

    assert_eq!(err.code(), ErrorCode::InvalidRequest);
    assert_eq!(err.message(), expected);
    let state = harness.store.state();
    assert_eq!(state.item_amount(player.user_id, 11), 10);
    assert!(state.cards_of(player.user_id).iter().all(|card| card.total_exp == 0));
}

#[rstest]
#[tokio::test]
async fn only_exp_materials_can_be_fed() {
    let harness = GameHarness::new();
    let player = player(&harness).await;
    let timer = harness.stock(player.user_id, ItemKind::TimerMaterial, 21, 3);
    let token = card_token(&harness, player.user_id).await;

    let err = harness
        .service
        .add_exp_to_card(player.user_id, &feed(&token, first(&player.cards), &[(timer, 1)]), FIXTURE_NOW + 5)
        .await
        .expect_err("timer material");

    assert_eq!(err.code(), ErrorCode::NotFound);
    assert_eq!(err.message(), reason::ITEM_NOT_FOUND);
}

#[rstest]
#[tokio::test]
async fn unknown_cards_are_not_found() {
    let harness = GameHarness::new();
    let player = player(&harness).await;
    let token = card_token(&harness, player.user_id).await;

    let err = harness
        .service
        .add_exp_to_card(player.user_id, &feed(&token, 1, &[]), FIXTURE_NOW + 5)
        .await
        .expect_err("no such card");

    assert_eq!(err.message(), reason::CARD_NOT_FOUND);
}

#[rstest]
#[tokio::test]
async fn deck_update_replaces_the_active_deck() {
    let harness = GameHarness::new();
    let player = player(&harness).await;
    let extra = harness.ids.next_id();
    harness.store.update(|state| {
        state.cards.push(UserCard {
            id: extra,
            user_id: player.user_id,
            card_id: 3,
            amount_per_sec: 20,
            level: 1,
            total_exp: 0,
            created_at: FIXTURE_NOW,
            updated_at: FIXTURE_NOW,
        });
    });
    let mut card_ids = player.cards.clone();
    card_ids.truncate(2);
    card_ids.push(extra);

    let resources = harness
        .service
        .update_deck(
            player.user_id,
            &UpdateDeckRequest {
                viewer_id: "viewer-1".to_owned(),
                card_ids: card_ids.clone(),
            },
            FIXTURE_NOW + 5,
        )
        .await
        .expect("updates");

    let state = harness.store.state();
    let active = state.active_decks(player.user_id);
    assert_eq!(active.len(), 1);
    assert_eq!(active.first().map(|deck| deck.card_ids().to_vec()), Some(card_ids));
    assert_eq!(state.decks.len(), 2);
    assert_eq!(resources.user_decks.as_ref().map(Vec::len), Some(1));

    let home = harness
        .service
        .home(player.user_id, FIXTURE_NOW + 5)
        .await
        .expect("home");
    assert_eq!(home.total_amount_per_sec, 40);
}

#[rstest]
#[case::too_few(2, false, reason::INVALID_CARD_COUNT)]
#[case::too_many(4, false, reason::INVALID_CARD_COUNT)]
#[case::repeated(3, true, reason::INVALID_CARD_IDS)]
#[tokio::test]
async fn deck_shape_is_validated(#[case] len: usize, #[case] repeat: bool, #[case] expected: &str) {
    let harness = GameHarness::new();
    let player = player(&harness).await;
    let mut card_ids: Vec<i64> = player.cards.iter().copied().cycle().take(len).collect();
    if repeat {
        card_ids = vec![first(&player.cards); len];
    }

    let err = harness
        .service
        .update_deck(
            player.user_id,
            &UpdateDeckRequest {
                viewer_id: "viewer-1".to_owned(),
                card_ids,
            },
            FIXTURE_NOW,
        )
        .await
        .expect_err("bad deck");

    assert_eq!(err.message(), expected);
}

#[rstest]
#[tokio::test]
async fn decks_only_hold_owned_cards() {
    let harness = GameHarness::new();
    let player = player(&harness).await;
    let mut card_ids = player.cards.clone();
    card_ids.truncate(2);
    card_ids.push(987_654);

    let err = harness
        .service
        .update_deck(
            player.user_id,
            &UpdateDeckRequest {
                viewer_id: "viewer-1".to_owned(),
                card_ids,
            },
            FIXTURE_NOW,
        )
        .await
        .expect_err("unowned card");

    assert_eq!(err.message(), reason::INVALID_CARD_IDS);
    assert_eq!(harness.store.state().active_decks(player.user_id).len(), 1);
}

#[rstest]
#[tokio::test]
async fn reward_pays_deck_yield_for_elapsed_time() {
    let harness = GameHarness::new();
    let player = player(&harness).await;

    let resources = harness
        .service
        .reward(player.user_id, "viewer-1", FIXTURE_NOW + 3_600)
        .await
        .expect("collects");

    let user = resources.user.expect("user row");
    assert_eq!(user.isu_coin, 150 + 3_600 * 30);
    assert_eq!(user.last_getreward_at, FIXTURE_NOW + 3_600);

    let home = harness
        .service
        .home(player.user_id, FIXTURE_NOW + 3_700)
        .await
        .expect("home");
    assert_eq!(home.past_time, 100);
    assert_eq!(home.total_amount_per_sec, 30);
    assert!(home.deck.is_some());
}

#[rstest]
#[tokio::test]
async fn leveled_cards_raise_the_reward() {
    let harness = GameHarness::new();
    let player = player(&harness).await;
    let stack = harness.stock(player.user_id, ItemKind::ExpMaterial, 12, 2);
    let token = card_token(&harness, player.user_id).await;
    harness
        .service
        .add_exp_to_card(player.user_id, &feed(&token, first(&player.cards), &[(stack, 2)]), FIXTURE_NOW)
        .await
        .expect("levels");

    let resources = harness
        .service
        .reward(player.user_id, "viewer-1", FIXTURE_NOW + 100)
        .await
        .expect("collects");

    assert_eq!(resources.user.map(|user| user.isu_coin), Some(150 + 100 * 40));
}

#[rstest]
#[tokio::test]
async fn reward_before_last_collection_pays_nothing() {
    let harness = GameHarness::new();
    let player = player(&harness).await;

    let resources = harness
        .service
        .reward(player.user_id, "viewer-1", FIXTURE_NOW - 50)
        .await
        .expect("collects");

    let user = resources.user.expect("user row");
    assert_eq!(user.isu_coin, 150);
    assert_eq!(user.last_getreward_at, FIXTURE_NOW);
}

#[rstest]
#[tokio::test]
async fn reward_needs_an_active_deck() {
    let harness = GameHarness::new();
    let player = player(&harness).await;
    harness.store.update(|state| {
        for deck in &mut state.decks {
            deck.deleted_at = Some(FIXTURE_NOW);
        }
    });

    let err = harness
        .service
        .reward(player.user_id, "viewer-1", FIXTURE_NOW + 10)
        .await
        .expect_err("no deck");
    let home = harness
        .service
        .home(player.user_id, FIXTURE_NOW + 10)
        .await
        .expect("home without a deck");

    assert_eq!(err.message(), reason::DECK_NOT_FOUND);
    assert!(home.deck.is_none());
    assert_eq!(home.total_amount_per_sec, 0);
}

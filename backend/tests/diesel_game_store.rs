//! `DieselGameStore` and `DieselAccessLookup` against an embedded shard.
//!
//! Each test boots its own cluster, applies the embedded migrations through
//! `DieselShardBootstrap`, and drives the adapters on a dedicated runtime.
//! Set `SKIP_TEST_CLUSTER=1` where PostgreSQL binaries are unavailable.

use std::sync::Arc;
use std::time::Duration;

use conquest_backend::domain::ports::{AccessLookup, GameStore, GameTransaction, ShardBootstrap};
use conquest_backend::domain::{ItemKind, PlatformType, User, UserDeck, UserDevice, UserId, UserItem};
use conquest_backend::outbound::persistence::{
    DieselAccessLookup, DieselGameStore, DieselShardBootstrap, PoolConfig, ShardRouter,
};
use pg_embedded_setup_unpriv::TestCluster;
use rstest::rstest;
use tokio::runtime::Runtime;

mod support;

use support::embedded_shard::start_cluster;

const NOW: i64 = 1_700_000_000;

struct Shard {
    runtime: Runtime,
    router: Arc<ShardRouter>,
    store: DieselGameStore,
    _cluster: TestCluster,
}

fn shard() -> Option<Shard> {
    let cluster = start_cluster()?;
    let url = cluster.connection().database_url("postgres");
    let runtime = Runtime::new().expect("runtime starts");
    let router = Arc::new(
        ShardRouter::new(vec![PoolConfig::new(url).with_max_size(4)]).expect("one shard"),
    );
    runtime
        .block_on(DieselShardBootstrap::new(Arc::clone(&router)).apply_schema(0))
        .expect("schema applies");
    Some(Shard {
        runtime,
        store: DieselGameStore::new(Arc::clone(&router)),
        router,
        _cluster: cluster,
    })
}

async fn seed_user(store: &DieselGameStore, user_id: UserId) {
    let mut tx = store.begin(user_id).await.expect("begin");
    tx.insert_user(&User::register(user_id, NOW))
        .await
        .expect("user inserted");
    tx.commit().await.expect("commit");
}

fn stack(id: i64, user_id: UserId, amount: i64, at: i64) -> UserItem {
    UserItem {
        id,
        user_id,
        item_type: ItemKind::ExpMaterial,
        item_id: 11,
        amount,
        created_at: NOW,
        updated_at: at,
    }
}

fn deck(id: i64, user_id: UserId) -> UserDeck {
    UserDeck {
        id,
        user_id,
        user_card_id_1: 1,
        user_card_id_2: 2,
        user_card_id_3: 3,
        created_at: NOW,
        updated_at: NOW,
        deleted_at: None,
    }
}

#[rstest]
fn locked_user_blocks_a_second_writer_until_commit() {
    let Some(shard) = shard() else { return };
    let user_id = UserId::new(101);

    shard.runtime.block_on(async {
        seed_user(&shard.store, user_id).await;
        let mut first = shard.store.begin(user_id).await.expect("begin first");
        let mut user = first
            .lock_user(user_id)
            .await
            .expect("lock")
            .expect("user exists");

        let store = shard.store.clone();
        let second = tokio::spawn(async move {
            let mut tx = store.begin(user_id).await.expect("begin second");
            let seen = tx
                .lock_user(user_id)
                .await
                .expect("lock")
                .expect("user exists");
            tx.commit().await.expect("commit second");
            seen
        });
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(!second.is_finished(), "second lock waits for the first");

        user.isu_coin = 500;
        first.update_user(&user).await.expect("update");
        first.commit().await.expect("commit first");

        let seen = second.await.expect("second finishes");
        assert_eq!(seen.isu_coin, 500);
    });
}

#[rstest]
fn upserting_a_held_stack_overwrites_its_amount() {
    let Some(shard) = shard() else { return };
    let user_id = UserId::new(102);

    shard.runtime.block_on(async {
        seed_user(&shard.store, user_id).await;
        let mut tx = shard.store.begin(user_id).await.expect("begin");
        tx.upsert_items(&[stack(7, user_id, 3, NOW)])
            .await
            .expect("first upsert");
        tx.upsert_items(&[stack(7, user_id, 9, NOW + 5)])
            .await
            .expect("conflicting upsert");
        tx.commit().await.expect("commit");

        let mut tx = shard.store.begin(user_id).await.expect("begin");
        let items = tx.list_items(user_id).await.expect("lists");
        tx.commit().await.expect("commit");
        assert_eq!(items, vec![stack(7, user_id, 9, NOW + 5)]);
    });
}

#[rstest]
fn rollback_discards_the_transaction() {
    let Some(shard) = shard() else { return };
    let user_id = UserId::new(103);

    shard.runtime.block_on(async {
        let mut tx = shard.store.begin(user_id).await.expect("begin");
        tx.insert_user(&User::register(user_id, NOW))
            .await
            .expect("insert");
        tx.rollback().await.expect("rollback");

        let mut tx = shard.store.begin(user_id).await.expect("begin");
        let found = tx.find_user(user_id).await.expect("query");
        tx.commit().await.expect("commit");
        assert!(found.is_none());
    });
}

#[rstest]
fn only_one_deck_stays_active() {
    let Some(shard) = shard() else { return };
    let user_id = UserId::new(104);

    shard.runtime.block_on(async {
        seed_user(&shard.store, user_id).await;
        let mut tx = shard.store.begin(user_id).await.expect("begin");
        tx.insert_deck(&deck(1, user_id)).await.expect("first deck");
        tx.commit().await.expect("commit");

        let mut tx = shard.store.begin(user_id).await.expect("begin");
        let clash = tx.insert_deck(&deck(2, user_id)).await;
        tx.rollback().await.expect("rollback");
        assert!(clash.is_err(), "a second live deck is rejected");

        let mut tx = shard.store.begin(user_id).await.expect("begin");
        tx.retire_decks(user_id, NOW + 1).await.expect("retire");
        tx.insert_deck(&deck(2, user_id)).await.expect("replacement deck");
        let active = tx.find_active_deck(user_id).await.expect("query");
        tx.commit().await.expect("commit");
        assert_eq!(active.map(|row| row.id), Some(2));
    });
}

#[rstest]
fn device_lookups_see_committed_bindings() {
    let Some(shard) = shard() else { return };
    let user_id = UserId::new(105);
    let access = DieselAccessLookup::new(Arc::clone(&shard.router));

    shard.runtime.block_on(async {
        seed_user(&shard.store, user_id).await;
        let mut tx = shard.store.begin(user_id).await.expect("begin");
        tx.insert_device(&UserDevice {
            id: 1,
            user_id,
            platform_id: "viewer-1".to_owned(),
            platform_type: PlatformType::new(1).expect("valid platform"),
            created_at: NOW,
            updated_at: NOW,
        })
        .await
        .expect("device inserted");
        tx.commit().await.expect("commit");

        assert!(access.has_device(user_id, "viewer-1").await.expect("lookup"));
        assert!(!access.has_device(user_id, "viewer-2").await.expect("lookup"));
        assert!(!access.is_banned(user_id).await.expect("lookup"));
    });
}

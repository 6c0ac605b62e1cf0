//! PostgreSQL-backed master table loader.
//!
//! Master tables are replicated on every shard. A load reads all six tables
//! inside one read-only transaction on the shard owning the shard key, so
//! the snapshot never mixes rows from before and after a concurrent import.

use std::sync::Arc;

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use diesel_async::scoped_futures::ScopedFutureExt as _;
use tracing::debug;

use crate::domain::ports::{MasterDataSource, MasterDataSourceError};
use crate::domain::{MasterTables, UserId};

use super::diesel_basic_error_mapping::{
    map_basic_diesel_error, map_basic_pool_error, map_shard_error,
};
use super::models::{
    GachaItemMasterRow, GachaMasterRow, InvalidRow, ItemMasterRow, LoginBonusMasterRow,
    LoginBonusRewardMasterRow, PresentAllMasterRow,
};
use super::schema::{
    gacha_item_masters, gacha_masters, item_masters, login_bonus_masters,
    login_bonus_reward_masters, present_all_masters,
};
use super::shard_router::ShardRouter;

type MasterRows = (
    Vec<ItemMasterRow>,
    Vec<GachaMasterRow>,
    Vec<GachaItemMasterRow>,
    Vec<LoginBonusMasterRow>,
    Vec<LoginBonusRewardMasterRow>,
    Vec<PresentAllMasterRow>,
);

fn map_diesel_error(error: diesel::result::Error) -> MasterDataSourceError {
    map_basic_diesel_error(
        error,
        MasterDataSourceError::query,
        MasterDataSourceError::connection,
    )
}

fn map_invalid_row(error: InvalidRow) -> MasterDataSourceError {
    MasterDataSourceError::corrupt(error.to_string())
}

fn convert<R, T>(rows: Vec<R>) -> Result<Vec<T>, MasterDataSourceError>
where
    T: TryFrom<R, Error = InvalidRow>,
{
    rows.into_iter()
        .map(T::try_from)
        .collect::<Result<Vec<_>, _>>()
        .map_err(map_invalid_row)
}

fn into_tables(rows: MasterRows) -> Result<MasterTables, MasterDataSourceError> {
    let (items, gachas, gacha_items, login_bonuses, login_bonus_rewards, present_alls) = rows;
    Ok(MasterTables {
        items: convert(items)?,
        gachas: gachas.into_iter().map(Into::into).collect(),
        gacha_items: convert(gacha_items)?,
        login_bonuses: login_bonuses.into_iter().map(Into::into).collect(),
        login_bonus_rewards: convert(login_bonus_rewards)?,
        present_alls: convert(present_alls)?,
    })
}

/// Diesel-backed implementation of the [`MasterDataSource`] port.
#[derive(Clone)]
pub struct DieselMasterDataSource {
    router: Arc<ShardRouter>,
}

impl DieselMasterDataSource {
    /// Create a loader reading through `router`.
    pub fn new(router: Arc<ShardRouter>) -> Self {
        Self { router }
    }
}

#[async_trait]
impl MasterDataSource for DieselMasterDataSource {
    async fn load(&self, shard_key: UserId) -> Result<MasterTables, MasterDataSourceError> {
        let shard = self
            .router
            .shard_for(shard_key)
            .map_err(|error| map_shard_error(error, MasterDataSourceError::connection))?;
        let pool = shard
            .pool()
            .await
            .map_err(|error| map_shard_error(error, MasterDataSourceError::connection))?;
        let mut conn = pool
            .get()
            .await
            .map_err(|error| map_basic_pool_error(&error, MasterDataSourceError::connection))?;

        let rows: MasterRows = conn
            .build_transaction()
            .read_only()
            .run(|conn| {
                async move {
                    let items = item_masters::table
                        .select(ItemMasterRow::as_select())
                        .order_by(item_masters::id)
                        .load(conn)
                        .await?;
                    let gachas = gacha_masters::table
                        .select(GachaMasterRow::as_select())
                        .order_by((gacha_masters::display_order, gacha_masters::id))
                        .load(conn)
                        .await?;
                    let gacha_items = gacha_item_masters::table
                        .select(GachaItemMasterRow::as_select())
                        .order_by((gacha_item_masters::gacha_id, gacha_item_masters::id))
                        .load(conn)
                        .await?;
                    let login_bonuses = login_bonus_masters::table
                        .select(LoginBonusMasterRow::as_select())
                        .order_by(login_bonus_masters::id)
                        .load(conn)
                        .await?;
                    let login_bonus_rewards = login_bonus_reward_masters::table
                        .select(LoginBonusRewardMasterRow::as_select())
                        .order_by((
                            login_bonus_reward_masters::login_bonus_id,
                            login_bonus_reward_masters::reward_sequence,
                        ))
                        .load(conn)
                        .await?;
                    let present_alls = present_all_masters::table
                        .select(PresentAllMasterRow::as_select())
                        .order_by(present_all_masters::id)
                        .load(conn)
                        .await?;
                    Ok((
                        items,
                        gachas,
                        gacha_items,
                        login_bonuses,
                        login_bonus_rewards,
                        present_alls,
                    ))
                }
                .scope_boxed()
            })
            .await
            .map_err(map_diesel_error)?;

        let tables = into_tables(rows)?;
        debug!(
            shard = shard.index(),
            items = tables.items.len(),
            gachas = tables.gachas.len(),
            "master tables loaded"
        );
        Ok(tables)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn reward_row(item_type: i32) -> LoginBonusRewardMasterRow {
        LoginBonusRewardMasterRow {
            id: 4,
            login_bonus_id: 1,
            reward_sequence: 1,
            item_type,
            item_id: 1,
            amount: 100,
            created_at: 0,
        }
    }

    fn gacha_row() -> GachaMasterRow {
        GachaMasterRow {
            id: 37,
            name: "standard".to_owned(),
            start_at: 0,
            end_at: 10,
            display_order: 1,
            created_at: 0,
        }
    }

    #[rstest]
    fn rows_assemble_into_tables() {
        let rows: MasterRows = (
            Vec::new(),
            vec![gacha_row()],
            Vec::new(),
            Vec::new(),
            vec![reward_row(1)],
            Vec::new(),
        );

        let tables = into_tables(rows).expect("valid rows");

        assert_eq!(tables.gachas.len(), 1);
        assert_eq!(tables.login_bonus_rewards.len(), 1);
    }

    #[rstest]
    fn unknown_item_types_are_corrupt() {
        let rows: MasterRows = (
            Vec::new(),
            Vec::new(),
            Vec::new(),
            Vec::new(),
            vec![reward_row(0)],
            Vec::new(),
        );

        let err = into_tables(rows).expect_err("item type 0");

        assert!(matches!(err, MasterDataSourceError::Corrupt { ref message } if message.contains("login_bonus_reward_masters")));
    }
}

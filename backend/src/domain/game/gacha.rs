//! Gacha listing and weighted draws.

use serde::Serialize;
use tracing::info;

use crate::domain::ports::{GameStore, GameTransaction};
use crate::domain::rewards::draw_prize;
use crate::domain::{
    Error, GachaItemMaster, GachaMaster, TokenType, UserId, UserPresent, reason,
};

use super::{GameService, map_store_error};

/// Coin cost of a single draw.
pub const GACHA_COST_PER_DRAW: i64 = 1000;

const ALLOWED_DRAW_COUNTS: [u32; 2] = [1, 10];

/// One active gacha with its full prize table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GachaWithPrizes {
    pub gacha: GachaMaster,
    pub gacha_item_list: Vec<GachaItemMaster>,
}

/// Active gachas plus the token required to draw from them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GachaListing {
    /// Empty when no gacha is active.
    pub one_time_token: String,
    pub gachas: Vec<GachaWithPrizes>,
}

/// Draw input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawGachaRequest {
    pub viewer_id: String,
    pub one_time_token: String,
    pub gacha_id: i64,
    /// Number of draws; only 1 and 10 are accepted.
    pub count: u32,
}

/// Prizes mailed to the user by a draw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawGachaResponse {
    pub presents: Vec<UserPresent>,
}

struct DrawPlan<'a> {
    cost: i64,
    prizes: Vec<GachaItemMaster>,
    message: String,
    token: &'a str,
}

impl<G> GameService<G>
where
    G: GameStore,
{
    /// List active gachas and issue a gacha token.
    ///
    /// Fails when any active gacha has an empty prize table. No token is
    /// issued when nothing is active.
    pub async fn list_gacha(&self, user_id: UserId, now: i64) -> Result<GachaListing, Error> {
        self.bounded("list_gacha", async {
            let snapshot = self.snapshot(user_id).await?;
            let mut gachas = Vec::new();
            for gacha in snapshot.active_gachas(now) {
                let prizes = snapshot.gacha_prizes(gacha.id);
                if prizes.is_empty() {
                    return Err(Error::not_found(reason::GACHA_ITEM_NOT_FOUND));
                }
                gachas.push(GachaWithPrizes {
                    gacha: gacha.clone(),
                    gacha_item_list: prizes.into_iter().cloned().collect(),
                });
            }
            if gachas.is_empty() {
                return Ok(GachaListing {
                    one_time_token: String::new(),
                    gachas,
                });
            }

            let mut tx = self.begin(user_id).await?;
            let outcome = self.record_token(&mut tx, user_id, TokenType::Gacha, now).await;
            let record = Self::finish(tx, outcome).await?;
            let one_time_token = self.activate_token(record).await?;
            Ok(GachaListing {
                one_time_token,
                gachas,
            })
        })
        .await
    }

    /// Draw from a gacha and mail the prizes.
    ///
    /// The whole batch is paid for with one balance update in the same
    /// transaction that inserts the presents.
    pub async fn draw_gacha(
        &self,
        user_id: UserId,
        request: &DrawGachaRequest,
        now: i64,
    ) -> Result<DrawGachaResponse, Error> {
        if !ALLOWED_DRAW_COUNTS.contains(&request.count) {
            return Err(Error::invalid_request(reason::INVALID_DRAW_COUNT));
        }
        self.bounded("draw_gacha", async {
            self.consume_token(user_id, &request.one_time_token, TokenType::Gacha, now)
                .await?;
            self.ensure_device(user_id, &request.viewer_id).await?;

            let snapshot = self.snapshot(user_id).await?;
            let gacha = snapshot
                .gacha(request.gacha_id, now)
                .ok_or_else(|| Error::not_found(reason::GACHA_NOT_FOUND))?;
            let table: Vec<GachaItemMaster> = snapshot
                .gacha_prizes(gacha.id)
                .into_iter()
                .filter(|entry| entry.weight > 0)
                .cloned()
                .collect();
            if table.is_empty() {
                return Err(Error::not_found(reason::GACHA_ITEM_NOT_FOUND));
            }
            let plan = DrawPlan {
                cost: GACHA_COST_PER_DRAW * i64::from(request.count),
                prizes: self.draw_many(&table, request.count),
                message: format!("{}の付与アイテムです", gacha.name),
                token: &request.one_time_token,
            };

            let mut tx = self.begin(user_id).await?;
            let outcome = self.pay_and_mail(&mut tx, user_id, &plan, now).await;
            let presents = Self::finish(tx, outcome).await?;
            info!(%user_id, gacha_id = gacha.id, count = request.count, "gacha drawn");
            Ok(DrawGachaResponse { presents })
        })
        .await
    }

    fn draw_many(&self, table: &[GachaItemMaster], count: u32) -> Vec<GachaItemMaster> {
        let mut rng = self.rng();
        (0..count)
            .filter_map(|_| draw_prize(&mut *rng, table).cloned())
            .collect()
    }

    async fn pay_and_mail(
        &self,
        tx: &mut G::Transaction,
        user_id: UserId,
        plan: &DrawPlan<'_>,
        now: i64,
    ) -> Result<Vec<UserPresent>, Error> {
        let mut user = tx
            .lock_user(user_id)
            .await
            .map_err(map_store_error)?
            .ok_or_else(|| Error::not_found(reason::USER_NOT_FOUND))?;
        if user.isu_coin < plan.cost {
            return Err(Error::conflict(reason::NOT_ENOUGH_COIN));
        }

        let presents: Vec<UserPresent> = plan
            .prizes
            .iter()
            .map(|prize| UserPresent {
                id: self.ids.next_id(),
                user_id,
                sent_at: now,
                item_type: prize.item_type,
                item_id: prize.item_id,
                amount: prize.amount,
                present_message: plan.message.clone(),
                created_at: now,
                updated_at: now,
                deleted_at: None,
            })
            .collect();
        tx.insert_presents(&presents).await.map_err(map_store_error)?;

        user.isu_coin -= plan.cost;
        user.updated_at = now;
        tx.update_user(&user).await.map_err(map_store_error)?;
        tx.retire_token_record(user_id, plan.token, now)
            .await
            .map_err(map_store_error)?;
        Ok(presents)
    }
}

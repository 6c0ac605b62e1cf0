//! Schema-validated request bodies and path parameters.
//!
//! Each game operation decodes its JSON body once at the boundary into one of
//! these types, then converts it into the domain request. Every decoding
//! failure becomes an `invalid_request` error carrying the offending field,
//! before any domain service runs.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;

use crate::domain::{
    AddExpRequest, ConsumeItem, CreateUserRequest, DrawGachaRequest, Error, UpdateDeckRequest,
    UserId, reason,
};

fn invalid_field(field: &str, code: &str) -> Error {
    Error::invalid_request(reason::INVALID_REQUEST_BODY).with_details(json!({
        "field": field,
        "code": code,
    }))
}

/// Decode a JSON body, mapping shape errors to `invalid_request`.
pub fn decode_body<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, Error> {
    serde_json::from_slice(bytes).map_err(|err| {
        Error::invalid_request(reason::INVALID_REQUEST_BODY).with_details(json!({
            "line": err.line(),
            "column": err.column(),
            "code": "malformed_body",
        }))
    })
}

/// Parse a numeric path segment such as `{cardId}` or `{gachaId}`.
pub fn parse_path_id(field: &str, raw: &str) -> Result<i64, Error> {
    raw.parse::<i64>()
        .map_err(|_| invalid_field(field, "invalid_number"))
}

/// Parse the `{userId}` path segment.
pub fn parse_user_id(raw: &str) -> Result<UserId, Error> {
    raw.parse::<u64>()
        .map(UserId::new)
        .map_err(|_| invalid_field("userId", "invalid_number"))
}

fn require_viewer(viewer_id: &str) -> Result<(), Error> {
    if viewer_id.trim().is_empty() {
        return Err(invalid_field("viewerId", "missing_field"));
    }
    Ok(())
}

/// `POST /user` body.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserBody {
    pub viewer_id: String,
    pub platform_type: i32,
}

impl TryFrom<CreateUserBody> for CreateUserRequest {
    type Error = Error;

    fn try_from(body: CreateUserBody) -> Result<Self, Self::Error> {
        require_viewer(&body.viewer_id)?;
        Ok(Self {
            viewer_id: body.viewer_id,
            platform_type: body.platform_type,
        })
    }
}

/// `POST /login` body.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginBody {
    pub viewer_id: String,
    pub user_id: u64,
}

impl LoginBody {
    /// The validated user id and viewer id.
    pub fn into_parts(self) -> Result<(UserId, String), Error> {
        require_viewer(&self.viewer_id)?;
        Ok((UserId::new(self.user_id), self.viewer_id))
    }
}

/// Body carrying only the viewer id (`reward`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewerBody {
    pub viewer_id: String,
}

impl ViewerBody {
    /// The validated viewer id.
    pub fn into_viewer_id(self) -> Result<String, Error> {
        require_viewer(&self.viewer_id)?;
        Ok(self.viewer_id)
    }
}

/// `POST /user/{userId}/gacha/draw/{gachaId}/{n}` body.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawGachaBody {
    pub viewer_id: String,
    pub one_time_token: String,
}

impl DrawGachaBody {
    /// Combine with the `{gachaId}` and `{n}` path segments.
    ///
    /// The draw count is only checked for being a number here; the service
    /// decides which counts are allowed.
    pub fn into_request(self, gacha_id: &str, count: &str) -> Result<DrawGachaRequest, Error> {
        require_viewer(&self.viewer_id)?;
        let gacha_id = parse_path_id("gachaId", gacha_id)?;
        let count = count
            .parse::<u32>()
            .map_err(|_| Error::invalid_request(reason::INVALID_DRAW_COUNT))?;
        Ok(DrawGachaRequest {
            viewer_id: self.viewer_id,
            one_time_token: self.one_time_token,
            gacha_id,
            count,
        })
    }
}

/// `POST /user/{userId}/present/receive` body.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceivePresentBody {
    pub viewer_id: String,
    #[serde(default)]
    pub present_ids: Vec<i64>,
}

impl ReceivePresentBody {
    /// The validated viewer id and requested present ids.
    pub fn into_parts(self) -> Result<(String, Vec<i64>), Error> {
        require_viewer(&self.viewer_id)?;
        Ok((self.viewer_id, self.present_ids))
    }
}

/// One material entry of an add-exp body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ConsumeItemBody {
    pub id: i64,
    pub amount: i64,
}

/// `POST /user/{userId}/card/addexp/{cardId}` body.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddExpBody {
    pub viewer_id: String,
    pub one_time_token: String,
    #[serde(default)]
    pub items: Vec<ConsumeItemBody>,
}

impl AddExpBody {
    /// Combine with the `{cardId}` path segment.
    pub fn into_request(self, card_id: &str) -> Result<AddExpRequest, Error> {
        require_viewer(&self.viewer_id)?;
        let card_id = parse_path_id("cardId", card_id)?;
        Ok(AddExpRequest {
            viewer_id: self.viewer_id,
            one_time_token: self.one_time_token,
            card_id,
            items: self
                .items
                .into_iter()
                .map(|item| ConsumeItem {
                    id: item.id,
                    amount: item.amount,
                })
                .collect(),
        })
    }
}

/// `POST /user/{userId}/card` body.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDeckBody {
    pub viewer_id: String,
    #[serde(default)]
    pub card_ids: Vec<i64>,
}

impl TryFrom<UpdateDeckBody> for UpdateDeckRequest {
    type Error = Error;

    fn try_from(body: UpdateDeckBody) -> Result<Self, Self::Error> {
        require_viewer(&body.viewer_id)?;
        Ok(Self {
            viewer_id: body.viewer_id,
            card_ids: body.card_ids,
        })
    }
}

#[cfg(test)]
mod tests;

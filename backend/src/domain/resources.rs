//! Response bundle describing the state a game operation changed.

use serde::Serialize;

use super::{User, UserCard, UserDeck, UserDevice, UserItem, UserLoginBonus, UserPresent};

/// Authoritative copies of every row an operation touched.
///
/// Absent fields are omitted from the JSON body, meaning "unchanged".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatedResources {
    pub now: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_device: Option<UserDevice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_cards: Option<Vec<UserCard>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_decks: Option<Vec<UserDeck>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_items: Option<Vec<UserItem>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_login_bonuses: Option<Vec<UserLoginBonus>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_presents: Option<Vec<UserPresent>>,
}

impl UpdatedResources {
    /// Empty bundle stamped with the request time.
    pub fn at(now: i64) -> Self {
        Self {
            now,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unchanged_resources_are_omitted() {
        let resources = UpdatedResources {
            user_presents: Some(Vec::new()),
            ..UpdatedResources::at(1_700_000_000)
        };
        let value = serde_json::to_value(&resources).expect("serialises");
        assert_eq!(value, json!({ "now": 1_700_000_000, "userPresents": [] }));
    }
}

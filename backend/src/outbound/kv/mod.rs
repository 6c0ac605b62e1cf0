//! Redis adapters for the shared key/value store.
//!
//! The master version marker, login sessions and one-time tokens live in
//! disjoint key namespaces of one store:
//!
//! - `master_version`: authoritative master-data version string
//! - `user_session:{session_id}`: owning user id, expiring
//! - `one_time_token:{user_id}`: hash of the user's single live token

mod master_version;
mod pool;
mod session_store;
mod token_store;

pub use master_version::RedisMasterVersionStore;
pub use pool::{RedisConfig, RedisPool, RedisPoolError};
pub use session_store::RedisSessionStore;
pub use token_store::RedisTokenStore;

use crate::domain::UserId;

/// Key holding the authoritative master version.
pub const MASTER_VERSION_KEY: &str = "master_version";

const SESSION_PREFIX: &str = "user_session:";
const TOKEN_PREFIX: &str = "one_time_token:";

/// Key of a login session.
pub fn session_key(session_id: &str) -> String {
    format!("{SESSION_PREFIX}{session_id}")
}

/// Key of a user's one-time token.
pub fn token_key(user_id: UserId) -> String {
    format!("{TOKEN_PREFIX}{user_id}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn namespaces_do_not_collide() {
        let session = session_key("42");
        let token = token_key(UserId::new(42));

        assert_eq!(session, "user_session:42");
        assert_eq!(token, "one_time_token:42");
        assert_ne!(session, token);
        assert_ne!(session, MASTER_VERSION_KEY);
    }
}

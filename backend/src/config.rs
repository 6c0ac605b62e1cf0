//! Runtime configuration loaded via OrthoConfig.
//!
//! Every field is optional at load time; accessors apply defaults and
//! validate the values the adapters and the engine consume.

use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;

use crate::domain::{
    DEFAULT_DAY_OFFSET_SECS, GameCalendar, GameCalendarError, GameSettings, IdGenerator,
    IdGeneratorError,
};
use crate::outbound::kv::RedisConfig;
use crate::outbound::persistence::PoolConfig;

const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";
const DEFAULT_POOL_MAX_SIZE: u32 = 10;
const DEFAULT_POOL_CONNECTION_TIMEOUT_SECS: u64 = 30;
const DEFAULT_STATEMENT_TIMEOUT_SECS: u64 = 5;
const DEFAULT_SESSION_TTL_SECS: u64 = 86_400;
const DEFAULT_ONE_TIME_TOKEN_TTL_SECS: u64 = 600;

/// Errors raised while validating loaded settings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    /// No shard URL was configured.
    #[error("at least one shard URL is required")]
    NoShards,
    /// A comma-separated entry was blank.
    #[error("shard URL at position {position} is empty")]
    BlankShardUrl { position: usize },
    /// A duration setting was zero.
    #[error("{field} must be greater than zero")]
    ZeroDuration { field: &'static str },
    /// The day offset could not be represented.
    #[error(transparent)]
    Calendar(#[from] GameCalendarError),
    /// The node id does not fit the identifier layout.
    #[error(transparent)]
    NodeId(#[from] IdGeneratorError),
}

/// Process settings for the game backend.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "CONQUEST")]
pub struct AppSettings {
    /// Comma-separated PostgreSQL URLs; position is the shard index.
    pub shard_urls: Option<String>,
    /// Redis URL for sessions, tokens and the master version.
    pub redis_url: Option<String>,
    /// Maximum connections per shard pool.
    pub pool_max_size: Option<u32>,
    /// Seconds to wait for a pooled connection.
    pub pool_connection_timeout_secs: Option<u64>,
    /// Upper bound for one game operation.
    pub statement_timeout_secs: Option<u64>,
    /// Identifier generator node.
    pub node_id: Option<u16>,
    /// Login session lifetime.
    pub session_ttl_secs: Option<u64>,
    /// One-time token lifetime.
    pub one_time_token_ttl_secs: Option<u64>,
    /// Offset from UTC at which a game day starts.
    pub day_offset_secs: Option<i32>,
}

fn non_zero(field: &'static str, secs: u64) -> Result<Duration, SettingsError> {
    if secs == 0 {
        return Err(SettingsError::ZeroDuration { field });
    }
    Ok(Duration::from_secs(secs))
}

impl AppSettings {
    /// Shard URLs in index order.
    pub fn shard_urls(&self) -> Result<Vec<String>, SettingsError> {
        let raw = self.shard_urls.as_deref().unwrap_or_default().trim();
        if raw.is_empty() {
            return Err(SettingsError::NoShards);
        }
        raw.split(',')
            .enumerate()
            .map(|(position, url)| {
                let url = url.trim();
                if url.is_empty() {
                    Err(SettingsError::BlankShardUrl { position })
                } else {
                    Ok(url.to_owned())
                }
            })
            .collect()
    }

    /// One pool configuration per shard.
    pub fn shard_configs(&self) -> Result<Vec<PoolConfig>, SettingsError> {
        let timeout = non_zero(
            "pool_connection_timeout_secs",
            self.pool_connection_timeout_secs
                .unwrap_or(DEFAULT_POOL_CONNECTION_TIMEOUT_SECS),
        )?;
        let max_size = self.pool_max_size.unwrap_or(DEFAULT_POOL_MAX_SIZE).max(1);
        Ok(self
            .shard_urls()?
            .into_iter()
            .map(|url| {
                PoolConfig::new(url)
                    .with_max_size(max_size)
                    .with_connection_timeout(timeout)
            })
            .collect())
    }

    /// Redis URL, falling back to a local instance.
    pub fn redis_url(&self) -> &str {
        self.redis_url.as_deref().unwrap_or(DEFAULT_REDIS_URL)
    }

    /// Redis pool configuration.
    pub fn redis_config(&self) -> RedisConfig {
        RedisConfig::new(self.redis_url())
    }

    /// Engine settings: lifetimes, operation bound and calendar.
    pub fn game_settings(&self) -> Result<GameSettings, SettingsError> {
        Ok(GameSettings {
            session_ttl: non_zero(
                "session_ttl_secs",
                self.session_ttl_secs.unwrap_or(DEFAULT_SESSION_TTL_SECS),
            )?,
            token_ttl: non_zero(
                "one_time_token_ttl_secs",
                self.one_time_token_ttl_secs
                    .unwrap_or(DEFAULT_ONE_TIME_TOKEN_TTL_SECS),
            )?,
            transaction_timeout: non_zero(
                "statement_timeout_secs",
                self.statement_timeout_secs
                    .unwrap_or(DEFAULT_STATEMENT_TIMEOUT_SECS),
            )?,
            calendar: GameCalendar::new(self.day_offset_secs.unwrap_or(DEFAULT_DAY_OFFSET_SECS))?,
        })
    }

    /// Identifier generator for the configured node.
    pub fn id_generator(&self) -> Result<IdGenerator, SettingsError> {
        Ok(IdGenerator::new(self.node_id.unwrap_or_default())?)
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for settings parsing.

    use super::*;
    use std::ffi::OsString;

    use env_lock::lock_env;
    use rstest::rstest;

    const KEYS: [&str; 9] = [
        "CONQUEST_SHARD_URLS",
        "CONQUEST_REDIS_URL",
        "CONQUEST_POOL_MAX_SIZE",
        "CONQUEST_POOL_CONNECTION_TIMEOUT_SECS",
        "CONQUEST_STATEMENT_TIMEOUT_SECS",
        "CONQUEST_NODE_ID",
        "CONQUEST_SESSION_TTL_SECS",
        "CONQUEST_ONE_TIME_TOKEN_TTL_SECS",
        "CONQUEST_DAY_OFFSET_SECS",
    ];

    fn load_from_empty_args() -> AppSettings {
        AppSettings::load_from_iter([OsString::from("conquest")]).expect("config should load")
    }

    fn cleared_with(overrides: &[(&str, &str)]) -> Vec<(&'static str, Option<String>)> {
        KEYS.iter()
            .map(|key| {
                let value = overrides
                    .iter()
                    .find(|(name, _)| name == key)
                    .map(|(_, value)| (*value).to_owned());
                (*key, value)
            })
            .collect()
    }

    fn settings_with_shards(urls: Option<&str>) -> AppSettings {
        AppSettings {
            shard_urls: urls.map(str::to_owned),
            redis_url: None,
            pool_max_size: None,
            pool_connection_timeout_secs: None,
            statement_timeout_secs: None,
            node_id: None,
            session_ttl_secs: None,
            one_time_token_ttl_secs: None,
            day_offset_secs: None,
        }
    }

    #[rstest]
    fn default_values_are_used_when_missing() {
        let _guard = lock_env(cleared_with(&[]));

        let settings = load_from_empty_args();

        assert_eq!(settings.redis_url(), DEFAULT_REDIS_URL);
        assert_eq!(settings.shard_urls(), Err(SettingsError::NoShards));
        let game = settings.game_settings().expect("defaults are valid");
        assert_eq!(game.session_ttl, Duration::from_secs(86_400));
        assert_eq!(game.token_ttl, Duration::from_secs(600));
        assert_eq!(game.calendar, GameCalendar::default());
    }

    #[rstest]
    fn environment_overrides_are_respected() {
        let _guard = lock_env(cleared_with(&[
            ("CONQUEST_SHARD_URLS", "postgres://a/db, postgres://b/db"),
            ("CONQUEST_REDIS_URL", "redis://cache:6379"),
            ("CONQUEST_POOL_MAX_SIZE", "4"),
            ("CONQUEST_SESSION_TTL_SECS", "60"),
            ("CONQUEST_DAY_OFFSET_SECS", "0"),
            ("CONQUEST_NODE_ID", "7"),
        ]));

        let settings = load_from_empty_args();

        let shards = settings.shard_configs().expect("two shards");
        assert_eq!(shards.len(), 2);
        assert_eq!(
            shards.iter().map(PoolConfig::database_url).collect::<Vec<_>>(),
            ["postgres://a/db", "postgres://b/db"]
        );
        assert_eq!(settings.redis_url(), "redis://cache:6379");
        assert_eq!(settings.pool_max_size, Some(4));
        let game = settings.game_settings().expect("valid overrides");
        assert_eq!(game.session_ttl, Duration::from_secs(60));
        assert_eq!(game.calendar, GameCalendar::new(0).expect("utc"));
        assert!(settings.id_generator().is_ok());
    }

    #[rstest]
    #[case(Some(""), SettingsError::NoShards)]
    #[case(Some("   "), SettingsError::NoShards)]
    #[case(None, SettingsError::NoShards)]
    #[case(Some("postgres://a/db,,postgres://c/db"), SettingsError::BlankShardUrl { position: 1 })]
    fn invalid_shard_lists_are_rejected(#[case] urls: Option<&str>, #[case] expected: SettingsError) {
        assert_eq!(settings_with_shards(urls).shard_urls(), Err(expected));
    }

    #[rstest]
    fn zero_lifetimes_are_rejected() {
        let mut settings = settings_with_shards(Some("postgres://a/db"));
        settings.one_time_token_ttl_secs = Some(0);

        let err = settings.game_settings().expect_err("zero ttl");

        assert_eq!(
            err,
            SettingsError::ZeroDuration {
                field: "one_time_token_ttl_secs"
            }
        );
    }

    #[rstest]
    fn out_of_range_node_ids_are_rejected() {
        let mut settings = settings_with_shards(Some("postgres://a/db"));
        settings.node_id = Some(u16::MAX);

        assert!(matches!(
            settings.id_generator(),
            Err(SettingsError::NodeId(_))
        ));
    }

    #[rstest]
    fn out_of_range_offsets_are_rejected() {
        let mut settings = settings_with_shards(Some("postgres://a/db"));
        settings.day_offset_secs = Some(90_000);

        assert!(matches!(
            settings.game_settings(),
            Err(SettingsError::Calendar(_))
        ));
    }
}

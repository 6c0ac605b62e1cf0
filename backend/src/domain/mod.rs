//! Domain primitives, game rules and services.
//!
//! Purpose: define the strongly typed game state, the pure reward rules and
//! the services that compose them over driven ports. Nothing here knows about
//! Diesel, Redis or HTTP.
//!
//! Public surface:
//! - Error (alias to `error::Error`): stable error payload.
//! - ErrorCode (alias to `error::ErrorCode`): error category.
//! - GameService: the per-user transaction engine.
//! - AdminService: shard bootstrap and master version publication.
//! - MasterDataCache / AccessRegistry: process-local caches.

pub mod access;
pub mod admin;
pub mod error;
pub mod game;
pub mod ids;
pub mod master;
pub mod master_cache;
pub mod ports;
pub mod resources;
pub mod rewards;
pub mod time;
pub mod user_state;

pub use self::access::AccessRegistry;
pub use self::admin::AdminService;
pub use self::error::{
    DomainError, DomainErrorValidationError, Error, ErrorCode, ErrorValidationError, reason,
};
pub use self::game::{
    AddExpRequest, ConsumeItem, CreateUserRequest, CreateUserResponse, DrawGachaRequest,
    DrawGachaResponse, GachaListing, GachaWithPrizes, GamePorts, GameService, GameSettings,
    HomeResponse, ItemListing, LoginResponse, PresentPage, UpdateDeckRequest,
};
pub use self::ids::{IdGenerator, IdGeneratorError, UserId};
pub use self::master::{
    GachaItemMaster, GachaMaster, ItemKind, ItemMaster, LoginBonusMaster, LoginBonusRewardMaster,
    MasterTables, PresentAllMaster, UnknownItemKind,
};
pub use self::master_cache::{MasterCacheError, MasterDataCache, MasterSnapshot};
pub use self::resources::UpdatedResources;
pub use self::time::{DEFAULT_DAY_OFFSET_SECS, GameCalendar, GameCalendarError};
pub use self::user_state::{
    DECK_CARD_COUNT, OneTimeTokenRecord, PlatformType, PlatformTypeError, Session, TokenType,
    UnknownTokenType, User, UserCard, UserDeck, UserDevice, UserItem, UserLoginBonus, UserPresent,
    UserPresentAllReceivedHistory,
};

/// Convenient API result alias.
///
/// # Examples
/// ```
/// use conquest_backend::domain::{ApiResult, Error};
///
/// fn handler() -> ApiResult<()> {
///     Err(Error::forbidden("nope"))
/// }
/// assert!(handler().is_err());
/// ```
pub type ApiResult<T> = Result<T, Error>;

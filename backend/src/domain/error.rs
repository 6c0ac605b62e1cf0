//! Domain-level error types.
//!
//! These errors are transport agnostic. Inbound adapters map them to HTTP
//! responses or any other protocol-specific envelope. The reason strings in
//! [`reason`] are part of the client contract and must stay stable.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Stable reason strings surfaced to clients.
pub mod reason {
    /// Request body failed shape or range validation.
    pub const INVALID_REQUEST_BODY: &str = "invalid request body";
    /// Client master version does not match the authoritative version.
    pub const INVALID_MASTER_VERSION: &str = "invalid master version";
    /// Item kind outside the known set.
    pub const INVALID_ITEM_TYPE: &str = "invalid item type";
    /// One-time token missing, mismatched, expired or already used.
    pub const INVALID_TOKEN: &str = "invalid token";
    /// Unknown user.
    pub const USER_NOT_FOUND: &str = "not found user";
    /// Viewer id is not bound to the user.
    pub const USER_DEVICE_NOT_FOUND: &str = "not found user device";
    /// Unknown item master row.
    pub const ITEM_NOT_FOUND: &str = "not found item";
    /// Login bonus reward step missing from master data.
    pub const LOGIN_BONUS_REWARD_NOT_FOUND: &str = "not found login bonus reward";
    /// Session missing, malformed or banned user.
    pub const UNAUTHORIZED: &str = "unauthorized user";
    /// Session belongs to another user.
    pub const FORBIDDEN: &str = "forbidden";
    /// Unknown or inactive gacha.
    pub const GACHA_NOT_FOUND: &str = "not found gacha";
    /// Gacha without prize rows.
    pub const GACHA_ITEM_NOT_FOUND: &str = "not found gacha item";
    /// Draw count other than 1 or 10.
    pub const INVALID_DRAW_COUNT: &str = "invalid draw gacha times";
    /// Balance below the draw cost.
    pub const NOT_ENOUGH_COIN: &str = "not enough isucoin";
    /// Empty present id list.
    pub const EMPTY_PRESENT_IDS: &str = "presentIds is empty";
    /// Present page index below one.
    pub const INVALID_PAGE: &str = "index number is more than 1";
    /// Unknown card instance.
    pub const CARD_NOT_FOUND: &str = "not found card";
    /// Card already at its level cap.
    pub const CARD_MAX_LEVEL: &str = "target card is max level";
    /// Material held in a smaller quantity than requested.
    pub const ITEM_NOT_ENOUGH: &str = "item not enough";
    /// Deck request without exactly three cards.
    pub const INVALID_CARD_COUNT: &str = "invalid number of cards";
    /// Deck request naming cards the user does not own.
    pub const INVALID_CARD_IDS: &str = "invalid card ids";
    /// No active deck for the user.
    pub const DECK_NOT_FOUND: &str = "not found deck";
    /// Active deck does not resolve to three cards.
    pub const INVALID_DECK_CARDS: &str = "invalid cards length";
}

/// Stable machine-readable error code describing the failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// The request is malformed or fails validation.
    InvalidRequest,
    /// Authentication failed or is missing.
    Unauthorized,
    /// Authenticated but not permitted to perform this action.
    Forbidden,
    /// The requested resource does not exist.
    NotFound,
    /// The request conflicts with current state (e.g. insufficient balance).
    Conflict,
    /// The request is well formed but cannot be processed in this state.
    UnprocessableEntity,
    /// A backing store is unreachable.
    ServiceUnavailable,
    /// An unexpected error occurred inside the domain.
    InternalError,
}

/// Domain error payload.
///
/// ## Invariants
/// - `message` must be non-empty once trimmed of whitespace.
///
/// # Examples
/// ```
/// use conquest_backend::domain::{Error, ErrorCode};
///
/// let err = Error::new(ErrorCode::NotFound, "missing");
/// assert_eq!(err.code(), ErrorCode::NotFound);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(deny_unknown_fields)]
#[serde(try_from = "ErrorDto", into = "ErrorDto")]
pub struct DomainError {
    code: ErrorCode,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
}

/// Validation errors emitted by the constructors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainErrorValidationError {
    /// The message was empty or whitespace only.
    #[error("error message must not be empty")]
    EmptyMessage,
}

/// Short alias used throughout the crate.
pub type Error = DomainError;

/// Alias of [`DomainErrorValidationError`] matching [`Error`].
pub type ErrorValidationError = DomainErrorValidationError;

impl DomainError {
    /// Create a new error, panicking if validation fails.
    ///
    /// # Panics
    ///
    /// Panics when `message` is blank. Callers pass string literals or
    /// formatted reasons, so this only trips on programming mistakes.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        match Self::try_new(code, message) {
            Ok(value) => value,
            Err(err) => panic!("error messages must satisfy validation: {err}"),
        }
    }

    /// Fallible constructor that validates the message content.
    pub fn try_new(code: ErrorCode, message: impl Into<String>) -> Result<Self, DomainErrorValidationError> {
        let message = message.into();
        if message.trim().is_empty() {
            return Err(DomainErrorValidationError::EmptyMessage);
        }
        Ok(Self {
            code,
            message,
            details: None,
        })
    }

    /// Stable machine-readable error code.
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// Human-readable message returned to adapters.
    pub fn message(&self) -> &str {
        self.message.as_str()
    }

    /// Supplementary error details for adapters.
    pub fn details(&self) -> Option<&Value> {
        self.details.as_ref()
    }

    /// Attach structured details to the error.
    ///
    /// # Examples
    /// ```
    /// use conquest_backend::domain::{Error, ErrorCode};
    /// use serde_json::json;
    ///
    /// let err = Error::new(ErrorCode::InvalidRequest, "bad")
    ///     .with_details(json!({ "field": "viewerId" }));
    /// assert!(err.details().is_some());
    /// ```
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Convenience constructor for [`ErrorCode::InvalidRequest`].
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidRequest, message)
    }

    /// Convenience constructor for [`ErrorCode::Unauthorized`].
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    /// Convenience constructor for [`ErrorCode::Forbidden`].
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    /// Convenience constructor for [`ErrorCode::NotFound`].
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    /// Convenience constructor for [`ErrorCode::Conflict`].
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Conflict, message)
    }

    /// Convenience constructor for [`ErrorCode::UnprocessableEntity`].
    pub fn unprocessable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::UnprocessableEntity, message)
    }

    /// Convenience constructor for [`ErrorCode::ServiceUnavailable`].
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ServiceUnavailable, message)
    }

    /// Convenience constructor for [`ErrorCode::InternalError`].
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}

impl std::fmt::Display for DomainError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for DomainError {}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorDto {
    code: ErrorCode,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
}

impl From<DomainError> for ErrorDto {
    fn from(value: DomainError) -> Self {
        Self {
            code: value.code,
            message: value.message,
            details: value.details,
        }
    }
}

impl TryFrom<ErrorDto> for DomainError {
    type Error = DomainErrorValidationError;

    fn try_from(value: ErrorDto) -> Result<Self, Self::Error> {
        let ErrorDto {
            code,
            message,
            details,
        } = value;

        let mut error = Self::try_new(code, message)?;
        error.details = details;
        Ok(error)
    }
}

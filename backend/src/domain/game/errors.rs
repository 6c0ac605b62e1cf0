//! Translate port failures into domain errors.
//!
//! Connection failures become `service_unavailable`; everything else is an
//! internal fault. Port messages are kept for logs but never reach clients
//! verbatim because the HTTP layer redacts internal errors.

use crate::domain::Error;
use crate::domain::MasterCacheError;
use crate::domain::ports::{
    AccessLookupError, GameStoreError, MasterDataSourceError, MasterVersionStoreError,
    OneTimeTokenStoreError, SessionStoreError,
};

pub(crate) fn map_store_error(error: GameStoreError) -> Error {
    match error {
        GameStoreError::Connection { message } => {
            Error::service_unavailable(format!("game store unavailable: {message}"))
        }
        GameStoreError::Query { message } => Error::internal(format!("game store error: {message}")),
        GameStoreError::Corrupt { message } => {
            Error::internal(format!("game store returned invalid data: {message}"))
        }
    }
}

pub(crate) fn map_master_error(error: MasterCacheError) -> Error {
    match error {
        MasterCacheError::Version(MasterVersionStoreError::Connection { message })
        | MasterCacheError::Source(MasterDataSourceError::Connection { message }) => {
            Error::service_unavailable(format!("master data unavailable: {message}"))
        }
        other => Error::internal(format!("master data error: {other}")),
    }
}

pub(crate) fn map_access_error(error: AccessLookupError) -> Error {
    match error {
        AccessLookupError::Connection { message } => {
            Error::service_unavailable(format!("access lookup unavailable: {message}"))
        }
        AccessLookupError::Query { message } => Error::internal(format!("access lookup error: {message}")),
    }
}

pub(crate) fn map_session_error(error: SessionStoreError) -> Error {
    match error {
        SessionStoreError::Connection { message } => {
            Error::service_unavailable(format!("session store unavailable: {message}"))
        }
        other => Error::internal(format!("session store error: {other}")),
    }
}

pub(crate) fn map_token_error(error: OneTimeTokenStoreError) -> Error {
    match error {
        OneTimeTokenStoreError::Connection { message } => {
            Error::service_unavailable(format!("token store unavailable: {message}"))
        }
        OneTimeTokenStoreError::Command { message } => {
            Error::internal(format!("token store error: {message}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorCode;
    use rstest::rstest;

    #[rstest]
    #[case(map_store_error(GameStoreError::connection("refused")), ErrorCode::ServiceUnavailable)]
    #[case(map_store_error(GameStoreError::query("syntax")), ErrorCode::InternalError)]
    #[case(
        map_master_error(MasterCacheError::Source(MasterDataSourceError::connection("down"))),
        ErrorCode::ServiceUnavailable
    )]
    #[case(
        map_master_error(MasterCacheError::Source(MasterDataSourceError::corrupt("bad kind"))),
        ErrorCode::InternalError
    )]
    #[case(map_access_error(AccessLookupError::connection("down")), ErrorCode::ServiceUnavailable)]
    #[case(map_session_error(SessionStoreError::serialization("eof")), ErrorCode::InternalError)]
    #[case(map_token_error(OneTimeTokenStoreError::command("NOSCRIPT")), ErrorCode::InternalError)]
    fn port_failures_map_to_server_faults(#[case] error: Error, #[case] expected: ErrorCode) {
        assert_eq!(error.code(), expected);
    }
}

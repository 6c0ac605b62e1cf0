//! Shared Diesel error mapping for the shard adapters.
//!
//! Every adapter reports two kinds of failure: the shard could not be
//! reached, or a statement failed. These helpers take the adapter's own
//! constructors for both so each port keeps its error type.

use tracing::debug;

use super::pool::PoolError;
use super::shard_router::ShardError;

/// Map shard routing and pool failures into a connection error constructor.
pub fn map_shard_error<E, C>(error: ShardError, connection: C) -> E
where
    C: FnOnce(String) -> E,
{
    debug!(error = %error, "shard unavailable");
    connection(error.to_string())
}

/// Map checkout failures into a connection error constructor.
pub fn map_basic_pool_error<E, C>(error: &PoolError, connection: C) -> E
where
    C: FnOnce(String) -> E,
{
    debug!(message = error.message(), "connection checkout failed");
    connection(error.message().to_owned())
}

/// Map common Diesel error variants into query/connection constructors.
///
/// `NotFound`, query-builder and ordinary database failures map to query
/// errors; a closed connection maps to a connection error.
pub fn map_basic_diesel_error<E, Q, C>(error: diesel::result::Error, query: Q, connection: C) -> E
where
    Q: Fn(String) -> E,
    C: Fn(String) -> E,
{
    use diesel::result::{DatabaseErrorKind, Error as DieselError};

    match &error {
        DieselError::DatabaseError(kind, info) => {
            debug!(?kind, message = info.message(), "diesel operation failed");
        }
        _ => debug!(
            error_type = %std::any::type_name_of_val(&error),
            "diesel operation failed"
        ),
    }

    match error {
        DieselError::NotFound => query("record not found".to_owned()),
        DieselError::QueryBuilderError(_) => query("database query error".to_owned()),
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _) => {
            connection("database connection error".to_owned())
        }
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
            query(format!("unique constraint violated: {}", info.message()))
        }
        DieselError::DatabaseError(DatabaseErrorKind::SerializationFailure, _) => {
            query("serialization failure".to_owned())
        }
        DieselError::DatabaseError(_, _) => query("database error".to_owned()),
        other => query(format!("database error: {other}")),
    }
}

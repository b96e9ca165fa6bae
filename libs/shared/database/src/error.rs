use rusqlite::ErrorCode;
use thiserror::Error;
use tracing::warn;

use shared_models::error::AppError;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(rusqlite::Error),

    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: i64 },

    #[error("Invalid enum value for {field}: {value}")]
    InvalidEnum { field: &'static str, value: String },

    #[error("Migration failed at version {version}: {reason}")]
    MigrationFailed { version: i64, reason: String },

    #[error("Constraint violated: {0}")]
    ConstraintViolation(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Message sent to clients for constraint failures; the SQLite detail is only logged.
pub const CONFLICT_MESSAGE: &str = "Request conflicts with existing data";

/// Unknown enum text met while decoding a row.
#[derive(Error, Debug)]
#[error("invalid {field} value: {value}")]
pub struct InvalidEnumValue {
    pub field: &'static str,
    pub value: String,
}

fn invalid_enum(err: &rusqlite::Error) -> Option<DatabaseError> {
    let rusqlite::Error::FromSqlConversionFailure(_, _, source) = err else {
        return None;
    };
    source
        .downcast_ref::<InvalidEnumValue>()
        .map(|invalid| DatabaseError::InvalidEnum {
            field: invalid.field,
            value: invalid.value.clone(),
        })
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        if let Some(invalid) = invalid_enum(&err) {
            return invalid;
        }
        match &err {
            rusqlite::Error::SqliteFailure(failure, detail)
                if failure.code == ErrorCode::ConstraintViolation =>
            {
                DatabaseError::ConstraintViolation(
                    detail.clone().unwrap_or_else(|| failure.to_string()),
                )
            }
            _ => DatabaseError::Sqlite(err),
        }
    }
}

impl From<DatabaseError> for AppError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound { entity, id } => {
                AppError::NotFound(format!("{} {} not found", entity, id))
            }
            DatabaseError::ConstraintViolation(detail) => {
                warn!("Constraint violation: {}", detail);
                AppError::Conflict(CONFLICT_MESSAGE.to_string())
            }
            other => AppError::Database(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use rusqlite::types::Type;

    use super::*;
    use crate::sqlite::open_memory_database;

    #[test]
    fn constraint_detail_stays_out_of_the_response() {
        let conn = open_memory_database().unwrap();
        conn.execute(
            "INSERT INTO medication_catalog (name, form, created_at) VALUES ('Aspirin', 'tablet', '2024-01-01T00:00:00Z')",
            [],
        )
        .unwrap();
        let err = conn
            .execute(
                "INSERT INTO medication_catalog (name, form, created_at) VALUES ('Aspirin', 'tablet', '2024-01-01T00:00:00Z')",
                [],
            )
            .map_err(DatabaseError::from)
            .unwrap_err();
        assert_matches!(err, DatabaseError::ConstraintViolation(_));

        let app_error = AppError::from(err);
        assert_matches!(app_error, AppError::Conflict(ref msg) if msg == CONFLICT_MESSAGE);
        assert!(!app_error.to_string().contains("UNIQUE"));
    }

    #[test]
    fn enum_decode_failure_becomes_invalid_enum() {
        let source = InvalidEnumValue {
            field: "status",
            value: "paused".to_string(),
        };
        let err = rusqlite::Error::FromSqlConversionFailure(10, Type::Text, Box::new(source));

        assert_matches!(
            DatabaseError::from(err),
            DatabaseError::InvalidEnum { field: "status", ref value } if value == "paused"
        );
    }

    #[test]
    fn other_conversion_failures_stay_sqlite_errors() {
        let err = rusqlite::Error::FromSqlConversionFailure(0, Type::Text, "bad".into());
        assert_matches!(DatabaseError::from(err), DatabaseError::Sqlite(_));
    }
}

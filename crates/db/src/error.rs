//! Mapping sqlx failures onto the core storage error.

use mudclub_core::error::StoreError;

/// Classify a sqlx error for the reconciliation layer.
///
/// - PostgreSQL unique violations (code 23505) keep the constraint name so
///   callers can tell which identity collided.
/// - Everything else becomes an opaque backend error.
pub fn classify_sqlx_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some("23505") {
            let constraint = db_err.constraint().unwrap_or("unknown");
            return StoreError::UniqueViolation {
                constraint: constraint.to_string(),
            };
        }
    }
    tracing::error!(error = %err, "Database error");
    StoreError::Backend(err.to_string())
}

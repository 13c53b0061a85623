//! Repository for the four role tables.
//!
//! `players`, `coaches`, `parents` and `users` share one shape; the kind
//! picks the table.

use sqlx::PgConnection;

use mudclub_core::role::RoleKind;
use mudclub_core::types::DbId;

use crate::models::role_record::RoleRecordRow;

const COLUMNS: &str = "id, person_id, active, created_at, updated_at";

pub struct RoleRecordRepo;

impl RoleRecordRepo {
    /// Table holding role-records of `kind`.
    pub fn table(kind: RoleKind) -> &'static str {
        match kind {
            RoleKind::Player => "players",
            RoleKind::Coach => "coaches",
            RoleKind::Parent => "parents",
            RoleKind::User => "users",
        }
    }

    pub async fn create(
        conn: &mut PgConnection,
        kind: RoleKind,
        person_id: DbId,
        active: bool,
    ) -> Result<RoleRecordRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO {} (person_id, active) VALUES ($1, $2) RETURNING {COLUMNS}",
            Self::table(kind)
        );
        sqlx::query_as::<_, RoleRecordRow>(&query)
            .bind(person_id)
            .bind(active)
            .fetch_one(conn)
            .await
    }

    pub async fn find_by_id(
        conn: &mut PgConnection,
        kind: RoleKind,
        id: DbId,
    ) -> Result<Option<RoleRecordRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM {} WHERE id = $1", Self::table(kind));
        sqlx::query_as::<_, RoleRecordRow>(&query)
            .bind(id)
            .fetch_optional(conn)
            .await
    }

    /// Point a role-record at a person and set its active flag.
    ///
    /// Returns `None` if no row with the given `id` exists.
    pub async fn update(
        conn: &mut PgConnection,
        kind: RoleKind,
        id: DbId,
        person_id: DbId,
        active: bool,
    ) -> Result<Option<RoleRecordRow>, sqlx::Error> {
        let query = format!(
            "UPDATE {} SET person_id = $2, active = $3 WHERE id = $1 RETURNING {COLUMNS}",
            Self::table(kind)
        );
        sqlx::query_as::<_, RoleRecordRow>(&query)
            .bind(id)
            .bind(person_id)
            .bind(active)
            .fetch_optional(conn)
            .await
    }

    /// Delete a role-record. Returns `true` if a row was removed.
    pub async fn delete(
        conn: &mut PgConnection,
        kind: RoleKind,
        id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let query = format!("DELETE FROM {} WHERE id = $1", Self::table(kind));
        let result = sqlx::query(&query).bind(id).execute(conn).await?;
        Ok(result.rows_affected() > 0)
    }
}

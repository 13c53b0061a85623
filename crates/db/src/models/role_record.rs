//! Row model shared by `players`, `coaches`, `parents` and `users`.

use serde::Serialize;
use sqlx::FromRow;

use mudclub_core::record::RoleRow;
use mudclub_core::types::{DbId, Timestamp};

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct RoleRecordRow {
    pub id: DbId,
    pub person_id: Option<DbId>,
    pub active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<RoleRecordRow> for RoleRow {
    fn from(row: RoleRecordRow) -> Self {
        RoleRow {
            id: Some(row.id),
            person_id: row.person_id,
            active: row.active,
        }
    }
}

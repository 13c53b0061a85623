//! Person row model.

use chrono::NaiveDate;
use serde::Serialize;
use sqlx::FromRow;

use mudclub_core::person::{Person, PersonFields, RoleSlots};
use mudclub_core::types::{DbId, Timestamp};

/// A row from the `persons` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PersonRow {
    pub id: DbId,
    pub dni: Option<String>,
    pub name: String,
    pub surname: String,
    pub nickname: Option<String>,
    pub birthday: Option<NaiveDate>,
    pub address: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub female: bool,
    pub player_id: Option<DbId>,
    pub coach_id: Option<DbId>,
    pub parent_id: Option<DbId>,
    pub user_id: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<PersonRow> for Person {
    fn from(row: PersonRow) -> Self {
        Person {
            id: Some(row.id),
            fields: PersonFields {
                dni: row.dni,
                name: row.name,
                surname: row.surname,
                nickname: row.nickname,
                birthday: row.birthday,
                address: row.address,
                email: row.email,
                phone: row.phone,
                female: row.female,
            },
            slots: RoleSlots {
                player_id: row.player_id,
                coach_id: row.coach_id,
                parent_id: row.parent_id,
                user_id: row.user_id,
            },
        }
    }
}

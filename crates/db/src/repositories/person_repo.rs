//! Repository for the `persons` table.

use chrono::NaiveDate;
use sqlx::PgConnection;

use mudclub_core::person::PersonFields;
use mudclub_core::role::RoleKind;
use mudclub_core::types::DbId;

use crate::models::person::PersonRow;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, dni, name, surname, nickname, birthday, address, email, phone, \
     female, player_id, coach_id, parent_id, user_id, created_at, updated_at";

/// Provides CRUD operations for persons plus slot maintenance.
pub struct PersonRepo;

impl PersonRepo {
    /// Insert a new person with every slot empty, returning the created row.
    pub async fn create(
        conn: &mut PgConnection,
        input: &PersonFields,
    ) -> Result<PersonRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO persons
                (dni, name, surname, nickname, birthday, address, email, phone, female)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, PersonRow>(&query)
            .bind(&input.dni)
            .bind(&input.name)
            .bind(&input.surname)
            .bind(&input.nickname)
            .bind(input.birthday)
            .bind(&input.address)
            .bind(&input.email)
            .bind(&input.phone)
            .bind(input.female)
            .fetch_one(conn)
            .await
    }

    pub async fn find_by_id(
        conn: &mut PgConnection,
        id: DbId,
    ) -> Result<Option<PersonRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM persons WHERE id = $1");
        sqlx::query_as::<_, PersonRow>(&query)
            .bind(id)
            .fetch_optional(conn)
            .await
    }

    /// Find a person by normalized DNI.
    pub async fn find_by_dni(
        conn: &mut PgConnection,
        dni: &str,
    ) -> Result<Option<PersonRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM persons WHERE dni = $1 ORDER BY id LIMIT 1");
        sqlx::query_as::<_, PersonRow>(&query)
            .bind(dni)
            .fetch_optional(conn)
            .await
    }

    /// Find the lowest-id person with the given lowercased name, surname
    /// and birthday.
    pub async fn find_by_identity(
        conn: &mut PgConnection,
        name: &str,
        surname: &str,
        birthday: NaiveDate,
    ) -> Result<Option<PersonRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM persons
             WHERE lower(trim(name)) = $1
               AND lower(trim(surname)) = $2
               AND birthday = $3
             ORDER BY id
             LIMIT 1"
        );
        sqlx::query_as::<_, PersonRow>(&query)
            .bind(name)
            .bind(surname)
            .bind(birthday)
            .fetch_optional(conn)
            .await
    }

    /// Find a person with neither DNI nor birthday by lowercased name and
    /// surname.
    pub async fn find_by_name(
        conn: &mut PgConnection,
        name: &str,
        surname: &str,
    ) -> Result<Option<PersonRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM persons
             WHERE lower(trim(name)) = $1
               AND lower(trim(surname)) = $2
               AND dni IS NULL
               AND birthday IS NULL
             ORDER BY id
             LIMIT 1"
        );
        sqlx::query_as::<_, PersonRow>(&query)
            .bind(name)
            .bind(surname)
            .fetch_optional(conn)
            .await
    }

    /// Overwrite every attribute column. Slots are left alone.
    ///
    /// Returns `None` if no row with the given `id` exists.
    pub async fn update(
        conn: &mut PgConnection,
        id: DbId,
        input: &PersonFields,
    ) -> Result<Option<PersonRow>, sqlx::Error> {
        let query = format!(
            "UPDATE persons SET
                dni = $2,
                name = $3,
                surname = $4,
                nickname = $5,
                birthday = $6,
                address = $7,
                email = $8,
                phone = $9,
                female = $10
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, PersonRow>(&query)
            .bind(id)
            .bind(&input.dni)
            .bind(&input.name)
            .bind(&input.surname)
            .bind(&input.nickname)
            .bind(input.birthday)
            .bind(&input.address)
            .bind(&input.email)
            .bind(&input.phone)
            .bind(input.female)
            .fetch_optional(conn)
            .await
    }

    /// Write the slot for `kind`. Returns `true` if the person exists.
    pub async fn set_slot(
        conn: &mut PgConnection,
        id: DbId,
        kind: RoleKind,
        role_id: Option<DbId>,
    ) -> Result<bool, sqlx::Error> {
        let query = format!("UPDATE persons SET {} = $2 WHERE id = $1", kind.slot());
        let result = sqlx::query(&query)
            .bind(id)
            .bind(role_id)
            .execute(conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Hard-delete a person. Fails with a foreign key error while any
    /// role row still points at it.
    pub async fn delete(conn: &mut PgConnection, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM persons WHERE id = $1")
            .bind(id)
            .execute(conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Count role rows of every kind whose `person_id` is `id`.
    pub async fn count_role_refs(conn: &mut PgConnection, id: DbId) -> Result<i64, sqlx::Error> {
        let count: (i64,) = sqlx::query_as(
            "SELECT (SELECT COUNT(*) FROM players WHERE person_id = $1)
                  + (SELECT COUNT(*) FROM coaches WHERE person_id = $1)
                  + (SELECT COUNT(*) FROM parents WHERE person_id = $1)
                  + (SELECT COUNT(*) FROM users WHERE person_id = $1)",
        )
        .bind(id)
        .fetch_one(conn)
        .await?;
        Ok(count.0)
    }

    /// List persons with every slot empty that no role row references,
    /// ordered by id ascending.
    pub async fn list_orphans(conn: &mut PgConnection) -> Result<Vec<PersonRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM persons p
             WHERE p.player_id IS NULL
               AND p.coach_id IS NULL
               AND p.parent_id IS NULL
               AND p.user_id IS NULL
               AND NOT EXISTS (SELECT 1 FROM players WHERE person_id = p.id)
               AND NOT EXISTS (SELECT 1 FROM coaches WHERE person_id = p.id)
               AND NOT EXISTS (SELECT 1 FROM parents WHERE person_id = p.id)
               AND NOT EXISTS (SELECT 1 FROM users WHERE person_id = p.id)
             ORDER BY p.id ASC"
        );
        sqlx::query_as::<_, PersonRow>(&query)
            .fetch_all(conn)
            .await
    }
}

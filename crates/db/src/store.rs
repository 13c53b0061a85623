//! [`PersonStore`] over one PostgreSQL transaction.
//!
//! Writes that can hit a unique constraint run under a savepoint. A
//! violation rolls back only the savepoint, so the enclosing transaction
//! stays usable and reconciliation can re-read the winning row.

use async_trait::async_trait;
use sqlx::{Connection, PgPool, Postgres, Transaction};

use mudclub_core::error::{StoreError, StoreResult};
use mudclub_core::person::{MatchKey, Person, PersonFields};
use mudclub_core::record::RoleRow;
use mudclub_core::role::RoleKind;
use mudclub_core::store::{PersonStore, UnitOfWork};
use mudclub_core::types::DbId;

use crate::error::classify_sqlx_error;
use crate::repositories::{PersonRepo, PlayerParentRepo, RoleRecordRepo};

/// One open transaction.
pub struct PgStore {
    tx: Transaction<'static, Postgres>,
}

impl PgStore {
    pub fn new(tx: Transaction<'static, Postgres>) -> Self {
        Self { tx }
    }

    pub async fn commit(self) -> StoreResult<()> {
        self.tx.commit().await.map_err(classify_sqlx_error)
    }

    pub async fn rollback(self) -> StoreResult<()> {
        self.tx.rollback().await.map_err(classify_sqlx_error)
    }
}

fn person_not_found(id: DbId) -> StoreError {
    StoreError::NotFound {
        entity: "person",
        id,
    }
}

#[async_trait]
impl PersonStore for PgStore {
    async fn find_person(&mut self, id: DbId) -> StoreResult<Option<Person>> {
        let row = PersonRepo::find_by_id(&mut self.tx, id)
            .await
            .map_err(classify_sqlx_error)?;
        Ok(row.map(Person::from))
    }

    async fn match_person(&mut self, key: &MatchKey) -> StoreResult<Option<Person>> {
        let row = match key {
            MatchKey::Dni(dni) => PersonRepo::find_by_dni(&mut self.tx, dni).await,
            MatchKey::Identity {
                name,
                surname,
                birthday,
            } => PersonRepo::find_by_identity(&mut self.tx, name, surname, *birthday).await,
            MatchKey::Name { name, surname } => {
                PersonRepo::find_by_name(&mut self.tx, name, surname).await
            }
        }
        .map_err(classify_sqlx_error)?;
        Ok(row.map(Person::from))
    }

    async fn insert_person(&mut self, fields: &PersonFields) -> StoreResult<Person> {
        let mut savepoint = self.tx.begin().await.map_err(classify_sqlx_error)?;
        match PersonRepo::create(&mut savepoint, fields).await {
            Ok(row) => {
                savepoint.commit().await.map_err(classify_sqlx_error)?;
                tracing::debug!(person_id = row.id, "Inserted person");
                Ok(row.into())
            }
            Err(err) => {
                savepoint.rollback().await.map_err(classify_sqlx_error)?;
                Err(classify_sqlx_error(err))
            }
        }
    }

    async fn update_person(&mut self, id: DbId, fields: &PersonFields) -> StoreResult<Person> {
        let mut savepoint = self.tx.begin().await.map_err(classify_sqlx_error)?;
        match PersonRepo::update(&mut savepoint, id, fields).await {
            Ok(Some(row)) => {
                savepoint.commit().await.map_err(classify_sqlx_error)?;
                Ok(row.into())
            }
            Ok(None) => {
                savepoint.rollback().await.map_err(classify_sqlx_error)?;
                Err(person_not_found(id))
            }
            Err(err) => {
                savepoint.rollback().await.map_err(classify_sqlx_error)?;
                Err(classify_sqlx_error(err))
            }
        }
    }

    async fn set_slot(
        &mut self,
        person_id: DbId,
        kind: RoleKind,
        role_id: Option<DbId>,
    ) -> StoreResult<()> {
        let mut savepoint = self.tx.begin().await.map_err(classify_sqlx_error)?;
        match PersonRepo::set_slot(&mut savepoint, person_id, kind, role_id).await {
            Ok(true) => savepoint.commit().await.map_err(classify_sqlx_error),
            Ok(false) => {
                savepoint.rollback().await.map_err(classify_sqlx_error)?;
                Err(person_not_found(person_id))
            }
            Err(err) => {
                savepoint.rollback().await.map_err(classify_sqlx_error)?;
                Err(classify_sqlx_error(err))
            }
        }
    }

    async fn delete_person(&mut self, id: DbId) -> StoreResult<bool> {
        PersonRepo::delete(&mut self.tx, id)
            .await
            .map_err(classify_sqlx_error)
    }

    async fn count_role_refs(&mut self, person_id: DbId) -> StoreResult<i64> {
        PersonRepo::count_role_refs(&mut self.tx, person_id)
            .await
            .map_err(classify_sqlx_error)
    }

    async fn list_orphans(&mut self) -> StoreResult<Vec<Person>> {
        let rows = PersonRepo::list_orphans(&mut self.tx)
            .await
            .map_err(classify_sqlx_error)?;
        Ok(rows.into_iter().map(Person::from).collect())
    }

    async fn find_role(&mut self, kind: RoleKind, id: DbId) -> StoreResult<Option<RoleRow>> {
        let row = RoleRecordRepo::find_by_id(&mut self.tx, kind, id)
            .await
            .map_err(classify_sqlx_error)?;
        Ok(row.map(RoleRow::from))
    }

    async fn insert_role(
        &mut self,
        kind: RoleKind,
        person_id: DbId,
        active: bool,
    ) -> StoreResult<RoleRow> {
        let row = RoleRecordRepo::create(&mut self.tx, kind, person_id, active)
            .await
            .map_err(classify_sqlx_error)?;
        tracing::debug!(kind = %kind, id = row.id, person_id, "Inserted role record");
        Ok(row.into())
    }

    async fn update_role(
        &mut self,
        kind: RoleKind,
        id: DbId,
        person_id: DbId,
        active: bool,
    ) -> StoreResult<RoleRow> {
        RoleRecordRepo::update(&mut self.tx, kind, id, person_id, active)
            .await
            .map_err(classify_sqlx_error)?
            .map(RoleRow::from)
            .ok_or(StoreError::NotFound {
                entity: kind.as_str(),
                id,
            })
    }

    async fn delete_role(&mut self, kind: RoleKind, id: DbId) -> StoreResult<bool> {
        RoleRecordRepo::delete(&mut self.tx, kind, id)
            .await
            .map_err(classify_sqlx_error)
    }

    async fn parent_ids(&mut self, player_id: DbId) -> StoreResult<Vec<DbId>> {
        PlayerParentRepo::parent_ids(&mut self.tx, player_id)
            .await
            .map_err(classify_sqlx_error)
    }

    async fn link_parent(&mut self, player_id: DbId, parent_id: DbId) -> StoreResult<()> {
        PlayerParentRepo::link(&mut self.tx, player_id, parent_id)
            .await
            .map_err(classify_sqlx_error)
    }

    async fn unlink_parents(&mut self, kind: RoleKind, id: DbId) -> StoreResult<()> {
        PlayerParentRepo::unlink_all(&mut self.tx, kind, id)
            .await
            .map_err(classify_sqlx_error)?;
        Ok(())
    }
}

/// Opens one [`PgStore`] transaction per unit of work.
#[derive(Debug, Clone)]
pub struct PgUnitOfWork {
    pool: PgPool,
}

impl PgUnitOfWork {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    type Store = PgStore;

    async fn begin(&self) -> StoreResult<PgStore> {
        let tx = self.pool.begin().await.map_err(classify_sqlx_error)?;
        Ok(PgStore::new(tx))
    }

    async fn commit(&self, store: PgStore) -> StoreResult<()> {
        store.commit().await
    }

    async fn rollback(&self, store: PgStore) -> StoreResult<()> {
        store.rollback().await
    }
}

//! Shared fixtures for reconciliation integration tests.

#![allow(dead_code)]

use async_trait::async_trait;

use mudclub_core::error::{StoreError, StoreResult};
use mudclub_core::memory::{MemoryStore, MemoryTx};
use mudclub_core::person::{MatchKey, Person, PersonAttrs, PersonFields};
use mudclub_core::record::RoleRow;
use mudclub_core::role::RoleKind;
use mudclub_core::store::{PersonStore, UnitOfWork};
use mudclub_core::types::DbId;

pub fn ana() -> PersonAttrs {
    PersonAttrs {
        dni: Some("12345x".into()),
        name: Some("Ana".into()),
        surname: Some("Ruiz".into()),
        ..Default::default()
    }
}

pub fn attrs(name: &str, surname: &str) -> PersonAttrs {
    PersonAttrs {
        name: Some(name.into()),
        surname: Some(surname.into()),
        ..Default::default()
    }
}

pub fn fields(dni: Option<&str>, name: &str, surname: &str) -> PersonFields {
    PersonFields {
        dni: dni.map(str::to_string),
        name: name.into(),
        surname: surname.into(),
        ..Default::default()
    }
}

/// Commit a person with an optional bound role-record directly into `db`.
pub async fn seed(db: &MemoryStore, fields: &PersonFields, role: Option<RoleKind>) -> (DbId, Option<DbId>) {
    let mut tx = db.begin().await.unwrap();
    let person = tx.insert_person(fields).await.unwrap();
    let person_id = person.id.unwrap();
    let mut role_id = None;
    if let Some(kind) = role {
        let row = tx.insert_role(kind, person_id, true).await.unwrap();
        tx.set_slot(person_id, kind, row.id).await.unwrap();
        role_id = row.id;
    }
    db.commit(tx).await.unwrap();
    (person_id, role_id)
}

/// Wraps a memory unit of work and injects the symptoms of a concurrent
/// writer: identity lookups that miss a row committed elsewhere, and person
/// inserts that collide with one.
pub struct RacingTx {
    pub inner: MemoryTx,
    /// Number of upcoming `match_person` calls that report no match.
    pub stale_matches: usize,
    /// Number of upcoming `insert_person` calls that fail as duplicates.
    pub failed_inserts: usize,
}

impl RacingTx {
    pub fn new(inner: MemoryTx) -> Self {
        Self {
            inner,
            stale_matches: 0,
            failed_inserts: 0,
        }
    }
}

#[async_trait]
impl PersonStore for RacingTx {
    async fn find_person(&mut self, id: DbId) -> StoreResult<Option<Person>> {
        self.inner.find_person(id).await
    }

    async fn match_person(&mut self, key: &MatchKey) -> StoreResult<Option<Person>> {
        if self.stale_matches > 0 {
            self.stale_matches -= 1;
            return Ok(None);
        }
        self.inner.match_person(key).await
    }

    async fn insert_person(&mut self, fields: &PersonFields) -> StoreResult<Person> {
        if self.failed_inserts > 0 {
            self.failed_inserts -= 1;
            return Err(StoreError::UniqueViolation {
                constraint: "uq_persons_dni".to_string(),
            });
        }
        self.inner.insert_person(fields).await
    }

    async fn update_person(&mut self, id: DbId, fields: &PersonFields) -> StoreResult<Person> {
        self.inner.update_person(id, fields).await
    }

    async fn set_slot(
        &mut self,
        person_id: DbId,
        kind: RoleKind,
        role_id: Option<DbId>,
    ) -> StoreResult<()> {
        self.inner.set_slot(person_id, kind, role_id).await
    }

    async fn delete_person(&mut self, id: DbId) -> StoreResult<bool> {
        self.inner.delete_person(id).await
    }

    async fn count_role_refs(&mut self, person_id: DbId) -> StoreResult<i64> {
        self.inner.count_role_refs(person_id).await
    }

    async fn list_orphans(&mut self) -> StoreResult<Vec<Person>> {
        self.inner.list_orphans().await
    }

    async fn find_role(&mut self, kind: RoleKind, id: DbId) -> StoreResult<Option<RoleRow>> {
        self.inner.find_role(kind, id).await
    }

    async fn insert_role(
        &mut self,
        kind: RoleKind,
        person_id: DbId,
        active: bool,
    ) -> StoreResult<RoleRow> {
        self.inner.insert_role(kind, person_id, active).await
    }

    async fn update_role(
        &mut self,
        kind: RoleKind,
        id: DbId,
        person_id: DbId,
        active: bool,
    ) -> StoreResult<RoleRow> {
        self.inner.update_role(kind, id, person_id, active).await
    }

    async fn delete_role(&mut self, kind: RoleKind, id: DbId) -> StoreResult<bool> {
        self.inner.delete_role(kind, id).await
    }

    async fn parent_ids(&mut self, player_id: DbId) -> StoreResult<Vec<DbId>> {
        self.inner.parent_ids(player_id).await
    }

    async fn link_parent(&mut self, player_id: DbId, parent_id: DbId) -> StoreResult<()> {
        self.inner.link_parent(player_id, parent_id).await
    }

    async fn unlink_parents(&mut self, kind: RoleKind, id: DbId) -> StoreResult<()> {
        self.inner.unlink_parents(kind, id).await
    }
}

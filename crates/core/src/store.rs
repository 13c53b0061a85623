//! The persistence seam reconciliation runs against.
//!
//! A [`PersonStore`] is one open unit of work (a database transaction, or
//! its in-memory equivalent). Reconciliation never commits or rolls back;
//! that belongs to whoever opened the unit through [`UnitOfWork`].

use async_trait::async_trait;

use crate::error::StoreResult;
use crate::person::{MatchKey, Person, PersonFields};
use crate::record::RoleRow;
use crate::role::RoleKind;
use crate::types::DbId;

#[async_trait]
pub trait PersonStore: Send {
    async fn find_person(&mut self, id: DbId) -> StoreResult<Option<Person>>;

    /// The lowest-id person satisfying `key`, if any.
    async fn match_person(&mut self, key: &MatchKey) -> StoreResult<Option<Person>>;

    /// Insert a person with empty slots. A duplicate identity must surface
    /// as [`crate::error::StoreError::UniqueViolation`] and leave the unit
    /// of work usable.
    async fn insert_person(&mut self, fields: &PersonFields) -> StoreResult<Person>;

    async fn update_person(&mut self, id: DbId, fields: &PersonFields) -> StoreResult<Person>;

    /// Write one back-reference slot.
    async fn set_slot(
        &mut self,
        person_id: DbId,
        kind: RoleKind,
        role_id: Option<DbId>,
    ) -> StoreResult<()>;

    async fn delete_person(&mut self, id: DbId) -> StoreResult<bool>;

    /// Number of role rows (of any kind) whose `person_id` is `person_id`.
    async fn count_role_refs(&mut self, person_id: DbId) -> StoreResult<i64>;

    /// Persons with every slot empty and no role row pointing at them.
    async fn list_orphans(&mut self) -> StoreResult<Vec<Person>>;

    async fn find_role(&mut self, kind: RoleKind, id: DbId) -> StoreResult<Option<RoleRow>>;

    async fn insert_role(
        &mut self,
        kind: RoleKind,
        person_id: DbId,
        active: bool,
    ) -> StoreResult<RoleRow>;

    async fn update_role(
        &mut self,
        kind: RoleKind,
        id: DbId,
        person_id: DbId,
        active: bool,
    ) -> StoreResult<RoleRow>;

    async fn delete_role(&mut self, kind: RoleKind, id: DbId) -> StoreResult<bool>;

    /// Parent role ids linked to a player, ascending.
    async fn parent_ids(&mut self, player_id: DbId) -> StoreResult<Vec<DbId>>;

    /// Link a parent to a player. Linking twice is a no-op.
    async fn link_parent(&mut self, player_id: DbId, parent_id: DbId) -> StoreResult<()>;

    /// Drop every player/parent link the given player or parent takes part in.
    async fn unlink_parents(&mut self, kind: RoleKind, id: DbId) -> StoreResult<()>;
}

/// Opens and closes units of work.
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    type Store: PersonStore;

    async fn begin(&self) -> StoreResult<Self::Store>;

    async fn commit(&self, store: Self::Store) -> StoreResult<()>;

    async fn rollback(&self, store: Self::Store) -> StoreResult<()>;
}

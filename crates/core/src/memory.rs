//! In-memory [`PersonStore`] for tests and dry runs.
//!
//! Writes are applied to shared state immediately and undone on rollback,
//! so concurrent units of work see each other's uncommitted rows. The same
//! unique constraints as the PostgreSQL schema are enforced.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::error::{StoreError, StoreResult};
use crate::person::{MatchKey, Person, PersonFields, UQ_PERSONS_DNI, UQ_PERSONS_NAME};
use crate::record::RoleRow;
use crate::role::RoleKind;
use crate::store::{PersonStore, UnitOfWork};
use crate::types::DbId;

#[derive(Debug, Default)]
struct Tables {
    next_id: DbId,
    persons: BTreeMap<DbId, Person>,
    roles: BTreeMap<(RoleKind, DbId), RoleRow>,
    player_parents: BTreeSet<(DbId, DbId)>,
}

impl Tables {
    fn next_id(&mut self) -> DbId {
        self.next_id += 1;
        self.next_id
    }

    fn check_person_unique(&self, id: Option<DbId>, fields: &PersonFields) -> StoreResult<()> {
        let others = self.persons.values().filter(|p| p.id != id);
        for other in others {
            if fields.dni.is_some() && other.fields.dni == fields.dni {
                return Err(unique(UQ_PERSONS_DNI));
            }
            if fields.dni.is_none() && other.fields.dni.is_none() {
                if let Some(key) = fields.match_key() {
                    if key.matches(&other.fields) {
                        return Err(unique(key.constraint()));
                    }
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug)]
enum Undo {
    RemovePerson(DbId),
    RestorePerson(Person),
    RemoveRole(RoleKind, DbId),
    RestoreRole(RoleKind, RoleRow),
    RemoveLink(DbId, DbId),
    RestoreLink(DbId, DbId),
}

/// Shared in-memory database. Cheap to clone; clones share state.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored persons.
    pub fn person_count(&self) -> usize {
        lock(&self.tables).persons.len()
    }

    /// Number of stored role rows of `kind`.
    pub fn role_count(&self, kind: RoleKind) -> usize {
        lock(&self.tables)
            .roles
            .keys()
            .filter(|(k, _)| *k == kind)
            .count()
    }

    /// Every stored person, ascending by id.
    pub fn persons(&self) -> Vec<Person> {
        lock(&self.tables).persons.values().cloned().collect()
    }

    /// Every stored role row of `kind`, ascending by id.
    pub fn roles(&self, kind: RoleKind) -> Vec<RoleRow> {
        lock(&self.tables)
            .roles
            .iter()
            .filter(|((k, _), _)| *k == kind)
            .map(|(_, row)| row.clone())
            .collect()
    }
}

#[async_trait]
impl UnitOfWork for MemoryStore {
    type Store = MemoryTx;

    async fn begin(&self) -> StoreResult<MemoryTx> {
        Ok(MemoryTx {
            tables: Arc::clone(&self.tables),
            undo: Vec::new(),
        })
    }

    async fn commit(&self, mut store: MemoryTx) -> StoreResult<()> {
        store.undo.clear();
        Ok(())
    }

    async fn rollback(&self, store: MemoryTx) -> StoreResult<()> {
        drop(store);
        Ok(())
    }
}

/// One unit of work against a [`MemoryStore`]. Dropping it without
/// committing rolls it back.
#[derive(Debug)]
pub struct MemoryTx {
    tables: Arc<Mutex<Tables>>,
    undo: Vec<Undo>,
}

impl MemoryTx {
    fn rollback_now(&mut self) {
        let mut tables = lock(&self.tables);
        while let Some(step) = self.undo.pop() {
            match step {
                Undo::RemovePerson(id) => {
                    tables.persons.remove(&id);
                }
                Undo::RestorePerson(person) => {
                    if let Some(id) = person.id {
                        tables.persons.insert(id, person);
                    }
                }
                Undo::RemoveRole(kind, id) => {
                    tables.roles.remove(&(kind, id));
                }
                Undo::RestoreRole(kind, row) => {
                    if let Some(id) = row.id {
                        tables.roles.insert((kind, id), row);
                    }
                }
                Undo::RemoveLink(player, parent) => {
                    tables.player_parents.remove(&(player, parent));
                }
                Undo::RestoreLink(player, parent) => {
                    tables.player_parents.insert((player, parent));
                }
            }
        }
    }
}

impl Drop for MemoryTx {
    fn drop(&mut self) {
        self.rollback_now();
    }
}

#[async_trait]
impl PersonStore for MemoryTx {
    async fn find_person(&mut self, id: DbId) -> StoreResult<Option<Person>> {
        Ok(lock(&self.tables).persons.get(&id).cloned())
    }

    async fn match_person(&mut self, key: &MatchKey) -> StoreResult<Option<Person>> {
        Ok(lock(&self.tables)
            .persons
            .values()
            .find(|p| key.matches(&p.fields))
            .cloned())
    }

    async fn insert_person(&mut self, fields: &PersonFields) -> StoreResult<Person> {
        let mut tables = lock(&self.tables);
        tables.check_person_unique(None, fields)?;
        let id = tables.next_id();
        let person = Person {
            id: Some(id),
            fields: fields.clone(),
            ..Default::default()
        };
        tables.persons.insert(id, person.clone());
        self.undo.push(Undo::RemovePerson(id));
        Ok(person)
    }

    async fn update_person(&mut self, id: DbId, fields: &PersonFields) -> StoreResult<Person> {
        let mut tables = lock(&self.tables);
        tables.check_person_unique(Some(id), fields)?;
        let person = tables.persons.get_mut(&id).ok_or(StoreError::NotFound {
            entity: "person",
            id,
        })?;
        let before = person.clone();
        person.fields = fields.clone();
        let after = person.clone();
        self.undo.push(Undo::RestorePerson(before));
        Ok(after)
    }

    async fn set_slot(
        &mut self,
        person_id: DbId,
        kind: RoleKind,
        role_id: Option<DbId>,
    ) -> StoreResult<()> {
        let mut tables = lock(&self.tables);
        if role_id.is_some()
            && tables
                .persons
                .values()
                .any(|p| p.id != Some(person_id) && p.slots.get(kind) == role_id)
        {
            return Err(unique(kind.slot_constraint()));
        }
        let person = tables.persons.get_mut(&person_id).ok_or(StoreError::NotFound {
            entity: "person",
            id: person_id,
        })?;
        let before = person.clone();
        person.slots.set(kind, role_id);
        self.undo.push(Undo::RestorePerson(before));
        Ok(())
    }

    async fn delete_person(&mut self, id: DbId) -> StoreResult<bool> {
        let mut tables = lock(&self.tables);
        let referenced = tables.roles.values().any(|r| r.person_id == Some(id));
        if referenced {
            return Err(StoreError::Backend(format!(
                "person {id} is still referenced by a role record"
            )));
        }
        match tables.persons.remove(&id) {
            Some(person) => {
                self.undo.push(Undo::RestorePerson(person));
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn count_role_refs(&mut self, person_id: DbId) -> StoreResult<i64> {
        let count = lock(&self.tables)
            .roles
            .values()
            .filter(|r| r.person_id == Some(person_id))
            .count();
        Ok(count as i64)
    }

    async fn list_orphans(&mut self) -> StoreResult<Vec<Person>> {
        let tables = lock(&self.tables);
        Ok(tables
            .persons
            .values()
            .filter(|p| p.slots.is_empty())
            .filter(|p| !tables.roles.values().any(|r| r.person_id == p.id))
            .cloned()
            .collect())
    }

    async fn find_role(&mut self, kind: RoleKind, id: DbId) -> StoreResult<Option<RoleRow>> {
        Ok(lock(&self.tables).roles.get(&(kind, id)).cloned())
    }

    async fn insert_role(
        &mut self,
        kind: RoleKind,
        person_id: DbId,
        active: bool,
    ) -> StoreResult<RoleRow> {
        let mut tables = lock(&self.tables);
        if !tables.persons.contains_key(&person_id) {
            return Err(StoreError::NotFound {
                entity: "person",
                id: person_id,
            });
        }
        let id = tables.next_id();
        let row = RoleRow {
            id: Some(id),
            person_id: Some(person_id),
            active,
        };
        tables.roles.insert((kind, id), row.clone());
        self.undo.push(Undo::RemoveRole(kind, id));
        Ok(row)
    }

    async fn update_role(
        &mut self,
        kind: RoleKind,
        id: DbId,
        person_id: DbId,
        active: bool,
    ) -> StoreResult<RoleRow> {
        let mut tables = lock(&self.tables);
        let row = tables.roles.get_mut(&(kind, id)).ok_or(StoreError::NotFound {
            entity: kind.as_str(),
            id,
        })?;
        let before = row.clone();
        row.person_id = Some(person_id);
        row.active = active;
        let after = row.clone();
        self.undo.push(Undo::RestoreRole(kind, before));
        Ok(after)
    }

    async fn delete_role(&mut self, kind: RoleKind, id: DbId) -> StoreResult<bool> {
        let mut tables = lock(&self.tables);
        match tables.roles.remove(&(kind, id)) {
            Some(row) => {
                self.undo.push(Undo::RestoreRole(kind, row));
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn parent_ids(&mut self, player_id: DbId) -> StoreResult<Vec<DbId>> {
        Ok(lock(&self.tables)
            .player_parents
            .iter()
            .filter(|(player, _)| *player == player_id)
            .map(|(_, parent)| *parent)
            .collect())
    }

    async fn link_parent(&mut self, player_id: DbId, parent_id: DbId) -> StoreResult<()> {
        if lock(&self.tables)
            .player_parents
            .insert((player_id, parent_id))
        {
            self.undo.push(Undo::RemoveLink(player_id, parent_id));
        }
        Ok(())
    }

    async fn unlink_parents(&mut self, kind: RoleKind, id: DbId) -> StoreResult<()> {
        let mut tables = lock(&self.tables);
        let links: Vec<(DbId, DbId)> = tables
            .player_parents
            .iter()
            .filter(|(player, parent)| match kind {
                RoleKind::Player => *player == id,
                RoleKind::Parent => *parent == id,
                RoleKind::Coach | RoleKind::User => false,
            })
            .copied()
            .collect();
        for (player, parent) in links {
            tables.player_parents.remove(&(player, parent));
            self.undo.push(Undo::RestoreLink(player, parent));
        }
        Ok(())
    }
}

fn lock(tables: &Mutex<Tables>) -> MutexGuard<'_, Tables> {
    tables.lock().unwrap_or_else(PoisonError::into_inner)
}

fn unique(constraint: &str) -> StoreError {
    StoreError::UniqueViolation {
        constraint: constraint.to_string(),
    }
}

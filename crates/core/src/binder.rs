//! Bidirectional binding between a role-record and its person.
//!
//! After a successful bind, `record.person_id == person.id` and the
//! person's slot for the record's kind holds `record.id`. When the two
//! disagree, the person's slot is authoritative.

use crate::error::StoreResult;
use crate::observer::{AuditEvent, ReconcileObserver};
use crate::record::{Record, RoleRecord};
use crate::store::PersonStore;

/// Bind `record` to its person, optionally persisting the result.
///
/// Returns `Ok(false)` without touching anything for a bare person, for a
/// record that has no id yet, or when no saved person is attached. Store
/// errors, including unique violations, are returned unchanged.
pub async fn bind<S>(
    store: &mut S,
    record: &mut Record,
    persist: bool,
    observer: &dyn ReconcileObserver,
) -> StoreResult<bool>
where
    S: PersonStore + ?Sized,
{
    match record {
        Record::Person(_) => Ok(false),
        Record::Role(role) => bind_role(store, role, persist, observer).await,
    }
}

pub(crate) async fn bind_role<S>(
    store: &mut S,
    role: &mut RoleRecord,
    persist: bool,
    observer: &dyn ReconcileObserver,
) -> StoreResult<bool>
where
    S: PersonStore + ?Sized,
{
    let kind = role.kind;
    let Some(mut record_id) = role.id() else {
        return Ok(false);
    };
    let Some(person_id) = role.person.as_ref().and_then(|p| p.get().id) else {
        return Ok(false);
    };

    let slot_value = role
        .person
        .as_ref()
        .and_then(|p| p.get().slots.bound(kind));
    if let Some(bound_id) = slot_value.filter(|id| *id != record_id) {
        // The slot may point at a row deleted since; only a live row wins.
        if let Some(row) = store.find_role(kind, bound_id).await? {
            role.row.mark_saved(row);
            observer.on_event(&AuditEvent::BindingRepaired {
                kind,
                from: Some(record_id),
                to: bound_id,
            });
            record_id = bound_id;
        }
    }

    let previous_person = role.person_id().filter(|id| *id != person_id);

    role.row.get_mut().person_id = Some(person_id);
    if let Some(person) = role.person.as_mut() {
        person.get_mut().slots.set(kind, Some(record_id));
    }

    if !persist {
        return Ok(true);
    }

    if let Some(old_id) = previous_person {
        if let Some(old) = store.find_person(old_id).await? {
            if old.slots.get(kind) == Some(record_id) {
                store.set_slot(old_id, kind, None).await?;
                observer.on_event(&AuditEvent::SlotCleared {
                    kind,
                    person_id: old_id,
                });
            }
        }
    }

    if role.row.is_changed() {
        let row = role.row.get();
        let saved = store
            .update_role(kind, record_id, person_id, row.active)
            .await?;
        role.row.mark_saved(saved);
    }

    if let Some(person) = role.person.as_mut() {
        let stored_slot = person.persisted().and_then(|p| p.slots.get(kind));
        if stored_slot != Some(record_id) {
            store.set_slot(person_id, kind, Some(record_id)).await?;
            person.apply_saved(|p| p.slots.set(kind, Some(record_id)));
        }
    }

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::observer::{NoopObserver, RecordingObserver};
    use crate::person::{Person, PersonFields};
    use crate::record::RoleRow;
    use crate::role::RoleKind;
    use crate::store::UnitOfWork;
    use crate::tracked::Tracked;

    fn fields(name: &str) -> PersonFields {
        PersonFields {
            name: name.into(),
            surname: "Ruiz".into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn bind_on_person_or_unsaved_record_is_refused() {
        let db = MemoryStore::new();
        let mut tx = db.begin().await.unwrap();

        let mut person = Record::Person(Tracked::new(Person::placeholder()));
        assert!(!bind(&mut tx, &mut person, true, &NoopObserver).await.unwrap());

        let mut unsaved = Record::Role(RoleRecord::new(
            RoleKind::Player,
            Tracked::new(Person::placeholder()),
        ));
        assert!(!bind(&mut tx, &mut unsaved, true, &NoopObserver).await.unwrap());
    }

    #[tokio::test]
    async fn bind_sets_both_sides_and_persists() {
        let db = MemoryStore::new();
        let mut tx = db.begin().await.unwrap();
        let person = tx.insert_person(&fields("Ana")).await.unwrap();
        let person_id = person.id.unwrap();
        let row = tx.insert_role(RoleKind::Coach, person_id, true).await.unwrap();

        let mut record = Record::Role(RoleRecord {
            kind: RoleKind::Coach,
            row: Tracked::loaded(row.clone()),
            person: Some(Tracked::loaded(person)),
            parents: Vec::new(),
        });
        assert!(bind(&mut tx, &mut record, true, &NoopObserver).await.unwrap());

        let stored = tx.find_person(person_id).await.unwrap().unwrap();
        assert_eq!(stored.slots.coach_id, row.id);
        assert!(!crate::record::is_modified(&record));
    }

    #[tokio::test]
    async fn person_slot_wins_over_record_id() {
        let db = MemoryStore::new();
        let mut tx = db.begin().await.unwrap();
        let person = tx.insert_person(&fields("Ana")).await.unwrap();
        let person_id = person.id.unwrap();
        let winner = tx.insert_role(RoleKind::Player, person_id, true).await.unwrap();
        let loser = tx.insert_role(RoleKind::Player, person_id, false).await.unwrap();
        tx.set_slot(person_id, RoleKind::Player, winner.id).await.unwrap();
        let person = tx.find_person(person_id).await.unwrap().unwrap();

        let mut record = Record::Role(RoleRecord {
            kind: RoleKind::Player,
            row: Tracked::loaded(loser.clone()),
            person: Some(Tracked::loaded(person)),
            parents: Vec::new(),
        });
        let observer = RecordingObserver::new();
        assert!(bind(&mut tx, &mut record, true, &observer).await.unwrap());

        assert_eq!(record.id(), winner.id);
        assert_eq!(
            record.as_role().map(|r| r.row.get().clone()),
            Some(RoleRow {
                id: winner.id,
                person_id: Some(person_id),
                active: true,
            })
        );
        assert!(observer.events().contains(&AuditEvent::BindingRepaired {
            kind: RoleKind::Player,
            from: loser.id,
            to: winner.id.unwrap(),
        }));
    }

    #[tokio::test]
    async fn rebinding_clears_the_old_persons_slot() {
        let db = MemoryStore::new();
        let mut tx = db.begin().await.unwrap();
        let old = tx.insert_person(&fields("Old")).await.unwrap();
        let new = tx.insert_person(&fields("New")).await.unwrap();
        let row = tx
            .insert_role(RoleKind::User, old.id.unwrap(), true)
            .await
            .unwrap();
        tx.set_slot(old.id.unwrap(), RoleKind::User, row.id).await.unwrap();

        let mut record = Record::Role(RoleRecord {
            kind: RoleKind::User,
            row: Tracked::loaded(row.clone()),
            person: Some(Tracked::loaded(new.clone())),
            parents: Vec::new(),
        });
        assert!(bind(&mut tx, &mut record, true, &NoopObserver).await.unwrap());

        let old = tx.find_person(old.id.unwrap()).await.unwrap().unwrap();
        let new = tx.find_person(new.id.unwrap()).await.unwrap().unwrap();
        assert_eq!(old.slots.user_id, None);
        assert_eq!(new.slots.user_id, row.id);
        let stored = tx.find_role(RoleKind::User, row.id.unwrap()).await.unwrap().unwrap();
        assert_eq!(stored.person_id, new.id);
    }

    #[tokio::test]
    async fn slot_collision_is_propagated() {
        let db = MemoryStore::new();
        let mut tx = db.begin().await.unwrap();
        let a = tx.insert_person(&fields("A")).await.unwrap();
        let b = tx.insert_person(&fields("B")).await.unwrap();
        let row = tx.insert_role(RoleKind::Coach, a.id.unwrap(), true).await.unwrap();
        // `a` already claims the row; binding it to `b` too must fail.
        tx.set_slot(a.id.unwrap(), RoleKind::Coach, row.id).await.unwrap();

        let mut record = Record::Role(RoleRecord {
            kind: RoleKind::Coach,
            row: Tracked::loaded(RoleRow {
                person_id: b.id,
                ..row.clone()
            }),
            person: Some(Tracked::loaded(b)),
            parents: Vec::new(),
        });
        let err = bind(&mut tx, &mut record, true, &NoopObserver)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            crate::error::StoreError::UniqueViolation { .. }
        ));
    }
}

//! Destroying role-records and orphaned persons.
//!
//! Destroying a role-record never cascades into its person. The person is
//! removed only when `forget` is requested and nothing references it any
//! more.

use serde::Serialize;

use crate::error::CoreError;
use crate::observer::{AuditEvent, ReconcileObserver};
use crate::person::Person;
use crate::role::RoleKind;
use crate::store::PersonStore;
use crate::types::DbId;

/// What a destroy removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Scrubbed {
    pub person_id: Option<DbId>,
    pub person_destroyed: bool,
}

/// Scrub and delete a role-record.
pub async fn destroy_record<S>(
    store: &mut S,
    kind: RoleKind,
    id: DbId,
    forget: bool,
    observer: &dyn ReconcileObserver,
) -> Result<Scrubbed, CoreError>
where
    S: PersonStore + ?Sized,
{
    let row = store
        .find_role(kind, id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: kind.as_str(),
            id,
        })?;

    if let Some(person_id) = row.person_id {
        if let Some(person) = store.find_person(person_id).await? {
            if person.slots.get(kind) == Some(id) {
                store.set_slot(person_id, kind, None).await?;
                observer.on_event(&AuditEvent::SlotCleared { kind, person_id });
            }
        }
    }

    store.unlink_parents(kind, id).await?;
    store.delete_role(kind, id).await?;
    observer.on_event(&AuditEvent::RecordDestroyed { kind, id });

    let mut person_destroyed = false;
    if let (true, Some(person_id)) = (forget, row.person_id) {
        if is_orphan(store, person_id).await? {
            person_destroyed = store.delete_person(person_id).await?;
            if person_destroyed {
                observer.on_event(&AuditEvent::PersonDestroyed { person_id });
            }
        }
    }

    Ok(Scrubbed {
        person_id: row.person_id,
        person_destroyed,
    })
}

/// Delete a person that nothing references. Refuses referenced persons.
pub async fn destroy_person<S>(
    store: &mut S,
    person_id: DbId,
    observer: &dyn ReconcileObserver,
) -> Result<(), CoreError>
where
    S: PersonStore + ?Sized,
{
    if store.find_person(person_id).await?.is_none() {
        return Err(CoreError::NotFound {
            entity: "person",
            id: person_id,
        });
    }
    if !is_orphan(store, person_id).await? {
        return Err(CoreError::Conflict(format!(
            "person {person_id} is still referenced by a role record"
        )));
    }
    store.delete_person(person_id).await?;
    observer.on_event(&AuditEvent::PersonDestroyed { person_id });
    Ok(())
}

/// Persons that no role-record references.
pub async fn list_orphans<S>(store: &mut S) -> Result<Vec<Person>, CoreError>
where
    S: PersonStore + ?Sized,
{
    Ok(store.list_orphans().await?)
}

/// True when `person_id` exists, holds no slot and no role row points at it.
pub async fn is_orphan<S>(store: &mut S, person_id: DbId) -> Result<bool, CoreError>
where
    S: PersonStore + ?Sized,
{
    let Some(person) = store.find_person(person_id).await? else {
        return Ok(false);
    };
    Ok(person.slots.is_empty() && store.count_role_refs(person_id).await? == 0)
}

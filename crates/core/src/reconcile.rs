//! Fetch, merge, persist and bind a candidate in one unit of work.
//!
//! Each attempt ends `Linked` (an existing person was reused), `Created`
//! (a new person was inserted) or failed with a [`ReconcileError`]. On
//! failure the caller must roll back its unit of work: earlier writes of
//! the same attempt are not undone here.
//!
//! The only failure recovered from automatically is a lost race on person
//! creation. The winner is re-read and linked; if it is not visible, the
//! insert is retried exactly once.

use serde::Serialize;

use crate::binder::bind_role;
use crate::error::{FieldErrors, ReconcileError, StoreError};
use crate::field::pick;
use crate::observer::{AuditEvent, ReconcileObserver};
use crate::person::{Person, PersonAttrs, UQ_PERSONS_DNI, UQ_PERSONS_IDENTITY, UQ_PERSONS_NAME};
use crate::record::{Record, RoleRecord};
use crate::resolver::{fetch_person, fetch_record, fetch_role, Candidate};
use crate::role::RoleKind;
use crate::store::PersonStore;
use crate::tracked::Tracked;

/// How the person behind a reconciled record was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Linked,
    Created,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Linked => "linked",
            Self::Created => "created",
        }
    }
}

/// A successfully reconciled record.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled {
    pub record: Record,
    pub outcome: Outcome,
}

/// Reconcile `candidate` against `store`.
pub async fn reconcile<S>(
    store: &mut S,
    candidate: &Candidate,
    observer: &dyn ReconcileObserver,
) -> Result<Reconciled, ReconcileError>
where
    S: PersonStore + ?Sized,
{
    let result = run(store, candidate, observer).await;
    if let Err(err) = &result {
        observer.on_event(&AuditEvent::Failed {
            kind: candidate.kind,
            reason: err.to_string(),
        });
    }
    result
}

async fn run<S>(
    store: &mut S,
    candidate: &Candidate,
    observer: &dyn ReconcileObserver,
) -> Result<Reconciled, ReconcileError>
where
    S: PersonStore + ?Sized,
{
    match fetch_record(store, candidate).await? {
        Record::Person(mut person) => {
            let outcome = save_person(store, &mut person, &candidate.person, observer).await?;
            Ok(Reconciled {
                record: Record::Person(person),
                outcome,
            })
        }
        Record::Role(mut role) => {
            let outcome =
                reconcile_role(store, &mut role, &candidate.person, candidate.active, observer)
                    .await?;
            if role.kind == RoleKind::Player {
                for attrs in &candidate.parents {
                    reconcile_parent(store, &mut role, attrs, observer).await?;
                }
            }
            Ok(Reconciled {
                record: Record::Role(role),
                outcome,
            })
        }
    }
}

async fn reconcile_role<S>(
    store: &mut S,
    role: &mut RoleRecord,
    attrs: &PersonAttrs,
    active: Option<bool>,
    observer: &dyn ReconcileObserver,
) -> Result<Outcome, ReconcileError>
where
    S: PersonStore + ?Sized,
{
    let kind = role.kind;
    let mut person = match role.person.take() {
        Some(person) => person,
        None => fetch_person(store, attrs).await?,
    };
    let outcome = save_person(store, &mut person, attrs, observer).await;
    let person_id = person.get().id;
    role.person = Some(person);
    let outcome = outcome?;
    let person_id = person_id.ok_or_else(|| {
        StoreError::Backend("person has no id after being saved".to_string())
    })?;

    let current = role.row.get().active;
    role.row.get_mut().active = pick(active, Some(current), true);

    if role.row.is_new() {
        let saved = store
            .insert_role(kind, person_id, role.row.get().active)
            .await?;
        role.row.mark_saved(saved);
        if let Some(id) = role.id() {
            observer.on_event(&AuditEvent::RecordSaved {
                kind,
                id,
                created: true,
            });
        }
    } else if role.row.is_changed() {
        if let Some(id) = role.id() {
            let row = role.row.get();
            let saved = store
                .update_role(kind, id, row.person_id.unwrap_or(person_id), row.active)
                .await?;
            role.row.mark_saved(saved);
            observer.on_event(&AuditEvent::RecordSaved {
                kind,
                id,
                created: false,
            });
        }
    }

    bind_role(store, role, true, observer).await?;
    Ok(outcome)
}

async fn reconcile_parent<S>(
    store: &mut S,
    player: &mut RoleRecord,
    attrs: &PersonAttrs,
    observer: &dyn ReconcileObserver,
) -> Result<(), ReconcileError>
where
    S: PersonStore + ?Sized,
{
    let linked = player.parents.iter().find(|p| {
        p.person
            .as_ref()
            .is_some_and(|person| attrs.describes(person.get()))
    });
    let mut parent = match linked {
        Some(existing) => existing.clone(),
        None => fetch_role(store, RoleKind::Parent, None, attrs).await?,
    };
    reconcile_role(store, &mut parent, attrs, None, observer).await?;

    if let (Some(player_id), Some(parent_id)) = (player.id(), parent.id()) {
        store.link_parent(player_id, parent_id).await?;
        observer.on_event(&AuditEvent::ParentLinked {
            player_id,
            parent_id,
        });
    }

    match player
        .parents
        .iter_mut()
        .find(|p| p.id().is_some() && p.id() == parent.id())
    {
        Some(existing) => *existing = parent,
        None => player.parents.push(parent),
    }
    Ok(())
}

/// Merge `attrs` onto `person`, validate it and write it.
async fn save_person<S>(
    store: &mut S,
    person: &mut Tracked<Person>,
    attrs: &PersonAttrs,
    observer: &dyn ReconcileObserver,
) -> Result<Outcome, ReconcileError>
where
    S: PersonStore + ?Sized,
{
    person.get_mut().fields.merge(attrs);
    person
        .get()
        .fields
        .check()
        .map_err(ReconcileError::Validation)?;

    if person.get().id.is_some() {
        update_person(store, person, observer).await?;
        return Ok(Outcome::Linked);
    }

    let fields = person.get().fields.clone();
    let constraint = match store.insert_person(&fields).await {
        Ok(saved) => return Ok(created(person, saved, observer)),
        Err(StoreError::UniqueViolation { constraint }) => constraint,
        Err(err) => return Err(err.into()),
    };

    let winner = match fields.match_key() {
        Some(key) => store.match_person(&key).await?,
        None => None,
    };
    if let Some(winner) = winner {
        observer.on_event(&AuditEvent::UniquenessRace {
            constraint,
            retried: false,
        });
        *person = Tracked::loaded(winner);
        person.get_mut().fields.merge(attrs);
        update_person(store, person, observer).await?;
        return Ok(Outcome::Linked);
    }

    observer.on_event(&AuditEvent::UniquenessRace {
        constraint,
        retried: true,
    });
    match store.insert_person(&fields).await {
        Ok(saved) => Ok(created(person, saved, observer)),
        Err(StoreError::UniqueViolation { constraint }) => {
            Err(ReconcileError::Validation(taken(&constraint)))
        }
        Err(err) => Err(err.into()),
    }
}

fn created(
    person: &mut Tracked<Person>,
    saved: Person,
    observer: &dyn ReconcileObserver,
) -> Outcome {
    if let Some(person_id) = saved.id {
        observer.on_event(&AuditEvent::PersonCreated { person_id });
    }
    person.mark_saved(saved);
    Outcome::Created
}

/// Write pending field changes of a stored person and report the link.
async fn update_person<S>(
    store: &mut S,
    person: &mut Tracked<Person>,
    observer: &dyn ReconcileObserver,
) -> Result<(), ReconcileError>
where
    S: PersonStore + ?Sized,
{
    let Some(person_id) = person.get().id else {
        return Ok(());
    };
    let fields_changed = person
        .persisted()
        .is_some_and(|stored| stored.fields != person.get().fields);
    if fields_changed {
        let saved = match store.update_person(person_id, &person.get().fields).await {
            Ok(saved) => saved,
            Err(StoreError::UniqueViolation { constraint }) => {
                return Err(ReconcileError::Validation(taken(&constraint)));
            }
            Err(err) => return Err(err.into()),
        };
        let slots = person.get().slots;
        person.mark_saved(saved);
        person.get_mut().slots = slots;
        observer.on_event(&AuditEvent::PersonUpdated { person_id });
    }
    observer.on_event(&AuditEvent::PersonLinked { person_id });
    Ok(())
}

/// Field errors for a unique constraint hit outside the creation race.
fn taken(constraint: &str) -> FieldErrors {
    let field = match constraint {
        UQ_PERSONS_DNI => "dni",
        UQ_PERSONS_IDENTITY | UQ_PERSONS_NAME => "name",
        _ => "person",
    };
    FieldErrors::single(field, "has already been taken")
}

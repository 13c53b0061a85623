//! Resolving candidate attributes to existing or new records.

use serde::{Deserialize, Serialize};

use crate::error::StoreResult;
use crate::person::{Person, PersonAttrs};
use crate::record::{Record, RoleRecord, RoleRow};
use crate::role::{RecordKind, RoleKind};
use crate::store::PersonStore;
use crate::tracked::Tracked;
use crate::types::DbId;

/// Attributes submitted for one reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub kind: RecordKind,
    /// Explicit id of the target record. Authoritative when it resolves.
    pub id: Option<DbId>,
    #[serde(default)]
    pub person: PersonAttrs,
    pub active: Option<bool>,
    /// Parents to reconcile and link; only honoured for players.
    #[serde(default)]
    pub parents: Vec<PersonAttrs>,
}

impl Candidate {
    pub fn new(kind: RecordKind, person: PersonAttrs) -> Self {
        Self {
            kind,
            id: None,
            person,
            active: None,
            parents: Vec::new(),
        }
    }

    pub fn role(kind: RoleKind, person: PersonAttrs) -> Self {
        Self::new(RecordKind::Role(kind), person)
    }
}

/// Resolve the person described by `attrs`: by explicit id, then by match
/// key, else a new unsaved placeholder.
pub async fn fetch_person<S>(store: &mut S, attrs: &PersonAttrs) -> StoreResult<Tracked<Person>>
where
    S: PersonStore + ?Sized,
{
    if let Some(id) = attrs.id {
        if let Some(person) = store.find_person(id).await? {
            return Ok(Tracked::loaded(person));
        }
    }
    if let Some(key) = attrs.match_key() {
        if let Some(person) = store.match_person(&key).await? {
            return Ok(Tracked::loaded(person));
        }
    }
    Ok(Tracked::new(Person::placeholder()))
}

/// Resolve the record a candidate refers to.
///
/// The returned record is either loaded from storage (possibly through the
/// person's slot rather than the candidate's own id) or new and unsaved.
pub async fn fetch_record<S>(store: &mut S, candidate: &Candidate) -> StoreResult<Record>
where
    S: PersonStore + ?Sized,
{
    let kind = match candidate.kind {
        RecordKind::Person => {
            if let Some(id) = candidate.id {
                if let Some(person) = store.find_person(id).await? {
                    return Ok(Record::Person(Tracked::loaded(person)));
                }
            }
            return Ok(Record::Person(fetch_person(store, &candidate.person).await?));
        }
        RecordKind::Role(kind) => kind,
    };

    Ok(Record::Role(
        fetch_role(store, kind, candidate.id, &candidate.person).await?,
    ))
}

/// Resolve a role-record of `kind`: by explicit id, then through the slot
/// of the matched person, else a new unsaved record.
pub async fn fetch_role<S>(
    store: &mut S,
    kind: RoleKind,
    id: Option<DbId>,
    attrs: &PersonAttrs,
) -> StoreResult<RoleRecord>
where
    S: PersonStore + ?Sized,
{
    if let Some(id) = id {
        if let Some(row) = store.find_role(kind, id).await? {
            return load_role(store, kind, row).await;
        }
    }

    let person = fetch_person(store, attrs).await?;
    if let Some(bound_id) = person.persisted().and_then(|p| p.slots.bound(kind)) {
        if let Some(row) = store.find_role(kind, bound_id).await? {
            let parents = load_parents(store, kind, row.id).await?;
            return Ok(RoleRecord {
                kind,
                row: Tracked::loaded(row),
                person: Some(person),
                parents,
            });
        }
    }

    Ok(RoleRecord::new(kind, person))
}

/// Load a stored role row together with its person and parents.
pub async fn load_role<S>(store: &mut S, kind: RoleKind, row: RoleRow) -> StoreResult<RoleRecord>
where
    S: PersonStore + ?Sized,
{
    let person = match row.person_id {
        Some(person_id) => store.find_person(person_id).await?.map(Tracked::loaded),
        None => None,
    };
    let parents = load_parents(store, kind, row.id).await?;
    Ok(RoleRecord {
        kind,
        row: Tracked::loaded(row),
        person,
        parents,
    })
}

async fn load_parents<S>(
    store: &mut S,
    kind: RoleKind,
    player_id: Option<DbId>,
) -> StoreResult<Vec<RoleRecord>>
where
    S: PersonStore + ?Sized,
{
    let (RoleKind::Player, Some(player_id)) = (kind, player_id) else {
        return Ok(Vec::new());
    };
    let mut parents = Vec::new();
    for parent_id in store.parent_ids(player_id).await? {
        if let Some(row) = store.find_role(RoleKind::Parent, parent_id).await? {
            let person = match row.person_id {
                Some(person_id) => store.find_person(person_id).await?.map(Tracked::loaded),
                None => None,
            };
            parents.push(RoleRecord {
                kind: RoleKind::Parent,
                row: Tracked::loaded(row),
                person,
                parents: Vec::new(),
            });
        }
    }
    Ok(parents)
}

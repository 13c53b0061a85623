//! Role-records, the records reconciliation operates on, and change
//! detection over them.

use serde::{Deserialize, Serialize};

use crate::person::Person;
use crate::role::{RecordKind, RoleKind};
use crate::tracked::Tracked;
use crate::types::DbId;

/// The stored columns shared by every role table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRow {
    pub id: Option<DbId>,
    pub person_id: Option<DbId>,
    pub active: bool,
}

impl RoleRow {
    /// A fresh, unsaved, active row.
    pub fn unsaved(person_id: Option<DbId>) -> Self {
        Self {
            id: None,
            person_id,
            active: true,
        }
    }
}

/// A player, coach, parent or user together with its person.
///
/// `parents` is only ever populated for players.
#[derive(Debug, Clone, PartialEq)]
pub struct RoleRecord {
    pub kind: RoleKind,
    pub row: Tracked<RoleRow>,
    pub person: Option<Tracked<Person>>,
    pub parents: Vec<RoleRecord>,
}

impl RoleRecord {
    pub fn new(kind: RoleKind, person: Tracked<Person>) -> Self {
        let person_id = person.get().id;
        Self {
            kind,
            row: Tracked::new(RoleRow::unsaved(person_id)),
            person: Some(person),
            parents: Vec::new(),
        }
    }

    pub fn id(&self) -> Option<DbId> {
        self.row.get().id
    }

    pub fn person_id(&self) -> Option<DbId> {
        self.row.get().person_id
    }

    /// New or changed, including the person and, for players, any parent.
    pub fn is_modified(&self) -> bool {
        self.row.is_dirty()
            || self.person.as_ref().is_some_and(Tracked::is_dirty)
            || (self.kind == RoleKind::Player && self.parents.iter().any(RoleRecord::is_modified))
    }
}

/// Anything reconciliation can return: a bare person or a role-record.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Person(Tracked<Person>),
    Role(RoleRecord),
}

impl Record {
    pub fn kind(&self) -> RecordKind {
        match self {
            Record::Person(_) => RecordKind::Person,
            Record::Role(role) => RecordKind::Role(role.kind),
        }
    }

    pub fn id(&self) -> Option<DbId> {
        match self {
            Record::Person(person) => person.get().id,
            Record::Role(role) => role.id(),
        }
    }

    /// The person behind this record, if one is attached.
    pub fn person(&self) -> Option<&Person> {
        match self {
            Record::Person(person) => Some(person.get()),
            Record::Role(role) => role.person.as_ref().map(Tracked::get),
        }
    }

    pub fn as_role(&self) -> Option<&RoleRecord> {
        match self {
            Record::Role(role) => Some(role),
            Record::Person(_) => None,
        }
    }
}

/// Whether `record` has anything unsaved. Recomputed on every call.
pub fn is_modified(record: &Record) -> bool {
    match record {
        Record::Person(person) => person.is_dirty(),
        Record::Role(role) => role.is_modified(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::person::PersonFields;

    fn stored_person(id: DbId) -> Tracked<Person> {
        Tracked::loaded(Person {
            id: Some(id),
            fields: PersonFields {
                name: "Ana".into(),
                surname: "Ruiz".into(),
                ..Default::default()
            },
            ..Default::default()
        })
    }

    fn stored_role(kind: RoleKind, id: DbId, person_id: DbId) -> RoleRecord {
        RoleRecord {
            kind,
            row: Tracked::loaded(RoleRow {
                id: Some(id),
                person_id: Some(person_id),
                active: true,
            }),
            person: Some(stored_person(person_id)),
            parents: Vec::new(),
        }
    }

    #[test]
    fn new_record_is_modified() {
        let record = Record::Role(RoleRecord::new(
            RoleKind::Coach,
            Tracked::new(Person::placeholder()),
        ));
        assert!(is_modified(&record));
        assert!(is_modified(&Record::Person(Tracked::new(Person::placeholder()))));
    }

    #[test]
    fn loaded_record_is_not_modified() {
        let record = Record::Role(stored_role(RoleKind::Coach, 1, 10));
        assert!(!is_modified(&record));
        assert!(!is_modified(&Record::Person(stored_person(10))));
    }

    #[test]
    fn person_changes_propagate_to_role() {
        let mut role = stored_role(RoleKind::User, 1, 10);
        if let Some(person) = role.person.as_mut() {
            person.get_mut().fields.phone = Some("600".into());
        }
        assert!(is_modified(&Record::Role(role)));
    }

    #[test]
    fn parent_changes_propagate_to_player_only() {
        let mut parent = stored_role(RoleKind::Parent, 2, 20);
        parent.row.get_mut().active = false;

        let mut player = stored_role(RoleKind::Player, 1, 10);
        player.parents.push(parent.clone());
        assert!(player.is_modified());

        let mut coach = stored_role(RoleKind::Coach, 1, 10);
        coach.parents.push(parent);
        assert!(!coach.is_modified());
    }
}

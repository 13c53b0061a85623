//! The canonical person record, candidate attributes and identity matching.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::FieldErrors;
use crate::field::{pick, Sex};
use crate::role::RoleKind;
use crate::types::DbId;

/// Unique constraint on `persons.dni`.
pub const UQ_PERSONS_DNI: &str = "uq_persons_dni";

/// Unique constraint on (name, surname, birthday) among persons without DNI.
pub const UQ_PERSONS_IDENTITY: &str = "uq_persons_identity";

/// Unique constraint on (name, surname) among persons with neither DNI nor
/// birthday.
pub const UQ_PERSONS_NAME: &str = "uq_persons_name";

/// Stored person attributes, excluding identity and slots.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct PersonFields {
    #[validate(length(max = 20, message = "is too long (maximum is 20 characters)"))]
    pub dni: Option<String>,
    #[validate(length(min = 1, max = 50, message = "can't be blank"))]
    pub name: String,
    #[validate(length(min = 1, max = 50, message = "can't be blank"))]
    pub surname: String,
    #[validate(length(max = 50, message = "is too long (maximum is 50 characters)"))]
    pub nickname: Option<String>,
    pub birthday: Option<NaiveDate>,
    #[validate(length(max = 200, message = "is too long (maximum is 200 characters)"))]
    pub address: Option<String>,
    #[validate(email(message = "is invalid"))]
    pub email: Option<String>,
    #[validate(length(max = 20, message = "is too long (maximum is 20 characters)"))]
    pub phone: Option<String>,
    pub female: bool,
}

impl PersonFields {
    /// Run attribute validation, converting failures to field messages.
    pub fn check(&self) -> Result<(), FieldErrors> {
        self.validate().map_err(FieldErrors::from)
    }

    /// Overlay candidate attributes: supplied values win, the current
    /// value is kept otherwise.
    pub fn merge(&mut self, attrs: &PersonAttrs) {
        self.dni = clean(attrs.dni.as_deref())
            .map(|d| normalize_dni(&d))
            .filter(|d| !d.is_empty())
            .or(self.dni.take());
        self.name = pick(clean(attrs.name.as_deref()), Some(self.name.clone()), String::new());
        self.surname = pick(
            clean(attrs.surname.as_deref()),
            Some(self.surname.clone()),
            String::new(),
        );
        self.nickname = clean(attrs.nickname.as_deref()).or(self.nickname.take());
        self.birthday = attrs.birthday.or(self.birthday);
        self.address = clean(attrs.address.as_deref()).or(self.address.take());
        self.email = clean(attrs.email.as_deref()).or(self.email.take());
        self.phone = clean(attrs.phone.as_deref()).or(self.phone.take());
        self.female = pick(attrs.sex.map(Sex::is_female), Some(self.female), false);
    }

    /// The key this person would be matched under.
    pub fn match_key(&self) -> Option<MatchKey> {
        MatchKey::build(
            self.dni.as_deref(),
            Some(self.name.as_str()),
            Some(self.surname.as_str()),
            self.birthday,
        )
    }
}

/// Back-references from a person to the role-records bound to it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleSlots {
    pub player_id: Option<DbId>,
    pub coach_id: Option<DbId>,
    pub parent_id: Option<DbId>,
    pub user_id: Option<DbId>,
}

impl RoleSlots {
    pub fn get(&self, kind: RoleKind) -> Option<DbId> {
        match kind {
            RoleKind::Player => self.player_id,
            RoleKind::Coach => self.coach_id,
            RoleKind::Parent => self.parent_id,
            RoleKind::User => self.user_id,
        }
    }

    pub fn set(&mut self, kind: RoleKind, id: Option<DbId>) {
        let slot = match kind {
            RoleKind::Player => &mut self.player_id,
            RoleKind::Coach => &mut self.coach_id,
            RoleKind::Parent => &mut self.parent_id,
            RoleKind::User => &mut self.user_id,
        };
        *slot = id;
    }

    /// Slot value, but only when it is a usable (positive) id.
    pub fn bound(&self, kind: RoleKind) -> Option<DbId> {
        self.get(kind).filter(|id| *id > 0)
    }

    pub fn is_empty(&self) -> bool {
        RoleKind::ALL.iter().all(|k| self.bound(*k).is_none())
    }
}

/// A person as held in memory. `id` is `None` until first insert.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub id: Option<DbId>,
    #[serde(flatten)]
    pub fields: PersonFields,
    #[serde(flatten)]
    pub slots: RoleSlots,
}

impl Person {
    /// An unsaved person to be filled from candidate attributes.
    pub fn placeholder() -> Self {
        Self::default()
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.fields.name, self.fields.surname)
    }
}

/// Candidate person attributes as submitted by a form or import row.
///
/// Every field is optional: absent values leave the stored value alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonAttrs {
    pub id: Option<DbId>,
    pub dni: Option<String>,
    pub name: Option<String>,
    pub surname: Option<String>,
    pub nickname: Option<String>,
    pub birthday: Option<NaiveDate>,
    pub address: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub sex: Option<Sex>,
}

impl PersonAttrs {
    pub fn match_key(&self) -> Option<MatchKey> {
        MatchKey::build(
            self.dni.as_deref(),
            self.name.as_deref(),
            self.surname.as_deref(),
            self.birthday,
        )
    }

    /// Whether these attributes describe `person`, judged only against
    /// that one person: by id, then DNI, then name and surname when no
    /// DNI contradicts it.
    pub fn describes(&self, person: &Person) -> bool {
        if let Some(id) = self.id {
            return person.id == Some(id);
        }
        let dni = self
            .dni
            .as_deref()
            .map(normalize_dni)
            .filter(|d| !d.is_empty());
        if let (Some(dni), Some(stored)) = (&dni, &person.fields.dni) {
            return dni == stored;
        }
        let same = |supplied: Option<&str>, stored: &str| {
            clean(supplied).is_some_and(|s| s.to_lowercase() == stored.trim().to_lowercase())
        };
        same(self.name.as_deref(), &person.fields.name)
            && same(self.surname.as_deref(), &person.fields.surname)
    }
}

/// What makes two person records "the same individual".
///
/// A DNI, when known, is the only key used. Without one, name, surname
/// and birthday must all agree. Without a birthday either, name and
/// surname identify one of the persons that also lack both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchKey {
    Dni(String),
    Identity {
        name: String,
        surname: String,
        birthday: NaiveDate,
    },
    Name {
        name: String,
        surname: String,
    },
}

impl MatchKey {
    fn build(
        dni: Option<&str>,
        name: Option<&str>,
        surname: Option<&str>,
        birthday: Option<NaiveDate>,
    ) -> Option<Self> {
        if let Some(dni) = dni.map(normalize_dni).filter(|d| !d.is_empty()) {
            return Some(MatchKey::Dni(dni));
        }
        let name = clean(name)?.to_lowercase();
        let surname = clean(surname)?.to_lowercase();
        Some(match birthday {
            Some(birthday) => MatchKey::Identity {
                name,
                surname,
                birthday,
            },
            None => MatchKey::Name { name, surname },
        })
    }

    /// The unique index enforcing this key.
    pub fn constraint(&self) -> &'static str {
        match self {
            MatchKey::Dni(_) => UQ_PERSONS_DNI,
            MatchKey::Identity { .. } => UQ_PERSONS_IDENTITY,
            MatchKey::Name { .. } => UQ_PERSONS_NAME,
        }
    }

    /// Whether stored fields satisfy this key.
    pub fn matches(&self, fields: &PersonFields) -> bool {
        match self {
            MatchKey::Dni(dni) => fields.dni.as_deref() == Some(dni.as_str()),
            MatchKey::Identity {
                name,
                surname,
                birthday,
            } => {
                fields.name.trim().to_lowercase() == *name
                    && fields.surname.trim().to_lowercase() == *surname
                    && fields.birthday == Some(*birthday)
            }
            MatchKey::Name { name, surname } => {
                fields.dni.is_none()
                    && fields.birthday.is_none()
                    && fields.name.trim().to_lowercase() == *name
                    && fields.surname.trim().to_lowercase() == *surname
            }
        }
    }
}

/// Canonical DNI form: uppercase, no whitespace, dots or dashes.
pub fn normalize_dni(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace() && *c != '.' && *c != '-')
        .flat_map(char::to_uppercase)
        .collect()
}

fn clean(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

//! Reading and normalizing externally supplied cell values.
//!
//! Every coercion here is total: a cell that cannot be interpreted is
//! treated as absent, and absence falls through to the previous value or
//! the caller's default. Nothing in this module touches storage.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Date layouts accepted in spreadsheet cells, tried in order.
pub const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y"];

const TRUTHY: &[&str] = &["1", "true", "t", "yes", "y", "x", "si", "sí"];
const FALSY: &[&str] = &["0", "false", "f", "no", "n"];

const FEMALE: &[&str] = &["f", "female", "mujer", "w", "woman", "1", "true"];
const MALE: &[&str] = &["m", "male", "hombre", "h", "man", "0", "false"];

/// A value that can be parsed out of a raw cell.
pub trait FromCell: Sized {
    /// Parse an already trimmed, non-empty cell. `None` means "absent".
    fn from_cell(cell: &str) -> Option<Self>;
}

impl FromCell for String {
    fn from_cell(cell: &str) -> Option<Self> {
        Some(cell.to_string())
    }
}

impl FromCell for NaiveDate {
    fn from_cell(cell: &str) -> Option<Self> {
        DATE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(cell, fmt).ok())
    }
}

impl FromCell for bool {
    fn from_cell(cell: &str) -> Option<Self> {
        let token = cell.to_lowercase();
        if TRUTHY.contains(&token.as_str()) {
            Some(true)
        } else if FALSY.contains(&token.as_str()) {
            Some(false)
        } else {
            None
        }
    }
}

impl FromCell for i64 {
    fn from_cell(cell: &str) -> Option<Self> {
        cell.parse().ok()
    }
}

/// The sex flag column. Stored on the person as `female: bool`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sex {
    Female,
    Male,
}

impl Sex {
    pub fn is_female(self) -> bool {
        self == Sex::Female
    }
}

impl FromCell for Sex {
    fn from_cell(cell: &str) -> Option<Self> {
        let token = cell.to_lowercase();
        if FEMALE.contains(&token.as_str()) {
            Some(Sex::Female)
        } else if MALE.contains(&token.as_str()) {
            Some(Sex::Male)
        } else {
            None
        }
    }
}

/// Parse a raw cell. Missing, empty and whitespace-only cells are absent.
pub fn parse_cell<T: FromCell>(cell: Option<&str>) -> Option<T> {
    cell.map(str::trim)
        .filter(|c| !c.is_empty())
        .and_then(T::from_cell)
}

/// Choose between an already parsed value, the previous value and a default.
pub fn pick<T>(supplied: Option<T>, previous: Option<T>, default: T) -> T {
    supplied.or(previous).unwrap_or(default)
}

/// Resolve the value to store for a cell: the cell if present, otherwise
/// `previous` if present, otherwise `default`.
pub fn read_field<T: FromCell>(cell: Option<&str>, previous: Option<T>, default: T) -> T {
    pick(parse_cell(cell), previous, default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_wins_over_previous_and_default() {
        let v = read_field(Some("  Ana "), Some("Old".to_string()), String::new());
        assert_eq!(v, "Ana");
    }

    #[test]
    fn empty_cell_is_absent() {
        let v = read_field(Some("   "), Some("Old".to_string()), String::new());
        assert_eq!(v, "Old");
        let v = read_field::<String>(Some(""), None, "fallback".into());
        assert_eq!(v, "fallback");
    }

    #[test]
    fn missing_cell_and_previous_uses_default() {
        assert!(!read_field::<bool>(None, None, false));
    }

    #[test]
    fn dates_in_all_layouts() {
        let expected = NaiveDate::from_ymd_opt(2011, 3, 9).unwrap();
        for cell in ["2011-03-09", "09/03/2011", "09-03-2011", "09.03.2011"] {
            assert_eq!(parse_cell::<NaiveDate>(Some(cell)), Some(expected), "{cell}");
        }
    }

    #[test]
    fn unparseable_date_falls_back_to_previous() {
        let prev = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap();
        let v = read_field(Some("not a date"), Some(prev), NaiveDate::MIN);
        assert_eq!(v, prev);
    }

    #[test]
    fn truthy_and_falsy_tokens() {
        for cell in ["1", "TRUE", "Yes", "x", "Sí"] {
            assert_eq!(parse_cell::<bool>(Some(cell)), Some(true), "{cell}");
        }
        for cell in ["0", "false", "No", "F"] {
            assert_eq!(parse_cell::<bool>(Some(cell)), Some(false), "{cell}");
        }
        assert_eq!(parse_cell::<bool>(Some("maybe")), None);
    }

    #[test]
    fn sex_flag_tokens() {
        assert_eq!(parse_cell::<Sex>(Some("F")), Some(Sex::Female));
        assert_eq!(parse_cell::<Sex>(Some("mujer")), Some(Sex::Female));
        assert_eq!(parse_cell::<Sex>(Some("H")), Some(Sex::Male));
        assert_eq!(parse_cell::<Sex>(Some("0")), Some(Sex::Male));
        assert_eq!(parse_cell::<Sex>(Some("?")), None);
    }

    #[test]
    fn pick_prefers_supplied_then_previous() {
        assert_eq!(pick(Some(1), Some(2), 3), 1);
        assert_eq!(pick(None, Some(2), 3), 2);
        assert_eq!(pick(None, None, 3), 3);
    }
}

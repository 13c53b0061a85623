//! Spreadsheet row import.
//!
//! A row is an ordered list of raw cells following [`COLUMNS`], optionally
//! followed by the id of an existing role-record to update. Rows are
//! reconciled one at a time, each in its own unit of work.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{ReconcileError, StoreError};
use crate::field::{parse_cell, Sex};
use crate::observer::ReconcileObserver;
use crate::person::PersonAttrs;
use crate::reconcile::{reconcile, Outcome, Reconciled};
use crate::resolver::Candidate;
use crate::role::RoleKind;
use crate::store::{PersonStore, UnitOfWork};
use crate::types::DbId;

/// The fixed column contract of an import row.
pub const COLUMNS: [&str; 9] = [
    "dni", "name", "surname", "nickname", "birthday", "address", "email", "phone", "sex",
];

/// Index of the optional trailing record id cell.
pub const ID_COLUMN: usize = COLUMNS.len();

/// One raw row, with the 1-based line it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRow {
    pub line: usize,
    pub cells: Vec<String>,
}

impl ImportRow {
    pub fn new(line: usize, cells: Vec<String>) -> Self {
        Self { line, cells }
    }

    fn cell(&self, index: usize) -> Option<&str> {
        self.cells.get(index).map(String::as_str)
    }

    /// Parse the person columns. Absent or unparseable cells stay `None`.
    pub fn person_attrs(&self) -> PersonAttrs {
        PersonAttrs {
            id: None,
            dni: parse_cell(self.cell(0)),
            name: parse_cell(self.cell(1)),
            surname: parse_cell(self.cell(2)),
            nickname: parse_cell(self.cell(3)),
            birthday: parse_cell::<NaiveDate>(self.cell(4)),
            address: parse_cell(self.cell(5)),
            email: parse_cell(self.cell(6)),
            phone: parse_cell(self.cell(7)),
            sex: parse_cell::<Sex>(self.cell(8)),
        }
    }

    /// The trailing record id, if present and numeric.
    pub fn record_id(&self) -> Option<DbId> {
        parse_cell::<DbId>(self.cell(ID_COLUMN)).filter(|id| *id > 0)
    }
}

/// What every row of one import targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportContext {
    pub kind: RoleKind,
    /// Value for the `active` flag of imported records; `None` keeps it.
    pub active: Option<bool>,
}

impl ImportContext {
    pub fn new(kind: RoleKind) -> Self {
        Self { kind, active: None }
    }
}

/// Reconcile one row inside an already open unit of work.
pub async fn import_row<S>(
    store: &mut S,
    row: &ImportRow,
    ctx: &ImportContext,
    observer: &dyn ReconcileObserver,
) -> Result<Reconciled, ReconcileError>
where
    S: PersonStore + ?Sized,
{
    let mut candidate = Candidate::role(ctx.kind, row.person_attrs());
    candidate.id = row.record_id();
    candidate.active = ctx.active;
    reconcile(store, &candidate, observer).await
}

/// What to do with the remaining rows after one fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnError {
    /// Report the row and carry on.
    #[default]
    Skip,
    /// Stop at the first failed row.
    Abort,
}

impl std::str::FromStr for OnError {
    type Err = crate::error::CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "skip" => Ok(Self::Skip),
            "abort" => Ok(Self::Abort),
            other => Err(crate::error::CoreError::Validation(format!(
                "Unknown error policy '{other}'. Must be one of: skip, abort"
            ))),
        }
    }
}

/// A row that was rolled back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowFailure {
    pub line: usize,
    pub error: String,
}

/// Totals of one import run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub linked: usize,
    pub created: usize,
    pub failed: Vec<RowFailure>,
    /// True when an `Abort` policy stopped the run early.
    pub aborted: bool,
}

impl ImportSummary {
    pub fn processed(&self) -> usize {
        self.linked + self.created + self.failed.len()
    }
}

/// Import rows sequentially, one committed unit of work per row.
///
/// A failed row is rolled back in full. Errors opening or closing a unit
/// of work are returned and end the run.
pub async fn import_rows<U, I>(
    uow: &U,
    rows: I,
    ctx: &ImportContext,
    policy: OnError,
    observer: &dyn ReconcileObserver,
) -> Result<ImportSummary, StoreError>
where
    U: UnitOfWork + ?Sized,
    I: IntoIterator<Item = ImportRow>,
{
    let mut summary = ImportSummary::default();
    for row in rows {
        let mut store = uow.begin().await?;
        match import_row(&mut store, &row, ctx, observer).await {
            Ok(reconciled) => {
                uow.commit(store).await?;
                match reconciled.outcome {
                    Outcome::Linked => summary.linked += 1,
                    Outcome::Created => summary.created += 1,
                }
            }
            Err(err) => {
                uow.rollback(store).await?;
                summary.failed.push(RowFailure {
                    line: row.line,
                    error: err.to_string(),
                });
                if policy == OnError::Abort {
                    summary.aborted = true;
                    break;
                }
            }
        }
    }
    Ok(summary)
}

//! Domain types and pure logic for person reconciliation.
//!
//! A club keeps one canonical [`person::Person`] per real individual and
//! hangs role-records (players, coaches, parents, users) off it. This crate
//! holds the logic that keeps the two layers consistent; persistence is
//! reached only through the [`store::PersonStore`] seam.

pub mod binder;
pub mod error;
pub mod field;
pub mod import;
pub mod memory;
pub mod observer;
pub mod person;
pub mod reconcile;
pub mod record;
pub mod resolver;
pub mod role;
pub mod scrub;
pub mod store;
pub mod tracked;
pub mod types;

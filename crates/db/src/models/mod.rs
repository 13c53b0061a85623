//! Row types for the person and role tables.

pub mod person;
pub mod role_record;

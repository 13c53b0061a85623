//! Spreadsheet import of club members.
//!
//! Reads CSV rows in the fixed person column order and reconciles each one
//! as a role-record in its own transaction.

pub mod config;
pub mod reader;
pub mod runner;

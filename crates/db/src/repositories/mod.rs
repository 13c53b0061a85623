//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async query methods
//! that accept `&mut PgConnection` as the first argument, so the same
//! calls work on a pooled connection or inside a transaction.

pub mod person_repo;
pub mod player_parent_repo;
pub mod role_record_repo;

pub use person_repo::PersonRepo;
pub use player_parent_repo::PlayerParentRepo;
pub use role_record_repo::RoleRecordRepo;

//! # hearth-database
//!
//! PostgreSQL connection management, migrations, and the repository that
//! persists plugin descriptors.

pub mod connection;
pub mod migration;
pub mod repositories;

pub use connection::DatabasePool;

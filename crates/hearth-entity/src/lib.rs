//! # hearth-entity
//!
//! Domain entity models for Hearth. Every struct in this crate represents
//! a database table row or a domain value object. Persisted entities
//! additionally derive `sqlx::FromRow`.

pub mod plugin;

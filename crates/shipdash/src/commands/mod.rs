//! Command implementations

pub mod health;
pub mod job;
pub mod profile;

//! Data models.

pub mod automation;
pub mod changes;
pub mod config;
pub mod deployment;

//! Core pipeline modules.

pub mod catalog;
pub mod executor;
pub mod fetcher;
pub mod planner;
pub mod rollback;

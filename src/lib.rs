//! Jetstream Automation Control Library
//!
//! A library for bulk-enabling/disabling declarative Salesforce automation
//! (validation rules, workflow rules, flows, Apex triggers, assignment rules)
//! with a staged plan -> deploy -> rollback pipeline.

pub mod cli;
pub mod core;
pub mod error;
pub mod generators;
pub mod models;
pub mod preflight;
pub mod services;

pub use error::{Error, Result};

//! Deployment artifact generators.

pub mod package;

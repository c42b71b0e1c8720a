//! External service clients.

pub mod salesforce;
pub mod soql;

//! Backend route declarations, frontend API calls and their reconciliation.

pub mod backend;
pub mod frontend;
pub mod matcher;
pub mod path;

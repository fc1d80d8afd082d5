//! archcert core library.
//!
//! Runs independent validators over a generated multi-module application,
//! reconciles frontend API calls with documented backend routes, and folds
//! every finding into one report with a certification tier.
//!
//! High-level modules:
//! - `cli`: CLI argument parsing (binary uses this).
//! - `config`: Discovery and effective configuration resolution.
//! - `validator`: The `Validator` trait, run context and ordered validator table.
//! - `orchestrator`: Target discovery, validator selection and isolated runs.
//! - `aggregate`: Module/category grouping, top issues and certification.
//! - `output`: Text, JSON and markdown renderers.
//! - `routes`: Route extraction, call extraction and route matching.
//! - `checks`: Built-in validators.
//! - `registry`: Path-prefix to module attribution.
//! - `models`: Issue, result, route and report data models.
//! - `error`: Typed errors and exit codes.
//! - `utils`: Supporting helpers.
pub mod aggregate;
pub mod checks;
pub mod cli;
pub mod config;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod output;
pub mod registry;
pub mod routes;
pub mod utils;
pub mod validator;

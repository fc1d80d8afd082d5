//! Built-in validators.
//!
//! Registration order is the run and report order:
//! `structure`, `naming`, `schema`, `accessibility`, `api-tracer`.

pub mod accessibility;
pub mod api_tracer;
pub mod naming;
pub mod schema;
pub mod structure;

use crate::config::Effective;
use crate::error::ConfigError;
use crate::validator::ValidatorSet;
use anyhow::Context;
use std::fs;
use std::path::Path;

pub use accessibility::AccessibilityValidator;
pub use api_tracer::ApiTracer;
pub use naming::NamingValidator;
pub use schema::SchemaValidator;
pub use structure::StructureValidator;

/// Build the default validator table from resolved settings.
///
/// Globs and naming patterns are compiled here so a bad config surfaces as a
/// [`ConfigError`] before any validator runs.
pub fn builtin_validators(eff: &Effective) -> Result<ValidatorSet, ConfigError> {
    let mut set = ValidatorSet::new();
    set.register(StructureValidator::new(&eff.checks))
        .register(NamingValidator::new(&eff.checks.naming_rules)?)
        .register(SchemaValidator::new(&eff.checks.schema_globs)?)
        .register(AccessibilityValidator::new(&eff.checks.accessibility_globs)?)
        .register(ApiTracer::new(&eff.routes)?);
    Ok(set)
}

/// Read a source file, attaching the path to any I/O or UTF-8 error.
pub(crate) fn read_source(path: &Path) -> anyhow::Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

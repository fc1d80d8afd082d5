//! Validator plugin contract and the ordered, name-keyed validator table.
//!
//! A validator is any value implementing [`Validator`]: it receives the
//! resolved target through a [`ValidationContext`] and returns the issues it
//! found. Timing, pass/fail accounting and crash isolation are the
//! orchestrator's job, so implementations only report findings and may fail
//! freely with `?`.

use crate::models::{Category, Issue, Severity};
use crate::registry::ModuleRegistry;
use crate::utils;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
/// What the run covers: one module's directory or a whole project tree.
pub enum TargetKind {
    Module { name: String },
    Project,
}

impl TargetKind {
    pub fn label(&self) -> &'static str {
        match self {
            TargetKind::Module { .. } => "module",
            TargetKind::Project => "project",
        }
    }
}

/// Read-only inputs shared by every validator during one run.
pub struct ValidationContext {
    pub root: PathBuf,
    pub target: TargetKind,
    pub registry: ModuleRegistry,
}

impl ValidationContext {
    pub fn new(root: impl Into<PathBuf>, target: TargetKind, registry: ModuleRegistry) -> Self {
        Self {
            root: root.into(),
            target,
            registry,
        }
    }

    /// Project-relative form of `path`.
    pub fn rel(&self, path: &Path) -> String {
        utils::rel_path(&self.root, path)
    }

    /// Issue attributed through this run's module registry.
    pub fn issue(
        &self,
        category: Category,
        file: impl Into<String>,
        severity: Severity,
        message: impl Into<String>,
    ) -> Issue {
        Issue::new(&self.registry, category, file, severity, message)
    }
}

/// One independent check.
pub trait Validator: Send + Sync {
    /// Stable name used for selection and reporting.
    fn name(&self) -> &str;

    /// One-line description shown by `archcert list`.
    fn description(&self) -> &str {
        ""
    }

    /// Whether the validator makes sense for `target`. Validators that do
    /// not apply are skipped during discovery.
    fn applies_to(&self, _target: &TargetKind) -> bool {
        true
    }

    fn validate(&self, ctx: &ValidationContext) -> anyhow::Result<Vec<Issue>>;
}

type ValidateFn = dyn Fn(&ValidationContext) -> anyhow::Result<Vec<Issue>> + Send + Sync;

/// Adapter registering a closure as a validator.
pub struct FnValidator {
    name: String,
    run: Box<ValidateFn>,
}

impl FnValidator {
    pub fn new<F>(name: impl Into<String>, run: F) -> Self
    where
        F: Fn(&ValidationContext) -> anyhow::Result<Vec<Issue>> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            run: Box::new(run),
        }
    }
}

impl Validator for FnValidator {
    fn name(&self) -> &str {
        &self.name
    }

    fn validate(&self, ctx: &ValidationContext) -> anyhow::Result<Vec<Issue>> {
        (self.run)(ctx)
    }
}

/// Registered validators in registration order. Names are unique; registering
/// a name twice replaces the earlier entry in place.
#[derive(Clone, Default)]
pub struct ValidatorSet {
    entries: Vec<Arc<dyn Validator>>,
}

impl ValidatorSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<V: Validator + 'static>(&mut self, validator: V) -> &mut Self {
        let validator: Arc<dyn Validator> = Arc::new(validator);
        if let Some(slot) = self
            .entries
            .iter_mut()
            .find(|v| v.name() == validator.name())
        {
            *slot = validator;
        } else {
            self.entries.push(validator);
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Validator>> {
        self.entries.iter().find(|v| v.name() == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|v| v.name()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Validator>> {
        self.entries.iter()
    }
}

impl fmt::Debug for ValidatorSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

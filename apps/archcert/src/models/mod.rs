//! Shared data models: issues, validator results, routes and the report.

pub mod report;
pub mod route;

use crate::registry::ModuleRegistry;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of a finding. Ordering is `Critical > High > Medium > Low`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Critical and high findings count as errors; medium and low as warnings.
    pub fn is_error(self) -> bool {
        matches!(self, Severity::Critical | Severity::High)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closed issue taxonomy shared by every validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Category {
    Structure,
    Naming,
    Schema,
    Accessibility,
    RouteMatching,
    CodeQuality,
    Security,
    FrontendCompliance,
    ValidatorInternal,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Structure => "Structure",
            Category::Naming => "Naming",
            Category::Schema => "Schema",
            Category::Accessibility => "Accessibility",
            Category::RouteMatching => "RouteMatching",
            Category::CodeQuality => "CodeQuality",
            Category::Security => "Security",
            Category::FrontendCompliance => "FrontendCompliance",
            Category::ValidatorInternal => "ValidatorInternal",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Placeholder file used for findings that are not tied to a single file.
pub const PROJECT_FILE: &str = ".";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// A single finding attributed to a module, file and optional line.
pub struct Issue {
    pub module: String,
    pub category: Category,
    pub file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    pub message: String,
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl Issue {
    /// Build an issue, attributing it to a module through `registry`.
    ///
    /// `file` must already be relative to the project root. Backslashes are
    /// normalized to `/`, leading `./` is dropped and an empty path becomes
    /// [`PROJECT_FILE`].
    pub fn new(
        registry: &ModuleRegistry,
        category: Category,
        file: impl Into<String>,
        severity: Severity,
        message: impl Into<String>,
    ) -> Self {
        let file = normalize_file(file.into());
        let module = registry.attribute(&file);
        let mut message = message.into();
        if message.trim().is_empty() {
            message = format!("{} finding without description", category);
        }
        Self {
            module,
            category,
            file,
            line: None,
            message,
            severity,
            suggestion: None,
        }
    }

    /// Attach a 1-based line number. Zero is treated as "not line-addressable".
    pub fn at_line(mut self, line: usize) -> Self {
        self.line = if line == 0 { None } else { Some(line) };
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        let s = suggestion.into();
        self.suggestion = if s.trim().is_empty() { None } else { Some(s) };
        self
    }

    /// `file:line` when a line is known, otherwise just the file.
    pub fn location(&self) -> String {
        match self.line {
            Some(line) => format!("{}:{}", self.file, line),
            None => self.file.clone(),
        }
    }
}

fn normalize_file(file: String) -> String {
    let mut f = file.replace('\\', "/");
    while let Some(rest) = f.strip_prefix("./") {
        f = rest.to_string();
    }
    let f = f.trim_start_matches('/').to_string();
    if f.is_empty() {
        PROJECT_FILE.to_string()
    } else {
        f
    }
}

#[derive(Debug, Clone, Serialize)]
/// Outcome of one validator run.
pub struct ValidatorResult {
    pub name: String,
    pub passed: bool,
    pub issues: Vec<Issue>,
    pub errors: usize,
    pub warnings: usize,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crashed: Option<String>,
}

impl ValidatorResult {
    /// Result of a validator that completed. It passes when it produced no errors.
    pub fn completed(name: impl Into<String>, issues: Vec<Issue>, duration_ms: u64) -> Self {
        let (errors, warnings) = count_levels(&issues);
        Self {
            name: name.into(),
            passed: errors == 0,
            issues,
            errors,
            warnings,
            duration_ms,
            crashed: None,
        }
    }

    /// Result of a validator that failed or panicked instead of completing.
    ///
    /// Any issues gathered before the crash are dropped; the crash itself is
    /// recorded as one critical `ValidatorInternal` issue.
    pub fn crashed(
        registry: &ModuleRegistry,
        name: impl Into<String>,
        reason: impl Into<String>,
        duration_ms: u64,
    ) -> Self {
        let name = name.into();
        let reason = reason.into();
        let issue = Issue::new(
            registry,
            Category::ValidatorInternal,
            PROJECT_FILE,
            Severity::Critical,
            format!("validator `{}` crashed: {}", name, reason),
        )
        .with_suggestion(format!(
            "Run `archcert project <root> --validators {} -v` to reproduce and inspect the failure",
            name
        ));
        Self {
            name,
            passed: false,
            issues: vec![issue],
            errors: 1,
            warnings: 0,
            duration_ms,
            crashed: Some(reason),
        }
    }
}

/// Count `(errors, warnings)` over a set of issues.
pub fn count_levels(issues: &[Issue]) -> (usize, usize) {
    issues.iter().fold((0, 0), |(e, w), is| {
        if is.severity.is_error() {
            (e + 1, w)
        } else {
            (e, w + 1)
        }
    })
}

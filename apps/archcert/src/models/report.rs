//! Aggregated report model. JSON is the canonical form; every renderer in
//! `output` reads from these structs only.

use super::{Category, Issue, Severity};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
/// Certification tiers, ordered from worst to best.
pub enum Tier {
    Uncertified,
    Bronze,
    Silver,
    Gold,
}

impl Tier {
    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Uncertified => "uncertified",
            Tier::Bronze => "bronze",
            Tier::Silver => "silver",
            Tier::Gold => "gold",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
/// Inclusive error ceilings for each tier.
pub struct Thresholds {
    pub gold_max_errors: usize,
    pub silver_max_errors: usize,
    pub bronze_max_errors: usize,
    /// Optional warning ceiling for Gold; above it the best tier is Silver.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gold_max_warnings: Option<usize>,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            gold_max_errors: 0,
            silver_max_errors: 9,
            bronze_max_errors: 49,
            gold_max_warnings: None,
        }
    }
}

impl Thresholds {
    /// True when ceilings never decrease from Gold to Bronze.
    pub fn is_monotonic(&self) -> bool {
        self.gold_max_errors <= self.silver_max_errors
            && self.silver_max_errors <= self.bronze_max_errors
    }

    /// Tier for the given totals. Non-increasing in `errors` for fixed `warnings`.
    pub fn tier(&self, errors: usize, warnings: usize) -> Tier {
        let warnings_ok = self.gold_max_warnings.map_or(true, |max| warnings <= max);
        if errors <= self.gold_max_errors && warnings_ok {
            Tier::Gold
        } else if errors <= self.silver_max_errors {
            Tier::Silver
        } else if errors <= self.bronze_max_errors {
            Tier::Bronze
        } else {
            Tier::Uncertified
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Certification {
    pub tier: Tier,
    pub errors: usize,
    pub warnings: usize,
    pub thresholds: Thresholds,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Passed,
    Failed,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Passed => "passed",
            Status::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CategorySummary {
    pub category: Category,
    pub errors: usize,
    pub warnings: usize,
}

#[derive(Debug, Clone, Serialize)]
/// Per-module counts with a category breakdown.
pub struct ModuleSummary {
    pub module: String,
    pub errors: usize,
    pub warnings: usize,
    pub categories: Vec<CategorySummary>,
}

#[derive(Debug, Clone, Serialize)]
/// A recurring finding: issues sharing a category and message template.
pub struct TopIssue {
    pub category: Category,
    pub template: String,
    pub count: usize,
    pub severity: Severity,
    pub example: String,
    pub files: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidatorSummary {
    pub name: String,
    pub passed: bool,
    pub errors: usize,
    pub warnings: usize,
    pub issues: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crashed: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Totals {
    pub validators: usize,
    pub failed_validators: usize,
    pub crashed_validators: usize,
    pub issues: usize,
    pub errors: usize,
    pub warnings: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct TargetInfo {
    pub kind: String,
    pub root: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
/// The rendered-report model.
pub struct Report {
    pub tool: String,
    pub version: String,
    pub generated_at: String,
    pub target: TargetInfo,
    pub status: Status,
    pub certification: Certification,
    pub totals: Totals,
    pub validators: Vec<ValidatorSummary>,
    pub modules: Vec<ModuleSummary>,
    pub top_issues: Vec<TopIssue>,
    pub issues: Vec<Issue>,
}

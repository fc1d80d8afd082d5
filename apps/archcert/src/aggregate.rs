//! Merges validator results into a [`Report`].
//!
//! The flat issue list and the module view keep validator-run order; only the
//! top-issues view is ranked.

use crate::models::report::{
    CategorySummary, Certification, ModuleSummary, Report, Status, TargetInfo, Thresholds, TopIssue,
    Totals, ValidatorSummary,
};
use crate::models::{count_levels, Category, Issue, ValidatorResult};
use crate::config::DEFAULT_TOP_ISSUES;
use crate::validator::{TargetKind, ValidationContext};
use chrono::{SecondsFormat, Utc};
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

#[derive(Debug, Clone)]
pub struct ReportSettings {
    pub top_issues: usize,
    pub thresholds: Thresholds,
    /// Include per-validator durations. Off by default so that repeated runs
    /// differ only in `generated_at`.
    pub timings: bool,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            top_issues: DEFAULT_TOP_ISSUES,
            thresholds: Thresholds::default(),
            timings: false,
        }
    }
}

pub fn build_report(ctx: &ValidationContext, results: &[ValidatorResult], settings: &ReportSettings) -> Report {
    let issues: Vec<Issue> = results.iter().flat_map(|r| r.issues.iter().cloned()).collect();
    let (errors, warnings) = count_levels(&issues);

    let totals = Totals {
        validators: results.len(),
        failed_validators: results.iter().filter(|r| !r.passed).count(),
        crashed_validators: results.iter().filter(|r| r.crashed.is_some()).count(),
        issues: issues.len(),
        errors,
        warnings,
    };
    let validators = results
        .iter()
        .map(|r| ValidatorSummary {
            name: r.name.clone(),
            passed: r.passed,
            errors: r.errors,
            warnings: r.warnings,
            issues: r.issues.len(),
            crashed: r.crashed.clone(),
            duration_ms: settings.timings.then_some(r.duration_ms),
        })
        .collect();
    let status = if results.iter().all(|r| r.passed) {
        Status::Passed
    } else {
        Status::Failed
    };
    let certification = Certification {
        tier: settings.thresholds.tier(errors, warnings),
        errors,
        warnings,
        thresholds: settings.thresholds.clone(),
    };
    let target = TargetInfo {
        kind: ctx.target.label().to_string(),
        root: ctx.root.display().to_string(),
        module: match &ctx.target {
            TargetKind::Module { name } => Some(name.clone()),
            TargetKind::Project => None,
        },
    };

    Report {
        tool: "archcert".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        target,
        status,
        certification,
        totals,
        validators,
        modules: group_by_module(&issues),
        top_issues: top_issues(&issues, settings.top_issues),
        issues,
    }
}

/// Per-module and per-category counts, both in first-seen order.
pub fn group_by_module(issues: &[Issue]) -> Vec<ModuleSummary> {
    let mut modules: Vec<ModuleSummary> = Vec::new();
    for issue in issues {
        let idx = match modules.iter().position(|m| m.module == issue.module) {
            Some(i) => i,
            None => {
                modules.push(ModuleSummary {
                    module: issue.module.clone(),
                    errors: 0,
                    warnings: 0,
                    categories: Vec::new(),
                });
                modules.len() - 1
            }
        };
        let module = &mut modules[idx];
        let cat_idx = match module.categories.iter().position(|c| c.category == issue.category) {
            Some(i) => i,
            None => {
                module.categories.push(CategorySummary {
                    category: issue.category,
                    errors: 0,
                    warnings: 0,
                });
                module.categories.len() - 1
            }
        };
        if issue.severity.is_error() {
            module.errors += 1;
            module.categories[cat_idx].errors += 1;
        } else {
            module.warnings += 1;
            module.categories[cat_idx].warnings += 1;
        }
    }
    modules
}

fn quoted_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"`[^`]*`|"[^"]*"|'[^'\s]+'"#).expect("quoted regex"))
}

fn path_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?:[\w.{}-]*/)+[\w.{}-]*|\b[\w-]+\.(?:py|ts|tsx|js|jsx|sql|json|toml|ya?ml)\b")
            .expect("path regex")
    })
}

fn number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b\d+\b").expect("number regex"))
}

/// Message with its variable parts replaced, used to group recurring issues.
///
/// ``route `POST /a/{id}` is never called`` → ``route <q> is never called``
pub fn message_template(message: &str) -> String {
    let t = quoted_re().replace_all(message, "<q>");
    let t = path_re().replace_all(&t, "<path>");
    let t = number_re().replace_all(&t, "<n>");
    t.into_owned()
}

/// Issues grouped by `(category, message template)`, ranked by count, then
/// highest severity, then first appearance.
pub fn top_issues(issues: &[Issue], limit: usize) -> Vec<TopIssue> {
    let mut index: HashMap<(Category, String), usize> = HashMap::new();
    let mut groups: Vec<(TopIssue, HashSet<&str>)> = Vec::new();
    for issue in issues {
        let template = message_template(&issue.message);
        let key = (issue.category, template.clone());
        match index.get(&key) {
            Some(&i) => {
                let (top, files) = &mut groups[i];
                top.count += 1;
                top.severity = top.severity.max(issue.severity);
                files.insert(issue.file.as_str());
            }
            None => {
                index.insert(key, groups.len());
                let mut files = HashSet::new();
                files.insert(issue.file.as_str());
                groups.push((
                    TopIssue {
                        category: issue.category,
                        template,
                        count: 1,
                        severity: issue.severity,
                        example: issue.message.clone(),
                        files: 0,
                    },
                    files,
                ));
            }
        }
    }
    let mut ranked: Vec<TopIssue> = groups
        .into_iter()
        .map(|(mut top, files)| {
            top.files = files.len();
            top
        })
        .collect();
    // stable: equal keys keep first-seen order
    ranked.sort_by(|a, b| b.count.cmp(&a.count).then(b.severity.cmp(&a.severity)));
    ranked.truncate(limit);
    ranked
}

//! File naming conventions expressed as regex rules over glob-selected files.

use crate::config::NamingRule;
use crate::error::ConfigError;
use crate::models::{Category, Issue, Severity};
use crate::utils;
use crate::validator::{ValidationContext, Validator};
use glob::Pattern;
use regex::Regex;

struct CompiledRule {
    id: String,
    glob: Pattern,
    pattern: Regex,
    message: String,
    severity: Severity,
}

pub struct NamingValidator {
    rules: Vec<CompiledRule>,
    globs: Vec<Pattern>,
}

impl NamingValidator {
    pub fn new(rules: &[NamingRule]) -> Result<Self, ConfigError> {
        let mut compiled = Vec::with_capacity(rules.len());
        for rule in rules {
            let glob = utils::compile_globs(std::slice::from_ref(&rule.glob))?
                .into_iter()
                .next()
                .ok_or_else(|| ConfigError::Glob {
                    pattern: rule.glob.clone(),
                    message: "empty pattern".into(),
                })?;
            let pattern = Regex::new(&rule.pattern).map_err(|e| ConfigError::Regex {
                pattern: rule.pattern.clone(),
                message: e.to_string(),
            })?;
            compiled.push(CompiledRule {
                id: rule.id.clone(),
                glob,
                pattern,
                message: rule.message.clone(),
                severity: rule.severity.unwrap_or(Severity::Medium),
            });
        }
        let globs = compiled.iter().map(|r| r.glob.clone()).collect();
        Ok(Self {
            rules: compiled,
            globs,
        })
    }
}

impl Validator for NamingValidator {
    fn name(&self) -> &str {
        "naming"
    }

    fn description(&self) -> &str {
        "file names follow the configured conventions"
    }

    fn validate(&self, ctx: &ValidationContext) -> anyhow::Result<Vec<Issue>> {
        let mut issues = Vec::new();
        for path in utils::collect_files(&ctx.root, &self.globs) {
            let rel = ctx.rel(&path);
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            for rule in &self.rules {
                if !utils::matches_any(std::slice::from_ref(&rule.glob), &rel) {
                    continue;
                }
                if rule.pattern.is_match(&file_name) {
                    continue;
                }
                issues.push(
                    ctx.issue(
                        Category::Naming,
                        rel.clone(),
                        rule.severity,
                        format!("{}: `{}`", rule.message, file_name),
                    )
                    .with_suggestion(format!(
                        "rename to match `{}` (rule `{}`)",
                        rule.pattern.as_str(),
                        rule.id
                    )),
                );
            }
        }
        Ok(issues)
    }
}

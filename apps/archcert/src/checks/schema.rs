//! SQL schema conventions: table naming and foreign-key targets.

use super::read_source;
use crate::error::ConfigError;
use crate::models::{Category, Issue, Severity};
use crate::utils::{self, line_of};
use crate::validator::{ValidationContext, Validator};
use glob::Pattern;
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

fn create_table_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"(?i)\bcreate\s+(?:unlogged\s+)?table\s+(?:if\s+not\s+exists\s+)?(?:"?\w+"?\.)?"?(?P<name>[A-Za-z_][\w]*)"?"#,
        )
        .expect("create table regex")
    })
}

fn references_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)\breferences\s+(?:"?\w+"?\.)?"?(?P<name>[A-Za-z_][\w]*)"?"#)
            .expect("references regex")
    })
}

fn snake_case_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z][a-z0-9_]*$").expect("snake case regex"))
}

pub struct SchemaValidator {
    globs: Vec<Pattern>,
}

impl SchemaValidator {
    pub fn new(globs: &[String]) -> Result<Self, ConfigError> {
        Ok(Self {
            globs: utils::compile_globs(globs)?,
        })
    }
}

struct SchemaFile {
    rel: String,
    text: String,
}

impl Validator for SchemaValidator {
    fn name(&self) -> &str {
        "schema"
    }

    fn description(&self) -> &str {
        "SQL tables are snake_case and foreign keys target known tables"
    }

    fn validate(&self, ctx: &ValidationContext) -> anyhow::Result<Vec<Issue>> {
        let mut files = Vec::new();
        for path in utils::collect_files(&ctx.root, &self.globs) {
            let text = read_source(&path)?;
            files.push(SchemaFile {
                rel: ctx.rel(&path),
                text: blank_line_comments(&text),
            });
        }

        let mut tables: HashSet<String> = HashSet::new();
        let mut issues = Vec::new();
        for file in &files {
            for caps in create_table_re().captures_iter(&file.text) {
                let Some(m) = caps.name("name") else {
                    continue;
                };
                let name = m.as_str();
                tables.insert(name.to_ascii_lowercase());
                if !snake_case_re().is_match(name) {
                    issues.push(
                        ctx.issue(
                            Category::Schema,
                            file.rel.clone(),
                            Severity::Medium,
                            format!("table `{}` is not snake_case", name),
                        )
                        .at_line(line_of(&file.text, m.start()))
                        .with_suggestion(format!("rename to `{}`", to_snake_case(name))),
                    );
                }
            }
        }

        for file in &files {
            for caps in references_re().captures_iter(&file.text) {
                let Some(m) = caps.name("name") else {
                    continue;
                };
                if tables.contains(&m.as_str().to_ascii_lowercase()) {
                    continue;
                }
                issues.push(
                    ctx.issue(
                        Category::Schema,
                        file.rel.clone(),
                        Severity::High,
                        format!("foreign key references unknown table `{}`", m.as_str()),
                    )
                    .at_line(line_of(&file.text, m.start()))
                    .with_suggestion("create the referenced table in an earlier schema file"),
                );
            }
        }
        Ok(issues)
    }
}

/// Replace `--` comments with spaces so offsets and line numbers stay valid.
fn blank_line_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for line in text.split_inclusive('\n') {
        match line.find("--") {
            Some(idx) => {
                out.push_str(&line[..idx]);
                let rest = &line[idx..];
                let keep_newline = rest.ends_with('\n');
                let body_len = rest.len() - usize::from(keep_newline);
                out.extend(std::iter::repeat(' ').take(body_len));
                if keep_newline {
                    out.push('\n');
                }
            }
            None => out.push_str(line),
        }
    }
    out
}

fn to_snake_case(name: &str) -> String {
    let mut out = String::new();
    let mut prev_lower = false;
    for c in name.chars() {
        if c.is_ascii_uppercase() {
            if prev_lower {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
            prev_lower = false;
        } else if c == '-' {
            out.push('_');
            prev_lower = false;
        } else {
            out.push(c);
            prev_lower = c.is_ascii_lowercase() || c.is_ascii_digit();
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ModuleRegistry;
    use crate::validator::TargetKind;
    use std::fs;
    use tempfile::tempdir;

    fn ctx(root: &std::path::Path) -> ValidationContext {
        ValidationContext::new(root, TargetKind::Project, ModuleRegistry::default())
    }

    #[test]
    fn test_table_names_and_references() {
        let dir = tempdir().unwrap();
        let schema = dir.path().join("db/schema");
        fs::create_dir_all(&schema).unwrap();
        fs::write(
            schema.join("001-chat.sql"),
            "CREATE TABLE IF NOT EXISTS public.chat_sessions (\n  id uuid primary key\n);\n\
             -- CREATE TABLE IgnoredInComment (id int);\n\
             CREATE TABLE ChatMessages (\n  session_id uuid REFERENCES chat_sessions(id),\n  kb_id uuid references kb_bases(id)\n);\n",
        )
        .unwrap();
        let v = SchemaValidator::new(&["**/db/schema/*.sql".to_string()]).unwrap();
        let issues = v.validate(&ctx(dir.path())).unwrap();
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].severity, Severity::Medium);
        assert_eq!(issues[0].line, Some(5));
        assert_eq!(issues[0].suggestion.as_deref(), Some("rename to `chat_messages`"));
        assert_eq!(issues[1].severity, Severity::High);
        assert!(issues[1].message.contains("kb_bases"));
        assert_eq!(issues[1].line, Some(7));
    }

    #[test]
    fn test_unreadable_schema_is_an_error() {
        let dir = tempdir().unwrap();
        let schema = dir.path().join("db/schema");
        fs::create_dir_all(&schema).unwrap();
        fs::write(schema.join("002-broken.sql"), [0xff, 0xfe, 0x00, 0x41]).unwrap();
        let v = SchemaValidator::new(&["**/db/schema/*.sql".to_string()]).unwrap();
        assert!(v.validate(&ctx(dir.path())).is_err());
    }
}

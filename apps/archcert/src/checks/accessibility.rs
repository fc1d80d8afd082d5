//! Static accessibility checks on JSX/TSX markup.
//!
//! - `<img>` without `alt` (high)
//! - icon-only `<button>` / `<IconButton>` without `aria-label` or `title` (medium)
//! - `<div>` / `<span>` with `onClick` but no `role` (low)

use super::read_source;
use crate::error::ConfigError;
use crate::models::{Category, Issue, Severity};
use crate::utils::{self, line_of};
use crate::validator::{ValidationContext, Validator};
use glob::Pattern;
use regex::Regex;
use std::sync::OnceLock;

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<(?P<tag>img|button|IconButton|div|span)\b").expect("tag regex"))
}

fn has_attr(attrs: &str, name: &str) -> bool {
    attrs
        .match_indices(name)
        .any(|(i, _)| {
            let before = attrs[..i].chars().last().map(|c| c.is_whitespace()).unwrap_or(true);
            let after = attrs[i + name.len()..].trim_start();
            before && (after.starts_with('=') || after.is_empty() || after.starts_with('/') || after.starts_with(char::is_whitespace))
        })
}

/// Attribute text of the tag opened at `start` (the `<`), and the offset just
/// past its closing `>`. Braces and quotes are skipped so `=>` inside
/// handlers does not end the tag.
fn scan_tag(source: &str, start: usize) -> Option<(&str, usize, bool)> {
    let bytes = source.as_bytes();
    let mut depth = 0usize;
    let mut quote: Option<u8> = None;
    let mut i = start + 1;
    while i < bytes.len() {
        let c = bytes[i];
        if let Some(q) = quote {
            if c == q {
                quote = None;
            }
        } else {
            match c {
                b'"' | b'\'' | b'`' => quote = Some(c),
                b'{' => depth += 1,
                b'}' => depth = depth.saturating_sub(1),
                b'>' if depth == 0 => {
                    let self_closing = bytes[i - 1] == b'/';
                    return Some((&source[start + 1..i], i + 1, self_closing));
                }
                _ => {}
            }
        }
        i += 1;
    }
    None
}

/// Visible text of button content: tags removed, whitespace trimmed.
fn visible_text(content: &str) -> String {
    let mut out = String::new();
    let mut in_tag = false;
    for c in content.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out.trim().to_string()
}

pub struct AccessibilityValidator {
    globs: Vec<Pattern>,
}

impl AccessibilityValidator {
    pub fn new(globs: &[String]) -> Result<Self, ConfigError> {
        Ok(Self {
            globs: utils::compile_globs(globs)?,
        })
    }

    fn check_source(&self, ctx: &ValidationContext, rel: &str, source: &str, out: &mut Vec<Issue>) {
        for caps in tag_re().captures_iter(source) {
            let (Some(whole), Some(tag)) = (caps.get(0), caps.name("tag")) else {
                continue;
            };
            let Some((attrs, end, self_closing)) = scan_tag(source, whole.start()) else {
                continue;
            };
            let attrs = &attrs[tag.as_str().len()..];
            let line = line_of(source, whole.start());
            match tag.as_str() {
                "img" if !has_attr(attrs, "alt") => out.push(
                    ctx.issue(Category::Accessibility, rel, Severity::High, "<img> is missing an alt attribute")
                        .at_line(line)
                        .with_suggestion("add alt text, or alt=\"\" for decorative images"),
                ),
                "button" | "IconButton" => {
                    if has_attr(attrs, "aria-label") || has_attr(attrs, "aria-labelledby") || has_attr(attrs, "title") {
                        continue;
                    }
                    let icon_only = if tag.as_str() == "IconButton" {
                        true
                    } else if self_closing {
                        false
                    } else {
                        let close = format!("</{}>", tag.as_str());
                        let content = source[end..].find(&close).map(|i| &source[end..end + i]).unwrap_or("");
                        content.contains('<') && visible_text(content).is_empty()
                    };
                    if icon_only {
                        out.push(
                            ctx.issue(
                                Category::Accessibility,
                                rel,
                                Severity::Medium,
                                format!("icon-only <{}> has no accessible name", tag.as_str()),
                            )
                            .at_line(line)
                            .with_suggestion("add an aria-label describing the action"),
                        );
                    }
                }
                "div" | "span" if has_attr(attrs, "onClick") && !has_attr(attrs, "role") => out.push(
                    ctx.issue(
                        Category::Accessibility,
                        rel,
                        Severity::Low,
                        format!("clickable <{}> has no role", tag.as_str()),
                    )
                    .at_line(line)
                    .with_suggestion("use a <button>, or add role and keyboard handling"),
                ),
                _ => {}
            }
        }
    }
}

impl Validator for AccessibilityValidator {
    fn name(&self) -> &str {
        "accessibility"
    }

    fn description(&self) -> &str {
        "JSX markup carries alt text, accessible names and roles"
    }

    fn validate(&self, ctx: &ValidationContext) -> anyhow::Result<Vec<Issue>> {
        let mut issues = Vec::new();
        for path in utils::collect_files(&ctx.root, &self.globs) {
            let source = read_source(&path)?;
            let rel = ctx.rel(&path);
            self.check_source(ctx, &rel, &source, &mut issues);
        }
        Ok(issues)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ModuleRegistry;
    use crate::validator::TargetKind;

    const PAGE: &str = r#"export function Sessions({ items, onOpen }) {
  return (
    <div className="list">
      <img src={logo} />
      <img src={avatar} alt="" />
      <button onClick={() => onOpen(items[0])}>
        <TrashIcon />
      </button>
      <button onClick={() => onOpen(items[0])}>Open</button>
      <IconButton aria-label="Close" onClick={close} />
      <div onClick={() => onOpen(null)}>row</div>
      <span role="button" onClick={toggle}>x</span>
    </div>
  );
}
"#;

    #[test]
    fn test_flags_img_icon_button_and_clickable_div() {
        let ctx = ValidationContext::new("/p", TargetKind::Project, ModuleRegistry::default());
        let v = AccessibilityValidator::new(&["**/*.tsx".to_string()]).unwrap();
        let mut issues = Vec::new();
        v.check_source(&ctx, "frontend/pages/Sessions.tsx", PAGE, &mut issues);
        let found: Vec<(Severity, Option<usize>)> = issues.iter().map(|i| (i.severity, i.line)).collect();
        assert_eq!(
            found,
            vec![
                (Severity::High, Some(4)),
                (Severity::Medium, Some(6)),
                (Severity::Low, Some(11)),
            ]
        );
    }

    #[test]
    fn test_has_attr_requires_boundaries() {
        assert!(has_attr(" src={x} alt=\"\"", "alt"));
        assert!(!has_attr(" data-alt=\"x\"", "alt"));
        assert!(!has_attr(" altText=\"x\"", "alt"));
    }
}

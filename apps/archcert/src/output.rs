//! Report rendering.
//!
//! `text` (default, colored on a terminal unless `NO_COLOR` is set), `json`
//! (canonical, pretty-printed) and `markdown`. All three carry the same
//! fields: status, certification with thresholds, validators, modules, top
//! issues and the flat issue list.

use crate::error::ReportError;
use crate::models::report::{Report, Status, Thresholds, Tier};
use crate::models::{Issue, Severity};
use owo_colors::OwoColorize;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Text,
    Json,
    Markdown,
}

impl FromStr for Format {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "human" => Ok(Format::Text),
            "json" => Ok(Format::Json),
            "markdown" | "md" => Ok(Format::Markdown),
            other => Err(ReportError::UnsupportedFormat(other.to_string())),
        }
    }
}

fn use_colors(format: Format, to_file: bool) -> bool {
    format == Format::Text && !to_file && std::env::var_os("NO_COLOR").is_none()
}

/// Render `report` and print it, or write it to `out` when given.
pub fn emit(report: &Report, format: Format, out: Option<&Path>) -> Result<(), ReportError> {
    let rendered = render(report, format, use_colors(format, out.is_some()))?;
    match out {
        Some(path) => fs::write(path, rendered).map_err(|source| ReportError::Write {
            path: path.to_path_buf(),
            source,
        }),
        None => {
            print!("{}", rendered);
            Ok(())
        }
    }
}

pub fn render(report: &Report, format: Format, color: bool) -> Result<String, ReportError> {
    match format {
        Format::Text => Ok(render_text(report, color)),
        Format::Json => render_json(report),
        Format::Markdown => Ok(render_markdown(report)),
    }
}

pub fn render_json(report: &Report) -> Result<String, ReportError> {
    let mut s = serde_json::to_string_pretty(report)?;
    s.push('\n');
    Ok(s)
}

fn thresholds_line(t: &Thresholds) -> String {
    let mut s = format!(
        "gold<={} silver<={} bronze<={} errors",
        t.gold_max_errors, t.silver_max_errors, t.bronze_max_errors
    );
    if let Some(w) = t.gold_max_warnings {
        let _ = write!(s, ", gold<={} warnings", w);
    }
    s
}

fn severity_tag(sev: Severity, color: bool) -> String {
    let tag = format!("⟦{}⟧", sev);
    if !color {
        return tag;
    }
    match sev {
        Severity::Critical => tag.magenta().bold().to_string(),
        Severity::High => tag.red().bold().to_string(),
        Severity::Medium => tag.yellow().bold().to_string(),
        Severity::Low => tag.blue().bold().to_string(),
    }
}

fn severity_icon(sev: Severity, color: bool) -> String {
    let icon = match sev {
        Severity::Critical | Severity::High => "✖",
        Severity::Medium => "▲",
        Severity::Low => "◆",
    };
    if !color {
        return icon.to_string();
    }
    match sev {
        Severity::Critical | Severity::High => icon.red().to_string(),
        Severity::Medium => icon.yellow().to_string(),
        Severity::Low => icon.blue().to_string(),
    }
}

fn tier_label(tier: Tier, color: bool) -> String {
    let label = tier.as_str().to_ascii_uppercase();
    if !color {
        return label;
    }
    match tier {
        Tier::Gold => label.yellow().bold().to_string(),
        Tier::Silver => label.white().bold().to_string(),
        Tier::Bronze => label.bright_red().bold().to_string(),
        Tier::Uncertified => label.bright_black().bold().to_string(),
    }
}

fn status_label(status: Status, color: bool) -> String {
    let label = status.as_str().to_ascii_uppercase();
    match (status, color) {
        (_, false) => label,
        (Status::Passed, true) => label.green().bold().to_string(),
        (Status::Failed, true) => label.red().bold().to_string(),
    }
}

pub fn render_text(report: &Report, color: bool) -> String {
    let mut out = String::new();
    let heading = |s: &str| if color { s.bold().to_string() } else { s.to_string() };

    let _ = writeln!(
        out,
        "{} {} · {} report for {}",
        report.tool, report.version, report.target.kind, report.target.root
    );
    if let Some(module) = &report.target.module {
        let _ = writeln!(out, "module: {}", module);
    }
    let _ = writeln!(out, "generated at {}", report.generated_at);
    let _ = writeln!(
        out,
        "status: {}   certification: {} (errors={} warnings={})",
        status_label(report.status, color),
        tier_label(report.certification.tier, color),
        report.certification.errors,
        report.certification.warnings
    );
    let _ = writeln!(out, "thresholds: {}", thresholds_line(&report.certification.thresholds));

    let _ = writeln!(out, "\n{}", heading("Validators"));
    for v in &report.validators {
        let mark = match (&v.crashed, v.passed) {
            (Some(_), _) => if color { "✖".magenta().to_string() } else { "✖".to_string() },
            (None, true) => if color { "✔".green().to_string() } else { "✔".to_string() },
            (None, false) => if color { "✖".red().to_string() } else { "✖".to_string() },
        };
        let mut line = format!(
            "  {} {} errors={} warnings={} issues={}",
            mark, v.name, v.errors, v.warnings, v.issues
        );
        if let Some(reason) = &v.crashed {
            let _ = write!(line, " crashed: {}", reason);
        }
        if let Some(ms) = v.duration_ms {
            let _ = write!(line, " ({}ms)", ms);
        }
        let _ = writeln!(out, "{}", line);
    }

    if !report.modules.is_empty() {
        let _ = writeln!(out, "\n{}", heading("Modules"));
        for m in &report.modules {
            let _ = writeln!(out, "  {} errors={} warnings={}", m.module, m.errors, m.warnings);
            for c in &m.categories {
                let _ = writeln!(out, "    {} errors={} warnings={}", c.category, c.errors, c.warnings);
            }
        }
    }

    if !report.top_issues.is_empty() {
        let _ = writeln!(out, "\n{}", heading("Top issues"));
        for (i, t) in report.top_issues.iter().enumerate() {
            let _ = writeln!(
                out,
                "  {}. [{}] {} ×{} ({}, {} file{})",
                i + 1,
                t.category,
                t.template,
                t.count,
                t.severity,
                t.files,
                if t.files == 1 { "" } else { "s" }
            );
            let _ = writeln!(out, "      e.g. {}", t.example);
        }
    }

    if !report.issues.is_empty() {
        let _ = writeln!(out, "\n{}", heading("Issues"));
        for is in &report.issues {
            let _ = writeln!(out, "{}", issue_line(is, color));
            if let Some(s) = &is.suggestion {
                let _ = writeln!(out, "      ↳ {}", s);
            }
        }
    }

    let summary = format!(
        "— Summary — validators={} failed={} crashed={} issues={} errors={} warnings={}",
        report.totals.validators,
        report.totals.failed_validators,
        report.totals.crashed_validators,
        report.totals.issues,
        report.totals.errors,
        report.totals.warnings
    );
    let _ = writeln!(out, "\n{}", heading(&summary));
    out
}

fn issue_line(is: &Issue, color: bool) -> String {
    let loc = if color {
        is.location().bold().to_string()
    } else {
        is.location()
    };
    format!(
        "  {} {} {} ❲{}/{}❳ {}",
        severity_icon(is.severity, color),
        severity_tag(is.severity, color),
        loc,
        is.module,
        is.category,
        is.message
    )
}

fn md_cell(s: &str) -> String {
    s.replace('|', "\\|").replace('\n', " ")
}

pub fn render_markdown(report: &Report) -> String {
    let mut out = String::new();
    let c = &report.certification;
    let _ = writeln!(out, "# {} report", report.tool);
    let _ = writeln!(out);
    let _ = writeln!(out, "- **Target:** {} `{}`", report.target.kind, report.target.root);
    if let Some(m) = &report.target.module {
        let _ = writeln!(out, "- **Module:** {}", m);
    }
    let _ = writeln!(out, "- **Version:** {}", report.version);
    let _ = writeln!(out, "- **Generated:** {}", report.generated_at);
    let _ = writeln!(out, "- **Status:** {}", report.status.as_str());
    let _ = writeln!(
        out,
        "- **Certification:** {} (errors={}, warnings={})",
        c.tier, c.errors, c.warnings
    );
    let _ = writeln!(out, "- **Thresholds:** {}", thresholds_line(&c.thresholds));

    let _ = writeln!(out, "\n## Validators\n");
    let timings = report.validators.iter().any(|v| v.duration_ms.is_some());
    if timings {
        let _ = writeln!(out, "| Validator | Passed | Errors | Warnings | Issues | Crashed | Duration (ms) |");
        let _ = writeln!(out, "|---|---|---|---|---|---|---|");
    } else {
        let _ = writeln!(out, "| Validator | Passed | Errors | Warnings | Issues | Crashed |");
        let _ = writeln!(out, "|---|---|---|---|---|---|");
    }
    for v in &report.validators {
        let _ = write!(
            out,
            "| {} | {} | {} | {} | {} | {} |",
            v.name,
            if v.passed { "yes" } else { "no" },
            v.errors,
            v.warnings,
            v.issues,
            md_cell(v.crashed.as_deref().unwrap_or(""))
        );
        if timings {
            let _ = write!(out, " {} |", v.duration_ms.unwrap_or(0));
        }
        let _ = writeln!(out);
    }

    let _ = writeln!(out, "\n## Modules\n");
    let _ = writeln!(out, "| Module | Category | Errors | Warnings |");
    let _ = writeln!(out, "|---|---|---|---|");
    for m in &report.modules {
        let _ = writeln!(out, "| **{}** | *all* | {} | {} |", m.module, m.errors, m.warnings);
        for cat in &m.categories {
            let _ = writeln!(out, "| {} | {} | {} | {} |", m.module, cat.category, cat.errors, cat.warnings);
        }
    }

    let _ = writeln!(out, "\n## Top issues\n");
    let _ = writeln!(out, "| # | Category | Template | Example | Count | Severity | Files |");
    let _ = writeln!(out, "|---|---|---|---|---|---|---|");
    for (i, t) in report.top_issues.iter().enumerate() {
        let _ = writeln!(
            out,
            "| {} | {} | {} | {} | {} | {} | {} |",
            i + 1,
            t.category,
            md_cell(&t.template),
            md_cell(&t.example),
            t.count,
            t.severity,
            t.files
        );
    }

    let _ = writeln!(out, "\n## Issues\n");
    let _ = writeln!(out, "| Severity | Module | Category | Location | Message | Suggestion |");
    let _ = writeln!(out, "|---|---|---|---|---|---|");
    for is in &report.issues {
        let _ = writeln!(
            out,
            "| {} | {} | {} | `{}` | {} | {} |",
            is.severity,
            is.module,
            is.category,
            is.location(),
            md_cell(&is.message),
            md_cell(is.suggestion.as_deref().unwrap_or(""))
        );
    }

    let t = &report.totals;
    let _ = writeln!(
        out,
        "\n**Totals:** validators={} failed={} crashed={} issues={} errors={} warnings={}",
        t.validators, t.failed_validators, t.crashed_validators, t.issues, t.errors, t.warnings
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{build_report, ReportSettings};
    use crate::models::{Category, ValidatorResult};
    use crate::registry::ModuleRegistry;
    use crate::validator::{TargetKind, ValidationContext};
    use serde_json::Value;
    use tempfile::tempdir;

    fn sample() -> Report {
        let ctx = ValidationContext::new(
            "/p",
            TargetKind::Project,
            ModuleRegistry::from_pairs([("packages/chat", "chat")]),
        );
        let issue = ctx
            .issue(
                Category::RouteMatching,
                "packages/chat/frontend/api.ts",
                Severity::High,
                "no backend route declared for `DELETE /a|b`",
            )
            .at_line(3)
            .with_suggestion("declare it");
        build_report(
            &ctx,
            &[
                ValidatorResult::completed("api-tracer", vec![issue], 2),
                ValidatorResult::crashed(&ctx.registry, "schema", "bad input", 1),
            ],
            &ReportSettings::default(),
        )
    }

    #[test]
    fn test_format_parse() {
        assert_eq!("JSON".parse::<Format>().unwrap(), Format::Json);
        assert_eq!("md".parse::<Format>().unwrap(), Format::Markdown);
        assert!(matches!(
            "xml".parse::<Format>(),
            Err(ReportError::UnsupportedFormat(f)) if f == "xml"
        ));
    }

    #[test]
    fn test_json_is_canonical_model() {
        let v: Value = serde_json::from_str(&render_json(&sample()).unwrap()).unwrap();
        assert_eq!(v["status"], "failed");
        assert_eq!(v["certification"]["tier"], "silver");
        assert_eq!(v["certification"]["thresholds"]["bronze_max_errors"], 49);
        assert_eq!(v["issues"][0]["line"], 3);
        assert_eq!(v["issues"][0]["category"], "RouteMatching");
        assert_eq!(v["issues"][1]["severity"], "critical");
        assert!(v["validators"][0].get("duration_ms").is_none());
        let keys: Vec<&str> = v.as_object().unwrap().keys().map(|k| k.as_str()).collect();
        assert_eq!(&keys[..4], &["tool", "version", "generated_at", "target"]);
    }

    #[test]
    fn test_text_and_markdown_carry_same_fields() {
        let r = sample();
        let text = render_text(&r, false);
        assert!(text.contains("status: FAILED"));
        assert!(text.contains("thresholds: gold<=0 silver<=9 bronze<=49 errors"));
        assert!(text.contains("✖ ⟦high⟧ packages/chat/frontend/api.ts:3 ❲chat/RouteMatching❳"));
        assert!(text.contains("crashed: bad input"));

        let md = render_markdown(&r);
        assert!(md.contains("- **Status:** failed"));
        assert!(md.contains("- **Thresholds:** gold<=0 silver<=9 bronze<=49 errors"));
        assert!(md.contains("`DELETE /a\\|b`"));
        assert!(md.contains("## Top issues"));
    }

    #[test]
    fn test_every_json_field_reaches_text_and_markdown() {
        let ctx = ValidationContext::new(
            "/p/packages/module-chat",
            TargetKind::Module {
                name: "module-chat".into(),
            },
            ModuleRegistry::single("module-chat"),
        );
        let issue = ctx
            .issue(
                Category::Naming,
                "frontend/lib/api.ts",
                Severity::Medium,
                "path parameter `sessionId` differs",
            )
            .at_line(7);
        let report = build_report(
            &ctx,
            &[
                ValidatorResult::completed("api-tracer", vec![issue.clone(), issue], 4),
                ValidatorResult::completed("structure", Vec::new(), 1),
            ],
            &ReportSettings::default(),
        );
        let json: Value = serde_json::from_str(&render_json(&report).unwrap()).unwrap();
        let top = &json["top_issues"][0];
        let expected = [
            json["target"]["module"].as_str().unwrap().to_string(),
            top["example"].as_str().unwrap().to_string(),
            top["template"].as_str().unwrap().to_string(),
            json["generated_at"].as_str().unwrap().to_string(),
        ];
        let text = render_text(&report, false);
        let md = render_markdown(&report);
        for field in &expected {
            assert!(text.contains(field.as_str()), "text is missing {}", field);
            assert!(md.contains(field.as_str()), "markdown is missing {}", field);
        }
        assert_eq!(json["validators"][0]["issues"], 2);
        assert!(text.contains("api-tracer errors=0 warnings=2 issues=2"));
        assert!(text.contains("module: module-chat"));
        assert!(text.contains("e.g. path parameter `sessionId` differs"));
        assert!(md.contains("| api-tracer | yes | 0 | 2 | 2 |"));
        assert!(md.contains("| path parameter <q> differs | path parameter `sessionId` differs | 2 |"));
    }

    #[test]
    fn test_emit_writes_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("report.json");
        emit(&sample(), Format::Json, Some(&path)).unwrap();
        let written = fs::read_to_string(&path).unwrap();
        assert!(written.starts_with('{'));

        let bad = emit(&sample(), Format::Json, Some(&dir.path().join("missing/report.json")));
        assert!(matches!(bad, Err(ReportError::Write { .. })));
    }
}

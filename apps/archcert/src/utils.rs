//! Supporting helpers: colored message prefixes, project-relative paths and
//! file discovery.

use crate::error::ConfigError;
use glob::{MatchOptions, Pattern};
use owo_colors::OwoColorize;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Directories never descended into while collecting files.
pub const IGNORED_DIRS: &[&str] = &[
    ".git",
    "node_modules",
    "target",
    "dist",
    "build",
    ".next",
    ".venv",
    "venv",
    "__pycache__",
    ".terraform",
    ".archcert",
];

fn colors_enabled() -> bool {
    std::env::var_os("NO_COLOR").is_none()
}

pub fn error_prefix() -> String {
    if colors_enabled() {
        "error:".red().bold().to_string()
    } else {
        "error:".to_string()
    }
}

pub fn note_prefix() -> String {
    if colors_enabled() {
        "note:".cyan().bold().to_string()
    } else {
        "note:".to_string()
    }
}

pub fn info_prefix() -> String {
    if colors_enabled() {
        "info:".blue().bold().to_string()
    } else {
        "info:".to_string()
    }
}

/// Path of `path` relative to `root`, `/`-separated. Falls back to the
/// input when no relative form exists.
pub fn rel_path(root: &Path, path: &Path) -> String {
    let rel = if path.is_absolute() == root.is_absolute() {
        pathdiff::diff_paths(path, root).unwrap_or_else(|| path.to_path_buf())
    } else {
        path.to_path_buf()
    };
    let s = rel.to_string_lossy().replace('\\', "/");
    let s = s.trim_start_matches("./");
    if s.is_empty() {
        ".".to_string()
    } else {
        s.to_string()
    }
}

/// Compile glob patterns evaluated against project-relative paths.
pub fn compile_globs(patterns: &[String]) -> Result<Vec<Pattern>, ConfigError> {
    patterns
        .iter()
        .map(|p| {
            Pattern::new(p).map_err(|e| ConfigError::Glob {
                pattern: p.clone(),
                message: e.to_string(),
            })
        })
        .collect()
}

fn match_options() -> MatchOptions {
    MatchOptions {
        case_sensitive: true,
        require_literal_separator: true,
        require_literal_leading_dot: false,
    }
}

/// True when `rel` matches any of `patterns`.
pub fn matches_any(patterns: &[Pattern], rel: &str) -> bool {
    let opts = match_options();
    patterns.iter().any(|p| p.matches_with(rel, opts))
}

/// Walk `root` and return files whose relative path matches one of
/// `patterns`, sorted for deterministic output.
pub fn collect_files(root: &Path, patterns: &[Pattern]) -> Vec<PathBuf> {
    let mut out: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| {
            if e.depth() == 0 || !e.file_type().is_dir() {
                return true;
            }
            let name = e.file_name().to_string_lossy();
            !IGNORED_DIRS.contains(&name.as_ref())
        })
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| matches_any(patterns, &rel_path(root, p)))
        .collect();
    out.sort();
    out
}

/// True when `rel`, or any tail of it starting at a directory boundary,
/// starts with one of `prefixes`.
pub fn has_excluded_prefix(rel: &str, prefixes: &[String]) -> bool {
    if prefixes.is_empty() {
        return false;
    }
    let mut tail = rel;
    loop {
        if prefixes
            .iter()
            .any(|p| !p.is_empty() && tail.starts_with(p.as_str()))
        {
            return true;
        }
        match tail.find('/') {
            Some(idx) => tail = &tail[idx + 1..],
            None => return false,
        }
    }
}

/// 1-based line number of byte `offset` within `text`.
pub fn line_of(text: &str, offset: usize) -> usize {
    let end = offset.min(text.len());
    text.as_bytes()[..end].iter().filter(|b| **b == b'\n').count() + 1
}

/// Comma-separated list to trimmed, non-empty tokens.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

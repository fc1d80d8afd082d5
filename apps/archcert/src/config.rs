//! Configuration discovery and effective settings resolution.
//!
//! archcert reads `archcert.toml|yaml|yml` from the target directory or the
//! closest ancestor (stopping at a `.git` directory) and merges it with CLI
//! flags to produce an [`Effective`] config.
//!
//! Defaults:
//! - `format`: `text`
//! - `validators` / `exclude`: empty (run everything registered)
//! - `top_issues`: 10
//! - `parallel`: false, `timeout_secs`: none
//! - `certification`: gold ≤ 0, silver ≤ 9, bronze ≤ 49 errors; minimum tier `bronze`
//! - `modules`: discovered from `packages/*` and `modules/*` when empty
//!
//! Overrides precedence: CLI > config file > defaults.

use crate::error::ConfigError;
use crate::models::report::{Thresholds, Tier};
use crate::models::Severity;
use crate::utils;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILES: &[&str] = &["archcert.toml", "archcert.yaml", "archcert.yml"];
pub const DEFAULT_TOP_ISSUES: usize = 10;

#[derive(Debug, Default, Deserialize, Clone)]
/// Root configuration loaded from `archcert.toml|yaml`.
pub struct ArchcertConfig {
    pub format: Option<String>,
    /// Include list; when non-empty only these validators run.
    pub validators: Option<Vec<String>>,
    pub exclude: Option<Vec<String>>,
    pub top_issues: Option<usize>,
    pub parallel: Option<bool>,
    pub timeout_secs: Option<u64>,
    /// `"path/prefix" = "module-name"`
    #[serde(default)]
    pub modules: BTreeMap<String, String>,
    pub certification: Option<CertificationCfg>,
    pub routes: Option<RoutesCfg>,
    pub structure: Option<StructureCfg>,
    pub naming: Option<NamingCfg>,
    pub schema: Option<SchemaCfg>,
    pub accessibility: Option<AccessibilityCfg>,
}

#[derive(Debug, Default, Deserialize, Clone)]
pub struct CertificationCfg {
    pub gold_max_errors: Option<usize>,
    pub silver_max_errors: Option<usize>,
    pub bronze_max_errors: Option<usize>,
    pub gold_max_warnings: Option<usize>,
    pub minimum_tier: Option<Tier>,
}

#[derive(Debug, Default, Deserialize, Clone)]
pub struct RoutesCfg {
    pub backend: Option<Vec<String>>,
    pub frontend: Option<Vec<String>>,
    pub exclude_prefixes: Option<Vec<String>>,
    pub orphan_exempt_scopes: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize, Clone)]
pub struct StructureCfg {
    pub module_dirs: Option<Vec<String>>,
    pub project_dirs: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize, Clone)]
pub struct NamingCfg {
    pub rules: Option<Vec<NamingRule>>,
}

#[derive(Debug, Default, Deserialize, Clone)]
pub struct SchemaCfg {
    pub globs: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize, Clone)]
pub struct AccessibilityCfg {
    pub globs: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
/// A file-name convention: files matching `glob` must have names matching `pattern`.
pub struct NamingRule {
    pub id: String,
    pub glob: String,
    pub pattern: String,
    pub message: String,
    #[serde(default)]
    pub severity: Option<Severity>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Settings for the api tracer.
pub struct RouteSettings {
    pub backend: Vec<String>,
    pub frontend: Vec<String>,
    pub exclude_prefixes: Vec<String>,
    pub orphan_exempt_scopes: Vec<String>,
}

impl Default for RouteSettings {
    fn default() -> Self {
        Self {
            backend: strings(&["**/backend/**/*.py", "**/backend/**/*.ts", "**/backend/**/*.js"]),
            frontend: strings(&[
                "**/frontend/**/*.ts",
                "**/frontend/**/*.tsx",
                "**/frontend/**/*.js",
                "**/frontend/**/*.jsx",
            ]),
            exclude_prefixes: strings(&["tests/", "test/", "__tests__/", "__mocks__/", "fixtures/"]),
            orphan_exempt_scopes: strings(&["webhook"]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Settings shared by the built-in non-route validators.
pub struct CheckSettings {
    pub module_dirs: Vec<String>,
    pub project_dirs: Vec<String>,
    pub naming_rules: Vec<NamingRule>,
    pub schema_globs: Vec<String>,
    pub accessibility_globs: Vec<String>,
}

impl Default for CheckSettings {
    fn default() -> Self {
        Self {
            module_dirs: strings(&["backend", "frontend"]),
            project_dirs: Vec::new(),
            naming_rules: default_naming_rules(),
            schema_globs: strings(&["**/db/schema/*.sql"]),
            accessibility_globs: strings(&["**/*.tsx", "**/*.jsx"]),
        }
    }
}

pub fn default_naming_rules() -> Vec<NamingRule> {
    vec![
        NamingRule {
            id: "python-snake-case".into(),
            glob: "**/*.py".into(),
            pattern: r"^[a-z0-9_]+\.py$".into(),
            message: "Python module names must be snake_case".into(),
            severity: None,
        },
        NamingRule {
            id: "component-pascal-case".into(),
            glob: "**/components/**/*.tsx".into(),
            pattern: r"^(index|[A-Z][A-Za-z0-9]*)(\.(test|stories))?\.tsx$".into(),
            message: "React component files must be PascalCase".into(),
            severity: None,
        },
        NamingRule {
            id: "schema-file-order".into(),
            glob: "**/db/schema/*.sql".into(),
            pattern: r"^\d{3}-[a-z0-9-]+\.sql$".into(),
            message: "SQL schema files must be named NNN-name.sql".into(),
            severity: None,
        },
    ]
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[derive(Debug, Default, Clone)]
/// Command-line values that take precedence over the config file.
pub struct Overrides {
    pub config: Option<String>,
    pub format: Option<String>,
    pub validators: Option<String>,
    pub exclude: Option<String>,
    pub top: Option<usize>,
    pub parallel: bool,
    pub timeout_secs: Option<u64>,
    pub timings: bool,
    pub certify: bool,
    pub out: Option<String>,
}

#[derive(Debug, Clone)]
/// Fully-resolved configuration used by commands after applying precedence.
pub struct Effective {
    pub config_path: Option<PathBuf>,
    pub format: String,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub top_issues: usize,
    pub parallel: bool,
    pub timeout: Option<Duration>,
    pub timings: bool,
    pub certify: bool,
    pub thresholds: Thresholds,
    pub minimum_tier: Tier,
    pub modules: BTreeMap<String, String>,
    pub routes: RouteSettings,
    pub checks: CheckSettings,
    pub out: Option<PathBuf>,
}

/// Walk upward from `start` to the directory holding an archcert config.
///
/// Stops at the first config file or `.git` directory; falls back to `start`.
pub fn detect_config_root(start: &Path) -> PathBuf {
    let mut cur = start;
    loop {
        if CONFIG_FILES.iter().any(|f| cur.join(f).is_file()) {
            return cur.to_path_buf();
        }
        if cur.join(".git").exists() {
            return cur.to_path_buf();
        }
        match cur.parent() {
            Some(p) if !p.as_os_str().is_empty() => cur = p,
            _ => return start.to_path_buf(),
        }
    }
}

/// Config file present in `root`, if any.
pub fn find_config(root: &Path) -> Option<PathBuf> {
    CONFIG_FILES
        .iter()
        .map(|f| root.join(f))
        .find(|p| p.is_file())
}

/// Parse a config file, choosing TOML or YAML by extension.
pub fn load_config_file(path: &Path) -> Result<ArchcertConfig, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let is_yaml = path
        .extension()
        .map(|e| e == "yaml" || e == "yml")
        .unwrap_or(false);
    if is_yaml {
        serde_yaml::from_str(&text).map_err(|e| ConfigError::Yaml {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    } else {
        toml::from_str(&text).map_err(|e| ConfigError::Toml {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}

/// Resolve `Effective` by merging CLI overrides, the discovered config, and defaults.
pub fn resolve_effective(target: &Path, ov: &Overrides) -> Result<Effective, ConfigError> {
    let config_path = match ov.config.as_deref() {
        Some(explicit) => Some(PathBuf::from(explicit)),
        None => find_config(&detect_config_root(target)),
    };
    let cfg = match config_path.as_deref() {
        Some(p) => load_config_file(p)?,
        None => ArchcertConfig::default(),
    };

    let format = ov
        .format
        .clone()
        .or(cfg.format)
        .unwrap_or_else(|| "text".to_string());

    let include = ov
        .validators
        .as_deref()
        .map(utils::split_list)
        .or(cfg.validators)
        .unwrap_or_default();
    let exclude = ov
        .exclude
        .as_deref()
        .map(utils::split_list)
        .or(cfg.exclude)
        .unwrap_or_default();

    let top_issues = ov.top.or(cfg.top_issues).unwrap_or(DEFAULT_TOP_ISSUES);
    let parallel = ov.parallel || cfg.parallel.unwrap_or(false);
    let timeout = ov
        .timeout_secs
        .or(cfg.timeout_secs)
        .filter(|s| *s > 0)
        .map(Duration::from_secs);

    let cert = cfg.certification.unwrap_or_default();
    let defaults = Thresholds::default();
    let thresholds = Thresholds {
        gold_max_errors: cert.gold_max_errors.unwrap_or(defaults.gold_max_errors),
        silver_max_errors: cert.silver_max_errors.unwrap_or(defaults.silver_max_errors),
        bronze_max_errors: cert.bronze_max_errors.unwrap_or(defaults.bronze_max_errors),
        gold_max_warnings: cert.gold_max_warnings,
    };
    if !thresholds.is_monotonic() {
        return Err(ConfigError::Thresholds {
            gold: thresholds.gold_max_errors,
            silver: thresholds.silver_max_errors,
            bronze: thresholds.bronze_max_errors,
        });
    }
    let minimum_tier = cert.minimum_tier.unwrap_or(Tier::Bronze);

    let route_defaults = RouteSettings::default();
    let rc = cfg.routes.unwrap_or_default();
    let routes = RouteSettings {
        backend: rc.backend.unwrap_or(route_defaults.backend),
        frontend: rc.frontend.unwrap_or(route_defaults.frontend),
        exclude_prefixes: rc.exclude_prefixes.unwrap_or(route_defaults.exclude_prefixes),
        orphan_exempt_scopes: rc
            .orphan_exempt_scopes
            .unwrap_or(route_defaults.orphan_exempt_scopes),
    };

    let check_defaults = CheckSettings::default();
    let sc = cfg.structure.unwrap_or_default();
    let checks = CheckSettings {
        module_dirs: sc.module_dirs.unwrap_or(check_defaults.module_dirs),
        project_dirs: sc.project_dirs.unwrap_or(check_defaults.project_dirs),
        naming_rules: cfg
            .naming
            .and_then(|n| n.rules)
            .unwrap_or(check_defaults.naming_rules),
        schema_globs: cfg
            .schema
            .and_then(|s| s.globs)
            .unwrap_or(check_defaults.schema_globs),
        accessibility_globs: cfg
            .accessibility
            .and_then(|a| a.globs)
            .unwrap_or(check_defaults.accessibility_globs),
    };

    Ok(Effective {
        config_path,
        format,
        include,
        exclude,
        top_issues,
        parallel,
        timeout,
        timings: ov.timings,
        certify: ov.certify,
        thresholds,
        minimum_tier,
        modules: cfg.modules,
        routes,
        checks,
        out: ov.out.as_ref().map(PathBuf::from),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_detect_and_load_toml() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        let mut f = fs::File::create(root.join("archcert.toml")).unwrap();
        writeln!(
            f,
            "{}",
            r#"
format = "json"
exclude = ["accessibility"]
top_issues = 5

[modules]
"packages/module-chat" = "module-chat"

[certification]
silver_max_errors = 4
minimum_tier = "silver"

[routes]
orphan_exempt_scopes = ["webhook", "internal"]
    "#
        )
        .unwrap();
        fs::create_dir_all(root.join("packages/module-chat")).unwrap();

        let eff = resolve_effective(&root.join("packages/module-chat"), &Overrides::default())
            .unwrap();
        assert_eq!(eff.config_path, Some(root.join("archcert.toml")));
        assert_eq!(eff.format, "json");
        assert_eq!(eff.exclude, vec!["accessibility".to_string()]);
        assert_eq!(eff.top_issues, 5);
        assert_eq!(eff.thresholds.silver_max_errors, 4);
        assert_eq!(eff.thresholds.bronze_max_errors, 49);
        assert_eq!(eff.minimum_tier, Tier::Silver);
        assert_eq!(eff.modules.get("packages/module-chat").unwrap(), "module-chat");
        assert_eq!(eff.routes.orphan_exempt_scopes.len(), 2);
        assert_eq!(eff.routes.backend, RouteSettings::default().backend);
    }

    #[test]
    fn test_load_yaml_and_defaults() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::write(
            root.join("archcert.yaml"),
            "validators:\n  - structure\n  - api-tracer\nparallel: true\n",
        )
        .unwrap();
        let eff = resolve_effective(root, &Overrides::default()).unwrap();
        assert_eq!(eff.include, vec!["structure".to_string(), "api-tracer".to_string()]);
        assert!(eff.parallel);
        assert_eq!(eff.format, "text");
        assert_eq!(eff.top_issues, DEFAULT_TOP_ISSUES);
        assert_eq!(eff.thresholds, Thresholds::default());
        assert_eq!(eff.minimum_tier, Tier::Bronze);
        assert_eq!(eff.checks, CheckSettings::default());
    }

    #[test]
    fn test_cli_overrides_take_precedence() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::write(
            root.join("archcert.toml"),
            "format = \"json\"\nvalidators = [\"schema\"]\ntimeout_secs = 30\n",
        )
        .unwrap();
        let ov = Overrides {
            format: Some("markdown".into()),
            validators: Some("naming, structure,".into()),
            timeout_secs: Some(0),
            ..Overrides::default()
        };
        let eff = resolve_effective(root, &ov).unwrap();
        assert_eq!(eff.format, "markdown");
        assert_eq!(eff.include, vec!["naming".to_string(), "structure".to_string()]);
        // zero disables the timeout
        assert!(eff.timeout.is_none());
    }

    #[test]
    fn test_non_monotonic_thresholds_rejected() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::write(
            root.join("archcert.toml"),
            "[certification]\ngold_max_errors = 20\nsilver_max_errors = 5\n",
        )
        .unwrap();
        let err = resolve_effective(root, &Overrides::default()).unwrap_err();
        assert!(matches!(err, ConfigError::Thresholds { .. }));
    }

    #[test]
    fn test_invalid_toml_is_reported() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("archcert.toml"), "format = [").unwrap();
        let err = resolve_effective(root, &Overrides::default()).unwrap_err();
        assert!(matches!(err, ConfigError::Toml { .. }));
    }

    #[test]
    fn test_git_dir_stops_discovery() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("repo/.git")).unwrap();
        fs::create_dir_all(root.join("repo/packages/a")).unwrap();
        assert_eq!(
            detect_config_root(&root.join("repo/packages/a")),
            root.join("repo")
        );
    }
}

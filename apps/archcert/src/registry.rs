//! Module attribution: maps project-relative paths to logical module names.
//!
//! The registry is plain configuration, built once per run and handed to
//! validators and the aggregator explicitly.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Module name used when no registered prefix owns a file.
pub const UNKNOWN_MODULE: &str = "unknown";

/// Directories whose immediate children are treated as modules when the
/// registry is not configured.
const DISCOVERY_PARENTS: &[&str] = &["packages", "modules"];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleRegistry {
    /// (prefix, module), sorted by descending prefix length.
    entries: Vec<(String, String)>,
}

impl ModuleRegistry {
    pub fn from_pairs<I, P, M>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (P, M)>,
        P: Into<String>,
        M: Into<String>,
    {
        let mut entries: Vec<(String, String)> = pairs
            .into_iter()
            .map(|(p, m)| (normalize_prefix(&p.into()), m.into()))
            .collect();
        // Longest prefix first; ties by prefix text keep the table deterministic.
        entries.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then(a.0.cmp(&b.0)));
        entries.dedup_by(|a, b| a.0 == b.0);
        Self { entries }
    }

    /// Registry mapping every file to one module (single-module runs).
    pub fn single(module: impl Into<String>) -> Self {
        Self::from_pairs([(String::new(), module.into())])
    }

    /// Discover `packages/*` and `modules/*` directories under `root`.
    pub fn discover(root: &Path) -> Self {
        let mut found: BTreeMap<String, String> = BTreeMap::new();
        for parent in DISCOVERY_PARENTS {
            let dir = root.join(parent);
            let Ok(entries) = fs::read_dir(&dir) else {
                continue;
            };
            for entry in entries.flatten() {
                if !entry.path().is_dir() {
                    continue;
                }
                let name = entry.file_name().to_string_lossy().to_string();
                if name.starts_with('.') {
                    continue;
                }
                found.insert(format!("{}/{}", parent, name), name);
            }
        }
        Self::from_pairs(found)
    }

    /// Registered `(prefix, module)` pairs, longest prefix first.
    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    /// Longest registered prefix owning `file`, matched at a path-component
    /// boundary, or [`UNKNOWN_MODULE`].
    pub fn attribute(&self, file: &str) -> String {
        let file = file.trim_start_matches("./");
        for (prefix, module) in &self.entries {
            if prefix.is_empty() {
                return module.clone();
            }
            if let Some(rest) = file.strip_prefix(prefix.as_str()) {
                if rest.is_empty() || rest.starts_with('/') {
                    return module.clone();
                }
            }
        }
        UNKNOWN_MODULE.to_string()
    }
}

fn normalize_prefix(p: &str) -> String {
    let p = p.replace('\\', "/");
    let p = p.trim_start_matches("./").trim_matches('/');
    if p == "." {
        String::new()
    } else {
        p.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_longest_prefix_wins() {
        let reg = ModuleRegistry::from_pairs([
            ("packages", "shared"),
            ("packages/module-kb/", "module-kb"),
        ]);
        assert_eq!(reg.attribute("packages/module-kb/backend/x.py"), "module-kb");
        assert_eq!(reg.attribute("packages/other/x.py"), "shared");
        assert_eq!(reg.attribute("apps/web/x.ts"), UNKNOWN_MODULE);
    }

    #[test]
    fn test_prefix_matches_only_at_component_boundary() {
        let reg = ModuleRegistry::from_pairs([("packages/module-kb", "module-kb")]);
        assert_eq!(reg.attribute("packages/module-kb-extra/a.ts"), UNKNOWN_MODULE);
        assert_eq!(reg.attribute("packages/module-kb"), "module-kb");
    }

    #[test]
    fn test_single_registry_owns_everything() {
        let reg = ModuleRegistry::single("module-chat");
        assert_eq!(reg.attribute("backend/lambdas/a.py"), "module-chat");
        assert_eq!(reg.attribute("."), "module-chat");
    }

    #[test]
    fn test_discover_packages_and_modules() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("packages/module-chat/backend")).unwrap();
        fs::create_dir_all(root.join("modules/module-kb")).unwrap();
        fs::create_dir_all(root.join("packages/.cache")).unwrap();
        fs::write(root.join("packages/README.md"), "x").unwrap();
        let reg = ModuleRegistry::discover(root);
        assert_eq!(reg.attribute("packages/module-chat/backend/a.py"), "module-chat");
        assert_eq!(reg.attribute("modules/module-kb/x"), "module-kb");
        assert_eq!(reg.entries().len(), 2);
        assert_eq!(reg.attribute("packages/.cache/x"), "unknown");
    }
}

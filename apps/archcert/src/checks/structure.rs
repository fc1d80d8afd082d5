//! Required directory layout per module and at the project root.

use crate::config::CheckSettings;
use crate::models::{Category, Issue, Severity};
use crate::validator::{TargetKind, ValidationContext, Validator};
use std::path::Path;

pub struct StructureValidator {
    module_dirs: Vec<String>,
    project_dirs: Vec<String>,
}

impl StructureValidator {
    pub fn new(settings: &CheckSettings) -> Self {
        Self {
            module_dirs: settings.module_dirs.clone(),
            project_dirs: settings.project_dirs.clone(),
        }
    }

    fn check_module(&self, ctx: &ValidationContext, module: &str, prefix: &str, out: &mut Vec<Issue>) {
        let base = if prefix.is_empty() {
            ctx.root.clone()
        } else {
            ctx.root.join(prefix)
        };
        for dir in &self.module_dirs {
            if base.join(dir).is_dir() {
                continue;
            }
            let rel = join_rel(prefix, dir);
            out.push(
                ctx.issue(
                    Category::Structure,
                    rel.clone(),
                    Severity::High,
                    format!("module `{}` is missing required directory `{}/`", module, dir),
                )
                .with_suggestion(format!("create `{}/`", rel)),
            );
        }
    }
}

impl Validator for StructureValidator {
    fn name(&self) -> &str {
        "structure"
    }

    fn description(&self) -> &str {
        "required module and project directories exist"
    }

    fn validate(&self, ctx: &ValidationContext) -> anyhow::Result<Vec<Issue>> {
        let mut issues = Vec::new();
        match &ctx.target {
            TargetKind::Module { name } => self.check_module(ctx, name, "", &mut issues),
            TargetKind::Project => {
                for dir in &self.project_dirs {
                    if !ctx.root.join(dir).is_dir() {
                        issues.push(ctx.issue(
                            Category::Structure,
                            dir.trim_end_matches('/'),
                            Severity::High,
                            format!("project is missing required directory `{}/`", dir.trim_end_matches('/')),
                        ));
                    }
                }
                let modules: Vec<(String, String)> = ctx
                    .registry
                    .entries()
                    .iter()
                    .filter(|(prefix, _)| !prefix.is_empty() && ctx.root.join(prefix).is_dir())
                    .cloned()
                    .collect();
                if modules.is_empty() {
                    let name = ctx
                        .root
                        .file_name()
                        .map(|n| n.to_string_lossy().to_string())
                        .unwrap_or_else(|| ".".to_string());
                    self.check_module(ctx, &name, "", &mut issues);
                } else {
                    // registry order is longest-prefix first; report in path order
                    let mut modules = modules;
                    modules.sort();
                    for (prefix, module) in &modules {
                        self.check_module(ctx, module, prefix, &mut issues);
                    }
                }
            }
        }
        Ok(issues)
    }
}

fn join_rel(prefix: &str, dir: &str) -> String {
    let dir = dir.trim_end_matches('/');
    if prefix.is_empty() {
        dir.to_string()
    } else {
        Path::new(prefix).join(dir).to_string_lossy().replace('\\', "/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ModuleRegistry;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_project_modules_missing_dirs() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("packages/module-chat/backend")).unwrap();
        fs::create_dir_all(root.join("packages/module-chat/frontend")).unwrap();
        fs::create_dir_all(root.join("packages/module-kb/backend")).unwrap();

        let ctx = ValidationContext::new(root, TargetKind::Project, ModuleRegistry::discover(root));
        let v = StructureValidator::new(&CheckSettings::default());
        let issues = v.validate(&ctx).unwrap();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].module, "module-kb");
        assert_eq!(issues[0].file, "packages/module-kb/frontend");
        assert_eq!(issues[0].severity, Severity::High);
    }

    #[test]
    fn test_single_module_and_project_dirs() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("frontend")).unwrap();
        let settings = CheckSettings {
            project_dirs: vec!["infra".into()],
            ..CheckSettings::default()
        };
        let v = StructureValidator::new(&settings);

        let ctx = ValidationContext::new(
            root,
            TargetKind::Module { name: "module-ws".into() },
            ModuleRegistry::single("module-ws"),
        );
        let issues = v.validate(&ctx).unwrap();
        assert_eq!(issues.len(), 1);
        assert!(issues[0].message.contains("`backend/`"));
        assert_eq!(issues[0].module, "module-ws");

        let ctx = ValidationContext::new(root, TargetKind::Project, ModuleRegistry::default());
        let issues = v.validate(&ctx).unwrap();
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].file, "infra");
    }
}

//! Cross-checks frontend API calls against backend route declarations.
//!
//! | finding                 | severity | category      |
//! |-------------------------|----------|---------------|
//! | parameter name mismatch | medium   | Naming        |
//! | call with no route      | high     | RouteMatching |
//! | ambiguous call          | medium   | RouteMatching |
//! | duplicate declaration   | medium   | RouteMatching |
//! | orphaned route          | low      | RouteMatching |
//! | handler without routes  | low      | RouteMatching |
//! | malformed route or URL  | low      | RouteMatching |

use super::read_source;
use crate::config::RouteSettings;
use crate::error::ConfigError;
use crate::models::route::{ApiCall, MatchOutcome, RouteDeclaration};
use crate::models::{Category, Issue, Severity};
use crate::routes::backend::{extract_routes, ExtractionGap};
use crate::routes::frontend::extract_calls;
use crate::routes::matcher::{trace, TraceOutcome};
use crate::utils;
use crate::validator::{ValidationContext, Validator};
use glob::Pattern;
use tracing::{debug, warn};

pub struct ApiTracer {
    backend: Vec<Pattern>,
    frontend: Vec<Pattern>,
    exclude_prefixes: Vec<String>,
    exempt_scopes: Vec<String>,
}

impl ApiTracer {
    pub fn new(settings: &RouteSettings) -> Result<Self, ConfigError> {
        Ok(Self {
            backend: utils::compile_globs(&settings.backend)?,
            frontend: utils::compile_globs(&settings.frontend)?,
            exclude_prefixes: settings.exclude_prefixes.clone(),
            exempt_scopes: settings.orphan_exempt_scopes.clone(),
        })
    }

    /// Source files for `patterns`, minus test and fixture paths, as
    /// `(relative path, text)`. Unreadable files become gaps.
    fn sources(
        &self,
        ctx: &ValidationContext,
        patterns: &[Pattern],
        issues: &mut Vec<Issue>,
    ) -> Vec<(String, String)> {
        let mut out = Vec::new();
        for path in utils::collect_files(&ctx.root, patterns) {
            let rel = ctx.rel(&path);
            if utils::has_excluded_prefix(&rel, &self.exclude_prefixes) {
                continue;
            }
            match read_source(&path) {
                Ok(text) => out.push((rel, text)),
                Err(e) => {
                    warn!(file = %rel, error = %e, "skipping unreadable source");
                    issues.push(ctx.issue(
                        Category::RouteMatching,
                        rel,
                        Severity::Low,
                        format!("source could not be read for route tracing: {:#}", e),
                    ));
                }
            }
        }
        out
    }
}

fn gap_issue(ctx: &ValidationContext, file: &str, gap: &ExtractionGap, what: &str) -> Issue {
    warn!(file = %file, line = gap.line, "{}: {}", what, gap.message);
    ctx.issue(
        Category::RouteMatching,
        file,
        Severity::Low,
        format!("{}: {}", what, gap.message),
    )
    .at_line(gap.line)
}

fn call_issue(ctx: &ValidationContext, call: &ApiCall, severity: Severity, category: Category, message: String) -> Issue {
    ctx.issue(category, call.source_file.as_str(), severity, message)
        .at_line(call.source_line)
}

fn route_issue(ctx: &ValidationContext, route: &RouteDeclaration, severity: Severity, message: String) -> Issue {
    ctx.issue(Category::RouteMatching, route.source_file.as_str(), severity, message)
        .at_line(route.source_line)
}

/// Turn a trace into issues: call findings in call order, then duplicates,
/// then orphans.
pub fn trace_issues(ctx: &ValidationContext, outcome: &TraceOutcome) -> Vec<Issue> {
    let mut issues = Vec::new();
    for result in &outcome.results {
        let call = &result.call;
        match result.outcome {
            MatchOutcome::Matched => {
                let Some(route) = result.matched_route.as_ref() else {
                    continue;
                };
                for mm in &result.parameter_name_mismatches {
                    issues.push(
                        call_issue(
                            ctx,
                            call,
                            Severity::Medium,
                            Category::Naming,
                            format!(
                                "path parameter `{}` in call `{}` is declared as `{}` by route `{}`",
                                mm.call_param_name,
                                call.label(),
                                mm.route_param_name,
                                route.label()
                            ),
                        )
                        .with_suggestion(format!(
                            "use `{}` in the client or rename the parameter in {}:{}",
                            mm.route_param_name, route.source_file, route.source_line
                        )),
                    );
                }
            }
            MatchOutcome::Unmatched => issues.push(
                call_issue(
                    ctx,
                    call,
                    Severity::High,
                    Category::RouteMatching,
                    format!("no backend route declared for `{}`", call.label()),
                )
                .with_suggestion("declare the route in the handler's Routes block or fix the call path"),
            ),
            MatchOutcome::Ambiguous => {
                let candidates: Vec<String> = result
                    .candidates
                    .iter()
                    .map(|r| format!("`{}`", r.label()))
                    .collect();
                issues.push(
                    call_issue(
                        ctx,
                        call,
                        Severity::Medium,
                        Category::RouteMatching,
                        format!(
                            "call `{}` matches {} equally specific routes: {}",
                            call.label(),
                            candidates.len(),
                            candidates.join(", ")
                        ),
                    )
                    .with_suggestion("make one route more specific with a literal segment"),
                );
            }
        }
    }
    for dup in &outcome.duplicates {
        issues.push(route_issue(
            ctx,
            &dup.route,
            Severity::Medium,
            format!(
                "duplicate route declaration `{}` (first declared as `{}` at {}:{})",
                dup.route.label(),
                dup.first.label(),
                dup.first.source_file,
                dup.first.source_line
            ),
        ));
    }
    for route in &outcome.orphaned {
        issues.push(
            route_issue(
                ctx,
                route,
                Severity::Low,
                format!("route `{}` is never called by the frontend", route.label()),
            )
            .with_suggestion("remove the route or list its scope in routes.orphan_exempt_scopes"),
        );
    }
    issues
}

impl Validator for ApiTracer {
    fn name(&self) -> &str {
        "api-tracer"
    }

    fn description(&self) -> &str {
        "frontend API calls resolve to documented backend routes"
    }

    fn validate(&self, ctx: &ValidationContext) -> anyhow::Result<Vec<Issue>> {
        let mut issues = Vec::new();

        let mut routes = Vec::new();
        for (rel, text) in self.sources(ctx, &self.backend, &mut issues) {
            let ex = extract_routes(&text, &rel);
            for gap in &ex.gaps {
                issues.push(gap_issue(ctx, &rel, gap, "malformed route declaration"));
            }
            if let (Some(line), true) = (ex.dispatch_line, ex.routes.is_empty()) {
                issues.push(
                    ctx.issue(
                        Category::RouteMatching,
                        rel.as_str(),
                        Severity::Low,
                        "handler declares no routes",
                    )
                    .at_line(line)
                    .with_suggestion("document the handler's endpoints in a `Routes:` block above the dispatch function"),
                );
            }
            routes.extend(ex.routes);
        }

        let mut calls = Vec::new();
        for (rel, text) in self.sources(ctx, &self.frontend, &mut issues) {
            let ex = extract_calls(&text, &rel);
            for gap in &ex.gaps {
                issues.push(gap_issue(ctx, &rel, gap, "unparseable API call"));
            }
            calls.extend(ex.calls);
        }

        let outcome = trace(&routes, &calls, &self.exempt_scopes);
        debug!(
            routes = routes.len(),
            calls = calls.len(),
            orphaned = outcome.orphaned.len(),
            "route trace complete"
        );
        issues.extend(trace_issues(ctx, &outcome));
        Ok(issues)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ModuleRegistry;
    use crate::validator::TargetKind;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    fn write(root: &Path, rel: &str, text: &str) {
        let p = root.join(rel);
        fs::create_dir_all(p.parent().unwrap()).unwrap();
        fs::write(p, text).unwrap();
    }

    const CHAT_HANDLER: &str = r#""""
Chat sessions.

Routes - System Admin:
- GET /admin/sys/chat/sessions/{id}

Routes - Data:
- POST /workspaces/{wsId}/eval
- GET /ws/{wsId}

Routes - Stripe Webhook:
- POST /hooks/stripe
"""

def lambda_handler(event, context):
    return route(event)
"#;

    const CLIENT: &str = r#"
export const getSession = (sessionId: string) =>
  api.get(`/admin/sys/chat/sessions/${sessionId}`);

export const getWorkspace = (workspaceId: string) => api.get(`/ws/${workspaceId}`);

export async function completeDocument(kbId: string, docId: string) {
  return fetch(`${API_BASE}/admin/org/kb/${kbId}/documents/${docId}/complete`, { method: "DELETE" });
}
"#;

    fn run(root: &Path) -> Vec<Issue> {
        let ctx = ValidationContext::new(
            root,
            TargetKind::Project,
            ModuleRegistry::from_pairs([("packages/module-chat", "module-chat")]),
        );
        ApiTracer::new(&RouteSettings::default())
            .unwrap()
            .validate(&ctx)
            .unwrap()
    }

    #[test]
    fn test_trace_scenarios() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        write(root, "packages/module-chat/backend/lambdas/chat/lambda_function.py", CHAT_HANDLER);
        write(root, "packages/module-chat/frontend/lib/api.ts", CLIENT);
        write(
            root,
            "packages/module-chat/frontend/__tests__/api.test.ts",
            "api.get('/not/declared');",
        );

        let issues = run(root);
        let summary: Vec<(Category, Severity, &str)> = issues
            .iter()
            .map(|i| (i.category, i.severity, i.file.as_str()))
            .collect();
        assert_eq!(
            summary,
            vec![
                (Category::Naming, Severity::Medium, "packages/module-chat/frontend/lib/api.ts"),
                (Category::Naming, Severity::Medium, "packages/module-chat/frontend/lib/api.ts"),
                (Category::RouteMatching, Severity::High, "packages/module-chat/frontend/lib/api.ts"),
                (
                    Category::RouteMatching,
                    Severity::Low,
                    "packages/module-chat/backend/lambdas/chat/lambda_function.py"
                ),
            ]
        );
        assert!(issues[0].message.contains("`sessionId`"));
        assert!(issues[0].message.contains("`id`"));
        assert_eq!(issues[0].line, Some(3));
        assert!(issues[1].message.contains("`workspaceId`"));
        assert!(issues[2]
            .message
            .contains("DELETE /admin/org/kb/{kbId}/documents/{docId}/complete"));
        assert!(issues[3].message.contains("POST /workspaces/{wsId}/eval"));
        assert!(issues.iter().all(|i| i.module == "module-chat"));
    }

    #[test]
    fn test_comments_never_produce_route_findings() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        write(
            root,
            "packages/module-chat/backend/lambdas/data/lambda_function.py",
            "# Serves the /ws/* endpoints\n\"\"\"\nGET requests are cached.\n\nRoutes - Data:\n- GET /ws/{wsId}\n\"\"\"\ndef lambda_handler(event, context):\n    pass\n",
        );
        write(
            root,
            "packages/module-chat/frontend/lib/api.ts",
            "// legacy: api.get('/legacy/sessions')\n/* old: client.delete(`/ws/${wsId}`) */\nexport const load = (wsId: string) => api.get(`/ws/${wsId}`);\n",
        );

        assert!(run(root).is_empty());
    }

    #[test]
    fn test_handler_without_routes_and_duplicates() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        write(root, "backend/empty/handler.py", "def handler(event, context):\n    return None\n");
        write(
            root,
            "backend/dup/handler.ts",
            "/**\n * Routes - Webhook:\n * POST /hooks/a\n * POST /hooks/a/\n */\nexport const handler = async () => {};\n",
        );

        let issues = run(root);
        // extraction findings come first, trace findings after
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].file, "backend/empty/handler.py");
        assert_eq!(issues[0].message, "handler declares no routes");
        assert_eq!(issues[0].line, Some(1));
        assert_eq!(issues[1].file, "backend/dup/handler.ts");
        assert!(issues[1].message.starts_with("duplicate route declaration"));
        assert_eq!(issues[1].line, Some(4));
    }
}

//! Reconciles frontend calls against backend route declarations.

use crate::models::route::{
    ApiCall, HttpMethod, MatchOutcome, ParamMismatch, RouteDeclaration, RouteMatchResult, Segment,
};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
/// A declaration repeating the method and shape of an earlier one.
pub struct Duplicate {
    pub route: RouteDeclaration,
    pub first: RouteDeclaration,
}

#[derive(Debug, Clone, Default)]
pub struct TraceOutcome {
    /// One result per call, in call order.
    pub results: Vec<RouteMatchResult>,
    /// Declarations no call exercised, excluding exempt scopes.
    pub orphaned: Vec<RouteDeclaration>,
    pub duplicates: Vec<Duplicate>,
}

/// Method and segment count agree, every route literal equals the call's
/// segment, and call parameters only line up with route parameters.
pub fn structurally_matches(route: &RouteDeclaration, call: &ApiCall) -> bool {
    if route.method != call.method || route.path_template.len() != call.path_expression.len() {
        return false;
    }
    route
        .path_template
        .segments
        .iter()
        .zip(&call.path_expression.segments)
        .all(|(r, c)| match (r, c) {
            (Segment::Param(_), _) => true,
            (Segment::Literal(a), Segment::Literal(b)) => a == b,
            (Segment::Literal(_), Segment::Param(_)) => false,
        })
}

/// Parameter names that differ at the same position.
pub fn param_mismatches(route: &RouteDeclaration, call: &ApiCall) -> Vec<ParamMismatch> {
    route
        .path_template
        .segments
        .iter()
        .zip(&call.path_expression.segments)
        .enumerate()
        .filter_map(|(position, (r, c))| match (r, c) {
            (Segment::Param(route_name), Segment::Param(call_name)) if route_name != call_name => {
                Some(ParamMismatch {
                    position,
                    call_param_name: call_name.clone(),
                    route_param_name: route_name.clone(),
                })
            }
            _ => None,
        })
        .collect()
}

/// Reconcile one call against `routes`.
pub fn match_call(call: &ApiCall, routes: &[RouteDeclaration]) -> RouteMatchResult {
    let top = top_candidates(call, routes);
    build_result(call, routes, &top)
}

/// Match every call, then collect orphaned and duplicate declarations.
///
/// A declaration whose scope equals an exempt scope, or contains it as a
/// dash-separated token (`webhook` exempts `stripe-webhook`), is never
/// reported as orphaned.
pub fn trace(routes: &[RouteDeclaration], calls: &[ApiCall], exempt_scopes: &[String]) -> TraceOutcome {
    let twins = shape_groups(routes);
    let mut exercised = vec![false; routes.len()];
    let mut results = Vec::with_capacity(calls.len());

    for call in calls {
        let top = top_candidates(call, routes);
        let result = build_result(call, routes, &top);
        if result.outcome != MatchOutcome::Unmatched {
            for idx in &top {
                for twin in &twins[*idx] {
                    exercised[*twin] = true;
                }
            }
        }
        results.push(result);
    }

    let orphaned = routes
        .iter()
        .zip(&exercised)
        .filter(|(route, used)| !**used && !is_exempt_scope(route.scope.as_deref(), exempt_scopes))
        .map(|(route, _)| route.clone())
        .collect();

    TraceOutcome {
        results,
        orphaned,
        duplicates: find_duplicates(routes),
    }
}

pub fn is_exempt_scope(scope: Option<&str>, exempt: &[String]) -> bool {
    let Some(scope) = scope else {
        return false;
    };
    exempt.iter().any(|e| {
        let e = e.trim().to_ascii_lowercase();
        !e.is_empty() && (scope == e || scope.split('-').any(|token| token == e))
    })
}

/// Later declarations sharing method and shape with an earlier one.
pub fn find_duplicates(routes: &[RouteDeclaration]) -> Vec<Duplicate> {
    let mut first_seen: HashMap<(HttpMethod, String), usize> = HashMap::new();
    let mut out = Vec::new();
    for (idx, route) in routes.iter().enumerate() {
        let key = (route.method, route.path_template.shape());
        match first_seen.get(&key) {
            Some(first) => out.push(Duplicate {
                route: route.clone(),
                first: routes[*first].clone(),
            }),
            None => {
                first_seen.insert(key, idx);
            }
        }
    }
    out
}

/// Indices of the most specific structural matches, one per distinct shape.
fn top_candidates(call: &ApiCall, routes: &[RouteDeclaration]) -> Vec<usize> {
    let mut best = 0usize;
    let mut top: Vec<usize> = Vec::new();
    let mut shapes: Vec<String> = Vec::new();
    for (idx, route) in routes.iter().enumerate() {
        if !structurally_matches(route, call) {
            continue;
        }
        let specificity = route.path_template.literal_count();
        if top.is_empty() || specificity > best {
            best = specificity;
            top.clear();
            shapes.clear();
        } else if specificity < best {
            continue;
        }
        let shape = route.path_template.shape();
        if !shapes.contains(&shape) {
            shapes.push(shape);
            top.push(idx);
        }
    }
    top
}

fn build_result(call: &ApiCall, routes: &[RouteDeclaration], top: &[usize]) -> RouteMatchResult {
    match top {
        [] => RouteMatchResult {
            call: call.clone(),
            outcome: MatchOutcome::Unmatched,
            matched: false,
            matched_route: None,
            parameter_name_mismatches: Vec::new(),
            candidates: Vec::new(),
        },
        [only] => {
            let route = &routes[*only];
            RouteMatchResult {
                call: call.clone(),
                outcome: MatchOutcome::Matched,
                matched: true,
                matched_route: Some(route.clone()),
                parameter_name_mismatches: param_mismatches(route, call),
                candidates: Vec::new(),
            }
        }
        many => RouteMatchResult {
            call: call.clone(),
            outcome: MatchOutcome::Ambiguous,
            matched: false,
            matched_route: None,
            parameter_name_mismatches: Vec::new(),
            candidates: many.iter().map(|i| routes[*i].clone()).collect(),
        },
    }
}

/// For each route, the indices of every route with the same method and shape.
fn shape_groups(routes: &[RouteDeclaration]) -> Vec<Vec<usize>> {
    let mut by_key: HashMap<(HttpMethod, String), Vec<usize>> = HashMap::new();
    for (idx, route) in routes.iter().enumerate() {
        by_key
            .entry((route.method, route.path_template.shape()))
            .or_default()
            .push(idx);
    }
    routes
        .iter()
        .map(|r| by_key[&(r.method, r.path_template.shape())].clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::path::{parse_call_path, parse_route_path};

    fn route(method: HttpMethod, path: &str, scope: Option<&str>) -> RouteDeclaration {
        RouteDeclaration {
            method,
            path_template: parse_route_path(path).unwrap(),
            scope: scope.map(str::to_string),
            source_file: "backend/h.py".into(),
            source_line: 1,
        }
    }

    fn call(method: HttpMethod, path: &str) -> ApiCall {
        ApiCall {
            method,
            path_expression: parse_call_path(path).unwrap(),
            source_file: "frontend/api.ts".into(),
            source_line: 1,
        }
    }

    #[test]
    fn test_single_match_records_param_mismatch() {
        let routes = vec![route(HttpMethod::Get, "/admin/sys/chat/sessions/{id}", None)];
        let c = call(HttpMethod::Get, "/admin/sys/chat/sessions/${sessionId}");
        let r = match_call(&c, &routes);
        assert!(r.matched);
        assert_eq!(r.outcome, MatchOutcome::Matched);
        assert_eq!(
            r.parameter_name_mismatches,
            vec![ParamMismatch {
                position: 4,
                call_param_name: "sessionId".into(),
                route_param_name: "id".into(),
            }]
        );
    }

    #[test]
    fn test_literal_beats_param_and_method_must_agree() {
        let routes = vec![
            route(HttpMethod::Get, "/ws/{wsId}", None),
            route(HttpMethod::Get, "/ws/settings", None),
            route(HttpMethod::Post, "/ws/settings", None),
        ];
        let r = match_call(&call(HttpMethod::Get, "/ws/settings"), &routes);
        assert_eq!(r.matched_route.unwrap().path_template.to_string(), "/ws/settings");
        assert!(r.parameter_name_mismatches.is_empty());

        // a call parameter never satisfies a route literal
        let r = match_call(&call(HttpMethod::Get, "/ws/${workspaceId}"), &routes);
        assert_eq!(r.matched_route.unwrap().path_template.to_string(), "/ws/{wsId}");
        assert_eq!(r.parameter_name_mismatches.len(), 1);

        let r = match_call(&call(HttpMethod::Delete, "/ws/settings"), &routes);
        assert_eq!(r.outcome, MatchOutcome::Unmatched);
    }

    #[test]
    fn test_equal_specificity_is_ambiguous() {
        let routes = vec![
            route(HttpMethod::Get, "/items/{id}/x", None),
            route(HttpMethod::Get, "/items/all/{kind}", None),
        ];
        let outcome = trace(&routes, &[call(HttpMethod::Get, "/items/all/x")], &[]);
        let r = &outcome.results[0];
        assert_eq!(r.outcome, MatchOutcome::Ambiguous);
        assert!(!r.matched);
        assert!(r.matched_route.is_none());
        assert_eq!(r.candidates.len(), 2);
        assert!(outcome.orphaned.is_empty());
    }

    #[test]
    fn test_orphans_respect_exempt_scopes() {
        let routes = vec![
            route(HttpMethod::Post, "/workspaces/{wsId}/eval", Some("data")),
            route(HttpMethod::Post, "/hooks/stripe", Some("stripe-webhook")),
            route(HttpMethod::Get, "/health", Some("webhook")),
        ];
        let outcome = trace(&routes, &[], &["webhook".to_string()]);
        assert_eq!(outcome.orphaned.len(), 1);
        assert_eq!(outcome.orphaned[0].label(), "POST /workspaces/{wsId}/eval");
    }

    #[test]
    fn test_duplicates_do_not_make_calls_ambiguous() {
        let routes = vec![
            route(HttpMethod::Get, "/ws/{wsId}", None),
            route(HttpMethod::Get, "/ws/{id}", None),
        ];
        let outcome = trace(&routes, &[call(HttpMethod::Get, "/ws/${wsId}")], &[]);
        assert_eq!(outcome.results[0].outcome, MatchOutcome::Matched);
        assert!(outcome.orphaned.is_empty());
        assert_eq!(outcome.duplicates.len(), 1);
        assert_eq!(outcome.duplicates[0].route.path_template.to_string(), "/ws/{id}");
    }

    #[test]
    fn test_exempt_scope_tokens() {
        let exempt = vec!["webhook".to_string()];
        assert!(is_exempt_scope(Some("webhook"), &exempt));
        assert!(is_exempt_scope(Some("github-webhook"), &exempt));
        assert!(!is_exempt_scope(Some("webhooks"), &exempt));
        assert!(!is_exempt_scope(None, &exempt));
    }
}

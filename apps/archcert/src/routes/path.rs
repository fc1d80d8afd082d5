//! Path template parsing for declared routes and call-site URLs.

use crate::models::route::{PathTemplate, Segment};

/// Marker substituted for `${...}` interpolations before splitting on `/`.
const SENTINEL: char = '\u{0}';

/// Parse a declared route path such as `/ws/{wsId}/eval/`.
///
/// Only `{name}` segments become parameters. Query strings, fragments and
/// trailing slashes are dropped. Returns a message describing the problem
/// when the path is malformed.
pub fn parse_route_path(raw: &str) -> Result<PathTemplate, String> {
    let path = strip_query(raw.trim());
    if !path.starts_with('/') {
        return Err(format!("route path `{}` must start with `/`", raw.trim()));
    }
    let mut segments = Vec::new();
    for seg in path.split('/').filter(|s| !s.is_empty()) {
        if let Some(inner) = seg.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
            let name = inner.trim().trim_end_matches('+');
            if name.is_empty() {
                return Err(format!("route path `{}` has an empty parameter", raw.trim()));
            }
            if name.contains('{') || name.contains('}') {
                return Err(format!("route path `{}` has nested braces", raw.trim()));
            }
            segments.push(Segment::Param(name.to_string()));
        } else if seg.contains('{') || seg.contains('}') {
            return Err(format!(
                "route path `{}` has an unbalanced or partial parameter in `{}`",
                raw.trim(),
                seg
            ));
        } else {
            segments.push(Segment::Literal(seg.to_string()));
        }
    }
    Ok(PathTemplate::new(segments))
}

/// Parse a call-site path where interpolations are written `${expr}`.
///
/// A segment containing any interpolation becomes a parameter named after
/// the first interpolated variable. Returns `None` when the path does not
/// start with `/` or an interpolation is unterminated.
pub fn parse_call_path(raw: &str) -> Option<PathTemplate> {
    let (masked, names) = mask_interpolations(raw.trim())?;
    let path = strip_query(&masked);
    if !path.starts_with('/') {
        return None;
    }
    let mut segments = Vec::new();
    for seg in path.split('/').filter(|s| !s.is_empty()) {
        if seg.contains(SENTINEL) {
            let idx = seg
                .split(SENTINEL)
                .nth(1)
                .and_then(|n| n.parse::<usize>().ok())?;
            let name = names.get(idx)?.clone();
            segments.push(Segment::Param(name));
        } else {
            segments.push(Segment::Literal(seg.to_string()));
        }
    }
    Some(PathTemplate::new(segments))
}

/// Variable name used for an interpolated expression.
///
/// `sessionId` → `sessionId`, `params.sessionId` → `sessionId`,
/// `encodeURIComponent(doc.id)` → `id`.
pub fn param_name_from_expr(expr: &str) -> String {
    let mut e = expr.trim();
    // unwrap single-argument wrappers like encodeURIComponent(x) or String(x)
    while let Some(open) = e.find('(') {
        if !e.ends_with(')') {
            break;
        }
        let inner = &e[open + 1..e.len() - 1];
        if inner.trim().is_empty() {
            break;
        }
        e = inner.trim();
    }
    let chained = e.replace("?.", ".");
    let e = chained
        .split(['?', ':', '|', '&', ',', ' '])
        .next()
        .unwrap_or("");
    let last = e
        .rsplit('.')
        .map(|p| p.trim_matches(|c: char| !(c.is_alphanumeric() || c == '_' || c == '$')))
        .find(|p| !p.is_empty())
        .unwrap_or("");
    if last.is_empty() {
        "param".to_string()
    } else {
        last.to_string()
    }
}

fn strip_query(path: &str) -> &str {
    let end = path.find(['?', '#']).unwrap_or(path.len());
    &path[..end]
}

/// Replace each `${expr}` with `\0N\0` and return the parameter names in order.
fn mask_interpolations(raw: &str) -> Option<(String, Vec<String>)> {
    let mut out = String::with_capacity(raw.len());
    let mut names = Vec::new();
    let mut rest = raw;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = matching_brace(after)?;
        names.push(param_name_from_expr(&after[..end]));
        out.push(SENTINEL);
        out.push_str(&(names.len() - 1).to_string());
        out.push(SENTINEL);
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    Some((out, names))
}

/// Index of the `}` closing an interpolation body (brace depth starts at 1).
pub(crate) fn matching_brace(body: &str) -> Option<usize> {
    let mut depth = 1usize;
    for (i, c) in body.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

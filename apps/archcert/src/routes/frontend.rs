//! API call extraction from frontend client source.
//!
//! Recognised call sites:
//! - `client.get(url)`, `api.post<T>(url, body)`, `axios.delete(url)`
//! - helpers whose name ends with the method: `authenticatedGet(token, url)`
//! - `fetch(url, { method: "PATCH" })`, GET when no method option is given
//!
//! The URL may be a string, a template literal or a `+` concatenation. A
//! leading base (`${API_BASE}`, `BASE_URL + ...`, `https://host`) is dropped
//! and every interpolated value becomes a parameter named after its variable.
//! Calls inside `//` and `/* */` comments are ignored. A `fetch` whose
//! `method` option is not a string literal is reported as a gap.

use super::backend::ExtractionGap;
use super::path::{matching_brace, parse_call_path, param_name_from_expr};
use crate::models::route::{ApiCall, HttpMethod};
use crate::utils::line_of;
use regex::Regex;
use std::sync::OnceLock;

/// Upper bound on bytes scanned for one call's argument list.
const MAX_CALL_SPAN: usize = 8_000;
/// Only the first few arguments are considered as the URL.
const MAX_URL_ARG: usize = 3;

#[derive(Debug, Clone, Default)]
pub struct CallExtraction {
    pub calls: Vec<ApiCall>,
    pub gaps: Vec<ExtractionGap>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CallKind {
    Fetch,
    Method(HttpMethod),
}

fn callee_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?P<callee>[A-Za-z_$][\w$]*(?:\s*\??\.\s*[A-Za-z_$][\w$]*)*)\s*(?:<[^()<>]*(?:<[^()<>]*>[^()<>]*)*>)?\s*\(",
        )
        .expect("callee regex")
    })
}

fn method_option_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"\bmethod\s*:\s*['"`](?P<m>[A-Za-z]+)['"`]"#).expect("method option regex")
    })
}

/// A `method` key whose value is not a string literal: `{ method }`,
/// `method: verb`.
fn method_key_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?:^|[{,\s])method\s*[:,}]").expect("method key regex"))
}

/// Extract API calls from one frontend source file.
pub fn extract_calls(source: &str, file: &str) -> CallExtraction {
    let mut out = CallExtraction::default();
    let code = blank_comments(source);
    let source = code.as_str();
    for caps in callee_re().captures_iter(source) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        let callee = &caps["callee"];
        let last = callee
            .rsplit('.')
            .next()
            .unwrap_or(callee)
            .trim()
            .trim_end_matches('?');
        let Some(kind) = call_kind(last) else {
            continue;
        };
        let Some(args) = split_args(source, whole.end()) else {
            continue;
        };
        let line = line_of(source, whole.start());

        let mut url: Option<(usize, String)> = None;
        let mut malformed = false;
        for (idx, arg) in args.iter().take(MAX_URL_ARG).enumerate() {
            let Some(raw) = url_expression(arg) else {
                continue;
            };
            if parse_call_path(&raw).is_some() {
                url = Some((idx, raw));
                break;
            }
            malformed = true;
        }
        let Some((url_idx, raw)) = url else {
            if malformed {
                out.gaps.push(ExtractionGap {
                    line,
                    message: format!("could not parse the URL passed to `{}`", callee.trim()),
                });
            }
            continue;
        };

        let method = match kind {
            CallKind::Method(m) => m,
            CallKind::Fetch => {
                let opts = args[url_idx + 1..].join(",");
                match method_option_re().captures(&opts) {
                    Some(c) => match c["m"].parse::<HttpMethod>() {
                        Ok(m) => m,
                        // HEAD/OPTIONS and friends are not part of the route contract
                        Err(_) => continue,
                    },
                    None if method_key_re().is_match(&opts) => {
                        out.gaps.push(ExtractionGap {
                            line,
                            message: format!(
                                "could not resolve the HTTP method passed to `{}`",
                                callee.trim()
                            ),
                        });
                        continue;
                    }
                    None => HttpMethod::Get,
                }
            }
        };
        let Some(path_expression) = parse_call_path(&raw) else {
            continue;
        };
        out.calls.push(ApiCall {
            method,
            path_expression,
            source_file: file.to_string(),
            source_line: line,
        });
    }
    out
}

/// Replace `//` and `/* */` comments with spaces, keeping newlines so byte
/// offsets and line numbers are unchanged. String and template literals are
/// left alone.
fn blank_comments(source: &str) -> String {
    let bytes = source.as_bytes();
    let mut out = bytes.to_vec();
    fn blank(out: &mut [u8], from: usize, to: usize) {
        for b in &mut out[from..to] {
            if *b != b'\n' {
                *b = b' ';
            }
        }
    }
    let mut i = 0usize;
    while i < bytes.len() {
        match bytes[i] {
            b'\'' | b'"' => i = skip_quoted(bytes, i).unwrap_or(i + 1),
            b'`' => i = skip_template(bytes, i).unwrap_or(i + 1),
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                let end = source[i..].find('\n').map_or(bytes.len(), |n| i + n);
                blank(&mut out, i, end);
                i = end;
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                let end = source[i + 2..].find("*/").map_or(bytes.len(), |n| i + 2 + n + 2);
                blank(&mut out, i, end);
                i = end;
            }
            _ => i += 1,
        }
    }
    // comment spans start and end on ASCII bytes, so the result stays UTF-8
    String::from_utf8(out).unwrap_or_else(|_| source.to_string())
}

fn call_kind(name: &str) -> Option<CallKind> {
    if name == "fetch" {
        return Some(CallKind::Fetch);
    }
    if name.chars().all(|c| c.is_ascii_lowercase()) {
        return name.parse::<HttpMethod>().ok().map(CallKind::Method);
    }
    const SUFFIXES: &[(&str, HttpMethod)] = &[
        ("Get", HttpMethod::Get),
        ("Post", HttpMethod::Post),
        ("Put", HttpMethod::Put),
        ("Patch", HttpMethod::Patch),
        ("Delete", HttpMethod::Delete),
    ];
    for (suffix, method) in SUFFIXES {
        if let Some(prefix) = name.strip_suffix(suffix) {
            let boundary = prefix
                .chars()
                .last()
                .map(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
                .unwrap_or(false);
            if boundary {
                return Some(CallKind::Method(*method));
            }
        }
    }
    None
}

/// Split the argument list starting right after `(` at top-level commas.
/// `None` when the closing `)` is not found within [`MAX_CALL_SPAN`].
fn split_args(text: &str, start: usize) -> Option<Vec<&str>> {
    let bytes = text.as_bytes();
    let limit = start.saturating_add(MAX_CALL_SPAN).min(bytes.len());
    let mut depth = 0usize;
    let mut arg_start = start;
    let mut args = Vec::new();
    let mut i = start;
    while i < limit {
        let c = bytes[i];
        match c {
            b'\'' | b'"' => {
                i = skip_quoted(bytes, i)?;
                continue;
            }
            b'`' => {
                i = skip_template(bytes, i)?;
                continue;
            }
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => {
                if depth == 0 {
                    if c != b')' {
                        return None;
                    }
                    args.push(&text[arg_start..i]);
                    return Some(args);
                }
                depth -= 1;
            }
            b',' if depth == 0 => {
                args.push(&text[arg_start..i]);
                arg_start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// Index just past the string literal opening at `start`.
fn skip_quoted(bytes: &[u8], start: usize) -> Option<usize> {
    let quote = bytes[start];
    let mut j = start + 1;
    while j < bytes.len() {
        match bytes[j] {
            b'\\' => j += 2,
            b'\n' => return None,
            c if c == quote => return Some(j + 1),
            _ => j += 1,
        }
    }
    None
}

/// Index just past the template literal opening at `start`.
fn skip_template(bytes: &[u8], start: usize) -> Option<usize> {
    let mut j = start + 1;
    while j < bytes.len() {
        match bytes[j] {
            b'\\' => j += 2,
            b'`' => return Some(j + 1),
            b'$' if bytes.get(j + 1) == Some(&b'{') => j = skip_interpolation(bytes, j + 2)?,
            _ => j += 1,
        }
    }
    None
}

/// Index just past the `}` closing an interpolation whose body starts at `start`.
fn skip_interpolation(bytes: &[u8], start: usize) -> Option<usize> {
    let mut depth = 1usize;
    let mut j = start;
    while j < bytes.len() {
        match bytes[j] {
            b'\'' | b'"' => {
                j = skip_quoted(bytes, j)?;
                continue;
            }
            b'`' => {
                j = skip_template(bytes, j)?;
                continue;
            }
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(j + 1);
                }
            }
            _ => {}
        }
        j += 1;
    }
    None
}

/// Split an expression at top-level `+` operators.
fn split_concat(expr: &str) -> Option<Vec<&str>> {
    let bytes = expr.as_bytes();
    let mut depth = 0usize;
    let mut parts = Vec::new();
    let mut part_start = 0usize;
    let mut i = 0usize;
    while i < bytes.len() {
        match bytes[i] {
            b'\'' | b'"' => {
                i = skip_quoted(bytes, i)?;
                continue;
            }
            b'`' => {
                i = skip_template(bytes, i)?;
                continue;
            }
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => depth = depth.saturating_sub(1),
            b'+' if depth == 0 => {
                parts.push(&expr[part_start..i]);
                part_start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    parts.push(&expr[part_start..]);
    Some(parts)
}

/// Raw path (with `${name}` placeholders) of a URL argument, base removed.
fn url_expression(arg: &str) -> Option<String> {
    let arg = arg.trim();
    let terms = split_concat(arg)?;
    let mut raw = String::new();
    for term in terms {
        let t = term.trim();
        if t.len() >= 2
            && (t.starts_with('\'') || t.starts_with('"'))
            && t.ends_with(&t[..1])
        {
            raw.push_str(&t[1..t.len() - 1]);
        } else if t.len() >= 2 && t.starts_with('`') && t.ends_with('`') {
            raw.push_str(&t[1..t.len() - 1]);
        } else if is_value_expression(t) {
            raw.push_str("${");
            raw.push_str(&param_name_from_expr(t));
            raw.push('}');
        } else {
            return None;
        }
    }
    strip_base(&raw)
}

fn is_value_expression(t: &str) -> bool {
    let Some(first) = t.chars().next() else {
        return false;
    };
    (first.is_alphabetic() || first == '_' || first == '$')
        && !t.contains("=>")
        && !t.starts_with("function")
        && !t.starts_with("new ")
}

fn strip_base(raw: &str) -> Option<String> {
    let s = raw.trim();
    if let Some(rest) = s
        .strip_prefix("https://")
        .or_else(|| s.strip_prefix("http://"))
    {
        return Some(match rest.find('/') {
            Some(i) => rest[i..].to_string(),
            None => "/".to_string(),
        });
    }
    if let Some(body) = s.strip_prefix("${") {
        let end = matching_brace(body)?;
        let after = &body[end + 1..];
        return after.starts_with('/').then(|| after.to_string());
    }
    s.starts_with('/').then(|| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(src: &str) -> Vec<String> {
        extract_calls(src, "frontend/lib/api.ts")
            .calls
            .iter()
            .map(ApiCall::label)
            .collect()
    }

    #[test]
    fn test_template_literal_with_base_and_interpolation() {
        let src = "export async function getSession(sessionId: string) {\n  return fetch(`${API_BASE}/admin/sys/chat/sessions/${sessionId}`, { headers });\n}\n";
        let ex = extract_calls(src, "frontend/lib/api.ts");
        assert_eq!(ex.calls.len(), 1);
        assert_eq!(ex.calls[0].label(), "GET /admin/sys/chat/sessions/{sessionId}");
        assert_eq!(ex.calls[0].source_line, 2);
    }

    #[test]
    fn test_fetch_method_option() {
        let src = "await fetch(`${BASE}/admin/org/kb/${kbId}/documents/${docId}/complete`, {\n  method: 'DELETE',\n  headers,\n});";
        assert_eq!(labels(src), vec!["DELETE /admin/org/kb/{kbId}/documents/{docId}/complete"]);
        let head = "fetch('/health', { method: 'HEAD' })";
        assert!(labels(head).is_empty());
    }

    #[test]
    fn test_client_methods_and_helpers() {
        let src = r#"
const a = await api.get<Workspace>(`/ws/${workspaceId}`);
const b = await client.post('/workspaces/' + wsId + '/eval', body);
const c = await authenticatedPatch(token, `/ws/${ws.id}/members/${member.userId}`, payload);
const d = cache.get(key);
const e = await this.http.delete(`https://api.example.com/items/${encodeURIComponent(item.id)}?force=1`);
"#;
        assert_eq!(
            labels(src),
            vec![
                "GET /ws/{workspaceId}",
                "POST /workspaces/{wsId}/eval",
                "PATCH /ws/{id}/members/{userId}",
                "DELETE /items/{id}",
            ]
        );
    }

    #[test]
    fn test_unresolvable_urls_are_skipped() {
        let src = "fetch(url);\napi.get(`${base}${path}`);\nfetch(`${API}/x/${broken`);\n";
        let ex = extract_calls(src, "frontend/lib/api.ts");
        assert!(ex.calls.is_empty());
    }

    #[test]
    fn test_commented_out_calls_are_ignored() {
        let src = "// legacy: api.get('/legacy/sessions')\n/* old:\n   client.delete(`/ws/${id}`) */\nconst u = 'https://x.io/a'; // trailing\napi.get('/ws/live')\n";
        let ex = extract_calls(src, "frontend/lib/api.ts");
        assert_eq!(ex.calls.len(), 1);
        assert_eq!(ex.calls[0].label(), "GET /ws/live");
        assert_eq!(ex.calls[0].source_line, 5);
    }

    #[test]
    fn test_blank_comments_keeps_offsets() {
        let src = "a // é\n'//kept' /* x\ny */ b";
        let blanked = blank_comments(src);
        assert_eq!(blanked.len(), src.len());
        assert_eq!(blanked.lines().count(), src.lines().count());
        assert!(blanked.contains("'//kept'"));
        assert!(blanked.ends_with(" b"));
        assert!(!blanked.contains('x'));
    }

    #[test]
    fn test_non_literal_fetch_method_is_a_gap() {
        let src = "fetch(`/ws/${wsId}`, { method, body });\nfetch('/ws', { method: verb });\nfetch('/ws', { headers: { 'x-method': 'a' } });\n";
        let ex = extract_calls(src, "frontend/lib/api.ts");
        assert_eq!(ex.gaps.len(), 2);
        assert_eq!(ex.gaps[1].line, 2);
        assert_eq!(ex.calls.len(), 1);
        assert_eq!(ex.calls[0].label(), "GET /ws");
    }

    #[test]
    fn test_call_kind_boundaries() {
        assert_eq!(call_kind("get"), Some(CallKind::Method(HttpMethod::Get)));
        assert_eq!(call_kind("apiDelete"), Some(CallKind::Method(HttpMethod::Delete)));
        assert_eq!(call_kind("fetch"), Some(CallKind::Fetch));
        assert_eq!(call_kind("Get"), None);
        assert_eq!(call_kind("budget"), None);
        assert_eq!(call_kind("target"), None);
    }
}

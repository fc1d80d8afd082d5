//! Route extraction from backend handler documentation blocks.
//!
//! Handlers document their endpoints in the docstring or block comment
//! ahead of the dispatch function:
//!
//! ```text
//! """
//! Chat session handler
//!
//! Routes - System Admin:
//! - GET /admin/sys/chat/sessions/{id} - Fetch one session
//!
//! Routes - Data:
//! - POST /workspaces/{wsId}/eval
//! """
//! ```
//!
//! Extraction never fails. Malformed route lines are returned as gaps so the
//! caller can report them.

use super::path::parse_route_path;
use crate::models::route::{HttpMethod, RouteDeclaration};
use crate::utils::line_of;
use regex::Regex;
use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq, Eq)]
/// A recognised-but-unusable fragment of a documentation block.
pub struct ExtractionGap {
    pub line: usize,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct RouteExtraction {
    pub routes: Vec<RouteDeclaration>,
    pub gaps: Vec<ExtractionGap>,
    /// Line of the handler's dispatch definition, when one was found.
    pub dispatch_line: Option<usize>,
}

fn dispatch_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?m)^[ \t]*(?:async[ \t]+def[ \t]+(?:lambda_)?handler[ \t]*\(|def[ \t]+(?:lambda_)?handler[ \t]*\(|export[ \t]+(?:const|let|async[ \t]+function|function)[ \t]+handler\b|(?:module\.)?exports\.handler[ \t]*=)",
        )
        .expect("dispatch regex")
    })
}

fn scope_header_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?i:routes?)\s*(?:[-–—]\s*(?P<scope>.+?))?\s*:\s*$").expect("scope regex")
    })
}

fn route_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:[-*•]\s+)?(?P<method>GET|POST|PUT|PATCH|DELETE)\s+(?P<path>\S+)")
            .expect("route regex")
    })
}

/// A documentation block: byte offset where its content starts, and the text.
struct DocBlock<'a> {
    start: usize,
    content: &'a str,
    c_style: bool,
}

/// Extract declared routes from one handler source file.
pub fn extract_routes(source: &str, file: &str) -> RouteExtraction {
    let mut out = RouteExtraction::default();
    let dispatch_at = dispatch_re().find(source).map(|m| m.start());
    out.dispatch_line = dispatch_at.map(|at| line_of(source, at));

    let (blocks, unterminated) = doc_blocks(source, SourceLang::of(file));
    if let Some(at) = unterminated {
        out.gaps.push(ExtractionGap {
            line: line_of(source, at),
            message: "unterminated documentation block".to_string(),
        });
    }

    for block in blocks {
        if let Some(limit) = dispatch_at {
            if block.start > limit {
                break;
            }
        }
        let first_line = line_of(source, block.start);
        let mut scope: Option<String> = None;
        for (idx, raw_line) in block.content.lines().enumerate() {
            let line_no = first_line + idx;
            let mut line = raw_line.trim();
            if block.c_style {
                line = line.trim_start_matches('*').trim();
            }
            if line.is_empty() {
                continue;
            }
            if let Some(caps) = scope_header_re().captures(line) {
                scope = caps.name("scope").map(|m| slugify(m.as_str())).filter(|s| !s.is_empty());
                continue;
            }
            let Some(caps) = route_line_re().captures(line) else {
                continue;
            };
            let Ok(method) = caps["method"].parse::<HttpMethod>() else {
                continue;
            };
            // prose such as "GET requests are cached"
            if !looks_like_path(&caps["path"]) {
                continue;
            }
            match parse_route_path(&caps["path"]) {
                Ok(path_template) => out.routes.push(RouteDeclaration {
                    method,
                    path_template,
                    scope: scope.clone(),
                    source_file: file.to_string(),
                    source_line: line_no,
                }),
                Err(message) => out.gaps.push(ExtractionGap {
                    line: line_no,
                    message,
                }),
            }
        }
    }
    out
}

fn looks_like_path(token: &str) -> bool {
    token.contains('/') || token.contains('{')
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SourceLang {
    /// `"""` / `'''` docstrings, `#` line comments.
    Python,
    /// `/* */` block comments, `//` line comments, template literals.
    Script,
}

impl SourceLang {
    fn of(file: &str) -> Self {
        if file.ends_with(".py") || file.ends_with(".pyi") {
            SourceLang::Python
        } else {
            SourceLang::Script
        }
    }
}

/// Collect documentation blocks in source order, skipping line comments and
/// string literals. The second value is the offset of an unterminated
/// opener, if any.
fn doc_blocks(source: &str, lang: SourceLang) -> (Vec<DocBlock<'_>>, Option<usize>) {
    let bytes = source.as_bytes();
    let mut blocks = Vec::new();
    let mut i = 0usize;
    while i < bytes.len() {
        let rest = &bytes[i..];
        let opener = match (lang, bytes[i]) {
            (SourceLang::Python, b'#') => {
                i = end_of_line(source, i);
                continue;
            }
            (SourceLang::Python, b'"') if rest.starts_with(b"\"\"\"") => Some(("\"\"\"", "\"\"\"", false)),
            (SourceLang::Python, b'\'') if rest.starts_with(b"'''") => Some(("'''", "'''", false)),
            (SourceLang::Script, b'/') if rest.starts_with(b"//") => {
                i = end_of_line(source, i);
                continue;
            }
            (SourceLang::Script, b'/') if rest.starts_with(b"/*") => Some(("/*", "*/", true)),
            (SourceLang::Script, b'`') => {
                i = skip_string(bytes, i, true);
                continue;
            }
            (_, b'"' | b'\'') => {
                i = skip_string(bytes, i, false);
                continue;
            }
            _ => None,
        };
        let Some((open, close, c_style)) = opener else {
            i += 1;
            continue;
        };
        let content_start = i + open.len();
        match source[content_start..].find(close) {
            Some(rel_end) => {
                blocks.push(DocBlock {
                    start: content_start,
                    content: &source[content_start..content_start + rel_end],
                    c_style,
                });
                i = content_start + rel_end + close.len();
            }
            None => return (blocks, Some(i)),
        }
    }
    (blocks, None)
}

fn end_of_line(source: &str, from: usize) -> usize {
    source[from..].find('\n').map_or(source.len(), |n| from + n)
}

/// Index just past the string literal opening at `start`. Single-line
/// strings end at the newline when unterminated.
fn skip_string(bytes: &[u8], start: usize, multiline: bool) -> usize {
    let quote = bytes[start];
    let mut j = start + 1;
    while j < bytes.len() {
        match bytes[j] {
            b'\\' => j += 2,
            b'\n' if !multiline => return j,
            c if c == quote => return j + 1,
            _ => j += 1,
        }
    }
    bytes.len()
}

/// `System Admin` → `system-admin`.
pub fn slugify(text: &str) -> String {
    let mut out = String::new();
    for c in text.trim().chars() {
        if c.is_alphanumeric() {
            out.extend(c.to_lowercase());
        } else if !out.ends_with('-') && !out.is_empty() {
            out.push('-');
        }
    }
    out.trim_end_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::route::Segment;

    const HANDLER: &str = r#"import json

"""
Chat sessions handler.

Routes - System Admin:
- GET /admin/sys/chat/sessions - List sessions
- GET /admin/sys/chat/sessions/{id} - Get one session

Routes - Data:
- POST /workspaces/{wsId}/eval/
- GET /workspaces/{wsId}/eval
"""


def lambda_handler(event, context):
    """
    Routes:
    - DELETE /ignored/after/dispatch
    """
    return dispatch(event)
"#;

    #[test]
    fn test_extracts_routes_with_scopes_and_lines() {
        let ex = extract_routes(HANDLER, "backend/lambdas/chat/lambda_function.py");
        assert_eq!(ex.routes.len(), 4);
        assert_eq!(ex.routes[0].scope.as_deref(), Some("system-admin"));
        assert_eq!(ex.routes[1].path_template.to_string(), "/admin/sys/chat/sessions/{id}");
        assert_eq!(ex.routes[1].source_line, 8);
        assert_eq!(ex.routes[2].scope.as_deref(), Some("data"));
        assert_eq!(ex.routes[2].path_template.to_string(), "/workspaces/{wsId}/eval");
        assert_eq!(ex.routes[2].method, HttpMethod::Post);
        assert_eq!(ex.dispatch_line, Some(16));
        assert!(ex.gaps.is_empty());
    }

    #[test]
    fn test_jsdoc_block_and_bare_routes_header() {
        let src = "/**\n * Routes:\n * PATCH /ws/{wsId}/members/{userId}\n */\nexport const handler = async () => {};\n";
        let ex = extract_routes(src, "backend/h.ts");
        assert_eq!(ex.routes.len(), 1);
        assert_eq!(ex.routes[0].scope, None);
        assert_eq!(ex.routes[0].source_line, 3);
        assert_eq!(ex.routes[0].path_template.segments[3], Segment::Param("userId".into()));
    }

    #[test]
    fn test_malformed_lines_become_gaps_and_duplicates_are_kept() {
        let src = "\"\"\"\nRoutes:\n- GET admin/missing-slash\n- GET /x/{id\n- GET /dup\n- GET /dup\n\"\"\"\ndef handler(e, c):\n    pass\n";
        let ex = extract_routes(src, "backend/h.py");
        assert_eq!(ex.gaps.len(), 2);
        assert_eq!(ex.gaps[0].line, 3);
        assert_eq!(ex.routes.len(), 2);
    }

    #[test]
    fn test_unparseable_source_yields_empty() {
        let ex = extract_routes("def handler(e, c):\n    \"\"\"never closed\n", "backend/h.py");
        assert!(ex.routes.is_empty());
        assert_eq!(ex.gaps.len(), 1);
        assert_eq!(ex.dispatch_line, Some(1));

        let helper = extract_routes("def util():\n    return 1\n", "backend/common/util.py");
        assert!(helper.dispatch_line.is_none());
        assert!(helper.routes.is_empty());
    }

    #[test]
    fn test_prose_lowercase_methods_ignored() {
        let src = "\"\"\"\nget /x is documented elsewhere\nGETTING /y\n\"\"\"\n";
        let ex = extract_routes(src, "backend/h.py");
        assert!(ex.routes.is_empty());
        assert!(ex.gaps.is_empty());
    }

    #[test]
    fn test_method_prose_in_docstring_is_not_a_route() {
        let src = "\"\"\"\nGET requests are cached for 60s.\nDELETE is soft.\n\nRoutes:\n- GET /ws/{wsId}\n- POST ws/{wsId}\n\"\"\"\n";
        let ex = extract_routes(src, "backend/h.py");
        assert_eq!(ex.routes.len(), 1);
        // still path-shaped, so the missing slash is reported
        assert_eq!(ex.gaps.len(), 1);
        assert_eq!(ex.gaps[0].line, 7);
    }

    #[test]
    fn test_comment_openers_do_not_hide_docstring() {
        let src = "# Serves the /admin/* endpoints\nPATTERN = \"/api/*\"\n\"\"\"\nRoutes - Data:\n- GET /ws/{wsId}\n\"\"\"\ndef lambda_handler(event, context):\n    pass\n";
        let ex = extract_routes(src, "backend/lambdas/data/lambda_function.py");
        assert!(ex.gaps.is_empty());
        assert_eq!(ex.routes.len(), 1);
        assert_eq!(ex.routes[0].scope.as_deref(), Some("data"));
        assert_eq!(ex.routes[0].source_line, 5);
    }

    #[test]
    fn test_script_line_comments_and_strings_are_skipped() {
        let src = "// see docs/*.md\nconst GLOB = '/*';\nconst t = `\"\"\" not python`;\n/**\n * Routes:\n * DELETE /ws/{wsId}\n */\nexport const handler = async () => {};\n";
        let ex = extract_routes(src, "backend/h.ts");
        assert!(ex.gaps.is_empty());
        assert_eq!(ex.routes.len(), 1);
        assert_eq!(ex.routes[0].method, HttpMethod::Delete);
        assert_eq!(ex.routes[0].source_line, 6);
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("System Admin"), "system-admin");
        assert_eq!(slugify("  Org / Admin  "), "org-admin");
    }
}

//! Route and API call models used by the api tracer.
//!
//! Paths are kept as a sequence of [`Segment`]s so matching never has to
//! re-parse strings: a literal compares by text, a parameter matches any
//! value at its position.

use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
/// HTTP methods recognised in route declarations and call sites.
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "PATCH" => Ok(HttpMethod::Patch),
            "DELETE" => Ok(HttpMethod::Delete),
            other => Err(format!("unsupported HTTP method: {}", other)),
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
/// One path segment: fixed text or a named placeholder.
pub enum Segment {
    Literal(String),
    Param(String),
}

impl Segment {
    pub fn is_literal(&self) -> bool {
        matches!(self, Segment::Literal(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
/// An ordered list of segments. Root (`/`) is the empty template.
pub struct PathTemplate {
    pub segments: Vec<Segment>,
}

impl PathTemplate {
    pub fn new(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Number of literal segments; the specificity used to break ties.
    pub fn literal_count(&self) -> usize {
        self.segments.iter().filter(|s| s.is_literal()).count()
    }

    /// Rendering with parameter names erased, e.g. `/ws/{}/eval`.
    ///
    /// Two templates with the same shape are indistinguishable to a router.
    pub fn shape(&self) -> String {
        let mut out = String::new();
        for seg in &self.segments {
            out.push('/');
            match seg {
                Segment::Literal(text) => out.push_str(text),
                Segment::Param(_) => out.push_str("{}"),
            }
        }
        if out.is_empty() {
            out.push('/');
        }
        out
    }
}

impl fmt::Display for PathTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("/");
        }
        for seg in &self.segments {
            match seg {
                Segment::Literal(text) => write!(f, "/{}", text)?,
                Segment::Param(name) => write!(f, "/{{{}}}", name)?,
            }
        }
        Ok(())
    }
}

impl Serialize for PathTemplate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// A backend-documented endpoint.
pub struct RouteDeclaration {
    pub method: HttpMethod,
    pub path_template: PathTemplate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    pub source_file: String,
    pub source_line: usize,
}

impl RouteDeclaration {
    /// `METHOD /path/{param}` label used in messages.
    pub fn label(&self) -> String {
        format!("{} {}", self.method, self.path_template)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// A frontend-issued request found at a call site.
pub struct ApiCall {
    pub method: HttpMethod,
    pub path_expression: PathTemplate,
    pub source_file: String,
    pub source_line: usize,
}

impl ApiCall {
    pub fn label(&self) -> String {
        format!("{} {}", self.method, self.path_expression)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// A parameter whose name differs between a call and the route it resolves to.
pub struct ParamMismatch {
    /// Zero-based segment index.
    pub position: usize,
    pub call_param_name: String,
    pub route_param_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchOutcome {
    Matched,
    Unmatched,
    Ambiguous,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// Outcome of reconciling one call against the declared routes.
pub struct RouteMatchResult {
    pub call: ApiCall,
    pub outcome: MatchOutcome,
    pub matched: bool,
    pub matched_route: Option<RouteDeclaration>,
    pub parameter_name_mismatches: Vec<ParamMismatch>,
    /// Equally specific candidates when the outcome is ambiguous.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub candidates: Vec<RouteDeclaration>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lit(s: &str) -> Segment {
        Segment::Literal(s.into())
    }

    fn param(s: &str) -> Segment {
        Segment::Param(s.into())
    }

    #[test]
    fn test_template_display_shape_and_specificity() {
        let t = PathTemplate::new(vec![lit("ws"), param("wsId"), lit("eval")]);
        assert_eq!(t.to_string(), "/ws/{wsId}/eval");
        assert_eq!(t.shape(), "/ws/{}/eval");
        assert_eq!(t.literal_count(), 2);
        assert_eq!(PathTemplate::default().to_string(), "/");
    }

    #[test]
    fn test_method_parse_is_case_insensitive() {
        assert_eq!("delete".parse::<HttpMethod>().unwrap(), HttpMethod::Delete);
        assert!("OPTIONS".parse::<HttpMethod>().is_err());
    }
}

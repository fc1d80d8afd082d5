//! Typed errors for configuration, orchestration and rendering, with the
//! exit code each maps to.

use std::path::PathBuf;
use thiserror::Error;

/// Exit code for a run where every selected validator passed.
pub const EXIT_PASSED: u8 = 0;
/// Exit code when one or more validators reported errors.
pub const EXIT_FAILED: u8 = 1;
/// Exit code for orchestrator-level failures and usage errors.
pub const EXIT_ORCHESTRATOR: u8 = 2;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid TOML in {path}: {message}")]
    Toml { path: PathBuf, message: String },
    #[error("invalid YAML in {path}: {message}")]
    Yaml { path: PathBuf, message: String },
    #[error("certification thresholds must satisfy gold <= silver <= bronze (got {gold}/{silver}/{bronze})")]
    Thresholds {
        gold: usize,
        silver: usize,
        bronze: usize,
    },
    #[error("invalid glob pattern `{pattern}`: {message}")]
    Glob { pattern: String, message: String },
    #[error("invalid regex `{pattern}`: {message}")]
    Regex { pattern: String, message: String },
}

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("project root not found: {}", .0.display())]
    RootNotFound(PathBuf),
    #[error("target is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),
    #[error("no validators resolved (include: [{include}], exclude: [{exclude}])")]
    NoValidators { include: String, exclude: String },
    #[error("unknown validator `{name}` (available: {available})")]
    UnknownValidator { name: String, available: String },
    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("unsupported report format `{0}` (expected text|json|markdown)")]
    UnsupportedFormat(String),
    #[error("failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to write report to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ConfigError {
    pub fn exit_code(&self) -> u8 {
        EXIT_ORCHESTRATOR
    }
}

impl OrchestratorError {
    pub fn exit_code(&self) -> u8 {
        match self {
            OrchestratorError::Config(e) => e.exit_code(),
            _ => EXIT_ORCHESTRATOR,
        }
    }
}

impl ReportError {
    pub fn exit_code(&self) -> u8 {
        EXIT_ORCHESTRATOR
    }
}

/// Exit code for an error that aborted the run before a verdict.
pub fn exit_code_of(err: &anyhow::Error) -> u8 {
    if let Some(e) = err.downcast_ref::<OrchestratorError>() {
        e.exit_code()
    } else if let Some(e) = err.downcast_ref::<ConfigError>() {
        e.exit_code()
    } else if let Some(e) = err.downcast_ref::<ReportError>() {
        e.exit_code()
    } else {
        EXIT_ORCHESTRATOR
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::Format;

    #[test]
    fn test_unsupported_format_is_a_usage_error() {
        let err: anyhow::Error = "xml".parse::<Format>().unwrap_err().into();
        assert_eq!(exit_code_of(&err), EXIT_ORCHESTRATOR);
    }

    #[test]
    fn test_typed_errors_map_to_orchestrator_exit() {
        let root: anyhow::Error = OrchestratorError::RootNotFound(PathBuf::from("nope")).into();
        assert_eq!(exit_code_of(&root), EXIT_ORCHESTRATOR);
        let cfg: anyhow::Error = ConfigError::Thresholds {
            gold: 5,
            silver: 1,
            bronze: 9,
        }
        .into();
        assert_eq!(exit_code_of(&cfg), EXIT_ORCHESTRATOR);
        let wrapped = OrchestratorError::from(ConfigError::Glob {
            pattern: "[".into(),
            message: "unclosed".into(),
        });
        assert_eq!(wrapped.exit_code(), EXIT_ORCHESTRATOR);
        assert_eq!(exit_code_of(&anyhow::anyhow!("io")), EXIT_ORCHESTRATOR);
    }
}

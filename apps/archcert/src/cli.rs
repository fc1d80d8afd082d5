//! CLI argument parsing via `clap`.

use crate::config::Overrides;
use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "archcert",
    version,
    about = "Architecture compliance validation and certification",
    long_about = "archcert runs a set of independent validators over a generated multi-module application, reconciles frontend API calls with backend route declarations, and reports an aggregated, tiered certification.\n\nConfiguration precedence: CLI > archcert.toml > defaults.",
    after_help = "Examples:\n  archcert project .\n  archcert project . --exclude accessibility --format json --out report.json\n  archcert module packages/module-chat --validators api-tracer\n  archcert project . --certify --format markdown\n\nExit codes: 0 passed, 1 validation failed, 2 usage or orchestrator error.",
    arg_required_else_help = true
)]
/// Top-level CLI options and subcommands.
pub struct Cli {
    /// Debug logging to stderr (ARCHCERT_LOG overrides)
    #[arg(short, long, global = true, action = clap::ArgAction::SetTrue)]
    pub verbose: bool,
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate a single module directory
    #[command(
        about = "Validate one module",
        long_about = "Run the selected validators against a single module directory. Every issue is attributed to that module.",
        after_help = "Examples:\n  archcert module packages/module-chat\n  archcert module packages/module-kb --validators structure,naming --format json"
    )]
    Module {
        #[arg(help = "Path to the module directory")]
        path: String,
        #[command(flatten)]
        run: RunArgs,
    },
    /// Validate a whole project tree
    #[command(
        about = "Validate a project",
        long_about = "Run the selected validators against a project root. Modules come from [modules] in archcert.toml or from packages/* and modules/* directories.",
        after_help = "Examples:\n  archcert project .\n  archcert project ../app --exclude accessibility --certify"
    )]
    Project {
        #[arg(help = "Project root (default: current dir)", default_value = ".")]
        root: String,
        #[arg(long, help = "Comma-separated validators to skip")]
        exclude: Option<String>,
        #[arg(long, action = clap::ArgAction::SetTrue, help = "Also fail when the certification tier is below certification.minimum_tier")]
        certify: bool,
        #[command(flatten)]
        run: RunArgs,
    },
    /// List registered validators
    #[command(about = "List validators", long_about = "Print the registered validators in run order.")]
    List {
        #[arg(long, help = "Path to archcert.toml|yaml")]
        config: Option<String>,
    },
    /// Show version
    #[command(about = "Show version", long_about = "Print the current archcert version.")]
    Version,
}

#[derive(Args, Debug, Default, Clone)]
/// Flags shared by `module` and `project`.
pub struct RunArgs {
    #[arg(long, help = "Comma-separated validators to run (default: all)")]
    pub validators: Option<String>,
    #[arg(long, help = "Output format: text|json|markdown (default: text)")]
    pub format: Option<String>,
    #[arg(long, help = "Path to archcert.toml|yaml (default: discovered)")]
    pub config: Option<String>,
    #[arg(long, help = "Write the report to a file instead of stdout")]
    pub out: Option<String>,
    #[arg(long, action = clap::ArgAction::SetTrue, help = "Include validator durations in the report")]
    pub timings: bool,
    #[arg(long, action = clap::ArgAction::SetTrue, help = "Run validators in parallel")]
    pub parallel: bool,
    #[arg(long, help = "Overall time budget in seconds; unfinished validators count as crashed")]
    pub timeout_secs: Option<u64>,
    #[arg(long, help = "Number of top issues to show (default: 10)")]
    pub top: Option<usize>,
}

impl RunArgs {
    pub fn overrides(&self, exclude: Option<String>, certify: bool) -> Overrides {
        Overrides {
            config: self.config.clone(),
            format: self.format.clone(),
            validators: self.validators.clone(),
            exclude,
            top: self.top,
            parallel: self.parallel,
            timeout_secs: self.timeout_secs,
            timings: self.timings,
            certify,
            out: self.out.clone(),
        }
    }
}

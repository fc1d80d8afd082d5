//! archcert CLI binary entry point.
//! Resolves configuration, runs the orchestrator and maps the outcome to an
//! exit code.

use anyhow::Result;
use archcert::aggregate::ReportSettings;
use archcert::checks::builtin_validators;
use archcert::cli::{Cli, Commands};
use archcert::config::{self, Effective, Overrides};
use archcert::error::{exit_code_of, EXIT_PASSED};
use archcert::orchestrator::{Mode, Orchestrator, RunOptions, Verdict};
use archcert::output::{self, Format};
use archcert::utils::{error_prefix, info_prefix, note_prefix};
use clap::Parser;
use std::path::Path;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("ARCHCERT_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose { "archcert=debug" } else { "warn" })
    });
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.cmd {
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            ExitCode::from(EXIT_PASSED)
        }
        Commands::List { config } => exit_with(list(config)),
        Commands::Module { path, run } => exit_with(validate(&path, Mode::Module, &run.overrides(None, false))),
        Commands::Project {
            root,
            exclude,
            certify,
            run,
        } => exit_with(validate(&root, Mode::Project, &run.overrides(exclude, certify))),
    }
}

fn exit_with(res: Result<u8>) -> ExitCode {
    match res {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("{} {:#}", error_prefix(), e);
            ExitCode::from(exit_code_of(&e))
        }
    }
}

fn list(config: Option<String>) -> Result<u8> {
    let ov = Overrides {
        config,
        ..Overrides::default()
    };
    let eff = config::resolve_effective(Path::new("."), &ov)?;
    let validators = builtin_validators(&eff)?;
    for v in validators.iter() {
        println!("{:<14} {}", v.name(), v.description());
    }
    Ok(EXIT_PASSED)
}

fn run_options(eff: &Effective) -> RunOptions {
    RunOptions {
        include: eff.include.clone(),
        exclude: eff.exclude.clone(),
        parallel: eff.parallel,
        timeout: eff.timeout,
        modules: eff.modules.clone(),
        report: ReportSettings {
            top_issues: eff.top_issues,
            thresholds: eff.thresholds.clone(),
            timings: eff.timings,
        },
    }
}

fn validate(target: &str, mode: Mode, ov: &Overrides) -> Result<u8> {
    let target = Path::new(target);
    let eff = config::resolve_effective(target, ov)?;
    // unsupported formats are usage errors and must fail before any validator runs
    let format: Format = eff.format.parse()?;
    if format == Format::Text && eff.config_path.is_none() {
        eprintln!("{} no archcert.toml found; using defaults", note_prefix());
    }

    let mut orchestrator = Orchestrator::new(builtin_validators(&eff)?);
    let outcome = orchestrator.run(target, mode, &run_options(&eff))?;
    output::emit(&outcome.report, format, eff.out.as_deref())?;
    if let Some(out) = &eff.out {
        eprintln!("{} report written to {}", info_prefix(), out.display());
    }

    let verdict = outcome.verdict(eff.certify.then_some(eff.minimum_tier));
    match verdict {
        Verdict::AllCrashed => eprintln!("{} every selected validator crashed", error_prefix()),
        Verdict::BelowMinimumTier { tier, minimum } => eprintln!(
            "{} certification {} is below the required {}",
            error_prefix(),
            tier,
            minimum
        ),
        Verdict::Passed | Verdict::Failed => {}
    }
    Ok(verdict.exit_code())
}

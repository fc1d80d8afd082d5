//! Validator orchestration.
//!
//! A run moves through `Idle → Discovering → Running(i) → Aggregating → Done`:
//! the target and validator selection are resolved first, each selected
//! validator is invoked in isolation (an `Err` or a panic becomes a crashed
//! result, never an aborted run), and the collected results are handed to
//! the aggregator.

use crate::aggregate::{self, ReportSettings};
use crate::error::{OrchestratorError, EXIT_FAILED, EXIT_ORCHESTRATOR, EXIT_PASSED};
use crate::models::report::{Report, Status, Tier};
use crate::models::ValidatorResult;
use crate::registry::ModuleRegistry;
use crate::validator::{TargetKind, ValidationContext, Validator, ValidatorSet};
use rayon::prelude::*;
use std::any::Any;
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Discovering,
    Running(usize),
    Aggregating,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// The target directory is one module.
    Module,
    /// The target directory is a project containing modules.
    Project,
}

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub parallel: bool,
    /// Overall budget; validators still running when it elapses are crashed.
    pub timeout: Option<Duration>,
    /// `[modules]` table from config, prefixes relative to the project root.
    pub modules: BTreeMap<String, String>,
    pub report: ReportSettings,
}

#[derive(Debug)]
pub struct RunOutcome {
    pub results: Vec<ValidatorResult>,
    pub report: Report,
}

impl RunOutcome {
    /// True when at least one validator ran and every one of them crashed.
    pub fn all_crashed(&self) -> bool {
        !self.results.is_empty() && self.results.iter().all(|r| r.crashed.is_some())
    }

    /// Final verdict. `minimum_tier` is set when certification gates the run.
    pub fn verdict(&self, minimum_tier: Option<Tier>) -> Verdict {
        if self.all_crashed() {
            return Verdict::AllCrashed;
        }
        let tier = self.report.certification.tier;
        if let Some(minimum) = minimum_tier.filter(|m| tier < *m) {
            return Verdict::BelowMinimumTier { tier, minimum };
        }
        match self.report.status {
            Status::Passed => Verdict::Passed,
            Status::Failed => Verdict::Failed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Passed,
    Failed,
    BelowMinimumTier { tier: Tier, minimum: Tier },
    AllCrashed,
}

impl Verdict {
    pub fn exit_code(self) -> u8 {
        match self {
            Verdict::Passed => EXIT_PASSED,
            Verdict::Failed | Verdict::BelowMinimumTier { .. } => EXIT_FAILED,
            Verdict::AllCrashed => EXIT_ORCHESTRATOR,
        }
    }
}

pub struct Orchestrator {
    validators: ValidatorSet,
    phase: Phase,
}

impl Orchestrator {
    pub fn new(validators: ValidatorSet) -> Self {
        Self {
            validators,
            phase: Phase::Idle,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn validators(&self) -> &ValidatorSet {
        &self.validators
    }

    fn enter(&mut self, phase: Phase) {
        debug!(from = ?self.phase, to = ?phase, "orchestrator phase");
        self.phase = phase;
    }

    /// Resolve the target directory, kind and module registry.
    pub fn discover_target(
        &self,
        target: &Path,
        mode: Mode,
        modules: &BTreeMap<String, String>,
    ) -> Result<ValidationContext, OrchestratorError> {
        if !target.exists() {
            return Err(OrchestratorError::RootNotFound(target.to_path_buf()));
        }
        if !target.is_dir() {
            return Err(OrchestratorError::NotADirectory(target.to_path_buf()));
        }
        let root: PathBuf = target.to_path_buf();
        let ctx = match mode {
            Mode::Module => {
                let name = module_name(&root);
                ValidationContext::new(
                    root,
                    TargetKind::Module { name: name.clone() },
                    ModuleRegistry::single(name),
                )
            }
            Mode::Project => {
                let registry = if modules.is_empty() {
                    ModuleRegistry::discover(&root)
                } else {
                    ModuleRegistry::from_pairs(modules.clone())
                };
                ValidationContext::new(root, TargetKind::Project, registry)
            }
        };
        Ok(ctx)
    }

    /// Validators to run: include list > exclude list > everything, in
    /// registration order, restricted to those applying to `target`.
    pub fn select(
        &self,
        target: &TargetKind,
        include: &[String],
        exclude: &[String],
    ) -> Result<Vec<Arc<dyn Validator>>, OrchestratorError> {
        for name in include.iter().chain(exclude) {
            if self.validators.get(name).is_none() {
                return Err(OrchestratorError::UnknownValidator {
                    name: name.clone(),
                    available: self.validators.names().join(", "),
                });
            }
        }
        let selected: Vec<Arc<dyn Validator>> = self
            .validators
            .iter()
            .filter(|v| {
                if include.is_empty() {
                    !exclude.iter().any(|n| n == v.name())
                } else {
                    include.iter().any(|n| n == v.name())
                }
            })
            .filter(|v| v.applies_to(target))
            .cloned()
            .collect();
        if selected.is_empty() {
            return Err(OrchestratorError::NoValidators {
                include: include.join(","),
                exclude: exclude.join(","),
            });
        }
        Ok(selected)
    }

    /// Run the selected validators against `target` and aggregate the results.
    pub fn run(&mut self, target: &Path, mode: Mode, opts: &RunOptions) -> Result<RunOutcome, OrchestratorError> {
        self.enter(Phase::Discovering);
        let prepared = self
            .discover_target(target, mode, &opts.modules)
            .and_then(|ctx| {
                let selected = self.select(&ctx.target, &opts.include, &opts.exclude)?;
                Ok((ctx, selected))
            });
        let (ctx, selected) = match prepared {
            Ok(p) => p,
            Err(e) => {
                self.enter(Phase::Idle);
                return Err(e);
            }
        };
        info!(
            target = %ctx.root.display(),
            kind = ctx.target.label(),
            validators = selected.len(),
            "starting validation"
        );

        let ctx = Arc::new(ctx);
        let results = match opts.timeout {
            None if opts.parallel => {
                self.enter(Phase::Running(0));
                selected.par_iter().map(|v| run_isolated(v.as_ref(), &ctx)).collect()
            }
            None => {
                let mut results = Vec::with_capacity(selected.len());
                for (i, v) in selected.iter().enumerate() {
                    self.enter(Phase::Running(i));
                    results.push(run_isolated(v.as_ref(), &ctx));
                }
                results
            }
            Some(budget) => {
                self.enter(Phase::Running(0));
                run_with_timeout(&selected, &ctx, opts.parallel, budget)
            }
        };

        self.enter(Phase::Aggregating);
        let report = aggregate::build_report(&ctx, &results, &opts.report);
        self.enter(Phase::Done);
        Ok(RunOutcome { results, report })
    }
}

fn module_name(root: &Path) -> String {
    root.canonicalize()
        .ok()
        .as_deref()
        .unwrap_or(root)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "module".to_string())
}

/// Invoke one validator, converting errors and panics into a crashed result.
pub fn run_isolated(validator: &dyn Validator, ctx: &ValidationContext) -> ValidatorResult {
    let name = validator.name();
    debug!(validator = name, "validator started");
    let started = Instant::now();
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| validator.validate(ctx)));
    let ms = elapsed_ms(started);
    match outcome {
        Ok(Ok(issues)) => {
            let result = ValidatorResult::completed(name, issues, ms);
            debug!(
                validator = name,
                errors = result.errors,
                warnings = result.warnings,
                duration_ms = ms,
                "validator finished"
            );
            result
        }
        Ok(Err(err)) => {
            let reason = format!("{:#}", err);
            warn!(validator = name, reason = %reason, "validator failed");
            ValidatorResult::crashed(&ctx.registry, name, reason, ms)
        }
        Err(payload) => {
            let reason = format!("panicked: {}", panic_message(payload.as_ref()));
            warn!(validator = name, reason = %reason, "validator panicked");
            ValidatorResult::crashed(&ctx.registry, name, reason, ms)
        }
    }
}

fn run_with_timeout(
    selected: &[Arc<dyn Validator>],
    ctx: &Arc<ValidationContext>,
    parallel: bool,
    budget: Duration,
) -> Vec<ValidatorResult> {
    let (tx, rx) = mpsc::channel::<(usize, ValidatorResult)>();
    let jobs: Vec<Arc<dyn Validator>> = selected.to_vec();
    let worker_ctx = Arc::clone(ctx);
    // Detached: a validator that never returns keeps its thread, not the run.
    thread::spawn(move || {
        if parallel {
            jobs.par_iter()
                .enumerate()
                .for_each_with(tx, |tx, (i, v)| {
                    let _ = tx.send((i, run_isolated(v.as_ref(), &worker_ctx)));
                });
        } else {
            for (i, v) in jobs.iter().enumerate() {
                if tx.send((i, run_isolated(v.as_ref(), &worker_ctx))).is_err() {
                    break;
                }
            }
        }
    });

    let started = Instant::now();
    let deadline = started + budget;
    let mut slots: Vec<Option<ValidatorResult>> = vec![None; selected.len()];
    let mut received = 0usize;
    while received < selected.len() {
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        match rx.recv_timeout(deadline - now) {
            Ok((i, result)) => {
                slots[i] = Some(result);
                received += 1;
            }
            Err(_) => break,
        }
    }

    let waited = elapsed_ms(started);
    slots
        .into_iter()
        .zip(selected)
        .map(|(slot, v)| {
            slot.unwrap_or_else(|| {
                warn!(validator = v.name(), budget_secs = budget.as_secs(), "validator timed out");
                ValidatorResult::crashed(
                    &ctx.registry,
                    v.name(),
                    format!("timed out after {:?}", budget),
                    waited,
                )
            })
        })
        .collect()
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

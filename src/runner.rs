//! The benchmark run loop.
//!
//! A [`BenchmarkRun`] walks through
//! `Idle → Provisioning → Generating → Running → Draining → Terminated`. Failures of any
//! stage terminate the run: they are logged, printed as one `Exception:` line on stderr
//! and never retried. Whatever happens, the scheduler is asked to stop once the run ends.

use std::{fmt::Display, sync::Arc};

use anyhow::anyhow;
use tracing::{debug, error, info, instrument};

use crate::{
    agent_provider::AgentRegistry,
    error::{BenchError, Result},
    generator::Progress,
    lifecycle::SchedulerHandle,
    run_config::RunConfig,
    strategy::{BenchmarkPlan, StrategySelector},
};

/// Counters of a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOutcome {
    /// Games produced, including the overshoot of the last batch.
    pub games: usize,
    /// Generator invocations, each followed by one callback invocation.
    pub batches: usize,
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    Success(RunOutcome),
    /// The message of the error that ended the run.
    Failed(String),
    /// Abandoned by an interrupt signal.
    Interrupted,
}

/// Stage of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Provisioning,
    Generating,
    Running,
    Draining,
    Terminated(Termination),
}

impl Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunState::Idle => write!(f, "idle"),
            RunState::Provisioning => write!(f, "provisioning"),
            RunState::Generating => write!(f, "generating"),
            RunState::Running => write!(f, "running"),
            RunState::Draining => write!(f, "draining"),
            RunState::Terminated(Termination::Success(_)) => write!(f, "terminated (success)"),
            RunState::Terminated(Termination::Failed(_)) => write!(f, "terminated (failed)"),
            RunState::Terminated(Termination::Interrupted) => write!(f, "terminated (interrupted)"),
        }
    }
}

/// Play `plan.match_count` games, handing every batch to the callback as soon as it is produced.
///
/// The last batch is delivered whole even if it overshoots the match count.
#[instrument(skip_all, fields(label = %plan.label(), match_count = plan.match_count))]
pub async fn run_benchmark(plan: &BenchmarkPlan, progress: &Progress) -> Result<RunOutcome> {
    plan.generator.reset_pacing();

    let mut outcome = RunOutcome::default();
    while outcome.games < plan.match_count {
        let batch = plan
            .generator
            .generate(&plan.players, progress)
            .await
            .map_err(BenchError::Generation)?;
        if batch.is_empty() {
            return Err(BenchError::Generation(anyhow!(
                "generator produced an empty batch"
            )));
        }

        outcome.games += batch.len();
        outcome.batches += 1;
        debug!(
            batch = outcome.batches,
            size = batch.len(),
            games = outcome.games,
            "batch produced"
        );
        plan.callback.call(&batch)?;
    }
    Ok(outcome)
}

/// One live benchmark, from agent resolution to the last callback.
pub struct BenchmarkRun {
    registry: AgentRegistry,
    selector: Arc<StrategySelector>,
    config: RunConfig,
    verbose: bool,
    state: RunState,
}

impl BenchmarkRun {
    pub fn new(
        registry: AgentRegistry,
        selector: Arc<StrategySelector>,
        config: RunConfig,
        verbose: bool,
    ) -> Self {
        BenchmarkRun {
            registry,
            selector,
            config,
            verbose,
            state: RunState::Idle,
        }
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    fn enter(&mut self, state: RunState) {
        debug!(from = %self.state, to = %state, "run state");
        self.state = state;
    }

    /// Run to completion, then stop `scheduler`. Returns the terminal state.
    pub async fn execute(mut self, scheduler: &SchedulerHandle) -> RunState {
        let termination = match self.try_run().await {
            Ok(outcome) => {
                info!(games = outcome.games, batches = outcome.batches, "benchmark done");
                Termination::Success(outcome)
            }
            Err(e) => {
                error!("benchmark failed: {e}");
                eprintln!("Exception: {e}");
                Termination::Failed(e.to_string())
            }
        };
        self.enter(RunState::Terminated(termination));
        scheduler.stop();
        self.state
    }

    async fn try_run(&mut self) -> Result<RunOutcome> {
        self.enter(RunState::Provisioning);
        let (subject, opponent) = self.config.agents()?;
        let (subject, opponent) = self.registry.provision(subject, opponent).await?;

        self.enter(RunState::Generating);
        let plan = self.selector.select(subject, opponent, &self.config).await?;

        self.enter(RunState::Running);
        let progress = Progress::new(plan.label(), plan.match_count, self.verbose);
        let outcome = run_benchmark(&plan, &progress).await;

        self.enter(RunState::Draining);
        progress.finish();
        drop(plan);
        outcome
    }
}

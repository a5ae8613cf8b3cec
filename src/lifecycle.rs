//! Process-level orchestration of a live benchmark.
//!
//! [`Lifecycle::run`] owns a single-threaded tokio runtime. It binds the embedded game
//! server, schedules the [`BenchmarkRun`] after a warm-up delay and serves until the run
//! asks the [`SchedulerHandle`] to stop or an interrupt arrives. Whatever the outcome,
//! including a runtime or server that never started, every port recorded during the run
//! is then handed to the [`PortGuard`].

use std::{future::Future, pin::Pin, sync::Arc};

use anyhow::{anyhow, Context};
use tokio::{sync::watch, task::LocalSet};
use tracing::{info, instrument, warn};

use crate::{
    agent_provider::AgentRegistry,
    configuration::Configuration,
    error::{BenchError, Result},
    game_server::GameServer,
    generator::GameGenerator,
    port_guard::{PortCloser, PortGuard, PortSet, SystemPorts},
    protocol::TcpConnector,
    run_config::RunConfig,
    runner::{BenchmarkRun, RunState, Termination},
    simulator::Simulator,
    stats::CollectorTable,
    strategy::StrategySelector,
};

/// Lets the run loop ask the lifecycle to stop scheduling.
#[derive(Debug, Clone)]
pub struct SchedulerHandle {
    stop: Arc<watch::Sender<bool>>,
}

impl SchedulerHandle {
    pub fn new() -> Self {
        let (stop, _) = watch::channel(false);
        SchedulerHandle {
            stop: Arc::new(stop),
        }
    }

    /// Request the stop. Later calls have no effect.
    pub fn stop(&self) {
        self.stop.send_replace(true);
    }

    pub fn is_stopped(&self) -> bool {
        *self.stop.borrow()
    }

    /// Resolves once [`SchedulerHandle::stop`] was called, immediately if it already was.
    pub async fn stopped(&self) {
        let mut rx = self.stop.subscribe();
        while !*rx.borrow_and_update() {
            if rx.changed().await.is_err() {
                return;
            }
        }
    }
}

impl Default for SchedulerHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Future resolving when the run must be interrupted. Created inside the runtime.
pub type ShutdownSignal = Box<dyn FnOnce() -> Pin<Box<dyn Future<Output = ()>>>>;

fn ctrl_c() -> Pin<Box<dyn Future<Output = ()>>> {
    Box::pin(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("could not listen for ctrl-c: {e}");
            std::future::pending::<()>().await;
        }
    })
}

/// Runs one live benchmark and releases its resources.
pub struct Lifecycle {
    configuration: Configuration,
    registry: AgentRegistry,
    closer: Arc<dyn PortCloser + Send + Sync>,
    shutdown: ShutdownSignal,
    collectors: CollectorTable,
    local_generator: Option<Arc<dyn GameGenerator>>,
}

impl Lifecycle {
    /// Lifecycle interrupted by ctrl-c, closing leftover ports on the local machine.
    pub fn new(configuration: Configuration, registry: AgentRegistry) -> Self {
        Lifecycle {
            configuration,
            registry,
            closer: Arc::new(SystemPorts),
            shutdown: Box::new(ctrl_c),
            collectors: CollectorTable::builtin(),
            local_generator: None,
        }
    }

    /// Replace how leftover ports are detected and closed.
    pub fn with_closer(mut self, closer: impl PortCloser + Send + Sync + 'static) -> Self {
        self.closer = Arc::new(closer);
        self
    }

    /// Replace the interrupt signal. `signal` is called once, inside the runtime.
    pub fn with_shutdown_signal<F, Fut>(mut self, signal: F) -> Self
    where
        F: FnOnce() -> Fut + 'static,
        Fut: Future<Output = ()> + 'static,
    {
        self.shutdown = Box::new(move || Box::pin(signal()));
        self
    }

    /// Collectors used to build the stats callback.
    pub fn with_collectors(mut self, collectors: CollectorTable) -> Self {
        self.collectors = collectors;
        self
    }

    /// Generator used instead of the simulator for local runs.
    pub fn with_local_generator(mut self, generator: Arc<dyn GameGenerator>) -> Self {
        self.local_generator = Some(generator);
        self
    }

    /// Run the benchmark described by `config` to its end, then release every recorded port.
    ///
    /// Failures of the run itself are reported by the returned [`RunState`]; an `Err` means
    /// the runtime or the embedded server could not run.
    pub fn run(self, config: RunConfig) -> Result<RunState> {
        let ports = self.registry.ports().clone();
        let guard = PortGuard::with_closer(ports.clone(), self.closer.clone());

        let result = self.run_scheduled(config, ports);

        let released = guard.release();
        if !released.is_empty() {
            info!(?released, "leftover ports force-closed");
        }
        result
    }

    fn run_scheduled(self, config: RunConfig, ports: PortSet) -> Result<RunState> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("could not build the runtime")
            .map_err(BenchError::Runtime)?;
        let local = LocalSet::new();
        let state = local.block_on(&runtime, self.serve(config, ports));
        drop(local);
        runtime.shutdown_background();
        state
    }

    #[instrument(skip_all)]
    async fn serve(self, config: RunConfig, ports: PortSet) -> Result<RunState> {
        let Lifecycle {
            configuration,
            registry,
            shutdown,
            collectors,
            local_generator,
            ..
        } = self;

        let simulator = Arc::new(Simulator::new(configuration.max_years, configuration.seed));
        let server = GameServer::bind(configuration.server_port, simulator.clone(), &ports)
            .await
            .map_err(BenchError::Runtime)?;
        let addr = server.local_addr().map_err(BenchError::Runtime)?;

        let selector = StrategySelector::new(simulator, Arc::new(TcpConnector::new(addr)), ports)
            .with_collectors(collectors)
            .with_local_generator(local_generator);
        let run = BenchmarkRun::new(registry, Arc::new(selector), config, configuration.verbose);

        let scheduler = SchedulerHandle::new();
        let warmup = configuration.warmup;
        let task = tokio::task::spawn_local({
            let scheduler = scheduler.clone();
            async move {
                tokio::time::sleep(warmup).await;
                run.execute(&scheduler).await
            }
        });

        let interrupt = shutdown();
        let state = tokio::select! {
            biased;
            _ = scheduler.stopped() => task
                .await
                .map_err(|e| BenchError::Runtime(anyhow!("run loop aborted: {e}"))),
            _ = interrupt => {
                info!("interrupted, abandoning the run");
                task.abort();
                Ok(RunState::Terminated(Termination::Interrupted))
            }
            served = server.serve() => {
                task.abort();
                Err(BenchError::Runtime(
                    served.err().unwrap_or_else(|| anyhow!("game server stopped")),
                ))
            }
        };
        scheduler.stop();
        state
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn stop_before_wait_resolves_immediately() {
        let scheduler = SchedulerHandle::new();
        assert!(!scheduler.is_stopped());
        scheduler.stop();
        scheduler.stop();
        scheduler.stopped().await;
        assert!(scheduler.is_stopped());
    }

    #[tokio::test]
    async fn clones_share_the_stop() {
        let scheduler = SchedulerHandle::new();
        let waiter = tokio::spawn({
            let scheduler = scheduler.clone();
            async move { scheduler.stopped().await }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!waiter.is_finished());
        scheduler.stop();
        waiter.await.unwrap();
    }
}

use std::{
    collections::BTreeSet,
    net::TcpListener,
    path::Path,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use ai_bench::{
    prelude::*,
    simulator::{SeatProfile, Simulator},
    stats::save_games,
};
use async_trait::async_trait;
use tokio::sync::oneshot;
use tracing::{Level, Metadata};
use tracing_subscriber::{
    fmt,
    layer::{Context, Filter, SubscriberExt},
    Layer, Registry,
};

struct CustomLevelFilter;
impl<S> Filter<S> for CustomLevelFilter {
    fn enabled(&self, meta: &Metadata<'_>, _cx: &Context<'_, S>) -> bool {
        *meta.level() <= Level::DEBUG
    }
}

fn init_debug_logger() {
    let format = fmt::format()
        .without_time()
        .with_ansi(true)
        .with_level(true)
        .with_thread_names(true)
        .with_target(false);

    let reg = Registry::default().with(
        fmt::layer()
            .event_format(format)
            .with_test_writer()
            .with_filter(CustomLevelFilter),
    );

    let _ = tracing::subscriber::set_global_default(reg);
}

/// Closer reporting every port as open (or none) and recording what it was asked.
#[derive(Default)]
struct RecordingCloser {
    all_open: bool,
    queried: Mutex<BTreeSet<u16>>,
    killed: Mutex<BTreeSet<u16>>,
}

impl PortCloser for RecordingCloser {
    fn is_open(&self, port: u16) -> bool {
        self.queried.lock().unwrap().insert(port);
        self.all_open
    }

    fn kill_users(&self, port: u16, _force: bool) -> anyhow::Result<()> {
        self.killed.lock().unwrap().insert(port);
        Ok(())
    }
}

struct CountingFactory {
    name: &'static str,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl AgentFactory for CountingFactory {
    async fn make(&self, _ports: &PortSet) -> anyhow::Result<Arc<Agent>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(Agent::new(self.name, Capability::Local, PlayStyle::Cautious)))
    }
}

struct BrokenFactory;

#[async_trait]
impl AgentFactory for BrokenFactory {
    async fn make(&self, _ports: &PortSet) -> anyhow::Result<Arc<Agent>> {
        anyhow::bail!("engine binary missing")
    }
}

/// Produces one game, then stalls forever after firing `stalled`.
struct StallingGenerator {
    simulator: Simulator,
    calls: AtomicUsize,
    stalled: Mutex<Option<oneshot::Sender<()>>>,
}

#[async_trait]
impl GameGenerator for StallingGenerator {
    async fn generate(
        &self,
        players: &PlayerSlot,
        progress: &Progress,
    ) -> anyhow::Result<Vec<GameRecord>> {
        if self.calls.fetch_add(1, Ordering::SeqCst) > 0 {
            if let Some(stalled) = self.stalled.lock().unwrap().take() {
                let _ = stalled.send(());
            }
            std::future::pending::<()>().await;
        }
        let game = self.simulator.play(&players.profiles(), &[])?;
        progress.advance(1);
        Ok(vec![game])
    }
}

fn configuration() -> Configuration {
    Configuration::new()
        .with_verbose(false)
        .with_warmup(Duration::ZERO)
        .with_server_port(0)
        .with_max_years(2)
        .with_seed(11)
}

fn args(ai_1: &str, ai_2: &str, games: usize, stats: &str) -> BenchArgs {
    BenchArgs {
        ai_1: ai_1.to_string(),
        ai_2: ai_2.to_string(),
        games,
        stats: stats.to_string(),
        save_dir: None,
        existing_games_dir: None,
        rules: "NO_PRESS,IGNORE_ERRORS,POWER_CHOICE".to_string(),
    }
}

/// Ranking collector appending `(label, batch size)` to `log`.
fn recording_collectors(log: &Arc<Mutex<Vec<(String, usize)>>>) -> CollectorTable {
    let log = log.clone();
    CollectorTable::new().with(StatKind::Ranking, move |ctx, games| {
        log.lock().unwrap().push((ctx.label.clone(), games.len()));
        Ok(())
    })
}

#[test]
fn same_agent_on_every_seat() {
    init_debug_logger();

    let calls = Arc::new(AtomicUsize::new(0));
    let ports = PortSet::new();
    let registry = AgentRegistry::new(ports.clone()).with_factory(
        "dumbbot",
        CountingFactory {
            name: "dumbbot",
            calls: calls.clone(),
        },
    );
    let config = RunConfig::resolve(args("dumbbot", "dumbbot", 3, "ranking"), &registry).unwrap();
    let log = Arc::new(Mutex::new(vec![]));
    let closer = Arc::new(RecordingCloser::default());

    let state = Lifecycle::new(configuration(), registry)
        .with_closer(closer.clone())
        .with_collectors(recording_collectors(&log))
        .with_shutdown_signal(std::future::pending::<()>)
        .run(config)
        .unwrap();

    assert_eq!(
        state,
        RunState::Terminated(Termination::Success(RunOutcome {
            games: 3,
            batches: 3
        }))
    );
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    let log = log.lock().unwrap();
    assert_eq!(log.len(), 3);
    assert!(log
        .iter()
        .all(|(label, size)| label == "1[dumbbot]v6[dumbbot]" && *size == 1));
    // the embedded server port was recorded, then released
    assert_eq!(closer.queried.lock().unwrap().len(), 1);
    assert!(ports.is_empty());
}

#[test]
fn remote_run_uses_a_single_connection() {
    init_debug_logger();

    let ports = PortSet::new();
    let registry = AgentRegistry::builtin(ports.clone());
    let config =
        RunConfig::resolve(args("daide_dumbbot", "daide_random", 2, "ranking"), &registry).unwrap();
    let log = Arc::new(Mutex::new(vec![]));
    let closer = Arc::new(RecordingCloser::default());

    let state = Lifecycle::new(configuration(), registry)
        .with_closer(closer.clone())
        .with_collectors(recording_collectors(&log))
        .with_shutdown_signal(std::future::pending::<()>)
        .run(config)
        .unwrap();

    assert_eq!(
        state,
        RunState::Terminated(Termination::Success(RunOutcome {
            games: 2,
            batches: 2
        }))
    );
    assert_eq!(
        *log.lock().unwrap(),
        vec![
            ("1[daide_dumbbot]v6[daide_random]".to_string(), 1),
            ("1[daide_dumbbot]v6[daide_random]".to_string(), 1),
        ]
    );
    // server port and the one client connection
    assert_eq!(closer.queried.lock().unwrap().len(), 2);
    assert!(closer.killed.lock().unwrap().is_empty());
}

#[test]
fn interrupt_releases_recorded_ports() {
    init_debug_logger();

    let ports = PortSet::new();
    // a port opened by an agent during provisioning
    ports.insert(1);
    let registry = AgentRegistry::builtin(ports.clone());
    let config = RunConfig::resolve(args("dumbbot", "random", 10, "ranking"), &registry).unwrap();

    let (stalled, interrupted) = oneshot::channel();
    let generator = Arc::new(StallingGenerator {
        simulator: Simulator::new(2, Some(3)),
        calls: AtomicUsize::new(0),
        stalled: Mutex::new(Some(stalled)),
    });
    let log = Arc::new(Mutex::new(vec![]));
    let closer = Arc::new(RecordingCloser {
        all_open: true,
        ..Default::default()
    });

    let state = Lifecycle::new(configuration(), registry)
        .with_closer(closer.clone())
        .with_collectors(recording_collectors(&log))
        .with_local_generator(generator.clone())
        .with_shutdown_signal(move || async move {
            let _ = interrupted.await;
        })
        .run(config)
        .unwrap();

    assert_eq!(state, RunState::Terminated(Termination::Interrupted));
    assert_eq!(generator.calls.load(Ordering::SeqCst), 2);
    assert_eq!(log.lock().unwrap().len(), 1);
    let killed = closer.killed.lock().unwrap();
    assert!(killed.contains(&1));
    assert_eq!(killed.len(), 2);
    assert!(ports.is_empty());
}

#[test]
fn failed_provisioning_is_not_an_error_exit() {
    init_debug_logger();

    let ports = PortSet::new();
    let registry = AgentRegistry::builtin(ports.clone()).with_factory("broken", BrokenFactory);
    let config = RunConfig::resolve(args("broken", "random", 2, "ranking"), &registry).unwrap();
    let log = Arc::new(Mutex::new(vec![]));

    let state = Lifecycle::new(configuration(), registry)
        .with_closer(Arc::new(RecordingCloser::default()))
        .with_collectors(recording_collectors(&log))
        .with_shutdown_signal(std::future::pending::<()>)
        .run(config)
        .unwrap();

    let RunState::Terminated(Termination::Failed(message)) = state else {
        panic!("expected a failed run, got {state:?}");
    };
    assert!(message.contains("could not provision agent 'broken'"));
    assert!(log.lock().unwrap().is_empty());
    assert!(ports.is_empty());
}

#[test]
fn ports_are_released_when_the_server_cannot_start() {
    init_debug_logger();

    let taken = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = taken.local_addr().unwrap().port();

    let ports = PortSet::new();
    ports.insert(1);
    let registry = AgentRegistry::builtin(ports.clone());
    let config = RunConfig::resolve(args("dumbbot", "random", 2, "ranking"), &registry).unwrap();
    let closer = Arc::new(RecordingCloser {
        all_open: true,
        ..Default::default()
    });

    let err = Lifecycle::new(configuration().with_server_port(port), registry)
        .with_closer(closer.clone())
        .with_shutdown_signal(std::future::pending::<()>)
        .run(config)
        .unwrap_err();

    assert!(matches!(err, BenchError::Runtime(_)));
    assert_eq!(*closer.killed.lock().unwrap(), BTreeSet::from([1]));
    assert!(ports.is_empty());
}

fn record_games(dir: &Path, count: usize) {
    let simulator = Simulator::new(2, Some(21));
    let seats = (0..7)
        .map(|i| SeatProfile {
            agent: if i == 0 { "dumbbot" } else { "random" }.to_string(),
            style: if i == 0 {
                PlayStyle::Cautious
            } else {
                PlayStyle::Random
            },
        })
        .collect::<Vec<_>>();
    let games = (0..count)
        .map(|_| simulator.play(&seats, &["NO_PRESS".to_string()]).unwrap())
        .collect::<Vec<_>>();
    save_games(dir, &games).unwrap();
}

#[test]
fn replay_runs_stats_once_over_recorded_games() {
    init_debug_logger();

    let dir = tempfile::tempdir().unwrap();
    record_games(dir.path(), 5);

    let registry = AgentRegistry::builtin(PortSet::new());
    let config = RunConfig::resolve(
        BenchArgs {
            save_dir: Some(dir.path().join("elsewhere")),
            existing_games_dir: Some(dir.path().to_path_buf()),
            ..args("dumbbot", "random", 10, "save_games,ranking")
        },
        &registry,
    )
    .unwrap();
    assert_eq!(config.stats, vec!["ranking"]);

    let replay = Replay::load(config).unwrap();
    assert_eq!(replay.config.games, 5);
    assert_eq!(replay.config.save_dir, None);
    assert!(replay.config.to_string().contains("--games=[5]"));

    let log = Arc::new(Mutex::new(vec![]));
    let collectors = recording_collectors(&log).with(StatKind::SaveGames, |_, _| {
        anyhow::bail!("recorded games must not be saved again")
    });
    replay.run(&collectors).unwrap();

    let log = log.lock().unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].1, 5);
    assert!(log[0].0.ends_with("game_*.json"));
    assert!(!dir.path().join("elsewhere").exists());
}

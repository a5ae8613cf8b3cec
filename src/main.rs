use std::process::ExitCode;

use ai_bench::prelude::*;
use clap::Parser;
use tracing::error;

fn main() -> ExitCode {
    let args = BenchArgs::parse();
    let configuration = Configuration::from_env();
    if configuration.log() {
        if let Err(e) = init_logger() {
            eprintln!("{e:#}");
            return ExitCode::FAILURE;
        }
    }

    match run(args, configuration) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: BenchArgs, configuration: Configuration) -> Result<()> {
    let registry = AgentRegistry::builtin(PortSet::new());
    let config = RunConfig::resolve(args, &registry)?;

    if config.is_replay() {
        let replay = Replay::load(config)?;
        println!("{}", replay.config);
        return replay.run(&CollectorTable::builtin());
    }

    println!("{config}");
    Lifecycle::new(configuration, registry).run(config)?;
    Ok(())
}

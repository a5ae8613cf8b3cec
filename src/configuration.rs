//! Config for the benchmark process behaviors
//!
//! This module provides configuration options that are not part of the command line:
//! how verbose the run is, whether events are logged to a file, how the embedded server
//! is bound and how long the built-in simulator plays.
//!
//! Configuration can be created programmatically using [`Configuration::new()`] or by reading
//! environment variables using [`Configuration::from_env()`].
//!
//! # Environment Variables
//!
//! The following environment variables can be used to override configuration values. All
//! values are optional. Flags are case-insensitive, set them to `"true"` to enable them.
//!
//! - `BENCH_VERBOSE`: Print match progress to stdout (default: `true`)
//! - `BENCH_LOG`: Enable logging to a file (default: `false`)
//! - `BENCH_WARMUP_MS`: Delay before the first match, in milliseconds (default: `2000`)
//! - `BENCH_SERVER_PORT`: Port of the embedded server, `0` for any free port (default: `8432`)
//! - `BENCH_MAX_YEARS`: Number of game years simulated before a draw (default: `10`)
//! - `BENCH_SEED`: Seed of the built-in simulator (default: random)

use std::time::Duration;

/// Configuration for the benchmark process behaviors.
#[derive(Debug, Clone, Copy)]
pub struct Configuration {
    pub(crate) verbose: bool,
    pub(crate) log: bool,
    pub(crate) warmup: Duration,
    pub(crate) server_port: u16,
    pub(crate) max_years: u16,
    pub(crate) seed: Option<u64>,
}

impl Configuration {
    /// Default port of the embedded game server.
    pub const DEFAULT_SERVER_PORT: u16 = 8432;

    /// Create a new configuration with default parameters.
    ///
    /// By default:
    /// - Match progress is printed to stdout.
    /// - Logging to file is disabled.
    /// - The run loop waits 2 seconds for the embedded server before the first match.
    /// - The embedded server listens on port 8432.
    /// - Simulated games are drawn after 10 years.
    /// - The simulator is seeded randomly.
    pub fn new() -> Self {
        Self {
            verbose: true,
            log: false,
            warmup: Duration::from_secs(2),
            server_port: Self::DEFAULT_SERVER_PORT,
            max_years: 10,
            seed: None,
        }
    }

    /// Create configuration from environment variables.
    ///
    /// See the module documentation for the recognized variables. Unset or unparsable
    /// values fall back to the defaults of [`Configuration::new()`].
    pub fn from_env() -> Self {
        fn get_env_flag(var: &str, default: bool) -> bool {
            match std::env::var(var) {
                Ok(val) => val.eq_ignore_ascii_case("true"),
                Err(_) => default,
            }
        }

        fn get_env_parsed<T: std::str::FromStr>(var: &str) -> Option<T> {
            std::env::var(var).ok()?.parse().ok()
        }

        let default = Self::new();
        Self {
            verbose: get_env_flag("BENCH_VERBOSE", default.verbose),
            log: get_env_flag("BENCH_LOG", default.log),
            warmup: get_env_parsed("BENCH_WARMUP_MS")
                .map(Duration::from_millis)
                .unwrap_or(default.warmup),
            server_port: get_env_parsed("BENCH_SERVER_PORT").unwrap_or(default.server_port),
            max_years: get_env_parsed("BENCH_MAX_YEARS")
                .map(|years: u16| years.max(1))
                .unwrap_or(default.max_years),
            seed: get_env_parsed("BENCH_SEED"),
        }
    }

    /// Enable or disable progress printing.
    pub fn with_verbose(mut self, value: bool) -> Self {
        self.verbose = value;
        self
    }

    /// Enable or disable logging to file.
    pub fn with_log(mut self, value: bool) -> Self {
        self.log = value;
        self
    }

    /// Delay between scheduling the run loop and its first match.
    pub fn with_warmup(mut self, value: Duration) -> Self {
        self.warmup = value;
        self
    }

    /// Port of the embedded server. `0` lets the OS pick a free one.
    pub fn with_server_port(mut self, value: u16) -> Self {
        self.server_port = value;
        self
    }

    /// Number of game years the built-in simulator plays before declaring a draw.
    pub fn with_max_years(mut self, value: u16) -> Self {
        self.max_years = value.max(1);
        self
    }

    /// Seed the built-in simulator for reproducible games.
    pub fn with_seed(mut self, value: u64) -> Self {
        self.seed = Some(value);
        self
    }

    /// True when progress lines are printed.
    pub fn verbose(&self) -> bool {
        self.verbose
    }

    /// True when events are logged to a file.
    pub fn log(&self) -> bool {
        self.log
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self::new()
    }
}

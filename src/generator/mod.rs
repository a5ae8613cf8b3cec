//! Match generators.
//!
//! A [`GameGenerator`] plays one batch of matches per invocation with the seats of a
//! [`PlayerSlot`] and returns the produced [`GameRecord`]s. Two generators exist:
//! [`LocalGenerator`] runs the in-process simulator, [`ProtocolGenerator`] asks the game
//! server through the single connected seat.

use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use tokio::time::Instant;
use tracing::trace;

use crate::{game::GameRecord, players::PlayerSlot};

mod local;
mod protocol;

pub use local::LocalGenerator;
pub use protocol::ProtocolGenerator;

/// Plays matches.
#[async_trait]
pub trait GameGenerator: Send + Sync {
    /// Play one batch of matches. Suspends until the whole batch completed.
    async fn generate(
        &self,
        players: &PlayerSlot,
        progress: &Progress,
    ) -> anyhow::Result<Vec<GameRecord>>;

    /// Forget inter-match timing kept from a previous run.
    fn reset_pacing(&self) {}
}

/// Minimum delay between two matches, measured from the end of the previous one.
#[derive(Debug)]
pub struct Pacing {
    interval: Duration,
    last_match_end: Mutex<Option<Instant>>,
}

impl Pacing {
    pub fn new(interval: Duration) -> Self {
        Pacing {
            interval,
            last_match_end: Mutex::new(None),
        }
    }

    /// Sleep until `interval` elapsed since the last recorded match end.
    pub async fn wait(&self) {
        let deadline = self
            .last_match_end
            .lock()
            .expect("poisoned")
            .map(|end| end + self.interval);
        if let Some(deadline) = deadline {
            trace!(?deadline, "pacing");
            tokio::time::sleep_until(deadline).await;
        }
    }

    pub fn mark(&self) {
        *self.last_match_end.lock().expect("poisoned") = Some(Instant::now());
    }

    pub fn reset(&self) {
        *self.last_match_end.lock().expect("poisoned") = None;
    }

    pub fn is_reset(&self) -> bool {
        self.last_match_end.lock().expect("poisoned").is_none()
    }
}

/// Counts produced matches and prints a progress line when verbose.
#[derive(Debug)]
pub struct Progress {
    label: String,
    total: usize,
    done: AtomicUsize,
    verbose: bool,
}

impl Progress {
    pub fn new(label: impl Into<String>, total: usize, verbose: bool) -> Self {
        Progress {
            label: label.into(),
            total,
            done: AtomicUsize::new(0),
            verbose,
        }
    }

    /// Record `n` completed matches.
    pub fn advance(&self, n: usize) {
        let done = self.done.fetch_add(n, Ordering::Relaxed) + n;
        if self.verbose {
            print_progress(&self.label, done, self.total);
        }
    }

    pub fn done(&self) -> usize {
        self.done.load(Ordering::Relaxed)
    }

    /// Leave the progress line.
    pub fn finish(&self) {
        if self.verbose {
            println!();
        }
    }
}

fn print_progress(label: &str, done: usize, total: usize) {
    // clear, green, default, start of line
    print!("\x1b[2K\x1b[32m{label}:\x1b[39m {done}/{total} games\x1b[0G");
    let _ = std::io::Write::flush(&mut std::io::stdout());
}

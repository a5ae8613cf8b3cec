//! Tracks the ports opened during a run and force-closes whatever still holds them at teardown.
//!
//! Any component opening a listening socket or a connection records its port in the shared
//! [`PortSet`]. The lifecycle drains the set exactly once, after the scheduler stopped, and
//! kills every process still bound to one of those ports.

#[cfg(target_os = "linux")]
mod port_guard_linux;

#[cfg(target_os = "linux")]
use port_guard_linux::pids_using_port;

#[cfg(not(target_os = "linux"))]
mod port_guard_stub;

#[cfg(not(target_os = "linux"))]
use port_guard_stub::pids_using_port;

use std::{
    collections::BTreeSet,
    net::{Ipv4Addr, TcpListener},
    sync::{Arc, Mutex},
};

use anyhow::bail;
use sysinfo::{Pid, ProcessesToUpdate, Signal, System};
use tracing::{debug, info, instrument, warn};

/// Ports opened by this process run. Cheap to clone, all clones share the same set.
#[derive(Debug, Clone, Default)]
pub struct PortSet {
    ports: Arc<Mutex<BTreeSet<u16>>>,
}

impl PortSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an opened port.
    pub fn insert(&self, port: u16) {
        debug!(port, "port recorded");
        self.ports.lock().expect("poisoned").insert(port);
    }

    pub fn contains(&self, port: u16) -> bool {
        self.ports.lock().expect("poisoned").contains(&port)
    }

    pub fn len(&self) -> usize {
        self.ports.lock().expect("poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Take every recorded port, leaving the set empty.
    pub fn drain(&self) -> Vec<u16> {
        std::mem::take(&mut *self.ports.lock().expect("poisoned"))
            .into_iter()
            .collect()
    }
}

/// Port liveness check and forced release.
pub trait PortCloser {
    /// True if something is still bound to `port`.
    fn is_open(&self, port: u16) -> bool;

    /// Terminate every process using `port`. `force` kills instead of asking politely.
    fn kill_users(&self, port: u16, force: bool) -> anyhow::Result<()>;
}

impl<C: PortCloser + ?Sized> PortCloser for Arc<C> {
    fn is_open(&self, port: u16) -> bool {
        (**self).is_open(port)
    }

    fn kill_users(&self, port: u16, force: bool) -> anyhow::Result<()> {
        (**self).kill_users(port, force)
    }
}

/// [`PortCloser`] acting on the local machine.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemPorts;

impl PortCloser for SystemPorts {
    fn is_open(&self, port: u16) -> bool {
        // binding fails while another socket still listens on the port
        TcpListener::bind((Ipv4Addr::LOCALHOST, port)).is_err()
    }

    #[instrument(skip(self))]
    fn kill_users(&self, port: u16, force: bool) -> anyhow::Result<()> {
        let own_pid = std::process::id();
        let pids = pids_using_port(port)?;
        if pids.is_empty() {
            bail!("no process found using port {port}");
        }

        let sys_pids = pids.iter().map(|&p| Pid::from_u32(p)).collect::<Vec<_>>();
        let mut sys = System::new();
        sys.refresh_processes(ProcessesToUpdate::Some(&sys_pids), true);

        let mut failures = vec![];
        for pid in pids {
            if pid == own_pid {
                // our own sockets close with the runtime
                debug!(port, "port held by this process, skipping");
                continue;
            }
            let Some(process) = sys.process(Pid::from_u32(pid)) else {
                continue;
            };
            let signal = if force { Signal::Kill } else { Signal::Term };
            let killed = process.kill_with(signal).unwrap_or_else(|| process.kill());
            if killed {
                info!(port, pid, "killed process using port");
            } else {
                failures.push(pid);
            }
        }

        if !failures.is_empty() {
            bail!("could not kill processes {failures:?} using port {port}");
        }
        Ok(())
    }
}

/// Releases every port of a [`PortSet`].
pub struct PortGuard<C: PortCloser = SystemPorts> {
    ports: PortSet,
    closer: C,
}

impl PortGuard<SystemPorts> {
    pub fn new(ports: PortSet) -> Self {
        Self::with_closer(ports, SystemPorts)
    }
}

impl<C: PortCloser> PortGuard<C> {
    pub fn with_closer(ports: PortSet, closer: C) -> Self {
        PortGuard { ports, closer }
    }

    /// Force-close every recorded port still bound. Returns the ports that were closed.
    ///
    /// The set is drained, so a second call is a no-op.
    pub fn release(&self) -> Vec<u16> {
        let mut closed = vec![];
        for port in self.ports.drain() {
            if !self.closer.is_open(port) {
                continue;
            }
            match self.closer.kill_users(port, true) {
                Ok(()) => closed.push(port),
                Err(e) => warn!("could not release port {port}: {e:#}"),
            }
        }
        closed
    }
}

use std::{collections::HashSet, fs, path::Path};

use anyhow::Context;
use tracing::trace;

const SOCKET_TABLES: [&str; 2] = ["/proc/net/tcp", "/proc/net/tcp6"];

/// Pids of every process owning a TCP socket whose local port is `port`.
pub fn pids_using_port(port: u16) -> anyhow::Result<Vec<u32>> {
    let mut inodes = HashSet::new();
    for table in SOCKET_TABLES {
        let Ok(content) = fs::read_to_string(table) else {
            // tcp6 may be missing when ipv6 is disabled
            continue;
        };
        inodes.extend(socket_inodes_on_port(&content, port));
    }
    trace!(port, ?inodes);
    if inodes.is_empty() {
        return Ok(vec![]);
    }

    let mut pids = vec![];
    for entry in fs::read_dir("/proc").context("could not read /proc")? {
        let Ok(entry) = entry else {
            continue;
        };
        let Some(pid) = entry
            .file_name()
            .to_str()
            .and_then(|name| name.parse::<u32>().ok())
        else {
            continue;
        };
        if owns_any_socket(&entry.path(), &inodes) {
            pids.push(pid);
        }
    }
    Ok(pids)
}

/// Inodes of the sockets listed in a `/proc/net/tcp` table bound locally to `port`.
fn socket_inodes_on_port(table: &str, port: u16) -> Vec<u64> {
    table
        .lines()
        .skip(1)
        .filter_map(|line| {
            let fields = line.split_whitespace().collect::<Vec<_>>();
            let local = fields.get(1)?;
            let (_, hex_port) = local.rsplit_once(':')?;
            let local_port = u16::from_str_radix(hex_port, 16).ok()?;
            if local_port != port {
                return None;
            }
            fields.get(9)?.parse::<u64>().ok()
        })
        .filter(|&inode| inode != 0)
        .collect()
}

fn owns_any_socket(proc_dir: &Path, inodes: &HashSet<u64>) -> bool {
    // permission denied for processes of other users: skip them
    let Ok(fds) = fs::read_dir(proc_dir.join("fd")) else {
        return false;
    };
    fds.filter_map(Result::ok).any(|fd| {
        fs::read_link(fd.path())
            .ok()
            .and_then(|target| {
                target
                    .to_str()?
                    .strip_prefix("socket:[")?
                    .strip_suffix(']')?
                    .parse::<u64>()
                    .ok()
            })
            .is_some_and(|inode| inodes.contains(&inode))
    })
}

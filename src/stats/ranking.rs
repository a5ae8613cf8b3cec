use std::{collections::BTreeMap, fmt::Write};

use crate::game::GameRecord;

#[derive(Debug, Default)]
struct AgentRanking {
    seats: usize,
    rank_sum: usize,
    center_sum: usize,
    solos: usize,
    eliminated: usize,
}

/// Per-agent ranking table over a batch of games.
pub fn ranking_report(label: &str, games: &[GameRecord]) -> String {
    let mut table: BTreeMap<&str, AgentRanking> = BTreeMap::new();
    for game in games {
        let solo = game.solo_winner().map(|p| p.name.as_str());
        for (power, rank) in game.ranks() {
            let entry = table.entry(power.agent.as_str()).or_default();
            entry.seats += 1;
            entry.rank_sum += rank;
            entry.center_sum += power.centers.len();
            if solo == Some(power.name.as_str()) {
                entry.solos += 1;
            }
            if power.centers.is_empty() {
                entry.eliminated += 1;
            }
        }
    }

    let mut out = String::new();
    let _ = writeln!(out, "----- ranking {label} ({} games) -----", games.len());
    let _ = writeln!(
        out,
        "{:<16}{:>7}{:>10}{:>13}{:>7}{:>12}",
        "agent", "seats", "avg rank", "avg centers", "solos", "eliminated"
    );
    for (agent, r) in table {
        let seats = r.seats.max(1) as f64;
        let _ = writeln!(
            out,
            "{agent:<16}{:>7}{:>10.2}{:>13.2}{:>7}{:>12}",
            r.seats,
            r.rank_sum as f64 / seats,
            r.center_sum as f64 / seats,
            r.solos,
            r.eliminated
        );
    }
    out
}

pub fn print_ranking_stats(label: &str, games: &[GameRecord]) {
    print!("{}", ranking_report(label, games));
}

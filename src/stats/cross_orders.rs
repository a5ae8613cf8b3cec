use std::{collections::BTreeMap, fmt::Write};

use crate::game::GameRecord;

/// Orders given on behalf of another unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrossOrder {
    Convoy,
    Support,
}

impl CrossOrder {
    fn name(self) -> &'static str {
        match self {
            CrossOrder::Convoy => "cross_convoy",
            CrossOrder::Support => "cross_support",
        }
    }

    fn separator(self) -> &'static str {
        match self {
            CrossOrder::Convoy => " C ",
            CrossOrder::Support => " S ",
        }
    }

    /// Unit the order is given for, e.g. `A LON` for `F NTH C A LON - NWY`.
    fn target(self, order: &str) -> Option<String> {
        let (_, rest) = order.split_once(self.separator())?;
        let mut tokens = rest.split_whitespace();
        Some(format!("{} {}", tokens.next()?, tokens.next()?))
    }
}

/// Count orders of `kind` per (giving agent, receiving agent), keeping only orders given
/// to a unit of another power.
pub fn cross_order_report(kind: CrossOrder, label: &str, games: &[GameRecord]) -> String {
    let mut total = 0usize;
    let mut cross = 0usize;
    let mut pairs: BTreeMap<(String, String), usize> = BTreeMap::new();

    for game in games {
        for phase in &game.phases {
            for (power, orders) in &phase.orders {
                for target in orders.iter().filter_map(|o| kind.target(o)) {
                    total += 1;
                    let Some(owner) = phase.owner_of(&target) else {
                        continue;
                    };
                    if owner == power.as_str() {
                        continue;
                    }
                    cross += 1;
                    let from = game.agent_of(power).unwrap_or("?").to_string();
                    let to = game.agent_of(owner).unwrap_or("?").to_string();
                    *pairs.entry((from, to)).or_default() += 1;
                }
            }
        }
    }

    let ratio = if total == 0 {
        0.0
    } else {
        100.0 * cross as f64 / total as f64
    };
    let mut out = String::new();
    let _ = writeln!(out, "----- {} {label} ({} games) -----", kind.name(), games.len());
    let _ = writeln!(out, "orders: {total}, to other powers: {cross} ({ratio:.1}%)");
    for ((from, to), count) in pairs {
        let _ = writeln!(out, "{from} -> {to}: {count}");
    }
    out
}

pub fn print_cross_convoy_stats(label: &str, games: &[GameRecord]) {
    print!("{}", cross_order_report(CrossOrder::Convoy, label, games));
}

pub fn print_cross_support_stats(label: &str, games: &[GameRecord]) {
    print!("{}", cross_order_report(CrossOrder::Support, label, games));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::tests::sample_record;

    #[test]
    fn order_targets() {
        assert_eq!(
            CrossOrder::Convoy.target("F NTH C A LON - NWY").as_deref(),
            Some("A LON")
        );
        assert_eq!(
            CrossOrder::Support.target("A PAR S A MAR - BUR").as_deref(),
            Some("A MAR")
        );
        assert_eq!(CrossOrder::Support.target("A PAR - BUR"), None);
    }

    #[test]
    fn counts_orders_between_powers() {
        let games = vec![sample_record("g")];

        let support = cross_order_report(CrossOrder::Support, "L", &games);
        assert_eq!(
            support,
            "----- cross_support L (1 games) -----\norders: 1, to other powers: 1 (100.0%)\na -> b: 1\n"
        );

        let convoy = cross_order_report(CrossOrder::Convoy, "L", &games);
        assert!(convoy.contains("b -> b: 1"));
    }

    #[test]
    fn own_units_are_not_cross_orders() {
        let mut game = sample_record("g");
        let phase = &mut game.phases[0];
        phase
            .orders
            .insert("ENGLAND".to_string(), vec!["A LON S A LON".to_string()]);
        let report = cross_order_report(CrossOrder::Support, "L", &[game]);
        assert!(report.contains("orders: 2, to other powers: 1 (50.0%)"));
    }
}

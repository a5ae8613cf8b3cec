//! Game records produced by matches and consumed by the stats collectors.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The seven powers, in seat order.
pub const POWERS: [&str; 7] = [
    "AUSTRIA", "ENGLAND", "FRANCE", "GERMANY", "ITALY", "RUSSIA", "TURKEY",
];

/// Number of seats in a match.
pub const NUM_SEATS: usize = POWERS.len();

/// Supply centers needed for a solo victory.
pub const SOLO_CENTERS: usize = 18;

/// Result of one completed match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRecord {
    /// Unique game identifier, also used for the persisted file name.
    pub id: String,
    /// Rules the game was played with.
    #[serde(default)]
    pub rules: Vec<String>,
    /// One entry per power, in seat order.
    pub powers: Vec<PowerRecord>,
    /// Played phases, in order.
    #[serde(default)]
    pub phases: Vec<PhaseRecord>,
}

/// Which agent played a power and how it ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowerRecord {
    /// Power name (one of [`POWERS`]).
    pub name: String,
    /// Display name of the agent that held the seat.
    pub agent: String,
    /// Supply centers owned at the end of the game.
    pub centers: Vec<String>,
}

/// Orders submitted during one phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseRecord {
    /// Phase name, e.g. `S1901M`.
    pub name: String,
    /// Units per power at the start of the phase, e.g. `A PAR`.
    #[serde(default)]
    pub units: BTreeMap<String, Vec<String>>,
    /// Orders per power, e.g. `F NTH C A LON - NWY`.
    #[serde(default)]
    pub orders: BTreeMap<String, Vec<String>>,
}

impl GameRecord {
    /// Name of the agent playing `power`, if the power is part of the record.
    pub fn agent_of(&self, power: &str) -> Option<&str> {
        self.powers
            .iter()
            .find(|p| p.name == power)
            .map(|p| p.agent.as_str())
    }

    /// Final rank of each power (1 = most centers, ties share the best rank).
    pub fn ranks(&self) -> Vec<(&PowerRecord, usize)> {
        self.powers
            .iter()
            .map(|power| {
                let better = self
                    .powers
                    .iter()
                    .filter(|other| other.centers.len() > power.centers.len())
                    .count();
                (power, better + 1)
            })
            .collect()
    }

    /// Power owning at least [`SOLO_CENTERS`] centers.
    pub fn solo_winner(&self) -> Option<&PowerRecord> {
        self.powers
            .iter()
            .find(|p| p.centers.len() >= SOLO_CENTERS)
    }
}

impl PhaseRecord {
    /// Power owning `unit` (e.g. `A LON`) at the start of this phase.
    pub fn owner_of(&self, unit: &str) -> Option<&str> {
        self.units
            .iter()
            .find(|(_, units)| units.iter().any(|u| u == unit))
            .map(|(power, _)| power.as_str())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// AUSTRIA (agent `a`) supports ENGLAND, FRANCE convoys ENGLAND (both agent `b`).
    pub(crate) fn sample_record(id: &str) -> GameRecord {
        let powers = POWERS
            .iter()
            .enumerate()
            .map(|(seat, name)| PowerRecord {
                name: name.to_string(),
                agent: if seat == 0 { "a" } else { "b" }.to_string(),
                centers: (0..(seat + 1)).map(|i| format!("{name}{i}")).collect(),
            })
            .collect();
        let mut units = BTreeMap::new();
        units.insert("FRANCE".to_string(), vec!["F BRE".to_string()]);
        units.insert("ENGLAND".to_string(), vec!["A LON".to_string()]);
        units.insert("AUSTRIA".to_string(), vec!["A VIE".to_string()]);
        let mut orders = BTreeMap::new();
        orders.insert(
            "AUSTRIA".to_string(),
            vec!["A VIE S A LON".to_string()],
        );
        orders.insert(
            "FRANCE".to_string(),
            vec!["F BRE C A LON - PIC".to_string()],
        );
        orders.insert("ENGLAND".to_string(), vec!["A LON - PIC".to_string()]);
        GameRecord {
            id: id.to_string(),
            rules: vec!["NO_PRESS".to_string()],
            powers,
            phases: vec![PhaseRecord {
                name: "S1901M".to_string(),
                units,
                orders,
            }],
        }
    }

    #[test]
    fn ranks_share_ties() {
        let mut game = sample_record("g");
        game.powers[1].centers = game.powers[0].centers.clone();
        let ranks = game.ranks();
        assert_eq!(ranks[0].1, 6);
        assert_eq!(ranks[1].1, 6);
        assert_eq!(ranks[6].1, 1);
    }

    #[test]
    fn owner_lookup() {
        let game = sample_record("g");
        assert_eq!(game.phases[0].owner_of("A LON"), Some("ENGLAND"));
        assert_eq!(game.phases[0].owner_of("A MOS"), None);
        assert_eq!(game.agent_of("AUSTRIA"), Some("a"));
    }

    #[test]
    fn missing_optional_fields_deserialize() {
        let json = r#"{"id":"x","powers":[]}"#;
        let game: GameRecord = serde_json::from_str(json).unwrap();
        assert!(game.phases.is_empty());
        assert!(game.rules.is_empty());
        assert!(game.solo_winner().is_none());
    }
}

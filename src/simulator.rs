//! Built-in seven-power match simulator.
//!
//! Orders are drawn per unit according to the seat's [`PlayStyle`]; at the end of every
//! year one supply center changes hands, the gaining power being drawn with a weight that
//! grows with its centers and the supports it issued. The game ends on a solo victory or
//! after the configured number of years.

use std::{collections::BTreeMap, sync::Mutex};

use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::{
    agent::{Agent, PlayStyle},
    game::{GameRecord, PhaseRecord, PowerRecord, NUM_SEATS, POWERS, SOLO_CENTERS},
};

const HOME_UNITS: [&[&str]; NUM_SEATS] = [
    &["A VIE", "A BUD", "F TRI"],
    &["F LON", "F EDI", "A LVP"],
    &["F BRE", "A PAR", "A MAR"],
    &["F KIE", "A BER", "A MUN"],
    &["F NAP", "A ROM", "A VEN"],
    &["A WAR", "A MOS", "F SEV", "F STP"],
    &["F ANK", "A CON", "A SMY"],
];

const HOME_CENTERS: [&[&str]; NUM_SEATS] = [
    &["BUD", "TRI", "VIE"],
    &["EDI", "LON", "LVP"],
    &["BRE", "MAR", "PAR"],
    &["BER", "KIE", "MUN"],
    &["NAP", "ROM", "VEN"],
    &["MOS", "SEV", "STP", "WAR"],
    &["ANK", "CON", "SMY"],
];

const NEUTRAL_CENTERS: [&str; 12] = [
    "BEL", "BUL", "DEN", "GRE", "HOL", "NWY", "POR", "RUM", "SER", "SPA", "SWE", "TUN",
];

/// What the simulator needs to know about a seat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatProfile {
    pub agent: String,
    pub style: PlayStyle,
}

impl From<&Agent> for SeatProfile {
    fn from(agent: &Agent) -> Self {
        SeatProfile {
            agent: agent.name.clone(),
            style: agent.style,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum OrderKind {
    Hold,
    Move,
    Support,
    Convoy,
}

impl PlayStyle {
    /// Weights of hold, move, support, convoy.
    fn order_weights(self) -> [u32; 4] {
        match self {
            PlayStyle::Random => [1, 1, 1, 1],
            PlayStyle::Cautious => [3, 2, 4, 1],
        }
    }
}

/// Plays whole matches in-process.
#[derive(Debug)]
pub struct Simulator {
    max_years: u16,
    rng: Mutex<StdRng>,
}

impl Simulator {
    /// Simulator playing at most `max_years` years, seeded with `seed` when given.
    pub fn new(max_years: u16, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Simulator {
            max_years: max_years.max(1),
            rng: Mutex::new(rng),
        }
    }

    /// Play one match. `seats` are given in power order and must hold one entry per power.
    #[instrument(skip_all, fields(seats = seats.len()))]
    pub fn play(&self, seats: &[SeatProfile], rules: &[String]) -> anyhow::Result<GameRecord> {
        if seats.len() != NUM_SEATS {
            anyhow::bail!("expected {NUM_SEATS} seats, got {}", seats.len());
        }
        let mut rng = self.rng.lock().expect("poisoned");
        let rng = &mut *rng;

        let mut centers: Vec<Vec<String>> = HOME_CENTERS
            .iter()
            .map(|home| home.iter().map(|c| c.to_string()).collect())
            .collect();
        let mut neutral: Vec<String> = NEUTRAL_CENTERS.iter().map(|c| c.to_string()).collect();
        let mut phases = vec![];

        let first_year = 1901;
        for year in first_year..first_year + self.max_years {
            let mut supports = [0u32; NUM_SEATS];
            for season in ["S", "F"] {
                let name = format!("{season}{year}M");
                phases.push(play_phase(rng, &name, seats, &centers, &mut supports));
            }
            transfer_center(rng, &mut centers, &mut neutral, &supports);
            if centers.iter().any(|c| c.len() >= SOLO_CENTERS) {
                break;
            }
        }

        let powers = POWERS
            .iter()
            .zip(seats)
            .zip(centers)
            .map(|((name, seat), mut centers)| {
                centers.sort();
                PowerRecord {
                    name: name.to_string(),
                    agent: seat.agent.clone(),
                    centers,
                }
            })
            .collect();

        let record = GameRecord {
            id: format!("{:016x}", rng.gen::<u64>()),
            rules: rules.to_vec(),
            powers,
            phases,
        };
        debug!(game = %record.id, phases = record.phases.len(), "game simulated");
        Ok(record)
    }
}

fn play_phase(
    rng: &mut StdRng,
    name: &str,
    seats: &[SeatProfile],
    centers: &[Vec<String>],
    supports: &mut [u32; NUM_SEATS],
) -> PhaseRecord {
    let alive = |seat: usize| !centers[seat].is_empty();
    let mut units = BTreeMap::new();
    for (seat, power) in POWERS.iter().enumerate().filter(|(seat, _)| alive(*seat)) {
        let list = HOME_UNITS[seat].iter().map(|u| u.to_string()).collect::<Vec<_>>();
        units.insert(power.to_string(), list);
    }
    let all_units = units.values().flatten().cloned().collect::<Vec<_>>();
    let armies = all_units
        .iter()
        .filter(|u| u.starts_with("A "))
        .cloned()
        .collect::<Vec<_>>();
    let destinations = HOME_CENTERS
        .iter()
        .flat_map(|c| c.iter())
        .chain(NEUTRAL_CENTERS.iter())
        .copied()
        .collect::<Vec<_>>();

    let mut orders = BTreeMap::new();
    for (seat, power) in POWERS.iter().enumerate().filter(|(seat, _)| alive(*seat)) {
        let weights = seats[seat].style.order_weights();
        let mut power_orders = vec![];
        for unit in HOME_UNITS[seat] {
            let kind = pick_kind(rng, weights);
            let destination = destinations.choose(rng).copied().unwrap_or("PAR");
            let order = match kind {
                OrderKind::Move => format!("{unit} - {destination}"),
                OrderKind::Support => {
                    let others = all_units.iter().filter(|u| u != unit).collect::<Vec<_>>();
                    match others.choose(rng) {
                        Some(target) => {
                            supports[seat] += 1;
                            format!("{unit} S {target}")
                        }
                        None => format!("{unit} H"),
                    }
                }
                OrderKind::Convoy if unit.starts_with("F ") => match armies.choose(rng) {
                    Some(army) => format!("{unit} C {army} - {destination}"),
                    None => format!("{unit} H"),
                },
                OrderKind::Convoy | OrderKind::Hold => format!("{unit} H"),
            };
            power_orders.push(order);
        }
        orders.insert(power.to_string(), power_orders);
    }

    PhaseRecord {
        name: name.to_string(),
        units,
        orders,
    }
}

fn pick_kind(rng: &mut StdRng, weights: [u32; 4]) -> OrderKind {
    const KINDS: [OrderKind; 4] = [
        OrderKind::Hold,
        OrderKind::Move,
        OrderKind::Support,
        OrderKind::Convoy,
    ];
    let total: u32 = weights.iter().sum();
    let mut roll = rng.gen_range(0..total);
    for (kind, weight) in KINDS.into_iter().zip(weights) {
        if roll < weight {
            return kind;
        }
        roll -= weight;
    }
    OrderKind::Hold
}

/// Move one center to a power drawn proportionally to its centers plus issued supports.
fn transfer_center(
    rng: &mut StdRng,
    centers: &mut [Vec<String>],
    neutral: &mut Vec<String>,
    supports: &[u32; NUM_SEATS],
) {
    let weights = centers
        .iter()
        .zip(supports)
        .map(|(c, s)| if c.is_empty() { 0 } else { c.len() as u32 + s })
        .collect::<Vec<_>>();
    let total: u32 = weights.iter().sum();
    if total == 0 {
        return;
    }
    let mut roll = rng.gen_range(0..total);
    let gainer = weights
        .iter()
        .position(|&w| {
            if roll < w {
                true
            } else {
                roll -= w;
                false
            }
        })
        .unwrap_or(0);

    let victims = (0..centers.len())
        .filter(|&seat| seat != gainer && !centers[seat].is_empty())
        .collect::<Vec<_>>();
    let neutral_share = neutral.len() as f64 / (neutral.len() + victims.len()).max(1) as f64;
    let from_neutral = !neutral.is_empty() && rng.gen_bool(neutral_share);

    let center = if from_neutral {
        let idx = rng.gen_range(0..neutral.len());
        Some(neutral.swap_remove(idx))
    } else {
        victims.choose(rng).map(|&victim| {
            let idx = rng.gen_range(0..centers[victim].len());
            centers[victim].swap_remove(idx)
        })
    };
    if let Some(center) = center {
        centers[gainer].push(center);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seats() -> Vec<SeatProfile> {
        let mut seats = vec![SeatProfile {
            agent: "dumbbot".to_string(),
            style: PlayStyle::Cautious,
        }];
        seats.extend((1..NUM_SEATS).map(|_| SeatProfile {
            agent: "random".to_string(),
            style: PlayStyle::Random,
        }));
        seats
    }

    #[test]
    fn plays_a_full_game() {
        let sim = Simulator::new(5, Some(1));
        let rules = vec!["NO_PRESS".to_string()];
        let game = sim.play(&seats(), &rules).unwrap();

        assert_eq!(game.powers.len(), NUM_SEATS);
        assert_eq!(game.powers[0].agent, "dumbbot");
        assert_eq!(game.powers[3].agent, "random");
        assert_eq!(game.rules, rules);
        assert!(!game.phases.is_empty() && game.phases.len() <= 10);
        assert_eq!(game.phases[0].name, "S1901M");

        // one center moves per year, none is lost
        let owned: usize = game.powers.iter().map(|p| p.centers.len()).sum();
        assert!(owned >= 22 && owned <= 34);
    }

    #[test]
    fn seeded_simulators_agree() {
        let a = Simulator::new(3, Some(42)).play(&seats(), &[]).unwrap();
        let b = Simulator::new(3, Some(42)).play(&seats(), &[]).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn rejects_wrong_seat_count() {
        let sim = Simulator::new(3, Some(0));
        assert!(sim.play(&seats()[..3], &[]).is_err());
    }

    #[test]
    fn orders_reference_existing_units() {
        let game = Simulator::new(2, Some(7)).play(&seats(), &[]).unwrap();
        for phase in &game.phases {
            for (power, orders) in &phase.orders {
                assert_eq!(orders.len(), phase.units[power].len());
                for order in orders {
                    let unit = &order[..5];
                    assert_eq!(phase.owner_of(unit), Some(power.as_str()));
                }
            }
        }
    }
}

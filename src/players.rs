use std::{fmt::Display, sync::Arc};

use crate::{
    agent::Agent,
    game::{NUM_SEATS, POWERS},
    protocol::Connection,
    simulator::SeatProfile,
};

/// An agent in a seat, with the connection it plays through if any.
///
/// `connection == None` means the seat is simulated locally, without wire traffic.
#[derive(Debug, Clone)]
pub struct Seat {
    pub agent: Arc<Agent>,
    pub connection: Option<Arc<Connection>>,
}

/// The seven seats of a match: the subject in seat 0, the opponent in every other seat.
#[derive(Debug, Clone)]
pub struct PlayerSlot {
    seats: Vec<Seat>,
}

impl PlayerSlot {
    pub fn new(subject: Arc<Agent>, opponent: Arc<Agent>) -> Self {
        let mut seats = Vec::with_capacity(NUM_SEATS);
        seats.push(Seat {
            agent: subject,
            connection: None,
        });
        seats.extend((1..NUM_SEATS).map(|_| Seat {
            agent: opponent.clone(),
            connection: None,
        }));
        PlayerSlot { seats }
    }

    pub fn seats(&self) -> &[Seat] {
        &self.seats
    }

    /// Index of the first protocol-capable seat, scanning from seat 0.
    pub fn first_protocol_seat(&self) -> Option<usize> {
        self.seats
            .iter()
            .position(|seat| seat.agent.is_protocol_capable())
    }

    /// Give `connection` to `seat`. Any connection previously held by another seat is dropped,
    /// so at most one seat is ever connected.
    pub fn attach(&mut self, seat: usize, connection: Connection) {
        for s in self.seats.iter_mut() {
            s.connection = None;
        }
        self.seats[seat].connection = Some(Arc::new(connection));
    }

    /// The seat issuing remote calls, if any.
    pub fn connected_seat(&self) -> Option<(usize, &Seat)> {
        self.seats
            .iter()
            .enumerate()
            .find(|(_, seat)| seat.connection.is_some())
    }

    pub fn profiles(&self) -> Vec<SeatProfile> {
        self.seats
            .iter()
            .map(|seat| SeatProfile::from(seat.agent.as_ref()))
            .collect()
    }
}

/// `1[subject]v6[opponent]`
impl Display for PlayerSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let subject = &self.seats[0].agent.name;
        let opponent = &self.seats[NUM_SEATS - 1].agent.name;
        write!(f, "1[{subject}]v{}[{opponent}]", POWERS.len() - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{Capability, PlayStyle};

    fn agent(name: &str, capability: Capability) -> Arc<Agent> {
        Arc::new(Agent::new(name, capability, PlayStyle::Random))
    }

    #[test]
    fn subject_takes_first_seat() {
        let slot = PlayerSlot::new(
            agent("dumbbot", Capability::Local),
            agent("random", Capability::Local),
        );
        assert_eq!(slot.seats().len(), 7);
        assert_eq!(slot.seats()[0].agent.name, "dumbbot");
        assert!(slot.seats()[1..].iter().all(|s| s.agent.name == "random"));
        assert_eq!(slot.to_string(), "1[dumbbot]v6[random]");
        assert!(slot.first_protocol_seat().is_none());
        assert!(slot.connected_seat().is_none());
    }

    #[test]
    fn first_protocol_seat_scans_left_to_right() {
        let slot = PlayerSlot::new(
            agent("dumbbot", Capability::Local),
            agent("daide_random", Capability::Protocol),
        );
        assert_eq!(slot.first_protocol_seat(), Some(1));

        let slot = PlayerSlot::new(
            agent("daide_dumbbot", Capability::Protocol),
            agent("daide_random", Capability::Protocol),
        );
        assert_eq!(slot.first_protocol_seat(), Some(0));
    }
}

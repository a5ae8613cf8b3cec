use std::{fmt::Display, hash::Hash};

use serde::{Deserialize, Serialize};

/// How an agent takes part in a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Capability {
    /// Invoked in-process by the local simulator.
    Local,
    /// Talks to a game server over a wire connection.
    Protocol,
}

/// Order selection tendency, used by the built-in simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayStyle {
    /// Uniformly random orders.
    Random,
    /// Favors holds and supports, expands steadily.
    Cautious,
}

/// A provisioned agent. Shared by `Arc` into every seat it occupies.
#[derive(Debug)]
pub struct Agent {
    pub name: String,
    pub capability: Capability,
    pub style: PlayStyle,
}

impl PartialEq for Agent {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.capability == other.capability
    }
}

impl Eq for Agent {}

impl Hash for Agent {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.capability.hash(state);
    }
}

impl Display for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl Agent {
    pub fn new(name: impl Into<String>, capability: Capability, style: PlayStyle) -> Agent {
        Agent {
            name: name.into(),
            capability,
            style,
        }
    }

    pub fn is_protocol_capable(&self) -> bool {
        self.capability == Capability::Protocol
    }
}

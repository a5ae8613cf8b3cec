use std::sync::Arc;

use async_trait::async_trait;

use super::AgentFactory;
use crate::{
    agent::{Agent, Capability, PlayStyle},
    port_guard::PortSet,
};

/// In-process agent played by the local simulator.
#[derive(Debug, Clone)]
pub struct LocalAgentFactory {
    name: String,
    style: PlayStyle,
}

impl LocalAgentFactory {
    pub fn random(name: impl Into<String>) -> Self {
        LocalAgentFactory {
            name: name.into(),
            style: PlayStyle::Random,
        }
    }

    pub fn cautious(name: impl Into<String>) -> Self {
        LocalAgentFactory {
            name: name.into(),
            style: PlayStyle::Cautious,
        }
    }
}

#[async_trait]
impl AgentFactory for LocalAgentFactory {
    async fn make(&self, _ports: &PortSet) -> anyhow::Result<Arc<Agent>> {
        Ok(Arc::new(Agent::new(
            self.name.clone(),
            Capability::Local,
            self.style,
        )))
    }
}

/// Agent that plays through the game server, over a wire connection.
#[derive(Debug, Clone)]
pub struct DaideAgentFactory {
    name: String,
    style: PlayStyle,
}

impl DaideAgentFactory {
    pub fn random(name: impl Into<String>) -> Self {
        DaideAgentFactory {
            name: name.into(),
            style: PlayStyle::Random,
        }
    }

    pub fn cautious(name: impl Into<String>) -> Self {
        DaideAgentFactory {
            name: name.into(),
            style: PlayStyle::Cautious,
        }
    }
}

#[async_trait]
impl AgentFactory for DaideAgentFactory {
    async fn make(&self, _ports: &PortSet) -> anyhow::Result<Arc<Agent>> {
        Ok(Arc::new(Agent::new(
            self.name.clone(),
            Capability::Protocol,
            self.style,
        )))
    }
}

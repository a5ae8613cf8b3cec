//! Resolution of agent identifiers into live agents.
//!
//! An [`AgentRegistry`] maps identifiers to asynchronous [`AgentFactory`]s. Factories may
//! perform network or process setup; any port they open must be recorded in the
//! [`PortSet`] they receive so teardown can release it.

use std::{collections::BTreeMap, sync::Arc};

use async_trait::async_trait;
use tracing::{info, instrument};

use crate::{
    agent::Agent,
    error::{BenchError, Result},
    port_guard::PortSet,
};

mod builtin;

pub use builtin::{DaideAgentFactory, LocalAgentFactory};

/// Produces a live agent.
#[async_trait]
pub trait AgentFactory: Send + Sync {
    /// Build the agent. May suspend while the agent is being set up.
    async fn make(&self, ports: &PortSet) -> anyhow::Result<Arc<Agent>>;
}

/// Identifier → factory table.
#[derive(Clone, Default)]
pub struct AgentRegistry {
    factories: BTreeMap<String, Arc<dyn AgentFactory>>,
    ports: PortSet,
}

impl AgentRegistry {
    /// Empty registry recording opened ports into `ports`.
    pub fn new(ports: PortSet) -> Self {
        AgentRegistry {
            factories: BTreeMap::new(),
            ports,
        }
    }

    /// Registry with the built-in agents: `random`, `dumbbot`, `daide_random`, `daide_dumbbot`.
    pub fn builtin(ports: PortSet) -> Self {
        Self::new(ports)
            .with_factory("random", LocalAgentFactory::random("random"))
            .with_factory("dumbbot", LocalAgentFactory::cautious("dumbbot"))
            .with_factory("daide_random", DaideAgentFactory::random("daide_random"))
            .with_factory("daide_dumbbot", DaideAgentFactory::cautious("daide_dumbbot"))
    }

    /// Register (or replace) the factory of `name`.
    pub fn with_factory(mut self, name: impl Into<String>, factory: impl AgentFactory + 'static) -> Self {
        self.factories.insert(name.into(), Arc::new(factory));
        self
    }

    /// Registered identifiers, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn ports(&self) -> &PortSet {
        &self.ports
    }

    /// Build the agent registered as `name`.
    #[instrument(skip(self))]
    pub async fn resolve(&self, name: &str) -> Result<Arc<Agent>> {
        let factory = self.factories.get(name).ok_or_else(|| {
            BenchError::configuration(format!(
                "unknown agent '{name}', expected one of: {}",
                self.names().join(" | ")
            ))
        })?;
        let agent = factory
            .make(&self.ports)
            .await
            .map_err(|source| BenchError::Provisioning {
                agent: name.to_string(),
                source,
            })?;
        info!(agent = %agent, capability = ?agent.capability, "agent ready");
        Ok(agent)
    }

    /// Resolve the subject and opponent agents. Identical names resolve once and share the agent.
    pub async fn provision(&self, subject: &str, opponent: &str) -> Result<(Arc<Agent>, Arc<Agent>)> {
        let first = self.resolve(subject).await?;
        let second = if subject == opponent {
            first.clone()
        } else {
            self.resolve(opponent).await?
        };
        Ok((first, second))
    }
}

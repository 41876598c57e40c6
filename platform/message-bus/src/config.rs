//! Broker configuration parsed from environment variables

use std::env;

use crate::InMemoryTransport;

/// Which transport a service connects to and where
///
/// Config-driven swap between NATS (production) and in-memory (dev/test).
/// The in-memory variant carries the bus instance so that several clients in
/// one process can share it.
#[derive(Debug, Clone)]
pub enum BrokerConfig {
    /// NATS JetStream at the given URL
    Nats { url: String },
    /// Process-local bus, shared by cloning
    InMemory(InMemoryTransport),
}

impl BrokerConfig {
    /// Read `BUS_TYPE` (`inmemory` | `nats`) and `NATS_URL` from the environment
    pub fn from_env() -> Result<Self, String> {
        let bus_type = env::var("BUS_TYPE").unwrap_or_else(|_| "inmemory".to_string());

        match bus_type.to_lowercase().as_str() {
            "inmemory" => Ok(BrokerConfig::InMemory(InMemoryTransport::new())),
            "nats" => {
                let url = env::var("NATS_URL")
                    .unwrap_or_else(|_| "nats://localhost:4222".to_string());
                Ok(BrokerConfig::Nats { url })
            }
            other => Err(format!(
                "Invalid BUS_TYPE: {}. Must be 'inmemory' or 'nats'",
                other
            )),
        }
    }
}

//! Configured chain endpoints.
//!
//! The registry is the allowlist of networks the ledger will talk to.
//! A transaction claiming a chain id outside the registry is rejected
//! before any RPC traffic happens.

use std::collections::HashMap;

use serde::Deserialize;

use crate::config::GatewayConfig;
use crate::domain::{ChainAddress, ChainId};
use crate::error::LedgerError;

/// One configured network: id, display name, RPC endpoint, and the
/// pool factory deployed on it.
#[derive(Debug, Clone, Deserialize)]
pub struct ChainEndpoint {
    /// Chain id as a decimal string.
    pub chain_id: ChainId,
    /// Human-readable network name (e.g. `"polygon"`).
    pub name: String,
    /// JSON-RPC endpoint URL.
    pub rpc_url: String,
    /// Pool factory contract address on this network.
    pub factory_address: ChainAddress,
}

/// Lookup table from chain id to [`ChainEndpoint`].
#[derive(Debug, Clone, Default)]
pub struct ChainRegistry {
    endpoints: HashMap<ChainId, ChainEndpoint>,
}

impl ChainRegistry {
    /// Builds a registry from a list of endpoints.
    ///
    /// Later entries with a duplicate chain id replace earlier ones.
    #[must_use]
    pub fn new(endpoints: Vec<ChainEndpoint>) -> Self {
        Self {
            endpoints: endpoints
                .into_iter()
                .map(|e| (e.chain_id.clone(), e))
                .collect(),
        }
    }

    /// Parses a registry from a JSON array of endpoint objects.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InvalidRequest`] when the document is not
    /// valid endpoint JSON.
    pub fn from_json(json: &str) -> Result<Self, LedgerError> {
        let endpoints: Vec<ChainEndpoint> = serde_json::from_str(json)
            .map_err(|e| LedgerError::InvalidRequest(format!("invalid chain registry: {e}")))?;
        Ok(Self::new(endpoints))
    }

    /// Loads the registry per configuration: inline JSON wins, then a
    /// JSON file, then an empty registry.
    ///
    /// # Errors
    ///
    /// Returns an error when the configured document cannot be read or
    /// parsed.
    pub fn from_config(config: &GatewayConfig) -> Result<Self, LedgerError> {
        if let Some(json) = &config.chain_registry_json {
            return Self::from_json(json);
        }
        if let Some(path) = &config.chain_registry_path {
            let json = std::fs::read_to_string(path).map_err(|e| {
                LedgerError::InvalidRequest(format!("cannot read chain registry {path}: {e}"))
            })?;
            return Self::from_json(&json);
        }
        Ok(Self::default())
    }

    /// Looks up the endpoint for a chain id.
    #[must_use]
    pub fn get(&self, chain_id: &ChainId) -> Option<&ChainEndpoint> {
        self.endpoints.get(chain_id)
    }

    /// Looks up the endpoint or fails with [`LedgerError::UnsupportedChain`].
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::UnsupportedChain`] when the chain id has
    /// no configured endpoint.
    pub fn require(&self, chain_id: &ChainId) -> Result<&ChainEndpoint, LedgerError> {
        self.get(chain_id)
            .ok_or_else(|| LedgerError::UnsupportedChain(chain_id.clone()))
    }

    /// Returns all configured endpoints in unspecified order.
    pub fn endpoints(&self) -> impl Iterator<Item = &ChainEndpoint> {
        self.endpoints.values()
    }

    /// Number of configured networks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    /// `true` when no networks are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    const REGISTRY_JSON: &str = r#"[
        {
            "chain_id": "137",
            "name": "polygon",
            "rpc_url": "https://polygon-rpc.example",
            "factory_address": "0x1111111111111111111111111111111111111111"
        },
        {
            "chain_id": "8453",
            "name": "base",
            "rpc_url": "https://base-rpc.example",
            "factory_address": "0x2222222222222222222222222222222222222222"
        }
    ]"#;

    #[test]
    fn parses_endpoints_from_json() {
        let Ok(registry) = ChainRegistry::from_json(REGISTRY_JSON) else {
            panic!("valid registry json");
        };
        assert_eq!(registry.len(), 2);
        let Some(endpoint) = registry.get(&ChainId::from(137)) else {
            panic!("polygon endpoint present");
        };
        assert_eq!(endpoint.name, "polygon");
        assert_eq!(
            endpoint.factory_address.as_str(),
            "0x1111111111111111111111111111111111111111"
        );
    }

    #[test]
    fn unknown_chain_is_unsupported() {
        let Ok(registry) = ChainRegistry::from_json(REGISTRY_JSON) else {
            panic!("valid registry json");
        };
        let err = registry.require(&ChainId::from(1));
        assert!(matches!(err, Err(LedgerError::UnsupportedChain(_))));
    }

    #[test]
    fn rejects_malformed_registry() {
        assert!(ChainRegistry::from_json("not json").is_err());
        assert!(ChainRegistry::from_json(r#"[{"chain_id": "x"}]"#).is_err());
    }
}

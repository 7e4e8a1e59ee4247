use alloy::primitives::Address;
use serde::Deserialize;

/// Deployment configuration for a settlement validator, loaded from TOML.
///
/// Supplied by the deployment tooling: which chain the validator lives on,
/// the signer it transacts with, and the collaborator contract addresses.
#[derive(Debug, Deserialize)]
pub struct ValidatorConfig {
    pub chain: ChainConfig,
    pub contracts: ContractsConfig,
}

#[derive(Debug, Deserialize)]
pub struct ChainConfig {
    /// Chain identifier bound into the signing domain separator.
    pub chain_id: u64,
    pub rpc_url: String,
    pub signer_private_key: String,
}

#[derive(Debug, Deserialize)]
pub struct ContractsConfig {
    /// The validator's own on-chain identity, bound into the domain
    /// separator alongside the chain id.
    pub validator: Address,
    /// The proof registry collaborator.
    pub registry: Address,
    /// Confidential-asset tokens the validator may settle between.
    pub tokens: Vec<Address>,
}

/// Errors from config loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    Validation(String),
}

impl ValidatorConfig {
    /// Load and validate a config from a TOML file.
    pub fn load(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chain.chain_id == 0 {
            return Err(ConfigError::Validation("chain.chain_id must be non-zero".into()));
        }

        if self.contracts.tokens.len() < 2 {
            return Err(ConfigError::Validation(
                "contracts.tokens needs at least two entries to settle a linked trade".into(),
            ));
        }

        let mut seen = std::collections::HashSet::new();
        for token in &self.contracts.tokens {
            if !seen.insert(token) {
                return Err(ConfigError::Validation(format!(
                    "contracts.tokens lists {token} more than once"
                )));
            }
        }

        Ok(())
    }
}

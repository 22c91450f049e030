use alloy_primitives::Address;
use anyhow::Context;
use config::{ConfigError, Map, Source, Value, ValueKind};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use ballot_common::entities::CredentialKey;
use ballot_common::{StdResult, DEFAULT_CIRCUIT_DEPTH};

use crate::prover::CircuitArtifact;
use crate::submission::SubmissionSettings;

/// Prefix of the environment variables overriding the configuration.
pub const ENVIRONMENT_PREFIX: &str = "BALLOT";

/// Client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    /// Json-rpc endpoint of a node of the chain hosting the voting contract
    pub rpc_endpoint: String,

    /// Address of the voting contract
    pub contract_address: Address,

    /// Depth of the commitment tree expected by the vote circuit `[default: 16]`
    pub circuit_depth: usize,

    /// Maximum wait for the receipt of a vote operation, in milliseconds `[default: 120000]`
    pub receipt_timeout_ms: u64,

    /// Pause before the nullifier status is queried after a failed receipt wait, in
    /// milliseconds `[default: 5000]`
    pub reconciliation_grace_ms: u64,

    /// Maximum duration of a nullifier status query, in milliseconds `[default: 10000]`
    pub reconciliation_query_timeout_ms: u64,

    /// Timeout of the json-rpc http requests, in milliseconds `[default: 10000]`
    pub rpc_timeout_ms: u64,

    /// Directory where the credential material is stored
    pub data_stores_directory: PathBuf,

    /// Path of the compiled vote circuit
    pub circuit_artifact_path: PathBuf,
}

impl Configuration {
    /// Load the configuration from its defaults, an optional file and the `BALLOT_` prefixed
    /// environment variables, in increasing order of precedence.
    pub fn load(config_file: Option<&Path>) -> StdResult<Self> {
        let mut builder = config::Config::builder().add_source(DefaultConfiguration::default());
        if let Some(path) = config_file {
            builder = builder.add_source(config::File::from(path));
        }

        builder
            .add_source(config::Environment::with_prefix(ENVIRONMENT_PREFIX))
            .build()
            .with_context(|| "Configuration build error")?
            .try_deserialize()
            .with_context(|| "Configuration deserialize error")
    }

    /// Durations bounding the waits of a vote submission.
    pub fn submission_settings(&self) -> SubmissionSettings {
        SubmissionSettings {
            receipt_timeout: Duration::from_millis(self.receipt_timeout_ms),
            reconciliation_grace: Duration::from_millis(self.reconciliation_grace_ms),
            reconciliation_query_timeout: Duration::from_millis(
                self.reconciliation_query_timeout_ms,
            ),
        }
    }

    /// Timeout of the json-rpc http requests.
    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_millis(self.rpc_timeout_ms)
    }

    /// Key of the credential material of a voter on the configured contract.
    pub fn credential_key(&self, voter_address: Address) -> CredentialKey {
        CredentialKey::new(self.contract_address, voter_address)
    }

    /// Load the compiled vote circuit.
    pub fn load_circuit_artifact(&self) -> StdResult<CircuitArtifact> {
        CircuitArtifact::from_file(&self.circuit_artifact_path).with_context(|| {
            format!(
                "Configuration: can not load circuit artifact '{}'",
                self.circuit_artifact_path.display()
            )
        })
    }
}

/// Default configuration with all the default values for configurations.
#[derive(Debug, Clone)]
pub struct DefaultConfiguration {
    /// Depth of the commitment tree expected by the vote circuit
    pub circuit_depth: u64,

    /// Maximum wait for the receipt of a vote operation, in milliseconds
    pub receipt_timeout_ms: u64,

    /// Pause before the reconciliation query, in milliseconds
    pub reconciliation_grace_ms: u64,

    /// Maximum duration of a nullifier status query, in milliseconds
    pub reconciliation_query_timeout_ms: u64,

    /// Timeout of the json-rpc http requests, in milliseconds
    pub rpc_timeout_ms: u64,

    /// Directory where the credential material is stored
    pub data_stores_directory: String,
}

impl DefaultConfiguration {
    fn namespace() -> String {
        "default configuration".to_string()
    }
}

impl Default for DefaultConfiguration {
    fn default() -> Self {
        Self {
            circuit_depth: DEFAULT_CIRCUIT_DEPTH as u64,
            receipt_timeout_ms: 120_000,
            reconciliation_grace_ms: 5_000,
            reconciliation_query_timeout_ms: 10_000,
            rpc_timeout_ms: 10_000,
            data_stores_directory: "./ballot-stores".to_string(),
        }
    }
}

impl Source for DefaultConfiguration {
    fn clone_into_box(&self) -> Box<dyn Source + Send + Sync> {
        Box::new(self.clone())
    }

    fn collect(&self) -> Result<Map<String, Value>, ConfigError> {
        fn into_value<V: Into<ValueKind>>(value: V) -> Value {
            Value::new(Some(&DefaultConfiguration::namespace()), value.into())
        }
        let mut result = Map::new();
        let myself = self.clone();

        result.insert(
            "circuit_depth".to_string(),
            into_value(myself.circuit_depth),
        );
        result.insert(
            "receipt_timeout_ms".to_string(),
            into_value(myself.receipt_timeout_ms),
        );
        result.insert(
            "reconciliation_grace_ms".to_string(),
            into_value(myself.reconciliation_grace_ms),
        );
        result.insert(
            "reconciliation_query_timeout_ms".to_string(),
            into_value(myself.reconciliation_query_timeout_ms),
        );
        result.insert(
            "rpc_timeout_ms".to_string(),
            into_value(myself.rpc_timeout_ms),
        );
        result.insert(
            "data_stores_directory".to_string(),
            into_value(myself.data_stores_directory),
        );

        Ok(result)
    }
}

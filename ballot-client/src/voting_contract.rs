//! Binding to the voting contract: call encoding and read access.

use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_sol_types::{sol, SolCall};
use anyhow::{anyhow, Context};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use slog::{debug, Logger};
use std::time::Duration;
use thiserror::Error;

use ballot_common::entities::{FieldElement, TreeSettings, VoteProof, VoterStatus};
use ballot_common::logging::LoggerExtensions;
use ballot_common::StdResult;

#[cfg(test)]
use mockall::automock;

sol! {
    /// Interface of the anonymous voting contract.
    interface IVoting {
        function vote(bytes proof, bytes32 nullifierHash, bytes32 root, bytes32 vote, bytes32 depth) external;
        function nullifierUsed(bytes32 nullifierHash) external view returns (bool used);
        function getVotingData() external view returns (string question, address owner, uint256 yesVotes, uint256 noVotes, uint256 size, uint256 depth, uint256 root);
        function getVoterData(address voter) external view returns (bool isVoter, bool hasRegistered);
    }
}

/// Encoding of the calls to the voting contract.
pub struct VoteCallEncoder;

impl VoteCallEncoder {
    /// Encode the `vote` call: the proof bytes unmodified followed by the public inputs in
    /// their contract order.
    pub fn encode_vote(proof: &VoteProof) -> Bytes {
        let inputs = proof.public_inputs;
        let call = IVoting::voteCall {
            proof: Bytes::from(proof.proof_bytes.clone()),
            nullifierHash: Self::to_b256(&inputs.nullifier_hash),
            root: Self::to_b256(&inputs.root),
            vote: Self::to_b256(&inputs.vote),
            depth: Self::to_b256(&inputs.depth),
        };

        call.abi_encode().into()
    }

    /// Encode the `nullifierUsed` query.
    pub fn encode_nullifier_used(nullifier_hash: &FieldElement) -> Bytes {
        IVoting::nullifierUsedCall {
            nullifierHash: Self::to_b256(nullifier_hash),
        }
        .abi_encode()
        .into()
    }

    fn to_b256(value: &FieldElement) -> B256 {
        B256::from(value.to_bytes32())
    }
}

/// [VotingContractReader] errors raised by the json-rpc implementation.
#[derive(Debug, Error)]
pub enum VotingContractError {
    /// The node could not be reached or answered with an http error.
    #[error("json-rpc transport error")]
    Transport(#[source] reqwest::Error),

    /// The node answered with a json-rpc error.
    #[error("json-rpc error {code}: {message}")]
    Rpc {
        /// Json-rpc error code
        code: i64,
        /// Json-rpc error message
        message: String,
    },

    /// The node answer could not be decoded.
    #[error("invalid json-rpc answer: {0}")]
    InvalidResponse(String),
}

/// Read access to the state of the voting contract.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait VotingContractReader: Sync + Send {
    /// Current root and depth of the commitment tree.
    async fn tree_settings(&self) -> StdResult<TreeSettings>;

    /// Registration state of a voter wallet.
    async fn voter_status(&self, voter: Address) -> StdResult<VoterStatus>;

    /// Returns `true` if the nullifier hash was already spent by a vote.
    async fn is_nullifier_used(&self, nullifier_hash: FieldElement) -> StdResult<bool>;
}

#[derive(Debug, Deserialize)]
struct JsonRpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    result: Option<String>,
    error: Option<JsonRpcErrorObject>,
}

/// [VotingContractReader] using `eth_call` on a json-rpc node.
pub struct JsonRpcVotingContractReader {
    endpoint: String,
    contract_address: Address,
    http_client: Client,
    logger: Logger,
}

impl JsonRpcVotingContractReader {
    /// JsonRpcVotingContractReader factory
    pub fn new(
        endpoint: &str,
        contract_address: Address,
        timeout: Duration,
        logger: Logger,
    ) -> StdResult<Self> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .with_context(|| "Building http client for JsonRpcVotingContractReader failed")?;

        Ok(Self {
            endpoint: endpoint.to_string(),
            contract_address,
            http_client,
            logger: logger.new_with_component_name::<Self>(),
        })
    }

    async fn eth_call(&self, method: &str, call_data: Bytes) -> Result<Vec<u8>, VotingContractError> {
        debug!(self.logger, "eth_call"; "method" => method, "contract" => %self.contract_address);
        let request = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "eth_call",
            "params": [
                { "to": self.contract_address, "data": call_data },
                "latest"
            ]
        });

        let response: JsonRpcResponse = self
            .http_client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(VotingContractError::Transport)?
            .json()
            .await
            .map_err(VotingContractError::Transport)?;

        match (response.result, response.error) {
            (_, Some(error)) => Err(VotingContractError::Rpc {
                code: error.code,
                message: error.message,
            }),
            (Some(result), None) => hex::decode(result.trim_start_matches("0x"))
                .map_err(|e| VotingContractError::InvalidResponse(e.to_string())),
            (None, None) => Err(VotingContractError::InvalidResponse(
                "neither result nor error in the answer".to_string(),
            )),
        }
    }

    fn u256_to_field(value: U256) -> StdResult<FieldElement> {
        Ok(FieldElement::from_bytes32(&value.to_be_bytes::<32>())?)
    }
}

#[async_trait]
impl VotingContractReader for JsonRpcVotingContractReader {
    async fn tree_settings(&self) -> StdResult<TreeSettings> {
        let output = self
            .eth_call(
                "getVotingData",
                IVoting::getVotingDataCall {}.abi_encode().into(),
            )
            .await
            .with_context(|| "Could not read the voting data")?;
        let voting_data = IVoting::getVotingDataCall::abi_decode_returns(&output, true)
            .with_context(|| "Could not decode the voting data")?;
        let depth = u64::try_from(voting_data.depth)
            .map_err(|_| anyhow!("tree depth {} does not fit in 64 bits", voting_data.depth))?;

        Ok(TreeSettings {
            root: Self::u256_to_field(voting_data.root)
                .with_context(|| "Invalid tree root in the voting data")?,
            depth,
        })
    }

    async fn voter_status(&self, voter: Address) -> StdResult<VoterStatus> {
        let output = self
            .eth_call(
                "getVoterData",
                IVoting::getVoterDataCall { voter }.abi_encode().into(),
            )
            .await
            .with_context(|| format!("Could not read the voter data of '{voter}'"))?;
        let voter_data = IVoting::getVoterDataCall::abi_decode_returns(&output, true)
            .with_context(|| "Could not decode the voter data")?;

        Ok(VoterStatus {
            is_registered_voter: voter_data.isVoter,
            has_registered: voter_data.hasRegistered,
        })
    }

    async fn is_nullifier_used(&self, nullifier_hash: FieldElement) -> StdResult<bool> {
        let output = self
            .eth_call(
                "nullifierUsed",
                VoteCallEncoder::encode_nullifier_used(&nullifier_hash),
            )
            .await
            .with_context(|| format!("Could not query the nullifier '{nullifier_hash}'"))?;
        let used = IVoting::nullifierUsedCall::abi_decode_returns(&output, true)
            .with_context(|| "Could not decode the nullifier status")?;

        Ok(used.used)
    }
}

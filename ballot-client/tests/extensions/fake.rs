use alloy_primitives::{Address, Bytes};
use anyhow::anyhow;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ballot_client::witness_builder::WitnessInput;
use ballot_client::{
    CircuitArtifact, OperationHandle, OperationReceipt, ProvingBackend, RawProof,
    SponsoredAccount, SponsoredAccountProvider, VotingContractReader,
};
use ballot_common::entities::{FieldElement, TreeSettings, VoterStatus};
use ballot_common::StdResult;

/// Prover answering with the public inputs of the witness.
pub struct EchoProver;

#[async_trait]
impl ProvingBackend for EchoProver {
    async fn prove(&self, witness: &WitnessInput, _circuit: &CircuitArtifact) -> StdResult<RawProof> {
        let public_inputs = vec![
            FieldElement::parse(&witness.nullifier_hash)?,
            FieldElement::parse(&witness.root)?,
            FieldElement::from_bool(witness.vote),
            FieldElement::parse(&witness.depth)?,
        ];

        Ok(RawProof {
            proof: format!("proof-of-leaf-{}", witness.index).into_bytes(),
            public_inputs,
        })
    }
}

/// In memory voting contract.
pub struct FakeVotingContract {
    tree_settings: TreeSettings,
    spent_nullifiers: Mutex<HashSet<FieldElement>>,
    recorded_votes: Mutex<Vec<Bytes>>,
}

impl FakeVotingContract {
    pub fn new(tree_settings: TreeSettings) -> Arc<Self> {
        Arc::new(Self {
            tree_settings,
            spent_nullifiers: Mutex::new(HashSet::new()),
            recorded_votes: Mutex::new(vec![]),
        })
    }

    /// Execute an encoded `vote` call: its nullifier hash is the second head word.
    pub fn execute_vote(&self, call_data: &Bytes) -> StdResult<()> {
        let word: [u8; 32] = call_data
            .get(36..68)
            .and_then(|bytes| bytes.try_into().ok())
            .ok_or(anyhow!("call data too short"))?;
        let nullifier_hash = FieldElement::from_bytes32(&word)?;

        if !self.spent_nullifiers.lock().unwrap().insert(nullifier_hash) {
            return Err(anyhow!("nullifier already used"));
        }
        self.recorded_votes.lock().unwrap().push(call_data.clone());

        Ok(())
    }

    pub fn recorded_votes(&self) -> Vec<Bytes> {
        self.recorded_votes.lock().unwrap().clone()
    }
}

#[async_trait]
impl VotingContractReader for FakeVotingContract {
    async fn tree_settings(&self) -> StdResult<TreeSettings> {
        Ok(self.tree_settings)
    }

    async fn voter_status(&self, _voter: Address) -> StdResult<VoterStatus> {
        Ok(VoterStatus {
            is_registered_voter: true,
            has_registered: true,
        })
    }

    async fn is_nullifier_used(&self, nullifier_hash: FieldElement) -> StdResult<bool> {
        Ok(self.spent_nullifiers.lock().unwrap().contains(&nullifier_hash))
    }
}

/// How the fake bundler handles a submitted operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BundlerBehavior {
    /// The operation is executed and its receipt is delivered
    IncludeAndConfirm,
    /// The operation is executed but its receipt never comes
    IncludeWithoutReceipt,
    /// The operation is dropped and its receipt never comes
    Drop,
}

pub struct FakeSponsoredAccount {
    contract: Arc<FakeVotingContract>,
    behavior: BundlerBehavior,
}

#[async_trait]
impl SponsoredAccount for FakeSponsoredAccount {
    fn address(&self) -> Address {
        Address::repeat_byte(0x5a)
    }

    async fn submit(&self, _target: Address, call_data: Bytes) -> StdResult<OperationHandle> {
        if self.behavior != BundlerBehavior::Drop {
            self.contract.execute_vote(&call_data)?;
        }

        Ok(OperationHandle::new(format!("0x{}", "0f".repeat(32))))
    }

    async fn wait_for_receipt(
        &self,
        _operation: &OperationHandle,
        _timeout: Duration,
    ) -> StdResult<OperationReceipt> {
        match self.behavior {
            BundlerBehavior::IncludeAndConfirm => Ok(OperationReceipt {
                success: true,
                transaction_hash: Some(format!("0x{}", "7a".repeat(32))),
                details: None,
            }),
            _ => std::future::pending().await,
        }
    }
}

pub struct FakeSponsoredAccountProvider {
    contract: Arc<FakeVotingContract>,
    behavior: BundlerBehavior,
}

impl FakeSponsoredAccountProvider {
    pub fn new(contract: Arc<FakeVotingContract>, behavior: BundlerBehavior) -> Arc<Self> {
        Arc::new(Self { contract, behavior })
    }
}

#[async_trait]
impl SponsoredAccountProvider for FakeSponsoredAccountProvider {
    async fn provision(&self) -> StdResult<Arc<dyn SponsoredAccount>> {
        Ok(Arc::new(FakeSponsoredAccount {
            contract: self.contract.clone(),
            behavior: self.behavior,
        }))
    }
}

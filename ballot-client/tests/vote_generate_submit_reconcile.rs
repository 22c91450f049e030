mod extensions;

use alloy_primitives::Address;
use std::sync::Arc;
use std::time::Duration;

use ballot_client::feedback::{SlogFeedbackReceiver, StackFeedbackReceiver, VoteEvent};
use ballot_client::{
    error_kind, BallotClient, BallotClientBuilder, CircuitArtifact, Configuration,
    StaticLeafEventSource, SubmissionSettings,
};
use ballot_common::crypto_helper::IncrementalCommitmentTree;
use ballot_common::entities::{
    Commitment, ErrorKind, FieldElement, LeafRecord, SubmissionStatus,
};
use ballot_common::test_utils::fake_data;

use crate::extensions::fake::{
    BundlerBehavior, EchoProver, FakeSponsoredAccountProvider, FakeVotingContract,
};

const DEPTH: usize = 16;

/// Depth the contract reports for a tree of three leaves.
const TREE_DEPTH: u64 = 2;

struct Ballot {
    commitments: Vec<Commitment>,
    contract: Arc<FakeVotingContract>,
    feedback: Arc<StackFeedbackReceiver>,
}

/// Registration leaves of three voters, in log arrival order `[2, 0, 1]`.
fn arrival_ordered_leaf_records(commitments: &[Commitment]) -> Vec<LeafRecord> {
    let records = fake_data::leaf_records(commitments);

    vec![records[2], records[0], records[1]]
}

fn setup_ballot() -> Ballot {
    let commitments = fake_data::commitments(3);
    let tree_settings = fake_data::tree_settings(&fake_data::leaf_records(&commitments), TREE_DEPTH);

    Ballot {
        commitments,
        contract: FakeVotingContract::new(tree_settings),
        feedback: Arc::new(StackFeedbackReceiver::new()),
    }
}

fn build_client(ballot: &Ballot, behavior: BundlerBehavior) -> BallotClient {
    BallotClientBuilder::new(fake_data::contract_address())
        .with_circuit_depth(DEPTH)
        .with_circuit_artifact(CircuitArtifact {
            bytecode: "H4sIAAAA".to_string(),
            abi: serde_json::Value::Null,
            noir_version: None,
        })
        .with_proving_backend(Arc::new(EchoProver))
        .with_sponsored_account_provider(FakeSponsoredAccountProvider::new(
            ballot.contract.clone(),
            behavior,
        ))
        .with_leaf_event_source(Arc::new(StaticLeafEventSource::new(
            arrival_ordered_leaf_records(&ballot.commitments),
        )))
        .with_voting_contract_reader(ballot.contract.clone())
        .with_submission_settings(SubmissionSettings {
            receipt_timeout: Duration::from_secs(120),
            reconciliation_grace: Duration::from_secs(5),
            reconciliation_query_timeout: Duration::from_secs(10),
        })
        .with_logger(extensions::test_logger())
        .add_feedback_receiver(ballot.feedback.clone())
        .add_feedback_receiver(Arc::new(SlogFeedbackReceiver::new(
            extensions::test_logger(),
        )))
        .build()
        .expect("Should be able to create a BallotClient")
}

#[tokio::test]
async fn generate_submit_and_refuse_a_second_vote() {
    let ballot = setup_ballot();
    let client = build_client(&ballot, BundlerBehavior::IncludeAndConfirm);
    let voter = fake_data::voter_address();

    let proof = client
        .generate_proof(voter, Some(ballot.commitments[1].clone()), Some(true))
        .await
        .expect("Proof generation should not fail");
    let tree = IncrementalCommitmentTree::build(
        &ballot
            .commitments
            .iter()
            .map(|c| c.leaf().unwrap())
            .collect::<Vec<_>>(),
    )
    .unwrap();
    assert_eq!(tree.root(), proof.public_inputs.root);
    assert_eq!(TREE_DEPTH as usize, tree.depth());
    assert_eq!(FieldElement::from(TREE_DEPTH), proof.public_inputs.depth);
    assert_eq!(Some(true), proof.vote_choice());

    let result = client
        .submit_vote(voter)
        .await
        .expect("Vote submission should not fail");
    assert_eq!(SubmissionStatus::Confirmed, result.status);
    assert!(result.transaction_hash.is_some());
    assert_eq!(1, ballot.contract.recorded_votes().len());
    assert!(ballot
        .contract
        .recorded_votes()[0]
        .windows(proof.proof_bytes.len())
        .any(|window| window == proof.proof_bytes.as_slice()));

    let error = client
        .submit_vote(voter)
        .await
        .expect_err("A second submission should be refused");
    assert_eq!(ErrorKind::AlreadyUsed, error_kind(&error));
    assert_eq!(1, ballot.contract.recorded_votes().len());

    assert_eq!(
        Some(result),
        client.check_stored_vote(voter).await.unwrap()
    );
}

#[tokio::test(start_paused = true)]
async fn lost_receipt_of_an_included_vote_is_reconciled_as_confirmed() {
    let ballot = setup_ballot();
    let client = build_client(&ballot, BundlerBehavior::IncludeWithoutReceipt);
    let voter = fake_data::voter_address();

    let result = client
        .vote(voter, Some(ballot.commitments[0].clone()), Some(false))
        .await
        .expect("Vote should not fail");

    assert_eq!(SubmissionStatus::Confirmed, result.status);
    let events = ballot.feedback.stacked_events();
    assert!(events
        .iter()
        .any(|e| matches!(e, VoteEvent::ReconciliationStarted { .. })));
    assert!(events.iter().any(|e| matches!(
        e,
        VoteEvent::SubmissionCompleted {
            status: SubmissionStatus::Confirmed,
            ..
        }
    )));
}

#[tokio::test(start_paused = true)]
async fn dropped_vote_stays_unconfirmed_until_reconciled() {
    let ballot = setup_ballot();
    let client = build_client(&ballot, BundlerBehavior::Drop);
    let voter = fake_data::voter_address();

    let result = client
        .vote(voter, Some(ballot.commitments[2].clone()), Some(true))
        .await
        .expect("Vote should not fail");
    assert_eq!(SubmissionStatus::Unconfirmed, result.status);
    assert_eq!(Some(ErrorKind::AmbiguousOutcome), result.status.kind());

    let error = client.submit_vote(voter).await.unwrap_err();
    assert_eq!(ErrorKind::Input, error_kind(&error));

    let unchanged = client.reconcile(voter).await.unwrap().unwrap();
    assert_eq!(SubmissionStatus::Unconfirmed, unchanged.status);

    // the voter checked on a block explorer that the operation was finally included
    let stored_proof = client.generate_proof(voter, None, Some(true)).await.unwrap();
    ballot
        .contract
        .execute_vote(&ballot_client::VoteCallEncoder::encode_vote(&stored_proof))
        .unwrap();
    let reconciled = client.reconcile(voter).await.unwrap().unwrap();
    assert_eq!(SubmissionStatus::Confirmed, reconciled.status);
    assert_eq!(result.operation_hash, reconciled.operation_hash);
}

#[tokio::test]
async fn stored_credentials_survive_a_new_session() {
    let ballot = setup_ballot();
    let work_dir = extensions::get_test_dir("stored_credentials_survive_a_new_session");
    let circuit_artifact_path = work_dir.join("circuit.json");
    std::fs::write(
        &circuit_artifact_path,
        r#"{"bytecode":"H4sIAAAA","abi":{}}"#,
    )
    .unwrap();
    let configuration = Configuration {
        rpc_endpoint: "http://localhost:8545".to_string(),
        contract_address: fake_data::contract_address(),
        circuit_depth: DEPTH,
        receipt_timeout_ms: 120_000,
        reconciliation_grace_ms: 5_000,
        reconciliation_query_timeout_ms: 10_000,
        rpc_timeout_ms: 10_000,
        data_stores_directory: work_dir.join("stores"),
        circuit_artifact_path,
    };
    let new_session = || {
        BallotClientBuilder::from_configuration(&configuration)
            .with_proving_backend(Arc::new(EchoProver))
            .with_sponsored_account_provider(FakeSponsoredAccountProvider::new(
                ballot.contract.clone(),
                BundlerBehavior::IncludeAndConfirm,
            ))
            .with_leaf_event_source(Arc::new(StaticLeafEventSource::new(
                arrival_ordered_leaf_records(&ballot.commitments),
            )))
            .with_voting_contract_reader(ballot.contract.clone())
            .with_logger(extensions::test_logger())
            .build()
            .expect("Should be able to create a BallotClient")
    };
    let voter = Address::repeat_byte(0x0e);

    let first_session = new_session();
    first_session
        .save_commitment(voter, &ballot.commitments[1])
        .await
        .unwrap();
    let proof = first_session
        .generate_proof(voter, None, Some(false))
        .await
        .unwrap();
    drop(first_session);

    let second_session = new_session();
    assert_eq!(None, second_session.check_stored_vote(voter).await.unwrap());
    let result = second_session.submit_vote(voter).await.unwrap();
    assert_eq!(SubmissionStatus::Confirmed, result.status);
    assert_eq!(
        proof,
        second_session.generate_proof(voter, None, Some(false)).await.unwrap()
    );

    let third_session = new_session();
    assert_eq!(
        Some(result),
        third_session.submission_result(voter).await.unwrap()
    );
}

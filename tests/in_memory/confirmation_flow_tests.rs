//! Dual-confirmation races and team-job completion over shared state.

use changa::job::{
    domain::{Contract, ContractStatus, DoerId, JobStatus, PartyRole},
    ports::{LifecycleEvent, MarketplaceRepository},
    services::SubmitProposalRequest,
};
use rstest::rstest;

use super::helpers::{ASKING_PRICE, CONTRACT_COMMISSION, MarketHarness, base_time, post_request};

/// Drives a contract to `in_progress` under the given harness.
async fn live_contract(harness: &MarketHarness) -> Contract {
    let lifecycle = harness.lifecycle();
    let confirmation = harness.confirmation();
    let job = harness.open_job(post_request()).await;
    let proposal = lifecycle
        .submit_proposal(SubmitProposalRequest::new(
            job.id(),
            DoerId::new(),
            ASKING_PRICE,
        ))
        .await
        .expect("proposal submits");
    let contract = lifecycle
        .select_worker(proposal.id(), CONTRACT_COMMISSION)
        .await
        .expect("selection succeeds");
    confirmation
        .accept_contract(contract.id())
        .await
        .expect("doer accepts");
    confirmation
        .start_work(contract.id())
        .await
        .expect("work starts")
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn racing_confirmations_release_escrow_exactly_once() {
    let harness = MarketHarness::at(base_time());
    let contract = live_contract(&harness).await;

    // Two actors confirm concurrently; the version check serializes them.
    let client_side = harness.confirmation();
    let doer_side = harness.confirmation();
    let (client_result, doer_result) = tokio::join!(
        client_side.confirm(contract.id(), PartyRole::Client),
        doer_side.confirm(contract.id(), PartyRole::Doer),
    );

    // The loser of the race retries from fresh state, as a caller would.
    if client_result.is_err() {
        harness
            .confirmation()
            .confirm(contract.id(), PartyRole::Client)
            .await
            .expect("retry succeeds");
    }
    if doer_result.is_err() {
        harness
            .confirmation()
            .confirm(contract.id(), PartyRole::Doer)
            .await
            .expect("retry succeeds");
    }

    let stored = harness
        .repository
        .find_contract(contract.id())
        .await
        .expect("lookup works")
        .expect("contract exists");
    assert_eq!(stored.status(), ContractStatus::Completed);

    let events = harness.events.recorded().expect("events recorded");
    let releases = events
        .iter()
        .filter(|event| matches!(event, LifecycleEvent::EscrowReleaseRequested { .. }))
        .count();
    assert_eq!(releases, 1, "double escrow release must be impossible");
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn team_job_stays_in_progress_until_the_last_contract_confirms() {
    let now = base_time();
    let harness = MarketHarness::at(now);
    let lifecycle = harness.lifecycle();
    let confirmation = harness.confirmation();
    let job = harness.open_job(post_request().with_max_workers(2)).await;

    let mut contracts = Vec::new();
    let mut proposals = Vec::new();
    for _ in 0..2 {
        proposals.push(
            lifecycle
                .submit_proposal(SubmitProposalRequest::new(
                    job.id(),
                    DoerId::new(),
                    ASKING_PRICE,
                ))
                .await
                .expect("proposal submits"),
        );
    }
    for proposal in &proposals {
        let contract = lifecycle
            .select_worker(proposal.id(), CONTRACT_COMMISSION)
            .await
            .expect("selection succeeds");
        confirmation
            .accept_contract(contract.id())
            .await
            .expect("doer accepts");
        contracts.push(
            confirmation
                .start_work(contract.id())
                .await
                .expect("work starts"),
        );
    }

    for contract in &contracts {
        confirmation
            .confirm(contract.id(), PartyRole::Client)
            .await
            .expect("client confirms");
    }
    let first_doer = contracts.first().expect("two contracts");
    confirmation
        .confirm(first_doer.id(), PartyRole::Doer)
        .await
        .expect("first doer confirms");

    // Three of four confirmations in: the job must still be in progress.
    let matrix = confirmation
        .confirmation_matrix(job.id())
        .await
        .expect("matrix loads");
    assert_eq!(matrix.completed, 1);
    assert_eq!(matrix.outstanding, 1);
    assert_eq!(matrix.job_status, JobStatus::InProgress);

    let last = contracts.last().expect("two contracts");
    confirmation
        .confirm(last.id(), PartyRole::Doer)
        .await
        .expect("last confirmation");
    let matrix = confirmation
        .confirmation_matrix(job.id())
        .await
        .expect("matrix loads");
    assert!(matrix.all_completed());
    assert_eq!(matrix.job_status, JobStatus::Completed);

    let events = harness.events.recorded().expect("events recorded");
    let completions = events
        .iter()
        .filter(|event| matches!(event, LifecycleEvent::JobCompleted { .. }))
        .count();
    assert_eq!(completions, 1);
}

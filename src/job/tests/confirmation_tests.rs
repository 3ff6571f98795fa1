//! Dual-confirmation tests: windows, escrow release, and team completion.

use chrono::{DateTime, Duration, Utc};
use rstest::rstest;

use super::support::{ASKING_PRICE, CONTRACT_COMMISSION, Harness, base_time, post_request};
use crate::job::{
    domain::{Contract, ContractStatus, DoerId, Job, JobStatus, LifecycleError, PartyRole},
    ports::{LifecycleEvent, MarketplaceRepository},
    services::{ServiceError, SubmitProposalRequest},
};

/// Drives a job to one in-progress contract: select, accept, start.
async fn contracted(harness: &Harness, job: &Job, at: DateTime<Utc>) -> Contract {
    let lifecycle = harness.lifecycle_at(at);
    let confirmation = harness.confirmation_at(at);
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
async fn confirmation_window_opens_five_minutes_before_the_end() {
    let now = base_time();
    let end = now + Duration::hours(48);
    let harness = Harness::at(now);
    let job = harness
        .open_job(
            post_request()
                .with_start_date(now + Duration::hours(40))
                .with_end_date(end),
        )
        .await;
    let contract = contracted(&harness, &job, now).await;
    let opens_at = end - Duration::minutes(5);

    let early = harness
        .confirmation_at(opens_at - Duration::seconds(1))
        .confirm(contract.id(), PartyRole::Client)
        .await;
    assert!(matches!(
        early,
        Err(ServiceError::Domain(LifecycleError::WindowNotOpen {
            contract_id,
            opens_at: reported,
        })) if contract_id == contract.id() && reported == opens_at
    ));

    harness
        .confirmation_at(opens_at)
        .confirm(contract.id(), PartyRole::Client)
        .await
        .expect("window open at the boundary");
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn flexible_end_contract_confirms_as_soon_as_work_is_live() {
    let now = base_time();
    let harness = Harness::at(now);
    let job = harness.open_job(post_request()).await;
    let contract = contracted(&harness, &job, now).await;

    let updated = harness
        .confirmation()
        .confirm(contract.id(), PartyRole::Doer)
        .await
        .expect("no window for flexible-end jobs");
    assert_eq!(updated.status(), ContractStatus::AwaitingConfirmation);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn second_confirmation_completes_and_releases_escrow_once() {
    let now = base_time();
    let harness = Harness::at(now);
    let job = harness.open_job(post_request()).await;
    let contract = contracted(&harness, &job, now).await;
    let confirmation = harness.confirmation();

    confirmation
        .confirm(contract.id(), PartyRole::Client)
        .await
        .expect("client confirms");
    let completed = confirmation
        .confirm(contract.id(), PartyRole::Doer)
        .await
        .expect("doer confirms");
    assert_eq!(completed.status(), ContractStatus::Completed);
    assert!(completed.client_confirmed() && completed.doer_confirmed());

    let events = harness.events.recorded().expect("events recorded");
    let releases = events
        .iter()
        .filter(|event| {
            matches!(event, LifecycleEvent::EscrowReleaseRequested { contract_id, .. }
                if *contract_id == contract.id())
        })
        .count();
    assert_eq!(releases, 1);
    assert!(events.contains(&LifecycleEvent::EscrowReleaseRequested {
        job_id: job.id(),
        contract_id: contract.id(),
        amount: ASKING_PRICE,
    }));
    assert!(events.contains(&LifecycleEvent::JobCompleted { job_id: job.id() }));

    let job = harness
        .repository
        .find_job(job.id())
        .await
        .expect("lookup works")
        .expect("job exists");
    assert_eq!(job.status(), JobStatus::Completed);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn repeating_a_confirmation_is_rejected() {
    let now = base_time();
    let harness = Harness::at(now);
    let job = harness.open_job(post_request()).await;
    let contract = contracted(&harness, &job, now).await;
    let confirmation = harness.confirmation();

    confirmation
        .confirm(contract.id(), PartyRole::Client)
        .await
        .expect("first confirmation");
    let repeat = confirmation.confirm(contract.id(), PartyRole::Client).await;
    assert!(matches!(
        repeat,
        Err(ServiceError::Domain(LifecycleError::AlreadyConfirmed {
            contract_id,
            actor: PartyRole::Client,
        })) if contract_id == contract.id()
    ));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn team_job_completes_only_after_every_contract_confirms() {
    let now = base_time();
    let harness = Harness::at(now);
    let job = harness.open_job(post_request().with_max_workers(2)).await;
    let lifecycle = harness.lifecycle();
    let confirmation = harness.confirmation();

    // Both proposals arrive while the job is still open; selections and
    // contract progression happen afterwards.
    let mut proposals = Vec::new();
    for _ in 0..2 {
        let proposal = lifecycle
            .submit_proposal(SubmitProposalRequest::new(
                job.id(),
                DoerId::new(),
                ASKING_PRICE,
            ))
            .await
            .expect("proposal submits");
        proposals.push(proposal);
    }
    let mut live = Vec::new();
    for proposal in proposals {
        let contract = lifecycle
            .select_worker(proposal.id(), CONTRACT_COMMISSION)
            .await
            .expect("selection succeeds");
        confirmation
            .accept_contract(contract.id())
            .await
            .expect("doer accepts");
        live.push(
            confirmation
                .start_work(contract.id())
                .await
                .expect("work starts"),
        );
    }
    let (first, second) = (live.remove(0), live.remove(0));

    confirmation
        .confirm(first.id(), PartyRole::Client)
        .await
        .expect("confirm");
    confirmation
        .confirm(first.id(), PartyRole::Doer)
        .await
        .expect("confirm");

    let matrix = confirmation
        .confirmation_matrix(job.id())
        .await
        .expect("matrix loads");
    assert_eq!(matrix.rows.len(), 2);
    assert_eq!(matrix.completed, 1);
    assert_eq!(matrix.outstanding, 1);
    assert!(!matrix.all_completed());
    assert_eq!(matrix.job_status, JobStatus::InProgress);

    confirmation
        .confirm(second.id(), PartyRole::Client)
        .await
        .expect("confirm");
    let matrix = confirmation
        .confirmation_matrix(job.id())
        .await
        .expect("matrix loads");
    assert!(!matrix.all_completed());

    confirmation
        .confirm(second.id(), PartyRole::Doer)
        .await
        .expect("final confirmation");
    let matrix = confirmation
        .confirmation_matrix(job.id())
        .await
        .expect("matrix loads");
    assert!(matrix.all_completed());
    assert_eq!(matrix.job_status, JobStatus::Completed);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn cancelling_a_job_cancels_its_live_contract_and_blocks_confirmation() {
    let now = base_time();
    let harness = Harness::at(now);
    let job = harness.open_job(post_request()).await;
    let contract = contracted(&harness, &job, now).await;
    assert_eq!(contract.status(), ContractStatus::InProgress);

    harness
        .lifecycle()
        .cancel(job.id(), "client changed plans")
        .await
        .expect("flexible-date job cancels");

    let contract = harness
        .repository
        .find_contract(contract.id())
        .await
        .expect("lookup works")
        .expect("contract exists");
    assert_eq!(contract.status(), ContractStatus::Cancelled);

    let confirmation = harness.confirmation();
    for actor in [PartyRole::Client, PartyRole::Doer] {
        let rejected = confirmation.confirm(contract.id(), actor).await;
        assert!(matches!(
            rejected,
            Err(ServiceError::Domain(LifecycleError::InvalidTransition {
                status: JobStatus::Cancelled,
                ..
            }))
        ));
    }

    let events = harness.events.recorded().expect("events recorded");
    assert!(!events.iter().any(|event| matches!(
        event,
        LifecycleEvent::EscrowReleaseRequested { .. }
    )));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn pairing_verification_checks_code_and_ttl() {
    let now = base_time();
    let harness = Harness::at(now);
    let job = harness.open_job(post_request()).await;
    let contract = contracted(&harness, &job, now).await;
    let code = contract.pairing().code().to_owned();

    harness
        .confirmation()
        .verify_pairing(contract.id(), &code)
        .await
        .expect("fresh code verifies");

    let mismatch = harness
        .confirmation()
        .verify_pairing(contract.id(), "ZZZZZZ")
        .await;
    assert!(matches!(
        mismatch,
        Err(ServiceError::Domain(LifecycleError::PairingRejected {
            contract_id,
        })) if contract_id == contract.id()
    ));

    let expired = harness
        .confirmation_at(now + Duration::hours(49))
        .verify_pairing(contract.id(), &code)
        .await;
    assert!(matches!(
        expired,
        Err(ServiceError::Domain(LifecycleError::PairingRejected { .. }))
    ));
}

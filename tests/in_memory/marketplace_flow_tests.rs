//! End-to-end walkthroughs of the job lifecycle over in-memory adapters.

use changa::job::{
    domain::{ContractStatus, DoerId, JobStatus, PartyRole},
    ports::{LifecycleEvent, MarketplaceRepository},
    services::SubmitProposalRequest,
};
use rstest::rstest;

use super::helpers::{ASKING_PRICE, CONTRACT_COMMISSION, MarketHarness, base_time, post_request};

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn solo_job_runs_from_posting_to_escrow_release() {
    let now = base_time();
    let harness = MarketHarness::at(now);
    let lifecycle = harness.lifecycle();
    let confirmation = harness.confirmation();

    let job = harness.open_job(post_request()).await;
    let doer = DoerId::new();
    let proposal = lifecycle
        .submit_proposal(SubmitProposalRequest::new(job.id(), doer, ASKING_PRICE))
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
        .expect("work starts");
    confirmation
        .verify_pairing(contract.id(), contract.pairing().code())
        .await
        .expect("pairing verifies");
    confirmation
        .confirm(contract.id(), PartyRole::Doer)
        .await
        .expect("doer confirms");
    let completed = confirmation
        .confirm(contract.id(), PartyRole::Client)
        .await
        .expect("client confirms");
    assert_eq!(completed.status(), ContractStatus::Completed);

    let job = harness
        .repository
        .find_job(job.id())
        .await
        .expect("lookup works")
        .expect("job exists");
    assert_eq!(job.status(), JobStatus::Completed);

    let events = harness.events.recorded().expect("events recorded");
    let milestones: Vec<&LifecycleEvent> = events
        .iter()
        .filter(|event| {
            matches!(
                event,
                LifecycleEvent::ProposalSubmitted { .. }
                    | LifecycleEvent::ContractCreated { .. }
                    | LifecycleEvent::EscrowReleaseRequested { .. }
                    | LifecycleEvent::JobCompleted { .. }
            )
        })
        .collect();
    assert_eq!(milestones.len(), 4, "each milestone fires exactly once");
    assert!(matches!(
        milestones.last(),
        Some(LifecycleEvent::JobCompleted { .. })
    ));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn stale_write_is_rejected_by_the_version_check() {
    let now = base_time();
    let harness = MarketHarness::at(now);
    let job = harness.open_job(post_request()).await;

    let stale = harness
        .repository
        .find_job(job.id())
        .await
        .expect("lookup works")
        .expect("job exists");
    let stale_version = stale.version();

    // Another writer advances the job first.
    harness
        .lifecycle()
        .pause(job.id())
        .await
        .expect("pausable");

    let mut rewound = stale;
    rewound
        .pause(now, &harness.policy)
        .expect("domain accepts the pause");
    let result = harness.repository.update_job(&rewound, stale_version).await;
    assert!(matches!(
        result,
        Err(changa::job::ports::RepositoryError::JobVersionConflict(id)) if id == job.id()
    ));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn suspended_job_returns_to_service_with_an_end_date() {
    let now = base_time();
    let harness = MarketHarness::at(now);
    let job = harness
        .open_job(post_request().with_start_date(now + chrono::Duration::hours(20)))
        .await;
    harness
        .lifecycle()
        .submit_proposal(SubmitProposalRequest::new(
            job.id(),
            DoerId::new(),
            ASKING_PRICE,
        ))
        .await
        .expect("proposal submits");

    let report = harness.sweep_at(now).run().await.expect("sweep runs");
    assert_eq!(report.suspended, 1);

    let lifecycle = harness.lifecycle();
    let job = lifecycle
        .set_end_date(job.id(), now + chrono::Duration::hours(30))
        .await
        .expect("end date accepted");
    assert_eq!(job.status(), JobStatus::Open);
}

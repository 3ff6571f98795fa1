//! Deadline sweep tests: auto-selection, auto-cancellation,
//! auto-suspension, and pause auto-resume.

use chrono::Duration;
use rstest::rstest;

use super::support::{ASKING_PRICE, Harness, base_time, post_request};
use crate::job::{
    domain::{ContractStatus, DoerId, JobStatus, Money, NO_APPLICANTS_REASON, ProposalStatus},
    ports::{LifecycleEvent, MarketplaceRepository},
    services::SubmitProposalRequest,
};

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn sweep_selects_the_earliest_pending_proposal_at_the_deadline() {
    let now = base_time();
    let harness = Harness::at(now);
    let job = harness
        .open_job(
            post_request()
                .with_start_date(now + Duration::hours(23))
                .with_end_date(now + Duration::hours(48)),
        )
        .await;

    let lifecycle = harness.lifecycle();
    let earliest = lifecycle
        .submit_proposal(SubmitProposalRequest::new(
            job.id(),
            DoerId::new(),
            ASKING_PRICE,
        ))
        .await
        .expect("first proposal");
    let later = harness
        .lifecycle_at(now + Duration::minutes(5))
        .submit_proposal(SubmitProposalRequest::new(
            job.id(),
            DoerId::new(),
            Money::from_minor_units(48_000),
        ))
        .await
        .expect("second proposal");

    let report = harness.sweep_at(now).run().await.expect("sweep runs");
    assert_eq!(report.selected, 1);
    assert_eq!(report.cancelled, 0);

    let job = harness
        .repository
        .find_job(job.id())
        .await
        .expect("lookup works")
        .expect("job exists");
    assert_eq!(job.status(), JobStatus::InProgress);
    assert_eq!(job.selected_workers(), &[earliest.doer_id()]);

    let contracts = harness
        .repository
        .contracts_by_job(job.id())
        .await
        .expect("contracts load");
    let contract = contracts.first().expect("one contract");
    assert_eq!(contracts.len(), 1);
    assert_eq!(contract.status(), ContractStatus::Pending);
    assert_eq!(contract.price(), ASKING_PRICE);
    assert_eq!(contract.doer_id(), earliest.doer_id());

    let proposals = harness
        .repository
        .proposals_by_job(job.id())
        .await
        .expect("proposals load");
    let winner = proposals
        .iter()
        .find(|p| p.id() == earliest.id())
        .expect("stored");
    let loser = proposals
        .iter()
        .find(|p| p.id() == later.id())
        .expect("stored");
    assert_eq!(winner.status(), ProposalStatus::Approved);
    assert_eq!(loser.status(), ProposalStatus::Rejected);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn sweep_cancels_a_job_nobody_applied_to() {
    let now = base_time();
    let harness = Harness::at(now);
    let job = harness
        .open_job(
            post_request()
                .with_start_date(now + Duration::hours(23))
                .with_end_date(now + Duration::hours(48)),
        )
        .await;

    let report = harness.sweep_at(now).run().await.expect("sweep runs");
    assert_eq!(report.cancelled, 1);
    assert_eq!(report.selected, 0);

    let job = harness
        .repository
        .find_job(job.id())
        .await
        .expect("lookup works")
        .expect("job exists");
    assert_eq!(job.status(), JobStatus::Cancelled);
    assert_eq!(job.cancellation_reason(), Some(NO_APPLICANTS_REASON));

    let events = harness.events.recorded().expect("events recorded");
    assert!(events.contains(&LifecycleEvent::JobCancelled {
        job_id: job.id(),
        reason: NO_APPLICANTS_REASON.to_owned(),
        price_refunded: true,
        commission_forfeited: None,
    }));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn sweep_suspends_a_flexible_end_job_at_the_deadline() {
    let now = base_time();
    let harness = Harness::at(now);
    let job = harness
        .open_job(post_request().with_start_date(now + Duration::hours(23)))
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
    assert_eq!(report.selected, 0);

    let job = harness
        .repository
        .find_job(job.id())
        .await
        .expect("lookup works")
        .expect("job exists");
    assert_eq!(job.status(), JobStatus::Suspended);

    // Supplying an end date lifts the suspension; the next sweep selects.
    harness
        .lifecycle_at(now + Duration::hours(1))
        .set_end_date(job.id(), now + Duration::hours(40))
        .await
        .expect("end date accepted");
    let report = harness
        .sweep_at(now + Duration::hours(1))
        .run()
        .await
        .expect("second sweep runs");
    assert_eq!(report.selected, 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn sweep_ignores_jobs_still_outside_the_selection_lead() {
    let now = base_time();
    let harness = Harness::at(now);
    harness
        .open_job(
            post_request()
                .with_start_date(now + Duration::hours(25))
                .with_end_date(now + Duration::hours(48)),
        )
        .await;

    let report = harness.sweep_at(now).run().await.expect("sweep runs");
    assert_eq!(report, Default::default());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn sweep_resumes_a_job_paused_past_the_timeout() {
    let now = base_time();
    let harness = Harness::at(now);
    let job = harness.open_job(post_request()).await;
    harness.lifecycle().pause(job.id()).await.expect("pausable");

    // Before the timeout nothing happens.
    let early = harness
        .sweep_at(now + Duration::hours(71))
        .run()
        .await
        .expect("early sweep runs");
    assert_eq!(early.resumed, 0);

    let report = harness
        .sweep_at(now + Duration::hours(73))
        .run()
        .await
        .expect("sweep runs");
    assert_eq!(report.resumed, 1);

    let job = harness
        .repository
        .find_job(job.id())
        .await
        .expect("lookup works")
        .expect("job exists");
    assert_eq!(job.status(), JobStatus::Open);
    assert_eq!(job.paused_at(), None);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn sweep_leaves_a_supplement_pause_alone() {
    let now = base_time();
    let harness = Harness::at(now);
    let job = harness.open_job(post_request()).await;
    harness
        .lifecycle()
        .change_budget(job.id(), Money::from_minor_units(90_000))
        .await
        .expect("increase accepted");

    let report = harness
        .sweep_at(now + Duration::days(30))
        .run()
        .await
        .expect("sweep runs");
    assert_eq!(report.resumed, 0);

    let job = harness
        .repository
        .find_job(job.id())
        .await
        .expect("lookup works")
        .expect("job exists");
    assert_eq!(job.status(), JobStatus::Paused);
    assert!(job.pending_new_price().is_some());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn running_the_sweep_twice_changes_nothing_the_second_time() {
    let now = base_time();
    let harness = Harness::at(now);
    let job = harness
        .open_job(
            post_request()
                .with_start_date(now + Duration::hours(23))
                .with_end_date(now + Duration::hours(48)),
        )
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

    let first = harness.sweep_at(now).run().await.expect("first sweep");
    assert_eq!(first.selected, 1);

    let second = harness.sweep_at(now).run().await.expect("second sweep");
    assert_eq!(second, Default::default());

    let contracts = harness
        .repository
        .contracts_by_job(job.id())
        .await
        .expect("contracts load");
    assert_eq!(contracts.len(), 1);
}

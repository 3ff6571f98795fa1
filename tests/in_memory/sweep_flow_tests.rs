//! Deadline sweep scenarios: mixed cohorts and concurrent runs.

use changa::job::{
    domain::{DoerId, JobStatus, NO_APPLICANTS_REASON},
    ports::MarketplaceRepository,
    services::SubmitProposalRequest,
};
use chrono::Duration;
use rstest::rstest;

use super::helpers::{ASKING_PRICE, MarketHarness, base_time, post_request};

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn one_run_sorts_a_mixed_cohort_of_due_jobs() {
    let now = base_time();
    let harness = MarketHarness::at(now);
    let lifecycle = harness.lifecycle();

    // Due with a pending proposal: auto-selected.
    let staffed = harness
        .open_job(
            post_request()
                .with_start_date(now + Duration::hours(20))
                .with_end_date(now + Duration::hours(40)),
        )
        .await;
    lifecycle
        .submit_proposal(SubmitProposalRequest::new(
            staffed.id(),
            DoerId::new(),
            ASKING_PRICE,
        ))
        .await
        .expect("proposal submits");

    // Due with no applicants: cancelled with a full refund.
    let deserted = harness
        .open_job(
            post_request()
                .with_start_date(now + Duration::hours(20))
                .with_end_date(now + Duration::hours(40)),
        )
        .await;

    // Due with a flexible end: suspended until the client supplies one.
    let open_ended = harness
        .open_job(post_request().with_start_date(now + Duration::hours(20)))
        .await;
    lifecycle
        .submit_proposal(SubmitProposalRequest::new(
            open_ended.id(),
            DoerId::new(),
            ASKING_PRICE,
        ))
        .await
        .expect("proposal submits");

    // Not due: starts well outside the selection lead.
    let future = harness
        .open_job(
            post_request()
                .with_start_date(now + Duration::days(10))
                .with_end_date(now + Duration::days(11)),
        )
        .await;

    let report = harness.sweep_at(now).run().await.expect("sweep runs");
    assert_eq!(report.selected, 1);
    assert_eq!(report.cancelled, 1);
    assert_eq!(report.suspended, 1);
    assert_eq!(report.resumed, 0);

    let statuses = [
        (staffed.id(), JobStatus::InProgress),
        (deserted.id(), JobStatus::Cancelled),
        (open_ended.id(), JobStatus::Suspended),
        (future.id(), JobStatus::Open),
    ];
    for (job_id, expected) in statuses {
        let job = harness
            .repository
            .find_job(job_id)
            .await
            .expect("lookup works")
            .expect("job exists");
        assert_eq!(job.status(), expected, "{job_id}");
    }

    let cancelled = harness
        .repository
        .find_job(deserted.id())
        .await
        .expect("lookup works")
        .expect("job exists");
    assert_eq!(cancelled.cancellation_reason(), Some(NO_APPLICANTS_REASON));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn concurrent_sweeps_create_exactly_one_contract() {
    let now = base_time();
    let harness = MarketHarness::at(now);
    let job = harness
        .open_job(
            post_request()
                .with_start_date(now + Duration::hours(20))
                .with_end_date(now + Duration::hours(40)),
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

    let first = harness.sweep_at(now);
    let second = harness.sweep_at(now);
    let (first_report, second_report) = tokio::join!(first.run(), second.run());
    let first_report = first_report.expect("first sweep runs");
    let second_report = second_report.expect("second sweep runs");

    // Whatever the interleaving, exactly one sweep wins the slot.
    assert_eq!(first_report.selected + second_report.selected, 1);

    let contracts = harness
        .repository
        .contracts_by_job(job.id())
        .await
        .expect("contracts load");
    assert_eq!(contracts.len(), 1);

    let proposals = harness
        .repository
        .proposals_by_job(job.id())
        .await
        .expect("proposals load");
    let approved = proposals
        .iter()
        .filter(|p| p.status() == changa::job::domain::ProposalStatus::Approved)
        .count();
    assert_eq!(approved, 1);
}

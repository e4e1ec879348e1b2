use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use job_lifecycle::{
    DeleteOutcome, JobApi, JobError, JobId, JobService, JobStatus, LifecycleConfig, ListQuery,
    SubmitRequest,
};
use serde_json::json;

fn api() -> Arc<dyn JobApi> {
    Arc::new(JobService::new(LifecycleConfig::default().with_rng_seed(42)).unwrap())
}

async fn sleep_secs(secs: f64) {
    tokio::time::sleep(Duration::from_secs_f64(secs)).await;
}

#[tokio::test(start_paused = true)]
async fn test_structure_prediction_walkthrough() {
    let api = api();
    let job = api
        .submit(SubmitRequest::new("structure_prediction", json!({})))
        .await
        .unwrap();

    let fetched = api.get(&job.id).await.unwrap();
    assert_eq!(fetched.status, JobStatus::Queued);
    assert_eq!(fetched.progress, 0.0);
    assert!(fetched.results.is_none());

    sleep_secs(2.5).await;
    assert_eq!(api.get(&job.id).await.unwrap().status, JobStatus::Running);

    let done = api.wait(&job.id).await.unwrap();
    assert_eq!(done.status, JobStatus::Completed);
    assert_eq!(done.progress, 100.0);
    assert!(done.results.is_some());
    assert!(done.started_at.unwrap() >= done.created_at);
    assert!(done.completed_at.unwrap() >= done.started_at.unwrap());
}

#[tokio::test(start_paused = true)]
async fn test_ids_unique_across_submissions() {
    let api = api();
    let mut ids = HashSet::new();
    for i in 0..100 {
        let job = api
            .submit(SubmitRequest::new(format!("toolkit-{}", i % 3), json!({"i": i})))
            .await
            .unwrap();
        assert!(ids.insert(job.id));
    }
}

#[tokio::test(start_paused = true)]
async fn test_list_limit_reports_full_total() {
    let api = api();
    api.submit(SubmitRequest::new("a", json!({}))).await.unwrap();
    api.submit(SubmitRequest::new("b", json!({}))).await.unwrap();

    let page = api.list(&ListQuery::all().with_limit(1)).await.unwrap();
    assert_eq!(page.jobs.len(), 1);
    assert_eq!(page.total, 2);
}

#[tokio::test(start_paused = true)]
async fn test_list_filters_intersect() {
    let api = api();
    let folding = api
        .submit(SubmitRequest::new("structure_prediction", json!({})))
        .await
        .unwrap();
    api.submit(SubmitRequest::new("molecular_docking", json!({})))
        .await
        .unwrap();

    api.wait(&folding.id).await.unwrap();
    let late = api
        .submit(SubmitRequest::new("structure_prediction", json!({})))
        .await
        .unwrap();

    let completed = api
        .list(&ListQuery::all().with_status(JobStatus::Completed))
        .await
        .unwrap();
    assert!(completed.total >= 1);
    assert!(completed.jobs.iter().all(|j| j.status == JobStatus::Completed));

    let queued_folding = api
        .list(
            &ListQuery::from_params(Some("queued"), Some("structure_prediction"), Some("nope"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(queued_folding.total, 1);
    assert_eq!(queued_folding.jobs[0].id, late.id);
}

#[tokio::test(start_paused = true)]
async fn test_delete_queued_then_get_not_found() {
    let api = api();
    let job = api.submit(SubmitRequest::new("a", json!({}))).await.unwrap();

    let outcome = api.delete(&job.id).await.unwrap();
    assert!(matches!(outcome, DeleteOutcome::Deleted));
    assert!(matches!(
        api.get(&job.id).await,
        Err(JobError::NotFound(_))
    ));

    sleep_secs(10.0).await;
    assert!(matches!(
        api.get(&job.id).await,
        Err(JobError::NotFound(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_job_frozen_past_tick_interval() {
    let api = api();
    let job = api.submit(SubmitRequest::new("a", json!({}))).await.unwrap();
    sleep_secs(4.5).await;

    let DeleteOutcome::Cancelled { job: cancelled } = api.delete(&job.id).await.unwrap() else {
        panic!("running job should be cancelled");
    };

    sleep_secs(5.0).await;
    let after = api.get(&job.id).await.unwrap();
    assert_eq!(after.status, JobStatus::Cancelled);
    assert_eq!(after.progress, cancelled.progress);
    assert_eq!(after.completed_at, cancelled.completed_at);
    assert!(after.results.is_none());

    let terminal = api.wait(&job.id).await.unwrap();
    assert_eq!(terminal.status, JobStatus::Cancelled);
}

#[tokio::test(start_paused = true)]
async fn test_stats_over_fleet() {
    let api = api();
    let empty = api.stats().await.unwrap();
    assert_eq!(empty.stats.total, 0);
    assert_eq!(empty.stats.success_rate, 100.0);

    let done = api.submit(SubmitRequest::new("a", json!({}))).await.unwrap();
    api.wait(&done.id).await.unwrap();
    let cancelled = api.submit(SubmitRequest::new("b", json!({}))).await.unwrap();
    sleep_secs(2.5).await;
    api.delete(&cancelled.id).await.unwrap();
    api.submit(SubmitRequest::new("c", json!({}))).await.unwrap();

    let report = api.stats().await.unwrap();
    assert_eq!(report.stats.total, 3);
    assert_eq!(report.stats.completed, 1);
    assert_eq!(report.stats.cancelled, 1);
    assert_eq!(report.stats.queued, 1);
    assert_eq!(report.stats.success_rate, 33.33);
    assert!(report.stats.uptime > 0.0);
}

#[tokio::test(start_paused = true)]
async fn test_mark_failed_through_api() {
    let api = api();
    let job = api.submit(SubmitRequest::new("a", json!({}))).await.unwrap();
    assert!(matches!(
        api.mark_failed(&job.id, "node lost").await,
        Err(JobError::InvalidTransition { .. })
    ));

    sleep_secs(2.5).await;
    let failed = api.mark_failed(&job.id, "node lost").await.unwrap();
    assert_eq!(failed.status, JobStatus::Failed);
    assert_eq!(failed.failure_reason.as_deref(), Some("node lost"));

    let waited = api.wait(&job.id).await.unwrap();
    assert_eq!(waited.status, JobStatus::Failed);
    assert!(waited.results.is_none());

    let page = api
        .list(&ListQuery::all().with_status(JobStatus::Failed))
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(api.stats().await.unwrap().stats.failed, 1);
}

#[tokio::test(start_paused = true)]
async fn test_wait_unknown_job() {
    let api = api();
    assert!(matches!(
        api.wait(&JobId::new("job-missing")).await,
        Err(JobError::NotFound(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn test_health() {
    let health = api().health().await.unwrap();
    assert_eq!(health.status, "healthy");
    assert!(!health.version.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_submit_and_delete() {
    let config = LifecycleConfig::default()
        .with_start_delay(Duration::from_millis(20))
        .with_tick_interval(Duration::from_millis(10))
        .with_max_progress_increment(40.0);
    let service = Arc::new(JobService::new(config).unwrap());

    let mut handles = Vec::new();
    for i in 0..32 {
        let service = Arc::clone(&service);
        handles.push(tokio::spawn(async move {
            let job = JobApi::submit(
                &*service,
                SubmitRequest::new("molecular_docking", json!({"i": i})),
            )
            .await
            .unwrap();
            if i % 4 == 0 {
                tokio::time::sleep(Duration::from_millis(35)).await;
                service.delete(&job.id).unwrap();
            }
            job.id
        }));
    }

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap());
    }

    for id in &ids {
        match service.get(id) {
            Ok(job) => {
                let job = service.wait(&job.id).await.unwrap();
                assert!(job.status.is_terminal());
                assert_eq!(job.results.is_some(), job.status.is_success());
                assert!(job.progress <= 100.0);
            }
            Err(JobError::NotFound(_)) => {}
            Err(err) => panic!("unexpected error: {err}"),
        }
    }

    let stats = service.stats().stats;
    assert_eq!(stats.queued + stats.running, 0);

    // Timelines deregister right after their final write.
    for _ in 0..100 {
        if service.scheduler().active_timelines() == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(service.scheduler().active_timelines(), 0);
}

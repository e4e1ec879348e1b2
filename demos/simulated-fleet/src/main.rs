//! Drives a small simulated fleet through the job lifecycle.
//!
//! Submits a few jobs, cancels one mid-run, waits for the rest and prints
//! fleet statistics. Set `RUST_LOG=job_lifecycle=debug` to see every tick.

use std::time::Duration;

use job_lifecycle::{
    DeleteOutcome, JobApi, JobService, JobStatus, LifecycleConfig, ListQuery, SubmitRequest,
};
use serde_json::json;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Faster than the defaults so the demo finishes in a few seconds.
    let config = LifecycleConfig::default()
        .with_start_delay(Duration::from_millis(500))
        .with_tick_interval(Duration::from_millis(250));
    let service = JobService::new(config)?;
    let api: &dyn JobApi = &service;

    let health = api.health().await?;
    println!("Service: {} (v{})", health.status, health.version);
    println!();

    // Missing config is rejected before anything is queued.
    let rejected = api
        .submit(SubmitRequest {
            toolkit: Some("structure_prediction".into()),
            ..Default::default()
        })
        .await;
    if let Err(err) = rejected {
        println!("Rejected: {err}");
    }

    let folding = api
        .submit(
            SubmitRequest::new("structure_prediction", json!({"model": "monomer"}))
                .with_input_files(["target.fasta"]),
        )
        .await?;
    let docking = api
        .submit(
            SubmitRequest::new("molecular_docking", json!({"exhaustiveness": 8}))
                .with_priority(1),
        )
        .await?;
    let doomed = api
        .submit(SubmitRequest::new("phylogenetics", json!({})))
        .await?;
    println!(
        "Submitted: {} (queue position {}), {}, {}",
        folding.id, folding.queue_position, docking.id, doomed.id
    );

    tokio::time::sleep(Duration::from_millis(900)).await;
    match api.delete(&doomed.id).await? {
        DeleteOutcome::Cancelled { job } => {
            println!("Cancelled {} at {:.1}%", job.id, job.progress);
        }
        DeleteOutcome::Deleted => println!("Deleted {}", doomed.id),
    }

    for id in [&folding.id, &docking.id] {
        let job = api.wait(id).await?;
        println!();
        println!("Job {} [{}] -> {}", job.id, job.toolkit, job.status);
        if job.status.is_success() {
            let results = job.results.unwrap_or_default();
            println!("{}", serde_json::to_string_pretty(&results)?);
        } else if let Some(reason) = &job.failure_reason {
            println!("Reason: {reason}");
        }
    }

    let completed = api
        .list(&ListQuery::all().with_status(JobStatus::Completed))
        .await?;
    println!();
    println!("Completed jobs: {}", completed.total);

    let report = api.stats().await?;
    println!("Stats:  {}", serde_json::to_string(&report)?);

    Ok(())
}

//! Batch enrichment driven by continuation signals.
//!
//! This demo:
//! 1. Populates a callback node with a list of record ids
//! 2. Advances it one signal at a time, as a host would
//! 3. Persists the state mid-way and resumes from the snapshot
//! 4. Runs a single-shot node for the summary

use async_trait::async_trait;
use iterflow::prelude::*;
use iterflow::ProcessorName;
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Clone)]
struct Record {
    id: u64,
    owner: String,
}

/// Resolves record ids against an injected directory.
#[derive(Debug)]
struct Enrich {
    directory: HashMap<u64, String>,
}

#[async_trait]
impl ItemProcessor<u64> for Enrich {
    type Output = Record;

    async fn process(&self, id: &u64, index: usize) -> Result<Record, ExecutorError> {
        tokio::time::sleep(Duration::from_millis(20)).await;
        let owner = self
            .directory
            .get(id)
            .cloned()
            .ok_or_else(|| ExecutorError::Processing {
                processor: ProcessorName::new("Enrich"),
                index,
                details: format!("unknown record {}", id),
            })?;
        Ok(Record { id: *id, owner })
    }

    fn config(&self) -> ProcessorConfig {
        ProcessorConfig {
            timeout: Some(Duration::from_secs(1)),
            retry_policy: RetryPolicy::exponential(2, Duration::from_millis(50)),
        }
    }
}

#[derive(Debug)]
struct Summary;

#[async_trait]
impl PromiseNode for Summary {
    type Config = Vec<Record>;
    type Output = String;

    async fn run(&self, _inputs: &Inputs, records: &Vec<Record>) -> Result<String, ExecutorError> {
        let owners: Vec<&str> = records.iter().map(|r| r.owner.as_str()).collect();
        Ok(format!("{} records: {}", records.len(), owners.join(", ")))
    }
}

fn directory() -> HashMap<u64, String> {
    HashMap::from([
        (101, "alice".to_string()),
        (102, "bob".to_string()),
        (103, "carol".to_string()),
    ])
}

#[tokio::main]
async fn main() -> Result<(), ExecutorError> {
    tracing_subscriber::fmt::init();

    let mut driver = Driver::<u64, Enrich>::builder()
        .processor(Enrich {
            directory: directory(),
        })
        .build()?;
    driver.populate(vec![101, 102, 103]).await?;

    let mut records = Vec::new();
    if let Some(first) = driver.advance().await? {
        println!("#{} -> {:?} (more: {})", first.index, first.item, first.has_more);
        records.push(first.item);
    }

    let snapshot = driver.snapshot()?;
    println!("Persisted state: {}", snapshot);

    let mut resumed = Driver::<u64, Enrich>::restore(
        Enrich {
            directory: directory(),
        },
        &snapshot,
    )?;
    resumed
        .drain(|emission| {
            println!(
                "#{} -> {:?} (more: {})",
                emission.index, emission.item, emission.has_more
            );
            records.push(emission.item);
        })
        .await?;

    let ids: Vec<u64> = records.iter().map(|r| r.id).collect();
    println!("Processed ids: {:?}", ids);

    let summary = run_promise(&Summary, &Inputs::default(), &records, None).await?;
    println!("{}", summary);
    Ok(())
}

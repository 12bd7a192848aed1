use async_trait::async_trait;
use iterflow::prelude::*;
use iterflow::{HookType, Passthrough, ProcessorName};
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Fails on `fail_at` until `failures` runs out.
#[derive(Debug)]
struct Flaky {
    fail_at: usize,
    failures: AtomicU32,
    attempts: AtomicUsize,
    retry_policy: RetryPolicy,
}

impl Flaky {
    fn new(fail_at: usize, failures: u32, retry_policy: RetryPolicy) -> Self {
        Self {
            fail_at,
            failures: AtomicU32::new(failures),
            attempts: AtomicUsize::new(0),
            retry_policy,
        }
    }
}

#[async_trait]
impl ItemProcessor<String> for Flaky {
    type Output = String;

    async fn process(&self, item: &String, index: usize) -> Result<String, ExecutorError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if index == self.fail_at && self.failures.load(Ordering::SeqCst) > 0 {
            self.failures.fetch_sub(1, Ordering::SeqCst);
            return Err(ExecutorError::Processing {
                processor: ProcessorName::new("Flaky"),
                index,
                details: "transient".to_string(),
            });
        }
        Ok(format!("{}!", item))
    }

    fn config(&self) -> ProcessorConfig {
        ProcessorConfig {
            timeout: Some(Duration::from_secs(5)),
            retry_policy: self.retry_policy.clone(),
        }
    }
}

/// Records hook calls and fails its success hook.
#[derive(Debug, Default)]
struct Audited {
    successes: Arc<AtomicUsize>,
}

#[async_trait]
impl ItemProcessor<u32> for Audited {
    type Output = u32;

    async fn process(&self, item: &u32, _index: usize) -> Result<u32, ExecutorError> {
        Ok(item + 1)
    }

    async fn on_success(&self, _index: usize) -> Result<(), ExecutorError> {
        self.successes.fetch_add(1, Ordering::SeqCst);
        Err(ExecutorError::HookError {
            processor: ProcessorName::new("Audited"),
            hook_type: HookType::OnSuccess,
            details: "audit log unavailable".to_string(),
        })
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

async fn drive<P: ItemProcessor<String>>(
    executor: &CallbackExecutor<P>,
    state: &IterationState<String>,
    event: &Event<String>,
) -> Result<(IterationState<String>, Option<Emission<P::Output>>), ExecutorError> {
    let mut out = None;
    let next = executor.handle(event, state, |e| out = Some(e)).await?;
    Ok((next, out))
}

#[tokio::test]
async fn test_three_item_scenario() {
    let executor = CallbackExecutor::new(Passthrough);
    let state = executor.initialize(&Inputs::default());
    let (mut state, _) = drive(&executor, &state, &Event::populate(strings(&["a", "b", "c"])))
        .await
        .unwrap();

    let mut emissions = Vec::new();
    for _ in 0..3 {
        let (next, out) = drive(&executor, &state, &Event::advance()).await.unwrap();
        emissions.push(out.unwrap());
        state = next;
    }

    let expected = vec![
        Emission { item: "a".to_string(), index: 0, has_more: true },
        Emission { item: "b".to_string(), index: 1, has_more: true },
        Emission { item: "c".to_string(), index: 2, has_more: false },
    ];
    assert_eq!(emissions, expected);
    assert_eq!(state.current_index(), 3);
    assert!(state.is_complete());
}

#[tokio::test]
async fn test_n_signals_drain_n_items() {
    for n in [1usize, 2, 5, 17] {
        let items: Vec<String> = (0..n).map(|i| format!("item-{}", i)).collect();
        let executor = CallbackExecutor::new(Passthrough);
        let (mut state, _) = drive(&executor, &IterationState::new(), &Event::populate(items))
            .await
            .unwrap();

        for i in 0..n {
            assert!(!state.is_complete());
            let (next, out) = drive(&executor, &state, &Event::advance()).await.unwrap();
            let emission = out.unwrap();
            assert_eq!(emission.index, i);
            assert_eq!(emission.item, format!("item-{}", i));
            assert_eq!(emission.has_more, i < n - 1);
            state = next;
        }
        assert!(state.is_complete());
        assert_eq!(state.current_index(), n);
    }
}

#[tokio::test]
async fn test_terminal_state_is_idempotent() {
    let executor = CallbackExecutor::new(Passthrough);
    let (mut state, _) = drive(&executor, &IterationState::new(), &Event::populate(strings(&["x"])))
        .await
        .unwrap();
    state = drive(&executor, &state, &Event::advance()).await.unwrap().0;
    assert!(state.is_complete());

    for event in [Event::advance(), Event::empty(), Event::populate(strings(&["y"]))] {
        let (next, out) = drive(&executor, &state, &event).await.unwrap();
        assert!(out.is_none());
        assert_eq!(next, state);
    }
}

#[tokio::test]
async fn test_population_happens_once() {
    let executor = CallbackExecutor::new(Passthrough);
    let (state, _) = drive(&executor, &IterationState::new(), &Event::populate(strings(&["a", "b"])))
        .await
        .unwrap();
    let (state, _) = drive(&executor, &state, &Event::advance()).await.unwrap();

    let (next, out) = drive(&executor, &state, &Event::populate(strings(&["z"])))
        .await
        .unwrap();
    assert!(out.is_none());
    assert_eq!(next.items(), state.items());
    assert_eq!(next.current_index(), 1);
}

#[tokio::test]
async fn test_empty_sequence_completes_on_first_signal() {
    let executor = CallbackExecutor::new(Passthrough);
    let (state, _) = drive(&executor, &IterationState::new(), &Event::populate(Vec::new()))
        .await
        .unwrap();
    assert!(!state.is_complete());

    let (state, out) = drive(&executor, &state, &Event::advance()).await.unwrap();
    assert!(out.is_none());
    assert!(state.is_complete());
    assert_eq!(state.current_index(), 0);
}

#[tokio::test]
async fn test_failed_item_is_replayed() {
    let executor = CallbackExecutor::new(Flaky::new(1, 1, RetryPolicy::None));
    let (state, _) = drive(&executor, &IterationState::new(), &Event::populate(strings(&["a", "b", "c"])))
        .await
        .unwrap();
    let (state, _) = drive(&executor, &state, &Event::advance()).await.unwrap();

    let failed = drive(&executor, &state, &Event::advance()).await;
    assert!(matches!(
        failed,
        Err(ExecutorError::Processing { index: 1, .. })
    ));

    let (state, out) = drive(&executor, &state, &Event::advance()).await.unwrap();
    let emission = out.unwrap();
    assert_eq!(emission.index, 1);
    assert_eq!(emission.item, "b!");
    assert_eq!(state.current_index(), 2);
}

#[tokio::test]
async fn test_driver_retries_same_item() {
    let mut driver = Driver::<String, Flaky>::builder()
        .processor(Flaky::new(0, 2, RetryPolicy::fixed(2, Duration::from_millis(1))))
        .build()
        .unwrap();
    driver.populate(strings(&["a", "b"])).await.unwrap();

    let mut emissions = Vec::new();
    let forwarded = driver.drain(|e| emissions.push(e)).await.unwrap();
    assert_eq!(forwarded, 2);
    let indices: Vec<usize> = emissions.iter().map(|e| e.index).collect();
    assert_eq!(indices, vec![0, 1]);
    assert_eq!(emissions[0].item, "a!");
    // two failed attempts on item 0, then one success each
    assert_eq!(driver.executor().processor().attempts.load(Ordering::SeqCst), 4);
    assert!(driver.is_complete());
}

#[tokio::test]
async fn test_driver_gives_up_after_retries() {
    let mut driver = Driver::<String, Flaky>::builder()
        .processor(Flaky::new(0, 5, RetryPolicy::fixed(1, Duration::from_millis(1))))
        .build()
        .unwrap();
    driver.populate(strings(&["a"])).await.unwrap();

    let result = driver.advance().await;
    assert!(matches!(result, Err(ExecutorError::Processing { .. })));
    assert_eq!(driver.state().current_index(), 0);
    assert!(!driver.is_complete());
}

#[tokio::test]
async fn test_hook_failure_does_not_change_outcome() {
    let successes = Arc::new(AtomicUsize::new(0));
    let mut driver = Driver::<u32, Audited>::builder()
        .processor(Audited {
            successes: Arc::clone(&successes),
        })
        .build()
        .unwrap();
    driver.populate(vec![1, 2, 3]).await.unwrap();

    let mut emissions = Vec::new();
    driver.drain(|e| emissions.push(e)).await.unwrap();
    let items: Vec<u32> = emissions.iter().map(|e| e.item).collect();
    assert_eq!(items, vec![2, 3, 4]);
    assert_eq!(successes.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_snapshot_and_restore() {
    let mut driver = Driver::<String, Passthrough>::builder()
        .processor(Passthrough)
        .build()
        .unwrap();
    driver.populate(strings(&["a", "b", "c"])).await.unwrap();
    driver.advance().await.unwrap();

    let snapshot = driver.snapshot().unwrap();
    let mut restored = Driver::<String, Passthrough>::restore(Passthrough, &snapshot).unwrap();
    assert_eq!(restored.state(), driver.state());

    let next = restored.advance().await.unwrap().unwrap();
    assert_eq!(next.index, 1);
    assert_eq!(next.item, "b");
}

#[test]
fn test_restore_rejects_inconsistent_state() {
    let tampered = r#"{"items":["a","b"],"currentIndex":1,"isComplete":true}"#;
    let result = Driver::<String, Passthrough>::restore(Passthrough, tampered);
    assert!(matches!(result, Err(ExecutorError::InvalidState(_))));

    let garbage = "{not json";
    let result = Driver::<String, Passthrough>::restore(Passthrough, garbage);
    assert!(matches!(result, Err(ExecutorError::Serialization(_))));
}

#[derive(Debug)]
struct Lookup;

#[async_trait]
impl PromiseNode for Lookup {
    type Config = String;
    type Output = String;

    async fn run(&self, inputs: &Inputs, prefix: &String) -> Result<String, ExecutorError> {
        let key = inputs
            .payload
            .get("key")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ExecutorError::Configuration("missing key".to_string()))?;
        Ok(format!("{}{}", prefix, key))
    }
}

#[tokio::test]
async fn test_run_promise() {
    let inputs = Inputs::with_payload(serde_json::json!({"key": "42"}));
    let output = run_promise(&Lookup, &inputs, &"id-".to_string(), Some(Duration::from_secs(1)))
        .await
        .unwrap();
    assert_eq!(output, "id-42");

    let result = run_promise(&Lookup, &Inputs::default(), &"id-".to_string(), None).await;
    assert!(matches!(result, Err(ExecutorError::Configuration(_))));
}

#[test]
fn test_blocking_host() {
    let executor = CallbackExecutor::new(Passthrough);
    let state = tokio_test::block_on(executor.handle(
        &Event::populate(vec![1u8]),
        &IterationState::new(),
        |_| {},
    ))
    .unwrap();
    assert_eq!(state.items(), &[1u8]);
}

#[tokio::test]
async fn test_drain_forwards_items_before_failure() {
    let mut driver = Driver::<String, Flaky>::builder()
        .processor(Flaky::new(2, 1, RetryPolicy::None))
        .build()
        .unwrap();
    driver.populate(strings(&["a", "b", "c", "d"])).await.unwrap();

    let mut indices = Vec::new();
    let first = driver.drain(|e| indices.push(e.index)).await;
    assert!(matches!(first, Err(ExecutorError::Processing { index: 2, .. })));
    assert_eq!(indices, vec![0, 1]);
    assert_eq!(driver.state().current_index(), 2);

    let forwarded = driver.drain(|e| indices.push(e.index)).await.unwrap();
    assert_eq!(forwarded, 2);
    assert_eq!(indices, vec![0, 1, 2, 3]);
    assert!(driver.is_complete());
}

#[tokio::test]
async fn test_snapshot_keeps_unpopulated_apart_from_empty() {
    let fresh = Driver::<String, Passthrough>::builder()
        .processor(Passthrough)
        .build()
        .unwrap();
    let fresh_snapshot = fresh.snapshot().unwrap();
    let restored_fresh = Driver::<String, Passthrough>::restore(Passthrough, &fresh_snapshot).unwrap();
    assert_eq!(restored_fresh.state(), fresh.state());
    assert!(!restored_fresh.state().is_populated());

    let mut empty = Driver::<String, Passthrough>::builder()
        .processor(Passthrough)
        .build()
        .unwrap();
    empty.populate(Vec::new()).await.unwrap();
    let empty_snapshot = empty.snapshot().unwrap();
    assert_ne!(fresh_snapshot, empty_snapshot);

    let mut restored_empty = Driver::<String, Passthrough>::restore(Passthrough, &empty_snapshot).unwrap();
    assert_eq!(restored_empty.state(), empty.state());
    assert!(restored_empty.state().is_populated());
    assert!(!restored_empty.is_complete());

    let emission = restored_empty.advance().await.unwrap();
    assert!(emission.is_none());
    assert!(restored_empty.is_complete());
}

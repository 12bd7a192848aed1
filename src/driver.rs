use crate::error::{ExecutorError, HookType};
use crate::event::{Emission, Event, Inputs};
use crate::executor::CallbackExecutor;
use crate::processor::{ItemProcessor, ProcessorConfig, ProcessorName, PromiseNode};
use crate::state::IterationState;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Hosts one iteration: owns its state and feeds it events one at a time.
///
/// Because [`deliver`](Self::deliver) takes `&mut self`, two events can never
/// be in flight for the same state. The driver also applies the processor's
/// timeout and retry policy and runs its lifecycle hooks.
pub struct Driver<T, P> {
    executor: CallbackExecutor<P>,
    state: IterationState<T>,
    config: ProcessorConfig,
}

impl<T, P> fmt::Debug for Driver<T, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Driver")
            .field("current_index", &self.state.current_index())
            .field("len", &self.state.len())
            .field("is_complete", &self.state.is_complete())
            .field("config", &self.config)
            .finish()
    }
}

impl<T, P> Driver<T, P>
where
    T: Clone + Send + Sync,
    P: ItemProcessor<T>,
{
    pub fn builder() -> DriverBuilder<T, P> {
        DriverBuilder::new()
    }

    pub fn state(&self) -> &IterationState<T> {
        &self.state
    }

    pub fn is_complete(&self) -> bool {
        self.state.is_complete()
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    pub fn executor(&self) -> &CallbackExecutor<P> {
        &self.executor
    }

    /// Delivers one event, retrying failed processing per the retry policy.
    ///
    /// On success the driver's state is replaced by the executor's result and
    /// the emission (if any) is returned. On failure the state is untouched.
    pub async fn deliver(
        &mut self,
        event: &Event<T>,
    ) -> Result<Option<Emission<P::Output>>, ExecutorError> {
        let name = self.executor.processor().name();
        let max_retries = self.config.retry_policy.max_retries();
        let mut attempt = 0;

        loop {
            match self.handle_once(&name, event).await {
                Ok((next, emitted)) => {
                    self.commit(&name, next, emitted.as_ref()).await;
                    return Ok(emitted);
                }
                Err(e) if attempt < max_retries => {
                    self.log_and_wait_for_retry(&name, attempt, &e).await;
                    attempt += 1;
                }
                Err(e) => {
                    let index = self.state.current_index();
                    warn!(
                        "Processor '{}' failed at index {} after {} retries: {}",
                        name, index, attempt, e
                    );
                    if let Err(hook) = self.executor.processor().on_failure(index, &e).await {
                        let hook_error = ExecutorError::HookError {
                            processor: name.clone(),
                            hook_type: HookType::OnFailure,
                            details: hook.to_string(),
                        };
                        warn!("{}", hook_error);
                    }
                    return Err(e);
                }
            }
        }
    }

    /// Delivers the initial item sequence.
    pub async fn populate(&mut self, items: Vec<T>) -> Result<(), ExecutorError> {
        self.deliver(&Event::populate(items)).await.map(|_| ())
    }

    /// Delivers one continuation signal.
    pub async fn advance(&mut self) -> Result<Option<Emission<P::Output>>, ExecutorError> {
        self.deliver(&Event::advance()).await
    }

    /// Advances until the iteration completes, handing each emission to `sink`
    /// as soon as it is produced. Returns the number of emissions forwarded.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError::Configuration`] if no items were populated.
    /// A processing error stops the drain at the failed item; everything
    /// before it has already reached `sink`, so a second `drain` picks up
    /// exactly where this one stopped.
    pub async fn drain<F>(&mut self, mut sink: F) -> Result<usize, ExecutorError>
    where
        F: FnMut(Emission<P::Output>),
    {
        if !self.state.is_populated() {
            return Err(ExecutorError::Configuration(
                "Items must be populated before draining".to_string(),
            ));
        }
        let mut forwarded = 0;
        while !self.state.is_complete() {
            if let Some(emission) = self.advance().await? {
                sink(emission);
                forwarded += 1;
            }
        }
        Ok(forwarded)
    }

    async fn handle_once(
        &self,
        name: &ProcessorName,
        event: &Event<T>,
    ) -> Result<(IterationState<T>, Option<Emission<P::Output>>), ExecutorError> {
        let mut emitted = None;
        let handled = self
            .executor
            .handle(event, &self.state, |e| emitted = Some(e));

        let next = match self.config.timeout {
            Some(limit) => match timeout(limit, handled).await {
                Ok(result) => result?,
                Err(_) => {
                    return Err(ExecutorError::Timeout {
                        processor: name.clone(),
                        index: self.state.current_index(),
                    })
                }
            },
            None => handled.await?,
        };
        Ok((next, emitted))
    }

    async fn commit(
        &mut self,
        name: &ProcessorName,
        next: IterationState<T>,
        emitted: Option<&Emission<P::Output>>,
    ) {
        if let Some(emission) = emitted {
            info!(
                "Processor '{}' emitted item {} (has_more: {})",
                name, emission.index, emission.has_more
            );
            if let Err(hook) = self.executor.processor().on_success(emission.index).await {
                let hook_error = ExecutorError::HookError {
                    processor: name.clone(),
                    hook_type: HookType::OnSuccess,
                    details: hook.to_string(),
                };
                warn!("{}", hook_error);
            }
        } else if next.is_populated() && !self.state.is_populated() {
            debug!("Processor '{}' adopted {} items", name, next.len());
        } else if next.is_complete() == self.state.is_complete() {
            debug!("Processor '{}' ignored event", name);
        }
        if next.is_complete() && !self.state.is_complete() {
            info!("Processor '{}' completed after {} items", name, next.len());
        }
        self.state = next;
    }

    async fn log_and_wait_for_retry(&self, name: &ProcessorName, attempt: u32, error: &ExecutorError) {
        info!(
            "Processor '{}' failed at index {}: {}, retrying ({}/{})",
            name,
            self.state.current_index(),
            error,
            attempt + 1,
            self.config.retry_policy.max_retries()
        );
        if let Some(delay) = self.config.retry_policy.delay_for_attempt(attempt) {
            tokio::time::sleep(delay).await;
        }
    }
}

impl<T, P> Driver<T, P>
where
    T: Clone + Send + Sync + Serialize,
    P: ItemProcessor<T>,
{
    /// Encodes the current state as JSON for the host to persist.
    pub fn snapshot(&self) -> Result<String, ExecutorError> {
        Ok(serde_json::to_string(&self.state)?)
    }
}

impl<T, P> Driver<T, P>
where
    T: Clone + Send + Sync + DeserializeOwned,
    P: ItemProcessor<T>,
{
    /// Rebuilds a driver from a JSON snapshot produced by [`snapshot`](Self::snapshot).
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError::Serialization`] for malformed JSON and
    /// [`ExecutorError::InvalidState`] for a state that breaks its invariants.
    pub fn restore(processor: P, snapshot: &str) -> Result<Self, ExecutorError> {
        let state: IterationState<T> = serde_json::from_str(snapshot)?;
        Self::builder().processor(processor).state(state).build()
    }
}

/// Builder for constructing [`Driver`] instances.
pub struct DriverBuilder<T, P> {
    processor: Option<P>,
    inputs: Inputs,
    state: Option<IterationState<T>>,
    config: Option<ProcessorConfig>,
}

impl<T, P> Default for DriverBuilder<T, P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, P> DriverBuilder<T, P> {
    pub fn new() -> Self {
        Self {
            processor: None,
            inputs: Inputs::default(),
            state: None,
            config: None,
        }
    }

    pub fn processor(mut self, processor: P) -> Self {
        self.processor = Some(processor);
        self
    }

    /// Inputs handed to `initialize` when no state is supplied.
    pub fn inputs(mut self, inputs: Inputs) -> Self {
        self.inputs = inputs;
        self
    }

    /// Resume from an existing state instead of initializing a fresh one.
    pub fn state(mut self, state: IterationState<T>) -> Self {
        self.state = Some(state);
        self
    }

    /// Override the processor's own [`ProcessorConfig`].
    pub fn config(mut self, config: ProcessorConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn build(self) -> Result<Driver<T, P>, ExecutorError>
    where
        T: Clone + Send + Sync,
        P: ItemProcessor<T>,
    {
        let processor = self.processor.ok_or_else(|| {
            ExecutorError::Configuration("Processor must be specified".to_string())
        })?;
        let executor = CallbackExecutor::new(processor);

        let config = self
            .config
            .unwrap_or_else(|| executor.processor().config());
        if config.timeout == Some(Duration::ZERO) {
            return Err(ExecutorError::Configuration(
                "Timeout must be greater than zero".to_string(),
            ));
        }

        let state = match self.state {
            Some(state) => {
                state.check_invariants()?;
                state
            }
            None => executor.initialize(&self.inputs),
        };

        Ok(Driver {
            executor,
            state,
            config,
        })
    }
}

/// Runs a single-shot node once, under an optional timeout.
///
/// There is no retry and no state: the node's result is returned as is.
pub async fn run_promise<N: PromiseNode>(
    node: &N,
    inputs: &Inputs,
    config: &N::Config,
    limit: Option<Duration>,
) -> Result<N::Output, ExecutorError> {
    let name = node.name();
    let result = match limit {
        Some(limit) => match timeout(limit, node.run(inputs, config)).await {
            Ok(result) => result,
            Err(_) => Err(ExecutorError::Timeout {
                processor: name.clone(),
                index: 0,
            }),
        },
        None => node.run(inputs, config).await,
    };

    match &result {
        Ok(_) => info!("Node '{}' completed successfully", name),
        Err(e) => warn!("Node '{}' failed: {}", name, e),
    }
    result
}

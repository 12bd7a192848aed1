//! The iterative callback executor.

use crate::error::ExecutorError;
use crate::event::{Emission, Event, Inputs};
use crate::processor::ItemProcessor;
use crate::state::IterationState;

/// Turns a sequence of items into one emission per continuation signal.
///
/// The executor is a reducer: [`handle`](Self::handle) takes an event and the
/// current state and returns the next state. It holds no iteration state of
/// its own; the caller owns the state between events and must not handle two
/// events for the same state concurrently.
///
/// Population and advancement are separate steps. Draining `N` items takes
/// one population event followed by `N` continuation signals.
///
/// # Examples
///
/// ```
/// use iterflow::{CallbackExecutor, Event, Inputs, Passthrough};
///
/// # tokio_test::block_on(async {
/// let executor = CallbackExecutor::new(Passthrough);
/// let state = executor.initialize::<&str>(&Inputs::default());
///
/// let state = executor
///     .handle(&Event::populate(vec!["a", "b"]), &state, |_| {})
///     .await?;
///
/// let mut emitted = None;
/// let state = executor
///     .handle(&Event::advance(), &state, |e| emitted = Some(e))
///     .await?;
///
/// let emission = emitted.expect("first item");
/// assert_eq!(emission.item, "a");
/// assert_eq!(emission.index, 0);
/// assert!(emission.has_more);
/// assert_eq!(state.current_index(), 1);
/// # Ok::<(), iterflow::ExecutorError>(())
/// # }).unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct CallbackExecutor<P> {
    processor: P,
}

impl<P> CallbackExecutor<P> {
    pub fn new(processor: P) -> Self {
        Self { processor }
    }

    pub fn processor(&self) -> &P {
        &self.processor
    }

    /// Creates the state for a new iteration. The inputs are not consulted.
    pub fn initialize<T>(&self, _inputs: &Inputs) -> IterationState<T> {
        IterationState::new()
    }

    /// Handles one event and returns the next state.
    ///
    /// Rules, first match wins:
    ///
    /// 1. The items are populated and exhausted, and either the state is
    ///    already complete or the event carries a continuation signal: the
    ///    returned state is marked complete and nothing is emitted. Repeating
    ///    this is a no-op.
    /// 2. The event carries a continuation signal and an item is under the
    ///    cursor: the item is processed, emitted, and the cursor advances.
    /// 3. The items are not yet populated and the event's config supplies
    ///    them: they are adopted. Nothing is emitted.
    /// 4. Otherwise the state is returned unchanged.
    ///
    /// `emit` is called at most once.
    ///
    /// # Errors
    ///
    /// Returns the processor's error unchanged. No emission happens and the
    /// caller's state is left as it was, so delivering the same event again
    /// retries the same item.
    pub async fn handle<T, F>(
        &self,
        event: &Event<T>,
        state: &IterationState<T>,
        emit: F,
    ) -> Result<IterationState<T>, ExecutorError>
    where
        T: Clone + Send + Sync,
        P: ItemProcessor<T>,
        F: FnOnce(Emission<P::Output>),
    {
        debug_assert!(
            state.check_invariants().is_ok(),
            "handle called with an inconsistent state: {:?}",
            state.check_invariants()
        );

        // An empty sequence waits for a continuation signal before completing.
        if state.is_exhausted() && (state.is_complete() || event.is_continuation()) {
            return Ok(state.completed());
        }

        if event.is_continuation() {
            if let Some(item) = state.current_item() {
                let index = state.current_index();
                let output = self.processor.process(item, index).await?;
                emit(Emission {
                    item: output,
                    index,
                    has_more: index + 1 < state.len(),
                });
                return Ok(state.advanced());
            }
        }

        if !state.is_populated() {
            if let Some(items) = event.config_items() {
                return Ok(IterationState::populated(items.clone()));
            }
        }

        Ok(state.clone())
    }
}

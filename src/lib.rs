//! # iterflow
//!
//! Iterative callback nodes for workflow hosts.
//!
//! A callback node keeps state across externally triggered events. It adopts
//! a sequence of items once, then emits one processed item per continuation
//! signal until the sequence is exhausted. A promise node is the single-shot
//! case: one input, one output, no state.
//!
//! ## Features
//!
//! - **Reducer core**: [`CallbackExecutor::handle`] maps `(event, state)` to the
//!   next state and never mutates the caller's copy
//! - **Replay-safe failures**: a failed item leaves the state untouched, so the
//!   same event retries the same item
//! - **Injected processors**: per-item work is an [`ItemProcessor`] passed by
//!   constructor, never looked up globally
//! - **Hosting driver**: [`Driver`] serializes events, applies timeouts and
//!   [`RetryPolicy`], and snapshots state as JSON
//!
//! ## Quick Start
//!
//! ```rust
//! use iterflow::prelude::*;
//! use async_trait::async_trait;
//!
//! define_processor!(Upper);
//!
//! #[async_trait]
//! impl ItemProcessor<String> for Upper {
//!     type Output = String;
//!
//!     async fn process(&self, item: &String, _index: usize) -> Result<String, ExecutorError> {
//!         Ok(item.to_uppercase())
//!     }
//! }
//!
//! # #[tokio::main]
//! # async fn main() {
//! let mut driver = Driver::<String, Upper>::builder()
//!     .processor(Upper)
//!     .build()
//!     .expect("valid driver");
//!
//! driver
//!     .populate(vec!["a".to_string(), "b".to_string()])
//!     .await
//!     .expect("populated");
//!
//! let first = driver.advance().await.expect("processed").expect("emitted");
//! assert_eq!(first.item, "A");
//! assert!(first.has_more);
//!
//! let mut rest = Vec::new();
//! driver.drain(|e| rest.push(e.item)).await.expect("drained");
//! assert_eq!(rest, vec!["B".to_string()]);
//! assert!(driver.is_complete());
//! # }
//! ```
//!
//! ## Handling Events Directly
//!
//! Hosts that keep state themselves can call the executor without a driver:
//!
//! ```rust
//! use iterflow::{CallbackExecutor, Event, Inputs, Passthrough};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), iterflow::ExecutorError> {
//! let executor = CallbackExecutor::new(Passthrough);
//! let mut state = executor.initialize::<u32>(&Inputs::default());
//!
//! state = executor.handle(&Event::populate(vec![10, 20]), &state, |_| {}).await?;
//!
//! let mut seen = Vec::new();
//! while !state.is_complete() {
//!     state = executor
//!         .handle(&Event::advance(), &state, |e| seen.push(e.item))
//!         .await?;
//! }
//! assert_eq!(seen, vec![10, 20]);
//! # Ok(())
//! # }
//! ```

mod driver;
mod error;
mod event;
mod executor;
mod processor;
mod state;

pub mod prelude;

pub use driver::{run_promise, Driver, DriverBuilder};
pub use error::{ExecutorError, HookType};
pub use event::{Emission, Event, EventConfig, Inputs};
pub use executor::CallbackExecutor;
pub use processor::{
    ItemProcessor, Passthrough, ProcessorConfig, ProcessorName, PromiseNode, RetryPolicy,
};
pub use state::IterationState;

/// Macro to define a unit-struct processor with minimal boilerplate
///
/// This macro creates a struct with:
/// - `const NAME: &'static str` - compile-time processor name
/// - `Debug`, `Clone`, `Copy` derives
/// - `Default` implementation
///
/// # Example
///
/// ```rust
/// use iterflow::define_processor;
///
/// define_processor!(Summarize);
/// assert_eq!(Summarize::NAME, "Summarize");
/// ```
#[macro_export]
macro_rules! define_processor {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy)]
        pub struct $name;

        impl $name {
            /// Processor name as a compile-time constant
            #[allow(dead_code)]
            pub const NAME: &'static str = stringify!($name);
        }

        impl Default for $name {
            fn default() -> Self {
                Self
            }
        }
    };
}

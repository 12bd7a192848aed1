//! Commonly used types and traits

pub use crate::define_processor;
pub use crate::driver::{run_promise, Driver};
pub use crate::error::ExecutorError;
pub use crate::event::{Emission, Event, Inputs};
pub use crate::executor::CallbackExecutor;
pub use crate::processor::{ItemProcessor, ProcessorConfig, PromiseNode, RetryPolicy};
pub use crate::state::IterationState;

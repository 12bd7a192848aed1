use crate::error::ExecutorError;
use crate::event::Inputs;
use async_trait::async_trait;
use std::fmt;
use std::time::Duration;

/// Type-safe processor name wrapper.
///
/// Used to attribute errors and log lines to the processor that produced them.
///
/// # Examples
///
/// ```
/// use iterflow::ProcessorName;
///
/// let name = ProcessorName::new("FetchRecord");
/// assert_eq!(name.as_str(), "FetchRecord");
///
/// let name: ProcessorName = "Summarize".into();
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProcessorName(String);

impl ProcessorName {
    /// Creates a new ProcessorName
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Creates a ProcessorName from a type's name (last path segment, generics dropped)
    pub fn from_type_name<T: ?Sized>() -> Self {
        let full_name = std::any::type_name::<T>();
        let base = full_name.split('<').next().unwrap_or(full_name);
        let short_name = base.rsplit("::").next().unwrap_or("UnknownProcessor");
        Self::new(short_name)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProcessorName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ProcessorName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl PartialEq<&str> for ProcessorName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Retry policy applied by a [`Driver`](crate::Driver) around each event.
///
/// The executor itself never retries; a failed event leaves the state as it
/// was, so the driver can replay it safely.
///
/// # Examples
///
/// ```
/// use iterflow::RetryPolicy;
/// use std::time::Duration;
///
/// let policy = RetryPolicy::None;
/// let policy = RetryPolicy::fixed(3, Duration::from_secs(1));
/// let policy = RetryPolicy::exponential(5, Duration::from_millis(100));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RetryPolicy {
    /// No retry - fail immediately on error.
    #[default]
    None,
    /// Fixed delay between retries.
    Fixed {
        /// Maximum number of retry attempts
        max_retries: u32,
        /// Delay between each retry
        delay: Duration,
    },
    /// Exponential backoff with configurable parameters.
    ExponentialBackoff {
        /// Maximum number of retry attempts
        max_retries: u32,
        /// Initial delay before first retry
        initial_delay: Duration,
        /// Maximum delay cap
        max_delay: Duration,
        /// Multiplier for each retry (e.g., 2 doubles the delay)
        multiplier: u32,
    },
}

impl RetryPolicy {
    /// Creates a fixed retry policy.
    pub fn fixed(max_retries: u32, delay: Duration) -> Self {
        RetryPolicy::Fixed { max_retries, delay }
    }

    /// Creates an exponential backoff retry policy with `multiplier=2` and
    /// `max_delay=60s`.
    ///
    /// ```
    /// use iterflow::RetryPolicy;
    /// use std::time::Duration;
    ///
    /// let policy = RetryPolicy::exponential(5, Duration::from_millis(100));
    /// assert_eq!(policy.delay_for_attempt(0), Some(Duration::from_millis(100)));
    /// assert_eq!(policy.delay_for_attempt(2), Some(Duration::from_millis(400)));
    /// ```
    pub fn exponential(max_retries: u32, initial_delay: Duration) -> Self {
        RetryPolicy::ExponentialBackoff {
            max_retries,
            initial_delay,
            max_delay: Duration::from_secs(60),
            multiplier: 2,
        }
    }

    pub fn max_retries(&self) -> u32 {
        match self {
            RetryPolicy::None => 0,
            RetryPolicy::Fixed { max_retries, .. } => *max_retries,
            RetryPolicy::ExponentialBackoff { max_retries, .. } => *max_retries,
        }
    }

    /// Calculates the delay before retry number `attempt` (0-indexed).
    ///
    /// Returns `None` for [`RetryPolicy::None`].
    pub fn delay_for_attempt(&self, attempt: u32) -> Option<Duration> {
        match self {
            RetryPolicy::None => None,
            RetryPolicy::Fixed { delay, .. } => Some(*delay),
            RetryPolicy::ExponentialBackoff {
                initial_delay,
                max_delay,
                multiplier,
                ..
            } => {
                let factor = (*multiplier as u64).saturating_pow(attempt);
                let delay = (initial_delay.as_millis() as u64).saturating_mul(factor);
                Some(Duration::from_millis(
                    delay.min(max_delay.as_millis() as u64),
                ))
            }
        }
    }
}

/// Per-processor execution settings, honored by the [`Driver`](crate::Driver).
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    /// Maximum time allowed to process one item. `None` means no timeout.
    /// Default: 30 seconds.
    pub timeout: Option<Duration>,
    /// Retry policy when processing fails. Default: no retry.
    pub retry_policy: RetryPolicy,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            timeout: Some(Duration::from_secs(30)),
            retry_policy: RetryPolicy::None,
        }
    }
}

/// The per-item processing step injected into a
/// [`CallbackExecutor`](crate::CallbackExecutor).
///
/// The processor receives everything it needs through its own fields; the
/// executor never looks collaborators up globally.
///
/// # Examples
///
/// ```
/// use iterflow::prelude::*;
/// use async_trait::async_trait;
///
/// define_processor!(Shout);
///
/// #[async_trait]
/// impl ItemProcessor<String> for Shout {
///     type Output = String;
///
///     async fn process(&self, item: &String, _index: usize) -> Result<String, ExecutorError> {
///         Ok(item.to_uppercase())
///     }
/// }
/// ```
#[async_trait]
pub trait ItemProcessor<T: Sync>: Send + Sync {
    /// The value embedded in each emission.
    type Output: Send;

    /// Processes one item.
    ///
    /// An error aborts the current event without advancing the cursor.
    async fn process(&self, item: &T, index: usize) -> Result<Self::Output, ExecutorError>;

    fn name(&self) -> ProcessorName {
        ProcessorName::from_type_name::<Self>()
    }

    /// Override to customize timeout and retry behavior.
    fn config(&self) -> ProcessorConfig {
        ProcessorConfig::default()
    }

    /// Called by the driver after an item is emitted.
    async fn on_success(&self, _index: usize) -> Result<(), ExecutorError> {
        Ok(())
    }

    /// Called by the driver when an item fails after all retries.
    async fn on_failure(&self, _index: usize, _error: &ExecutorError) -> Result<(), ExecutorError> {
        Ok(())
    }
}

/// Emits each item unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct Passthrough;

#[async_trait]
impl<T: Clone + Send + Sync> ItemProcessor<T> for Passthrough {
    type Output = T;

    async fn process(&self, item: &T, _index: usize) -> Result<T, ExecutorError> {
        Ok(item.clone())
    }
}

/// A single-shot node: one input, one unit of work, one output.
///
/// This is the iterative protocol collapsed to at most one item with no
/// state and no emission channel; the result is the return value itself.
///
/// # Examples
///
/// ```
/// use iterflow::prelude::*;
/// use async_trait::async_trait;
///
/// #[derive(Debug)]
/// struct Greeting;
///
/// #[async_trait]
/// impl PromiseNode for Greeting {
///     type Config = String;
///     type Output = String;
///
///     async fn run(&self, _inputs: &Inputs, name: &String) -> Result<String, ExecutorError> {
///         Ok(format!("hello, {}", name))
///     }
/// }
/// ```
#[async_trait]
pub trait PromiseNode: Send + Sync {
    type Config: Send + Sync;
    type Output: Send;

    async fn run(&self, inputs: &Inputs, config: &Self::Config)
        -> Result<Self::Output, ExecutorError>;

    fn name(&self) -> ProcessorName {
        ProcessorName::from_type_name::<Self>()
    }
}

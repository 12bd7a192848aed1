//! Events delivered to a node and the emissions it produces.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The input side of an event.
///
/// `payload` is opaque to the executor; it is carried for processors and
/// hosts that want it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Inputs {
    /// Requests the next item.
    #[serde(default)]
    pub continue_signal: bool,
    /// Caller-defined data.
    #[serde(default)]
    pub payload: Value,
}

impl Inputs {
    /// Inputs carrying a continuation signal and no payload.
    pub fn continuation() -> Self {
        Self {
            continue_signal: true,
            payload: Value::Null,
        }
    }

    /// Inputs carrying only a payload.
    pub fn with_payload(payload: Value) -> Self {
        Self {
            continue_signal: false,
            payload,
        }
    }
}

/// The configuration side of an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventConfig<T> {
    /// The item sequence to iterate. Only honored before the state is populated.
    pub items: Option<Vec<T>>,
}

impl<T> Default for EventConfig<T> {
    fn default() -> Self {
        Self { items: None }
    }
}

/// A single external stimulus.
///
/// # Examples
///
/// ```
/// use iterflow::Event;
///
/// let populate = Event::populate(vec!["a", "b"]);
/// assert!(!populate.is_continuation());
///
/// let next = Event::<&str>::advance();
/// assert!(next.is_continuation());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event<T> {
    #[serde(default)]
    pub inputs: Option<Inputs>,
    #[serde(default)]
    pub config: Option<EventConfig<T>>,
}

impl<T> Event<T> {
    /// An event with neither inputs nor config.
    pub fn empty() -> Self {
        Self {
            inputs: None,
            config: None,
        }
    }

    /// An event supplying the initial item sequence.
    pub fn populate(items: Vec<T>) -> Self {
        Self {
            inputs: None,
            config: Some(EventConfig { items: Some(items) }),
        }
    }

    /// An event carrying a continuation signal.
    pub fn advance() -> Self {
        Self {
            inputs: Some(Inputs::continuation()),
            config: None,
        }
    }

    pub fn is_continuation(&self) -> bool {
        self.inputs.as_ref().is_some_and(|i| i.continue_signal)
    }

    /// Items supplied by the event's config, if any.
    pub fn config_items(&self) -> Option<&Vec<T>> {
        self.config.as_ref().and_then(|c| c.items.as_ref())
    }
}

/// One output record, produced while handling a single event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Emission<R> {
    /// The processed item.
    pub item: R,
    /// Index of the source item.
    pub index: usize,
    /// `true` if more items follow this one.
    pub has_more: bool,
}

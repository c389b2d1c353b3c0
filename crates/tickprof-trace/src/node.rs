use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Name of an instrumented call site. Static names never allocate.
pub type SpanKey = Cow<'static, str>;

const TICK_KEY_PREFIX: &str = "Tick ";

/// Tick number named by a root key such as `Tick 42`.
pub fn parse_tick_key(key: &str) -> Option<u64> {
    key.strip_prefix(TICK_KEY_PREFIX)?.parse().ok()
}

/// A point event inside a tick, drawn as a vertical line by viewers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mark {
    pub full_name: String,
    pub short_name: String,
    /// CPU time within the tick at which the mark was added.
    #[serde(rename = "timestamp")]
    pub timestamp_within_tick: f64,
}

/// A finished timed region of one tick's call tree.
///
/// Children are kept in call order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub key: SpanKey,
    pub start: f64,
    pub cpu: f64,
    #[serde(default)]
    pub intents: u32,
    pub children: Vec<Node>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marks: Option<Vec<Mark>>,
}

impl Node {
    /// Root node for tick `tick`, before anything has been recorded.
    pub(crate) fn tick_root(tick: u64) -> Self {
        Node {
            key: Cow::Owned(format!("{TICK_KEY_PREFIX}{tick}")),
            start: 0.0,
            cpu: 0.0,
            intents: 0,
            children: Vec::new(),
            marks: None,
        }
    }

    /// CPU spent in this node itself, excluding its children.
    pub fn self_cpu(&self) -> f64 {
        let children: f64 = self.children.iter().map(|c| c.cpu).sum();
        (self.cpu - children).max(0.0)
    }

    /// Total number of nodes in this subtree, including `self`.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(Node::node_count).sum::<usize>()
    }
}

/// An open span on the recording stack.
#[derive(Debug)]
pub(crate) struct Span {
    pub(crate) key: SpanKey,
    pub(crate) start: f64,
    pub(crate) children: Vec<Node>,
    pub(crate) intents: u32,
}

impl Span {
    pub(crate) fn new(key: SpanKey, start: f64) -> Self {
        Span {
            key,
            start,
            children: Vec::new(),
            intents: 0,
        }
    }

    /// Close the span at `end`.
    pub(crate) fn finish(self, end: f64) -> Node {
        Node {
            key: self.key,
            start: self.start,
            cpu: end - self.start,
            intents: self.intents,
            children: self.children,
            marks: None,
        }
    }
}

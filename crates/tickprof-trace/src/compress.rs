//! Compact wire form of a finished call tree.
//!
//! A node is written as the positional tuple
//! `[keyId, start, cpu, intents, children]`. Viewers depend on this exact
//! order and arity, and rebuild call order from child position alone.

use crate::intern::KeyMap;
use crate::node::{Mark, Node};
use serde::{Deserialize, Serialize};

/// Decimal digits kept for `start` and `cpu`.
pub const PRECISION_DIGITS: i32 = 4;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompressedNode(pub u32, pub f64, pub f64, pub u32, pub Vec<CompressedNode>);

impl CompressedNode {
    pub fn key_id(&self) -> u32 {
        self.0
    }

    pub fn start(&self) -> f64 {
        self.1
    }

    pub fn cpu(&self) -> f64 {
        self.2
    }

    pub fn intents(&self) -> u32 {
        self.3
    }

    pub fn children(&self) -> &[CompressedNode] {
        &self.4
    }
}

/// One tick's tree as stored in the history ring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompressedDump {
    /// Wall-clock epoch milliseconds at which the tick ended.
    #[serde(rename = "t")]
    pub captured_at: i64,
    #[serde(rename = "m")]
    pub marks: Vec<Mark>,
    #[serde(rename = "d")]
    pub root: CompressedNode,
}

impl CompressedDump {
    pub fn cpu(&self) -> f64 {
        self.root.cpu()
    }
}

/// Round to `PRECISION_DIGITS` decimal places.
pub fn round_precision(value: f64) -> f64 {
    let scale = 10f64.powi(PRECISION_DIGITS);
    (value * scale).round() / scale
}

/// Map a finished tree onto interned ids, preserving child order.
pub fn compress(node: &Node, keys: &mut KeyMap) -> CompressedNode {
    let key_id = keys.intern(&node.key);
    let children = node
        .children
        .iter()
        .map(|child| compress(child, keys))
        .collect();
    CompressedNode(
        key_id,
        round_precision(node.start),
        round_precision(node.cpu),
        node.intents,
        children,
    )
}

/// Compress a tick root together with its marks.
pub fn compress_dump(root: &Node, keys: &mut KeyMap, captured_at: i64) -> CompressedDump {
    CompressedDump {
        captured_at,
        marks: root.marks.clone().unwrap_or_default(),
        root: compress(root, keys),
    }
}

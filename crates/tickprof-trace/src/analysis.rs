//! Reading stored history back: decompression, tick ordering, per-key
//! summaries and folded stacks.

use crate::compress::{CompressedDump, CompressedNode};
use crate::error::{Error, Result};
use crate::history::History;
use crate::intern::KeyMap;
use crate::node::{Node, parse_tick_key};
use serde::Serialize;
use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};

/// Rebuild the call tree of one dump. The dump's marks land on the root.
pub fn decompress_dump(keys: &KeyMap, dump: &CompressedDump) -> Result<Node> {
    rebuild(&keys.invert(), dump)
}

fn rebuild(names: &HashMap<u32, &str>, dump: &CompressedDump) -> Result<Node> {
    let mut root = decompress_node(names, &dump.root)?;
    root.marks = Some(dump.marks.clone());
    Ok(root)
}

fn decompress_node(names: &HashMap<u32, &str>, node: &CompressedNode) -> Result<Node> {
    let key = names
        .get(&node.key_id())
        .ok_or(Error::UnknownKeyId(node.key_id()))?;
    let children = node
        .children()
        .iter()
        .map(|child| decompress_node(names, child))
        .collect::<Result<Vec<_>>>()?;
    Ok(Node {
        key: Cow::Owned((*key).to_owned()),
        start: node.start(),
        cpu: node.cpu(),
        intents: node.intents(),
        children,
        marks: None,
    })
}

fn tick_number(names: &HashMap<u32, &str>, dump: &CompressedDump) -> Result<u64> {
    let id = dump.root.key_id();
    let key = names.get(&id).ok_or(Error::UnknownKeyId(id))?;
    parse_tick_key(key).ok_or_else(|| Error::NotATickKey((*key).to_owned()))
}

impl History {
    /// Every populated slot as a full tree, oldest tick first.
    pub fn decompress(&self) -> Result<Vec<Node>> {
        let names = self.key_map.invert();
        self.ordered(&names)?
            .into_iter()
            .map(|(_, dump)| rebuild(&names, dump))
            .collect()
    }

    /// Populated dumps with the tick each one recorded, oldest tick first.
    ///
    /// The order comes from the tick number in the root key. Several ticks
    /// can finish within one wall-clock millisecond, so capture time only
    /// separates dumps carrying the same tick number.
    pub fn ticks(&self) -> Result<Vec<(u64, &CompressedDump)>> {
        self.ordered(&self.key_map.invert())
    }

    fn ordered<'a>(
        &'a self,
        names: &HashMap<u32, &str>,
    ) -> Result<Vec<(u64, &'a CompressedDump)>> {
        let mut ticks = self
            .dumps()
            .map(|dump| Ok((tick_number(names, dump)?, dump)))
            .collect::<Result<Vec<_>>>()?;
        ticks.sort_by_key(|(tick, dump)| (*tick, dump.captured_at));
        Ok(ticks)
    }

    /// The stored dump with the highest tick number.
    pub fn latest(&self) -> Result<Option<(u64, &CompressedDump)>> {
        Ok(self.ticks()?.pop())
    }

    /// The dump recorded for `tick`, or `None` when its slot is empty or now
    /// holds a different tick.
    pub fn tick(&self, tick: u64) -> Result<Option<&CompressedDump>> {
        let Some(dump) = self
            .slot_index(tick)
            .and_then(|slot| self.slots[slot].as_ref())
        else {
            return Ok(None);
        };
        let stored = tick_number(&self.key_map.invert(), dump)?;
        Ok((stored == tick).then_some(dump))
    }
}

/// Per-key totals over a call tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryItem {
    pub key: String,
    /// Sum of `cpu` over every node with this key.
    pub total: f64,
    pub count: u32,
    /// `total` as a percentage of the root's cpu.
    pub percent: f64,
}

/// Total cpu and call count per key, largest total first.
///
/// Recursive calls count once per node, so a key's total can exceed the
/// root's cpu.
pub fn summarize(root: &Node) -> Vec<SummaryItem> {
    summarize_all(std::slice::from_ref(root))
}

/// Like `summarize`, but over several trees; percentages are relative to
/// the sum of the roots' cpu.
pub fn summarize_all(roots: &[Node]) -> Vec<SummaryItem> {
    fn walk<'a>(node: &'a Node, totals: &mut HashMap<&'a str, (f64, u32)>) {
        let entry = totals.entry(node.key.as_ref()).or_insert((0.0, 0));
        entry.0 += node.cpu;
        entry.1 += 1;
        for child in &node.children {
            walk(child, totals);
        }
    }

    let mut totals = HashMap::new();
    for root in roots {
        walk(root, &mut totals);
    }
    let tick_total: f64 = roots.iter().map(|root| root.cpu).sum();

    let mut items: Vec<SummaryItem> = totals
        .into_iter()
        .map(|(key, (total, count))| SummaryItem {
            key: key.to_string(),
            total,
            count,
            percent: if tick_total > 0.0 {
                total / tick_total * 100.0
            } else {
                0.0
            },
        })
        .collect();
    items.sort_by(|a, b| b.total.total_cmp(&a.total).then_with(|| a.key.cmp(&b.key)));
    items
}

/// Frame every tick root is folded into, so stacks merge across ticks.
pub const FOLDED_ROOT_FRAME: &str = "tick";

/// Collapse call trees into `(stack, weight)` pairs, the folded-stack input
/// of flame graph tools.
///
/// A stack is the `;`-joined path of keys from the root down to a node and
/// its weight is the node's self time in whole microseconds, summed over
/// every tree. Stacks whose total rounds to zero are left out. Output is
/// sorted by stack.
pub fn fold_stacks(roots: &[Node]) -> Vec<(String, u64)> {
    fn add(path: &str, cpu: f64, folded: &mut BTreeMap<String, u64>) {
        let micros = (cpu * 1000.0).round() as u64;
        if micros > 0 {
            *folded.entry(path.to_owned()).or_insert(0) += micros;
        }
    }

    fn walk(node: &Node, path: &mut String, folded: &mut BTreeMap<String, u64>) {
        let len = path.len();
        path.push(';');
        // `;` separates frames
        path.push_str(&node.key.replace(';', ":"));
        add(path, node.self_cpu(), folded);
        for child in &node.children {
            walk(child, path, folded);
        }
        path.truncate(len);
    }

    let mut folded = BTreeMap::new();
    for root in roots {
        let mut path = String::from(FOLDED_ROOT_FRAME);
        add(&path, root.self_cpu(), &mut folded);
        for child in &root.children {
            walk(child, &mut path, &mut folded);
        }
    }
    folded.into_iter().collect()
}

//! One recording pass between `start_tick` and `end_tick`.

use crate::error::Result;
use crate::node::{Mark, Node, SpanKey};
use crate::stack::RecordingStack;

#[derive(Debug)]
pub(crate) struct TickSession {
    tick: u64,
    root: Node,
    stack: RecordingStack,
    marks: Vec<Mark>,
    faulted: bool,
}

/// What a session turns into when the tick ends.
#[derive(Debug)]
pub(crate) enum Outcome {
    Finished(Node),
    /// A stack-discipline error happened during the tick; the tree is dropped.
    Discarded,
}

impl TickSession {
    pub(crate) fn new(tick: u64) -> Self {
        TickSession {
            tick,
            root: Node::tick_root(tick),
            stack: RecordingStack::new(),
            marks: Vec::new(),
            faulted: false,
        }
    }

    pub(crate) fn tick(&self) -> u64 {
        self.tick
    }

    pub(crate) fn depth(&self) -> usize {
        self.stack.depth()
    }

    pub(crate) fn is_faulted(&self) -> bool {
        self.faulted
    }

    pub(crate) fn begin(&mut self, key: SpanKey, now: f64) {
        self.stack.push(key, now);
    }

    /// Close the innermost span and thread it into its parent.
    ///
    /// Intents recorded on the closed span roll up into the parent (or the
    /// tick root). Any error marks the whole session as faulted.
    pub(crate) fn end(&mut self, key: &str, now: f64) -> Result<()> {
        let node = match self.stack.pop(key, now) {
            Ok(node) => node,
            Err(e) => {
                self.faulted = true;
                return Err(e);
            }
        };

        match self.stack.top_mut() {
            Some(parent) => {
                parent.intents = parent.intents.saturating_add(node.intents);
                parent.children.push(node);
            }
            None => {
                self.root.intents = self.root.intents.saturating_add(node.intents);
                self.root.children.push(node);
            }
        }
        Ok(())
    }

    /// Returns false when there is no open span to attribute the intent to.
    pub(crate) fn add_intent(&mut self) -> bool {
        match self.stack.top_mut() {
            Some(top) => {
                top.intents = top.intents.saturating_add(1);
                true
            }
            None => false,
        }
    }

    pub(crate) fn add_mark(&mut self, full_name: String, short_name: String, now: f64) {
        self.marks.push(Mark {
            full_name,
            short_name,
            timestamp_within_tick: now,
        });
    }

    /// Close the tick. The root's cpu is the total elapsed at `now`.
    ///
    /// Spans still open at this point are dropped; their time is only
    /// visible as self time of the root.
    pub(crate) fn finish(mut self, now: f64) -> Outcome {
        if self.is_faulted() {
            return Outcome::Discarded;
        }
        if self.stack.depth() > 0 {
            tracing::warn!(
                tick = self.tick,
                open_spans = self.stack.depth(),
                "tick ended with unclosed spans"
            );
            self.stack.clear();
        }
        self.root.cpu = now;
        self.root.marks = Some(self.marks);
        Outcome::Finished(self.root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;

    fn finished(outcome: Outcome) -> Node {
        match outcome {
            Outcome::Finished(node) => node,
            Outcome::Discarded => panic!("session was discarded"),
        }
    }

    #[test]
    fn recursive_spans_nest() {
        let mut session = TickSession::new(0);
        session.begin(Cow::Borrowed("A"), 0.0);
        session.begin(Cow::Borrowed("A"), 1.0);
        session.end("A", 2.0).unwrap();
        session.end("A", 3.0).unwrap();
        let root = finished(session.finish(3.0));

        assert_eq!(root.children.len(), 1);
        let outer = &root.children[0];
        assert_eq!(outer.key, "A");
        assert_eq!(outer.cpu, 3.0);
        assert_eq!(outer.children.len(), 1);
        assert_eq!(outer.children[0].key, "A");
        assert_eq!(outer.children[0].cpu, 1.0);
    }

    #[test]
    fn intents_roll_up_to_root() {
        let mut session = TickSession::new(1);
        assert!(!session.add_intent());
        session.begin(Cow::Borrowed("outer"), 0.0);
        session.add_intent();
        session.begin(Cow::Borrowed("inner"), 0.0);
        session.add_intent();
        session.add_intent();
        session.end("inner", 1.0).unwrap();
        session.end("outer", 2.0).unwrap();
        let root = finished(session.finish(2.0));

        let outer = &root.children[0];
        assert_eq!(outer.children[0].intents, 2);
        assert_eq!(outer.intents, 3);
        assert_eq!(root.intents, 3);
    }

    #[test]
    fn marks_attach_to_root() {
        let mut session = TickSession::new(2);
        session.add_mark("spawn creep".into(), "spawn".into(), 0.25);
        let root = finished(session.finish(1.0));
        let marks = root.marks.unwrap();
        assert_eq!(marks.len(), 1);
        assert_eq!(marks[0].short_name, "spawn");
        assert_eq!(marks[0].timestamp_within_tick, 0.25);
    }

    #[test]
    fn faulted_session_is_discarded() {
        let mut session = TickSession::new(3);
        session.begin(Cow::Borrowed("f"), 0.0);
        assert!(session.end("g", 1.0).is_err());
        assert!(session.is_faulted());
        assert_eq!(session.depth(), 1);
        assert!(matches!(session.finish(1.0), Outcome::Discarded));
    }

    #[test]
    fn unclosed_spans_are_dropped_at_finish() {
        let mut session = TickSession::new(4);
        session.begin(Cow::Borrowed("done"), 0.0);
        session.end("done", 1.0).unwrap();
        session.begin(Cow::Borrowed("never closed"), 1.0);
        let root = finished(session.finish(4.0));
        assert_eq!(root.children.len(), 1);
        assert_eq!(root.cpu, 4.0);
        assert_eq!(root.self_cpu(), 3.0);
    }
}

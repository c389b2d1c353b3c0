//! Stack of open spans for the tick being recorded.

use crate::error::{Error, Result};
use crate::node::{Node, Span, SpanKey};

#[derive(Debug, Default)]
pub(crate) struct RecordingStack {
    frames: Vec<Span>,
}

impl RecordingStack {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, key: SpanKey, start: f64) {
        self.frames.push(Span::new(key, start));
    }

    /// Pop the innermost span and close it at `end`.
    ///
    /// The top frame is checked before anything is removed, so a failed pop
    /// leaves the stack exactly as it was.
    pub(crate) fn pop(&mut self, key: &str, end: f64) -> Result<Node> {
        match self.frames.last() {
            None => {
                return Err(Error::StackUnderflow {
                    key: key.to_string(),
                });
            }
            Some(top) if top.key != key => {
                return Err(Error::StackKeyMismatch {
                    expected: top.key.to_string(),
                    found: key.to_string(),
                });
            }
            Some(_) => {}
        }
        let span = self.frames.pop().ok_or_else(|| Error::StackUnderflow {
            key: key.to_string(),
        })?;
        Ok(span.finish(end))
    }

    pub(crate) fn top_mut(&mut self) -> Option<&mut Span> {
        self.frames.last_mut()
    }

    pub(crate) fn depth(&self) -> usize {
        self.frames.len()
    }

    pub(crate) fn clear(&mut self) {
        self.frames.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;

    #[test]
    fn pop_returns_finished_node() {
        let mut stack = RecordingStack::new();
        stack.push(Cow::Borrowed("f"), 1.0);
        let node = stack.pop("f", 3.5).unwrap();
        assert_eq!(node.key, "f");
        assert_eq!(node.start, 1.0);
        assert_eq!(node.cpu, 2.5);
        assert_eq!(stack.depth(), 0);
    }

    #[test]
    fn pop_on_empty_stack_underflows() {
        let mut stack = RecordingStack::new();
        let err = stack.pop("f", 0.0).unwrap_err();
        assert!(matches!(err, Error::StackUnderflow { ref key } if key == "f"));
    }

    #[test]
    fn mismatched_pop_leaves_stack_untouched() {
        let mut stack = RecordingStack::new();
        stack.push(Cow::Borrowed("outer"), 0.0);
        stack.push(Cow::Borrowed("inner"), 1.0);

        let err = stack.pop("outer", 2.0).unwrap_err();
        match err {
            Error::StackKeyMismatch { expected, found } => {
                assert_eq!(expected, "inner");
                assert_eq!(found, "outer");
            }
            other => panic!("unexpected error: {other}"),
        }

        assert_eq!(stack.depth(), 2);
        assert_eq!(stack.top_mut().map(|s| s.key.to_string()).as_deref(), Some("inner"));
        assert!(stack.pop("inner", 2.0).is_ok());
        assert!(stack.pop("outer", 2.0).is_ok());
    }
}

use std::rc::Rc;

use crate::runtime::deque::Deque;

/// Cleanup action registered during a segment and executed when that segment
/// returns; the destructor half of "every constructor implies scope
/// management".
#[derive(Clone)]
pub struct DeferredAction(Rc<dyn Fn()>);

impl DeferredAction {
    pub fn new(action: impl Fn() + 'static) -> Self {
        DeferredAction(Rc::new(action))
    }

    pub fn run(&self) {
        (self.0)();
    }
}

impl std::fmt::Debug for DeferredAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DeferredAction")
    }
}

/// One slot on the segmented stack.
///
/// Each variant carries exactly the payload it needs; there is no "invalid"
/// state representable.
#[derive(Debug, Clone)]
pub enum StackItem {
    /// Sentinel below everything, one per stack.
    Bottom,
    /// Call boundary. Carries the previous segment's base for restoration.
    StartOfSegment { previous_start: usize },
    /// Owned byte payload.
    Data(Vec<u8>),
    /// Index of another stack slot. Aliasing, not ownership: the mechanism
    /// for passing values into a callee without copying.
    Reference(usize),
    /// Cleanup to run when the owning segment returns.
    DeferredCall(DeferredAction),
}

/// Call stack where every function invocation owns a segment and segments
/// are the unit of memory lifetime.
///
/// References may point at any earlier absolute slot, including slots in a
/// parent segment, but never forward. Raw data cannot be read across a
/// segment boundary except through a reference.
pub struct SegmentedStack {
    items: Deque<StackItem>,
    /// Absolute index of the current segment's marker (`Bottom` for the
    /// outermost pseudo-segment).
    start_of_current_segment: usize,
}

impl SegmentedStack {
    pub fn new() -> Self {
        let mut items = Deque::new();
        items.add_last(StackItem::Bottom);
        SegmentedStack {
            items,
            start_of_current_segment: 0,
        }
    }

    pub fn depth(&self) -> usize {
        self.items.len()
    }

    /// Opens a new segment for a call. Items pushed afterwards belong to the
    /// new segment and index from its base.
    pub fn call(&mut self) {
        let marker = StackItem::StartOfSegment {
            previous_start: self.start_of_current_segment,
        };
        self.items.add_last(marker);
        self.start_of_current_segment = self.items.len() - 1;
    }

    /// Pushes a data item onto the current segment and returns its absolute
    /// stack position, usable later as a reference target.
    pub fn push_data(&mut self, bytes: Vec<u8>) -> usize {
        self.items.add_last(StackItem::Data(bytes));
        self.items.len() - 1
    }

    /// Pushes a reference to an earlier absolute index (possibly in a parent
    /// segment). Panics on a forward target: references only point backward.
    pub fn push_reference(&mut self, target: usize) -> usize {
        assert!(
            target < self.items.len(),
            "reference target {} is not behind the top ({})",
            target,
            self.items.len()
        );
        self.items.add_last(StackItem::Reference(target));
        self.items.len() - 1
    }

    /// Registers a cleanup action on the current segment.
    pub fn push_deferred(&mut self, action: DeferredAction) {
        self.items.add_last(StackItem::DeferredCall(action));
    }

    /// Resolves an index relative to the current segment's base down to a
    /// data payload, following reference chains. None when the index is out
    /// of range or the chain fails to reach data (dangling reference, cycle,
    /// or a marker/sentinel in the way).
    pub fn peek_index(&self, relative: usize) -> Option<Vec<u8>> {
        let absolute = self.start_of_current_segment + 1 + relative;
        if absolute >= self.items.len() {
            return None;
        }
        self.resolve(absolute)
    }

    fn resolve(&self, mut index: usize) -> Option<Vec<u8>> {
        // A chain longer than the stack must have cycled.
        let mut hops = 0;
        loop {
            match self.items.get(index) {
                StackItem::Data(bytes) => return Some(bytes.clone()),
                StackItem::Reference(target) => {
                    hops += 1;
                    if hops > self.items.len() {
                        return None;
                    }
                    index = *target;
                }
                StackItem::Bottom
                | StackItem::StartOfSegment { .. }
                | StackItem::DeferredCall(_) => return None,
            }
        }
    }

    /// Closes the current segment: pops items back to the segment marker,
    /// collecting deferred calls in most-recently-registered-first order,
    /// and restores the caller's segment base.
    ///
    /// Returns None when no segment is open (only `Bottom` below); the stack
    /// is left untouched in that case. Data and reference items are simply
    /// discarded: the segment's storage is reclaimed as a whole, never item
    /// by item.
    ///
    /// The caller must run the returned actions, in order, after this call.
    pub fn ret(&mut self) -> Option<Vec<DeferredAction>> {
        if self.start_of_current_segment == 0 {
            // Only the Bottom sentinel below: nothing to return from.
            return None;
        }

        let mut deferred = Vec::new();
        loop {
            match self.items.remove_last() {
                StackItem::StartOfSegment { previous_start } => {
                    self.start_of_current_segment = previous_start;
                    return Some(deferred);
                }
                StackItem::DeferredCall(action) => deferred.push(action),
                StackItem::Data(_) | StackItem::Reference(_) => {}
                StackItem::Bottom => {
                    // The segment base always sits at or above Bottom; hitting
                    // it here means the bookkeeping is corrupt.
                    unreachable!("segment marker missing above bottom sentinel");
                }
            }
        }
    }
}

impl Default for SegmentedStack {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn test_call_then_return_restores_base() {
        let mut stack = SegmentedStack::new();
        let base = stack.start_of_current_segment;

        stack.call();
        let deferred = stack.ret().expect("open segment");
        assert!(deferred.is_empty());
        assert_eq!(stack.start_of_current_segment, base);
        assert_eq!(stack.depth(), 1);
    }

    #[test]
    fn test_return_with_no_segment_fails() {
        let mut stack = SegmentedStack::new();
        assert!(stack.ret().is_none());
        assert_eq!(stack.depth(), 1);
    }

    #[test]
    fn test_cross_segment_reference() {
        let mut stack = SegmentedStack::new();
        let one = stack.push_data(b"one".to_vec());

        stack.call();
        stack.push_reference(one);
        stack.push_data(b"static param".to_vec());

        assert_eq!(stack.peek_index(0), Some(b"one".to_vec()));
        assert_eq!(stack.peek_index(1), Some(b"static param".to_vec()));

        stack.ret().expect("open segment");
        // Back in the outer segment, slot 0 is "one" again.
        assert_eq!(stack.peek_index(0), Some(b"one".to_vec()));
    }

    #[test]
    fn test_peek_out_of_range() {
        let mut stack = SegmentedStack::new();
        stack.push_data(b"x".to_vec());
        assert_eq!(stack.peek_index(1), None);
    }

    #[test]
    fn test_reference_chain_resolves_through_links() {
        let mut stack = SegmentedStack::new();
        let data = stack.push_data(b"payload".to_vec());
        let r1 = stack.push_reference(data);
        stack.push_reference(r1);

        assert_eq!(stack.peek_index(2), Some(b"payload".to_vec()));
    }

    #[test]
    fn test_reference_to_marker_fails_to_resolve() {
        let mut stack = SegmentedStack::new();
        stack.call();
        // Slot 1 is the segment marker itself.
        stack.push_reference(1);
        assert_eq!(stack.peek_index(0), None);
    }

    #[test]
    #[should_panic(expected = "not behind the top")]
    fn test_forward_reference_panics() {
        let mut stack = SegmentedStack::new();
        stack.push_reference(5);
    }

    #[test]
    fn test_deferred_calls_run_most_recent_first() {
        let order = Rc::new(RefCell::new(Vec::new()));
        let mut stack = SegmentedStack::new();
        stack.call();

        for name in ["first", "second", "third"] {
            let order = order.clone();
            stack.push_deferred(DeferredAction::new(move || {
                order.borrow_mut().push(name);
            }));
        }

        let deferred = stack.ret().expect("open segment");
        assert_eq!(deferred.len(), 3);
        for action in &deferred {
            action.run();
        }
        assert_eq!(*order.borrow(), vec!["third", "second", "first"]);
    }

    #[test]
    fn test_deferred_calls_stay_with_their_segment() {
        let mut stack = SegmentedStack::new();
        stack.call();
        stack.push_deferred(DeferredAction::new(|| {}));

        stack.call();
        let inner = stack.ret().expect("inner segment");
        assert!(inner.is_empty(), "inner segment has no deferred calls");

        let outer = stack.ret().expect("outer segment");
        assert_eq!(outer.len(), 1);
    }

    #[test]
    fn test_nested_segments_unwind_in_lifo_order() {
        let mut stack = SegmentedStack::new();
        stack.push_data(b"outer".to_vec());

        stack.call();
        stack.push_data(b"mid".to_vec());
        let mid_base = stack.start_of_current_segment;

        stack.call();
        stack.push_data(b"inner".to_vec());
        assert_eq!(stack.peek_index(0), Some(b"inner".to_vec()));

        stack.ret().expect("inner");
        assert_eq!(stack.start_of_current_segment, mid_base);
        assert_eq!(stack.peek_index(0), Some(b"mid".to_vec()));

        stack.ret().expect("mid");
        assert_eq!(stack.peek_index(0), Some(b"outer".to_vec()));
        assert!(stack.ret().is_none());
    }
}

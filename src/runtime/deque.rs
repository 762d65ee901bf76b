/// Circular-buffer double-ended queue.
///
/// Backing store for the segmented stack and general interpreter
/// bookkeeping: amortized O(1) push/pop at both ends, O(1) random access,
/// O(n) middle deletion. Capacity is always a power of two and the buffer is
/// never allowed to fill completely (`head == tail` means empty), so the
/// buffer doubles just before an insertion would make head meet tail.
///
/// Instances only move between containers by copying: `clone` is a full
/// independent copy, never a shared view.
#[derive(Clone)]
pub struct Deque<T> {
    elements: Vec<Option<T>>,
    head: usize,
    tail: usize,
}

impl<T: Clone> Deque<T> {
    pub fn new() -> Self {
        Self::with_capacity(8)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(2).next_power_of_two();
        Deque {
            elements: vec![None; capacity],
            head: 0,
            tail: 0,
        }
    }

    fn mask(&self) -> usize {
        self.elements.len() - 1
    }

    pub fn len(&self) -> usize {
        (self.tail.wrapping_sub(self.head)) & self.mask()
    }

    pub fn is_empty(&self) -> bool {
        self.head == self.tail
    }

    pub fn capacity(&self) -> usize {
        self.elements.len()
    }

    /// Doubles the buffer, re-linearizing so the content starts at index 0.
    fn grow(&mut self) {
        let len = self.len();
        let mut next: Vec<Option<T>> = vec![None; self.elements.len() * 2];
        let mask = self.mask();
        for (i, slot) in next.iter_mut().take(len).enumerate() {
            let from = (self.head + i) & mask;
            *slot = self.elements[from].take();
        }
        self.elements = next;
        self.head = 0;
        self.tail = len;
    }

    pub fn add_first(&mut self, value: T) {
        if (self.head.wrapping_sub(1) & self.mask()) == self.tail {
            self.grow();
        }
        self.head = self.head.wrapping_sub(1) & self.mask();
        self.elements[self.head] = Some(value);
    }

    pub fn add_last(&mut self, value: T) {
        if ((self.tail + 1) & self.mask()) == self.head {
            self.grow();
        }
        self.elements[self.tail] = Some(value);
        self.tail = (self.tail + 1) & self.mask();
    }

    pub fn remove_first(&mut self) -> T {
        assert!(!self.is_empty(), "remove_first on empty deque");
        let value = self.elements[self.head].take().expect("occupied slot");
        self.head = (self.head + 1) & self.mask();
        value
    }

    pub fn remove_last(&mut self) -> T {
        assert!(!self.is_empty(), "remove_last on empty deque");
        self.tail = self.tail.wrapping_sub(1) & self.mask();
        self.elements[self.tail].take().expect("occupied slot")
    }

    fn slot(&self, index: usize) -> usize {
        (self.head + index) & self.mask()
    }

    pub fn get(&self, index: usize) -> &T {
        assert!(index < self.len(), "index {} out of range", index);
        self.elements[self.slot(index)].as_ref().expect("occupied slot")
    }

    /// Non-panicking read: the default when the index is out of range.
    pub fn get_or(&self, index: usize, default: T) -> T {
        if index < self.len() {
            self.get(index).clone()
        } else {
            default
        }
    }

    pub fn set(&mut self, index: usize, value: T) {
        assert!(index < self.len(), "index {} out of range", index);
        let slot = self.slot(index);
        self.elements[slot] = Some(value);
    }

    /// In-place edit of one element.
    pub fn edit(&mut self, index: usize, f: impl FnOnce(&mut T)) {
        assert!(index < self.len(), "index {} out of range", index);
        let slot = self.slot(index);
        f(self.elements[slot].as_mut().expect("occupied slot"));
    }

    /// Removes the element at `index`, shifting whichever side is shorter.
    pub fn delete(&mut self, index: usize) -> T {
        let len = self.len();
        let front = index;
        // An index at or past the logical length signals corruption in the
        // caller's bookkeeping (possible concurrent modification).
        assert!(front < len, "delete index {} out of range {}", index, len);
        let back = len - 1 - index;

        let slot = self.slot(index);
        let value = self.elements[slot].take().expect("occupied slot");
        if front <= back {
            // Shift the front half toward the gap.
            for i in (1..=index).rev() {
                let from = self.slot(i - 1);
                let to = self.slot(i);
                self.elements[to] = self.elements[from].take();
            }
            self.head = (self.head + 1) & self.mask();
        } else {
            // Shift the back half toward the gap.
            for i in index..len - 1 {
                let from = self.slot(i + 1);
                let to = self.slot(i);
                self.elements[to] = self.elements[from].take();
            }
            self.tail = self.tail.wrapping_sub(1) & self.mask();
        }
        value
    }

    /// Reverses contents in place without moving head or tail.
    pub fn reverse(&mut self) {
        let len = self.len();
        for i in 0..len / 2 {
            let a = self.slot(i);
            let b = self.slot(len - 1 - i);
            self.elements.swap(a, b);
        }
    }

    /// Independent copy of `[start, end)`. Negative indices count from the
    /// end, Python-style.
    pub fn slice(&self, start: isize, end: isize) -> Deque<T> {
        let len = self.len() as isize;
        let resolve = |i: isize| -> usize {
            let i = if i < 0 { len + i } else { i };
            i.clamp(0, len) as usize
        };
        let (from, to) = (resolve(start), resolve(end));

        let mut out = Deque::with_capacity(to.saturating_sub(from).max(2));
        for i in from..to {
            out.add_last(self.get(i).clone());
        }
        out
    }

    /// Linearizes the circular buffer into a fresh vec.
    pub fn to_vec(&self) -> Vec<T> {
        (0..self.len()).map(|i| self.get(i).clone()).collect()
    }
}

impl<T: Clone> Default for Deque<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + std::fmt::Debug> std::fmt::Debug for Deque<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.to_vec()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_pop_both_ends() {
        let mut d = Deque::new();
        d.add_last(2);
        d.add_last(3);
        d.add_first(1);
        d.add_last(4);

        assert_eq!(d.len(), 4);
        assert_eq!(d.to_vec(), vec![1, 2, 3, 4]);
        assert_eq!(d.remove_first(), 1);
        assert_eq!(d.remove_last(), 4);
        assert_eq!(d.to_vec(), vec![2, 3]);
    }

    #[test]
    fn test_length_tracks_net_inserts() {
        let mut d = Deque::new();
        for i in 0..100 {
            d.add_last(i);
        }
        for _ in 0..40 {
            d.remove_first();
        }
        for i in 0..10 {
            d.add_first(i);
        }
        assert_eq!(d.len(), 70);
    }

    #[test]
    fn test_growth_preserves_order() {
        let mut d = Deque::with_capacity(4);
        // Wrap the buffer before growing.
        d.add_last(0);
        d.remove_first();
        for i in 0..20 {
            d.add_last(i);
        }
        assert_eq!(d.to_vec(), (0..20).collect::<Vec<_>>());
        assert!(d.capacity().is_power_of_two());
    }

    #[test]
    #[should_panic(expected = "remove_first on empty")]
    fn test_remove_first_on_empty_panics() {
        let mut d: Deque<i32> = Deque::new();
        d.remove_first();
    }

    #[test]
    #[should_panic(expected = "remove_last on empty")]
    fn test_remove_last_on_empty_panics() {
        let mut d: Deque<i32> = Deque::new();
        d.remove_last();
    }

    #[test]
    fn test_get_set_edit() {
        let mut d = Deque::new();
        d.add_last(10);
        d.add_last(20);

        assert_eq!(*d.get(1), 20);
        d.set(0, 11);
        assert_eq!(*d.get(0), 11);
        d.edit(1, |v| *v += 1);
        assert_eq!(*d.get(1), 21);
        assert_eq!(d.get_or(5, -1), -1);
        assert_eq!(d.get_or(0, -1), 11);
    }

    #[test]
    fn test_delete_shifts_shorter_side() {
        let mut d = Deque::new();
        for i in 0..7 {
            d.add_last(i);
        }
        // Near the front: front half shifts.
        assert_eq!(d.delete(1), 1);
        assert_eq!(d.to_vec(), vec![0, 2, 3, 4, 5, 6]);
        // Near the back: back half shifts.
        assert_eq!(d.delete(4), 5);
        assert_eq!(d.to_vec(), vec![0, 2, 3, 4, 6]);
        // Ends.
        assert_eq!(d.delete(0), 0);
        assert_eq!(d.delete(3), 6);
        assert_eq!(d.to_vec(), vec![2, 3, 4]);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_delete_bad_index_panics() {
        let mut d = Deque::new();
        d.add_last(1);
        d.delete(1);
    }

    #[test]
    fn test_grow_then_delete_on_wrapped_buffer() {
        let mut d = Deque::with_capacity(4);
        // Wrap so the content straddles the physical end of the buffer.
        d.add_last(0);
        d.add_last(0);
        d.remove_first();
        d.remove_first();
        for i in 0..10 {
            d.add_last(i);
        }
        assert_eq!(d.to_vec(), (0..10).collect::<Vec<_>>());

        // Delete from both halves of the re-linearized content.
        assert_eq!(d.delete(2), 2);
        assert_eq!(d.delete(7), 8);
        assert_eq!(d.to_vec(), vec![0, 1, 3, 4, 5, 6, 7, 9]);
    }

    #[test]
    fn test_reverse_in_place() {
        let mut d = Deque::new();
        for i in 0..5 {
            d.add_last(i);
        }
        d.reverse();
        assert_eq!(d.to_vec(), vec![4, 3, 2, 1, 0]);
        d.reverse();
        assert_eq!(d.to_vec(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_reverse_twice_is_identity_after_wrap() {
        let mut d = Deque::with_capacity(4);
        d.add_last(0);
        d.add_last(0);
        d.remove_first();
        d.remove_first();
        for i in 0..6 {
            d.add_last(i);
        }
        let before = d.to_vec();
        d.reverse();
        d.reverse();
        assert_eq!(d.to_vec(), before);
    }

    #[test]
    fn test_slice_with_negative_indices() {
        let mut d = Deque::new();
        for i in 0..6 {
            d.add_last(i);
        }
        assert_eq!(d.slice(1, 4).to_vec(), vec![1, 2, 3]);
        assert_eq!(d.slice(-2, 6).to_vec(), vec![4, 5]);
        assert_eq!(d.slice(0, -3).to_vec(), vec![0, 1, 2]);
        assert_eq!(d.slice(4, 2).to_vec(), Vec::<i32>::new());
    }

    #[test]
    fn test_slice_is_independent_copy() {
        let mut d = Deque::new();
        d.add_last(1);
        d.add_last(2);
        let mut s = d.slice(0, 2);
        s.set(0, 99);
        assert_eq!(*d.get(0), 1);
    }

    #[test]
    fn test_clone_is_deep_copy() {
        let mut d = Deque::new();
        d.add_last(String::from("a"));
        let mut c = d.clone();
        c.set(0, String::from("b"));
        assert_eq!(d.get(0), "a");
    }
}

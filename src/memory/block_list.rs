use crate::memory::arena::{Arena, Span, WORD_BYTES};

/// Records per block.
pub const BLOCK_SLOTS: u32 = 8;

/// Forward-only linked chain of fixed-size blocks inside an arena.
///
/// Each block reserves one word for the next-block link followed by
/// `BLOCK_SLOTS` data slots. Blocks are only ever appended; the arena never
/// frees, so `sublist` is a logical view change that shares tail storage with
/// its source. Block links are arena offsets stored +1 so that 0 can mean
/// "no next block".
///
/// The head fields are a read/write cursor, not part of the logical content.
pub struct BlockList {
    arena: Arena,
    /// Words per record slot.
    slot_words: u32,
    /// Arena offset +1 of the first block, 0 = empty list.
    first: u32,
    /// Arena offset +1 of the last block, 0 = empty list.
    last: u32,
    block_count: u32,
    /// Arena offset +1 of the cursor's block, 0 = cursor invalid.
    head_block: u32,
    /// Chain position of the cursor's block.
    head_block_number: u32,
    /// Logical record index of the cursor.
    head_index: u32,
}

impl BlockList {
    pub fn new(arena: &Arena, slot_words: u32) -> Self {
        assert!(slot_words > 0, "slot must be at least one word");
        BlockList {
            arena: arena.clone(),
            slot_words,
            first: 0,
            last: 0,
            block_count: 0,
            head_block: 0,
            head_block_number: 0,
            head_index: 0,
        }
    }

    fn block_bytes(&self) -> u32 {
        WORD_BYTES * (1 + BLOCK_SLOTS * self.slot_words)
    }

    fn block_span(&self, encoded: u32) -> Span {
        debug_assert!(encoded != 0);
        self.arena.span_at(encoded - 1, self.block_bytes())
    }

    pub fn block_count(&self) -> u32 {
        self.block_count
    }

    /// Total record slots across all blocks.
    pub fn capacity(&self) -> u32 {
        self.block_count * BLOCK_SLOTS
    }

    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    /// Appends one block to the end of the chain.
    pub fn add_chunk(&mut self) {
        let block = self.arena.allocate(self.block_bytes());
        block.zero_all();
        let encoded = block.arena_offset() + 1;

        if self.last != 0 {
            self.block_span(self.last).write_word(0, encoded);
        } else {
            self.first = encoded;
        }
        self.last = encoded;
        self.block_count += 1;
    }

    /// Moves the cursor to a logical slot. Returns false when the index is
    /// past the last allocated slot; the cursor is left unchanged in that
    /// case.
    pub fn seek(&mut self, index: u32) -> bool {
        if index >= self.capacity() {
            return false;
        }
        let target_block = index / BLOCK_SLOTS;

        // Same block: no walk needed.
        if self.head_block != 0 && target_block == self.head_block_number {
            self.head_index = index;
            return true;
        }

        // Last block: direct jump.
        if target_block == self.block_count - 1 {
            self.head_block = self.last;
            self.head_block_number = target_block;
            self.head_index = index;
            return true;
        }

        // Linear walk from the cursor or the list start, whichever block is
        // closer (the chain is forward-only, so the cursor only helps when it
        // sits at or before the target).
        let (mut block, mut number) =
            if self.head_block != 0 && self.head_block_number <= target_block {
                (self.head_block, self.head_block_number)
            } else {
                (self.first, 0)
            };
        while number < target_block {
            block = self.block_span(block).read_word(0);
            number += 1;
        }

        self.head_block = block;
        self.head_block_number = number;
        self.head_index = index;
        true
    }

    pub fn cursor_valid(&self) -> bool {
        self.head_block != 0 && self.head_index < self.capacity()
    }

    /// Span over the record slot under the cursor.
    pub fn slot_span(&self) -> Span {
        debug_assert!(self.cursor_valid());
        let within = self.head_index % BLOCK_SLOTS;
        let offset = WORD_BYTES * (1 + within * self.slot_words);
        self.block_span(self.head_block)
            .subset(offset, self.slot_words * WORD_BYTES)
    }

    /// Advances the cursor by one record, following the chain across block
    /// boundaries. Past the end the cursor becomes invalid.
    pub fn advance(&mut self) {
        self.head_index += 1;
        if self.head_index >= self.capacity() {
            self.head_block = 0;
        } else if self.head_index % BLOCK_SLOTS == 0 {
            let next = self.block_span(self.head_block).read_word(0);
            self.head_block = next;
            self.head_block_number += 1;
        }
    }

    /// A new list sharing this list's chain from `blocks` blocks onward.
    ///
    /// No memory is copied or freed: mutating the shared tail blocks through
    /// either view is visible to both. That aliasing is intentional.
    pub fn sublist(&self, blocks: u32) -> BlockList {
        assert!(
            blocks <= self.block_count,
            "sublist past end: {} of {} blocks",
            blocks,
            self.block_count
        );
        let mut block = self.first;
        for _ in 0..blocks {
            block = self.block_span(block).read_word(0);
        }
        let remaining = self.block_count - blocks;
        BlockList {
            arena: self.arena.clone(),
            slot_words: self.slot_words,
            first: if remaining == 0 { 0 } else { block },
            last: if remaining == 0 { 0 } else { self.last },
            block_count: remaining,
            head_block: 0,
            head_block_number: 0,
            head_index: 0,
        }
    }
}

/// Block list storing one u32 word per record.
pub struct WordList {
    inner: BlockList,
}

impl WordList {
    pub fn new(arena: &Arena) -> Self {
        WordList {
            inner: BlockList::new(arena, 1),
        }
    }

    pub fn add_chunk(&mut self) {
        self.inner.add_chunk();
    }

    pub fn seek(&mut self, index: u32) -> bool {
        self.inner.seek(index)
    }

    pub fn capacity(&self) -> u32 {
        self.inner.capacity()
    }

    pub fn block_count(&self) -> u32 {
        self.inner.block_count()
    }

    /// Reads the word under the cursor and advances. None when the cursor is
    /// out of bounds.
    pub fn read(&mut self) -> Option<u32> {
        if !self.inner.cursor_valid() {
            return None;
        }
        let value = self.inner.slot_span().read_word(0);
        self.inner.advance();
        Some(value)
    }

    /// Writes the word under the cursor and advances. False when the cursor
    /// is out of bounds.
    pub fn write(&mut self, value: u32) -> bool {
        if !self.inner.cursor_valid() {
            return false;
        }
        self.inner.slot_span().write_word(0, value);
        self.inner.advance();
        true
    }

    pub fn sublist(&self, blocks: u32) -> WordList {
        WordList {
            inner: self.inner.sublist(blocks),
        }
    }
}

/// Block list storing `Span` records as (start, length) word pairs relative
/// to the list's arena. A zero-length record reads back as the null span.
pub struct SpanList {
    inner: BlockList,
}

impl SpanList {
    pub fn new(arena: &Arena) -> Self {
        SpanList {
            inner: BlockList::new(arena, 2),
        }
    }

    pub fn add_chunk(&mut self) {
        self.inner.add_chunk();
    }

    pub fn seek(&mut self, index: u32) -> bool {
        self.inner.seek(index)
    }

    pub fn capacity(&self) -> u32 {
        self.inner.capacity()
    }

    pub fn block_count(&self) -> u32 {
        self.inner.block_count()
    }

    pub fn arena(&self) -> &Arena {
        self.inner.arena()
    }

    pub fn read(&mut self) -> Option<Span> {
        if !self.inner.cursor_valid() {
            return None;
        }
        let slot = self.inner.slot_span();
        let start = slot.read_word(0);
        let length = slot.read_word(WORD_BYTES);
        self.inner.advance();
        if length == 0 {
            Some(Span::null())
        } else {
            Some(self.inner.arena().span_at(start, length))
        }
    }

    /// Writes a span record under the cursor and advances.
    ///
    /// Panics if the span belongs to a different arena: a cross-arena span
    /// cannot be stored as a bare offset and must go through an explicit
    /// reference object instead.
    pub fn write(&mut self, span: &Span) -> bool {
        if !self.inner.cursor_valid() {
            return false;
        }
        if !span.is_null() {
            assert!(
                span.arena().same_arena(self.inner.arena()),
                "span from a foreign arena cannot be stored by offset"
            );
        }
        let slot = self.inner.slot_span();
        slot.write_word(0, span.arena_offset());
        slot.write_word(WORD_BYTES, span.length());
        self.inner.advance();
        true
    }

    pub fn sublist(&self, blocks: u32) -> SpanList {
        SpanList {
            inner: self.inner.sublist(blocks),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled_word_list(arena: &Arena, words: u32) -> WordList {
        let mut list = WordList::new(arena);
        while list.capacity() < words {
            list.add_chunk();
        }
        assert!(list.seek(0));
        for i in 0..words {
            assert!(list.write(i * 10));
        }
        list
    }

    #[test]
    fn test_empty_list_rejects_seek() {
        let arena = Arena::new();
        let mut list = WordList::new(&arena);
        assert!(!list.seek(0));
        assert_eq!(list.read(), None);
    }

    #[test]
    fn test_write_read_across_blocks() {
        let arena = Arena::new();
        let count = BLOCK_SLOTS * 3;
        let mut list = filled_word_list(&arena, count);

        assert!(list.seek(0));
        for i in 0..count {
            assert_eq!(list.read(), Some(i * 10));
        }
        // Cursor ran off the end.
        assert_eq!(list.read(), None);
    }

    #[test]
    fn test_seek_past_capacity_fails() {
        let arena = Arena::new();
        let mut list = WordList::new(&arena);
        list.add_chunk();

        assert!(list.seek(BLOCK_SLOTS - 1));
        assert!(!list.seek(BLOCK_SLOTS));
    }

    #[test]
    fn test_seek_back_and_forth() {
        let arena = Arena::new();
        let count = BLOCK_SLOTS * 4;
        let mut list = filled_word_list(&arena, count);

        // Backward seek forces a walk from the list start.
        assert!(list.seek(count - 1));
        assert_eq!(list.read(), Some((count - 1) * 10));
        assert!(list.seek(1));
        assert_eq!(list.read(), Some(10));
        // Same-block fast path.
        assert!(list.seek(3));
        assert_eq!(list.read(), Some(30));
        // Last-block fast path.
        assert!(list.seek(BLOCK_SLOTS * 3 + 2));
        assert_eq!(list.read(), Some((BLOCK_SLOTS * 3 + 2) * 10));
    }

    #[test]
    fn test_write_without_seek_fails_on_empty() {
        let arena = Arena::new();
        let mut list = WordList::new(&arena);
        assert!(!list.write(1));
    }

    #[test]
    fn test_sublist_shares_tail() {
        let arena = Arena::new();
        let count = BLOCK_SLOTS * 3;
        let mut list = filled_word_list(&arena, count);

        let mut tail = list.sublist(1);
        assert_eq!(tail.block_count(), 2);
        assert_eq!(tail.capacity(), BLOCK_SLOTS * 2);

        // Tail's slot 0 is the original's slot BLOCK_SLOTS.
        assert!(tail.seek(0));
        assert_eq!(tail.read(), Some(BLOCK_SLOTS * 10));

        // A write through the tail is visible through the original.
        assert!(tail.seek(0));
        assert!(tail.write(777));
        assert!(list.seek(BLOCK_SLOTS));
        assert_eq!(list.read(), Some(777));

        // And the other way around.
        assert!(list.seek(BLOCK_SLOTS + 1));
        assert!(list.write(888));
        assert!(tail.seek(1));
        assert_eq!(tail.read(), Some(888));
    }

    #[test]
    fn test_sublist_of_everything_is_empty() {
        let arena = Arena::new();
        let list = filled_word_list(&arena, BLOCK_SLOTS * 2);
        let mut empty = list.sublist(2);

        assert_eq!(empty.block_count(), 0);
        assert!(!empty.seek(0));
    }

    #[test]
    #[should_panic(expected = "sublist past end")]
    fn test_sublist_beyond_chain_panics() {
        let arena = Arena::new();
        let list = filled_word_list(&arena, BLOCK_SLOTS);
        list.sublist(2);
    }

    #[test]
    fn test_span_list_round_trip() {
        let arena = Arena::new();
        let mut list = SpanList::new(&arena);
        list.add_chunk();

        let payload = arena.allocate(6);
        payload.write(b"cinder", 0);

        assert!(list.seek(0));
        assert!(list.write(&payload));
        assert!(list.write(&Span::null()));

        assert!(list.seek(0));
        let back = list.read().unwrap();
        assert_eq!(back.read_bytes(0, 6), b"cinder".to_vec());
        assert!(list.read().unwrap().is_null());
    }

    #[test]
    #[should_panic(expected = "foreign arena")]
    fn test_span_list_rejects_foreign_arena() {
        let arena = Arena::new();
        let other = Arena::new();
        let mut list = SpanList::new(&arena);
        list.add_chunk();

        let foreign = other.allocate(4);
        list.seek(0);
        list.write(&foreign);
    }
}

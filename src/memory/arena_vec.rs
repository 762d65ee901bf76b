use crate::memory::arena::Arena;
use crate::memory::block_list::SpanList;

/// Growable store of fixed-size elements, chunked across arena memory.
///
/// Element slots live in power-of-two-sized chunks tracked by an "active"
/// span chain. Chunks freed by popping move onto a "dead" chain and are
/// reused last-freed-first before any fresh arena allocation happens, since
/// the arena itself never reclaims anything.
pub struct ArenaVec {
    elem_bytes: u32,
    /// Elements per chunk, always a power of two.
    elems_per_chunk: u32,
    len: u32,
    active: SpanList,
    active_count: u32,
    dead: SpanList,
    dead_count: u32,
}

impl ArenaVec {
    pub fn new(arena: &Arena, elem_bytes: u32, elems_per_chunk: u32) -> Self {
        assert!(elem_bytes > 0, "element size must be positive");
        assert!(elems_per_chunk > 0, "chunk must hold at least one element");
        ArenaVec {
            elem_bytes,
            elems_per_chunk: elems_per_chunk.next_power_of_two(),
            len: 0,
            active: SpanList::new(arena),
            active_count: 0,
            dead: SpanList::new(arena),
            dead_count: 0,
        }
    }

    pub fn len(&self) -> u32 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn elem_bytes(&self) -> u32 {
        self.elem_bytes
    }

    /// Chunks currently holding elements.
    pub fn chunk_count(&self) -> u32 {
        self.active_count
    }

    /// Freed chunks waiting for reuse.
    pub fn dead_chunk_count(&self) -> u32 {
        self.dead_count
    }

    fn chunk_span(&mut self, chunk: u32) -> crate::memory::arena::Span {
        debug_assert!(chunk < self.active_count);
        assert!(self.active.seek(chunk));
        self.active.read().expect("active chunk record")
    }

    /// Takes a chunk off the dead chain, or allocates a fresh one.
    fn acquire_chunk(&mut self) -> crate::memory::arena::Span {
        if self.dead_count > 0 {
            assert!(self.dead.seek(self.dead_count - 1));
            let span = self.dead.read().expect("dead chunk record");
            self.dead_count -= 1;
            span.zero_all();
            return span;
        }
        self.active
            .arena()
            .allocate(self.elem_bytes * self.elems_per_chunk)
    }

    /// Puts the trailing chunk onto the dead chain.
    fn drop_chunk(&mut self) {
        debug_assert!(self.active_count > 0);
        let span = self.chunk_span(self.active_count - 1);
        self.active_count -= 1;
        while self.dead.capacity() <= self.dead_count {
            self.dead.add_chunk();
        }
        assert!(self.dead.seek(self.dead_count));
        assert!(self.dead.write(&span));
        self.dead_count += 1;
    }

    /// Appends one element. `bytes` must be exactly the element size.
    pub fn push(&mut self, bytes: &[u8]) {
        assert_eq!(
            bytes.len() as u32,
            self.elem_bytes,
            "element size mismatch"
        );
        if self.len == self.active_count * self.elems_per_chunk {
            let span = self.acquire_chunk();
            while self.active.capacity() <= self.active_count {
                self.active.add_chunk();
            }
            assert!(self.active.seek(self.active_count));
            assert!(self.active.write(&span));
            self.active_count += 1;
        }
        let index = self.len;
        self.len += 1;
        assert!(self.set(index, bytes));
    }

    pub fn get(&mut self, index: u32) -> Option<Vec<u8>> {
        if index >= self.len {
            return None;
        }
        let chunk = index / self.elems_per_chunk;
        let within = index % self.elems_per_chunk;
        let span = self.chunk_span(chunk);
        let at = within * self.elem_bytes;
        Some(span.read_bytes(at, at + self.elem_bytes))
    }

    pub fn set(&mut self, index: u32, bytes: &[u8]) -> bool {
        if index >= self.len || bytes.len() as u32 != self.elem_bytes {
            return false;
        }
        let chunk = index / self.elems_per_chunk;
        let within = index % self.elems_per_chunk;
        let span = self.chunk_span(chunk);
        span.write(bytes, within * self.elem_bytes);
        true
    }

    /// Removes and returns the last element. A chunk that becomes empty is
    /// moved to the dead chain for reuse.
    pub fn pop(&mut self) -> Option<Vec<u8>> {
        if self.len == 0 {
            return None;
        }
        let last = self.get(self.len - 1).expect("element in range");
        self.len -= 1;
        if self.len <= (self.active_count - 1) * self.elems_per_chunk {
            self.drop_chunk();
        }
        debug_assert!(self.len <= self.active_count * self.elems_per_chunk);
        Some(last)
    }
}

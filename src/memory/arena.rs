use std::cell::RefCell;
use std::rc::Rc;

/// Bump-allocated byte store backing all dynamic data in a scope.
///
/// An arena only ever grows: `allocate` appends zeroed bytes and hands out a
/// `Span` over exactly the new region. Nothing is ever freed individually;
/// the whole arena is reclaimed when its owning scope drops it.
///
/// `Arena` is a cheap handle (clones share the same buffer) so that spans can
/// carry an owning reference back to their arena. Single-threaded by design;
/// there is no interior locking.
#[derive(Clone)]
pub struct Arena {
    inner: Rc<RefCell<Buffer>>,
}

struct Buffer {
    bytes: Vec<u8>,
    is_null: bool,
}

/// Size of one word (the unit the block list works in), in bytes.
pub const WORD_BYTES: u32 = 4;

impl Arena {
    pub fn new() -> Self {
        Arena {
            inner: Rc::new(RefCell::new(Buffer {
                bytes: Vec::new(),
                is_null: false,
            })),
        }
    }

    /// The sentinel "nothing" arena. Null spans point here.
    pub fn null() -> Self {
        Arena {
            inner: Rc::new(RefCell::new(Buffer {
                bytes: Vec::new(),
                is_null: true,
            })),
        }
    }

    pub fn is_null(&self) -> bool {
        self.inner.borrow().is_null
    }

    /// Current size in bytes.
    pub fn size(&self) -> u32 {
        self.inner.borrow().bytes.len() as u32
    }

    /// Appends `byte_count` zero bytes and returns a span over the new region.
    ///
    /// Panics if the arena is the null sentinel or if the resulting size is
    /// not representable as a u32 length.
    pub fn allocate(&self, byte_count: u32) -> Span {
        assert!(!self.is_null(), "allocate on the null arena");
        let start = {
            let mut buf = self.inner.borrow_mut();
            let start = buf.bytes.len();
            let new_size = start
                .checked_add(byte_count as usize)
                .expect("arena size overflow");
            assert!(
                new_size <= u32::MAX as usize,
                "arena size exceeds representable length"
            );
            buf.bytes.resize(new_size, 0);
            start as u32
        };
        Span {
            arena: self.clone(),
            start,
            length: byte_count,
        }
    }

    /// True when both handles refer to the same underlying buffer.
    pub fn same_arena(&self, other: &Arena) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Rebuilds a span over an already-allocated region.
    ///
    /// Used by the block list to follow arena-relative block offsets.
    /// Panics if the region is outside the allocated area.
    pub(crate) fn span_at(&self, start: u32, length: u32) -> Span {
        assert!(
            start as u64 + length as u64 <= self.size() as u64,
            "span_at out of arena bounds: start={} length={} size={}",
            start,
            length,
            self.size()
        );
        Span {
            arena: self.clone(),
            start,
            length,
        }
    }
}

impl Default for Arena {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Arena {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let buf = self.inner.borrow();
        f.debug_struct("Arena")
            .field("size", &buf.bytes.len())
            .field("is_null", &buf.is_null)
            .finish()
    }
}

/// Bounds-checked view into one arena; the only sanctioned memory handle.
///
/// Spans are value types and copy freely, but two spans over the same region
/// alias the same bytes: writes through one are visible through the other.
/// A zero-length span is the canonical null value (replaces null pointers).
///
/// All access is checked against the span's own `[0, length)` window. Out of
/// range access is a caller bug and panics; it is never a recoverable error.
#[derive(Clone)]
pub struct Span {
    arena: Arena,
    start: u32,
    length: u32,
}

impl Span {
    /// The canonical null span: zero length, over the null arena.
    pub fn null() -> Self {
        Span {
            arena: Arena::null(),
            start: 0,
            length: 0,
        }
    }

    pub fn is_null(&self) -> bool {
        self.length == 0
    }

    pub fn length(&self) -> u32 {
        self.length
    }

    /// Offset of this span's first byte within its arena.
    pub fn arena_offset(&self) -> u32 {
        self.start
    }

    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    fn check(&self, offset: u32, count: u32) {
        assert!(
            offset as u64 + count as u64 <= self.length as u64,
            "span access out of range: offset={} count={} length={}",
            offset,
            count,
            self.length
        );
    }

    pub fn read_byte(&self, offset: u32) -> u8 {
        self.check(offset, 1);
        self.arena.inner.borrow().bytes[(self.start + offset) as usize]
    }

    /// Copies bytes in `[from, to)` out of the span.
    pub fn read_bytes(&self, from: u32, to: u32) -> Vec<u8> {
        assert!(from <= to, "read_bytes range reversed: {}..{}", from, to);
        self.check(from, to - from);
        let buf = self.arena.inner.borrow();
        buf.bytes[(self.start + from) as usize..(self.start + to) as usize].to_vec()
    }

    pub fn write(&self, bytes: &[u8], offset: u32) {
        self.check(offset, bytes.len() as u32);
        let mut buf = self.arena.inner.borrow_mut();
        let at = (self.start + offset) as usize;
        buf.bytes[at..at + bytes.len()].copy_from_slice(bytes);
    }

    /// Reads one little-endian word at a byte offset.
    pub fn read_word(&self, offset: u32) -> u32 {
        self.check(offset, WORD_BYTES);
        let buf = self.arena.inner.borrow();
        let at = (self.start + offset) as usize;
        u32::from_le_bytes(buf.bytes[at..at + 4].try_into().unwrap())
    }

    pub fn write_word(&self, offset: u32, value: u32) {
        self.check(offset, WORD_BYTES);
        let mut buf = self.arena.inner.borrow_mut();
        let at = (self.start + offset) as usize;
        buf.bytes[at..at + 4].copy_from_slice(&value.to_le_bytes());
    }

    /// Resets every byte of the span to zero.
    pub fn zero_all(&self) {
        let mut buf = self.arena.inner.borrow_mut();
        let at = self.start as usize;
        buf.bytes[at..at + self.length as usize].fill(0);
    }

    /// A sub-view of this span. Panics if the sub-range exceeds the parent.
    pub fn subset(&self, offset: u32, length: u32) -> Span {
        self.check(offset, length);
        Span {
            arena: self.arena.clone(),
            start: self.start + offset,
            length,
        }
    }
}

impl std::fmt::Debug for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Span")
            .field("start", &self.start)
            .field("length", &self.length)
            .finish()
    }
}

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Fibonacci LFSR tap masks per register width, maximal-period polynomials.
/// Index is the width in bits; width w cycles through all 2^w - 1 nonzero
/// states.
const TAPS: [u32; 17] = [
    0x0, // width 0 unused
    0x1, 0x3, 0x6, 0xC, 0x14, 0x30, 0x60, 0xB8, 0x110, 0x240, 0x500, 0x829, 0x100D, 0x2015,
    0x6000, 0xD008,
];

/// Fixed-capacity open-addressing hash map probed by a "fizzle fade":
/// the candidate slots for a key are its home slot xor-ed with the states
/// of a maximal-period LFSR, which visits every other slot exactly once.
///
/// Capacity is the next power of two at or above the requested size and
/// never changes: `try_add` succeeds exactly `capacity` times for unique
/// keys, then fails until something is removed.
pub struct FizzleMap<K, V> {
    slots: Vec<Option<(K, V)>>,
    width: u32,
    len: usize,
}

/// Probe sequence: the home slot first, then home ^ lfsr_state for every
/// nonzero state of the register.
struct Probes {
    start: usize,
    width: u32,
    state: u32,
    emitted: usize,
    total: usize,
}

impl Iterator for Probes {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.emitted >= self.total {
            return None;
        }
        let slot = if self.emitted == 0 {
            self.start
        } else {
            let slot = self.start ^ self.state as usize;
            let bit = (self.state & TAPS[self.width as usize]).count_ones() & 1;
            self.state = ((self.state << 1) | bit) & ((1u32 << self.width) - 1);
            slot
        };
        self.emitted += 1;
        Some(slot)
    }
}

impl<K: Hash + Eq, V> FizzleMap<K, V> {
    /// Creates a map with capacity = next power of two >= `requested`.
    pub fn new(requested: usize) -> Self {
        let capacity = requested.max(1).next_power_of_two();
        assert!(capacity <= 1 << 16, "fizzle map capped at 2^16 slots");
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        FizzleMap {
            slots,
            width: capacity.trailing_zeros(),
            len: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn home_slot(&self, key: &K) -> usize {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        hasher.finish() as usize & (self.slots.len() - 1)
    }

    fn probes(&self, key: &K) -> Probes {
        Probes {
            start: self.home_slot(key),
            width: self.width.max(1),
            state: 1,
            emitted: 0,
            total: self.slots.len(),
        }
    }

    /// Inserts if the key is absent and a free slot exists. Never overwrites.
    pub fn try_add(&mut self, key: K, value: V) -> bool {
        let mut first_free = None;
        for slot in self.probes(&key) {
            match &self.slots[slot] {
                Some((existing, _)) if *existing == key => return false,
                Some(_) => {}
                None => {
                    if first_free.is_none() {
                        first_free = Some(slot);
                    }
                }
            }
        }
        match first_free {
            Some(slot) => {
                self.slots[slot] = Some((key, value));
                self.len += 1;
                true
            }
            None => false,
        }
    }

    pub fn try_get(&self, key: &K) -> Option<&V> {
        for slot in self.probes(key) {
            if let Some((existing, value)) = &self.slots[slot] {
                if existing == key {
                    return Some(value);
                }
            }
        }
        None
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        for slot in self.probes(key) {
            if matches!(&self.slots[slot], Some((existing, _)) if existing == key) {
                let (_, value) = self.slots[slot].take().expect("occupied slot");
                self.len -= 1;
                return Some(value);
            }
        }
        None
    }

    /// Entries in slot order. No ordering guarantee beyond being stable for
    /// an unchanged map.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.slots.iter().filter_map(|s| s.as_ref().map(|(k, v)| (k, v)))
    }
}

//! Shared transposition table.
//!
//! A linear array of 4-entry buckets sized to a power of two. Entries
//! are written lock-free: the 64-bit payload goes in one atomic and the
//! position key XOR-folded with that payload in a second, so a torn
//! write from another thread fails the fold check and reads as a miss.
//! All accesses use relaxed ordering; the only cross-thread guarantee
//! the search needs is "either a valid entry or a miss".

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

use crate::board::Move;

/// Bound kind of a stored value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Bound {
    Exact,
    Lower,
    Upper,
}

impl Bound {
    fn to_bits(self) -> u64 {
        match self {
            Bound::Exact => 1,
            Bound::Lower => 2,
            Bound::Upper => 3,
        }
    }

    fn from_bits(bits: u64) -> Option<Bound> {
        match bits {
            1 => Some(Bound::Exact),
            2 => Some(Bound::Lower),
            3 => Some(Bound::Upper),
            _ => None,
        }
    }
}

/// Decoded transposition entry.
#[derive(Clone, Copy, Debug)]
pub struct TTData {
    pub mv: Move,
    pub value: i32,
    pub eval: i32,
    pub depth: u32,
    pub bound: Bound,
}

/// Payload layout (64 bits):
/// - bits 0-15:  move
/// - bits 16-31: value (i16)
/// - bits 32-47: static eval (i16)
/// - bits 48-55: depth (u8)
/// - bits 56-57: bound (nonzero, so a real payload is never 0)
/// - bits 58-63: generation (6 bits)
fn pack(mv: Move, value: i32, eval: i32, depth: u32, bound: Bound, generation: u8) -> u64 {
    debug_assert!((-32000..=32000).contains(&value));
    debug_assert!((-32000..=32000).contains(&eval));
    u64::from(mv.as_u16())
        | ((value as i16 as u16 as u64) << 16)
        | ((eval as i16 as u16 as u64) << 32)
        | ((depth.min(255) as u64) << 48)
        | (bound.to_bits() << 56)
        | ((u64::from(generation) & 0x3F) << 58)
}

fn unpack(data: u64) -> Option<TTData> {
    let bound = Bound::from_bits((data >> 56) & 0x3)?;
    Some(TTData {
        mv: Move::from_u16(data as u16),
        value: i32::from((data >> 16) as u16 as i16),
        eval: i32::from((data >> 32) as u16 as i16),
        depth: ((data >> 48) & 0xFF) as u32,
        bound,
    })
}

fn generation_of(data: u64) -> u8 {
    ((data >> 58) & 0x3F) as u8
}

struct Entry {
    key_xor: AtomicU64,
    data: AtomicU64,
}

impl Entry {
    const fn new() -> Self {
        Entry {
            key_xor: AtomicU64::new(0),
            data: AtomicU64::new(0),
        }
    }

    /// Returns (stored key, payload) when the fold check passes.
    fn load(&self) -> Option<(u64, u64)> {
        let data = self.data.load(Ordering::Relaxed);
        if data == 0 {
            return None;
        }
        let key_xor = self.key_xor.load(Ordering::Relaxed);
        Some((key_xor ^ data, data))
    }

    fn store(&self, key: u64, data: u64) {
        self.data.store(data, Ordering::Relaxed);
        self.key_xor.store(key ^ data, Ordering::Relaxed);
    }

    fn clear(&self) {
        self.data.store(0, Ordering::Relaxed);
        self.key_xor.store(0, Ordering::Relaxed);
    }
}

const BUCKET_SIZE: usize = 4;

#[repr(align(64))]
struct Bucket {
    entries: [Entry; BUCKET_SIZE],
}

impl Bucket {
    const fn new() -> Self {
        Bucket {
            entries: [Entry::new(), Entry::new(), Entry::new(), Entry::new()],
        }
    }
}

/// The shared transposition table. Safe to probe and store from any
/// number of threads concurrently.
pub struct TranspositionTable {
    buckets: Vec<Bucket>,
    mask: usize,
    generation: AtomicU8,
}

impl TranspositionTable {
    /// Allocate a table of roughly `size_mb` megabytes, rounded down to
    /// a power-of-two bucket count. Panics on allocation failure; use
    /// [`TranspositionTable::try_new`] where the caller wants to keep
    /// the previous table instead.
    #[must_use]
    pub fn new(size_mb: usize) -> Self {
        Self::try_new(size_mb).expect("transposition table allocation failed")
    }

    /// Fallible allocation: `None` when the memory is not available.
    #[must_use]
    pub fn try_new(size_mb: usize) -> Option<Self> {
        let bucket_bytes = std::mem::size_of::<Bucket>();
        let mut num_buckets = (size_mb.max(1) * 1024 * 1024) / bucket_bytes;
        num_buckets = num_buckets.next_power_of_two();
        if num_buckets * bucket_bytes > size_mb.max(1) * 1024 * 1024 {
            num_buckets /= 2;
        }
        let num_buckets = num_buckets.max(1024);

        let mut buckets = Vec::new();
        buckets.try_reserve_exact(num_buckets).ok()?;
        buckets.resize_with(num_buckets, Bucket::new);

        Some(TranspositionTable {
            buckets,
            mask: num_buckets - 1,
            generation: AtomicU8::new(0),
        })
    }

    #[inline]
    fn bucket(&self, key: u64) -> &Bucket {
        &self.buckets[(key as usize) & self.mask]
    }

    /// Advance the aging generation. Called once per root search.
    pub fn new_generation(&self) {
        let g = self.generation.load(Ordering::Relaxed);
        self.generation.store(g.wrapping_add(1) & 0x3F, Ordering::Relaxed);
    }

    #[inline]
    fn current_generation(&self) -> u8 {
        self.generation.load(Ordering::Relaxed)
    }

    /// Look up `key`. Returns the decoded entry on a verified hit and
    /// refreshes its generation so it survives replacement longer.
    #[must_use]
    pub fn probe(&self, key: u64) -> Option<TTData> {
        let bucket = self.bucket(key);
        let generation = self.current_generation();
        for entry in &bucket.entries {
            if let Some((stored_key, data)) = entry.load() {
                if stored_key == key {
                    if generation_of(data) != generation {
                        let refreshed =
                            (data & !(0x3F << 58)) | ((u64::from(generation) & 0x3F) << 58);
                        entry.store(key, refreshed);
                    }
                    return unpack(data);
                }
            }
        }
        None
    }

    /// Store a search result. Replacement keeps the slot whose
    /// `depth - 8 * age` priority is highest, preferring deep entries of
    /// the current generation.
    pub fn store(&self, key: u64, value: i32, bound: Bound, depth: u32, mv: Move, eval: i32) {
        let bucket = self.bucket(key);
        let generation = self.current_generation();

        let mut replace_idx = 0;
        let mut replace_priority = i32::MAX;

        for (idx, entry) in bucket.entries.iter().enumerate() {
            match entry.load() {
                None => {
                    replace_idx = idx;
                    replace_priority = i32::MIN;
                    break;
                }
                Some((stored_key, data)) => {
                    if stored_key == key {
                        // Same position: keep the old move if the new
                        // store has none.
                        let old = unpack(data);
                        let mv = if mv.is_null() {
                            old.map_or(mv, |e| e.mv)
                        } else {
                            mv
                        };
                        entry.store(key, pack(mv, value, eval, depth, bound, generation));
                        return;
                    }
                    let age = i32::from(generation.wrapping_sub(generation_of(data)) & 0x3F);
                    let priority = ((data >> 48) & 0xFF) as i32 - 8 * age;
                    if priority < replace_priority {
                        replace_priority = priority;
                        replace_idx = idx;
                    }
                }
            }
        }

        bucket.entries[replace_idx].store(key, pack(mv, value, eval, depth, bound, generation));
    }

    /// Wipe every entry. Happens outside of search only.
    pub fn clear(&self) {
        for bucket in &self.buckets {
            for entry in &bucket.entries {
                entry.clear();
            }
        }
    }

    /// Permille of sampled entries belonging to the current generation.
    #[must_use]
    pub fn hashfull_per_mille(&self) -> u32 {
        let generation = self.current_generation();
        let sample = self.buckets.len().min(250);
        let mut used = 0u32;
        for bucket in self.buckets.iter().take(sample) {
            for entry in &bucket.entries {
                if let Some((_, data)) = entry.load() {
                    if generation_of(data) == generation {
                        used += 1;
                    }
                }
            }
        }
        used * 1000 / (sample as u32 * BUCKET_SIZE as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Square;

    fn test_move() -> Move {
        Move::quiet(Square::new(1, 4), Square::new(3, 4))
    }

    #[test]
    fn test_store_probe_roundtrip() {
        let tt = TranspositionTable::new(1);
        let key = 0xDEAD_BEEF_1234_5678;
        tt.store(key, 42, Bound::Exact, 9, test_move(), -17);

        let entry = tt.probe(key).expect("entry stored");
        assert_eq!(entry.value, 42);
        assert_eq!(entry.eval, -17);
        assert_eq!(entry.depth, 9);
        assert_eq!(entry.bound, Bound::Exact);
        assert_eq!(entry.mv, test_move());
    }

    #[test]
    fn test_probe_miss() {
        let tt = TranspositionTable::new(1);
        tt.store(0x1111, 1, Bound::Lower, 3, test_move(), 0);
        assert!(tt.probe(0x2222).is_none());
    }

    #[test]
    fn test_negative_values_roundtrip() {
        let tt = TranspositionTable::new(1);
        tt.store(0x42, -31500, Bound::Upper, 0, Move::NULL, -250);
        let entry = tt.probe(0x42).unwrap();
        assert_eq!(entry.value, -31500);
        assert_eq!(entry.eval, -250);
        assert!(entry.mv.is_null());
    }

    #[test]
    fn test_same_key_overwrites_but_keeps_move() {
        let tt = TranspositionTable::new(1);
        let key = 0x1234;
        tt.store(key, 10, Bound::Exact, 5, test_move(), 0);
        // A null-move store on the same position keeps the old move.
        tt.store(key, 20, Bound::Lower, 6, Move::NULL, 0);
        let entry = tt.probe(key).unwrap();
        assert_eq!(entry.value, 20);
        assert_eq!(entry.depth, 6);
        assert_eq!(entry.mv, test_move());
    }

    #[test]
    fn test_deeper_entries_preferred_on_replacement() {
        let tt = TranspositionTable::new(1);
        let mask = tt.mask as u64;
        // Five keys landing in the same bucket; the shallow one goes.
        let base = 0x37;
        let keys: Vec<u64> = (0..5).map(|i| base + (i * (mask + 1))).collect();
        tt.store(keys[0], 0, Bound::Exact, 2, test_move(), 0); // shallowest
        for (i, &key) in keys.iter().enumerate().skip(1) {
            tt.store(key, 0, Bound::Exact, 10 + i as u32, test_move(), 0);
        }
        assert!(tt.probe(keys[0]).is_none(), "shallow entry evicted");
        for &key in &keys[1..] {
            assert!(tt.probe(key).is_some(), "deep entry retained");
        }
    }

    #[test]
    fn test_clear() {
        let tt = TranspositionTable::new(1);
        tt.store(0x77, 5, Bound::Exact, 3, test_move(), 0);
        tt.clear();
        assert!(tt.probe(0x77).is_none());
    }

    #[test]
    fn test_generation_ages_entries() {
        let tt = TranspositionTable::new(1);
        tt.store(0x88, 5, Bound::Exact, 3, test_move(), 0);
        tt.new_generation();
        // Still readable across generations.
        assert!(tt.probe(0x88).is_some());
    }
}

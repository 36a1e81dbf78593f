use crate::movetypes::*;
use crate::types::*;
use rayon::prelude::*;
use std::sync::atomic::{AtomicU64, Ordering};

pub const DEFAULT_TT_MIB: usize = 64;
pub const MIN_TT_MIB: usize = 1;
pub const MAX_TT_MIB: usize = 131_072;

// key16 | score16 << 16 | move16 << 32 | depth8 << 48 | bound8 << 56
//
// One entry is one atomic word, so concurrent probes and puts cannot tear;
// a racing write can only produce a tag mismatch, which reads as a miss.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtProbe {
    pub score: Value,
    pub depth: i32,
    pub mv: Option<Move>,
    pub bound: Bound,
}

pub struct TranspositionTable {
    entries: Vec<AtomicU64>,
    entry_count: usize,
    pending_init: bool,
}

// Mate scores are stored relative to the probing node so that the distance
// to mate survives transposition to a different ply from the root.
fn score_to_tt(score: Value, ply: i32) -> Value {
    if score > Value::KNOWN_WIN {
        score + Value(ply)
    } else if score < -Value::KNOWN_WIN {
        score - Value(ply)
    } else {
        score
    }
}

fn score_from_tt(score: Value, ply: i32) -> Value {
    if score > Value::KNOWN_WIN {
        score - Value(ply)
    } else if score < -Value::KNOWN_WIN {
        score + Value(ply)
    } else {
        score
    }
}

fn pack_key(key: Key) -> u64 {
    key.0 & 0xffff
}

impl TranspositionTable {
    pub fn new() -> TranspositionTable {
        let mut tt = TranspositionTable {
            entries: vec![],
            entry_count: 0,
            pending_init: false,
        };
        tt.resize(DEFAULT_TT_MIB);
        tt
    }

    // Only records the new size; the allocation is deferred to finalize()
    // so repeated setoptions before isready stay cheap.
    pub fn resize(&mut self, mib: usize) {
        let mib = mib.clamp(MIN_TT_MIB, MAX_TT_MIB);
        let entries = mib * 1024 * 1024 / std::mem::size_of::<AtomicU64>();
        if entries != self.entry_count {
            self.entries.clear();
            self.entries.shrink_to_fit();
            self.entry_count = entries;
        }
        self.pending_init = true;
    }

    pub fn finalize(&mut self) -> bool {
        if !self.pending_init {
            return false;
        }
        self.pending_init = false;
        // an allocation failure aborts the process with a diagnostic
        self.entries = (0..self.entry_count).into_par_iter().map(|_| AtomicU64::new(0)).collect();
        true
    }

    pub fn clear(&mut self) {
        self.entries.par_iter_mut().for_each(|entry| {
            *entry.get_mut() = 0;
        });
    }

    fn index(&self, key: Key) -> usize {
        ((u128::from(key.0) * self.entry_count as u128) >> 64) as usize
    }

    pub fn probe(&self, key: Key, ply: i32) -> Option<TtProbe> {
        debug_assert!(!self.pending_init);
        let raw = self.entries[self.index(key)].load(Ordering::Relaxed);
        if raw & 0xffff != pack_key(key) {
            return None;
        }
        Some(TtProbe {
            score: score_from_tt(Value(((raw >> 16) & 0xffff) as u16 as i16 as i32), ply),
            depth: ((raw >> 48) & 0xff) as i32,
            mv: Move::new_from_raw(((raw >> 32) & 0xffff) as u16),
            bound: Bound(((raw >> 56) & 0xff) as u8),
        })
    }

    // Always replace. A None move keeps the previous move when the entry
    // already belongs to this key.
    pub fn put(&self, key: Key, score: Value, mv: Option<Move>, depth: i32, ply: i32, bound: Bound) {
        debug_assert!(!self.pending_init);
        debug_assert!(0 <= depth && depth <= MAX_PLY);
        let slot = &self.entries[self.index(key)];
        let old = slot.load(Ordering::Relaxed);
        let move16 = match mv {
            Some(mv) => u64::from(mv.raw()),
            None if old & 0xffff == pack_key(key) => (old >> 32) & 0xffff,
            None => 0,
        };
        let raw = pack_key(key)
            | ((score_to_tt(score, ply).0 as i16 as u16 as u64) << 16)
            | (move16 << 32)
            | ((depth as u64) << 48)
            | ((bound.0 as u64) << 56);
        slot.store(raw, Ordering::Relaxed);
    }

    // Coarse fill estimate over a fixed-size prefix.
    pub fn full_permille(&self) -> u32 {
        debug_assert!(!self.pending_init);
        let probed = self.entry_count.min(1000);
        let mut filled = 0;
        for entry in self.entries[..probed].iter() {
            if (entry.load(Ordering::Relaxed) >> 56) & 0xff != u64::from(Bound::NONE.0) {
                filled += 1;
            }
        }
        filled
    }
}

#[test]
fn test_tt_round_trip() {
    let mut tt = TranspositionTable::new();
    tt.resize(1);
    tt.finalize();
    let key = Key(0xdead_beef_dead_beef);
    let mv = Move::new_from_usi_str("P*5e").unwrap();
    tt.put(key, Value(123), Some(mv), 7, 0, Bound::EXACT);
    let probe = tt.probe(key, 3).unwrap();
    assert_eq!(probe.score, Value(123));
    assert_eq!(probe.depth, 7);
    assert_eq!(probe.mv, Some(mv));
    assert_eq!(probe.bound, Bound::EXACT);
}

#[test]
fn test_tt_miss_on_other_key() {
    let mut tt = TranspositionTable::new();
    tt.resize(1);
    tt.finalize();
    tt.put(Key(0x1111_0000_0000_0001), Value(5), None, 1, 0, Bound::LOWER);
    // same slot tag is required, not just the same bucket
    assert!(tt.probe(Key(0x1111_0000_0000_0002), 0).is_none());
}

#[test]
fn test_tt_mate_score_shift() {
    let mut tt = TranspositionTable::new();
    tt.resize(1);
    tt.finalize();
    let key = Key(0x0123_4567_89ab_cdef);
    // mate in 3 plies seen at ply 5 from the root
    let score_at_node = Value::mate_in(5 + 3);
    tt.put(key, score_at_node, None, 9, 5, Bound::EXACT);
    // the same position reached at ply 1 shows the mate 4 plies closer
    let probe = tt.probe(key, 1).unwrap();
    assert_eq!(probe.score, Value::mate_in(1 + 3));
    // negative mate scores shift the other way
    let key = Key(0xfedc_ba98_7654_3210);
    tt.put(key, Value::mated_in(5 + 2), None, 9, 5, Bound::EXACT);
    let probe = tt.probe(key, 7).unwrap();
    assert_eq!(probe.score, Value::mated_in(7 + 2));
}

#[test]
fn test_tt_none_move_keeps_previous() {
    let mut tt = TranspositionTable::new();
    tt.resize(1);
    tt.finalize();
    let key = Key(0xaaaa_bbbb_cccc_dddd);
    let mv = Move::new_from_usi_str("7g7f").unwrap();
    tt.put(key, Value(10), Some(mv), 3, 0, Bound::LOWER);
    tt.put(key, Value(-4), None, 5, 0, Bound::UPPER);
    let probe = tt.probe(key, 0).unwrap();
    assert_eq!(probe.mv, Some(mv));
    assert_eq!(probe.depth, 5);
    assert_eq!(probe.bound, Bound::UPPER);
}

#[test]
fn test_tt_clear_idempotent() {
    let mut tt = TranspositionTable::new();
    tt.resize(1);
    tt.finalize();
    let key = Key(0x5555_5555_5555_5555);
    tt.put(key, Value(1), None, 1, 0, Bound::EXACT);
    assert!(tt.full_permille() > 0);
    tt.clear();
    assert!(tt.probe(key, 0).is_none());
    assert_eq!(tt.full_permille(), 0);
    tt.clear();
    assert_eq!(tt.full_permille(), 0);
}

#[test]
fn test_tt_deferred_finalize() {
    let mut tt = TranspositionTable::new();
    tt.resize(2);
    assert!(tt.finalize());
    // a second finalize without resize is a no-op
    assert!(!tt.finalize());
    tt.resize(2);
    assert!(tt.finalize());
}

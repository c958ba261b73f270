//! Per-worker move-ordering heuristic tables: killers, butterfly and
//! evasion history, counter moves, continuation history, and the
//! max-gain table. None of these are shared between workers; separate
//! tables diversify the lazy-SMP search.

use crate::board::{Color, Move, Piece, MAX_PLY};

/// Two killer slots per ply.
pub(crate) struct KillerTable {
    slots: [[Move; 2]; MAX_PLY],
}

impl KillerTable {
    pub(crate) fn new() -> Self {
        KillerTable {
            slots: [[Move::NULL; 2]; MAX_PLY],
        }
    }

    #[inline]
    pub(crate) fn get(&self, ply: usize) -> [Move; 2] {
        if ply < MAX_PLY {
            self.slots[ply]
        } else {
            [Move::NULL; 2]
        }
    }

    pub(crate) fn update(&mut self, ply: usize, mv: Move) {
        if ply >= MAX_PLY {
            return;
        }
        if self.slots[ply][0] != mv {
            self.slots[ply][1] = self.slots[ply][0];
            self.slots[ply][0] = mv;
        }
    }

    pub(crate) fn clear(&mut self) {
        self.slots = [[Move::NULL; 2]; MAX_PLY];
    }
}

/// Butterfly history: one counter per (side, from, to).
pub(crate) struct HistoryTable {
    entries: Box<[[i32; 4096]; 2]>,
}

const HISTORY_MAX: i32 = 1 << 14;

impl HistoryTable {
    pub(crate) fn new() -> Self {
        HistoryTable {
            entries: Box::new([[0; 4096]; 2]),
        }
    }

    #[inline]
    fn index(mv: Move) -> usize {
        mv.from().index() * 64 + mv.to().index()
    }

    #[inline]
    pub(crate) fn score(&self, side: Color, mv: Move) -> i32 {
        self.entries[side.index()][Self::index(mv)]
    }

    /// History update with gravity: large entries resist change, so the
    /// table self-normalizes without periodic halving.
    pub(crate) fn update(&mut self, side: Color, mv: Move, bonus: i32) {
        let entry = &mut self.entries[side.index()][Self::index(mv)];
        let clamped = bonus.clamp(-HISTORY_MAX, HISTORY_MAX);
        *entry += clamped - *entry * clamped.abs() / HISTORY_MAX;
    }

    pub(crate) fn decay(&mut self) {
        for side in self.entries.iter_mut() {
            for entry in side.iter_mut() {
                *entry /= 2;
            }
        }
    }

    pub(crate) fn clear(&mut self) {
        self.entries = Box::new([[0; 4096]; 2]);
    }
}

/// Quiet reply that refuted a (from, to) move.
pub(crate) struct CounterMoveTable {
    entries: Box<[[Move; 64]; 64]>,
}

impl CounterMoveTable {
    pub(crate) fn new() -> Self {
        CounterMoveTable {
            entries: Box::new([[Move::NULL; 64]; 64]),
        }
    }

    #[inline]
    pub(crate) fn get(&self, prev: Move) -> Move {
        if prev.is_null() {
            return Move::NULL;
        }
        self.entries[prev.from().index()][prev.to().index()]
    }

    pub(crate) fn set(&mut self, prev: Move, reply: Move) {
        if !prev.is_null() {
            self.entries[prev.from().index()][prev.to().index()] = reply;
        }
    }

    pub(crate) fn clear(&mut self) {
        self.entries = Box::new([[Move::NULL; 64]; 64]);
    }
}

/// Continuation history keyed by the previous (piece, to) pair and the
/// current (piece, to) pair.
pub(crate) struct ContinuationHistory {
    entries: Box<[[i32; 384]; 384]>,
}

impl ContinuationHistory {
    pub(crate) fn new() -> Self {
        ContinuationHistory {
            entries: vec![[0i32; 384]; 384]
                .into_boxed_slice()
                .try_into()
                .expect("384x384 continuation table"),
        }
    }

    #[inline]
    fn slot(piece: Piece, to: usize) -> usize {
        piece.index() * 64 + to
    }

    #[inline]
    pub(crate) fn score(&self, prev: (Piece, usize), cur: (Piece, usize)) -> i32 {
        self.entries[Self::slot(prev.0, prev.1)][Self::slot(cur.0, cur.1)]
    }

    pub(crate) fn update(&mut self, prev: (Piece, usize), cur: (Piece, usize), bonus: i32) {
        let entry = &mut self.entries[Self::slot(prev.0, prev.1)][Self::slot(cur.0, cur.1)];
        let clamped = bonus.clamp(-HISTORY_MAX, HISTORY_MAX);
        *entry += clamped - *entry * clamped.abs() / HISTORY_MAX;
    }

    pub(crate) fn clear(&mut self) {
        for row in self.entries.iter_mut() {
            row.fill(0);
        }
    }
}

/// Largest material swing ever observed for a quiet (from, to) move.
/// Quiets that have historically won material order ahead of the rest.
pub(crate) struct MaxGainTable {
    entries: Box<[i32; 4096]>,
}

impl MaxGainTable {
    pub(crate) fn new() -> Self {
        MaxGainTable {
            entries: Box::new([0; 4096]),
        }
    }

    #[inline]
    fn index(mv: Move) -> usize {
        mv.from().index() * 64 + mv.to().index()
    }

    #[inline]
    pub(crate) fn get(&self, mv: Move) -> i32 {
        self.entries[Self::index(mv)]
    }

    /// Keep the maximum, bleeding old peaks away slowly.
    pub(crate) fn update(&mut self, mv: Move, gain: i32) {
        let entry = &mut self.entries[Self::index(mv)];
        if gain >= *entry {
            *entry = gain;
        } else {
            *entry -= 1;
        }
    }

    pub(crate) fn clear(&mut self) {
        self.entries.fill(0);
    }
}

/// The ordering state a move picker consults, bundled to keep borrow
/// scopes narrow.
pub(crate) struct Heuristics {
    pub killers: KillerTable,
    pub history: HistoryTable,
    pub evasion_history: HistoryTable,
    pub counter_moves: CounterMoveTable,
    pub continuation: ContinuationHistory,
    pub max_gain: MaxGainTable,
}

impl Heuristics {
    pub(crate) fn new() -> Self {
        Heuristics {
            killers: KillerTable::new(),
            history: HistoryTable::new(),
            evasion_history: HistoryTable::new(),
            counter_moves: CounterMoveTable::new(),
            continuation: ContinuationHistory::new(),
            max_gain: MaxGainTable::new(),
        }
    }

    /// Soften everything between searches; killers and counters reset
    /// outright.
    pub(crate) fn new_search(&mut self) {
        self.killers.clear();
        self.counter_moves.clear();
        self.history.decay();
        self.evasion_history.decay();
    }

    /// Full reset for a new game.
    pub(crate) fn clear(&mut self) {
        self.killers.clear();
        self.history.clear();
        self.evasion_history.clear();
        self.counter_moves.clear();
        self.continuation.clear();
        self.max_gain.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Square;

    fn mv(from: usize, to: usize) -> Move {
        Move::quiet(Square::from_index(from), Square::from_index(to))
    }

    #[test]
    fn test_killers_shift() {
        let mut killers = KillerTable::new();
        killers.update(3, mv(0, 8));
        killers.update(3, mv(1, 9));
        assert_eq!(killers.get(3), [mv(1, 9), mv(0, 8)]);
        // Re-storing the primary does not duplicate it.
        killers.update(3, mv(1, 9));
        assert_eq!(killers.get(3), [mv(1, 9), mv(0, 8)]);
    }

    #[test]
    fn test_history_update_and_bounds() {
        let mut history = HistoryTable::new();
        let m = mv(12, 28);
        for _ in 0..1000 {
            history.update(Color::White, m, 1200);
        }
        let score = history.score(Color::White, m);
        assert!(score > 0);
        assert!(score <= HISTORY_MAX);
        // The other side's table is untouched.
        assert_eq!(history.score(Color::Black, m), 0);
    }

    #[test]
    fn test_history_negative_updates() {
        let mut history = HistoryTable::new();
        let m = mv(12, 28);
        history.update(Color::White, m, -500);
        assert!(history.score(Color::White, m) < 0);
    }

    #[test]
    fn test_counter_moves() {
        let mut counters = CounterMoveTable::new();
        let prev = mv(8, 16);
        let reply = mv(50, 42);
        counters.set(prev, reply);
        assert_eq!(counters.get(prev), reply);
        assert_eq!(counters.get(mv(0, 1)), Move::NULL);
        assert_eq!(counters.get(Move::NULL), Move::NULL);
    }

    #[test]
    fn test_max_gain_keeps_peak() {
        let mut table = MaxGainTable::new();
        let m = mv(10, 18);
        table.update(m, 300);
        table.update(m, 100);
        assert_eq!(table.get(m), 299);
        table.update(m, 500);
        assert_eq!(table.get(m), 500);
    }

    #[test]
    fn test_continuation_history() {
        let mut cont = ContinuationHistory::new();
        let prev = (Piece::Knight, 42usize);
        let cur = (Piece::Pawn, 20usize);
        cont.update(prev, cur, 800);
        assert!(cont.score(prev, cur) > 0);
        assert_eq!(cont.score(cur, prev), 0);
    }
}

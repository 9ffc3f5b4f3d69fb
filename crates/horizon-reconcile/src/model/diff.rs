//! The diff engine.
//!
//! [`diff`] turns an old and a new sequence into an [`EditScript`]. It is a
//! pure function: it reads both slices and the old sequence's
//! [`ValueHashCache`], and touches nothing else.
//!
//! # Algorithm
//!
//! 1. **Matching.** Positions are matched with Myers' O((N+M)D) algorithm in
//!    its linear-space form: common prefixes and suffixes are trimmed, then
//!    the remaining range is split at the middle of an optimal edit path and
//!    both halves are processed the same way. Matching only ever asks
//!    [`DiffItem::equals_item`]. The matched pairs form a longest common
//!    subsequence, so the removals and insertions around it are minimal.
//! 2. **Move detection** (optional). Every unmatched old item is paired with
//!    the first unmatched new item it `equals_item`. Such pairs become one
//!    move instead of a remove plus an insert.
//! 3. **Script generation.** Removals back to front, then moves in order of
//!    final position, then insertions front to back, then content changes at
//!    final positions. See [`script`](super::script) for what this ordering
//!    guarantees to consumers.
//!
//! Content changes are decided per matched pair: if the new item has a
//! [`content_hash`](DiffItem::content_hash) and a hash is cached for the old
//! position, the hashes decide; otherwise
//! [`are_contents_the_same`](DiffItem::are_contents_the_same) does. A
//! present hash is trusted without a second check.
//!
//! Duplicate identities are allowed. Which duplicate pairs with which old
//! position is unspecified, but the script is always valid.

use horizon_reconcile_core::logging::{span_names, targets};
use horizon_reconcile_core::PerfSpan;

use super::item::DiffItem;
use super::script::{EditOp, EditScript};

/// Content hashes cached for a sequence, parallel to it.
///
/// Entry `i` holds the [`content_hash`](DiffItem::content_hash) item `i` had
/// when the cache was built, or `None` if the item provides no hash.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValueHashCache {
    hashes: Vec<Option<u64>>,
}

impl ValueHashCache {
    /// An empty cache. Every lookup misses.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Snapshots the content hash of every item.
    pub fn build<T: DiffItem>(items: &[T]) -> Self {
        Self {
            hashes: items.iter().map(DiffItem::content_hash).collect(),
        }
    }

    /// The cached hash at `position`, if any.
    pub fn get(&self, position: usize) -> Option<u64> {
        self.hashes.get(position).copied().flatten()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    /// Returns `true` if the cache has no entries.
    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }

    /// Number of entries that carry a hash.
    pub fn hashed_count(&self) -> usize {
        self.hashes.iter().filter(|hash| hash.is_some()).count()
    }
}

/// Computes the edit script that turns `old` into `new`.
///
/// `old_hashes` must be the cache built for `old`; pass
/// [`ValueHashCache::empty`] to always use the slow content check. When
/// `detect_moves` is `false`, items whose relative order changed are reported
/// as a removal plus an insertion.
pub fn diff<T: DiffItem>(
    old: &[T],
    new: &[T],
    old_hashes: &ValueHashCache,
    detect_moves: bool,
) -> EditScript {
    let _span = PerfSpan::new(span_names::DIFF);
    let mut matcher = Matcher::new(old, new);
    matcher.match_all();
    if detect_moves {
        matcher.detect_moves();
    }
    let script = matcher.into_script(old_hashes);

    let stats = script.stats();
    tracing::debug!(
        target: targets::DIFF,
        old_len = old.len(),
        new_len = new.len(),
        detect_moves,
        ops = script.len(),
        inserted = stats.inserted,
        removed = stats.removed,
        moved = stats.moved,
        changed = stats.changed,
        "diff computed"
    );
    script
}

/// Diffs two sequences, building the old hash cache on the spot.
///
/// Suitable for immutable items, whose current hash equals the hash they had
/// when they were stored.
pub fn diff_sequences<T: DiffItem>(old: &[T], new: &[T], detect_moves: bool) -> EditScript {
    diff(old, new, &ValueHashCache::build(old), detect_moves)
}

struct Matcher<'a, T> {
    old: &'a [T],
    new: &'a [T],
    old_to_new: Vec<Option<usize>>,
    new_to_old: Vec<Option<usize>>,
    /// Old positions paired by move detection rather than by the LCS.
    moved: Vec<bool>,
}

impl<'a, T: DiffItem> Matcher<'a, T> {
    fn new(old: &'a [T], new: &'a [T]) -> Self {
        Self {
            old,
            new,
            old_to_new: vec![None; old.len()],
            new_to_old: vec![None; new.len()],
            moved: vec![false; old.len()],
        }
    }

    #[inline]
    fn same(&self, old_index: usize, new_index: usize) -> bool {
        self.old[old_index].equals_item(&self.new[new_index])
    }

    fn link(&mut self, old_index: usize, new_index: usize) {
        self.old_to_new[old_index] = Some(new_index);
        self.new_to_old[new_index] = Some(old_index);
    }

    /// Matches the whole sequences along a longest common subsequence.
    fn match_all(&mut self) {
        let mut pending = vec![(0, self.old.len(), 0, self.new.len())];

        while let Some((mut a0, mut a1, mut b0, mut b1)) = pending.pop() {
            while a0 < a1 && b0 < b1 && self.same(a0, b0) {
                self.link(a0, b0);
                a0 += 1;
                b0 += 1;
            }
            while a0 < a1 && b0 < b1 && self.same(a1 - 1, b1 - 1) {
                self.link(a1 - 1, b1 - 1);
                a1 -= 1;
                b1 -= 1;
            }
            if a0 == a1 || b0 == b1 {
                continue;
            }

            let Some((x, y)) = self.bisect(a0, a1, b0, b1) else {
                // Nothing in common in this range
                continue;
            };
            let (n, m) = (a1 - a0, b1 - b0);
            if (x == 0 && y == 0) || (x == n && y == m) {
                tracing::warn!(target: targets::DIFF, a0, a1, b0, b1, "bisect made no progress, leaving range unmatched");
                continue;
            }
            pending.push((a0 + x, a1, b0 + y, b1));
            pending.push((a0, a0 + x, b0, b0 + y));
        }
    }

    /// Finds a split point on the middle snake of an optimal edit path.
    ///
    /// Returns offsets `(x, y)` relative to `(a0, b0)`, or `None` when the two
    /// ranges share no item.
    fn bisect(&self, a0: usize, a1: usize, b0: usize, b1: usize) -> Option<(usize, usize)> {
        let n = (a1 - a0) as isize;
        let m = (b1 - b0) as isize;
        let max_d = (n + m + 1) / 2;
        let v_offset = max_d;
        let v_length = 2 * max_d + 2;
        let mut v1 = vec![-1isize; v_length as usize];
        let mut v2 = vec![-1isize; v_length as usize];
        v1[(v_offset + 1) as usize] = 0;
        v2[(v_offset + 1) as usize] = 0;

        let delta = n - m;
        // With an odd delta the forward pass detects the overlap
        let front = delta % 2 != 0;
        let same = |x: isize, y: isize| self.same(a0 + x as usize, b0 + y as usize);

        let (mut k1_start, mut k1_end, mut k2_start, mut k2_end) = (0isize, 0isize, 0isize, 0isize);

        for d in 0..max_d {
            let mut k1 = -d + k1_start;
            while k1 <= d - k1_end {
                let k1_offset = (v_offset + k1) as usize;
                let mut x1 = if k1 == -d || (k1 != d && v1[k1_offset - 1] < v1[k1_offset + 1]) {
                    v1[k1_offset + 1]
                } else {
                    v1[k1_offset - 1] + 1
                };
                let mut y1 = x1 - k1;
                while x1 < n && y1 >= 0 && y1 < m && same(x1, y1) {
                    x1 += 1;
                    y1 += 1;
                }
                v1[k1_offset] = x1;
                if x1 > n {
                    k1_end += 2;
                } else if y1 > m {
                    k1_start += 2;
                } else if front {
                    let k2_offset = v_offset + delta - k1;
                    if (0..v_length).contains(&k2_offset) && v2[k2_offset as usize] != -1 {
                        let x2 = n - v2[k2_offset as usize];
                        if x1 >= x2 {
                            return Some((x1 as usize, y1 as usize));
                        }
                    }
                }
                k1 += 2;
            }

            let mut k2 = -d + k2_start;
            while k2 <= d - k2_end {
                let k2_offset = (v_offset + k2) as usize;
                let mut x2 = if k2 == -d || (k2 != d && v2[k2_offset - 1] < v2[k2_offset + 1]) {
                    v2[k2_offset + 1]
                } else {
                    v2[k2_offset - 1] + 1
                };
                let mut y2 = x2 - k2;
                while x2 < n && y2 >= 0 && y2 < m && same(n - x2 - 1, m - y2 - 1) {
                    x2 += 1;
                    y2 += 1;
                }
                v2[k2_offset] = x2;
                if x2 > n {
                    k2_end += 2;
                } else if y2 > m {
                    k2_start += 2;
                } else if !front {
                    let k1_offset = v_offset + delta - k2;
                    if (0..v_length).contains(&k1_offset) && v1[k1_offset as usize] != -1 {
                        let x1 = v1[k1_offset as usize];
                        let y1 = v_offset + x1 - k1_offset;
                        if x1 >= n - x2 {
                            return Some((x1 as usize, y1 as usize));
                        }
                    }
                }
                k2 += 2;
            }
        }

        None
    }

    /// Pairs unmatched old items with unmatched new items of the same identity.
    fn detect_moves(&mut self) {
        let mut candidates: Vec<usize> = (0..self.new.len())
            .filter(|&j| self.new_to_old[j].is_none())
            .collect();
        if candidates.is_empty() {
            return;
        }

        for i in 0..self.old.len() {
            if self.old_to_new[i].is_some() {
                continue;
            }
            if let Some(slot) = candidates.iter().position(|&j| self.same(i, j)) {
                let j = candidates.remove(slot);
                self.link(i, j);
                self.moved[i] = true;
                if candidates.is_empty() {
                    break;
                }
            }
        }
    }

    fn content_changed(&self, old_index: usize, new_index: usize, old_hashes: &ValueHashCache) -> bool {
        let new_item = &self.new[new_index];
        match (new_item.content_hash(), old_hashes.get(old_index)) {
            (Some(new_hash), Some(cached)) => new_hash != cached,
            _ => !self.old[old_index].are_contents_the_same(new_item),
        }
    }

    fn into_script(self, old_hashes: &ValueHashCache) -> EditScript {
        let mut ops = Vec::new();

        // Removals, back to front so positions are old positions
        let mut i = self.old.len();
        while i > 0 {
            if self.old_to_new[i - 1].is_some() {
                i -= 1;
                continue;
            }
            let end = i;
            while i > 0 && self.old_to_new[i - 1].is_none() {
                i -= 1;
            }
            ops.push(EditOp::Remove {
                position: i,
                count: end - i,
            });
        }

        // Moves: place each moved item right after its predecessor in the new order
        let mut current: Vec<usize> = (0..self.old.len())
            .filter(|&i| self.old_to_new[i].is_some())
            .collect();
        let mut predecessor: Option<usize> = None;
        for j in 0..self.new.len() {
            let Some(i) = self.new_to_old[j] else {
                continue;
            };
            if self.moved[i] {
                if let Some(from) = current.iter().position(|&x| x == i) {
                    let to = match predecessor.and_then(|p| current.iter().position(|&x| x == p)) {
                        None => 0,
                        Some(anchor) if from > anchor => anchor + 1,
                        Some(anchor) => anchor,
                    };
                    if from != to {
                        ops.push(EditOp::Move { from, to });
                        let entry = current.remove(from);
                        current.insert(to, entry);
                    }
                }
            }
            predecessor = Some(i);
        }

        // Insertions, front to back so positions are new positions
        let mut j = 0;
        while j < self.new.len() {
            if self.new_to_old[j].is_some() {
                j += 1;
                continue;
            }
            let start = j;
            while j < self.new.len() && self.new_to_old[j].is_none() {
                j += 1;
            }
            ops.push(EditOp::Insert {
                position: start,
                count: j - start,
            });
        }

        // Content changes at final positions
        let mut j = 0;
        while j < self.new.len() {
            let changed = |j: usize| {
                self.new_to_old[j].is_some_and(|i| self.content_changed(i, j, old_hashes))
            };
            if !changed(j) {
                j += 1;
                continue;
            }
            let start = j;
            while j < self.new.len() && changed(j) {
                j += 1;
            }
            ops.push(EditOp::Change {
                position: start,
                count: j - start,
            });
        }

        EditScript::new(ops, self.old.len(), self.new.len())
    }
}

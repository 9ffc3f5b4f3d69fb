//! Edit scripts produced by the diff engine.
//!
//! An [`EditScript`] is an ordered list of [`EditOp`]s. Applying the
//! operations in order to a list that starts out as the old sequence yields
//! the new sequence. Scripts produced by [`diff`](super::diff) always have
//! this shape:
//!
//! 1. removals, from the back of the list to the front
//! 2. moves, in ascending order of their final position
//! 3. insertions, in ascending position order
//! 4. content changes, at final positions
//!
//! Because insertions come after every removal and move, and in ascending
//! order, the items inserted by `Insert { position, count }` are exactly
//! `new[position..position + count]`.

use std::fmt;

/// A single structural operation over list positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditOp {
    /// `count` items were inserted starting at `position`.
    Insert {
        /// First inserted position.
        position: usize,
        /// Number of inserted items.
        count: usize,
    },
    /// `count` items were removed starting at `position`.
    Remove {
        /// First removed position.
        position: usize,
        /// Number of removed items.
        count: usize,
    },
    /// The item at `from` moved to `to`.
    ///
    /// `to` is the position the item occupies after the move, i.e. the item
    /// is removed at `from` and then inserted at `to`.
    Move {
        /// Position before the move.
        from: usize,
        /// Position after the move.
        to: usize,
    },
    /// `count` items starting at `position` keep their identity but changed
    /// contents and need to be re-bound.
    Change {
        /// First changed position.
        position: usize,
        /// Number of changed items.
        count: usize,
    },
}

impl EditOp {
    /// Returns `true` for operations that alter the order or length of the list.
    pub fn is_structural(&self) -> bool {
        !matches!(self, EditOp::Change { .. })
    }

    /// Net change in list length caused by this operation.
    pub fn len_delta(&self) -> isize {
        match *self {
            EditOp::Insert { count, .. } => count as isize,
            EditOp::Remove { count, .. } => -(count as isize),
            EditOp::Move { .. } | EditOp::Change { .. } => 0,
        }
    }
}

impl fmt::Display for EditOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditOp::Insert { position, count } => write!(f, "insert({position}, {count})"),
            EditOp::Remove { position, count } => write!(f, "remove({position}, {count})"),
            EditOp::Move { from, to } => write!(f, "move({from} -> {to})"),
            EditOp::Change { position, count } => write!(f, "change({position}, {count})"),
        }
    }
}

/// Summary counts for an [`EditScript`], used in log output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScriptStats {
    /// Items inserted.
    pub inserted: usize,
    /// Items removed.
    pub removed: usize,
    /// Items moved.
    pub moved: usize,
    /// Items changed.
    pub changed: usize,
}

/// An immutable, ordered list of edit operations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditScript {
    ops: Vec<EditOp>,
    old_len: usize,
    new_len: usize,
    revision: Option<u64>,
}

impl EditScript {
    pub(crate) fn new(ops: Vec<EditOp>, old_len: usize, new_len: usize) -> Self {
        Self {
            ops,
            old_len,
            new_len,
            revision: None,
        }
    }

    /// Stamps the script with the source revision it produces.
    pub(crate) fn with_revision(mut self, revision: u64) -> Self {
        self.revision = Some(revision);
        self
    }

    /// A script that replaces every item: remove all old, insert all new.
    ///
    /// Used by the adapter for a full resynchronization.
    pub fn reset(old_len: usize, new_len: usize) -> Self {
        let mut ops = Vec::with_capacity(2);
        if old_len > 0 {
            ops.push(EditOp::Remove {
                position: 0,
                count: old_len,
            });
        }
        if new_len > 0 {
            ops.push(EditOp::Insert {
                position: 0,
                count: new_len,
            });
        }
        Self::new(ops, old_len, new_len)
    }

    /// The operations, in application order.
    pub fn ops(&self) -> &[EditOp] {
        &self.ops
    }

    /// Returns `true` if the old and new sequences compared equal.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Number of operations.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Length of the sequence the script applies to.
    pub fn old_len(&self) -> usize {
        self.old_len
    }

    /// Length of the sequence the script produces.
    pub fn new_len(&self) -> usize {
        self.new_len
    }

    /// The source revision this script leads to.
    ///
    /// Scripts published by a source carry consecutive revisions starting at
    /// 1. Scripts built any other way carry none.
    pub fn revision(&self) -> Option<u64> {
        self.revision
    }

    /// Item counts per operation kind.
    pub fn stats(&self) -> ScriptStats {
        let mut stats = ScriptStats::default();
        for op in &self.ops {
            match *op {
                EditOp::Insert { count, .. } => stats.inserted += count,
                EditOp::Remove { count, .. } => stats.removed += count,
                EditOp::Move { .. } => stats.moved += 1,
                EditOp::Change { count, .. } => stats.changed += count,
            }
        }
        stats
    }

    /// Replays the script over `old`, filling inserted and changed positions
    /// from `new`.
    ///
    /// This is the reference interpretation of a script. It returns `None` if
    /// an operation falls outside the list it is applied to.
    pub fn replay<T: Clone>(&self, old: &[T], new: &[T]) -> Option<Vec<T>> {
        let mut list = old.to_vec();
        for op in &self.ops {
            match *op {
                EditOp::Insert { position, count } => {
                    let source = new.get(position..position + count)?;
                    if position > list.len() {
                        return None;
                    }
                    list.splice(position..position, source.iter().cloned());
                }
                EditOp::Remove { position, count } => {
                    if position + count > list.len() {
                        return None;
                    }
                    list.drain(position..position + count);
                }
                EditOp::Move { from, to } => {
                    if from >= list.len() || to >= list.len() {
                        return None;
                    }
                    let item = list.remove(from);
                    list.insert(to, item);
                }
                EditOp::Change { position, count } => {
                    let source = new.get(position..position + count)?;
                    let target = list.get_mut(position..position + count)?;
                    target.clone_from_slice(source);
                }
            }
        }
        Some(list)
    }
}

impl fmt::Display for EditScript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, op) in self.ops.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{op}")?;
        }
        write!(f, "]")
    }
}

impl<'a> IntoIterator for &'a EditScript {
    type Item = &'a EditOp;
    type IntoIter = std::slice::Iter<'a, EditOp>;

    fn into_iter(self) -> Self::IntoIter {
        self.ops.iter()
    }
}

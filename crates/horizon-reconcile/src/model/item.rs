//! The comparison protocol items implement for diffing.
//!
//! Diffing needs two separate questions answered about a pair of items:
//!
//! - **Identity** ([`DiffItem::equals_item`]): is this the same logical entity?
//!   Identity alone drives insert, remove and move decisions.
//! - **Content** ([`DiffItem::are_contents_the_same`]): given the same entity,
//!   is the displayed data unchanged? Content drives `change` operations.
//!
//! Both default to value equality, so `impl DiffItem for MyItem {}` is enough
//! for plain value types. Items that are shared and mutated in place (for
//! example `Rc<RefCell<_>>` rows) should provide [`DiffItem::content_hash`]:
//! the data source caches the hash of every item when the sequence is
//! replaced, and the next diff compares the new hash against that cached
//! value instead of calling `are_contents_the_same`.
//!
//! # Heterogeneous sequences
//!
//! Mixed item kinds are modelled as a closed enum. Each variant keeps its own
//! comparison rules; items of different variants are never the same entity.
//!
//! ```
//! use horizon_reconcile::model::DiffItem;
//!
//! #[derive(Debug, Clone, PartialEq)]
//! struct Message { id: u32, text: String }
//!
//! impl DiffItem for Message {
//!     fn equals_item(&self, other: &Self) -> bool {
//!         self.id == other.id
//!     }
//! }
//!
//! #[derive(Debug, Clone, PartialEq)]
//! enum Row {
//!     Header(String),
//!     Message(Message),
//! }
//!
//! impl DiffItem for Row {
//!     fn equals_item(&self, other: &Self) -> bool {
//!         match (self, other) {
//!             (Row::Header(a), Row::Header(b)) => a.equals_item(b),
//!             (Row::Message(a), Row::Message(b)) => a.equals_item(b),
//!             _ => false,
//!         }
//!     }
//!
//!     fn are_contents_the_same(&self, other: &Self) -> bool {
//!         match (self, other) {
//!             (Row::Header(a), Row::Header(b)) => a.are_contents_the_same(b),
//!             (Row::Message(a), Row::Message(b)) => a.are_contents_the_same(b),
//!             _ => false,
//!         }
//!     }
//! }
//!
//! let old = Row::Message(Message { id: 1, text: "hi".into() });
//! let new = Row::Message(Message { id: 1, text: "hello".into() });
//! assert!(old.equals_item(&new));
//! assert!(!old.are_contents_the_same(&new));
//! ```

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::rc::Rc;
use std::sync::Arc;

/// Identity and content comparison for items in a diffed sequence.
///
/// Every method has a default; override only what differs from value
/// equality.
pub trait DiffItem: PartialEq {
    /// Returns `true` if `other` is the same logical entity as `self`.
    ///
    /// Called with `self` as the item from the old sequence. Only this method
    /// is used to match positions between the old and new sequence.
    fn equals_item(&self, other: &Self) -> bool {
        self == other
    }

    /// Returns `true` if the displayed contents of `self` and `other` match.
    ///
    /// Only consulted for pairs where [`equals_item`](Self::equals_item) is
    /// `true`, and only when the hash fast path is unavailable.
    fn are_contents_the_same(&self, other: &Self) -> bool {
        self == other
    }

    /// Optional hash of the item's current contents.
    ///
    /// When the new item returns `Some` and a hash was cached for the matched
    /// old position, the two hashes alone decide whether the item changed.
    /// The hash must agree with [`are_contents_the_same`](Self::are_contents_the_same):
    /// equal hashes are trusted as equal contents.
    fn content_hash(&self) -> Option<u64> {
        None
    }
}

/// Hashes a value with the standard library's default hasher.
///
/// Convenience for [`DiffItem::content_hash`] implementations.
pub fn content_hash_of<H: Hash + ?Sized>(value: &H) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

macro_rules! value_diff_item {
    ($($ty:ty),* $(,)?) => {
        $(impl DiffItem for $ty {})*
    };
}

value_diff_item!(
    String, &'static str, bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128,
    usize,
);

impl<T: DiffItem + ?Sized> DiffItem for Rc<T> {
    fn equals_item(&self, other: &Self) -> bool {
        (**self).equals_item(other)
    }

    fn are_contents_the_same(&self, other: &Self) -> bool {
        (**self).are_contents_the_same(other)
    }

    fn content_hash(&self) -> Option<u64> {
        (**self).content_hash()
    }
}

impl<T: DiffItem + ?Sized> DiffItem for Arc<T> {
    fn equals_item(&self, other: &Self) -> bool {
        (**self).equals_item(other)
    }

    fn are_contents_the_same(&self, other: &Self) -> bool {
        (**self).are_contents_the_same(other)
    }

    fn content_hash(&self) -> Option<u64> {
        (**self).content_hash()
    }
}

impl<T: DiffItem> DiffItem for Box<T> {
    fn equals_item(&self, other: &Self) -> bool {
        (**self).equals_item(other)
    }

    fn are_contents_the_same(&self, other: &Self) -> bool {
        (**self).are_contents_the_same(other)
    }

    fn content_hash(&self) -> Option<u64> {
        (**self).content_hash()
    }
}

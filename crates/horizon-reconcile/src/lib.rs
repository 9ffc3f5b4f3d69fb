//! Horizon Reconcile - keeps rendered lists in sync with their data.
//!
//! This is the main crate. It re-exports the core signal, error and logging
//! APIs and adds the reconciliation [`model`].
//!
//! # Example
//!
//! ```
//! use std::rc::Rc;
//! use horizon_reconcile::prelude::*;
//!
//! #[derive(Debug, Clone, PartialEq)]
//! struct Contact {
//!     id: u32,
//!     name: String,
//! }
//!
//! impl DiffItem for Contact {
//!     fn equals_item(&self, other: &Self) -> bool {
//!         self.id == other.id
//!     }
//! }
//!
//! let source = Rc::new(SimpleAdapterSource::simple(Vec::new(), TemplateId(0)));
//! source.signals().edit_script.connect(|script| println!("{script}"));
//!
//! source.set_data(vec![Contact { id: 1, name: "Ada".into() }]);
//! let script = source.set_data(vec![Contact { id: 1, name: "Ada L.".into() }]);
//! assert_eq!(script.ops(), &[EditOp::Change { position: 0, count: 1 }]);
//! ```

pub use horizon_reconcile_core::*;

pub mod model;
pub mod prelude;
